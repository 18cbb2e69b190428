//! End-to-end tests: load whole programs and check observable engine behavior.

use intcode_vm::io::{AsciiOutput, InputMode};
use intcode_vm::scheduler::run_to_halt;
use intcode_vm::values::word;
use intcode_vm::{Program, Status, VmConfig, Word, VM};

/// Helper: load `program`, queue `inputs`, run to halt, return the outputs.
fn run_program(program: &[i64], inputs: &[i64]) -> Vec<Word> {
    let mut vm = VM::new();
    vm.load(&Program::from(program));
    for i in inputs {
        vm.push_input(*i);
    }
    run_to_halt(&mut vm).expect("program should halt cleanly")
}

fn words(values: &[i64]) -> Vec<Word> {
    values.iter().copied().map(Word::from).collect()
}

const QUINE: [i64; 16] = [
    109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
];

// ─── Arithmetic ───

#[test]
fn e2e_large_immediate_output() {
    let out = run_program(&[104, 1_125_899_906_842_624, 99], &[]);
    assert_eq!(out, vec![word(1_125_899_906_842_624)]);
}

#[test]
fn e2e_sixteen_digit_product() {
    let out = run_program(&[1102, 34_915_192, 34_915_192, 7, 4, 7, 99, 0], &[]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].to_string().len(), 16);
    assert_eq!(out[0], word(34_915_192) * word(34_915_192));
}

#[test]
fn e2e_arithmetic_beyond_64_bits() {
    // mul [9] = 2^62 * 2^62, then output it.
    let program: Program = "1102,4611686018427387904,4611686018427387904,9,4,9,99,0,0,0"
        .parse()
        .unwrap();
    let mut vm = VM::new();
    vm.load(&program);
    let out = run_to_halt(&mut vm).unwrap();
    assert_eq!(out[0].to_string(), "21267647932558653966460912964485513216");
}

// ─── Relative mode ───

#[test]
fn e2e_quine_outputs_itself() {
    assert_eq!(run_program(&QUINE, &[]), words(&QUINE));
}

#[test]
fn e2e_relative_write_read_round_trip() {
    // in -> rb; arb [rb-cell]; in -> rel(3); out rel(3)
    let program = [3, 100, 109, 0, 9, 100, 203, 3, 204, 3, 99];
    for base in [0, 500, 1000, 123_456] {
        let mut vm = VM::new();
        vm.load(&Program::from(&program[..]));
        vm.push_input(base);
        vm.push_input(-42);
        let out = run_to_halt(&mut vm).unwrap();
        assert_eq!(out, vec![word(-42)], "base {}", base);
        assert_eq!(vm.relative_base(), &word(base));
        assert_eq!(vm.memory_at(base as u64 + 3), &word(-42));
    }
}

// ─── I/O ───

#[test]
fn e2e_echo() {
    assert_eq!(run_program(&[3, 0, 4, 0, 99], &[42]), vec![word(42)]);
}

#[test]
fn e2e_non_blocking_sentinel_then_resume() {
    let mut vm = VM::with_config(VmConfig {
        input_mode: InputMode::NonBlocking,
        ..VmConfig::default()
    });
    // Poll [20] until it holds something other than -1, then echo it.
    vm.load(&Program::from(vec![3, 20, 1008, 20, -1, 21, 1005, 21, 0, 4, 20, 99]));

    let first = vm.run().unwrap();
    assert_eq!(first.status, Status::AwaitingInput);
    assert!(first.outputs.is_empty());
    assert_eq!(vm.program_counter(), 2);
    assert_eq!(vm.memory_at(20), &word(-1));
    assert_eq!(vm.io().inputs_consumed(), 0);

    vm.push_input(5);
    let second = vm.run().unwrap();
    assert_eq!(second.status, Status::Halted);
    assert_eq!(second.outputs, vec![word(5)]);
    assert_eq!(vm.io().inputs_consumed(), 1);
}

#[test]
fn e2e_ascii_round_trip() {
    // Echo input until a newline is read, then halt.
    let program = [3, 100, 4, 100, 1008, 100, 10, 101, 1006, 101, 0, 99];
    let mut vm = VM::new();
    vm.load(&Program::from(&program[..]));
    vm.push_ascii("HELLO\n");
    let out = run_to_halt(&mut vm).unwrap();
    let ascii = AsciiOutput::from_words(&out);
    assert_eq!(ascii.text, "HELLO\n");
    assert!(ascii.values.is_empty());
}

// ─── Determinism ───

#[test]
fn e2e_runs_are_deterministic() {
    let program = Program::from(QUINE.to_vec());
    let mut first = VM::new();
    first.load(&program);
    let mut second = VM::new();
    second.load(&program);
    assert_eq!(
        run_to_halt(&mut first).unwrap(),
        run_to_halt(&mut second).unwrap()
    );
    assert_eq!(
        first.instructions_executed(),
        second.instructions_executed()
    );
}

#[test]
fn e2e_load_does_not_mutate_program() {
    let program = Program::from(vec![1101, 1, 1, 0, 99]);
    let mut vm = VM::new();
    vm.load(&program);
    run_to_halt(&mut vm).unwrap();
    assert_eq!(vm.memory_at(0), &word(2));
    assert_eq!(program.words()[0], word(1101));
}

// ─── Snapshots ───

#[test]
fn e2e_restore_immediately_is_noop() {
    let mut vm = VM::with_config(VmConfig::coroutine());
    vm.load(&Program::from(QUINE.to_vec()));
    for _ in 0..5 {
        vm.run().unwrap();
    }
    let snap = vm.snapshot().unwrap();
    let pc = vm.program_counter();
    let rb = vm.relative_base().clone();
    let status = vm.status().clone();

    vm.restore(&snap).unwrap();
    assert_eq!(vm.program_counter(), pc);
    assert_eq!(vm.relative_base(), &rb);
    assert_eq!(vm.status(), &status);
    assert_eq!(vm.snapshot().unwrap(), snap);
    assert_eq!(run_to_halt(&mut vm).unwrap(), words(&QUINE[5..]));
}

#[test]
fn e2e_snapshot_branches_explore_independently() {
    // Doubles each input and outputs it, forever.
    let program = Program::from(vec![3, 20, 1002, 20, 2, 20, 4, 20, 1105, 1, 0]);
    let mut vm = VM::with_config(VmConfig::coroutine());
    vm.load(&program);
    let root = vm.snapshot().unwrap();

    let mut seen = Vec::new();
    for branch in 1..=4 {
        vm.restore(&root).unwrap();
        vm.push_input(branch);
        seen.push(vm.run().unwrap().yielded().cloned());
    }
    assert_eq!(
        seen,
        vec![Some(word(2)), Some(word(4)), Some(word(6)), Some(word(8))]
    );
}

#[test]
fn e2e_snapshot_serializes() {
    let mut vm = VM::new();
    vm.load(&Program::from(vec![3, 0, 99]));
    vm.push_input(7);
    vm.run().unwrap();
    let snap = vm.snapshot().unwrap();
    let json = serde_json::to_string(&snap).unwrap();
    let back: intcode_vm::snapshot::Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
