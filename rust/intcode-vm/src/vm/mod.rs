//! Fetch-decode-execute engine.
//!
//! A [`VM`] runs one loaded [`Program`] until it halts, suspends or faults.
//! Suspension points are explicit: `run()` returns a [`RunResult`] whose
//! [`Status`] tells the caller whether the engine halted, yielded an output,
//! or ran dry on non-blocking input. Schedulers poll that status to decide
//! which engine runs next.

mod ops;

use crate::decode::{decode, Opcode};
use crate::io::{InputMode, IoChannel};
use crate::memory::Memory;
use crate::program::Program;
use crate::values::{Address, Word};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Type alias for debug callback to simplify type signatures
pub type DebugCallback = Option<Box<dyn FnMut(&DebugEvent)>>;

/// Debug events emitted during execution.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugEvent {
    /// An instruction is about to execute.
    Step { pc: Address, opcode: Opcode },
    /// A value was taken from the input queue (or the `-1` sentinel).
    Input { pc: Address, value: Word },
    /// A value was written to the output sink.
    Output { pc: Address, value: Word },
    Halt { pc: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VmError {
    #[error("invalid opcode {opcode} at pc {pc}")]
    InvalidOpcode { opcode: Word, pc: Address },
    #[error("invalid mode {mode} for parameter {param} at pc {pc}")]
    InvalidMode { mode: u8, param: usize, pc: Address },
    #[error("invalid address {address} at pc {pc}")]
    InvalidAddress { address: Word, pc: Address },
    #[error("destination parameter in immediate mode at pc {pc}")]
    WriteToImmediate { pc: Address },
    #[error("input queue empty at pc {pc} in blocking mode")]
    InputUnderflow { pc: Address },
    #[error("snapshot taken from image {found}, engine holds image {expected}")]
    SnapshotMismatch { expected: String, found: String },
    #[error("instruction limit exceeded: {0}")]
    InstructionLimitExceeded(u64),
    #[error("no program loaded")]
    NoProgram,
}

impl VmError {
    /// Program counter of the faulting instruction, when there is one.
    pub fn pc(&self) -> Option<Address> {
        match self {
            VmError::InvalidOpcode { pc, .. }
            | VmError::InvalidMode { pc, .. }
            | VmError::InvalidAddress { pc, .. }
            | VmError::WriteToImmediate { pc }
            | VmError::InputUnderflow { pc } => Some(*pc),
            _ => None,
        }
    }

    pub fn is_invalid_opcode(&self) -> bool {
        matches!(self, VmError::InvalidOpcode { .. })
    }

    pub fn is_invalid_address(&self) -> bool {
        matches!(self, VmError::InvalidAddress { .. })
    }

    pub fn is_write_to_immediate(&self) -> bool {
        matches!(self, VmError::WriteToImmediate { .. })
    }

    pub fn is_input_underflow(&self) -> bool {
        matches!(self, VmError::InputUnderflow { .. })
    }

    pub fn is_snapshot_mismatch(&self) -> bool {
        matches!(self, VmError::SnapshotMismatch { .. })
    }

    pub fn is_instruction_limit_exceeded(&self) -> bool {
        matches!(self, VmError::InstructionLimitExceeded(_))
    }
}

/// Engine state as observed between `run()` calls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Loaded or reset, not yet run.
    #[default]
    Ready,
    /// Only observable from inside `run()`.
    Running,
    Halted,
    /// Non-blocking input found the queue empty and delivered `-1`.
    AwaitingInput,
    /// Yield-on-output mode produced a value.
    YieldedOutput,
    Faulted(VmError),
}

impl Status {
    pub fn is_halted(&self) -> bool {
        matches!(self, Status::Halted)
    }

    /// The engine stopped but can be run again.
    pub fn is_suspended(&self) -> bool {
        matches!(self, Status::AwaitingInput | Status::YieldedOutput)
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Status::Faulted(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::Running => write!(f, "running"),
            Status::Halted => write!(f, "halted"),
            Status::AwaitingInput => write!(f, "awaiting input"),
            Status::YieldedOutput => write!(f, "yielded output"),
            Status::Faulted(err) => write!(f, "faulted: {}", err),
        }
    }
}

/// Outcome of one `run()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: Status,
    /// Outputs produced since the previous `run()` call.
    pub outputs: Vec<Word>,
}

impl RunResult {
    pub fn is_halted(&self) -> bool {
        self.status.is_halted()
    }

    /// The value produced by a yield-on-output suspension.
    pub fn yielded(&self) -> Option<&Word> {
        match self.status {
            Status::YieldedOutput => self.outputs.last(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Suspend after every `Output` instruction.
    pub yield_on_output: bool,
    pub input_mode: InputMode,
    /// Maximum instructions per `run()` call.
    pub instruction_limit: Option<u64>,
}

impl VmConfig {
    /// Yield on every output, fault on empty input: one pipeline stage.
    pub fn coroutine() -> Self {
        Self {
            yield_on_output: true,
            input_mode: InputMode::Blocking,
            instruction_limit: None,
        }
    }

    /// Yield on every output, poll input with a `-1` sentinel: one network node.
    pub fn polling() -> Self {
        Self {
            yield_on_output: true,
            input_mode: InputMode::NonBlocking,
            instruction_limit: None,
        }
    }
}

/// The Intcode engine.
pub struct VM {
    pub(crate) program: Option<Program>,
    pub(crate) memory: Memory,
    pub(crate) pc: Address,
    pub(crate) relative_base: Word,
    pub(crate) io: IoChannel,
    pub(crate) status: Status,
    pub(crate) config: VmConfig,
    pub(crate) instruction_count: u64,
    pub(crate) total_instructions: u64,
    /// Optional debug callback for step-through debugging
    pub debug_callback: DebugCallback,
}

impl VM {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            program: None,
            memory: Memory::empty(),
            pc: 0,
            relative_base: Word::default(),
            io: IoChannel::new(),
            status: Status::Ready,
            config,
            instruction_count: 0,
            total_instructions: 0,
            debug_callback: None,
        }
    }

    /// Build an engine and load `program` into it.
    pub fn from_program(program: &Program, config: VmConfig) -> Self {
        let mut vm = Self::with_config(config);
        vm.load(program);
        vm
    }

    /// Load a program image, discarding all previous state.
    ///
    /// The image becomes the baseline that [`VM::reset`] returns to and that
    /// snapshots are diffed against.
    pub fn load(&mut self, program: &Program) {
        self.memory = Memory::new(program.shared_words());
        self.program = Some(program.clone());
        self.pc = 0;
        self.relative_base = Word::default();
        self.io.clear();
        self.status = Status::Ready;
        self.instruction_count = 0;
        self.total_instructions = 0;
        debug!(
            words = program.len(),
            image = &program.fingerprint()[..12],
            "loaded program"
        );
    }

    /// Return to the loaded image without reloading it. Pending input and
    /// unread output are dropped.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.pc = 0;
        self.relative_base = Word::default();
        self.io.clear();
        self.status = Status::Ready;
        self.instruction_count = 0;
        self.total_instructions = 0;
        debug!("reset to loaded image");
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VmConfig) {
        self.config = config;
    }

    pub fn set_yield_on_output(&mut self, yield_on_output: bool) {
        self.config.yield_on_output = yield_on_output;
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.config.input_mode = mode;
    }

    pub fn set_instruction_limit(&mut self, limit: u64) {
        self.config.instruction_limit = Some(limit);
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_halted(&self) -> bool {
        self.status.is_halted()
    }

    pub fn program_counter(&self) -> Address {
        self.pc
    }

    pub fn relative_base(&self) -> &Word {
        &self.relative_base
    }

    /// Instructions executed since load or reset.
    pub fn instructions_executed(&self) -> u64 {
        self.total_instructions
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_at(&self, addr: Address) -> &Word {
        self.memory.read(addr)
    }

    /// Patch a memory cell, e.g. to set program parameters before a run.
    pub fn set_memory(&mut self, addr: Address, value: Word) {
        self.memory.write(addr, value);
    }

    pub fn io(&self) -> &IoChannel {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IoChannel {
        &mut self.io
    }

    pub fn push_input(&mut self, value: impl Into<Word>) {
        self.io.push_input(value.into());
    }

    pub fn push_ascii(&mut self, text: &str) {
        self.io.push_ascii(text);
    }

    fn emit_debug_event(&mut self, event: DebugEvent) {
        if let Some(ref mut cb) = self.debug_callback {
            cb(&event);
        }
    }

    /// Execute until the program halts or suspends.
    ///
    /// Running a halted engine is a no-op that reports `Halted` again; a
    /// faulted engine keeps returning its fault until it is reloaded, reset
    /// or restored.
    ///
    /// On a fault, outputs produced earlier in the same call are not part of
    /// the error. They stay queued; drain them with
    /// `io_mut().take_output()`.
    pub fn run(&mut self) -> Result<RunResult, VmError> {
        match &self.status {
            Status::Faulted(err) => return Err(err.clone()),
            Status::Halted => {
                return Ok(RunResult {
                    status: Status::Halted,
                    outputs: self.io.take_output(),
                })
            }
            _ => {}
        }
        if self.program.is_none() {
            return Err(VmError::NoProgram);
        }

        self.status = Status::Running;
        self.instruction_count = 0;
        let outcome = loop {
            match self.step() {
                Ok(None) => continue,
                Ok(Some(status)) => break Ok(status),
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(status) => {
                debug!(pc = self.pc, %status, executed = self.instruction_count, "run suspended");
                self.status = status.clone();
                Ok(RunResult {
                    status,
                    outputs: self.io.take_output(),
                })
            }
            Err(err) => {
                debug!(pc = self.pc, error = %err, "run faulted");
                self.status = Status::Faulted(err.clone());
                Err(err)
            }
        }
    }

    /// Execute one instruction. Returns the status to report when the
    /// instruction suspends the run.
    fn step(&mut self) -> Result<Option<Status>, VmError> {
        if let Some(limit) = self.config.instruction_limit {
            if self.instruction_count >= limit {
                return Err(VmError::InstructionLimitExceeded(limit));
            }
        }

        let pc = self.pc;
        let ins = decode(self.memory.read(pc), pc)?;
        self.instruction_count += 1;
        self.total_instructions += 1;
        trace!(pc, opcode = %ins.opcode, modes = ?ins.modes, "step");
        self.emit_debug_event(DebugEvent::Step {
            pc,
            opcode: ins.opcode,
        });

        match ins.opcode {
            Opcode::Add | Opcode::Mul => {
                let lhs = self.param(&ins, 1)?;
                let rhs = self.param(&ins, 2)?;
                let result = ops::arith(ins.opcode, lhs, rhs);
                self.store(&ins, 3, result)?;
                self.advance(&ins)?;
            }
            Opcode::LessThan | Opcode::Equals => {
                let lhs = self.param(&ins, 1)?;
                let rhs = self.param(&ins, 2)?;
                let result = ops::compare(ins.opcode, &lhs, &rhs);
                self.store(&ins, 3, result)?;
                self.advance(&ins)?;
            }
            Opcode::Input => {
                let dest = self.destination(&ins, 1)?;
                match self.io.pop_input() {
                    Some(value) => {
                        self.emit_debug_event(DebugEvent::Input {
                            pc,
                            value: value.clone(),
                        });
                        self.memory.write(dest, value);
                        self.advance(&ins)?;
                    }
                    None => match self.config.input_mode {
                        InputMode::Blocking => return Err(VmError::InputUnderflow { pc }),
                        InputMode::NonBlocking => {
                            let sentinel = crate::values::no_input_sentinel();
                            self.emit_debug_event(DebugEvent::Input {
                                pc,
                                value: sentinel.clone(),
                            });
                            self.memory.write(dest, sentinel);
                            self.advance(&ins)?;
                            return Ok(Some(Status::AwaitingInput));
                        }
                    },
                }
            }
            Opcode::Output => {
                let value = self.param(&ins, 1)?;
                self.emit_debug_event(DebugEvent::Output {
                    pc,
                    value: value.clone(),
                });
                self.io.push_output(value);
                self.advance(&ins)?;
                if self.config.yield_on_output {
                    return Ok(Some(Status::YieldedOutput));
                }
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let cond = self.param(&ins, 1)?;
                if ops::jump_taken(ins.opcode, &cond) {
                    let target = self.param(&ins, 2)?;
                    self.pc = self.to_address(target)?;
                } else {
                    self.advance(&ins)?;
                }
            }
            Opcode::AdjustRelativeBase => {
                let delta = self.param(&ins, 1)?;
                self.relative_base += delta;
                self.advance(&ins)?;
            }
            Opcode::Halt => {
                self.emit_debug_event(DebugEvent::Halt { pc });
                return Ok(Some(Status::Halted));
            }
        }
        Ok(None)
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("program", &self.program)
            .field("pc", &self.pc)
            .field("relative_base", &self.relative_base)
            .field("status", &self.status)
            .field("pending_input", &self.io.pending_input())
            .field("touched", &self.memory.touched())
            .finish()
    }
}
