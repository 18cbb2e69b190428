//! Chained engines: each stage's output is the next stage's input.

use crate::program::Program;
use crate::values::Word;
use crate::vm::{Status, VmConfig, VmError, VM};
use tracing::debug;

/// A chain of engines running the same program in yield-on-output mode.
///
/// Each stage is seeded with its phase setting as its first input. A signal
/// is then passed stage to stage, one output per turn, strictly
/// round-robin. With feedback enabled the last stage feeds the first and the
/// chain cycles until some stage halts.
pub struct Pipeline {
    stages: Vec<VM>,
    feedback: bool,
}

impl Pipeline {
    pub fn new(program: &Program, phases: &[Word]) -> Self {
        let stages = phases
            .iter()
            .map(|phase| {
                let mut vm = VM::from_program(program, VmConfig::coroutine());
                vm.push_input(phase.clone());
                vm
            })
            .collect();
        Self {
            stages,
            feedback: false,
        }
    }

    /// Connect the last stage back to the first.
    pub fn with_feedback(mut self, feedback: bool) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn set_instruction_limit(&mut self, limit: u64) {
        for stage in &mut self.stages {
            stage.set_instruction_limit(limit);
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[VM] {
        &self.stages
    }

    /// Feed `initial` into the first stage and drive the chain.
    ///
    /// Returns the last output produced before the run ended: after one
    /// pass for an open chain, or when any stage halts for a ring.
    pub fn run(&mut self, initial: Word) -> Result<Word, VmError> {
        if self.stages.is_empty() {
            return Ok(initial);
        }
        let mut signal = initial;
        let mut pass = 0u64;
        loop {
            for (k, stage) in self.stages.iter_mut().enumerate() {
                stage.push_input(signal.clone());
                let result = stage.run()?;
                match result.status {
                    Status::YieldedOutput => {
                        if let Some(value) = result.outputs.into_iter().last() {
                            signal = value;
                        }
                    }
                    Status::Halted => {
                        debug!(stage = k, pass, "pipeline stage halted");
                        return Ok(signal);
                    }
                    _ => {}
                }
            }
            pass += 1;
            if !self.feedback {
                return Ok(signal);
            }
        }
    }
}
