//! Cooperative scheduling disciplines built on [`VM::run`].
//!
//! Nothing here runs in parallel: exactly one engine steps at a time and
//! engines only communicate through values the scheduler moves between
//! their I/O channels.
//!
//! - [`run_to_halt`]: batch computation, intermediate suspensions ignored.
//! - [`Pipeline`]: engines chained output-to-input, optionally in a ring.
//! - [`Network`]: addressed engines exchanging packets, polled round-robin.

mod network;
mod pipeline;

pub use network::{FirstPacket, IdleAction, Nat, Network, NetworkMonitor, Packet, RoundReport};
pub use pipeline::Pipeline;

use crate::values::Word;
use crate::vm::{Status, VmError, VM};

/// Run `vm` until it halts and return every output it produced.
///
/// Output suspensions are resumed transparently. Running dry on
/// non-blocking input would spin forever, so it is reported as
/// [`VmError::InputUnderflow`].
pub fn run_to_halt(vm: &mut VM) -> Result<Vec<Word>, VmError> {
    let mut outputs = Vec::new();
    loop {
        let result = vm.run()?;
        outputs.extend(result.outputs);
        match result.status {
            Status::Halted => return Ok(outputs),
            Status::AwaitingInput => {
                return Err(VmError::InputUnderflow {
                    pc: vm.program_counter().saturating_sub(2),
                })
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use crate::values::word;
    use crate::vm::VmConfig;

    #[test]
    fn test_run_to_halt_collects_yielded_outputs() {
        let mut vm = VM::from_program(&Program::from(vec![104, 1, 104, 2, 99]), VmConfig::coroutine());
        assert_eq!(run_to_halt(&mut vm).unwrap(), vec![word(1), word(2)]);
    }

    #[test]
    fn test_run_to_halt_reports_polling_underflow() {
        let mut vm = VM::from_program(&Program::from(vec![3, 0, 99]), VmConfig::polling());
        let err = run_to_halt(&mut vm).unwrap_err();
        assert_eq!(err, VmError::InputUnderflow { pc: 0 });
    }
}
