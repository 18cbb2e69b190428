//! Diff-based engine snapshots for backtracking search.
//!
//! A [`Snapshot`] records the registers and only those memory cells whose
//! value differs from the loaded image, so taking one costs O(modified
//! cells). Search code snapshots before each speculative move and restores
//! to try the next branch instead of writing undo logic.
//!
//! Pending input and unread output are not part of a snapshot; push fresh
//! input after restoring.

use crate::values::{Address, Word};
use crate::vm::{Status, VmError, VM};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Fingerprint of the image the diffs are relative to.
    pub image: String,
    pub program_counter: Address,
    pub relative_base: Word,
    pub status: Status,
    /// Cells that differ from the image, sorted by address.
    pub diffs: Vec<(Address, Word)>,
}

impl Snapshot {
    /// Number of memory cells carried by the snapshot.
    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }
}

impl VM {
    /// Capture the current engine state as a diff against the loaded image.
    pub fn snapshot(&self) -> Result<Snapshot, VmError> {
        let program = self.program.as_ref().ok_or(VmError::NoProgram)?;
        Ok(Snapshot {
            image: program.fingerprint().to_string(),
            program_counter: self.pc,
            relative_base: self.relative_base.clone(),
            status: self.status.clone(),
            diffs: self.memory.diff_against_image(),
        })
    }

    /// Roll the engine back to `snapshot`.
    ///
    /// Fails with [`VmError::SnapshotMismatch`] when the snapshot was taken
    /// from a different program image; the engine is left untouched then.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), VmError> {
        let expected = match &self.program {
            Some(program) => program.fingerprint(),
            None => "<none>",
        };
        if expected != snapshot.image {
            return Err(VmError::SnapshotMismatch {
                expected: expected.to_string(),
                found: snapshot.image.clone(),
            });
        }

        self.memory.reset();
        for (addr, value) in &snapshot.diffs {
            self.memory.write(*addr, value.clone());
        }
        self.pc = snapshot.program_counter;
        self.relative_base = snapshot.relative_base.clone();
        self.status = snapshot.status.clone();
        debug!(
            pc = self.pc,
            cells = snapshot.diffs.len(),
            "restored snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use crate::values::word;
    use crate::vm::VmConfig;

    #[test]
    fn test_snapshot_of_fresh_engine_is_empty() {
        let vm = VM::from_program(&Program::from(vec![3, 0, 99]), VmConfig::default());
        let snap = vm.snapshot().unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.program_counter, 0);
        assert_eq!(snap.status, Status::Ready);
    }

    #[test]
    fn test_snapshot_holds_only_changed_cells() {
        // Write 7 to cell 10, then write the image value back into cell 0.
        let mut vm = VM::from_program(
            &Program::from(vec![1101, 3, 4, 10, 1101, 1101, 0, 0, 99]),
            VmConfig::default(),
        );
        vm.run().unwrap();
        let snap = vm.snapshot().unwrap();
        assert_eq!(snap.diffs, vec![(10, word(7))]);
    }

    #[test]
    fn test_snapshot_without_program() {
        assert_eq!(VM::new().snapshot().unwrap_err(), VmError::NoProgram);
    }

    #[test]
    fn test_restore_rejects_foreign_snapshot() {
        let a = VM::from_program(&Program::from(vec![99]), VmConfig::default());
        let mut b = VM::from_program(&Program::from(vec![104, 1, 99]), VmConfig::default());
        let err = b.restore(&a.snapshot().unwrap()).unwrap_err();
        assert!(err.is_snapshot_mismatch());
        assert_eq!(b.program_counter(), 0);
    }

    #[test]
    fn test_restore_rolls_back_memory_and_registers() {
        // in -> [20]; arb +5; out [20]; jump back to 0.
        let program = Program::from(vec![3, 20, 109, 5, 4, 20, 1105, 1, 0]);
        let mut vm = VM::from_program(&program, VmConfig::coroutine());
        vm.push_input(11);
        assert_eq!(vm.run().unwrap().yielded(), Some(&word(11)));
        let snap = vm.snapshot().unwrap();

        vm.push_input(22);
        assert_eq!(vm.run().unwrap().yielded(), Some(&word(22)));
        assert_eq!(vm.relative_base(), &word(10));

        vm.restore(&snap).unwrap();
        assert_eq!(vm.memory_at(20), &word(11));
        assert_eq!(vm.relative_base(), &word(5));
        assert_eq!(vm.program_counter(), 6);
        assert_eq!(vm.status(), &Status::YieldedOutput);

        vm.push_input(33);
        assert_eq!(vm.run().unwrap().yielded(), Some(&word(33)));
    }
}
