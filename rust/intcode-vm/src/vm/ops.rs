//! Operand resolution and arithmetic for the VM.

use super::{VmError, VM};
use crate::decode::{Instruction, Mode, Opcode};
use crate::values::{to_address, Address, Word};
use num_traits::{One, Zero};

impl VM {
    /// `pc + offset`, or `InvalidAddress` past the top of the address space.
    fn offset_pc(&self, offset: u64) -> Result<Address, VmError> {
        self.pc
            .checked_add(offset)
            .ok_or_else(|| VmError::InvalidAddress {
                address: Word::from(self.pc) + offset,
                pc: self.pc,
            })
    }

    /// Raw parameter word `n` (1-indexed) of the current instruction.
    fn raw_param(&self, n: usize) -> Result<Word, VmError> {
        let addr = self.offset_pc(n as u64)?;
        Ok(self.memory.read(addr).clone())
    }

    pub(super) fn to_address(&self, address: Word) -> Result<Address, VmError> {
        to_address(&address).ok_or(VmError::InvalidAddress {
            address,
            pc: self.pc,
        })
    }

    /// Resolve parameter `n` to the value it denotes.
    pub(super) fn param(&self, ins: &Instruction, n: usize) -> Result<Word, VmError> {
        let raw = self.raw_param(n)?;
        match ins.mode(n) {
            Mode::Immediate => Ok(raw),
            Mode::Position => Ok(self.memory.read(self.to_address(raw)?).clone()),
            Mode::Relative => {
                let addr = self.to_address(raw + &self.relative_base)?;
                Ok(self.memory.read(addr).clone())
            }
        }
    }

    /// Resolve parameter `n` as a write destination.
    pub(super) fn destination(&self, ins: &Instruction, n: usize) -> Result<Address, VmError> {
        let raw = self.raw_param(n)?;
        match ins.mode(n) {
            Mode::Immediate => Err(VmError::WriteToImmediate { pc: self.pc }),
            Mode::Position => self.to_address(raw),
            Mode::Relative => self.to_address(raw + &self.relative_base),
        }
    }

    pub(super) fn store(&mut self, ins: &Instruction, n: usize, value: Word) -> Result<(), VmError> {
        let dest = self.destination(ins, n)?;
        self.memory.write(dest, value);
        Ok(())
    }

    pub(super) fn advance(&mut self, ins: &Instruction) -> Result<(), VmError> {
        self.pc = self.offset_pc(ins.width())?;
        Ok(())
    }
}

pub(super) fn arith(op: Opcode, lhs: Word, rhs: Word) -> Word {
    match op {
        Opcode::Add => lhs + rhs,
        Opcode::Mul => lhs * rhs,
        _ => unreachable!("arith called with {:?}", op),
    }
}

pub(super) fn compare(op: Opcode, lhs: &Word, rhs: &Word) -> Word {
    let holds = match op {
        Opcode::LessThan => lhs < rhs,
        Opcode::Equals => lhs == rhs,
        _ => unreachable!("compare called with {:?}", op),
    };
    if holds {
        Word::one()
    } else {
        Word::zero()
    }
}

pub(super) fn jump_taken(op: Opcode, cond: &Word) -> bool {
    match op {
        Opcode::JumpIfTrue => !cond.is_zero(),
        Opcode::JumpIfFalse => cond.is_zero(),
        _ => unreachable!("jump_taken called with {:?}", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::word;

    #[test]
    fn test_arith_is_exact() {
        let big = word(34_915_192);
        let product = arith(Opcode::Mul, big.clone(), big);
        assert_eq!(product.to_string(), "1219070632396864");
        let huge = arith(Opcode::Mul, product.clone(), product);
        assert_eq!(huge.to_string(), "1486133206772489918753597034496");
    }

    #[test]
    fn test_compare_stores_one_or_zero() {
        assert_eq!(compare(Opcode::LessThan, &word(-5), &word(3)), word(1));
        assert_eq!(compare(Opcode::LessThan, &word(3), &word(3)), word(0));
        assert_eq!(compare(Opcode::Equals, &word(3), &word(3)), word(1));
    }

    #[test]
    fn test_jump_conditions() {
        assert!(jump_taken(Opcode::JumpIfTrue, &word(-1)));
        assert!(!jump_taken(Opcode::JumpIfTrue, &word(0)));
        assert!(jump_taken(Opcode::JumpIfFalse, &word(0)));
    }
}
