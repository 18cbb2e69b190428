//! Instruction decoding: opcode and per-parameter addressing modes.

use crate::values::{Address, Word};
use crate::vm::VmError;
use num_traits::{Signed, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Mul,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustRelativeBase,
    Halt,
}

impl Opcode {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Mul,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustRelativeBase,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            Opcode::Add => 1,
            Opcode::Mul => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustRelativeBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction word.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustRelativeBase => 1,
            Opcode::Halt => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::Input => "in",
            Opcode::Output => "out",
            Opcode::JumpIfTrue => "jt",
            Opcode::JumpIfFalse => "jf",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::AdjustRelativeBase => "arb",
            Opcode::Halt => "halt",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Addressing discipline for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// The parameter is an address.
    #[default]
    Position,
    /// The parameter is the value itself. Never valid for a destination.
    Immediate,
    /// The parameter is an offset from the relative base.
    Relative,
}

impl Mode {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; 3],
}

impl Instruction {
    /// Words occupied by the instruction including its parameters.
    pub fn width(&self) -> u64 {
        1 + self.opcode.arity() as u64
    }

    /// Mode of the 1-indexed parameter `n`.
    pub fn mode(&self, n: usize) -> Mode {
        self.modes[n - 1]
    }
}

/// Decode the instruction word found at `pc`.
///
/// The low two decimal digits select the opcode, the digit at `10^(i+1)`
/// selects the mode of parameter `i`. Modes are only validated for the
/// parameters the opcode actually has.
pub fn decode(word: &Word, pc: Address) -> Result<Instruction, VmError> {
    let invalid_opcode = || VmError::InvalidOpcode {
        opcode: word.clone(),
        pc,
    };
    if word.is_negative() {
        return Err(invalid_opcode());
    }
    let hundred = Word::from(100);
    let ten = Word::from(10);

    let code = (word % &hundred).to_u8().ok_or_else(invalid_opcode)?;
    let opcode = Opcode::from_code(code).ok_or_else(invalid_opcode)?;

    let mut modes = [Mode::Position; 3];
    let mut rest = word / &hundred;
    for (i, slot) in modes.iter_mut().enumerate().take(opcode.arity()) {
        let digit = (&rest % &ten).to_u8().unwrap_or(u8::MAX);
        *slot = Mode::from_digit(digit).ok_or(VmError::InvalidMode {
            mode: digit,
            param: i + 1,
            pc,
        })?;
        rest /= &ten;
    }
    Ok(Instruction { opcode, modes })
}
