/*!

  An Intcode instruction is a single memory word followed by its parameters. The low two
  decimal digits of the word are the opcode. The remaining digits, read from least to most
  significant, give the addressing mode of the first, second, and third parameter. Digits
  that are not present are leading zeros, i.e. position mode.

  ```text
  word = 1002  ->  opcode 02, modes [position, immediate, position]
  ```

  Instructions are never cached. Code and data share the same memory, and programs rewrite
  their own instructions, so the word at the instruction pointer is decoded afresh on every
  step.

  Only the opcode and the modes are decoded here. Parameter values are resolved against
  memory and the relative base at the moment the instruction executes (see
  `resolve_read` and `resolve_write_address`).

*/

mod disassembly;
mod instruction;

pub use disassembly::disassemble;
pub use instruction::{Instruction, resolve_read, resolve_write_address};

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/// Opcodes of the virtual machine. The discriminant is the opcode's value in the low two
/// decimal digits of an instruction word.
#[derive(
StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,    Debug,          Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "add")]
  Add                = 1,   // add( a, b, dst )
  #[strum(serialize = "mul")]
  Multiply           = 2,   // mul( a, b, dst )
  #[strum(serialize = "in")]
  Input              = 3,   // in( dst )
  #[strum(serialize = "out")]
  Output             = 4,   // out( a )
  #[strum(serialize = "jnz")]
  JumpIfTrue         = 5,   // jnz( a, target )
  #[strum(serialize = "jz")]
  JumpIfFalse        = 6,   // jz( a, target )
  #[strum(serialize = "lt")]
  LessThan           = 7,   // lt( a, b, dst )
  #[strum(serialize = "eq")]
  Equals             = 8,   // eq( a, b, dst )
  #[strum(serialize = "arb")]
  AdjustRelativeBase = 9,   // arb( a )
  #[strum(serialize = "halt")]
  Halt               = 99,  // halt
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn name(&self) -> &'static str {
    self.into()
  }

  /// Number of parameters following the instruction word.
  pub fn arity(&self) -> usize {
    match self {
      | Opcode::Add
      | Opcode::Multiply
      | Opcode::LessThan
      | Opcode::Equals             => 3,

      | Opcode::JumpIfTrue
      | Opcode::JumpIfFalse        => 2,

      | Opcode::Input
      | Opcode::Output
      | Opcode::AdjustRelativeBase => 1,

      Opcode::Halt                 => 0,
    }
  }

  /// Whether the final parameter is an address that the instruction writes to.
  pub fn writes_memory(&self) -> bool {
    match self {
      | Opcode::Add
      | Opcode::Multiply
      | Opcode::Input
      | Opcode::LessThan
      | Opcode::Equals => true,
      _                => false
    }
  }
}

/// Addressing modes of a parameter, numbered by their digit in the instruction word.
#[derive(
StrumDisplay, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,             Eq, PartialEq, Debug, Hash
)]
#[repr(u8)]
pub enum Mode {
  /// The parameter is an address.
  #[strum(serialize = "position")]
  Position  = 0,
  /// The parameter is the value itself. Never valid for a write target.
  #[strum(serialize = "immediate")]
  Immediate = 1,
  /// The parameter is an offset from the relative base.
  #[strum(serialize = "relative")]
  Relative  = 2,
}
