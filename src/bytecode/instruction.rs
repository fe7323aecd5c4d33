use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use super::{Mode, Opcode};
use crate::address::Address;
use crate::error::IntcodeError;
use crate::memory::Memory;
use crate::state::State;
use crate::Value;

/// Place values of the mode digits of the first, second, and third parameter.
const MODE_DIVISORS: [Value; 3] = [100, 1_000, 10_000];

/// The decoded form of an instruction word. Holds no parameter values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode : Opcode,
  pub modes  : [Mode; 3]
}

impl Instruction {

  /**
    Decodes the instruction word found at `address`. The address is only used to report
    errors.

    Only the mode digits of parameters the opcode takes are read. Any higher digits are
    ignored, and the modes of absent parameters are `Position`.
  */
  pub fn decode(word: Value, address: usize) -> Result<Instruction, IntcodeError> {
    let unknown_opcode = IntcodeError::UnknownOpcode { opcode: word, address };
    if word < 0 {
      return Err(unknown_opcode);
    }

    let opcode =
      u8::try_from(word % 100)
        .ok()
        .and_then(|code| Opcode::try_from(code).ok())
        .ok_or(unknown_opcode)?;

    let mut modes = [Mode::Position; 3];
    let used = modes.iter_mut().zip(MODE_DIVISORS.iter()).take(opcode.arity());
    for (mode, divisor) in used {
      let digit = (word / divisor) % 10;
      *mode = Mode::try_from(digit as u8).map_err(|_| {
        IntcodeError::UnknownMode { mode: digit, word, address }
      })?;
    }

    Ok(Instruction { opcode, modes })
  }

  /// Mode of the 1-based parameter `n`.
  pub fn mode(&self, n: usize) -> Mode {
    self.modes[n - 1]
  }

  /// Size in words of the instruction, including the instruction word.
  pub fn size(&self) -> usize {
    1 + self.opcode.arity()
  }

  /// Renders the instruction with its raw parameters, e.g. `add [4], 3 -> [4]`.
  pub fn render(&self, parameters: &[Value]) -> String {
    let arity = self.opcode.arity();
    let rendered: Vec<String> =
      parameters
        .iter()
        .take(arity)
        .enumerate()
        .map(|(i, raw)| render_parameter(*raw, self.modes[i]))
        .collect();

    match (self.opcode.writes_memory(), rendered.split_last()) {
      (_, None)                     => format!("{}", self.opcode),
      (true, Some((dst, [])))       => format!("{} -> {}", self.opcode, dst),
      (true, Some((dst, sources)))  => format!("{} {} -> {}", self.opcode, sources.join(", "), dst),
      (false, Some(_))              => format!("{} {}", self.opcode, rendered.join(", ")),
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let modes: Vec<String> =
      self.modes
          .iter()
          .take(self.opcode.arity())
          .map(|m| m.to_string())
          .collect();
    write!(f, "{}({})", self.opcode, modes.join(", "))
  }
}

fn render_parameter(raw: Value, mode: Mode) -> String {
  match mode {
    Mode::Position  => format!("[{}]", raw),
    Mode::Immediate => format!("{}", raw),
    Mode::Relative  => format!("[rb{:+}]", raw)
  }
}

fn relative_address(state: &State, raw: Value) -> Result<Value, IntcodeError> {
  state.relative_base.checked_add(raw).ok_or(IntcodeError::Overflow {
    opcode  : "relative addressing",
    address : state.pointer.idx()
  })
}

/// The value a read parameter denotes, resolved against the current relative base.
pub fn resolve_read(memory: &mut Memory, state: &State, raw: Value, mode: Mode)
  -> Result<Value, IntcodeError>
{
  match mode {
    Mode::Position  => memory.read(raw),
    Mode::Immediate => Ok(raw),
    Mode::Relative  => memory.read(relative_address(state, raw)?)
  }
}

/// The address a write parameter denotes. Immediate mode is rejected rather than being
/// treated as position mode.
pub fn resolve_write_address(state: &State, raw: Value, mode: Mode)
  -> Result<Address, IntcodeError>
{
  match mode {
    Mode::Position  => Address::try_from_value(raw),
    Mode::Relative  => Address::try_from_value(relative_address(state, raw)?),
    Mode::Immediate => Err(IntcodeError::ImmediateWrite { address: state.pointer.idx() })
  }
}
