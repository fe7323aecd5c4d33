//! Execution state of a single machine: the instruction pointer, the relative base, and
//! whether the machine is running, waiting for input, or halted.

use std::fmt::{Display, Formatter};

use crate::address::Address;
use crate::Value;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
  Running,
  /// Suspended on an input instruction that has not executed yet.
  AwaitingInput,
  /// Terminal. Only reached through the halt opcode.
  Halted
}

impl Display for Status {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Status::Running       => write!(f, "Running"),
      Status::AwaitingInput => write!(f, "Awaiting input"),
      Status::Halted        => write!(f, "Halted")
    }
  }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct State {
  pub pointer       : Address,
  pub relative_base : Value,
  pub status        : Status
}

impl State {
  pub fn new() -> State {
    State {
      pointer       : Address(0),
      relative_base : 0,
      status        : Status::Running
    }
  }

  pub fn is_halted(&self) -> bool {
    self.status == Status::Halted
  }
}

impl Default for State {
  fn default() -> State {
    State::new()
  }
}
