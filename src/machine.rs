//! The Intcode execution engine.
//!
//! A `Machine` owns its memory, its execution state, and a queue of pending input values.
//! It is driven one instruction at a time by `step`, which reports one of four outcomes:
//!
//! ```text
//!   Continue          the instruction executed, keep stepping
//!   NeedsInput        an input instruction found the queue empty; nothing was changed
//!   ProducedOutput(v) an output instruction executed and emitted v
//!   Halted            the machine is halted; stepping again changes nothing
//! ```
//!
//! Suspension is therefore just a return to the caller. On `NeedsInput` the pointer still
//! addresses the input instruction, so once a value has been queued the next `step` executes
//! that same instruction. No instruction ever runs twice and none is skipped.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::address::Address;
use crate::bytecode::{resolve_read, resolve_write_address, Instruction, Opcode};
use crate::error::IntcodeError;
use crate::io::{InputSource, OutputSink};
use crate::memory::Memory;
use crate::state::{State, Status};
use crate::Value;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Step {
  Continue,
  NeedsInput,
  ProducedOutput(Value),
  Halted
}

#[derive(Clone, Debug)]
pub struct Machine {
  memory : Memory,
  state  : State,
  input  : VecDeque<Value>
}

impl Machine {

  // region Construction and inspection

  pub fn new(image: Vec<Value>) -> Machine {
    Machine {
      memory : Memory::new(image),
      state  : State::new(),
      input  : VecDeque::new()
    }
  }

  /// Replaces memory with a new image and resets registers and pending input.
  pub fn load(&mut self, image: Vec<Value>) {
    self.memory = Memory::new(image);
    self.state  = State::new();
    self.input.clear();
  }

  pub fn is_halted(&self) -> bool {
    self.state.is_halted()
  }

  pub fn status(&self) -> Status {
    self.state.status
  }

  pub fn pointer(&self) -> usize {
    self.state.pointer.idx()
  }

  pub fn relative_base(&self) -> Value {
    self.state.relative_base
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  /// Reads memory directly, growing it like any other read.
  pub fn peek(&mut self, address: Value) -> Result<Value, IntcodeError> {
    self.memory.read(address)
  }

  /// Writes memory directly, e.g. to patch a program before running it.
  pub fn poke(&mut self, address: Value, value: Value) -> Result<(), IntcodeError> {
    self.memory.write(address, value)
  }

  pub fn push_input(&mut self, value: Value) {
    self.input.push_back(value);
  }

  pub fn extend_input<I: IntoIterator<Item = Value>>(&mut self, values: I) {
    self.input.extend(values);
  }

  /// Number of queued input values not yet consumed.
  pub fn pending_input(&self) -> usize {
    self.input.len()
  }

  // endregion

  // region Drivers

  /// Steps until the machine suspends. Never returns `Step::Continue`.
  pub fn run(&mut self) -> Result<Step, IntcodeError> {
    loop {
      match self.step()? {
        Step::Continue => continue,
        suspended      => return Ok(suspended)
      }
    }
  }

  /// Runs until the next output value, or `None` if the machine halts first. Needing input
  /// with an empty queue is an error.
  pub fn run_to_next_output(&mut self) -> Result<Option<Value>, IntcodeError> {
    match self.run()? {
      Step::ProducedOutput(value) => Ok(Some(value)),
      Step::Halted                => Ok(None),
      _                           => Err(self.input_exhausted())
    }
  }

  /// Runs until halt, collecting every output. Needing input with an empty queue is an error.
  pub fn run_to_halt(&mut self) -> Result<Vec<Value>, IntcodeError> {
    let mut outputs = Vec::new();
    while let Some(value) = self.run_to_next_output()? {
      outputs.push(value);
    }
    Ok(outputs)
  }

  /// Queues `inputs` and runs until the machine halts or needs more input than it was given.
  /// Returns the outputs produced and whether the machine halted or is awaiting input.
  pub fn run_through_inputs<I: IntoIterator<Item = Value>>(&mut self, inputs: I)
    -> Result<(Vec<Value>, Status), IntcodeError>
  {
    self.extend_input(inputs);
    let mut outputs = Vec::new();
    loop {
      match self.run()? {
        Step::ProducedOutput(value) => outputs.push(value),
        Step::NeedsInput            => return Ok((outputs, Status::AwaitingInput)),
        _                           => return Ok((outputs, Status::Halted))
      }
    }
  }

  /// Runs until halt against caller supplied contracts. Input is pulled only when an input
  /// instruction finds the internal queue empty.
  pub fn run_with<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<(), IntcodeError>
    where I: InputSource + ?Sized,
          O: OutputSink  + ?Sized
  {
    loop {
      match self.run()? {

        Step::NeedsInput => {
          match input.next_value() {
            Some(value) => self.push_input(value),
            None        => return Err(self.input_exhausted())
          }
        }

        Step::ProducedOutput(value) => output.accept(value)?,

        Step::Halted   => return Ok(()),

        Step::Continue => {}

      }
    }
  }

  // endregion

  // region Execution

  /// Fetches, decodes, and executes the instruction at the instruction pointer.
  pub fn step(&mut self) -> Result<Step, IntcodeError> {
    if self.is_halted() {
      return Ok(Step::Halted);
    }

    let at          = self.state.pointer;
    let word        = self.memory.read_at(at);
    let instruction = Instruction::decode(word, at.idx())?;

    #[cfg(feature = "trace_computation")]
      {
        let parameters: Vec<Value> =
          (1..instruction.size()).map(|n| self.memory.get(at.idx() + n)).collect();
        println!(
          "{:>5}: {:<32} rb = {}",
          at.idx(), instruction.render(&parameters), self.state.relative_base
        );
      }

    match instruction.opcode {

      Opcode::Add => {
        let (a, b) = (self.read(&instruction, 1)?, self.read(&instruction, 2)?);
        let sum    = a.checked_add(b).ok_or_else(|| self.overflow(&instruction))?;
        self.store(&instruction, 3, sum)?;
      }

      Opcode::Multiply => {
        let (a, b)  = (self.read(&instruction, 1)?, self.read(&instruction, 2)?);
        let product = a.checked_mul(b).ok_or_else(|| self.overflow(&instruction))?;
        self.store(&instruction, 3, product)?;
      }

      Opcode::Input => {
        if self.input.is_empty() {
          self.state.status = Status::AwaitingInput;
          return Ok(Step::NeedsInput);
        }
        let target = self.write_target(&instruction, 1)?;
        if let Some(value) = self.input.pop_front() {
          self.memory.write_at(target, value);
        }
        self.state.status = Status::Running;
      }

      Opcode::Output => {
        let value = self.read(&instruction, 1)?;
        self.advance(&instruction);
        return Ok(Step::ProducedOutput(value));
      }

      Opcode::JumpIfTrue => {
        if self.read(&instruction, 1)? != 0 {
          return self.jump(&instruction);
        }
      }

      Opcode::JumpIfFalse => {
        if self.read(&instruction, 1)? == 0 {
          return self.jump(&instruction);
        }
      }

      Opcode::LessThan => {
        let (a, b) = (self.read(&instruction, 1)?, self.read(&instruction, 2)?);
        self.store(&instruction, 3, (a < b) as Value)?;
      }

      Opcode::Equals => {
        let (a, b) = (self.read(&instruction, 1)?, self.read(&instruction, 2)?);
        self.store(&instruction, 3, (a == b) as Value)?;
      }

      Opcode::AdjustRelativeBase => {
        let offset = self.read(&instruction, 1)?;
        let base   =
          self.state.relative_base
              .checked_add(offset)
              .ok_or_else(|| self.overflow(&instruction))?;
        self.state.relative_base = base;
      }

      Opcode::Halt => {
        self.state.status = Status::Halted;
        return Ok(Step::Halted);
      }

    }

    self.advance(&instruction);
    Ok(Step::Continue)
  }

  /// Raw value of the 1-based parameter `n` of the current instruction.
  fn parameter(&mut self, n: usize) -> Value {
    let address = self.state.pointer + n;
    self.memory.read_at(address)
  }

  fn read(&mut self, instruction: &Instruction, n: usize) -> Result<Value, IntcodeError> {
    let raw = self.parameter(n);
    resolve_read(&mut self.memory, &self.state, raw, instruction.mode(n))
  }

  fn write_target(&mut self, instruction: &Instruction, n: usize) -> Result<Address, IntcodeError> {
    let raw = self.parameter(n);
    resolve_write_address(&self.state, raw, instruction.mode(n))
  }

  fn store(&mut self, instruction: &Instruction, n: usize, value: Value) -> Result<(), IntcodeError> {
    let target = self.write_target(instruction, n)?;
    self.memory.write_at(target, value);
    Ok(())
  }

  fn jump(&mut self, instruction: &Instruction) -> Result<Step, IntcodeError> {
    let target = self.read(instruction, 2)?;
    self.state.pointer = Address::try_from_value(target)?;
    Ok(Step::Continue)
  }

  fn advance(&mut self, instruction: &Instruction) {
    self.state.pointer = self.state.pointer + instruction.size();
  }

  fn overflow(&self, instruction: &Instruction) -> IntcodeError {
    IntcodeError::Overflow {
      opcode  : instruction.opcode.name(),
      address : self.state.pointer.idx()
    }
  }

  fn input_exhausted(&self) -> IntcodeError {
    IntcodeError::InputExhausted { address: self.state.pointer.idx() }
  }

  // endregion

  // region Display methods

  fn make_memory_table(memory: &[Value], highlight: usize) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, value) in memory.iter().enumerate() {
      match i == highlight {

        true  => {
          table.add_row(row![r->format!("* --> [{}] =", i), format!("{}", value)]);
        }

        false => {
          table.add_row(row![r->format!("[{}] =", i), format!("{}", value)]);
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let table = Machine::make_memory_table(self.memory.as_slice(), self.state.pointer.idx());
    write!(
      f,
      "Status: {}\tIP: {}\tRB: {}\tPending input: {}\n{}",
      self.state.status,
      self.state.pointer.idx(),
      self.state.relative_base,
      self.input.len(),
      table
    )
  }
}
