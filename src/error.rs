//! Error taxonomy. Engine errors are local to one machine; composition errors say which
//! machine in a pipeline or network failed.

use thiserror::Error;

use crate::Value;

/// A fatal condition raised by a single `Machine`. None of these are recovered from inside
/// the engine.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum IntcodeError {
  #[error("unknown opcode {opcode} at address {address}")]
  UnknownOpcode {
    opcode  : Value,
    address : usize
  },

  #[error("unknown parameter mode {mode} in instruction {word} at address {address}")]
  UnknownMode {
    mode    : Value,
    word    : Value,
    address : usize
  },

  #[error("negative memory address {0}")]
  NegativeAddress(Value),

  #[error("input exhausted at address {address}")]
  InputExhausted {
    address : usize
  },

  #[error("immediate mode write target at address {address}")]
  ImmediateWrite {
    address : usize
  },

  #[error("arithmetic overflow in {opcode} at address {address}")]
  Overflow {
    opcode  : &'static str,
    address : usize
  },

  #[error("output sink closed")]
  SinkClosed,
}

/// Failure of a composed group of machines.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum CompositionError {
  #[error("pipeline has no stages")]
  NoStages,

  #[error("stage {stage}: {source}")]
  Stage {
    stage  : usize,
    source : IntcodeError
  },

  #[error("node {node}: {source}")]
  Node {
    node   : usize,
    source : IntcodeError
  },

  #[error("cycle limit of {0} reached")]
  CycleLimit(usize),

  #[error("node {node} addressed a packet to unknown node {destination}")]
  UnknownDestination {
    node        : usize,
    destination : Value
  },

  #[error("network is idle and the watchdog has nothing to send")]
  Stalled,

  #[error("node {0} disconnected unexpectedly")]
  Disconnected(usize),
}
