//! The contracts a machine uses to talk to its caller: a pull-based source of input values
//! and a push-based sink for output values.
//!
//! Either side may block. A source backed by a channel waits on the channel until another
//! thread sends a value, which is how a machine suspends on input without spinning.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use crate::error::IntcodeError;
use crate::Value;

pub trait InputSource {
  /// Returns the next value, blocking if the source produces values asynchronously.
  /// `None` means no value will ever arrive.
  fn next_value(&mut self) -> Option<Value>;
}

pub trait OutputSink {
  /// Accepts one value, blocking until the consumer can take it.
  fn accept(&mut self, value: Value) -> Result<(), IntcodeError>;
}

impl InputSource for VecDeque<Value> {
  fn next_value(&mut self) -> Option<Value> {
    self.pop_front()
  }
}

impl InputSource for Receiver<Value> {
  fn next_value(&mut self) -> Option<Value> {
    self.recv().ok()
  }
}

impl OutputSink for VecDeque<Value> {
  fn accept(&mut self, value: Value) -> Result<(), IntcodeError> {
    self.push_back(value);
    Ok(())
  }
}

impl OutputSink for Vec<Value> {
  fn accept(&mut self, value: Value) -> Result<(), IntcodeError> {
    self.push(value);
    Ok(())
  }
}

impl OutputSink for Sender<Value> {
  fn accept(&mut self, value: Value) -> Result<(), IntcodeError> {
    self.send(value).map_err(|_| IntcodeError::SinkClosed)
  }
}
