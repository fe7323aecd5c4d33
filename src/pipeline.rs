//! Pipeline composition: machines wired in a fixed order, each stage's outputs becoming the
//! next stage's inputs. With feedback, the last stage's outputs return to the first stage and
//! the cycle repeats until the last stage halts.
//!
//! Everything runs cooperatively on the caller's thread. A stage runs until it has produced
//! the configured number of outputs, halts, or asks for input it was not given.

use crate::error::{CompositionError, IntcodeError};
use crate::machine::{Machine, Step};
use crate::Value;

pub struct Pipeline {
  stages            : Vec<Machine>,
  outputs_per_stage : usize,
  cycle_limit       : Option<usize>
}

impl Pipeline {

  /// One stage per phase setting, each running a copy of `program` with its phase queued as
  /// the first input.
  pub fn new(program: &[Value], phases: &[Value]) -> Pipeline {
    let stages =
      phases
        .iter()
        .map(|phase| {
          let mut machine = Machine::new(program.to_vec());
          machine.push_input(*phase);
          machine
        })
        .collect();
    Pipeline::from_machines(stages)
  }

  pub fn from_machines(stages: Vec<Machine>) -> Pipeline {
    Pipeline {
      stages,
      outputs_per_stage : 1,
      cycle_limit       : None
    }
  }

  /// Number of outputs each stage runs for before control passes to the next stage. A stage
  /// always runs for at least one output, so 0 is treated as 1.
  pub fn with_outputs_per_stage(mut self, outputs: usize) -> Pipeline {
    self.outputs_per_stage = outputs.max(1);
    self
  }

  /// Bounds the number of passes `run_feedback` makes.
  pub fn with_cycle_limit(mut self, cycles: usize) -> Pipeline {
    self.cycle_limit = Some(cycles);
    self
  }

  pub fn stages(&self) -> &[Machine] {
    &self.stages
  }

  pub fn is_halted(&self) -> bool {
    self.stages.last().map_or(true, Machine::is_halted)
  }

  /// Sends `signal` through every stage once. Returns the last value the final stage
  /// emitted during the pass, if any.
  pub fn run_once(&mut self, signal: Value) -> Result<Option<Value>, CompositionError> {
    let outputs = self.pass(vec![signal])?;
    Ok(outputs.last().copied())
  }

  /// Cycles signals around the pipeline until the final stage halts. Returns the last value
  /// the final stage emitted.
  pub fn run_feedback(&mut self, signal: Value) -> Result<Option<Value>, CompositionError> {
    if self.stages.is_empty() {
      return Err(CompositionError::NoStages);
    }

    let mut signals = vec![signal];
    let mut last    = None;
    let mut cycles  = 0;

    while !self.is_halted() {
      if let Some(limit) = self.cycle_limit {
        if cycles >= limit {
          return Err(CompositionError::CycleLimit(limit));
        }
      }
      cycles += 1;

      signals = self.pass(signals)?;
      if let Some(value) = signals.last() {
        last = Some(*value);
      }

      #[cfg(feature = "trace_computation")]
        println!("pipeline cycle {}: {:?}", cycles, signals);
    }

    Ok(last)
  }

  /// Runs every stage in order once. Returns the outputs of the final stage.
  fn pass(&mut self, mut signals: Vec<Value>) -> Result<Vec<Value>, CompositionError> {
    if self.stages.is_empty() {
      return Err(CompositionError::NoStages);
    }

    let wanted = self.outputs_per_stage;
    for (stage, machine) in self.stages.iter_mut().enumerate() {
      machine.extend_input(signals.drain(..));
      let mut outputs = Vec::with_capacity(wanted);

      while outputs.len() < wanted {
        let fail = |source| CompositionError::Stage { stage, source };
        match machine.run().map_err(fail)? {
          Step::ProducedOutput(value) => outputs.push(value),
          Step::NeedsInput            => {
            return Err(fail(IntcodeError::InputExhausted { address: machine.pointer() }));
          }
          _                           => break
        }
      }

      #[cfg(feature = "trace_computation")]
        println!("stage {} -> {:?}", stage, outputs);

      signals = outputs;
    }

    Ok(signals)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SERIES: [Value; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

  const FEEDBACK: [Value; 29] = [
    3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
    1005, 28, 6, 99, 0, 0, 5
  ];

  #[test]
  fn series_pass(){
    let mut pipeline = Pipeline::new(&SERIES, &[4, 3, 2, 1, 0]);
    assert_eq!(pipeline.run_once(0), Ok(Some(43210)));
    assert!(pipeline.is_halted());
  }

  #[test]
  fn series_pass_other_phases(){
    let program = [
      3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23,
      99, 0, 0
    ];
    let mut pipeline = Pipeline::new(&program, &[0, 1, 2, 3, 4]);
    assert_eq!(pipeline.run_once(0), Ok(Some(54321)));
  }

  #[test]
  fn feedback_loop(){
    let mut pipeline = Pipeline::new(&FEEDBACK, &[9, 8, 7, 6, 5]);
    assert_eq!(pipeline.run_feedback(0), Ok(Some(139629729)));
    assert!(pipeline.stages().iter().all(Machine::is_halted));
  }

  #[test]
  fn feedback_cycle_limit(){
    let mut pipeline = Pipeline::new(&FEEDBACK, &[9, 8, 7, 6, 5]).with_cycle_limit(2);
    assert_eq!(pipeline.run_feedback(0), Err(CompositionError::CycleLimit(2)));
  }

  #[test]
  fn several_outputs_per_stage(){
    // Each stage reads a value and emits it twice.
    let doubler = [3, 9, 4, 9, 4, 9, 1105, 1, 0, 0];
    let stages = vec![Machine::new(doubler.to_vec()), Machine::new(doubler.to_vec())];
    let mut pipeline = Pipeline::from_machines(stages).with_outputs_per_stage(2);
    // Stage two consumes only the first of stage one's outputs before it has emitted twice.
    assert_eq!(pipeline.run_once(6), Ok(Some(6)));
    assert_eq!(pipeline.stages()[1].pending_input(), 1);
  }

  #[test]
  fn zero_outputs_per_stage_runs_one(){
    let doubler = [3, 9, 4, 9, 4, 9, 1105, 1, 0, 0];
    let mut pipeline =
      Pipeline::from_machines(vec![Machine::new(doubler.to_vec())]).with_outputs_per_stage(0);
    assert_eq!(pipeline.run_once(4), Ok(Some(4)));
    assert!(!pipeline.is_halted());
  }

  #[test]
  fn empty_pipeline_has_no_stages(){
    let mut pipeline = Pipeline::new(&SERIES, &[]);
    assert_eq!(pipeline.run_once(1), Err(CompositionError::NoStages));
    assert_eq!(pipeline.run_feedback(1), Err(CompositionError::NoStages));

    let mut pipeline = Pipeline::from_machines(vec![]);
    assert_eq!(pipeline.run_feedback(0), Err(CompositionError::NoStages));
  }

  #[test]
  fn stage_errors_name_the_stage(){
    let stages = vec![Machine::new(vec![3, 5, 4, 5, 99, 0]), Machine::new(vec![3, 0, 42])];
    let mut pipeline = Pipeline::from_machines(stages);
    assert_eq!(
      pipeline.run_once(1),
      Err(CompositionError::Stage {
        stage  : 1,
        source : IntcodeError::UnknownOpcode { opcode: 42, address: 2 }
      })
    );
  }

  #[test]
  fn starved_stage(){
    let stages = vec![Machine::new(vec![99]), Machine::new(vec![3, 0, 99])];
    let mut pipeline = Pipeline::from_machines(stages);
    assert_eq!(
      pipeline.run_once(1),
      Err(CompositionError::Stage {
        stage  : 1,
        source : IntcodeError::InputExhausted { address: 0 }
      })
    );
  }
}
