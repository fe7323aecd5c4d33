/*!
  An Intcode virtual machine.

  A program is a flat array of integers that is both its code and its data. The `Machine`
  executes it one instruction at a time and suspends whenever it needs input or has produced
  output, handing control back to its caller. Larger systems are built by composing machines:
  a `Pipeline` chains them on one thread, and a `Network` runs each on its own thread,
  exchanging packets through channels.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod address;
mod memory;
mod state;

pub mod bytecode;
pub mod error;
pub mod io;
pub mod loader;
pub mod machine;
pub mod network;
pub mod pipeline;

/// The machine's word. Code, data, addresses, and I/O values are all `Value`s.
pub type Value = i64;

pub use address::Address;
pub use error::{CompositionError, IntcodeError};
pub use io::{InputSource, OutputSink};
pub use loader::{load_file, parse_program, LoadError};
pub use machine::{Machine, Step};
pub use memory::Memory;
pub use network::{Network, NetworkEvent, NetworkSummary, Packet};
pub use pipeline::Pipeline;
pub use state::{State, Status};
