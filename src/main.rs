use std::error::Error;
use std::ops::ControlFlow;

use argh::FromArgs;

use intcode::{
  bytecode::disassemble,
  load_file,
  parse_program,
  Machine,
  Network,
  NetworkEvent,
  Pipeline,
  Value
};

/// Loads and runs Intcode programs.
#[derive(FromArgs)]
struct Arguments {
  #[argh(subcommand)]
  command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
  Run(RunCommand),
  Pipeline(PipelineCommand),
  Network(NetworkCommand),
  Disasm(DisasmCommand),
}

/// run a program until it halts, printing every output value
#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
  /// the program file
  #[argh(positional)]
  program: String,

  /// an input value, may be given several times
  #[argh(option, short = 'i')]
  input: Vec<Value>,

  /// write `value` to `address` before running, given as address=value
  #[argh(option, short = 'p')]
  poke: Vec<String>,

  /// print the final memory and registers
  #[argh(switch)]
  dump: bool,
}

/// chain one copy of the program per phase setting
#[derive(FromArgs)]
#[argh(subcommand, name = "pipeline")]
struct PipelineCommand {
  /// the program file
  #[argh(positional)]
  program: String,

  /// comma separated phase settings, one per stage
  #[argh(option)]
  phases: String,

  /// the signal fed to the first stage
  #[argh(option, default = "0")]
  signal: Value,

  /// loop the last stage's output back to the first until it halts
  #[argh(switch)]
  feedback: bool,

  /// give up after this many feedback cycles
  #[argh(option)]
  cycles: Option<usize>,
}

/// run one copy of the program per network node
#[derive(FromArgs)]
#[argh(subcommand, name = "network")]
struct NetworkCommand {
  /// the program file
  #[argh(positional)]
  program: String,

  /// number of nodes
  #[argh(option, default = "50")]
  size: usize,

  /// stop after the network has gone idle this many times
  #[argh(option, default = "1")]
  wakes: usize,

  /// fail if the network goes idle more than this many times
  #[argh(option)]
  cycles: Option<usize>,
}

/// list the instructions of a program
#[derive(FromArgs)]
#[argh(subcommand, name = "disasm")]
struct DisasmCommand {
  /// the program file
  #[argh(positional)]
  program: String,
}

fn parse_poke(text: &str) -> Result<(Value, Value), Box<dyn Error>> {
  let mut parts = text.splitn(2, '=');
  match (parts.next(), parts.next()) {
    (Some(address), Some(value)) => Ok((address.trim().parse()?, value.trim().parse()?)),
    _                            => Err(format!("expected address=value, got `{}`", text).into())
  }
}

fn run(command: RunCommand) -> Result<(), Box<dyn Error>> {
  let mut machine = Machine::new(load_file(&command.program)?);
  for poke in &command.poke {
    let (address, value) = parse_poke(poke)?;
    machine.poke(address, value)?;
  }
  machine.extend_input(command.input);

  for value in machine.run_to_halt()? {
    println!("{}", value);
  }
  if command.dump {
    println!("{}", machine);
  }
  Ok(())
}

fn pipeline(command: PipelineCommand) -> Result<(), Box<dyn Error>> {
  let program  = load_file(&command.program)?;
  let phases   = parse_program(&command.phases)?;
  let mut pipeline = Pipeline::new(&program, &phases);
  if let Some(cycles) = command.cycles {
    pipeline = pipeline.with_cycle_limit(cycles);
  }

  let result =
    match command.feedback {
      true  => pipeline.run_feedback(command.signal)?,
      false => pipeline.run_once(command.signal)?
    };
  match result {
    Some(value) => println!("{}", value),
    None        => println!("no output")
  }
  Ok(())
}

fn network(command: NetworkCommand) -> Result<(), Box<dyn Error>> {
  let program = load_file(&command.program)?;
  let wakes   = command.wakes;

  let mut network = Network::new(&program, command.size);
  if let Some(cycles) = command.cycles {
    network = network.with_idle_cycle_limit(cycles);
  }

  let summary = network.run(|event| {
    match event {

      NetworkEvent::Watchdog { from, packet } => {
        println!("watchdog <- {}: x = {}, y = {}", from, packet.x, packet.y);
      }

      NetworkEvent::Wake { cycle, packet } => {
        println!("idle #{}: watchdog -> 0: x = {}, y = {}", cycle, packet.x, packet.y);
        if *cycle >= wakes {
          return ControlFlow::Break(());
        }
      }

      NetworkEvent::Routed { .. } => {}

    }
    ControlFlow::Continue(())
  })?;

  println!(
    "{} packets routed, {} idle cycles, {} nodes halted",
    summary.packets_routed, summary.idle_cycles, summary.halted_nodes
  );
  Ok(())
}

fn disasm(command: DisasmCommand) -> Result<(), Box<dyn Error>> {
  let program = load_file(&command.program)?;
  print!("{}", disassemble(&program));
  Ok(())
}

fn main() {
  let arguments: Arguments = argh::from_env();

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let result =
    match arguments.command {
      Command::Run(command)      => run(command),
      Command::Pipeline(command) => pipeline(command),
      Command::Network(command)  => network(command),
      Command::Disasm(command)   => disasm(command),
    };

  if let Err(error) = result {
    eprintln!("error: {}", error);
    std::process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn network_options(){
    let arguments =
      Arguments::from_args(&["intcode"], &["network", "nic.txt", "--size", "3", "--cycles", "4"])
        .unwrap();
    match arguments.command {
      Command::Network(command) => {
        assert_eq!(command.program, "nic.txt");
        assert_eq!(command.size, 3);
        assert_eq!(command.wakes, 1);
        assert_eq!(command.cycles, Some(4));
      }
      _ => panic!("expected the network subcommand")
    }
  }

  #[test]
  fn poke_syntax(){
    assert_eq!(parse_poke("1 = 12").ok(), Some((1, 12)));
    assert!(parse_poke("12").is_err());
  }
}
