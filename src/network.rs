/*!
  Message-passing composition: a network of machines, each on its own thread.

  Every node owns its `Machine` outright. The only shared resources are channels: each node
  has a private inbound queue of packets, and all nodes report to the router over one event
  channel. The router runs on the caller's thread.

  ```text
            ┌────────┐  Send / Idle / Halted / Failed   ┌────────┐
            │ node 0 │ ───────────────────────────────> │        │
            ├────────┤                                  │ router │
            │ node 1 │ <─────────── Packet ──────────── │        │
            └────────┘                                  └────────┘
  ```

  A node's output is read in triples `(destination, x, y)`. Its first input is its own
  address; after that, each packet it receives is queued as the two inputs `x`, `y`.

  Idle detection. When a node asks for input and its queue is empty it is given the idle
  input value (-1 by default). If it asks again without having produced output or received a
  packet in between, it reports `Idle` together with the number of packets it has consumed,
  then blocks on its queue. The router counts packets delivered to each node, so a stale idle
  report (a packet arrived after the report was sent) is recognised by the counts disagreeing.
  When every live node is idle with matching counts, the network is globally idle and the
  watchdog sends the last packet it received to node 0.
*/

use std::convert::TryFrom;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{CompositionError, IntcodeError};
use crate::machine::{Machine, Step};
use crate::Value;

pub const DEFAULT_WATCHDOG_ADDRESS: Value = 255;
pub const DEFAULT_IDLE_INPUT: Value = -1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Packet {
  pub x: Value,
  pub y: Value
}

/// What the caller observes while a network runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NetworkEvent {
  /// A packet was delivered from one node to another.
  Routed {
    from   : usize,
    to     : usize,
    packet : Packet
  },
  /// A packet was sent to the watchdog address.
  Watchdog {
    from   : usize,
    packet : Packet
  },
  /// The network was globally idle and the watchdog woke node 0 with `packet`.
  Wake {
    cycle  : usize,
    packet : Packet
  },
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkSummary {
  pub packets_routed : usize,
  pub idle_cycles    : usize,
  pub halted_nodes   : usize
}

/// Messages from node threads to the router.
enum NodeEvent {
  Send {
    from        : usize,
    destination : Value,
    packet      : Packet
  },
  Idle {
    node     : usize,
    consumed : u64
  },
  Halted(usize),
  /// The node's thread panicked.
  Disconnected(usize),
  Failed {
    node  : usize,
    error : IntcodeError
  },
}

pub struct Network {
  program          : Vec<Value>,
  size             : usize,
  watchdog_address : Value,
  idle_input       : Value,
  idle_cycle_limit : Option<usize>
}

impl Network {

  pub fn new(program: &[Value], size: usize) -> Network {
    Network {
      program          : program.to_vec(),
      size,
      watchdog_address : DEFAULT_WATCHDOG_ADDRESS,
      idle_input       : DEFAULT_IDLE_INPUT,
      idle_cycle_limit : None
    }
  }

  pub fn with_watchdog_address(mut self, address: Value) -> Network {
    self.watchdog_address = address;
    self
  }

  /// The value a node reads when it asks for input and has no packet waiting.
  pub fn with_idle_input(mut self, value: Value) -> Network {
    self.idle_input = value;
    self
  }

  pub fn with_idle_cycle_limit(mut self, cycles: usize) -> Network {
    self.idle_cycle_limit = Some(cycles);
    self
  }

  /**
    Boots every node and routes packets until `observe` returns `ControlFlow::Break`, every
    node halts, or something fails. All node threads are stopped and joined before this
    returns.
  */
  pub fn run<F>(&self, mut observe: F) -> Result<NetworkSummary, CompositionError>
    where F: FnMut(&NetworkEvent) -> ControlFlow<()>
  {
    let shutdown               = Arc::new(AtomicBool::new(false));
    let (events_tx, events_rx) = channel();
    let mut inboxes            = Vec::with_capacity(self.size);
    let mut handles            = Vec::with_capacity(self.size);

    for id in 0..self.size {
      let (inbox_tx, inbox_rx) = channel();
      inboxes.push(inbox_tx);

      let node = Node {
        id,
        machine    : Machine::new(self.program.clone()),
        inbox      : inbox_rx,
        events     : events_tx.clone(),
        shutdown   : shutdown.clone(),
        idle_input : self.idle_input
      };
      handles.push(thread::spawn(move || node.run()));
    }
    // Only the nodes hold senders, so the channel closes once every node has exited.
    drop(events_tx);

    let mut router = Router::new(self.size);
    let result     = self.route(&mut router, &inboxes, &events_rx, &mut observe);

    shutdown.store(true, Ordering::SeqCst);
    drop(inboxes);
    let joined = join_all(handles);

    let summary = result?;
    joined?;
    Ok(summary)
  }

  fn route<F>(
    &self,
    router  : &mut Router,
    inboxes : &[Sender<Packet>],
    events  : &Receiver<NodeEvent>,
    observe : &mut F
  ) -> Result<NetworkSummary, CompositionError>
    where F: FnMut(&NetworkEvent) -> ControlFlow<()>
  {
    if self.size == 0 {
      return Ok(router.summary);
    }

    loop {
      let event = match events.recv() {
        Ok(event) => event,
        Err(_)    => return Err(CompositionError::Disconnected(router.first_live_node()))
      };

      match event {

        NodeEvent::Send { from, destination, packet } => {
          router.idle_at[from] = None;

          let network_event =
            match destination == self.watchdog_address {

              true  => {
                router.watchdog = Some(packet);
                NetworkEvent::Watchdog { from, packet }
              }

              false => {
                let to =
                  usize::try_from(destination)
                    .ok()
                    .filter(|to| *to < self.size)
                    .ok_or(CompositionError::UnknownDestination { node: from, destination })?;
                router.deliver(&inboxes[to], to, packet);
                router.summary.packets_routed += 1;
                NetworkEvent::Routed { from, to, packet }
              }

            };

          if let ControlFlow::Break(()) = observe(&network_event) {
            return Ok(router.summary);
          }
        }

        NodeEvent::Idle { node, consumed } => {
          router.idle_at[node] = Some(consumed);
        }

        NodeEvent::Halted(node) => {
          #[cfg(feature = "trace_computation")]
            println!("node {} halted", node);

          router.halted[node] = true;
          router.summary.halted_nodes += 1;
          if router.summary.halted_nodes == self.size {
            return Ok(router.summary);
          }
        }

        NodeEvent::Failed { node, error } => {
          return Err(CompositionError::Node { node, source: error });
        }

        NodeEvent::Disconnected(node) => {
          return Err(CompositionError::Disconnected(node));
        }

      } // end match on event

      if router.is_idle() {
        let packet = router.watchdog.ok_or(CompositionError::Stalled)?;
        if router.halted[0] {
          return Err(CompositionError::Stalled);
        }

        router.summary.idle_cycles += 1;
        let cycle = router.summary.idle_cycles;
        if let Some(limit) = self.idle_cycle_limit {
          if cycle > limit {
            return Err(CompositionError::CycleLimit(limit));
          }
        }

        #[cfg(feature = "trace_computation")]
          println!("network idle, cycle {}: waking node 0 with {:?}", cycle, packet);

        router.deliver(&inboxes[0], 0, packet);
        if let ControlFlow::Break(()) = observe(&NetworkEvent::Wake { cycle, packet }) {
          return Ok(router.summary);
        }
      }
    } // end loop
  }
}

/// Router bookkeeping for idle detection.
struct Router {
  delivered : Vec<u64>,
  idle_at   : Vec<Option<u64>>,
  halted    : Vec<bool>,
  watchdog  : Option<Packet>,
  summary   : NetworkSummary
}

impl Router {
  fn new(size: usize) -> Router {
    Router {
      delivered : vec![0; size],
      idle_at   : vec![None; size],
      halted    : vec![false; size],
      watchdog  : None,
      summary   : NetworkSummary::default()
    }
  }

  /// Packets for a node that has already exited are dropped.
  fn deliver(&mut self, inbox: &Sender<Packet>, to: usize, packet: Packet) {
    if !self.halted[to] && inbox.send(packet).is_ok() {
      self.delivered[to] += 1;
    }
  }

  fn is_idle(&self) -> bool {
    (0..self.delivered.len()).all(|n| {
      self.halted[n] || self.idle_at[n] == Some(self.delivered[n])
    })
  }

  fn first_live_node(&self) -> usize {
    self.halted.iter().position(|halted| !halted).unwrap_or(0)
  }
}

struct Node {
  id         : usize,
  machine    : Machine,
  inbox      : Receiver<Packet>,
  events     : Sender<NodeEvent>,
  shutdown   : Arc<AtomicBool>,
  idle_input : Value
}

impl Node {

  /// Runs the node until it halts, fails, or the network shuts down. Every exit path that
  /// the router has not caused is reported over the event channel.
  fn run(mut self) {
    self.machine.push_input(self.id as Value);

    let mut consumed: u64          = 0;
    let mut polled_empty           = false;
    let mut envelope: Vec<Value>   = Vec::with_capacity(3);

    while !self.shutdown.load(Ordering::Relaxed) {
      let step = match self.machine.step() {
        Ok(step)   => step,
        Err(error) => {
          let _ = self.events.send(NodeEvent::Failed { node: self.id, error });
          return;
        }
      };

      match step {

        Step::Continue => {}

        Step::ProducedOutput(value) => {
          polled_empty = false;
          envelope.push(value);
          if envelope.len() == 3 {
            let event = NodeEvent::Send {
              from        : self.id,
              destination : envelope[0],
              packet      : Packet { x: envelope[1], y: envelope[2] }
            };
            envelope.clear();
            if self.events.send(event).is_err() {
              return;
            }
          }
        }

        Step::NeedsInput => {
          let packet = match self.inbox.try_recv() {
            Ok(packet)                      => packet,
            Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty)        => {
              if !polled_empty {
                polled_empty = true;
                self.machine.push_input(self.idle_input);
                continue;
              }
              let report = NodeEvent::Idle { node: self.id, consumed };
              if self.events.send(report).is_err() {
                return;
              }
              // Blocks until the router delivers a packet or shuts the network down.
              match self.inbox.recv() {
                Ok(packet) => packet,
                Err(_)     => return
              }
            }
          };
          consumed    += 1;
          polled_empty = false;
          self.machine.extend_input(vec![packet.x, packet.y]);
        }

        Step::Halted => {
          let _ = self.events.send(NodeEvent::Halted(self.id));
          return;
        }

      } // end match on step
    }
  }
}

impl Drop for Node {
  fn drop(&mut self) {
    if thread::panicking() {
      let _ = self.events.send(NodeEvent::Disconnected(self.id));
    }
  }
}

/// Joins every node thread. Fails with the first node whose thread panicked.
fn join_all(handles: Vec<JoinHandle<()>>) -> Result<(), CompositionError> {
  let mut result = Ok(());
  for (node, handle) in handles.into_iter().enumerate() {
    if handle.join().is_err() && result.is_ok() {
      result = Err(CompositionError::Disconnected(node));
    }
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Sends `(1 - address, address, 100)`, then forwards every packet it receives to 255.
  const PAIR: [Value; 36] = [
    3, 100,               //  0: in -> [100]
    1002, 100, -1, 101,   //  2: mul [100], -1 -> [101]
    1001, 101, 1, 101,    //  6: add [101], 1 -> [101]
    4, 101,               // 10: out [101]
    4, 100,               // 12: out [100]
    104, 100,             // 14: out 100
    3, 102,               // 16: in -> [102]
    1008, 102, -1, 104,   // 18: eq [102], -1 -> [104]
    1005, 104, 16,        // 22: jnz [104], 16
    3, 103,               // 25: in -> [103]
    104, 255,             // 27: out 255
    4, 102,               // 29: out [102]
    4, 103,               // 31: out [103]
    1106, 0, 16,          // 33: jz 0, 16
  ];

  #[test]
  fn routes_packets_and_wakes_on_idle(){
    let mut events = Vec::new();
    let summary = Network::new(&PAIR, 2).run(|event| {
      events.push(*event);
      match event {
        NetworkEvent::Wake { .. } => ControlFlow::Break(()),
        _                         => ControlFlow::Continue(())
      }
    }).unwrap();

    assert_eq!(summary.packets_routed, 2);
    assert_eq!(summary.idle_cycles, 1);

    let routed: Vec<&NetworkEvent> =
      events.iter().filter(|e| matches!(e, NetworkEvent::Routed { .. })).collect();
    assert_eq!(routed.len(), 2);
    assert!(events.contains(&NetworkEvent::Routed { from: 0, to: 1, packet: Packet { x: 0, y: 100 } }));
    assert!(events.contains(&NetworkEvent::Routed { from: 1, to: 0, packet: Packet { x: 1, y: 100 } }));

    let watched: Vec<Packet> = events.iter().filter_map(|e| match e {
      NetworkEvent::Watchdog { packet, .. } => Some(*packet),
      _                                     => None
    }).collect();
    assert_eq!(watched.len(), 2);
    assert!(watched.contains(&Packet { x: 0, y: 100 }));
    assert!(watched.contains(&Packet { x: 1, y: 100 }));

    match events.last() {
      Some(NetworkEvent::Wake { cycle: 1, packet }) => assert_eq!(Some(packet), watched.last()),
      other                                         => panic!("expected a wake, got {:?}", other)
    }
  }

  #[test]
  fn repeated_idle_cycles(){
    let mut wakes = Vec::new();
    let mut watched = 0;
    let summary = Network::new(&PAIR, 2).run(|event| {
      match event {
        NetworkEvent::Watchdog { .. }        => watched += 1,
        NetworkEvent::Wake { cycle, packet } => {
          wakes.push(*packet);
          if *cycle == 3 {
            return ControlFlow::Break(());
          }
        }
        _                                    => {}
      }
      ControlFlow::Continue(())
    }).unwrap();

    assert_eq!(summary.idle_cycles, 3);
    // Node 0 forwards each wake packet back to the watchdog unchanged.
    assert_eq!(watched, 4);
    assert_eq!(wakes.len(), 3);
    assert!(wakes.iter().all(|packet| *packet == wakes[0]));
  }

  #[test]
  fn idle_cycle_limit(){
    let result = Network::new(&PAIR, 2).with_idle_cycle_limit(2).run(|_| ControlFlow::Continue(()));
    assert_eq!(result, Err(CompositionError::CycleLimit(2)));
  }

  #[test]
  fn idle_without_watchdog_packet_stalls(){
    // Reads its address, then asks for input forever.
    let program = [3, 100, 3, 101, 1105, 1, 2];
    let result = Network::new(&program, 3).run(|_| ControlFlow::Continue(()));
    assert_eq!(result, Err(CompositionError::Stalled));
  }

  #[test]
  fn unknown_destination(){
    let program = [3, 100, 104, 7, 104, 0, 104, 0, 99];
    match Network::new(&program, 2).run(|_| ControlFlow::Continue(())) {
      Err(CompositionError::UnknownDestination { destination: 7, .. }) => {}
      other => panic!("expected an unknown destination, got {:?}", other)
    }
  }

  #[test]
  fn node_failure_stops_the_network(){
    let program = [3, 100, 42];
    match Network::new(&program, 4).run(|_| ControlFlow::Continue(())) {
      Err(CompositionError::Node { source, .. }) => {
        assert_eq!(source, IntcodeError::UnknownOpcode { opcode: 42, address: 2 });
      }
      other => panic!("expected a node failure, got {:?}", other)
    }
  }

  #[test]
  fn all_nodes_halting_ends_the_run(){
    let program = [3, 100, 99];
    let summary = Network::new(&program, 5).run(|_| ControlFlow::Continue(())).unwrap();
    assert_eq!(summary.halted_nodes, 5);
    assert_eq!(summary.packets_routed, 0);
  }

  #[test]
  fn custom_watchdog_address(){
    // Sends (9, address, 1) and then idles.
    let program = [3, 100, 104, 9, 4, 100, 104, 1, 3, 101, 1105, 1, 8];
    let mut watched = Vec::new();
    let summary =
      Network::new(&program, 2)
        .with_watchdog_address(9)
        .run(|event| match event {
          NetworkEvent::Watchdog { packet, .. } => { watched.push(*packet); ControlFlow::Continue(()) }
          _                                     => ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(summary.packets_routed, 0);
    assert_eq!(watched.len(), 2);
    assert!(watched.iter().all(|packet| packet.y == 1));
  }

  #[test]
  fn panicking_node_reports_disconnect(){
    let (events_tx, events_rx) = channel();
    let (_inbox_tx, inbox_rx)  = channel();
    let node = Node {
      id         : 3,
      machine    : Machine::new(vec![99]),
      inbox      : inbox_rx,
      events     : events_tx,
      shutdown   : Arc::new(AtomicBool::new(false)),
      idle_input : DEFAULT_IDLE_INPUT
    };

    let handle = thread::spawn(move || {
      let _node = node;
      panic!("node thread died");
    });
    assert_eq!(join_all(vec![handle]), Err(CompositionError::Disconnected(0)));
    assert!(matches!(events_rx.recv(), Ok(NodeEvent::Disconnected(3))));
  }

  #[test]
  fn router_surfaces_disconnected_node(){
    let network = Network::new(&[99], 2);
    let (events_tx, events_rx) = channel();
    let inboxes: Vec<Sender<Packet>> = (0..2).map(|_| channel().0).collect();

    events_tx.send(NodeEvent::Disconnected(1)).unwrap();
    let mut observe = |_: &NetworkEvent| ControlFlow::Continue(());
    assert_eq!(
      network.route(&mut Router::new(2), &inboxes, &events_rx, &mut observe),
      Err(CompositionError::Disconnected(1))
    );
  }

  #[test]
  fn join_reports_first_panicked_node(){
    let handles = vec![
      thread::spawn(|| {}),
      thread::spawn(|| panic!("second node died")),
      thread::spawn(|| panic!("third node died")),
    ];
    assert_eq!(join_all(handles), Err(CompositionError::Disconnected(1)));
  }
}
