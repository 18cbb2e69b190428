//! Flat packet network of addressed engines.
//!
//! Every node runs the same program in yield-on-output, non-blocking-input
//! mode and receives its address as its first input. The network polls
//! nodes round-robin; three consecutive outputs `(dest, x, y)` form a
//! [`Packet`]. Packets for an address inside the network land on that
//! node's input queue, everything else goes to the caller's
//! [`NetworkMonitor`].

use crate::program::Program;
use crate::values::Word;
use crate::vm::{Status, VmConfig, VmError, VM};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub dest: Word,
    pub x: Word,
    pub y: Word,
}

/// What happened during one polling round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u64,
    /// Packets delivered to nodes inside the network.
    pub routed: usize,
    /// Packets addressed outside the network, in send order.
    pub to_monitor: Vec<Packet>,
    /// No node produced output and no node consumed queued input.
    pub idle: bool,
}

/// Reaction to an idle round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleAction {
    Wait,
    Inject { addr: usize, x: Word, y: Word },
    Stop(Word),
}

/// Receives traffic leaving the network and decides how to recover from
/// idle rounds.
pub trait NetworkMonitor {
    /// Called for every packet addressed outside the network. Returning a
    /// value stops the network with it.
    fn on_packet(&mut self, packet: &Packet) -> Option<Word>;

    /// Called after every idle round.
    fn on_idle(&mut self) -> IdleAction {
        IdleAction::Wait
    }
}

/// Stops on the first packet leaving the network and yields its `y`.
#[derive(Debug, Default)]
pub struct FirstPacket {
    pub packet: Option<Packet>,
}

impl NetworkMonitor for FirstPacket {
    fn on_packet(&mut self, packet: &Packet) -> Option<Word> {
        self.packet = Some(packet.clone());
        Some(packet.y.clone())
    }
}

/// Holds the latest packet leaving the network and re-injects it to node 0
/// whenever the network goes idle. Stops when the same `y` would be
/// re-injected twice in a row.
#[derive(Debug, Default)]
pub struct Nat {
    held: Option<Packet>,
    last_injected_y: Option<Word>,
    pub injections: usize,
}

impl NetworkMonitor for Nat {
    fn on_packet(&mut self, packet: &Packet) -> Option<Word> {
        self.held = Some(packet.clone());
        None
    }

    fn on_idle(&mut self) -> IdleAction {
        let Some(packet) = self.held.as_ref() else {
            return IdleAction::Wait;
        };
        if self.last_injected_y.as_ref() == Some(&packet.y) {
            return IdleAction::Stop(packet.y.clone());
        }
        self.last_injected_y = Some(packet.y.clone());
        self.injections += 1;
        IdleAction::Inject {
            addr: 0,
            x: packet.x.clone(),
            y: packet.y.clone(),
        }
    }
}

pub struct Network {
    nodes: Vec<VM>,
    /// Outputs of an incomplete packet, per node.
    outbox: Vec<Vec<Word>>,
    round: u64,
}

impl Network {
    pub fn new(program: &Program, size: usize) -> Self {
        let nodes = (0..size)
            .map(|addr| {
                let mut vm = VM::from_program(program, VmConfig::polling());
                vm.push_input(Word::from(addr));
                vm
            })
            .collect();
        Self {
            nodes,
            outbox: vec![Vec::new(); size],
            round: 0,
        }
    }

    pub fn set_instruction_limit(&mut self, limit: u64) {
        for node in &mut self.nodes {
            node.set_instruction_limit(limit);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, addr: usize) -> Option<&VM> {
        self.nodes.get(addr)
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Queue `(x, y)` on node `addr`. Returns false for an unknown address.
    pub fn send(&mut self, addr: usize, x: Word, y: Word) -> bool {
        match self.nodes.get_mut(addr) {
            Some(node) => {
                node.push_input(x);
                node.push_input(y);
                true
            }
            None => false,
        }
    }

    fn all_halted(&self) -> bool {
        self.nodes.iter().all(VM::is_halted)
    }

    /// Give every node one turn.
    ///
    /// A turn runs the node until it suspends on input, halts, or finishes
    /// sending a packet. Packets for nodes polled later in the same round
    /// are visible to them immediately.
    pub fn step(&mut self) -> Result<RoundReport, VmError> {
        let mut report = RoundReport {
            round: self.round,
            ..RoundReport::default()
        };
        let mut produced = false;
        let mut consumed = false;

        for addr in 0..self.nodes.len() {
            let mut sent = Vec::new();
            {
                let node = &mut self.nodes[addr];
                let outbox = &mut self.outbox[addr];
                let before = node.io().inputs_consumed();
                loop {
                    let result = node.run()?;
                    if !result.outputs.is_empty() {
                        produced = true;
                        outbox.extend(result.outputs);
                    }
                    while outbox.len() >= 3 {
                        let mut parts = outbox.drain(..3);
                        if let (Some(dest), Some(x), Some(y)) = (parts.next(), parts.next(), parts.next()) {
                            sent.push(Packet { dest, x, y });
                        }
                    }
                    if result.status == Status::YieldedOutput && !outbox.is_empty() {
                        continue;
                    }
                    break;
                }
                if node.io().inputs_consumed() > before {
                    consumed = true;
                }
            }

            for packet in sent {
                match packet.dest.to_usize().filter(|d| *d < self.nodes.len()) {
                    Some(dest) => {
                        trace!(from = addr, to = dest, x = %packet.x, y = %packet.y, "route packet");
                        self.send(dest, packet.x, packet.y);
                        report.routed += 1;
                    }
                    None => {
                        debug!(from = addr, dest = %packet.dest, "packet to monitor");
                        report.to_monitor.push(packet);
                    }
                }
            }
        }

        report.idle = !produced && !consumed;
        self.round += 1;
        trace!(round = report.round, routed = report.routed, idle = report.idle, "round complete");
        Ok(report)
    }

    /// Drive rounds until the monitor stops the network.
    ///
    /// Returns `None` if every node has halted and the network is idle, since
    /// no further traffic is possible.
    pub fn run<M: NetworkMonitor>(&mut self, monitor: &mut M) -> Result<Option<Word>, VmError> {
        self.run_for(monitor, None)
    }

    /// Like [`Network::run`], but gives up with `None` after `max_rounds`.
    pub fn run_for<M: NetworkMonitor>(
        &mut self,
        monitor: &mut M,
        max_rounds: Option<u64>,
    ) -> Result<Option<Word>, VmError> {
        let mut rounds = 0u64;
        loop {
            if max_rounds.is_some_and(|max| rounds >= max) {
                return Ok(None);
            }
            rounds += 1;

            let report = self.step()?;
            for packet in &report.to_monitor {
                if let Some(value) = monitor.on_packet(packet) {
                    return Ok(Some(value));
                }
            }
            if !report.idle {
                continue;
            }
            if self.all_halted() {
                debug!(round = report.round, "all nodes halted");
                return Ok(None);
            }
            match monitor.on_idle() {
                IdleAction::Wait => {}
                IdleAction::Inject { addr, x, y } => {
                    debug!(round = report.round, addr, x = %x, y = %y, "idle network, injecting packet");
                    if !self.send(addr, x, y) {
                        warn!(addr, size = self.nodes.len(), "injection to unknown node dropped");
                    }
                }
                IdleAction::Stop(value) => return Ok(Some(value)),
            }
        }
    }
}
