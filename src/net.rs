//! Host-to-host messaging used by the sync collective and the round
//! accumulators.
//!
//! Every collective is symmetric: each host sends exactly one message to every
//! other host and then receives exactly one from each. Messages between a pair
//! of hosts are delivered in order, so matching calls pair up by position and
//! the label is only a consistency check.

use crate::error::{Error, Result};
use crate::types::{HostId, NodeId};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A `(global id, encoded value)` pair.
pub type Entry = (NodeId, u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub label: &'static str,
    pub entries: Vec<Entry>,
}

pub trait Transport: Send + Sync {
    fn host_id(&self) -> HostId;
    fn num_hosts(&self) -> usize;
    fn send(&self, to: HostId, message: Message) -> Result<()>;
    fn recv(&self, from: HostId, label: &'static str) -> Result<Message>;

    /// Sends `outgoing[h]` to every other host `h` and returns what each host
    /// sent back, indexed by sender. The local slot is returned untouched.
    fn exchange(&self, label: &'static str, mut outgoing: Vec<Vec<Entry>>) -> Result<Vec<Vec<Entry>>> {
        let me = self.host_id();
        let n = self.num_hosts();
        debug_assert_eq!(outgoing.len(), n);

        let mut incoming: Vec<Vec<Entry>> = vec![Vec::new(); n];
        for to in (0..n).filter(|&h| h != me) {
            let entries = std::mem::take(&mut outgoing[to]);
            self.send(to, Message { label, entries })?;
        }
        incoming[me] = std::mem::take(&mut outgoing[me]);

        for from in (0..n).filter(|&h| h != me) {
            let message = self.recv(from, label)?;
            if message.label != label {
                return Err(Error::CollectiveMismatch {
                    peer: from,
                    expected: label,
                    got: message.label,
                });
            }
            incoming[from] = message.entries;
        }

        Ok(incoming)
    }

    /// Sums `value` over all hosts.
    fn all_reduce_sum(&self, label: &'static str, value: u64) -> Result<u64> {
        let outgoing = (0..self.num_hosts()).map(|_| vec![(0, value)]).collect();
        let incoming = self.exchange(label, outgoing)?;
        Ok(incoming
            .iter()
            .filter_map(|entries| entries.first())
            .map(|&(_, v)| v)
            .sum())
    }
}

/// In-process transport: one unbounded channel per ordered host pair.
pub struct ChannelTransport {
    host_id: HostId,
    senders: Vec<Option<Sender<Message>>>,
    receivers: Vec<Option<Receiver<Message>>>,
    timeout: Option<Duration>,
}

impl ChannelTransport {
    /// Builds a fully connected mesh and returns one endpoint per host.
    pub fn mesh(num_hosts: usize, timeout: Option<Duration>) -> Vec<ChannelTransport> {
        let mut endpoints: Vec<ChannelTransport> = (0..num_hosts)
            .map(|host_id| ChannelTransport {
                host_id,
                senders: (0..num_hosts).map(|_| None).collect(),
                receivers: (0..num_hosts).map(|_| None).collect(),
                timeout,
            })
            .collect();

        for from in 0..num_hosts {
            for to in (0..num_hosts).filter(|&to| to != from) {
                let (tx, rx) = unbounded();
                endpoints[from].senders[to] = Some(tx);
                endpoints[to].receivers[from] = Some(rx);
            }
        }

        endpoints
    }
}

impl Transport for ChannelTransport {
    fn host_id(&self) -> HostId {
        self.host_id
    }

    fn num_hosts(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, to: HostId, message: Message) -> Result<()> {
        let label = message.label;
        let sender = self.senders[to].as_ref().ok_or(Error::Disconnected { peer: to, label })?;
        sender
            .send(message)
            .map_err(|_| Error::Disconnected { peer: to, label })
    }

    fn recv(&self, from: HostId, label: &'static str) -> Result<Message> {
        let receiver = self.receivers[from]
            .as_ref()
            .ok_or(Error::Disconnected { peer: from, label })?;
        match self.timeout {
            None => receiver
                .recv()
                .map_err(|_| Error::Disconnected { peer: from, label }),
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout { peer: from, label },
                RecvTimeoutError::Disconnected => Error::Disconnected { peer: from, label },
            }),
        }
    }
}

/// Round-local work counter combined across hosts at the end of a round.
#[derive(Debug, Default)]
pub struct DistAccumulator {
    local: AtomicU64,
}

impl DistAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.local.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(&self, amount: u64) {
        self.local.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn local(&self) -> u64 {
        self.local.load(Ordering::Relaxed)
    }

    /// Global sum; every host must call this for the same round.
    pub fn reduce<T: Transport + ?Sized>(&self, transport: &T, label: &'static str) -> Result<u64> {
        transport.all_reduce_sum(label, self.local())
    }
}
