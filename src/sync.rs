//! Reduce-then-broadcast synchronization of one node field across replicas.
//!
//! A sync runs in two collective exchanges. In the reduce step every mirror
//! whose role matches the write side ships its value to the owner, which
//! folds it in with the requested operator; add-reduced mirrors are zeroed
//! after shipping so the same contribution is never counted twice. In the
//! broadcast step the owner ships its canonical value to every mirror whose
//! role matches the read side. With a dirty filter only flagged entries
//! travel; the owner flags an entry when a reduce changed it. The field's
//! dirty set is empty once the sync returns.

use crate::bitset::{Bitsets, DirtyBitset};
use crate::error::Result;
use crate::graph::{Filter, PartitionedGraph, Reduce, Role};
use crate::net::{Entry, Transport};
use crate::node::{AtomicF32, NodeData};
use crate::partition::DistGraph;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::trace;

/// A node field cell that can travel as a 64-bit word.
pub trait SyncCell {
    fn encode(&self) -> u64;
    fn store_word(&self, word: u64);
    /// Folds `word` in; returns whether the stored value changed.
    fn reduce_word(&self, reduce: Reduce, word: u64) -> bool;
    fn zero(&self);
}

impl SyncCell for AtomicU32 {
    fn encode(&self) -> u64 {
        u64::from(self.load(Ordering::Relaxed))
    }

    fn store_word(&self, word: u64) {
        self.store(word as u32, Ordering::Relaxed)
    }

    fn reduce_word(&self, reduce: Reduce, word: u64) -> bool {
        let value = word as u32;
        match reduce {
            Reduce::Min => value < self.fetch_min(value, Ordering::Relaxed),
            Reduce::Add if value == 0 => false,
            Reduce::Add => {
                self.fetch_add(value, Ordering::Relaxed);
                true
            }
            Reduce::Overwrite => self.swap(value, Ordering::Relaxed) != value,
        }
    }

    fn zero(&self) {
        self.store(0, Ordering::Relaxed)
    }
}

impl SyncCell for AtomicF32 {
    fn encode(&self) -> u64 {
        u64::from(self.load(Ordering::Relaxed).to_bits())
    }

    fn store_word(&self, word: u64) {
        self.store(f32::from_bits(word as u32), Ordering::Relaxed)
    }

    fn reduce_word(&self, reduce: Reduce, word: u64) -> bool {
        let value = f32::from_bits(word as u32);
        match reduce {
            Reduce::Min => value < self.fetch_min(value, Ordering::Relaxed),
            Reduce::Add if value == 0.0 => false,
            Reduce::Add => {
                self.fetch_add(value, Ordering::Relaxed);
                true
            }
            Reduce::Overwrite => self.swap(value, Ordering::Relaxed) != value,
        }
    }

    fn zero(&self) {
        self.store(0.0, Ordering::Relaxed)
    }
}

/// Flags reduce as logical AND under `Min` and logical OR under `Add`.
impl SyncCell for AtomicBool {
    fn encode(&self) -> u64 {
        u64::from(self.load(Ordering::Relaxed))
    }

    fn store_word(&self, word: u64) {
        self.store(word != 0, Ordering::Relaxed)
    }

    fn reduce_word(&self, reduce: Reduce, word: u64) -> bool {
        let value = word != 0;
        let previous = match reduce {
            Reduce::Min => self.fetch_and(value, Ordering::Relaxed),
            Reduce::Add => self.fetch_or(value, Ordering::Relaxed),
            Reduce::Overwrite => self.swap(value, Ordering::Relaxed),
        };
        previous != self.load(Ordering::Relaxed)
    }

    fn zero(&self) {
        self.store(false, Ordering::Relaxed)
    }
}

/// A node field that takes part in syncs, with its dirty set.
pub trait SyncField {
    type Cell: SyncCell;
    const NAME: &'static str;
    const REDUCE_LABEL: &'static str;
    const BROADCAST_LABEL: &'static str;

    fn cell(node: &NodeData) -> &Self::Cell;
    fn dirty(bitsets: &Bitsets) -> &DirtyBitset;
}

macro_rules! sync_fields {
    ($($marker:ident => $field:ident: $cell:ty),* $(,)?) => {
        $(
            pub struct $marker;

            impl SyncField for $marker {
                type Cell = $cell;
                const NAME: &'static str = stringify!($field);
                const REDUCE_LABEL: &'static str = concat!(stringify!($field), "/reduce");
                const BROADCAST_LABEL: &'static str = concat!(stringify!($field), "/broadcast");

                #[inline]
                fn cell(node: &NodeData) -> &Self::Cell {
                    &node.$field
                }

                #[inline]
                fn dirty(bitsets: &Bitsets) -> &DirtyBitset {
                    &bitsets.$field
                }
            }
        )*
    };
}

sync_fields! {
    CurrentLength => current_length: AtomicU32,
    NumSuccessors => num_successors: AtomicU32,
    NumPredecessors => num_predecessors: AtomicU32,
    Trim => trim: AtomicU32,
    ToAdd => to_add: AtomicU32,
    ToAddFloat => to_add_float: AtomicF32,
    NumShortestPaths => num_shortest_paths: AtomicU32,
    Dependency => dependency: AtomicF32,
    PathsReady => paths_ready: AtomicBool,
    DependencyReady => dependency_ready: AtomicBool,
}

impl<T: Transport> DistGraph<T> {
    pub(crate) fn sync_field<F: SyncField>(
        &self,
        write: Role,
        read: Role,
        reduce: Reduce,
        filter: Filter,
    ) -> Result<()> {
        // A vertex-cut node may be written on one host and read on another
        // without either replica having touched the value this round.
        let filtered = filter == Filter::Dirty && !self.is_vertex_cut();
        let dirty = F::dirty(&self.bitsets);

        let reduced = self.reduce_step::<F>(write, reduce, filtered, dirty)?;
        let broadcast = self.broadcast_step::<F>(read, filtered, dirty)?;
        dirty.clear();

        trace!(
            host = self.host_id(),
            field = F::NAME,
            ?write,
            ?read,
            ?reduce,
            filtered,
            reduced,
            broadcast,
            "synced"
        );
        Ok(())
    }

    fn reduce_step<F: SyncField>(
        &self,
        write: Role,
        reduce: Reduce,
        filtered: bool,
        dirty: &DirtyBitset,
    ) -> Result<usize> {
        let mut outgoing: Vec<Vec<Entry>> = vec![Vec::new(); self.num_hosts()];
        for lid in self.num_owned()..self.num_local() {
            if !write.matches(self.partition.role_mask(lid)) || (filtered && !dirty.test(lid)) {
                continue;
            }
            let cell = F::cell(&self.nodes[lid]);
            outgoing[self.partition.mirror_owner(lid)].push((self.global_id(lid), cell.encode()));
            if reduce == Reduce::Add {
                cell.zero();
            }
        }

        let incoming = self.transport.exchange(F::REDUCE_LABEL, outgoing)?;
        let mut received = 0;
        for (gid, word) in incoming.into_iter().flatten() {
            let lid = self.partition.owned_local_id(gid);
            let changed = F::cell(&self.nodes[lid]).reduce_word(reduce, word);
            if changed || reduce == Reduce::Overwrite {
                dirty.set(lid);
            }
            received += 1;
        }
        Ok(received)
    }

    fn broadcast_step<F: SyncField>(&self, read: Role, filtered: bool, dirty: &DirtyBitset) -> Result<usize> {
        let mut outgoing: Vec<Vec<Entry>> = vec![Vec::new(); self.num_hosts()];
        for lid in 0..self.num_owned() {
            let directory = self.partition.mirror_directory(lid);
            if directory.is_empty() || (filtered && !dirty.test(lid)) {
                continue;
            }
            let entry = (self.global_id(lid), F::cell(&self.nodes[lid]).encode());
            for &(host, mask) in directory {
                if read.matches(mask) {
                    outgoing[host].push(entry);
                }
            }
        }

        let incoming = self.transport.exchange(F::BROADCAST_LABEL, outgoing)?;
        let mut received = 0;
        for (gid, word) in incoming.into_iter().flatten() {
            if let Some(lid) = self.partition.mirror_local_id(gid) {
                F::cell(&self.nodes[lid]).store_word(word);
                received += 1;
            }
        }
        Ok(received)
    }
}
