//! Per-node label storage shared by every phase.
//!
//! Every field is an atomic cell so a pass can run one task per node while
//! other tasks touch the same node through an edge. Fields a task only writes
//! on its own node (`old_length`, `num_successors` in the DAG pass, the
//! readiness flags, everything in a "changes" pass) are accessed with plain
//! `Relaxed` load/store. Cross-node writes use `fetch_min` (distances) and
//! `fetch_add` (`num_predecessors`, `trim`, `to_add`, `to_add_float`).
//! Passes are separated by the executor's join, which orders them.

use crate::types::INFINITY;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// An `f32` stored in an `AtomicU32` by bit pattern.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    #[inline]
    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }

    /// Adds `delta` with a CAS loop and returns the previous value.
    pub fn fetch_add(&self, delta: f32, order: Ordering) -> f32 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let new = (f32::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, new, order, Ordering::Relaxed)
            {
                Ok(previous) => return f32::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }

    /// Lowers the value to `value` if smaller and returns the previous value.
    pub fn fetch_min(&self, value: f32, order: Ordering) -> f32 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            if f32::from_bits(current) <= value {
                return f32::from_bits(current);
            }
            match self
                .0
                .compare_exchange_weak(current, value.to_bits(), order, Ordering::Relaxed)
            {
                Ok(previous) => return f32::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn swap(&self, value: f32, order: Ordering) -> f32 {
        f32::from_bits(self.0.swap(value.to_bits(), order))
    }
}

#[derive(Debug)]
pub struct NodeData {
    pub current_length: AtomicU32,
    pub old_length: AtomicU32,
    pub num_shortest_paths: AtomicU32,
    pub num_successors: AtomicU32,
    pub num_predecessors: AtomicU32,
    pub trim: AtomicU32,
    pub to_add: AtomicU32,
    pub to_add_float: AtomicF32,
    pub dependency: AtomicF32,
    pub betweenness_centrality: AtomicF32,
    /// All predecessors reported; the path count is final and must be pushed.
    pub paths_ready: AtomicBool,
    /// All successors reported; the dependency is final and may be consumed.
    pub dependency_ready: AtomicBool,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            current_length: AtomicU32::new(INFINITY),
            old_length: AtomicU32::new(INFINITY),
            num_shortest_paths: AtomicU32::new(0),
            num_successors: AtomicU32::new(0),
            num_predecessors: AtomicU32::new(0),
            trim: AtomicU32::new(0),
            to_add: AtomicU32::new(0),
            to_add_float: AtomicF32::new(0.0),
            dependency: AtomicF32::new(0.0),
            betweenness_centrality: AtomicF32::new(0.0),
            paths_ready: AtomicBool::new(false),
            dependency_ready: AtomicBool::new(false),
        }
    }
}

impl NodeData {
    /// Full re-initialization, including the accumulated centrality.
    pub fn reset(&self) {
        let r = Ordering::Relaxed;
        self.current_length.store(INFINITY, r);
        self.old_length.store(INFINITY, r);
        self.num_shortest_paths.store(0, r);
        self.num_successors.store(0, r);
        self.num_predecessors.store(0, r);
        self.trim.store(0, r);
        self.to_add.store(0, r);
        self.to_add_float.store(0.0, r);
        self.dependency.store(0.0, r);
        self.betweenness_centrality.store(0.0, r);
        self.paths_ready.store(false, r);
        self.dependency_ready.store(false, r);
    }

    /// Prepares the node for a new source; `betweenness_centrality` survives.
    pub fn reset_for_source(&self, is_source: bool) {
        let r = Ordering::Relaxed;
        let length = if is_source { 0 } else { INFINITY };
        self.current_length.store(length, r);
        self.old_length.store(length, r);
        self.num_shortest_paths.store(is_source as u32, r);
        self.paths_ready.store(is_source, r);
        self.dependency_ready.store(false, r);
        self.dependency.store(0.0, r);
        // Destination-only replicas never see their successor count trimmed.
        self.num_successors.store(0, r);
        self.num_predecessors.store(0, r);

        debug_assert_eq!(self.trim.load(r), 0);
        debug_assert_eq!(self.to_add.load(r), 0);
    }

    #[inline]
    pub fn distance(&self) -> u32 {
        self.current_length.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reached(&self) -> bool {
        self.distance() != INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn atomic_f32_adds_concurrently() {
        let cell = AtomicF32::new(0.0);
        (0..1000).into_par_iter().for_each(|_| {
            cell.fetch_add(0.5, Ordering::Relaxed);
        });
        assert_eq!(cell.load(Ordering::Relaxed), 500.0);
    }

    #[test]
    fn atomic_f32_min_only_lowers() {
        let cell = AtomicF32::new(3.0);
        assert_eq!(cell.fetch_min(5.0, Ordering::Relaxed), 3.0);
        assert_eq!(cell.load(Ordering::Relaxed), 3.0);
        assert_eq!(cell.fetch_min(1.5, Ordering::Relaxed), 3.0);
        assert_eq!(cell.load(Ordering::Relaxed), 1.5);
        assert_eq!(cell.swap(7.0, Ordering::Relaxed), 1.5);
    }

    #[test]
    fn source_reset_seeds_the_source() {
        let node = NodeData::default();
        node.betweenness_centrality.store(4.0, Ordering::Relaxed);
        node.num_successors.store(2, Ordering::Relaxed);

        node.reset_for_source(true);
        assert_eq!(node.distance(), 0);
        assert_eq!(node.num_shortest_paths.load(Ordering::Relaxed), 1);
        assert!(node.paths_ready.load(Ordering::Relaxed));
        assert_eq!(node.num_successors.load(Ordering::Relaxed), 0);
        assert_eq!(node.betweenness_centrality.load(Ordering::Relaxed), 4.0);

        node.reset_for_source(false);
        assert!(!node.reached());
        assert!(!node.paths_ready.load(Ordering::Relaxed));

        node.reset();
        assert_eq!(node.betweenness_centrality.load(Ordering::Relaxed), 0.0);
    }
}
