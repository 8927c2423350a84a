use crate::types::LocalId;
use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = 64;

/// Set of local ids touched since the last sync of one field.
///
/// `bit_vec::BitVec` cannot be flipped from several worker threads, so the
/// dirty sets keep their own word array.
#[derive(Debug)]
pub struct DirtyBitset {
    words: Vec<AtomicU64>,
    len: usize,
}

impl DirtyBitset {
    pub fn new(len: usize) -> Self {
        let words = (0..(len + WORD_BITS - 1) / WORD_BITS)
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&self, index: LocalId) {
        debug_assert!(index < self.len);
        self.words[index / WORD_BITS].fetch_or(1 << (index % WORD_BITS), Ordering::Relaxed);
    }

    #[inline]
    pub fn test(&self, index: LocalId) -> bool {
        self.words[index / WORD_BITS].load(Ordering::Relaxed) & (1 << (index % WORD_BITS)) != 0
    }

    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}

/// One dirty set per field that takes part in a filtered sync.
#[derive(Debug)]
pub struct Bitsets {
    pub current_length: DirtyBitset,
    pub num_successors: DirtyBitset,
    pub num_predecessors: DirtyBitset,
    pub trim: DirtyBitset,
    pub to_add: DirtyBitset,
    pub to_add_float: DirtyBitset,
    pub num_shortest_paths: DirtyBitset,
    pub dependency: DirtyBitset,
    pub paths_ready: DirtyBitset,
    pub dependency_ready: DirtyBitset,
}

impl Bitsets {
    pub fn new(num_local: usize) -> Self {
        Self {
            current_length: DirtyBitset::new(num_local),
            num_successors: DirtyBitset::new(num_local),
            num_predecessors: DirtyBitset::new(num_local),
            trim: DirtyBitset::new(num_local),
            to_add: DirtyBitset::new(num_local),
            to_add_float: DirtyBitset::new(num_local),
            num_shortest_paths: DirtyBitset::new(num_local),
            dependency: DirtyBitset::new(num_local),
            paths_ready: DirtyBitset::new(num_local),
            dependency_ready: DirtyBitset::new(num_local),
        }
    }

    pub fn clear(&self) {
        for set in self.all() {
            set.clear();
        }
    }

    fn all(&self) -> [&DirtyBitset; 10] {
        [
            &self.current_length,
            &self.num_successors,
            &self.num_predecessors,
            &self.trim,
            &self.to_add,
            &self.to_add_float,
            &self.num_shortest_paths,
            &self.dependency,
            &self.paths_ready,
            &self.dependency_ready,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn set_test_clear() {
        let bits = DirtyBitset::new(130);
        assert_eq!(bits.len(), 130);
        bits.set(0);
        bits.set(64);
        bits.set(129);
        assert!(bits.test(0) && bits.test(64) && bits.test(129));
        assert!(!bits.test(1) && !bits.test(128));
        assert_eq!(bits.count(), 3);
        bits.clear();
        assert_eq!(bits.count(), 0);
    }

    #[test]
    fn concurrent_sets_are_not_lost() {
        let bits = DirtyBitset::new(1000);
        (0..1000).into_par_iter().for_each(|i| bits.set(i));
        assert_eq!(bits.count(), 1000);
    }

    #[test]
    fn clearing_the_group_clears_every_field() {
        let sets = Bitsets::new(8);
        sets.trim.set(3);
        sets.dependency_ready.set(7);
        sets.clear();
        assert!(!sets.trim.test(3));
        assert!(!sets.dependency_ready.test(7));
    }
}
