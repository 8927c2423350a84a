use crate::types::*;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

pub const K_RAND_SEED: u64 = 52;

/// Uniform random edge lists of `2^scale` nodes and `degree` edges per node.
///
/// Edges are generated in blocks, each block seeded from the generator's seed
/// and its index, so the list is the same whatever the thread count.
pub struct Generator {
    num_nodes: usize,
    num_edges: usize,
    block_size: usize,
    seed: u64,
}

impl Generator {
    pub fn new(scale: usize, degree: usize) -> Self {
        let num_nodes = 1 << scale;
        Self {
            num_nodes,
            num_edges: num_nodes * degree,
            block_size: 1 << 18,
            seed: K_RAND_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Relabels nodes with a seeded random permutation.
    pub fn permutate_ids(&self, edge_list: &mut EdgeList) {
        let mut permutation: Vec<NodeId> = (0..self.num_nodes).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        permutation.shuffle(&mut rng);

        edge_list.par_iter_mut().for_each(|e| {
            *e = (permutation[e.0], permutation[e.1]);
        });
    }

    pub fn generate_edge_list(&self) -> EdgeList {
        let uniform = Uniform::from(0..self.num_nodes);
        let num_blocks = (self.num_edges + self.block_size - 1) / self.block_size;
        let edge_list: EdgeList = (0..num_blocks)
            .into_par_iter()
            .flat_map_iter(|block| {
                let mut rng = StdRng::seed_from_u64(self.seed + block as u64);
                let start = block * self.block_size;
                let end = (start + self.block_size).min(self.num_edges);
                (start..end)
                    .map(|_| (uniform.sample(&mut rng), uniform.sample(&mut rng)))
                    .collect::<Vec<_>>()
            })
            .collect();

        debug!(nodes = self.num_nodes, edges = edge_list.len(), seed = self.seed, "generated edge list");
        edge_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_stay_inside_the_node_range() {
        let generator = Generator::new(12, 4);
        let edge_list = generator.generate_edge_list();
        assert_eq!(edge_list.len(), 16384);
        assert!(edge_list.iter().all(|&(u, v)| u < 4096 && v < 4096));
    }

    #[test]
    fn same_seed_same_edges() {
        let a = Generator::new(6, 3).with_seed(7).generate_edge_list();
        let b = Generator::new(6, 3).with_seed(7).generate_edge_list();
        let c = Generator::new(6, 3).with_seed(8).generate_edge_list();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn permutation_keeps_edge_count() {
        let generator = Generator::new(4, 2);
        let mut edges = generator.generate_edge_list();
        let before = edges.len();
        generator.permutate_ids(&mut edges);
        assert_eq!(edges.len(), before);
        assert!(edges.iter().all(|&(u, v)| u < 16 && v < 16));
    }
}
