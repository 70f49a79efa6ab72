//! Propagation of direct evidence through the PPI network.
//!
//! The diffusion columns of all seed genes are scaled by the seed scores and
//! stored side by side in a `num_genes x num_seeds` matrix.  The walker score
//! of a gene is the largest entry in its row, ignoring the gene's own column.

use rayon::prelude::*;

use super::data::{SeedGene, WalkerHit};
use super::sources::ProximityMatrix;

/// Seed-weighted diffusion sub-matrix.
pub struct WalkerMatrix<'a> {
    matrix: &'a dyn ProximityMatrix,
    seeds: Vec<SeedGene>,
    /// Column-major values, one column per seed.
    weighted: Vec<f32>,
}

impl<'a> WalkerMatrix<'a> {
    /// Build the weighted matrix; seeds not in `matrix` get an all-zero column.
    pub fn build(matrix: &'a dyn ProximityMatrix, seeds: Vec<SeedGene>) -> Self {
        let num_genes = matrix.num_genes();
        let mut weighted = vec![0f32; num_genes * seeds.len()];
        if num_genes > 0 {
            weighted
                .par_chunks_mut(num_genes)
                .zip(seeds.par_iter())
                .for_each(|(dst, seed)| {
                    if let Some(src) = matrix.column_for_gene(seed.gene_id) {
                        let weight = seed.score as f32;
                        for (d, s) in dst.iter_mut().zip(src) {
                            *d = s * weight;
                        }
                    } else {
                        tracing::trace!("seed gene {} not in PPI matrix", seed.gene_id);
                    }
                });
        }

        Self {
            matrix,
            seeds,
            weighted,
        }
    }

    pub fn num_seeds(&self) -> usize {
        self.seeds.len()
    }

    /// Weighted proximity of `gene_id` to the seed in column `col`.
    pub fn value(&self, gene_id: u32, col: usize) -> Option<f32> {
        let row = self.matrix.row_index_for_gene(gene_id)?;
        self.weighted.get(col * self.matrix.num_genes() + row).copied()
    }

    /// Best weighted proximity of `gene_id` to any other seed.
    ///
    /// Returns `None` if the gene is not in the network or the best value is
    /// `<= floor`.
    pub fn walker_hit(&self, gene_id: u32, floor: f64) -> Option<WalkerHit> {
        let row = self.matrix.row_index_for_gene(gene_id)?;
        let num_genes = self.matrix.num_genes();

        let mut best: Option<WalkerHit> = None;
        for (col, seed) in self.seeds.iter().enumerate() {
            if seed.gene_id == gene_id {
                continue;
            }
            let score = self.weighted[col * num_genes + row] as f64;
            if best.map_or(true, |best| score > best.score) {
                best = Some(WalkerHit {
                    score,
                    seed_gene_id: seed.gene_id,
                });
            }
        }

        best.filter(|hit| hit.score > floor)
    }
}
