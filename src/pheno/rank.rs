//! Rank-based normalization of walker scores.
//!
//! Genes with walker evidence are ranked by walker score and mapped onto
//! `[0, rank_ceiling]` so that indirect evidence cannot outrank a good direct
//! hit.  This consumes the provisional results, so it runs once per call.

use itertools::Itertools;

use super::assemble::ProvisionalResult;
use super::data::PriorityResult;

/// Compute the rank-normalized score of each result, `None` without walker evidence.
///
/// Tied walker scores share a bucket whose effective rank is moved down by
/// half the bucket size.
pub fn rank_scores(provisional: &[ProvisionalResult], rank_ceiling: f64) -> Vec<Option<f64>> {
    let total = provisional.len();
    let mut result = vec![None; total];

    let order = (0..total)
        .filter(|&i| provisional[i].walker_score() > 0.0)
        .sorted_by(|&a, &b| {
            provisional[b]
                .walker_score()
                .total_cmp(&provisional[a].walker_score())
        })
        .collect::<Vec<_>>();

    let mut rank = 0usize;
    for (_, bucket) in &order
        .iter()
        .group_by(|&&i| provisional[i].walker_score().to_bits())
    {
        let bucket = bucket.copied().collect::<Vec<_>>();
        let k = bucket.len();
        let effective_rank = if k > 1 { rank + k / 2 } else { rank };
        let score = rank_ceiling * (1.0 - effective_rank as f64 / total as f64);
        for i in bucket {
            result[i] = Some(score);
        }
        rank += k;
    }

    result
}

/// Turn the provisional results into final results.
///
/// The final score is the maximum of the direct score and the rank score.
pub fn normalize(provisional: Vec<ProvisionalResult>, rank_ceiling: f64) -> Vec<PriorityResult> {
    let scores = rank_scores(&provisional, rank_ceiling);
    provisional
        .into_iter()
        .zip(scores)
        .map(|(p, rank_score)| {
            let final_score = match rank_score {
                Some(rank_score) if rank_score > p.direct_score => rank_score,
                _ => p.direct_score,
            };
            PriorityResult {
                gene_id: p.gene_id,
                gene_symbol: p.gene_symbol,
                direct_score: p.direct_score,
                species: p.species,
                walker: p.walker,
                final_score,
            }
        })
        .collect()
}
