//! Assembly of provisional per-gene results.

use enum_map::EnumMap;
use indexmap::IndexMap;

use super::aggregate::MatchSummary;
use super::data::{CandidateGene, Species, SpeciesHit, WalkerHit};
use super::walker::WalkerMatrix;

/// Per-gene result before rank normalization; it has no final score yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalResult {
    pub gene_id: u32,
    pub gene_symbol: String,
    pub direct_score: f64,
    pub species: EnumMap<Species, Option<SpeciesHit>>,
    pub walker: Option<WalkerHit>,
}

impl ProvisionalResult {
    pub fn walker_score(&self) -> f64 {
        self.walker.map(|hit| hit.score).unwrap_or_default()
    }
}

/// Remove duplicate candidates, keeping the first occurrence.
pub fn unique_candidates(candidates: &[CandidateGene]) -> Vec<&CandidateGene> {
    let mut seen = IndexMap::new();
    for candidate in candidates {
        seen.entry(candidate.gene_id).or_insert(candidate);
    }
    seen.into_values().collect()
}

/// Build one provisional result per candidate gene, in candidate order.
///
/// Genes that are not candidates are never scored, even if they have direct
/// evidence.  Walker scores are only computed if `walker` is given.
pub fn assemble(
    candidates: &[CandidateGene],
    summary: &MatchSummary,
    walker: Option<&WalkerMatrix>,
    walker_floor: f64,
) -> Vec<ProvisionalResult> {
    unique_candidates(candidates)
        .into_iter()
        .map(|candidate| ProvisionalResult {
            gene_id: candidate.gene_id,
            gene_symbol: candidate.gene_symbol.clone(),
            direct_score: summary.direct_score(candidate.gene_id),
            species: summary.species_hits(candidate.gene_id),
            walker: walker.and_then(|walker| walker.walker_hit(candidate.gene_id, walker_floor)),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pheno::aggregate::{SeedAccumulator, SpeciesOutcome};
    use crate::pheno::data::{SeedGene, SpeciesBaseline};
    use crate::pheno::sources::DenseProximityMatrix;

    fn candidate(gene_id: u32, symbol: &str) -> CandidateGene {
        CandidateGene {
            gene_id,
            gene_symbol: symbol.to_string(),
        }
    }

    fn summary() -> MatchSummary {
        let mut outcome = SpeciesOutcome::empty(Species::Mouse);
        outcome.baseline = Some(SpeciesBaseline {
            best_max_score: 1.0,
            best_avg_score: 1.0,
        });
        for (gene_id, score) in [(1, 0.875), (5, 0.9)] {
            outcome.hits.insert(
                gene_id,
                SpeciesHit {
                    model_id: format!("MGI:{}", gene_id),
                    score,
                    evidence: Vec::new(),
                },
            );
        }
        let mut seeds = SeedAccumulator::default();
        seeds.upsert(1, 0.875);
        seeds.upsert(5, 0.9);
        outcome.seeds = seeds;

        let mut summary = MatchSummary::default();
        summary.merge(outcome);
        summary
    }

    #[test]
    fn unique_candidates_keeps_first() {
        let candidates = vec![candidate(1, "A"), candidate(2, "B"), candidate(1, "A2")];

        assert_eq!(
            unique_candidates(&candidates),
            vec![&candidates[0], &candidates[1]]
        );
    }

    #[test]
    fn assemble_without_walker() {
        let candidates = vec![candidate(1, "A"), candidate(2, "B")];
        let res = assemble(&candidates, &summary(), None, 1e-5);

        assert_eq!(res.len(), 2);
        assert_eq!(res[0].direct_score, 0.875);
        assert_eq!(
            res[0].species[Species::Mouse]
                .as_ref()
                .map(|hit| hit.model_id.as_str()),
            Some("MGI:1")
        );
        assert_eq!(res[0].walker, None);
        assert_eq!(res[1].direct_score, 0.0);
        assert_eq!(res[1].species[Species::Mouse], None);
    }

    #[test]
    fn assemble_with_walker() -> Result<(), anyhow::Error> {
        let matrix = DenseProximityMatrix::new(
            vec![1, 2, 3],
            vec![
                vec![1.0, 0.4, 0.0],
                vec![0.4, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )?;
        let summary = summary();
        let walker = WalkerMatrix::build(&matrix, summary.seeds.to_seeds());
        // gene 5 has direct evidence but is no candidate
        let candidates = vec![candidate(1, "A"), candidate(2, "B"), candidate(3, "C")];
        let res = assemble(&candidates, &summary, Some(&walker), 1e-5);

        assert_eq!(
            res.iter().map(|r| r.gene_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(approx_eq!(f64, res[1].walker_score(), 0.35, epsilon = 1e-6));
        assert_eq!(res[1].direct_score, 0.0);
        assert_eq!(res[0].walker, None);
        assert_eq!(res[2].walker, None);
        assert_eq!(
            summary.seeds.to_seeds()[0],
            SeedGene {
                gene_id: 1,
                score: 0.875
            }
        );

        Ok(())
    }
}
