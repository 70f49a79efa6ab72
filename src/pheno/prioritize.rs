//! The prioritization pipeline.
//!
//! Phases run strictly in order: query resolution, per-species aggregation
//! (in parallel), propagation matrix, provisional results, rank normalization.

use std::time::Instant;

use indexmap::IndexSet;
use rayon::prelude::*;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::aggregate::{aggregate_species, MatchSummary, SpeciesContext};
use super::assemble::assemble;
use super::conf::PrioritizationSettings;
use super::data::{BenchmarkTarget, CandidateGene, PriorityResult, Species};
use super::rank::normalize;
use super::sources::{ModelCatalog, ProximityMatrix, TermSimilarityProvider};
use super::walker::WalkerMatrix;

/// Input of one prioritization call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    /// The genes to prioritize; exactly these are scored.
    pub candidates: Vec<CandidateGene>,
    /// Query (patient) term IDs.
    pub query_term_ids: Vec<String>,
    /// Species to use, all if empty.
    pub species: Vec<Species>,
    /// Known answer to exclude in benchmarking mode.
    pub benchmark: Option<BenchmarkTarget>,
}

/// The read-only resources used for prioritization.
#[derive(Clone, Copy)]
pub struct Resources<'a> {
    pub similarity: &'a dyn TermSimilarityProvider,
    pub catalog: &'a dyn ModelCatalog,
    /// PPI proximity, propagation is skipped if `None`.
    pub proximity: Option<&'a dyn ProximityMatrix>,
}

/// Output of one prioritization call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Query terms that were used, unknown terms are dropped.
    pub query: IndexSet<String>,
    /// Species that were used.
    pub species: Vec<Species>,
    /// Number of seed genes used for propagation.
    pub num_seeds: usize,
    /// One result per unique candidate, in candidate order.
    pub results: Vec<PriorityResult>,
}

/// Keep the known query terms, in order and without duplicates.
pub fn resolve_query(
    query_term_ids: &[String],
    similarity: &dyn TermSimilarityProvider,
) -> IndexSet<String> {
    query_term_ids
        .iter()
        .filter(|term_id| {
            let known = similarity.term(term_id).is_some();
            if !known {
                debug!("dropping unknown query term {}", term_id);
            }
            known
        })
        .cloned()
        .collect()
}

/// The species to use, in fixed order and without duplicates.
fn resolve_species(species: &[Species]) -> Vec<Species> {
    Species::iter()
        .filter(|s| species.is_empty() || species.contains(s))
        .collect()
}

/// Run the prioritization for `request`.
pub fn prioritize(
    request: &Request,
    resources: &Resources,
    settings: &PrioritizationSettings,
) -> Outcome {
    let query = resolve_query(&request.query_term_ids, resources.similarity);
    let species = resolve_species(&request.species);
    info!(
        "prioritizing {} candidates with {} of {} query terms for {:?}",
        request.candidates.len(),
        query.len(),
        request.query_term_ids.len(),
        &species
    );

    let before_matching = Instant::now();
    let outcomes = species
        .par_iter()
        .map(|species| {
            let ctx = SpeciesContext {
                species: *species,
                similarity: resources.similarity,
                catalog: resources.catalog,
            };
            aggregate_species(&ctx, &query, settings, request.benchmark.as_ref())
        })
        .collect::<Vec<_>>();
    let mut summary = MatchSummary::default();
    for outcome in outcomes {
        summary.merge(outcome);
    }
    info!(
        "... done matching models in {:?}: {} genes with direct evidence, {} seeds",
        before_matching.elapsed(),
        summary.direct.len(),
        summary.seeds.len()
    );

    let walker = match resources.proximity {
        Some(proximity) if settings.use_ppi => {
            let before_walker = Instant::now();
            let walker = WalkerMatrix::build(proximity, summary.seeds.to_seeds());
            info!(
                "... done building propagation matrix for {} seeds in {:?}",
                walker.num_seeds(),
                before_walker.elapsed()
            );
            Some(walker)
        }
        _ => None,
    };

    let provisional = assemble(
        &request.candidates,
        &summary,
        walker.as_ref(),
        settings.walker_floor,
    );
    let results = normalize(provisional, settings.rank_ceiling);

    Outcome {
        query,
        species,
        num_seeds: summary.seeds.len(),
        results,
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use indexmap::IndexSet;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pheno::data::{Model, PhenotypeTerm, TermMatch};
    use crate::pheno::sources::{
        DenseProximityMatrix, InMemoryModelCatalog, InMemoryTermSimilarity,
    };

    /// Small world: genes 1 (A), 2 (B), 3 (C), 4 (D), 5 (E).
    struct World {
        similarity: InMemoryTermSimilarity,
        catalog: InMemoryModelCatalog,
        proximity: DenseProximityMatrix,
    }

    impl World {
        fn resources(&self) -> Resources<'_> {
            Resources {
                similarity: &self.similarity,
                catalog: &self.catalog,
                proximity: Some(&self.proximity),
            }
        }
    }

    fn model(model_id: &str, gene_id: u32, symbol: &str, species: Species, ts: &[&str]) -> Model {
        Model {
            model_id: model_id.to_string(),
            gene_id,
            gene_symbol: symbol.to_string(),
            species,
            term_ids: ts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[rstest::fixture]
    fn world() -> World {
        let mut similarity = InMemoryTermSimilarity::new(["HP:1", "HP:2"].iter().map(|id| {
            PhenotypeTerm {
                term_id: id.to_string(),
                label: format!("term {}", id),
            }
        }));
        for (species, q, c, score) in [
            (Species::Human, "HP:1", "HP:1", 1.0),
            (Species::Human, "HP:2", "HP:2", 1.0),
            (Species::Mouse, "HP:1", "MP:1", 0.8),
            (Species::Mouse, "HP:2", "MP:2", 0.9),
            (Species::Mouse, "HP:1", "MP:2", 0.1),
            (Species::Fish, "HP:1", "ZP:1", 0.5),
        ] {
            similarity.insert_match(
                species,
                TermMatch {
                    query_term_id: q.to_string(),
                    candidate_term_id: c.to_string(),
                    score,
                },
            );
        }
        let catalog = InMemoryModelCatalog::new(vec![
            model("OMIM:100", 1, "AAA", Species::Human, &["HP:1", "HP:2"]),
            model("MGI:1", 1, "AAA", Species::Mouse, &["MP:1"]),
            model("MGI:2", 5, "EEE", Species::Mouse, &["MP:2"]),
            model("ZFIN:1", 4, "DDD", Species::Fish, &["ZP:1"]),
        ]);
        let proximity = DenseProximityMatrix::new(
            vec![1, 2, 3, 4],
            vec![
                vec![1.0, 0.4, 0.1, 0.0],
                vec![0.4, 1.0, 0.3, 0.0],
                vec![0.1, 0.3, 1.0, 0.0],
                vec![0.0, 0.0, 0.0, 1.0],
            ],
        )
        .expect("valid matrix");

        World {
            similarity,
            catalog,
            proximity,
        }
    }

    fn request(candidates: &[(u32, &str)]) -> Request {
        Request {
            candidates: candidates
                .iter()
                .map(|(gene_id, symbol)| CandidateGene {
                    gene_id: *gene_id,
                    gene_symbol: symbol.to_string(),
                })
                .collect(),
            query_term_ids: vec![
                String::from("HP:1"),
                String::from("HP:404"),
                String::from("HP:2"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn resolve_species_order() {
        assert_eq!(
            resolve_species(&[]),
            vec![Species::Human, Species::Mouse, Species::Fish]
        );
        assert_eq!(
            resolve_species(&[Species::Fish, Species::Human, Species::Fish]),
            vec![Species::Human, Species::Fish]
        );
    }

    #[rstest::rstest]
    fn resolve_query_drops_unknown(world: World) {
        let query = resolve_query(
            &[
                String::from("HP:2"),
                String::from("HP:404"),
                String::from("HP:2"),
                String::from("HP:1"),
            ],
            &world.similarity,
        );

        assert_eq!(
            query,
            IndexSet::from([String::from("HP:2"), String::from("HP:1")])
        );
    }

    #[rstest::rstest]
    fn prioritize_all_species(world: World) {
        let request = request(&[(1, "AAA"), (2, "BBB"), (3, "CCC"), (4, "DDD")]);
        let outcome = prioritize(
            &request,
            &world.resources(),
            &PrioritizationSettings::default(),
        );

        assert_eq!(outcome.query.len(), 2);
        assert_eq!(
            outcome.results.iter().map(|r| r.gene_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        // seeds: gene 1 (human and mouse), gene 5 (mouse) and gene 4 (fish)
        assert_eq!(outcome.num_seeds, 3);

        let a = &outcome.results[0];
        assert!(approx_eq!(f64, a.direct_score, 1.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, a.final_score, a.direct_score, epsilon = 1e-12));
        assert!(a.human_score() > 0.0);
        assert!(a.mouse_score() > 0.0);

        // B: walker-only, closest to A, top rank of 4 candidates
        let b = &outcome.results[1];
        assert_eq!(b.direct_score, 0.0);
        assert_eq!(b.walker.map(|w| w.seed_gene_id), Some(1));
        assert_eq!(b.final_score, 0.6);

        // C: second rank
        let c = &outcome.results[2];
        assert!(approx_eq!(f64, c.final_score, 0.45, epsilon = 1e-12));

        // D: fish-only direct evidence, isolated in the network
        let d = &outcome.results[3];
        assert_eq!(d.walker, None);
        assert!(d.fish_score() > 0.0);
        assert_eq!(d.final_score, d.direct_score);

        for r in &outcome.results {
            assert!((0.0..=1.0).contains(&r.final_score), "{:?}", r);
        }
    }

    #[rstest::rstest]
    fn prioritize_without_ppi(world: World) {
        let request = request(&[(1, "AAA"), (2, "BBB")]);
        let settings = PrioritizationSettings {
            use_ppi: false,
            ..Default::default()
        };
        let outcome = prioritize(&request, &world.resources(), &settings);

        assert_eq!(outcome.results[1].walker, None);
        assert_eq!(outcome.results[1].final_score, 0.0);
    }

    #[rstest::rstest]
    fn prioritize_human_only(world: World) {
        let mut request = request(&[(1, "AAA"), (4, "DDD"), (5, "EEE")]);
        request.species = vec![Species::Human];
        let outcome = prioritize(&request, &world.resources(), &PrioritizationSettings::default());

        assert_eq!(outcome.species, vec![Species::Human]);
        assert_eq!(outcome.results[1].direct_score, 0.0);
        assert_eq!(outcome.results[2].direct_score, 0.0);
        assert_eq!(outcome.results[0].mouse_score(), 0.0);
    }

    #[rstest::rstest]
    fn prioritize_benchmark_suppression(world: World) {
        let mut request = request(&[(1, "AAA"), (2, "BBB")]);
        request.species = vec![Species::Human];
        request.benchmark = Some(BenchmarkTarget {
            disease_id: String::from("OMIM:100"),
            gene_symbol: String::from("AAA"),
        });
        let outcome = prioritize(&request, &world.resources(), &PrioritizationSettings::default());

        assert_eq!(outcome.num_seeds, 0);
        for r in &outcome.results {
            assert_eq!(r.final_score, 0.0);
            assert_eq!(r.evidence().count(), 0);
        }
    }

    #[rstest::rstest]
    fn prioritize_unknown_query(world: World) {
        let mut request = request(&[(1, "AAA"), (2, "BBB")]);
        request.query_term_ids = vec![String::from("HP:404")];
        let outcome = prioritize(&request, &world.resources(), &PrioritizationSettings::default());

        assert!(outcome.query.is_empty());
        for r in &outcome.results {
            assert_eq!(r.final_score, 0.0);
            assert_eq!(r.walker, None);
        }
    }

    #[rstest::rstest]
    fn prioritize_is_deterministic(world: World) {
        let request = request(&[(4, "DDD"), (3, "CCC"), (2, "BBB"), (1, "AAA")]);
        let first = prioritize(&request, &world.resources(), &PrioritizationSettings::default());
        for _ in 0..5 {
            let again =
                prioritize(&request, &world.resources(), &PrioritizationSettings::default());
            assert_eq!(again, first);
        }
    }
}
