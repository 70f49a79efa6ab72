//! Aggregation of model scores by gene, per species and across species.

use enum_map::EnumMap;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use super::algos::best_hit;
use super::conf::PrioritizationSettings;
use super::data::{
    BenchmarkTarget, SeedGene, Species, SpeciesBaseline, SpeciesHit, TermMatchEvidence,
};
use super::sources::{ModelCatalog, TermSimilarityProvider};

/// The data sources to use for one species.
#[derive(Clone, Copy)]
pub struct SpeciesContext<'a> {
    pub species: Species,
    /// Mapping of query terms into the species' ontology.
    pub similarity: &'a dyn TermSimilarityProvider,
    /// Annotated models of the species.
    pub catalog: &'a dyn ModelCatalog,
}

/// Seed genes with their best score, in order of first nomination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedAccumulator {
    seeds: IndexMap<u32, f64>,
}

impl SeedAccumulator {
    /// Insert `gene_id` or raise its score; returns whether anything changed.
    pub fn upsert(&mut self, gene_id: u32, score: f64) -> bool {
        match self.seeds.get_mut(&gene_id) {
            Some(existing) if *existing >= score => false,
            Some(existing) => {
                *existing = score;
                true
            }
            None => {
                self.seeds.insert(gene_id, score);
                true
            }
        }
    }

    pub fn merge(&mut self, other: &SeedAccumulator) {
        for (gene_id, score) in &other.seeds {
            self.upsert(*gene_id, *score);
        }
    }

    pub fn get(&self, gene_id: u32) -> Option<f64> {
        self.seeds.get(&gene_id).copied()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// The seed list, one entry per gene.
    pub fn to_seeds(&self) -> Vec<SeedGene> {
        self.seeds
            .iter()
            .map(|(gene_id, score)| SeedGene {
                gene_id: *gene_id,
                score: *score,
            })
            .collect()
    }
}

/// Insert `hit` for `gene_id` unless an equal or better hit is present.
fn upsert_hit(hits: &mut IndexMap<u32, SpeciesHit>, gene_id: u32, hit: SpeciesHit) -> bool {
    match hits.get_mut(&gene_id) {
        Some(existing) if existing.score >= hit.score => false,
        Some(existing) => {
            *existing = hit;
            true
        }
        None => {
            hits.insert(gene_id, hit);
            true
        }
    }
}

/// Result of scoring all models of one species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesOutcome {
    pub species: Species,
    /// The baseline, `None` if the species was skipped.
    pub baseline: Option<SpeciesBaseline>,
    /// Best model per gene.
    pub hits: IndexMap<u32, SpeciesHit>,
    /// Genes with a high-quality hit.
    pub seeds: SeedAccumulator,
    /// Number of models with a non-zero score.
    pub num_scored: usize,
    /// Number of models excluded in benchmarking mode.
    pub num_suppressed: usize,
}

impl SpeciesOutcome {
    /// Outcome of a species that contributes no evidence.
    pub fn empty(species: Species) -> Self {
        Self {
            species,
            baseline: None,
            hits: IndexMap::new(),
            seeds: SeedAccumulator::default(),
            num_scored: 0,
            num_suppressed: 0,
        }
    }
}

/// Score all models of one species against `query`.
///
/// Missing mappings, an unavailable catalog or a degenerate baseline make the
/// species contribute nothing.
pub fn aggregate_species(
    ctx: &SpeciesContext,
    query: &IndexSet<String>,
    settings: &PrioritizationSettings,
    benchmark: Option<&BenchmarkTarget>,
) -> SpeciesOutcome {
    let species = ctx.species;
    let mut outcome = SpeciesOutcome::empty(species);

    if !ctx.similarity.supports_species(species) {
        warn!("no term mappings for species {}, skipping", species);
        return outcome;
    }
    let models = match ctx.catalog.models_for_species(species) {
        Ok(models) => models,
        Err(e) => {
            warn!("models for species {} unavailable, skipping: {}", species, e);
            return outcome;
        }
    };

    let baseline = best_hit::baseline(query, species, ctx.similarity);
    debug!("baseline for {} = {:?}", species, &baseline);
    if baseline.is_degenerate() {
        warn!(
            "degenerate baseline for species {} ({:?}), skipping",
            species, &baseline
        );
        return outcome;
    }
    outcome.baseline = Some(baseline);

    for model in models {
        if benchmark.map_or(false, |target| target.suppresses(model)) {
            debug!(
                "suppressing {} / {} in benchmarking mode",
                &model.model_id, &model.gene_symbol
            );
            outcome.num_suppressed += 1;
            continue;
        }

        let Some(model_match) =
            best_hit::score(query, &model.term_ids, species, &baseline, ctx.similarity)
        else {
            continue;
        };
        if model_match.score <= 0.0 {
            continue;
        }
        outcome.num_scored += 1;

        if model_match.score > settings.seed_threshold {
            outcome.seeds.upsert(model.gene_id, model_match.score);
        }

        let hit = SpeciesHit {
            model_id: model.model_id.clone(),
            score: model_match.score,
            evidence: model_match
                .hits
                .into_iter()
                .map(|h| TermMatchEvidence {
                    gene_id: model.gene_id,
                    model_id: model.model_id.clone(),
                    query_term_id: h.query_term_id,
                    matched_term_id: h.matched_term_id,
                    score: h.score,
                })
                .collect(),
        };
        upsert_hit(&mut outcome.hits, model.gene_id, hit);
    }

    debug!(
        "species {}: {} models scored, {} genes hit, {} seeds, {} suppressed",
        species,
        outcome.num_scored,
        outcome.hits.len(),
        outcome.seeds.len(),
        outcome.num_suppressed
    );

    outcome
}

/// Direct evidence of all species, merged by maximum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSummary {
    /// Best score over all species by gene.
    pub direct: IndexMap<u32, f64>,
    /// Best model per species and gene.
    pub hits: EnumMap<Species, IndexMap<u32, SpeciesHit>>,
    /// Seed genes of all species.
    pub seeds: SeedAccumulator,
    /// Baselines of species that were scored.
    pub baselines: EnumMap<Species, Option<SpeciesBaseline>>,
}

impl MatchSummary {
    /// Merge the outcome of one species; the order of merging does not matter.
    pub fn merge(&mut self, outcome: SpeciesOutcome) {
        let species = outcome.species;
        if outcome.baseline.is_some() {
            self.baselines[species] = outcome.baseline;
        }
        self.seeds.merge(&outcome.seeds);
        for (gene_id, hit) in outcome.hits {
            let direct = self.direct.entry(gene_id).or_default();
            if hit.score > *direct {
                *direct = hit.score;
            }
            upsert_hit(&mut self.hits[species], gene_id, hit);
        }
    }

    /// Best direct score of `gene_id`, 0 if there is none.
    pub fn direct_score(&self, gene_id: u32) -> f64 {
        self.direct.get(&gene_id).copied().unwrap_or_default()
    }

    /// Best model of `gene_id` for each species.
    pub fn species_hits(&self, gene_id: u32) -> EnumMap<Species, Option<SpeciesHit>> {
        EnumMap::from_fn(|species| self.hits[species].get(&gene_id).cloned())
    }

    /// All term evidence records.
    pub fn evidence(&self) -> impl Iterator<Item = &TermMatchEvidence> {
        self.hits
            .values()
            .flat_map(|hits| hits.values())
            .flat_map(|hit| hit.evidence.iter())
    }
}
