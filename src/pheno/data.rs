//! Data structures shared by the prioritization phases.

use enum_map::EnumMap;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::err::PrioError;

/// Enumeration of the species whose phenotype annotations are used.
#[derive(
    Serialize,
    Deserialize,
    enum_map::Enum,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Debug,
    clap::ValueEnum,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Species {
    /// Human diseases annotated with HPO terms.
    Human,
    /// Mouse models annotated with MP terms.
    Mouse,
    /// Zebrafish models annotated with ZP terms.
    Fish,
}

/// How the idealized counterpart of a query term is chosen for the baseline.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SelfMatchRule {
    /// The query term is its own counterpart (same ontology).
    Identity,
    /// The best cross-ontology match of the query term is its counterpart.
    BestCrossMatch,
}

impl Species {
    /// Parse species from its name, e.g., `"HUMAN"` or `"mouse"`.
    pub fn from_name(name: &str) -> Result<Self, PrioError> {
        name.trim()
            .parse()
            .map_err(|_| PrioError::UnknownSpecies(name.to_string()))
    }

    /// Rule for selecting the idealized counterpart in baseline computation.
    pub fn self_match_rule(&self) -> SelfMatchRule {
        match self {
            Species::Human => SelfMatchRule::Identity,
            Species::Mouse | Species::Fish => SelfMatchRule::BestCrossMatch,
        }
    }
}

/// An ontology term.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PhenotypeTerm {
    /// The term ID, e.g., `HP:0001533`.
    pub term_id: String,
    /// The term label.
    pub label: String,
}

/// Similarity of a query term to a candidate term of the same or another ontology.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub query_term_id: String,
    pub candidate_term_id: String,
    pub score: f64,
}

/// A phenotype-annotated disease or animal model record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    /// Identifier of the disease or model, e.g., `OMIM:154700` or `MGI:3623184`.
    pub model_id: String,
    /// NCBI gene ID of the (human orthologue of the) gene.
    pub gene_id: u32,
    /// Symbol of the gene.
    pub gene_symbol: String,
    /// Species of the record.
    pub species: Species,
    /// Annotated terms, in the ontology of `species`.
    pub term_ids: IndexSet<String>,
}

/// A gene with strong direct phenotype evidence used as propagation source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SeedGene {
    pub gene_id: u32,
    pub score: f64,
}

/// Best achievable scores of the query terms for one species.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeciesBaseline {
    pub best_max_score: f64,
    pub best_avg_score: f64,
}

impl SpeciesBaseline {
    /// A degenerate baseline cannot be used for normalization.
    pub fn is_degenerate(&self) -> bool {
        self.best_avg_score <= 0.0 || self.best_max_score <= 0.0
    }
}

/// One piece of term-level evidence for a gene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TermMatchEvidence {
    pub gene_id: u32,
    pub model_id: String,
    pub query_term_id: String,
    pub matched_term_id: String,
    pub score: f64,
}

/// Best scoring model of a gene for one species.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpeciesHit {
    /// The best model's identifier.
    pub model_id: String,
    /// Normalized score of the model in `[0, 1]`.
    pub score: f64,
    /// Best matching model term for each matched query term.
    pub evidence: Vec<TermMatchEvidence>,
}

/// Indirect evidence from the PPI network.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WalkerHit {
    /// Weighted proximity to the closest seed gene.
    pub score: f64,
    /// The seed gene the score originates from.
    pub seed_gene_id: u32,
}

/// A gene to prioritize.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CandidateGene {
    /// The NCBI gene ID.
    pub gene_id: u32,
    /// The gene symbol.
    pub gene_symbol: String,
}

/// The known answer to exclude in benchmarking mode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkTarget {
    /// Disease ID, e.g., `OMIM:154700`, matched as prefix of model IDs.
    pub disease_id: String,
    /// Symbol of the gene known to cause the disease.
    pub gene_symbol: String,
}

impl BenchmarkTarget {
    /// Whether `model` is the known answer and must not be scored.
    pub fn suppresses(&self, model: &Model) -> bool {
        model.model_id.starts_with(&self.disease_id) && model.gene_symbol == self.gene_symbol
    }
}

/// Final prioritization result for one candidate gene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriorityResult {
    pub gene_id: u32,
    pub gene_symbol: String,
    /// Best model score over all species.
    pub direct_score: f64,
    /// Best model per species, if any.
    pub species: EnumMap<Species, Option<SpeciesHit>>,
    /// Indirect evidence via the PPI network, if any.
    pub walker: Option<WalkerHit>,
    /// `max(direct_score, rank-normalized walker score)`.
    pub final_score: f64,
}

impl PriorityResult {
    /// Score of the best model for `species`, 0 if there is none.
    pub fn species_score(&self, species: Species) -> f64 {
        self.species[species]
            .as_ref()
            .map(|hit| hit.score)
            .unwrap_or_default()
    }

    pub fn human_score(&self) -> f64 {
        self.species_score(Species::Human)
    }

    pub fn mouse_score(&self) -> f64 {
        self.species_score(Species::Mouse)
    }

    pub fn fish_score(&self) -> f64 {
        self.species_score(Species::Fish)
    }

    /// Walker score before rank normalization, 0 if there is none.
    pub fn walker_score(&self) -> f64 {
        self.walker.map(|hit| hit.score).unwrap_or_default()
    }

    /// Iterate over the term evidence of all species.
    pub fn evidence(&self) -> impl Iterator<Item = &TermMatchEvidence> {
        self.species
            .values()
            .flatten()
            .flat_map(|hit| hit.evidence.iter())
    }
}
