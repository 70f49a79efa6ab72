//! Read-only data sources consumed by the prioritization.
//!
//! The traits describe what the scoring code needs from term similarity
//! tables, model catalogs and the PPI proximity matrix.  The in-memory
//! implementations are filled by the loaders in `super::load` and by tests.

use std::collections::HashMap;

use enum_map::EnumMap;
use indexmap::IndexMap;

use crate::err::PrioError;

use super::data::{Model, PhenotypeTerm, Species, TermMatch};

/// Pairwise ontology term similarity lookups.
pub trait TermSimilarityProvider: Send + Sync {
    /// Look up a (query) term, `None` if the term is not known.
    fn term(&self, term_id: &str) -> Option<&PhenotypeTerm>;

    /// Similarity of `query_term_id` to `candidate_term_id` in the ontology of `species`.
    fn score_of(&self, query_term_id: &str, candidate_term_id: &str, species: Species)
        -> Option<f64>;

    /// All known matches of `term_id` into the ontology of `species`.
    fn matches_for_term(&self, term_id: &str, species: Species) -> &[TermMatch];

    /// Whether any mapping is available for `species`.
    fn supports_species(&self, _species: Species) -> bool {
        true
    }
}

/// Access to phenotype-annotated disease/model records.
pub trait ModelCatalog: Send + Sync {
    /// All models of `species`, an error if the catalog is unavailable.
    fn models_for_species(&self, species: Species) -> Result<&[Model], anyhow::Error>;
}

/// Precomputed gene x gene PPI diffusion matrix over a fixed gene universe.
pub trait ProximityMatrix: Send + Sync {
    /// Size of the gene universe.
    fn num_genes(&self) -> usize;

    /// Row index of `gene_id`, `None` if it is not part of the universe.
    fn row_index_for_gene(&self, gene_id: u32) -> Option<usize>;

    /// The diffusion column of `gene_id`, of length `num_genes()`.
    fn column_for_gene(&self, gene_id: u32) -> Option<&[f32]>;

    fn contains_gene(&self, gene_id: u32) -> bool {
        self.row_index_for_gene(gene_id).is_some()
    }
}

/// Matches of one query term into one target ontology.
#[derive(Debug, Default, Clone)]
struct TermRow {
    /// Matches in order of insertion.
    matches: Vec<TermMatch>,
    /// Index into `matches` by candidate term ID.
    by_candidate: HashMap<String, usize>,
}

/// Term similarity table held in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTermSimilarity {
    terms: HashMap<String, PhenotypeTerm>,
    rows: EnumMap<Species, HashMap<String, TermRow>>,
}

impl InMemoryTermSimilarity {
    /// Construct with the given term labels and no similarities.
    pub fn new(terms: impl IntoIterator<Item = PhenotypeTerm>) -> Self {
        Self {
            terms: terms
                .into_iter()
                .map(|term| (term.term_id.clone(), term))
                .collect(),
            ..Default::default()
        }
    }

    /// Register a term label.
    pub fn insert_term(&mut self, term: PhenotypeTerm) {
        self.terms.insert(term.term_id.clone(), term);
    }

    /// Insert similarity, keeping the higher score if the pair is already known.
    pub fn insert_match(&mut self, species: Species, term_match: TermMatch) {
        let row = self.rows[species]
            .entry(term_match.query_term_id.clone())
            .or_default();
        match row.by_candidate.get(&term_match.candidate_term_id) {
            Some(&idx) => {
                if term_match.score > row.matches[idx].score {
                    row.matches[idx].score = term_match.score;
                }
            }
            None => {
                row.by_candidate
                    .insert(term_match.candidate_term_id.clone(), row.matches.len());
                row.matches.push(term_match);
            }
        }
    }

    /// Number of similarity entries for `species`.
    pub fn num_matches(&self, species: Species) -> usize {
        self.rows[species].values().map(|row| row.matches.len()).sum()
    }
}

impl TermSimilarityProvider for InMemoryTermSimilarity {
    fn term(&self, term_id: &str) -> Option<&PhenotypeTerm> {
        self.terms.get(term_id)
    }

    fn score_of(
        &self,
        query_term_id: &str,
        candidate_term_id: &str,
        species: Species,
    ) -> Option<f64> {
        let row = self.rows[species].get(query_term_id)?;
        row.by_candidate
            .get(candidate_term_id)
            .map(|&idx| row.matches[idx].score)
    }

    fn matches_for_term(&self, term_id: &str, species: Species) -> &[TermMatch] {
        self.rows[species]
            .get(term_id)
            .map(|row| row.matches.as_slice())
            .unwrap_or(&[])
    }

    fn supports_species(&self, species: Species) -> bool {
        !self.rows[species].is_empty()
    }
}

/// Model catalog held in memory; species without models are "unavailable".
#[derive(Debug, Default, Clone)]
pub struct InMemoryModelCatalog {
    models: EnumMap<Species, Option<Vec<Model>>>,
}

impl InMemoryModelCatalog {
    pub fn new(models: impl IntoIterator<Item = Model>) -> Self {
        let mut result = Self::default();
        for model in models {
            result.insert(model);
        }
        result
    }

    pub fn insert(&mut self, model: Model) {
        self.models[model.species]
            .get_or_insert_with(Vec::new)
            .push(model);
    }

    pub fn num_models(&self, species: Species) -> usize {
        self.models[species].as_ref().map(Vec::len).unwrap_or_default()
    }
}

impl ModelCatalog for InMemoryModelCatalog {
    fn models_for_species(&self, species: Species) -> Result<&[Model], anyhow::Error> {
        self.models[species]
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no models available for species {}", species))
    }
}

/// Square diffusion matrix stored column-major.
#[derive(Debug, Default, Clone)]
pub struct DenseProximityMatrix {
    /// Gene ID to row/column index.
    genes: IndexMap<u32, usize>,
    /// Column-major values, `genes.len()` squared.
    values: Vec<f32>,
}

impl DenseProximityMatrix {
    /// Construct from gene IDs and one diffusion column per gene (same order).
    pub fn new(gene_ids: Vec<u32>, columns: Vec<Vec<f32>>) -> Result<Self, PrioError> {
        let n = gene_ids.len();
        if columns.len() != n {
            return Err(PrioError::MatrixNotSquare {
                rows: n,
                cols: columns.len(),
            });
        }

        let mut genes = IndexMap::with_capacity(n);
        for (idx, gene_id) in gene_ids.iter().enumerate() {
            if genes.insert(*gene_id, idx).is_some() {
                return Err(PrioError::MatrixDuplicateGene(*gene_id));
            }
        }

        let mut values = Vec::with_capacity(n * n);
        for (gene_id, column) in gene_ids.iter().zip(columns) {
            if column.len() != n {
                return Err(PrioError::MatrixRaggedRow {
                    gene_id: *gene_id,
                    found: column.len(),
                    expected: n,
                });
            }
            values.extend(column);
        }

        Ok(Self { genes, values })
    }

    /// Gene IDs in matrix order.
    pub fn gene_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.genes.keys().copied()
    }
}

impl ProximityMatrix for DenseProximityMatrix {
    fn num_genes(&self) -> usize {
        self.genes.len()
    }

    fn row_index_for_gene(&self, gene_id: u32) -> Option<usize> {
        self.genes.get(&gene_id).copied()
    }

    fn column_for_gene(&self, gene_id: u32) -> Option<&[f32]> {
        let n = self.genes.len();
        self.row_index_for_gene(gene_id)
            .map(|idx| &self.values[idx * n..(idx + 1) * n])
    }
}
