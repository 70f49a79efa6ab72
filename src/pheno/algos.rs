//! Phenotype-related algorithms.

/// Reciprocal best-hit matching of query terms against model annotations.
pub mod best_hit {
    use indexmap::IndexSet;

    use crate::pheno::data::{SelfMatchRule, Species, SpeciesBaseline};
    use crate::pheno::sources::TermSimilarityProvider;

    /// Upper bound of the combined score before scaling to `[0, 1]`.
    const MAX_COMBINED: f64 = 100.0;

    /// Best matching model term of one query term.
    #[derive(Debug, Clone, PartialEq)]
    pub struct QueryTermHit {
        pub query_term_id: String,
        pub matched_term_id: String,
        pub score: f64,
    }

    /// Result of matching the query against one model.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ModelMatch {
        /// Normalized score in `[0, 1]`.
        pub score: f64,
        /// Best hit for each query term with a non-zero match.
        pub hits: Vec<QueryTermHit>,
    }

    /// Compute the best achievable scores of `query` in the ontology of `species`.
    ///
    /// Each query term is paired with its idealized counterpart (see
    /// `SelfMatchRule`).  The reciprocal score of that counterpart is the best
    /// score any query term reaches against it.  Query terms without a
    /// counterpart do not contribute to the average.
    pub fn baseline(
        query: &IndexSet<String>,
        species: Species,
        provider: &dyn TermSimilarityProvider,
    ) -> SpeciesBaseline {
        let mut sum = 0f64;
        let mut best_max_score = 0f64;
        let mut num_nonzero = 0usize;

        for q in query {
            let counterpart = match species.self_match_rule() {
                SelfMatchRule::Identity => provider
                    .score_of(q, q, species)
                    .map(|score| (q.as_str(), score)),
                SelfMatchRule::BestCrossMatch => provider
                    .matches_for_term(q, species)
                    .iter()
                    .fold(None, |best: Option<(&str, f64)>, m| match best {
                        Some((_, best_score)) if best_score >= m.score => best,
                        _ => Some((m.candidate_term_id.as_str(), m.score)),
                    }),
            };
            let (counterpart, row_score) = match counterpart {
                Some((term_id, score)) if score > 0.0 => (term_id, score),
                _ => continue,
            };

            let col_score = query
                .iter()
                .filter_map(|other| provider.score_of(other, counterpart, species))
                .fold(row_score, f64::max);

            sum += row_score + col_score;
            best_max_score = best_max_score.max(row_score).max(col_score);
            num_nonzero += 1;
        }

        if num_nonzero == 0 {
            SpeciesBaseline::default()
        } else {
            SpeciesBaseline {
                best_max_score,
                best_avg_score: sum / (2 * num_nonzero) as f64,
            }
        }
    }

    /// Score `model_terms` against `query`, normalized by `baseline`.
    ///
    /// Returns `None` if no pair of terms matches or the baseline is degenerate.
    pub fn score(
        query: &IndexSet<String>,
        model_terms: &IndexSet<String>,
        species: Species,
        baseline: &SpeciesBaseline,
        provider: &dyn TermSimilarityProvider,
    ) -> Option<ModelMatch> {
        if baseline.is_degenerate() || query.is_empty() || model_terms.is_empty() {
            return None;
        }

        let mut best_row = vec![(0f64, None::<usize>); query.len()];
        let mut best_col = vec![0f64; model_terms.len()];
        for (i, q) in query.iter().enumerate() {
            for (j, m) in model_terms.iter().enumerate() {
                if let Some(s) = provider.score_of(q, m, species) {
                    if s > best_row[i].0 {
                        best_row[i] = (s, Some(j));
                    }
                    if s > best_col[j] {
                        best_col[j] = s;
                    }
                }
            }
        }

        let sum_rows: f64 = best_row.iter().map(|(s, _)| s).sum();
        let sum_cols: f64 = best_col.iter().sum();
        if sum_rows + sum_cols <= 0.0 {
            return None;
        }

        let max_score = best_row
            .iter()
            .map(|(s, _)| *s)
            .chain(best_col.iter().copied())
            .fold(0f64, f64::max);
        let avg_score = (sum_rows + sum_cols) / (query.len() + model_terms.len()) as f64;
        let combined = (50.0
            * (max_score / baseline.best_max_score + avg_score / baseline.best_avg_score))
            .min(MAX_COMBINED);

        let hits = query
            .iter()
            .zip(best_row.iter())
            .filter_map(|(q, (s, j))| {
                j.and_then(|j| model_terms.get_index(j))
                    .map(|m| QueryTermHit {
                        query_term_id: q.clone(),
                        matched_term_id: m.clone(),
                        score: *s,
                    })
            })
            .collect();

        Some(ModelMatch {
            score: combined / MAX_COMBINED,
            hits,
        })
    }
}
