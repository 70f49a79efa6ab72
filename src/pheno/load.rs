//! Loading of the prioritization resources from TSV and JSON files.
//!
//! All tables are read with the `csv` crate via serde; files ending in `.gz`
//! are decompressed transparently.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{io::open_read_maybe_gz, numeric_gene_id};
use crate::err::PrioError;

use super::data::{CandidateGene, Model, PhenotypeTerm, Species, TermMatch};
use super::sources::{DenseProximityMatrix, InMemoryModelCatalog, InMemoryTermSimilarity};

/// Construct a TSV reader with header.
fn tsv_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<Box<dyn std::io::BufRead>>, anyhow::Error> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_reader(open_read_maybe_gz(path)?))
}

/// Code for the term label table.
pub mod terms {
    use super::*;

    /// Read the `term_id\tlabel` file.
    pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<PhenotypeTerm>, anyhow::Error> {
        let mut rdr = tsv_reader(path)?;
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: PhenotypeTerm = result?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Code for the term similarity table.
pub mod similarity {
    use super::*;

    /// One row of the similarity table.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Entry {
        /// Target species, e.g., `HUMAN` or `mouse`.
        pub species: String,
        pub query_term_id: String,
        pub candidate_term_id: String,
        pub score: f64,
    }

    /// Read the similarity file.
    pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>, anyhow::Error> {
        let mut rdr = tsv_reader(path)?;
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: Entry = result?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Build the in-memory similarity table from label and similarity files.
    pub fn load<P, Q>(path_terms: P, path_similarity: Q) -> Result<InMemoryTermSimilarity, anyhow::Error>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let terms = terms::load_entries(path_terms.as_ref())
            .map_err(|e| anyhow::anyhow!("error loading {:?}: {}", path_terms.as_ref(), e))?;
        let mut result = InMemoryTermSimilarity::new(terms);

        let entries = load_entries(path_similarity.as_ref()).map_err(|e| {
            anyhow::anyhow!("error loading {:?}: {}", path_similarity.as_ref(), e)
        })?;
        for entry in entries {
            let species = Species::from_name(&entry.species)?;
            result.insert_match(
                species,
                TermMatch {
                    query_term_id: entry.query_term_id,
                    candidate_term_id: entry.candidate_term_id,
                    score: entry.score,
                },
            );
        }

        Ok(result)
    }
}

/// Code for the model table.
pub mod models {
    use serde_with::{formats::CommaSeparator, StringWithSeparator};

    use super::*;

    /// One row of the model table.
    #[serde_with::serde_as]
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Entry {
        pub model_id: String,
        /// NCBI gene ID, optionally with `NCBIGene:` prefix.
        pub gene_id: String,
        pub gene_symbol: String,
        pub species: String,
        /// Comma-separated annotated term IDs.
        #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
        pub term_ids: Vec<String>,
    }

    impl TryFrom<Entry> for Model {
        type Error = anyhow::Error;

        fn try_from(entry: Entry) -> Result<Self, Self::Error> {
            let term_ids = entry
                .term_ids
                .into_iter()
                .map(|term_id| term_id.trim().to_string())
                .filter(|term_id| !term_id.is_empty())
                .collect::<indexmap::IndexSet<_>>();
            if term_ids.is_empty() {
                return Err(PrioError::ModelWithoutTerms(entry.model_id).into());
            }
            Ok(Model {
                gene_id: numeric_gene_id(&entry.gene_id)?,
                gene_symbol: entry.gene_symbol,
                species: Species::from_name(&entry.species)?,
                model_id: entry.model_id,
                term_ids,
            })
        }
    }

    /// Read the model file.
    pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>, anyhow::Error> {
        let mut rdr = tsv_reader(path)?;
        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: Entry = result?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Build the in-memory model catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<InMemoryModelCatalog, anyhow::Error> {
        let entries = load_entries(path.as_ref())
            .map_err(|e| anyhow::anyhow!("error loading {:?}: {}", path.as_ref(), e))?;
        let models = entries
            .into_iter()
            .map(Model::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(InMemoryModelCatalog::new(models))
    }
}

/// Code for the PPI proximity matrix.
///
/// The header lists the gene universe; each following line starts with a gene
/// ID and holds that gene's diffusion column, in header order.
pub mod proximity {
    use super::*;

    /// Read the proximity matrix file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DenseProximityMatrix, anyhow::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(open_read_maybe_gz(path.as_ref())?);

        let gene_ids = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(numeric_gene_id)
            .collect::<Result<Vec<_>, _>>()?;
        if gene_ids.is_empty() {
            return Err(PrioError::MatrixEmptyHeader.into());
        }

        let mut columns = Vec::with_capacity(gene_ids.len());
        for (idx, record) in rdr.records().enumerate() {
            let record = record?;
            let gene_id = numeric_gene_id(record.get(0).unwrap_or_default())?;
            if gene_ids.get(idx) != Some(&gene_id) {
                return Err(PrioError::MatrixRowOrder(gene_id).into());
            }
            let column = record
                .iter()
                .skip(1)
                .map(|value| value.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!("invalid value in row of gene {}: {}", gene_id, e))?;
            columns.push(column);
        }

        Ok(DenseProximityMatrix::new(gene_ids, columns)?)
    }
}

/// Struct for loading an HPO term from JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryTerm {
    /// The term ID.
    pub term_id: String,
    /// The term name (optional).
    #[serde(default = "Option::default")]
    pub term_name: Option<String>,
}

/// Load the candidate genes from a JSON array.
pub fn load_candidates<P: AsRef<Path>>(path: P) -> Result<Vec<CandidateGene>, anyhow::Error> {
    let reader = open_read_maybe_gz(path.as_ref())?;
    serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("error loading genes {:?}: {}", path.as_ref(), e))
}

/// Load the query terms from a JSON array.
pub fn load_query<P: AsRef<Path>>(path: P) -> Result<Vec<QueryTerm>, anyhow::Error> {
    let reader = open_read_maybe_gz(path.as_ref())?;
    serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("error loading query terms {:?}: {}", path.as_ref(), e))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pheno::sources::{ModelCatalog, ProximityMatrix, TermSimilarityProvider};

    #[test]
    fn load_terms() -> Result<(), anyhow::Error> {
        let entries = terms::load_entries("tests/pheno/terms.tsv")?;

        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[0],
            PhenotypeTerm {
                term_id: String::from("HP:0001166"),
                label: String::from("Arachnodactyly"),
            }
        );

        Ok(())
    }

    #[test]
    fn load_similarity() -> Result<(), anyhow::Error> {
        let sim = similarity::load("tests/pheno/terms.tsv", "tests/pheno/similarity.tsv")?;

        assert_eq!(
            sim.score_of("HP:0001166", "HP:0001166", Species::Human),
            Some(1.0)
        );
        assert_eq!(
            sim.score_of("HP:0001166", "MP:0000564", Species::Mouse),
            Some(0.8)
        );
        assert_eq!(sim.matches_for_term("HP:0001166", Species::Fish).len(), 1);
        assert!(sim.term("HP:0000098").is_some());

        Ok(())
    }

    #[test]
    fn load_models() -> Result<(), anyhow::Error> {
        let catalog = models::load("tests/pheno/models.tsv")?;

        assert_eq!(catalog.num_models(Species::Human), 2);
        assert_eq!(catalog.num_models(Species::Mouse), 2);
        assert_eq!(catalog.num_models(Species::Fish), 1);
        let human = catalog.models_for_species(Species::Human)?;
        assert_eq!(human[0].model_id, "OMIM:154700");
        assert_eq!(human[0].gene_id, 2200);
        assert_eq!(
            human[0].term_ids.iter().collect::<Vec<_>>(),
            vec!["HP:0001166", "HP:0000098", "HP:0001083"]
        );

        Ok(())
    }

    #[test]
    fn model_without_terms() {
        let entry = models::Entry {
            model_id: String::from("MGI:1"),
            gene_id: String::from("1"),
            gene_symbol: String::from("A"),
            species: String::from("mouse"),
            term_ids: vec![String::from(" ")],
        };

        assert!(Model::try_from(entry).is_err());
    }

    #[test]
    fn load_proximity() -> Result<(), anyhow::Error> {
        let matrix = proximity::load("tests/pheno/ppi.tsv")?;

        assert_eq!(matrix.num_genes(), 5);
        assert_eq!(
            matrix.gene_ids().collect::<Vec<_>>(),
            vec![2200, 7042, 4052, 7046, 2201]
        );
        assert_eq!(matrix.row_index_for_gene(4052), Some(2));
        assert_eq!(
            matrix.column_for_gene(2200),
            Some(&[1.0f32, 0.3, 0.4, 0.05, 0.0][..])
        );

        Ok(())
    }

    #[test]
    fn load_proximity_ragged() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("ragged.tsv");
        std::fs::write(&path, "gene_id\t1\t2\n1\t1.0\t0.5\n2\t0.5\n")?;

        let err = proximity::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PrioError>(),
            Some(&PrioError::MatrixRaggedRow {
                gene_id: 2,
                found: 1,
                expected: 2
            })
        );

        Ok(())
    }

    #[test]
    fn load_json_inputs() -> Result<(), anyhow::Error> {
        let candidates = load_candidates("tests/pheno/genes.json")?;
        let query = load_query("tests/pheno/query.json")?;

        assert_eq!(candidates.len(), 6);
        assert_eq!(
            candidates[0],
            CandidateGene {
                gene_id: 2200,
                gene_symbol: String::from("FBN1"),
            }
        );
        assert_eq!(
            query.iter().map(|t| t.term_id.as_str()).collect::<Vec<_>>(),
            vec!["HP:0001166", "HP:0000098", "HP:9999999"]
        );

        Ok(())
    }
}
