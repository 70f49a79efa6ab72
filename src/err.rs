use std::{
    num::ParseIntError,
    process::{ExitCode, Termination},
};

#[derive(thiserror::Error, Debug, Clone)]
pub enum AppError {
    #[error("Invalid prioritization settings: {0}")]
    InvalidSettings(String),
}

impl Termination for AppError {
    fn report(self) -> ExitCode {
        match self {
            AppError::InvalidSettings(_) => ExitCode::from(1),
        }
    }
}

/// Errors raised while reading the external prioritization resources.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PrioError {
    #[error("Unknown species: {0:?}")]
    UnknownSpecies(String),
    #[error("Invalid gene identifier")]
    InvalidGeneId(#[from] ParseIntError),
    #[error("Proximity matrix header is empty")]
    MatrixEmptyHeader,
    #[error("Proximity matrix gene {0} listed twice")]
    MatrixDuplicateGene(u32),
    #[error("Proximity matrix row for gene {gene_id} has {found} values, expected {expected}")]
    MatrixRaggedRow {
        gene_id: u32,
        found: usize,
        expected: usize,
    },
    #[error("Proximity matrix has {rows} rows but {cols} columns")]
    MatrixNotSquare { rows: usize, cols: usize },
    #[error("Proximity matrix row order differs from header at gene {0}")]
    MatrixRowOrder(u32),
    #[error("Model {0} has no annotated terms")]
    ModelWithoutTerms(String),
}
