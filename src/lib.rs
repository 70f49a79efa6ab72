//! Cross-species phenotype matching with PPI network propagation for ranking
//! candidate genes.

pub mod common;
pub mod err;
pub mod pheno;
