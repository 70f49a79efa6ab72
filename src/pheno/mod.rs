//! Phenotype-driven gene prioritization.

pub mod aggregate;
pub mod algos;
pub mod assemble;
pub mod conf;
pub mod data;
pub mod load;
pub mod prioritize;
pub mod query;
pub mod rank;
pub mod sources;
pub mod walker;
