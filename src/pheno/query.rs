//! Code for ranking genes on the command line.

use std::io::Write;
use std::time::Instant;

use clap::Parser;
use tracing::info;

use crate::common::{io::open_write_maybe_gz, trace_rss_now, worker_version};

use super::conf::PrioritizationSettings;
use super::data::{BenchmarkTarget, Species};
use super::load::{self, QueryTerm};
use super::prioritize::{prioritize, Request, Resources};
use super::sources::{ProximityMatrix, TermSimilarityProvider};

/// Command line arguments for `pheno query` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Prioritize genes by phenotype and PPI proximity", long_about = None)]
pub struct Args {
    /// Path to TSV file with term IDs and labels.
    #[arg(long, required = true)]
    pub path_terms: String,
    /// Path to TSV file with term similarities per species.
    #[arg(long, required = true)]
    pub path_similarity: String,
    /// Path to TSV file with phenotype-annotated diseases and models.
    #[arg(long, required = true)]
    pub path_models: String,
    /// Path to TSV file with the PPI proximity matrix; no propagation if missing.
    #[arg(long)]
    pub path_ppi: Option<String>,

    /// Path to JSON file with the genes to rank.
    #[arg(long, required = true)]
    pub path_genes_json: String,
    /// Path to JSON file with term IDs of the patient.
    #[arg(long, required = true)]
    pub path_terms_json: String,

    /// Species to use (default is all).
    #[arg(long, value_enum, value_delimiter = ',')]
    pub species: Vec<Species>,
    /// Disable PPI propagation even if a matrix is given.
    #[arg(long, default_value_t = false)]
    pub no_ppi: bool,
    /// Optional path to JSON file with prioritization settings.
    #[arg(long)]
    pub path_settings_json: Option<String>,

    /// Benchmarking mode: disease ID of the known answer.
    #[arg(long, requires = "benchmark_gene_symbol")]
    pub benchmark_disease_id: Option<String>,
    /// Benchmarking mode: gene symbol of the known answer.
    #[arg(long, requires = "benchmark_disease_id")]
    pub benchmark_gene_symbol: Option<String>,

    /// Path to output JSON file (`.gz` for compression), stdout if missing.
    #[arg(long)]
    pub path_output: Option<String>,
    /// Number of rows of the result table to log.
    #[arg(long, default_value_t = 20)]
    pub max_log_rows: usize,
    /// Number of threads to use (default is 1 thread per core).
    #[arg(long)]
    pub num_threads: Option<usize>,
}

impl Args {
    /// The benchmark target if both disease ID and gene symbol are given.
    pub fn benchmark(&self) -> Option<BenchmarkTarget> {
        match (&self.benchmark_disease_id, &self.benchmark_gene_symbol) {
            (Some(disease_id), Some(gene_symbol)) => Some(BenchmarkTarget {
                disease_id: disease_id.clone(),
                gene_symbol: gene_symbol.clone(),
            }),
            _ => None,
        }
    }

    /// Settings from the settings file (or defaults) and command line flags.
    pub fn settings(&self) -> Result<PrioritizationSettings, anyhow::Error> {
        let mut settings = match &self.path_settings_json {
            Some(path) => PrioritizationSettings::load_json(path)?,
            None => PrioritizationSettings::default(),
        };
        if self.no_ppi {
            settings.use_ppi = false;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Query result records.
pub mod query_result {
    use serde::Serialize;

    use crate::pheno::conf::PrioritizationSettings;
    use crate::pheno::data::{PriorityResult, Species};
    use crate::pheno::load::QueryTerm;

    /// Result container data structure.
    #[derive(Serialize, Debug, Clone)]
    pub struct Container {
        /// Version of the `pheno-walker` package.
        pub version: String,
        /// The settings used.
        pub settings: PrioritizationSettings,
        /// The query terms that were used.
        pub query: Vec<QueryTerm>,
        /// The species that were used.
        pub species: Vec<Species>,
        /// Number of seed genes for propagation.
        pub num_seeds: usize,
        /// The resulting records for the scored genes, best first.
        pub result: Vec<PriorityResult>,
    }
}

/// Load all inputs, run the prioritization and sort the results.
pub fn run_query(
    args: &Args,
    settings: &PrioritizationSettings,
) -> Result<query_result::Container, anyhow::Error> {
    info!("Loading term similarities...");
    let before_loading = Instant::now();
    let similarity = load::similarity::load(&args.path_terms, &args.path_similarity)?;
    info!(
        "...done loading term similarities in {:?}",
        before_loading.elapsed()
    );

    info!("Loading models...");
    let before_loading = Instant::now();
    let catalog = load::models::load(&args.path_models)?;
    info!("...done loading models in {:?}", before_loading.elapsed());

    let proximity = match (&args.path_ppi, settings.use_ppi) {
        (Some(path_ppi), true) => {
            info!("Loading PPI proximity matrix...");
            let before_loading = Instant::now();
            let matrix = load::proximity::load(path_ppi)?;
            info!(
                "...done loading matrix with {} genes in {:?}",
                matrix.num_genes(),
                before_loading.elapsed()
            );
            Some(matrix)
        }
        _ => None,
    };

    info!("Loading genes and query terms...");
    let candidates = load::load_candidates(&args.path_genes_json)?;
    let query = load::load_query(&args.path_terms_json)?;
    info!(
        "... done loading {} genes and {} query terms",
        candidates.len(),
        query.len()
    );

    trace_rss_now();

    info!("Starting prioritization...");
    let before_prioritization = Instant::now();
    let request = Request {
        candidates,
        query_term_ids: query.into_iter().map(|t| t.term_id).collect(),
        species: args.species.clone(),
        benchmark: args.benchmark(),
    };
    let resources = Resources {
        similarity: &similarity,
        catalog: &catalog,
        proximity: proximity.as_ref().map(|m| m as &dyn ProximityMatrix),
    };
    let outcome = prioritize(&request, &resources, settings);
    info!(
        "... done with prioritization in {:?}",
        before_prioritization.elapsed()
    );

    let mut result = outcome.results;
    // stable sort, ties stay in candidate order
    result.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

    Ok(query_result::Container {
        version: worker_version().to_string(),
        settings: *settings,
        query: outcome
            .query
            .iter()
            .map(|term_id| QueryTerm {
                term_id: term_id.clone(),
                term_name: similarity.term(term_id).map(|t| t.label.clone()),
            })
            .collect(),
        species: outcome.species,
        num_seeds: outcome.num_seeds,
        result,
    })
}

/// Main entry point for `pheno query` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    info!("args_common = {:?}", &args_common);
    info!("args = {:?}", &args);

    let settings = args.settings()?;
    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()?;
    }

    let result = run_query(args, &settings)?;

    info!(
        "{: >4} | {: <10} | {: >6} | {: >6} | {: >6}",
        "rank", "gene", "final", "direct", "walker"
    );
    info!("     |            |        |        |");
    for (i, gene) in result.result.iter().take(args.max_log_rows).enumerate() {
        info!(
            "{: >4} | {: <10} | {: >6.4} | {: >6.4} | {: >6.4}",
            i + 1,
            gene.gene_symbol,
            gene.final_score,
            gene.direct_score,
            gene.walker_score()
        );
    }

    let mut writer: Box<dyn Write> = match &args.path_output {
        Some(path_output) => open_write_maybe_gz(path_output)?,
        None => Box::new(std::io::stdout()),
    };
    serde_json::to_writer_pretty(&mut writer, &result)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}
