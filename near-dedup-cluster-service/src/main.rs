mod util;

use anyhow::{Context, Result};
use clap::Parser;
use near_dedup_service::dto::DedupConfig;
use near_dedup_service::error::DedupError;
use near_dedup_service::response::{make_response_payload, Status};
use near_dedup_service::select::Criterion;
use near_dedup_service::similarity::Metric;
use near_dedup_service::tokenize::{LinguisticResources, TokenizeMode};
use near_dedup_service::Deduplicator;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use util::LoadOptions;

/// Collapses near-duplicate rows of a CSV file to one representative each.
///
/// Settings are taken from `--config`, then from DEDUP_THRESHOLD and
/// DEDUP_SHINGLE_LENGTH, then from the flags below, later sources winning.
#[derive(Parser)]
#[command(name = "near-dedup-cluster-service", version, about)]
struct Cli {
    /// CSV file with a header row
    input: PathBuf,

    /// Where to write the representatives, with a `reposts` column appended
    output: PathBuf,

    /// JSON file holding a DedupConfig
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tokenization: simple or linguistic
    #[arg(long)]
    mode: Option<TokenizeMode>,

    /// Words per shingle
    #[arg(long)]
    shingle_length: Option<usize>,

    /// Similarity measure: jaccard or cosine
    #[arg(long)]
    metric: Option<Metric>,

    /// Inclusive similarity threshold in (0, 1]
    #[arg(long)]
    threshold: Option<f64>,

    /// How representatives are chosen: score or length
    #[arg(long)]
    criterion: Option<Criterion>,

    /// Column holding record ids (default: `id` if present, else the row number)
    #[arg(long)]
    id_column: Option<String>,

    /// Columns concatenated into the compared text
    #[arg(long, value_delimiter = ',', default_value = "title,content")]
    text_columns: Vec<String>,

    /// Numeric column used by the `score` criterion
    #[arg(long, default_value = "upvotes")]
    criterion_column: String,

    /// Drop everything from the first "edit" onward in each text column
    #[arg(long)]
    strip_edits: bool,
}

impl Cli {
    fn load_config(&self) -> Result<DedupConfig> {
        let config = match &self.config {
            Some(path) => {
                let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                DedupConfig::from_json(&bytes)?
            }
            None => DedupConfig::default(),
        };
        let mut config = config.with_env_overrides()?;
        if let Some(mode) = self.mode {
            config.tokenize_mode = mode;
        }
        if let Some(shingle_length) = self.shingle_length {
            config.shingle_length = shingle_length;
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(criterion) = self.criterion {
            config.criterion = criterion;
        }
        Ok(config)
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            id_column: self.id_column.clone(),
            text_columns: self.text_columns.clone(),
            criterion_column: self.criterion_column.clone(),
            strip_edits: self.strip_edits,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "near_dedup_service=info,near_dedup_cluster_service=info",
                )
            }),
        )
        .init();

    let cli = Cli::parse();
    let payload = match dedup(&cli) {
        Ok(body) => make_response_payload(Ok(body))?,
        Err(err) => match err.downcast::<DedupError>() {
            Ok(dedup_err) => make_response_payload(Err(dedup_err))?,
            Err(other) => return Err(other),
        },
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    let status: Status = serde_json::from_value(payload["status"].clone())?;
    std::process::exit(status.exit_code());
}

fn dedup(cli: &Cli) -> Result<Value> {
    let config = cli.load_config()?;
    let deduplicator = match config.tokenize_mode {
        TokenizeMode::Linguistic => {
            Deduplicator::with_resources(config, Arc::new(LinguisticResources::english()))?
        }
        TokenizeMode::Simple => Deduplicator::new(config)?,
    };

    let start = Instant::now();
    let corpus = util::read_data_file(&cli.input, &cli.load_options())?;
    info!(
        "File loaded in {:.4} secs",
        (Instant::now() - start).as_secs_f64()
    );

    let start = Instant::now();
    let output = deduplicator.deduplicate(&corpus.records)?;
    info!(
        "Dedupe completed in {:.4} secs",
        (Instant::now() - start).as_secs_f64()
    );

    util::write_result_file(&cli.output, &corpus, &output)?;
    Ok(json!({
        "output": cli.output.display().to_string(),
        "config": deduplicator.config(),
        "records": corpus.records.len(),
        "removed": corpus.removed,
        "representatives": output.results.len(),
        "stats": output.stats,
        "skipped": corpus.skipped_rows(&output),
    }))
}
