//! rememe - drop a picture into the empty panel of a meme template
//!
//! # Usage
//!
//! ```bash
//! # One template, default search (cluster counts 0..=10)
//! rememe --substitute cat.png template.png
//!
//! # Several templates in parallel, results in ./out
//! rememe --substitute cat.png --output-dir out a.png b.png c.png
//!
//! # Sweep both clustering toggles with a reproducible seed
//! rememe --substitute cat.png --toggle --seed 7 template.png
//!
//! # Verbose logging
//! RUST_LOG=rememe=debug rememe --substitute cat.png template.png
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use rememe::RememeConfig;
use rememe::batch::{BatchJob, BatchRunner, JobStatus};
use rememe::image_io;

/// Find the empty panel of a meme template and paste a substitute image into it
#[derive(Parser, Debug)]
#[command(name = "rememe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to paste into each template
    #[arg(short = 's', long, value_name = "FILE")]
    substitute: PathBuf,

    /// Template images to fill
    #[arg(required = true, value_name = "TEMPLATE")]
    templates: Vec<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short = 'c', long, env = "REMEME_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for composed images
    #[arg(short = 'o', long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Smallest cluster count to try
    #[arg(long)]
    min_clusters: Option<i32>,

    /// Largest cluster count to try
    #[arg(long)]
    max_clusters: Option<i32>,

    /// Sweep clustering on and off instead of a single cluster range
    #[arg(long)]
    toggle: bool,

    /// Seed for reproducible clustering
    #[arg(long, env = "REMEME_SEED")]
    seed: Option<u64>,

    /// Parallel workers (defaults to the number of CPUs)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "REMEME_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("rememe={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> Result<RememeConfig> {
    let mut config = match &args.config {
        Some(path) => RememeConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {path:?}"))?,
        None => RememeConfig::default(),
    };

    if let Some(min) = args.min_clusters {
        config.search.min_clusters = min;
    }
    if let Some(max) = args.max_clusters {
        config.search.max_clusters = max;
    }
    if args.toggle {
        config.search.toggle = true;
    }
    if args.seed.is_some() {
        config.clustering.seed = args.seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(&args)?;
    let substitute = image_io::load(&args.substitute)
        .with_context(|| format!("Failed to load substitute: {:?}", args.substitute))?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", args.output_dir))?;

    let mut runner = BatchRunner::new(config, substitute);
    if let Some(workers) = args.workers {
        runner = runner.with_workers(workers);
    }

    let jobs = args
        .templates
        .iter()
        .map(|template| BatchJob::into_dir(template.clone(), &args.output_dir))
        .collect();
    let outcomes = runner.run(jobs).await?;

    let mut placed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(JobStatus::Placed {
                params,
                attempts,
                output_path,
            }) => {
                placed += 1;
                info!(
                    template = ?outcome.template_path,
                    %params,
                    attempts,
                    output = ?output_path,
                    "substitution placed"
                );
            }
            Ok(JobStatus::NotFound { attempts }) => {
                error!(template = ?outcome.template_path, attempts, "no valid placement found");
            }
            Err(e) => {
                error!(template = ?outcome.template_path, error = %e, "substitution failed");
            }
        }
    }

    if placed == 0 {
        bail!("No template received a valid placement");
    }
    info!(placed, total = outcomes.len(), "done");
    Ok(())
}
