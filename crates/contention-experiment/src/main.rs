//! Contention experiment CLI.
//!
//! Commands:
//! - matched: alternating increment/decrement pairs on every caller
//! - storm: randomized operation mix on every caller
//! - sequential: single caller, deterministic ordering check

use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use contention_experiment::driver::{ContentionConfig, ContentionRunner, Workload};

/// Generate a timestamped output path from the given path.
/// e.g., "run.json" -> "run-20260806-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("run");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(std::path::Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "contention-experiment")]
#[command(version)]
#[command(about = "Concurrent-caller contention runs against the tally kernel")]
struct Cli {
    /// Write the run record to this JSON path (a timestamp is appended)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alternating increment/decrement pairs on every caller
    Matched {
        /// Number of concurrent callers
        #[arg(long, default_value = "3")]
        callers: usize,

        /// Increment/decrement pairs per caller
        #[arg(long, default_value = "1")]
        pairs: usize,
    },
    /// Randomized mix of operations on every caller
    Storm {
        /// Number of concurrent callers
        #[arg(long, default_value = "8")]
        callers: usize,

        /// Operations per caller
        #[arg(long, default_value = "100")]
        ops: usize,

        /// Probability that an operation is a decrement
        #[arg(long, default_value = "0.5")]
        decrement_bias: f64,

        /// Seed for reproducible schedules
        #[arg(long, env = "CONTENTION_SEED", default_value = "42")]
        seed: u64,
    },
    /// Single caller issuing increment, increment, decrement
    Sequential,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match cli.command {
        Commands::Matched { callers, pairs } => ContentionConfig {
            workload: Workload::Matched { pairs },
            callers,
            seed: 0,
        },
        Commands::Storm {
            callers,
            ops,
            decrement_bias,
            seed,
        } => ContentionConfig {
            workload: Workload::Storm {
                ops,
                decrement_bias,
            },
            callers,
            seed,
        },
        Commands::Sequential => ContentionConfig {
            workload: Workload::Sequential,
            callers: 1,
            seed: 0,
        },
    };

    let runner = ContentionRunner::new(config);
    let result = runner.run().await?;

    info!(
        workload = %result.workload,
        final_count = result.final_snapshot.count,
        underflows = result.final_snapshot.underflows,
        expected = result.expected_count,
        conserved = result.conserved,
        "run finished"
    );

    if let Some(output) = cli.output {
        let path = timestamped_path(&output);
        result.save(&path)?;
        info!(path = %path.display(), "wrote run record");
    }

    ensure!(
        result.conserved,
        "conservation violated: final count {} != expected {}",
        result.final_snapshot.count,
        result.expected_count
    );

    Ok(())
}
