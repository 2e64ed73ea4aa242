// src/bin/force_learn.rs
//! `force-learn`: command-line driver for the force regression experiment

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use emg_force::config::{ConfigLoader, ExperimentConfig};
use emg_force::experiment::run_experiment;
use emg_force::processing::prepare_recordings;
use emg_force::stats::{inspect_runs, KeyPattern, StatTable};
use emg_force::storage::JsonTableStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "force-learn", version, about = "EMG to finger force regression experiments")]
struct Args {
    /// Configuration file; may be given several times, later files win
    #[arg(long = "config", short = 'c', global = true)]
    config: Vec<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Denoise, normalise and window raw recordings into feature tables
    Prepare { input_dir: PathBuf, output_dir: PathBuf },

    /// Run the cross-validation sweep over prepared feature tables
    Learn { feature_dir: PathBuf, result_dir: PathBuf },

    /// Aggregate result artifacts into a statistics file
    Stats { result_dir: PathBuf, output_file: PathBuf },

    /// Mean RMSE/STD per key from a statistics file
    Summary {
        stats_file: PathBuf,
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Per-run RMSE/STD listing of a result folder
    Inspect {
        result_dir: PathBuf,
        #[command(flatten)]
        pattern: PatternArgs,
    },

    /// Write the effective configuration as TOML
    ExportConfig { output_file: PathBuf },
}

#[derive(Debug, clap::Args)]
struct PatternArgs {
    #[arg(long, short = 'r')]
    regressor: Option<String>,
    #[arg(long, short = 'f')]
    feature_set: Option<String>,
    #[arg(long, short = 't')]
    trajectory: Option<String>,
}

impl PatternArgs {
    fn pattern(&self) -> KeyPattern {
        KeyPattern::new(
            self.regressor.as_deref(),
            self.feature_set.as_deref(),
            self.trajectory.as_deref(),
        )
    }
}

fn load_config(paths: &[PathBuf]) -> anyhow::Result<ExperimentConfig> {
    let loader = if paths.is_empty() {
        ConfigLoader::new()
    } else {
        ConfigLoader::with_paths(paths.to_vec())
    };
    loader.load().context("loading configuration")
}

fn require_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        bail!("{} is not a valid folder", path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let store = JsonTableStore::new();
    match &args.command {
        Command::Prepare { input_dir, output_dir } => {
            require_dir(input_dir)?;
            let config = load_config(&args.config)?;
            let summary = prepare_recordings(&config, input_dir, output_dir, &store)
                .with_context(|| format!("prepare {}", input_dir.display()))?;
            println!("prepared={}", summary.prepared.len());
            println!("skipped={}", summary.skipped.len());
            for (record, reason) in &summary.skipped {
                println!("  {}: {}", record, reason);
            }
        }
        Command::Learn { feature_dir, result_dir } => {
            require_dir(feature_dir)?;
            require_dir(result_dir)?;
            let config = load_config(&args.config)?;
            let summary = run_experiment(&config, feature_dir, result_dir, &store)
                .with_context(|| format!("learn {}", feature_dir.display()))?;
            println!("subjects={}", summary.subjects);
            println!("recordings={}", summary.recordings);
            println!("runs={}", summary.runs);
            println!("failed_runs={}", summary.failed_runs);
            println!("groups_skipped={}", summary.groups_skipped);
            println!("artifacts={}", summary.artifacts.len());
        }
        Command::Stats { result_dir, output_file } => {
            require_dir(result_dir)?;
            let table = StatTable::from_result_dir(result_dir)
                .with_context(|| format!("aggregating {}", result_dir.display()))?;
            table
                .save(output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;
            println!("keys={}", table.len());
        }
        Command::Summary { stats_file, pattern } => {
            let table = StatTable::load(stats_file)
                .with_context(|| format!("reading {}", stats_file.display()))?;
            println!("{:<40} {:>6} {:>10} {:>10}", "key", "runs", "rmse", "std");
            for row in table.summary(&pattern.pattern()) {
                println!(
                    "{:<40} {:>6} {:>10.4} {:>10.4}",
                    row.key.to_string(),
                    row.count,
                    row.mean_rmse,
                    row.mean_std
                );
            }
        }
        Command::Inspect { result_dir, pattern } => {
            require_dir(result_dir)?;
            let runs = inspect_runs(result_dir, &pattern.pattern())
                .with_context(|| format!("inspecting {}", result_dir.display()))?;
            for run in runs {
                println!(
                    "{} split {} {}: rmse {:.4} std {:.4}",
                    run.group, run.split_index, run.key, run.rmse, run.std
                );
            }
        }
        Command::ExportConfig { output_file } => {
            let config = load_config(&args.config)?;
            ConfigLoader::export_config(&config, output_file)
                .with_context(|| format!("writing {}", output_file.display()))?;
        }
    }
    Ok(())
}
