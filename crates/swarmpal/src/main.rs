use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use swarmpal_core::{
    batch::run_batch, config::BatchConfig, express, queries, spacecraft::spacecraft_names,
};

/// SwarmPAL batch runner and data-fetch helpers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List names of available spacecraft
    Spacecraft,

    /// Execute the FAC single-satellite processor
    #[command(name = "fac_single_sat")]
    FacSingleSat {
        /// Check available with: swarmpal spacecraft
        #[arg(long)]
        spacecraft: String,
        /// ISO 8601 time
        #[arg(long = "time_start")]
        time_start: String,
        /// ISO 8601 time
        #[arg(long = "time_end")]
        time_end: String,
        /// 'OPER' or 'FAST'
        #[arg(long)]
        grade: String,
        /// Output file
        #[arg(long = "to_cdf_file")]
        to_cdf_file: PathBuf,
    },

    /// UTC of last available data for a collection, e.g. SW_FAST_MAGA_LR_1B
    #[command(name = "last_available_time")]
    LastAvailableTime { collection: String },

    /// Process datasets in batch mode for a given CONFIG file in yaml format
    Batch {
        /// Directory prefix for output files
        #[arg(long = "out-dir", default_value = ".")]
        out_dir: PathBuf,
        /// Writes a registry.txt file with md5sum
        #[arg(long = "write-registry")]
        write_registry: bool,
        /// YAML file defining the datasets and processes
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Spacecraft => {
            println!("{}", spacecraft_names().join("\n"));
            Ok(())
        }
        Command::FacSingleSat {
            spacecraft,
            time_start,
            time_end,
            grade,
            to_cdf_file,
        } => express::fac_single_sat(&spacecraft, &time_start, &time_end, &grade, &to_cdf_file)
            .context("FAC single-satellite processing failed"),
        Command::LastAvailableTime { collection } => {
            let time = queries::last_available_time(&collection)
                .with_context(|| format!("freshness query for '{collection}' failed"))?;
            println!("{}", time.format("%Y-%m-%dT%H:%M:%S%z"));
            Ok(())
        }
        Command::Batch {
            out_dir,
            write_registry,
            config,
        } => {
            let config = BatchConfig::load(&config)
                .with_context(|| format!("failed to load batch config {}", config.display()))?;
            tracing::info!(datasets = config.len(), "starting batch run");
            run_batch(&config, &out_dir, write_registry).context("batch run failed")
        }
    }
}
