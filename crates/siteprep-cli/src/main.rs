//! siteprep — SiteMine input preparation and batch comparison.
//! Entry point for the command-line binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use siteprep_config::Config;
use siteprep_molecules::{edf, receptor, run_batch, BatchConfig, Mode, SiteMineRunner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "siteprep", version)]
#[command(about = "Prepare receptors and pockets for SiteMine and run batch comparisons", long_about = None)]
struct Cli {
    /// Config TOML file (defaults to SITEPREP_CONFIG, then ./siteprep.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare an EDF file for SiteMine from a pocket PDB file
    PrepareEdf {
        /// Input pocket PDB file (<base>_v1_cavity_<N>.pdb)
        #[arg(long)]
        input: PathBuf,

        /// Output EDF file
        #[arg(long)]
        output: PathBuf,
    },
    /// Prepare a receptor PDB file with the SiteMine header
    PrepareReceptor {
        /// Input receptor PDB file
        #[arg(long)]
        input: PathBuf,

        /// Output PDB file (defaults to sitemine_<input name> next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run SiteMine over every prepared EDF file
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Directory with prepared receptor PDB files
    #[arg(long, alias = "prepared_receptors_dir")]
    prepared_receptors_dir: Option<PathBuf>,

    /// Directory with prepared EDF files
    #[arg(long, alias = "prepared_edfs_dir")]
    prepared_edfs_dir: Option<PathBuf>,

    /// SiteMine database SQLite file
    #[arg(long, alias = "sitemine_db")]
    sitemine_db: Option<PathBuf>,

    /// Path to SiteMine executable
    #[arg(long, alias = "sitemine_exe")]
    sitemine_exe: Option<PathBuf>,

    /// Number of threads SiteMine may use
    #[arg(long)]
    threads: Option<u32>,

    /// SiteMine mode: fast or precise
    #[arg(long)]
    mode: Option<Mode>,

    /// Top-level directory for per-pocket output
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Write the batch summary as JSON to this file
    #[arg(long, value_name = "PATH")]
    summary_json: Option<PathBuf>,
}

/// Merge command-line flags over the config file. Flags win.
fn batch_config(args: &RunArgs, config: &Config) -> Result<(BatchConfig, PathBuf)> {
    let receptors_dir = args
        .prepared_receptors_dir
        .clone()
        .or_else(|| config.paths.prepared_receptors_dir.clone())
        .context("--prepared-receptors-dir is required (or set paths.prepared_receptors_dir)")?;
    let edfs_dir = args
        .prepared_edfs_dir
        .clone()
        .or_else(|| config.paths.prepared_edfs_dir.clone())
        .context("--prepared-edfs-dir is required (or set paths.prepared_edfs_dir)")?;
    let database = args
        .sitemine_db
        .clone()
        .or_else(|| config.sitemine.database.clone())
        .context("--sitemine-db is required (or set sitemine.database)")?;
    let executable = args
        .sitemine_exe
        .clone()
        .or_else(|| config.sitemine.executable.clone())
        .context("--sitemine-exe is required (or set sitemine.executable)")?;

    let threads = args.threads.unwrap_or(config.sitemine.threads);
    anyhow::ensure!(threads > 0, "--threads must be at least 1");

    let mut batch = BatchConfig::new(receptors_dir, edfs_dir, database);
    batch.threads = threads;
    batch.mode = args.mode.unwrap_or(config.sitemine.mode);
    batch.results_dir = args
        .results_dir
        .clone()
        .unwrap_or_else(|| config.sitemine.results_dir.clone());
    Ok((batch, executable))
}

/// Config for `run`. An explicit `--config` path must exist.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

async fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let (batch, executable) = batch_config(&args, &config)?;
    let runner = SiteMineRunner::new(&executable);

    let summary = run_batch(&batch, &runner).await?;

    for job in summary.problems() {
        if let Some(reason) = job.reason() {
            warn!(descriptor = %job.descriptor.display(), "{}", reason);
        }
    }
    info!(
        "Done. {} succeeded, {} failed, {} skipped.",
        summary.succeeded(),
        summary.failed(),
        summary.skipped()
    );

    if let Some(path) = &args.summary_json {
        std::fs::write(path, summary.to_json_pretty()?)
            .with_context(|| format!("writing summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dispatch(Cli::parse()).await
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::PrepareEdf { input, output } => {
            edf::prepare_edf(&input, &output)
                .await
                .with_context(|| format!("preparing EDF from {}", input.display()))?;
        }
        Commands::PrepareReceptor { input, output } => {
            let output = output.unwrap_or_else(|| receptor::default_output_path(&input));
            receptor::inject_header(&input, &output)
                .await
                .with_context(|| format!("preparing receptor {}", input.display()))?;
        }
        Commands::Run(args) => run(args, cli.config.as_deref()).await?,
    }
    Ok(())
}
