//! foodb - nutrition reference database builder
//!
//! `foodb build` (the default) deletes the database and rebuilds it from the
//! USDA CSV exports and the canonical foods mapping. The individual steps
//! can also be run on their own against an existing database.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodb_common::config::{ConfigOverrides, PipelineConfig};
use foodb_etl::pipeline::{run_pipeline, run_step, Step};
use foodb_etl::usda::list_foundation_foods;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for foodb
#[derive(Parser, Debug)]
#[command(name = "foodb")]
#[command(about = "Build the local nutrition reference database from USDA exports")]
#[command(version)]
struct Args {
    /// TOML config file (default: <config dir>/foodb/config.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root folder for the default database, CSV, and mapping locations
    #[arg(long, global = true, value_name = "DIR")]
    data_root: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Directory containing the USDA CSV exports
    #[arg(long, global = true, value_name = "DIR")]
    csv_dir: Option<PathBuf>,

    /// Canonical foods mapping file (YAML)
    #[arg(long, global = true, value_name = "FILE")]
    mapping: Option<PathBuf>,

    /// Fail when a mapping entry points at an unknown USDA food
    /// (`--strict-mapping=false` overrides the environment and config file)
    #[arg(
        long,
        global = true,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    strict_mapping: Option<bool>,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Delete the database and run every step (default)
    Build,
    /// Load the USDA CSV exports and backfill foundation descriptions
    LoadUsda,
    /// Upsert canonical foods from the mapping file
    BuildFoods,
    /// Derive macro-nutrients for every canonical food
    BuildMacros,
    /// Print foundation foods from the CSV exports (no database needed)
    ListFoundation,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodb_etl=info,foodb_common=info,foodb=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<foodb_common::Error>()
                .map(|e| e.exit_code())
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let overrides = ConfigOverrides {
        config_file: args.config,
        data_root: args.data_root,
        database_path: args.database,
        csv_dir: args.csv_dir,
        mapping_path: args.mapping,
        strict_mapping: args.strict_mapping,
    };
    let config = PipelineConfig::resolve(&overrides).context("Failed to resolve configuration")?;

    info!("foodb v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());
    info!("CSV folder: {}", config.csv_dir.display());
    info!("Mapping: {}", config.mapping_path.display());

    match args.command.unwrap_or(Command::Build) {
        Command::Build => {
            let report = run_pipeline(&config).await?;
            emit(args.json, &report)?;
        }
        Command::LoadUsda => {
            let report = run_step(Step::LoadUsda, &config).await?;
            emit(args.json, &report)?;
        }
        Command::BuildFoods => {
            let report = run_step(Step::BuildFoods, &config).await?;
            emit(args.json, &report)?;
        }
        Command::BuildMacros => {
            let report = run_step(Step::BuildMacros, &config).await?;
            emit(args.json, &report)?;
        }
        Command::ListFoundation => {
            let listings = list_foundation_foods(&config.csv_dir)?;
            if args.json {
                emit(true, &listings)?;
            } else {
                for listing in &listings {
                    println!("{}", listing);
                }
            }
        }
    }

    Ok(())
}

fn emit<T: Serialize>(json: bool, report: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
