#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Sejm mirror ingestion tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sejm_mirror_cli_utils::{IndicatifProgress, MultiProgress, init_logger};
use sejm_mirror_database::{paths, queries, store};
use sejm_mirror_ingest::{RunOptions, pipeline, resume};
use sejm_mirror_ingest_models::{Checkpoint, IngestConfig};
use sejm_mirror_source::client::SejmApiClient;
use sejm_mirror_source::retry::RetryPolicy;

#[derive(Parser)]
#[command(name = "sejm_mirror_ingest", about = "Sejm public-records mirror")]
struct Cli {
    /// Path of the mirror database (overrides config and `SEJM_MIRROR_DB`)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// TOML config file (overrides `SEJM_MIRROR_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and its tables
    PrepareDatabase,
    /// Scrape everything, optionally starting from a checkpoint
    Scrape {
        /// First term to process
        #[arg(long)]
        from_term: Option<u32>,
        /// First sitting to process within `--from-term`
        #[arg(long)]
        from_sitting: Option<u32>,
        /// First voting to process within `--from-sitting`
        #[arg(long)]
        from_voting: Option<u32>,
        /// Maximum vote-detail requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Continue from the latest voting already in the database
    Resume {
        /// Maximum vote-detail requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Print row counts of every table
    Status,
    /// Write every table to `<dir>/<table>.parquet`
    ExportParquet {
        /// Output directory
        dir: PathBuf,
    },
}

fn build_client(config: &IngestConfig) -> Result<SejmApiClient, Box<dyn std::error::Error>> {
    let policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        min_delay: config.retry.min_delay(),
        max_delay: config.retry.max_delay(),
    };
    Ok(SejmApiClient::new(&config.api_url, config.request_timeout())?.with_retry_policy(policy))
}

fn run_options(multi: &MultiProgress, config: &IngestConfig) -> RunOptions {
    RunOptions {
        max_concurrent_fetches: config.concurrency(),
        progress: IndicatifProgress::steps_bar(multi, "Sittings", 0),
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = IngestConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = Some(database);
    }
    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(paths::default_database_path);

    match cli.command {
        Commands::PrepareDatabase => {
            store::open(&db_path)?;
            log::info!("Database ready at {}", db_path.display());
        }
        Commands::Scrape {
            from_term,
            from_sitting,
            from_voting,
            concurrency,
        } => {
            let checkpoint = Checkpoint::new(from_term, from_sitting, from_voting)?;
            if let Some(n) = concurrency {
                config.max_concurrent_fetches = n;
            }
            let client = build_client(&config)?;
            let conn = store::open(&db_path)?;
            pipeline::run(&client, &conn, checkpoint, &run_options(multi, &config)).await?;
            log_counts(&conn)?;
        }
        Commands::Resume { concurrency } => {
            if let Some(n) = concurrency {
                config.max_concurrent_fetches = n;
            }
            let client = build_client(&config)?;
            let conn = store::open(&db_path)?;
            resume::resume_pipeline(&client, &conn, &run_options(multi, &config)).await?;
            log_counts(&conn)?;
        }
        Commands::Status => {
            let conn = store::open(&db_path)?;
            let counts = queries::table_counts(&conn)?;
            println!("{}", db_path.display());
            println!("{:<16} ROWS", "TABLE");
            println!("{}", "-".repeat(30));
            for (table, rows) in counts.entries() {
                println!("{table:<16} {rows}");
            }
        }
        Commands::ExportParquet { dir } => {
            let conn = store::open(&db_path)?;
            let written = queries::export_parquet(&conn, &dir)?;
            log::info!("Exported {} table(s) to {}", written.len(), dir.display());
        }
    }

    Ok(())
}

fn log_counts(conn: &duckdb::Connection) -> Result<(), Box<dyn std::error::Error>> {
    let counts = queries::table_counts(conn)?;
    for (table, rows) in counts.entries() {
        log::info!("  {table}: {rows} row(s)");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli, &multi).await {
        log::error!("{e}");
        return Err(e);
    }

    Ok(())
}
