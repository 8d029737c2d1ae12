//! apt-classifier - Artist Persona Type batch classifier
//!
//! `run` executes one classification batch against the SQLite store and
//! prints the run (with its report) as JSON. `serve` exposes the read-only
//! reporting endpoints.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use apt_classifier::config::{ClassifierSettings, RunOverrides};
use apt_classifier::db::{SqliteProfileSink, SqliteWorkSelector};
use apt_classifier::orchestrator::BatchOrchestrator;
use apt_classifier::rebalancer::Rebalancer;
use apt_classifier::AppState;
use apt_common::config::{load_toml_config, resolve_config_path, resolve_database_path};

#[derive(Debug, Parser)]
#[command(name = "apt-classifier", version, about = "Artist Persona Type classifier")]
struct Cli {
    /// Config file (overrides APT_CONFIG and the platform default)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides APT_DATABASE_PATH and TOML)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides TOML)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify one batch of artists
    Run {
        /// Maximum records to select
        #[arg(long)]
        limit: Option<usize>,

        /// Rebalancer seed
        #[arg(long)]
        seed: Option<u64>,

        /// Disable AI-assisted scoring
        #[arg(long)]
        no_ai: bool,

        /// Disable reference enrichment
        #[arg(long)]
        no_enrichment: bool,
    },
    /// Serve the reporting API
    Serve {
        #[arg(long, default_value = "127.0.0.1:5740")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let toml = load_toml_config(config_path.as_deref())?;

    let level = cli.log_level.clone().unwrap_or_else(|| toml.logging.level.clone());
    apt_common::logging::init_tracing(&level)?;

    info!("Starting apt-classifier");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(cli.database.as_deref(), &toml);
    info!("Database: {}", db_path.display());
    let pool = apt_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match cli.command {
        Command::Run {
            limit,
            seed,
            no_ai,
            no_enrichment,
        } => {
            let overrides = RunOverrides {
                limit,
                seed,
                no_ai,
                no_enrichment,
            };
            let settings = ClassifierSettings::resolve(toml, &overrides);
            let classifier = settings
                .build_classifier()
                .context("Failed to build classifier")?;

            let orchestrator = BatchOrchestrator::new(
                Arc::new(SqliteWorkSelector::new(pool.clone())),
                Arc::new(SqliteProfileSink::new(pool.clone())),
                Arc::new(classifier),
                Rebalancer::new(settings.rebalance.clone()),
                settings.batch.clone(),
            );

            let cancel_token = CancellationToken::new();
            let ctrl_c_token = cancel_token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling after the current sub-batch");
                    ctrl_c_token.cancel();
                }
            });

            let run = orchestrator.run(cancel_token).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Command::Serve { bind } => {
            let app = apt_classifier::build_router(AppState::new(pool));

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("Listening on http://{}", bind);
            info!("Health check: http://{}/health", bind);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
