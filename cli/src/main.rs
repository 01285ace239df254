//! PolicyScope command-line shell.
//!
//! Thin entry point that loads configuration, opens the scan database and
//! dispatches to the scan engine. All output is JSON on stdout; logs go to
//! stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use policyscope_core::{AnalysisConfig, AppConfig, ProviderKind, ScanId};
use policyscope_db::Database;
use policyscope_scanner::ScanEngine;
use tracing::info;

/// Privacy scanner for public websites.
#[derive(Debug, Parser)]
#[command(name = "policyscope", version, about = "Privacy scanner for public websites")]
struct Cli {
    /// Path to a config file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan a URL and print the outcome
    Scan {
        /// Absolute http(s) URL to scan
        url: String,
        /// Analysis provider (gemini or openai)
        #[arg(long)]
        provider: Option<ProviderKind>,
        /// Per-request API key for the provider
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Print aggregate scan statistics
    Stats,

    /// List the most recent scans
    History {
        /// Maximum number of scans to list
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Show a single scan by ID
    Show {
        /// Scan ID
        id: String,
    },
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,policyscope=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn analysis_config(
    config: &AppConfig,
    provider: Option<ProviderKind>,
    api_key: Option<String>,
) -> Result<AnalysisConfig> {
    let provider = match provider {
        Some(provider) => provider,
        None => config.llm.default_provider()?,
    };
    let mut analysis = AnalysisConfig::new(provider);
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        analysis = analysis.with_api_key(key);
    }
    Ok(analysis)
}

async fn run(cli: Cli) -> Result<()> {
    let config =
        AppConfig::load_with_env(cli.config.as_deref()).context("failed to load configuration")?;

    let db_path = config.database_path()?;
    info!("Scan database: {}", db_path.display());
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.run_migrations().await?;

    let engine = ScanEngine::from_config(&config, Arc::new(db.clone()))?;

    match cli.command {
        Commands::Scan {
            url,
            provider,
            api_key,
        } => {
            let analysis = analysis_config(&config, provider, api_key)?;
            engine.start().await;
            let outcome = engine.scan(&url, analysis).await;
            engine.shutdown().await;
            print_json(&outcome?)?;
        }
        Commands::Stats => print_json(&engine.get_stats().await?)?,
        Commands::History { limit } => print_json(&engine.history(limit).await?)?,
        Commands::Show { id } => {
            let id = ScanId::parse(id)?;
            let record = engine
                .get_scan(&id)
                .await?
                .with_context(|| format!("scan {id} not found"))?;
            print_json(&record)?;
        }
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("Starting PolicyScope v{}", env!("CARGO_PKG_VERSION"));

    run(Cli::parse()).await
}
