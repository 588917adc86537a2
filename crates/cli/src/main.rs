//! Operator CLI for keystead stores.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use keystead_core::config::AppConfig;
use keystead_store::{KeyStores, spawn_expiry_sweeper, sweep_once};
use std::path::Path;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "keysteadctl")]
#[command(about = "Administrative CLI for keystead trust material stores")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "KEYSTEAD_CONFIG",
        default_value = "config/keystead.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Create or update the store schema
    Migrate,
    /// Check store connectivity
    Health,
    /// Delete expired certification paths once
    Sweep,
    /// Delete expired certification paths periodically until interrupted
    Watch {
        /// Seconds between sweeps (overrides sweep.interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

/// Load configuration from an optional TOML file overlaid with `KEYSTEAD_` variables.
fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        tracing::info!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path.display());
    }

    figment
        .merge(Env::prefixed("KEYSTEAD_").ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(Path::new(&cli.config))?;

    // Connecting already applies the schema.
    let backend = keystead_store::from_config(&config.store)
        .await
        .context("failed to initialize key store")?;
    let stores = KeyStores::new(backend);

    match cli.command {
        Commands::Migrate => {
            stores
                .backend
                .migrate()
                .await
                .context("failed to apply schema")?;
            println!("Schema is up to date");
        }
        Commands::Health => {
            stores
                .backend
                .health_check()
                .await
                .context("store health check failed")?;
            println!("Store is healthy");
        }
        Commands::Sweep => {
            let deleted = sweep_once(&stores.certificates, OffsetDateTime::now_utc())
                .await
                .context("failed to delete expired certification paths")?;
            println!("Deleted {deleted} expired certification path(s)");
        }
        Commands::Watch { interval_secs } => {
            if !config.sweep.enabled && interval_secs.is_none() {
                tracing::warn!("Expiry sweeper is disabled (sweep.enabled = false)");
                return Ok(());
            }

            let interval = match interval_secs {
                Some(secs) => std::time::Duration::from_secs(secs.max(1)),
                None => config.sweep.interval(),
            };
            let handle = spawn_expiry_sweeper(stores.certificates.clone(), interval);
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Expiry sweeper started"
            );

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            handle.abort();
            tracing::info!("Expiry sweeper stopped");
        }
    }

    Ok(())
}
