//! Filo Command Line Interface
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.
//!
//! Usage:
//!   filo start       - Start the tracker and its API server
//!   filo health      - Check health of a running server
//!   filo catalogue   - Validate and list the catalogue

use clap::{Parser, Subcommand};
use filo_api::{run_server, ApiConfig};
use filo_core::{Catalogue, Category};
use filo_tracker::{FiloService, TrackerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;

use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "filo")]
#[command(about = "Hunt and FATE tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tracker and the API server
    Start {
        /// Host to bind to
        #[arg(short = 'H', long, env = "FILO_API_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, env = "FILO_API_PORT", default_value = "3000")]
        port: u16,
        /// Catalogue dataset (JSON); the built-in dataset when unset
        #[arg(short, long)]
        catalogue: Option<PathBuf>,
        /// Subscription store file (JSON); in-memory when unset
        #[arg(short, long)]
        subscriptions: Option<PathBuf>,
    },

    /// Check health of a running server
    Health {
        /// API server URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        api_url: String,
    },

    /// Validate and list the catalogue
    Catalogue {
        /// Catalogue dataset (JSON); the built-in dataset when unset
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Only list one category, e.g. SB_A or fates
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = TrackerConfig::from_env();
    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging; `RUST_LOG` wins over `FILO_LOG_LEVEL`
fn init_logging(config: &TrackerConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(cli: Cli, config: TrackerConfig) -> CliResult<()> {
    match cli.command {
        Commands::Start {
            host,
            port,
            catalogue,
            subscriptions,
        } => {
            let config = TrackerConfig {
                catalogue_path: catalogue.or(config.catalogue_path),
                subscriptions_path: subscriptions.or(config.subscriptions_path),
                ..config
            };
            let api_config = ApiConfig {
                host,
                port,
                ..ApiConfig::from_env()
            };
            start(config, api_config).await
        }
        Commands::Health { api_url } => health(&api_url).await,
        Commands::Catalogue { file, category } => {
            list_catalogue(file.or(config.catalogue_path), category.as_deref())
        }
    }
}

async fn start(config: TrackerConfig, api_config: ApiConfig) -> CliResult<()> {
    let catalogue = load_catalogue(config.catalogue_path.as_ref()).map_err(|e| {
        error!(error = %e, "Catalogue failed to load");
        e
    })?;

    let service = Arc::new(
        FiloService::builder()
            .config(config)
            .catalogue(Arc::new(catalogue))
            .build()
            .await?,
    );
    service.start().await;

    info!(host = %api_config.host, port = api_config.port, "Starting Filo");

    let result = tokio::select! {
        result = run_server(&api_config, service.clone()) => {
            result.map_err(|e| CliError::server(e.to_string()))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    service.stop().await;
    result
}

async fn health(api_url: &str) -> CliResult<()> {
    let url = format!("{}/health", api_url.trim_end_matches('/'));
    let response = reqwest::get(&url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ApiError {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let body: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn list_catalogue(file: Option<PathBuf>, category: Option<&str>) -> CliResult<()> {
    let catalogue = load_catalogue(file.as_ref())?;
    let category = category.map(Category::parse).transpose()?;

    let mut targets: Vec<_> = match category {
        Some(category) => catalogue.in_category(category),
        None => catalogue.iter().collect(),
    };
    targets.sort_by_key(|t| t.id);

    for target in &targets {
        println!(
            "{:>5}  {:<28} {:<6} {:<24} {}",
            target.id,
            target.name,
            target
                .category()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            target.zone,
            target.expansion.name(),
        );
    }
    println!(
        "{} targets, {} on the train route",
        targets.len(),
        catalogue.train_route().len()
    );
    Ok(())
}

fn load_catalogue(path: Option<&PathBuf>) -> CliResult<Catalogue> {
    Ok(match path {
        Some(path) => Catalogue::load(path)?,
        None => Catalogue::builtin()?,
    })
}
