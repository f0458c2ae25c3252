//! Starpoint search gateway CLI
//!
//! Command-line interface for running the search gateway.

use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use starpoint_search::{
    ApiServer, AppState, EncoderSettings, Error, FastEmbedEncoder, GatewayConfig,
    HealthResponse, MetricsService, QueryEncoder, Result, SearchHandler, StarpointClient,
};

#[derive(Parser)]
#[command(name = "starpoint-search")]
#[command(author, version, about = "Starpoint text search gateway", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Start the search gateway
    Start {
        /// HTTP API listen address (overrides the config file)
        #[arg(long)]
        api_addr: Option<String>,

        /// Inference device: auto, cpu, cuda or cuda:<id> (overrides the config file)
        #[arg(long)]
        device: Option<String>,
    },

    /// Encode a text locally and print the embedding as JSON
    Encode {
        /// Text to encode
        text: String,
    },

    /// Check gateway health
    Health {
        /// API endpoint to check
        #[arg(long, default_value = "http://localhost:8080")]
        endpoint: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(path: &str) -> Result<GatewayConfig> {
    if Path::new(path).exists() {
        info!("Loading configuration from: {}", path);
        GatewayConfig::load(path)
    } else {
        info!("Using default configuration");
        Ok(GatewayConfig::default())
    }
}

/// Model loading downloads and initializes ONNX sessions, so keep it off the
/// async workers.
async fn load_encoder(settings: EncoderSettings) -> Result<FastEmbedEncoder> {
    tokio::task::spawn_blocking(move || FastEmbedEncoder::new(&settings))
        .await
        .map_err(|e| Error::Encoding(format!("Encoder loading task failed: {}", e)))?
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => {
            info!("Initializing new gateway configuration at: {}", output);
            let config = GatewayConfig::default();
            config.save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Start { api_addr, device } => {
            info!("Starting search gateway...");

            // 1. Load configuration with CLI overrides
            let mut config = load_config(&cli.config)?;
            if let Some(addr) = api_addr {
                config.api.listen_address = addr;
            }
            if let Some(device) = device {
                config.encoder.device = device;
            }
            config.validate()?;

            info!("API address: {}", config.api.listen_address);
            info!("Vector store: {}", config.vector_store.base_url);

            // 2. Load the query encoder once; it is shared read-only by all requests
            info!("Loading query encoder (downloading model if needed)...");
            let encoder = load_encoder(config.encoder.clone()).await?;
            let descriptor = encoder.descriptor();
            info!(
                "Encoder ready: {} on {} ({} dimensions)",
                descriptor.model, descriptor.device, descriptor.dimension
            );

            // 3. Vector store client (credentials arrive per request)
            let store = StarpointClient::new(&config.vector_store)?;
            let handler = SearchHandler::new(Arc::new(encoder), Arc::new(store));

            // 4. Shared state and optional metrics exporter
            let mut state = AppState::new(handler);
            if config.metrics.enabled {
                state = state.with_metrics(MetricsService::install()?);
                info!("Metrics exposed at {}", config.metrics.path);
            }

            // 5. Serve until Ctrl+C
            let server = ApiServer::with_state(config.api.clone(), state)
                .with_metrics_path(config.metrics.path.clone());
            info!("Press Ctrl+C to stop");
            server.run(shutdown_signal()).await?;
            info!("Gateway stopped");
        }

        Commands::Encode { text } => {
            let config = load_config(&cli.config)?;
            let encoder = load_encoder(config.encoder).await?;
            let embedding = tokio::task::spawn_blocking(move || encoder.encode(&text))
                .await
                .map_err(|e| Error::Encoding(format!("Inference task failed: {}", e)))??;

            info!(
                "Encoded {} dimensions, norm {:.6}",
                embedding.len(),
                embedding.norm()
            );
            println!("{}", serde_json::to_string(&embedding)?);
        }

        Commands::Health { endpoint } => {
            info!("Checking gateway health at: {}", endpoint);

            let health_url = format!("{}/health", endpoint.trim_end_matches('/'));
            match check_health(&health_url).await {
                Ok(response) => {
                    info!("Gateway status: {}", response.status);
                    info!("Version: {}", response.version);
                    info!(
                        "Encoder: {} on {} ({} dimensions)",
                        response.encoder.model, response.encoder.device, response.encoder.dimension
                    );
                    info!("Uptime: {} seconds", response.uptime);
                }
                Err(e) => {
                    error!("Health check failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Perform a health check against the API endpoint.
async fn check_health(url: &str) -> Result<HealthResponse> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| Error::Api(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Api(format!("Connection failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Api(format!("Unexpected status {}", response.status())));
    }

    response
        .json::<HealthResponse>()
        .await
        .map_err(|e| Error::Api(format!("JSON parse error: {}", e)))
}
