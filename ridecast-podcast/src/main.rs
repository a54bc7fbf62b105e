//! ridecast-podcast - Podcast generation service
//!
//! Turns a completed ride analysis into a narrated audio podcast: composes
//! stage prompts, generates and formats a script, submits it to the audio
//! synthesis worker, waits for the artifact and delivers it.
//!
//! `serve` (default) hosts the HTTP + SSE service; `generate` runs one
//! pipeline from the command line and writes the audio to disk.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ridecast_common::config::{ConfigResolver, TomlConfig};
use ridecast_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ridecast_podcast::models::AnalysisRecord;
use ridecast_podcast::services::{
    AnalysisSource, DeliveryStrategy, InMemoryAnalysisSource, PodcastRequest,
};
use ridecast_podcast::AppState;

const MODULE_NAME: &str = "ridecast-podcast";

/// Command-line arguments for ridecast-podcast
#[derive(Parser, Debug)]
#[command(name = "ridecast-podcast")]
#[command(about = "Podcast generation service for Ridecast")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/ridecast/ridecast-podcast.toml)
    #[arg(short, long, global = true, env = "RIDECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, global = true, env = "RIDECAST_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RIDECAST_LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, global = true, env = "RIDECAST_TEXT_GENERATION_URL")]
    text_generation_url: Option<String>,

    #[arg(long, global = true, env = "RIDECAST_SYNTHESIS_WORKER_URL")]
    synthesis_worker_url: Option<String>,

    #[arg(long, global = true, env = "RIDECAST_ARTIFACT_BASE_URL")]
    artifact_base_url: Option<String>,

    #[arg(long, global = true, env = "RIDECAST_ANALYSIS_SOURCE_URL")]
    analysis_source_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Generate one podcast and save it to disk
    Generate {
        /// Analysis to narrate
        #[arg(long)]
        analysis_id: String,

        /// Directory the audio file is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Read the analysis record from a JSON file instead of the analysis source
        #[arg(long)]
        analysis_file: Option<PathBuf>,

        /// Overrides the record's document name for the output filename
        #[arg(long)]
        document_name: Option<String>,
    },
}

impl Args {
    /// CLI/ENV values override the TOML file
    fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(url) = &self.text_generation_url {
            config.endpoints.text_generation_url = url.clone();
        }
        if let Some(url) = &self.synthesis_worker_url {
            config.endpoints.synthesis_worker_url = url.clone();
        }
        if let Some(url) = &self.artifact_base_url {
            config.endpoints.artifact_base_url = url.clone();
        }
        if let Some(url) = &self.analysis_source_url {
            config.endpoints.analysis_source_url = url.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigResolver::new(MODULE_NAME)
        .load(args.config.as_deref())
        .context("Failed to load configuration")?;
    args.apply_overrides(&mut config);

    init_logging(&config)?;

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let event_bus = EventBus::new(100);
    let components = ridecast_podcast::config::build_components(&config, event_bus.clone())
        .context("Failed to build podcast pipeline")?;

    match args.command {
        None | Some(Command::Serve) => serve(&config, components, event_bus).await,
        Some(Command::Generate {
            analysis_id,
            output_dir,
            analysis_file,
            document_name,
        }) => {
            let source: Arc<dyn AnalysisSource> = match analysis_file {
                Some(path) => Arc::new(load_analysis_file(&path, &analysis_id).await?),
                None => Arc::new(components.analysis_source),
            };
            generate(
                components.pipeline,
                source,
                &analysis_id,
                PodcastRequest {
                    document_name,
                    strategy: DeliveryStrategy::SaveToDisk { dir: output_dir },
                },
            )
            .await
        }
    }
}

/// Subscriber with `RUST_LOG` override, stdout plus an optional log file
fn init_logging(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ridecast_podcast={level},ridecast_common={level},tower_http=info",
            level = config.logging.level
        )
        .into()
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

async fn serve(
    config: &TomlConfig,
    components: ridecast_podcast::config::PipelineComponents,
    event_bus: EventBus,
) -> Result<()> {
    let state = AppState::new(
        Arc::new(components.pipeline),
        Arc::new(components.analysis_source),
        components.downloads,
        event_bus,
    );
    let shutdown = state.shutdown.clone();
    let app = ridecast_podcast::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Tear down in-flight runs along with the server
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn generate(
    pipeline: ridecast_podcast::services::PodcastPipeline,
    source: Arc<dyn AnalysisSource>,
    analysis_id: &str,
    request: PodcastRequest,
) -> Result<()> {
    let record = source.load(analysis_id).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    let delivered = pipeline.generate(&record, &request, &cancel).await?;

    match &delivered.location {
        ridecast_podcast::models::DeliveryLocation::Disk { path } => {
            info!("Podcast saved to {} ({} bytes)", path.display(), delivered.size_bytes)
        }
        other => info!("Podcast delivered: {:?}", other),
    }
    Ok(())
}

async fn load_analysis_file(path: &std::path::Path, analysis_id: &str) -> Result<InMemoryAnalysisSource> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read analysis file {}", path.display()))?;
    let mut record: AnalysisRecord = serde_json::from_str(&content)
        .with_context(|| format!("Invalid analysis record in {}", path.display()))?;
    if record.analysis_id.trim().is_empty() {
        record.analysis_id = analysis_id.to_string();
    }

    let source = InMemoryAnalysisSource::new();
    source.insert(record).await;
    Ok(source)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
