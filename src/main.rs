//! hydrodiag - Multi-View Hydraulic Part Diagnosis Service
//!
//! HTTP service that classifies five photographs of a hydraulic part and
//! aggregates them into one diagnostic report with a severity-priority
//! verdict.
//!
//! # Usage
//!
//! ```bash
//! # Run with the ONNX model from the configured path
//! cargo run --release
//!
//! # Run without model artifacts (deterministic stub classifier)
//! cargo run --release -- --stub-classifier
//! ```
//!
//! # Environment Variables
//!
//! - `HYDRODIAG_CONFIG`: Path to a TOML config file
//! - `HYDRODIAG_CORS_ORIGINS`: Comma-separated allowed CORS origins
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DATA`: Set to "true" to wipe all persistent data on startup

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hydrodiag::classifier::{Classifier, OnnxClassifier, StubClassifier};
use hydrodiag::{create_app, BlobStore, ReportStore, ServiceConfig, ServiceState};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hydrodiag")]
#[command(about = "Multi-view hydraulic part diagnosis service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a TOML config file (overrides HYDRODIAG_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the ONNX model path
    #[arg(long)]
    model: Option<PathBuf>,

    /// Run with a deterministic stub classifier instead of the ONNX model.
    /// Lets the service run end-to-end without model artifacts on disk.
    #[arg(long)]
    stub_classifier: bool,

    /// Reset all persistent data (reports and images) on startup.
    /// WARNING: This is destructive and cannot be undone!
    /// Can also be set via RESET_DATA=true environment variable.
    #[arg(long)]
    reset_data: bool,
}

// ============================================================================
// Data Reset
// ============================================================================

/// Check if a data reset is requested via CLI flag or environment variable.
fn should_reset_data(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    if let Ok(val) = std::env::var("RESET_DATA") {
        let val_lower = val.to_lowercase();
        return val_lower == "true" || val_lower == "1" || val_lower == "yes";
    }
    false
}

/// Safely remove the data directory and all its contents.
fn reset_data_directory(data_path: &Path) -> Result<()> {
    if !data_path.exists() {
        info!("Data directory does not exist, nothing to reset");
        return Ok(());
    }

    warn!("RESET_DATA requested - wiping all persistent data");
    warn!("  Removing: {}", data_path.display());

    std::fs::remove_dir_all(data_path).context("Failed to remove data directory")?;

    warn!("  Data directory removed; fresh stores will be created on startup");
    Ok(())
}

// ============================================================================
// State Construction
// ============================================================================

/// Build the shared service state: classifier, vocabularies, stores.
///
/// A missing or corrupt backing store is not fatal - the service starts and
/// the affected endpoints answer 503 until the store is repaired. A missing
/// model IS fatal (unless the stub classifier was requested).
fn build_state(config: &ServiceConfig, stub: bool) -> Result<ServiceState> {
    let classifier: Arc<dyn Classifier> = if stub {
        info!("🧪 Using stub classifier (no model artifacts loaded)");
        Arc::new(StubClassifier::uniform(
            config.vocabulary.parts.len(),
            config.vocabulary.states.len(),
        ))
    } else {
        info!("🧠 Loading ONNX model from {}", config.model.path.display());
        Arc::new(
            OnnxClassifier::load(&config.model.path).with_context(|| {
                format!("Failed to load ONNX model {}", config.model.path.display())
            })?,
        )
    };

    let reports = match ReportStore::open(config.data.dir.join("reports.db")) {
        Ok(store) => {
            info!("✓ Report store opened ({} reports)", store.count());
            Some(store)
        }
        Err(e) => {
            warn!("Report store unavailable: {}. Reports will not be persisted.", e);
            None
        }
    };

    let blobs = match BlobStore::open(
        config.data.dir.join("blobs"),
        &config.server.public_base_url,
    ) {
        Ok(store) => {
            info!("✓ Image blob store opened");
            Some(store)
        }
        Err(e) => {
            warn!(
                "Image storage unavailable: {}. Diagnose requests will be rejected.",
                e
            );
            None
        }
    };

    ServiceState::new(config, classifier, reports, blobs)
        .context("Invalid vocabulary configuration")
}

// ============================================================================
// Supervision
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<()>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<()>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(()))) => {
                        info!("Supervisor: Task completed normally");
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    if let Some(model) = args.model {
        config.model.path = model;
    }

    // Reset check - BEFORE any storage initialization
    if should_reset_data(args.reset_data) {
        reset_data_directory(&config.data.dir)?;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  hydrodiag - Multi-View Hydraulic Part Diagnosis Service");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!(
        "Parts: {} | States: {} (most severe: {})",
        config.vocabulary.parts.len(),
        config.vocabulary.states.len(),
        config.vocabulary.states.last().map(String::as_str).unwrap_or("?"),
    );

    let state = build_state(&config, args.stub_classifier)?;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("✓ HTTP server listening on {}", config.server.addr);
    info!("");

    let mut task_set: JoinSet<Result<()>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    run_supervisor(&mut task_set, cancel_token).await?;

    info!("");
    info!("✓ hydrodiag shutdown complete");
    Ok(())
}
