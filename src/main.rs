use anyhow::Context;
use clap::Parser;
use issue_tracker::api::{AppState, build_router, docs};
use issue_tracker::cli::{Cli, Commands};
use issue_tracker::config::{self, ServerConfig};
use issue_tracker::logging::init_logging;
use issue_tracker::storage::SqliteStorage;
use issue_tracker::{ErrorCode, IssueTrackerError, StructuredError};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        handle_error(&err);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let layer = config::load_config(cli.config.as_deref(), &cli.overrides())?;
    let config = ServerConfig::from_layer(&layer)?;

    if cli.selected() == Commands::Openapi {
        println!("{}", serde_json::to_string_pretty(docs::openapi_document())?);
        return Ok(());
    }

    if let Err(e) = init_logging(cli.verbose, cli.quiet, config.log_json) {
        eprintln!("Failed to initialize logging: {e}");
    }
    for key in layer.unknown_keys() {
        warn!(key, "ignoring unknown config key");
    }

    serve(config).await
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db_path = config.db_path.clone();
    let options = config.storage_options();
    let storage = tokio::task::spawn_blocking(move || SqliteStorage::open(&db_path, options))
        .await
        .context("storage open task failed")??;

    let state = AppState::new(Arc::new(storage), &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        bind = %config.bind,
        db = %config.db_path.display(),
        read_pool_size = config.read_pool_size,
        "issue tracker listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, draining in-flight requests");
}

/// Report a start-up failure on stderr and exit non-zero.
fn handle_error(err: &anyhow::Error) -> ! {
    let message = match err.downcast_ref::<IssueTrackerError>() {
        Some(tracker_err) => {
            let structured = StructuredError::from_error(tracker_err);
            // Storage errors are generic for HTTP callers; an operator needs the cause
            if matches!(structured.code, ErrorCode::DatabaseError | ErrorCode::InternalError) {
                format!("{}\n  caused by: {err:#}", structured.to_human(io::stderr().is_terminal()))
            } else {
                structured.to_human(io::stderr().is_terminal())
            }
        }
        None => format!("Error: {err:#}"),
    };
    eprintln!("{message}");
    std::process::exit(1);
}
