use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use ephemera_ledger_memory::MemoryGrantLedger;
use ephemera_lifecycle::LifecycleBuilder;
use ephemera_server::api::{self, AppState};
use ephemera_server::config::EphemeraConfig;
use ephemera_server::{storage_factory, telemetry};

/// Self-destructing photo sharing server.
#[derive(Parser, Debug)]
#[command(name = "ephemera-server", about = "HTTP server for ephemera")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ephemera.toml")]
    config: PathBuf,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = EphemeraConfig::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    telemetry::init(&config.logging);
    info!(config = %cli.config.display(), "configuration loaded");

    let blobs = storage_factory::create_blob_store(&config.storage).await?;
    let ledger = Arc::new(MemoryGrantLedger::new().with_ttl(config.grants.ttl()));

    let lifecycle = LifecycleBuilder::new()
        .ledger(ledger)
        .blob_store(blobs)
        .fetch_timeout(config.grants.fetch_timeout())
        .janitor_interval(config.janitor.interval())
        .build()?;

    let janitor = if config.janitor.enabled {
        Some(lifecycle.janitor.spawn())
    } else {
        info!("periodic janitor disabled; use POST /api/cleanup");
        None
    };

    let state = AppState::new(lifecycle, &config)?;
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        external_url = %config.server.external_url(),
        "ephemera-server listening"
    );

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(janitor) = janitor {
        let timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
        if tokio::time::timeout(timeout, janitor.shutdown()).await.is_err() {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "janitor did not stop before the shutdown timeout"
            );
        }
    }

    info!("ephemera-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
