//! # Portal API
//!
//! HTTP server for citizen applications, complaints, tracking and bills.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use portal_core::TariffBook;
use portal_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use portal_api::{router, telemetry, AppState, PortalConfig};

/// Command-line overrides; everything else comes from `PORTAL_*` variables.
#[derive(Debug, Parser)]
#[command(name = "portal-api", about = "Utility portal HTTP API")]
struct Args {
    /// Interface to bind (overrides PORTAL_HTTP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORTAL_HTTP_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

/// Tariffs seeded on an empty database apply from this year onwards.
const SEED_EFFECTIVE_YEAR: i32 = 2000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = PortalConfig::load()?;
    if let Some(host) = args.host {
        config.http_host = host;
    }
    if let Some(port) = args.port {
        config.http_port = port;
    }

    telemetry::init(&config.log_level);
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("opening the portal database")?;

    if config.seed_tariffs {
        let tariffs = db.tariffs();
        if tariffs.count().await? == 0 {
            let book = TariffBook::standard()?;
            let saved = tariffs.seed(&book, SEED_EFFECTIVE_YEAR, Utc::now()).await?;
            info!(saved, "Seeded standard tariff book");
        }
    } else if db.tariffs().count().await? == 0 {
        warn!("No tariffs stored and seeding disabled; bill endpoints will reject every category");
    }

    let app = router(AppState::new(db.clone()));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!(%address, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
