//! # visor-api — Binary Entry Point
//!
//! Loads configuration, builds the report store and starts the Axum server.
//! Configuration errors stop the process before the listener binds.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use visor_api::config::AppConfig;
use visor_api::state::AppState;
use visor_report::InMemoryReportStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("VISOR_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("configuration error: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");
    if config.issuance_key.is_none() {
        tracing::warn!("VISOR_ISSUANCE_API_KEY not set; credential issuance is disabled");
    }

    let store = match &config.reports_file {
        Some(path) => InMemoryReportStore::load_json(path).map_err(|e| {
            tracing::error!("failed to load reports: {e}");
            e
        })?,
        None => {
            tracing::warn!("VISOR_REPORTS_FILE not set; serving an empty report store");
            InMemoryReportStore::new()
        }
    };

    let mut state = AppState::new(&config, Arc::new(store));
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_prometheus(handle),
        Err(e) => tracing::warn!("Prometheus recorder not installed: {e}"),
    }

    let app = visor_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Visor API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
