// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::graph_service::GraphService;
use crate::application::ingest_service::IngestService;
use crate::application::metric_repository::MetricRepository;
use crate::application::trigger_monitor::{AlertLog, TriggerMonitor};
use crate::infrastructure::config::{load_monitor_config, StorageBackend};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::infrastructure::memory_repository::MemoryRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    alerts, graph, graph_script, health_check, index, ingest_metrics, register_resource,
};

const TRIGGER_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_monitor_config()?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn MetricRepository> = match config.storage.backend {
        StorageBackend::Memory => {
            let retention_hours = config.storage.memory.retention_hours;
            if retention_hours < config.graph.window_hours {
                tracing::warn!(
                    "Memory retention ({}h) is shorter than the graph window ({}h)",
                    retention_hours,
                    config.graph.window_hours
                );
            }
            tracing::info!("Storing metrics in memory for {}h", retention_hours);
            Arc::new(MemoryRepository::with_retention(chrono::Duration::hours(retention_hours)))
        }
        StorageBackend::Influx => {
            let influx = config
                .storage
                .influx
                .clone()
                .context("storage.backend is influx but [storage.influx] is missing")?;
            tracing::info!("Storing metrics in InfluxDB at {}", influx.host);
            Arc::new(InfluxRepository::new(
                influx.host,
                influx.token,
                influx.database,
                influx.retention_policy,
            ))
        }
    };

    // Trigger evaluation runs off the request path
    let alert_log = Arc::new(AlertLog::new(config.alerts.capacity));
    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);
    tokio::spawn(TriggerMonitor::new(config.triggers.clone(), alert_log.clone()).run(trigger_rx));

    // Create services (application layer)
    let state = Arc::new(AppState {
        ingest_service: IngestService::new(repository.clone(), trigger_tx),
        graph_service: GraphService::new(repository, config.graph.window_hours),
        alert_log,
    });

    // Build router (presentation layer)
    // Pages are compressed in the response builders, so no CompressionLayer here
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/resources", post(register_resource))
        .route("/metrics", post(ingest_metrics))
        .route("/", get(index))
        .route("/graph", get(graph))
        .route("/alerts", get(alerts))
        .route("/static/graph.js", get(graph_script))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind {:?}", config.server.bind))?;
    tracing::info!("Starting metrics monitor on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
