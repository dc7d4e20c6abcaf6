//! # skinnygate-observability
//!
//! Observability-Crate fuer Skinnygate:
//! - Prometheus-kompatible Metriken (`/metrics`), gespeist aus den Gateway-Ereignissen
//! - Health-Check-Endpunkt (`/health`) mit Bestandszahlen
//! - Structured Logging (Text oder JSON) via tracing-subscriber

pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;

pub use error::{ObservabilityError, ObservabilityResult};
pub use health::{health_router, HealthResponse, HealthStatus, ObservabilityState, StatusQuelle, Zaehlerstand};
pub use logging::logging_initialisieren;
pub use metrics::{events_verfolgen, metrics_router, GatewayMetrics};

use anyhow::Result;
use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
///
/// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    state: ObservabilityState,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    use axum::Router;

    let app = Router::new()
        .merge(metrics_router(state.clone()))
        .merge(health_router(state));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(adresse = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;
    tracing::info!("Observability-Server gestoppt");
    Ok(())
}
