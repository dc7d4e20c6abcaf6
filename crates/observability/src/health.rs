//! Health-Check-Endpunkt fuer Skinnygate
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und den Bestandszahlen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::GatewayMetrics;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Bestandszahlen des Gateways
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zaehlerstand {
    pub sessions: usize,
    pub geraete: usize,
    pub leitungen: usize,
    pub kanaele: usize,
}

/// Liefert den aktuellen Bestand (z.B. aus dem Gateway-Snapshot)
pub trait StatusQuelle: Send + Sync + 'static {
    fn zaehlerstand(&self) -> Zaehlerstand;
}

impl<F> StatusQuelle for F
where
    F: Fn() -> Zaehlerstand + Send + Sync + 'static,
{
    fn zaehlerstand(&self) -> Zaehlerstand {
        self()
    }
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub zeitpunkt: DateTime<Utc>,
    pub signaling_aktiv: bool,
    pub zaehler: Zaehlerstand,
}

/// Geteilter Zustand fuer die HTTP-Handler
#[derive(Clone)]
pub struct ObservabilityState {
    pub metriken: GatewayMetrics,
    quelle: Arc<dyn StatusQuelle>,
    start_time: Arc<Instant>,
    signaling_aktiv: Arc<AtomicBool>,
}

impl ObservabilityState {
    pub fn neu(metriken: GatewayMetrics, quelle: impl StatusQuelle) -> Self {
        Self {
            metriken,
            quelle: Arc::new(quelle),
            start_time: Arc::new(Instant::now()),
            signaling_aktiv: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Meldet ob der Skinny-Listener laeuft
    pub fn signaling_status_setzen(&self, aktiv: bool) {
        self.signaling_aktiv.store(aktiv, Ordering::Relaxed);
    }

    pub fn signaling_laeuft(&self) -> bool {
        self.signaling_aktiv.load(Ordering::Relaxed)
    }

    pub fn zaehlerstand(&self) -> Zaehlerstand {
        self.quelle.zaehlerstand()
    }

    pub fn bericht(&self) -> HealthResponse {
        let signaling_aktiv = self.signaling_laeuft();
        HealthResponse {
            status: if signaling_aktiv {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            zeitpunkt: Utc::now(),
            signaling_aktiv,
            zaehler: self.zaehlerstand(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: ObservabilityState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Gateway-Status zurueck
async fn health_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    let bericht = state.bericht();
    let http_status = match bericht.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(bericht))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ObservabilityState {
        ObservabilityState::neu(GatewayMetrics::neu().unwrap(), || Zaehlerstand {
            sessions: 2,
            geraete: 1,
            leitungen: 3,
            kanaele: 0,
        })
    }

    #[test]
    fn bericht_enthaelt_zaehler() {
        let state = state();
        let bericht = state.bericht();
        assert_eq!(bericht.zaehler.sessions, 2);
        assert_eq!(bericht.zaehler.leitungen, 3);
        assert!(bericht.uptime_seconds < 5);
    }

    #[test]
    fn status_folgt_dem_listener() {
        let state = state();
        assert_eq!(state.bericht().status, HealthStatus::Unhealthy);
        state.signaling_status_setzen(true);
        assert_eq!(state.bericht().status, HealthStatus::Healthy);
    }

    #[test]
    fn health_response_serialisierung() {
        let state = state();
        state.signaling_status_setzen(true);
        let json = serde_json::to_value(state.bericht()).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["zaehler"]["geraete"], 1);
        assert_eq!(json["signaling_aktiv"], true);
    }

    #[test]
    fn health_response_deserialisierung() {
        let json = r#"{"status":"degraded","version":"0.1.0","uptime_seconds":100,
            "zeitpunkt":"2024-03-17T10:00:00Z","signaling_aktiv":true,
            "zaehler":{"sessions":1,"geraete":1,"leitungen":1,"kanaele":0}}"#;
        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.zaehler.sessions, 1);
    }
}
