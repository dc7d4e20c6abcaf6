//! Prometheus-kompatible Metriken fuer Skinnygate
//!
//! Registrierte Metriken:
//! - `skinnygate_sessions_aktiv` – Gauge: offene TCP-Sessions
//! - `skinnygate_geraete_registriert` – Gauge: registrierte Geraete
//! - `skinnygate_leitungen` – Gauge: bekannte Leitungen
//! - `skinnygate_kanaele_aktiv` – Gauge: laufende Kanaele
//! - `skinnygate_events_total` – Counter: Gateway-Ereignisse (event)
//! - `skinnygate_kanal_zustaende_total` – Counter: Zustandswechsel (zustand)
//! - `skinnygate_dekodier_fehler_total` – Counter: Dekodierfehler (art)
//! - `skinnygate_registrierungen_abgelehnt_total` – Counter: abgelehnte Registrierungen
//! - `skinnygate_verbindungen_abgewiesen_total` – Counter: durch ACL/Limit abgewiesen
//! - `skinnygate_events_verloren_total` – Counter: uebersprungene Ereignisse
//!
//! Die Gauges werden beim Scrape aus der Statusquelle gesetzt, die Counter
//! aus dem Ereignisstrom des Gateways.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use skinnygate_core::GatewayEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::ObservabilityResult;
use crate::health::{ObservabilityState, Zaehlerstand};

/// Alle Skinnygate-Prometheus-Metriken
#[derive(Clone)]
pub struct GatewayMetrics {
    pub registry: Arc<Registry>,

    // Bestandswerte
    pub sessions_aktiv: IntGauge,
    pub geraete_registriert: IntGauge,
    pub leitungen: IntGauge,
    pub kanaele_aktiv: IntGauge,

    // Ereignisse
    pub events_total: IntCounterVec,
    pub kanal_zustaende_total: IntCounterVec,
    pub dekodier_fehler_total: IntCounterVec,
    pub registrierungen_abgelehnt_total: IntCounter,
    pub verbindungen_abgewiesen_total: IntCounter,
    pub events_verloren_total: IntCounter,
}

fn gauge(registry: &Registry, name: &str, hilfe: &str) -> ObservabilityResult<IntGauge> {
    let g = IntGauge::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> ObservabilityResult<IntCounter> {
    let c = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

fn zaehler_vec(
    registry: &Registry,
    name: &str,
    hilfe: &str,
    label: &str,
) -> ObservabilityResult<IntCounterVec> {
    let c = IntCounterVec::new(Opts::new(name, hilfe), &[label])?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl GatewayMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> ObservabilityResult<Self> {
        let registry = Registry::new();

        // Prozesswerte (CPU, Speicher, Dateideskriptoren)
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            sessions_aktiv: gauge(&registry, "skinnygate_sessions_aktiv", "Offene TCP-Sessions")?,
            geraete_registriert: gauge(
                &registry,
                "skinnygate_geraete_registriert",
                "Registrierte Geraete",
            )?,
            leitungen: gauge(&registry, "skinnygate_leitungen", "Bekannte Leitungen")?,
            kanaele_aktiv: gauge(&registry, "skinnygate_kanaele_aktiv", "Laufende Kanaele")?,
            events_total: zaehler_vec(
                &registry,
                "skinnygate_events_total",
                "Gateway-Ereignisse nach Art",
                "event",
            )?,
            kanal_zustaende_total: zaehler_vec(
                &registry,
                "skinnygate_kanal_zustaende_total",
                "Kanal-Zustandswechsel nach Zielzustand",
                "zustand",
            )?,
            dekodier_fehler_total: zaehler_vec(
                &registry,
                "skinnygate_dekodier_fehler_total",
                "Nicht dekodierbare Nachrichten nach Fehlerart",
                "art",
            )?,
            registrierungen_abgelehnt_total: zaehler(
                &registry,
                "skinnygate_registrierungen_abgelehnt_total",
                "Abgelehnte Registrierungen",
            )?,
            verbindungen_abgewiesen_total: zaehler(
                &registry,
                "skinnygate_verbindungen_abgewiesen_total",
                "Durch ACL oder Session-Limit abgewiesene Verbindungen",
            )?,
            events_verloren_total: zaehler(
                &registry,
                "skinnygate_events_verloren_total",
                "Ereignisse, die der Metrik-Task verpasst hat",
            )?,
            registry: Arc::new(registry),
        })
    }

    /// Zaehlt ein Gateway-Ereignis
    pub fn event_verarbeiten(&self, event: &GatewayEvent) {
        self.events_total.with_label_values(&[event.name()]).inc();
        match event {
            GatewayEvent::KanalZustand { zustand, .. } => {
                self.kanal_zustaende_total
                    .with_label_values(&[zustand.as_str()])
                    .inc();
            }
            GatewayEvent::DekodierFehler { art } => {
                self.dekodier_fehler_total
                    .with_label_values(&[art.as_str()])
                    .inc();
            }
            GatewayEvent::GeraetAbgelehnt { .. } => self.registrierungen_abgelehnt_total.inc(),
            GatewayEvent::VerbindungAbgewiesen { .. } => self.verbindungen_abgewiesen_total.inc(),
            _ => {}
        }
    }

    /// Setzt die Gauges auf den aktuellen Bestand
    pub fn bestand_setzen(&self, stand: &Zaehlerstand) {
        self.sessions_aktiv.set(stand.sessions as i64);
        self.geraete_registriert.set(stand.geraete as i64);
        self.leitungen.set(stand.leitungen as i64);
        self.kanaele_aktiv.set(stand.kanaele as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> ObservabilityResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(state: ObservabilityState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<ObservabilityState>) -> impl IntoResponse {
    state.metriken.bestand_setzen(&state.zaehlerstand());
    match state.metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(fehler = %err, "Metriken-Export fehlgeschlagen");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Liest den Ereignisstrom bis der Gateway ihn schliesst
pub async fn events_verfolgen(metriken: GatewayMetrics, mut rx: broadcast::Receiver<GatewayEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => metriken.event_verarbeiten(&event),
            Err(broadcast::error::RecvError::Lagged(anzahl)) => {
                tracing::warn!(anzahl, "Metrik-Task hat Ereignisse verpasst");
                metriken.events_verloren_total.inc_by(anzahl);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::debug!("Ereignisstrom beendet");
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinnygate_core::{CallId, DeviceId};

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = GatewayMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn ereignisse_werden_gezaehlt() {
        let metriken = GatewayMetrics::neu().unwrap();
        metriken.event_verarbeiten(&GatewayEvent::DekodierFehler {
            art: "frame".to_string(),
        });
        metriken.event_verarbeiten(&GatewayEvent::KanalZustand {
            call_id: CallId(1),
            zustand: "Connected".to_string(),
        });
        metriken.event_verarbeiten(&GatewayEvent::GeraetAbgelehnt {
            device_id: DeviceId::new("SEP1"),
            grund: "Unknown Device".to_string(),
        });

        assert_eq!(
            metriken
                .dekodier_fehler_total
                .with_label_values(&["frame"])
                .get(),
            1
        );
        assert_eq!(
            metriken
                .kanal_zustaende_total
                .with_label_values(&["Connected"])
                .get(),
            1
        );
        assert_eq!(metriken.registrierungen_abgelehnt_total.get(), 1);
        assert_eq!(
            metriken
                .events_total
                .with_label_values(&["dekodier_fehler"])
                .get(),
            1
        );
    }

    #[test]
    fn bestand_setzt_gauges() {
        let metriken = GatewayMetrics::neu().unwrap();
        metriken.bestand_setzen(&Zaehlerstand {
            sessions: 3,
            geraete: 2,
            leitungen: 4,
            kanaele: 1,
        });
        assert_eq!(metriken.sessions_aktiv.get(), 3);
        assert_eq!(metriken.kanaele_aktiv.get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = GatewayMetrics::neu().unwrap();
        metriken.sessions_aktiv.set(5);
        metriken.verbindungen_abgewiesen_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("skinnygate_sessions_aktiv 5"));
        assert!(output.contains("skinnygate_verbindungen_abgewiesen_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[tokio::test]
    async fn event_task_endet_mit_dem_kanal() {
        let metriken = GatewayMetrics::neu().unwrap();
        let (tx, rx) = broadcast::channel(8);
        let task = tokio::spawn(events_verfolgen(metriken.clone(), rx));
        tx.send(GatewayEvent::VerbindungAbgewiesen {
            peer: "127.0.0.1:5000".parse().unwrap(),
        })
        .unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(metriken.verbindungen_abgewiesen_total.get(), 1);
    }
}
