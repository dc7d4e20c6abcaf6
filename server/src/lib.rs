//! skinnygate-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Host-Kollaborateure, Signaling und
//! Observability und stellt den Einstiegspunkt fuer Integrationstests bereit.

pub mod config;
pub mod router;

use anyhow::{Context, Result};
use config::ServerConfig;
use router::{LoopbackCallControl, LoopbackRouter};
use skinnygate_observability::{
    events_verfolgen, observability_server_starten, GatewayMetrics, ObservabilityState,
    Zaehlerstand,
};
use skinnygate_signaling::{
    GatewayState, Kollaborateure, MemoryFeatureStore, SignalingServer, StaticDirectory, StaticMedia,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Baut den Gateway-Zustand mit den eingebauten Kollaborateuren
///
/// Verzeichnis und Leitungen kommen aus der Konfiguration, Features liegen
/// im Speicher und die Call-Control ist der Loopback-Router.
pub fn gateway_aufbauen(config: &ServerConfig) -> Result<(Arc<GatewayState>, Arc<LoopbackRouter>)> {
    let signaling = config.signaling_config()?;

    let router = Arc::new(LoopbackRouter::neu(
        config.leitungen.iter().map(|l| l.name.clone()),
    ));
    let state = GatewayState::neu(
        signaling,
        Kollaborateure {
            verzeichnis: Arc::new(StaticDirectory::neu(
                config.geraete.clone(),
                config.leitungen.clone(),
            )),
            features: Arc::new(MemoryFeatureStore::neu()),
            call_control: Arc::new(LoopbackCallControl(Arc::clone(&router))),
            media: Arc::new(StaticMedia::neu(
                config.netzwerk.media_ip,
                config.netzwerk.media_basis_port,
            )),
        },
    );
    router.verbinden(&state);
    Ok((state, router))
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Gateway-Zustand und Kollaborateure aufbauen
    /// 2. Skinny-Listener binden
    /// 3. Metrik-Task und Observability-Server starten
    /// 4. Auf Ctrl-C warten, dann alle Tasks ueber den Watch-Kanal stoppen
    pub async fn starten(self) -> Result<()> {
        let (state, _router) = gateway_aufbauen(&self.config)?;
        let skinny_addr = self.config.skinny_bind_adresse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            skinny = %skinny_addr,
            geraete = self.config.geraete.len(),
            leitungen = self.config.leitungen.len(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let signaling = SignalingServer::binden(Arc::clone(&state), skinny_addr)
            .await
            .with_context(|| format!("Skinny-Port {skinny_addr} nicht bindbar"))?;

        let metriken = GatewayMetrics::neu()?;
        tokio::spawn(events_verfolgen(metriken.clone(), state.abonnieren()));

        let quelle = {
            let state = Arc::clone(&state);
            move || {
                let z = state.zaehler();
                Zaehlerstand {
                    sessions: z.sessions,
                    geraete: z.geraete,
                    leitungen: z.leitungen,
                    kanaele: z.kanaele,
                }
            }
        };
        let obs_state = ObservabilityState::neu(metriken, quelle);

        let observability = if self.config.observability.aktiviert {
            let addr = self.config.observability_bind_adresse()?;
            let obs_state = obs_state.clone();
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(addr, obs_state, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        let signaling_task = tokio::spawn(signaling.starten(shutdown_rx));
        obs_state.signaling_status_setzen(true);

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        obs_state.signaling_status_setzen(false);
        // Empfaenger koennen bereits beendet sein
        let _ = shutdown_tx.send(true);

        match signaling_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(fehler = %e, "Signaling mit Fehler beendet"),
            Err(e) => tracing::error!(fehler = %e, "Signaling-Task abgebrochen"),
        }
        if let Some(task) = observability {
            let _ = task.await;
        }

        tracing::info!(uptime_sek = state.uptime_sek(), "Server gestoppt");
        Ok(())
    }
}
