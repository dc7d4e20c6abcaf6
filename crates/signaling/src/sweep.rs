//! Sweep fuer haengende Sessions
//!
//! Laeuft im Keepalive-Takt und beendet jede Session, die laenger als
//! `toleranz + intervall` still war, auch wenn ihr Socket keinen Fehler
//! meldet. Der Reader-Task wird dabei hart abgebrochen.

use std::sync::Arc;

use crate::connection;
use crate::server_state::GatewayState;
use crate::session::StopCause;

/// Periodischer Sweep bis zum Shutdown
pub async fn sweep_schleife(
    state: Arc<GatewayState>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let mut takt = tokio::time::interval(state.config.keepalive.intervall);
    takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // der erste Tick kommt sofort
    takt.tick().await;

    loop {
        tokio::select! {
            _ = takt.tick() => {
                let beendet = sweep_einmal(&state).await;
                if beendet > 0 {
                    tracing::info!(beendet, "Sweep hat haengende Sessions beendet");
                }
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Ein Durchlauf. Gibt die Anzahl beendeter Sessions zurueck
pub async fn sweep_einmal(state: &Arc<GatewayState>) -> usize {
    let mut beendet = 0;
    for session in state.registry.sessions() {
        let grenze = session.toleranz() + session.keepalive_intervall();
        if session.seit_aktivitaet() <= grenze {
            continue;
        }
        tracing::warn!(
            session = %session.id,
            peer = %session.peer,
            still_sek = session.seit_aktivitaet().as_secs(),
            "Session ohne Aktivitaet, wird erzwungen beendet"
        );
        session.stoppen(StopCause::Sweep);
        if !session.wird_aufgeraeumt() {
            session.reader_abbrechen();
            connection::aufraeumen(state, &session).await;
        }
        beendet += 1;
    }
    beendet
}
