//! Client-Connection – Reader-Task und Aufraeumen einer Session
//!
//! Jede TCP-Verbindung bekommt einen eigenen tokio-Task, der Frames liest,
//! dekodiert und nacheinander an den `MessageDispatcher` gibt.
//!
//! ## Keepalive
//! - Jedes Lesen wartet hoechstens ein Keepalive-Intervall
//! - Nach einem leeren Intervall wird die Stille gegen die Toleranz der
//!   Session geprueft (Intervall * Faktor, siehe `keepalive`)
//! - Bei Ueberschreitung endet die Session mit `Timeout`
//!
//! ## Fehler
//! - Frame-Fehler (ungueltige Laenge) beenden die Verbindung
//! - Nachrichtenfehler (unbekannte ID, Groessenfehler) werden geloggt,
//!   danach geht es mit dem naechsten Frame weiter

use futures_util::StreamExt;
use skinnygate_core::host::HangupCause;
use skinnygate_core::GatewayEvent;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::anruf;
use crate::device::{Device, RegistrationState};
use crate::dispatcher::MessageDispatcher;
use crate::server_state::GatewayState;
use crate::session::{Session, SessionState, StopCause};
use skinnygate_protocol::FrameCodec;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection {
    state: Arc<GatewayState>,
    session: Arc<Session>,
    dispatcher: MessageDispatcher,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<GatewayState>, session: Arc<Session>) -> Self {
        let dispatcher = MessageDispatcher::neu(Arc::clone(&state));
        Self {
            state,
            session,
            dispatcher,
        }
    }

    /// Liest bis zum Stopp und raeumt danach auf
    pub async fn verarbeiten<R>(self, reader: R)
    where
        R: AsyncRead + Unpin + Send,
    {
        let grund = self.lesen(reader).await;
        self.session.stoppen(grund);
        aufraeumen(&self.state, &self.session).await;
    }

    async fn lesen<R>(&self, reader: R) -> StopCause
    where
        R: AsyncRead + Unpin + Send,
    {
        let session = &self.session;
        let stop = session.stop_token();
        let mut frames = FramedRead::new(reader, FrameCodec::new());

        loop {
            let intervall = session.keepalive_intervall();
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    return session.stop_grund().unwrap_or(StopCause::Shutdown);
                }

                ergebnis = tokio::time::timeout(intervall, frames.next()) => {
                    match ergebnis {
                        // Intervall ohne Daten
                        Err(_) => {
                            let still = session.seit_aktivitaet();
                            let toleranz = session.toleranz();
                            if still > toleranz {
                                tracing::warn!(
                                    session = %session.id,
                                    peer = %session.peer,
                                    still_ms = still.as_millis() as u64,
                                    toleranz_ms = toleranz.as_millis() as u64,
                                    "Keepalive-Timeout"
                                );
                                return StopCause::Timeout;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!(session = %session.id, peer = %session.peer, "Verbindung vom Telefon geschlossen");
                            return StopCause::Getrennt;
                        }
                        Ok(Some(Err(e))) => {
                            tracing::warn!(session = %session.id, peer = %session.peer, fehler = %e, "Frame-Fehler, Verbindung wird beendet");
                            self.state.melden(GatewayEvent::DekodierFehler { art: "frame".to_string() });
                            return StopCause::FrameFehler;
                        }
                        Ok(Some(Ok(frame))) => {
                            session.aktivitaet();
                            tracing::trace!(session = %session.id, id = frame.id, laenge = frame.laenge(), "Frame empfangen");
                            match session.protokoll().decode(&frame) {
                                Ok(msg) => self.dispatcher.dispatch(session, msg).await,
                                Err(e) => {
                                    tracing::debug!(
                                        session = %session.id,
                                        id = frame.id,
                                        fehler = %e,
                                        "Nachricht verworfen"
                                    );
                                    self.state.melden(GatewayEvent::DekodierFehler {
                                        art: e.art().to_string(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Baut eine beendete Session ab (idempotent)
///
/// Reihenfolge: Session vom Geraet loesen, dann das Geraet von der
/// Session, dann Kanaele und Leitungen des Geraets.
pub(crate) async fn aufraeumen(state: &Arc<GatewayState>, session: &Arc<Session>) {
    if !session.aufraeumen_beginnen() {
        return;
    }
    if let Some(geraet) = session.geraet_loesen() {
        let eigene = geraet.session().is_some_and(|s| Arc::ptr_eq(&s, session));
        if eigene {
            geraet.session_loesen();
            geraet_aufraeumen(state, &geraet).await;
        }
        session.anmeldung_setzen(RegistrationState::Gone);
    }
    state.registry.session_entfernen(session.id);
    session.writer_schliessen().await;

    let grund = session
        .stop_grund()
        .map(StopCause::als_str)
        .unwrap_or("unbekannt");
    state.melden(GatewayEvent::SessionGeschlossen {
        session_id: session.id,
        grund: grund.to_string(),
    });
    session.zustand_setzen(SessionState::Closed);
    tracing::info!(session = %session.id, peer = %session.peer, %grund, "Session geschlossen");
}

/// Legt alle Kanaele eines Geraets auf und loest es von seinen Leitungen
///
/// Nur der erste Aufruf pro Geraet wirkt.
pub(crate) async fn geraet_aufraeumen(state: &Arc<GatewayState>, geraet: &Arc<Device>) {
    {
        let mut g = geraet.schreiben();
        if matches!(g.zustand, RegistrationState::Cleaning | RegistrationState::Gone) {
            return;
        }
        g.zustand = RegistrationState::Cleaning;
        g.aktiver_kanal = None;
    }

    for call_id in geraet.kanaele() {
        let Some(kanal) = state.registry.kanal(call_id) else {
            continue;
        };
        let gebunden = kanal.geraet().is_some_and(|g| Arc::ptr_eq(&g, geraet));
        if gebunden {
            anruf::auflegen(state, call_id, HangupCause::DeviceGone, true).await;
        } else {
            anruf::angebot_zurueckziehen(state, &kanal, geraet, false).await;
        }
    }

    let leitungen: Vec<_> = geraet
        .lesen()
        .template
        .leitungen()
        .map(|(_, name, _)| name.clone())
        .collect();
    for name in &leitungen {
        if let Some(line) = state.registry.leitung(name) {
            line.geraet_loesen(geraet);
        }
    }
    state.registry.geraet_entfernen(geraet);

    geraet.zustand_setzen(RegistrationState::Gone);
    state.melden(GatewayEvent::GeraetAbgemeldet {
        device_id: geraet.id.clone(),
    });
    tracing::info!(device = %geraet.id, "Geraet abgemeldet");
}
