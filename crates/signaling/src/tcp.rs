//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! zugelassene Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection`. Die Accept-Loop wartet nie auf diese Tasks.
//!
//! Abgewiesene Verbindungen (ACL, Server voll) bekommen ein RegisterReject
//! und werden sofort geschlossen, ohne dass eine Session entsteht. Das
//! Abweisen laeuft in einem eigenen Task mit Schreib-Timeout.

use skinnygate_core::GatewayEvent;
use skinnygate_protocol::messages::RegisterReject;
use skinnygate_protocol::{handler_set, wire, Family, Message};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::connection::ClientConnection;
use crate::server_state::GatewayState;
use crate::session::Session;
use crate::sweep;

/// Obergrenze fuer das Schreiben eines RegisterReject
const ABWEIS_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP-Signaling-Server
pub struct SignalingServer {
    state: Arc<GatewayState>,
    listener: TcpListener,
}

impl SignalingServer {
    /// Bindet den Listener (Port 0 waehlt einen freien Port)
    pub async fn binden(state: Arc<GatewayState>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { state, listener })
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    ///
    /// Startet zusaetzlich den Sweep fuer haengende Sessions. Beim Shutdown
    /// werden alle Sessions gestoppt.
    pub async fn starten(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = self.listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "Skinny-Signaling gestartet");

        let sweep = tokio::spawn(sweep::sweep_schleife(
            Arc::clone(&self.state),
            shutdown_rx.clone(),
        ));

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => self.annehmen(stream, peer_addr),
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        self.state.alle_sessions_stoppen();
        sweep.abort();
        tracing::info!("Skinny-Signaling gestoppt");
        Ok(())
    }

    fn annehmen(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let cfg = &self.state.config;

        if !cfg.acl.erlaubt(peer_addr.ip()) {
            tracing::warn!(peer = %peer_addr, "Verbindung durch ACL abgewiesen");
            self.state
                .melden(GatewayEvent::VerbindungAbgewiesen { peer: peer_addr });
            tokio::spawn(abweisen(stream, "Access denied"));
            return;
        }

        let aktiv = self.state.registry.session_anzahl();
        if aktiv >= cfg.max_sessions {
            tracing::warn!(peer = %peer_addr, max = cfg.max_sessions, "Server voll – Verbindung abgelehnt");
            self.state
                .melden(GatewayEvent::VerbindungAbgewiesen { peer: peer_addr });
            tokio::spawn(abweisen(stream, "Server full"));
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
        }
        let (lesen, schreiben) = stream.into_split();
        let session = Session::neu(
            peer_addr,
            Box::new(schreiben),
            cfg.keepalive.intervall,
            cfg.keepalive.multiplikator_unregistriert,
        );
        self.state.registry.session_einfuegen(Arc::clone(&session));
        self.state.melden(GatewayEvent::SessionGeoeffnet {
            session_id: session.id,
            peer: peer_addr,
        });
        tracing::debug!(session = %session.id, peer = %peer_addr, "Verbindung akzeptiert");

        let verbindung = ClientConnection::neu(Arc::clone(&self.state), Arc::clone(&session));
        let task = tokio::spawn(async move {
            verbindung.verarbeiten(lesen).await;
        });
        session.reader_setzen(task.abort_handle());
    }
}

/// Schreibt ein RegisterReject in der Basisversion und schliesst
async fn abweisen(mut stream: TcpStream, text: &'static str) {
    let protokoll = handler_set(Family::Primary, Family::Primary.min_version());
    let msg = Message::RegisterReject(RegisterReject {
        text: text.to_string(),
    });
    match protokoll.encode(&msg) {
        Ok(frame) => {
            match tokio::time::timeout(ABWEIS_TIMEOUT, wire::write_frame(&mut stream, &frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(fehler = %e, "RegisterReject nicht gesendet"),
                Err(_) => tracing::debug!("RegisterReject: Schreib-Timeout"),
            }
        }
        Err(e) => tracing::debug!(fehler = %e, "RegisterReject nicht kodierbar"),
    }
    let _ = stream.shutdown().await;
}
