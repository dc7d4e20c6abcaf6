//! Session – eine TCP-Verbindung zu genau einem Telefon
//!
//! ## State Machine
//! ```text
//! Accepted -> Authenticating -> Bound -> Active -> Stopping -> Closed
//! ```
//!
//! Solange noch kein Geraet gebunden ist, fuehrt die Session den
//! Registrierungszustand selbst (Token, Auth, Ablehnung).
//!
//! Schreibzugriffe laufen ueber einen eigenen async Mutex, damit eine
//! Host-Anzeige und eine Antwort des Reader-Tasks nie ineinander
//! geschrieben werden. Das Stoppen ist kooperativ ueber ein
//! `CancellationToken`.

use futures_util::SinkExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use skinnygate_core::SessionId;
use skinnygate_protocol::version::{handler_set, HandlerSet};
use skinnygate_protocol::{Family, FrameCodec, Message};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use crate::device::{Device, RegistrationState};
use crate::error::{SignalingError, SignalingResult};
use crate::keepalive;

/// Maximale Wartezeit auf einen blockierten Socket beim Schreiben
const SCHREIB_TIMEOUT: Duration = Duration::from_secs(5);

pub type SessionWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, FrameCodec>;

/// Zustand einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Verbindung angenommen, noch keine Nachricht
    Accepted,
    /// Token- oder Register-Request in Bearbeitung
    Authenticating,
    /// Geraet gebunden, Registrierung laeuft
    Bound,
    /// Registrierung abgeschlossen
    Active,
    Stopping,
    Closed,
}

/// Grund fuer das Beenden einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopCause {
    /// Keepalive-Toleranz ueberschritten
    Timeout,
    /// Gegenstelle hat die Verbindung geschlossen
    Getrennt,
    /// Verbindungsfataler Frame-Fehler
    FrameFehler,
    /// Geraet hat sich abgemeldet
    Abgemeldet,
    /// Neue Session fuer dasselbe Geraet
    Uebernommen,
    /// Registrierung abgelehnt
    Abgewiesen,
    Shutdown,
    /// Vom Sweep erzwungen
    Sweep,
}

impl StopCause {
    pub fn als_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Getrennt => "getrennt",
            Self::FrameFehler => "frame_fehler",
            Self::Abgemeldet => "abgemeldet",
            Self::Uebernommen => "uebernommen",
            Self::Abgewiesen => "abgewiesen",
            Self::Shutdown => "shutdown",
            Self::Sweep => "sweep",
        }
    }
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct KeepaliveTakt {
    intervall: Duration,
    multiplikator: u32,
}

pub struct Session {
    pub id: SessionId,
    pub peer: SocketAddr,
    writer: tokio::sync::Mutex<SessionWriter>,
    protokoll: RwLock<&'static HandlerSet>,
    /// Ausgehandelte Version (kann zwischen zwei Tabelleneintraegen liegen)
    version: AtomicU8,
    geraet: RwLock<Option<Arc<Device>>>,
    zustand: Mutex<SessionState>,
    /// Registrierungszustand vor dem Binden eines Geraets
    anmeldung: Mutex<RegistrationState>,
    stop: CancellationToken,
    stop_grund: Mutex<Option<StopCause>>,
    letzte_aktivitaet: Mutex<Instant>,
    keepalive: Mutex<KeepaliveTakt>,
    reader: Mutex<Option<AbortHandle>>,
    aufgeraeumt: AtomicBool,
}

impl Session {
    /// Erstellt eine Session im Zustand `Accepted` mit dem Primaer-Protokoll
    /// in seiner niedrigsten Version
    pub fn neu(
        peer: SocketAddr,
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        intervall: Duration,
        multiplikator: u32,
    ) -> Arc<Self> {
        let family = Family::Primary;
        Arc::new(Self {
            id: SessionId::new(),
            peer,
            writer: tokio::sync::Mutex::new(FramedWrite::new(writer, FrameCodec::new())),
            protokoll: RwLock::new(handler_set(family, family.min_version())),
            version: AtomicU8::new(family.min_version()),
            geraet: RwLock::new(None),
            zustand: Mutex::new(SessionState::Accepted),
            anmeldung: Mutex::new(RegistrationState::Unknown),
            stop: CancellationToken::new(),
            stop_grund: Mutex::new(None),
            letzte_aktivitaet: Mutex::new(Instant::now()),
            keepalive: Mutex::new(KeepaliveTakt {
                intervall,
                multiplikator,
            }),
            reader: Mutex::new(None),
            aufgeraeumt: AtomicBool::new(false),
        })
    }

    // --- Protokoll ---

    pub fn protokoll(&self) -> &'static HandlerSet {
        *self.protokoll.read()
    }

    pub fn family(&self) -> Family {
        self.protokoll().family
    }

    /// Die ausgehandelte Version (nicht der Tabelleneintrag)
    pub fn version(&self) -> u8 {
        self.version.load(Ordering::Acquire)
    }

    pub fn protokoll_setzen(&self, family: Family, version: u8) {
        *self.protokoll.write() = handler_set(family, version);
        self.version.store(version, Ordering::Release);
    }

    // --- Geraet ---

    pub fn geraet(&self) -> Option<Arc<Device>> {
        self.geraet.read().clone()
    }

    pub fn geraet_binden(&self, geraet: Arc<Device>) {
        *self.geraet.write() = Some(geraet);
    }

    /// Loest die Bindung und gibt das Geraet zurueck
    pub fn geraet_loesen(&self) -> Option<Arc<Device>> {
        self.geraet.write().take()
    }

    // --- Zustand ---

    pub fn zustand(&self) -> SessionState {
        *self.zustand.lock()
    }

    pub fn zustand_setzen(&self, neu: SessionState) {
        let mut zustand = self.zustand.lock();
        // aus Stopping/Closed gibt es keinen Weg zurueck
        if matches!(*zustand, SessionState::Stopping | SessionState::Closed)
            && neu != SessionState::Closed
        {
            return;
        }
        *zustand = neu;
    }

    /// Registrierungszustand: der des gebundenen Geraets, sonst der eigene
    pub fn anmeldung(&self) -> RegistrationState {
        match self.geraet() {
            Some(geraet) => geraet.zustand(),
            None => *self.anmeldung.lock(),
        }
    }

    pub fn anmeldung_setzen(&self, neu: RegistrationState) {
        let mut anmeldung = self.anmeldung.lock();
        tracing::trace!(session = %self.id, von = ?*anmeldung, nach = ?neu, "Registrierungszustand");
        *anmeldung = neu;
    }

    // --- Aktivitaet und Keepalive ---

    pub fn aktivitaet(&self) {
        *self.letzte_aktivitaet.lock() = Instant::now();
    }

    pub fn seit_aktivitaet(&self) -> Duration {
        self.letzte_aktivitaet.lock().elapsed()
    }

    pub fn keepalive_setzen(&self, intervall: Duration, multiplikator: u32) {
        *self.keepalive.lock() = KeepaliveTakt {
            intervall,
            multiplikator,
        };
    }

    pub fn keepalive_intervall(&self) -> Duration {
        self.keepalive.lock().intervall
    }

    pub fn keepalive_multiplikator(&self) -> u32 {
        self.keepalive.lock().multiplikator
    }

    /// Erlaubte Stille bis zum Timeout
    pub fn toleranz(&self) -> Duration {
        let takt = *self.keepalive.lock();
        keepalive::toleranz(takt.intervall, takt.multiplikator)
    }

    // --- Stoppen ---

    /// Stoppt die Session. Nur der erste Grund wird gespeichert
    pub fn stoppen(&self, grund: StopCause) -> bool {
        let erster = {
            let mut g = self.stop_grund.lock();
            if g.is_none() {
                *g = Some(grund);
                true
            } else {
                false
            }
        };
        if erster {
            tracing::debug!(session = %self.id, peer = %self.peer, %grund, "Session wird gestoppt");
            self.zustand_setzen(SessionState::Stopping);
            self.stop.cancel();
        }
        erster
    }

    pub fn stop_grund(&self) -> Option<StopCause> {
        *self.stop_grund.lock()
    }

    pub fn ist_gestoppt(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub(crate) fn reader_setzen(&self, handle: AbortHandle) {
        *self.reader.lock() = Some(handle);
    }

    /// Bricht den Reader-Task hart ab (nur fuer den Sweep)
    pub(crate) fn reader_abbrechen(&self) {
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
    }

    /// `true` beim ersten Aufruf, danach `false`
    pub(crate) fn aufraeumen_beginnen(&self) -> bool {
        !self.aufgeraeumt.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn wird_aufgeraeumt(&self) -> bool {
        self.aufgeraeumt.load(Ordering::Acquire)
    }

    // --- Schreiben ---

    /// Kodiert und sendet eine Nachricht in der Version der Session
    pub async fn senden(&self, msg: Message) -> SignalingResult<()> {
        self.senden_alle(vec![msg]).await
    }

    /// Sendet mehrere Nachrichten ohne fremde Nachrichten dazwischen
    pub async fn senden_alle(&self, nachrichten: Vec<Message>) -> SignalingResult<()> {
        if nachrichten.is_empty() {
            return Ok(());
        }
        let protokoll = self.protokoll();
        let mut frames = Vec::with_capacity(nachrichten.len());
        for msg in &nachrichten {
            match protokoll.encode(msg) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    tracing::debug!(
                        session = %self.id,
                        nachricht = msg.name(),
                        fehler = %e,
                        "Nachricht nicht kodierbar, uebersprungen"
                    );
                }
            }
        }

        let mut writer = self.writer.lock().await;
        let schreiben = async {
            for frame in frames {
                tracing::trace!(session = %self.id, id = frame.id, "Frame senden");
                writer.feed(frame).await?;
            }
            writer.flush().await
        };
        match tokio::time::timeout(SCHREIB_TIMEOUT, schreiben).await {
            Ok(ergebnis) => ergebnis.map_err(SignalingError::from),
            Err(_) => Err(SignalingError::Timeout),
        }
    }

    /// Schliesst die Schreibseite des Sockets
    pub(crate) async fn writer_schliessen(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.get_mut().shutdown().await {
            tracing::trace!(session = %self.id, fehler = %e, "Shutdown der Schreibseite fehlgeschlagen");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("zustand", &self.zustand())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use skinnygate_protocol::messages::LineRef;
    use tokio_util::codec::FramedRead;

    fn session_mit_gegenstelle() -> (Arc<Session>, tokio::io::DuplexStream) {
        let (a, b) = tokio::io::duplex(4096);
        let session = Session::neu(
            "127.0.0.1:2000".parse().unwrap(),
            Box::new(a),
            Duration::from_secs(30),
            2,
        );
        (session, b)
    }

    #[tokio::test]
    async fn senden_kodiert_in_sessionversion() {
        let (session, gegenstelle) = session_mit_gegenstelle();
        session
            .senden_alle(vec![Message::KeepAliveAck, Message::StopTone(LineRef::neu(1, 5))])
            .await
            .unwrap();

        let mut frames = FramedRead::new(gegenstelle, FrameCodec::new());
        let erster = frames.next().await.unwrap().unwrap();
        assert_eq!(erster.id, skinnygate_protocol::ids::KEEP_ALIVE_ACK);
        let zweiter = frames.next().await.unwrap().unwrap();
        assert_eq!(zweiter.id, skinnygate_protocol::ids::STOP_TONE);
        assert_eq!(&zweiter.payload[..], &[1, 0, 0, 0, 5, 0, 0, 0]);
    }

    #[tokio::test]
    async fn stoppen_nur_einmal() {
        let (session, _g) = session_mit_gegenstelle();
        assert!(session.stoppen(StopCause::Timeout));
        assert!(!session.stoppen(StopCause::Getrennt));
        assert_eq!(session.stop_grund(), Some(StopCause::Timeout));
        assert!(session.ist_gestoppt());
        assert_eq!(session.zustand(), SessionState::Stopping);

        // kein Rueckweg nach Stopping
        session.zustand_setzen(SessionState::Active);
        assert_eq!(session.zustand(), SessionState::Stopping);
        session.zustand_setzen(SessionState::Closed);
        assert_eq!(session.zustand(), SessionState::Closed);
    }

    #[tokio::test]
    async fn protokollversion_wird_exakt_gespeichert() {
        let (session, _g) = session_mit_gegenstelle();
        session.protokoll_setzen(Family::Primary, 12);
        assert_eq!(session.version(), 12);
        assert_eq!(session.protokoll().version, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn toleranz_folgt_keepalive_takt() {
        let (session, _g) = session_mit_gegenstelle();
        assert_eq!(session.toleranz(), Duration::from_secs(60));
        session.keepalive_setzen(Duration::from_secs(10), 3);
        assert_eq!(session.toleranz(), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(session.seit_aktivitaet() >= Duration::from_secs(7));
        session.aktivitaet();
        assert!(session.seit_aktivitaet() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn aufraeumen_nur_einmal() {
        let (session, _g) = session_mit_gegenstelle();
        assert!(session.aufraeumen_beginnen());
        assert!(!session.aufraeumen_beginnen());
        assert!(session.wird_aufgeraeumt());
    }
}
