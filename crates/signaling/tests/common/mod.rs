//! Gemeinsame Helfer fuer die Integration-Tests: Testgateway und Testtelefon

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use parking_lot::Mutex;
use skinnygate_core::host::{
    ButtonConfig, CallControl, CallFeature, CallRequest, DeviceConfig, HangupCause, LineConfig,
    RejectCause,
};
use skinnygate_core::{CallId, DeviceId, LineName, OwnerHandle};
use skinnygate_protocol::enums::CallState;
use skinnygate_protocol::messages::{KeypadButton, LineRef, Register};
use skinnygate_protocol::{handler_set, wire, Family, FrameCodec, HandlerSet, Message, RawFrame};
use skinnygate_signaling::{
    GatewayState, Kollaborateure, MemoryFeatureStore, SignalingConfig, SignalingServer,
    StaticDirectory, StaticMedia,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

/// Wartezeit fuer eine einzelne Erwartung
pub const WARTEZEIT: Duration = Duration::from_secs(3);

/// Typ eines 7941 (kein Altgeraet)
pub const TYP_7941: u32 = 115;

// ---------------------------------------------------------------------------
// Call-Control-Attrappe
// ---------------------------------------------------------------------------

/// Zeichnet alle Aufrufe auf; lehnt optional jeden Anruf ab
#[derive(Default)]
pub struct AufzeichnendeCallControl {
    pub anfragen: Mutex<Vec<CallRequest>>,
    pub angenommen: Mutex<Vec<OwnerHandle>>,
    pub aufgelegt: Mutex<Vec<(OwnerHandle, HangupCause)>>,
    pub dtmf: Mutex<Vec<char>>,
    pub ablehnen: Mutex<Option<RejectCause>>,
    naechster: AtomicU64,
}

impl AufzeichnendeCallControl {
    pub fn nummern(&self) -> Vec<String> {
        self.anfragen.lock().iter().map(|a| a.number.clone()).collect()
    }
}

#[async_trait]
impl CallControl for AufzeichnendeCallControl {
    async fn anruf_platzieren(&self, anfrage: CallRequest) -> Result<OwnerHandle, RejectCause> {
        self.anfragen.lock().push(anfrage);
        if let Some(grund) = *self.ablehnen.lock() {
            return Err(grund);
        }
        Ok(OwnerHandle(self.naechster.fetch_add(1, Ordering::Relaxed) + 1000))
    }

    async fn angenommen(&self, owner: OwnerHandle) {
        self.angenommen.lock().push(owner);
    }

    async fn aufgelegt(&self, owner: OwnerHandle, grund: HangupCause) {
        self.aufgelegt.lock().push((owner, grund));
    }

    async fn dtmf(&self, _owner: OwnerHandle, ziffer: char) {
        self.dtmf.lock().push(ziffer);
    }

    async fn feature(&self, _owner: OwnerHandle, _feature: CallFeature) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Testgateway
// ---------------------------------------------------------------------------

pub struct Testgateway {
    pub state: Arc<GatewayState>,
    pub addr: SocketAddr,
    pub call_control: Arc<AufzeichnendeCallControl>,
    pub media: Arc<StaticMedia>,
    shutdown: watch::Sender<bool>,
}

impl Drop for Testgateway {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Geraet mit einer Leitungstaste pro Name
pub fn geraet(name: &str, leitungen: &[&str]) -> DeviceConfig {
    let mut cfg = DeviceConfig::neu(DeviceId::new(name));
    cfg.buttons = leitungen
        .iter()
        .map(|l| ButtonConfig::Line {
            name: LineName::new(*l),
            label: None,
            subscription: None,
        })
        .collect();
    cfg
}

pub fn leitung(name: &str) -> LineConfig {
    LineConfig::neu(LineName::new(name))
}

/// Konfiguration mit kurzen Timern
pub fn schnelle_config() -> SignalingConfig {
    let mut cfg = SignalingConfig::default();
    cfg.waehlen.ziffer_timeout = Duration::from_millis(200);
    cfg.waehlen.erste_ziffer_timeout = Duration::from_secs(10);
    cfg.waehlen.fehler_auflegen = Duration::from_millis(100);
    cfg
}

/// Startet einen Gateway auf einem freien Loopback-Port
pub async fn gateway_starten(
    config: SignalingConfig,
    geraete: Vec<DeviceConfig>,
    leitungen: Vec<LineConfig>,
) -> Testgateway {
    let call_control = Arc::new(AufzeichnendeCallControl::default());
    let media = Arc::new(StaticMedia::neu(Ipv4Addr::LOCALHOST, 20000));
    let state = GatewayState::neu(
        config,
        Kollaborateure {
            verzeichnis: Arc::new(StaticDirectory::neu(geraete, leitungen)),
            features: Arc::new(MemoryFeatureStore::neu()),
            call_control: call_control.clone(),
            media: media.clone(),
        },
    );
    let server = SignalingServer::binden(Arc::clone(&state), "127.0.0.1:0".parse().unwrap())
        .await
        .expect("Listener konnte nicht gebunden werden");
    let addr = server.lokale_adresse().unwrap();
    let (shutdown, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.starten(shutdown_rx));
    Testgateway {
        state,
        addr,
        call_control,
        media,
        shutdown,
    }
}

/// Pollt eine Bedingung bis sie gilt oder `WARTEZEIT` verstrichen ist
pub async fn warten_bis(mut bedingung: impl FnMut() -> bool) -> bool {
    let ende = tokio::time::Instant::now() + WARTEZEIT;
    while tokio::time::Instant::now() < ende {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bedingung()
}

// ---------------------------------------------------------------------------
// Testtelefon
// ---------------------------------------------------------------------------

/// Minimaler Skinny-Client ueber TCP
pub struct Telefon {
    lesen: FramedRead<OwnedReadHalf, FrameCodec>,
    schreiben: OwnedWriteHalf,
    protokoll: &'static HandlerSet,
}

pub fn register(name: &str, device_type: u32, version: u8) -> Message {
    Message::Register(Register {
        device_name: name.to_string(),
        user_id: 0,
        instance: 1,
        ip: Ipv4Addr::LOCALHOST,
        device_type,
        max_streams: 5,
        active_streams: 0,
        protocol_version: version,
        phone_features: 0,
        max_conferences: 0,
        active_conferences: 0,
        mac_address: String::new(),
        max_lines: 4,
        firmware: "SCCP41.9-4-2SR3-1S".to_string(),
    })
}

impl Telefon {
    pub async fn verbinden(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("Verbindung zum Gateway fehlgeschlagen");
        let (lesen, schreiben) = stream.into_split();
        Self {
            lesen: FramedRead::new(lesen, FrameCodec::new()),
            schreiben,
            protokoll: handler_set(Family::Primary, Family::Primary.min_version()),
        }
    }

    pub fn version_setzen(&mut self, version: u8) {
        self.protokoll = handler_set(Family::Primary, version);
    }

    pub async fn senden(&mut self, msg: Message) {
        let frame = self.protokoll.encode(&msg).expect("Nachricht nicht kodierbar");
        self.frame_senden(&frame).await;
    }

    pub async fn frame_senden(&mut self, frame: &RawFrame) {
        wire::write_frame(&mut self.schreiben, frame)
            .await
            .expect("Frame nicht gesendet");
    }

    pub async fn roh_senden(&mut self, bytes: &[u8]) {
        self.schreiben.write_all(bytes).await.unwrap();
    }

    pub async fn leer_senden(&mut self, id: u32) {
        self.frame_senden(&RawFrame::neu(id, Bytes::new())).await;
    }

    /// Naechste Nachricht; `None` wenn der Gateway die Verbindung schliesst
    pub async fn empfangen(&mut self) -> Option<Message> {
        let frame = tokio::time::timeout(WARTEZEIT, self.lesen.next())
            .await
            .expect("keine Nachricht vom Gateway")?;
        let frame = frame.ok()?;
        Some(self.protokoll.decode(&frame).unwrap_or(Message::Unhandled {
            id: frame.id,
            length: frame.laenge(),
        }))
    }

    /// Liest bis eine passende Nachricht kommt
    pub async fn erwarten<T>(&mut self, mut passt: impl FnMut(Message) -> Option<T>) -> T {
        loop {
            let msg = self
                .empfangen()
                .await
                .expect("Verbindung geschlossen bevor die Nachricht kam");
            if let Some(wert) = passt(msg) {
                return wert;
            }
        }
    }

    /// Wartet darauf, dass der Gateway die Verbindung schliesst
    pub async fn geschlossen(&mut self) -> bool {
        loop {
            match tokio::time::timeout(WARTEZEIT, self.lesen.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    /// Registriert und gibt die ausgehandelte Version zurueck
    pub async fn registrieren(&mut self, name: &str, version: u8) -> u8 {
        self.version_setzen(version);
        self.senden(register(name, TYP_7941, version)).await;
        let ausgehandelt = self
            .erwarten(|m| match m {
                Message::RegisterAck(ack) => Some(ack.protocol_version),
                Message::RegisterReject(r) => panic!("Registrierung abgelehnt: {}", r.text),
                _ => None,
            })
            .await;
        self.version_setzen(ausgehandelt);
        self.erwarten(|m| matches!(m, Message::CapabilitiesReq).then_some(()))
            .await;
        ausgehandelt
    }
}

/// Registriert ein Telefon und wartet bis seine Leitungen angehaengt sind
pub async fn registriertes_telefon(gw: &Testgateway, name: &str, leitungen: &[&str]) -> Telefon {
    let mut telefon = Telefon::verbinden(gw.addr).await;
    telefon.registrieren(name, 11).await;
    let id = DeviceId::new(name);
    let state = Arc::clone(&gw.state);
    let namen: Vec<LineName> = leitungen.iter().map(|l| LineName::new(*l)).collect();
    let angehaengt = warten_bis(|| {
        namen.iter().all(|n| {
            state
                .registry
                .leitung(n)
                .is_some_and(|l| l.geraete().iter().any(|ld| ld.device_id == id))
        })
    })
    .await;
    assert!(angehaengt, "Leitungen von {name} nicht angehaengt");
    telefon
}

/// Waehlt `nummer`, laesst die Gegenstelle annehmen und wartet auf Connected
pub async fn anruf_verbinden(gw: &Testgateway, telefon: &mut Telefon, nummer: &str) -> CallId {
    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    for z in nummer.chars().chain(std::iter::once('#')) {
        let taste = KeypadButton::aus_ziffer(z, 1, 0).expect("keine Tastenziffer");
        telefon.senden(Message::KeypadButton(taste)).await;
    }
    let call_id = telefon
        .erwarten(|m| match m {
            Message::CallState(cs) if cs.state == CallState::Proceed => Some(CallId(cs.call_reference)),
            _ => None,
        })
        .await;
    assert!(gw.state.remote_angenommen(call_id).await);
    telefon
        .erwarten(|m| match m {
            Message::CallState(cs) if cs.state == CallState::Connected => Some(()),
            _ => None,
        })
        .await;
    call_id
}
