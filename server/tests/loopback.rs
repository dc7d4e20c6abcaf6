//! Ende-zu-Ende: zwei Telefone telefonieren ueber den Loopback-Router

use futures_util::StreamExt;
use skinnygate_core::{DeviceId, LineName};
use skinnygate_protocol::enums::CallState;
use skinnygate_protocol::messages::{KeypadButton, LineRef, Register};
use skinnygate_protocol::{handler_set, wire, Family, FrameCodec, HandlerSet, Message};
use skinnygate_server::config::ServerConfig;
use skinnygate_server::gateway_aufbauen;
use skinnygate_server::router::LoopbackRouter;
use skinnygate_signaling::{GatewayState, SignalingServer};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

const WARTEZEIT: Duration = Duration::from_secs(3);

const KONFIGURATION: &str = r#"
    [waehlen]
    ziffer_timeout_ms = 200
    fehler_auflegen_ms = 100

    [observability]
    aktiviert = false

    [[leitung]]
    name = "100"

    [[leitung]]
    name = "200"

    [[geraet]]
    id = "SEP000000000001"
    [[geraet.buttons]]
    typ = "line"
    name = "100"

    [[geraet]]
    id = "SEP000000000002"
    [[geraet.buttons]]
    typ = "line"
    name = "200"
"#;

struct Aufbau {
    state: Arc<GatewayState>,
    router: Arc<LoopbackRouter>,
    addr: SocketAddr,
    _shutdown: watch::Sender<bool>,
}

async fn aufbauen() -> Aufbau {
    let config = ServerConfig::aus_toml(KONFIGURATION).unwrap();
    let (state, router) = gateway_aufbauen(&config).unwrap();
    let server = SignalingServer::binden(Arc::clone(&state), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.lokale_adresse().unwrap();
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(server.starten(rx));
    Aufbau {
        state,
        router,
        addr,
        _shutdown: shutdown,
    }
}

async fn warten_bis(mut bedingung: impl FnMut() -> bool) -> bool {
    let ende = tokio::time::Instant::now() + WARTEZEIT;
    while tokio::time::Instant::now() < ende {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bedingung()
}

struct Telefon {
    lesen: FramedRead<OwnedReadHalf, FrameCodec>,
    schreiben: OwnedWriteHalf,
    protokoll: &'static HandlerSet,
}

impl Telefon {
    /// Verbindet und registriert mit Version 11
    async fn anmelden(aufbau: &Aufbau, name: &str, leitung: &str) -> Self {
        let (lesen, schreiben) = TcpStream::connect(aufbau.addr).await.unwrap().into_split();
        let mut telefon = Self {
            lesen: FramedRead::new(lesen, FrameCodec::new()),
            schreiben,
            protokoll: handler_set(Family::Primary, 11),
        };
        telefon
            .senden(Message::Register(Register {
                device_name: name.to_string(),
                user_id: 0,
                instance: 1,
                ip: Ipv4Addr::LOCALHOST,
                device_type: 115,
                max_streams: 5,
                active_streams: 0,
                protocol_version: 11,
                phone_features: 0,
                max_conferences: 0,
                active_conferences: 0,
                mac_address: String::new(),
                max_lines: 4,
                firmware: "SCCP41.9-4-2SR3-1S".to_string(),
            }))
            .await;
        telefon
            .erwarten(|m| matches!(m, Message::RegisterAck(_)).then_some(()))
            .await;

        let state = Arc::clone(&aufbau.state);
        let id = DeviceId::new(name);
        let leitung = LineName::new(leitung);
        assert!(
            warten_bis(|| state
                .registry
                .leitung(&leitung)
                .is_some_and(|l| l.geraete().iter().any(|ld| ld.device_id == id)))
            .await
        );
        telefon
    }

    async fn senden(&mut self, msg: Message) {
        let frame = self.protokoll.encode(&msg).unwrap();
        wire::write_frame(&mut self.schreiben, &frame).await.unwrap();
    }

    async fn waehlen(&mut self, ziffern: &str) {
        for z in ziffern.chars() {
            let taste = KeypadButton::aus_ziffer(z, 1, 0).unwrap();
            self.senden(Message::KeypadButton(taste)).await;
        }
    }

    async fn erwarten<T>(&mut self, mut passt: impl FnMut(Message) -> Option<T>) -> T {
        loop {
            let frame = tokio::time::timeout(WARTEZEIT, self.lesen.next())
                .await
                .expect("keine Nachricht vom Gateway")
                .expect("Verbindung geschlossen")
                .unwrap();
            if let Ok(msg) = self.protokoll.decode(&frame) {
                if let Some(wert) = passt(msg) {
                    return wert;
                }
            }
        }
    }

    /// Wartet auf einen Anrufzustand und liefert die Call-Referenz
    async fn call_state(&mut self, gesucht: CallState) -> u32 {
        self.erwarten(|m| match m {
            Message::CallState(cs) if cs.state == gesucht => Some(cs.call_reference),
            _ => None,
        })
        .await
    }
}

#[tokio::test]
async fn anruf_zwischen_zwei_leitungen() {
    let aufbau = aufbauen().await;
    let mut anrufer = Telefon::anmelden(&aufbau, "SEP000000000001", "100").await;
    let mut angerufener = Telefon::anmelden(&aufbau, "SEP000000000002", "200").await;

    anrufer.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    anrufer.waehlen("200#").await;

    let b_ref = angerufener.call_state(CallState::RingIn).await;
    let a_ref = anrufer.call_state(CallState::RingOut).await;
    assert_eq!(aufbau.router.offene_anrufe(), 1);

    angerufener.senden(Message::OffHook(LineRef::neu(1, b_ref))).await;
    angerufener.call_state(CallState::Connected).await;
    assert_eq!(anrufer.call_state(CallState::Connected).await, a_ref);

    anrufer.senden(Message::OnHook(LineRef::neu(1, a_ref))).await;
    angerufener.call_state(CallState::OnHook).await;

    let router = Arc::clone(&aufbau.router);
    assert!(warten_bis(|| router.offene_anrufe() == 0).await);
    let state = Arc::clone(&aufbau.state);
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
}

#[tokio::test]
async fn auflegen_vor_annahme_beendet_das_klingeln() {
    let aufbau = aufbauen().await;
    let mut anrufer = Telefon::anmelden(&aufbau, "SEP000000000001", "100").await;
    let mut angerufener = Telefon::anmelden(&aufbau, "SEP000000000002", "200").await;

    anrufer.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    anrufer.waehlen("200#").await;
    angerufener.call_state(CallState::RingIn).await;
    let a_ref = anrufer.call_state(CallState::RingOut).await;

    anrufer.senden(Message::OnHook(LineRef::neu(1, a_ref))).await;
    angerufener.call_state(CallState::OnHook).await;

    let state = Arc::clone(&aufbau.state);
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
}

#[tokio::test]
async fn unbekannte_nummer_wird_abgebaut() {
    let aufbau = aufbauen().await;
    let mut anrufer = Telefon::anmelden(&aufbau, "SEP000000000001", "100").await;

    anrufer.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    anrufer.waehlen("555#").await;

    // Fehlerton, danach verzoegertes Auflegen
    anrufer.call_state(CallState::InvalidNumber).await;
    anrufer.call_state(CallState::OnHook).await;
    let state = Arc::clone(&aufbau.state);
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
    assert_eq!(aufbau.router.offene_anrufe(), 0);
}

#[tokio::test]
async fn abmeldung_im_gespraech_beendet_die_gegenseite() {
    let aufbau = aufbauen().await;
    let mut anrufer = Telefon::anmelden(&aufbau, "SEP000000000001", "100").await;
    let mut angerufener = Telefon::anmelden(&aufbau, "SEP000000000002", "200").await;

    anrufer.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    anrufer.waehlen("200#").await;
    let b_ref = angerufener.call_state(CallState::RingIn).await;
    angerufener.senden(Message::OffHook(LineRef::neu(1, b_ref))).await;
    angerufener.call_state(CallState::Connected).await;
    anrufer.call_state(CallState::Connected).await;

    anrufer.senden(Message::Unregister).await;
    assert_eq!(angerufener.call_state(CallState::OnHook).await, b_ref);

    let router = Arc::clone(&aufbau.router);
    assert!(warten_bis(|| router.offene_anrufe() == 0).await);
    let state = Arc::clone(&aufbau.state);
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
    assert!(state.registry.geraet(&DeviceId::new("SEP000000000001")).is_none());
}
