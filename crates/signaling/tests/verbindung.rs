//! Integration-Tests fuer Verbindungsannahme, Framing und Keepalive

mod common;

use common::*;
use skinnygate_core::GatewayEvent;
use skinnygate_protocol::Message;
use skinnygate_signaling::{Acl, SignalingConfig};
use std::time::Duration;

#[tokio::test]
async fn keepalive_wird_ohne_registrierung_beantwortet() {
    let gw = gateway_starten(SignalingConfig::default(), vec![], vec![]).await;
    let mut telefon = Telefon::verbinden(gw.addr).await;

    telefon.senden(Message::KeepAlive).await;
    telefon
        .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;
}

#[tokio::test]
async fn ungueltige_laenge_beendet_die_session() {
    let gw = gateway_starten(SignalingConfig::default(), vec![], vec![]).await;
    let mut events = gw.state.abonnieren();
    let mut telefon = Telefon::verbinden(gw.addr).await;

    // Laenge 0xFFFF liegt ueber dem Maximum
    telefon
        .roh_senden(&[0xFF, 0xFF, 0x00, 0x00, 0, 0, 0, 0, 0, 0, 0, 0])
        .await;
    assert!(telefon.geschlossen().await);

    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.session_anzahl() == 0).await);

    let mut frame_fehler = false;
    while let Ok(event) = events.try_recv() {
        if let GatewayEvent::DekodierFehler { art } = event {
            frame_fehler |= art == "frame";
        }
    }
    assert!(frame_fehler, "kein DekodierFehler fuer den Frame gemeldet");
}

#[tokio::test]
async fn unbekannte_nachricht_laesst_session_offen() {
    let gw = gateway_starten(SignalingConfig::default(), vec![], vec![]).await;
    let mut telefon = Telefon::verbinden(gw.addr).await;

    // ausserhalb beider Familienbereiche
    telefon.leer_senden(0x4242).await;
    // im Bereich, aber ohne Katalogeintrag
    telefon.leer_senden(0x01F0).await;

    telefon.senden(Message::KeepAlive).await;
    telefon
        .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;
    assert_eq!(gw.state.registry.session_anzahl(), 1);
}

#[tokio::test]
async fn stille_verbindung_laeuft_in_den_timeout() {
    let mut cfg = SignalingConfig::default();
    cfg.keepalive.intervall = Duration::from_millis(100);
    cfg.keepalive.multiplikator_unregistriert = 2;
    let gw = gateway_starten(cfg, vec![], vec![]).await;
    let mut telefon = Telefon::verbinden(gw.addr).await;

    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.session_anzahl() == 1).await);
    assert!(telefon.geschlossen().await, "Session nach Timeout nicht geschlossen");
    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.session_anzahl() == 0).await);
}

#[tokio::test]
async fn keepalive_haelt_die_session_am_leben() {
    let mut cfg = SignalingConfig::default();
    cfg.keepalive.intervall = Duration::from_millis(100);
    let gw = gateway_starten(cfg, vec![], vec![]).await;
    let mut telefon = Telefon::verbinden(gw.addr).await;

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(80)).await;
        telefon.senden(Message::KeepAlive).await;
        telefon
            .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
            .await;
    }
    assert_eq!(gw.state.registry.session_anzahl(), 1);
}

#[tokio::test]
async fn netz_acl_weist_verbindung_ab() {
    let mut cfg = SignalingConfig::default();
    cfg.acl = Acl::aus_listen(["10.0.0.0/8"], ["127.0.0.0/8"]).unwrap();
    let gw = gateway_starten(cfg, vec![], vec![]).await;
    let mut events = gw.state.abonnieren();

    let mut telefon = Telefon::verbinden(gw.addr).await;
    let text = telefon
        .erwarten(|m| match m {
            Message::RegisterReject(r) => Some(r.text),
            _ => None,
        })
        .await;
    assert_eq!(text, "Access denied");
    assert!(telefon.geschlossen().await);
    assert_eq!(gw.state.registry.session_anzahl(), 0);
    assert!(matches!(
        events.recv().await,
        Ok(GatewayEvent::VerbindungAbgewiesen { .. })
    ));
}

#[tokio::test]
async fn voller_server_weist_ab() {
    let mut cfg = SignalingConfig::default();
    cfg.max_sessions = 1;
    let gw = gateway_starten(cfg, vec![], vec![]).await;

    let _erstes = Telefon::verbinden(gw.addr).await;
    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.session_anzahl() == 1).await);

    let mut zweites = Telefon::verbinden(gw.addr).await;
    let text = zweites
        .erwarten(|m| match m {
            Message::RegisterReject(r) => Some(r.text),
            _ => None,
        })
        .await;
    assert_eq!(text, "Server full");
    assert_eq!(gw.state.registry.session_anzahl(), 1);
}

#[tokio::test]
async fn abweisungen_blockieren_die_annahme_nicht() {
    let mut cfg = SignalingConfig::default();
    cfg.max_sessions = 1;
    let gw = gateway_starten(cfg, vec![], vec![]).await;

    let erstes = Telefon::verbinden(gw.addr).await;
    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.session_anzahl() == 1).await);

    // abgewiesene Verbindungen, die niemand liest
    let mut abgewiesen = Vec::new();
    for _ in 0..16 {
        abgewiesen.push(Telefon::verbinden(gw.addr).await);
    }

    drop(erstes);
    assert!(warten_bis(|| state.registry.session_anzahl() == 0).await);
    let mut neu = Telefon::verbinden(gw.addr).await;
    assert!(warten_bis(|| state.registry.session_anzahl() == 1).await);
    neu.senden(Message::KeepAlive).await;
    neu.erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;

    for telefon in &mut abgewiesen {
        let text = telefon
            .erwarten(|m| match m {
                Message::RegisterReject(r) => Some(r.text),
                _ => None,
            })
            .await;
        assert_eq!(text, "Server full");
    }
}

#[tokio::test]
async fn snapshot_zeigt_registriertes_geraet() {
    let gw = gateway_starten(
        SignalingConfig::default(),
        vec![geraet("SEP000000000001", &["100"])],
        vec![leitung("100")],
    )
    .await;
    let _telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    let snapshot = gw.state.snapshot();
    assert_eq!(snapshot.geraete.len(), 1);
    assert_eq!(snapshot.geraete[0].id.as_str(), "SEP000000000001");
    assert_eq!(snapshot.sessions[0].version, 11);
    assert_eq!(snapshot.zaehler(), gw.state.zaehler());
    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json["leitungen"].is_array());
}

#[tokio::test]
async fn sweep_laesst_aktive_sessions_in_ruhe() {
    let gw = gateway_starten(SignalingConfig::default(), vec![], vec![]).await;
    let mut telefon = Telefon::verbinden(gw.addr).await;
    telefon.senden(Message::KeepAlive).await;
    telefon
        .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;

    assert_eq!(skinnygate_signaling::sweep::sweep_einmal(&gw.state).await, 0);
    assert_eq!(gw.state.registry.session_anzahl(), 1);
}
