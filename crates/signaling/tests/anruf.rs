//! Integration-Tests fuer Waehlen, eingehende Anrufe und Medienaushandlung

mod common;

use common::*;
use skinnygate_core::host::{CallDirection, CallerInfo, HangupCause, RejectCause};
use skinnygate_core::{DeviceId, LineName, OwnerHandle};
use skinnygate_protocol::enums::{CallState, MediaStatus, SoftKeyEvent, Tone};
use skinnygate_protocol::messages::{
    KeypadButton, LineRef, OpenReceiveChannelAck, SoftKeyEventMessage,
};
use skinnygate_protocol::{Family, Message};
use skinnygate_signaling::line::WeiterleitungsArt;
use skinnygate_signaling::{ChannelState, Device, MediaZustand, SignalingConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

async fn waehlen(telefon: &mut Telefon, ziffern: &str) {
    for z in ziffern.chars() {
        let taste = KeypadButton::aus_ziffer(z, 1, 0).expect("keine Tastenziffer");
        telefon.senden(Message::KeypadButton(taste)).await;
    }
}

async fn call_state(telefon: &mut Telefon, gesucht: CallState) {
    telefon
        .erwarten(|m| match m {
            Message::CallState(cs) if cs.state == gesucht => Some(()),
            _ => None,
        })
        .await
}

async fn zwei_leitungen() -> Testgateway {
    gateway_starten(
        schnelle_config(),
        vec![
            geraet("SEP000000000001", &["100"]),
            geraet("SEP000000000002", &["200"]),
        ],
        vec![leitung("100"), leitung("200")],
    )
    .await
}

#[tokio::test]
async fn abheben_spielt_waehlton() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    let (ton, instance) = telefon
        .erwarten(|m| match m {
            Message::StartTone(t) => Some((t.tone, t.line_instance)),
            _ => None,
        })
        .await;
    assert_eq!(ton, Tone::InsideDial);
    assert_eq!(instance, 1);

    let kanaele = gw.state.registry.kanaele();
    assert_eq!(kanaele.len(), 1);
    assert_eq!(kanaele[0].zustand(), ChannelState::OffHook);
}

#[tokio::test]
async fn terminator_waehlt_sofort() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(&mut telefon, "200#").await;
    call_state(&mut telefon, CallState::Proceed).await;

    assert_eq!(gw.call_control.nummern(), vec!["200".to_string()]);
    let anfrage = gw.call_control.anfragen.lock()[0].clone();
    assert_eq!(anfrage.device_id, Some(DeviceId::new("SEP000000000001")));
    assert_eq!(anfrage.line.as_str(), "100");
}

#[tokio::test]
async fn ziffern_timeout_waehlt_gesammelte_nummer() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(&mut telefon, "201").await;

    let cc = gw.call_control.clone();
    assert!(warten_bis(|| cc.nummern() == vec!["201".to_string()]).await);
}

#[tokio::test]
async fn leerer_ziffernpuffer_endet_in_congestion() {
    let mut cfg = schnelle_config();
    cfg.waehlen.erste_ziffer_timeout = Duration::from_millis(100);
    let gw = gateway_starten(cfg, vec![geraet("SEP000000000001", &["100"])], vec![leitung("100")]).await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    call_state(&mut telefon, CallState::Congestion).await;
    call_state(&mut telefon, CallState::OnHook).await;

    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
    assert!(gw.call_control.nummern().is_empty());
}

#[tokio::test]
async fn abgelehnter_anruf_zeigt_besetzt() {
    let gw = zwei_leitungen().await;
    *gw.call_control.ablehnen.lock() = Some(RejectCause::Busy);
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(&mut telefon, "200#").await;
    call_state(&mut telefon, CallState::Busy).await;
}

#[tokio::test]
async fn auflegen_beim_waehlen_gibt_kanal_frei() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(&mut telefon, "2").await;
    telefon.senden(Message::OnHook(LineRef::neu(1, 0))).await;
    call_state(&mut telefon, CallState::OnHook).await;

    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 0).await);
    // der Ziffern-Timer darf nach dem Auflegen nicht mehr waehlen
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(gw.call_control.nummern().is_empty());
}

/// Waehlt 200, laesst die Gegenstelle annehmen und liefert die Pass-Thru-ID
async fn verbundener_anruf(gw: &Testgateway, telefon: &mut Telefon) -> u32 {
    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(telefon, "200#").await;
    call_state(telefon, CallState::Proceed).await;

    let call_id = gw.state.registry.kanaele()[0].call_id;
    assert!(gw.state.remote_angenommen(call_id).await);
    telefon
        .erwarten(|m| match m {
            Message::OpenReceiveChannel(orc) => Some(orc.pass_thru_party_id),
            _ => None,
        })
        .await
}

#[tokio::test]
async fn orc_ack_unknown_setzt_empfang_inaktiv() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;
    let pass_thru = verbundener_anruf(&gw, &mut telefon).await;

    telefon
        .senden(Message::OpenReceiveChannelAck(OpenReceiveChannelAck {
            media_status: MediaStatus::Unknown.as_u32(),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 24580,
            pass_thru_party_id: pass_thru,
            call_reference: 0,
        }))
        .await;

    let kanal = gw.state.registry.kanaele().pop().unwrap();
    let k = kanal.clone();
    assert!(warten_bis(|| k.bearbeiten().medien.rx_audio == MediaZustand::Inaktiv).await);
    // Status Unknown beendet den Anruf nicht
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(kanal.zustand(), ChannelState::Connected);
}

#[tokio::test]
async fn orc_ack_ok_startet_senderichtung() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;
    let pass_thru = verbundener_anruf(&gw, &mut telefon).await;

    telefon
        .senden(Message::OpenReceiveChannelAck(OpenReceiveChannelAck {
            media_status: MediaStatus::Ok.as_u32(),
            ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 24580,
            pass_thru_party_id: pass_thru,
            call_reference: 0,
        }))
        .await;

    let remote = telefon
        .erwarten(|m| match m {
            Message::StartMediaTransmission(smt) => Some(smt.remote),
            _ => None,
        })
        .await;
    let kanal = gw.state.registry.kanaele().pop().unwrap();
    let erwartet = 20000 + (kanal.call_id.inner() % 4096) * 4;
    assert_eq!(remote, SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), erwartet as u16));
    assert_eq!(kanal.bearbeiten().medien.rx_audio, MediaZustand::Aktiv);
    assert!(gw.media.telefon(kanal.call_id, false).is_some());
}

#[tokio::test]
async fn orc_ack_eines_fremden_geraets_wird_verworfen() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;
    let mut fremdes = registriertes_telefon(&gw, "SEP000000000002", &["200"]).await;
    let pass_thru = verbundener_anruf(&gw, &mut telefon).await;

    fremdes
        .senden(Message::OpenReceiveChannelAck(OpenReceiveChannelAck {
            media_status: MediaStatus::Ok.as_u32(),
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 24580,
            pass_thru_party_id: pass_thru,
            call_reference: 0,
        }))
        .await;
    fremdes.senden(Message::KeepAlive).await;
    fremdes
        .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;

    let kanal = gw.state.registry.kanaele().pop().unwrap();
    assert_eq!(kanal.bearbeiten().medien.rx_audio, MediaZustand::Ausstehend);
    assert_eq!(kanal.zustand(), ChannelState::Connected);
    assert!(gw.media.telefon(kanal.call_id, false).is_none());
}

async fn geteilte_leitung() -> (Testgateway, Telefon, Telefon) {
    let gw = gateway_starten(
        schnelle_config(),
        vec![
            geraet("SEP000000000001", &["300"]),
            geraet("SEP000000000002", &["300"]),
        ],
        vec![leitung("300")],
    )
    .await;
    let eins = registriertes_telefon(&gw, "SEP000000000001", &["300"]).await;
    let zwei = registriertes_telefon(&gw, "SEP000000000002", &["300"]).await;
    (gw, eins, zwei)
}

#[tokio::test]
async fn geteilte_leitung_klingelt_auf_allen_geraeten() {
    let (gw, mut eins, mut zwei) = geteilte_leitung().await;

    let call_id = gw
        .state
        .eingehender_anruf("300", CallerInfo::default(), OwnerHandle(7))
        .await
        .expect("Anruf abgewiesen");
    call_state(&mut eins, CallState::RingIn).await;
    call_state(&mut zwei, CallState::RingIn).await;

    eins.senden(Message::OffHook(LineRef::neu(1, call_id.inner()))).await;
    call_state(&mut eins, CallState::Connected).await;
    call_state(&mut zwei, CallState::OnHook).await;

    let cc = gw.call_control.clone();
    assert!(warten_bis(|| cc.angenommen.lock().contains(&OwnerHandle(7))).await);
    let kanal = gw.state.registry.kanal(call_id).unwrap();
    assert_eq!(kanal.bearbeiten().device_id, Some(DeviceId::new("SEP000000000001")));
}

#[tokio::test]
async fn geteilte_leitung_mit_dnd_ueberall_ist_besetzt() {
    let (gw, _eins, _zwei) = geteilte_leitung().await;
    for geraet in gw.state.registry.geraete() {
        geraet.features().dnd = true;
    }

    let call_id = gw
        .state
        .eingehender_anruf("300", CallerInfo::default(), OwnerHandle(7))
        .await
        .expect("Anruf sollte angelegt werden");
    let kanal = gw.state.registry.kanal(call_id).unwrap();
    assert_eq!(kanal.zustand(), ChannelState::Busy);

    let cc = gw.call_control.clone();
    assert!(warten_bis(|| cc.aufgelegt.lock().contains(&(OwnerHandle(7), HangupCause::Busy))).await);
    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.kanal(call_id).is_none()).await);
}

#[tokio::test]
async fn anruf_fuer_unbekannte_leitung() {
    let gw = zwei_leitungen().await;
    let ergebnis = gw
        .state
        .eingehender_anruf("999", CallerInfo::default(), OwnerHandle(1))
        .await;
    assert_eq!(ergebnis, Err(RejectCause::InvalidNumber));
}

async fn softkey(telefon: &mut Telefon, event: SoftKeyEvent) {
    telefon
        .senden(Message::SoftKeyEvent(SoftKeyEventMessage {
            event: event.as_u32(),
            line_instance: 1,
            call_reference: 0,
        }))
        .await;
}

/// Liest Hinweistext und Ton eines abgewiesenen Bedienschritts
async fn hinweis(telefon: &mut Telefon) -> (String, Tone) {
    let text = telefon
        .erwarten(|m| match m {
            Message::DisplayNotify(n) => Some(n.text),
            _ => None,
        })
        .await;
    let ton = telefon
        .erwarten(|m| match m {
            Message::StartTone(t) => Some(t.tone),
            _ => None,
        })
        .await;
    (text, ton)
}

#[tokio::test]
async fn abheben_ohne_leitung_meldet_fehlerton() {
    let mut cfg = schnelle_config();
    cfg.anonym = true;
    let gw = gateway_starten(cfg, vec![], vec![]).await;
    let mut telefon = registriertes_telefon(&gw, "SEP0000000000AA", &[]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    let (text, ton) = hinweis(&mut telefon).await;
    assert_eq!(text, "Not available");
    assert_eq!(ton, Tone::Reorder);

    // auch Waehlen im Ruhezustand bekommt eine Rueckmeldung
    waehlen(&mut telefon, "1").await;
    let (_, ton) = hinweis(&mut telefon).await;
    assert_eq!(ton, Tone::Reorder);
    assert_eq!(gw.state.registry.kanal_anzahl(), 0);
}

#[tokio::test]
async fn halten_ohne_anruf_zeigt_hinweis() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    for event in [SoftKeyEvent::Hold, SoftKeyEvent::Transfer] {
        softkey(&mut telefon, event).await;
        let (text, ton) = hinweis(&mut telefon).await;
        assert_eq!(text, "No active call");
        assert_eq!(ton, Tone::Zip);
    }
    // die Session bleibt benutzbar
    telefon.senden(Message::KeepAlive).await;
    telefon
        .erwarten(|m| matches!(m, Message::KeepAliveAck).then_some(()))
        .await;
    assert_eq!(gw.state.registry.kanal_anzahl(), 0);
}

#[tokio::test]
async fn backspace_startet_ziffern_timer_neu() {
    let gw = zwei_leitungen().await;
    let mut telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    waehlen(&mut telefon, "2").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    softkey(&mut telefon, SoftKeyEvent::BackSpace).await;
    telefon
        .erwarten(|m| matches!(m, Message::BackSpaceReq(_)).then_some(()))
        .await;

    // leerer Puffer: es gilt wieder die lange Frist der ersten Ziffer
    tokio::time::sleep(Duration::from_millis(400)).await;
    let kanal = gw.state.registry.kanaele().pop().expect("Kanal fehlt");
    assert_eq!(kanal.zustand(), ChannelState::GetDigits);
    assert!(kanal.bearbeiten().ziffern.is_empty());
    assert!(gw.call_control.nummern().is_empty());
}

/// Wartet bis die Call-Control ein Auflegen mit `grund` sieht
async fn aufgelegt_mit(gw: &Testgateway, owner: OwnerHandle, grund: HangupCause) -> bool {
    let cc = gw.call_control.clone();
    warten_bis(|| cc.aufgelegt.lock().contains(&(owner, grund))).await
}

#[tokio::test]
async fn geteilte_leitung_ohne_session_ist_congestion() {
    let gw = gateway_starten(schnelle_config(), vec![], vec![leitung("300")]).await;
    let line = gw.state.registry.leitung_oder_anlegen(leitung("300"));
    let geist = Device::neu(geraet("SEP000000000009", &["300"]), TYP_7941, Family::Primary, 11);
    line.geraet_anhaengen(&geist, 1, None);

    let call_id = gw
        .state
        .eingehender_anruf("300", CallerInfo::default(), OwnerHandle(7))
        .await
        .expect("Anruf sollte angelegt werden");
    assert_eq!(gw.state.registry.kanal(call_id).unwrap().zustand(), ChannelState::Congestion);
    assert!(aufgelegt_mit(&gw, OwnerHandle(7), HangupCause::Congestion).await);
}

#[tokio::test]
async fn fremde_subscription_klingelt_nicht() {
    let (gw, _eins, _zwei) = geteilte_leitung().await;
    let anrufer = CallerInfo {
        subscription: Some("nacht".to_string()),
        ..CallerInfo::default()
    };

    let call_id = gw
        .state
        .eingehender_anruf("300", anrufer, OwnerHandle(7))
        .await
        .expect("Anruf sollte angelegt werden");
    assert_eq!(gw.state.registry.kanal(call_id).unwrap().zustand(), ChannelState::Congestion);
    assert!(aufgelegt_mit(&gw, OwnerHandle(7), HangupCause::Congestion).await);
}

#[tokio::test]
async fn dnd_gemischt_mit_anderer_absage_ist_congestion() {
    let (gw, _eins, _zwei) = geteilte_leitung().await;
    gw.state
        .registry
        .geraet(&DeviceId::new("SEP000000000001"))
        .unwrap()
        .features()
        .dnd = true;
    // SEP...1 sagt per DND ab, SEP...2 wegen der Subscription
    let anrufer = CallerInfo {
        subscription: Some("nacht".to_string()),
        ..CallerInfo::default()
    };

    let call_id = gw
        .state
        .eingehender_anruf("300", anrufer, OwnerHandle(7))
        .await
        .expect("Anruf sollte angelegt werden");
    assert_eq!(gw.state.registry.kanal(call_id).unwrap().zustand(), ChannelState::Congestion);
    assert!(aufgelegt_mit(&gw, OwnerHandle(7), HangupCause::Congestion).await);
}

async fn eine_leitung(cfg: SignalingConfig) -> (Testgateway, Telefon) {
    let gw = gateway_starten(cfg, vec![geraet("SEP000000000001", &["100"])], vec![leitung("100")]).await;
    let telefon = registriertes_telefon(&gw, "SEP000000000001", &["100"]).await;
    (gw, telefon)
}

fn weiterleitung_setzen(gw: &Testgateway, art: WeiterleitungsArt, ziel: &str) {
    let line = gw.state.registry.leitung(&LineName::new("100")).unwrap();
    assert!(line.weiterleitung_setzen(&DeviceId::new("SEP000000000001"), art, Some(ziel.to_string())));
}

/// Prueft die Weiterleitungsanfrage und den Kind-Kanal
fn pruefe_weiterleitung(gw: &Testgateway, eltern: skinnygate_core::CallId, ziel: &str) {
    let anfrage = gw
        .call_control
        .anfragen
        .lock()
        .iter()
        .find(|a| a.richtung == CallDirection::Forward)
        .cloned()
        .expect("keine Weiterleitung platziert");
    assert_eq!(anfrage.number, ziel);
    assert_eq!(anfrage.parent, Some(OwnerHandle(7)));
    assert_eq!(anfrage.device_id, None);

    let kind = gw.state.registry.kanal(anfrage.call_id).expect("Kind-Kanal fehlt");
    assert_eq!(kind.richtung, CallDirection::Forward);
    assert_eq!(kind.bearbeiten().parent, Some(eltern));
    let kanal = gw.state.registry.kanal(eltern).unwrap();
    assert!(kanal.bearbeiten().kinder.contains(&anfrage.call_id));
    assert_eq!(kanal.zustand(), ChannelState::RingOut);
}

#[tokio::test]
async fn weiterleitung_alle_klingelt_nicht() {
    let (gw, _telefon) = eine_leitung(schnelle_config()).await;
    weiterleitung_setzen(&gw, WeiterleitungsArt::Alle, "555");

    let call_id = gw
        .state
        .eingehender_anruf("100", CallerInfo::default(), OwnerHandle(7))
        .await
        .unwrap();
    pruefe_weiterleitung(&gw, call_id, "555");
}

#[tokio::test]
async fn weiterleitung_bei_besetzt() {
    let (gw, mut telefon) = eine_leitung(schnelle_config()).await;
    weiterleitung_setzen(&gw, WeiterleitungsArt::Besetzt, "556");

    // ohne laufenden Anruf klingelt es normal
    let frei = gw
        .state
        .eingehender_anruf("100", CallerInfo::default(), OwnerHandle(6))
        .await
        .unwrap();
    call_state(&mut telefon, CallState::RingIn).await;
    gw.state.auflegen(frei, HangupCause::Normal).await;
    call_state(&mut telefon, CallState::OnHook).await;

    telefon.senden(Message::OffHook(LineRef::neu(1, 0))).await;
    let state = gw.state.clone();
    assert!(warten_bis(|| state.registry.kanal_anzahl() == 1).await);

    let call_id = gw
        .state
        .eingehender_anruf("100", CallerInfo::default(), OwnerHandle(7))
        .await
        .unwrap();
    pruefe_weiterleitung(&gw, call_id, "556");
}

#[tokio::test]
async fn weiterleitung_bei_nichtmelden() {
    let mut cfg = schnelle_config();
    cfg.waehlen.cfwd_no_answer = Duration::from_millis(150);
    let (gw, mut telefon) = eine_leitung(cfg).await;
    weiterleitung_setzen(&gw, WeiterleitungsArt::KeineAntwort, "557");

    let call_id = gw
        .state
        .eingehender_anruf("100", CallerInfo::default(), OwnerHandle(7))
        .await
        .unwrap();
    call_state(&mut telefon, CallState::RingIn).await;
    assert!(gw.call_control.anfragen.lock().is_empty());

    // nach Ablauf hoert das Telefon auf zu klingeln
    call_state(&mut telefon, CallState::OnHook).await;
    let cc = gw.call_control.clone();
    assert!(warten_bis(|| !cc.anfragen.lock().is_empty()).await);
    pruefe_weiterleitung(&gw, call_id, "557");
}
