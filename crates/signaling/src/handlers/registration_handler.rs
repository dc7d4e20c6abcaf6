//! Registrierungs-Handler – Token, Register, Unregister, Keepalive
//!
//! Ablauf einer Registrierung:
//! 1. Geraet im Verzeichnis suchen (oder Anonym-/Hotline-Fallback)
//! 2. Geraete-ACL pruefen
//! 3. Protokollversion aushandeln
//! 4. Alte Session desselben Geraets beenden (Uebernahme)
//! 5. RegisterAck + CapabilitiesReq senden
//! 6. Leitungen und Feature-Status im Hintergrund nachladen

use skinnygate_core::host::{ButtonConfig, DeviceConfig, LineConfig};
use skinnygate_core::{DeviceId, GatewayEvent};
use skinnygate_protocol::enums::{HeadsetMode, UnregisterStatus};
use skinnygate_protocol::messages::{
    Alarm, CapabilitiesRes, HeadsetStatus, IpPort, Register, RegisterAck, RegisterAvailableLines,
    RegisterReject, RegisterTokenReq, SpcpRegisterTokenReq, SpcpTokenAnswer, UnregisterAck,
};
use skinnygate_protocol::{Family, Message};
use std::sync::Arc;

use crate::acl::Acl;
use crate::connection;
use crate::device::{Device, RegistrationState};
use crate::error::{SignalingError, SignalingResult};
use crate::features;
use crate::handlers::HandlerContext;
use crate::keepalive;
use crate::server_state::{GatewayState, SignalingConfig};
use crate::session::{SessionState, StopCause};

/// Handelt die Protokollversion aus
///
/// Festgelegte Altgeraete bekommen immer die niedrigste Version der
/// Familie, alle anderen `min(angefragt, konfiguriert, Familie)`.
pub fn version_aushandeln(
    cfg: &SignalingConfig,
    family: Family,
    geraete_typ: u32,
    angefragt: u8,
) -> u8 {
    if cfg.legacy_pins.contains(&geraete_typ) {
        return family.min_version();
    }
    let max = match family {
        Family::Primary => cfg.max_protokoll_version.min(family.max_version()),
        Family::Lite => family.max_version(),
    };
    angefragt.min(max).max(family.min_version())
}

/// Keepalive ohne Geraet beantworten (die Aktivitaet setzt der Reader)
pub async fn handle_keepalive(ctx: &HandlerContext) {
    if let Err(e) = ctx.session.senden(Message::KeepAliveAck).await {
        tracing::debug!(session = %ctx.session.id, fehler = %e, "KeepAliveAck nicht gesendet");
    }
}

/// Ein registriertes Geraet behaelt seinen Zustand
fn token_erhalten(ctx: &HandlerContext) {
    if ctx.session.geraet().is_none() {
        ctx.session.anmeldung_setzen(RegistrationState::PendingToken);
    }
}

/// Token-Anfrage der Primaerfamilie
pub async fn handle_register_token(ctx: &HandlerContext, req: RegisterTokenReq) {
    ctx.session.zustand_setzen(SessionState::Authenticating);
    token_erhalten(ctx);
    let antwort = if ctx.state.config.acl.erlaubt(ctx.session.peer.ip()) {
        Message::RegisterTokenAck
    } else {
        Message::RegisterTokenReject(skinnygate_protocol::messages::RegisterTokenReject {
            wait_time: 0,
        })
    };
    tracing::debug!(
        session = %ctx.session.id,
        device = %req.device_name,
        antwort = antwort.name(),
        "Token-Anfrage"
    );
    if let Err(e) = ctx.session.senden(antwort).await {
        tracing::debug!(session = %ctx.session.id, fehler = %e, "Token-Antwort nicht gesendet");
    }
}

/// Token-Anfrage der Lite-Familie: die Session spricht ab jetzt SPCP
pub async fn handle_spcp_register_token(ctx: &HandlerContext, req: SpcpRegisterTokenReq) {
    ctx.session.zustand_setzen(SessionState::Authenticating);
    token_erhalten(ctx);
    ctx.session
        .protokoll_setzen(Family::Lite, Family::Lite.min_version());
    tracing::debug!(
        session = %ctx.session.id,
        device = %req.device_name,
        device_type = req.device_type,
        "SPCP-Token-Anfrage, Session auf Lite umgestellt"
    );
    let antwort = Message::SpcpRegisterTokenAck(SpcpTokenAnswer { features: 0 });
    if let Err(e) = ctx.session.senden(antwort).await {
        tracing::debug!(session = %ctx.session.id, fehler = %e, "SPCP-Token-Antwort nicht gesendet");
    }
}

/// Registrierung eines Geraets
pub async fn handle_register(ctx: &HandlerContext, req: Register) {
    ctx.session.zustand_setzen(SessionState::Authenticating);
    ctx.session.anmeldung_setzen(RegistrationState::PendingAuth);
    let id = DeviceId::new(req.device_name.trim());

    match registrieren(ctx, &id, &req).await {
        Ok(geraet) => {
            let state = Arc::clone(&ctx.state);
            tokio::spawn(async move {
                nach_registrierung(&state, &geraet).await;
            });
        }
        Err(e) => ablehnen(ctx, &id, e).await,
    }
}

/// Konfiguration aus dem Verzeichnis oder per Fallback
async fn konfiguration(state: &GatewayState, id: &DeviceId) -> Option<DeviceConfig> {
    if let Some(cfg) = state.verzeichnis.geraet_suchen(id).await {
        return Some(cfg);
    }
    let cfg = &state.config;
    if let Some(hotline) = &cfg.hotline_leitung {
        let mut geraet = DeviceConfig::neu(id.clone());
        geraet.buttons = vec![ButtonConfig::Line {
            name: hotline.clone(),
            label: None,
            subscription: None,
        }];
        geraet.dnd_modus = cfg.dnd_modus;
        tracing::info!(device = %id, leitung = %hotline, "Unbekanntes Geraet als Hotline zugelassen");
        return Some(geraet);
    }
    if cfg.anonym {
        let mut geraet = DeviceConfig::neu(id.clone());
        geraet.dnd_modus = cfg.dnd_modus;
        tracing::info!(device = %id, "Unbekanntes Geraet anonym zugelassen");
        return Some(geraet);
    }
    None
}

async fn registrieren(
    ctx: &HandlerContext,
    id: &DeviceId,
    req: &Register,
) -> SignalingResult<Arc<Device>> {
    let state = &ctx.state;
    let session = &ctx.session;

    if id.ist_leer() {
        return Err(SignalingError::Abgelehnt("Empty device name".to_string()));
    }
    let config = konfiguration(state, id)
        .await
        .ok_or_else(|| SignalingError::Abgelehnt("Unknown Device".to_string()))?;

    let acl = Acl::aus_listen(&config.permit, &config.deny).map_err(|e| {
        tracing::warn!(device = %id, fehler = %e, "Ungueltige Geraete-ACL");
        SignalingError::Abgelehnt("Bad device ACL".to_string())
    })?;
    if !acl.erlaubt(session.peer.ip()) {
        return Err(SignalingError::Abgelehnt("Access denied".to_string()));
    }

    let family = session.family();
    let version = version_aushandeln(&state.config, family, req.device_type, req.protocol_version);

    // Erneute Registrierung auf derselben Session: altes Geraet zuerst loesen
    if let Some(vorher) = session.geraet_loesen() {
        vorher.session_loesen();
        connection::geraet_aufraeumen(state, &vorher).await;
    }
    // Uebernahme: dasselbe Geraet haengt noch an einer anderen Session
    if let Some(alt) = state.registry.geraet(id) {
        let alte_session = alt.session().filter(|s| s.id != session.id);
        connection::geraet_aufraeumen(state, &alt).await;
        if let Some(alte) = alte_session {
            if alte.stoppen(StopCause::Uebernommen) {
                tracing::info!(
                    device = %id,
                    alt = %alte.id,
                    neu = %session.id,
                    "Alte Session durch neue Registrierung beendet"
                );
            }
        }
    }

    let geraet = Device::neu(config, req.device_type, family, version);
    {
        let mut g = geraet.schreiben();
        g.zustand = RegistrationState::PendingAuth;
        g.ip = Some(req.ip);
        g.firmware = req.firmware.clone();
    }
    session.protokoll_setzen(family, version);
    session.geraet_binden(Arc::clone(&geraet));
    geraet.session_setzen(session);
    state.registry.geraet_einfuegen(Arc::clone(&geraet));
    session.zustand_setzen(SessionState::Bound);
    geraet.zustand_setzen(RegistrationState::Progress);

    let cfg = &state.config;
    let intervall = keepalive::intervall(&cfg.keepalive, geraet.lesen().config.keepalive_sek);
    session
        .senden_alle(vec![
            Message::RegisterAck(RegisterAck {
                keepalive: intervall.as_secs() as u32,
                date_template: cfg.datum_format.clone(),
                secondary_keepalive: cfg.keepalive.sekundaer.as_secs() as u32,
                protocol_version: version,
            }),
            Message::CapabilitiesReq,
        ])
        .await?;

    geraet.zustand_setzen(RegistrationState::Ok);
    session.zustand_setzen(SessionState::Active);
    keepalive::aktualisieren(&cfg.keepalive, &geraet);
    state.melden(GatewayEvent::GeraetRegistriert {
        device_id: id.clone(),
        protokoll_version: version,
    });
    tracing::info!(
        device = %id,
        peer = %session.peer,
        device_type = req.device_type,
        ?family,
        angefragt = req.protocol_version,
        version,
        "Geraet registriert"
    );
    Ok(geraet)
}

async fn ablehnen(ctx: &HandlerContext, id: &DeviceId, fehler: SignalingError) {
    let text = match &fehler {
        SignalingError::Abgelehnt(text) => text.clone(),
        andere => {
            tracing::debug!(device = %id, fehler = %andere, "Registrierung fehlgeschlagen");
            "Registration failed".to_string()
        }
    };
    tracing::warn!(device = %id, peer = %ctx.session.peer, grund = %text, "Registrierung abgelehnt");

    // die Session behaelt kein halb registriertes Geraet
    if let Some(geraet) = ctx.session.geraet_loesen() {
        geraet.session_loesen();
        connection::geraet_aufraeumen(&ctx.state, &geraet).await;
    }
    ctx.session.anmeldung_setzen(RegistrationState::Rejected);
    if let Err(e) = ctx
        .session
        .senden(Message::RegisterReject(RegisterReject { text: text.clone() }))
        .await
    {
        tracing::debug!(device = %id, fehler = %e, "RegisterReject nicht gesendet");
    }
    ctx.state.melden(GatewayEvent::GeraetAbgelehnt {
        device_id: id.clone(),
        grund: text,
    });
    ctx.session.stoppen(StopCause::Abgewiesen);
}

/// Leitungen anhaengen und Features wiederherstellen
async fn nach_registrierung(state: &Arc<GatewayState>, geraet: &Arc<Device>) {
    let leitungen: Vec<_> = geraet
        .lesen()
        .template
        .leitungen()
        .map(|(instance, name, subscription)| (instance, name.clone(), subscription.cloned()))
        .collect();

    for (instance, name, subscription) in leitungen {
        let config = match state.verzeichnis.leitung_suchen(&name).await {
            Some(config) => config,
            None => LineConfig::neu(name.clone()),
        };
        if geraet.zustand() != RegistrationState::Ok {
            tracing::debug!(device = %geraet.id, "Geraet nicht mehr registriert, Nachladen abgebrochen");
            return;
        }
        let line = state.registry.leitung_oder_anlegen(config);
        line.geraet_anhaengen(geraet, instance, subscription);
        tracing::debug!(device = %geraet.id, leitung = %name, instance, "Leitung angehaengt");
    }

    features::wiederherstellen(state, geraet).await;
}

/// Abmeldung: die Bestaetigung geht immer raus, dann endet die Session
pub async fn handle_unregister(ctx: &HandlerContext) {
    let ack = Message::UnregisterAck(UnregisterAck {
        status: UnregisterStatus::Ok,
    });
    if let Err(e) = ctx.session.senden(ack).await {
        tracing::debug!(session = %ctx.session.id, fehler = %e, "UnregisterAck nicht gesendet");
    }
    if let Some(geraet) = ctx.session.geraet() {
        tracing::info!(device = %geraet.id, "Geraet meldet sich ab");
    }
    ctx.session.stoppen(StopCause::Abgemeldet);
}

pub async fn handle_ip_port(ctx: &HandlerContext, req: IpPort) {
    if let Some(geraet) = ctx.geraet() {
        geraet.schreiben().rtp_port = req.rtp_port;
        tracing::debug!(device = %geraet.id, rtp_port = req.rtp_port, "RTP-Port gemeldet");
    }
}

pub async fn handle_capabilities(ctx: &HandlerContext, res: CapabilitiesRes) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    tracing::debug!(device = %geraet.id, anzahl = res.capabilities.len(), "Capabilities empfangen");
    geraet.schreiben().codecs = res.capabilities;
}

pub async fn handle_alarm(ctx: &HandlerContext, alarm: Alarm) {
    let device = ctx
        .session
        .geraet()
        .map(|g| g.id.to_string())
        .unwrap_or_default();
    tracing::warn!(
        session = %ctx.session.id,
        %device,
        severity = alarm.severity,
        param1 = alarm.param1,
        param2 = alarm.param2,
        text = %alarm.text,
        "Alarm vom Telefon"
    );
}

pub async fn handle_headset(ctx: &HandlerContext, status: HeadsetStatus) {
    if let Some(geraet) = ctx.geraet() {
        let an = HeadsetMode::from_u32(status.mode) == Some(HeadsetMode::On);
        geraet.schreiben().headset = an;
        tracing::debug!(device = %geraet.id, headset = an, "Headset-Status");
    }
}

pub async fn handle_available_lines(ctx: &HandlerContext, req: RegisterAvailableLines) {
    if let Some(geraet) = ctx.geraet() {
        tracing::debug!(device = %geraet.id, max_lines = req.max_lines, "Verfuegbare Leitungen gemeldet");
    }
}
