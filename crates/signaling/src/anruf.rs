//! Anruf-Ablauf: Kanal anlegen, Ziffern sammeln, waehlen, annehmen, auflegen
//!
//! Alle Funktionen arbeiten auf Arc-Referenzen und halten keine
//! parking_lot-Guards ueber einen await-Punkt.

use futures_util::future::{BoxFuture, FutureExt};
use skinnygate_core::host::{
    CallDirection, CallFeature, CallRequest, CallerInfo, FeatureKey, HangupCause, HostIndication,
    RejectCause,
};
use skinnygate_core::{CallId, GatewayEvent, LineName, OwnerHandle};
use skinnygate_protocol::messages::ConnectionStatisticsReq;
use skinnygate_protocol::Message;
use std::sync::Arc;

use crate::channel::{Absagen, Angebot, Channel, ChannelState};
use crate::device::{Device, RegistrationState};
use crate::error::{SignalingError, SignalingResult};
use crate::indicate::{self, AnzeigeKontext};
use crate::keepalive;
use crate::line::Line;
use crate::media;
use crate::scheduler::TimerKind;
use crate::server_state::GatewayState;

/// Schluessel der zuletzt gewaehlten Nummer im Feature-Store
pub const LAST_DIALED: &str = "last_dialed";

// ---------------------------------------------------------------------------
// Anzeige
// ---------------------------------------------------------------------------

fn kontext(
    state: &GatewayState,
    kanal: &Channel,
    geraet: &Device,
    instance: u32,
) -> AnzeigeKontext {
    let (eigener_name, eigene_nummer) = state
        .registry
        .leitung(&kanal.line)
        .map(|l| {
            let c = l.config();
            let nummer = if c.cid_num.is_empty() {
                kanal.line.as_str().to_string()
            } else {
                c.cid_num
            };
            (c.cid_name, nummer)
        })
        .unwrap_or_else(|| (String::new(), kanal.line.as_str().to_string()));
    let hat_display = geraet.hat_display();
    let dnd_still = geraet.features().dnd_still();
    let g = kanal.bearbeiten();
    AnzeigeKontext {
        instance,
        call_reference: kanal.call_id.inner(),
        richtung: Some(kanal.richtung),
        hat_display,
        dnd_still,
        gegenstelle: g.anrufer.clone(),
        gewaehlt: g.ziffern.clone(),
        eigener_name,
        eigene_nummer,
    }
}

/// Sendet die Anzeige fuer `ziel` an ein Geraet
pub(crate) async fn anzeigen(
    state: &GatewayState,
    kanal: &Channel,
    geraet: &Device,
    instance: u32,
    ziel: ChannelState,
) {
    let nachrichten = indicate::nachrichten(ziel, &kontext(state, kanal, geraet, instance));
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, call_id = %kanal.call_id, fehler = %e, "Anzeige nicht gesendet");
    }
}

/// Zustandswechsel samt Anzeige auf dem gebundenen Geraet
pub(crate) async fn zustand_wechseln(
    state: &GatewayState,
    kanal: &Channel,
    ziel: ChannelState,
) -> SignalingResult<()> {
    kanal.uebergang(ziel)?;
    state.melden(GatewayEvent::KanalZustand {
        call_id: kanal.call_id,
        zustand: ziel.name().to_string(),
    });
    if let Some(geraet) = kanal.geraet() {
        anzeigen(state, kanal, &geraet, kanal.instance(), ziel).await;
    }
    Ok(())
}

fn fehler_grund(ziel: ChannelState) -> HangupCause {
    match ziel {
        ChannelState::Busy => HangupCause::Busy,
        ChannelState::InvalidNumber => HangupCause::InvalidNumber,
        _ => HangupCause::Congestion,
    }
}

fn abweisung_zustand(grund: RejectCause) -> ChannelState {
    match grund {
        RejectCause::InvalidNumber => ChannelState::InvalidNumber,
        RejectCause::Busy => ChannelState::Busy,
        RejectCause::Congestion => ChannelState::Congestion,
    }
}

/// Fehlerton anzeigen und verzoegert auflegen
pub(crate) async fn fehler(state: &Arc<GatewayState>, kanal: &Channel, ziel: ChannelState) {
    if let Err(e) = zustand_wechseln(state, kanal, ziel).await {
        tracing::debug!(call_id = %kanal.call_id, fehler = %e, "Fehlerzustand nicht erreichbar");
    }
    let call_id = kanal.call_id;
    let st = Arc::clone(state);
    state.scheduler.planen(
        call_id,
        TimerKind::Hangup,
        state.config.waehlen.fehler_auflegen,
        async move {
            auflegen(&st, call_id, fehler_grund(ziel), true).await;
        },
    );
}

// ---------------------------------------------------------------------------
// Kanaele anlegen
// ---------------------------------------------------------------------------

/// Leitung aus der Registry oder dem Verzeichnis
pub(crate) async fn leitung_holen(state: &GatewayState, name: &LineName) -> Option<Arc<Line>> {
    if let Some(line) = state.registry.leitung(name) {
        return Some(line);
    }
    let config = state.verzeichnis.leitung_suchen(name).await?;
    Some(state.registry.leitung_oder_anlegen(config))
}

/// Legt einen Kanal auf einem Geraet an und traegt ihn ueberall ein
pub(crate) fn kanal_anlegen(
    state: &GatewayState,
    geraet: &Arc<Device>,
    instance: u32,
    line: &Line,
    richtung: CallDirection,
) -> Arc<Channel> {
    let call_id = state.call_id_vergeben();
    let kanal = Channel::neu(call_id, line.name.clone(), richtung);
    kanal.geraet_setzen(geraet, instance);
    state.registry.kanal_einfuegen(Arc::clone(&kanal));
    line.kanal_hinzufuegen(call_id);
    if geraet.kanal_hinzufuegen(call_id) {
        keepalive::aktualisieren(&state.config.keepalive, geraet);
    }
    geraet.aktiv_setzen(call_id, instance);
    tracing::debug!(device = %geraet.id, %call_id, line = %line.name, "Kanal angelegt");
    kanal
}

/// Abheben: neuer abgehender Kanal mit Waehlton
///
/// Ohne `instance` wird die Standardleitung des Geraets benutzt.
pub(crate) async fn neuer_anruf(
    state: &Arc<GatewayState>,
    geraet: &Arc<Device>,
    instance: Option<u32>,
) -> SignalingResult<Arc<Channel>> {
    let (instance, name) = match instance.filter(|i| *i != 0) {
        Some(i) => {
            let name = geraet
                .leitung_fuer_instance(i)
                .ok_or_else(|| SignalingError::zustand(format!("keine Leitung auf Instanz {i}")))?;
            (i, name)
        }
        None => geraet
            .standard_leitung()
            .ok_or_else(|| SignalingError::zustand("Geraet hat keine Leitung"))?,
    };
    let line = leitung_holen(state, &name)
        .await
        .ok_or_else(|| SignalingError::ressource(format!("Leitung {name} unbekannt")))?;

    let kanal = kanal_anlegen(state, geraet, instance, &line, CallDirection::Outbound);
    zustand_wechseln(state, &kanal, ChannelState::OffHook).await?;

    if let Some(nummer) = line.config().autodial.filter(|n| !n.is_empty()) {
        tracing::debug!(device = %geraet.id, call_id = %kanal.call_id, %nummer, "Hotline waehlt automatisch");
        kanal.bearbeiten().ziffern = nummer;
        softswitch(state, &kanal).await;
    } else {
        ziffer_timer(state, kanal.call_id, state.config.waehlen.erste_ziffer_timeout);
    }
    Ok(kanal)
}

fn ziffer_timer(state: &Arc<GatewayState>, call_id: CallId, nach: std::time::Duration) {
    let st = Arc::clone(state);
    state
        .scheduler
        .planen(call_id, TimerKind::DigitTimeout, nach, async move {
            if let Some(kanal) = st.registry.kanal(call_id) {
                tracing::debug!(%call_id, "Ziffern-Timeout");
                softswitch(&st, &kanal).await;
            }
        });
}

// ---------------------------------------------------------------------------
// Waehlen
// ---------------------------------------------------------------------------

/// Eine Ziffer auf einem Kanal
pub(crate) async fn ziffer(state: &Arc<GatewayState>, kanal: &Arc<Channel>, ziffer: char) {
    let zustand = kanal.zustand();
    if zustand.ist_verbunden() {
        if let Some(owner) = kanal.owner() {
            state.call_control.dtmf(owner, ziffer).await;
        }
        return;
    }
    if !zustand.sammelt_ziffern() {
        tracing::debug!(call_id = %kanal.call_id, %zustand, %ziffer, "Ziffer ignoriert");
        return;
    }
    if zustand == ChannelState::OffHook {
        if let Err(e) = zustand_wechseln(state, kanal, ChannelState::GetDigits).await {
            tracing::debug!(call_id = %kanal.call_id, fehler = %e, "GetDigits nicht erreichbar");
        }
    }

    let waehlen = &state.config.waehlen;
    let terminiert = {
        let mut g = kanal.bearbeiten();
        g.ziffern.push(ziffer);
        let terminiert = waehlen.terminator == Some(ziffer);
        if terminiert && waehlen.terminator_kuerzen {
            g.ziffern.pop();
        }
        terminiert
    };

    if terminiert {
        state.scheduler.abbrechen(kanal.call_id, TimerKind::DigitTimeout);
        softswitch(state, kanal).await;
    } else {
        ziffer_timer(state, kanal.call_id, waehlen.ziffer_timeout);
    }
}

/// Loescht die letzte Ziffer und startet den Ziffern-Timer neu
///
/// Mit leerem Puffer gilt wieder die Frist fuer die erste Ziffer.
pub(crate) fn ziffer_loeschen(state: &Arc<GatewayState>, kanal: &Channel) -> bool {
    let (geloescht, leer) = {
        let mut g = kanal.bearbeiten();
        let geloescht = g.ziffern.pop().is_some();
        (geloescht, g.ziffern.is_empty())
    };
    if geloescht {
        let waehlen = &state.config.waehlen;
        let frist = if leer {
            waehlen.erste_ziffer_timeout
        } else {
            waehlen.ziffer_timeout
        };
        ziffer_timer(state, kanal.call_id, frist);
    }
    geloescht
}

/// Ersetzt den Ziffernpuffer und waehlt sofort
pub(crate) async fn nummer_waehlen(state: &Arc<GatewayState>, kanal: &Arc<Channel>, nummer: &str) {
    kanal.bearbeiten().ziffern = nummer.to_string();
    softswitch(state, kanal).await;
}

/// Waehlt mit den gesammelten Ziffern
pub(crate) async fn softswitch(state: &Arc<GatewayState>, kanal: &Arc<Channel>) {
    if !kanal.zustand().sammelt_ziffern() {
        return;
    }
    state.scheduler.abbrechen(kanal.call_id, TimerKind::DigitTimeout);
    let (nummer, erfassung) = {
        let g = kanal.bearbeiten();
        (g.ziffern.clone(), g.cfwd_erfassung)
    };
    let Some(geraet) = kanal.geraet() else {
        auflegen(state, kanal.call_id, HangupCause::DeviceGone, false).await;
        return;
    };

    if let Some(art) = erfassung {
        crate::features::weiterleitung_speichern(state, &geraet, &kanal.line, art, Some(nummer))
            .await;
        auflegen(state, kanal.call_id, HangupCause::Normal, false).await;
        return;
    }

    if nummer.is_empty() {
        tracing::debug!(call_id = %kanal.call_id, "Leerer Ziffernpuffer");
        fehler(state, kanal, ChannelState::Congestion).await;
        return;
    }

    if let Err(e) = zustand_wechseln(state, kanal, ChannelState::Dialing).await {
        tracing::debug!(call_id = %kanal.call_id, fehler = %e, "Dialing nicht erreichbar");
        return;
    }

    state
        .features
        .schreiben(
            &FeatureKey::leitung(&geraet.id, &kanal.line, LAST_DIALED),
            Some(&nummer),
        )
        .await;

    let caller = state
        .registry
        .leitung(&kanal.line)
        .map(|l| {
            let c = l.config();
            CallerInfo {
                name: c.cid_name,
                number: c.cid_num,
                subscription: None,
            }
        })
        .unwrap_or_default();
    let anfrage = CallRequest {
        call_id: kanal.call_id,
        device_id: Some(geraet.id.clone()),
        line: kanal.line.clone(),
        number: nummer.clone(),
        caller,
        richtung: CallDirection::Outbound,
        parent: None,
    };
    tracing::info!(device = %geraet.id, call_id = %kanal.call_id, %nummer, "Anruf wird platziert");

    match state.call_control.anruf_platzieren(anfrage).await {
        Ok(owner) => {
            kanal.bearbeiten().owner = Some(owner);
            if kanal.zustand() == ChannelState::Dialing {
                if let Err(e) = zustand_wechseln(state, kanal, ChannelState::Proceed).await {
                    tracing::debug!(call_id = %kanal.call_id, fehler = %e, "Proceed nicht erreichbar");
                }
            }
        }
        Err(grund) => {
            tracing::info!(call_id = %kanal.call_id, ?grund, "Anruf abgelehnt");
            fehler(state, kanal, abweisung_zustand(grund)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Eingehend
// ---------------------------------------------------------------------------

/// Bietet einen Anruf allen Geraeten der Leitung an
pub(crate) async fn eingehender_anruf(
    state: &Arc<GatewayState>,
    nummer: &str,
    anrufer: CallerInfo,
    owner: OwnerHandle,
) -> Result<CallId, RejectCause> {
    let name = LineName::new(nummer);
    let Some(line) = state.registry.leitung(&name) else {
        tracing::debug!(%nummer, "Eingehender Anruf fuer unbekannte Leitung");
        return Err(RejectCause::InvalidNumber);
    };

    let call_id = state.call_id_vergeben();
    let kanal = Channel::neu(call_id, name, CallDirection::Inbound);
    {
        let mut g = kanal.bearbeiten();
        g.owner = Some(owner);
        g.anrufer = anrufer.clone();
    }
    state.registry.kanal_einfuegen(Arc::clone(&kanal));
    line.kanal_hinzufuegen(call_id);

    let mut angebote: Vec<(Arc<Device>, u32)> = Vec::new();
    let mut weiterleitung: Option<String> = None;
    let mut keine_antwort: Option<String> = None;
    let mut absagen = Absagen::default();

    for ld in line.geraete() {
        let Some(geraet) = ld.geraet.upgrade() else {
            absagen.andere += 1;
            continue;
        };
        if geraet.session().is_none() || geraet.zustand() != RegistrationState::Ok {
            absagen.andere += 1;
            continue;
        }
        if let Some(ziel) = &ld.weiterleitung.alle {
            weiterleitung.get_or_insert_with(|| ziel.clone());
            absagen.andere += 1;
            continue;
        }
        if geraet.features().dnd_weist_ab() {
            absagen.dnd += 1;
            continue;
        }
        if let Some(gewuenscht) = &anrufer.subscription {
            if ld.subscription.as_ref() != Some(gewuenscht) {
                absagen.andere += 1;
                continue;
            }
        }
        if geraet.im_anruf() {
            if let Some(ziel) = &ld.weiterleitung.besetzt {
                weiterleitung.get_or_insert_with(|| ziel.clone());
                absagen.andere += 1;
                continue;
            }
        }
        if keine_antwort.is_none() {
            keine_antwort = ld.weiterleitung.keine_antwort.clone();
        }
        angebote.push((geraet, ld.instance));
    }

    // Anruf steht ab hier, auch wenn niemand klingelt
    if let Err(e) = kanal.uebergang(ChannelState::RingIn) {
        tracing::debug!(%call_id, fehler = %e, "RingIn nicht erreichbar");
    }
    state.melden(GatewayEvent::KanalZustand {
        call_id,
        zustand: ChannelState::RingIn.name().to_string(),
    });

    if angebote.is_empty() {
        kanal.bearbeiten().absagen = absagen;
        if let Some(ziel) = weiterleitung {
            weiterleiten(state, &kanal, ziel).await;
        } else {
            let ziel = absagen.endzustand();
            tracing::info!(%call_id, line = %line.name, %ziel, "Kein Geraet nimmt den Anruf an");
            fehler(state, &kanal, ziel).await;
        }
        return Ok(call_id);
    }

    {
        let mut g = kanal.bearbeiten();
        g.abonnenten = angebote.len() as u32;
        g.absagen = absagen;
        g.cfwd_no_answer = keine_antwort.clone();
        g.angebote = angebote
            .iter()
            .map(|(geraet, instance)| Angebot {
                geraet: Arc::downgrade(geraet),
                device_id: geraet.id.clone(),
                instance: *instance,
            })
            .collect();
    }

    for (geraet, instance) in &angebote {
        if geraet.kanal_hinzufuegen(call_id) {
            keepalive::aktualisieren(&state.config.keepalive, geraet);
        }
        anzeigen(state, &kanal, geraet, *instance, ChannelState::RingIn).await;
    }
    tracing::info!(%call_id, line = %line.name, geraete = angebote.len(), "Eingehender Anruf klingelt");

    if let Some(ziel) = keine_antwort {
        let st = Arc::clone(state);
        state.scheduler.planen(
            call_id,
            TimerKind::CfwdNoAnswer,
            state.config.waehlen.cfwd_no_answer,
            async move {
                let Some(kanal) = st.registry.kanal(call_id) else {
                    return;
                };
                if kanal.zustand() != ChannelState::RingIn {
                    return;
                }
                tracing::info!(%call_id, %ziel, "Weiterleitung bei Nichtmelden");
                angebote_zurueckziehen(&st, &kanal).await;
                weiterleiten(&st, &kanal, ziel).await;
            },
        );
    }
    Ok(call_id)
}

/// Beendet das Klingeln auf allen angebotenen Geraeten
async fn angebote_zurueckziehen(state: &GatewayState, kanal: &Channel) {
    let angebote = {
        let mut g = kanal.bearbeiten();
        g.abonnenten = 0;
        std::mem::take(&mut g.angebote)
    };
    for angebot in angebote {
        if let Some(geraet) = angebot.geraet.upgrade() {
            anzeigen(state, kanal, &geraet, angebot.instance, ChannelState::OnHook).await;
            if geraet.kanal_entfernen(kanal.call_id) {
                keepalive::aktualisieren(&state.config.keepalive, &geraet);
            }
        }
    }
}

/// Ein Geraet lehnt einen klingelnden Anruf ab oder verschwindet
///
/// Lehnt das letzte Geraet ab, endet der Kanal in Busy (DND) oder
/// Congestion.
pub(crate) async fn angebot_zurueckziehen(
    state: &Arc<GatewayState>,
    kanal: &Arc<Channel>,
    geraet: &Arc<Device>,
    dnd: bool,
) {
    let (instance, leer, zustand, absagen) = {
        let mut g = kanal.bearbeiten();
        let Some(pos) = g
            .angebote
            .iter()
            .position(|a| std::ptr::eq(a.geraet.as_ptr(), Arc::as_ptr(geraet)))
        else {
            return;
        };
        let angebot = g.angebote.remove(pos);
        g.abonnenten = g.abonnenten.saturating_sub(1);
        if dnd {
            g.absagen.dnd += 1;
        } else {
            g.absagen.andere += 1;
        }
        (angebot.instance, g.abonnenten == 0, g.zustand, g.absagen)
    };
    anzeigen(state, kanal, geraet, instance, ChannelState::OnHook).await;
    if geraet.kanal_entfernen(kanal.call_id) {
        keepalive::aktualisieren(&state.config.keepalive, geraet);
    }
    tracing::debug!(device = %geraet.id, call_id = %kanal.call_id, "Angebot zurueckgezogen");

    if leer && zustand == ChannelState::RingIn {
        let ziel = absagen.endzustand();
        state.scheduler.abbrechen(kanal.call_id, TimerKind::CfwdNoAnswer);
        fehler(state, kanal, ziel).await;
    }
}

/// Leitet einen Anruf ueber einen Kind-Kanal weiter
async fn weiterleiten(state: &Arc<GatewayState>, kanal: &Arc<Channel>, ziel: String) {
    let (owner, anrufer) = {
        let g = kanal.bearbeiten();
        (g.owner, g.anrufer.clone())
    };
    let kind_id = state.call_id_vergeben();
    let kind = Channel::neu(kind_id, kanal.line.clone(), CallDirection::Forward);
    {
        let mut g = kind.bearbeiten();
        g.parent = Some(kanal.call_id);
        g.anrufer = anrufer.clone();
        g.ziffern = ziel.clone();
    }
    state.registry.kanal_einfuegen(Arc::clone(&kind));
    kanal.bearbeiten().kinder.push(kind_id);

    let anfrage = CallRequest {
        call_id: kind_id,
        device_id: None,
        line: kanal.line.clone(),
        number: ziel.clone(),
        caller: anrufer,
        richtung: CallDirection::Forward,
        parent: owner,
    };
    match state.call_control.anruf_platzieren(anfrage).await {
        Ok(handle) => {
            kind.bearbeiten().owner = Some(handle);
            if let Err(e) = kind.uebergang(ChannelState::Proceed) {
                tracing::debug!(call_id = %kind_id, fehler = %e, "Proceed nicht erreichbar");
            }
            if let Err(e) = zustand_wechseln(state, kanal, ChannelState::RingOut).await {
                tracing::debug!(call_id = %kanal.call_id, fehler = %e, "RingOut nicht erreichbar");
            }
            tracing::info!(call_id = %kanal.call_id, kind = %kind_id, %ziel, "Anruf weitergeleitet");
        }
        Err(grund) => {
            state.registry.kanal_entfernen(kind_id);
            kanal.bearbeiten().kinder.retain(|c| *c != kind_id);
            tracing::info!(call_id = %kanal.call_id, %ziel, ?grund, "Weiterleitung abgelehnt");
            fehler(state, kanal, abweisung_zustand(grund)).await;
        }
    }
}

/// Ein Geraet nimmt einen klingelnden Anruf an
pub(crate) async fn annehmen(
    state: &Arc<GatewayState>,
    kanal: &Arc<Channel>,
    geraet: &Arc<Device>,
) -> SignalingResult<()> {
    let (instance, andere, owner) = {
        let mut g = kanal.bearbeiten();
        if g.zustand != ChannelState::RingIn {
            return Err(SignalingError::zustand(format!(
                "{} klingelt nicht ({})",
                kanal.call_id, g.zustand
            )));
        }
        let Some(pos) = g
            .angebote
            .iter()
            .position(|a| std::ptr::eq(a.geraet.as_ptr(), Arc::as_ptr(geraet)))
        else {
            return Err(SignalingError::zustand(format!(
                "{} nicht auf {} angeboten",
                kanal.call_id, geraet.id
            )));
        };
        let eigenes = g.angebote.remove(pos);
        let andere = std::mem::take(&mut g.angebote);
        g.abonnenten = 0;
        (eigenes.instance, andere, g.owner)
    };
    kanal.geraet_setzen(geraet, instance);
    state.scheduler.abbrechen(kanal.call_id, TimerKind::CfwdNoAnswer);

    for angebot in andere {
        if let Some(anderes) = angebot.geraet.upgrade() {
            anzeigen(state, kanal, &anderes, angebot.instance, ChannelState::OnHook).await;
            if anderes.kanal_entfernen(kanal.call_id) {
                keepalive::aktualisieren(&state.config.keepalive, &anderes);
            }
        }
    }

    zustand_wechseln(state, kanal, ChannelState::Connected).await?;
    geraet.aktiv_setzen(kanal.call_id, instance);
    if let Some(owner) = owner {
        state.call_control.angenommen(owner).await;
    }
    media::starten(state, kanal, geraet).await;
    tracing::info!(device = %geraet.id, call_id = %kanal.call_id, "Anruf angenommen");
    Ok(())
}

/// Die Gegenstelle eines abgehenden Anrufs hat angenommen
pub(crate) async fn remote_angenommen(state: &Arc<GatewayState>, call_id: CallId) -> bool {
    let Some(kanal) = state.registry.kanal(call_id) else {
        return false;
    };
    if !matches!(
        kanal.zustand(),
        ChannelState::Dialing | ChannelState::Proceed | ChannelState::RingOut
    ) {
        return false;
    }
    if zustand_wechseln(state, &kanal, ChannelState::Connected)
        .await
        .is_err()
    {
        return false;
    }
    if let Some(geraet) = kanal.geraet() {
        media::starten(state, &kanal, &geraet).await;
    }
    true
}

/// Host-Anzeige auf einem Kanal
pub(crate) async fn indizieren(state: &Arc<GatewayState>, call_id: CallId, anzeige: HostIndication) {
    let Some(kanal) = state.registry.kanal(call_id) else {
        tracing::debug!(%call_id, ?anzeige, "Anzeige fuer unbekannten Kanal");
        return;
    };
    let ziel = match anzeige {
        HostIndication::Answered => {
            remote_angenommen(state, call_id).await;
            return;
        }
        HostIndication::Busy => {
            fehler(state, &kanal, ChannelState::Busy).await;
            return;
        }
        HostIndication::Congestion => {
            fehler(state, &kanal, ChannelState::Congestion).await;
            return;
        }
        HostIndication::Ringing => ChannelState::RingOut,
        HostIndication::Progress => ChannelState::Proceed,
        HostIndication::Hold => ChannelState::Hold,
        HostIndication::Unhold => ChannelState::Connected,
    };
    if let Err(e) = zustand_wechseln(state, &kanal, ziel).await {
        tracing::debug!(%call_id, ?anzeige, fehler = %e, "Host-Anzeige ignoriert");
    }
}

// ---------------------------------------------------------------------------
// Auflegen
// ---------------------------------------------------------------------------

/// Baut einen Kanal samt Kind-Kanaelen ab
///
/// Idempotent: der Uebergang nach Zombie gelingt nur einmal.
pub(crate) fn auflegen(
    state: &Arc<GatewayState>,
    call_id: CallId,
    grund: HangupCause,
    host_benachrichtigen: bool,
) -> BoxFuture<'static, ()> {
    let state = Arc::clone(state);
    async move {
        let Some(kanal) = state.registry.kanal(call_id) else {
            return;
        };
        let Ok(vorher) = kanal.uebergang(ChannelState::Zombie) else {
            return;
        };
        state.scheduler.alle_abbrechen(call_id);

        let (geraet, instance, owner, parent, kinder, medien_offen) = {
            let g = kanal.bearbeiten();
            (
                g.geraet.upgrade(),
                g.instance,
                g.owner,
                g.parent,
                g.kinder.clone(),
                g.medien.irgendwas_offen(),
            )
        };

        if let Some(geraet) = &geraet {
            let mut nachrichten = Vec::new();
            if vorher.ist_verbunden() || medien_offen {
                nachrichten.push(Message::ConnectionStatisticsReq(ConnectionStatisticsReq {
                    directory_number: kanal.line.as_str().to_string(),
                    call_reference: call_id.inner(),
                    clear: true,
                }));
                nachrichten.extend(media::schliessen_nachrichten(&kanal, geraet));
            }
            nachrichten.extend(indicate::nachrichten(
                ChannelState::OnHook,
                &kontext(&state, &kanal, geraet, instance),
            ));
            if let Err(e) = geraet.senden_alle(nachrichten).await {
                tracing::debug!(device = %geraet.id, %call_id, fehler = %e, "Auflegen nicht angezeigt");
            }
        }
        angebote_zurueckziehen(&state, &kanal).await;

        state.media.freigeben(call_id).await;
        if host_benachrichtigen {
            if let Some(owner) = owner {
                state.call_control.aufgelegt(owner, grund).await;
            }
        }

        state.registry.kanal_entfernen(call_id);
        if let Some(line) = state.registry.leitung(&kanal.line) {
            line.kanal_entfernen(call_id);
        }
        if let Some(geraet) = &geraet {
            if geraet.kanal_entfernen(call_id) {
                keepalive::aktualisieren(&state.config.keepalive, geraet);
            }
        }
        if let Some(parent) = parent.and_then(|p| state.registry.kanal(p)) {
            parent.bearbeiten().kinder.retain(|c| *c != call_id);
        }
        for kind in kinder {
            auflegen(&state, kind, grund, true).await;
        }

        if let Err(e) = kanal.uebergang(ChannelState::Down) {
            tracing::debug!(%call_id, fehler = %e, "Down nicht erreichbar");
        }
        state.melden(GatewayEvent::KanalFreigegeben { call_id });
        tracing::info!(%call_id, ?grund, vorher = %vorher, "Kanal freigegeben");
    }
    .boxed()
}

// ---------------------------------------------------------------------------
// Kanal-Suche und Call-Features
// ---------------------------------------------------------------------------

/// Kanal eines Geraets: per Call-Referenz, sonst der aktive, sonst der erste
pub(crate) fn kanal_fuer(
    state: &GatewayState,
    geraet: &Arc<Device>,
    call_reference: u32,
) -> Option<Arc<Channel>> {
    if call_reference != 0 {
        return state
            .registry
            .kanal(CallId(call_reference))
            .filter(|k| k.betrifft(geraet));
    }
    if let Some(kanal) = geraet.aktiver_kanal().and_then(|id| state.registry.kanal(id)) {
        return Some(kanal);
    }
    geraet
        .kanaele()
        .into_iter()
        .find_map(|id| state.registry.kanal(id))
}

/// Klingelnder Kanal, der diesem Geraet angeboten wird
pub(crate) fn klingelnder_kanal(state: &GatewayState, geraet: &Arc<Device>) -> Option<Arc<Channel>> {
    geraet
        .kanaele()
        .into_iter()
        .filter_map(|id| state.registry.kanal(id))
        .find(|k| k.zustand() == ChannelState::RingIn && k.angebot_instance(geraet).is_some())
}

/// Fuehrt ein Call-Feature ueber die Call-Control aus
///
/// `Ok(false)` wenn die Call-Control das Feature nicht unterstuetzt.
pub(crate) async fn feature_ausfuehren(
    state: &Arc<GatewayState>,
    kanal: &Arc<Channel>,
    feature: CallFeature,
) -> SignalingResult<bool> {
    let zustand = kanal.zustand();
    let ziel = match (feature, zustand) {
        (CallFeature::Hold, ChannelState::Connected) => Some(ChannelState::Hold),
        (CallFeature::Resume, ChannelState::Hold) => Some(ChannelState::Connected),
        (CallFeature::Transfer, ChannelState::Connected | ChannelState::Hold) => {
            Some(ChannelState::CallTransfer)
        }
        (CallFeature::Conference, ChannelState::Connected) => Some(ChannelState::Conference),
        (CallFeature::Park | CallFeature::Monitor(_), z) if z.ist_verbunden() => None,
        _ => {
            return Err(SignalingError::zustand(format!(
                "{feature:?} im Zustand {zustand} nicht moeglich"
            )))
        }
    };
    let owner = kanal
        .owner()
        .ok_or_else(|| SignalingError::zustand(format!("{} hat keinen Owner", kanal.call_id)))?;
    if !state.call_control.feature(owner, feature).await {
        return Ok(false);
    }

    match feature {
        CallFeature::Park => {
            auflegen(state, kanal.call_id, HangupCause::Normal, false).await;
        }
        CallFeature::Hold => {
            if let Some(geraet) = kanal.geraet() {
                let schliessen = media::schliessen_nachrichten(kanal, &geraet);
                if let Err(e) = geraet.senden_alle(schliessen).await {
                    tracing::debug!(device = %geraet.id, fehler = %e, "Medien nicht geschlossen");
                }
            }
        }
        _ => {}
    }
    if let Some(ziel) = ziel {
        zustand_wechseln(state, kanal, ziel).await?;
        if feature == CallFeature::Resume {
            if let Some(geraet) = kanal.geraet() {
                media::starten(state, kanal, &geraet).await;
            }
        }
    }
    Ok(true)
}
