//! Anruf-Handler – Hoerer, Tastenfeld, Stimulus und Softkeys

use skinnygate_core::host::{CallFeature, HangupCause};
use skinnygate_protocol::enums::{ButtonType, SoftKeyEvent};
use skinnygate_protocol::messages::{
    EnblocCall, KeypadButton, LineRef, SoftKeyEventMessage, Stimulus,
};
use std::sync::Arc;

use crate::anruf;
use crate::channel::{Channel, ChannelState};
use crate::device::Device;
use crate::handlers::HandlerContext;
use crate::line::Line;
use crate::server_state::GatewayState;
use crate::softkey::{self, SoftkeyKontext};

/// Leitung zu einer Instanz, sonst die Standardleitung
fn leitung_fuer(state: &GatewayState, geraet: &Device, instance: u32) -> Option<Arc<Line>> {
    let name = match geraet.leitung_fuer_instance(instance) {
        Some(name) => name,
        None => geraet.standard_leitung()?.1,
    };
    state.registry.leitung(&name)
}

/// Kanal, an den das Geraet gebunden ist (Angebote zaehlen nicht)
fn gebundener_kanal(
    state: &GatewayState,
    geraet: &Arc<Device>,
    call_reference: u32,
) -> Option<Arc<Channel>> {
    let gebunden = |k: &Arc<Channel>| k.geraet().is_some_and(|g| Arc::ptr_eq(&g, geraet));
    anruf::kanal_fuer(state, geraet, call_reference)
        .filter(gebunden)
        .or_else(|| {
            geraet
                .kanaele()
                .into_iter()
                .filter_map(|id| state.registry.kanal(id))
                .find(|k| gebunden(k) && k.zustand() != ChannelState::Hold)
        })
}

/// Abheben: klingelnden Anruf annehmen, sonst neuer Anruf
pub async fn handle_offhook(ctx: &HandlerContext, req: LineRef) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let state = &ctx.state;

    if let Some(kanal) = anruf::klingelnder_kanal(state, &geraet) {
        if let Err(e) = anruf::annehmen(state, &kanal, &geraet).await {
            tracing::debug!(device = %geraet.id, fehler = %e, "Annehmen fehlgeschlagen");
        }
        return;
    }
    if let Some(kanal) = gebundener_kanal(state, &geraet, req.call_reference) {
        if kanal.zustand().sammelt_ziffern() || kanal.zustand().ist_verbunden() {
            tracing::debug!(device = %geraet.id, call_id = %kanal.call_id, "Abheben mit laufendem Kanal ignoriert");
            return;
        }
    }
    if let Err(e) = anruf::neuer_anruf(state, &geraet, Some(req.line_instance)).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "Neuer Anruf nicht moeglich");
        softkey::abweisung_melden(&geraet, &e).await;
    }
}

/// Auflegen: beendet den gebundenen Kanal
pub async fn handle_onhook(ctx: &HandlerContext, req: LineRef) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    match gebundener_kanal(&ctx.state, &geraet, req.call_reference) {
        Some(kanal) => {
            anruf::auflegen(&ctx.state, kanal.call_id, HangupCause::Normal, true).await;
        }
        None => tracing::trace!(device = %geraet.id, "Auflegen ohne Kanal"),
    }
}

/// Tastenfeld: Ziffer in den Kanal, im Ruhezustand wird abgehoben
pub async fn handle_keypad(ctx: &HandlerContext, req: KeypadButton) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let Some(ziffer) = req.ziffer() else {
        tracing::debug!(device = %geraet.id, button = req.button, "Unbekannte Taste");
        return;
    };
    let state = &ctx.state;
    let kanal = match gebundener_kanal(state, &geraet, req.call_reference) {
        Some(kanal) => kanal,
        None if !geraet.im_anruf() => {
            match anruf::neuer_anruf(state, &geraet, Some(req.line_instance)).await {
                Ok(kanal) => kanal,
                Err(e) => {
                    tracing::debug!(device = %geraet.id, fehler = %e, "Waehlen im Ruhezustand nicht moeglich");
                    softkey::abweisung_melden(&geraet, &e).await;
                    return;
                }
            }
        }
        None => return,
    };
    anruf::ziffer(state, &kanal, ziffer).await;
}

/// Blockwahl: ganze Nummer auf einmal
pub async fn handle_enbloc(ctx: &HandlerContext, req: EnblocCall) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let state = &ctx.state;
    let kanal = match gebundener_kanal(state, &geraet, 0).filter(|k| k.zustand().sammelt_ziffern())
    {
        Some(kanal) => kanal,
        None => match anruf::neuer_anruf(state, &geraet, Some(req.line_instance)).await {
            Ok(kanal) => kanal,
            Err(e) => {
                tracing::debug!(device = %geraet.id, fehler = %e, "Blockwahl nicht moeglich");
                softkey::abweisung_melden(&geraet, &e).await;
                return;
            }
        },
    };
    anruf::nummer_waehlen(state, &kanal, &req.called_party).await;
}

pub async fn handle_stimulus(ctx: &HandlerContext, req: Stimulus) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let Some(taste) = ButtonType::from_u32(req.stimulus) else {
        tracing::debug!(device = %geraet.id, stimulus = req.stimulus, "Unbekannter Stimulus");
        return;
    };
    let Some(eintrag) = softkey::stimulus_aufloesen(geraet.klasse(), taste) else {
        tracing::debug!(device = %geraet.id, ?taste, "Stimulus ohne Handler");
        return;
    };
    let state = &ctx.state;
    let leitung = if taste == ButtonType::Line {
        geraet
            .leitung_fuer_instance(req.instance)
            .and_then(|name| state.registry.leitung(&name))
    } else {
        leitung_fuer(state, &geraet, 0)
    };
    let kontext = SoftkeyKontext {
        state: Arc::clone(state),
        kanal: anruf::kanal_fuer(state, &geraet, req.call_reference),
        geraet,
        leitung,
        instance: req.instance,
    };
    if let Err(e) = softkey::ausfuehren(eintrag, kontext).await {
        tracing::debug!(stimulus = eintrag.name, fehler = %e, "Stimulus abgewiesen");
    }
}

pub async fn handle_softkey(ctx: &HandlerContext, req: SoftKeyEventMessage) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let Some(event) = SoftKeyEvent::from_u32(req.event) else {
        tracing::debug!(device = %geraet.id, event = req.event, "Unbekannter Softkey");
        return;
    };
    let Some(eintrag) = softkey::aufloesen(geraet.klasse(), event) else {
        tracing::debug!(device = %geraet.id, ?event, "Softkey ohne Handler");
        return;
    };
    let state = &ctx.state;
    let kontext = SoftkeyKontext {
        state: Arc::clone(state),
        kanal: anruf::kanal_fuer(state, &geraet, req.call_reference),
        leitung: leitung_fuer(state, &geraet, req.line_instance),
        geraet,
        instance: req.line_instance,
    };
    if let Err(e) = softkey::ausfuehren(eintrag, kontext).await {
        tracing::debug!(softkey = eintrag.name, fehler = %e, "Softkey abgewiesen");
    }
}

/// Gabelumschalter: verbunden -> Halten, gehalten -> Fortsetzen
pub async fn handle_hookflash(ctx: &HandlerContext, req: LineRef) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    let state = &ctx.state;
    let Some(kanal) = anruf::kanal_fuer(state, &geraet, req.call_reference) else {
        return;
    };
    let feature = match kanal.zustand() {
        ChannelState::Connected => CallFeature::Hold,
        ChannelState::Hold => CallFeature::Resume,
        _ => return,
    };
    match anruf::feature_ausfuehren(state, &kanal, feature).await {
        Ok(ausgefuehrt) => tracing::debug!(device = %geraet.id, ?feature, ausgefuehrt, "Hookflash"),
        Err(e) => tracing::debug!(device = %geraet.id, fehler = %e, "Hookflash abgewiesen"),
    }
}
