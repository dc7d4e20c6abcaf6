//! Feature-Status eines Geraets: DND, Privacy, Monitor und Weiterleitungen
//!
//! Jeder Wechsel wird im Feature-Store persistiert und dem Telefon per
//! FeatureStat, ForwardStat und Prioritaetsmeldung angezeigt.

use skinnygate_core::host::{FeatureKey, FeatureKind};
use skinnygate_core::LineName;
use skinnygate_protocol::messages::FeatureStat;
use skinnygate_protocol::Message;
use std::sync::Arc;

use crate::button_template::feature_button;
use crate::device::Device;
use crate::line::WeiterleitungsArt;
use crate::server_state::GatewayState;

/// Prioritaeten im Meldungsstapel (kleiner = wichtiger)
pub const PRIO_DND: u32 = 2;
pub const PRIO_WEITERLEITUNG: u32 = 3;
pub const PRIO_PRIVACY: u32 = 5;

/// Geraeteweite Schalter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schalter {
    Dnd,
    Privacy,
    Monitor,
}

impl Schalter {
    pub fn schluessel(self) -> &'static str {
        match self {
            Self::Dnd => "dnd",
            Self::Privacy => "privacy",
            Self::Monitor => "monitor",
        }
    }

    fn feature(self) -> FeatureKind {
        match self {
            Self::Dnd => FeatureKind::Dnd,
            Self::Privacy => FeatureKind::Privacy,
            Self::Monitor => FeatureKind::Monitor,
        }
    }

    fn meldung(self) -> Option<(u32, &'static str)> {
        match self {
            Self::Dnd => Some((PRIO_DND, "Do Not Disturb")),
            Self::Privacy => Some((PRIO_PRIVACY, "Privacy")),
            Self::Monitor => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Dnd => "DND",
            Self::Privacy => "Privacy",
            Self::Monitor => "Monitor",
        }
    }

    pub const ALLE: [Schalter; 3] = [Self::Dnd, Self::Privacy, Self::Monitor];
}

fn ist_an(wert: Option<&str>) -> bool {
    matches!(wert, Some("on") | Some("1") | Some("true") | Some("yes"))
}

fn schalter_lesen(geraet: &Device, schalter: Schalter) -> bool {
    let f = geraet.features();
    match schalter {
        Schalter::Dnd => f.dnd,
        Schalter::Privacy => f.privacy,
        Schalter::Monitor => f.monitor,
    }
}

/// Setzt einen Schalter im Geraet, ohne zu persistieren
///
/// Gibt die Nachrichten fuer die Anzeige zurueck.
fn schalter_anwenden(geraet: &Device, schalter: Schalter, an: bool) -> Vec<Message> {
    let mut out = Vec::new();
    let entfernt = {
        let mut f = geraet.features();
        match schalter {
            Schalter::Dnd => f.dnd = an,
            Schalter::Privacy => f.privacy = an,
            Schalter::Monitor => f.monitor = an,
        }
        match schalter.meldung() {
            Some((prio, text)) if an => {
                f.prio_setzen(prio, text);
                None
            }
            Some((prio, _)) => {
                f.prio_entfernen(prio);
                Some(prio)
            }
            None => None,
        }
    };

    let instance = geraet
        .lesen()
        .template
        .feature_instance(schalter.feature());
    if let Some(instance) = instance {
        out.push(Message::FeatureStat(FeatureStat {
            instance,
            button_type: feature_button(schalter.feature()),
            status: u32::from(an),
            label: schalter.label().to_string(),
        }));
    }
    if schalter.meldung().is_some() {
        out.extend(geraet.prio_nachricht(entfernt));
    }
    out
}

/// Schaltet einen geraeteweiten Schalter um und persistiert ihn
///
/// Gibt den neuen Wert zurueck.
pub(crate) async fn schalter_umschalten(
    state: &GatewayState,
    geraet: &Arc<Device>,
    schalter: Schalter,
) -> bool {
    let an = !schalter_lesen(geraet, schalter);
    schalter_setzen(state, geraet, schalter, an).await;
    an
}

pub(crate) async fn schalter_setzen(
    state: &GatewayState,
    geraet: &Arc<Device>,
    schalter: Schalter,
    an: bool,
) {
    let nachrichten = schalter_anwenden(geraet, schalter, an);
    state
        .features
        .schreiben(
            &FeatureKey::geraet(&geraet.id, schalter.schluessel()),
            an.then_some("on"),
        )
        .await;
    tracing::info!(device = %geraet.id, feature = schalter.schluessel(), an, "Feature umgeschaltet");
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "Feature-Anzeige nicht gesendet");
    }
}

/// Meldung und ForwardStat fuer einen Weiterleitungsstand
fn weiterleitung_anzeige(
    state: &GatewayState,
    geraet: &Device,
    leitung: &LineName,
) -> Vec<Message> {
    let mut out = Vec::new();
    let Some(line) = state.registry.leitung(leitung) else {
        return out;
    };
    let forward = line.weiterleitung(&geraet.id);
    if let Some(instance) = geraet.instance_fuer_leitung(leitung) {
        out.push(Message::ForwardStat(forward.nachricht(instance)));
    }

    // Meldung solange irgendeine Leitung des Geraets weiterleitet
    let leitungen: Vec<LineName> = geraet
        .lesen()
        .template
        .leitungen()
        .map(|(_, n, _)| n.clone())
        .collect();
    let irgendeine = leitungen.iter().any(|n| {
        state
            .registry
            .leitung(n)
            .is_some_and(|l| l.weiterleitung(&geraet.id).alle.is_some())
    });
    let entfernt = {
        let mut f = geraet.features();
        match (&forward.alle, irgendeine) {
            (Some(ziel), _) => {
                f.prio_setzen(PRIO_WEITERLEITUNG, format!("Forwarded to {ziel}"));
                None
            }
            (None, true) => None,
            (None, false) => {
                f.prio_entfernen(PRIO_WEITERLEITUNG);
                Some(PRIO_WEITERLEITUNG)
            }
        }
    };
    out.extend(geraet.prio_nachricht(entfernt));
    out
}

/// Setzt oder loescht ein Weiterleitungsziel und persistiert es
pub(crate) async fn weiterleitung_speichern(
    state: &GatewayState,
    geraet: &Arc<Device>,
    leitung: &LineName,
    art: WeiterleitungsArt,
    ziel: Option<String>,
) {
    let ziel = ziel.filter(|z| !z.is_empty());
    let Some(line) = state.registry.leitung(leitung) else {
        tracing::debug!(device = %geraet.id, %leitung, "Weiterleitung fuer unbekannte Leitung");
        return;
    };
    if !line.weiterleitung_setzen(&geraet.id, art, ziel.clone()) {
        tracing::debug!(device = %geraet.id, %leitung, "Geraet nicht an der Leitung");
        return;
    }
    state
        .features
        .schreiben(
            &FeatureKey::leitung(&geraet.id, leitung, art.schluessel()),
            ziel.as_deref(),
        )
        .await;
    tracing::info!(device = %geraet.id, %leitung, ?art, ziel = ?ziel, "Weiterleitung gesetzt");

    let nachrichten = weiterleitung_anzeige(state, geraet, leitung);
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "ForwardStat nicht gesendet");
    }
}

/// Stellt alle persistierten Features nach der Registrierung wieder her
pub(crate) async fn wiederherstellen(state: &GatewayState, geraet: &Arc<Device>) {
    let mut nachrichten = Vec::new();

    for schalter in Schalter::ALLE {
        let wert = state
            .features
            .lesen(&FeatureKey::geraet(&geraet.id, schalter.schluessel()))
            .await;
        if ist_an(wert.as_deref()) {
            nachrichten.extend(schalter_anwenden(geraet, schalter, true));
        }
    }

    let leitungen: Vec<LineName> = geraet
        .lesen()
        .template
        .leitungen()
        .map(|(_, n, _)| n.clone())
        .collect();
    for leitung in &leitungen {
        let Some(line) = state.registry.leitung(leitung) else {
            continue;
        };
        let mut gesetzt = false;
        for art in WeiterleitungsArt::ALLE {
            let wert = state
                .features
                .lesen(&FeatureKey::leitung(&geraet.id, leitung, art.schluessel()))
                .await;
            if let Some(ziel) = wert.filter(|z| !z.is_empty()) {
                line.weiterleitung_setzen(&geraet.id, art, Some(ziel));
                gesetzt = true;
            }
        }
        if gesetzt {
            nachrichten.extend(weiterleitung_anzeige(state, geraet, leitung));
        }
    }

    if !nachrichten.is_empty() {
        tracing::debug!(device = %geraet.id, anzahl = nachrichten.len(), "Feature-Status wiederhergestellt");
        if let Err(e) = geraet.senden_alle(nachrichten).await {
            tracing::debug!(device = %geraet.id, fehler = %e, "Feature-Status nicht gesendet");
        }
    }
}
