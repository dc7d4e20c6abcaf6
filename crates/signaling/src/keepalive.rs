//! Keepalive-Toleranz einer Session
//!
//! `toleranz = intervall * multiplikator`. Der Faktor haengt davon ab ob
//! das Geraet registriert ist, ob es gerade telefoniert und ob es ein
//! akkubetriebenes Handset ist. Ein laufender Anruf erhoeht den Faktor
//! nur, er senkt ihn nie.

use std::sync::Arc;
use std::time::Duration;

use crate::device::{Device, RegistrationState};
use crate::modelle;
use crate::server_state::KeepaliveConfig;

/// Toleranzfaktor fuer den aktuellen Geraetezustand
pub fn multiplikator(
    cfg: &KeepaliveConfig,
    registriert: bool,
    geraete_typ: u32,
    im_anruf: bool,
) -> u32 {
    if !registriert {
        return cfg.multiplikator_unregistriert;
    }
    let (idle, anruf) = if modelle::ist_low_power(geraete_typ) {
        (cfg.low_power_idle, cfg.low_power_anruf)
    } else {
        (cfg.multiplikator_idle, cfg.multiplikator_anruf)
    };
    if im_anruf {
        anruf.max(idle)
    } else {
        idle
    }
}

pub fn toleranz(intervall: Duration, multiplikator: u32) -> Duration {
    intervall.saturating_mul(multiplikator.max(1))
}

/// Intervall fuer ein Geraet (Geraetekonfiguration vor globalem Wert)
pub fn intervall(cfg: &KeepaliveConfig, geraet_sek: Option<u64>) -> Duration {
    geraet_sek
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .unwrap_or(cfg.intervall)
}

/// Berechnet Intervall und Faktor neu und setzt sie auf der Session
pub fn aktualisieren(cfg: &KeepaliveConfig, geraet: &Arc<Device>) {
    let Some(session) = geraet.session() else {
        return;
    };
    let (registriert, typ, im_anruf, eigenes) = {
        let g = geraet.lesen();
        (
            g.zustand == RegistrationState::Ok,
            g.geraete_typ,
            !g.kanaele.is_empty(),
            g.config.keepalive_sek,
        )
    };
    let faktor = multiplikator(cfg, registriert, typ, im_anruf);
    let takt = intervall(cfg, eigenes);
    session.keepalive_setzen(takt, faktor);
    tracing::debug!(
        device = %geraet.id,
        intervall_sek = takt.as_secs(),
        faktor,
        im_anruf,
        "Keepalive-Toleranz neu berechnet"
    );
}
