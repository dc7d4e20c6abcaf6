//! Momentaufnahme fuer Betriebswerkzeuge
//!
//! Jede Registry wird einzeln kopiert; keine Sperre wird laenger gehalten
//! als das Kopieren eines Eintrags dauert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use skinnygate_core::host::CallDirection;
use skinnygate_core::{CallId, DeviceId, LineName, SessionId};
use std::net::SocketAddr;

use crate::device::RegistrationState;
use crate::server_state::GatewayState;
use crate::session::SessionState;

/// Nur die Anzahlen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Zaehler {
    pub sessions: usize,
    pub geraete: usize,
    pub leitungen: usize,
    pub kanaele: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub zustand: SessionState,
    pub familie: String,
    pub version: u8,
    pub geraet: Option<DeviceId>,
    pub still_sek: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeraetInfo {
    pub id: DeviceId,
    pub zustand: RegistrationState,
    pub geraete_typ: u32,
    pub version: u8,
    pub kanaele: Vec<CallId>,
    pub dnd: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeitungInfo {
    pub name: LineName,
    pub geraete: Vec<DeviceId>,
    pub kanaele: Vec<CallId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KanalInfo {
    pub call_id: CallId,
    pub leitung: LineName,
    pub richtung: CallDirection,
    pub zustand: &'static str,
    pub geraet: Option<DeviceId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub zeitpunkt: DateTime<Utc>,
    pub uptime_sek: u64,
    pub sessions: Vec<SessionInfo>,
    pub geraete: Vec<GeraetInfo>,
    pub leitungen: Vec<LeitungInfo>,
    pub kanaele: Vec<KanalInfo>,
}

impl Snapshot {
    pub fn erstellen(state: &GatewayState) -> Self {
        let sessions = state
            .registry
            .sessions()
            .into_iter()
            .map(|s| SessionInfo {
                id: s.id,
                peer: s.peer,
                zustand: s.zustand(),
                familie: format!("{:?}", s.family()),
                version: s.version(),
                geraet: s.geraet().map(|g| g.id.clone()),
                still_sek: s.seit_aktivitaet().as_secs(),
            })
            .collect();

        let geraete = state
            .registry
            .geraete()
            .into_iter()
            .map(|g| {
                let dnd = g.features().dnd;
                let inner = g.lesen();
                GeraetInfo {
                    id: g.id.clone(),
                    zustand: inner.zustand,
                    geraete_typ: inner.geraete_typ,
                    version: inner.version,
                    kanaele: inner.kanaele.clone(),
                    dnd,
                }
            })
            .collect();

        let leitungen = state
            .registry
            .leitungen()
            .into_iter()
            .map(|l| LeitungInfo {
                name: l.name.clone(),
                geraete: l.geraete().into_iter().map(|ld| ld.device_id).collect(),
                kanaele: l.kanaele(),
            })
            .collect();

        let kanaele = state
            .registry
            .kanaele()
            .into_iter()
            .map(|k| {
                let g = k.bearbeiten();
                KanalInfo {
                    call_id: k.call_id,
                    leitung: k.line.clone(),
                    richtung: k.richtung,
                    zustand: g.zustand.name(),
                    geraet: g.device_id.clone(),
                }
            })
            .collect();

        Self {
            zeitpunkt: Utc::now(),
            uptime_sek: state.uptime_sek(),
            sessions,
            geraete,
            leitungen,
            kanaele,
        }
    }

    pub fn zaehler(&self) -> Zaehler {
        Zaehler {
            sessions: self.sessions.len(),
            geraete: self.geraete.len(),
            leitungen: self.leitungen.len(),
            kanaele: self.kanaele.len(),
        }
    }
}
