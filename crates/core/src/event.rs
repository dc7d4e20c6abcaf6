//! Gateway-Ereignisse
//!
//! Der Signaling-Service veroeffentlicht diese Ereignisse ueber einen
//! tokio-Broadcast-Kanal. Abonnenten (Metriken, Betriebswerkzeuge) duerfen
//! Ereignisse verpassen – der autoritative Zustand bleibt im Signaling.

use crate::types::{CallId, DeviceId, SessionId};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Alle systemweiten Ereignisse die ueber den Event-Kanal fliessen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    // --- Session-Ereignisse ---
    /// Eine TCP-Verbindung wurde angenommen
    SessionGeoeffnet { session_id: SessionId, peer: SocketAddr },
    /// Eine Verbindung wurde durch die ACL abgewiesen
    VerbindungAbgewiesen { peer: SocketAddr },
    /// Eine Session wurde beendet
    SessionGeschlossen { session_id: SessionId, grund: String },

    // --- Geraete-Ereignisse ---
    /// Ein Geraet hat die Registrierung abgeschlossen
    GeraetRegistriert { device_id: DeviceId, protokoll_version: u8 },
    /// Eine Registrierung wurde abgelehnt
    GeraetAbgelehnt { device_id: DeviceId, grund: String },
    /// Ein Geraet wurde abgemeldet oder aufgeraeumt
    GeraetAbgemeldet { device_id: DeviceId },

    // --- Kanal-Ereignisse ---
    /// Ein Kanal hat seinen Zustand gewechselt
    KanalZustand { call_id: CallId, zustand: String },
    /// Ein Kanal wurde freigegeben
    KanalFreigegeben { call_id: CallId },

    // --- Protokoll-Ereignisse ---
    /// Eine Nachricht konnte nicht dekodiert werden (nachrichtenlokal)
    DekodierFehler { art: String },
}

impl GatewayEvent {
    /// Kurzer, stabiler Name des Ereignisses (fuer Metrik-Labels)
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionGeoeffnet { .. } => "session_geoeffnet",
            Self::VerbindungAbgewiesen { .. } => "verbindung_abgewiesen",
            Self::SessionGeschlossen { .. } => "session_geschlossen",
            Self::GeraetRegistriert { .. } => "geraet_registriert",
            Self::GeraetAbgelehnt { .. } => "geraet_abgelehnt",
            Self::GeraetAbgemeldet { .. } => "geraet_abgemeldet",
            Self::KanalZustand { .. } => "kanal_zustand",
            Self::KanalFreigegeben { .. } => "kanal_freigegeben",
            Self::DekodierFehler { .. } => "dekodier_fehler",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = GatewayEvent::GeraetRegistriert {
            device_id: DeviceId::new("SEP001122334455"),
            protokoll_version: 11,
        };
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: GatewayEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }

    #[test]
    fn event_namen_stabil() {
        let event = GatewayEvent::KanalFreigegeben { call_id: CallId(3) };
        assert_eq!(event.name(), "kanal_freigegeben");
    }
}
