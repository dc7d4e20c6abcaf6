//! Schnittstellen zu den externen Kollaborateuren
//!
//! Der Signaling-Kern spricht nur ueber diese Traits mit der Aussenwelt:
//! - `DeviceDirectory` – welche Geraete/Leitungen existieren
//! - `FeatureStore`    – einfacher Key/Value-Speicher fuer Feature-Status
//! - `CallControl`     – Call-Routing/PBX des Hosts
//! - `MediaLayer`      – RTP-Endpunkte (nur Adressen, keine Nutzdaten)
//!
//! Die konkreten Implementierungen liefert der Host (bzw. das Server-Crate).

use crate::types::{CallId, DeviceId, LineName, OwnerHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddrV4;

// ---------------------------------------------------------------------------
// Konfigurationstypen (vom Verzeichnis geliefert)
// ---------------------------------------------------------------------------

/// Feature-Art einer Feature-Taste
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Dnd,
    Privacy,
    Monitor,
    ForwardAll,
    Voicemail,
    Redial,
}

/// Verhalten von "Nicht stoeren"
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DndMode {
    /// Eingehende Anrufe werden abgewiesen
    #[default]
    Reject,
    /// Eingehende Anrufe werden nur optisch signalisiert
    Silent,
}

/// Eine konfigurierte Taste im Button-Template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum ButtonConfig {
    /// Leitungstaste
    Line {
        name: LineName,
        #[serde(default)]
        label: Option<String>,
        /// Subscription-ID fuer geteilte Leitungen
        #[serde(default)]
        subscription: Option<String>,
    },
    /// Kurzwahl
    SpeedDial { number: String, label: String },
    /// Feature-Taste (DND, Privacy, ...)
    Feature {
        feature: FeatureKind,
        #[serde(default)]
        label: Option<String>,
    },
    /// Service-URL
    ServiceUrl { url: String, label: String },
    /// Absichtlich leerer Platz
    Empty,
}

/// Geraetekonfiguration aus dem Host-Verzeichnis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,
    #[serde(default)]
    pub beschreibung: String,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    /// Ueberschreibt das globale Keepalive-Intervall
    #[serde(default)]
    pub keepalive_sek: Option<u64>,
    /// Erlaubte Netze (CIDR). Leer = alle erlaubt
    #[serde(default)]
    pub permit: Vec<String>,
    /// Verbotene Netze (CIDR)
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub dnd_modus: DndMode,
    /// Leitung fuer Abheben ohne Leitungswahl
    #[serde(default)]
    pub default_leitung: Option<LineName>,
}

impl DeviceConfig {
    /// Minimale Konfiguration (nur ID, keine Tasten)
    pub fn neu(id: DeviceId) -> Self {
        Self {
            id,
            beschreibung: String::new(),
            buttons: Vec::new(),
            keepalive_sek: None,
            permit: Vec::new(),
            deny: Vec::new(),
            dnd_modus: DndMode::default(),
            default_leitung: None,
        }
    }

    /// Namen aller konfigurierten Leitungen in Tastenreihenfolge
    pub fn leitungen(&self) -> impl Iterator<Item = &LineName> {
        self.buttons.iter().filter_map(|b| match b {
            ButtonConfig::Line { name, .. } => Some(name),
            _ => None,
        })
    }
}

fn standard_wahr() -> bool {
    true
}

/// Leitungskonfiguration aus dem Host-Verzeichnis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    pub name: LineName,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub cid_name: String,
    #[serde(default)]
    pub cid_num: String,
    /// Mailbox-Nummer fuer die Voicemail-Taste
    #[serde(default)]
    pub voicemail: Option<String>,
    #[serde(default = "standard_wahr")]
    pub echo_cancel: bool,
    #[serde(default)]
    pub silence_suppression: bool,
    /// Hotline: beim Abheben sofort diese Nummer waehlen
    #[serde(default)]
    pub autodial: Option<String>,
}

impl LineConfig {
    pub fn neu(name: LineName) -> Self {
        Self {
            label: name.as_str().to_string(),
            cid_num: name.as_str().to_string(),
            name,
            cid_name: String::new(),
            voicemail: None,
            echo_cancel: true,
            silence_suppression: false,
            autodial: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Anruf-Typen
// ---------------------------------------------------------------------------

/// Richtung/Art eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Inbound,
    Outbound,
    Forward,
}

/// Anrufer-Information eines eingehenden Anrufs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerInfo {
    pub name: String,
    pub number: String,
    /// Gezielte Subscription auf einer geteilten Leitung
    pub subscription: Option<String>,
}

/// Anfrage an die Call-Control einen Anruf zu platzieren
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub call_id: CallId,
    pub device_id: Option<DeviceId>,
    pub line: LineName,
    pub number: String,
    pub caller: CallerInfo,
    pub richtung: CallDirection,
    /// Bei Weiterleitungen: Handle des urspruenglichen Anrufs
    pub parent: Option<OwnerHandle>,
}

/// Grund warum die Call-Control einen Anruf ablehnt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectCause {
    InvalidNumber,
    Busy,
    Congestion,
}

/// Grund fuer ein Auflegen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HangupCause {
    Normal,
    Busy,
    Congestion,
    InvalidNumber,
    /// Geraet verschwunden (Timeout, Abmeldung)
    DeviceGone,
    /// Alle Teilnehmer einer geteilten Leitung haben abgelehnt
    NoSubscriber,
    Weitergeleitet,
}

/// Call-Features die an die Call-Control delegiert werden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallFeature {
    Hold,
    Resume,
    Transfer,
    Conference,
    Park,
    Monitor(bool),
}

/// Vom Host ausgeloeste Anzeigen auf einem Kanal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostIndication {
    /// Gegenstelle wird gerufen
    Ringing,
    /// Anruf wird bearbeitet
    Progress,
    /// Gegenstelle hat angenommen
    Answered,
    Busy,
    Congestion,
    /// Gegenstelle hat gehalten/fortgesetzt
    Hold,
    Unhold,
}

/// Schluessel im Feature-Store: (Geraet, Leitung, Feature)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey {
    pub device: DeviceId,
    pub line: Option<LineName>,
    pub feature: String,
}

impl FeatureKey {
    pub fn geraet(device: &DeviceId, feature: &str) -> Self {
        Self {
            device: device.clone(),
            line: None,
            feature: feature.to_string(),
        }
    }

    pub fn leitung(device: &DeviceId, line: &LineName, feature: &str) -> Self {
        Self {
            device: device.clone(),
            line: Some(line.clone()),
            feature: feature.to_string(),
        }
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.line {
            Some(line) => write!(f, "{}/{}/{}", self.device, line, self.feature),
            None => write!(f, "{}/{}", self.device, self.feature),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Geraete- und Leitungsverzeichnis des Hosts
#[async_trait]
pub trait DeviceDirectory: Send + Sync + 'static {
    async fn geraet_suchen(&self, id: &DeviceId) -> Option<DeviceConfig>;
    async fn leitung_suchen(&self, name: &LineName) -> Option<LineConfig>;
}

/// Key/Value-Speicher fuer Feature-Status (eventual consistency genuegt)
#[async_trait]
pub trait FeatureStore: Send + Sync + 'static {
    async fn lesen(&self, key: &FeatureKey) -> Option<String>;
    /// `None` loescht den Eintrag
    async fn schreiben(&self, key: &FeatureKey, wert: Option<&str>);
}

/// Call-Routing/PBX des Hosts
#[async_trait]
pub trait CallControl: Send + Sync + 'static {
    /// Platziert einen Anruf fuer eine gewaehlte Nummer
    async fn anruf_platzieren(&self, anfrage: CallRequest) -> Result<OwnerHandle, RejectCause>;
    /// Ein Geraet hat einen eingehenden Anruf angenommen
    async fn angenommen(&self, owner: OwnerHandle);
    /// Der Kanal wurde auf Gateway-Seite beendet
    async fn aufgelegt(&self, owner: OwnerHandle, grund: HangupCause);
    /// DTMF-Ziffer waehrend eines verbundenen Anrufs
    async fn dtmf(&self, owner: OwnerHandle, ziffer: char);
    /// Call-Feature ausfuehren. `false` = nicht unterstuetzt
    async fn feature(&self, owner: OwnerHandle, feature: CallFeature) -> bool;
}

/// Media-Layer: liefert und empfaengt RTP-Endpunkte
#[async_trait]
pub trait MediaLayer: Send + Sync + 'static {
    /// Lokale RTP-Adresse, an die das Telefon senden soll
    async fn lokale_adresse(&self, call_id: CallId, video: bool) -> Option<SocketAddrV4>;
    /// Adresse, auf der das Telefon empfaengt
    async fn telefon_adresse(&self, call_id: CallId, video: bool, addr: SocketAddrV4);
    /// Alle RTP-Ressourcen des Kanals freigeben
    async fn freigeben(&self, call_id: CallId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_config_aus_toml() {
        let toml_text = r#"
            id = "SEP001122334455"
            beschreibung = "Empfang"

            [[buttons]]
            typ = "line"
            name = "100"

            [[buttons]]
            typ = "speed_dial"
            number = "200"
            label = "Chef"

            [[buttons]]
            typ = "feature"
            feature = "dnd"
        "#;
        let cfg: DeviceConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(cfg.buttons.len(), 3);
        assert_eq!(cfg.leitungen().count(), 1);
        assert_eq!(cfg.dnd_modus, DndMode::Reject);
        assert!(matches!(
            cfg.buttons[2],
            ButtonConfig::Feature { feature: FeatureKind::Dnd, .. }
        ));
    }

    #[test]
    fn line_config_standardwerte() {
        let cfg: LineConfig = toml::from_str(r#"name = "100""#).unwrap();
        assert!(cfg.echo_cancel);
        assert!(!cfg.silence_suppression);
        assert!(cfg.autodial.is_none());
    }

    #[test]
    fn feature_key_anzeige() {
        let dev = DeviceId::new("SEP1");
        let key = FeatureKey::leitung(&dev, &LineName::new("100"), "cfwd_all");
        assert_eq!(key.to_string(), "SEP1/100/cfwd_all");
        assert_eq!(FeatureKey::geraet(&dev, "dnd").to_string(), "SEP1/dnd");
    }
}
