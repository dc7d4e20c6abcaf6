//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Gateway ohne Konfigurationsdatei
//! lauffaehig ist (dann allerdings ohne bekannte Geraete).

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use skinnygate_core::host::{DeviceConfig, DndMode, LineConfig};
use skinnygate_core::LineName;
use skinnygate_signaling::{Acl, KeepaliveConfig, SignalingConfig, WaehlConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Netz-ACL fuer neue Verbindungen
    pub acl: AclEinstellungen,
    /// Protokollversionen
    pub protokoll: ProtokollEinstellungen,
    pub keepalive: KeepaliveEinstellungen,
    pub waehlen: WaehlEinstellungen,
    /// Fallbacks fuer unbekannte Geraete
    pub features: FeatureEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Bekannte Geraete (`[[geraet]]`)
    #[serde(rename = "geraet")]
    pub geraete: Vec<DeviceConfig>,
    /// Bekannte Leitungen (`[[leitung]]`)
    #[serde(rename = "leitung")]
    pub leitungen: Vec<LineConfig>,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Gateways
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Sessions
    pub max_sessions: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Skinnygate".into(),
            max_sessions: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer Skinny und Observability
    pub bind_adresse: String,
    /// Skinny-Port (Standard: 2000)
    pub skinny_port: u16,
    /// Adresse, die den Telefonen als Media-Ziel genannt wird
    pub media_ip: Ipv4Addr,
    /// Erster RTP-Port des statischen Media-Layers
    pub media_basis_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            skinny_port: 2000,
            media_ip: Ipv4Addr::LOCALHOST,
            media_basis_port: 20000,
        }
    }
}

/// permit/deny-Netze in CIDR-Schreibweise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AclEinstellungen {
    pub permit: Vec<String>,
    pub deny: Vec<String>,
}

/// Protokoll-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtokollEinstellungen {
    /// Hoechste ausgehandelte SCCP-Version (3..=22)
    pub max_version: u8,
    /// Geraetetypen, die auf die niedrigste Version festgelegt werden
    pub legacy_pins: Vec<u32>,
}

impl Default for ProtokollEinstellungen {
    fn default() -> Self {
        Self {
            max_version: 22,
            legacy_pins: vec![30008, 20000, 30007, 12],
        }
    }
}

/// Keepalive-Takt und Toleranzfaktoren
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveEinstellungen {
    pub intervall_sek: u64,
    pub sekundaer_sek: u64,
    pub multiplikator_unregistriert: u32,
    pub multiplikator_idle: u32,
    pub multiplikator_anruf: u32,
    pub low_power_idle: u32,
    pub low_power_anruf: u32,
}

impl Default for KeepaliveEinstellungen {
    fn default() -> Self {
        Self {
            intervall_sek: 30,
            sekundaer_sek: 60,
            multiplikator_unregistriert: 2,
            multiplikator_idle: 2,
            multiplikator_anruf: 3,
            low_power_idle: 3,
            low_power_anruf: 4,
        }
    }
}

/// Waehlverhalten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaehlEinstellungen {
    pub ziffer_timeout_ms: u64,
    pub erste_ziffer_timeout_ms: u64,
    /// Leer = kein Terminator
    pub terminator: String,
    pub terminator_kuerzen: bool,
    pub fehler_auflegen_ms: u64,
    pub cfwd_no_answer_sek: u64,
}

impl Default for WaehlEinstellungen {
    fn default() -> Self {
        Self {
            ziffer_timeout_ms: 5000,
            erste_ziffer_timeout_ms: 15000,
            terminator: "#".into(),
            terminator_kuerzen: true,
            fehler_auflegen_ms: 5000,
            cfwd_no_answer_sek: 20,
        }
    }
}

/// Fallbacks fuer unbekannte Geraete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureEinstellungen {
    /// Unbekannte Geraete ohne Leitungen zulassen
    pub anonym: bool,
    /// Unbekannte Geraete mit dieser Leitung zulassen
    pub hotline_leitung: Option<String>,
    pub dnd_modus: DndMode,
    /// Datumsformat im RegisterAck
    pub datum_format: String,
}

impl Default for FeatureEinstellungen {
    fn default() -> Self {
        Self {
            anonym: false,
            hotline_leitung: None,
            dnd_modus: DndMode::default(),
            datum_format: "D.M.Y".into(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder EnvFilter-Ausdruck
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(inhalt)?)
    }

    /// Gibt die Bind-Adresse fuer den Skinny-Listener zurueck
    pub fn skinny_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.skinny_port);
        text.parse()
            .with_context(|| format!("ungueltige Bind-Adresse '{text}'"))
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port);
        text.parse()
            .with_context(|| format!("ungueltige Bind-Adresse '{text}'"))
    }

    /// Uebersetzt die Datei-Sicht in die Laufzeitkonfiguration des Signalings
    pub fn signaling_config(&self) -> anyhow::Result<SignalingConfig> {
        let max_version = self.protokoll.max_version;
        if !(3..=22).contains(&max_version) {
            bail!("protokoll.max_version {max_version} liegt ausserhalb von 3..=22");
        }

        let mut zeichen = self.waehlen.terminator.chars();
        let terminator = zeichen.next();
        if zeichen.next().is_some() {
            bail!(
                "waehlen.terminator '{}' ist laenger als ein Zeichen",
                self.waehlen.terminator
            );
        }

        let ka = &self.keepalive;
        if ka.intervall_sek == 0 {
            bail!("keepalive.intervall_sek darf nicht 0 sein");
        }
        if ka.multiplikator_anruf < ka.multiplikator_idle || ka.low_power_anruf < ka.low_power_idle {
            bail!("Keepalive-Faktor im Gespraech darf nicht kleiner als im Ruhezustand sein");
        }

        let acl = Acl::aus_listen(&self.acl.permit, &self.acl.deny)
            .map_err(|e| anyhow::anyhow!("ungueltige ACL: {e}"))?;

        Ok(SignalingConfig {
            server_name: self.server.name.clone(),
            max_sessions: self.server.max_sessions,
            acl,
            max_protokoll_version: max_version,
            legacy_pins: self.protokoll.legacy_pins.clone(),
            keepalive: KeepaliveConfig {
                intervall: Duration::from_secs(ka.intervall_sek),
                sekundaer: Duration::from_secs(ka.sekundaer_sek),
                multiplikator_unregistriert: ka.multiplikator_unregistriert,
                multiplikator_idle: ka.multiplikator_idle,
                multiplikator_anruf: ka.multiplikator_anruf,
                low_power_idle: ka.low_power_idle,
                low_power_anruf: ka.low_power_anruf,
            },
            waehlen: WaehlConfig {
                ziffer_timeout: Duration::from_millis(self.waehlen.ziffer_timeout_ms),
                erste_ziffer_timeout: Duration::from_millis(self.waehlen.erste_ziffer_timeout_ms),
                terminator,
                terminator_kuerzen: self.waehlen.terminator_kuerzen,
                fehler_auflegen: Duration::from_millis(self.waehlen.fehler_auflegen_ms),
                cfwd_no_answer: Duration::from_secs(self.waehlen.cfwd_no_answer_sek),
            },
            anonym: self.features.anonym,
            hotline_leitung: self.features.hotline_leitung.as_deref().map(LineName::new),
            dnd_modus: self.features.dnd_modus,
            datum_format: self.features.datum_format.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinnygate_core::host::ButtonConfig;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_sessions, 512);
        assert_eq!(cfg.netzwerk.skinny_port, 2000);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.geraete.is_empty());

        let signaling = cfg.signaling_config().unwrap();
        assert_eq!(signaling.max_protokoll_version, 22);
        assert_eq!(signaling.waehlen.terminator, Some('#'));
        assert_eq!(signaling.keepalive.intervall, Duration::from_secs(30));
        assert!(signaling.acl.ist_offen());
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(
            cfg.skinny_bind_adresse().unwrap(),
            "0.0.0.0:2000".parse().unwrap()
        );
        assert_eq!(
            cfg.observability_bind_adresse().unwrap(),
            "0.0.0.0:9300".parse().unwrap()
        );
    }

    #[test]
    fn config_aus_toml_string() {
        let cfg = ServerConfig::aus_toml(
            r#"
            [server]
            name = "Buero"

            [waehlen]
            ziffer_timeout_ms = 3000
            terminator = ""

            [acl]
            permit = ["192.168.0.0/16"]

            [features]
            hotline_leitung = "999"
            dnd_modus = "silent"

            [[leitung]]
            name = "100"
            label = "Empfang"

            [[geraet]]
            id = "SEP001122334455"

            [[geraet.buttons]]
            typ = "line"
            name = "100"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.name, "Buero");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.server.max_sessions, 512);
        assert_eq!(cfg.leitungen.len(), 1);
        assert_eq!(cfg.geraete.len(), 1);
        assert!(matches!(cfg.geraete[0].buttons[0], ButtonConfig::Line { .. }));

        let signaling = cfg.signaling_config().unwrap();
        assert_eq!(signaling.server_name, "Buero");
        assert_eq!(signaling.waehlen.ziffer_timeout, Duration::from_millis(3000));
        assert_eq!(signaling.waehlen.terminator, None);
        assert_eq!(signaling.hotline_leitung, Some(LineName::new("999")));
        assert_eq!(signaling.dnd_modus, DndMode::Silent);
        assert!(!signaling.acl.erlaubt("10.0.0.1".parse().unwrap()));
        assert!(signaling.acl.erlaubt("192.168.1.20".parse().unwrap()));
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.protokoll.max_version = 30;
        assert!(cfg.signaling_config().is_err());

        let mut cfg = ServerConfig::default();
        cfg.waehlen.terminator = "##".into();
        assert!(cfg.signaling_config().is_err());

        let mut cfg = ServerConfig::default();
        cfg.acl.deny = vec!["10.0.0.0/40".into()];
        assert!(cfg.signaling_config().is_err());

        let mut cfg = ServerConfig::default();
        cfg.keepalive.multiplikator_anruf = 1;
        assert!(cfg.signaling_config().is_err());
    }

    #[test]
    fn beispielkonfiguration_ist_gueltig() {
        let cfg = ServerConfig::aus_toml(include_str!("../../config.example.toml")).unwrap();
        assert_eq!(cfg.geraete.len(), 2);
        assert_eq!(cfg.geraete[0].buttons.len(), 3);
        assert_eq!(cfg.leitungen[0].voicemail.as_deref(), Some("8000"));
        cfg.signaling_config().unwrap();
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/nonexistent/skinnygate.toml").unwrap();
        assert_eq!(cfg.netzwerk.skinny_port, 2000);
    }
}
