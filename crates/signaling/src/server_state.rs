//! Gemeinsamer Gateway-Zustand fuer den Signaling-Service
//!
//! Haelt die Konfiguration, die Host-Kollaborateure, die Registries und
//! den Scheduler als Arc-Referenzen, die sicher zwischen tokio-Tasks
//! geteilt werden koennen.

use skinnygate_core::host::{
    CallControl, CallerInfo, DeviceDirectory, DndMode, FeatureStore, HangupCause, HostIndication,
    MediaLayer, RejectCause,
};
use skinnygate_core::{CallId, GatewayEvent, LineName, OwnerHandle};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::acl::Acl;
use crate::anruf;
use crate::registry::Registry;
use crate::scheduler::Scheduler;
use crate::snapshot::{Snapshot, Zaehler};

/// Kapazitaet des Event-Broadcast-Kanals
const EVENT_KANAL_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Keepalive-Takt und Toleranzfaktoren
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// Intervall, das dem Telefon im RegisterAck mitgeteilt wird
    pub intervall: Duration,
    /// Sekundaeres Intervall (Fallback-Server)
    pub sekundaer: Duration,
    pub multiplikator_unregistriert: u32,
    pub multiplikator_idle: u32,
    pub multiplikator_anruf: u32,
    /// Faktoren fuer akkubetriebene Handsets (7920/7921/7925/7926)
    pub low_power_idle: u32,
    pub low_power_anruf: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            intervall: Duration::from_secs(30),
            sekundaer: Duration::from_secs(60),
            multiplikator_unregistriert: 2,
            multiplikator_idle: 2,
            multiplikator_anruf: 3,
            low_power_idle: 3,
            low_power_anruf: 4,
        }
    }
}

/// Verhalten beim Waehlen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaehlConfig {
    /// Wartezeit nach jeder Ziffer
    pub ziffer_timeout: Duration,
    /// Wartezeit nach dem Abheben bis zur ersten Ziffer
    pub erste_ziffer_timeout: Duration,
    /// Zeichen, das sofort waehlt
    pub terminator: Option<char>,
    /// Terminator vor der Uebergabe an die Call-Control entfernen
    pub terminator_kuerzen: bool,
    /// Verzoegerung bis zum Auflegen nach einem Fehlerton
    pub fehler_auflegen: Duration,
    /// Klingeldauer bis zur Weiterleitung bei Nichtmelden
    pub cfwd_no_answer: Duration,
}

impl Default for WaehlConfig {
    fn default() -> Self {
        Self {
            ziffer_timeout: Duration::from_secs(5),
            erste_ziffer_timeout: Duration::from_secs(15),
            terminator: Some('#'),
            terminator_kuerzen: true,
            fehler_auflegen: Duration::from_secs(5),
            cfwd_no_answer: Duration::from_secs(20),
        }
    }
}

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Gateways (ConfigStat)
    pub server_name: String,
    /// Maximale gleichzeitige Sessions
    pub max_sessions: usize,
    /// Netz-ACL fuer neue Verbindungen
    pub acl: Acl,
    /// Hoechste Protokollversion die ausgehandelt wird
    pub max_protokoll_version: u8,
    /// Geraetetypen, die auf die niedrigste Version festgelegt werden
    pub legacy_pins: Vec<u32>,
    pub keepalive: KeepaliveConfig,
    pub waehlen: WaehlConfig,
    /// Unbekannte Geraete ohne Leitungen zulassen
    pub anonym: bool,
    /// Unbekannte Geraete mit dieser Hotline-Leitung zulassen
    pub hotline_leitung: Option<LineName>,
    /// DND-Verhalten fuer anonyme und Hotline-Geraete
    pub dnd_modus: DndMode,
    /// Datumsformat im RegisterAck
    pub datum_format: String,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Skinnygate".to_string(),
            max_sessions: 512,
            acl: Acl::offen(),
            max_protokoll_version: skinnygate_protocol::version::PRIMARY_MAX_VERSION,
            legacy_pins: vec![30008, 20000, 30007, 12],
            keepalive: KeepaliveConfig::default(),
            waehlen: WaehlConfig::default(),
            anonym: false,
            hotline_leitung: None,
            dnd_modus: DndMode::default(),
            datum_format: "D.M.Y".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Kollaborateure
// ---------------------------------------------------------------------------

/// Die vier Host-Schnittstellen, gebuendelt fuer `GatewayState::neu`
#[derive(Clone)]
pub struct Kollaborateure {
    pub verzeichnis: Arc<dyn DeviceDirectory>,
    pub features: Arc<dyn FeatureStore>,
    pub call_control: Arc<dyn CallControl>,
    pub media: Arc<dyn MediaLayer>,
}

// ---------------------------------------------------------------------------
// GatewayState
// ---------------------------------------------------------------------------

/// Gemeinsamer Gateway-Zustand (thread-safe, Arc-geteilt)
pub struct GatewayState {
    pub config: Arc<SignalingConfig>,
    pub verzeichnis: Arc<dyn DeviceDirectory>,
    pub features: Arc<dyn FeatureStore>,
    pub call_control: Arc<dyn CallControl>,
    pub media: Arc<dyn MediaLayer>,
    pub registry: Registry,
    pub scheduler: Scheduler,
    events: broadcast::Sender<GatewayEvent>,
    /// Startzeitpunkt (fuer Uptime-Berechnung)
    pub start_time: Instant,
    naechste_call_id: AtomicU32,
}

impl GatewayState {
    /// Erstellt einen neuen GatewayState
    pub fn neu(config: SignalingConfig, kollaborateure: Kollaborateure) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Arc::new(Self {
            config: Arc::new(config),
            verzeichnis: kollaborateure.verzeichnis,
            features: kollaborateure.features,
            call_control: kollaborateure.call_control,
            media: kollaborateure.media,
            registry: Registry::neu(),
            scheduler: Scheduler::neu(),
            events,
            start_time: Instant::now(),
            naechste_call_id: AtomicU32::new(1),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Abonniert den Event-Strom
    pub fn abonnieren(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Veroeffentlicht ein Ereignis (ohne Abonnenten wird es verworfen)
    pub(crate) fn melden(&self, event: GatewayEvent) {
        let _ = self.events.send(event);
    }

    /// Vergibt die naechste Call-ID (0 ist reserviert)
    pub(crate) fn call_id_vergeben(&self) -> CallId {
        loop {
            let id = self.naechste_call_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return CallId(id);
            }
        }
    }

    // --- Schnittstelle fuer die Call-Control des Hosts ---

    /// Bietet einen Anruf auf der Leitung `nummer` an
    ///
    /// Gibt die Call-ID des neuen Kanals zurueck. Lehnen alle Geraete einer
    /// geteilten Leitung ab, endet der Kanal in Busy bzw. Congestion.
    pub async fn eingehender_anruf(
        self: &Arc<Self>,
        nummer: &str,
        anrufer: CallerInfo,
        owner: OwnerHandle,
    ) -> Result<CallId, RejectCause> {
        anruf::eingehender_anruf(self, nummer, anrufer, owner).await
    }

    /// Die Gegenstelle eines abgehenden Anrufs hat angenommen
    pub async fn remote_angenommen(self: &Arc<Self>, call_id: CallId) -> bool {
        anruf::remote_angenommen(self, call_id).await
    }

    /// Der Host beendet einen Kanal
    pub async fn auflegen(self: &Arc<Self>, call_id: CallId, grund: HangupCause) {
        anruf::auflegen(self, call_id, grund, false).await
    }

    /// Host-Anzeige auf einem Kanal (Rufton, Besetzt, ...)
    pub async fn indizieren(self: &Arc<Self>, call_id: CallId, anzeige: HostIndication) {
        anruf::indizieren(self, call_id, anzeige).await
    }

    /// Waehlt sofort mit den bisher gesammelten Ziffern
    pub async fn softswitch(self: &Arc<Self>, call_id: CallId) {
        if let Some(kanal) = self.registry.kanal(call_id) {
            anruf::softswitch(self, &kanal).await;
        }
    }

    // --- Betrieb ---

    /// Stoppt alle Sessions (Shutdown)
    pub fn alle_sessions_stoppen(&self) {
        for session in self.registry.sessions() {
            session.stoppen(crate::session::StopCause::Shutdown);
        }
    }

    /// Kopie des aktuellen Zustands fuer Betriebswerkzeuge
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::erstellen(self)
    }

    /// Nur die Anzahlen (fuer Health-Checks)
    pub fn zaehler(&self) -> Zaehler {
        Zaehler {
            sessions: self.registry.session_anzahl(),
            geraete: self.registry.geraete_anzahl(),
            leitungen: self.registry.leitungen_anzahl(),
            kanaele: self.registry.kanal_anzahl(),
        }
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("config", &self.config)
            .field("zaehler", &self.zaehler())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_konfiguration() {
        let cfg = SignalingConfig::default();
        assert_eq!(cfg.max_protokoll_version, 22);
        assert_eq!(cfg.legacy_pins, vec![30008, 20000, 30007, 12]);
        assert_eq!(cfg.keepalive.multiplikator_unregistriert, 2);
        assert_eq!(cfg.waehlen.terminator, Some('#'));
        assert!(cfg.acl.ist_offen());
    }

    #[test]
    fn anruf_faktor_nie_kleiner_als_idle() {
        let k = KeepaliveConfig::default();
        assert!(k.multiplikator_anruf >= k.multiplikator_idle);
        assert!(k.low_power_anruf >= k.low_power_idle);
    }
}
