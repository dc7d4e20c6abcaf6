//! Device – ein registriertes Telefon
//!
//! ## Registrierungs-State-Machine
//! ```text
//! Unknown -> PendingToken -> PendingAuth -> Progress -> Ok -> Cleaning -> Gone
//!                                 |
//!                                 +-> Rejected
//! ```
//!
//! Der Feature-Status (DND, Privacy, Monitor, Prioritaetsmeldungen) liegt
//! hinter einem eigenen Mutex, getrennt vom uebrigen Geraetezustand und
//! vom Session-Lock. Die Rueckverbindung zur Session ist schwach.

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use skinnygate_core::host::{DeviceConfig, DndMode};
use skinnygate_core::{CallId, DeviceId, LineName};
use skinnygate_protocol::messages::{Capability, ClearPriNotify, DisplayPriNotify};
use skinnygate_protocol::{Family, Message};
use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};

use crate::button_template::Template;
use crate::error::SignalingResult;
use crate::modelle::{self, GeraeteKlasse};
use crate::session::Session;

/// Registrierungszustand eines Geraets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationState {
    Unknown,
    PendingToken,
    PendingAuth,
    Rejected,
    Progress,
    Ok,
    Cleaning,
    Gone,
}

/// Eintrag im Prioritaetsstapel der Statuszeile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrioMeldung {
    pub prioritaet: u32,
    pub text: String,
}

/// Feature-Status, getrennt vom restlichen Geraetezustand gesperrt
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureStatus {
    pub dnd: bool,
    pub dnd_modus: DndMode,
    pub privacy: bool,
    pub monitor: bool,
    /// Nach Prioritaet sortiert, kleinste Zahl = wichtigste Meldung
    pub prio_stapel: Vec<PrioMeldung>,
}

impl FeatureStatus {
    /// Legt eine Meldung ab (ersetzt eine mit gleicher Prioritaet)
    pub fn prio_setzen(&mut self, prioritaet: u32, text: impl Into<String>) {
        self.prio_stapel.retain(|m| m.prioritaet != prioritaet);
        self.prio_stapel.push(PrioMeldung {
            prioritaet,
            text: text.into(),
        });
        self.prio_stapel.sort_by_key(|m| m.prioritaet);
    }

    pub fn prio_entfernen(&mut self, prioritaet: u32) {
        self.prio_stapel.retain(|m| m.prioritaet != prioritaet);
    }

    pub fn prio_oben(&self) -> Option<&PrioMeldung> {
        self.prio_stapel.first()
    }

    /// Eingehende Anrufe werden wegen DND abgewiesen
    pub fn dnd_weist_ab(&self) -> bool {
        self.dnd && self.dnd_modus == DndMode::Reject
    }

    /// Eingehende Anrufe klingeln nicht hoerbar
    pub fn dnd_still(&self) -> bool {
        self.dnd && self.dnd_modus == DndMode::Silent
    }
}

/// Veraenderlicher Geraetezustand
#[derive(Debug, Clone)]
pub struct DeviceInner {
    pub zustand: RegistrationState,
    pub config: DeviceConfig,
    pub family: Family,
    pub version: u8,
    pub geraete_typ: u32,
    pub ip: Option<Ipv4Addr>,
    pub rtp_port: u32,
    pub firmware: String,
    pub codecs: Vec<Capability>,
    pub template: Template,
    /// Instanz der zuletzt benutzten Leitung
    pub aktive_leitung: Option<u32>,
    pub aktiver_kanal: Option<CallId>,
    /// Alle Kanaele, die auf diesem Geraet klingeln oder laufen
    pub kanaele: Vec<CallId>,
    pub headset: bool,
}

pub struct Device {
    pub id: DeviceId,
    inner: RwLock<DeviceInner>,
    features: Mutex<FeatureStatus>,
    session: RwLock<Weak<Session>>,
}

impl Device {
    pub fn neu(config: DeviceConfig, geraete_typ: u32, family: Family, version: u8) -> Arc<Self> {
        let template = Template::bauen(geraete_typ, &config.buttons);
        let features = FeatureStatus {
            dnd_modus: config.dnd_modus,
            ..FeatureStatus::default()
        };
        Arc::new(Self {
            id: config.id.clone(),
            inner: RwLock::new(DeviceInner {
                zustand: RegistrationState::Unknown,
                config,
                family,
                version,
                geraete_typ,
                ip: None,
                rtp_port: 0,
                firmware: String::new(),
                codecs: Vec::new(),
                template,
                aktive_leitung: None,
                aktiver_kanal: None,
                kanaele: Vec::new(),
                headset: false,
            }),
            features: Mutex::new(features),
            session: RwLock::new(Weak::new()),
        })
    }

    pub fn lesen(&self) -> RwLockReadGuard<'_, DeviceInner> {
        self.inner.read()
    }

    pub fn schreiben(&self) -> RwLockWriteGuard<'_, DeviceInner> {
        self.inner.write()
    }

    pub fn features(&self) -> MutexGuard<'_, FeatureStatus> {
        self.features.lock()
    }

    // --- Zustand ---

    pub fn zustand(&self) -> RegistrationState {
        self.inner.read().zustand
    }

    pub fn zustand_setzen(&self, neu: RegistrationState) {
        let mut g = self.inner.write();
        tracing::trace!(device = %self.id, von = ?g.zustand, nach = ?neu, "Registrierungszustand");
        g.zustand = neu;
    }

    pub fn geraete_typ(&self) -> u32 {
        self.inner.read().geraete_typ
    }

    pub fn hat_display(&self) -> bool {
        modelle::hat_display(self.geraete_typ())
    }

    pub fn klasse(&self) -> GeraeteKlasse {
        modelle::klasse(self.geraete_typ())
    }

    // --- Session ---

    /// Die gebundene Session, sofern sie noch existiert
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().upgrade()
    }

    pub fn session_setzen(&self, session: &Arc<Session>) {
        *self.session.write() = Arc::downgrade(session);
    }

    pub fn session_loesen(&self) {
        *self.session.write() = Weak::new();
    }

    /// Sendet ueber die gebundene Session; ohne Session ein No-op
    pub async fn senden_alle(&self, nachrichten: Vec<Message>) -> SignalingResult<()> {
        match self.session() {
            Some(session) => session.senden_alle(nachrichten).await,
            None => {
                tracing::trace!(device = %self.id, "Keine Session, Nachrichten verworfen");
                Ok(())
            }
        }
    }

    pub async fn senden(&self, msg: Message) -> SignalingResult<()> {
        self.senden_alle(vec![msg]).await
    }

    // --- Leitungen ---

    pub fn leitung_fuer_instance(&self, instance: u32) -> Option<LineName> {
        self.inner.read().template.leitung(instance).cloned()
    }

    pub fn instance_fuer_leitung(&self, leitung: &LineName) -> Option<u32> {
        self.inner.read().template.instance_von(leitung)
    }

    /// Leitung fuer Abheben ohne Leitungswahl
    ///
    /// Reihenfolge: aktive Leitung, konfigurierte Standardleitung, erste
    /// Leitungstaste.
    pub fn standard_leitung(&self) -> Option<(u32, LineName)> {
        let g = self.inner.read();
        let aktiv = g
            .aktive_leitung
            .and_then(|i| g.template.leitung(i).map(|n| (i, n.clone())));
        let konfiguriert = || {
            g.config.default_leitung.as_ref().and_then(|name| {
                g.template
                    .instance_von(name)
                    .map(|i| (i, name.clone()))
            })
        };
        let erste = || {
            g.template
                .leitungen()
                .next()
                .map(|(i, n, _)| (i, n.clone()))
        };
        aktiv.or_else(konfiguriert).or_else(erste)
    }

    // --- Kanaele ---

    /// Traegt einen Kanal ein. `true` wenn das Geraet vorher frei war
    pub fn kanal_hinzufuegen(&self, call_id: CallId) -> bool {
        let mut g = self.inner.write();
        let war_frei = g.kanaele.is_empty();
        if !g.kanaele.contains(&call_id) {
            g.kanaele.push(call_id);
        }
        war_frei && !g.kanaele.is_empty()
    }

    /// Traegt einen Kanal aus. `true` wenn das Geraet danach frei ist
    pub fn kanal_entfernen(&self, call_id: CallId) -> bool {
        let mut g = self.inner.write();
        let vorher = g.kanaele.len();
        g.kanaele.retain(|c| *c != call_id);
        if g.aktiver_kanal == Some(call_id) {
            g.aktiver_kanal = None;
        }
        vorher > 0 && g.kanaele.is_empty()
    }

    pub fn kanaele(&self) -> Vec<CallId> {
        self.inner.read().kanaele.clone()
    }

    pub fn im_anruf(&self) -> bool {
        !self.inner.read().kanaele.is_empty()
    }

    pub fn aktiver_kanal(&self) -> Option<CallId> {
        self.inner.read().aktiver_kanal
    }

    pub fn aktiv_setzen(&self, call_id: CallId, instance: u32) {
        let mut g = self.inner.write();
        g.aktiver_kanal = Some(call_id);
        g.aktive_leitung = Some(instance);
    }

    // --- Prioritaetsmeldungen ---

    /// Nachricht fuer den aktuellen Stand des Prioritaetsstapels
    pub fn prio_nachricht(&self, entfernt: Option<u32>) -> Option<Message> {
        let features = self.features.lock();
        match (features.prio_oben(), entfernt) {
            (Some(oben), _) => Some(Message::DisplayPriNotify(DisplayPriNotify {
                timeout: 0,
                priority: oben.prioritaet,
                text: oben.text.clone(),
            })),
            (None, Some(priority)) => Some(Message::ClearPriNotify(ClearPriNotify { priority })),
            (None, None) => None,
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("zustand", &self.zustand())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinnygate_core::host::ButtonConfig;

    fn geraet_mit_leitungen(namen: &[&str]) -> Arc<Device> {
        let mut cfg = DeviceConfig::neu(DeviceId::new("SEP0011"));
        cfg.buttons = namen
            .iter()
            .map(|n| ButtonConfig::Line {
                name: LineName::new(*n),
                label: None,
                subscription: None,
            })
            .collect();
        Device::neu(cfg, modelle::TYP_7960, Family::Primary, 11)
    }

    #[test]
    fn standard_leitung_reihenfolge() {
        let g = geraet_mit_leitungen(&["100", "101"]);
        assert_eq!(g.standard_leitung(), Some((1, LineName::new("100"))));

        g.schreiben().config.default_leitung = Some(LineName::new("101"));
        assert_eq!(g.standard_leitung(), Some((2, LineName::new("101"))));

        g.aktiv_setzen(CallId(9), 1);
        assert_eq!(g.standard_leitung(), Some((1, LineName::new("100"))));
    }

    #[test]
    fn kanal_zaehlung_meldet_wechsel() {
        let g = geraet_mit_leitungen(&["100"]);
        assert!(g.kanal_hinzufuegen(CallId(1)));
        assert!(!g.kanal_hinzufuegen(CallId(2)));
        g.aktiv_setzen(CallId(2), 1);
        assert!(!g.kanal_entfernen(CallId(2)));
        assert_eq!(g.aktiver_kanal(), None);
        assert!(g.kanal_entfernen(CallId(1)));
        assert!(!g.im_anruf());
    }

    #[test]
    fn prio_stapel_zeigt_wichtigste_meldung() {
        let g = geraet_mit_leitungen(&[]);
        g.features().prio_setzen(5, "Forward");
        g.features().prio_setzen(2, "DND");
        assert!(matches!(
            g.prio_nachricht(None),
            Some(Message::DisplayPriNotify(ref m)) if m.text == "DND" && m.priority == 2
        ));
        g.features().prio_entfernen(2);
        g.features().prio_entfernen(5);
        assert!(matches!(
            g.prio_nachricht(Some(5)),
            Some(Message::ClearPriNotify(ClearPriNotify { priority: 5 }))
        ));
        assert!(g.prio_nachricht(None).is_none());
    }

    #[test]
    fn dnd_modus_aus_konfiguration() {
        let mut cfg = DeviceConfig::neu(DeviceId::new("SEP1"));
        cfg.dnd_modus = DndMode::Silent;
        let g = Device::neu(cfg, modelle::TYP_7960, Family::Primary, 11);
        g.features().dnd = true;
        assert!(g.features().dnd_still());
        assert!(!g.features().dnd_weist_ab());
    }
}
