//! Line – eine waehlbare Rufnummer, geteilt von beliebig vielen Geraeten
//!
//! Die Zuordnung Leitung <-> Geraet ist ein `LineDevice` mit der Instanz
//! der Leitungstaste und dem Weiterleitungsstatus dieses Geraets.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use skinnygate_core::host::LineConfig;
use skinnygate_core::{CallId, DeviceId, LineName};
use skinnygate_protocol::messages::ForwardStat;
use std::sync::{Arc, Weak};

use crate::device::Device;

/// Art der Rufweiterleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WeiterleitungsArt {
    Alle,
    Besetzt,
    KeineAntwort,
}

impl WeiterleitungsArt {
    /// Schluessel im Feature-Store
    pub fn schluessel(self) -> &'static str {
        match self {
            Self::Alle => "cfwd_all",
            Self::Besetzt => "cfwd_busy",
            Self::KeineAntwort => "cfwd_noanswer",
        }
    }

    pub const ALLE: [WeiterleitungsArt; 3] = [Self::Alle, Self::Besetzt, Self::KeineAntwort];
}

/// Weiterleitungsziele eines Geraets auf einer Leitung
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Forward {
    pub alle: Option<String>,
    pub besetzt: Option<String>,
    pub keine_antwort: Option<String>,
}

impl Forward {
    pub fn ziel(&self, art: WeiterleitungsArt) -> Option<&String> {
        match art {
            WeiterleitungsArt::Alle => self.alle.as_ref(),
            WeiterleitungsArt::Besetzt => self.besetzt.as_ref(),
            WeiterleitungsArt::KeineAntwort => self.keine_antwort.as_ref(),
        }
    }

    pub fn setzen(&mut self, art: WeiterleitungsArt, ziel: Option<String>) {
        let feld = match art {
            WeiterleitungsArt::Alle => &mut self.alle,
            WeiterleitungsArt::Besetzt => &mut self.besetzt,
            WeiterleitungsArt::KeineAntwort => &mut self.keine_antwort,
        };
        *feld = ziel.filter(|z| !z.is_empty());
    }

    pub fn aktiv(&self) -> bool {
        self.alle.is_some() || self.besetzt.is_some() || self.keine_antwort.is_some()
    }

    /// Draht-Darstellung fuer eine Leitungsinstanz
    pub fn nachricht(&self, line_number: u32) -> ForwardStat {
        ForwardStat {
            line_number,
            all: self.alle.clone(),
            busy: self.besetzt.clone(),
            no_answer: self.keine_antwort.clone(),
        }
    }
}

/// Zuordnung eines Geraets zu einer Leitung
#[derive(Debug, Clone)]
pub struct LineDevice {
    pub geraet: Weak<Device>,
    pub device_id: DeviceId,
    /// Instanz der Leitungstaste auf diesem Geraet
    pub instance: u32,
    pub subscription: Option<String>,
    pub weiterleitung: Forward,
}

pub struct Line {
    pub name: LineName,
    config: RwLock<LineConfig>,
    geraete: RwLock<Vec<LineDevice>>,
    kanaele: Mutex<Vec<CallId>>,
}

impl Line {
    pub fn neu(config: LineConfig) -> Arc<Self> {
        Arc::new(Self {
            name: config.name.clone(),
            config: RwLock::new(config),
            geraete: RwLock::new(Vec::new()),
            kanaele: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> LineConfig {
        self.config.read().clone()
    }

    pub fn config_setzen(&self, config: LineConfig) {
        *self.config.write() = config;
    }

    // --- Geraete ---

    /// Haengt ein Geraet an (ersetzt eine alte Zuordnung derselben ID)
    pub fn geraet_anhaengen(
        &self,
        geraet: &Arc<Device>,
        instance: u32,
        subscription: Option<String>,
    ) {
        let mut geraete = self.geraete.write();
        geraete.retain(|ld| ld.device_id != geraet.id);
        geraete.push(LineDevice {
            geraet: Arc::downgrade(geraet),
            device_id: geraet.id.clone(),
            instance,
            subscription,
            weiterleitung: Forward::default(),
        });
    }

    /// Loest nur die Zuordnung genau dieses Geraet-Objekts
    pub fn geraet_loesen(&self, geraet: &Arc<Device>) {
        self.geraete.write().retain(|ld| {
            ld.device_id != geraet.id || !std::ptr::eq(ld.geraet.as_ptr(), Arc::as_ptr(geraet))
        });
    }

    pub fn geraete(&self) -> Vec<LineDevice> {
        self.geraete.read().clone()
    }

    pub fn geraete_anzahl(&self) -> usize {
        self.geraete.read().len()
    }

    pub fn weiterleitung(&self, device_id: &DeviceId) -> Forward {
        self.geraete
            .read()
            .iter()
            .find(|ld| &ld.device_id == device_id)
            .map(|ld| ld.weiterleitung.clone())
            .unwrap_or_default()
    }

    /// Setzt ein Weiterleitungsziel. `false` wenn das Geraet nicht angehaengt ist
    pub fn weiterleitung_setzen(
        &self,
        device_id: &DeviceId,
        art: WeiterleitungsArt,
        ziel: Option<String>,
    ) -> bool {
        let mut geraete = self.geraete.write();
        match geraete.iter_mut().find(|ld| &ld.device_id == device_id) {
            Some(ld) => {
                ld.weiterleitung.setzen(art, ziel);
                true
            }
            None => false,
        }
    }

    // --- Kanaele ---

    pub fn kanal_hinzufuegen(&self, call_id: CallId) {
        let mut kanaele = self.kanaele.lock();
        if !kanaele.contains(&call_id) {
            kanaele.push(call_id);
        }
    }

    pub fn kanal_entfernen(&self, call_id: CallId) {
        self.kanaele.lock().retain(|c| *c != call_id);
    }

    pub fn kanaele(&self) -> Vec<CallId> {
        self.kanaele.lock().clone()
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("name", &self.name)
            .field("geraete", &self.geraete_anzahl())
            .finish_non_exhaustive()
    }
}
