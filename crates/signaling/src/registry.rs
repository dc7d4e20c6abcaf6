//! Globale Registries fuer Geraete, Leitungen, Kanaele und Sessions
//!
//! Geraete und Leitungen werden selten geschrieben und oft gelesen; sie
//! liegen hinter je einem RwLock. Kanaele und Sessions wechseln haeufig
//! und nutzen eine DashMap. Iterationen kopieren zuerst die Arcs und
//! arbeiten danach ohne Lock.

use dashmap::DashMap;
use parking_lot::RwLock;
use skinnygate_core::host::LineConfig;
use skinnygate_core::{CallId, DeviceId, LineName, SessionId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::channel::Channel;
use crate::device::Device;
use crate::line::Line;
use crate::session::Session;

pub struct Registry {
    geraete: RwLock<HashMap<DeviceId, Arc<Device>>>,
    leitungen: RwLock<HashMap<LineName, Arc<Line>>>,
    kanaele: DashMap<CallId, Arc<Channel>>,
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl Registry {
    pub fn neu() -> Self {
        Self {
            geraete: RwLock::new(HashMap::new()),
            leitungen: RwLock::new(HashMap::new()),
            kanaele: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    // --- Geraete ---

    pub fn geraet(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.geraete.read().get(id).cloned()
    }

    /// Fuegt ein Geraet ein und gibt ein verdraengtes zurueck
    pub fn geraet_einfuegen(&self, geraet: Arc<Device>) -> Option<Arc<Device>> {
        self.geraete.write().insert(geraet.id.clone(), geraet)
    }

    /// Entfernt genau dieses Geraet-Objekt (nicht einen Nachfolger gleicher ID)
    pub fn geraet_entfernen(&self, geraet: &Arc<Device>) -> bool {
        let mut geraete = self.geraete.write();
        match geraete.get(&geraet.id) {
            Some(vorhanden) if Arc::ptr_eq(vorhanden, geraet) => {
                geraete.remove(&geraet.id);
                true
            }
            _ => false,
        }
    }

    pub fn geraete(&self) -> Vec<Arc<Device>> {
        self.geraete.read().values().cloned().collect()
    }

    pub fn geraete_anzahl(&self) -> usize {
        self.geraete.read().len()
    }

    // --- Leitungen ---

    pub fn leitung(&self, name: &LineName) -> Option<Arc<Line>> {
        self.leitungen.read().get(name).cloned()
    }

    /// Liefert die bestehende Leitung oder legt sie mit `config` an
    pub fn leitung_oder_anlegen(&self, config: LineConfig) -> Arc<Line> {
        if let Some(line) = self.leitung(&config.name) {
            return line;
        }
        let mut leitungen = self.leitungen.write();
        Arc::clone(
            leitungen
                .entry(config.name.clone())
                .or_insert_with(|| Line::neu(config)),
        )
    }

    pub fn leitungen(&self) -> Vec<Arc<Line>> {
        self.leitungen.read().values().cloned().collect()
    }

    pub fn leitungen_anzahl(&self) -> usize {
        self.leitungen.read().len()
    }

    // --- Kanaele ---

    pub fn kanal(&self, id: CallId) -> Option<Arc<Channel>> {
        self.kanaele.get(&id).map(|k| Arc::clone(k.value()))
    }

    pub fn kanal_einfuegen(&self, kanal: Arc<Channel>) {
        self.kanaele.insert(kanal.call_id, kanal);
    }

    pub fn kanal_entfernen(&self, id: CallId) -> Option<Arc<Channel>> {
        self.kanaele.remove(&id).map(|(_, k)| k)
    }

    /// Sucht den Kanal zu einer Pass-Through-Party-ID aus einem Media-Ack
    pub fn kanal_per_pass_thru(&self, pass_thru_party_id: u32) -> Option<Arc<Channel>> {
        let kandidat = CallId(u32::MAX - pass_thru_party_id);
        self.kanal(kandidat)
            .filter(|k| k.pass_thru_party_id() == pass_thru_party_id)
    }

    pub fn kanaele(&self) -> Vec<Arc<Channel>> {
        self.kanaele.iter().map(|k| Arc::clone(k.value())).collect()
    }

    pub fn kanal_anzahl(&self) -> usize {
        self.kanaele.len()
    }

    // --- Sessions ---

    pub fn session_einfuegen(&self, session: Arc<Session>) {
        self.sessions.insert(session.id, session);
    }

    pub fn session_entfernen(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(&id).map(|(_, s)| s)
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| Arc::clone(s.value())).collect()
    }

    pub fn session_anzahl(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::neu()
    }
}
