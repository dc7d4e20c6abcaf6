//! Einfache Host-Implementierungen
//!
//! Statisches Verzeichnis, Feature-Store im Speicher und ein Media-Layer,
//! der nur Adressen vergibt. Reichen fuer den Betrieb ohne externen Host
//! und fuer Tests.

use async_trait::async_trait;
use dashmap::DashMap;
use skinnygate_core::host::{DeviceConfig, DeviceDirectory, FeatureKey, FeatureStore, LineConfig, MediaLayer};
use skinnygate_core::{CallId, DeviceId, LineName};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Verzeichnis aus fest konfigurierten Geraeten und Leitungen
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    geraete: HashMap<DeviceId, DeviceConfig>,
    leitungen: HashMap<LineName, LineConfig>,
}

impl StaticDirectory {
    pub fn neu(
        geraete: impl IntoIterator<Item = DeviceConfig>,
        leitungen: impl IntoIterator<Item = LineConfig>,
    ) -> Self {
        Self {
            geraete: geraete.into_iter().map(|g| (g.id.clone(), g)).collect(),
            leitungen: leitungen.into_iter().map(|l| (l.name.clone(), l)).collect(),
        }
    }

    pub fn geraete_anzahl(&self) -> usize {
        self.geraete.len()
    }

    pub fn leitungen_anzahl(&self) -> usize {
        self.leitungen.len()
    }
}

#[async_trait]
impl DeviceDirectory for StaticDirectory {
    async fn geraet_suchen(&self, id: &DeviceId) -> Option<DeviceConfig> {
        self.geraete.get(id).cloned()
    }

    async fn leitung_suchen(&self, name: &LineName) -> Option<LineConfig> {
        self.leitungen.get(name).cloned()
    }
}

/// Feature-Store im Speicher (geht beim Neustart verloren)
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    werte: DashMap<FeatureKey, String>,
}

impl MemoryFeatureStore {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn anzahl(&self) -> usize {
        self.werte.len()
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn lesen(&self, key: &FeatureKey) -> Option<String> {
        self.werte.get(key).map(|w| w.value().clone())
    }

    async fn schreiben(&self, key: &FeatureKey, wert: Option<&str>) {
        match wert {
            Some(wert) => {
                self.werte.insert(key.clone(), wert.to_string());
            }
            None => {
                self.werte.remove(key);
            }
        }
        tracing::trace!(%key, ?wert, "Feature gespeichert");
    }
}

/// Media-Layer ohne RTP: vergibt pro Kanal ein Portpaar
///
/// Audio liegt auf `basis + 4 * call_id`, Video zwei Ports darueber.
#[derive(Debug)]
pub struct StaticMedia {
    ip: Ipv4Addr,
    basis_port: u16,
    telefone: DashMap<(CallId, bool), SocketAddrV4>,
}

impl StaticMedia {
    pub fn neu(ip: Ipv4Addr, basis_port: u16) -> Self {
        Self {
            ip,
            basis_port,
            telefone: DashMap::new(),
        }
    }

    /// Vom Telefon gemeldete Empfangsadresse
    pub fn telefon(&self, call_id: CallId, video: bool) -> Option<SocketAddrV4> {
        self.telefone.get(&(call_id, video)).map(|a| *a)
    }
}

#[async_trait]
impl MediaLayer for StaticMedia {
    async fn lokale_adresse(&self, call_id: CallId, video: bool) -> Option<SocketAddrV4> {
        let versatz = (call_id.inner() % 4096) * 4 + if video { 2 } else { 0 };
        let port = u32::from(self.basis_port) + versatz;
        let port = u16::try_from(port).ok()?;
        Some(SocketAddrV4::new(self.ip, port))
    }

    async fn telefon_adresse(&self, call_id: CallId, video: bool, addr: SocketAddrV4) {
        self.telefone.insert((call_id, video), addr);
    }

    async fn freigeben(&self, call_id: CallId) {
        self.telefone.remove(&(call_id, false));
        self.telefone.remove(&(call_id, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn feature_store_loescht_mit_none() {
        let store = MemoryFeatureStore::neu();
        let key = FeatureKey::geraet(&DeviceId::new("SEP1"), "dnd");
        store.schreiben(&key, Some("on")).await;
        assert_eq!(store.lesen(&key).await.as_deref(), Some("on"));
        store.schreiben(&key, None).await;
        assert!(store.lesen(&key).await.is_none());
    }

    #[tokio::test]
    async fn media_ports_pro_kanal() {
        let media = StaticMedia::neu(Ipv4Addr::LOCALHOST, 20000);
        let a = media.lokale_adresse(CallId(1), false).await.unwrap();
        let v = media.lokale_adresse(CallId(1), true).await.unwrap();
        assert_eq!(a.port(), 20004);
        assert_eq!(v.port(), 20006);

        let telefon = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 5), 24580);
        media.telefon_adresse(CallId(1), false, telefon).await;
        assert_eq!(media.telefon(CallId(1), false), Some(telefon));
        media.freigeben(CallId(1)).await;
        assert!(media.telefon(CallId(1), false).is_none());
    }

    #[tokio::test]
    async fn verzeichnis_sucht_nach_id() {
        let dir = StaticDirectory::neu(
            vec![DeviceConfig::neu(DeviceId::new("SEP1"))],
            vec![LineConfig::neu(LineName::new("100"))],
        );
        assert!(dir.geraet_suchen(&DeviceId::new("SEP1")).await.is_some());
        assert!(dir.geraet_suchen(&DeviceId::new("SEP2")).await.is_none());
        assert!(dir.leitung_suchen(&LineName::new("100")).await.is_some());
    }
}
