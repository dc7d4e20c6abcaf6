//! Lokaler Loopback-Router
//!
//! Minimale Call-Control, damit der Gateway ohne externe Vermittlung
//! nutzbar ist: eine gewaehlte Nummer, die einer konfigurierten Leitung
//! entspricht, wird dort als eingehender Anruf angeboten. Annahme und
//! Auflegen werden zwischen den beiden Beinen gespiegelt. Media wird nicht
//! vermittelt.

use async_trait::async_trait;
use dashmap::DashMap;
use skinnygate_core::host::{
    CallControl, CallFeature, CallRequest, CallerInfo, HangupCause, HostIndication, RejectCause,
};
use skinnygate_core::{CallId, LineName, OwnerHandle};
use skinnygate_signaling::GatewayState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// Gegenueberliegendes Bein eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gegenstelle {
    owner: OwnerHandle,
    call_id: CallId,
}

pub struct LoopbackRouter {
    leitungen: HashSet<LineName>,
    gateway: OnceLock<Weak<GatewayState>>,
    /// Owner eines Beins -> anderes Bein
    beine: DashMap<OwnerHandle, Gegenstelle>,
    naechster_owner: AtomicU64,
}

impl LoopbackRouter {
    pub fn neu(leitungen: impl IntoIterator<Item = LineName>) -> Self {
        Self {
            leitungen: leitungen.into_iter().collect(),
            gateway: OnceLock::new(),
            beine: DashMap::new(),
            naechster_owner: AtomicU64::new(1),
        }
    }

    /// Verbindet den Router mit dem Gateway, der ihn als Call-Control nutzt
    pub fn verbinden(&self, gateway: &Arc<GatewayState>) {
        if self.gateway.set(Arc::downgrade(gateway)).is_err() {
            tracing::warn!("Loopback-Router ist bereits verbunden");
        }
    }

    pub fn offene_anrufe(&self) -> usize {
        self.beine.len() / 2
    }

    fn gateway(&self) -> Option<Arc<GatewayState>> {
        self.gateway.get().and_then(Weak::upgrade)
    }

    fn owner_vergeben(&self) -> OwnerHandle {
        OwnerHandle(self.naechster_owner.fetch_add(1, Ordering::Relaxed))
    }

    fn paar_entfernen(&self, owner: OwnerHandle) -> Option<Gegenstelle> {
        let (_, gegenstelle) = self.beine.remove(&owner)?;
        self.beine.remove(&gegenstelle.owner);
        Some(gegenstelle)
    }

    /// Bietet das zweite Bein an und verknuepft beide
    async fn zweites_bein(
        self: Arc<Self>,
        gateway: Arc<GatewayState>,
        a: Gegenstelle,
        nummer: String,
        anrufer: CallerInfo,
    ) {
        let b_owner = self.owner_vergeben();
        match gateway.eingehender_anruf(&nummer, anrufer, b_owner).await {
            Ok(b_call) => {
                // Anrufer hat waehrenddessen aufgelegt
                if gateway.registry.kanal(a.call_id).is_none() {
                    gateway.auflegen(b_call, HangupCause::Normal).await;
                    return;
                }
                let b = Gegenstelle {
                    owner: b_owner,
                    call_id: b_call,
                };
                self.beine.insert(a.owner, b);
                self.beine.insert(b.owner, a);
                tracing::debug!(
                    call_id = a.call_id.inner(),
                    gegenstelle = b_call.inner(),
                    nummer = %nummer,
                    "Loopback-Anruf verbunden"
                );
                gateway.indizieren(a.call_id, HostIndication::Ringing).await;
            }
            Err(grund) => {
                tracing::info!(nummer = %nummer, grund = ?grund, "Loopback-Ziel nicht erreichbar");
                let anzeige = match grund {
                    RejectCause::Busy => HostIndication::Busy,
                    RejectCause::InvalidNumber | RejectCause::Congestion => {
                        HostIndication::Congestion
                    }
                };
                gateway.indizieren(a.call_id, anzeige).await;
            }
        }
    }
}

/// `Arc`-Wrapper, damit der Router Tasks mit sich selbst starten kann
#[derive(Clone)]
pub struct LoopbackCallControl(pub Arc<LoopbackRouter>);

#[async_trait]
impl CallControl for LoopbackCallControl {
    async fn anruf_platzieren(&self, anfrage: CallRequest) -> Result<OwnerHandle, RejectCause> {
        let router = &self.0;
        let Some(gateway) = router.gateway() else {
            return Err(RejectCause::Congestion);
        };
        if !router.leitungen.contains(&LineName::new(anfrage.number.as_str())) {
            return Err(RejectCause::InvalidNumber);
        }

        let a = Gegenstelle {
            owner: router.owner_vergeben(),
            call_id: anfrage.call_id,
        };
        // Das zweite Bein erst anbieten, wenn der Anrufer sein Handle kennt
        tokio::spawn(Arc::clone(router).zweites_bein(
            gateway,
            a,
            anfrage.number,
            anfrage.caller,
        ));
        Ok(a.owner)
    }

    async fn angenommen(&self, owner: OwnerHandle) {
        let Some(gegenstelle) = self.0.beine.get(&owner).map(|g| *g) else {
            return;
        };
        if let Some(gateway) = self.0.gateway() {
            if !gateway.remote_angenommen(gegenstelle.call_id).await {
                tracing::debug!(call_id = gegenstelle.call_id.inner(), "Gegenstelle nicht mehr vorhanden");
            }
        }
    }

    async fn aufgelegt(&self, owner: OwnerHandle, grund: HangupCause) {
        let Some(gegenstelle) = self.0.paar_entfernen(owner) else {
            return;
        };
        let Some(gateway) = self.0.gateway() else {
            return;
        };
        match grund {
            HangupCause::Busy | HangupCause::NoSubscriber => {
                gateway.indizieren(gegenstelle.call_id, HostIndication::Busy).await
            }
            HangupCause::Congestion | HangupCause::InvalidNumber => {
                gateway
                    .indizieren(gegenstelle.call_id, HostIndication::Congestion)
                    .await
            }
            _ => gateway.auflegen(gegenstelle.call_id, HangupCause::Normal).await,
        }
    }

    async fn dtmf(&self, owner: OwnerHandle, ziffer: char) {
        tracing::trace!(owner = owner.0, ziffer = %ziffer, "DTMF ohne Media-Pfad verworfen");
    }

    async fn feature(&self, owner: OwnerHandle, feature: CallFeature) -> bool {
        let anzeige = match feature {
            CallFeature::Hold => HostIndication::Hold,
            CallFeature::Resume => HostIndication::Unhold,
            CallFeature::Monitor(_) => return true,
            CallFeature::Transfer | CallFeature::Conference | CallFeature::Park => return false,
        };
        let Some(gegenstelle) = self.0.beine.get(&owner).map(|g| *g) else {
            return false;
        };
        match self.0.gateway() {
            Some(gateway) => {
                gateway.indizieren(gegenstelle.call_id, anzeige).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinnygate_core::host::CallDirection;
    use skinnygate_signaling::{
        Kollaborateure, MemoryFeatureStore, SignalingConfig, StaticDirectory, StaticMedia,
    };
    use std::net::Ipv4Addr;

    fn anfrage(nummer: &str) -> CallRequest {
        CallRequest {
            call_id: CallId(77),
            device_id: None,
            line: LineName::new("100"),
            number: nummer.to_string(),
            caller: CallerInfo::default(),
            richtung: CallDirection::Outbound,
            parent: None,
        }
    }

    fn router_mit_gateway() -> (LoopbackCallControl, Arc<GatewayState>) {
        let router = Arc::new(LoopbackRouter::neu([LineName::new("200")]));
        let call_control = LoopbackCallControl(Arc::clone(&router));
        let state = GatewayState::neu(
            SignalingConfig::default(),
            Kollaborateure {
                verzeichnis: Arc::new(StaticDirectory::neu(vec![], vec![])),
                features: Arc::new(MemoryFeatureStore::neu()),
                call_control: Arc::new(call_control.clone()),
                media: Arc::new(StaticMedia::neu(Ipv4Addr::LOCALHOST, 20000)),
            },
        );
        router.verbinden(&state);
        (call_control, state)
    }

    #[tokio::test]
    async fn ohne_gateway_wird_abgelehnt() {
        let cc = LoopbackCallControl(Arc::new(LoopbackRouter::neu([LineName::new("200")])));
        assert_eq!(
            cc.anruf_platzieren(anfrage("200")).await,
            Err(RejectCause::Congestion)
        );
    }

    #[tokio::test]
    async fn unbekannte_nummer_ist_ungueltig() {
        let (cc, _state) = router_mit_gateway();
        assert_eq!(
            cc.anruf_platzieren(anfrage("555")).await,
            Err(RejectCause::InvalidNumber)
        );
    }

    #[tokio::test]
    async fn bekannte_nummer_liefert_eigenes_handle() {
        let (cc, _state) = router_mit_gateway();
        let erstes = cc.anruf_platzieren(anfrage("200")).await.unwrap();
        let zweites = cc.anruf_platzieren(anfrage("200")).await.unwrap();
        assert_ne!(erstes, zweites);
    }

    #[tokio::test]
    async fn auflegen_entfernt_beide_beine() {
        let (cc, _state) = router_mit_gateway();
        let router = &cc.0;
        let a = Gegenstelle {
            owner: OwnerHandle(1),
            call_id: CallId(10),
        };
        let b = Gegenstelle {
            owner: OwnerHandle(2),
            call_id: CallId(11),
        };
        router.beine.insert(a.owner, b);
        router.beine.insert(b.owner, a);
        assert_eq!(router.offene_anrufe(), 1);

        // Kanaele existieren nicht, das Spiegeln laeuft ins Leere
        cc.aufgelegt(OwnerHandle(2), HangupCause::Normal).await;
        assert_eq!(router.offene_anrufe(), 0);
        cc.aufgelegt(OwnerHandle(1), HangupCause::Normal).await;
    }

    #[tokio::test]
    async fn features_ohne_bruecke() {
        let (cc, _state) = router_mit_gateway();
        assert!(cc.feature(OwnerHandle(5), CallFeature::Monitor(true)).await);
        assert!(!cc.feature(OwnerHandle(5), CallFeature::Transfer).await);
        assert!(!cc.feature(OwnerHandle(5), CallFeature::Hold).await);
    }
}
