//! Channel – ein Gespraechszweig
//!
//! ## Zustandsuebergaenge
//! ```text
//! Down -> OffHook -> GetDigits -> Dialing -> Proceed -> RingOut -> Connected
//! Down -> RingIn -> Connected | RingOut (Weiterleitung)
//! Connected <-> Hold, Connected -> CallTransfer | Conference
//! * -> Busy | Congestion | InvalidNumber -> OnHook
//! * -> Zombie -> Down
//! ```
//!
//! `uebergang` lehnt jede Kante ausserhalb dieser Tabelle mit einem
//! Zustandsfehler ab.

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use skinnygate_core::host::{CallDirection, CallerInfo};
use skinnygate_core::{CallId, DeviceId, LineName, OwnerHandle};
use std::net::SocketAddrV4;
use std::sync::{Arc, Weak};

use crate::device::Device;
use crate::error::{SignalingError, SignalingResult};
use crate::line::WeiterleitungsArt;

/// Zustand eines Kanals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChannelState {
    Down,
    OffHook,
    GetDigits,
    Dialing,
    Proceed,
    RingOut,
    RingIn,
    Connected,
    Hold,
    CallTransfer,
    Conference,
    Busy,
    Congestion,
    InvalidNumber,
    OnHook,
    /// Wird abgebaut, andere Teile halten noch Referenzen
    Zombie,
}

impl ChannelState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::OffHook => "offhook",
            Self::GetDigits => "getdigits",
            Self::Dialing => "dialing",
            Self::Proceed => "proceed",
            Self::RingOut => "ringout",
            Self::RingIn => "ringin",
            Self::Connected => "connected",
            Self::Hold => "hold",
            Self::CallTransfer => "calltransfer",
            Self::Conference => "conference",
            Self::Busy => "busy",
            Self::Congestion => "congestion",
            Self::InvalidNumber => "invalidnumber",
            Self::OnHook => "onhook",
            Self::Zombie => "zombie",
        }
    }

    pub fn ist_fehler(self) -> bool {
        matches!(self, Self::Busy | Self::Congestion | Self::InvalidNumber)
    }

    /// Ziffern werden gesammelt
    pub fn sammelt_ziffern(self) -> bool {
        matches!(self, Self::OffHook | Self::GetDigits)
    }

    /// Gespraech steht (Medien sind ausgehandelt oder werden es)
    pub fn ist_verbunden(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Hold | Self::CallTransfer | Self::Conference
        )
    }

    /// Erlaubte Kante im Zustandsgraphen
    pub fn erlaubt(self, ziel: ChannelState) -> bool {
        use ChannelState::*;
        if self == ziel {
            return false;
        }
        match (self, ziel) {
            (Zombie, Down) => true,
            (Zombie, _) => false,
            (Down, OffHook | RingIn | Dialing | Proceed | RingOut | Zombie) => true,
            (Down, _) => false,
            (_, Zombie) => true,
            (OnHook, Down) => true,
            (OnHook, _) => false,
            (_, OnHook | Down) => true,
            (OffHook, GetDigits | Dialing | Busy | Congestion | InvalidNumber) => true,
            (GetDigits, Dialing | Busy | Congestion | InvalidNumber) => true,
            (Dialing, Proceed | RingOut | Connected | Busy | Congestion | InvalidNumber) => true,
            (Proceed, RingOut | Connected | Busy | Congestion | InvalidNumber) => true,
            (RingOut, Connected | Busy | Congestion | InvalidNumber) => true,
            (RingIn, Connected | RingOut | Busy | Congestion | InvalidNumber) => true,
            (Connected, Hold | CallTransfer | Conference) => true,
            (Hold, Connected | CallTransfer) => true,
            (CallTransfer, Connected | Hold) => true,
            (Conference, Connected) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Zustand einer RTP-Richtung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MediaZustand {
    #[default]
    Inaktiv,
    /// Anfrage gesendet, Ack steht aus
    Ausstehend,
    Aktiv,
}

/// RTP-Aushandlung eines Kanals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Medien {
    pub rx_audio: MediaZustand,
    pub tx_audio: MediaZustand,
    pub rx_video: MediaZustand,
    pub tx_video: MediaZustand,
    /// Adresse auf der das Telefon empfaengt
    pub telefon: Option<SocketAddrV4>,
    /// Adresse an die das Telefon sendet
    pub remote: Option<SocketAddrV4>,
    pub codec: u32,
}

impl Medien {
    pub fn irgendwas_offen(&self) -> bool {
        [self.rx_audio, self.tx_audio, self.rx_video, self.tx_video]
            .iter()
            .any(|z| *z != MediaZustand::Inaktiv)
    }
}

/// Absagen der Geraete einer geteilten Leitung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Absagen {
    pub dnd: u32,
    /// Weiterleitung, fremde Subscription, keine Session, Ablehnen
    pub andere: u32,
}

impl Absagen {
    /// Besetzt nur wenn alle Absagen wegen DND kamen
    pub fn endzustand(&self) -> ChannelState {
        if self.dnd > 0 && self.andere == 0 {
            ChannelState::Busy
        } else {
            ChannelState::Congestion
        }
    }
}

/// Ein Geraet, dem ein eingehender Anruf angeboten wird
#[derive(Debug, Clone)]
pub struct Angebot {
    pub geraet: Weak<Device>,
    pub device_id: DeviceId,
    pub instance: u32,
}

/// Veraenderlicher Kanalzustand
#[derive(Debug, Clone)]
pub struct ChannelInner {
    pub zustand: ChannelState,
    pub geraet: Weak<Device>,
    pub device_id: Option<DeviceId>,
    pub instance: u32,
    pub ziffern: String,
    pub owner: Option<OwnerHandle>,
    pub parent: Option<CallId>,
    pub kinder: Vec<CallId>,
    /// Geraete einer geteilten Leitung, die noch klingeln
    pub abonnenten: u32,
    pub absagen: Absagen,
    pub anrufer: CallerInfo,
    pub angebote: Vec<Angebot>,
    pub medien: Medien,
    /// Ziffern setzen eine Weiterleitung statt zu waehlen
    pub cfwd_erfassung: Option<WeiterleitungsArt>,
    /// Ziel fuer eine Weiterleitung bei Nichtmelden
    pub cfwd_no_answer: Option<String>,
}

pub struct Channel {
    pub call_id: CallId,
    pub line: LineName,
    pub richtung: CallDirection,
    inner: Mutex<ChannelInner>,
}

impl Channel {
    pub fn neu(call_id: CallId, line: LineName, richtung: CallDirection) -> Arc<Self> {
        Arc::new(Self {
            call_id,
            line,
            richtung,
            inner: Mutex::new(ChannelInner {
                zustand: ChannelState::Down,
                geraet: Weak::new(),
                device_id: None,
                instance: 0,
                ziffern: String::new(),
                owner: None,
                parent: None,
                kinder: Vec::new(),
                abonnenten: 0,
                absagen: Absagen::default(),
                anrufer: CallerInfo::default(),
                angebote: Vec::new(),
                medien: Medien::default(),
                cfwd_erfassung: None,
                cfwd_no_answer: None,
            }),
        })
    }

    pub fn bearbeiten(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock()
    }

    pub fn zustand(&self) -> ChannelState {
        self.inner.lock().zustand
    }

    /// Wechselt den Zustand entlang einer erlaubten Kante
    ///
    /// Gibt den vorherigen Zustand zurueck.
    pub fn uebergang(&self, ziel: ChannelState) -> SignalingResult<ChannelState> {
        let mut g = self.inner.lock();
        let von = g.zustand;
        if !von.erlaubt(ziel) {
            return Err(SignalingError::zustand(format!(
                "{}: {von} -> {ziel} nicht erlaubt",
                self.call_id
            )));
        }
        g.zustand = ziel;
        tracing::debug!(call_id = %self.call_id, %von, nach = %ziel, "Kanalzustand");
        Ok(von)
    }

    pub fn pass_thru_party_id(&self) -> u32 {
        self.call_id.pass_thru_party_id()
    }

    /// Das Geraet auf dem der Kanal laeuft, falls noch vorhanden
    pub fn geraet(&self) -> Option<Arc<Device>> {
        self.inner.lock().geraet.upgrade()
    }

    pub fn geraet_setzen(&self, geraet: &Arc<Device>, instance: u32) {
        let mut g = self.inner.lock();
        g.geraet = Arc::downgrade(geraet);
        g.device_id = Some(geraet.id.clone());
        g.instance = instance;
    }

    pub fn instance(&self) -> u32 {
        self.inner.lock().instance
    }

    pub fn owner(&self) -> Option<OwnerHandle> {
        self.inner.lock().owner
    }

    /// Gehoert der Kanal zu diesem Geraet (laufend oder angeboten)
    pub fn betrifft(&self, geraet: &Arc<Device>) -> bool {
        let g = self.inner.lock();
        let laeuft = std::ptr::eq(g.geraet.as_ptr(), Arc::as_ptr(geraet));
        laeuft
            || g.angebote
                .iter()
                .any(|a| std::ptr::eq(a.geraet.as_ptr(), Arc::as_ptr(geraet)))
    }

    /// Instanz der Leitungstaste auf einem angebotenen Geraet
    pub fn angebot_instance(&self, geraet: &Arc<Device>) -> Option<u32> {
        self.inner
            .lock()
            .angebote
            .iter()
            .find(|a| std::ptr::eq(a.geraet.as_ptr(), Arc::as_ptr(geraet)))
            .map(|a| a.instance)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("call_id", &self.call_id)
            .field("line", &self.line)
            .field("zustand", &self.zustand())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChannelState::*;

    fn kanal() -> Arc<Channel> {
        Channel::neu(CallId(1), LineName::new("100"), CallDirection::Outbound)
    }

    #[test]
    fn abgehender_ablauf() {
        let k = kanal();
        for ziel in [OffHook, GetDigits, Dialing, Proceed, RingOut, Connected, Hold, Connected] {
            k.uebergang(ziel).unwrap();
        }
        assert_eq!(k.uebergang(OnHook).unwrap(), Connected);
        assert_eq!(k.uebergang(Down).unwrap(), OnHook);
    }

    #[test]
    fn ungueltige_kante_wird_abgelehnt() {
        let k = kanal();
        let err = k.uebergang(Connected).unwrap_err();
        assert!(matches!(err, SignalingError::Zustand(_)));
        assert_eq!(k.zustand(), Down);

        k.uebergang(OffHook).unwrap();
        assert!(k.uebergang(RingIn).is_err());
        assert!(k.uebergang(OffHook).is_err());
    }

    #[test]
    fn besetzt_nur_bei_reinen_dnd_absagen() {
        assert_eq!(Absagen { dnd: 2, andere: 0 }.endzustand(), Busy);
        assert_eq!(Absagen { dnd: 1, andere: 1 }.endzustand(), Congestion);
        assert_eq!(Absagen { dnd: 0, andere: 3 }.endzustand(), Congestion);
        assert_eq!(Absagen::default().endzustand(), Congestion);
    }

    #[test]
    fn zombie_fuehrt_nur_nach_down() {
        let k = kanal();
        k.uebergang(RingIn).unwrap();
        k.uebergang(Zombie).unwrap();
        assert!(k.uebergang(OnHook).is_err());
        assert!(k.uebergang(Connected).is_err());
        k.uebergang(Down).unwrap();
    }

    #[test]
    fn fehlerzustaende_enden_aufgelegt() {
        for fehler in [Busy, Congestion, InvalidNumber] {
            assert!(fehler.ist_fehler());
            assert!(fehler.erlaubt(OnHook));
            assert!(fehler.erlaubt(Zombie));
            assert!(!fehler.erlaubt(Connected));
        }
        assert!(Down.erlaubt(Zombie));
        assert!(!Down.erlaubt(OnHook));
        assert!(!Down.erlaubt(Busy));
    }

    #[test]
    fn pass_thru_id_kommt_aus_call_id() {
        let k = kanal();
        assert_eq!(k.pass_thru_party_id(), u32::MAX - 1);
    }
}
