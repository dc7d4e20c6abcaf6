//! Softkey- und Stimulus-Dispatch
//!
//! Ein Ereigniscode wird pro Geraeteklasse auf einen Handler abgebildet.
//! Handler mit `benoetigt_kanal` werden ohne Kanal abgewiesen: Zustandsfehler
//! plus kurzer Hinweis und Ton auf dem Telefon.

use futures_util::future::{BoxFuture, FutureExt};
use skinnygate_core::host::{CallFeature, FeatureKey, HangupCause};
use skinnygate_protocol::enums::{ButtonType, KeyMode, SoftKeyEvent, Tone};
use skinnygate_protocol::messages::{
    DisplayNotify, LineRef, SoftKeyDefinition, SoftKeySet, SoftKeySetRes, SoftKeyTemplateRes,
    StartTone, SOFTKEYS_PER_SET,
};
use skinnygate_protocol::Message;
use std::sync::Arc;

use crate::anruf;
use crate::channel::{Channel, ChannelState};
use crate::device::Device;
use crate::error::{SignalingError, SignalingResult};
use crate::features::{self, Schalter};
use crate::line::{Line, WeiterleitungsArt};
use crate::modelle::GeraeteKlasse;
use crate::server_state::GatewayState;

/// Dauer eines Hinweises in Sekunden
const HINWEIS_SEK: u32 = 5;

/// Alles, was ein Softkey-Handler sehen darf
#[derive(Clone)]
pub struct SoftkeyKontext {
    pub state: Arc<GatewayState>,
    pub geraet: Arc<Device>,
    pub leitung: Option<Arc<Line>>,
    /// Leitungs- bzw. Tasteninstanz aus der Nachricht
    pub instance: u32,
    pub kanal: Option<Arc<Channel>>,
}

pub type SoftkeyHandler = fn(SoftkeyKontext) -> BoxFuture<'static, SignalingResult<()>>;

#[derive(Clone, Copy)]
pub struct SoftkeyEintrag {
    pub name: &'static str,
    pub handler: SoftkeyHandler,
    pub benoetigt_kanal: bool,
}

impl std::fmt::Debug for SoftkeyEintrag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftkeyEintrag")
            .field("name", &self.name)
            .field("benoetigt_kanal", &self.benoetigt_kanal)
            .finish()
    }
}

const fn eintrag(name: &'static str, handler: SoftkeyHandler, benoetigt_kanal: bool) -> SoftkeyEintrag {
    SoftkeyEintrag {
        name,
        handler,
        benoetigt_kanal,
    }
}

// ---------------------------------------------------------------------------
// Tabellen
// ---------------------------------------------------------------------------

fn standard_softkey(event: SoftKeyEvent) -> Option<SoftkeyEintrag> {
    use SoftKeyEvent as E;
    let e = match event {
        E::Redial => eintrag("redial", |k| redial(k).boxed(), false),
        E::NewCall => eintrag("newcall", |k| newcall(k).boxed(), false),
        E::Hold => eintrag("hold", |k| call_feature(k, CallFeature::Hold).boxed(), true),
        E::Resume => eintrag("resume", |k| call_feature(k, CallFeature::Resume).boxed(), true),
        E::Transfer => eintrag("transfer", |k| call_feature(k, CallFeature::Transfer).boxed(), true),
        E::Conference => eintrag("conference", |k| call_feature(k, CallFeature::Conference).boxed(), true),
        E::Park => eintrag("park", |k| call_feature(k, CallFeature::Park).boxed(), true),
        E::CfwdAll => eintrag("cfwd_all", |k| weiterleitung(k, WeiterleitungsArt::Alle).boxed(), false),
        E::CfwdBusy => eintrag("cfwd_busy", |k| weiterleitung(k, WeiterleitungsArt::Besetzt).boxed(), false),
        E::CfwdNoAnswer => eintrag(
            "cfwd_noanswer",
            |k| weiterleitung(k, WeiterleitungsArt::KeineAntwort).boxed(),
            false,
        ),
        E::BackSpace => eintrag("backspace", |k| backspace(k).boxed(), true),
        E::EndCall => eintrag("endcall", |k| endcall(k).boxed(), true),
        E::Answer => eintrag("answer", |k| answer(k).boxed(), false),
        E::Dial => eintrag("dial", |k| dial(k).boxed(), true),
        E::Dnd => eintrag("dnd", |k| schalter(k, Schalter::Dnd).boxed(), false),
        E::Privacy => eintrag("privacy", |k| schalter(k, Schalter::Privacy).boxed(), false),
        E::Monitor => eintrag("monitor", |k| monitor(k).boxed(), false),
        E::Info | E::Join | E::MeetMe | E::Pickup | E::GroupPickup => return None,
    };
    Some(e)
}

/// Eingeschraenkte Geraete kennen nur die Grundfunktionen
fn eingeschraenkt_erlaubt(event: SoftKeyEvent) -> bool {
    use SoftKeyEvent as E;
    matches!(
        event,
        E::Redial | E::NewCall | E::Hold | E::Resume | E::Transfer | E::BackSpace | E::EndCall
            | E::Answer | E::Dial
    )
}

/// Handler fuer einen Softkey-Code
pub fn aufloesen(klasse: GeraeteKlasse, event: SoftKeyEvent) -> Option<SoftkeyEintrag> {
    match klasse {
        GeraeteKlasse::Standard => standard_softkey(event),
        GeraeteKlasse::Eingeschraenkt if eingeschraenkt_erlaubt(event) => standard_softkey(event),
        GeraeteKlasse::Eingeschraenkt => None,
    }
}

/// Handler fuer eine Tastenbetaetigung (Stimulus)
pub fn stimulus_aufloesen(klasse: GeraeteKlasse, taste: ButtonType) -> Option<SoftkeyEintrag> {
    use ButtonType as B;
    let e = match taste {
        B::Line => eintrag("line", |k| line_taste(k).boxed(), false),
        B::SpeedDial => eintrag("speeddial", |k| speeddial(k).boxed(), false),
        B::LastNumberRedial => eintrag("redial", |k| redial(k).boxed(), false),
        B::Voicemail => eintrag("voicemail", |k| voicemail(k).boxed(), false),
        B::Hold => eintrag("hold", |k| call_feature(k, CallFeature::Hold).boxed(), true),
        B::Transfer => eintrag("transfer", |k| call_feature(k, CallFeature::Transfer).boxed(), true),
        B::Conference => eintrag("conference", |k| call_feature(k, CallFeature::Conference).boxed(), true),
        B::CallPark => eintrag("park", |k| call_feature(k, CallFeature::Park).boxed(), true),
        B::ForwardAll => eintrag("cfwd_all", |k| weiterleitung(k, WeiterleitungsArt::Alle).boxed(), false),
        B::ForwardBusy => eintrag("cfwd_busy", |k| weiterleitung(k, WeiterleitungsArt::Besetzt).boxed(), false),
        B::ForwardNoAnswer => eintrag(
            "cfwd_noanswer",
            |k| weiterleitung(k, WeiterleitungsArt::KeineAntwort).boxed(),
            false,
        ),
        B::Dnd => eintrag("dnd", |k| schalter(k, Schalter::Dnd).boxed(), false),
        B::Privacy => eintrag("privacy", |k| schalter(k, Schalter::Privacy).boxed(), false),
        B::Monitor => eintrag("monitor", |k| monitor(k).boxed(), false),
        B::Display | B::ServiceUrl | B::CallPickup | B::Undefined => return None,
    };
    let erlaubt = match klasse {
        GeraeteKlasse::Standard => true,
        GeraeteKlasse::Eingeschraenkt => matches!(
            taste,
            B::Line | B::SpeedDial | B::LastNumberRedial | B::Voicemail | B::Hold | B::Transfer
        ),
    };
    erlaubt.then_some(e)
}

/// Fuehrt einen aufgeloesten Eintrag aus
pub async fn ausfuehren(eintrag: SoftkeyEintrag, kontext: SoftkeyKontext) -> SignalingResult<()> {
    if eintrag.benoetigt_kanal && kontext.kanal.is_none() {
        hinweis(&kontext.geraet, "No active call", Some(Tone::Zip)).await;
        return Err(SignalingError::zustand(format!(
            "{} braucht einen Kanal",
            eintrag.name
        )));
    }
    tracing::debug!(device = %kontext.geraet.id, softkey = eintrag.name, instance = kontext.instance, "Softkey");
    (eintrag.handler)(kontext).await
}

/// Kurzer Hinweis in der Statuszeile, optional mit Ton
async fn hinweis(geraet: &Device, text: &str, ton: Option<Tone>) {
    let mut nachrichten = Vec::with_capacity(2);
    if geraet.hat_display() {
        nachrichten.push(Message::DisplayNotify(DisplayNotify {
            timeout: HINWEIS_SEK,
            text: text.to_string(),
        }));
    }
    if let Some(tone) = ton {
        nachrichten.push(Message::StartTone(StartTone {
            tone,
            line_instance: 0,
            call_reference: 0,
        }));
    }
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "Hinweis nicht gesendet");
    }
}

/// Meldet einen abgewiesenen Bedienschritt am Telefon
///
/// Zustands- und Ressourcenfehler bekommen Hinweis plus Reorder-Ton, alles
/// andere wird nur protokolliert.
pub(crate) async fn abweisung_melden(geraet: &Device, fehler: &SignalingError) {
    let text = match fehler {
        SignalingError::Zustand(_) => "Not available",
        SignalingError::Ressource(_) => "Line unavailable",
        _ => return,
    };
    hinweis(geraet, text, Some(Tone::Reorder)).await;
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Kanal der gerade Ziffern sammelt, sonst ein neuer
async fn waehlbereiter_kanal(k: &SoftkeyKontext) -> SignalingResult<Arc<Channel>> {
    if let Some(kanal) = k.kanal.as_ref().filter(|c| c.zustand().sammelt_ziffern()) {
        return Ok(Arc::clone(kanal));
    }
    let instance = k
        .leitung
        .as_ref()
        .and_then(|l| k.geraet.instance_fuer_leitung(&l.name));
    anruf::neuer_anruf(&k.state, &k.geraet, instance).await
}

async fn nummer_waehlen(k: SoftkeyKontext, nummer: String) -> SignalingResult<()> {
    let kanal = waehlbereiter_kanal(&k).await?;
    anruf::nummer_waehlen(&k.state, &kanal, &nummer).await;
    Ok(())
}

async fn redial(k: SoftkeyKontext) -> SignalingResult<()> {
    let leitung = match &k.leitung {
        Some(l) => l.name.clone(),
        None => match k.geraet.standard_leitung() {
            Some((_, name)) => name,
            None => return Err(SignalingError::zustand("keine Leitung fuer Wahlwiederholung")),
        },
    };
    let nummer = k
        .state
        .features
        .lesen(&FeatureKey::leitung(&k.geraet.id, &leitung, anruf::LAST_DIALED))
        .await
        .filter(|n| !n.is_empty());
    match nummer {
        Some(nummer) => nummer_waehlen(k, nummer).await,
        None => {
            hinweis(&k.geraet, "No number to redial", Some(Tone::Zip)).await;
            Ok(())
        }
    }
}

async fn newcall(k: SoftkeyKontext) -> SignalingResult<()> {
    if let Some(kanal) = k.kanal.as_ref().filter(|c| c.zustand() == ChannelState::Connected) {
        anruf::feature_ausfuehren(&k.state, kanal, CallFeature::Hold).await?;
    }
    let instance = k
        .leitung
        .as_ref()
        .and_then(|l| k.geraet.instance_fuer_leitung(&l.name));
    anruf::neuer_anruf(&k.state, &k.geraet, instance).await?;
    Ok(())
}

async fn call_feature(k: SoftkeyKontext, feature: CallFeature) -> SignalingResult<()> {
    let kanal = k
        .kanal
        .as_ref()
        .ok_or_else(|| SignalingError::zustand("kein Kanal"))?;
    match anruf::feature_ausfuehren(&k.state, kanal, feature).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            hinweis(&k.geraet, "Not available", Some(Tone::Zip)).await;
            Ok(())
        }
        Err(e) => {
            hinweis(&k.geraet, "Not available", Some(Tone::Zip)).await;
            Err(e)
        }
    }
}

/// Weiterleitung umschalten: aktiv -> loeschen, sonst Ziel erfassen
async fn weiterleitung(k: SoftkeyKontext, art: WeiterleitungsArt) -> SignalingResult<()> {
    let leitung = match &k.leitung {
        Some(l) => Arc::clone(l),
        None => {
            let (_, name) = k
                .geraet
                .standard_leitung()
                .ok_or_else(|| SignalingError::zustand("keine Leitung fuer Weiterleitung"))?;
            k.state
                .registry
                .leitung(&name)
                .ok_or_else(|| SignalingError::zustand(format!("Leitung {name} nicht angehaengt")))?
        }
    };

    if leitung.weiterleitung(&k.geraet.id).ziel(art).is_some() {
        features::weiterleitung_speichern(&k.state, &k.geraet, &leitung.name, art, None).await;
        return Ok(());
    }

    let kanal = match k.kanal.as_ref().filter(|c| c.zustand().sammelt_ziffern()) {
        Some(kanal) => Arc::clone(kanal),
        None => {
            let instance = k.geraet.instance_fuer_leitung(&leitung.name);
            anruf::neuer_anruf(&k.state, &k.geraet, instance).await?
        }
    };
    kanal.bearbeiten().cfwd_erfassung = Some(art);
    if k.geraet.hat_display() {
        let prompt = Message::DisplayPromptStatus(skinnygate_protocol::messages::DisplayPrompt {
            timeout: 0,
            text: "Enter forward number".to_string(),
            line_instance: kanal.instance(),
            call_reference: kanal.call_id.inner(),
        });
        k.geraet.senden(prompt).await?;
    }
    Ok(())
}

async fn backspace(k: SoftkeyKontext) -> SignalingResult<()> {
    let kanal = k
        .kanal
        .as_ref()
        .ok_or_else(|| SignalingError::zustand("kein Kanal"))?;
    if !kanal.zustand().sammelt_ziffern() {
        return Ok(());
    }
    if anruf::ziffer_loeschen(&k.state, kanal) {
        k.geraet
            .senden(Message::BackSpaceReq(LineRef::neu(
                kanal.instance(),
                kanal.call_id.inner(),
            )))
            .await?;
    }
    Ok(())
}

async fn endcall(k: SoftkeyKontext) -> SignalingResult<()> {
    let kanal = k
        .kanal
        .as_ref()
        .ok_or_else(|| SignalingError::zustand("kein Kanal"))?;
    let gebunden = kanal
        .geraet()
        .is_some_and(|g| Arc::ptr_eq(&g, &k.geraet));
    if !gebunden && kanal.angebot_instance(&k.geraet).is_some() {
        anruf::angebot_zurueckziehen(&k.state, kanal, &k.geraet, false).await;
    } else {
        anruf::auflegen(&k.state, kanal.call_id, HangupCause::Normal, true).await;
    }
    Ok(())
}

async fn answer(k: SoftkeyKontext) -> SignalingResult<()> {
    let kanal = match k.kanal.as_ref().filter(|c| c.zustand() == ChannelState::RingIn) {
        Some(kanal) => Arc::clone(kanal),
        None => anruf::klingelnder_kanal(&k.state, &k.geraet)
            .ok_or_else(|| SignalingError::zustand("kein klingelnder Anruf"))?,
    };
    anruf::annehmen(&k.state, &kanal, &k.geraet).await
}

async fn dial(k: SoftkeyKontext) -> SignalingResult<()> {
    if let Some(kanal) = &k.kanal {
        anruf::softswitch(&k.state, kanal).await;
    }
    Ok(())
}

async fn schalter(k: SoftkeyKontext, schalter: Schalter) -> SignalingResult<()> {
    let an = features::schalter_umschalten(&k.state, &k.geraet, schalter).await;
    // DND-Reject beendet das Klingeln auf diesem Geraet
    if schalter == Schalter::Dnd && an && k.geraet.features().dnd_weist_ab() {
        if let Some(kanal) = anruf::klingelnder_kanal(&k.state, &k.geraet) {
            anruf::angebot_zurueckziehen(&k.state, &kanal, &k.geraet, true).await;
        }
    }
    Ok(())
}

async fn monitor(k: SoftkeyKontext) -> SignalingResult<()> {
    let an = features::schalter_umschalten(&k.state, &k.geraet, Schalter::Monitor).await;
    if let Some(kanal) = k.kanal.as_ref().filter(|c| c.zustand().ist_verbunden()) {
        if let Some(owner) = kanal.owner() {
            k.state
                .call_control
                .feature(owner, CallFeature::Monitor(an))
                .await;
        }
    }
    Ok(())
}

async fn speeddial(k: SoftkeyKontext) -> SignalingResult<()> {
    let nummer = k
        .geraet
        .lesen()
        .template
        .kurzwahl(k.instance)
        .map(|(nummer, _)| nummer.to_string());
    match nummer {
        Some(nummer) => {
            // die Instanz ist die Kurzwahltaste, nicht die Leitung
            let k = SoftkeyKontext { leitung: None, ..k };
            nummer_waehlen(k, nummer).await
        }
        None => Err(SignalingError::zustand(format!(
            "keine Kurzwahl auf Instanz {}",
            k.instance
        ))),
    }
}

async fn voicemail(k: SoftkeyKontext) -> SignalingResult<()> {
    let leitung = match &k.leitung {
        Some(l) => Some(Arc::clone(l)),
        None => k
            .geraet
            .standard_leitung()
            .and_then(|(_, name)| k.state.registry.leitung(&name)),
    };
    let nummer = leitung.and_then(|l| l.config().voicemail).filter(|n| !n.is_empty());
    match nummer {
        Some(nummer) => nummer_waehlen(k, nummer).await,
        None => {
            hinweis(&k.geraet, "No voicemail", Some(Tone::Zip)).await;
            Ok(())
        }
    }
}

/// Leitungstaste: klingelt sie, annehmen, sonst neuer Anruf darauf
async fn line_taste(k: SoftkeyKontext) -> SignalingResult<()> {
    if k.geraet.leitung_fuer_instance(k.instance).is_none() {
        return Err(SignalingError::zustand(format!(
            "Instanz {} ist keine Leitung",
            k.instance
        )));
    }
    if let Some(kanal) = anruf::klingelnder_kanal(&k.state, &k.geraet)
        .filter(|c| c.angebot_instance(&k.geraet) == Some(k.instance))
    {
        return anruf::annehmen(&k.state, &kanal, &k.geraet).await;
    }
    if k.kanal.as_ref().is_some_and(|c| c.zustand().sammelt_ziffern()) {
        return Ok(());
    }
    anruf::neuer_anruf(&k.state, &k.geraet, Some(k.instance)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const SOFTKEYS: [(&str, SoftKeyEvent); 22] = [
    ("Redial", SoftKeyEvent::Redial),
    ("NewCall", SoftKeyEvent::NewCall),
    ("Hold", SoftKeyEvent::Hold),
    ("Transfer", SoftKeyEvent::Transfer),
    ("CFwdAll", SoftKeyEvent::CfwdAll),
    ("CFwdBusy", SoftKeyEvent::CfwdBusy),
    ("CFwdNoAns", SoftKeyEvent::CfwdNoAnswer),
    ("<<", SoftKeyEvent::BackSpace),
    ("EndCall", SoftKeyEvent::EndCall),
    ("Resume", SoftKeyEvent::Resume),
    ("Answer", SoftKeyEvent::Answer),
    ("Info", SoftKeyEvent::Info),
    ("Confrn", SoftKeyEvent::Conference),
    ("Park", SoftKeyEvent::Park),
    ("Join", SoftKeyEvent::Join),
    ("MeetMe", SoftKeyEvent::MeetMe),
    ("PickUp", SoftKeyEvent::Pickup),
    ("GPickUp", SoftKeyEvent::GroupPickup),
    ("Dial", SoftKeyEvent::Dial),
    ("DND", SoftKeyEvent::Dnd),
    ("Private", SoftKeyEvent::Privacy),
    ("Monitor", SoftKeyEvent::Monitor),
];

/// Softkey-Template: ein Eintrag pro Ereignis, Position = Ereigniscode - 1
pub fn template_nachricht() -> SoftKeyTemplateRes {
    let keys: Vec<SoftKeyDefinition> = SOFTKEYS
        .iter()
        .map(|(label, event)| SoftKeyDefinition {
            label: (*label).to_string(),
            event: event.as_u32(),
        })
        .collect();
    SoftKeyTemplateRes {
        offset: 0,
        total: keys.len() as u32,
        keys,
    }
}

fn tasten_fuer(modus: KeyMode) -> &'static [SoftKeyEvent] {
    use SoftKeyEvent as E;
    match modus {
        KeyMode::OnHook => &[E::Redial, E::NewCall, E::CfwdAll, E::Dnd],
        KeyMode::Connected => &[E::Hold, E::EndCall, E::Transfer, E::Conference, E::Park],
        KeyMode::OnHold => &[E::Resume, E::NewCall, E::EndCall],
        KeyMode::RingIn => &[E::Answer, E::EndCall, E::Dnd],
        KeyMode::OffHook => &[E::Redial, E::EndCall, E::CfwdAll],
        KeyMode::ConnTrans => &[E::Hold, E::EndCall, E::Transfer],
        KeyMode::DigitsFoll => &[E::BackSpace, E::Dial, E::EndCall],
        KeyMode::ConnConf => &[E::Hold, E::EndCall, E::Conference],
        KeyMode::RingOut => &[E::EndCall, E::Transfer],
        KeyMode::OffHookFeat => &[E::Redial, E::EndCall],
        KeyMode::InUseHint => &[E::NewCall],
        KeyMode::OnHookStealable => &[E::Redial, E::NewCall],
    }
}

const KEY_MODES: [KeyMode; 12] = [
    KeyMode::OnHook,
    KeyMode::Connected,
    KeyMode::OnHold,
    KeyMode::RingIn,
    KeyMode::OffHook,
    KeyMode::ConnTrans,
    KeyMode::DigitsFoll,
    KeyMode::ConnConf,
    KeyMode::RingOut,
    KeyMode::OffHookFeat,
    KeyMode::InUseHint,
    KeyMode::OnHookStealable,
];

/// Softkey-Sets, Index = KeyMode
///
/// Eingeschraenkte Geraete bekommen nur die Tasten, die sie ausfuehren koennen.
pub fn sets_nachricht(klasse: GeraeteKlasse) -> SoftKeySetRes {
    let sets: Vec<SoftKeySet> = KEY_MODES
        .iter()
        .map(|modus| {
            let mut template_index = [0u8; SOFTKEYS_PER_SET];
            let mut info_index = [0u16; SOFTKEYS_PER_SET];
            let erlaubt = tasten_fuer(*modus)
                .iter()
                .filter(|e| klasse == GeraeteKlasse::Standard || eingeschraenkt_erlaubt(**e));
            for (slot, event) in erlaubt.enumerate().take(SOFTKEYS_PER_SET) {
                template_index[slot] = event.as_u32() as u8;
                info_index[slot] = 300 + event.as_u32() as u16;
            }
            SoftKeySet {
                template_index,
                info_index,
            }
        })
        .collect();
    SoftKeySetRes {
        offset: 0,
        total: sets.len() as u32,
        sets,
    }
}
