//! Anzeigen pro Kanalzustand
//!
//! Jeder Uebergang erzeugt genau eine CallState-Nachricht plus Tone-,
//! Display-, Softkey- und Lampen-Nachrichten. Die Abbildung ist eine reine
//! Funktion, damit die exakte Sequenz pro Zustand, Geraeteklasse und
//! Richtung testbar bleibt.

use skinnygate_core::host::{CallDirection, CallerInfo};
use skinnygate_protocol::enums::{ButtonType, CallState, CallType, KeyMode, LampMode, RingMode, Tone};
use skinnygate_protocol::messages::{
    ActivateCallPlane, CallInfo, CallStateMessage, DialedNumber, DisplayPrompt, LineRef,
    SelectSoftKeys, SetLamp, SetRinger, StartTone,
};
use skinnygate_protocol::Message;

use crate::channel::ChannelState;

/// Alle Softkeys eines Sets sind gueltig
pub const ALLE_SOFTKEYS: u32 = 0xFFFF_FFFF;

/// Prioritaet der CallState-Nachricht
const CALL_PRIORITAET: u32 = 4;

/// Alles, was eine Anzeige ueber den Kanal wissen muss
#[derive(Debug, Clone, Default)]
pub struct AnzeigeKontext {
    pub instance: u32,
    pub call_reference: u32,
    pub richtung: Option<CallDirection>,
    pub hat_display: bool,
    /// DND im Silent-Modus: nur optisch
    pub dnd_still: bool,
    /// Gegenstelle (bei eingehenden Anrufen der Anrufer)
    pub gegenstelle: CallerInfo,
    /// Gewaehlte Ziffern
    pub gewaehlt: String,
    /// Eigene Anzeige der Leitung
    pub eigener_name: String,
    pub eigene_nummer: String,
}

impl AnzeigeKontext {
    fn zeile(&self) -> LineRef {
        LineRef::neu(self.instance, self.call_reference)
    }

    fn call_state(&self, state: CallState) -> Message {
        Message::CallState(CallStateMessage {
            state,
            line_instance: self.instance,
            call_reference: self.call_reference,
            visibility: 0,
            priority: CALL_PRIORITAET,
        })
    }

    fn softkeys(&self, key_mode: KeyMode) -> Message {
        Message::SelectSoftKeys(SelectSoftKeys {
            line_instance: self.instance,
            call_reference: self.call_reference,
            key_mode,
            valid_key_mask: ALLE_SOFTKEYS,
        })
    }

    fn ton(&self, tone: Tone) -> Message {
        Message::StartTone(StartTone {
            tone,
            line_instance: self.instance,
            call_reference: self.call_reference,
        })
    }

    fn ton_aus(&self) -> Message {
        Message::StopTone(self.zeile())
    }

    fn klingeln(&self, mode: RingMode) -> Message {
        Message::SetRinger(SetRinger {
            mode,
            einmal: false,
            line_instance: self.instance,
            call_reference: self.call_reference,
        })
    }

    fn lampe(&self, mode: LampMode) -> Message {
        Message::SetLamp(SetLamp {
            stimulus: ButtonType::Line,
            instance: self.instance,
            mode,
        })
    }

    fn prompt(&self, text: impl Into<String>) -> Option<Message> {
        self.hat_display.then(|| {
            Message::DisplayPromptStatus(DisplayPrompt {
                timeout: 0,
                text: text.into(),
                line_instance: self.instance,
                call_reference: self.call_reference,
            })
        })
    }

    fn prompt_loeschen(&self) -> Option<Message> {
        self.hat_display
            .then(|| Message::ClearPromptStatus(self.zeile()))
    }

    fn call_info(&self) -> Option<Message> {
        if !self.hat_display {
            return None;
        }
        let eingehend = matches!(
            self.richtung,
            Some(CallDirection::Inbound) | Some(CallDirection::Forward)
        );
        let call_type = match self.richtung {
            Some(CallDirection::Inbound) => CallType::Inbound,
            Some(CallDirection::Forward) => CallType::Forward,
            _ => CallType::Outbound,
        };
        let (calling_name, calling_number, called_name, called_number) = if eingehend {
            (
                self.gegenstelle.name.clone(),
                self.gegenstelle.number.clone(),
                self.eigener_name.clone(),
                self.eigene_nummer.clone(),
            )
        } else {
            (
                self.eigener_name.clone(),
                self.eigene_nummer.clone(),
                self.gegenstelle.name.clone(),
                if self.gegenstelle.number.is_empty() {
                    self.gewaehlt.clone()
                } else {
                    self.gegenstelle.number.clone()
                },
            )
        };
        Some(Message::CallInfo(CallInfo {
            calling_name,
            calling_number,
            called_name,
            called_number,
            original_called_name: String::new(),
            original_called_number: String::new(),
            line_instance: self.instance,
            call_reference: self.call_reference,
            call_type,
            call_instance: self.call_reference,
        }))
    }

    fn anrufer_text(&self) -> String {
        let g = &self.gegenstelle;
        match (g.name.is_empty(), g.number.is_empty()) {
            (false, false) => format!("From {} <{}>", g.name, g.number),
            (false, true) => format!("From {}", g.name),
            (true, false) => format!("From {}", g.number),
            (true, true) => "From Unknown".to_string(),
        }
    }
}

/// Die Nachrichten fuer den Wechsel nach `ziel`
///
/// `Zombie` und `Down` sind interne Zustaende ohne Anzeige.
pub fn nachrichten(ziel: ChannelState, k: &AnzeigeKontext) -> Vec<Message> {
    let mut out: Vec<Option<Message>> = Vec::with_capacity(8);
    match ziel {
        ChannelState::Down | ChannelState::Zombie => return Vec::new(),
        ChannelState::OffHook => {
            out.push(Some(Message::ActivateCallPlane(ActivateCallPlane {
                line_instance: k.instance,
            })));
            out.push(Some(k.call_state(CallState::OffHook)));
            out.push(Some(k.softkeys(KeyMode::OffHook)));
            out.push(k.prompt("Enter number"));
            out.push(Some(k.ton(Tone::InsideDial)));
        }
        ChannelState::GetDigits => {
            out.push(Some(k.ton_aus()));
            out.push(Some(k.call_state(CallState::OffHook)));
            out.push(Some(k.softkeys(KeyMode::DigitsFoll)));
        }
        ChannelState::Dialing => {
            out.push(Some(k.call_state(CallState::OffHook)));
            out.push(Some(Message::DialedNumber(DialedNumber {
                number: k.gewaehlt.clone(),
                line_instance: k.instance,
                call_reference: k.call_reference,
            })));
            out.push(k.prompt_loeschen());
        }
        ChannelState::Proceed => {
            out.push(Some(k.call_state(CallState::Proceed)));
            out.push(Some(k.ton_aus()));
            out.push(k.prompt("Call Proceed"));
            out.push(k.call_info());
        }
        ChannelState::RingOut => {
            out.push(Some(k.call_state(CallState::RingOut)));
            out.push(Some(k.ton(Tone::Alerting)));
            out.push(Some(k.softkeys(KeyMode::RingOut)));
            out.push(k.prompt("Ring Out"));
            out.push(k.call_info());
        }
        ChannelState::RingIn => {
            out.push(Some(k.call_state(CallState::RingIn)));
            out.push(Some(k.softkeys(KeyMode::RingIn)));
            out.push(k.prompt(k.anrufer_text()));
            out.push(k.call_info());
            let ring = if k.dnd_still {
                RingMode::FlashOnly
            } else {
                RingMode::Inside
            };
            out.push(Some(k.klingeln(ring)));
            out.push(Some(k.lampe(LampMode::Blink)));
        }
        ChannelState::Connected => {
            out.push(Some(k.klingeln(RingMode::Off)));
            out.push(Some(k.ton_aus()));
            out.push(Some(k.call_state(CallState::Connected)));
            out.push(Some(k.softkeys(KeyMode::Connected)));
            out.push(k.prompt("Connected"));
            out.push(k.call_info());
            out.push(Some(k.lampe(LampMode::On)));
        }
        ChannelState::Hold => {
            out.push(Some(k.call_state(CallState::Hold)));
            out.push(Some(k.softkeys(KeyMode::OnHold)));
            out.push(k.prompt("On Hold"));
            out.push(Some(k.lampe(LampMode::Wink)));
        }
        ChannelState::CallTransfer => {
            out.push(Some(k.call_state(CallState::CallTransfer)));
            out.push(Some(k.softkeys(KeyMode::ConnTrans)));
            out.push(k.prompt("Transfer"));
        }
        ChannelState::Conference => {
            out.push(Some(k.call_state(CallState::Connected)));
            out.push(Some(k.softkeys(KeyMode::ConnConf)));
            out.push(k.prompt("Conference"));
        }
        ChannelState::Busy => {
            out.push(Some(k.call_state(CallState::Busy)));
            out.push(Some(k.ton(Tone::LineBusy)));
            out.push(k.prompt("Busy"));
        }
        ChannelState::Congestion => {
            out.push(Some(k.call_state(CallState::Congestion)));
            out.push(Some(k.ton(Tone::Reorder)));
            out.push(k.prompt("Temp Fail"));
        }
        ChannelState::InvalidNumber => {
            out.push(Some(k.call_state(CallState::InvalidNumber)));
            out.push(Some(k.ton(Tone::Reorder)));
            out.push(k.prompt("Unknown Number"));
        }
        ChannelState::OnHook => {
            out.push(Some(k.klingeln(RingMode::Off)));
            out.push(Some(k.ton_aus()));
            out.push(Some(k.call_state(CallState::OnHook)));
            out.push(Some(k.softkeys(KeyMode::OnHook)));
            out.push(k.prompt_loeschen());
            out.push(Some(k.lampe(LampMode::Off)));
        }
    }
    out.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kontext() -> AnzeigeKontext {
        AnzeigeKontext {
            instance: 1,
            call_reference: 7,
            richtung: Some(CallDirection::Outbound),
            hat_display: true,
            ..AnzeigeKontext::default()
        }
    }

    fn call_states(msgs: &[Message]) -> Vec<CallState> {
        msgs.iter()
            .filter_map(|m| match m {
                Message::CallState(c) => Some(c.state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn genau_ein_call_state_pro_uebergang() {
        use ChannelState::*;
        let k = kontext();
        for ziel in [
            OffHook, GetDigits, Dialing, Proceed, RingOut, RingIn, Connected, Hold,
            CallTransfer, Conference, Busy, Congestion, InvalidNumber, OnHook,
        ] {
            assert_eq!(call_states(&nachrichten(ziel, &k)).len(), 1, "{ziel}");
        }
        assert!(nachrichten(Zombie, &k).is_empty());
        assert!(nachrichten(Down, &k).is_empty());
    }

    #[test]
    fn abheben_startet_waehlton() {
        let msgs = nachrichten(ChannelState::OffHook, &kontext());
        assert!(matches!(msgs[0], Message::ActivateCallPlane(_)));
        assert!(matches!(
            msgs.last(),
            Some(Message::StartTone(StartTone { tone: Tone::InsideDial, line_instance: 1, .. }))
        ));
    }

    #[test]
    fn ohne_display_keine_texte() {
        let mut k = kontext();
        k.hat_display = false;
        let msgs = nachrichten(ChannelState::Proceed, &k);
        assert!(msgs
            .iter()
            .all(|m| !matches!(m, Message::DisplayPromptStatus(_) | Message::CallInfo(_))));
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn dnd_still_klingelt_nur_optisch() {
        let mut k = kontext();
        k.richtung = Some(CallDirection::Inbound);
        k.dnd_still = true;
        let msgs = nachrichten(ChannelState::RingIn, &k);
        assert!(msgs.iter().any(|m| matches!(
            m,
            Message::SetRinger(SetRinger { mode: RingMode::FlashOnly, .. })
        )));
    }

    #[test]
    fn call_info_vertauscht_bei_eingehend() {
        let mut k = kontext();
        k.richtung = Some(CallDirection::Inbound);
        k.gegenstelle = CallerInfo {
            name: "Alice".into(),
            number: "200".into(),
            subscription: None,
        };
        k.eigene_nummer = "100".into();
        let info = nachrichten(ChannelState::RingIn, &k)
            .into_iter()
            .find_map(|m| match m {
                Message::CallInfo(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(info.calling_number, "200");
        assert_eq!(info.called_number, "100");
        assert_eq!(info.call_type, CallType::Inbound);
    }

    #[test]
    fn fehlerzustaende_spielen_fehlertoene() {
        let k = kontext();
        let ton = |z| {
            nachrichten(z, &k).into_iter().find_map(|m| match m {
                Message::StartTone(t) => Some(t.tone),
                _ => None,
            })
        };
        assert_eq!(ton(ChannelState::Busy), Some(Tone::LineBusy));
        assert_eq!(ton(ChannelState::Congestion), Some(Tone::Reorder));
        assert_eq!(ton(ChannelState::InvalidNumber), Some(Tone::Reorder));
    }
}
