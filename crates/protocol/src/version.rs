//! Versionstabelle
//!
//! Pro Protokollfamilie eine duenn besetzte, nach Version sortierte
//! Tabelle von `HandlerSet`s. Nicht jede Versionsnummer hat einen eigenen
//! Eintrag: die Suche faellt auf den naechst-niedrigeren Eintrag zurueck.
//!
//! ```text
//! primaer: 3 ─ 4 ─ 11 ─ 16 ─ 17 ─ 19 ─ 22
//! lite:    0 ─ 8
//! ```

use crate::error::MessageError;
use crate::fields::{PayloadReader, PayloadWriter};
use crate::ids::Family;
use crate::layouts::*;
use crate::message::{zuschneiden, Message};
use crate::messages::{
    CallInfo, ConnectionStatisticsReq, DialedNumber, DisplayNotify, DisplayPriNotify,
    DisplayPrompt, EnblocCall, ForwardStat, OpenReceiveChannel, OpenReceiveChannelAck, PortRef,
    PortResponse, RegisterAck, StartMediaTransmission, StartMediaTransmissionAck,
};
use crate::wire::RawFrame;
use std::fmt;

pub const PRIMARY_MIN_VERSION: u8 = 3;
pub const PRIMARY_MAX_VERSION: u8 = 22;
pub const LITE_MIN_VERSION: u8 = 0;
pub const LITE_MAX_VERSION: u8 = 8;

impl Family {
    /// Niedrigste unterstuetzte Version (Ziel fuer Legacy-Pins)
    pub fn min_version(self) -> u8 {
        match self {
            Self::Primary => PRIMARY_MIN_VERSION,
            Self::Lite => LITE_MIN_VERSION,
        }
    }

    /// Hoechste Version, die das Gateway spricht
    pub fn max_version(self) -> u8 {
        match self {
            Self::Primary => PRIMARY_MAX_VERSION,
            Self::Lite => LITE_MAX_VERSION,
        }
    }
}

/// Kodier-/Dekodierfunktionen einer Nachricht in einem Layout-Stand
pub struct MessageCodec<T> {
    pub id: u32,
    pub name: &'static str,
    /// Bekannte (bei dynamischen Nachrichten: maximale) Nutzlastgroesse
    pub size: usize,
    pub encode: fn(&T, &mut PayloadWriter),
    pub decode: fn(&mut PayloadReader<'_>) -> Result<T, MessageError>,
}

impl<T> Clone for MessageCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MessageCodec<T> {}

impl<T> fmt::Debug for MessageCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodec")
            .field("id", &format_args!("0x{:04X}", self.id))
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

impl<T> MessageCodec<T> {
    pub(crate) fn schreiben(&self, m: &T, w: &mut PayloadWriter) -> u32 {
        (self.encode)(m, w);
        self.id
    }

    pub(crate) fn lesen(&self, payload: &[u8]) -> Result<T, MessageError> {
        let p = zuschneiden(self.name, self.id, payload, self.size);
        (self.decode)(&mut PayloadReader::new(p))
    }
}

/// Gebundene Layouts aller versionsabhaengigen Nachrichten einer Version
#[derive(Debug, Clone, Copy)]
pub struct HandlerSet {
    pub family: Family,
    /// Version des Tabelleneintrags (nicht zwingend die ausgehandelte)
    pub version: u8,

    // --- ausgehend ---
    pub register_ack: MessageCodec<RegisterAck>,
    pub call_info: MessageCodec<CallInfo>,
    pub dialed_number: MessageCodec<DialedNumber>,
    pub display_prompt: MessageCodec<DisplayPrompt>,
    pub display_notify: MessageCodec<DisplayNotify>,
    pub display_pri_notify: MessageCodec<DisplayPriNotify>,
    pub forward_stat: MessageCodec<ForwardStat>,
    pub open_receive_channel: MessageCodec<OpenReceiveChannel>,
    pub open_multi_media_channel: MessageCodec<OpenReceiveChannel>,
    pub start_media_transmission: MessageCodec<StartMediaTransmission>,
    pub start_multi_media_transmission: MessageCodec<StartMediaTransmission>,
    pub connection_statistics_req: MessageCodec<ConnectionStatisticsReq>,
    pub port_request: Option<MessageCodec<PortRef>>,
    pub port_close: Option<MessageCodec<PortRef>>,

    // --- eingehend ---
    pub open_receive_channel_ack: MessageCodec<OpenReceiveChannelAck>,
    pub open_multi_media_ack: MessageCodec<OpenReceiveChannelAck>,
    pub start_media_transmission_ack: MessageCodec<StartMediaTransmissionAck>,
    pub enbloc_call: MessageCodec<EnblocCall>,
    pub port_response: Option<MessageCodec<PortResponse>>,
}

const PRIMARY_V3: HandlerSet = HandlerSet {
    family: Family::Primary,
    version: 3,
    register_ack: REGISTER_ACK_V3,
    call_info: CALL_INFO_STATIC,
    dialed_number: DIALED_NUMBER_V3,
    display_prompt: DISPLAY_PROMPT_STATIC,
    display_notify: DISPLAY_NOTIFY_STATIC,
    display_pri_notify: DISPLAY_PRI_NOTIFY_STATIC,
    forward_stat: FORWARD_STAT_V3,
    open_receive_channel: OPEN_RECEIVE_CHANNEL_V3,
    open_multi_media_channel: OPEN_MULTI_MEDIA_CHANNEL_V3,
    start_media_transmission: START_MEDIA_TRANSMISSION_V3,
    start_multi_media_transmission: START_MULTI_MEDIA_V3,
    connection_statistics_req: CONNECTION_STATISTICS_REQ_V3,
    port_request: None,
    port_close: None,
    open_receive_channel_ack: OPEN_RECEIVE_CHANNEL_ACK_V3,
    open_multi_media_ack: OPEN_MULTI_MEDIA_ACK_V3,
    start_media_transmission_ack: START_MEDIA_TRANSMISSION_ACK_V3,
    enbloc_call: ENBLOC_CALL_V3,
    port_response: None,
};

const PRIMARY_V4: HandlerSet = HandlerSet {
    version: 4,
    register_ack: REGISTER_ACK_V4,
    ..PRIMARY_V3
};

const PRIMARY_V11: HandlerSet = HandlerSet {
    version: 11,
    register_ack: REGISTER_ACK_V11,
    ..PRIMARY_V4
};

const PRIMARY_V16: HandlerSet = HandlerSet {
    version: 16,
    call_info: CALL_INFO_DYNAMIC,
    display_prompt: DISPLAY_PROMPT_DYNAMIC,
    display_notify: DISPLAY_NOTIFY_DYNAMIC,
    display_pri_notify: DISPLAY_PRI_NOTIFY_DYNAMIC,
    ..PRIMARY_V11
};

const PRIMARY_V17: HandlerSet = HandlerSet {
    version: 17,
    open_receive_channel: OPEN_RECEIVE_CHANNEL_V17,
    open_multi_media_channel: OPEN_MULTI_MEDIA_CHANNEL_V17,
    start_media_transmission: START_MEDIA_TRANSMISSION_V17,
    start_multi_media_transmission: START_MULTI_MEDIA_V17,
    open_receive_channel_ack: OPEN_RECEIVE_CHANNEL_ACK_V17,
    open_multi_media_ack: OPEN_MULTI_MEDIA_ACK_V17,
    start_media_transmission_ack: START_MEDIA_TRANSMISSION_ACK_V17,
    enbloc_call: ENBLOC_CALL_V17,
    ..PRIMARY_V16
};

const PRIMARY_V19: HandlerSet = HandlerSet {
    version: 19,
    forward_stat: FORWARD_STAT_V19,
    dialed_number: DIALED_NUMBER_V19,
    connection_statistics_req: CONNECTION_STATISTICS_REQ_V19,
    port_request: Some(PORT_REQUEST_V19),
    port_close: Some(PORT_CLOSE_V19),
    port_response: Some(PORT_RESPONSE_V19),
    ..PRIMARY_V17
};

const PRIMARY_V22: HandlerSet = HandlerSet {
    version: 22,
    register_ack: REGISTER_ACK_V22,
    ..PRIMARY_V19
};

const LITE_V0: HandlerSet = HandlerSet {
    family: Family::Lite,
    version: 0,
    ..PRIMARY_V3
};

const LITE_V8: HandlerSet = HandlerSet {
    family: Family::Lite,
    version: 8,
    ..PRIMARY_V11
};

/// Sortiert nach Version
static PRIMARY_TABLE: [HandlerSet; 7] = [
    PRIMARY_V3,
    PRIMARY_V4,
    PRIMARY_V11,
    PRIMARY_V16,
    PRIMARY_V17,
    PRIMARY_V19,
    PRIMARY_V22,
];

static LITE_TABLE: [HandlerSet; 2] = [LITE_V0, LITE_V8];

/// Liefert das `HandlerSet` fuer eine ausgehandelte Version
///
/// Regel: der Eintrag mit der groessten Version `<= version`. Liegt
/// `version` unter dem kleinsten Eintrag, gilt der kleinste; ueber dem
/// groessten der groesste.
pub fn handler_set(family: Family, version: u8) -> &'static HandlerSet {
    let table: &'static [HandlerSet] = match family {
        Family::Primary => &PRIMARY_TABLE,
        Family::Lite => &LITE_TABLE,
    };
    let idx = table.partition_point(|set| set.version <= version);
    &table[idx.saturating_sub(1)]
}

/// Alle Tabelleneintraege einer Familie (fuer Tests und Diagnose)
pub fn table(family: Family) -> &'static [HandlerSet] {
    match family {
        Family::Primary => &PRIMARY_TABLE,
        Family::Lite => &LITE_TABLE,
    }
}

impl HandlerSet {
    fn verfuegbar<'a, T>(
        &self,
        codec: &'a Option<MessageCodec<T>>,
        nachricht: &'static str,
    ) -> Result<&'a MessageCodec<T>, MessageError> {
        codec.as_ref().ok_or(MessageError::NichtUnterstuetzt {
            nachricht,
            version: self.version,
        })
    }

    /// Kodiert eine Nachricht in einen Frame dieses Layout-Stands
    pub fn encode(&self, msg: &Message) -> Result<RawFrame, MessageError> {
        let mut w = PayloadWriter::new();
        let id = match msg {
            Message::RegisterAck(m) => self.register_ack.schreiben(m, &mut w),
            Message::CallInfo(m) => self.call_info.schreiben(m, &mut w),
            Message::DialedNumber(m) => self.dialed_number.schreiben(m, &mut w),
            Message::DisplayPromptStatus(m) => self.display_prompt.schreiben(m, &mut w),
            Message::DisplayNotify(m) => self.display_notify.schreiben(m, &mut w),
            Message::DisplayPriNotify(m) => self.display_pri_notify.schreiben(m, &mut w),
            Message::ForwardStat(m) => self.forward_stat.schreiben(m, &mut w),
            Message::OpenReceiveChannel(m) => self.open_receive_channel.schreiben(m, &mut w),
            Message::OpenMultiMediaChannel(m) => {
                self.open_multi_media_channel.schreiben(m, &mut w)
            }
            Message::StartMediaTransmission(m) => {
                self.start_media_transmission.schreiben(m, &mut w)
            }
            Message::StartMultiMediaTransmission(m) => {
                self.start_multi_media_transmission.schreiben(m, &mut w)
            }
            Message::ConnectionStatisticsReq(m) => {
                self.connection_statistics_req.schreiben(m, &mut w)
            }
            Message::PortRequest(m) => self
                .verfuegbar(&self.port_request, "PortRequest")?
                .schreiben(m, &mut w),
            Message::PortClose(m) => self
                .verfuegbar(&self.port_close, "PortClose")?
                .schreiben(m, &mut w),
            Message::OpenReceiveChannelAck(m) => {
                self.open_receive_channel_ack.schreiben(m, &mut w)
            }
            Message::OpenMultiMediaReceiveChannelAck(m) => {
                self.open_multi_media_ack.schreiben(m, &mut w)
            }
            Message::StartMediaTransmissionAck(m) => {
                self.start_media_transmission_ack.schreiben(m, &mut w)
            }
            Message::EnblocCall(m) => self.enbloc_call.schreiben(m, &mut w),
            Message::PortResponse(m) => self
                .verfuegbar(&self.port_response, "PortResponse")?
                .schreiben(m, &mut w),
            andere => andere
                .encode_fixed(&mut w)
                .ok_or(MessageError::NichtUnterstuetzt {
                    nachricht: andere.name(),
                    version: self.version,
                })?,
        };
        Ok(RawFrame::neu(id, w.freeze()))
    }

    /// Dekodiert einen Frame mit den Layouts dieses Stands
    ///
    /// IDs ausserhalb beider Familienbereiche sind `UnknownMessage`,
    /// unbekannte IDs innerhalb eines Bereichs werden `Message::Unhandled`.
    pub fn decode(&self, frame: &RawFrame) -> Result<Message, MessageError> {
        let id = frame.id;
        if Family::von_id(id).is_none() {
            return Err(MessageError::UnknownMessage(id));
        }
        let payload = &frame.payload[..];
        if let Some(m) = self.decode_versioned(id, payload)? {
            return Ok(m);
        }
        Ok(Message::decode_fixed(id, payload)?.unwrap_or(Message::Unhandled {
            id,
            length: frame.laenge(),
        }))
    }

    fn decode_versioned(&self, id: u32, p: &[u8]) -> Result<Option<Message>, MessageError> {
        let m = if id == self.register_ack.id {
            Message::RegisterAck(self.register_ack.lesen(p)?)
        } else if id == self.call_info.id {
            Message::CallInfo(self.call_info.lesen(p)?)
        } else if id == self.dialed_number.id {
            Message::DialedNumber(self.dialed_number.lesen(p)?)
        } else if id == self.display_prompt.id {
            Message::DisplayPromptStatus(self.display_prompt.lesen(p)?)
        } else if id == self.display_notify.id {
            Message::DisplayNotify(self.display_notify.lesen(p)?)
        } else if id == self.display_pri_notify.id {
            Message::DisplayPriNotify(self.display_pri_notify.lesen(p)?)
        } else if id == self.forward_stat.id {
            Message::ForwardStat(self.forward_stat.lesen(p)?)
        } else if id == self.open_receive_channel.id {
            Message::OpenReceiveChannel(self.open_receive_channel.lesen(p)?)
        } else if id == self.open_multi_media_channel.id {
            Message::OpenMultiMediaChannel(self.open_multi_media_channel.lesen(p)?)
        } else if id == self.start_media_transmission.id {
            Message::StartMediaTransmission(self.start_media_transmission.lesen(p)?)
        } else if id == self.start_multi_media_transmission.id {
            Message::StartMultiMediaTransmission(self.start_multi_media_transmission.lesen(p)?)
        } else if id == self.connection_statistics_req.id {
            Message::ConnectionStatisticsReq(self.connection_statistics_req.lesen(p)?)
        } else if id == self.open_receive_channel_ack.id {
            Message::OpenReceiveChannelAck(self.open_receive_channel_ack.lesen(p)?)
        } else if id == self.open_multi_media_ack.id {
            Message::OpenMultiMediaReceiveChannelAck(self.open_multi_media_ack.lesen(p)?)
        } else if id == self.start_media_transmission_ack.id {
            Message::StartMediaTransmissionAck(self.start_media_transmission_ack.lesen(p)?)
        } else if id == self.enbloc_call.id {
            Message::EnblocCall(self.enbloc_call.lesen(p)?)
        } else if let Some(c) = self.port_request.as_ref().filter(|c| c.id == id) {
            Message::PortRequest(c.lesen(p)?)
        } else if let Some(c) = self.port_close.as_ref().filter(|c| c.id == id) {
            Message::PortClose(c.lesen(p)?)
        } else if let Some(c) = self.port_response.as_ref().filter(|c| c.id == id) {
            Message::PortResponse(c.lesen(p)?)
        } else {
            return Ok(None);
        };
        Ok(Some(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::*;
    use crate::ids;
    use crate::messages::*;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    #[test]
    fn fallback_auf_naechst_niedrigeren_eintrag() {
        assert_eq!(handler_set(Family::Primary, 3).version, 3);
        assert_eq!(handler_set(Family::Primary, 10).version, 4);
        assert_eq!(handler_set(Family::Primary, 11).version, 11);
        assert_eq!(handler_set(Family::Primary, 15).version, 11);
        assert_eq!(handler_set(Family::Primary, 18).version, 17);
        assert_eq!(handler_set(Family::Primary, 21).version, 19);
    }

    #[test]
    fn fallback_an_den_raendern() {
        // unter dem kleinsten Eintrag -> kleinster Eintrag
        assert_eq!(handler_set(Family::Primary, 0).version, 3);
        // ueber dem groessten -> groesster
        assert_eq!(handler_set(Family::Primary, 200).version, 22);
        assert_eq!(handler_set(Family::Lite, 5).version, 0);
        assert_eq!(handler_set(Family::Lite, 99).version, 8);
        assert_eq!(handler_set(Family::Lite, 8).family, Family::Lite);
    }

    #[test]
    fn tabellen_sind_sortiert() {
        for family in [Family::Primary, Family::Lite] {
            let t = table(family);
            assert!(t.windows(2).all(|w| w[0].version < w[1].version));
            assert_eq!(t[0].version, family.min_version());
            assert_eq!(t[t.len() - 1].version, family.max_version());
        }
    }

    fn ack() -> Message {
        Message::RegisterAck(RegisterAck {
            keepalive: 30,
            date_template: "D.M.Y".into(),
            secondary_keepalive: 60,
            protocol_version: 11,
        })
    }

    #[test]
    fn register_ack_layout_v3() {
        let f = handler_set(Family::Primary, 3).encode(&ack()).unwrap();
        assert_eq!(f.id, ids::REGISTER_ACK);
        assert_eq!(
            &f.payload[..],
            &[
                30, 0, 0, 0, b'D', b'.', b'M', b'.', b'Y', 0, 0, 0, 60, 0, 0, 0, 11, 0, 0, 0
            ]
        );
    }

    #[test]
    fn register_ack_layout_v11_und_v22() {
        let v11 = handler_set(Family::Primary, 11).encode(&ack()).unwrap();
        assert_eq!(&v11.payload[16..], &[11, 0x00, 0xF1, 0xFF]);
        let v4 = handler_set(Family::Primary, 4).encode(&ack()).unwrap();
        assert_eq!(&v4.payload[16..], &[11, 0, 0, 0]);
        let v22 = handler_set(Family::Primary, 22).encode(&ack()).unwrap();
        assert_eq!(&v22.payload[16..], &[11, 0x20, 0xF1, 0xFF]);
        assert_eq!(v22.payload.len(), 20);
    }

    #[test]
    fn anzeigen_wechseln_ab_v16_auf_dynamische_ids() {
        let notify = Message::DisplayNotify(DisplayNotify {
            timeout: 5,
            text: "Hallo".into(),
        });
        let alt = handler_set(Family::Primary, 15).encode(&notify).unwrap();
        assert_eq!(alt.id, ids::DISPLAY_NOTIFY);
        assert_eq!(alt.payload.len(), 36);

        let neu = handler_set(Family::Primary, 16).encode(&notify).unwrap();
        assert_eq!(neu.id, ids::DISPLAY_DYNAMIC_NOTIFY);
        assert_eq!(&neu.payload[..], &[5, 0, 0, 0, b'H', b'a', b'l', b'l', b'o', 0, 0, 0]);
    }

    #[test]
    fn open_receive_channel_ack_layout_v3_und_v17() {
        // v3: status, 4 Byte IP, Port, PassThru
        let roh = [
            1, 0, 0, 0, 10, 0, 0, 7, 0xA0, 0x0F, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF,
        ];
        let f = RawFrame::neu(ids::OPEN_RECEIVE_CHANNEL_ACK, roh.to_vec().into());
        let m = handler_set(Family::Primary, 11).decode(&f).unwrap();
        assert_eq!(
            m,
            Message::OpenReceiveChannelAck(OpenReceiveChannelAck {
                media_status: 1,
                ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
                port: 4000,
                pass_thru_party_id: u32::MAX - 1,
                call_reference: 0,
            })
        );

        // v17: status, ipAddrType, 16 Byte IP, Port, PassThru, CallRef
        let mut roh17 = vec![0, 0, 0, 0, 0, 0, 0, 0, 10, 0, 0, 7];
        roh17.extend_from_slice(&[0; 12]);
        roh17.extend_from_slice(&[0xA0, 0x0F, 0, 0, 5, 0, 0, 0, 9, 0, 0, 0]);
        let f = RawFrame::neu(ids::OPEN_RECEIVE_CHANNEL_ACK, roh17.into());
        let m = handler_set(Family::Primary, 17).decode(&f).unwrap();
        let Message::OpenReceiveChannelAck(a) = m else {
            panic!("OpenReceiveChannelAck erwartet");
        };
        assert_eq!(a.ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(a.port, 4000);
        assert_eq!(a.pass_thru_party_id, 5);
        assert_eq!(a.call_reference, 9);
    }

    #[test]
    fn start_media_transmission_groesse_je_version() {
        let smt = Message::StartMediaTransmission(StartMediaTransmission {
            conference_id: 1,
            pass_thru_party_id: 2,
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)), 16384),
            packet_size: 20,
            payload_type: Codec::G711Ulaw.as_u32(),
            precedence: 0,
            silence_suppression: false,
            max_frames_per_packet: 0,
            call_reference: 1,
        });
        let v3 = handler_set(Family::Primary, 3).encode(&smt).unwrap();
        assert_eq!(v3.payload.len(), 44);
        assert_eq!(&v3.payload[8..12], &[192, 168, 1, 2]);
        let v17 = handler_set(Family::Primary, 17).encode(&smt).unwrap();
        assert_eq!(v17.payload.len(), 60);
        assert_eq!(&v17.payload[8..16], &[0, 0, 0, 0, 192, 168, 1, 2]);
    }

    #[test]
    fn forward_stat_layout_v3_und_v19() {
        let fwd = Message::ForwardStat(ForwardStat {
            line_number: 1,
            all: Some("200".into()),
            busy: None,
            no_answer: None,
        });
        let v3 = handler_set(Family::Primary, 3).encode(&fwd).unwrap();
        assert_eq!(v3.payload.len(), 92);
        assert_eq!(&v3.payload[0..12], &[1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(&v3.payload[12..16], b"200\0");
        let v19 = handler_set(Family::Primary, 19).encode(&fwd).unwrap();
        assert_eq!(v19.payload.len(), 96);
        // busy-Flag liegt hinter dem 25-Byte-Nummernfeld
        assert_eq!(&v19.payload[37..41], &[0, 0, 0, 0]);
    }

    #[test]
    fn port_nachrichten_erst_ab_v19() {
        let req = Message::PortRequest(PortRef {
            conference_id: 1,
            pass_thru_party_id: 2,
            call_reference: 1,
            video: false,
        });
        let err = handler_set(Family::Primary, 17).encode(&req).unwrap_err();
        assert!(matches!(err, MessageError::NichtUnterstuetzt { .. }));
        assert!(handler_set(Family::Primary, 19).encode(&req).is_ok());

        // vor v19 ist PortResponse eine unbehandelte, aber gueltige ID
        let f = RawFrame::neu(ids::PORT_RESPONSE, vec![0; 36].into());
        let m = handler_set(Family::Primary, 11).decode(&f).unwrap();
        assert!(matches!(m, Message::Unhandled { id: ids::PORT_RESPONSE, .. }));
    }

    #[test]
    fn ids_ausserhalb_der_familien_sind_unknown() {
        let f = RawFrame::neu(0x4000, Default::default());
        let err = handler_set(Family::Primary, 11).decode(&f).unwrap_err();
        assert_eq!(err, MessageError::UnknownMessage(0x4000));
    }

    #[test]
    fn ueberlange_nutzlast_wird_gekuerzt() {
        let mut roh = vec![1, 0, 0, 0, 2, 0, 0, 0];
        roh.extend_from_slice(&[0xAA; 40]);
        let f = RawFrame::neu(ids::OFF_HOOK, roh.into());
        let m = handler_set(Family::Primary, 11).decode(&f).unwrap();
        assert_eq!(m, Message::OffHook(LineRef::neu(1, 2)));
    }

    fn ausgehende_beispiele(version: u8) -> Vec<Message> {
        let mut v = vec![
            ack(),
            Message::StartTone(StartTone {
                tone: Tone::InsideDial,
                line_instance: 1,
                call_reference: 7,
            }),
            Message::StopTone(LineRef::neu(1, 7)),
            Message::SetRinger(SetRinger {
                mode: RingMode::Inside,
                einmal: false,
                line_instance: 1,
                call_reference: 7,
            }),
            Message::SetLamp(SetLamp {
                stimulus: ButtonType::Line,
                instance: 1,
                mode: LampMode::Blink,
            }),
            Message::SetSpeakerMode(SetSpeakerMode {
                mode: SpeakerMode::On,
            }),
            Message::CallState(CallStateMessage {
                state: CallState::Connected,
                line_instance: 1,
                call_reference: 7,
                visibility: 0,
                priority: 4,
            }),
            Message::SelectSoftKeys(SelectSoftKeys {
                line_instance: 1,
                call_reference: 7,
                key_mode: KeyMode::Connected,
                valid_key_mask: 0xFFFF_FFFF,
            }),
            Message::CallInfo(CallInfo {
                calling_name: "Empfang".into(),
                calling_number: "100".into(),
                called_name: String::new(),
                called_number: "200".into(),
                original_called_name: String::new(),
                original_called_number: "200".into(),
                line_instance: 1,
                call_reference: 7,
                call_type: CallType::Outbound,
                call_instance: 1,
            }),
            Message::DialedNumber(DialedNumber {
                number: "200".into(),
                line_instance: 1,
                call_reference: 7,
            }),
            Message::DisplayPromptStatus(DisplayPrompt {
                timeout: 0,
                text: "Enter number".into(),
                line_instance: 1,
                call_reference: 7,
            }),
            Message::DisplayNotify(DisplayNotify {
                timeout: 10,
                text: "Hallo".into(),
            }),
            Message::DisplayPriNotify(DisplayPriNotify {
                timeout: 0,
                priority: 5,
                text: "DND".into(),
            }),
            Message::ForwardStat(ForwardStat {
                line_number: 1,
                all: None,
                busy: Some("300".into()),
                no_answer: None,
            }),
            Message::OpenReceiveChannel(OpenReceiveChannel {
                conference_id: 7,
                pass_thru_party_id: u32::MAX - 7,
                packet_size: 20,
                payload_type: 4,
                echo_cancel: true,
                call_reference: 7,
            }),
            Message::StartMediaTransmission(StartMediaTransmission {
                conference_id: 7,
                pass_thru_party_id: u32::MAX - 7,
                remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)), 20000),
                packet_size: 20,
                payload_type: 4,
                precedence: 0,
                silence_suppression: false,
                max_frames_per_packet: 1,
                call_reference: 7,
            }),
            Message::ConnectionStatisticsReq(ConnectionStatisticsReq {
                directory_number: "100".into(),
                call_reference: 7,
                clear: true,
            }),
            Message::ButtonTemplate(ButtonTemplate {
                offset: 0,
                total: 2,
                buttons: vec![
                    ButtonDefinition {
                        instance: 1,
                        button_type: ButtonType::Line.as_u8(),
                    },
                    ButtonDefinition {
                        instance: 0,
                        button_type: ButtonType::Undefined.as_u8(),
                    },
                ],
            }),
            Message::KeepAliveAck,
            Message::UnregisterAck(UnregisterAck {
                status: UnregisterStatus::Ok,
            }),
            Message::RegisterReject(RegisterReject {
                text: "Unknown Device".into(),
            }),
        ];
        if version >= 19 {
            v.push(Message::PortRequest(PortRef {
                conference_id: 7,
                pass_thru_party_id: 9,
                call_reference: 7,
                video: true,
            }));
        }
        v
    }

    #[test]
    fn ausgehende_nachrichten_ueberstehen_kodierung_je_version() {
        for set in table(Family::Primary).iter().chain(table(Family::Lite)) {
            for msg in ausgehende_beispiele(set.version) {
                let frame = set.encode(&msg).unwrap();
                let zurueck = set.decode(&frame).unwrap();
                assert_eq!(zurueck, msg, "v{} {}", set.version, msg.name());
            }
        }
    }
}
