//! Nutzlast-Strukturen des Station-Protokolls
//!
//! Nachrichten ohne Versionsabhaengigkeit implementieren `WireMessage`
//! mit fester Groesse und festem Layout. Die versionsabhaengigen
//! Strukturen stehen ebenfalls hier, ihre Layouts liegen in `layouts`.

use crate::enums::{
    ButtonType, CallState, CallType, KeyMode, LampMode, ResetType, RingMode, SpeakerMode, Tone,
    UnregisterStatus,
};
use crate::error::MessageError;
use crate::fields::{PayloadReader, PayloadWriter};
use crate::ids;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Maximale Laenge eines Anzeigetexts in statischen Nachrichten
pub const DISPLAY_TEXT_SIZE: usize = 32;
/// Maximale Laenge eines Texts in dynamischen Nachrichten
pub const DYNAMIC_TEXT_MAX: usize = 100;
/// Laenge einer Rufnummer im Draht-Layout
pub const DIRECTORY_NUMBER_SIZE: usize = 24;
/// Laenge eines Namens im Draht-Layout
pub const NAME_SIZE: usize = 40;

pub const MAX_CAPABILITIES: usize = 18;
pub const MAX_BUTTON_DEFINITIONS: usize = 42;
pub const MAX_SOFTKEY_DEFINITIONS: usize = 32;
pub const MAX_SOFTKEY_SETS: usize = 16;
pub const SOFTKEYS_PER_SET: usize = 16;

/// Nachricht mit fester ID und versionsunabhaengigem Layout
pub trait WireMessage: Sized {
    const ID: u32;
    const NAME: &'static str;
    /// Bekannte Nutzlastgroesse in Bytes (ohne Nachrichten-ID)
    const SIZE: usize;

    fn encode(&self, w: &mut PayloadWriter);
    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError>;
}

/// Wandelt einen Drahtwert in ein Enum oder liefert `UngueltigerWert`
pub(crate) fn wert<T>(
    feld: &'static str,
    v: u32,
    f: fn(u32) -> Option<T>,
) -> Result<T, MessageError> {
    f(v).ok_or(MessageError::UngueltigerWert { feld, wert: v })
}

/// Prueft einen Zaehler gegen die Kapazitaet der festen Struktur
pub(crate) fn zaehler(
    nachricht: &'static str,
    anzahl: u32,
    maximum: usize,
) -> Result<usize, MessageError> {
    if anzahl as usize > maximum {
        return Err(MessageError::SizeMismatch {
            nachricht,
            anzahl,
            maximum: maximum as u32,
        });
    }
    Ok(anzahl as usize)
}

// ---------------------------------------------------------------------------
// Gemeinsame Referenzen
// ---------------------------------------------------------------------------

/// Leitungsinstanz + Call-Referenz (Hook-Ereignisse, StopTone, ClearPrompt, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRef {
    pub line_instance: u32,
    pub call_reference: u32,
}

impl LineRef {
    pub const SIZE: usize = 8;

    pub fn neu(line_instance: u32, call_reference: u32) -> Self {
        Self {
            line_instance,
            call_reference,
        }
    }

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.line_instance);
        w.u32(self.call_reference);
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Self {
        Self {
            line_instance: r.u32(),
            call_reference: r.u32(),
        }
    }
}

/// Referenz auf einen RTP-Kanal (Stop/Close fuer Audio und Video)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaChannelRef {
    pub conference_id: u32,
    pub pass_thru_party_id: u32,
    pub call_reference: u32,
}

impl MediaChannelRef {
    pub const SIZE: usize = 12;

    pub(crate) fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.conference_id);
        w.u32(self.pass_thru_party_id);
        w.u32(self.call_reference);
    }

    pub(crate) fn decode(r: &mut PayloadReader<'_>) -> Self {
        Self {
            conference_id: r.u32(),
            pass_thru_party_id: r.u32(),
            call_reference: r.u32(),
        }
    }
}

// ---------------------------------------------------------------------------
// Telefon -> Gateway
// ---------------------------------------------------------------------------

/// Registrierungsanfrage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub device_name: String,
    pub user_id: u32,
    pub instance: u32,
    pub ip: Ipv4Addr,
    pub device_type: u32,
    pub max_streams: u32,
    pub active_streams: u32,
    pub protocol_version: u8,
    pub phone_features: u16,
    pub max_conferences: u32,
    pub active_conferences: u32,
    pub mac_address: String,
    pub max_lines: u32,
    pub firmware: String,
}

impl WireMessage for Register {
    const ID: u32 = ids::REGISTER;
    const NAME: &'static str = "Register";
    const SIZE: usize = 172;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.device_name, 16);
        w.u32(self.user_id);
        w.u32(self.instance);
        w.ipv4(self.ip);
        w.u32(self.device_type);
        w.u32(self.max_streams);
        w.u32(self.active_streams);
        w.u8(self.protocol_version);
        w.u8(0);
        w.u16(self.phone_features);
        w.u32(self.max_conferences);
        w.u32(self.active_conferences);
        w.string(&self.mac_address, 12);
        // ipV4AddressScope
        w.u32(0);
        w.u32(self.max_lines);
        // ipV6Address + ipV6AddressScope
        w.zeros(20);
        w.string(&self.firmware, 32);
        // configVersionStamp
        w.zeros(48);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let device_name = r.string(16);
        let user_id = r.u32();
        let instance = r.u32();
        let ip = r.ipv4();
        let device_type = r.u32();
        let max_streams = r.u32();
        let active_streams = r.u32();
        let protocol_version = r.u8();
        r.skip(1);
        let phone_features = r.u16();
        let max_conferences = r.u32();
        let active_conferences = r.u32();
        let mac_address = r.string(12);
        r.skip(4);
        let max_lines = r.u32();
        r.skip(20);
        let firmware = r.string(32);
        Ok(Self {
            device_name,
            user_id,
            instance,
            ip,
            device_type,
            max_streams,
            active_streams,
            protocol_version,
            phone_features,
            max_conferences,
            active_conferences,
            mac_address,
            max_lines,
            firmware,
        })
    }
}

/// RTP-Port des Telefons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPort {
    pub rtp_port: u32,
}

impl WireMessage for IpPort {
    const ID: u32 = ids::IP_PORT;
    const NAME: &'static str = "IpPort";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.rtp_port);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self { rtp_port: r.u32() })
    }
}

/// Tastendruck auf dem Ziffernblock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadButton {
    /// 0-9, 0x0E = `*`, 0x0F = `#`
    pub button: u32,
    pub line_instance: u32,
    pub call_reference: u32,
}

impl KeypadButton {
    /// Taste als Waehlzeichen
    pub fn ziffer(&self) -> Option<char> {
        match self.button {
            0..=9 => char::from_digit(self.button, 10),
            0x0E => Some('*'),
            0x0F => Some('#'),
            _ => None,
        }
    }

    /// Gegenstueck zu `ziffer` (fuer Testtelefone)
    pub fn aus_ziffer(ziffer: char, line_instance: u32, call_reference: u32) -> Option<Self> {
        let button = match ziffer {
            '0'..='9' => ziffer.to_digit(10)?,
            '*' => 0x0E,
            '#' => 0x0F,
            _ => return None,
        };
        Some(Self {
            button,
            line_instance,
            call_reference,
        })
    }
}

impl WireMessage for KeypadButton {
    const ID: u32 = ids::KEYPAD_BUTTON;
    const NAME: &'static str = "KeypadButton";
    const SIZE: usize = 12;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.button);
        w.u32(self.line_instance);
        w.u32(self.call_reference);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            button: r.u32(),
            line_instance: r.u32(),
            call_reference: r.u32(),
        })
    }
}

/// Tastendruck auf einer Funktions- oder Leitungstaste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stimulus {
    /// Tastencode (siehe `ButtonType`)
    pub stimulus: u32,
    pub instance: u32,
    pub call_reference: u32,
    pub status: u32,
}

impl WireMessage for Stimulus {
    const ID: u32 = ids::STIMULUS;
    const NAME: &'static str = "Stimulus";
    const SIZE: usize = 16;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.stimulus);
        w.u32(self.instance);
        w.u32(self.call_reference);
        w.u32(self.status);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            stimulus: r.u32(),
            instance: r.u32(),
            call_reference: r.u32(),
            status: r.u32(),
        })
    }
}

/// Einfache Anfrage mit einer Nummer (ForwardStatReq, LineStatReq, SpeedDialStatReq)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberReq {
    pub number: u32,
}

impl NumberReq {
    pub const SIZE: usize = 4;
}

/// Ein Eintrag der Capability-Liste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Payload-Capability (siehe `Codec`)
    pub codec: u32,
    pub max_frames_per_packet: u32,
}

/// Unterstuetzte Codecs des Telefons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitiesRes {
    pub capabilities: Vec<Capability>,
}

impl WireMessage for CapabilitiesRes {
    const ID: u32 = ids::CAPABILITIES_RES;
    const NAME: &'static str = "CapabilitiesRes";
    const SIZE: usize = 4 + MAX_CAPABILITIES * 16;

    fn encode(&self, w: &mut PayloadWriter) {
        let n = self.capabilities.len().min(MAX_CAPABILITIES);
        w.u32(n as u32);
        for cap in &self.capabilities[..n] {
            w.u32(cap.codec);
            w.u32(cap.max_frames_per_packet);
            // payloadParam
            w.zeros(8);
        }
        w.zeros((MAX_CAPABILITIES - n) * 16);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let n = zaehler(Self::NAME, r.u32(), MAX_CAPABILITIES)?;
        let mut capabilities = Vec::with_capacity(n);
        for _ in 0..n {
            let codec = r.u32();
            let max_frames_per_packet = r.u32();
            r.skip(8);
            capabilities.push(Capability {
                codec,
                max_frames_per_packet,
            });
        }
        Ok(Self { capabilities })
    }
}

/// Alarmmeldung des Telefons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub severity: u32,
    pub text: String,
    pub param1: u32,
    pub param2: u32,
}

impl WireMessage for Alarm {
    const ID: u32 = ids::ALARM;
    const NAME: &'static str = "Alarm";
    const SIZE: usize = 92;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.severity);
        w.string(&self.text, 80);
        w.u32(self.param1);
        w.u32(self.param2);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            severity: r.u32(),
            text: r.string(80),
            param1: r.u32(),
            param2: r.u32(),
        })
    }
}

/// RTP-Statistik eines beendeten Anrufs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatisticsRes {
    pub directory_number: String,
    pub call_reference: u32,
    pub processing_mode: u32,
    pub packets_sent: u32,
    pub octets_sent: u32,
    pub packets_received: u32,
    pub octets_received: u32,
    pub packets_lost: u32,
    pub jitter: u32,
    pub latency: u32,
}

impl WireMessage for ConnectionStatisticsRes {
    const ID: u32 = ids::CONNECTION_STATISTICS_RES;
    const NAME: &'static str = "ConnectionStatisticsRes";
    const SIZE: usize = 60;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.directory_number, DIRECTORY_NUMBER_SIZE);
        w.u32(self.call_reference);
        w.u32(self.processing_mode);
        w.u32(self.packets_sent);
        w.u32(self.octets_sent);
        w.u32(self.packets_received);
        w.u32(self.octets_received);
        w.u32(self.packets_lost);
        w.u32(self.jitter);
        w.u32(self.latency);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            directory_number: r.string(DIRECTORY_NUMBER_SIZE),
            call_reference: r.u32(),
            processing_mode: r.u32(),
            packets_sent: r.u32(),
            octets_sent: r.u32(),
            packets_received: r.u32(),
            octets_received: r.u32(),
            packets_lost: r.u32(),
            jitter: r.u32(),
            latency: r.u32(),
        })
    }
}

/// Softkey gedrueckt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftKeyEventMessage {
    /// Ereigniscode (siehe `SoftKeyEvent`)
    pub event: u32,
    pub line_instance: u32,
    pub call_reference: u32,
}

impl WireMessage for SoftKeyEventMessage {
    const ID: u32 = ids::SOFT_KEY_EVENT;
    const NAME: &'static str = "SoftKeyEvent";
    const SIZE: usize = 12;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.event);
        w.u32(self.line_instance);
        w.u32(self.call_reference);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            event: r.u32(),
            line_instance: r.u32(),
            call_reference: r.u32(),
        })
    }
}

/// Token-Anfrage vor der Registrierung (primaere Familie)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTokenReq {
    pub device_name: String,
    pub user_id: u32,
    pub instance: u32,
    pub ip: Ipv4Addr,
    pub device_type: u32,
}

impl WireMessage for RegisterTokenReq {
    const ID: u32 = ids::REGISTER_TOKEN_REQ;
    const NAME: &'static str = "RegisterTokenReq";
    const SIZE: usize = 32;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.device_name, 16);
        w.u32(self.user_id);
        w.u32(self.instance);
        w.ipv4(self.ip);
        w.u32(self.device_type);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            device_name: r.string(16),
            user_id: r.u32(),
            instance: r.u32(),
            ip: r.ipv4(),
            device_type: r.u32(),
        })
    }
}

/// Token-Anfrage der Lite-Familie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpcpRegisterTokenReq {
    pub device_name: String,
    pub ip: Ipv4Addr,
    pub device_type: u32,
    pub max_streams: u32,
}

impl WireMessage for SpcpRegisterTokenReq {
    const ID: u32 = ids::SPCP_REGISTER_TOKEN_REQ;
    const NAME: &'static str = "SpcpRegisterTokenReq";
    const SIZE: usize = 28;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.device_name, 16);
        w.ipv4(self.ip);
        w.u32(self.device_type);
        w.u32(self.max_streams);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            device_name: r.string(16),
            ip: r.ipv4(),
            device_type: r.u32(),
            max_streams: r.u32(),
        })
    }
}

/// Headset an/ab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadsetStatus {
    pub mode: u32,
}

impl WireMessage for HeadsetStatus {
    const ID: u32 = ids::HEADSET_STATUS;
    const NAME: &'static str = "HeadsetStatus";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.mode);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self { mode: r.u32() })
    }
}

/// Anzahl Leitungen die das Telefon darstellen kann
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterAvailableLines {
    pub max_lines: u32,
}

impl WireMessage for RegisterAvailableLines {
    const ID: u32 = ids::REGISTER_AVAILABLE_LINES;
    const NAME: &'static str = "RegisterAvailableLines";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.max_lines);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self { max_lines: r.u32() })
    }
}

// --- versionsabhaengige Eingangsnachrichten (Layouts in `layouts`) ---

/// Antwort auf OpenReceiveChannel (Audio und Video)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenReceiveChannelAck {
    /// Siehe `MediaStatus`
    pub media_status: u32,
    pub ip: IpAddr,
    pub port: u32,
    pub pass_thru_party_id: u32,
    /// Erst ab v17 uebertragen
    pub call_reference: u32,
}

/// Antwort auf StartMediaTransmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartMediaTransmissionAck {
    pub call_reference: u32,
    pub pass_thru_party_id: u32,
    pub call_reference1: u32,
    pub ip: IpAddr,
    pub port: u32,
    /// Siehe `MediaStatus`
    pub media_status: u32,
}

/// Blockwahl (komplette Nummer in einer Nachricht)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnblocCall {
    pub called_party: String,
    /// Erst ab v17 uebertragen
    pub line_instance: u32,
}

/// Antwort auf PortRequest (ab v19)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortResponse {
    pub call_reference: u32,
    pub pass_thru_party_id: u32,
    pub ip: IpAddr,
    pub port: u32,
    pub rtcp_port: u32,
}

// ---------------------------------------------------------------------------
// Gateway -> Telefon
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTone {
    pub tone: Tone,
    pub line_instance: u32,
    pub call_reference: u32,
}

impl WireMessage for StartTone {
    const ID: u32 = ids::START_TONE;
    const NAME: &'static str = "StartTone";
    const SIZE: usize = 16;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.tone.as_u32());
        // toneDirection
        w.u32(0);
        w.u32(self.line_instance);
        w.u32(self.call_reference);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let tone = wert("tone", r.u32(), Tone::from_u32)?;
        r.skip(4);
        Ok(Self {
            tone,
            line_instance: r.u32(),
            call_reference: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRinger {
    pub mode: RingMode,
    /// Nur einmal klingeln statt fortlaufend
    pub einmal: bool,
    pub line_instance: u32,
    pub call_reference: u32,
}

impl WireMessage for SetRinger {
    const ID: u32 = ids::SET_RINGER;
    const NAME: &'static str = "SetRinger";
    const SIZE: usize = 16;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.mode.as_u32());
        // ringDuration: 1 = normal, 2 = single
        w.u32(if self.einmal { 2 } else { 1 });
        w.u32(self.line_instance);
        w.u32(self.call_reference);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            mode: wert("ringMode", r.u32(), RingMode::from_u32)?,
            einmal: r.u32() == 2,
            line_instance: r.u32(),
            call_reference: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetLamp {
    pub stimulus: ButtonType,
    pub instance: u32,
    pub mode: LampMode,
}

impl WireMessage for SetLamp {
    const ID: u32 = ids::SET_LAMP;
    const NAME: &'static str = "SetLamp";
    const SIZE: usize = 12;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.stimulus.as_u32());
        w.u32(self.instance);
        w.u32(self.mode.as_u32());
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            stimulus: wert("stimulus", r.u32(), ButtonType::from_u32)?,
            instance: r.u32(),
            mode: wert("lampMode", r.u32(), LampMode::from_u32)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSpeakerMode {
    pub mode: SpeakerMode,
}

impl WireMessage for SetSpeakerMode {
    const ID: u32 = ids::SET_SPEAKER_MODE;
    const NAME: &'static str = "SetSpeakerMode";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.mode.as_u32());
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            mode: wert("speakerMode", r.u32(), SpeakerMode::from_u32)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedDialStat {
    pub number: u32,
    pub dir_number: String,
    pub display_name: String,
}

impl WireMessage for SpeedDialStat {
    const ID: u32 = ids::SPEED_DIAL_STAT;
    const NAME: &'static str = "SpeedDialStat";
    const SIZE: usize = 68;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.number);
        w.string(&self.dir_number, DIRECTORY_NUMBER_SIZE);
        w.string(&self.display_name, NAME_SIZE);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            number: r.u32(),
            dir_number: r.string(DIRECTORY_NUMBER_SIZE),
            display_name: r.string(NAME_SIZE),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStat {
    pub line_number: u32,
    pub dir_number: String,
    pub display_name: String,
    pub label: String,
    pub display_options: u32,
}

impl WireMessage for LineStat {
    const ID: u32 = ids::LINE_STAT;
    const NAME: &'static str = "LineStat";
    const SIZE: usize = 112;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.line_number);
        w.string(&self.dir_number, DIRECTORY_NUMBER_SIZE);
        w.string(&self.display_name, NAME_SIZE);
        w.string(&self.label, NAME_SIZE);
        w.u32(self.display_options);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            line_number: r.u32(),
            dir_number: r.string(DIRECTORY_NUMBER_SIZE),
            display_name: r.string(NAME_SIZE),
            label: r.string(NAME_SIZE),
            display_options: r.u32(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStat {
    pub device_name: String,
    pub user_id: u32,
    pub instance: u32,
    pub user_name: String,
    pub server_name: String,
    pub number_lines: u32,
    pub number_speed_dials: u32,
}

impl WireMessage for ConfigStat {
    const ID: u32 = ids::CONFIG_STAT;
    const NAME: &'static str = "ConfigStat";
    const SIZE: usize = 112;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.device_name, 16);
        w.u32(self.user_id);
        w.u32(self.instance);
        w.string(&self.user_name, NAME_SIZE);
        w.string(&self.server_name, NAME_SIZE);
        w.u32(self.number_lines);
        w.u32(self.number_speed_dials);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            device_name: r.string(16),
            user_id: r.u32(),
            instance: r.u32(),
            user_name: r.string(NAME_SIZE),
            server_name: r.string(NAME_SIZE),
            number_lines: r.u32(),
            number_speed_dials: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefineTimeDate {
    pub year: u32,
    pub month: u32,
    pub day_of_week: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
    /// Unix-Zeit in Sekunden
    pub system_time: u32,
}

impl WireMessage for DefineTimeDate {
    const ID: u32 = ids::DEFINE_TIME_DATE;
    const NAME: &'static str = "DefineTimeDate";
    const SIZE: usize = 36;

    fn encode(&self, w: &mut PayloadWriter) {
        for v in [
            self.year,
            self.month,
            self.day_of_week,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.millisecond,
            self.system_time,
        ] {
            w.u32(v);
        }
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            year: r.u32(),
            month: r.u32(),
            day_of_week: r.u32(),
            day: r.u32(),
            hour: r.u32(),
            minute: r.u32(),
            second: r.u32(),
            millisecond: r.u32(),
            system_time: r.u32(),
        })
    }
}

/// Ein Platz im Button-Template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonDefinition {
    pub instance: u8,
    /// Tastentyp (`ButtonType::as_u8`)
    pub button_type: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonTemplate {
    pub offset: u32,
    pub total: u32,
    pub buttons: Vec<ButtonDefinition>,
}

impl WireMessage for ButtonTemplate {
    const ID: u32 = ids::BUTTON_TEMPLATE;
    const NAME: &'static str = "ButtonTemplate";
    const SIZE: usize = 12 + MAX_BUTTON_DEFINITIONS * 2;

    fn encode(&self, w: &mut PayloadWriter) {
        let n = self.buttons.len().min(MAX_BUTTON_DEFINITIONS);
        w.u32(self.offset);
        w.u32(n as u32);
        w.u32(self.total);
        for b in &self.buttons[..n] {
            w.u8(b.instance);
            w.u8(b.button_type);
        }
        w.zeros((MAX_BUTTON_DEFINITIONS - n) * 2);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let offset = r.u32();
        let n = zaehler(Self::NAME, r.u32(), MAX_BUTTON_DEFINITIONS)?;
        let total = r.u32();
        let buttons = (0..n)
            .map(|_| ButtonDefinition {
                instance: r.u8(),
                button_type: r.u8(),
            })
            .collect();
        Ok(Self {
            offset,
            total,
            buttons,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRes {
    pub version: String,
}

impl WireMessage for VersionRes {
    const ID: u32 = ids::VERSION;
    const NAME: &'static str = "Version";
    const SIZE: usize = 16;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.version, 16);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            version: r.string(16),
        })
    }
}

/// Ablehnung mit lesbarem Grund fuer das Display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterReject {
    pub text: String,
}

impl WireMessage for RegisterReject {
    const ID: u32 = ids::REGISTER_REJECT;
    const NAME: &'static str = "RegisterReject";
    const SIZE: usize = 33;

    fn encode(&self, w: &mut PayloadWriter) {
        w.string(&self.text, Self::SIZE);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            text: r.string(Self::SIZE),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reset {
    pub reset_type: ResetType,
}

impl WireMessage for Reset {
    const ID: u32 = ids::RESET;
    const NAME: &'static str = "Reset";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.reset_type.as_u32());
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            reset_type: wert("resetType", r.u32(), ResetType::from_u32)?,
        })
    }
}

/// Beschriftung + Ereigniscode eines Softkeys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftKeyDefinition {
    pub label: String,
    pub event: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftKeyTemplateRes {
    pub offset: u32,
    pub total: u32,
    pub keys: Vec<SoftKeyDefinition>,
}

impl WireMessage for SoftKeyTemplateRes {
    const ID: u32 = ids::SOFT_KEY_TEMPLATE_RES;
    const NAME: &'static str = "SoftKeyTemplateRes";
    const SIZE: usize = 12 + MAX_SOFTKEY_DEFINITIONS * 20;

    fn encode(&self, w: &mut PayloadWriter) {
        let n = self.keys.len().min(MAX_SOFTKEY_DEFINITIONS);
        w.u32(self.offset);
        w.u32(n as u32);
        w.u32(self.total);
        for k in &self.keys[..n] {
            w.string(&k.label, 16);
            w.u32(k.event);
        }
        w.zeros((MAX_SOFTKEY_DEFINITIONS - n) * 20);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let offset = r.u32();
        let n = zaehler(Self::NAME, r.u32(), MAX_SOFTKEY_DEFINITIONS)?;
        let total = r.u32();
        let keys = (0..n)
            .map(|_| SoftKeyDefinition {
                label: r.string(16),
                event: r.u32(),
            })
            .collect();
        Ok(Self {
            offset,
            total,
            keys,
        })
    }
}

/// Ein Softkey-Set: Indizes in das Template (1-basiert, 0 = leer)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftKeySet {
    pub template_index: [u8; SOFTKEYS_PER_SET],
    pub info_index: [u16; SOFTKEYS_PER_SET],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoftKeySetRes {
    pub offset: u32,
    pub total: u32,
    pub sets: Vec<SoftKeySet>,
}

impl WireMessage for SoftKeySetRes {
    const ID: u32 = ids::SOFT_KEY_SET_RES;
    const NAME: &'static str = "SoftKeySetRes";
    const SIZE: usize = 12 + MAX_SOFTKEY_SETS * 48;

    fn encode(&self, w: &mut PayloadWriter) {
        let n = self.sets.len().min(MAX_SOFTKEY_SETS);
        w.u32(self.offset);
        w.u32(n as u32);
        w.u32(self.total);
        for set in &self.sets[..n] {
            w.bytes(&set.template_index);
            for info in set.info_index {
                w.u16(info);
            }
        }
        w.zeros((MAX_SOFTKEY_SETS - n) * 48);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        let offset = r.u32();
        let n = zaehler(Self::NAME, r.u32(), MAX_SOFTKEY_SETS)?;
        let total = r.u32();
        let mut sets = Vec::with_capacity(n);
        for _ in 0..n {
            let template_index = r.array::<SOFTKEYS_PER_SET>();
            let mut info_index = [0u16; SOFTKEYS_PER_SET];
            for info in info_index.iter_mut() {
                *info = r.u16();
            }
            sets.push(SoftKeySet {
                template_index,
                info_index,
            });
        }
        Ok(Self {
            offset,
            total,
            sets,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectSoftKeys {
    pub line_instance: u32,
    pub call_reference: u32,
    pub key_mode: KeyMode,
    pub valid_key_mask: u32,
}

impl WireMessage for SelectSoftKeys {
    const ID: u32 = ids::SELECT_SOFT_KEYS;
    const NAME: &'static str = "SelectSoftKeys";
    const SIZE: usize = 16;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.line_instance);
        w.u32(self.call_reference);
        w.u32(self.key_mode.as_u32());
        w.u32(self.valid_key_mask);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            line_instance: r.u32(),
            call_reference: r.u32(),
            key_mode: wert("softKeySetIndex", r.u32(), KeyMode::from_u32)?,
            valid_key_mask: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStateMessage {
    pub state: CallState,
    pub line_instance: u32,
    pub call_reference: u32,
    /// 0 = sichtbar, 1 = verborgen
    pub visibility: u32,
    pub priority: u32,
}

impl WireMessage for CallStateMessage {
    const ID: u32 = ids::CALL_STATE;
    const NAME: &'static str = "CallState";
    const SIZE: usize = 24;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.state.as_u32());
        w.u32(self.line_instance);
        w.u32(self.call_reference);
        w.u32(self.visibility);
        w.u32(self.priority);
        w.u32(0);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            state: wert("callState", r.u32(), CallState::from_u32)?,
            line_instance: r.u32(),
            call_reference: r.u32(),
            visibility: r.u32(),
            priority: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateCallPlane {
    pub line_instance: u32,
}

impl WireMessage for ActivateCallPlane {
    const ID: u32 = ids::ACTIVATE_CALL_PLANE;
    const NAME: &'static str = "ActivateCallPlane";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.line_instance);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            line_instance: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnregisterAck {
    pub status: UnregisterStatus,
}

impl WireMessage for UnregisterAck {
    const ID: u32 = ids::UNREGISTER_ACK;
    const NAME: &'static str = "UnregisterAck";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.status.as_u32());
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            status: wert("status", r.u32(), UnregisterStatus::from_u32)?,
        })
    }
}

/// Status einer Feature-Taste (DND, Privacy, Monitor, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStat {
    pub instance: u32,
    pub button_type: ButtonType,
    pub status: u32,
    pub label: String,
}

impl WireMessage for FeatureStat {
    const ID: u32 = ids::FEATURE_STAT;
    const NAME: &'static str = "FeatureStat";
    const SIZE: usize = 52;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.instance);
        w.u32(self.button_type.as_u32());
        w.u32(self.status);
        w.string(&self.label, NAME_SIZE);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            instance: r.u32(),
            button_type: wert("featureType", r.u32(), ButtonType::from_u32)?,
            status: r.u32(),
            label: r.string(NAME_SIZE),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearPriNotify {
    pub priority: u32,
}

impl WireMessage for ClearPriNotify {
    const ID: u32 = ids::CLEAR_PRI_NOTIFY;
    const NAME: &'static str = "ClearPriNotify";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.priority);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            priority: r.u32(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterTokenReject {
    /// Sekunden bis zur naechsten Token-Anfrage
    pub wait_time: u32,
}

impl WireMessage for RegisterTokenReject {
    const ID: u32 = ids::REGISTER_TOKEN_REJECT;
    const NAME: &'static str = "RegisterTokenReject";
    const SIZE: usize = 4;

    fn encode(&self, w: &mut PayloadWriter) {
        w.u32(self.wait_time);
    }

    fn decode(r: &mut PayloadReader<'_>) -> Result<Self, MessageError> {
        Ok(Self {
            wait_time: r.u32(),
        })
    }
}

/// Token-Ack/-Reject der Lite-Familie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpcpTokenAnswer {
    pub features: u32,
}

impl SpcpTokenAnswer {
    pub const SIZE: usize = 4;
}

// --- versionsabhaengige Ausgangsnachrichten (Layouts in `layouts`) ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAck {
    pub keepalive: u32,
    /// Datumsformat, z.B. `D.M.Y`
    pub date_template: String,
    pub secondary_keepalive: u32,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub calling_name: String,
    pub calling_number: String,
    pub called_name: String,
    pub called_number: String,
    pub original_called_name: String,
    pub original_called_number: String,
    pub line_instance: u32,
    pub call_reference: u32,
    pub call_type: CallType,
    pub call_instance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialedNumber {
    pub number: String,
    pub line_instance: u32,
    pub call_reference: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPrompt {
    /// Sekunden, 0 = dauerhaft
    pub timeout: u32,
    pub text: String,
    pub line_instance: u32,
    pub call_reference: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNotify {
    pub timeout: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPriNotify {
    pub timeout: u32,
    pub priority: u32,
    pub text: String,
}

/// Weiterleitungsstatus einer Leitung (`None` = inaktiv)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardStat {
    pub line_number: u32,
    pub all: Option<String>,
    pub busy: Option<String>,
    pub no_answer: Option<String>,
}

impl ForwardStat {
    pub fn aktiv(&self) -> bool {
        self.all.is_some() || self.busy.is_some() || self.no_answer.is_some()
    }
}

/// Aufforderung einen Empfangskanal zu oeffnen (Audio und Video)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenReceiveChannel {
    pub conference_id: u32,
    pub pass_thru_party_id: u32,
    /// Paketgroesse in Millisekunden
    pub packet_size: u32,
    /// Payload-Capability (siehe `Codec`)
    pub payload_type: u32,
    pub echo_cancel: bool,
    pub call_reference: u32,
}

/// Aufforderung an eine entfernte Adresse zu senden (Audio und Video)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartMediaTransmission {
    pub conference_id: u32,
    pub pass_thru_party_id: u32,
    pub remote: SocketAddr,
    pub packet_size: u32,
    pub payload_type: u32,
    pub precedence: u32,
    pub silence_suppression: bool,
    pub max_frames_per_packet: u16,
    pub call_reference: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatisticsReq {
    pub directory_number: String,
    pub call_reference: u32,
    /// Statistik nach dem Lesen zuruecksetzen
    pub clear: bool,
}

/// PortRequest/PortClose (ab v19)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
    pub conference_id: u32,
    pub pass_thru_party_id: u32,
    pub call_reference: u32,
    pub video: bool,
}
