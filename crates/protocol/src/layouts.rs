//! Versionsabhaengige Draht-Layouts
//!
//! Pro Nachricht und Layout-Stand ein `MessageCodec`. Die Versionstabelle
//! in `version` setzt daraus die `HandlerSet`s zusammen. Felder, die ein
//! aelteres Layout nicht kennt, werden beim Dekodieren mit 0 belegt.

use crate::enums::CallType;
use crate::error::MessageError;
use crate::fields::{PayloadReader, PayloadWriter};
use crate::ids;
use crate::messages::{
    wert, CallInfo, ConnectionStatisticsReq, DialedNumber, DisplayNotify, DisplayPriNotify,
    DisplayPrompt, EnblocCall, ForwardStat, OpenReceiveChannel, OpenReceiveChannelAck, PortRef,
    PortResponse, RegisterAck, StartMediaTransmission, StartMediaTransmissionAck,
    DIRECTORY_NUMBER_SIZE, DISPLAY_TEXT_SIZE, DYNAMIC_TEXT_MAX, NAME_SIZE,
};
use crate::version::MessageCodec;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Laenge der Nummernfelder ab v19
const NUMBER_SIZE_V19: usize = 25;

/// RFC-2833-Payload fuer DTMF im v17-OpenReceiveChannel
const RTP_DTMF_PAYLOAD: u32 = 101;
/// RTP-Timeout in Sekunden im v17-OpenReceiveChannel
const RTP_TIMEOUT: u32 = 10;

fn nur_v4(ip: IpAddr) -> Ipv4Addr {
    match ip {
        IpAddr::V4(v4) => v4,
        // das v3-Layout kennt nur IPv4
        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    }
}

// ---------------------------------------------------------------------------
// RegisterAck
// ---------------------------------------------------------------------------

fn register_ack_kopf(m: &RegisterAck, w: &mut PayloadWriter) {
    w.u32(m.keepalive);
    w.string(&m.date_template, 6);
    w.zeros(2);
    w.u32(m.secondary_keepalive);
}

fn register_ack_kopf_lesen(r: &mut PayloadReader<'_>) -> (u32, String, u32) {
    let keepalive = r.u32();
    let date_template = r.string(6);
    r.skip(2);
    (keepalive, date_template, r.u32())
}

fn register_ack_v3_encode(m: &RegisterAck, w: &mut PayloadWriter) {
    register_ack_kopf(m, w);
    w.u32(u32::from(m.protocol_version));
}

fn register_ack_v3_decode(r: &mut PayloadReader<'_>) -> Result<RegisterAck, MessageError> {
    let (keepalive, date_template, secondary_keepalive) = register_ack_kopf_lesen(r);
    Ok(RegisterAck {
        keepalive,
        date_template,
        secondary_keepalive,
        protocol_version: (r.u32() & 0xFF) as u8,
    })
}

fn register_ack_mit_features(m: &RegisterAck, w: &mut PayloadWriter, features: [u8; 3]) {
    register_ack_kopf(m, w);
    w.u8(m.protocol_version);
    w.bytes(&features);
}

fn register_ack_v4_encode(m: &RegisterAck, w: &mut PayloadWriter) {
    register_ack_mit_features(m, w, [0x00, 0x00, 0x00]);
}

fn register_ack_v11_encode(m: &RegisterAck, w: &mut PayloadWriter) {
    register_ack_mit_features(m, w, [0x00, 0xF1, 0xFF]);
}

fn register_ack_v22_encode(m: &RegisterAck, w: &mut PayloadWriter) {
    register_ack_mit_features(m, w, [0x20, 0xF1, 0xFF]);
}

fn register_ack_v4_decode(r: &mut PayloadReader<'_>) -> Result<RegisterAck, MessageError> {
    let (keepalive, date_template, secondary_keepalive) = register_ack_kopf_lesen(r);
    let protocol_version = r.u8();
    r.skip(3);
    Ok(RegisterAck {
        keepalive,
        date_template,
        secondary_keepalive,
        protocol_version,
    })
}

pub(crate) const REGISTER_ACK_V3: MessageCodec<RegisterAck> = MessageCodec {
    id: ids::REGISTER_ACK,
    name: "RegisterAck",
    size: 20,
    encode: register_ack_v3_encode,
    decode: register_ack_v3_decode,
};

pub(crate) const REGISTER_ACK_V4: MessageCodec<RegisterAck> = MessageCodec {
    encode: register_ack_v4_encode,
    decode: register_ack_v4_decode,
    ..REGISTER_ACK_V3
};

pub(crate) const REGISTER_ACK_V11: MessageCodec<RegisterAck> = MessageCodec {
    encode: register_ack_v11_encode,
    ..REGISTER_ACK_V4
};

pub(crate) const REGISTER_ACK_V22: MessageCodec<RegisterAck> = MessageCodec {
    encode: register_ack_v22_encode,
    ..REGISTER_ACK_V4
};

// ---------------------------------------------------------------------------
// CallInfo (statisch bis v15, dynamisch ab v16)
// ---------------------------------------------------------------------------

fn call_info_static_encode(m: &CallInfo, w: &mut PayloadWriter) {
    w.string(&m.calling_name, NAME_SIZE);
    w.string(&m.calling_number, DIRECTORY_NUMBER_SIZE);
    w.string(&m.called_name, NAME_SIZE);
    w.string(&m.called_number, DIRECTORY_NUMBER_SIZE);
    w.u32(m.line_instance);
    w.u32(m.call_reference);
    w.u32(m.call_type.as_u32());
    w.string(&m.original_called_name, NAME_SIZE);
    w.string(&m.original_called_number, DIRECTORY_NUMBER_SIZE);
    w.u32(m.call_instance);
    // callSecurityStatus
    w.u32(0);
}

fn call_info_static_decode(r: &mut PayloadReader<'_>) -> Result<CallInfo, MessageError> {
    let calling_name = r.string(NAME_SIZE);
    let calling_number = r.string(DIRECTORY_NUMBER_SIZE);
    let called_name = r.string(NAME_SIZE);
    let called_number = r.string(DIRECTORY_NUMBER_SIZE);
    let line_instance = r.u32();
    let call_reference = r.u32();
    let call_type = wert("callType", r.u32(), CallType::from_u32)?;
    let original_called_name = r.string(NAME_SIZE);
    let original_called_number = r.string(DIRECTORY_NUMBER_SIZE);
    let call_instance = r.u32();
    Ok(CallInfo {
        calling_name,
        calling_number,
        called_name,
        called_number,
        original_called_name,
        original_called_number,
        line_instance,
        call_reference,
        call_type,
        call_instance,
    })
}

fn call_info_dynamic_encode(m: &CallInfo, w: &mut PayloadWriter) {
    w.u32(m.line_instance);
    w.u32(m.call_reference);
    w.u32(m.call_type.as_u32());
    // originalCdpnRedirectReason, lastRedirectingReason
    w.zeros(8);
    w.u32(m.call_instance);
    // callSecurityStatus, partyPIRestrictionBits
    w.zeros(8);
    w.cstring(&m.calling_number, DIRECTORY_NUMBER_SIZE);
    w.cstring(&m.called_number, DIRECTORY_NUMBER_SIZE);
    w.cstring(&m.original_called_number, DIRECTORY_NUMBER_SIZE);
    w.cstring(&m.calling_name, NAME_SIZE);
    w.cstring(&m.called_name, NAME_SIZE);
    w.cstring(&m.original_called_name, NAME_SIZE);
    w.align4();
}

fn call_info_dynamic_decode(r: &mut PayloadReader<'_>) -> Result<CallInfo, MessageError> {
    let line_instance = r.u32();
    let call_reference = r.u32();
    let call_type = wert("callType", r.u32(), CallType::from_u32)?;
    r.skip(8);
    let call_instance = r.u32();
    r.skip(8);
    let calling_number = r.cstring();
    let called_number = r.cstring();
    let original_called_number = r.cstring();
    let calling_name = r.cstring();
    let called_name = r.cstring();
    let original_called_name = r.cstring();
    Ok(CallInfo {
        calling_name,
        calling_number,
        called_name,
        called_number,
        original_called_name,
        original_called_number,
        line_instance,
        call_reference,
        call_type,
        call_instance,
    })
}

pub(crate) const CALL_INFO_STATIC: MessageCodec<CallInfo> = MessageCodec {
    id: ids::CALL_INFO,
    name: "CallInfo",
    size: 212,
    encode: call_info_static_encode,
    decode: call_info_static_decode,
};

pub(crate) const CALL_INFO_DYNAMIC: MessageCodec<CallInfo> = MessageCodec {
    id: ids::DYNAMIC_CALL_INFO,
    name: "DynamicCallInfo",
    // 32 Bytes Kopf + 3 Nummern + 3 Namen inkl. NUL, ausgerichtet
    size: 232,
    encode: call_info_dynamic_encode,
    decode: call_info_dynamic_decode,
};

// ---------------------------------------------------------------------------
// Anzeigen (statisch bis v15, dynamisch ab v16)
// ---------------------------------------------------------------------------

fn prompt_static_encode(m: &DisplayPrompt, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.string(&m.text, DISPLAY_TEXT_SIZE);
    w.u32(m.line_instance);
    w.u32(m.call_reference);
}

fn prompt_static_decode(r: &mut PayloadReader<'_>) -> Result<DisplayPrompt, MessageError> {
    Ok(DisplayPrompt {
        timeout: r.u32(),
        text: r.string(DISPLAY_TEXT_SIZE),
        line_instance: r.u32(),
        call_reference: r.u32(),
    })
}

fn prompt_dynamic_encode(m: &DisplayPrompt, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.u32(m.line_instance);
    w.u32(m.call_reference);
    w.cstring(&m.text, DYNAMIC_TEXT_MAX);
    w.align4();
}

fn prompt_dynamic_decode(r: &mut PayloadReader<'_>) -> Result<DisplayPrompt, MessageError> {
    let timeout = r.u32();
    let line_instance = r.u32();
    let call_reference = r.u32();
    Ok(DisplayPrompt {
        timeout,
        text: r.cstring(),
        line_instance,
        call_reference,
    })
}

pub(crate) const DISPLAY_PROMPT_STATIC: MessageCodec<DisplayPrompt> = MessageCodec {
    id: ids::DISPLAY_PROMPT_STATUS,
    name: "DisplayPromptStatus",
    size: 44,
    encode: prompt_static_encode,
    decode: prompt_static_decode,
};

pub(crate) const DISPLAY_PROMPT_DYNAMIC: MessageCodec<DisplayPrompt> = MessageCodec {
    id: ids::DISPLAY_DYNAMIC_PROMPT_STATUS,
    name: "DisplayDynamicPromptStatus",
    size: 116,
    encode: prompt_dynamic_encode,
    decode: prompt_dynamic_decode,
};

fn notify_static_encode(m: &DisplayNotify, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.string(&m.text, DISPLAY_TEXT_SIZE);
}

fn notify_static_decode(r: &mut PayloadReader<'_>) -> Result<DisplayNotify, MessageError> {
    Ok(DisplayNotify {
        timeout: r.u32(),
        text: r.string(DISPLAY_TEXT_SIZE),
    })
}

fn notify_dynamic_encode(m: &DisplayNotify, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.cstring(&m.text, DYNAMIC_TEXT_MAX);
    w.align4();
}

fn notify_dynamic_decode(r: &mut PayloadReader<'_>) -> Result<DisplayNotify, MessageError> {
    Ok(DisplayNotify {
        timeout: r.u32(),
        text: r.cstring(),
    })
}

pub(crate) const DISPLAY_NOTIFY_STATIC: MessageCodec<DisplayNotify> = MessageCodec {
    id: ids::DISPLAY_NOTIFY,
    name: "DisplayNotify",
    size: 36,
    encode: notify_static_encode,
    decode: notify_static_decode,
};

pub(crate) const DISPLAY_NOTIFY_DYNAMIC: MessageCodec<DisplayNotify> = MessageCodec {
    id: ids::DISPLAY_DYNAMIC_NOTIFY,
    name: "DisplayDynamicNotify",
    size: 108,
    encode: notify_dynamic_encode,
    decode: notify_dynamic_decode,
};

fn pri_notify_static_encode(m: &DisplayPriNotify, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.u32(m.priority);
    w.string(&m.text, DISPLAY_TEXT_SIZE);
}

fn pri_notify_static_decode(r: &mut PayloadReader<'_>) -> Result<DisplayPriNotify, MessageError> {
    Ok(DisplayPriNotify {
        timeout: r.u32(),
        priority: r.u32(),
        text: r.string(DISPLAY_TEXT_SIZE),
    })
}

fn pri_notify_dynamic_encode(m: &DisplayPriNotify, w: &mut PayloadWriter) {
    w.u32(m.timeout);
    w.u32(m.priority);
    w.cstring(&m.text, DYNAMIC_TEXT_MAX);
    w.align4();
}

fn pri_notify_dynamic_decode(
    r: &mut PayloadReader<'_>,
) -> Result<DisplayPriNotify, MessageError> {
    Ok(DisplayPriNotify {
        timeout: r.u32(),
        priority: r.u32(),
        text: r.cstring(),
    })
}

pub(crate) const DISPLAY_PRI_NOTIFY_STATIC: MessageCodec<DisplayPriNotify> = MessageCodec {
    id: ids::DISPLAY_PRI_NOTIFY,
    name: "DisplayPriNotify",
    size: 40,
    encode: pri_notify_static_encode,
    decode: pri_notify_static_decode,
};

pub(crate) const DISPLAY_PRI_NOTIFY_DYNAMIC: MessageCodec<DisplayPriNotify> = MessageCodec {
    id: ids::DISPLAY_DYNAMIC_PRI_NOTIFY,
    name: "DisplayDynamicPriNotify",
    size: 112,
    encode: pri_notify_dynamic_encode,
    decode: pri_notify_dynamic_decode,
};

// ---------------------------------------------------------------------------
// DialedNumber
// ---------------------------------------------------------------------------

fn dialed_v3_encode(m: &DialedNumber, w: &mut PayloadWriter) {
    w.string(&m.number, DIRECTORY_NUMBER_SIZE);
    w.u32(m.line_instance);
    w.u32(m.call_reference);
}

fn dialed_v3_decode(r: &mut PayloadReader<'_>) -> Result<DialedNumber, MessageError> {
    Ok(DialedNumber {
        number: r.string(DIRECTORY_NUMBER_SIZE),
        line_instance: r.u32(),
        call_reference: r.u32(),
    })
}

fn dialed_v19_encode(m: &DialedNumber, w: &mut PayloadWriter) {
    w.u32(m.line_instance);
    w.u32(m.call_reference);
    w.string(&m.number, NUMBER_SIZE_V19);
    w.align4();
}

fn dialed_v19_decode(r: &mut PayloadReader<'_>) -> Result<DialedNumber, MessageError> {
    let line_instance = r.u32();
    let call_reference = r.u32();
    Ok(DialedNumber {
        number: r.string(NUMBER_SIZE_V19),
        line_instance,
        call_reference,
    })
}

pub(crate) const DIALED_NUMBER_V3: MessageCodec<DialedNumber> = MessageCodec {
    id: ids::DIALED_NUMBER,
    name: "DialedNumber",
    size: 32,
    encode: dialed_v3_encode,
    decode: dialed_v3_decode,
};

pub(crate) const DIALED_NUMBER_V19: MessageCodec<DialedNumber> = MessageCodec {
    size: 36,
    encode: dialed_v19_encode,
    decode: dialed_v19_decode,
    ..DIALED_NUMBER_V3
};

// ---------------------------------------------------------------------------
// ForwardStat
// ---------------------------------------------------------------------------

fn forward_encode(m: &ForwardStat, w: &mut PayloadWriter, breite: usize) {
    w.bool32(m.aktiv());
    w.u32(m.line_number);
    for ziel in [&m.all, &m.busy, &m.no_answer] {
        w.bool32(ziel.is_some());
        w.string(ziel.as_deref().unwrap_or(""), breite);
    }
    w.align4();
}

fn forward_decode(r: &mut PayloadReader<'_>, breite: usize) -> ForwardStat {
    r.skip(4);
    let line_number = r.u32();
    let mut ziele: [Option<String>; 3] = [None, None, None];
    for ziel in ziele.iter_mut() {
        let aktiv = r.u32() != 0;
        let nummer = r.string(breite);
        if aktiv {
            *ziel = Some(nummer);
        }
    }
    let [all, busy, no_answer] = ziele;
    ForwardStat {
        line_number,
        all,
        busy,
        no_answer,
    }
}

fn forward_v3_encode(m: &ForwardStat, w: &mut PayloadWriter) {
    forward_encode(m, w, DIRECTORY_NUMBER_SIZE);
}

fn forward_v3_decode(r: &mut PayloadReader<'_>) -> Result<ForwardStat, MessageError> {
    Ok(forward_decode(r, DIRECTORY_NUMBER_SIZE))
}

fn forward_v19_encode(m: &ForwardStat, w: &mut PayloadWriter) {
    forward_encode(m, w, NUMBER_SIZE_V19);
}

fn forward_v19_decode(r: &mut PayloadReader<'_>) -> Result<ForwardStat, MessageError> {
    Ok(forward_decode(r, NUMBER_SIZE_V19))
}

pub(crate) const FORWARD_STAT_V3: MessageCodec<ForwardStat> = MessageCodec {
    id: ids::FORWARD_STAT,
    name: "ForwardStat",
    size: 92,
    encode: forward_v3_encode,
    decode: forward_v3_decode,
};

pub(crate) const FORWARD_STAT_V19: MessageCodec<ForwardStat> = MessageCodec {
    size: 96,
    encode: forward_v19_encode,
    decode: forward_v19_decode,
    ..FORWARD_STAT_V3
};

// ---------------------------------------------------------------------------
// OpenReceiveChannel (+ Multimedia)
// ---------------------------------------------------------------------------

fn orc_v3_encode(m: &OpenReceiveChannel, w: &mut PayloadWriter) {
    w.u32(m.conference_id);
    w.u32(m.pass_thru_party_id);
    w.u32(m.packet_size);
    w.u32(m.payload_type);
    w.bool32(m.echo_cancel);
    // g723BitRate
    w.u32(0);
    w.u32(m.call_reference);
}

fn orc_v3_decode(r: &mut PayloadReader<'_>) -> Result<OpenReceiveChannel, MessageError> {
    let conference_id = r.u32();
    let pass_thru_party_id = r.u32();
    let packet_size = r.u32();
    let payload_type = r.u32();
    let echo_cancel = r.u32() != 0;
    r.skip(4);
    Ok(OpenReceiveChannel {
        conference_id,
        pass_thru_party_id,
        packet_size,
        payload_type,
        echo_cancel,
        call_reference: r.u32(),
    })
}

fn orc_v17_encode(m: &OpenReceiveChannel, w: &mut PayloadWriter) {
    orc_v3_encode(m, w);
    w.u32(RTP_DTMF_PAYLOAD);
    w.u32(RTP_TIMEOUT);
    // mixingMode, mixingParty
    w.zeros(8);
    // Quelladresse wird vom Telefon nicht ausgewertet
    w.ip_dual(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    w.u32(0);
}

pub(crate) const OPEN_RECEIVE_CHANNEL_V3: MessageCodec<OpenReceiveChannel> = MessageCodec {
    id: ids::OPEN_RECEIVE_CHANNEL,
    name: "OpenReceiveChannel",
    size: 28,
    encode: orc_v3_encode,
    decode: orc_v3_decode,
};

pub(crate) const OPEN_RECEIVE_CHANNEL_V17: MessageCodec<OpenReceiveChannel> = MessageCodec {
    size: 68,
    encode: orc_v17_encode,
    ..OPEN_RECEIVE_CHANNEL_V3
};

pub(crate) const OPEN_MULTI_MEDIA_CHANNEL_V3: MessageCodec<OpenReceiveChannel> = MessageCodec {
    id: ids::OPEN_MULTI_MEDIA_CHANNEL,
    name: "OpenMultiMediaChannel",
    ..OPEN_RECEIVE_CHANNEL_V3
};

pub(crate) const OPEN_MULTI_MEDIA_CHANNEL_V17: MessageCodec<OpenReceiveChannel> = MessageCodec {
    id: ids::OPEN_MULTI_MEDIA_CHANNEL,
    name: "OpenMultiMediaChannel",
    ..OPEN_RECEIVE_CHANNEL_V17
};

fn orc_ack_v3_encode(m: &OpenReceiveChannelAck, w: &mut PayloadWriter) {
    w.u32(m.media_status);
    w.ipv4(nur_v4(m.ip));
    w.u32(m.port);
    w.u32(m.pass_thru_party_id);
}

fn orc_ack_v3_decode(r: &mut PayloadReader<'_>) -> Result<OpenReceiveChannelAck, MessageError> {
    Ok(OpenReceiveChannelAck {
        media_status: r.u32(),
        ip: IpAddr::V4(r.ipv4()),
        port: r.u32(),
        pass_thru_party_id: r.u32(),
        call_reference: 0,
    })
}

fn orc_ack_v17_encode(m: &OpenReceiveChannelAck, w: &mut PayloadWriter) {
    w.u32(m.media_status);
    w.ip_dual(m.ip);
    w.u32(m.port);
    w.u32(m.pass_thru_party_id);
    w.u32(m.call_reference);
}

fn orc_ack_v17_decode(r: &mut PayloadReader<'_>) -> Result<OpenReceiveChannelAck, MessageError> {
    Ok(OpenReceiveChannelAck {
        media_status: r.u32(),
        ip: r.ip_dual(),
        port: r.u32(),
        pass_thru_party_id: r.u32(),
        call_reference: r.u32(),
    })
}

pub(crate) const OPEN_RECEIVE_CHANNEL_ACK_V3: MessageCodec<OpenReceiveChannelAck> =
    MessageCodec {
        id: ids::OPEN_RECEIVE_CHANNEL_ACK,
        name: "OpenReceiveChannelAck",
        size: 16,
        encode: orc_ack_v3_encode,
        decode: orc_ack_v3_decode,
    };

pub(crate) const OPEN_RECEIVE_CHANNEL_ACK_V17: MessageCodec<OpenReceiveChannelAck> =
    MessageCodec {
        size: 36,
        encode: orc_ack_v17_encode,
        decode: orc_ack_v17_decode,
        ..OPEN_RECEIVE_CHANNEL_ACK_V3
    };

pub(crate) const OPEN_MULTI_MEDIA_ACK_V3: MessageCodec<OpenReceiveChannelAck> = MessageCodec {
    id: ids::OPEN_MULTI_MEDIA_RECEIVE_CHANNEL_ACK,
    name: "OpenMultiMediaReceiveChannelAck",
    ..OPEN_RECEIVE_CHANNEL_ACK_V3
};

pub(crate) const OPEN_MULTI_MEDIA_ACK_V17: MessageCodec<OpenReceiveChannelAck> = MessageCodec {
    id: ids::OPEN_MULTI_MEDIA_RECEIVE_CHANNEL_ACK,
    name: "OpenMultiMediaReceiveChannelAck",
    ..OPEN_RECEIVE_CHANNEL_ACK_V17
};

// ---------------------------------------------------------------------------
// StartMediaTransmission (+ Multimedia)
// ---------------------------------------------------------------------------

fn smt_rest_encode(m: &StartMediaTransmission, w: &mut PayloadWriter) {
    w.u32(m.packet_size);
    w.u32(m.payload_type);
    w.u32(m.precedence);
    w.bool32(m.silence_suppression);
    w.u16(m.max_frames_per_packet);
    w.u16(0);
    // g723BitRate
    w.u32(0);
    w.u32(m.call_reference);
}

fn smt_rest_decode(
    r: &mut PayloadReader<'_>,
    conference_id: u32,
    pass_thru_party_id: u32,
    remote: SocketAddr,
) -> StartMediaTransmission {
    let packet_size = r.u32();
    let payload_type = r.u32();
    let precedence = r.u32();
    let silence_suppression = r.u32() != 0;
    let max_frames_per_packet = r.u16();
    r.skip(2 + 4);
    StartMediaTransmission {
        conference_id,
        pass_thru_party_id,
        remote,
        packet_size,
        payload_type,
        precedence,
        silence_suppression,
        max_frames_per_packet,
        call_reference: r.u32(),
    }
}

fn smt_v3_encode(m: &StartMediaTransmission, w: &mut PayloadWriter) {
    w.u32(m.conference_id);
    w.u32(m.pass_thru_party_id);
    w.ipv4(nur_v4(m.remote.ip()));
    w.u32(u32::from(m.remote.port()));
    smt_rest_encode(m, w);
}

fn smt_v3_decode(r: &mut PayloadReader<'_>) -> Result<StartMediaTransmission, MessageError> {
    let conference_id = r.u32();
    let pass_thru_party_id = r.u32();
    let ip = r.ipv4();
    let port = (r.u32() & 0xFFFF) as u16;
    let remote = SocketAddr::new(IpAddr::V4(ip), port);
    Ok(smt_rest_decode(r, conference_id, pass_thru_party_id, remote))
}

fn smt_v17_encode(m: &StartMediaTransmission, w: &mut PayloadWriter) {
    w.u32(m.conference_id);
    w.u32(m.pass_thru_party_id);
    w.ip_dual(m.remote.ip());
    w.u32(u32::from(m.remote.port()));
    smt_rest_encode(m, w);
}

fn smt_v17_decode(r: &mut PayloadReader<'_>) -> Result<StartMediaTransmission, MessageError> {
    let conference_id = r.u32();
    let pass_thru_party_id = r.u32();
    let ip = r.ip_dual();
    let port = (r.u32() & 0xFFFF) as u16;
    let remote = SocketAddr::new(ip, port);
    Ok(smt_rest_decode(r, conference_id, pass_thru_party_id, remote))
}

pub(crate) const START_MEDIA_TRANSMISSION_V3: MessageCodec<StartMediaTransmission> =
    MessageCodec {
        id: ids::START_MEDIA_TRANSMISSION,
        name: "StartMediaTransmission",
        size: 44,
        encode: smt_v3_encode,
        decode: smt_v3_decode,
    };

pub(crate) const START_MEDIA_TRANSMISSION_V17: MessageCodec<StartMediaTransmission> =
    MessageCodec {
        size: 60,
        encode: smt_v17_encode,
        decode: smt_v17_decode,
        ..START_MEDIA_TRANSMISSION_V3
    };

pub(crate) const START_MULTI_MEDIA_V3: MessageCodec<StartMediaTransmission> = MessageCodec {
    id: ids::START_MULTI_MEDIA_TRANSMISSION,
    name: "StartMultiMediaTransmission",
    ..START_MEDIA_TRANSMISSION_V3
};

pub(crate) const START_MULTI_MEDIA_V17: MessageCodec<StartMediaTransmission> = MessageCodec {
    id: ids::START_MULTI_MEDIA_TRANSMISSION,
    name: "StartMultiMediaTransmission",
    ..START_MEDIA_TRANSMISSION_V17
};

fn smt_ack_v3_encode(m: &StartMediaTransmissionAck, w: &mut PayloadWriter) {
    w.u32(m.call_reference);
    w.u32(m.pass_thru_party_id);
    w.u32(m.call_reference1);
    w.ipv4(nur_v4(m.ip));
    w.u32(m.port);
    w.u32(m.media_status);
}

fn smt_ack_v3_decode(
    r: &mut PayloadReader<'_>,
) -> Result<StartMediaTransmissionAck, MessageError> {
    Ok(StartMediaTransmissionAck {
        call_reference: r.u32(),
        pass_thru_party_id: r.u32(),
        call_reference1: r.u32(),
        ip: IpAddr::V4(r.ipv4()),
        port: r.u32(),
        media_status: r.u32(),
    })
}

fn smt_ack_v17_encode(m: &StartMediaTransmissionAck, w: &mut PayloadWriter) {
    w.u32(m.call_reference);
    w.u32(m.pass_thru_party_id);
    w.u32(m.call_reference1);
    w.ip_dual(m.ip);
    w.u32(m.port);
    w.u32(m.media_status);
}

fn smt_ack_v17_decode(
    r: &mut PayloadReader<'_>,
) -> Result<StartMediaTransmissionAck, MessageError> {
    Ok(StartMediaTransmissionAck {
        call_reference: r.u32(),
        pass_thru_party_id: r.u32(),
        call_reference1: r.u32(),
        ip: r.ip_dual(),
        port: r.u32(),
        media_status: r.u32(),
    })
}

pub(crate) const START_MEDIA_TRANSMISSION_ACK_V3: MessageCodec<StartMediaTransmissionAck> =
    MessageCodec {
        id: ids::START_MEDIA_TRANSMISSION_ACK,
        name: "StartMediaTransmissionAck",
        size: 24,
        encode: smt_ack_v3_encode,
        decode: smt_ack_v3_decode,
    };

pub(crate) const START_MEDIA_TRANSMISSION_ACK_V17: MessageCodec<StartMediaTransmissionAck> =
    MessageCodec {
        size: 40,
        encode: smt_ack_v17_encode,
        decode: smt_ack_v17_decode,
        ..START_MEDIA_TRANSMISSION_ACK_V3
    };

// ---------------------------------------------------------------------------
// EnblocCall
// ---------------------------------------------------------------------------

fn enbloc_v3_encode(m: &EnblocCall, w: &mut PayloadWriter) {
    w.string(&m.called_party, DIRECTORY_NUMBER_SIZE);
}

fn enbloc_v3_decode(r: &mut PayloadReader<'_>) -> Result<EnblocCall, MessageError> {
    Ok(EnblocCall {
        called_party: r.string(DIRECTORY_NUMBER_SIZE),
        line_instance: 0,
    })
}

fn enbloc_v17_encode(m: &EnblocCall, w: &mut PayloadWriter) {
    enbloc_v3_encode(m, w);
    w.u32(m.line_instance);
}

fn enbloc_v17_decode(r: &mut PayloadReader<'_>) -> Result<EnblocCall, MessageError> {
    Ok(EnblocCall {
        called_party: r.string(DIRECTORY_NUMBER_SIZE),
        line_instance: r.u32(),
    })
}

pub(crate) const ENBLOC_CALL_V3: MessageCodec<EnblocCall> = MessageCodec {
    id: ids::ENBLOC_CALL,
    name: "EnblocCall",
    size: 24,
    encode: enbloc_v3_encode,
    decode: enbloc_v3_decode,
};

pub(crate) const ENBLOC_CALL_V17: MessageCodec<EnblocCall> = MessageCodec {
    size: 28,
    encode: enbloc_v17_encode,
    decode: enbloc_v17_decode,
    ..ENBLOC_CALL_V3
};

// ---------------------------------------------------------------------------
// ConnectionStatisticsReq
// ---------------------------------------------------------------------------

fn conn_stats_encode(m: &ConnectionStatisticsReq, w: &mut PayloadWriter, breite: usize) {
    w.string(&m.directory_number, breite);
    w.u32(m.call_reference);
    w.bool32(m.clear);
}

fn conn_stats_decode(r: &mut PayloadReader<'_>, breite: usize) -> ConnectionStatisticsReq {
    ConnectionStatisticsReq {
        directory_number: r.string(breite),
        call_reference: r.u32(),
        clear: r.u32() != 0,
    }
}

fn conn_stats_v3_encode(m: &ConnectionStatisticsReq, w: &mut PayloadWriter) {
    conn_stats_encode(m, w, DIRECTORY_NUMBER_SIZE);
}

fn conn_stats_v3_decode(
    r: &mut PayloadReader<'_>,
) -> Result<ConnectionStatisticsReq, MessageError> {
    Ok(conn_stats_decode(r, DIRECTORY_NUMBER_SIZE))
}

fn conn_stats_v19_encode(m: &ConnectionStatisticsReq, w: &mut PayloadWriter) {
    conn_stats_encode(m, w, 28);
}

fn conn_stats_v19_decode(
    r: &mut PayloadReader<'_>,
) -> Result<ConnectionStatisticsReq, MessageError> {
    Ok(conn_stats_decode(r, 28))
}

pub(crate) const CONNECTION_STATISTICS_REQ_V3: MessageCodec<ConnectionStatisticsReq> =
    MessageCodec {
        id: ids::CONNECTION_STATISTICS_REQ,
        name: "ConnectionStatisticsReq",
        size: 32,
        encode: conn_stats_v3_encode,
        decode: conn_stats_v3_decode,
    };

pub(crate) const CONNECTION_STATISTICS_REQ_V19: MessageCodec<ConnectionStatisticsReq> =
    MessageCodec {
        size: 36,
        encode: conn_stats_v19_encode,
        decode: conn_stats_v19_decode,
        ..CONNECTION_STATISTICS_REQ_V3
    };

// ---------------------------------------------------------------------------
// Port-Nachrichten (ab v19)
// ---------------------------------------------------------------------------

fn port_ref_encode(m: &PortRef, w: &mut PayloadWriter) {
    w.u32(m.conference_id);
    w.u32(m.pass_thru_party_id);
    w.u32(m.call_reference);
    w.bool32(m.video);
}

fn port_ref_decode(r: &mut PayloadReader<'_>) -> Result<PortRef, MessageError> {
    Ok(PortRef {
        conference_id: r.u32(),
        pass_thru_party_id: r.u32(),
        call_reference: r.u32(),
        video: r.u32() != 0,
    })
}

pub(crate) const PORT_REQUEST_V19: MessageCodec<PortRef> = MessageCodec {
    id: ids::PORT_REQUEST,
    name: "PortRequest",
    size: 16,
    encode: port_ref_encode,
    decode: port_ref_decode,
};

pub(crate) const PORT_CLOSE_V19: MessageCodec<PortRef> = MessageCodec {
    id: ids::PORT_CLOSE,
    name: "PortClose",
    ..PORT_REQUEST_V19
};

fn port_response_encode(m: &PortResponse, w: &mut PayloadWriter) {
    w.u32(m.call_reference);
    w.u32(m.pass_thru_party_id);
    w.ip_dual(m.ip);
    w.u32(m.port);
    w.u32(m.rtcp_port);
}

fn port_response_decode(r: &mut PayloadReader<'_>) -> Result<PortResponse, MessageError> {
    Ok(PortResponse {
        call_reference: r.u32(),
        pass_thru_party_id: r.u32(),
        ip: r.ip_dual(),
        port: r.u32(),
        rtcp_port: r.u32(),
    })
}

pub(crate) const PORT_RESPONSE_V19: MessageCodec<PortResponse> = MessageCodec {
    id: ids::PORT_RESPONSE,
    name: "PortResponse",
    size: 36,
    encode: port_response_encode,
    decode: port_response_decode,
};
