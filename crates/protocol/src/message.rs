//! Dekodierte Nachrichten
//!
//! `Message` ist der getaggte Variantentyp ueber alle bekannten
//! Nachrichten beider Richtungen. Versionsabhaengige Varianten werden
//! ueber das `HandlerSet` der Session kodiert; alle anderen ueber ihr
//! festes `WireMessage`-Layout.

use crate::error::MessageError;
use crate::fields::{PayloadReader, PayloadWriter};
use crate::ids;
use crate::layouts;
use crate::messages::*;
use crate::version::MessageCodec;

/// Eine einzelne Skinny-Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // --- Telefon -> Gateway ---
    KeepAlive,
    Register(Register),
    IpPort(IpPort),
    KeypadButton(KeypadButton),
    EnblocCall(EnblocCall),
    Stimulus(Stimulus),
    OffHook(LineRef),
    OnHook(LineRef),
    HookFlash(LineRef),
    ForwardStatReq(NumberReq),
    SpeedDialStatReq(NumberReq),
    LineStatReq(NumberReq),
    ConfigStatReq,
    TimeDateReq,
    ButtonTemplateReq,
    VersionReq,
    CapabilitiesRes(CapabilitiesRes),
    Alarm(Alarm),
    OpenReceiveChannelAck(OpenReceiveChannelAck),
    ConnectionStatisticsRes(ConnectionStatisticsRes),
    SoftKeySetReq,
    SoftKeyEvent(SoftKeyEventMessage),
    Unregister,
    SoftKeyTemplateReq,
    RegisterTokenReq(RegisterTokenReq),
    HeadsetStatus(HeadsetStatus),
    RegisterAvailableLines(RegisterAvailableLines),
    OpenMultiMediaReceiveChannelAck(OpenReceiveChannelAck),
    PortResponse(PortResponse),
    StartMediaTransmissionAck(StartMediaTransmissionAck),
    SpcpRegisterTokenReq(SpcpRegisterTokenReq),

    // --- Gateway -> Telefon ---
    RegisterAck(RegisterAck),
    StartTone(StartTone),
    StopTone(LineRef),
    SetRinger(SetRinger),
    SetLamp(SetLamp),
    SetSpeakerMode(SetSpeakerMode),
    StartMediaTransmission(StartMediaTransmission),
    StopMediaTransmission(MediaChannelRef),
    CallInfo(CallInfo),
    ForwardStat(ForwardStat),
    SpeedDialStat(SpeedDialStat),
    LineStat(LineStat),
    ConfigStat(ConfigStat),
    DefineTimeDate(DefineTimeDate),
    ButtonTemplate(ButtonTemplate),
    Version(VersionRes),
    CapabilitiesReq,
    RegisterReject(RegisterReject),
    Reset(Reset),
    KeepAliveAck,
    OpenReceiveChannel(OpenReceiveChannel),
    CloseReceiveChannel(MediaChannelRef),
    ConnectionStatisticsReq(ConnectionStatisticsReq),
    SoftKeyTemplateRes(SoftKeyTemplateRes),
    SoftKeySetRes(SoftKeySetRes),
    SelectSoftKeys(SelectSoftKeys),
    CallState(CallStateMessage),
    DisplayPromptStatus(DisplayPrompt),
    ClearPromptStatus(LineRef),
    DisplayNotify(DisplayNotify),
    ClearNotify,
    ActivateCallPlane(ActivateCallPlane),
    UnregisterAck(UnregisterAck),
    BackSpaceReq(LineRef),
    DialedNumber(DialedNumber),
    FeatureStat(FeatureStat),
    DisplayPriNotify(DisplayPriNotify),
    ClearPriNotify(ClearPriNotify),
    OpenMultiMediaChannel(OpenReceiveChannel),
    StartMultiMediaTransmission(StartMediaTransmission),
    StopMultiMediaTransmission(MediaChannelRef),
    CloseMultiMediaReceiveChannel(MediaChannelRef),
    PortRequest(PortRef),
    PortClose(PortRef),
    RegisterTokenAck,
    RegisterTokenReject(RegisterTokenReject),
    SpcpRegisterTokenAck(SpcpTokenAnswer),
    SpcpRegisterTokenReject(SpcpTokenAnswer),

    /// Gueltige ID ohne Katalogeintrag
    Unhandled { id: u32, length: usize },
}

impl Message {
    /// Name fuer Logs und Metriken
    pub fn name(&self) -> &'static str {
        match self {
            Self::KeepAlive => "KeepAlive",
            Self::Register(_) => "Register",
            Self::IpPort(_) => "IpPort",
            Self::KeypadButton(_) => "KeypadButton",
            Self::EnblocCall(_) => "EnblocCall",
            Self::Stimulus(_) => "Stimulus",
            Self::OffHook(_) => "OffHook",
            Self::OnHook(_) => "OnHook",
            Self::HookFlash(_) => "HookFlash",
            Self::ForwardStatReq(_) => "ForwardStatReq",
            Self::SpeedDialStatReq(_) => "SpeedDialStatReq",
            Self::LineStatReq(_) => "LineStatReq",
            Self::ConfigStatReq => "ConfigStatReq",
            Self::TimeDateReq => "TimeDateReq",
            Self::ButtonTemplateReq => "ButtonTemplateReq",
            Self::VersionReq => "VersionReq",
            Self::CapabilitiesRes(_) => "CapabilitiesRes",
            Self::Alarm(_) => "Alarm",
            Self::OpenReceiveChannelAck(_) => "OpenReceiveChannelAck",
            Self::ConnectionStatisticsRes(_) => "ConnectionStatisticsRes",
            Self::SoftKeySetReq => "SoftKeySetReq",
            Self::SoftKeyEvent(_) => "SoftKeyEvent",
            Self::Unregister => "Unregister",
            Self::SoftKeyTemplateReq => "SoftKeyTemplateReq",
            Self::RegisterTokenReq(_) => "RegisterTokenReq",
            Self::HeadsetStatus(_) => "HeadsetStatus",
            Self::RegisterAvailableLines(_) => "RegisterAvailableLines",
            Self::OpenMultiMediaReceiveChannelAck(_) => "OpenMultiMediaReceiveChannelAck",
            Self::PortResponse(_) => "PortResponse",
            Self::StartMediaTransmissionAck(_) => "StartMediaTransmissionAck",
            Self::SpcpRegisterTokenReq(_) => "SpcpRegisterTokenReq",
            Self::RegisterAck(_) => "RegisterAck",
            Self::StartTone(_) => "StartTone",
            Self::StopTone(_) => "StopTone",
            Self::SetRinger(_) => "SetRinger",
            Self::SetLamp(_) => "SetLamp",
            Self::SetSpeakerMode(_) => "SetSpeakerMode",
            Self::StartMediaTransmission(_) => "StartMediaTransmission",
            Self::StopMediaTransmission(_) => "StopMediaTransmission",
            Self::CallInfo(_) => "CallInfo",
            Self::ForwardStat(_) => "ForwardStat",
            Self::SpeedDialStat(_) => "SpeedDialStat",
            Self::LineStat(_) => "LineStat",
            Self::ConfigStat(_) => "ConfigStat",
            Self::DefineTimeDate(_) => "DefineTimeDate",
            Self::ButtonTemplate(_) => "ButtonTemplate",
            Self::Version(_) => "Version",
            Self::CapabilitiesReq => "CapabilitiesReq",
            Self::RegisterReject(_) => "RegisterReject",
            Self::Reset(_) => "Reset",
            Self::KeepAliveAck => "KeepAliveAck",
            Self::OpenReceiveChannel(_) => "OpenReceiveChannel",
            Self::CloseReceiveChannel(_) => "CloseReceiveChannel",
            Self::ConnectionStatisticsReq(_) => "ConnectionStatisticsReq",
            Self::SoftKeyTemplateRes(_) => "SoftKeyTemplateRes",
            Self::SoftKeySetRes(_) => "SoftKeySetRes",
            Self::SelectSoftKeys(_) => "SelectSoftKeys",
            Self::CallState(_) => "CallState",
            Self::DisplayPromptStatus(_) => "DisplayPromptStatus",
            Self::ClearPromptStatus(_) => "ClearPromptStatus",
            Self::DisplayNotify(_) => "DisplayNotify",
            Self::ClearNotify => "ClearNotify",
            Self::ActivateCallPlane(_) => "ActivateCallPlane",
            Self::UnregisterAck(_) => "UnregisterAck",
            Self::BackSpaceReq(_) => "BackSpaceReq",
            Self::DialedNumber(_) => "DialedNumber",
            Self::FeatureStat(_) => "FeatureStat",
            Self::DisplayPriNotify(_) => "DisplayPriNotify",
            Self::ClearPriNotify(_) => "ClearPriNotify",
            Self::OpenMultiMediaChannel(_) => "OpenMultiMediaChannel",
            Self::StartMultiMediaTransmission(_) => "StartMultiMediaTransmission",
            Self::StopMultiMediaTransmission(_) => "StopMultiMediaTransmission",
            Self::CloseMultiMediaReceiveChannel(_) => "CloseMultiMediaReceiveChannel",
            Self::PortRequest(_) => "PortRequest",
            Self::PortClose(_) => "PortClose",
            Self::RegisterTokenAck => "RegisterTokenAck",
            Self::RegisterTokenReject(_) => "RegisterTokenReject",
            Self::SpcpRegisterTokenAck(_) => "SpcpRegisterTokenAck",
            Self::SpcpRegisterTokenReject(_) => "SpcpRegisterTokenReject",
            Self::Unhandled { .. } => "Unhandled",
        }
    }

    /// Kodiert Nachrichten mit festem Layout; `None` fuer versionsabhaengige
    pub(crate) fn encode_fixed(&self, w: &mut PayloadWriter) -> Option<u32> {
        fn fest<T: WireMessage>(m: &T, w: &mut PayloadWriter) -> u32 {
            m.encode(w);
            T::ID
        }
        fn linie(id: u32, m: &LineRef, w: &mut PayloadWriter) -> u32 {
            m.encode(w);
            id
        }
        fn kanal(id: u32, m: &MediaChannelRef, w: &mut PayloadWriter) -> u32 {
            m.encode(w);
            id
        }
        fn nummer(id: u32, m: &NumberReq, w: &mut PayloadWriter) -> u32 {
            w.u32(m.number);
            id
        }
        fn spcp(id: u32, m: &SpcpTokenAnswer, w: &mut PayloadWriter) -> u32 {
            w.u32(m.features);
            id
        }

        let id = match self {
            Self::KeepAlive => ids::KEEP_ALIVE,
            Self::Register(m) => fest(m, w),
            Self::IpPort(m) => fest(m, w),
            Self::KeypadButton(m) => fest(m, w),
            Self::Stimulus(m) => fest(m, w),
            Self::OffHook(m) => linie(ids::OFF_HOOK, m, w),
            Self::OnHook(m) => linie(ids::ON_HOOK, m, w),
            Self::HookFlash(m) => linie(ids::HOOK_FLASH, m, w),
            Self::ForwardStatReq(m) => nummer(ids::FORWARD_STAT_REQ, m, w),
            Self::SpeedDialStatReq(m) => nummer(ids::SPEED_DIAL_STAT_REQ, m, w),
            Self::LineStatReq(m) => nummer(ids::LINE_STAT_REQ, m, w),
            Self::ConfigStatReq => ids::CONFIG_STAT_REQ,
            Self::TimeDateReq => ids::TIME_DATE_REQ,
            Self::ButtonTemplateReq => ids::BUTTON_TEMPLATE_REQ,
            Self::VersionReq => ids::VERSION_REQ,
            Self::CapabilitiesRes(m) => fest(m, w),
            Self::Alarm(m) => fest(m, w),
            Self::ConnectionStatisticsRes(m) => fest(m, w),
            Self::SoftKeySetReq => ids::SOFT_KEY_SET_REQ,
            Self::SoftKeyEvent(m) => fest(m, w),
            Self::Unregister => ids::UNREGISTER,
            Self::SoftKeyTemplateReq => ids::SOFT_KEY_TEMPLATE_REQ,
            Self::RegisterTokenReq(m) => fest(m, w),
            Self::HeadsetStatus(m) => fest(m, w),
            Self::RegisterAvailableLines(m) => fest(m, w),
            Self::SpcpRegisterTokenReq(m) => fest(m, w),
            Self::StartTone(m) => fest(m, w),
            Self::StopTone(m) => linie(ids::STOP_TONE, m, w),
            Self::SetRinger(m) => fest(m, w),
            Self::SetLamp(m) => fest(m, w),
            Self::SetSpeakerMode(m) => fest(m, w),
            Self::StopMediaTransmission(m) => kanal(ids::STOP_MEDIA_TRANSMISSION, m, w),
            Self::SpeedDialStat(m) => fest(m, w),
            Self::LineStat(m) => fest(m, w),
            Self::ConfigStat(m) => fest(m, w),
            Self::DefineTimeDate(m) => fest(m, w),
            Self::ButtonTemplate(m) => fest(m, w),
            Self::Version(m) => fest(m, w),
            Self::CapabilitiesReq => ids::CAPABILITIES_REQ,
            Self::RegisterReject(m) => fest(m, w),
            Self::Reset(m) => fest(m, w),
            Self::KeepAliveAck => ids::KEEP_ALIVE_ACK,
            Self::CloseReceiveChannel(m) => kanal(ids::CLOSE_RECEIVE_CHANNEL, m, w),
            Self::SoftKeyTemplateRes(m) => fest(m, w),
            Self::SoftKeySetRes(m) => fest(m, w),
            Self::SelectSoftKeys(m) => fest(m, w),
            Self::CallState(m) => fest(m, w),
            Self::ClearPromptStatus(m) => linie(ids::CLEAR_PROMPT_STATUS, m, w),
            Self::ClearNotify => ids::CLEAR_NOTIFY,
            Self::ActivateCallPlane(m) => fest(m, w),
            Self::UnregisterAck(m) => fest(m, w),
            Self::BackSpaceReq(m) => linie(ids::BACK_SPACE_REQ, m, w),
            Self::FeatureStat(m) => fest(m, w),
            Self::ClearPriNotify(m) => fest(m, w),
            Self::StopMultiMediaTransmission(m) => {
                kanal(ids::STOP_MULTI_MEDIA_TRANSMISSION, m, w)
            }
            Self::CloseMultiMediaReceiveChannel(m) => {
                kanal(ids::CLOSE_MULTI_MEDIA_RECEIVE_CHANNEL, m, w)
            }
            Self::RegisterTokenAck => ids::REGISTER_TOKEN_ACK,
            Self::RegisterTokenReject(m) => fest(m, w),
            Self::SpcpRegisterTokenAck(m) => spcp(ids::SPCP_REGISTER_TOKEN_ACK, m, w),
            Self::SpcpRegisterTokenReject(m) => spcp(ids::SPCP_REGISTER_TOKEN_REJECT, m, w),

            // versionsabhaengig oder nicht kodierbar
            Self::EnblocCall(_)
            | Self::OpenReceiveChannelAck(_)
            | Self::OpenMultiMediaReceiveChannelAck(_)
            | Self::PortResponse(_)
            | Self::StartMediaTransmissionAck(_)
            | Self::RegisterAck(_)
            | Self::StartMediaTransmission(_)
            | Self::CallInfo(_)
            | Self::ForwardStat(_)
            | Self::OpenReceiveChannel(_)
            | Self::ConnectionStatisticsReq(_)
            | Self::DisplayPromptStatus(_)
            | Self::DisplayNotify(_)
            | Self::DialedNumber(_)
            | Self::DisplayPriNotify(_)
            | Self::OpenMultiMediaChannel(_)
            | Self::StartMultiMediaTransmission(_)
            | Self::PortRequest(_)
            | Self::PortClose(_)
            | Self::Unhandled { .. } => return None,
        };
        Some(id)
    }

    /// Dekodiert Nachrichten mit festem Layout; `Ok(None)` wenn die ID
    /// keinen festen Katalogeintrag hat
    pub(crate) fn decode_fixed(id: u32, payload: &[u8]) -> Result<Option<Self>, MessageError> {
        fn fest<T: WireMessage>(p: &[u8]) -> Result<T, MessageError> {
            let p = zuschneiden(T::NAME, T::ID, p, T::SIZE);
            T::decode(&mut PayloadReader::new(p))
        }
        fn layout<T>(codec: &MessageCodec<T>, p: &[u8]) -> Result<T, MessageError> {
            codec.lesen(p)
        }
        fn leer(name: &'static str, id: u32, p: &[u8]) {
            zuschneiden(name, id, p, 0);
        }
        fn linie(name: &'static str, id: u32, p: &[u8]) -> LineRef {
            LineRef::decode(&mut PayloadReader::new(zuschneiden(name, id, p, LineRef::SIZE)))
        }
        fn kanal(name: &'static str, id: u32, p: &[u8]) -> MediaChannelRef {
            let p = zuschneiden(name, id, p, MediaChannelRef::SIZE);
            MediaChannelRef::decode(&mut PayloadReader::new(p))
        }
        fn nummer(name: &'static str, id: u32, p: &[u8]) -> NumberReq {
            let p = zuschneiden(name, id, p, NumberReq::SIZE);
            NumberReq {
                number: PayloadReader::new(p).u32(),
            }
        }
        fn spcp(name: &'static str, id: u32, p: &[u8]) -> SpcpTokenAnswer {
            let p = zuschneiden(name, id, p, SpcpTokenAnswer::SIZE);
            SpcpTokenAnswer {
                features: PayloadReader::new(p).u32(),
            }
        }

        let p = payload;
        let m = match id {
            ids::KEEP_ALIVE => {
                leer("KeepAlive", id, p);
                Self::KeepAlive
            }
            ids::REGISTER => Self::Register(fest(p)?),
            ids::IP_PORT => Self::IpPort(fest(p)?),
            ids::KEYPAD_BUTTON => Self::KeypadButton(fest(p)?),
            ids::STIMULUS => Self::Stimulus(fest(p)?),
            ids::OFF_HOOK => Self::OffHook(linie("OffHook", id, p)),
            ids::ON_HOOK => Self::OnHook(linie("OnHook", id, p)),
            ids::HOOK_FLASH => Self::HookFlash(linie("HookFlash", id, p)),
            ids::FORWARD_STAT_REQ => Self::ForwardStatReq(nummer("ForwardStatReq", id, p)),
            ids::SPEED_DIAL_STAT_REQ => {
                Self::SpeedDialStatReq(nummer("SpeedDialStatReq", id, p))
            }
            ids::LINE_STAT_REQ => Self::LineStatReq(nummer("LineStatReq", id, p)),
            ids::CONFIG_STAT_REQ => {
                leer("ConfigStatReq", id, p);
                Self::ConfigStatReq
            }
            ids::TIME_DATE_REQ => {
                leer("TimeDateReq", id, p);
                Self::TimeDateReq
            }
            ids::BUTTON_TEMPLATE_REQ => {
                leer("ButtonTemplateReq", id, p);
                Self::ButtonTemplateReq
            }
            ids::VERSION_REQ => {
                leer("VersionReq", id, p);
                Self::VersionReq
            }
            ids::CAPABILITIES_RES => Self::CapabilitiesRes(fest(p)?),
            ids::ALARM => Self::Alarm(fest(p)?),
            ids::CONNECTION_STATISTICS_RES => Self::ConnectionStatisticsRes(fest(p)?),
            ids::SOFT_KEY_SET_REQ => {
                leer("SoftKeySetReq", id, p);
                Self::SoftKeySetReq
            }
            ids::SOFT_KEY_EVENT => Self::SoftKeyEvent(fest(p)?),
            ids::UNREGISTER => {
                leer("Unregister", id, p);
                Self::Unregister
            }
            ids::SOFT_KEY_TEMPLATE_REQ => {
                leer("SoftKeyTemplateReq", id, p);
                Self::SoftKeyTemplateReq
            }
            ids::REGISTER_TOKEN_REQ => Self::RegisterTokenReq(fest(p)?),
            ids::HEADSET_STATUS => Self::HeadsetStatus(fest(p)?),
            ids::REGISTER_AVAILABLE_LINES => Self::RegisterAvailableLines(fest(p)?),
            ids::SPCP_REGISTER_TOKEN_REQ => Self::SpcpRegisterTokenReq(fest(p)?),

            ids::START_TONE => Self::StartTone(fest(p)?),
            ids::STOP_TONE => Self::StopTone(linie("StopTone", id, p)),
            ids::SET_RINGER => Self::SetRinger(fest(p)?),
            ids::SET_LAMP => Self::SetLamp(fest(p)?),
            ids::SET_SPEAKER_MODE => Self::SetSpeakerMode(fest(p)?),
            ids::STOP_MEDIA_TRANSMISSION => {
                Self::StopMediaTransmission(kanal("StopMediaTransmission", id, p))
            }
            ids::SPEED_DIAL_STAT => Self::SpeedDialStat(fest(p)?),
            ids::LINE_STAT => Self::LineStat(fest(p)?),
            ids::CONFIG_STAT => Self::ConfigStat(fest(p)?),
            ids::DEFINE_TIME_DATE => Self::DefineTimeDate(fest(p)?),
            ids::BUTTON_TEMPLATE => Self::ButtonTemplate(fest(p)?),
            ids::VERSION => Self::Version(fest(p)?),
            ids::CAPABILITIES_REQ => {
                leer("CapabilitiesReq", id, p);
                Self::CapabilitiesReq
            }
            ids::REGISTER_REJECT => Self::RegisterReject(fest(p)?),
            ids::RESET => Self::Reset(fest(p)?),
            ids::KEEP_ALIVE_ACK => {
                leer("KeepAliveAck", id, p);
                Self::KeepAliveAck
            }
            ids::CLOSE_RECEIVE_CHANNEL => {
                Self::CloseReceiveChannel(kanal("CloseReceiveChannel", id, p))
            }
            ids::SOFT_KEY_TEMPLATE_RES => Self::SoftKeyTemplateRes(fest(p)?),
            ids::SOFT_KEY_SET_RES => Self::SoftKeySetRes(fest(p)?),
            ids::SELECT_SOFT_KEYS => Self::SelectSoftKeys(fest(p)?),
            ids::CALL_STATE => Self::CallState(fest(p)?),
            ids::CLEAR_PROMPT_STATUS => {
                Self::ClearPromptStatus(linie("ClearPromptStatus", id, p))
            }
            ids::CLEAR_NOTIFY => {
                leer("ClearNotify", id, p);
                Self::ClearNotify
            }
            ids::ACTIVATE_CALL_PLANE => Self::ActivateCallPlane(fest(p)?),
            ids::UNREGISTER_ACK => Self::UnregisterAck(fest(p)?),
            ids::BACK_SPACE_REQ => Self::BackSpaceReq(linie("BackSpaceReq", id, p)),
            ids::FEATURE_STAT => Self::FeatureStat(fest(p)?),
            ids::CLEAR_PRI_NOTIFY => Self::ClearPriNotify(fest(p)?),
            ids::STOP_MULTI_MEDIA_TRANSMISSION => {
                Self::StopMultiMediaTransmission(kanal("StopMultiMediaTransmission", id, p))
            }
            ids::CLOSE_MULTI_MEDIA_RECEIVE_CHANNEL => Self::CloseMultiMediaReceiveChannel(
                kanal("CloseMultiMediaReceiveChannel", id, p),
            ),
            ids::REGISTER_TOKEN_ACK => {
                leer("RegisterTokenAck", id, p);
                Self::RegisterTokenAck
            }
            ids::REGISTER_TOKEN_REJECT => Self::RegisterTokenReject(fest(p)?),
            ids::SPCP_REGISTER_TOKEN_ACK => {
                Self::SpcpRegisterTokenAck(spcp("SpcpRegisterTokenAck", id, p))
            }
            ids::SPCP_REGISTER_TOKEN_REJECT => {
                Self::SpcpRegisterTokenReject(spcp("SpcpRegisterTokenReject", id, p))
            }

            // Anzeige-IDs: das Layout haengt nur an der ID, nicht an der Version
            ids::CALL_INFO => Self::CallInfo(layout(&layouts::CALL_INFO_STATIC, p)?),
            ids::DYNAMIC_CALL_INFO => Self::CallInfo(layout(&layouts::CALL_INFO_DYNAMIC, p)?),
            ids::DISPLAY_PROMPT_STATUS => {
                Self::DisplayPromptStatus(layout(&layouts::DISPLAY_PROMPT_STATIC, p)?)
            }
            ids::DISPLAY_DYNAMIC_PROMPT_STATUS => {
                Self::DisplayPromptStatus(layout(&layouts::DISPLAY_PROMPT_DYNAMIC, p)?)
            }
            ids::DISPLAY_NOTIFY => {
                Self::DisplayNotify(layout(&layouts::DISPLAY_NOTIFY_STATIC, p)?)
            }
            ids::DISPLAY_DYNAMIC_NOTIFY => {
                Self::DisplayNotify(layout(&layouts::DISPLAY_NOTIFY_DYNAMIC, p)?)
            }
            ids::DISPLAY_PRI_NOTIFY => {
                Self::DisplayPriNotify(layout(&layouts::DISPLAY_PRI_NOTIFY_STATIC, p)?)
            }
            ids::DISPLAY_DYNAMIC_PRI_NOTIFY => {
                Self::DisplayPriNotify(layout(&layouts::DISPLAY_PRI_NOTIFY_DYNAMIC, p)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(m))
    }
}

/// Gleicht die deklarierte Nutzlast an die bekannte Groesse an
///
/// Laengere Nutzlasten werden gekuerzt (der Ueberschuss wird geloggt),
/// kuerzere liefert der Reader logisch mit Nullen aufgefuellt.
pub(crate) fn zuschneiden<'a>(
    name: &'static str,
    id: u32,
    payload: &'a [u8],
    bekannt: usize,
) -> &'a [u8] {
    if payload.len() > bekannt {
        tracing::debug!(
            nachricht = name,
            id,
            deklariert = payload.len(),
            bekannt,
            "Ueberschuessige Bytes verworfen"
        );
        &payload[..bekannt]
    } else {
        if payload.len() < bekannt {
            tracing::trace!(
                nachricht = name,
                deklariert = payload.len(),
                bekannt,
                "Kurze Nutzlast, fehlende Felder sind 0"
            );
        }
        payload
    }
}
