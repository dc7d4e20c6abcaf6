//! Numerische Aufzaehlungen des Station-Protokolls
//!
//! Alle Werte werden als `u32` little-endian uebertragen.

/// Erzeugt ein `#[repr(u32)]`-Enum samt `from_u32`/`as_u32`
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Wert vom Draht (`None` bei unbekanntem Wert)
            pub fn from_u32(v: u32) -> Option<Self> {
                match v {
                    $( x if x == $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            pub fn as_u32(self) -> u32 {
                self as u32
            }
        }
    };
}

wire_enum! {
    /// Anzeige-Zustand eines Anrufs auf dem Telefon
    CallState {
        OffHook = 1,
        OnHook = 2,
        RingOut = 3,
        RingIn = 4,
        Connected = 5,
        Busy = 6,
        Congestion = 7,
        Hold = 8,
        CallWaiting = 9,
        CallTransfer = 10,
        CallPark = 11,
        Proceed = 12,
        CallRemoteMultiline = 13,
        InvalidNumber = 14,
    }
}

wire_enum! {
    /// Vom Telefon erzeugte Toene
    Tone {
        Silence = 0x00,
        InsideDial = 0x21,
        OutsideDial = 0x22,
        LineBusy = 0x23,
        Alerting = 0x24,
        Reorder = 0x25,
        CallWaiting = 0x2D,
        Confirmation = 0x2E,
        Zip = 0x32,
        BeepBonk = 0x33,
    }
}

wire_enum! {
    /// Lampenmodus einer Taste
    LampMode {
        Off = 1,
        On = 2,
        Wink = 3,
        Flash = 4,
        Blink = 5,
    }
}

wire_enum! {
    /// Klingelmodus
    RingMode {
        Off = 1,
        Inside = 2,
        Outside = 3,
        Feature = 4,
        /// Nur optische Signalisierung (z.B. DND silent)
        FlashOnly = 5,
    }
}

wire_enum! {
    SpeakerMode {
        On = 1,
        Off = 2,
    }
}

wire_enum! {
    HeadsetMode {
        On = 1,
        Off = 2,
    }
}

wire_enum! {
    /// Ergebnis einer RTP-Aushandlung im Ack des Telefons
    MediaStatus {
        Ok = 0,
        Unknown = 1,
        OutOfChannels = 2,
        CodecTooComplex = 3,
        InvalidPartyId = 4,
        InvalidCallReference = 5,
        InvalidCodec = 6,
        InvalidPacketSize = 7,
        OutOfSockets = 8,
        EncoderOrDecoderFailed = 9,
    }
}

wire_enum! {
    /// Ereigniscodes der Softkeys
    SoftKeyEvent {
        Redial = 1,
        NewCall = 2,
        Hold = 3,
        Transfer = 4,
        CfwdAll = 5,
        CfwdBusy = 6,
        CfwdNoAnswer = 7,
        BackSpace = 8,
        EndCall = 9,
        Resume = 10,
        Answer = 11,
        Info = 12,
        Conference = 13,
        Park = 14,
        Join = 15,
        MeetMe = 16,
        Pickup = 17,
        GroupPickup = 18,
        Dial = 19,
        Dnd = 20,
        Privacy = 21,
        Monitor = 22,
    }
}

wire_enum! {
    /// Softkey-Set (Index in die SoftKeySet-Antwort)
    KeyMode {
        OnHook = 0,
        Connected = 1,
        OnHold = 2,
        RingIn = 3,
        OffHook = 4,
        ConnTrans = 5,
        DigitsFoll = 6,
        ConnConf = 7,
        RingOut = 8,
        OffHookFeat = 9,
        InUseHint = 10,
        OnHookStealable = 11,
    }
}

wire_enum! {
    /// Tastentyp im Button-Template; dieselben Codes kommen als Stimulus zurueck
    ButtonType {
        LastNumberRedial = 0x01,
        SpeedDial = 0x02,
        Hold = 0x03,
        Transfer = 0x04,
        ForwardAll = 0x05,
        ForwardBusy = 0x06,
        ForwardNoAnswer = 0x07,
        Display = 0x08,
        Line = 0x09,
        Voicemail = 0x0F,
        ServiceUrl = 0x14,
        Privacy = 0x2B,
        Monitor = 0x2C,
        Dnd = 0x3F,
        Conference = 0x7D,
        CallPark = 0x7E,
        CallPickup = 0x7F,
        /// Fuellplatz fuer unbelegte Tasten
        Undefined = 0xFF,
    }
}

impl ButtonType {
    /// Typ als Byte (so steht er im Button-Template)
    pub fn as_u8(self) -> u8 {
        // alle Werte liegen unter 0x100
        (self as u32 & 0xFF) as u8
    }
}

wire_enum! {
    /// Richtung eines Anrufs in CallInfo
    CallType {
        Inbound = 1,
        Outbound = 2,
        Forward = 3,
    }
}

wire_enum! {
    /// Antwort auf eine Abmeldung
    UnregisterStatus {
        Ok = 0,
        Error = 1,
        Nak = 2,
    }
}

wire_enum! {
    ResetType {
        Reset = 1,
        Restart = 2,
    }
}

wire_enum! {
    /// Payload-Capabilities (Codecs) aus CapabilitiesRes
    Codec {
        G711Alaw = 2,
        G711Ulaw = 4,
        G722 = 6,
        G723 = 9,
        G729 = 11,
        G729A = 12,
        G729AB = 16,
        Wideband256k = 25,
        H261 = 100,
        H263 = 101,
        H264 = 103,
    }
}

impl Codec {
    pub fn ist_video(self) -> bool {
        matches!(self, Self::H261 | Self::H263 | Self::H264)
    }

    /// RTP-Nutzlasttyp (RFC 3551, dynamisch fuer Video)
    pub fn rtp_payload_type(self) -> u32 {
        match self {
            Self::G711Ulaw => 0,
            Self::G711Alaw => 8,
            Self::G722 => 9,
            Self::G723 => 4,
            Self::G729 | Self::G729A | Self::G729AB => 18,
            Self::Wideband256k => 106,
            Self::H261 => 31,
            Self::H263 => 34,
            Self::H264 => 103,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_werte_hin_und_zurueck() {
        assert_eq!(CallState::from_u32(5), Some(CallState::Connected));
        assert_eq!(CallState::InvalidNumber.as_u32(), 14);
        assert_eq!(CallState::from_u32(0), None);
        assert_eq!(Tone::from_u32(0x21), Some(Tone::InsideDial));
        assert_eq!(MediaStatus::from_u32(1), Some(MediaStatus::Unknown));
    }

    #[test]
    fn button_typ_als_byte() {
        assert_eq!(ButtonType::Line.as_u8(), 0x09);
        assert_eq!(ButtonType::Undefined.as_u8(), 0xFF);
    }

    #[test]
    fn codec_eigenschaften() {
        assert!(Codec::H264.ist_video());
        assert!(!Codec::G711Ulaw.ist_video());
        assert_eq!(Codec::G711Alaw.rtp_payload_type(), 8);
    }
}
