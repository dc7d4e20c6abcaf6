//! Fehlertypen des Wire-Codecs
//!
//! Zwei Klassen mit unterschiedlicher Reichweite:
//! - `FrameError`   – verbindungsfatal, die Session muss beendet werden
//! - `MessageError` – nachrichtenlokal, wird geloggt und uebersprungen

use std::io;
use thiserror::Error;

/// Fehler auf Frame-Ebene (Verbindung ist nicht mehr synchron)
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Ungueltige Frame-Laenge: {laenge} (erlaubt {min}..={max})")]
    UngueltigeLaenge { laenge: u32, min: u32, max: u32 },

    #[error("Ausgehende Nachricht zu gross: {0} Bytes")]
    ZuGross(usize),

    #[error("IO-Fehler: {0}")]
    Io(#[from] io::Error),
}

/// Fehler beim Dekodieren/Kodieren einer einzelnen Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// ID liegt in keinem der beiden Protokoll-Bereiche
    #[error("Unbekannte Nachrichten-ID 0x{0:04X}")]
    UnknownMessage(u32),

    /// Ein Zaehler in der Nutzlast passt nicht zur festen Struktur
    #[error("Groessenfehler in {nachricht}: {anzahl} Eintraege (maximal {maximum})")]
    SizeMismatch {
        nachricht: &'static str,
        anzahl: u32,
        maximum: u32,
    },

    /// Ein Aufzaehlungsfeld traegt einen unbekannten Wert
    #[error("Ungueltiger Wert {wert} im Feld {feld}")]
    UngueltigerWert { feld: &'static str, wert: u32 },

    /// Nachricht existiert in dieser Protokollversion nicht
    #[error("{nachricht} wird in Protokollversion {version} nicht unterstuetzt")]
    NichtUnterstuetzt { nachricht: &'static str, version: u8 },
}

impl MessageError {
    /// Kurzer Name fuer Metrik-Labels
    pub fn art(&self) -> &'static str {
        match self {
            Self::UnknownMessage(_) => "unknown_message",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::UngueltigerWert { .. } => "ungueltiger_wert",
            Self::NichtUnterstuetzt { .. } => "nicht_unterstuetzt",
        }
    }
}
