//! Gemeinsame Identifikationstypen fuer Skinnygate
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stabile Geraetekennung (der Skinny-Geraetename, z.B. `SEP001122AABBCC`)
///
/// Geraetenamen werden beim Erstellen auf Grossbuchstaben normalisiert,
/// da Telefone die MAC-Adresse je nach Firmware unterschiedlich schreiben.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Erstellt eine neue DeviceId (normalisiert auf Grossbuchstaben)
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_uppercase())
    }

    /// Gibt den Geraetenamen zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prueft ob die Kennung leer ist (ungueltige Registrierung)
    pub fn ist_leer(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name einer waehlbaren Leitung (gleichzeitig ihre Rufnummer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineName(String);

impl LineName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prozessweit eindeutige Call-ID eines Kanals
///
/// Wird auf dem Draht als `callReference` bzw. `conferenceId` uebertragen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u32);

impl CallId {
    pub fn inner(&self) -> u32 {
        self.0
    }

    /// Pass-Through-Party-ID fuer die RTP-Aushandlung dieses Kanals
    ///
    /// Die Abbildung ist injektiv, damit zwei offene Aushandlungen nie
    /// dieselbe ID tragen.
    pub fn pass_thru_party_id(&self) -> u32 {
        u32::MAX - self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

/// Eindeutige Session-ID (eine pro TCP-Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Opaker Anruf-Handle der Call-Control (vom Host vergeben)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerHandle(pub u64);

impl std::fmt::Display for OwnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner:{}", self.0)
    }
}
