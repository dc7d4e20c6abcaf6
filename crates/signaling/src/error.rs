//! Fehlertypen fuer den Signaling-Service

use skinnygate_protocol::{FrameError, MessageError};
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Frame-Fehler, die Verbindung ist nicht mehr synchron
    #[error("Frame-Fehler: {0}")]
    Frame(#[from] FrameError),

    /// Nachricht nicht kodierbar/dekodierbar (nachrichtenlokal)
    #[error("Nachrichtenfehler: {0}")]
    Nachricht(#[from] MessageError),

    /// Unzulaessiger Zustandsuebergang oder fehlender Kanal/Geraet
    #[error("Zustandsfehler: {0}")]
    Zustand(String),

    /// Kanal/Geraet konnte nicht angelegt werden
    #[error("Ressourcenfehler: {0}")]
    Ressource(String),

    /// Registrierung oder Verbindung abgelehnt
    #[error("Abgelehnt: {0}")]
    Abgelehnt(String),

    /// Timeout (Keepalive)
    #[error("Timeout")]
    Timeout,

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Senden fehlgeschlagen (Session bereits beendet)
    #[error("Senden fehlgeschlagen")]
    SendFehler,
}

impl SignalingError {
    /// Erstellt einen Zustandsfehler
    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::Zustand(msg.into())
    }

    /// Erstellt einen Ressourcenfehler
    pub fn ressource(msg: impl Into<String>) -> Self {
        Self::Ressource(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Verbindung beenden muss
    pub fn ist_verbindungsfatal(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::Io(_) | Self::SendFehler)
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
