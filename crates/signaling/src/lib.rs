//! skinnygate-signaling – Skinny Control Layer
//!
//! Dieser Crate implementiert Sessions, Registrierung und die
//! Kanal-Zustandsmaschine des Gateways. Er verwaltet die TCP-Verbindungen
//! der Telefone und spricht ueber die Traits aus `skinnygate_core::host`
//! mit Verzeichnis, Feature-Store, Call-Control und Media-Layer.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer, ACL)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Reader-Task)
//!     |  Session: Accepted -> Authenticating -> Bound -> Active -> Stopping -> Closed
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- registration_handler (Token, Register, Unregister, Keepalive)
//!     +-- status_handler       (Templates, Line/SpeedDial/Forward/ConfigStat)
//!     +-- call_handler         (Hoerer, Tasten, Stimulus, Softkeys)
//!     +-- media_handler        (OpenReceiveChannel-/StartMedia-Acks)
//!
//! anruf     – Kanal-Zustandsmaschine, Waehlen, geteilte Leitungen
//! softkey   – Softkey-/Stimulus-Tabellen pro Geraeteklasse
//! scheduler – Ziffer-, Auflege- und Weiterleitungs-Timer
//! sweep     – beendet haengende Sessions
//! ```

pub mod acl;
pub(crate) mod anruf;
pub mod button_template;
pub mod channel;
pub mod connection;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod features;
pub mod handlers;
pub mod host;
pub mod indicate;
pub mod keepalive;
pub mod line;
pub mod media;
pub mod modelle;
pub mod registry;
pub mod scheduler;
pub mod server_state;
pub mod session;
pub mod snapshot;
pub mod softkey;
pub mod sweep;
pub mod tcp;

// Bequeme Re-Exporte
pub use acl::Acl;
pub use channel::{Channel, ChannelState, MediaZustand};
pub use connection::ClientConnection;
pub use device::{Device, RegistrationState};
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use host::{MemoryFeatureStore, StaticDirectory, StaticMedia};
pub use server_state::{GatewayState, Kollaborateure, KeepaliveConfig, SignalingConfig, WaehlConfig};
pub use session::{Session, SessionState, StopCause};
pub use snapshot::{Snapshot, Zaehler};
pub use tcp::SignalingServer;
