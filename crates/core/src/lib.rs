//! skinnygate-core – Gemeinsame Typen und Host-Schnittstellen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Skinnygate-Crates gemeinsam genutzt werden: Identifikationstypen,
//! Gateway-Ereignisse und die Schnittstellen zu
//! den externen Kollaborateuren (Geraete-Verzeichnis, Feature-Store,
//! Call-Control, Media-Layer).

pub mod event;
pub mod host;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use event::GatewayEvent;
pub use types::{CallId, DeviceId, LineName, OwnerHandle, SessionId};
