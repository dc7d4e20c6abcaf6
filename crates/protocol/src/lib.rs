//! skinnygate-protocol – Skinny-Wire-Codec
//!
//! Dieses Crate definiert das Frame-Format, den Nachrichtenkatalog beider
//! Protokollfamilien und die Versionstabelle, die pro ausgehandelter
//! Protokollversion die passenden Layouts bindet.

pub mod enums;
pub mod error;
pub mod fields;
pub mod ids;
mod layouts;
pub mod message;
pub mod messages;
pub mod version;
pub mod wire;

pub use error::{FrameError, MessageError};
pub use ids::Family;
pub use message::Message;
pub use version::{handler_set, HandlerSet};
pub use wire::{FrameCodec, RawFrame, MAX_PACKET};
