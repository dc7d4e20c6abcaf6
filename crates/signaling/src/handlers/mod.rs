//! Handler fuer alle eingehenden Nachrichten
//!
//! Jeder Handler bekommt den gemeinsamen GatewayState und die Session,
//! ueber die die Nachricht kam. Antworten gehen ueber die Session bzw.
//! das gebundene Geraet hinaus.

pub mod call_handler;
pub mod media_handler;
pub mod registration_handler;
pub mod status_handler;

use std::sync::Arc;

use crate::device::{Device, RegistrationState};
use crate::server_state::GatewayState;
use crate::session::Session;

/// Kontext einer einzelnen Nachricht
#[derive(Clone)]
pub struct HandlerContext {
    pub state: Arc<GatewayState>,
    pub session: Arc<Session>,
}

impl HandlerContext {
    pub fn neu(state: Arc<GatewayState>, session: Arc<Session>) -> Self {
        Self { state, session }
    }

    /// Das gebundene, fertig registrierte Geraet
    ///
    /// Handler ohne Geraet sind ein No-op.
    pub fn geraet(&self) -> Option<Arc<Device>> {
        let geraet = self.session.geraet()?;
        match geraet.zustand() {
            RegistrationState::Ok | RegistrationState::Progress => Some(geraet),
            zustand => {
                tracing::trace!(device = %geraet.id, ?zustand, "Geraet nicht registriert");
                None
            }
        }
    }
}
