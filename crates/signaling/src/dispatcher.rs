//! Message-Dispatcher – Routet eingehende Nachrichten an die Handler
//!
//! Der Reader-Task ruft `dispatch` fuer jede dekodierte Nachricht einer
//! Session strikt nacheinander auf. Handler, die ein registriertes Geraet
//! brauchen, pruefen das selbst und sind ohne Geraet ein No-op.

use skinnygate_protocol::Message;
use std::sync::Arc;

use crate::handlers::{
    call_handler, media_handler, registration_handler, status_handler, HandlerContext,
};
use crate::server_state::GatewayState;
use crate::session::Session;

/// Zentraler Message-Dispatcher
#[derive(Clone)]
pub struct MessageDispatcher {
    state: Arc<GatewayState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende Nachricht
    ///
    /// Antworten gehen direkt ueber die Session hinaus.
    pub async fn dispatch(&self, session: &Arc<Session>, message: Message) {
        let ctx = HandlerContext::neu(Arc::clone(&self.state), Arc::clone(session));
        tracing::trace!(session = %session.id, nachricht = message.name(), "Nachricht empfangen");

        match message {
            // -------------------------------------------------------------------
            // Registrierung
            // -------------------------------------------------------------------
            Message::KeepAlive => registration_handler::handle_keepalive(&ctx).await,
            Message::RegisterTokenReq(req) => {
                registration_handler::handle_register_token(&ctx, req).await
            }
            Message::SpcpRegisterTokenReq(req) => {
                registration_handler::handle_spcp_register_token(&ctx, req).await
            }
            Message::Register(req) => registration_handler::handle_register(&ctx, req).await,
            Message::Unregister => registration_handler::handle_unregister(&ctx).await,
            Message::IpPort(req) => registration_handler::handle_ip_port(&ctx, req).await,
            Message::CapabilitiesRes(res) => {
                registration_handler::handle_capabilities(&ctx, res).await
            }
            Message::Alarm(alarm) => registration_handler::handle_alarm(&ctx, alarm).await,
            Message::HeadsetStatus(status) => {
                registration_handler::handle_headset(&ctx, status).await
            }
            Message::RegisterAvailableLines(req) => {
                registration_handler::handle_available_lines(&ctx, req).await
            }

            // -------------------------------------------------------------------
            // Templates und Stat-Anfragen
            // -------------------------------------------------------------------
            Message::ButtonTemplateReq => status_handler::handle_button_template_req(&ctx).await,
            Message::SoftKeyTemplateReq => status_handler::handle_softkey_template_req(&ctx).await,
            Message::SoftKeySetReq => status_handler::handle_softkey_set_req(&ctx).await,
            Message::LineStatReq(req) => status_handler::handle_line_stat_req(&ctx, req).await,
            Message::SpeedDialStatReq(req) => {
                status_handler::handle_speed_dial_stat_req(&ctx, req).await
            }
            Message::ForwardStatReq(req) => {
                status_handler::handle_forward_stat_req(&ctx, req).await
            }
            Message::ConfigStatReq => status_handler::handle_config_stat_req(&ctx).await,
            Message::TimeDateReq => status_handler::handle_time_date_req(&ctx).await,
            Message::VersionReq => status_handler::handle_version_req(&ctx).await,

            // -------------------------------------------------------------------
            // Anrufe
            // -------------------------------------------------------------------
            Message::OffHook(req) => call_handler::handle_offhook(&ctx, req).await,
            Message::OnHook(req) => call_handler::handle_onhook(&ctx, req).await,
            Message::HookFlash(req) => call_handler::handle_hookflash(&ctx, req).await,
            Message::KeypadButton(req) => call_handler::handle_keypad(&ctx, req).await,
            Message::EnblocCall(req) => call_handler::handle_enbloc(&ctx, req).await,
            Message::Stimulus(req) => call_handler::handle_stimulus(&ctx, req).await,
            Message::SoftKeyEvent(req) => call_handler::handle_softkey(&ctx, req).await,

            // -------------------------------------------------------------------
            // Medien
            // -------------------------------------------------------------------
            Message::OpenReceiveChannelAck(ack) => {
                media_handler::handle_open_receive_channel_ack(&ctx, ack, false).await
            }
            Message::OpenMultiMediaReceiveChannelAck(ack) => {
                media_handler::handle_open_receive_channel_ack(&ctx, ack, true).await
            }
            Message::StartMediaTransmissionAck(ack) => {
                media_handler::handle_start_media_transmission_ack(&ctx, ack).await
            }
            Message::PortResponse(antwort) => {
                media_handler::handle_port_response(&ctx, antwort).await
            }
            Message::ConnectionStatisticsRes(res) => {
                media_handler::handle_connection_statistics(&ctx, res).await
            }

            Message::Unhandled { id, length } => {
                tracing::debug!(
                    session = %session.id,
                    id = %format!("0x{id:04X}"),
                    length,
                    "Nachricht ohne Handler ignoriert"
                );
            }

            // Ausgangsnachrichten kommen vom Telefon nicht
            andere => {
                tracing::debug!(
                    session = %session.id,
                    nachricht = andere.name(),
                    "Unerwartete Nachricht vom Telefon"
                );
            }
        }
    }
}
