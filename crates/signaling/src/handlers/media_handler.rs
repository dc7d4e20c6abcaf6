//! Media-Handler – Acks der RTP-Aushandlung und Verbindungsstatistik

use skinnygate_protocol::messages::{
    ConnectionStatisticsRes, OpenReceiveChannelAck, PortResponse, StartMediaTransmissionAck,
};

use crate::handlers::HandlerContext;
use crate::media;

pub async fn handle_open_receive_channel_ack(
    ctx: &HandlerContext,
    ack: OpenReceiveChannelAck,
    video: bool,
) {
    let Some(geraet) = ctx.geraet() else {
        return;
    };
    media::orc_ack(&ctx.state, &geraet, &ack, video).await;
}

pub async fn handle_start_media_transmission_ack(
    ctx: &HandlerContext,
    ack: StartMediaTransmissionAck,
) {
    if let Some(geraet) = ctx.geraet() {
        media::smt_ack(&ctx.state, &geraet, &ack);
    }
}

pub async fn handle_port_response(ctx: &HandlerContext, antwort: PortResponse) {
    if ctx.geraet().is_some() {
        media::port_antwort(&ctx.state, &antwort);
    }
}

pub async fn handle_connection_statistics(ctx: &HandlerContext, res: ConnectionStatisticsRes) {
    let device = ctx
        .session
        .geraet()
        .map(|g| g.id.to_string())
        .unwrap_or_default();
    tracing::info!(
        %device,
        call_reference = res.call_reference,
        nummer = %res.directory_number,
        gesendet = res.packets_sent,
        empfangen = res.packets_received,
        verloren = res.packets_lost,
        jitter = res.jitter,
        latenz = res.latency,
        "Verbindungsstatistik"
    );
}
