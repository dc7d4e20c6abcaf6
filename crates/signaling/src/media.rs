//! RTP-Aushandlung zwischen Telefon und Media-Layer
//!
//! Empfangsrichtung: OpenReceiveChannel -> Ack (Adresse des Telefons).
//! Senderichtung: StartMediaTransmission -> Ack. Acks werden ueber die
//! Pass-Thru-Party-ID dem Kanal zugeordnet und nur vom gebundenen Geraet
//! angenommen.

use skinnygate_protocol::enums::{Codec, MediaStatus};
use skinnygate_protocol::messages::{
    MediaChannelRef, OpenReceiveChannel, OpenReceiveChannelAck, PortRef, PortResponse,
    StartMediaTransmission, StartMediaTransmissionAck,
};
use skinnygate_protocol::Message;
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use crate::anruf;
use crate::channel::{Channel, ChannelState, MediaZustand, Medien};
use crate::device::Device;
use crate::server_state::GatewayState;

/// Paketdauer in Millisekunden
const PAKET_MS: u32 = 20;

/// Erster Audio-Codec aus den Capabilities, sonst G.711 u-law
fn audio_codec(geraet: &Device) -> Codec {
    geraet
        .lesen()
        .codecs
        .iter()
        .filter_map(|c| Codec::from_u32(c.codec))
        .find(|c| !c.ist_video())
        .unwrap_or(Codec::G711Ulaw)
}

fn hat_ports(geraet: &Device) -> bool {
    geraet
        .session()
        .is_some_and(|s| s.protokoll().port_request.is_some())
}

fn port_ref(kanal: &Channel, video: bool) -> PortRef {
    PortRef {
        conference_id: kanal.call_id.inner(),
        pass_thru_party_id: kanal.pass_thru_party_id(),
        call_reference: kanal.call_id.inner(),
        video,
    }
}

fn kanal_ref(kanal: &Channel) -> MediaChannelRef {
    MediaChannelRef {
        conference_id: kanal.call_id.inner(),
        pass_thru_party_id: kanal.pass_thru_party_id(),
        call_reference: kanal.call_id.inner(),
    }
}

/// Oeffnet die Empfangsrichtung auf dem Telefon
pub(crate) async fn starten(state: &GatewayState, kanal: &Channel, geraet: &Device) {
    let codec = audio_codec(geraet);
    let echo_cancel = state
        .registry
        .leitung(&kanal.line)
        .map(|l| l.config().echo_cancel)
        .unwrap_or(true);

    let mut nachrichten = Vec::with_capacity(2);
    if hat_ports(geraet) {
        nachrichten.push(Message::PortRequest(port_ref(kanal, false)));
    }
    nachrichten.push(Message::OpenReceiveChannel(OpenReceiveChannel {
        conference_id: kanal.call_id.inner(),
        pass_thru_party_id: kanal.pass_thru_party_id(),
        packet_size: PAKET_MS,
        payload_type: codec.as_u32(),
        echo_cancel,
        call_reference: kanal.call_id.inner(),
    }));
    {
        let mut g = kanal.bearbeiten();
        g.medien.rx_audio = MediaZustand::Ausstehend;
        g.medien.codec = codec.as_u32();
    }
    tracing::debug!(device = %geraet.id, call_id = %kanal.call_id, ?codec, "Empfangskanal angefordert");
    if let Err(e) = geraet.senden_alle(nachrichten).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "OpenReceiveChannel nicht gesendet");
    }
}

fn rx_setzen(medien: &mut Medien, video: bool, zustand: MediaZustand) {
    if video {
        medien.rx_video = zustand;
    } else {
        medien.rx_audio = zustand;
    }
}

/// Kanal zur Pass-Thru-ID, sofern er an `geraet` gebunden ist
fn eigener_kanal(state: &GatewayState, geraet: &Device, pass_thru: u32) -> Option<Arc<Channel>> {
    let kanal = state.registry.kanal_per_pass_thru(pass_thru)?;
    let gebunden = kanal
        .geraet()
        .is_some_and(|g| std::ptr::eq(Arc::as_ptr(&g), geraet));
    if !gebunden {
        tracing::debug!(
            device = %geraet.id,
            call_id = %kanal.call_id,
            "Medien-Ack fuer fremden Kanal verworfen"
        );
        return None;
    }
    Some(kanal)
}

/// Ack des Telefons auf OpenReceiveChannel (Audio oder Video)
pub(crate) async fn orc_ack(
    state: &Arc<GatewayState>,
    geraet: &Device,
    ack: &OpenReceiveChannelAck,
    video: bool,
) {
    let Some(kanal) = eigener_kanal(state, geraet, ack.pass_thru_party_id) else {
        tracing::debug!(
            device = %geraet.id,
            pass_thru = ack.pass_thru_party_id,
            "OpenReceiveChannelAck ohne Kanal"
        );
        return;
    };

    let status = MediaStatus::from_u32(ack.media_status);
    if status != Some(MediaStatus::Ok) {
        rx_setzen(&mut kanal.bearbeiten().medien, video, MediaZustand::Inaktiv);
        if status == Some(MediaStatus::Unknown) {
            tracing::debug!(call_id = %kanal.call_id, video, "Empfangskanal mit Status Unknown");
        } else {
            tracing::warn!(
                device = %geraet.id,
                call_id = %kanal.call_id,
                media_status = ack.media_status,
                "Telefon konnte keinen Empfangskanal oeffnen"
            );
            anruf::fehler(state, &kanal, ChannelState::Congestion).await;
        }
        return;
    }

    let telefon = match ack.ip {
        IpAddr::V4(ip) => SocketAddrV4::new(ip, ack.port as u16),
        IpAddr::V6(ip) => {
            tracing::debug!(call_id = %kanal.call_id, %ip, "IPv6-Medien werden nicht unterstuetzt");
            rx_setzen(&mut kanal.bearbeiten().medien, video, MediaZustand::Inaktiv);
            return;
        }
    };
    {
        let mut g = kanal.bearbeiten();
        rx_setzen(&mut g.medien, video, MediaZustand::Aktiv);
        g.medien.telefon = Some(telefon);
    }
    state
        .media
        .telefon_adresse(kanal.call_id, video, telefon)
        .await;

    let Some(lokal) = state.media.lokale_adresse(kanal.call_id, video).await else {
        tracing::warn!(call_id = %kanal.call_id, video, "Media-Layer liefert keine lokale Adresse");
        return;
    };
    let silence_suppression = state
        .registry
        .leitung(&kanal.line)
        .map(|l| l.config().silence_suppression)
        .unwrap_or(false);
    let codec = {
        let mut g = kanal.bearbeiten();
        g.medien.remote = Some(lokal);
        if video {
            g.medien.tx_video = MediaZustand::Ausstehend;
        } else {
            g.medien.tx_audio = MediaZustand::Ausstehend;
        }
        g.medien.codec
    };
    let smt = StartMediaTransmission {
        conference_id: kanal.call_id.inner(),
        pass_thru_party_id: kanal.pass_thru_party_id(),
        remote: SocketAddr::V4(lokal),
        packet_size: PAKET_MS,
        payload_type: codec,
        precedence: 0,
        silence_suppression,
        max_frames_per_packet: 0,
        call_reference: kanal.call_id.inner(),
    };
    let msg = if video {
        Message::StartMultiMediaTransmission(smt)
    } else {
        Message::StartMediaTransmission(smt)
    };
    tracing::debug!(call_id = %kanal.call_id, %telefon, %lokal, video, "Senderichtung wird gestartet");
    if let Err(e) = geraet.senden(msg).await {
        tracing::debug!(device = %geraet.id, fehler = %e, "StartMediaTransmission nicht gesendet");
    }
}

/// Ack des Telefons auf StartMediaTransmission
pub(crate) fn smt_ack(state: &GatewayState, geraet: &Device, ack: &StartMediaTransmissionAck) {
    let Some(kanal) = eigener_kanal(state, geraet, ack.pass_thru_party_id) else {
        tracing::debug!(device = %geraet.id, pass_thru = ack.pass_thru_party_id, "StartMediaTransmissionAck ohne Kanal");
        return;
    };
    let neu = if MediaStatus::from_u32(ack.media_status) == Some(MediaStatus::Ok) {
        MediaZustand::Aktiv
    } else {
        MediaZustand::Inaktiv
    };
    let mut g = kanal.bearbeiten();
    if g.medien.tx_video == MediaZustand::Ausstehend && g.medien.tx_audio != MediaZustand::Ausstehend
    {
        g.medien.tx_video = neu;
    } else {
        g.medien.tx_audio = neu;
    }
    tracing::debug!(call_id = %kanal.call_id, zustand = ?neu, "Senderichtung bestaetigt");
}

/// Antwort auf PortRequest (ab v19)
pub(crate) fn port_antwort(state: &GatewayState, antwort: &PortResponse) {
    match state.registry.kanal_per_pass_thru(antwort.pass_thru_party_id) {
        Some(kanal) => tracing::debug!(
            call_id = %kanal.call_id,
            ip = %antwort.ip,
            port = antwort.port,
            rtcp_port = antwort.rtcp_port,
            "PortResponse"
        ),
        None => tracing::debug!(pass_thru = antwort.pass_thru_party_id, "PortResponse ohne Kanal"),
    }
}

/// Nachrichten zum Schliessen aller offenen Richtungen
///
/// Setzt den Medienzustand des Kanals zurueck.
pub(crate) fn schliessen_nachrichten(kanal: &Channel, geraet: &Device) -> Vec<Message> {
    let medien = {
        let mut g = kanal.bearbeiten();
        let alt = g.medien.clone();
        g.medien = Medien {
            codec: alt.codec,
            ..Medien::default()
        };
        alt
    };
    let mut out = Vec::new();
    if medien.tx_audio != MediaZustand::Inaktiv {
        out.push(Message::StopMediaTransmission(kanal_ref(kanal)));
    }
    if medien.rx_audio != MediaZustand::Inaktiv {
        out.push(Message::CloseReceiveChannel(kanal_ref(kanal)));
    }
    if medien.tx_video != MediaZustand::Inaktiv {
        out.push(Message::StopMultiMediaTransmission(kanal_ref(kanal)));
    }
    if medien.rx_video != MediaZustand::Inaktiv {
        out.push(Message::CloseMultiMediaReceiveChannel(kanal_ref(kanal)));
    }
    if !out.is_empty() && hat_ports(geraet) {
        out.push(Message::PortClose(port_ref(kanal, false)));
    }
    out
}
