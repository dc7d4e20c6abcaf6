//! Wire-Format fuer Skinny-TCP-Verbindungen
//!
//! Jeder Frame beginnt mit einem 8-Byte-Kopf, alle Felder little-endian.
//!
//! ## Frame-Format
//!
//! ```text
//! +----------------+----------------+----------------+----...----+
//! | Laenge (u32)   | Header-Version | Nachrichten-ID | Payload    |
//! +----------------+----------------+----------------+----...----+
//! ```
//!
//! Die Laenge zaehlt ID + Payload (also `4 + payload.len()`). Das Feld
//! Header-Version wird gelesen, aber nicht ausgewertet.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Maximale Paketgroesse inklusive Kopf
pub const MAX_PACKET: usize = 2000;

/// Laenge + Header-Version
pub const HEADER_SIZE: usize = 8;

/// Kleinste erlaubte Laenge (nur Nachrichten-ID)
pub const MIN_LENGTH: u32 = 4;

/// Groesste erlaubte Laenge
pub const MAX_LENGTH: u32 = (MAX_PACKET - HEADER_SIZE) as u32;

// ---------------------------------------------------------------------------
// RawFrame
// ---------------------------------------------------------------------------

/// Undekodierter Frame: ID plus rohe Nutzlast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub id: u32,
    pub header_version: u32,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn neu(id: u32, payload: Bytes) -> Self {
        Self {
            id,
            header_version: 0,
            payload,
        }
    }

    /// Wert des Laengenfelds (ID + Payload)
    pub fn laenge(&self) -> usize {
        4 + self.payload.len()
    }
}

fn laenge_pruefen(laenge: u32) -> Result<(), FrameError> {
    if (MIN_LENGTH..=MAX_LENGTH).contains(&laenge) {
        Ok(())
    } else {
        Err(FrameError::UngueltigeLaenge {
            laenge,
            min: MIN_LENGTH,
            max: MAX_LENGTH,
        })
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer Skinny-Frames
///
/// Eine Laenge ausserhalb von `[MIN_LENGTH, MAX_LENGTH]` ist ein
/// verbindungsfataler `FrameError`; der Puffer ist danach nicht mehr
/// synchron.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = RawFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        // Laenge sofort pruefen, nicht erst wenn der Frame vollstaendig ist
        let laenge = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        laenge_pruefen(laenge)?;

        let gesamt = HEADER_SIZE + laenge as usize;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        src.advance(4);
        let header_version = src.get_u32_le();
        let id = src.get_u32_le();
        let payload = src.split_to(laenge as usize - 4).freeze();

        Ok(Some(RawFrame {
            id,
            header_version,
            payload,
        }))
    }
}

impl Encoder<RawFrame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: RawFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let laenge = item.laenge();
        if laenge > MAX_LENGTH as usize {
            return Err(FrameError::ZuGross(laenge));
        }
        dst.reserve(HEADER_SIZE + laenge);
        dst.put_u32_le(laenge as u32);
        dst.put_u32_le(item.header_version);
        dst.put_u32_le(item.id);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `Io(UnexpectedEof)` wenn die Verbindung mitten im Frame endet
/// - `UngueltigeLaenge` bei einem Laengenfeld ausserhalb der Grenzen
pub async fn read_frame<R>(reader: &mut R) -> Result<RawFrame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let laenge = reader.read_u32_le().await?;
    laenge_pruefen(laenge)?;
    let header_version = reader.read_u32_le().await?;
    let id = reader.read_u32_le().await?;

    let mut payload = vec![0u8; laenge as usize - 4];
    reader.read_exact(&mut payload).await?;

    Ok(RawFrame {
        id,
        header_version,
        payload: payload.into(),
    })
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
pub async fn write_frame<W>(writer: &mut W, frame: &RawFrame) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::new();
    FrameCodec.encode(frame.clone(), &mut buf)?;
    writer.write_all(&buf).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn keepalive_ack() -> RawFrame {
        RawFrame::neu(0x0100, Bytes::new())
    }

    #[test]
    fn frame_layout_little_endian() {
        let mut buf = BytesMut::new();
        FrameCodec
            .encode(RawFrame::neu(0x0088, Bytes::from_static(&[1, 0, 0, 0])), &mut buf)
            .unwrap();
        assert_eq!(
            &buf[..],
            &[8, 0, 0, 0, 0, 0, 0, 0, 0x88, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn frame_codec_encode_decode_round_trip() {
        let mut codec = FrameCodec::new();
        let original = RawFrame::neu(0x0111, Bytes::from_static(&[5, 0, 0, 0, 1, 0, 0, 0]));

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + original.laenge());

        let decoded = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss einen Frame enthalten");
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(RawFrame::neu(0x0006, Bytes::from_static(&[0; 8])), &mut buf)
            .unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x04, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn frame_codec_laenge_unter_minimum() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_u32_le(0);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::UngueltigeLaenge { laenge: 2, .. }));
    }

    #[test]
    fn frame_codec_laenge_ueber_maximum() {
        let mut codec = FrameCodec::new();
        // nur das Laengenfeld ist da, Ablehnung erfolgt trotzdem sofort
        let mut buf = BytesMut::new();
        buf.put_u32_le(MAX_LENGTH + 1);
        assert!(codec.decode(&mut buf).is_err());

        let mut grenze = BytesMut::new();
        grenze.put_u32_le(MAX_LENGTH);
        assert!(codec.decode(&mut grenze).unwrap().is_none());
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode_zu_grosse_nachricht() {
        let mut codec = FrameCodec::new();
        let gross = RawFrame::neu(0x0001, Bytes::from(vec![0u8; MAX_PACKET]));
        let mut buf = BytesMut::new();
        assert!(matches!(
            codec.encode(gross, &mut buf),
            Err(FrameError::ZuGross(_))
        ));
    }

    #[test]
    fn frame_codec_mehrere_frames_im_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        for id in 0..3u32 {
            codec.encode(RawFrame::neu(id, Bytes::new()), &mut buf).unwrap();
        }
        for id in 0..3u32 {
            let f = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
            assert_eq!(f.id, id);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn header_version_wird_durchgereicht() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(4);
        buf.put_u32_le(0x11);
        buf.put_u32_le(0x0000);
        let f = FrameCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f.header_version, 0x11);
        assert_eq!(f.id, 0);
    }

    #[tokio::test]
    async fn async_read_write_frame_round_trip() {
        let mut buffer: Vec<u8> = Vec::new();
        write_frame(&mut buffer, &keepalive_ack()).await.unwrap();
        assert_eq!(buffer.len(), 12);

        let mut cursor = io::Cursor::new(buffer);
        let decoded = read_frame(&mut cursor).await.unwrap();
        assert_eq!(decoded, keepalive_ack());
    }

    #[tokio::test]
    async fn async_read_frame_ablehnung_ungueltige_laenge() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(&5000u32.to_le_bytes());
        let mut cursor = io::Cursor::new(buffer);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(FrameError::UngueltigeLaenge { .. })));
    }

    #[tokio::test]
    async fn async_read_frame_eof_mitten_im_frame() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(&12u32.to_le_bytes());
        buffer.extend_from_slice(&[0; 6]);
        let mut cursor = io::Cursor::new(buffer);
        assert!(matches!(read_frame(&mut cursor).await, Err(FrameError::Io(_))));
    }
}
