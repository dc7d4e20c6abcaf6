//! Feld-Primitive fuer Skinny-Nutzlasten
//!
//! Alle Mehrbyte-Zahlen sind little-endian. Textfelder haben eine feste
//! Breite und werden mit NUL aufgefuellt. IP-Adressen liegen als rohe
//! Bytes in Netzwerk-Reihenfolge vor.
//!
//! Der Reader liefert hinter dem Ende der Nutzlast Nullen. Kuerzere
//! Nutzlasten (aeltere Firmware) werden damit logisch aufgefuellt.

use bytes::{BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Kennung fuer IPv4 im Feld `ipAddrType`
pub const IP_V4: u32 = 0;
/// Kennung fuer IPv6 im Feld `ipAddrType`
pub const IP_V6: u32 = 1;

/// Lesezeiger ueber eine Nutzlast
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Aktuelle Leseposition
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Anzahl der tatsaechlich noch vorhandenen Bytes
    pub fn verbleibend(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.buf.get(index).copied().unwrap_or(0)
    }

    pub fn u8(&mut self) -> u8 {
        let v = self.byte_at(self.pos);
        self.pos += 1;
        v
    }

    pub fn u16(&mut self) -> u16 {
        let v = u16::from_le_bytes([self.byte_at(self.pos), self.byte_at(self.pos + 1)]);
        self.pos += 2;
        v
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array::<4>())
    }

    /// Liest `N` rohe Bytes (hinter dem Ende: Nullen)
    pub fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        for (i, b) in out.iter_mut().enumerate() {
            *b = self.byte_at(self.pos + i);
        }
        self.pos += N;
        out
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    /// Textfeld fester Breite (endet am ersten NUL)
    pub fn string(&mut self, breite: usize) -> String {
        let start = self.pos.min(self.buf.len());
        let ende = (self.pos + breite).min(self.buf.len());
        let feld = &self.buf[start..ende];
        let laenge = feld.iter().position(|&b| b == 0).unwrap_or(feld.len());
        self.pos += breite;
        String::from_utf8_lossy(&feld[..laenge]).into_owned()
    }

    /// NUL-terminierter Text variabler Laenge (dynamische Nachrichten)
    pub fn cstring(&mut self) -> String {
        let start = self.pos.min(self.buf.len());
        let rest = &self.buf[start..];
        let laenge = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        // NUL mitverbrauchen
        self.pos += laenge + 1;
        String::from_utf8_lossy(&rest[..laenge]).into_owned()
    }

    pub fn ipv4(&mut self) -> Ipv4Addr {
        Ipv4Addr::from(self.array::<4>())
    }

    /// `ipAddrType` + 16-Byte-Adressfeld (Layouts ab v17)
    pub fn ip_dual(&mut self) -> IpAddr {
        let typ = self.u32();
        let roh = self.array::<16>();
        if typ == IP_V6 {
            IpAddr::V6(Ipv6Addr::from(roh))
        } else {
            IpAddr::V4(Ipv4Addr::new(roh[0], roh[1], roh[2], roh[3]))
        }
    }

    /// Springt auf die naechste 4-Byte-Grenze
    pub fn align4(&mut self) {
        let rest = self.pos % 4;
        if rest != 0 {
            self.pos += 4 - rest;
        }
    }
}

/// Schreibpuffer fuer eine Nutzlast
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(64),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn bool32(&mut self, v: bool) {
        self.u32(u32::from(v));
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    pub fn zeros(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    /// Textfeld fester Breite; mindestens ein NUL bleibt erhalten
    pub fn string(&mut self, text: &str, breite: usize) {
        let roh = text.as_bytes();
        let n = roh.len().min(breite.saturating_sub(1));
        self.buf.put_slice(&roh[..n]);
        self.zeros(breite - n);
    }

    /// NUL-terminierter Text, auf `max` Zeichen begrenzt
    pub fn cstring(&mut self, text: &str, max: usize) {
        let roh = text.as_bytes();
        let n = roh.len().min(max);
        self.buf.put_slice(&roh[..n]);
        self.buf.put_u8(0);
    }

    pub fn ipv4(&mut self, ip: Ipv4Addr) {
        self.buf.put_slice(&ip.octets());
    }

    pub fn ip_dual(&mut self, ip: IpAddr) {
        match ip {
            IpAddr::V4(v4) => {
                self.u32(IP_V4);
                self.buf.put_slice(&v4.octets());
                self.zeros(12);
            }
            IpAddr::V6(v6) => {
                self.u32(IP_V6);
                self.buf.put_slice(&v6.octets());
            }
        }
    }

    /// Fuellt mit Nullen bis zur naechsten 4-Byte-Grenze
    pub fn align4(&mut self) {
        let rest = self.buf.len() % 4;
        if rest != 0 {
            self.zeros(4 - rest);
        }
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}
