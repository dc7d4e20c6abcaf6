//! Zugriffskontrolle per Netz (permit/deny)
//!
//! Regel: die spezifischste passende Regel (laengstes Praefix) gewinnt,
//! bei gleicher Praefixlaenge gewinnt `deny`. Passt keine Regel, ist die
//! Adresse erlaubt, sofern keine `permit`-Regeln existieren.

use std::net::IpAddr;
use std::str::FromStr;

/// Ein Netz in CIDR-Schreibweise (`192.168.0.0/16`, `::1/128`, `10.0.0.7`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Netz {
    basis: IpAddr,
    praefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Ungueltiges Netz: {0}")]
pub struct NetzFehler(pub String);

impl FromStr for Netz {
    type Err = NetzFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (adresse, praefix) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let basis: IpAddr = adresse.parse().map_err(|_| NetzFehler(s.to_string()))?;
        let max = if basis.is_ipv4() { 32 } else { 128 };
        let praefix = match praefix {
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max)
                .ok_or_else(|| NetzFehler(s.to_string()))?,
            None => max,
        };
        Ok(Self { basis, praefix })
    }
}

impl Netz {
    pub fn enthaelt(&self, ip: IpAddr) -> bool {
        match (self.basis, ip) {
            (IpAddr::V4(netz), IpAddr::V4(ip)) => {
                let maske = maske_v4(self.praefix);
                u32::from(netz) & maske == u32::from(ip) & maske
            }
            (IpAddr::V6(netz), IpAddr::V6(ip)) => {
                let maske = maske_v6(self.praefix);
                u128::from(netz) & maske == u128::from(ip) & maske
            }
            // IPv4-mapped IPv6 gegen IPv4-Regeln pruefen
            (IpAddr::V4(_), IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
                Some(v4) => self.enthaelt(IpAddr::V4(v4)),
                None => false,
            },
            (IpAddr::V6(_), IpAddr::V4(_)) => false,
        }
    }
}

fn maske_v4(praefix: u8) -> u32 {
    if praefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(praefix))
    }
}

fn maske_v6(praefix: u8) -> u128 {
    if praefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(praefix))
    }
}

/// Zugriffsliste aus permit- und deny-Netzen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    permit: Vec<Netz>,
    deny: Vec<Netz>,
}

impl Acl {
    /// Alles erlaubt
    pub fn offen() -> Self {
        Self::default()
    }

    /// Parst permit/deny-Listen in CIDR-Schreibweise
    pub fn aus_listen<P, D>(permit: P, deny: D) -> Result<Self, NetzFehler>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Ok(Self {
            permit: permit
                .into_iter()
                .map(|n| n.as_ref().parse())
                .collect::<Result<_, _>>()?,
            deny: deny
                .into_iter()
                .map(|n| n.as_ref().parse())
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn ist_offen(&self) -> bool {
        self.permit.is_empty() && self.deny.is_empty()
    }

    /// Prueft ob eine Adresse zugelassen ist
    pub fn erlaubt(&self, ip: IpAddr) -> bool {
        let laengstes = |netze: &[Netz]| {
            netze
                .iter()
                .filter(|n| n.enthaelt(ip))
                .map(|n| n.praefix)
                .max()
        };
        match (laengstes(&self.permit), laengstes(&self.deny)) {
            (Some(p), Some(d)) => p > d,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => self.permit.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn netz_parsen() {
        let n: Netz = "192.168.0.0/16".parse().unwrap();
        assert!(n.enthaelt(ip("192.168.7.1")));
        assert!(!n.enthaelt(ip("192.169.0.1")));
        let einzel: Netz = "10.0.0.7".parse().unwrap();
        assert!(einzel.enthaelt(ip("10.0.0.7")));
        assert!(!einzel.enthaelt(ip("10.0.0.8")));
        assert!("10.0.0.0/33".parse::<Netz>().is_err());
        assert!("kein-netz".parse::<Netz>().is_err());
    }

    #[test]
    fn offene_acl_erlaubt_alles() {
        let acl = Acl::offen();
        assert!(acl.erlaubt(ip("8.8.8.8")));
        assert!(acl.erlaubt(ip("::1")));
    }

    #[test]
    fn deny_alles_permit_lan() {
        let acl = Acl::aus_listen(["192.168.0.0/16"], ["0.0.0.0/0"]).unwrap();
        assert!(acl.erlaubt(ip("192.168.1.20")));
        assert!(!acl.erlaubt(ip("10.1.1.1")));
    }

    #[test]
    fn nur_permit_verbietet_den_rest() {
        let acl = Acl::aus_listen(["127.0.0.1"], Vec::<String>::new()).unwrap();
        assert!(acl.erlaubt(ip("127.0.0.1")));
        assert!(!acl.erlaubt(ip("127.0.0.2")));
    }

    #[test]
    fn spezifisches_deny_schlaegt_permit() {
        let acl = Acl::aus_listen(["10.0.0.0/8"], ["10.0.0.66/32"]).unwrap();
        assert!(acl.erlaubt(ip("10.0.0.65")));
        assert!(!acl.erlaubt(ip("10.0.0.66")));
    }

    #[test]
    fn ipv4_mapped_adressen() {
        let acl = Acl::aus_listen(Vec::<String>::new(), ["127.0.0.0/8"]).unwrap();
        assert!(!acl.erlaubt(ip("::ffff:127.0.0.1")));
    }
}
