//! Geraetetypen und ihre Eigenschaften
//!
//! Der Geraetetyp kommt als Zahl im Register-Request. Unbekannte Typen
//! werden wie ein Telefon mit Display und acht Tasten behandelt.

pub const TYP_ATA186: u32 = 12;
pub const TYP_7960: u32 = 7;
pub const TYP_7940: u32 = 8;
pub const TYP_7941: u32 = 115;
pub const TYP_7971: u32 = 119;
pub const TYP_7911: u32 = 307;
pub const TYP_7921: u32 = 365;
pub const TYP_7965: u32 = 436;
pub const TYP_7975: u32 = 437;
pub const TYP_7925: u32 = 484;
pub const TYP_7926: u32 = 577;
pub const TYP_7905: u32 = 20000;
pub const TYP_7920: u32 = 30002;
pub const TYP_7970: u32 = 30006;
pub const TYP_7912: u32 = 30007;
pub const TYP_7902: u32 = 30008;

/// Tastenplaetze fuer Modelle ausserhalb der Tabelle
pub const STANDARD_TASTEN: usize = 8;

/// Anzahl der Tastenplaetze im Button-Template
pub fn tastenanzahl(geraete_typ: u32) -> usize {
    match geraete_typ {
        TYP_7960 | TYP_7965 | TYP_7920 | TYP_7921 | TYP_7925 | TYP_7926 => 6,
        TYP_7940 | TYP_7941 => 2,
        TYP_7970 | TYP_7971 | TYP_7975 => 8,
        TYP_7912 | TYP_7905 | TYP_7902 | TYP_7911 | TYP_ATA186 => 1,
        _ => STANDARD_TASTEN,
    }
}

/// Geraete ohne Display bekommen keine Prompt- und Notify-Nachrichten
pub fn hat_display(geraete_typ: u32) -> bool {
    !matches!(geraete_typ, TYP_ATA186 | TYP_7902)
}

/// Akkubetriebene Handsets mit laengerer Keepalive-Toleranz
pub fn ist_low_power(geraete_typ: u32) -> bool {
    matches!(geraete_typ, TYP_7920 | TYP_7921 | TYP_7925 | TYP_7926)
}

/// Softkey-Klasse eines Geraets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeraeteKlasse {
    Standard,
    /// Einfache Geraete mit reduziertem Funktionsumfang
    Eingeschraenkt,
}

pub fn klasse(geraete_typ: u32) -> GeraeteKlasse {
    match geraete_typ {
        TYP_ATA186 | TYP_7902 | TYP_7905 | TYP_7912 => GeraeteKlasse::Eingeschraenkt,
        _ => GeraeteKlasse::Standard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tastenanzahl_pro_modell() {
        assert_eq!(tastenanzahl(TYP_7960), 6);
        assert_eq!(tastenanzahl(TYP_7940), 2);
        assert_eq!(tastenanzahl(TYP_7970), 8);
        assert_eq!(tastenanzahl(TYP_7912), 1);
        assert_eq!(tastenanzahl(99_999), STANDARD_TASTEN);
    }

    #[test]
    fn geraete_ohne_display() {
        assert!(!hat_display(TYP_ATA186));
        assert!(!hat_display(TYP_7902));
        assert!(hat_display(TYP_7960));
    }

    #[test]
    fn klassen() {
        assert_eq!(klasse(TYP_7902), GeraeteKlasse::Eingeschraenkt);
        assert_eq!(klasse(TYP_7960), GeraeteKlasse::Standard);
        assert!(ist_low_power(TYP_7921));
        assert!(!ist_low_power(TYP_7960));
    }
}
