//! Button-Template eines Geraets
//!
//! Das Template hat pro Modell eine feste Anzahl Plaetze. Konfigurierte
//! Tasten belegen die Plaetze in Reihenfolge, der Rest wird mit
//! `Undefined` aufgefuellt. Die Instanz einer Taste ist ihre Position + 1
//! (gemeinsamer Zaehler fuer alle Tastenarten).

use serde::Serialize;
use skinnygate_core::host::{ButtonConfig, FeatureKind};
use skinnygate_core::LineName;
use skinnygate_protocol::enums::ButtonType;
use skinnygate_protocol::messages::{ButtonDefinition, ButtonTemplate, MAX_BUTTON_DEFINITIONS};

use crate::modelle;

/// Belegter Platz im Template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum Taste {
    Leitung {
        instance: u32,
        name: LineName,
        label: Option<String>,
        subscription: Option<String>,
    },
    Kurzwahl {
        instance: u32,
        nummer: String,
        label: String,
    },
    Feature {
        instance: u32,
        art: FeatureKind,
        label: Option<String>,
    },
    ServiceUrl {
        instance: u32,
        url: String,
        label: String,
    },
    Leer {
        instance: u32,
    },
}

impl Taste {
    pub fn instance(&self) -> u32 {
        match self {
            Self::Leitung { instance, .. }
            | Self::Kurzwahl { instance, .. }
            | Self::Feature { instance, .. }
            | Self::ServiceUrl { instance, .. }
            | Self::Leer { instance } => *instance,
        }
    }

    fn button_type(&self) -> ButtonType {
        match self {
            Self::Leitung { .. } => ButtonType::Line,
            Self::Kurzwahl { .. } => ButtonType::SpeedDial,
            Self::Feature { art, .. } => feature_button(*art),
            Self::ServiceUrl { .. } => ButtonType::ServiceUrl,
            Self::Leer { .. } => ButtonType::Undefined,
        }
    }
}

/// Draht-Tastentyp einer Feature-Taste
pub fn feature_button(art: FeatureKind) -> ButtonType {
    match art {
        FeatureKind::Dnd => ButtonType::Dnd,
        FeatureKind::Privacy => ButtonType::Privacy,
        FeatureKind::Monitor => ButtonType::Monitor,
        FeatureKind::ForwardAll => ButtonType::ForwardAll,
        FeatureKind::Voicemail => ButtonType::Voicemail,
        FeatureKind::Redial => ButtonType::LastNumberRedial,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Template {
    pub tasten: Vec<Taste>,
}

impl Template {
    /// Baut das Template fuer einen Geraetetyp aus der Konfiguration
    pub fn bauen(geraete_typ: u32, buttons: &[ButtonConfig]) -> Self {
        let plaetze = modelle::tastenanzahl(geraete_typ).min(MAX_BUTTON_DEFINITIONS);
        if buttons.len() > plaetze {
            tracing::warn!(
                geraete_typ,
                konfiguriert = buttons.len(),
                plaetze,
                "Mehr Tasten konfiguriert als das Modell hat, Rest wird ignoriert"
            );
        }

        let mut tasten: Vec<Taste> = buttons
            .iter()
            .take(plaetze)
            .enumerate()
            .map(|(pos, b)| {
                let instance = pos as u32 + 1;
                match b {
                    ButtonConfig::Line {
                        name,
                        label,
                        subscription,
                    } => Taste::Leitung {
                        instance,
                        name: name.clone(),
                        label: label.clone(),
                        subscription: subscription.clone(),
                    },
                    ButtonConfig::SpeedDial { number, label } => Taste::Kurzwahl {
                        instance,
                        nummer: number.clone(),
                        label: label.clone(),
                    },
                    ButtonConfig::Feature { feature, label } => Taste::Feature {
                        instance,
                        art: *feature,
                        label: label.clone(),
                    },
                    ButtonConfig::ServiceUrl { url, label } => Taste::ServiceUrl {
                        instance,
                        url: url.clone(),
                        label: label.clone(),
                    },
                    ButtonConfig::Empty => Taste::Leer { instance },
                }
            })
            .collect();

        while tasten.len() < plaetze {
            tasten.push(Taste::Leer { instance: 0 });
        }
        Self { tasten }
    }

    /// Draht-Darstellung fuer die ButtonTemplate-Nachricht
    pub fn nachricht(&self) -> ButtonTemplate {
        let buttons: Vec<ButtonDefinition> = self
            .tasten
            .iter()
            .map(|t| ButtonDefinition {
                instance: t.instance() as u8,
                button_type: t.button_type().as_u8(),
            })
            .collect();
        ButtonTemplate {
            offset: 0,
            total: buttons.len() as u32,
            buttons,
        }
    }

    /// Alle Leitungstasten als (Instanz, Name, Subscription)
    pub fn leitungen(&self) -> impl Iterator<Item = (u32, &LineName, Option<&String>)> {
        self.tasten.iter().filter_map(|t| match t {
            Taste::Leitung {
                instance,
                name,
                subscription,
                ..
            } => Some((*instance, name, subscription.as_ref())),
            _ => None,
        })
    }

    pub fn leitung(&self, instance: u32) -> Option<&LineName> {
        self.leitungen()
            .find(|(i, _, _)| *i == instance)
            .map(|(_, n, _)| n)
    }

    pub fn instance_von(&self, leitung: &LineName) -> Option<u32> {
        self.leitungen()
            .find(|(_, n, _)| *n == leitung)
            .map(|(i, _, _)| i)
    }

    pub fn taste(&self, instance: u32) -> Option<&Taste> {
        if instance == 0 {
            return None;
        }
        self.tasten.iter().find(|t| t.instance() == instance)
    }

    /// Kurzwahl-Taste nach Instanz
    pub fn kurzwahl(&self, instance: u32) -> Option<(&str, &str)> {
        match self.taste(instance) {
            Some(Taste::Kurzwahl { nummer, label, .. }) => Some((nummer, label)),
            _ => None,
        }
    }

    /// Alle Kurzwahl-Tasten (Instanz, Nummer, Label)
    pub fn kurzwahlen(&self) -> impl Iterator<Item = (u32, &str, &str)> {
        self.tasten.iter().filter_map(|t| match t {
            Taste::Kurzwahl {
                instance,
                nummer,
                label,
            } => Some((*instance, nummer.as_str(), label.as_str())),
            _ => None,
        })
    }

    /// Instanz der ersten Feature-Taste dieser Art
    pub fn feature_instance(&self, art: FeatureKind) -> Option<u32> {
        self.tasten.iter().find_map(|t| match t {
            Taste::Feature { instance, art: a, .. } if *a == art => Some(*instance),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leitung(name: &str) -> ButtonConfig {
        ButtonConfig::Line {
            name: LineName::new(name),
            label: None,
            subscription: None,
        }
    }

    #[test]
    fn leere_plaetze_werden_aufgefuellt() {
        let t = Template::bauen(modelle::TYP_7960, &[leitung("100")]);
        assert_eq!(t.tasten.len(), 6);
        let wire = t.nachricht();
        assert_eq!(wire.total, 6);
        assert_eq!(wire.buttons[0].instance, 1);
        assert_eq!(wire.buttons[0].button_type, ButtonType::Line.as_u8());
        assert!(wire.buttons[1..]
            .iter()
            .all(|b| b.button_type == ButtonType::Undefined.as_u8() && b.instance == 0));
    }

    #[test]
    fn instanzen_zaehlen_ueber_alle_tastenarten() {
        let t = Template::bauen(
            modelle::TYP_7960,
            &[
                leitung("100"),
                ButtonConfig::SpeedDial {
                    number: "200".into(),
                    label: "Chef".into(),
                },
                leitung("101"),
                ButtonConfig::Feature {
                    feature: FeatureKind::Dnd,
                    label: None,
                },
            ],
        );
        assert_eq!(t.instance_von(&LineName::new("101")), Some(3));
        assert_eq!(t.leitung(1), Some(&LineName::new("100")));
        assert_eq!(t.kurzwahl(2), Some(("200", "Chef")));
        assert_eq!(t.feature_instance(FeatureKind::Dnd), Some(4));
        assert!(t.kurzwahl(3).is_none());
        assert_eq!(t.nachricht().buttons[3].button_type, ButtonType::Dnd.as_u8());
    }

    #[test]
    fn ueberzaehlige_tasten_werden_abgeschnitten() {
        let t = Template::bauen(
            modelle::TYP_7940,
            &[leitung("1"), leitung("2"), leitung("3")],
        );
        assert_eq!(t.tasten.len(), 2);
        assert!(t.leitung(3).is_none());
    }
}
