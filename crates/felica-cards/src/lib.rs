//! FeliCa Cards - Registry of supported transit card families
//!
//! Each registered card is identified by the system code it answers polling
//! with, and describes which services to read and how their blocks are laid
//! out. Nothing here talks to a card.

pub mod rapica;

pub use rapica::{
    operator_info, operators, OperatorGroup, OperatorInfo, RapicaStatus, SettlementKind,
    StationFields, StationLayout, StationLayoutRevision,
};

/// Byte order of the packed 16-bit date in Suica-style history blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `byte4 << 8 | byte5`
    BigEndian,
    /// `byte5 << 8 | byte4`
    LittleEndian,
}

/// Explicit date fields stored at the start of an attribute block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFields {
    /// yy mm dd
    DateOnly,
    /// yy mm dd hh mi
    DateTime,
}

impl AttributeFields {
    /// Number of leading bytes the fields occupy
    pub fn byte_len(&self) -> usize {
        match self {
            AttributeFields::DateOnly => 3,
            AttributeFields::DateTime => 5,
        }
    }
}

/// Service holding the card's latest known timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRule {
    pub service_code: [u8; 2],
    pub fields: AttributeFields,
}

/// Service holding the transaction history, newest block first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRule {
    pub service_code: [u8; 2],
    pub block_count: u8,
    pub date_layout: DateLayout,
}

/// One service to read from a card, in registry order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRule {
    Attribute(AttributeRule),
    History(HistoryRule),
}

impl ServiceRule {
    /// Service code in wire byte order
    pub fn service_code(&self) -> [u8; 2] {
        match self {
            ServiceRule::Attribute(rule) => rule.service_code,
            ServiceRule::History(rule) => rule.service_code,
        }
    }

    /// Number of blocks to request
    pub fn block_count(&self) -> u8 {
        match self {
            ServiceRule::Attribute(_) => 1,
            ServiceRule::History(rule) => rule.block_count,
        }
    }
}

/// Classification parameters for Suica/PASMO-style history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuicaRules {
    pub status_offset: usize,
    /// Status byte marking a ferry or counter settlement
    pub ferry_settlement_status: u8,
}

/// Classification parameters for RAPICA-style history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RapicaRules {
    pub status_offset: usize,
    pub operator_offset: usize,
    pub statuses: &'static [(u8, RapicaStatus)],
}

impl RapicaRules {
    /// Look up a status byte in this family's status table
    pub fn status(&self, code: u8) -> Option<RapicaStatus> {
        self.statuses
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, status)| *status)
    }
}

/// Block layout family, fixed per registered card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFamily {
    Suica(SuicaRules),
    Rapica(RapicaRules),
}

/// A registered card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardDefinition {
    pub name: &'static str,
    pub system_code: [u8; 2],
    pub family: CardFamily,
    pub rules: &'static [ServiceRule],
}

/// Known card families, matched in order
pub mod cards {
    use super::*;

    /// Suica, PASMO and the other nationwide transit IC cards
    pub const SUICA: CardDefinition = CardDefinition {
        name: "Suica / PASMO",
        system_code: [0x00, 0x03],
        family: CardFamily::Suica(SuicaRules {
            status_offset: 12,
            ferry_settlement_status: 0x0D,
        }),
        rules: &[ServiceRule::History(HistoryRule {
            service_code: [0x0F, 0x09],
            block_count: 20,
            date_layout: DateLayout::BigEndian,
        })],
    };

    /// RapiCa (Kagoshima)
    pub const RAPICA: CardDefinition = CardDefinition {
        name: "RapiCa",
        system_code: [0x81, 0x94],
        family: CardFamily::Rapica(RapicaRules {
            status_offset: 12,
            operator_offset: 3,
            statuses: rapica::STATUS_CODES,
        }),
        rules: &[
            ServiceRule::Attribute(AttributeRule {
                service_code: [0x4B, 0x00],
                fields: AttributeFields::DateTime,
            }),
            ServiceRule::History(HistoryRule {
                service_code: [0x8F, 0x00],
                block_count: 10,
                date_layout: DateLayout::BigEndian,
            }),
        ],
    };

    /// Regional card using the Suica block layout with a byte-swapped date
    pub const REGIONAL_LE: CardDefinition = CardDefinition {
        name: "Regional IC",
        system_code: [0x80, 0xDE],
        family: CardFamily::Suica(SuicaRules {
            status_offset: 12,
            ferry_settlement_status: 0x0D,
        }),
        rules: &[
            ServiceRule::Attribute(AttributeRule {
                service_code: [0x0B, 0x01],
                fields: AttributeFields::DateOnly,
            }),
            ServiceRule::History(HistoryRule {
                service_code: [0x4F, 0x01],
                block_count: 10,
                date_layout: DateLayout::LittleEndian,
            }),
        ],
    };
}

/// All registered cards in match order
pub static REGISTRY: &[CardDefinition] = &[cards::SUICA, cards::RAPICA, cards::REGIONAL_LE];

/// Find the card definition for a polled system code
///
/// # Arguments
/// * `system_code` - System code reported by the card (2 bytes)
///
/// # Returns
/// * `Some(&CardDefinition)` - The first registered card with an identical code
/// * `None` - If the card family is not supported
pub fn identify(system_code: &[u8]) -> Option<&'static CardDefinition> {
    REGISTRY
        .iter()
        .find(|card| card.system_code.as_slice() == system_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_registered_cards() {
        assert_eq!(identify(&[0x00, 0x03]).map(|c| c.name), Some("Suica / PASMO"));
        assert_eq!(identify(&[0x81, 0x94]).map(|c| c.name), Some("RapiCa"));
        assert_eq!(identify(&[0x80, 0xDE]).map(|c| c.name), Some("Regional IC"));
    }

    #[test]
    fn test_identify_unregistered() {
        assert!(identify(&[0x00, 0x01]).is_none());
        assert!(identify(&[0x94, 0x81]).is_none());
        assert!(identify(&[0x81]).is_none());
    }

    #[test]
    fn test_system_codes_unique() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in &REGISTRY[i + 1..] {
                assert_ne!(a.system_code, b.system_code, "{} / {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_attribute_rules_come_first() {
        for card in REGISTRY {
            let first_history = card
                .rules
                .iter()
                .position(|r| matches!(r, ServiceRule::History(_)))
                .unwrap_or(card.rules.len());
            assert!(card.rules[first_history..]
                .iter()
                .all(|r| matches!(r, ServiceRule::History(_))));
        }
    }

    #[test]
    fn test_rule_accessors() {
        let rules = cards::RAPICA.rules;
        assert_eq!(rules[0].block_count(), 1);
        assert_eq!(rules[0].service_code(), [0x4B, 0x00]);
        assert_eq!(rules[1].block_count(), 10);
        assert_eq!(AttributeFields::DateTime.byte_len(), 5);
        assert_eq!(AttributeFields::DateOnly.byte_len(), 3);
    }

    #[test]
    fn test_rapica_status_lookup() {
        let CardFamily::Rapica(rules) = cards::RAPICA.family else {
            panic!("RapiCa must use the RAPICA family");
        };
        assert_eq!(rules.status(0x01), Some(RapicaStatus::Boarding));
        assert_eq!(rules.status(0x05), Some(RapicaStatus::DiscountedAlighting));
        assert_eq!(rules.status(0x7F), None);
    }
}
