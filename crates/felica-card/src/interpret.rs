//! History record interpretation
//!
//! Turns the raw blocks of one history service into dated, labeled entries.
//! Blocks arrive newest first; each entry's amount is the difference between
//! its balance and the balance of the next older block, so the oldest block
//! only ever serves as the base of that difference.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use felica_cards::{
    operator_info, AttributeFields, CardFamily, DateLayout, HistoryRule, OperatorInfo,
    RapicaRules, RapicaStatus, SettlementKind, StationLayout, StationLayoutRevision, SuicaRules,
};
use felica_common::RawBlock;
use tracing::debug;

/// Balance after the transaction, big-endian
pub const BALANCE_OFFSET: usize = 14;

/// Balances at or above this are treated as corrupt blocks
pub const BALANCE_LIMIT: u32 = 200_000;

/// Packed Suica-style date
const PACKED_DATE_OFFSET: usize = 4;

/// What a history record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Charge,
    Boarding,
    Alighting,
    IssuedOrCharged,
    FareSettlement(Option<SettlementKind>),
    DiscountedAlighting,
    Recorded,
    FarePayment,
    FerrySettlement,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Charge => f.write_str("charge"),
            EventKind::Boarding => f.write_str("boarding"),
            EventKind::Alighting => f.write_str("alighting"),
            EventKind::IssuedOrCharged => f.write_str("issued/charged"),
            EventKind::FareSettlement(Some(kind)) => write!(f, "fare settlement ({})", kind),
            EventKind::FareSettlement(None) => f.write_str("fare settlement"),
            EventKind::DiscountedAlighting => f.write_str("discounted alighting"),
            EventKind::Recorded => f.write_str("recorded"),
            EventKind::FarePayment => f.write_str("fare payment"),
            EventKind::FerrySettlement => f.write_str("ferry/counter settlement"),
        }
    }
}

/// One decoded history record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub balance_after: u32,
    pub amount_delta: i32,
    pub kind: EventKind,
    pub line_code: Option<u32>,
    pub boarding_station: Option<u32>,
    pub alighting_station: Option<u32>,
    pub raw_block: RawBlock,
}

/// Entries decoded from one service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceHistory {
    /// Balance of the newest valid block
    pub balance: Option<u32>,
    /// Newest first
    pub entries: Vec<HistoryEntry>,
}

/// Balance stored in a history block, `None` if out of range
pub fn read_balance(block: &RawBlock) -> Option<u32> {
    let balance = block.be_u16(BALANCE_OFFSET) as u32;
    (balance < BALANCE_LIMIT).then_some(balance)
}

/// Decode the explicit timestamp at the start of an attribute block
///
/// Fields are `yy mm dd` or `yy mm dd hh mi`, years counted from 2000.
pub fn decode_anchor(fields: AttributeFields, block: &RawBlock) -> Option<NaiveDateTime> {
    let bytes = &block.as_bytes()[..fields.byte_len()];
    let (year, month, day) = (bytes[0] as i32, bytes[1] as u32, bytes[2] as u32);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let (hour, minute) = match fields {
        AttributeFields::DateOnly => (0, 0),
        AttributeFields::DateTime => (bytes[3] as u32, bytes[4] as u32),
    };

    NaiveDate::from_ymd_opt(2000 + year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Decode a packed 16-bit date (7-bit year from 2000, 4-bit month, 5-bit day)
pub fn decode_packed_date(block: &RawBlock, layout: DateLayout) -> Option<NaiveDateTime> {
    let packed = match layout {
        DateLayout::BigEndian => block.be_u16(PACKED_DATE_OFFSET),
        DateLayout::LittleEndian => block.le_u16(PACKED_DATE_OFFSET),
    };

    let year = 2000 + ((packed >> 9) & 0x7F) as i32;
    let month = ((packed >> 5) & 0x0F) as u32;
    let day = (packed & 0x1F) as u32;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Decode a RAPICA timestamp, taking the year from `anchor`
///
/// Blocks store `month*100 + day` and `hour*100 + minute` in 12 bits each.
/// A date after the anchor's month and day must be from the year before.
pub fn decode_rapica_timestamp(block: &RawBlock, anchor: NaiveDateTime) -> Option<NaiveDateTime> {
    let b = block.as_bytes();
    let month_day = ((b[0] as u32) << 4) | ((b[1] as u32) >> 4);
    let hour_minute = (((b[1] & 0x0F) as u32) << 8) | b[2] as u32;

    let (month, day) = (month_day / 100, month_day % 100);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let year = if month > anchor.month() || (month == anchor.month() && day > anchor.day()) {
        anchor.year() - 1
    } else {
        anchor.year()
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    date.and_hms_opt(hour_minute / 100, hour_minute % 100, 0)
        .or_else(|| date.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Default)]
struct Stations {
    line: Option<u32>,
    boarding: Option<u32>,
    alighting: Option<u32>,
}

/// Per-family decoding, chosen once per card
#[derive(Debug, Clone, Copy)]
pub enum FamilyDecoder<'a> {
    Suica(&'a SuicaRules),
    Rapica {
        rules: &'a RapicaRules,
        layout: &'static StationLayout,
    },
}

impl<'a> FamilyDecoder<'a> {
    pub fn new(family: &'a CardFamily, station_layout: StationLayoutRevision) -> Self {
        match family {
            CardFamily::Suica(rules) => FamilyDecoder::Suica(rules),
            CardFamily::Rapica(rules) => FamilyDecoder::Rapica {
                rules,
                layout: station_layout.layout(),
            },
        }
    }

    /// Interpret the blocks of one history service, newest first
    pub fn interpret(
        &self,
        rule: &HistoryRule,
        blocks: &[RawBlock],
        anchor: NaiveDateTime,
    ) -> ServiceHistory {
        let valid: Vec<(RawBlock, u32)> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match read_balance(block) {
                Some(balance) => Some((*block, balance)),
                None => {
                    debug!(index, block = %block.to_hex(), "Discarding block with invalid balance");
                    None
                }
            })
            .collect();

        let entries = valid
            .windows(2)
            .map(|pair| {
                let (block, balance_after) = pair[0];
                let older_balance = pair[1].1;
                let delta = balance_after as i32 - older_balance as i32;
                self.entry(rule, block, balance_after, delta, anchor)
            })
            .collect();

        ServiceHistory {
            balance: valid.first().map(|(_, balance)| *balance),
            entries,
        }
    }

    fn entry(
        &self,
        rule: &HistoryRule,
        block: RawBlock,
        balance_after: u32,
        delta: i32,
        anchor: NaiveDateTime,
    ) -> HistoryEntry {
        let (timestamp, kind, stations) = match *self {
            FamilyDecoder::Suica(rules) => {
                let timestamp = decode_packed_date(&block, rule.date_layout).unwrap_or(anchor);
                (timestamp, classify_suica(rules, &block, delta), Stations::default())
            }
            FamilyDecoder::Rapica { rules, layout } => {
                let operator = operator_info(block.byte(rules.operator_offset));
                let timestamp = decode_rapica_timestamp(&block, anchor).unwrap_or(anchor);
                let kind = classify_rapica(rules, &operator, &block, delta);
                (timestamp, kind, rapica_stations(layout, &operator, &block, kind, delta))
            }
        };

        HistoryEntry {
            timestamp,
            balance_after,
            amount_delta: delta,
            kind,
            line_code: stations.line,
            boarding_station: stations.boarding,
            alighting_station: stations.alighting,
            raw_block: block,
        }
    }
}

fn classify_suica(rules: &SuicaRules, block: &RawBlock, delta: i32) -> EventKind {
    if delta > 0 {
        EventKind::Charge
    } else if delta == 0 {
        EventKind::Boarding
    } else if block.byte(rules.status_offset) == rules.ferry_settlement_status {
        EventKind::FerrySettlement
    } else {
        EventKind::FarePayment
    }
}

fn classify_rapica(
    rules: &RapicaRules,
    operator: &OperatorInfo,
    block: &RawBlock,
    delta: i32,
) -> EventKind {
    if delta > 0 {
        return EventKind::Charge;
    }

    match rules.status(block.byte(rules.status_offset)) {
        Some(RapicaStatus::Boarding) => EventKind::Boarding,
        Some(RapicaStatus::Alighting) => EventKind::Alighting,
        Some(RapicaStatus::IssuedOrCharged) => EventKind::IssuedOrCharged,
        Some(RapicaStatus::FareSettlement) => EventKind::FareSettlement(operator.settlement),
        Some(RapicaStatus::DiscountedAlighting) => EventKind::DiscountedAlighting,
        None if delta == 0 => EventKind::Recorded,
        None => EventKind::FarePayment,
    }
}

fn rapica_stations(
    layout: &StationLayout,
    operator: &OperatorInfo,
    block: &RawBlock,
    kind: EventKind,
    delta: i32,
) -> Stations {
    let fields = layout.fields(operator.group);
    let stop = block.field(fields.stop);

    let boarding = (kind == EventKind::Boarding).then_some(stop);
    let alighting = (matches!(
        kind,
        EventKind::Alighting | EventKind::DiscountedAlighting | EventKind::FareSettlement(_)
    ) || delta < 0)
        .then_some(stop);
    let line = (boarding.is_some() || alighting.is_some()).then(|| block.field(fields.route));

    Stations {
        line,
        boarding,
        alighting,
    }
}
