//! Scan orchestration: identify the card, read its services, interpret them

use std::panic::{self, AssertUnwindSafe};

use chrono::{Local, NaiveDateTime};
use felica_cards::{identify, CardDefinition, ServiceRule};
use felica_common::{code_hex, codes};
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::interpret::{decode_anchor, FamilyDecoder, HistoryEntry};
use crate::protocol::{poll, CardSession, FelicaCard, TagInfo};

/// Where the scan's anchor date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    AttributeBlock,
    SessionStart,
}

/// Everything learned from one card
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub card: &'static CardDefinition,
    pub idm: [u8; 8],
    pub anchor: NaiveDateTime,
    pub anchor_source: AnchorSource,
    /// Balance of the first valid history block, across all services
    pub balance: Option<u32>,
    /// Newest first within each service, services in registry order
    pub entries: Vec<HistoryEntry>,
    /// Hex of every read command sent
    pub command_trace: Vec<String>,
}

/// Scan a polled card, anchoring to the current local time
pub fn scan_tag<S: CardSession + ?Sized>(
    session: &mut S,
    tag: &TagInfo,
    config: &ScanConfig,
) -> Result<ScanReport> {
    scan_tag_at(session, tag, config, Local::now().naive_local())
}

/// Scan a polled card with an explicit session start time
///
/// `started_at` is the anchor unless an attribute block provides one.
pub fn scan_tag_at<S: CardSession + ?Sized>(
    session: &mut S,
    tag: &TagInfo,
    config: &ScanConfig,
    started_at: NaiveDateTime,
) -> Result<ScanReport> {
    let card = identify(&tag.system_code).ok_or_else(|| ScanError::UnsupportedCard {
        system_code: code_hex(&tag.system_code),
    })?;
    info!(card = card.name, "Card identified");

    let mut reader = FelicaCard::new(session, tag.idm, config.inter_read_delay);

    let mut anchor: Option<NaiveDateTime> = None;
    for rule in card.rules {
        let ServiceRule::Attribute(attribute) = rule else {
            continue;
        };
        let blocks = reader.read_service(attribute.service_code, rule.block_count());
        let decoded = blocks
            .first()
            .and_then(|block| decode_anchor(attribute.fields, block));

        match decoded {
            Some(at) => {
                debug!(service = %code_hex(&attribute.service_code), anchor = %at, "Anchor read");
                anchor = anchor.or(Some(at));
            }
            None => {
                warn!(service = %code_hex(&attribute.service_code), "No usable attribute block");
            }
        }
    }

    let (anchor, anchor_source) = match anchor {
        Some(at) => (at, AnchorSource::AttributeBlock),
        None => (started_at, AnchorSource::SessionStart),
    };

    let decoder = FamilyDecoder::new(&card.family, config.station_layout);
    let mut balance: Option<u32> = None;
    let mut entries = Vec::new();

    for rule in card.rules {
        let ServiceRule::History(history) = rule else {
            continue;
        };
        let blocks = reader.read_service(history.service_code, history.block_count);
        let service = decoder.interpret(history, &blocks, anchor);
        debug!(
            service = %code_hex(&history.service_code),
            blocks = blocks.len(),
            entries = service.entries.len(),
            "Service interpreted"
        );

        balance = balance.or(service.balance);
        entries.extend(service.entries);
    }

    info!(
        card = card.name,
        balance = ?balance,
        entries = entries.len(),
        "Scan complete"
    );

    Ok(ScanReport {
        card,
        idm: tag.idm,
        anchor,
        anchor_source,
        balance,
        entries,
        command_trace: reader.into_trace(),
    })
}

/// Per-tag handler: scan, then close the session exactly once
///
/// A panic anywhere in the scan is caught and reported as
/// [`ScanError::Aborted`] instead of unwinding into the caller.
pub fn handle_tag<S: CardSession>(
    mut session: S,
    tag: &TagInfo,
    config: &ScanConfig,
) -> Result<ScanReport> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| scan_tag(&mut session, tag, config)));

    if let Err(err) = session.close() {
        warn!(error = %err, "Failed to close card session");
    }

    match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(message = %message, "Scan aborted");
            Err(ScanError::Aborted(message))
        }
    }
}

/// Poll for any card on `session` and scan it
pub fn scan_card<S: CardSession>(mut session: S, config: &ScanConfig) -> Result<ScanReport> {
    let tag = match poll(&mut session, codes::WILDCARD_SYSTEM_CODE) {
        Ok(tag) => tag,
        Err(err) => {
            if let Err(close_err) = session.close() {
                warn!(error = %close_err, "Failed to close card session");
            }
            return Err(err);
        }
    };

    handle_tag(session, &tag, config)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
