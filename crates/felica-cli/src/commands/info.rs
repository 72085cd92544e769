use felica_card::protocol::{poll, CardSession};
use felica_card::ScanConfig;
use felica_cards::{identify, ServiceRule};
use felica_common::{code_hex, codes};
use tracing::warn;

use crate::formatters::FormatMode;

use super::open_session;

pub fn cmd_info(reader_name: Option<&str>, config: &ScanConfig, format_mode: FormatMode) {
    let mut session = match open_session(reader_name, config) {
        Some(session) => session,
        None => return,
    };

    let polled = poll(&mut session, codes::WILDCARD_SYSTEM_CODE);
    if let Err(err) = session.close() {
        warn!(error = %err, "Failed to close card session");
    }

    let tag = match polled {
        Ok(tag) => tag,
        Err(err) => {
            eprintln!("Failed to poll card: {}", err);
            return;
        }
    };

    println!("=== Card Identity ===\n");
    println!("  IDm: {}", hex::encode_upper(tag.idm));
    println!("  PMm: {}", hex::encode_upper(tag.pmm));
    println!("  System Code: {}", code_hex(&tag.system_code));

    if format_mode == FormatMode::Human {
        // Manufacturer code is the first two IDm bytes
        println!("  Manufacturer Code: {}", hex::encode_upper(&tag.idm[..2]));
        println!("  IC Type (PMm byte 1): {:02X}", tag.pmm[1]);
    }
    println!();

    match identify(&tag.system_code) {
        Some(card) => {
            println!("Registered as: {}", card.name);
            for rule in card.rules {
                let kind = match rule {
                    ServiceRule::Attribute(_) => "attribute",
                    ServiceRule::History(_) => "history",
                };
                println!(
                    "  {} service {} ({} block{})",
                    kind,
                    code_hex(&rule.service_code()),
                    rule.block_count(),
                    if rule.block_count() == 1 { "" } else { "s" }
                );
            }
        }
        None => println!("Not a registered card family"),
    }
}
