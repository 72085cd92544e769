use felica_card::{scan_card, AnchorSource, ScanConfig, ScanReport};
use felica_common::code_hex;

use crate::formatters::{format_balance, format_entry, FormatMode};

use super::open_session;

pub fn cmd_history(reader_name: Option<&str>, config: &ScanConfig, format_mode: FormatMode) {
    println!("FeliCa History Reader - {} Mode\n", format_mode.description());

    let session = match open_session(reader_name, config) {
        Some(session) => session,
        None => return,
    };

    match scan_card(session, config) {
        Ok(report) => print_report(&report, format_mode),
        Err(err) => eprintln!("Failed to read card: {}", err),
    }
}

/// Print a scan the same way `history` and `watch` do
pub(crate) fn print_report(report: &ScanReport, format_mode: FormatMode) {
    println!("=== {} ===\n", report.card.name);
    println!("  IDm: {}", hex::encode_upper(report.idm));
    println!("  System Code: {}", code_hex(&report.card.system_code));

    let anchor_source = match report.anchor_source {
        AnchorSource::AttributeBlock => "card",
        AnchorSource::SessionStart => "session start",
    };
    println!(
        "  Anchor: {} (from {})",
        report.anchor.format("%Y-%m-%d %H:%M"),
        anchor_source
    );
    println!("  Balance: {}\n", format_balance(report.balance));

    if report.entries.is_empty() {
        println!("No history entries\n");
    } else {
        println!("History ({} entries, newest first):\n", report.entries.len());
        for entry in &report.entries {
            println!("  {}", format_entry(entry, format_mode));
        }
        println!();
    }

    if format_mode == FormatMode::Raw {
        println!("Commands sent ({}):", report.command_trace.len());
        for command in &report.command_trace {
            println!("  {}", command);
        }
        println!();
    }
}
