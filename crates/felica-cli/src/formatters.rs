//! Field formatters for human-readable output

use clap::ValueEnum;
use felica_card::HistoryEntry;
use felica_card::interpret::read_balance;
use felica_common::RawBlock;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatMode {
    /// Raw hex output
    Raw,
    /// Human-readable formatted output
    Human,
}

impl FormatMode {
    pub fn description(&self) -> &'static str {
        match self {
            FormatMode::Raw => "Raw",
            FormatMode::Human => "Human-Readable",
        }
    }
}

/// Yen amount with thousands separators, e.g. `¥12,345`
pub fn format_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if amount < 0 {
        format!("-¥{}", grouped)
    } else {
        format!("¥{}", grouped)
    }
}

/// Signed change, `+` for charges
pub fn format_delta(delta: i32) -> String {
    if delta > 0 {
        format!("+{}", format_yen(delta as i64))
    } else {
        format_yen(delta as i64)
    }
}

pub fn format_balance(balance: Option<u32>) -> String {
    match balance {
        Some(balance) => format_yen(balance as i64),
        None => "unknown".to_string(),
    }
}

/// Line and station codes of an entry, empty when it has none
fn format_stations(entry: &HistoryEntry) -> String {
    let mut parts = Vec::new();
    if let Some(line) = entry.line_code {
        parts.push(format!("line {:X}", line));
    }
    if let Some(station) = entry.boarding_station {
        parts.push(format!("from {:X}", station));
    }
    if let Some(station) = entry.alighting_station {
        parts.push(format!("at {:X}", station));
    }
    parts.join(" ")
}

/// One history line
pub fn format_entry(entry: &HistoryEntry, mode: FormatMode) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M");

    if mode == FormatMode::Raw {
        return format!(
            "{}  {:>6}  {:>+6}  {}",
            timestamp,
            entry.balance_after,
            entry.amount_delta,
            entry.raw_block.to_hex()
        );
    }

    let line = format!(
        "{}  {:<26} {:>9}  balance {:>8}",
        timestamp,
        entry.kind.to_string(),
        format_delta(entry.amount_delta),
        format_yen(entry.balance_after as i64)
    );
    let stations = format_stations(entry);
    if stations.is_empty() {
        line
    } else {
        format!("{}  {}", line, stations)
    }
}

/// One dumped block
pub fn format_block(index: usize, block: &RawBlock, mode: FormatMode) -> String {
    let bytes = block.as_bytes();
    if mode == FormatMode::Raw {
        return format!("  [{:02}] {}", index, block.to_hex());
    }

    let grouped: Vec<String> = bytes
        .chunks(4)
        .map(hex::encode_upper)
        .collect();
    format!(
        "  [{:02}] {}  balance {}",
        index,
        grouped.join(" "),
        format_balance(read_balance(block))
    )
}
