use felica_card::protocol::{poll, CardSession, FelicaCard};
use felica_card::ScanConfig;
use felica_cards::{identify, ServiceRule};
use felica_common::{code_hex, codes};
use tracing::warn;

use crate::formatters::{format_block, FormatMode};

use super::open_session;

/// Parse a service code given as four hex digits in wire order, e.g. `8F00`
pub(crate) fn parse_service_code(text: &str) -> Result<[u8; 2], String> {
    let bytes = hex::decode(text.trim()).map_err(|err| format!("invalid service code: {}", err))?;
    <[u8; 2]>::try_from(bytes.as_slice())
        .map_err(|_| format!("service code must be 2 bytes, got {}", bytes.len()))
}

pub fn cmd_dump(
    reader_name: Option<&str>,
    config: &ScanConfig,
    format_mode: FormatMode,
    service: Option<[u8; 2]>,
    blocks: u8,
) {
    println!("FeliCa Block Dump\n");

    let mut session = match open_session(reader_name, config) {
        Some(session) => session,
        None => return,
    };

    let tag = match poll(&mut session, codes::WILDCARD_SYSTEM_CODE) {
        Ok(tag) => tag,
        Err(err) => {
            eprintln!("Failed to poll card: {}", err);
            return;
        }
    };

    println!("IDm: {}", hex::encode_upper(tag.idm));
    println!("System Code: {}\n", code_hex(&tag.system_code));

    let services: Vec<(String, [u8; 2], u8)> = match service {
        Some(code) => vec![("Requested".to_string(), code, blocks)],
        None => match identify(&tag.system_code) {
            Some(card) => {
                println!("Card: {}\n", card.name);
                card.rules
                    .iter()
                    .map(|rule| {
                        let label = match rule {
                            ServiceRule::Attribute(_) => "Attribute",
                            ServiceRule::History(_) => "History",
                        };
                        (label.to_string(), rule.service_code(), rule.block_count())
                    })
                    .collect()
            }
            None => {
                eprintln!("Card is not registered; pass --service to dump a specific service");
                return;
            }
        },
    };

    {
        let mut card = FelicaCard::new(&mut session, tag.idm, config.inter_read_delay);
        for (label, code, count) in &services {
            println!("=== {} service {} ===\n", label, code_hex(code));
            let read = card.read_service(*code, *count);
            if read.is_empty() {
                println!("  (no blocks)");
            }
            for (index, block) in read.iter().enumerate() {
                println!("{}", format_block(index, block, format_mode));
            }
            println!();
        }
    }

    if let Err(err) = session.close() {
        warn!(error = %err, "Failed to close card session");
    }

    println!("=== Dump Complete ===");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_code() {
        assert_eq!(parse_service_code("8F00"), Ok([0x8F, 0x00]));
        assert_eq!(parse_service_code("0f09"), Ok([0x0F, 0x09]));
        assert!(parse_service_code("8F").is_err());
        assert!(parse_service_code("8F0011").is_err());
        assert!(parse_service_code("XYZW").is_err());
    }
}
