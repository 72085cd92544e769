//! Hardware-dependent integration tests
//!
//! These tests require a PC/SC reader with FeliCa support.
//! They are ignored by default and must be explicitly run with:
//!
//!     cargo test --package felica-card --test hardware_integration -- --ignored
//!
//! Or to run all tests including hardware tests:
//!
//!     cargo test --package felica-card --test hardware_integration -- --include-ignored

use felica_card::command::{commands, request_codes};
use felica_card::protocol::{poll, CardSession};
use felica_card::reader::{CardReader, PcscSession};
use felica_card::{scan_card, ScanConfig, ScanError};
use felica_common::codes;

/// Test that we can connect to a card reader
///
/// **Requires**: Card reader connected (card not required)
#[test]
#[ignore = "requires hardware: card reader"]
fn test_connect_to_reader() {
    let reader = CardReader::new().expect("Failed to establish PC/SC context");
    let readers = reader.list_readers().expect("Failed to list readers");
    assert!(!readers.is_empty(), "No card reader found. Is a reader connected?");
}

/// Test opening a transparent session and ending it again
///
/// **Requires**: Card reader with a FeliCa card on it
#[test]
#[ignore = "requires hardware: FeliCa card on reader"]
fn test_transparent_session() {
    let reader = CardReader::new().expect("Failed to connect to reader");
    let (card, reader_name) = reader.connect_first().expect("Failed to connect to card");
    println!("Connected to reader: {}", reader_name);

    let timeout = ScanConfig::default().transceive_timeout;
    let mut session = PcscSession::start(card, timeout).expect("Failed to start session");
    session.close().expect("Failed to end session");
    session.close().expect("Second close must be harmless");
}

/// Test polling with the wildcard system code
///
/// **Requires**: Any FeliCa card on the reader
#[test]
#[ignore = "requires hardware: FeliCa card on reader"]
fn test_poll_wildcard() {
    let reader = CardReader::new().expect("Failed to connect to reader");
    let (card, _reader_name) = reader.connect_first().expect("Failed to connect to card");
    let timeout = ScanConfig::default().transceive_timeout;
    let mut session = PcscSession::start(card, timeout).expect("Failed to start session");

    let command =
        commands::polling(codes::WILDCARD_SYSTEM_CODE, request_codes::SYSTEM_CODE).build();
    let response = session.transceive(&command).expect("Polling failed");
    println!("Polling response: {}", hex::encode_upper(&response));

    let tag = poll(&mut session, codes::WILDCARD_SYSTEM_CODE).expect("No card answered polling");
    println!(
        "IDm {} system code {}",
        hex::encode_upper(tag.idm),
        hex::encode_upper(tag.system_code)
    );
}

/// Full end-to-end test: poll, read and decode the history
///
/// **Requires**: A registered transit card (Suica/PASMO, RapiCa, ...)
#[test]
#[ignore = "requires hardware: registered transit card"]
fn test_full_history_scan() {
    let reader = CardReader::new().expect("Failed to connect to reader");
    let (card, _reader_name) = reader.connect_first().expect("Failed to connect to card");
    let config = ScanConfig::default();
    let session =
        PcscSession::start(card, config.transceive_timeout).expect("Failed to start session");

    match scan_card(session, &config) {
        Ok(report) => {
            println!("Card: {}", report.card.name);
            println!("Balance: {:?}", report.balance);
            for entry in &report.entries {
                println!(
                    "{} {:>7} {:>+7} {}",
                    entry.timestamp, entry.balance_after, entry.amount_delta, entry.kind
                );
                assert!(entry.balance_after < 200_000);
            }
            assert!(!report.command_trace.is_empty());
        }
        Err(ScanError::UnsupportedCard { system_code }) => {
            panic!("Card with system code {} is not registered", system_code);
        }
        Err(err) => panic!("Scan failed: {}", err),
    }
}
