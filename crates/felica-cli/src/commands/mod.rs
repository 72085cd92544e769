pub mod cards;
pub mod dump;
pub mod history;
pub mod info;
pub mod watch;

use felica_card::{CardReader, PcscSession, ScanConfig};

/// Connect to the requested reader (or the first one) and open a FeliCa session
///
/// Prints the failure and returns `None` when no session could be opened.
pub(crate) fn open_session(reader_name: Option<&str>, config: &ScanConfig) -> Option<PcscSession> {
    let reader = match CardReader::new() {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to establish PC/SC context: {}", err);
            return None;
        }
    };

    let connected = match reader_name {
        Some(name) => reader.connect_named(name).map(|card| (card, name.to_string())),
        None => reader.connect_first(),
    };

    let (card, reader_name) = match connected {
        Ok((c, name)) => (c, name),
        Err(err) => {
            eprintln!("Failed to connect to card: {}", err);
            eprintln!("Please ensure a card is present on the reader");
            return None;
        }
    };

    println!("Reader: {}", reader_name);

    match PcscSession::start(card, config.transceive_timeout) {
        Ok(session) => {
            println!("Card connected successfully\n");
            Some(session)
        }
        Err(err) => {
            eprintln!("Failed to start FeliCa session: {}", err);
            eprintln!("The reader may not support transparent exchange");
            None
        }
    }
}
