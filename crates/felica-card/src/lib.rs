//! FeliCa Card - Transit card reading and history decoding
//!
//! This crate talks to FeliCa cards through PC/SC readers, reads the
//! services registered for the card's family block by block, and turns the
//! blocks into a balance and a dated transaction history.

pub mod apdu;
pub mod command;
pub mod config;
pub mod error;
pub mod interpret;
pub mod protocol;
pub mod reader;
pub mod session;

pub use config::ScanConfig;
pub use error::{Result, ScanError, TransportError};
pub use interpret::{EventKind, FamilyDecoder, HistoryEntry, ServiceHistory};
pub use protocol::{poll, CardSession, FelicaCard, TagInfo};
pub use reader::{CardReader, PcscSession};
pub use session::{handle_tag, scan_card, scan_tag, scan_tag_at, AnchorSource, ScanReport};

/// Re-export commonly used types
pub use felica_cards::{CardDefinition, StationLayoutRevision};
pub use felica_common::RawBlock;
pub use pcsc::{Card, Context, Error as PcscError};
