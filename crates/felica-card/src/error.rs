//! Error types for card sessions and scans

use thiserror::Error;

/// Failure to exchange a frame with the card
#[derive(Debug, Error)]
pub enum TransportError {
    /// The PC/SC layer rejected the exchange
    #[error("PC/SC error: {0}")]
    Pcsc(#[source] pcsc::Error),

    /// The reader answered the pseudo-APDU with a non-9000 status word
    #[error("Reader returned status {sw1:02X}{sw2:02X}")]
    Status { sw1: u8, sw2: u8 },

    /// The reader reported a failed exchange (no reply, timeout, CRC error)
    #[error("Card exchange failed: {status}")]
    Exchange { status: String },

    /// The session was closed, or the card left the field
    #[error("Card session closed")]
    SessionClosed,
}

impl From<pcsc::Error> for TransportError {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::RemovedCard | pcsc::Error::ResetCard | pcsc::Error::NoSmartcard => {
                TransportError::SessionClosed
            }
            other => TransportError::Pcsc(other),
        }
    }
}

/// Failure of a whole scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// The card's system code is not in the registry
    #[error("Unsupported card (system code {system_code})")]
    UnsupportedCard { system_code: String },

    /// Nothing answered polling
    #[error("No FeliCa card answered polling")]
    NoTag,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The scan stopped unexpectedly; no partial result is available
    #[error("Scan aborted: {0}")]
    Aborted(String),
}

/// A convenience `Result` type alias using the crate's `ScanError` type.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_card_maps_to_closed_session() {
        let err: TransportError = pcsc::Error::RemovedCard.into();
        assert!(matches!(err, TransportError::SessionClosed));

        let err: TransportError = pcsc::Error::NoReadersAvailable.into();
        assert!(matches!(err, TransportError::Pcsc(_)));
    }

    #[test]
    fn test_messages() {
        let err = ScanError::UnsupportedCard {
            system_code: "0001".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported card (system code 0001)");
        assert_eq!(
            TransportError::Status { sw1: 0x6A, sw2: 0x81 }.to_string(),
            "Reader returned status 6A81"
        );
    }
}
