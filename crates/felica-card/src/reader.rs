//! PC/SC card reader management

use std::ffi::{CStr, CString};
use std::time::Duration;

use felica_common::find_tag;
use pcsc::{Card, Context, Protocols, Scope, ShareMode};
use tracing::{debug, warn};

use crate::apdu::{commands, tags, timeout_hex, ApduCommand};
use crate::error::TransportError;
use crate::protocol::CardSession;

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new() -> Result<Self, pcsc::Error> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<String>, pcsc::Error> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        Ok(readers
            .map(|r| r.to_str().unwrap_or("Unknown").to_string())
            .collect())
    }

    /// Connect to the first available reader
    pub fn connect_first(&self) -> Result<(Card, String), pcsc::Error> {
        let mut readers_buf = [0; 2048];
        let mut readers = self.context.list_readers(&mut readers_buf)?;

        if let Some(reader) = readers.next() {
            let reader_name = reader.to_str().unwrap_or("Unknown").to_string();
            let card = self.context.connect(reader, ShareMode::Shared, Protocols::ANY)?;
            Ok((card, reader_name))
        } else {
            Err(pcsc::Error::NoReadersAvailable)
        }
    }

    /// Connect to a specific reader by name (CStr)
    pub fn connect(&self, reader_name: &CStr) -> Result<Card, pcsc::Error> {
        self.context
            .connect(reader_name, ShareMode::Shared, Protocols::ANY)
    }

    /// Connect to a reader given by its display name
    pub fn connect_named(&self, reader_name: &str) -> Result<Card, pcsc::Error> {
        let name = CString::new(reader_name).map_err(|_| pcsc::Error::UnknownReader)?;
        self.connect(&name)
    }
}

/// Transparent exchange session on a connected card
///
/// Starting the session switches the reader into raw FeliCa frame mode;
/// closing it, or dropping it, ends the session again.
pub struct PcscSession {
    card: Card,
    timeout: Duration,
    open: bool,
}

impl PcscSession {
    /// Open a transparent session and switch it to FeliCa
    pub fn start(card: Card, timeout: Duration) -> Result<Self, TransportError> {
        let mut session = Self {
            card,
            timeout,
            open: true,
        };

        session.control(commands::start_session())?;
        session.control(commands::switch_to_felica())?;
        debug!(timeout = %timeout_hex(timeout), "Transparent session started");

        Ok(session)
    }

    fn control(&mut self, command: ApduCommand) -> Result<Vec<u8>, TransportError> {
        let response = command.send(&self.card)?;
        if !response.is_success() {
            debug!(status = %response.status_string(), "Reader rejected command");
            return Err(TransportError::Status {
                sw1: response.sw1,
                sw2: response.sw2,
            });
        }

        // C0: error status, SW1, SW2
        if let Some(status) = find_tag(&response.data, &tags::STATUS) {
            if status.first().is_some_and(|&code| code != 0x00) {
                return Err(TransportError::Exchange {
                    status: hex::encode_upper(status),
                });
            }
        }

        Ok(response.data)
    }
}

impl CardSession for PcscSession {
    fn transceive(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::SessionClosed);
        }

        let data = self.control(commands::transceive(command, self.timeout))?;
        match find_tag(&data, &tags::RESPONSE) {
            Some(frame) => Ok(frame.to_vec()),
            None => Ok(data),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        self.control(commands::end_session())?;
        debug!("Transparent session ended");
        Ok(())
    }
}

impl Drop for PcscSession {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to end transparent session");
        }
    }
}
