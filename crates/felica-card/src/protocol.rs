//! FeliCa protocol implementation

use std::thread;
use std::time::Duration;

use felica_common::{code_hex, parse_polling_response, parse_read_response, RawBlock};
use tracing::{debug, info};

use crate::command::{commands, request_codes};
use crate::error::{Result, ScanError, TransportError};

/// An open link to one card
///
/// Implemented by the PC/SC reader and by test doubles. A session is owned
/// by a single scan and closed when the scan ends.
pub trait CardSession {
    /// Send a FeliCa frame and return whatever the transport received
    fn transceive(&mut self, command: &[u8]) -> std::result::Result<Vec<u8>, TransportError>;

    /// Release the session. Calling it again must be harmless.
    fn close(&mut self) -> std::result::Result<(), TransportError>;
}

impl<S: CardSession + ?Sized> CardSession for &mut S {
    fn transceive(&mut self, command: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
        (**self).transceive(command)
    }

    fn close(&mut self) -> std::result::Result<(), TransportError> {
        (**self).close()
    }
}

/// A card found by polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub idm: [u8; 8],
    pub pmm: [u8; 8],
    pub system_code: [u8; 2],
}

/// Poll for a card answering `system_code`, asking for its system code
pub fn poll<S: CardSession + ?Sized>(session: &mut S, system_code: [u8; 2]) -> Result<TagInfo> {
    let command = commands::polling(system_code, request_codes::SYSTEM_CODE).build();
    debug!(command = %hex::encode_upper(&command), "Polling");

    let response = session.transceive(&command)?;
    let polled = parse_polling_response(&response).ok_or(ScanError::NoTag)?;

    let tag = TagInfo {
        idm: polled.idm,
        pmm: polled.pmm,
        system_code: polled.system_code.unwrap_or(system_code),
    };
    info!(
        idm = %hex::encode_upper(tag.idm),
        system_code = %code_hex(&tag.system_code),
        "Card polled"
    );
    Ok(tag)
}

/// Block reader for one polled card
pub struct FelicaCard<'a, S: CardSession + ?Sized> {
    session: &'a mut S,
    idm: [u8; 8],
    inter_read_delay: Duration,
    reads: usize,
    trace: Vec<String>,
}

impl<'a, S: CardSession + ?Sized> FelicaCard<'a, S> {
    /// Create a block reader addressing the card with `idm`
    pub fn new(session: &'a mut S, idm: [u8; 8], inter_read_delay: Duration) -> Self {
        Self {
            session,
            idm,
            inter_read_delay,
            reads: 0,
            trace: Vec::new(),
        }
    }

    /// Read a single block. `Ok(None)` means the card had no block to return.
    pub fn read_block(
        &mut self,
        service_code: [u8; 2],
        index: u8,
    ) -> std::result::Result<Option<RawBlock>, TransportError> {
        if self.reads > 0 && !self.inter_read_delay.is_zero() {
            thread::sleep(self.inter_read_delay);
        }
        self.reads += 1;

        let command = commands::read_without_encryption(self.idm, service_code, index).build();
        let command_hex = hex::encode_upper(&command);
        debug!(command = %command_hex, "Read Without Encryption");
        self.trace.push(command_hex);

        let response = self.session.transceive(&command)?;
        Ok(parse_read_response(&response, &self.idm).into_iter().next())
    }

    /// Read a service block by block, newest first.
    ///
    /// Stops at the first index that fails or comes back empty and keeps what
    /// was read so far; short histories end that way.
    pub fn read_service(&mut self, service_code: [u8; 2], block_count: u8) -> Vec<RawBlock> {
        let mut blocks = Vec::with_capacity(block_count as usize);

        for index in 0..block_count {
            match self.read_block(service_code, index) {
                Ok(Some(block)) => blocks.push(block),
                Ok(None) => {
                    debug!(service = %code_hex(&service_code), index, "No more blocks");
                    break;
                }
                Err(err) => {
                    info!(
                        service = %code_hex(&service_code),
                        index,
                        error = %err,
                        "Read stopped"
                    );
                    break;
                }
            }
        }

        debug!(service = %code_hex(&service_code), count = blocks.len(), "Service read");
        blocks
    }

    /// Hex of every command sent so far
    pub fn command_trace(&self) -> &[String] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<String> {
        self.trace
    }
}
