//! Response frame parsing
//!
//! Transports do not always hand back a clean FeliCa frame: some readers
//! prepend their own status bytes or wrap the frame in a data object. The
//! parsers here scan for the frame header instead of assuming it starts at
//! offset 0.

use tracing::{debug, warn};

use crate::block::{RawBlock, BLOCK_SIZE};
use crate::codes;

/// Length + code + IDm(8) + status1 + status2
const MIN_READ_RESPONSE_LEN: usize = 12;

/// Offsets relative to the start of a read response frame
const STATUS1_OFFSET: usize = 10;
const STATUS2_OFFSET: usize = 11;
const BLOCK_COUNT_OFFSET: usize = 12;
const BLOCK_DATA_OFFSET: usize = 13;

/// Polling response without / with the request data (system code)
const POLLING_RESPONSE_LEN: usize = 18;
const POLLING_RESPONSE_WITH_SYSTEM_CODE_LEN: usize = 20;

/// Extract the data blocks from a Read Without Encryption response.
///
/// Only the first two bytes of `idm` are matched against the frame. Returns
/// an empty list when no frame is found, when the card reports a non-zero
/// status, or when the buffer is too short. A trailing block cut short by the
/// end of the buffer is dropped.
pub fn parse_read_response(buffer: &[u8], idm: &[u8]) -> Vec<RawBlock> {
    if buffer.len() < MIN_READ_RESPONSE_LEN || idm.len() < 2 {
        debug!(len = buffer.len(), "Read response too short");
        return Vec::new();
    }

    let start = match find_read_header(buffer, [idm[0], idm[1]]) {
        Some(start) => start,
        None => {
            warn!(
                len = buffer.len(),
                data = %hex::encode_upper(buffer),
                "Read response header not found"
            );
            return Vec::new();
        }
    };

    let (status1, status2) = match (
        buffer.get(start + STATUS1_OFFSET),
        buffer.get(start + STATUS2_OFFSET),
    ) {
        (Some(&s1), Some(&s2)) => (s1, s2),
        _ => {
            debug!(len = buffer.len(), offset = start, "Read response ends before status");
            return Vec::new();
        }
    };

    if status1 != 0x00 {
        warn!(
            status1 = %format!("{:02X}", status1),
            status2 = %format!("{:02X}", status2),
            "Card reported read failure"
        );
        return Vec::new();
    }

    let count = match buffer.get(start + BLOCK_COUNT_OFFSET) {
        Some(&count) => count as usize,
        None => {
            debug!(len = buffer.len(), offset = start, "Read response has no block count");
            return Vec::new();
        }
    };

    let data_start = start + BLOCK_DATA_OFFSET;
    let blocks: Vec<RawBlock> = (0..count)
        .map(|n| data_start + n * BLOCK_SIZE)
        .take_while(|offset| offset + BLOCK_SIZE <= buffer.len())
        .filter_map(|offset| RawBlock::from_slice(&buffer[offset..offset + BLOCK_SIZE]))
        .collect();

    if blocks.len() < count {
        debug!(claimed = count, parsed = blocks.len(), "Dropped truncated blocks");
    }

    blocks
}

/// First offset whose frame carries the read response code and the IDm prefix
fn find_read_header(buffer: &[u8], idm_prefix: [u8; 2]) -> Option<usize> {
    buffer.windows(4).position(|w| {
        w[1] == codes::READ_WITHOUT_ENCRYPTION_RESPONSE
            && w[2] == idm_prefix[0]
            && w[3] == idm_prefix[1]
    })
}

/// Card identity returned by the Polling command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingResponse {
    pub idm: [u8; 8],
    pub pmm: [u8; 8],
    /// Present when polling used request code 0x01
    pub system_code: Option<[u8; 2]>,
}

/// Locate and decode a Polling response frame
pub fn parse_polling_response(buffer: &[u8]) -> Option<PollingResponse> {
    let start = (0..buffer.len().saturating_sub(1)).find(|&i| {
        let len = buffer[i] as usize;
        buffer[i + 1] == codes::POLLING_RESPONSE
            && (len == POLLING_RESPONSE_LEN || len == POLLING_RESPONSE_WITH_SYSTEM_CODE_LEN)
            && i + len <= buffer.len()
    });

    let start = match start {
        Some(start) => start,
        None => {
            debug!(data = %hex::encode_upper(buffer), "Polling response not found");
            return None;
        }
    };

    let frame = &buffer[start..start + buffer[start] as usize];
    let mut idm = [0u8; 8];
    let mut pmm = [0u8; 8];
    idm.copy_from_slice(&frame[2..10]);
    pmm.copy_from_slice(&frame[10..18]);
    let system_code = if frame.len() == POLLING_RESPONSE_WITH_SYSTEM_CODE_LEN {
        Some([frame[18], frame[19]])
    } else {
        None
    };

    Some(PollingResponse {
        idm,
        pmm,
        system_code,
    })
}
