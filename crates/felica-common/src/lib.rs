//! FeliCa Common - Shared data structures and parsers for FeliCa block reading

pub mod block;
pub mod frame;

pub use block::{FieldSpan, RawBlock, BLOCK_SIZE};
pub use frame::{parse_polling_response, parse_read_response, PollingResponse};

/// FeliCa command and response codes
pub mod codes {
    pub const POLLING: u8 = 0x00;
    pub const POLLING_RESPONSE: u8 = 0x01;
    pub const READ_WITHOUT_ENCRYPTION: u8 = 0x06;
    pub const READ_WITHOUT_ENCRYPTION_RESPONSE: u8 = 0x07;

    /// Block list element prefix: 2-byte element, access mode 0, service list order 0
    pub const BLOCK_LIST_ELEMENT: u8 = 0x80;

    /// Wildcard system code accepted by every card
    pub const WILDCARD_SYSTEM_CODE: [u8; 2] = [0xFF, 0xFF];
}

/// BER-TLV parser for PC/SC transparent exchange responses
///
/// Searches for a specific tag in TLV-encoded data and returns its value.
/// Handles both single-byte and two-byte tags (like 5F46), as well as extended
/// length encoding.
///
/// # Arguments
/// * `data` - The TLV-encoded data to search
/// * `tag` - The tag bytes to search for (1 or 2 bytes)
///
/// # Returns
/// * `Some(&[u8])` - The value bytes if tag is found
/// * `None` - If tag is not found or data is malformed
pub fn find_tag<'a>(data: &'a [u8], tag: &[u8]) -> Option<&'a [u8]> {
    let mut i = 0;
    while i < data.len() {
        let current_tag_len = if data[i] & 0x1F == 0x1F && i + 1 < data.len() {
            2
        } else {
            1
        };

        if i + current_tag_len > data.len() {
            break;
        }

        let current_tag = &data[i..i + current_tag_len];
        i += current_tag_len;

        if i >= data.len() {
            break;
        }

        let len = data[i] as usize;
        i += 1;

        let actual_len = if len & 0x80 != 0 {
            let num_len_bytes = len & 0x7F;
            if i + num_len_bytes > data.len() {
                break;
            }

            let mut actual = 0usize;
            for j in 0..num_len_bytes {
                actual = (actual << 8) | (data[i + j] as usize);
            }
            i += num_len_bytes;
            actual
        } else {
            len
        };

        if current_tag == tag {
            if i + actual_len <= data.len() {
                return Some(&data[i..i + actual_len]);
            }
            return None;
        }

        i += actual_len;
    }
    None
}

/// Format a 2-byte system or service code the way it is printed in logs (e.g. "8194")
pub fn code_hex(code: &[u8; 2]) -> String {
    hex::encode_upper(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_simple() {
        // Tag C0 (generic error status), length 3
        let data = &[0xC0, 0x03, 0x00, 0x90, 0x00];
        let result = find_tag(data, &[0xC0]);
        assert_eq!(result, Some(&[0x00, 0x90, 0x00][..]));
    }

    #[test]
    fn test_find_tag_two_byte() {
        // Timer data object 5F46, length 4
        let data = &[0x5F, 0x46, 0x04, 0xC0, 0xC6, 0x2D, 0x00];
        let result = find_tag(data, &[0x5F, 0x46]);
        assert_eq!(result, Some(&[0xC0, 0xC6, 0x2D, 0x00][..]));
    }

    #[test]
    fn test_find_tag_not_found() {
        let data = &[0xC0, 0x03, 0x00, 0x90, 0x00];
        assert_eq!(find_tag(data, &[0x97]), None);
    }

    #[test]
    fn test_find_tag_after_status_objects() {
        // Typical transparent exchange reply: status, then 97 with the card frame
        let data = &[
            0xC0, 0x03, 0x00, 0x90, 0x00, 0x92, 0x01, 0x00, 0x96, 0x02, 0x00, 0x00, 0x97, 0x03,
            0x03, 0x07, 0x01,
        ];
        assert_eq!(find_tag(data, &[0x97]), Some(&[0x03, 0x07, 0x01][..]));
    }

    #[test]
    fn test_find_tag_truncated_value() {
        let data = &[0x97, 0x05, 0x01, 0x02];
        assert_eq!(find_tag(data, &[0x97]), None);
    }

    #[test]
    fn test_code_hex() {
        assert_eq!(code_hex(&[0x81, 0x94]), "8194");
        assert_eq!(code_hex(&[0x00, 0x03]), "0003");
    }
}
