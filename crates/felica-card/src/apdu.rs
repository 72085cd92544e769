//! PC/SC pseudo-APDUs for transparent exchange with contactless cards
//!
//! FeliCa frames are not APDUs, so they are tunnelled through the reader with
//! the transparent session commands of PC/SC Part 3.

use std::time::Duration;

use pcsc::{Card, MAX_BUFFER_SIZE};

/// APDU response containing data and status word
#[derive(Debug, Clone)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl ApduResponse {
    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Get status word as hex string (e.g., "9000")
    pub fn status_string(&self) -> String {
        format!("{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Send an APDU command to the reader and return the response
pub fn send_apdu(card: &Card, apdu: &[u8]) -> Result<ApduResponse, pcsc::Error> {
    let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
    let rapdu = card.transmit(apdu, &mut rapdu_buf)?;

    if rapdu.len() < 2 {
        return Err(pcsc::Error::InsufficientBuffer);
    }

    let sw1 = rapdu[rapdu.len() - 2];
    let sw2 = rapdu[rapdu.len() - 1];
    let data = rapdu[..rapdu.len() - 2].to_vec();

    Ok(ApduResponse { data, sw1, sw2 })
}

/// APDU command builder
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Build the APDU command bytes
    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }

    /// Send this command to the reader
    pub fn send(&self, card: &Card) -> Result<ApduResponse, pcsc::Error> {
        send_apdu(card, &self.build())
    }
}

/// Data objects used inside transparent exchange commands and replies
pub mod tags {
    pub const START_SESSION: u8 = 0x81;
    pub const END_SESSION: u8 = 0x82;
    pub const SWITCH_PROTOCOL: u8 = 0x8F;
    pub const TRANSCEIVE: u8 = 0x95;
    pub const TIMER: [u8; 2] = [0x5F, 0x46];

    /// Generic error status in a reply: error byte, SW1, SW2
    pub const STATUS: [u8; 1] = [0xC0];
    /// Card response carried in a reply
    pub const RESPONSE: [u8; 1] = [0x97];
}

/// Transparent session commands
pub mod commands {
    use std::time::Duration;

    use super::{tags, ApduCommand};

    const CLA: u8 = 0xFF;
    const INS_TRANSPARENT: u8 = 0xC2;

    const P2_MANAGE_SESSION: u8 = 0x00;
    const P2_TRANSPARENT_EXCHANGE: u8 = 0x01;
    const P2_SWITCH_PROTOCOL: u8 = 0x02;

    /// Switch protocol data: FeliCa, no layer separation (raw frames)
    const FELICA_LAYER: [u8; 2] = [0x03, 0x00];

    /// Open a transparent session
    pub fn start_session() -> ApduCommand {
        ApduCommand::new(CLA, INS_TRANSPARENT, 0x00, P2_MANAGE_SESSION)
            .data(vec![tags::START_SESSION, 0x00])
            .le(0x00)
    }

    /// Close a transparent session
    pub fn end_session() -> ApduCommand {
        ApduCommand::new(CLA, INS_TRANSPARENT, 0x00, P2_MANAGE_SESSION)
            .data(vec![tags::END_SESSION, 0x00])
            .le(0x00)
    }

    /// Put the reader into FeliCa frame mode
    pub fn switch_to_felica() -> ApduCommand {
        ApduCommand::new(CLA, INS_TRANSPARENT, 0x00, P2_SWITCH_PROTOCOL)
            .data(vec![
                tags::SWITCH_PROTOCOL,
                0x02,
                FELICA_LAYER[0],
                FELICA_LAYER[1],
            ])
            .le(0x00)
    }

    /// Send one FeliCa frame, waiting at most `timeout` for the card
    pub fn transceive(frame: &[u8], timeout: Duration) -> ApduCommand {
        let timeout_us = u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX);

        let mut data = Vec::with_capacity(frame.len() + 10);
        data.extend_from_slice(&tags::TIMER);
        data.push(0x04);
        data.extend_from_slice(&timeout_us.to_le_bytes());
        data.push(tags::TRANSCEIVE);
        if frame.len() >= 0x80 {
            data.push(0x81);
        }
        data.push(frame.len() as u8);
        data.extend_from_slice(frame);

        ApduCommand::new(CLA, INS_TRANSPARENT, 0x00, P2_TRANSPARENT_EXCHANGE)
            .data(data)
            .le(0x00)
    }
}

/// Encode a timeout the way [`commands::transceive`] does, for logging
pub fn timeout_hex(timeout: Duration) -> String {
    let timeout_us = u32::try_from(timeout.as_micros()).unwrap_or(u32::MAX);
    hex::encode_upper(timeout_us.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_commands() {
        assert_eq!(
            commands::start_session().build(),
            vec![0xFF, 0xC2, 0x00, 0x00, 0x02, 0x81, 0x00, 0x00]
        );
        assert_eq!(
            commands::end_session().build(),
            vec![0xFF, 0xC2, 0x00, 0x00, 0x02, 0x82, 0x00, 0x00]
        );
        assert_eq!(
            commands::switch_to_felica().build(),
            vec![0xFF, 0xC2, 0x00, 0x02, 0x04, 0x8F, 0x02, 0x03, 0x00, 0x00]
        );
    }

    #[test]
    fn test_transceive_wraps_frame() {
        let frame = [0x06, 0x00, 0xFF, 0xFF, 0x01, 0x00];
        let apdu = commands::transceive(&frame, Duration::from_millis(3000)).build();

        // 3 s = 3_000_000 us = 0x002DC6C0
        assert_eq!(&apdu[..5], &[0xFF, 0xC2, 0x00, 0x01, 0x0F]);
        assert_eq!(&apdu[5..12], &[0x5F, 0x46, 0x04, 0xC0, 0xC6, 0x2D, 0x00]);
        assert_eq!(&apdu[12..14], &[0x95, 0x06]);
        assert_eq!(&apdu[14..20], &frame);
        assert_eq!(apdu[20], 0x00);
    }

    #[test]
    fn test_timeout_hex() {
        assert_eq!(timeout_hex(Duration::from_millis(3000)), "C0C62D00");
    }

    #[test]
    fn test_status_string() {
        let response = ApduResponse {
            data: vec![],
            sw1: 0x6A,
            sw2: 0x81,
        };
        assert!(!response.is_success());
        assert_eq!(response.status_string(), "6A81");
    }
}
