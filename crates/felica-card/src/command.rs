//! FeliCa command frames

use felica_common::codes;

/// FeliCa command builder
///
/// Frames are `[length][command code][IDm?][parameters]`, where the length
/// byte counts itself.
pub struct FelicaCommand {
    code: u8,
    idm: Option<[u8; 8]>,
    data: Vec<u8>,
}

impl FelicaCommand {
    /// Create a new command
    pub fn new(code: u8) -> Self {
        Self {
            code,
            idm: None,
            data: Vec::new(),
        }
    }

    /// Address the command to a card
    pub fn idm(mut self, idm: [u8; 8]) -> Self {
        self.idm = Some(idm);
        self
    }

    /// Set command parameters
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Build the frame bytes
    pub fn build(&self) -> Vec<u8> {
        let mut frame = vec![0x00, self.code];

        if let Some(idm) = self.idm {
            frame.extend_from_slice(&idm);
        }
        frame.extend_from_slice(&self.data);

        frame[0] = frame.len() as u8;
        frame
    }
}

/// Polling request codes
pub mod request_codes {
    pub const SYSTEM_CODE: u8 = 0x01;
}

/// Common FeliCa commands
pub mod commands {
    use super::{codes, FelicaCommand};

    /// Polling, single time slot
    pub fn polling(system_code: [u8; 2], request_code: u8) -> FelicaCommand {
        FelicaCommand::new(codes::POLLING).data(vec![
            system_code[0],
            system_code[1],
            request_code,
            0x00,
        ])
    }

    /// Read Without Encryption of a single block from a single service
    ///
    /// `service_code` is in wire (little-endian) order.
    pub fn read_without_encryption(
        idm: [u8; 8],
        service_code: [u8; 2],
        block_index: u8,
    ) -> FelicaCommand {
        FelicaCommand::new(codes::READ_WITHOUT_ENCRYPTION)
            .idm(idm)
            .data(vec![
                0x01,
                service_code[0],
                service_code[1],
                0x01,
                codes::BLOCK_LIST_ELEMENT,
                block_index,
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDM: [u8; 8] = [0x01, 0x2E, 0x4C, 0x11, 0x22, 0x33, 0x44, 0x55];

    #[test]
    fn test_polling_frame() {
        let frame = commands::polling([0xFF, 0xFF], request_codes::SYSTEM_CODE).build();
        assert_eq!(frame, vec![0x06, 0x00, 0xFF, 0xFF, 0x01, 0x00]);
    }

    #[test]
    fn test_read_frame() {
        let frame = commands::read_without_encryption(IDM, [0x8F, 0x00], 7).build();
        assert_eq!(frame.len(), 16);
        assert_eq!(frame[0], 16);
        assert_eq!(frame[1], 0x06);
        assert_eq!(&frame[2..10], &IDM);
        assert_eq!(&frame[10..], &[0x01, 0x8F, 0x00, 0x01, 0x80, 0x07]);
    }
}
