//! Raw 16-byte card memory blocks

use std::fmt;

/// Size of a FeliCa memory block in bytes
pub const BLOCK_SIZE: usize = 16;

/// One block of card memory, exactly as returned by the card
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBlock(pub [u8; BLOCK_SIZE]);

/// A bit range inside a block, counted MSB-first from byte 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub start_bit: u16,
    pub width: u8,
}

impl FieldSpan {
    pub const fn new(start_bit: u16, width: u8) -> Self {
        Self { start_bit, width }
    }
}

impl RawBlock {
    /// Build a block from a slice, `None` unless it is exactly 16 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; BLOCK_SIZE]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    pub fn byte(&self, offset: usize) -> u8 {
        self.0[offset]
    }

    /// Big-endian u16 at `offset`
    pub fn be_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.0[offset], self.0[offset + 1]])
    }

    /// Little-endian u16 at `offset`
    pub fn le_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.0[offset], self.0[offset + 1]])
    }

    /// Extract an unsigned field of up to 32 bits.
    ///
    /// Bits past the end of the block read as zero.
    pub fn field(&self, span: FieldSpan) -> u32 {
        let mut value = 0u32;
        for n in 0..span.width as usize {
            let bit = span.start_bit as usize + n;
            let set = self
                .0
                .get(bit / 8)
                .map(|byte| byte & (0x80 >> (bit % 8)) != 0)
                .unwrap_or(false);
            value = (value << 1) | set as u32;
        }
        value
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBlock({})", self.to_hex())
    }
}

impl From<[u8; BLOCK_SIZE]> for RawBlock {
    fn from(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }
}
