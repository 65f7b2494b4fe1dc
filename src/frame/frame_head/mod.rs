mod decoder;

pub use decoder::*;

use crate::frame::{Opcode, FIN_BIT, MASK_BIT, MAX_SHORT_PAYLOAD_LEN};

/// Extended length marker for a 16-bit big-endian length following byte 1.
pub(crate) const LEN_16: u8 = 126;
/// Extended length marker for a 64-bit length. Never produced, rejected on input.
pub(crate) const LEN_64: u8 = 127;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u16,
}

impl FrameHead {
    // Length of the encoded frame head in bytes ([2..8]).
    pub fn len_bytes(&self) -> usize {
        let extra_payload_len_bytes = match self.payload_len as usize {
            0..=MAX_SHORT_PAYLOAD_LEN => 0usize,
            _ => 2usize,
        };
        2 + extra_payload_len_bytes + self.mask.map_or(0, |_| 4)
    }
    // Writes the frame head to `buffer`. Panics if `buffer` is shorter than
    // [len_bytes()][`Self::len_bytes()`].
    pub fn encode(&self, buffer: &mut [u8]) {
        buffer[0] = self.opcode as u8;
        if self.fin {
            buffer[0] |= FIN_BIT;
        }
        let len = self.payload_len as usize;
        let mut offset = match len {
            0..=MAX_SHORT_PAYLOAD_LEN => {
                buffer[1] = len as u8;
                2
            }
            _ => {
                buffer[1] = LEN_16;
                buffer[2..4].copy_from_slice(&self.payload_len.to_be_bytes());
                4
            }
        };
        if let Some(mask) = self.mask {
            buffer[1] |= MASK_BIT;
            buffer[offset..offset + 4].copy_from_slice(&mask);
            offset += 4;
        }
        debug_assert_eq!(offset, self.len_bytes());
    }
    pub fn encode_vec(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.len_bytes()];
        self.encode(&mut buffer);
        buffer
    }
}
