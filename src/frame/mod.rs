mod encode;
mod frame_head;
mod frame_payload;

pub use encode::*;
pub use frame_head::*;
pub use frame_payload::*;

/// Frame opcodes as carried in the low nibble of the first header byte.
///
/// Bit layout of the first two header bytes (RFC 6455 section 5.2):
///
/// ```text
///  byte 0: | FIN | RSV1 | RSV2 | RSV3 |     opcode (4)    |
///  byte 1: | MASK |          payload length (7)           |
/// ```
///
/// `FIN_BIT`, `RSV_BITS`, `OPCODE_BITS`, `MASK_BIT` and `LEN_BITS` are the only places these
/// positions are spelled out; encoder and decoder both go through them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::FromRepr, strum::Display)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

pub const FIN_BIT: u8 = 0x80;
pub const RSV_BITS: u8 = 0x70;
pub const OPCODE_BITS: u8 = 0x0F;
pub const MASK_BIT: u8 = 0x80;
pub const LEN_BITS: u8 = 0x7F;

/// Largest payload a frame can carry with the 7-bit length field alone.
pub const MAX_SHORT_PAYLOAD_LEN: usize = 125;
/// Largest payload supported at all. Lengths beyond need the 64-bit length field.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

impl Opcode {
    pub fn is_control(&self) -> bool {
        (*self as u8) & 0x8 != 0
    }
}

/// A fully received frame. The payload is already unmasked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub head: FrameHead,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn opcode(&self) -> Opcode {
        self.head.opcode
    }
    pub fn fin(&self) -> bool {
        self.head.fin
    }
    pub fn masked(&self) -> bool {
        self.head.mask.is_some()
    }
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
