use crate::frame::frame_head::{LEN_16, LEN_64};
use crate::frame::{
    mask, Frame, FrameHead, Opcode, FIN_BIT, LEN_BITS, MASK_BIT, MAX_PAYLOAD_LEN,
    MAX_SHORT_PAYLOAD_LEN, OPCODE_BITS, RSV_BITS,
};
use std::mem;

/// Incremental frame decoder.
///
/// Bytes may arrive split at any position. Partially received header fields and payloads are
/// kept between calls to [`decode`][`Self::decode`], so a frame does not have to arrive in one
/// transport read.
#[derive(Debug)]
pub struct FrameDecoder {
    require_mask: bool,
    state: DecodeState,
    field: [u8; 4],
    field_len: usize,
}

#[derive(Debug)]
enum DecodeState {
    AwaitingHeader,
    AwaitingLength {
        fin: bool,
        opcode: Opcode,
        masked: bool,
    },
    AwaitingMask {
        fin: bool,
        opcode: Opcode,
        payload_len: u16,
    },
    AwaitingPayload {
        head: FrameHead,
        payload: Vec<u8>,
    },
    Failed,
}

enum Step {
    Next(DecodeState),
    Blocked(DecodeState),
    Done(Frame),
}

impl FrameDecoder {
    pub fn new(require_mask: bool) -> Self {
        Self {
            require_mask,
            state: DecodeState::AwaitingHeader,
            field: [0u8; 4],
            field_len: 0,
        }
    }
    /// Decoder for frames sent by clients, which must be masked.
    pub fn server() -> Self {
        Self::new(true)
    }
    /// Decoder for frames sent by servers.
    pub fn client() -> Self {
        Self::new(false)
    }
    /// True if no part of a frame has been consumed since the last complete frame.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecodeState::AwaitingHeader) && self.field_len == 0
    }
    /// Consumes bytes from `input` until a frame completes or the input runs out.
    ///
    /// Returns the number of bytes consumed together with the completed frame, if any. Bytes
    /// after a completed frame are left unconsumed and belong to the next call. After an error
    /// the decoder is unusable and keeps returning [`FrameDecodeError::Poisoned`].
    pub fn decode(&mut self, input: &[u8]) -> Result<(usize, Option<Frame>), FrameDecodeError> {
        let mut consumed = 0usize;
        loop {
            let step = match mem::replace(&mut self.state, DecodeState::Failed) {
                DecodeState::Failed => return Err(FrameDecodeError::Poisoned),
                DecodeState::AwaitingHeader => match self.fill(2, input, &mut consumed) {
                    true => Step::Next(self.parse_header()?),
                    false => Step::Blocked(DecodeState::AwaitingHeader),
                },
                DecodeState::AwaitingLength {
                    fin,
                    opcode,
                    masked,
                } => match self.fill(2, input, &mut consumed) {
                    true => {
                        let payload_len = u16::from_be_bytes([self.field[0], self.field[1]]);
                        Step::Next(after_length(fin, opcode, masked, payload_len))
                    }
                    false => Step::Blocked(DecodeState::AwaitingLength {
                        fin,
                        opcode,
                        masked,
                    }),
                },
                DecodeState::AwaitingMask {
                    fin,
                    opcode,
                    payload_len,
                } => match self.fill(4, input, &mut consumed) {
                    true => Step::Next(DecodeState::AwaitingPayload {
                        head: FrameHead {
                            fin,
                            opcode,
                            mask: Some(self.field),
                            payload_len,
                        },
                        payload: Vec::with_capacity(payload_len as usize),
                    }),
                    false => Step::Blocked(DecodeState::AwaitingMask {
                        fin,
                        opcode,
                        payload_len,
                    }),
                },
                DecodeState::AwaitingPayload { head, mut payload } => {
                    let remaining = head.payload_len as usize - payload.len();
                    let n = remaining.min(input.len() - consumed);
                    payload.extend_from_slice(&input[consumed..consumed + n]);
                    consumed += n;
                    match payload.len() == head.payload_len as usize {
                        true => {
                            if let Some(key) = head.mask {
                                mask(key, 0, &mut payload);
                            }
                            Step::Done(Frame { head, payload })
                        }
                        false => Step::Blocked(DecodeState::AwaitingPayload { head, payload }),
                    }
                }
            };
            match step {
                Step::Next(state) => self.state = state,
                Step::Blocked(state) => {
                    self.state = state;
                    return Ok((consumed, None));
                }
                Step::Done(frame) => {
                    self.state = DecodeState::AwaitingHeader;
                    return Ok((consumed, Some(frame)));
                }
            }
        }
    }
    // Copies bytes into the field buffer until it holds `want` bytes.
    fn fill(&mut self, want: usize, input: &[u8], consumed: &mut usize) -> bool {
        let n = (want - self.field_len).min(input.len() - *consumed);
        self.field[self.field_len..self.field_len + n]
            .copy_from_slice(&input[*consumed..*consumed + n]);
        self.field_len += n;
        *consumed += n;
        if self.field_len < want {
            return false;
        }
        self.field_len = 0;
        true
    }
    fn parse_header(&self) -> Result<DecodeState, FrameDecodeError> {
        let [b0, b1] = [self.field[0], self.field[1]];
        if b0 & RSV_BITS != 0 {
            return Err(FrameDecodeError::RsvBit((b0 & RSV_BITS) >> 4));
        }
        let opcode = Opcode::from_repr(b0 & OPCODE_BITS)
            .ok_or(FrameDecodeError::InvalidOpcode(b0 & OPCODE_BITS))?;
        let fin = b0 & FIN_BIT != 0;
        let masked = b1 & MASK_BIT != 0;
        if self.require_mask && !masked {
            return Err(FrameDecodeError::Unmasked);
        }
        let len = b1 & LEN_BITS;
        if opcode.is_control() && (!fin || len as usize > MAX_SHORT_PAYLOAD_LEN) {
            return Err(FrameDecodeError::InvalidControlFrame);
        }
        Ok(match len {
            LEN_16 => DecodeState::AwaitingLength {
                fin,
                opcode,
                masked,
            },
            LEN_64 => return Err(FrameDecodeError::ExtendedLength),
            len => after_length(fin, opcode, masked, len as u16),
        })
    }
}

fn after_length(fin: bool, opcode: Opcode, masked: bool, payload_len: u16) -> DecodeState {
    match masked {
        true => DecodeState::AwaitingMask {
            fin,
            opcode,
            payload_len,
        },
        false => DecodeState::AwaitingPayload {
            head: FrameHead {
                fin,
                opcode,
                mask: None,
                payload_len,
            },
            payload: Vec::with_capacity(payload_len as usize),
        },
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDecodeError {
    #[error("reserved bits set: {0:#05b}")]
    RsvBit(u8),
    #[error("invalid opcode: {0:#x}")]
    InvalidOpcode(u8),
    #[error("client frame is not masked")]
    Unmasked,
    #[error("64-bit payload length is not supported, max payload is {} bytes", MAX_PAYLOAD_LEN)]
    ExtendedLength,
    #[error("control frame is fragmented or longer than 125 bytes")]
    InvalidControlFrame,
    #[error("decoder failed on an earlier frame")]
    Poisoned,
}
