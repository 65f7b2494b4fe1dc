use crate::frame::{mask, FrameHead, Opcode, MAX_PAYLOAD_LEN};
use rand::prelude::*;

/// Builds complete frames, head and payload, in a single buffer so each frame can be handed to
/// the transport as one write.
#[derive(Clone, Debug)]
pub struct FrameEncoder<R: RngCore = StdRng> {
    pub mask_rng: Option<R>,
}

impl FrameEncoder<StdRng> {
    pub fn client() -> Self {
        Self {
            mask_rng: Some(StdRng::from_entropy()),
        }
    }
    pub fn server() -> Self {
        Self { mask_rng: None }
    }
}

impl<R: RngCore> FrameEncoder<R> {
    pub fn encode(
        &mut self,
        opcode: Opcode,
        fin: bool,
        payload: &[u8],
    ) -> Result<Vec<u8>, FrameEncodeError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameEncodeError::PayloadTooLarge(payload.len()));
        }
        let head = FrameHead {
            fin,
            opcode,
            mask: self
                .mask_rng
                .as_mut()
                .map(|rng| rng.next_u32().to_be_bytes()),
            payload_len: payload.len() as u16,
        };
        let head_len = head.len_bytes();
        let mut buffer = vec![0u8; head_len + payload.len()];
        head.encode(&mut buffer[..head_len]);
        buffer[head_len..].copy_from_slice(payload);
        if let Some(key) = head.mask {
            mask(key, 0, &mut buffer[head_len..]);
        }
        Ok(buffer)
    }
    /// Encodes a complete, unfragmented text frame.
    pub fn encode_text(&mut self, payload: &[u8]) -> Result<Vec<u8>, FrameEncodeError> {
        self.encode(Opcode::Text, true, payload)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameEncodeError {
    #[error("payload of {0} bytes exceeds the {} byte frame limit", MAX_PAYLOAD_LEN)]
    PayloadTooLarge(usize),
}
