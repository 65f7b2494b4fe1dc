use crate::frame::{
    Frame, FrameDecodeError, FrameDecoder, FrameEncodeError, FrameEncoder, Opcode,
};
use crate::message::{Message, MessageError};

/// Outcome of decoding one inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Message(Message),
    /// The peer sent a close frame. No frames are processed after this.
    Closed,
    /// A well-formed frame this server does not act on. The connection stays open.
    Unsupported(Opcode),
}

/// Maps a decoded frame to what the application sees.
pub fn decode_frame(frame: Frame) -> Result<Inbound, MessageError> {
    match frame.opcode() {
        Opcode::Close => Ok(Inbound::Closed),
        Opcode::Text if frame.fin() => Ok(Inbound::Message(Message::from_payload(
            frame.payload(),
        )?)),
        opcode => Ok(Inbound::Unsupported(opcode)),
    }
}

/// Decodes a single complete client frame from `bytes`.
///
/// Trailing bytes past the first frame are ignored. Use [`FrameDecoder`] directly where frames
/// may span reads.
pub fn decode(bytes: &[u8]) -> Result<Inbound, DecodeError> {
    match FrameDecoder::server().decode(bytes)? {
        (_, Some(frame)) => Ok(decode_frame(frame)?),
        (consumed, None) => Err(DecodeError::Incomplete(consumed)),
    }
}

/// Encodes a message as a complete, unmasked server text frame.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let payload = message.to_payload()?;
    Ok(FrameEncoder::server().encode_text(&payload)?)
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("protocol error: {0}")]
    Frame(#[from] FrameDecodeError),
    #[error("malformed payload: {0}")]
    Malformed(#[from] MessageError),
    #[error("incomplete frame after {0} bytes")]
    Incomplete(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] MessageError),
    #[error("{0}")]
    Frame(#[from] FrameEncodeError),
}
