mod config;

pub use config::*;

use crate::frame::{Frame, FrameDecodeError, FrameDecoder};
use crate::http::{read_request_head, reject, upgrade_response, HandshakeError, RequestHeadError};
use crate::message::{decode_frame, encode, EncodeError, Inbound, Message, MessageError};
use async_io::Timer;
use futures::prelude::*;
use http::Request;
use std::io;

const READ_BUFFER_LEN: usize = 4096;

/// Lifecycle of a server-side connection. `Closed` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingUpgrade,
    Open,
    Closed,
}

/// Server side of a single WebSocket connection over any byte stream.
///
/// Frames are read through an incremental decoder, so frames split across reads or several
/// frames in one read are handled. Each outbound frame is written with a single `write_all`.
pub struct WsConnection<T: AsyncRead + AsyncWrite + Unpin> {
    transport: T,
    config: WsConfig,
    state: ConnectionState,
    protocol: Option<String>,
    decoder: FrameDecoder,
    read_buffer: Vec<u8>,
    read_start: usize,
    read_end: usize,
}

impl<T: AsyncRead + AsyncWrite + Unpin> WsConnection<T> {
    pub fn new(transport: T, config: WsConfig) -> Self {
        Self::with_buffered(transport, config, Vec::new())
    }
    /// Like [`new`][`Self::new`], with bytes already read from `transport` that precede anything
    /// still to come, such as the remainder after an HTTP request head.
    pub fn with_buffered(transport: T, config: WsConfig, buffered: Vec<u8>) -> Self {
        let read_end = buffered.len();
        let mut read_buffer = buffered;
        if read_buffer.len() < READ_BUFFER_LEN {
            read_buffer.resize(READ_BUFFER_LEN, 0);
        }
        Self {
            transport,
            decoder: FrameDecoder::new(config.require_mask),
            config,
            state: ConnectionState::AwaitingUpgrade,
            protocol: None,
            read_buffer,
            read_start: 0,
            read_end,
        }
    }
    /// Reads the upgrade request from `transport` and completes the handshake. Malformed request
    /// heads are answered with `400 Bad Request`.
    pub async fn accept(mut transport: T, config: WsConfig) -> Result<Self, WsConnectionError> {
        let (request, buffered) = match read_request_head(&mut transport).await {
            Ok(head) => head,
            Err(err) if err.is_malformed() => {
                log::warn!("rejecting request head: {}", err);
                if let Err(io_err) = reject(&mut transport, &err.to_string()).await {
                    log::debug!("failed to send 400 response: {}", io_err);
                }
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        let mut ws = Self::with_buffered(transport, config, buffered);
        ws.upgrade(&request).await?;
        Ok(ws)
    }
    /// Answers `request` with `101 Switching Protocols`, or with `400 Bad Request` and an error
    /// if the request cannot be upgraded.
    pub async fn upgrade<B>(&mut self, request: &Request<B>) -> Result<(), WsConnectionError> {
        if self.state != ConnectionState::AwaitingUpgrade {
            return Err(WsConnectionError::InvalidState(self.state));
        }
        let response = match upgrade_response(request, &self.config.subprotocols) {
            Ok(response) => response,
            Err(err) => {
                log::warn!("rejecting upgrade request for {}: {}", request.uri(), err);
                self.state = ConnectionState::Closed;
                if let Err(io_err) = reject(&mut self.transport, &err.to_string()).await {
                    log::debug!("failed to send 400 response: {}", io_err);
                }
                return Err(err.into());
            }
        };
        if let Err(err) = self.write_once(&response.encode()).await {
            self.state = ConnectionState::Closed;
            return Err(err.into());
        }
        log::info!(
            "upgraded {} with subprotocol {:?}",
            request.uri(),
            response.protocol
        );
        self.protocol = response.protocol;
        self.state = ConnectionState::Open;
        Ok(())
    }
    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` once the peer sent a close frame or the transport ended. Frames with
    /// opcodes other than text and close are logged and skipped. A
    /// [`WsConnectionError::MalformedPayload`] leaves the connection open; any other error
    /// closes it.
    pub async fn recv(&mut self) -> Result<Option<Message>, WsConnectionError> {
        loop {
            match self.state {
                ConnectionState::Open => {}
                ConnectionState::Closed => return Ok(None),
                state => return Err(WsConnectionError::InvalidState(state)),
            }
            let frame = match self.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("transport closed by peer");
                    self.state = ConnectionState::Closed;
                    return Ok(None);
                }
                Err(err) => {
                    self.state = ConnectionState::Closed;
                    return Err(err);
                }
            };
            match decode_frame(frame)? {
                Inbound::Message(message) => return Ok(Some(message)),
                Inbound::Closed => {
                    log::info!("close frame received");
                    self.state = ConnectionState::Closed;
                    return Ok(None);
                }
                Inbound::Unsupported(opcode) => {
                    log::warn!("ignoring unsupported {} frame", opcode);
                }
            }
        }
    }
    /// Sends `message` as one unfragmented text frame.
    pub async fn send(&mut self, message: &Message) -> Result<(), WsConnectionError> {
        if self.state != ConnectionState::Open {
            return Err(WsConnectionError::InvalidState(self.state));
        }
        let frame = encode(message)?;
        if let Err(err) = self.write_once(&frame).await {
            self.state = ConnectionState::Closed;
            return Err(err.into());
        }
        log::debug!("sent text frame of {} bytes", frame.len());
        Ok(())
    }
    /// Closes the transport. No frames are processed afterwards.
    pub async fn close(&mut self) -> Result<(), WsConnectionError> {
        self.state = ConnectionState::Closed;
        Ok(self.transport.close().await?)
    }
    pub fn state(&self) -> ConnectionState {
        self.state
    }
    /// Subprotocol agreed on during the upgrade.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }
    pub fn into_inner(self) -> T {
        self.transport
    }
    async fn write_once(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.transport.write_all(bytes).await?;
        self.transport.flush().await
    }
    // Returns `None` if the transport ends between frames.
    async fn next_frame(&mut self) -> Result<Option<Frame>, WsConnectionError> {
        loop {
            if self.read_start < self.read_end {
                let buffered = &self.read_buffer[self.read_start..self.read_end];
                let (n, frame) = self.decoder.decode(buffered)?;
                self.read_start += n;
                if let Some(frame) = frame {
                    log::debug!(
                        "received {} frame, fin: {}, {} bytes",
                        frame.opcode(),
                        frame.fin(),
                        frame.payload().len()
                    );
                    return Ok(Some(frame));
                }
            }
            let n = self.read_with_timeout().await?;
            if n == 0 {
                return match self.decoder.is_idle() {
                    true => Ok(None),
                    false => Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                };
            }
            self.read_start = 0;
            self.read_end = n;
        }
    }
    async fn read_with_timeout(&mut self) -> Result<usize, WsConnectionError> {
        let timeout = self.config.timeout;
        let read = async {
            self.transport
                .read(&mut self.read_buffer)
                .await
                .map_err(WsConnectionError::from)
        };
        let expire = async {
            Timer::after(timeout).await;
            Err(WsConnectionError::Timeout)
        };
        futures_lite::future::or(read, expire).await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WsConnectionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("no data received within the timeout")]
    Timeout,
    #[error("bad request head: {0}")]
    RequestHead(#[from] RequestHeadError),
    #[error("handshake rejected: {0}")]
    HandshakeRejected(#[from] HandshakeError),
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameDecodeError),
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] MessageError),
    #[error("cannot send message: {0}")]
    Encode(#[from] EncodeError),
    #[error("not possible in state {0:?}")]
    InvalidState(ConnectionState),
}

impl WsConnectionError {
    /// True if the connection can no longer be used after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedPayload(_) | Self::Encode(_))
    }
}
