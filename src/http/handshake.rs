use crate::http::encode_head;
use http::{HeaderValue, Request, StatusCode};
use ring::digest::{Context, SHA1_FOR_LEGACY_USE_ONLY};

const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

pub const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
pub const SEC_WEBSOCKET_PROTOCOL: &str = "sec-websocket-protocol";

/// Accepted upgrade, ready to be written to the transport verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub accept: String,
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut headers = vec![
            ("Upgrade", "WebSocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Accept", self.accept.as_str()),
        ];
        if let Some(protocol) = &self.protocol {
            headers.push(("Sec-WebSocket-Protocol", protocol.as_str()));
        }
        encode_head(StatusCode::SWITCHING_PROTOCOLS, &headers)
    }
}

pub fn is_upgrade_request<T>(request: &Request<T>) -> bool {
    request
        .headers()
        .get(http::header::UPGRADE)
        .filter(|v| v.as_bytes().eq_ignore_ascii_case(b"websocket"))
        .is_some()
}

/// Picks the first subprotocol offered by the client that is in `supported`.
pub fn negotiate_subprotocol<T>(request: &Request<T>, supported: &[String]) -> Option<String> {
    request
        .headers()
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .find(|candidate| supported.iter().any(|s| s == candidate))
        .map(String::from)
}

/// Validates an upgrade request and computes the response.
///
/// Nothing is hashed unless the `Upgrade` header asks for `websocket` and the key is a base64
/// encoded 16 byte nonce. A client offering only unsupported subprotocols is still accepted, the
/// response just carries no `Sec-WebSocket-Protocol` header.
pub fn upgrade_response<T>(
    request: &Request<T>,
    supported: &[String],
) -> Result<HandshakeResponse, HandshakeError> {
    match request.headers().get(http::header::UPGRADE) {
        None => return Err(HandshakeError::MissingUpgrade),
        Some(upgrade) if !is_upgrade_request(request) => {
            return Err(HandshakeError::NotWebsocket(header_lossy(upgrade)))
        }
        Some(_) => {}
    }
    let key = request
        .headers()
        .get(SEC_WEBSOCKET_KEY)
        .ok_or(HandshakeError::MissingKey)?;
    match base64::decode(key.as_bytes()) {
        Ok(nonce) if nonce.len() == 16 => {}
        _ => return Err(HandshakeError::InvalidKey(header_lossy(key))),
    }
    Ok(HandshakeResponse {
        accept: accept_token(key.as_bytes()),
        protocol: negotiate_subprotocol(request, supported),
    })
}

pub fn accept_token(key: &[u8]) -> String {
    let mut ctx = Context::new(&SHA1_FOR_LEGACY_USE_ONLY);
    ctx.update(key);
    ctx.update(GUID);
    base64::encode(ctx.finish())
}

fn header_lossy(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("missing Upgrade header")]
    MissingUpgrade,
    #[error("cannot upgrade to {0:?}")]
    NotWebsocket(String),
    #[error("missing Sec-WebSocket-Key")]
    MissingKey,
    #[error("invalid Sec-WebSocket-Key {0:?}")]
    InvalidKey(String),
}
