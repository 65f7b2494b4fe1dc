mod handshake;
mod head;

pub use handshake::*;
pub use head::*;

use futures::prelude::*;
use http::StatusCode;
use std::io;

// Response heads are written by hand rather than through `http::HeaderMap`, which lowercases
// header names. Clients see the names exactly as given here.
pub(crate) fn encode_head(status: StatusCode, headers: &[(&str, &str)]) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Plain text `400 Bad Request` response closing the connection.
pub fn bad_request(reason: &str) -> Vec<u8> {
    let mut response = encode_head(
        StatusCode::BAD_REQUEST,
        &[
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Length", &reason.len().to_string()),
            ("Connection", "close"),
        ],
    );
    response.extend_from_slice(reason.as_bytes());
    response
}

/// Sends [`bad_request`] and closes `transport`.
pub async fn reject<T: AsyncWrite + Unpin>(transport: &mut T, reason: &str) -> io::Result<()> {
    transport.write_all(&bad_request(reason)).await?;
    transport.close().await
}
