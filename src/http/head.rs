use futures::prelude::*;
use http::{Request, Version};
use std::io;

pub const MAX_HEAD_LEN: usize = 8192;
const MAX_HEADERS: usize = 64;

/// Reads an HTTP/1.1 request head from `transport`.
///
/// Returns the request together with any bytes received after the end of the head. Clients may
/// send their first frames right behind the upgrade request, so those bytes must not be dropped.
pub async fn read_request_head<T: AsyncRead + Unpin>(
    transport: &mut T,
) -> Result<(Request<()>, Vec<u8>), RequestHeadError> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = transport.read(&mut chunk).await?;
        if n == 0 {
            return Err(RequestHeadError::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some((request, head_len)) = parse_request_head(&buffer)? {
            let rest = buffer.split_off(head_len);
            return Ok((request, rest));
        }
        if buffer.len() >= MAX_HEAD_LEN {
            return Err(RequestHeadError::TooLarge);
        }
    }
}

/// Parses a request head, returning `None` if `buffer` does not hold all of it yet.
pub fn parse_request_head(
    buffer: &[u8],
) -> Result<Option<(Request<()>, usize)>, RequestHeadError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);
    let head_len = match parsed.parse(buffer)? {
        httparse::Status::Complete(head_len) => head_len,
        httparse::Status::Partial => return Ok(None),
    };
    let mut builder = Request::builder()
        .method(parsed.method.unwrap_or("GET"))
        .uri(parsed.path.unwrap_or("/"))
        .version(match parsed.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        });
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    Ok(Some((builder.body(())?, head_len)))
}

#[derive(thiserror::Error, Debug)]
pub enum RequestHeadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] httparse::Error),
    #[error("invalid request: {0}")]
    Invalid(#[from] http::Error),
    #[error("request head exceeds {} bytes", MAX_HEAD_LEN)]
    TooLarge,
}

impl RequestHeadError {
    /// True if the peer sent something that is not an acceptable request head, as opposed to
    /// the transport failing.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
