#![allow(dead_code)]

use async_io::Async;
use futures::executor::LocalPool;
use futures::prelude::*;
use futures::task::LocalSpawnExt;
use json_ws::frame::{Frame, FrameDecoder, FrameEncoder, Opcode};
use json_ws::server::{Server, ServerConfig};
use smol_timeout::TimeoutExt;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

pub const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
pub const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

pub fn local_config() -> ServerConfig {
    ServerConfig {
        address: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        ..ServerConfig::default()
    }
}

/// Runs a server on a local pool while `client` talks to it. Panics if `client` takes longer
/// than five seconds.
pub fn with_server<F, Fut, T>(config: ServerConfig, client: F) -> T
where
    F: FnOnce(SocketAddr) -> Fut,
    Fut: Future<Output = T>,
{
    let server = Server::bind(config).unwrap();
    let addr = server.local_addr().unwrap();
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let server_spawner = spawner.clone();
    spawner
        .spawn_local(async move {
            let _ = server.run(server_spawner).await;
        })
        .unwrap();
    pool.run_until(client(addr).timeout(Duration::from_secs(5)))
        .expect("client timed out")
}

pub fn upgrade_request(headers: &[(&str, &str)]) -> Vec<u8> {
    let mut request = String::from("GET /chat HTTP/1.1\r\nHost: localhost\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    request.into_bytes()
}

pub fn websocket_request() -> Vec<u8> {
    upgrade_request(&[
        ("Upgrade", "websocket"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Key", KEY),
        ("Sec-WebSocket-Version", "13"),
        ("Sec-WebSocket-Protocol", "chat, json"),
    ])
}

pub fn client_frame(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    FrameEncoder::client().encode(opcode, true, payload).unwrap()
}

pub struct Client {
    pub stream: Async<TcpStream>,
    decoder: FrameDecoder,
    buffered: Vec<u8>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: Async::<TcpStream>::connect(addr).await.unwrap(),
            decoder: FrameDecoder::client(),
            buffered: Vec::new(),
        }
    }
    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }
    async fn fill(&mut self) -> usize {
        let mut chunk = [0u8; 1024];
        let n = self.stream.read(&mut chunk).await.unwrap_or(0);
        self.buffered.extend_from_slice(&chunk[..n]);
        n
    }
    /// Reads a response head and returns it as text.
    pub async fn read_head(&mut self) -> String {
        loop {
            if let Some(end) = self.buffered.windows(4).position(|w| w == b"\r\n\r\n") {
                let head: Vec<u8> = self.buffered.drain(..end + 4).collect();
                return String::from_utf8(head).unwrap();
            }
            assert!(self.fill().await > 0, "connection closed before head ended");
        }
    }
    pub async fn read_frame(&mut self) -> Frame {
        loop {
            if !self.buffered.is_empty() {
                let (n, frame) = self.decoder.decode(&self.buffered).unwrap();
                self.buffered.drain(..n);
                if let Some(frame) = frame {
                    return frame;
                }
            }
            assert!(self.fill().await > 0, "connection closed before frame ended");
        }
    }
    /// Reads until the server closes the connection, returning everything received.
    pub async fn read_until_closed(&mut self) -> Vec<u8> {
        while self.fill().await > 0 {}
        std::mem::take(&mut self.buffered)
    }
}
