//! Server side of the WebSocket protocol: the HTTP/1.1 upgrade handshake and a frame codec for
//! JSON text messages, plus a small server tying both to TCP connections.

pub mod connection;
pub mod frame;
pub mod http;
pub mod message;
pub mod server;
