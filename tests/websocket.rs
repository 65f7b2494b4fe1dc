use crate::common::{
    client_frame, local_config, upgrade_request, websocket_request, with_server, Client, ACCEPT,
    KEY,
};
use async_io::Timer;
use json_ws::frame::{FrameEncoder, Opcode};
use json_ws::message::Message;
use json_ws::server::GREETING;
use std::time::Duration;

mod common;

const HELLO: &[u8] = br#"{"message":"Hello from the client!"}"#;

fn greeting() -> Message {
    Message::text(GREETING)
}

#[test]
fn handshake_and_greeting() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&websocket_request()).await;
        let head = client.read_head().await;
        assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(head.contains("\r\nUpgrade: WebSocket\r\n"));
        assert!(head.contains("\r\nConnection: Upgrade\r\n"));
        assert!(head.contains(&format!("\r\nSec-WebSocket-Accept: {}\r\n", ACCEPT)));
        assert!(head.contains("\r\nSec-WebSocket-Protocol: json\r\n"));

        for _ in 0..3 {
            client.send(&client_frame(Opcode::Text, HELLO)).await;
            let frame = client.read_frame().await;
            assert_eq!(frame.opcode(), Opcode::Text);
            assert!(frame.fin());
            assert!(!frame.masked());
            assert_eq!(Message::from_payload(frame.payload()).unwrap(), greeting());
        }

        client.send(&client_frame(Opcode::Close, &[0x03, 0xE8])).await;
        assert!(client.read_until_closed().await.is_empty());
    })
}

#[test]
fn no_matching_subprotocol() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client
            .send(&upgrade_request(&[
                ("Upgrade", "websocket"),
                ("Sec-WebSocket-Key", KEY),
                ("Sec-WebSocket-Protocol", "xml"),
            ]))
            .await;
        let head = client.read_head().await;
        assert!(head.starts_with("HTTP/1.1 101 "));
        assert!(!head.contains("Sec-WebSocket-Protocol"));
    })
}

#[test]
fn frame_pipelined_behind_request() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        let mut bytes = websocket_request();
        bytes.extend_from_slice(&client_frame(Opcode::Text, HELLO));
        client.send(&bytes).await;
        client.read_head().await;
        let frame = client.read_frame().await;
        assert_eq!(Message::from_payload(frame.payload()).unwrap(), greeting());
    })
}

#[test]
fn frame_split_across_writes() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&websocket_request()).await;
        client.read_head().await;
        let mut payload = br#"{"message":"long"}"#.to_vec();
        payload.resize(300, b' ');
        let frame = client_frame(Opcode::Text, &payload);
        for part in [&frame[..1], &frame[1..3], &frame[3..9], &frame[9..150], &frame[150..]] {
            client.send(part).await;
            Timer::after(Duration::from_millis(5)).await;
        }
        let reply = client.read_frame().await;
        assert_eq!(Message::from_payload(reply.payload()).unwrap(), greeting());
    })
}

#[test]
fn unsupported_and_malformed_frames_are_skipped() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&websocket_request()).await;
        client.read_head().await;
        client.send(&client_frame(Opcode::Ping, b"ping")).await;
        client.send(&client_frame(Opcode::Binary, &[0, 1, 2])).await;
        client.send(&client_frame(Opcode::Text, b"{oops")).await;
        client.send(&client_frame(Opcode::Text, HELLO)).await;
        let frame = client.read_frame().await;
        assert_eq!(Message::from_payload(frame.payload()).unwrap(), greeting());
        client.send(&client_frame(Opcode::Close, &[])).await;
        assert!(client.read_until_closed().await.is_empty());
    })
}

#[test]
fn wrong_upgrade_rejected() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client
            .send(&upgrade_request(&[
                ("Upgrade", "chat"),
                ("Sec-WebSocket-Key", KEY),
            ]))
            .await;
        let response = String::from_utf8(client.read_until_closed().await).unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!response.contains(ACCEPT));
    })
}

#[test]
fn missing_key_rejected() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client
            .send(&upgrade_request(&[("Upgrade", "websocket")]))
            .await;
        let response = String::from_utf8(client.read_until_closed().await).unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.ends_with("missing Sec-WebSocket-Key"));
    })
}

#[test]
fn header_flood_rejected() {
    let names: Vec<String> = (0..70).map(|n| format!("X-H{}", n)).collect();
    let mut headers = vec![("Upgrade", "websocket"), ("Sec-WebSocket-Key", KEY)];
    headers.extend(names.iter().map(|name| (name.as_str(), "1")));
    let request = upgrade_request(&headers);
    // One read on the server side sees the whole request.
    assert!(request.len() < 1024);
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&request).await;
        let response = String::from_utf8(client.read_until_closed().await).unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("\r\nConnection: close\r\n"));
    })
}

#[test]
fn unmasked_frame_closes_connection() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&websocket_request()).await;
        client.read_head().await;
        client
            .send(&FrameEncoder::server().encode_text(HELLO).unwrap())
            .await;
        assert!(client.read_until_closed().await.is_empty());
    })
}

#[test]
fn sixty_four_bit_length_closes_connection() {
    with_server(local_config(), |addr| async move {
        let mut client = Client::connect(addr).await;
        client.send(&websocket_request()).await;
        client.read_head().await;
        let mut head = vec![0x81, 0xFF];
        head.extend_from_slice(&(100_000u64).to_be_bytes());
        head.extend_from_slice(&[1, 2, 3, 4]);
        client.send(&head).await;
        assert!(client.read_until_closed().await.is_empty());
    })
}
