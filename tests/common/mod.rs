#![allow(dead_code)]
//! Minimal raw websocket client driving the relay in tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

use wsrelay::frame::{apply_mask, new_key, OpCode, PayloadLen};
use wsrelay::handshake::{derive_accept_key, new_sec_key};
use wsrelay::relay::{Config, Registry, Server};

/// Bind a relay on an ephemeral port and run it in the background.
pub async fn spawn_relay() -> (String, Arc<Registry>) {
    let server = Server::bind(Config {
        address: "127.0.0.1:0".to_string(),
        ..Config::default()
    })
    .await
    .unwrap();

    let addr = server.local_addr().unwrap().to_string();
    let registry = server.registry();
    tokio::spawn(server.run());
    (addr, registry)
}

/// Block until the registry settles at `n` live connections.
pub async fn wait_online(registry: &Registry, n: usize) {
    while registry.len() != n {
        sleep(Duration::from_millis(10)).await;
    }
}

pub struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    /// Tcp connect plus http upgrade.
    pub async fn connect(addr: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let sec_key = new_sec_key();
        let request = format!(
            "GET / HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {sec_key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        let mut byte = [0u8; 1];
        while !response.ends_with(b"\r\n\r\n") {
            stream.read_exact(&mut byte).await.unwrap();
            response.push(byte[0]);
        }

        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("HTTP/1.1 101"));
        assert!(response.contains(&derive_accept_key(sec_key.as_bytes())));

        TestClient { stream }
    }

    /// Send one masked frame.
    pub async fn send(&mut self, opcode: OpCode, payload: &[u8]) {
        let key = new_key();
        let mut hidden = payload.to_vec();
        apply_mask(key, &mut hidden);

        let mut bytes = vec![0x80 | opcode as u8];
        let len = PayloadLen::from_num(payload.len() as u64);
        bytes.push(0x80 | len.to_flag());
        match len {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => bytes.extend_from_slice(&v.to_be_bytes()),
            PayloadLen::Extended2(v) => bytes.extend_from_slice(&v.to_be_bytes()),
        }
        bytes.extend_from_slice(&key);
        bytes.extend_from_slice(&hidden);

        self.stream.write_all(&bytes).await.unwrap();
    }

    pub async fn send_text(&mut self, text: &str) {
        self.send(OpCode::Text, text.as_bytes()).await;
    }

    /// Send raw bytes, bypassing the framing helpers.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Receive one unmasked server frame as (opcode, payload).
    pub async fn recv(&mut self) -> (u8, Vec<u8>) {
        let mut head = [0u8; 2];
        self.stream.read_exact(&mut head).await.unwrap();

        let opcode = head[0] & 0x0f;
        assert_eq!(head[1] & 0x80, 0, "server frames are unmasked");

        let length = match head[1] & 0x7f {
            126 => {
                let mut ext = [0u8; 2];
                self.stream.read_exact(&mut ext).await.unwrap();
                u16::from_be_bytes(ext) as u64
            }
            127 => {
                let mut ext = [0u8; 8];
                self.stream.read_exact(&mut ext).await.unwrap();
                u64::from_be_bytes(ext)
            }
            v => v as u64,
        };

        let mut payload = vec![0u8; length as usize];
        self.stream.read_exact(&mut payload).await.unwrap();
        (opcode, payload)
    }

    /// True once the server has hung up on this connection.
    pub async fn closed(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte).await, Ok(0))
    }
}
