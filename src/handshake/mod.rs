//! Websocket handshake.
//!
//! [RFC-6455 Section 4](https://datatracker.ietf.org/doc/html/rfc6455#section-4)
//!
//! The one-time http upgrade exchange that switches a raw tcp
//! connection into websocket framing mode.

pub mod key;
pub mod server;

pub use key::{derive_accept_key, new_sec_key};
pub use server::{accept, Upgrade};

/// 258EAFA5-E914-47DA-95CA-C5AB0DC85B11
pub const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// GET
pub const HTTP_METHOD: &str = "GET";

/// HTTP/1.1 101 Switching Protocols
pub const HTTP_STATUS_LINE: &str = "HTTP/1.1 101 Switching Protocols";

/// sec-websocket-key
pub const HEADER_SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";

/// 32
pub const MAX_ALLOW_HEADERS: usize = 32;

/// 8192
pub const MAX_REQUEST_SIZE: usize = 8192;
