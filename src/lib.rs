//! Minimal websocket broadcast relay.
//!
//! Implements RFC 6455 framing directly on top of a raw tcp stream,
//! without an external websocket library, and relays every validated
//! frame to all other connected peers.
//!
//! ## Protocol layer
//!
//! - [`frame`]: wire codec and conformance checks
//! - [`handshake`]: http upgrade negotiation
//!
//! ```ignore
//! {
//!     // decode a frame from the peer
//!     let frame = Frame::read_from(&mut reader).await?;
//!
//!     // encode a frame for another peer, tagged with the sender
//!     let bytes = frame.encode(b"Socket 1: ");
//! }
//! ```
//!
//! ## Relay layer
//!
//! - [`relay`]: connection registry, broadcast fan-out, server loop
//!
//! ```ignore
//! {
//!     let server = Server::bind(Config::default()).await?;
//!     server.run().await?;
//! }
//! ```

pub mod error;
pub mod frame;
pub mod handshake;
pub mod relay;
