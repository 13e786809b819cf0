//! Connection registry and broadcast fan-out.
//!
//! The registry is the only state shared between connection
//! tasks. Membership and iteration happen under a mutex; delivery
//! to a peer is a non-blocking push onto that peer's outbound
//! queue, drained by the peer's own writer task. No task ever
//! writes to another connection's transport.

pub mod connection;
pub mod server;

pub use connection::Connection;
pub use server::Server;

use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use crate::frame::Frame;

/// Relay settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on, `host:port`.
    pub address: String,
    /// Per-connection limit on waiting for the next frame; also
    /// bounds the handshake.
    pub read_timeout: Duration,
    /// Per-connection limit on draining one outbound write.
    pub write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: "localhost:8080".to_string(),
            read_timeout: Duration::from_secs(600),
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// One registered peer: its display tag and outbound queue.
struct Peer {
    id: u64,
    tag: String,
    queue: UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    peers: Vec<Peer>,
    next_id: u64,
}

/// Process-wide set of live connections.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Register a peer queue; returns its id and display tag.
    ///
    /// The tag reflects the registry size at the moment of
    /// joining, so a name can recur once older peers have left.
    pub fn join(&self, queue: UnboundedSender<Vec<u8>>) -> (u64, String) {
        let mut inner = self.inner.lock().unwrap();

        inner.next_id += 1;
        let id = inner.next_id;
        let tag = format!("Socket {}: ", inner.peers.len() + 1);

        inner.peers.push(Peer {
            id,
            tag: tag.clone(),
            queue,
        });
        (id, tag)
    }

    /// Relay a frame to every peer except the sender, tagged with
    /// the sender's name.
    ///
    /// A peer whose queue is gone is swept from the registry after
    /// the pass; one dead recipient never blocks delivery to the
    /// rest.
    pub fn broadcast(&self, frame: &Frame, sender: u64) {
        let mut inner = self.inner.lock().unwrap();

        let bytes = match inner.peers.iter().find(|p| p.id == sender) {
            Some(peer) => frame.encode(peer.tag.as_bytes()),
            None => return,
        };

        let mut stale = Vec::new();
        for peer in inner.peers.iter().filter(|p| p.id != sender) {
            if peer.queue.send(bytes.clone()).is_err() {
                debug!("{}unreachable, dropping", peer.tag);
                stale.push(peer.id);
            }
        }
        inner.peers.retain(|p| !stale.contains(&p.id));
    }

    /// Remove a peer. Its writer task drains whatever was already
    /// queued and shuts the transport down once every queue sender
    /// is gone.
    pub fn leave(&self, id: u64) {
        self.inner.lock().unwrap().peers.retain(|p| p.id != id);
    }

    /// Number of live connections.
    pub fn len(&self) -> usize { self.inner.lock().unwrap().peers.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
