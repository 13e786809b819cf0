//! One peer session.
//!
//! A connection owns its socket exclusively: the receive loop
//! reads frames from one half while a writer task drains the
//! outbound queue into the other. Teardown is always local; a
//! misbehaving peer never takes anyone else down.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;

use super::{Config, Registry};
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::handshake;

/// Payload closing the sender's own session.
pub const EXIT: &[u8] = b"EXIT";

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Handshaking,
    Open,
    Closing,
    Closed,
}

/// One live peer session.
pub struct Connection {
    id: u64,
    tag: String,
    /// Most recent close-code candidate; 1000 until a violation
    /// is recorded.
    status: u16,
    headers: Vec<(String, String)>,
    queue: UnboundedSender<Vec<u8>>,
    registry: Arc<Registry>,
    config: Config,
}

/// Drive one accepted socket through handshake, receive loop and
/// teardown. Every exit path unregisters the session.
pub async fn serve(stream: TcpStream, registry: Arc<Registry>, config: Config) {
    let state = State::Handshaking;

    match Connection::accept(stream, registry, config).await {
        Ok((conn, rd)) => conn.run(rd).await,
        // never registered, nobody else notices
        Err(e) => debug!("{:?} failed: {}", state, e),
    }
}

impl Connection {
    /// Complete the upgrade, register with the registry and start
    /// the writer task. Returns the session and its read half.
    pub async fn accept(
        mut stream: TcpStream,
        registry: Arc<Registry>,
        config: Config,
    ) -> Result<(Self, OwnedReadHalf), Error> {
        let upgrade = match timeout(config.read_timeout, handshake::accept(&mut stream)).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "handshake timed out",
                )
                .into())
            }
        };

        let (rd, wr) = stream.into_split();
        let (tx, rx) = unbounded_channel();

        let (id, tag) = registry.join(tx.clone());
        debug!("{}joined on {} ({} online)", tag, upgrade.path, registry.len());

        tokio::spawn(write_loop(wr, rx, config.write_timeout, tag.clone()));

        Ok((
            Connection {
                id,
                tag,
                status: 1000,
                headers: upgrade.headers,
                queue: tx,
                registry,
                config,
            },
            rd,
        ))
    }

    /// Upgrade request headers, read-only after the handshake.
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Receive loop: decode, screen, relay, until the session
    /// leaves the open state.
    pub async fn run(mut self, mut rd: OwnedReadHalf) {
        let mut state = State::Open;

        while state == State::Open {
            state = match timeout(self.config.read_timeout, Frame::read_from(&mut rd)).await {
                Ok(Ok(frame)) => self.dispatch(frame),
                Ok(Err(Error::Frame(violation))) => {
                    warn!("{}{}", self.tag, violation);
                    self.status = violation.close_code();
                    self.send_close();
                    State::Closing
                }
                Ok(Err(e)) => {
                    debug!("{}gone: {}", self.tag, e);
                    State::Closing
                }
                Err(_) => {
                    debug!("{}idle too long", self.tag);
                    State::Closing
                }
            };
        }

        self.registry.leave(self.id);
        state = State::Closed;
        debug!(
            "{}{:?} with status {}, {} remain",
            self.tag,
            state,
            self.status,
            self.registry.len()
        );
    }

    /// Screen one validated frame: the EXIT sentinel and close
    /// frames end the session, everything else is relayed.
    fn dispatch(&mut self, frame: Frame) -> State {
        if frame.payload == EXIT {
            debug!("{}exit", self.tag);
            return State::Closing;
        }

        if frame.opcode == OpCode::Close as u8 {
            debug!("{}close frame", self.tag);
            self.send_close();
            return State::Closing;
        }

        self.registry.broadcast(&frame, self.id);
        State::Open
    }

    /// Queue a close frame carrying the current status code.
    fn send_close(&self) {
        let bytes = Frame::close(self.status, "").encode(b"");
        let _ = self.queue.send(bytes);
    }
}

/// Drain the outbound queue into the socket, one buffered write
/// and flush per frame. Ends when every queue sender is gone or
/// the peer stops taking bytes.
async fn write_loop(
    wr: OwnedWriteHalf,
    mut rx: UnboundedReceiver<Vec<u8>>,
    write_timeout: Duration,
    tag: String,
) {
    let mut wr = BufWriter::new(wr);

    while let Some(bytes) = rx.recv().await {
        let res = timeout(write_timeout, async {
            wr.write_all(&bytes).await?;
            wr.flush().await
        })
        .await;

        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("{}write failed: {}", tag, e);
                break;
            }
            Err(_) => {
                debug!("{}write timed out", tag);
                break;
            }
        }
    }

    let _ = wr.shutdown().await;
}
