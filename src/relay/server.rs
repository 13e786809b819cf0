//! Accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::TcpListener;

use super::{connection, Config, Registry};

/// Listening relay server.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: Config,
}

impl Server {
    /// Bind the configured address.
    pub async fn bind(config: Config) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        Ok(Server {
            listener,
            registry: Arc::new(Registry::new()),
            config,
        })
    }

    /// Actual bound address, useful with a `:0` port.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Shared connection registry.
    pub fn registry(&self) -> Arc<Registry> { self.registry.clone() }

    /// Accept connections forever, one session task per peer.
    ///
    /// A failed accept is logged and retried; no per-connection
    /// error ever reaches this loop.
    pub async fn run(self) -> io::Result<()> {
        info!("listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("tcp accepted: {}", addr);
                    tokio::spawn(connection::serve(
                        stream,
                        self.registry.clone(),
                        self.config.clone(),
                    ));
                }
                Err(e) => warn!("accept failed: {}", e),
            }
        }
    }
}
