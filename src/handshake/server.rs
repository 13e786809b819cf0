//! Server handshake.
//!
//! From [RFC-6455 Section 4.2](https://datatracker.ietf.org/doc/html/rfc6455#section-4.2):
//!
//! When a client starts a WebSocket connection, it sends its part of the
//! opening handshake.  The server must parse at least part of this
//! handshake in order to obtain the necessary information to generate
//! the server part of the handshake.
//!
//! If the server chooses to accept the incoming connection, it MUST
//! reply with a valid HTTP response.
//!
//! Example:
//!
//! ```text
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: WebSocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```
//!

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::key::derive_accept_key;
use super::{HEADER_SEC_WEBSOCKET_KEY, HTTP_METHOD, HTTP_STATUS_LINE};
use super::{MAX_ALLOW_HEADERS, MAX_REQUEST_SIZE};
use crate::error::{Error, HandshakeError};

/// Parsed client upgrade request.
///
/// Headers are read-only once the handshake completes.
#[derive(Debug)]
pub struct Upgrade {
    pub path: String,
    pub sec_key: String,
    pub headers: Vec<(String, String)>,
}

impl Upgrade {
    /// Look up a header value, name compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read the client upgrade request and reply with the
/// switching-protocols response.
///
/// Requires a GET request over HTTP/1.1 carrying a
/// `sec-websocket-key` header. The response is flushed before
/// returning; nothing else is read from or written to the stream
/// until then. Any failure here is fatal to this connection only.
pub async fn accept<S>(io: &mut S) -> Result<Upgrade, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let upgrade = read_request(io).await?;

    let accept = derive_accept_key(upgrade.sec_key.as_bytes());
    let response = format!(
        "{HTTP_STATUS_LINE}\r\n\
         Upgrade: WebSocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\
         \r\n"
    );

    io.write_all(response.as_bytes()).await?;
    io.flush().await?;

    Ok(upgrade)
}

/// Accumulate bytes until httparse sees a complete request, then
/// pull out the fields the upgrade needs.
async fn read_request<S>(io: &mut S) -> Result<Upgrade, Error>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = io.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream closed during handshake",
            )
            .into());
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; MAX_ALLOW_HEADERS];
        let mut request = httparse::Request::new(&mut headers);

        match request.parse(&buf).map_err(HandshakeError::from)? {
            httparse::Status::Partial => {
                if buf.len() > MAX_REQUEST_SIZE {
                    return Err(HandshakeError::RequestTooLarge.into());
                }
            }
            httparse::Status::Complete(_) => {
                if request.method != Some(HTTP_METHOD) {
                    return Err(HandshakeError::HttpMethod.into());
                }
                if request.version != Some(1) {
                    return Err(HandshakeError::HttpVersion.into());
                }

                let headers: Vec<(String, String)> = request
                    .headers
                    .iter()
                    .map(|h| {
                        (
                            h.name.to_string(),
                            String::from_utf8_lossy(h.value).into_owned(),
                        )
                    })
                    .collect();

                let sec_key = headers
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(HEADER_SEC_WEBSOCKET_KEY))
                    .map(|(_, v)| v.clone())
                    .ok_or(HandshakeError::SecWebSocketKey)?;

                return Ok(Upgrade {
                    path: request.path.unwrap_or("/").to_string(),
                    sec_key,
                    headers,
                });
            }
        }
    }
}
