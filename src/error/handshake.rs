use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum HandshakeError {
    // http error
    HttpMethod,

    HttpVersion,

    // websocket error
    SecWebSocketKey,

    // read
    RequestTooLarge,

    Httparse(httparse::Error),
}

impl Display for HandshakeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use HandshakeError::*;
        match self {
            // http error
            HttpMethod => write!(f, "Illegal http method"),

            HttpVersion => write!(f, "Illegal http version"),

            // websocket error
            SecWebSocketKey => {
                write!(f, "Missing sec-websocket-key header")
            }

            // other error
            RequestTooLarge => write!(f, "Upgrade request too large"),

            Httparse(e) => write!(f, "Http parse error: {}", e),
        }
    }
}

impl From<httparse::Error> for HandshakeError {
    fn from(e: httparse::Error) -> Self { HandshakeError::Httparse(e) }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let HandshakeError::Httparse(e) = self {
            Some(e)
        } else {
            None
        }
    }
}
