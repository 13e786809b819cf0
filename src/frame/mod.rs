//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! :                     Payload Data continued ...                :
//! + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
//! |                     Payload Data continued ...                |
//! +---------------------------------------------------------------+
//! ```
//!

pub mod flag;
pub mod length;
pub mod mask;
pub mod validate;

pub use flag::{Fin, OpCode};
pub use length::PayloadLen;
pub use mask::{apply_mask, new_key};
pub use validate::validate;

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Error;

/// Bound on a single transport read while collecting a payload.
pub const READ_CHUNK: usize = 4096;

/// A decoded websocket frame.
///
/// The payload is stored unmasked; the mask key is consumed
/// during decoding and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: Fin,
    /// Raw 4-bit opcode. Reserved values survive decoding and are
    /// rejected by [`validate`].
    pub opcode: u8,
    /// Raw RSV1-RSV3 bits, byte0 bits 6-4.
    pub rsv: u8,
    pub masked: bool,
    /// Payload byte count, equals `payload.len()` after decoding.
    pub length: u64,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Single-frame message with the given opcode.
    pub fn message(opcode: OpCode, payload: Vec<u8>) -> Self {
        Frame {
            fin: Fin::Y,
            opcode: opcode as u8,
            rsv: 0,
            masked: false,
            length: payload.len() as u64,
            payload,
        }
    }

    /// Close frame carrying a status code and an optional reason.
    pub fn close(code: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::message(OpCode::Close, payload)
    }

    /// Close, ping and pong are control frames.
    #[inline]
    pub const fn is_control(&self) -> bool { matches!(self.opcode, 0x08..=0x0a) }

    /// More frames of the same message follow.
    #[inline]
    pub const fn is_fragment(&self) -> bool { matches!(self.fin, Fin::N) }

    /// Opcode outside the values the protocol defines.
    #[inline]
    pub const fn has_reserved_opcode(&self) -> bool { OpCode::from_flag(self.opcode).is_none() }

    /// Decode one frame from the peer.
    ///
    /// The decoder treats every inbound frame as masked and always
    /// consumes a 4-byte key; a clear mask bit is reported by the
    /// validator, not here. Conformance checks run before the frame
    /// is returned, so an `Err(Error::Frame(..))` still means the
    /// frame's bytes left the stream and the caller can answer with
    /// the matching close status.
    pub async fn read_from<R>(rd: &mut R) -> Result<Self, Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut head = [0u8; 2];
        rd.read_exact(&mut head).await?;

        let fin = Fin::from_flag(head[0]);
        let opcode = head[0] & 0x0f;
        let rsv = (head[0] & 0x70) >> 4;
        let masked = head[1] & 0x80 == 0x80;

        let length = match PayloadLen::from_flag(head[1]) {
            PayloadLen::Standard(v) => v as u64,
            PayloadLen::Extended1(_) => {
                let mut ext = [0u8; 2];
                rd.read_exact(&mut ext).await?;
                PayloadLen::from_byte2(ext).to_num()
            }
            PayloadLen::Extended2(_) => {
                let mut ext = [0u8; 8];
                rd.read_exact(&mut ext).await?;
                PayloadLen::from_byte8(ext).to_num()
            }
        };

        let mut key = [0u8; 4];
        rd.read_exact(&mut key).await?;

        let mut payload = read_payload(rd, length).await?;
        apply_mask(key, &mut payload);

        let frame = Frame {
            fin,
            opcode,
            rsv,
            masked,
            length,
            payload,
        };

        validate(&frame)?;
        Ok(frame)
    }

    /// Encode for transmission, prefixing `tag` onto the payload.
    ///
    /// The stored payload is left untouched; sender identity rides
    /// along only on the wire. Outbound frames are always final and
    /// unmasked, an inbound fragment flag is not carried over.
    pub fn encode(&self, tag: &[u8]) -> Vec<u8> {
        let length = (tag.len() + self.payload.len()) as u64;
        let mut buf = Vec::with_capacity(10 + tag.len() + self.payload.len());

        buf.push(0x80 | self.opcode);

        let len = PayloadLen::from_num(length);
        buf.push(len.to_flag());
        match len {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => buf.extend_from_slice(&v.to_be_bytes()),
            PayloadLen::Extended2(v) => buf.extend_from_slice(&v.to_be_bytes()),
        }

        buf.extend_from_slice(tag);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Collect exactly `length` payload bytes, at most [`READ_CHUNK`]
/// per read, tolerating a stream that delivers less than asked.
async fn read_payload<R>(rd: &mut R, length: u64) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let length = usize::try_from(length)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload length overflow"))?;

    let mut data = Vec::with_capacity(length.min(READ_CHUNK));
    let mut chunk = [0u8; READ_CHUNK];

    while data.len() < length {
        let want = (length - data.len()).min(READ_CHUNK);
        let n = rd.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed mid-frame",
            ));
        }
        data.extend_from_slice(&chunk[..n]);
    }

    Ok(data)
}
