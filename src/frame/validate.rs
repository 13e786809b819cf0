//! Frame conformance checks.
//!
//! [RFC-6455 Section 5.5](https://datatracker.ietf.org/doc/html/rfc6455#section-5.5)
//! and [Section 7.4](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4).

use super::flag::OpCode;
use super::Frame;
use crate::error::FrameError;

/// Status codes recognized below the custom range.
///
/// Close codes split three ways: under 3000 only this list is
/// legal, 3000-4999 is open for applications, 5000 and up is
/// always rejected.
#[inline]
pub const fn is_recognized_close_code(code: u16) -> bool {
    matches!(
        code,
        1000 | 1001 | 1002 | 1003 | 1007 | 1008 | 1009 | 1010 | 1011
    )
}

/// Check a decoded frame against the protocol rules.
///
/// Checks run in a fixed order and the first violation wins; the
/// caller derives the close status from the returned error via
/// [`FrameError::close_code`].
pub fn validate(frame: &Frame) -> Result<(), FrameError> {
    if !frame.masked {
        return Err(FrameError::NotMasked);
    }

    if frame.is_control() {
        if frame.length > 125 {
            return Err(FrameError::ControlTooLong(frame.length));
        }
        if frame.is_fragment() {
            return Err(FrameError::FragmentedControl);
        }
    }

    if frame.has_reserved_opcode() {
        return Err(FrameError::ReservedOpCode(frame.opcode));
    }

    if frame.rsv != 0 {
        return Err(FrameError::ReservedBits(frame.rsv));
    }

    if frame.opcode == OpCode::Text as u8
        && !frame.is_fragment()
        && std::str::from_utf8(&frame.payload).is_err()
    {
        return Err(FrameError::InvalidUtf8Text);
    }

    if frame.opcode == OpCode::Close as u8 {
        if frame.length >= 2 {
            let code = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
            if code >= 5000 || (code < 3000 && !is_recognized_close_code(code)) {
                return Err(FrameError::IllegalCloseCode(code));
            }
            if frame.length > 2 && std::str::from_utf8(&frame.payload[2..]).is_err() {
                return Err(FrameError::InvalidUtf8Reason);
            }
        } else if frame.length == 1 {
            return Err(FrameError::TruncatedClose);
        }
    }

    Ok(())
}
