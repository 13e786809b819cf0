//! Mask flag and key.
//!
//! Clients mask every frame they send with a 32-bit key; the
//! server unmasks on decode and never masks its own frames.

/// Generate a new random key.
#[inline]
pub fn new_key() -> [u8; 4] { rand::random::<[u8; 4]>() }

/// Mask the buffer, byte by byte.
///
/// Masking is involutive: applying the same key twice restores
/// the original bytes.
#[inline]
pub fn apply_mask(key: [u8; 4], buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i & 0x03];
    }
}
