//! CRC-7 over one or two byte spans.
//!
//! The receive path works directly on a circular buffer, so a frame may be split
//! at the physical end of the ring. [`crc2`] accepts both halves and produces the
//! same value as [`crc`] over their concatenation.

/// Generator polynomial x^7 + x^3 + 1 (without the implicit x^7 term).
pub const POLYNOMIAL: u8 = 0x09;

/// Mask of the seven checksum bits.
pub const CRC_MASK: u8 = 0x7F;

/// Checksum of a single contiguous span.
pub fn crc(bytes: &[u8]) -> u8 {
    update(0, bytes)
}

/// Checksum of `first` followed by `second`.
pub fn crc2(first: &[u8], second: &[u8]) -> u8 {
    update(update(0, first), second)
}

/// The byte that carries `crc` on the wire: continuation marker plus the 7 checksum bits.
pub fn checksum_byte(crc: u8) -> u8 {
    0x80 | (crc & CRC_MASK)
}

fn update(mut state: u8, bytes: &[u8]) -> u8 {
    for &byte in bytes {
        for shift in (0..8).rev() {
            let incoming = (byte >> shift) & 1;
            let top = (state >> 6) & 1;
            state = (state << 1) & CRC_MASK;
            if incoming ^ top == 1 {
                state ^= POLYNOMIAL;
            }
        }
    }
    state
}
