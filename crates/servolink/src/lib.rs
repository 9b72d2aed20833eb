//! Self-framing bit-packed protocol for servo controller links.
//!
//! # Crate Structure
//!
//! - [`codec`]: Bit packer/unpacker, checksum, command length tables, typed messages
//! - [`link`]: Ring buffer, resynchronizing scanner, stream reader and writer

/// Re-export codec types.
pub mod codec {
    pub use servolink_codec::*;
}

/// Re-export link types.
pub mod link {
    pub use servolink_link::*;
}
