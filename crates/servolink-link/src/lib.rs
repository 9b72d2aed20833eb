//! Stream side of the servolink protocol.
//!
//! The codec never retries and never resynchronizes; this crate does. Bytes
//! from any `Read` stream are collected in a fixed [`RingBuffer`], and the
//! [`Scanner`] applies the link discipline to it:
//! - peek a header byte (bit 7 cleared) and look up the command's frame length
//! - wait until that many bytes are buffered
//! - verify the checksum, and on failure drop one byte and search again
//!
//! No frame delimiter exists besides the header marker, so this is the only
//! way back into sync after line noise.

pub mod config;
pub mod error;
pub mod reader;
pub mod ring;
pub mod scanner;
pub mod writer;

pub use config::{LinkConfig, DEFAULT_READ_CHUNK};
pub use error::{LinkError, Result};
pub use reader::{MessageReader, RawFrame};
pub use ring::{RingBuffer, DEFAULT_RING_SIZE};
pub use scanner::{LinkStats, Scanner};
pub use writer::MessageWriter;
