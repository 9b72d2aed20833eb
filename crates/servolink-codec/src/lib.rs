//! Self-framing, bit-packed message codec for servo controller links.
//!
//! The link is a continuously running byte stream with no idle gaps, so the
//! frame boundary is carried in the data itself:
//! - The header byte of a frame has bit 7 cleared.
//! - Every other byte of the frame has bit 7 set and carries 7 payload bits.
//! - A frame ends with a CRC-7 checksum byte; its total length is fixed per
//!   command and given by a [`LengthTable`].
//!
//! [`MessageOut`] packs fields into a fixed-capacity buffer. [`MessageIn`]
//! unpacks them straight from a flat slice or a circular reception buffer,
//! including checksum verification across the ring's wrap point.

pub mod actuation;
pub mod checksum;
pub mod command;
pub mod error;
pub mod message;
pub mod packer;
pub mod unpacker;

pub use actuation::{Actuation, SpecialMode};
pub use checksum::{crc, crc2};
pub use command::{
    command_name, Command, LengthTable, Protocol, ANSWER_HEADER, CMD_CONTROL, CMD_FLASH, CMD_INFO,
    CMD_READ, CMD_WRITE, DEVICE_BROADCAST, DEVICE_DEFAULT, FLASH_HEADER, HOST_TERMINATOR, PROTOCOL_VERSION,
};
pub use error::{CodecError, Result};
pub use message::{Answer, Query};
pub use packer::{MessageOut, MAX_FRAME_SIZE};
pub use unpacker::MessageIn;
