//! Command codes, header layouts and the command length tables.
//!
//! Device-addressed header (controller ↔ motor):
//!
//! ```text
//!  7   6 5 4   3 2 1 0
//! ┌───┬───────┬────────┐
//! │ 0 │  cmd  │   id   │
//! └───┴───────┴────────┘
//! ```
//!
//! Host-unified header (host ↔ controller): bit 7 is 0 and bits 6-0 are the
//! command. There is a single implicit peer, so no device id is carried.

use std::borrow::Cow;

use crate::error::CodecError;

/// Message format version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Control: 16-bit actuation, answered with angle and moment.
pub const CMD_CONTROL: u8 = 0;
/// Info: no payload, answered with three 16-bit state values.
pub const CMD_INFO: u8 = 1;
/// Write parameter: 16-bit index and 32-bit value, answered with the stored value.
pub const CMD_WRITE: u8 = 5;
/// Read parameter: 16-bit index, answered with the 32-bit value.
pub const CMD_READ: u8 = 6;
/// Firmware flash: 32-bit address and 32-bit word.
pub const CMD_FLASH: u8 = 7;

/// Device id after reset.
pub const DEVICE_DEFAULT: u8 = 0;
/// Universal id used by the bootloader during flashing.
pub const DEVICE_BROADCAST: u8 = 15;
/// Largest id that fits the 4-bit header field.
pub const DEVICE_ID_MAX: u8 = 0x0F;

/// Header of every answer.
pub const ANSWER_HEADER: u8 = 0x00;

/// Header of every flash-mode query: command 7 addressed to the broadcast id.
pub const FLASH_HEADER: u8 = 0x7F;

/// Encoded length of a flash query.
pub const FLASH_LENGTH: usize = 12;

/// Line terminator appended to host-unified frames.
pub const HOST_TERMINATOR: u8 = b'\n';

/// Marks a continuation byte.
pub const CONTINUATION_BIT: u8 = 0x80;

/// Device id carried in a device-addressed header.
pub fn header_id(header: u8) -> u8 {
    header & 0x0F
}

/// Command carried in a device-addressed header.
pub fn header_cmd(header: u8) -> u8 {
    (header >> 4) & 0x07
}

/// Build a device-addressed header.
pub fn device_header(cmd: u8, id: u8) -> u8 {
    ((cmd & 0x07) << 4) | (id & 0x0F)
}

/// True when `byte` can start a frame.
pub fn is_header(byte: u8) -> bool {
    byte & CONTINUATION_BIT == 0
}

/// Commands of the device-addressed protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Control,
    Info,
    Write,
    Read,
    Flash,
}

impl Command {
    /// All defined commands in code order.
    pub const ALL: [Command; 5] = [
        Command::Control,
        Command::Info,
        Command::Write,
        Command::Read,
        Command::Flash,
    ];

    /// Numeric header code.
    pub fn code(self) -> u8 {
        match self {
            Command::Control => CMD_CONTROL,
            Command::Info => CMD_INFO,
            Command::Write => CMD_WRITE,
            Command::Read => CMD_READ,
            Command::Flash => CMD_FLASH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Control => "CONTROL",
            Command::Info => "INFO",
            Command::Write => "WRITE",
            Command::Read => "READ",
            Command::Flash => "FLASH",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = CodecError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            CMD_CONTROL => Ok(Command::Control),
            CMD_INFO => Ok(Command::Info),
            CMD_WRITE => Ok(Command::Write),
            CMD_READ => Ok(Command::Read),
            CMD_FLASH => Ok(Command::Flash),
            other => Err(CodecError::UnknownCommand(other)),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns a human-readable name for a device-addressed command code.
pub fn command_name(code: u8) -> &'static str {
    match Command::try_from(code) {
        Ok(cmd) => cmd.name(),
        Err(_) if code <= 0x07 => "RESERVED",
        Err(_) => "UNKNOWN",
    }
}

/// How a header byte is interpreted.
///
/// A decoder instance uses one interpretation for its whole life; the two
/// layouts are never mixed on one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Command in bits 6-4, device id in bits 3-0.
    #[default]
    DeviceAddressed,
    /// Command in bits 6-0, frames followed by a line terminator.
    HostUnified,
}

impl Protocol {
    /// Command code carried by `header` under this layout.
    pub fn command_of(self, header: u8) -> u8 {
        match self {
            Protocol::DeviceAddressed => header_cmd(header),
            Protocol::HostUnified => header & 0x7F,
        }
    }

    /// Device id carried by `header`, if the layout has one.
    pub fn id_of(self, header: u8) -> Option<u8> {
        match self {
            Protocol::DeviceAddressed => Some(header_id(header)),
            Protocol::HostUnified => None,
        }
    }

    /// Whether frames carry a trailing line terminator.
    pub fn has_terminator(self) -> bool {
        matches!(self, Protocol::HostUnified)
    }
}

/// Command code → total encoded length of the frame, checksum included.
///
/// Codes beyond the table and reserved codes have length 0, meaning the frame
/// must never be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthTable {
    lengths: Cow<'static, [u8]>,
}

/// Query lengths of the device-addressed protocol.
pub const DEVICE_QUERY_LENGTHS: [u8; 8] = [5, 2, 0, 0, 0, 9, 5, FLASH_LENGTH as u8];

/// Answer lengths of the device-addressed protocol, keyed by the query command.
pub const DEVICE_ANSWER_LENGTHS: [u8; 8] = [7, 9, 0, 0, 0, 7, 7, 8];

impl LengthTable {
    /// Build a table from per-code lengths, indexed by command code.
    pub fn new(lengths: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            lengths: lengths.into(),
        }
    }

    /// Table over a static array, without allocating.
    pub const fn from_static(lengths: &'static [u8]) -> Self {
        Self {
            lengths: Cow::Borrowed(lengths),
        }
    }

    /// Lengths of device-addressed queries.
    pub const fn device_queries() -> Self {
        Self::from_static(&DEVICE_QUERY_LENGTHS)
    }

    /// Lengths of device-addressed answers, keyed by the query they answer.
    pub const fn device_answers() -> Self {
        Self::from_static(&DEVICE_ANSWER_LENGTHS)
    }

    /// Frame length for `code`, or 0 when the code must not be decoded.
    pub fn length(&self, code: u8) -> usize {
        self.lengths.get(code as usize).copied().unwrap_or(0) as usize
    }

    /// Like [`LengthTable::length`] but reports reserved codes as errors.
    pub fn require(&self, code: u8) -> Result<usize, CodecError> {
        match self.length(code) {
            0 => Err(CodecError::UnknownCommand(code)),
            n => Ok(n),
        }
    }

    /// Longest frame in the table.
    pub fn max_length(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0) as usize
    }

    /// Iterate `(code, length)` over codes with a non-zero entry.
    pub fn entries(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.lengths
            .iter()
            .enumerate()
            .filter(|(_, len)| **len != 0)
            .map(|(code, len)| (code as u8, *len as usize))
    }
}

impl Default for LengthTable {
    fn default() -> Self {
        Self::device_queries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_roundtrip() {
        let header = device_header(CMD_WRITE, 9);
        assert!(is_header(header));
        assert_eq!(header_cmd(header), CMD_WRITE);
        assert_eq!(header_id(header), 9);
    }

    #[test]
    fn flash_header_is_broadcast_flash() {
        assert_eq!(device_header(CMD_FLASH, DEVICE_BROADCAST), FLASH_HEADER);
    }

    #[test]
    fn device_header_masks_out_of_range_fields() {
        let header = device_header(0xFF, 0xFF);
        assert!(is_header(header));
        assert_eq!(header, 0x7F);
    }

    #[test]
    fn reserved_codes_have_zero_length() {
        let table = LengthTable::device_queries();
        for code in 2..=4 {
            assert_eq!(table.length(code), 0);
            assert!(matches!(
                table.require(code),
                Err(CodecError::UnknownCommand(c)) if c == code
            ));
        }
        assert_eq!(table.length(200), 0);
    }

    #[test]
    fn known_lengths() {
        let table = LengthTable::default();
        assert_eq!(table.length(CMD_CONTROL), 5);
        assert_eq!(table.length(CMD_INFO), 2);
        assert_eq!(table.length(CMD_WRITE), 9);
        assert_eq!(table.length(CMD_READ), 5);
        assert_eq!(table.length(CMD_FLASH), FLASH_LENGTH);
        assert_eq!(table.max_length(), FLASH_LENGTH);
        assert_eq!(table.entries().count(), 5);
    }

    #[test]
    fn command_codes_and_names() {
        for cmd in Command::ALL {
            assert_eq!(Command::try_from(cmd.code()).unwrap(), cmd);
        }
        assert_eq!(command_name(3), "RESERVED");
        assert_eq!(command_name(42), "UNKNOWN");
        assert_eq!(Command::Write.to_string(), "WRITE");
    }

    #[test]
    fn protocol_header_interpretation() {
        assert_eq!(Protocol::DeviceAddressed.command_of(0x53), 5);
        assert_eq!(Protocol::DeviceAddressed.id_of(0x53), Some(3));
        assert_eq!(Protocol::HostUnified.command_of(0x53), 0x53);
        assert_eq!(Protocol::HostUnified.id_of(0x53), None);
        assert!(Protocol::HostUnified.has_terminator());
        assert!(!Protocol::default().has_terminator());
    }
}
