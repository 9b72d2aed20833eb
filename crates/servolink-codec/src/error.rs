/// Errors reported while interpreting a received frame.
///
/// Encoder misuse (overflowing the fixed output buffer) is a programming
/// defect and panics instead of producing one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The trailing checksum byte does not match the frame contents.
    #[error("checksum mismatch (expected 0x{expected:02X}, found 0x{found:02X})")]
    ChecksumMismatch { expected: u8, found: u8 },

    /// The header names a reserved or unknown command (length table entry 0).
    #[error("unknown or reserved command code {0}")]
    UnknownCommand(u8),

    /// The first byte of the frame has its continuation bit set.
    #[error("byte 0x{0:02X} is not a frame header")]
    NotAHeader(u8),

    /// An answer was expected but the header is not the answer header.
    #[error("header 0x{0:02X} does not start an answer")]
    NotAnAnswer(u8),

    /// Fewer bytes are available than the command's declared length.
    #[error("incomplete frame ({available} of {needed} bytes)")]
    Incomplete { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
