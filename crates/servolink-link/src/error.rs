use servolink_codec::CodecError;

/// Errors that can occur while reading or writing frames on a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A located frame could not be interpreted.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error occurred on the underlying stream.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, LinkError>;
