use servolink_codec::{LengthTable, Protocol};

/// Default number of bytes requested from the stream per read.
pub const DEFAULT_READ_CHUNK: usize = 64;

/// Configuration shared by the scanner and the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Header layout of the stream.
    pub protocol: Protocol,
    /// Frame lengths of incoming queries, keyed by header command.
    pub query_lengths: LengthTable,
    /// Frame lengths of incoming answers, keyed by the command of the pending query.
    pub answer_lengths: LengthTable,
    /// Upper bound on bytes pulled from the stream per read call.
    pub read_chunk_size: usize,
}

impl LinkConfig {
    /// Host-unified link with a caller-supplied command catalog.
    pub fn host(query_lengths: LengthTable, answer_lengths: LengthTable) -> Self {
        Self {
            protocol: Protocol::HostUnified,
            query_lengths,
            answer_lengths,
            ..Self::default()
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::DeviceAddressed,
            query_lengths: LengthTable::device_queries(),
            answer_lengths: LengthTable::device_answers(),
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}
