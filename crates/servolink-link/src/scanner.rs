use servolink_codec::command::{is_header, ANSWER_HEADER};
use servolink_codec::{Command, MessageIn, Protocol, HOST_TERMINATOR};
use tracing::{debug, trace, warn};

use crate::config::LinkConfig;
use crate::ring::RingBuffer;

/// Counters kept while scanning a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Candidate frames rejected by the checksum.
    pub checksum_errors: u64,
    /// Header bytes naming a command with no table entry.
    pub unknown_headers: u64,
    /// Bytes discarded while searching for a header.
    pub skipped_bytes: u64,
}

/// Locates verified frames in a ring buffer.
///
/// For every candidate it peeks the header, looks up the declared length,
/// waits until that many bytes have arrived and only then checks the checksum.
/// A checksum failure or an unknown command drops the candidate header byte and
/// resumes at the next byte with bit 7 cleared.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: LinkConfig,
    stats: LinkStats,
}

impl Scanner {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            stats: LinkStats::default(),
        }
    }

    /// Next complete query frame, consumed from `ring`.
    ///
    /// Returns `None` when more bytes are needed. The returned decoder is
    /// positioned on the first payload byte and borrows the ring, so the
    /// producer cannot overwrite the frame while it is being read.
    pub fn next_frame<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
    ) -> Option<MessageIn<'r>> {
        self.scan_queries(ring, Input::Open)
    }

    /// Next complete answer to a pending `query`, consumed from `ring`.
    ///
    /// Only frames with the answer header (0x00) qualify.
    pub fn next_answer<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
        query: Command,
    ) -> Option<MessageIn<'r>> {
        self.scan_answers(ring, query, Input::Open)
    }

    /// Like [`Scanner::next_frame`], once the stream has ended.
    ///
    /// A header whose declared length exceeds what is left can never complete,
    /// so it is dropped like a checksum failure. `None` means the ring is empty.
    pub fn drain_frame<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
    ) -> Option<MessageIn<'r>> {
        self.scan_queries(ring, Input::Ended)
    }

    /// Like [`Scanner::next_answer`], once the stream has ended.
    pub fn drain_answer<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
        query: Command,
    ) -> Option<MessageIn<'r>> {
        self.scan_answers(ring, query, Input::Ended)
    }

    fn scan_queries<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
        input: Input,
    ) -> Option<MessageIn<'r>> {
        let Self { config, stats } = self;
        let protocol = config.protocol;
        let lengths = &config.query_lengths;
        scan(stats, protocol, ring, input, |header| {
            lengths.length(protocol.command_of(header))
        })
    }

    fn scan_answers<'r, const N: usize>(
        &mut self,
        ring: &'r mut RingBuffer<N>,
        query: Command,
        input: Input,
    ) -> Option<MessageIn<'r>> {
        let length = self.config.answer_lengths.length(query.code());
        let protocol = self.config.protocol;
        scan(&mut self.stats, protocol, ring, input, |header| {
            if header == ANSWER_HEADER {
                length
            } else {
                0
            }
        })
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

/// Whether more bytes may still arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Open,
    Ended,
}

fn scan<'r, const N: usize>(
    stats: &mut LinkStats,
    protocol: Protocol,
    ring: &'r mut RingBuffer<N>,
    input: Input,
    length_of: impl Fn(u8) -> usize,
) -> Option<MessageIn<'r>> {
    let length = loop {
        let header = ring.byte_at(0)?;

        if protocol.has_terminator() && header == HOST_TERMINATOR {
            ring.consume(1);
            continue;
        }

        if !is_header(header) {
            trace!(byte = header, "skipping continuation byte");
            ring.consume(1);
            stats.skipped_bytes += 1;
            continue;
        }

        let length = length_of(header);
        if length == 0 || length > N {
            debug!(header, length, "no usable length for header, resynchronizing");
            ring.consume(1);
            stats.unknown_headers += 1;
            stats.skipped_bytes += 1;
            continue;
        }

        if ring.available() < length && input == Input::Open {
            return None;
        }

        let verdict = ring.decoder().verify(length);
        match verdict {
            Ok(()) => break length,
            Err(err) => {
                warn!(header, length, %err, "discarding frame, resynchronizing");
                ring.consume(1);
                stats.checksum_errors += 1;
                stats.skipped_bytes += 1;
            }
        }
    };

    let start = ring.tail();
    ring.consume(length);
    stats.frames += 1;

    let ring: &'r RingBuffer<N> = ring;
    Some(MessageIn::circular(ring.storage(), start))
}
