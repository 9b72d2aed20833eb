use std::io::{ErrorKind, Read};

use bytes::Bytes;
use servolink_codec::{Answer, Command, MessageIn, Protocol, Query};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::ring::RingBuffer;
use crate::scanner::{LinkStats, Scanner};

const MAX_READ_CHUNK: usize = 256;

/// A verified frame copied out of the reception buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Header layout the frame was scanned with.
    pub protocol: Protocol,
    /// Frame bytes, header through checksum.
    pub bytes: Bytes,
}

impl RawFrame {
    fn copy_from(msg: &MessageIn<'_>, len: usize, protocol: Protocol) -> Self {
        let bytes: Vec<u8> = (0..len).map(|i| msg.byte(i)).collect();
        Self {
            protocol,
            bytes: Bytes::from(bytes),
        }
    }

    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// Command code under the frame's header layout.
    pub fn command(&self) -> u8 {
        self.protocol.command_of(self.header())
    }

    /// Device id, for device-addressed frames.
    pub fn id(&self) -> Option<u8> {
        self.protocol.id_of(self.header())
    }

    /// Payload bytes between the header and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..self.bytes.len() - 1]
    }

    /// Decoder over the frame, positioned on the first payload byte.
    pub fn decoder(&self) -> MessageIn<'_> {
        MessageIn::new(&self.bytes)
    }
}

/// Reads verified frames from any `Read` byte stream.
///
/// Incoming bytes land in a [`RingBuffer`]; a [`Scanner`] locates frames in it
/// and resynchronizes on corrupted input, so callers only ever see frames that
/// passed the checksum.
pub struct MessageReader<T, const N: usize = { crate::ring::DEFAULT_RING_SIZE }> {
    inner: T,
    ring: RingBuffer<N>,
    scanner: Scanner,
    ended: bool,
}

impl<T: Read, const N: usize> MessageReader<T, N> {
    /// Create a reader for the device-addressed protocol.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LinkConfig::default())
    }

    pub fn with_config(inner: T, config: LinkConfig) -> Self {
        Self {
            inner,
            ring: RingBuffer::new(),
            scanner: Scanner::new(config),
            ended: false,
        }
    }

    /// Read and decode the next query (blocking).
    ///
    /// Returns `Err(LinkError::ConnectionClosed)` when EOF is reached.
    pub fn read_query(&mut self) -> Result<Query> {
        loop {
            let next = scan_frame(&mut self.scanner, &mut self.ring, self.ended);
            if let Some(mut msg) = next {
                let lengths = &self.scanner.config().query_lengths;
                return Query::decode(&mut msg, lengths).map_err(LinkError::from);
            }
            self.fill()?;
        }
    }

    /// Read and decode the answer to a pending `query` (blocking).
    pub fn read_answer(&mut self, query: Command) -> Result<Answer> {
        self.scanner.config().answer_lengths.require(query.code())?;
        loop {
            let next = scan_answer(&mut self.scanner, &mut self.ring, query, self.ended);
            if let Some(mut msg) = next {
                let lengths = &self.scanner.config().answer_lengths;
                return Answer::decode(&mut msg, query, lengths).map_err(LinkError::from);
            }
            self.fill()?;
        }
    }

    /// Read the next verified query frame without interpreting its payload.
    pub fn read_frame(&mut self) -> Result<RawFrame> {
        loop {
            let protocol = self.scanner.config().protocol;
            let next = scan_frame(&mut self.scanner, &mut self.ring, self.ended);
            if let Some(msg) = next {
                let len = self
                    .scanner
                    .config()
                    .query_lengths
                    .length(protocol.command_of(msg.header()));
                return Ok(RawFrame::copy_from(&msg, len, protocol));
            }
            self.fill()?;
        }
    }

    /// Read the next verified answer frame to a pending `query` without
    /// interpreting its payload.
    pub fn read_answer_frame(&mut self, query: Command) -> Result<RawFrame> {
        let protocol = self.scanner.config().protocol;
        let len = self
            .scanner
            .config()
            .answer_lengths
            .require(query.code())?;
        loop {
            let next = scan_answer(&mut self.scanner, &mut self.ring, query, self.ended);
            if let Some(msg) = next {
                return Ok(RawFrame::copy_from(&msg, len, protocol));
            }
            self.fill()?;
        }
    }

    /// Read more bytes into the ring. Once the stream has ended, the ring is
    /// drained before `ConnectionClosed` is reported.
    fn fill(&mut self) -> Result<()> {
        if self.ended {
            return Err(LinkError::ConnectionClosed);
        }

        let want = self
            .scanner
            .config()
            .read_chunk_size
            .clamp(1, MAX_READ_CHUNK)
            .min(self.ring.free());
        let mut chunk = [0u8; MAX_READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => {
                    self.ended = true;
                    if self.ring.is_empty() {
                        return Err(LinkError::ConnectionClosed);
                    }
                    debug!(buffered = self.ring.available(), "end of input, draining");
                    return Ok(());
                }
                Ok(n) => {
                    self.ring.push(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    /// Counters of the underlying scanner.
    pub fn stats(&self) -> LinkStats {
        self.scanner.stats()
    }

    /// Bytes received but not yet consumed as frames.
    pub fn buffered(&self) -> usize {
        self.ring.available()
    }

    pub fn config(&self) -> &LinkConfig {
        self.scanner.config()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn scan_frame<'r, const N: usize>(
    scanner: &mut Scanner,
    ring: &'r mut RingBuffer<N>,
    ended: bool,
) -> Option<MessageIn<'r>> {
    if ended {
        scanner.drain_frame(ring)
    } else {
        scanner.next_frame(ring)
    }
}

fn scan_answer<'r, const N: usize>(
    scanner: &mut Scanner,
    ring: &'r mut RingBuffer<N>,
    query: Command,
    ended: bool,
) -> Option<MessageIn<'r>> {
    if ended {
        scanner.drain_answer(ring, query)
    } else {
        scanner.next_answer(ring, query)
    }
}
