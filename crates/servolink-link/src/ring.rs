use servolink_codec::MessageIn;

/// Default ring size, enough for many maximum-length frames.
pub const DEFAULT_RING_SIZE: usize = 256;

/// Fixed-size circular reception buffer.
///
/// One producer appends with [`RingBuffer::push`] and one consumer drains with
/// [`RingBuffer::consume`]. The buffer does no synchronization of its own; an
/// owner that feeds it from another execution context must serialize access.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize = DEFAULT_RING_SIZE> {
    storage: [u8; N],
    tail: usize,
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    pub fn new() -> Self {
        assert!(N > 0, "ring buffer needs a non-zero size");
        Self {
            storage: [0; N],
            tail: 0,
            len: 0,
        }
    }

    /// Append as much of `data` as fits; returns the number of bytes taken.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.free());
        let mut head = (self.tail + self.len) % N;
        for &byte in &data[..accepted] {
            self.storage[head] = byte;
            head = (head + 1) % N;
        }
        self.len += accepted;
        accepted
    }

    /// Drop `count` bytes from the front.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `count` bytes are buffered.
    pub fn consume(&mut self, count: usize) {
        assert!(
            count <= self.len,
            "cannot consume {count} bytes, only {} buffered",
            self.len
        );
        self.tail = (self.tail + count) % N;
        self.len -= count;
    }

    /// Buffered byte at `offset` from the front.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        (offset < self.len).then(|| self.storage[(self.tail + offset) % N])
    }

    /// Bytes committed by the producer and not yet consumed.
    pub fn available(&self) -> usize {
        self.len
    }

    pub fn free(&self) -> usize {
        N - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Physical index of the first buffered byte.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// The whole physical storage, for decoders addressing it modulo `N`.
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// Decoder positioned on the front of the buffer.
    pub fn decoder(&self) -> MessageIn<'_> {
        MessageIn::circular(&self.storage, self.tail)
    }

    pub fn clear(&mut self) {
        self.tail = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_consume_wrap() {
        let mut ring = RingBuffer::<4>::new();
        assert_eq!(ring.push(&[1, 2, 3]), 3);
        ring.consume(2);
        assert_eq!(ring.push(&[4, 5, 6]), 3);
        assert_eq!(ring.available(), 4);
        assert_eq!(ring.free(), 0);

        let collected: Vec<u8> = (0..4).filter_map(|i| ring.byte_at(i)).collect();
        assert_eq!(collected, vec![3, 4, 5, 6]);
        assert_eq!(ring.byte_at(4), None);
    }

    #[test]
    fn push_truncates_when_full() {
        let mut ring = RingBuffer::<3>::new();
        assert_eq!(ring.push(&[9; 5]), 3);
        assert_eq!(ring.push(&[1]), 0);
    }

    #[test]
    fn decoder_reads_from_tail() {
        let mut ring = RingBuffer::<4>::new();
        ring.push(&[0xFF, 0xFF, 0xFF]);
        ring.consume(3);
        ring.push(&[0x35, 0x81]);

        let msg = ring.decoder();
        assert_eq!(msg.header(), 0x35);
        assert_eq!(msg.byte(1), 0x81);
    }

    #[test]
    #[should_panic(expected = "cannot consume")]
    fn over_consume_panics() {
        let mut ring = RingBuffer::<4>::new();
        ring.push(&[1]);
        ring.consume(2);
    }

    #[test]
    fn clear_resets() {
        let mut ring: RingBuffer = RingBuffer::new();
        ring.push(&[1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.tail(), 0);
        assert_eq!(ring.capacity(), DEFAULT_RING_SIZE);
    }
}
