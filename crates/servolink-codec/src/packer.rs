use crate::checksum::{checksum_byte, crc};
use crate::command::{device_header, ANSWER_HEADER, CONTINUATION_BIT, HOST_TERMINATOR};

/// Payload bits carried by every byte.
pub const BITS_PER_BYTE: u32 = 7;

/// Capacity of the default encoder: the longest frame (flash, 12 bytes) plus
/// the host line terminator, rounded up.
pub const MAX_FRAME_SIZE: usize = 16;

/// Encoder for one outgoing frame.
///
/// Every `begin_*` call resets the encoder and writes the header byte, which
/// counts as full. Values added afterwards are split most-significant bit first
/// into the low 7 bits of continuation bytes, so the top bit of every byte after
/// the header is 1. [`MessageOut::end`] pads the last byte with zero bits and
/// appends the checksum.
///
/// The buffer has a fixed capacity `N`. Frame shapes are known statically, so
/// writing past it is a programming error and panics.
#[derive(Debug, Clone)]
pub struct MessageOut<const N: usize = MAX_FRAME_SIZE> {
    buf: [u8; N],
    len: usize,
    used_bits: u32,
}

impl<const N: usize> MessageOut<N> {
    /// Create an empty encoder. Call one of the `begin_*` methods before adding values.
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
            used_bits: BITS_PER_BYTE,
        }
    }

    /// Start a device-addressed query for command `cmd` sent to device `id`.
    pub fn begin_query(&mut self, cmd: u8, id: u8) {
        self.start(device_header(cmd, id));
    }

    /// Start an answer. Answers carry an empty header; the receiver knows which
    /// query it is waiting for.
    pub fn begin_answer(&mut self) {
        self.start(ANSWER_HEADER);
    }

    /// Start a host-unified query: the whole header is the command.
    pub fn host_begin_query(&mut self, cmd: u8) {
        self.start(cmd & 0x7F);
    }

    /// Start a host-unified answer.
    pub fn host_begin_answer(&mut self) {
        self.begin_answer();
    }

    fn start(&mut self, header: u8) {
        self.len = 0;
        self.push_byte(header & !CONTINUATION_BIT);
        self.used_bits = BITS_PER_BYTE;
    }

    /// Append the low `bits` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `bits` exceeds 32, if no frame was started, or if the frame
    /// outgrows the buffer.
    pub fn add_int_n(&mut self, value: u32, bits: u32) {
        assert!(bits <= 32, "field width {bits} exceeds 32 bits");
        assert!(self.len > 0, "begin_query/begin_answer must precede add_int_n");

        let value = u64::from(value);
        let mut remaining = bits;
        while remaining > 0 {
            if self.used_bits == BITS_PER_BYTE {
                self.push_byte(CONTINUATION_BIT);
                self.used_bits = 0;
            }
            let free = BITS_PER_BYTE - self.used_bits;
            let take = free.min(remaining);
            let chunk = (value >> (remaining - take)) & ((1u64 << take) - 1);
            self.buf[self.len - 1] |= (chunk << (free - take)) as u8;
            self.used_bits += take;
            remaining -= take;
        }
    }

    pub fn add_int8(&mut self, value: u8) {
        self.add_int_n(u32::from(value), 8);
    }

    pub fn add_int16(&mut self, value: u16) {
        self.add_int_n(u32::from(value), 16);
    }

    pub fn add_int32(&mut self, value: u32) {
        self.add_int_n(value, 32);
    }

    /// Append the IEEE-754 bit pattern of `value`.
    pub fn add_float(&mut self, value: f32) {
        self.add_int32(value.to_bits());
    }

    /// Append raw bytes, 8 bits each.
    pub fn add_block(&mut self, block: &[u8]) {
        for &byte in block {
            self.add_int8(byte);
        }
    }

    /// Finish the frame: pad the current byte and append the checksum.
    pub fn end(&mut self) {
        let sum = crc(&self.buf[..self.len]);
        self.push_byte(checksum_byte(sum));
        self.used_bits = BITS_PER_BYTE;
    }

    /// Finish a host-unified frame: checksum followed by the line terminator.
    pub fn host_end(&mut self) {
        self.end();
        self.push_byte(HOST_TERMINATOR);
    }

    /// Number of bytes written so far.
    pub fn length(&self) -> usize {
        self.len
    }

    /// The encoded bytes written so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Fixed capacity of the output buffer.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn push_byte(&mut self, byte: u8) {
        assert!(
            self.len < N,
            "frame exceeds encoder capacity of {N} bytes"
        );
        self.buf[self.len] = byte;
        self.len += 1;
    }
}

impl<const N: usize> Default for MessageOut<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AsRef<[u8]> for MessageOut<N> {
    fn as_ref(&self) -> &[u8] {
        self.buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::crc;
    use crate::command::CMD_CONTROL;

    #[test]
    fn header_only_frame() {
        let mut out: MessageOut = MessageOut::new();
        out.begin_query(1, 4);
        out.end();

        assert_eq!(out.length(), 2);
        assert_eq!(out.buffer()[0], 0x14);
        assert_eq!(out.buffer()[1], 0x80 | crc(&[0x14]));
    }

    #[test]
    fn sixteen_bits_span_three_bytes() {
        let mut out: MessageOut = MessageOut::new();
        out.begin_query(CMD_CONTROL, 3);
        out.add_int16(20000);

        // 0x4E20 = 0100111 | 0001000 | 00
        assert_eq!(out.buffer(), &[0x03, 0xA7, 0x88, 0x80]);
    }

    #[test]
    fn partial_byte_carries_over_between_calls() {
        let mut out: MessageOut = MessageOut::new();
        out.begin_answer();
        out.add_int_n(0b101, 3);
        out.add_int_n(0b1111, 4);
        assert_eq!(out.buffer(), &[0x00, 0xDF]);

        out.add_int_n(1, 1);
        assert_eq!(out.buffer(), &[0x00, 0xDF, 0xC0]);
    }

    #[test]
    fn begin_resets_previous_frame() {
        let mut out: MessageOut = MessageOut::new();
        out.begin_query(5, 1);
        out.add_int32(u32::MAX);
        out.end();

        out.begin_query(1, 2);
        out.end();
        assert_eq!(out.length(), 2);
        assert_eq!(out.buffer()[0], 0x12);
    }

    #[test]
    fn header_never_carries_continuation_bit() {
        let mut out: MessageOut = MessageOut::new();
        out.host_begin_query(0xFF);
        assert_eq!(out.buffer(), &[0x7F]);
    }

    #[test]
    fn host_end_appends_terminator() {
        let mut out: MessageOut = MessageOut::new();
        out.host_begin_query(0x21);
        out.add_int8(0x42);
        out.host_end();

        let bytes = out.buffer();
        assert_eq!(bytes.len(), 5);
        assert_eq!(bytes[bytes.len() - 1], b'\n');
        assert_eq!(bytes[bytes.len() - 2], 0x80 | crc(&bytes[..3]));
    }

    #[test]
    fn float_is_sent_as_bit_pattern() {
        let mut a: MessageOut = MessageOut::new();
        a.begin_answer();
        a.add_float(-1.5);

        let mut b: MessageOut = MessageOut::new();
        b.begin_answer();
        b.add_int32((-1.5f32).to_bits());

        assert_eq!(a.buffer(), b.buffer());
    }

    #[test]
    fn block_matches_int8_sequence() {
        let mut a: MessageOut = MessageOut::new();
        a.begin_answer();
        a.add_block(&[0x01, 0xFE, 0x7F]);

        let mut b: MessageOut = MessageOut::new();
        b.begin_answer();
        b.add_int8(0x01);
        b.add_int8(0xFE);
        b.add_int8(0x7F);

        assert_eq!(a.buffer(), b.buffer());
    }

    #[test]
    #[should_panic(expected = "exceeds encoder capacity")]
    fn overflow_panics() {
        let mut out = MessageOut::<4>::new();
        out.begin_query(5, 1);
        out.add_int32(1);
    }

    #[test]
    #[should_panic(expected = "must precede")]
    fn adding_before_begin_panics() {
        let mut out: MessageOut = MessageOut::new();
        out.add_int8(1);
    }
}
