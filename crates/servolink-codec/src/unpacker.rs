use crate::checksum::{checksum_byte, crc2};
use crate::command::{header_cmd, header_id};
use crate::error::{CodecError, Result};
use crate::packer::BITS_PER_BYTE;

/// Decoder for one received frame.
///
/// Borrows either a flat slice holding the frame or a circular reception
/// buffer together with the offset of the frame's header inside it. All
/// addressing into a circular buffer is modulo its length, so a frame may
/// straddle the physical end of the ring.
///
/// Field getters mirror [`crate::MessageOut`] bit for bit and never look at the
/// checksum: call [`MessageIn::check_crc`] (or [`MessageIn::verify`]) with the
/// command's table length first. Reading beyond the bytes that have actually
/// arrived is a caller error.
#[derive(Debug, Clone)]
pub struct MessageIn<'a> {
    buf: &'a [u8],
    start: usize,
    circular: bool,
    ptr: usize,
    used_bits: u32,
}

impl<'a> MessageIn<'a> {
    /// Decoder over a flat slice whose first byte is the header.
    pub fn new(frame: &'a [u8]) -> Self {
        Self {
            buf: frame,
            start: 0,
            circular: false,
            ptr: 1,
            used_bits: 0,
        }
    }

    /// Decoder over a circular buffer with the header at `start`.
    ///
    /// # Panics
    ///
    /// Panics if `ring` is empty.
    pub fn circular(ring: &'a [u8], start: usize) -> Self {
        assert!(!ring.is_empty(), "circular buffer must not be empty");
        Self {
            buf: ring,
            start: start % ring.len(),
            circular: true,
            ptr: 1,
            used_bits: 0,
        }
    }

    /// Move to a new frame at `start` and continue decoding from byte `ptr` of
    /// that frame (1 is the first payload byte).
    pub fn reset(&mut self, start: usize, ptr: usize) {
        self.start = if self.circular && !self.buf.is_empty() {
            start % self.buf.len()
        } else {
            start
        };
        self.seek(ptr);
    }

    /// Continue decoding from byte `ptr` of the current frame.
    pub fn seek(&mut self, ptr: usize) {
        self.ptr = ptr;
        self.used_bits = 0;
    }

    /// Offset of the header inside the underlying buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Index of the frame byte currently being read.
    pub fn position(&self) -> usize {
        self.ptr
    }

    /// Raw byte `index` of the frame, counted from the header.
    ///
    /// # Panics
    ///
    /// Panics when a flat buffer holds fewer than `index + 1` frame bytes.
    pub fn byte(&self, index: usize) -> u8 {
        let at = self.start + index;
        if self.circular {
            self.buf[at % self.buf.len()]
        } else {
            self.buf[at]
        }
    }

    /// The header byte.
    pub fn header(&self) -> u8 {
        self.byte(0)
    }

    /// Device id of a device-addressed header.
    pub fn id(&self) -> u8 {
        header_id(self.header())
    }

    /// Command of a device-addressed header.
    pub fn cmd(&self) -> u8 {
        header_cmd(self.header())
    }

    /// Command of a host-unified header.
    pub fn host_cmd(&self) -> u8 {
        self.header() & 0x7F
    }

    fn take(&mut self, bits: u32) -> u32 {
        let mut value = 0u64;
        let mut remaining = bits;
        while remaining > 0 {
            if self.used_bits == BITS_PER_BYTE {
                self.ptr += 1;
                self.used_bits = 0;
            }
            let free = BITS_PER_BYTE - self.used_bits;
            let take = free.min(remaining);
            let byte = u64::from(self.byte(self.ptr) & 0x7F);
            let chunk = (byte >> (free - take)) & ((1u64 << take) - 1);
            value = (value << take) | chunk;
            self.used_bits += take;
            remaining -= take;
        }
        value as u32
    }

    pub fn get_uint8(&mut self) -> u8 {
        self.take(8) as u8
    }

    pub fn get_int8(&mut self) -> i8 {
        self.take(8) as u8 as i8
    }

    pub fn get_uint16(&mut self) -> u16 {
        self.take(16) as u16
    }

    pub fn get_int16(&mut self) -> i16 {
        self.take(16) as u16 as i16
    }

    pub fn get_uint32(&mut self) -> u32 {
        self.take(32)
    }

    pub fn get_int32(&mut self) -> i32 {
        self.take(32) as i32
    }

    /// Read a float transported as its IEEE-754 bit pattern.
    pub fn get_float(&mut self) -> f32 {
        f32::from_bits(self.take(32))
    }

    /// Read an `n`-bit unsigned field (`n <= 32`).
    pub fn get_int_n(&mut self, bits: u32) -> u32 {
        assert!(bits <= 32, "field width {bits} exceeds 32 bits");
        self.take(bits)
    }

    /// Fill `dest` with raw bytes, 8 bits each.
    pub fn get_block(&mut self, dest: &mut [u8]) {
        for slot in dest.iter_mut() {
            *slot = self.get_uint8();
        }
    }

    /// Check the trailing checksum of a frame that is `length` bytes long,
    /// checksum included (the Command Length Table value).
    pub fn check_crc(&self, length: usize) -> bool {
        self.verify(length).is_ok()
    }

    /// Like [`MessageIn::check_crc`] but tells why the check failed.
    pub fn verify(&self, length: usize) -> Result<()> {
        let available = self.available();
        if length < 2 || length > available {
            return Err(CodecError::Incomplete {
                needed: length.max(2),
                available,
            });
        }

        let body = length - 1;
        let (first, second) = self.spans(body);
        let expected = checksum_byte(crc2(first, second));
        let found = self.byte(body);
        if expected != found {
            return Err(CodecError::ChecksumMismatch { expected, found });
        }
        Ok(())
    }

    /// Frame bytes readable from the header on, bounded by the buffer.
    fn available(&self) -> usize {
        if self.circular {
            self.buf.len()
        } else {
            self.buf.len().saturating_sub(self.start)
        }
    }

    /// The first `len` frame bytes as at most two contiguous spans.
    fn spans(&self, len: usize) -> (&'a [u8], &'a [u8]) {
        let end = self.start + len;
        if !self.circular || end <= self.buf.len() {
            (&self.buf[self.start..end], &[])
        } else {
            (&self.buf[self.start..], &self.buf[..end - self.buf.len()])
        }
    }
}
