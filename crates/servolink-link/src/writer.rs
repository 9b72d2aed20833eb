use std::io::{ErrorKind, Write};

use servolink_codec::{Answer, MessageOut, Query};
use tracing::trace;

use crate::error::{LinkError, Result};

/// Writes encoded frames to any `Write` byte stream.
pub struct MessageWriter<T> {
    inner: T,
    out: MessageOut,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            out: MessageOut::new(),
        }
    }

    /// Encode and send a query.
    pub fn send_query(&mut self, query: &Query) -> Result<()> {
        query.encode(&mut self.out);
        trace!(?query, len = self.out.length(), "sending query");
        write_all(&mut self.inner, self.out.buffer())?;
        self.flush()
    }

    /// Encode and send an answer.
    pub fn send_answer(&mut self, answer: &Answer) -> Result<()> {
        answer.encode(&mut self.out);
        trace!(?answer, len = self.out.length(), "sending answer");
        write_all(&mut self.inner, self.out.buffer())?;
        self.flush()
    }

    /// Send a frame built by the caller, e.g. a host-unified frame finished
    /// with [`MessageOut::host_end`].
    pub fn send<const N: usize>(&mut self, frame: &MessageOut<N>) -> Result<()> {
        write_all(&mut self.inner, frame.buffer())?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn write_all<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(LinkError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(LinkError::Io(err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use servolink_codec::{Command, LengthTable, MessageIn};

    use super::*;
    use crate::reader::MessageReader;

    #[test]
    fn write_single_query() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer
            .send_query(&Query::Control { id: 3, value: 20000 })
            .unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(&wire[..4], &[0x03, 0xA7, 0x88, 0x80]);
        assert_eq!(wire.len(), 5);
    }

    #[test]
    fn writer_reader_roundtrip() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        let queries = [
            Query::Read { id: 1, index: 200 },
            Query::Write {
                id: 1,
                index: 60,
                value: -1,
            },
        ];
        for query in &queries {
            writer.send_query(query).unwrap();
        }

        let wire = writer.into_inner().into_inner();
        let mut reader: MessageReader<_> = MessageReader::new(Cursor::new(wire));
        for expected in queries {
            assert_eq!(reader.read_query().unwrap(), expected);
        }
    }

    #[test]
    #[cfg(unix)]
    fn answer_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader: MessageReader<_> = MessageReader::new(right);

        let answer = Answer::Flash {
            status: 0,
            id: 15,
            value: 0x0800_0100,
        };
        writer.send_answer(&answer).unwrap();
        assert_eq!(reader.read_answer(Command::Flash).unwrap(), answer);
    }

    #[test]
    fn send_prebuilt_host_frame() {
        let mut frame: MessageOut = MessageOut::new();
        frame.host_begin_query(0x40);
        frame.add_float(0.5);
        frame.host_end();

        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&frame).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.last(), Some(&b'\n'));
        let mut msg = MessageIn::new(&wire);
        assert_eq!(msg.host_cmd(), 0x40);
        assert_eq!(msg.get_float(), 0.5);
        assert!(msg.check_crc(wire.len() - 1));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = MessageWriter::new(sink);

        writer.send_query(&Query::Info { id: 0 }).unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_would_block_writes() {
        let inner = FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        };
        let mut writer = MessageWriter::new(inner);
        writer.send_query(&Query::Info { id: 2 }).unwrap();

        let inner = writer.into_inner();
        let table = LengthTable::device_queries();
        assert_eq!(inner.data.len(), table.length(Command::Info.code()));
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut writer = MessageWriter::new(ClosedWriter);
        let err = writer.send_query(&Query::Info { id: 2 }).unwrap_err();
        assert!(matches!(err, LinkError::ConnectionClosed));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = MessageWriter::new(Cursor::new(Vec::<u8>::new()));
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.failures.pop() {
                return Err(std::io::Error::from(kind));
            }
            let n = buf.len().min(2);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
