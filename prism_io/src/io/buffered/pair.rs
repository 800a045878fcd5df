//! A reader and a writer over two separate raw streams.

use super::{BufferedReader, BufferedWriter};
use crate::error::IoResult;
use crate::io::DEFAULT_BUFFER_SIZE;
use crate::io::base::{BufferedIo, IoBase, RawIo, WriteProgress};

/// Reads go to one raw stream and writes to another, as with the two ends
/// of a socket pair. The pair is never seekable.
#[derive(Debug)]
pub struct BufferedRWPair<R: RawIo, W: RawIo> {
    reader: BufferedReader<R>,
    writer: BufferedWriter<W>,
}

impl<R: RawIo, W: RawIo> BufferedRWPair<R, W> {
    pub fn new(reader: R, writer: W) -> IoResult<Self> {
        Self::with_capacity(reader, writer, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(reader: R, writer: W, buffer_size: usize) -> IoResult<Self> {
        Ok(Self {
            reader: BufferedReader::with_capacity(reader, buffer_size)?,
            writer: BufferedWriter::with_capacity(writer, buffer_size)?,
        })
    }

    pub fn reader(&self) -> &BufferedReader<R> {
        &self.reader
    }

    pub fn writer(&self) -> &BufferedWriter<W> {
        &self.writer
    }
}

impl<R: RawIo, W: RawIo> IoBase for BufferedRWPair<R, W> {
    fn closed(&self) -> bool {
        self.writer.closed()
    }

    fn readable(&self) -> bool {
        self.reader.readable()
    }

    fn writable(&self) -> bool {
        self.writer.writable()
    }

    fn isatty(&self) -> IoResult<bool> {
        Ok(self.reader.isatty()? || self.writer.isatty()?)
    }

    /// Close the writer, then the reader; the first failure is reported.
    fn close(&mut self) -> IoResult<()> {
        let writer = self.writer.close();
        let reader = self.reader.close();
        writer.and(reader)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.writer.flush()
    }
}

impl<R: RawIo, W: RawIo> BufferedIo for BufferedRWPair<R, W> {
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.reader.read(size)
    }

    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.reader.read1(size)
    }

    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        self.reader.peek(size)
    }

    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        self.reader.readline(limit)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        self.writer.write(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, IoError};
    use crate::io::buffered::testing::ChunkedRaw;
    use crate::io::BytesIO;
    use crate::io::base::Whence;

    #[test]
    fn test_reads_and_writes_split() {
        let mut pair =
            BufferedRWPair::with_capacity(BytesIO::from_bytes(b"in\n".to_vec()), BytesIO::new(), 4)
                .unwrap();
        assert!(pair.readable());
        assert!(pair.writable());
        assert!(!pair.seekable());
        assert!(!pair.isatty().unwrap());

        assert_eq!(pair.readline(None).unwrap(), b"in\n");
        pair.write(b"out").unwrap().into_result().unwrap();
        assert_eq!(pair.writer().raw().unwrap().getvalue(), b"");
        pair.flush().unwrap();
        assert_eq!(pair.writer().raw().unwrap().getvalue(), b"out");
    }

    #[test]
    fn test_seek_unsupported() {
        let mut pair = BufferedRWPair::new(BytesIO::new(), BytesIO::new()).unwrap();
        let err = pair.seek(0, Whence::Start).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_close_closes_both() {
        let mut pair = BufferedRWPair::new(BytesIO::new(), BytesIO::new()).unwrap();
        pair.close().unwrap();
        assert!(pair.closed());
        assert!(pair.reader().closed());
        assert!(matches!(pair.read(None), Err(IoError::Closed)));
        pair.close().unwrap();
    }

    #[test]
    fn test_close_reports_writer_failure_and_still_closes_reader() {
        let mut sink = ChunkedRaw::new(b"", 100);
        sink.write_budget = Some(0);
        let mut pair = BufferedRWPair::with_capacity(BytesIO::new(), sink, 8).unwrap();
        assert_eq!(pair.write(b"abc").unwrap(), WriteProgress::Done(3));

        let err = pair.close().unwrap_err();
        assert!(matches!(err, IoError::Blocking { written: 0 }));
        assert!(pair.reader().closed());
        assert!(pair.writer().closed());
        assert!(matches!(pair.read(None), Err(IoError::Closed)));
    }
}
