//! Read-ahead buffering over a raw stream.

use super::{ReadBuffer, check_attached, check_buffer_size, live};
use crate::error::{IoError, IoResult};
use crate::io::DEFAULT_BUFFER_SIZE;
use crate::io::base::{BufferedIo, IoBase, RawIo, Whence};

/// Buffered reader over a readable raw stream.
///
/// Raw reads are made in chunks of the buffer size; bytes read past what the
/// caller asked for stay buffered, so the logical position trails the raw
/// position by [`BufferedReader::available`].
#[derive(Debug)]
pub struct BufferedReader<R: RawIo> {
    raw: Option<R>,
    buf: ReadBuffer,
}

impl<R: RawIo> BufferedReader<R> {
    pub fn new(raw: R) -> IoResult<Self> {
        Self::with_capacity(raw, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(raw: R, buffer_size: usize) -> IoResult<Self> {
        if !raw.readable() {
            return Err(IoError::unsupported("\"raw\" argument must be readable."));
        }
        let size = check_buffer_size(buffer_size)?;
        Ok(Self {
            raw: Some(raw),
            buf: ReadBuffer::new(size),
        })
    }

    /// The wrapped raw stream, unless detached.
    pub fn raw(&self) -> Option<&R> {
        self.raw.as_ref()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buf.size()
    }

    /// Bytes read ahead but not yet returned.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.available()
    }

    /// Separate the raw stream. Read-ahead is discarded and every later
    /// operation fails with [`IoError::Detached`].
    pub fn detach(&mut self) -> IoResult<R> {
        let raw = self.raw.take().ok_or(IoError::Detached)?;
        self.buf.clear();
        log::debug!("buffered reader detached");
        Ok(raw)
    }
}

impl<R: RawIo> IoBase for BufferedReader<R> {
    fn closed(&self) -> bool {
        self.raw.as_ref().is_none_or(|raw| raw.closed())
    }

    fn readable(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.readable())
    }

    fn seekable(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.seekable())
    }

    fn isatty(&self) -> IoResult<bool> {
        self.check_closed()?;
        self.raw.as_ref().map_or(Ok(false), |raw| raw.isatty())
    }

    fn close(&mut self) -> IoResult<()> {
        let raw = self.raw.as_mut().ok_or(IoError::Detached)?;
        if raw.closed() {
            return Ok(());
        }
        self.buf.clear();
        raw.close()
    }

    fn flush(&mut self) -> IoResult<()> {
        live(&mut self.raw)?.flush()
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        let raw = live(&mut self.raw)?;
        let offset = match whence {
            Whence::Current => offset - self.buf.available() as i64,
            _ => offset,
        };
        let pos = raw.seek(offset, whence)?;
        self.buf.clear();
        Ok(pos)
    }

    fn tell(&mut self) -> IoResult<u64> {
        let raw_pos = live(&mut self.raw)?.tell()?;
        Ok(raw_pos.saturating_sub(self.buf.available() as u64))
    }

    /// Truncate at `size`, or at the logical position. Read-ahead is dropped
    /// and the raw position rewound to the logical one first.
    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        let pos = self.tell()?;
        let raw = live(&mut self.raw)?;
        raw.seek(pos as i64, Whence::Start)?;
        self.buf.clear();
        raw.truncate(Some(size.unwrap_or(pos as i64)))
    }

    fn check_closed(&self) -> IoResult<()> {
        check_attached(&self.raw)
    }
}

impl<R: RawIo> BufferedIo for BufferedReader<R> {
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        let raw = live(&mut self.raw)?;
        self.buf.read(raw, size)
    }

    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        let raw = live(&mut self.raw)?;
        self.buf.read1(raw, size)
    }

    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        let raw = live(&mut self.raw)?;
        self.buf.peek(raw, size)
    }

    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        let raw = live(&mut self.raw)?;
        self.buf.readline(raw, limit)
    }
}
