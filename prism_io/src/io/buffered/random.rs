//! Combined read and write buffering over one seekable raw stream.

use super::{ReadBuffer, WriteBuffer, check_attached, check_buffer_size, live};
use crate::error::{IoError, IoResult};
use crate::io::DEFAULT_BUFFER_SIZE;
use crate::io::base::{BufferedIo, IoBase, RawIo, Whence, WriteProgress};

/// Buffered random-access stream.
///
/// At most one of the two buffers holds data at a time: a read flushes
/// pending writes, and a write first rewinds the raw stream over unread
/// read-ahead so the bytes land at the logical position.
#[derive(Debug)]
pub struct BufferedRandom<R: RawIo> {
    raw: Option<R>,
    rbuf: ReadBuffer,
    wbuf: WriteBuffer,
}

impl<R: RawIo> BufferedRandom<R> {
    pub fn new(raw: R) -> IoResult<Self> {
        Self::with_capacity(raw, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(raw: R, buffer_size: usize) -> IoResult<Self> {
        if !raw.seekable() {
            return Err(IoError::unsupported("\"raw\" argument must be seekable."));
        }
        if !raw.readable() {
            return Err(IoError::unsupported("\"raw\" argument must be readable."));
        }
        if !raw.writable() {
            return Err(IoError::unsupported("\"raw\" argument must be writable."));
        }
        let size = check_buffer_size(buffer_size)?;
        Ok(Self {
            raw: Some(raw),
            rbuf: ReadBuffer::new(size),
            wbuf: WriteBuffer::new(size),
        })
    }

    pub fn raw(&self) -> Option<&R> {
        self.raw.as_ref()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.rbuf.size()
    }

    /// Flush, then separate the raw stream.
    pub fn detach(&mut self) -> IoResult<R> {
        self.flush()?;
        self.rewind_read_ahead()?;
        let raw = self.raw.take().ok_or(IoError::Detached)?;
        log::debug!("buffered random detached");
        Ok(raw)
    }

    /// Write out pending bytes so the raw position is the logical one.
    fn flush_pending(&mut self) -> IoResult<()> {
        let raw = live(&mut self.raw)?;
        self.wbuf.flush(raw)
    }

    /// Move the raw position back over unread read-ahead and drop it.
    fn rewind_read_ahead(&mut self) -> IoResult<()> {
        let available = self.rbuf.available();
        if available > 0 {
            let raw = live(&mut self.raw)?;
            raw.seek(-(available as i64), Whence::Current)?;
            log::trace!("rewound {available} bytes of read-ahead");
        }
        self.rbuf.clear();
        Ok(())
    }
}

impl<R: RawIo> IoBase for BufferedRandom<R> {
    fn closed(&self) -> bool {
        self.raw.as_ref().is_none_or(|raw| raw.closed())
    }

    fn readable(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.readable())
    }

    fn writable(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.writable())
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
        let flushed = self.wbuf.flush(&mut *raw).and_then(|()| raw.flush());
        self.rbuf.clear();
        let closed = raw.close();
        flushed.and(closed)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flush_pending()?;
        live(&mut self.raw)?.flush()
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        self.flush_pending()?;
        let raw = live(&mut self.raw)?;
        let offset = match whence {
            Whence::Current => offset - self.rbuf.available() as i64,
            _ => offset,
        };
        let pos = raw.seek(offset, whence)?;
        self.rbuf.clear();
        Ok(pos)
    }

    fn tell(&mut self) -> IoResult<u64> {
        let raw_pos = live(&mut self.raw)?.tell()?;
        let pending = self.wbuf.pending() as u64;
        if pending > 0 {
            Ok(raw_pos + pending)
        } else {
            Ok(raw_pos.saturating_sub(self.rbuf.available() as u64))
        }
    }

    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.flush_pending()?;
        self.rewind_read_ahead()?;
        live(&mut self.raw)?.truncate(size)
    }

    fn check_closed(&self) -> IoResult<()> {
        check_attached(&self.raw)
    }
}

impl<R: RawIo> BufferedIo for BufferedRandom<R> {
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.flush_pending()?;
        let raw = live(&mut self.raw)?;
        self.rbuf.read(raw, size)
    }

    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.flush_pending()?;
        let raw = live(&mut self.raw)?;
        self.rbuf.read1(raw, size)
    }

    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        self.flush_pending()?;
        let raw = live(&mut self.raw)?;
        self.rbuf.peek(raw, size)
    }

    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        self.flush_pending()?;
        let raw = live(&mut self.raw)?;
        self.rbuf.readline(raw, limit)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        self.check_closed()?;
        self.rewind_read_ahead()?;
        let raw = live(&mut self.raw)?;
        self.wbuf.write(raw, data)
    }
}

impl<R: RawIo> Drop for BufferedRandom<R> {
    fn drop(&mut self) {
        if self.raw.as_ref().is_some_and(|raw| !raw.closed()) {
            if let Err(err) = self.close() {
                log::warn!("error closing buffered random on drop: {err}");
            }
        }
    }
}
