//! Write-behind buffering over a raw stream.

use super::{WriteBuffer, check_attached, check_buffer_size, live};
use crate::error::{IoError, IoResult};
use crate::io::DEFAULT_BUFFER_SIZE;
use crate::io::base::{BufferedIo, IoBase, RawIo, Whence, WriteProgress};

/// Buffered writer over a writable raw stream.
///
/// Writes collect in memory until the buffer runs over its size, then go out
/// in as few raw writes as the stream allows. Pending bytes are written on
/// [`flush`](IoBase::flush), [`seek`](IoBase::seek), [`close`](IoBase::close)
/// and drop.
#[derive(Debug)]
pub struct BufferedWriter<R: RawIo> {
    raw: Option<R>,
    buf: WriteBuffer,
}

impl<R: RawIo> BufferedWriter<R> {
    pub fn new(raw: R) -> IoResult<Self> {
        Self::with_capacity(raw, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(raw: R, buffer_size: usize) -> IoResult<Self> {
        if !raw.writable() {
            return Err(IoError::unsupported("\"raw\" argument must be writable."));
        }
        let size = check_buffer_size(buffer_size)?;
        Ok(Self {
            raw: Some(raw),
            buf: WriteBuffer::new(size),
        })
    }

    pub fn raw(&self) -> Option<&R> {
        self.raw.as_ref()
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buf.size()
    }

    /// Bytes accepted but not yet handed to the raw stream.
    #[inline]
    pub fn pending(&self) -> usize {
        self.buf.pending()
    }

    /// Flush, then separate the raw stream.
    pub fn detach(&mut self) -> IoResult<R> {
        self.flush()?;
        let raw = self.raw.take().ok_or(IoError::Detached)?;
        log::debug!("buffered writer detached");
        Ok(raw)
    }

    fn flush_pending(&mut self) -> IoResult<()> {
        let raw = live(&mut self.raw)?;
        self.buf.flush(raw)
    }
}

impl<R: RawIo> IoBase for BufferedWriter<R> {
    fn closed(&self) -> bool {
        self.raw.as_ref().is_none_or(|raw| raw.closed())
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

    /// Flush, then close the raw stream even if the flush failed. The flush
    /// error wins when both fail.
    fn close(&mut self) -> IoResult<()> {
        let raw = self.raw.as_mut().ok_or(IoError::Detached)?;
        if raw.closed() {
            return Ok(());
        }
        let flushed = self.buf.flush(&mut *raw).and_then(|()| raw.flush());
        let closed = raw.close();
        flushed.and(closed)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flush_pending()?;
        live(&mut self.raw)?.flush()
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        self.flush_pending()?;
        live(&mut self.raw)?.seek(offset, whence)
    }

    fn tell(&mut self) -> IoResult<u64> {
        let raw_pos = live(&mut self.raw)?.tell()?;
        Ok(raw_pos + self.buf.pending() as u64)
    }

    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.flush_pending()?;
        live(&mut self.raw)?.truncate(size)
    }

    fn check_closed(&self) -> IoResult<()> {
        check_attached(&self.raw)
    }
}

impl<R: RawIo> BufferedIo for BufferedWriter<R> {
    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        let raw = live(&mut self.raw)?;
        self.buf.write(raw, data)
    }
}

impl<R: RawIo> Drop for BufferedWriter<R> {
    fn drop(&mut self) {
        if self.raw.as_ref().is_some_and(|raw| !raw.closed()) {
            if let Err(err) = self.close() {
                log::warn!("error closing buffered writer on drop: {err}");
            }
        }
    }
}
