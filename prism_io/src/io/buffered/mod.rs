//! Buffered layers over a raw stream.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  BufferedReader      BufferedWriter     BufferedRandom │
//! │  ┌────────────┐      ┌────────────┐     ┌────┐ ┌────┐  │
//! │  │ ReadBuffer │      │WriteBuffer │     │ RB │ │ WB │  │
//! │  └─────┬──────┘      └─────┬──────┘     └─┬──┘ └─┬──┘  │
//! │        ▼                   ▼              ▼      ▼     │
//! │                 R: RawIo (FileIO, BytesIO, ...)        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! [`ReadBuffer`] holds read-ahead: bytes fetched from the raw stream that
//! the caller has not consumed, so the logical position is the raw position
//! minus the unread count. [`WriteBuffer`] holds write-behind: bytes accepted
//! but not yet written, so the logical position is the raw position plus the
//! pending count. `BufferedRWPair` puts a reader and a writer over two
//! different raw streams.

pub mod pair;
pub mod random;
pub mod reader;
pub mod writer;

pub use pair::BufferedRWPair;
pub use random::BufferedRandom;
pub use reader::BufferedReader;
pub use writer::BufferedWriter;

use memchr::memchr;

use super::base::{IoBase, RawIo, WriteProgress};
use crate::error::{IoError, IoResult};

/// Reject a zero buffer size.
pub(crate) fn check_buffer_size(size: usize) -> IoResult<usize> {
    if size == 0 {
        Err(IoError::value("invalid buffer size (must be positive)"))
    } else {
        Ok(size)
    }
}

/// The attached raw stream, or the reason it cannot be used.
pub(crate) fn live<R: IoBase>(raw: &mut Option<R>) -> IoResult<&mut R> {
    let raw = raw.as_mut().ok_or(IoError::Detached)?;
    raw.check_closed()?;
    Ok(raw)
}

/// Shared `check_closed` for layers that own an `Option<R>`.
pub(crate) fn check_attached<R: IoBase>(raw: &Option<R>) -> IoResult<()> {
    match raw {
        None => Err(IoError::Detached),
        Some(raw) => raw.check_closed(),
    }
}

// =============================================================================
// ReadBuffer
// =============================================================================

/// Read-ahead bytes and the consumption cursor into them.
#[derive(Debug)]
pub(crate) struct ReadBuffer {
    data: Vec<u8>,
    /// Start of unread data.
    pos: usize,
    /// Capacity used for raw reads.
    size: usize,
}

impl ReadBuffer {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            data: Vec::with_capacity(size),
            pos: 0,
            size,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Bytes fetched but not yet consumed.
    #[inline]
    pub(crate) fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn unread(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Drop all read-ahead.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Consume up to `n` buffered bytes.
    fn take(&mut self, n: usize) -> &[u8] {
        let n = n.min(self.available());
        let start = self.pos;
        self.pos += n;
        &self.data[start..start + n]
    }

    /// Append one raw read of up to `want` bytes; returns the byte count.
    fn fill<R: RawIo + ?Sized>(&mut self, raw: &mut R, want: usize) -> IoResult<usize> {
        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
        let chunk = raw.read(Some(want))?;
        log::trace!("read buffer filled with {} of {} bytes", chunk.len(), want);
        self.data.extend_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Serve `size` bytes (everything when `None`), topping up from `raw`
    /// until satisfied or at end of file. Excess raw bytes stay buffered.
    pub(crate) fn read<R: RawIo + ?Sized>(
        &mut self,
        raw: &mut R,
        size: Option<usize>,
    ) -> IoResult<Vec<u8>> {
        let Some(size) = size else {
            let mut out = self.take(usize::MAX).to_vec();
            out.extend_from_slice(&raw.readall()?);
            return Ok(out);
        };
        if size <= self.available() {
            return Ok(self.take(size).to_vec());
        }

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(self.take(usize::MAX));
        self.clear();
        while out.len() < size {
            let wanted = size - out.len();
            let chunk = raw.read(Some(self.size.max(wanted)))?;
            if chunk.is_empty() {
                break;
            }
            if chunk.len() > wanted {
                out.extend_from_slice(&chunk[..wanted]);
                self.data.extend_from_slice(&chunk[wanted..]);
            } else {
                out.extend_from_slice(&chunk);
            }
        }
        Ok(out)
    }

    /// Buffered bytes without consuming them, with at most one raw read.
    ///
    /// A zero or oversized request means the full buffer size.
    pub(crate) fn peek<R: RawIo + ?Sized>(&mut self, raw: &mut R, size: usize) -> IoResult<Vec<u8>> {
        let size = if size == 0 || size > self.size { self.size } else { size };
        let available = self.available();
        if available < size {
            self.fill(raw, size - available)?;
        }
        Ok(self.unread().to_vec())
    }

    /// At most one raw read, and only when nothing is buffered.
    pub(crate) fn read1<R: RawIo + ?Sized>(
        &mut self,
        raw: &mut R,
        size: Option<usize>,
    ) -> IoResult<Vec<u8>> {
        if size == Some(0) {
            return Ok(Vec::new());
        }
        if self.available() == 0 {
            self.fill(raw, self.size)?;
        }
        let n = size.unwrap_or(usize::MAX);
        Ok(self.take(n).to_vec())
    }

    /// Bytes through the next `\n`, stopping at `limit` or end of file.
    pub(crate) fn readline<R: RawIo + ?Sized>(
        &mut self,
        raw: &mut R,
        limit: Option<usize>,
    ) -> IoResult<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            let room = limit.map_or(usize::MAX, |limit| limit - line.len());
            let window = &self.unread()[..room.min(self.available())];
            if let Some(i) = memchr(b'\n', window) {
                line.extend_from_slice(self.take(i + 1));
                return Ok(line);
            }
            let n = window.len();
            line.extend_from_slice(self.take(n));
            if limit.is_some_and(|limit| line.len() >= limit) {
                return Ok(line);
            }
            if self.fill(raw, self.size)? == 0 {
                return Ok(line);
            }
        }
    }
}

// =============================================================================
// WriteBuffer
// =============================================================================

/// Write-behind bytes awaiting a raw write.
#[derive(Debug)]
pub(crate) struct WriteBuffer {
    pending: Vec<u8>,
    size: usize,
}

impl WriteBuffer {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(size),
            size,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Bytes accepted but not yet written.
    #[inline]
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Accept `data`, flushing when the buffer runs over capacity.
    ///
    /// If the raw stream would block, the buffer keeps at most `size` bytes
    /// and the result reports how many bytes of `data` were kept.
    pub(crate) fn write<R: RawIo + ?Sized>(
        &mut self,
        raw: &mut R,
        data: &[u8],
    ) -> IoResult<WriteProgress> {
        self.pending.extend_from_slice(data);
        let mut count = data.len();
        if self.pending.len() > self.size {
            match self.flush(raw) {
                Ok(()) => {}
                Err(IoError::Blocking { .. }) => {
                    if self.pending.len() > self.size {
                        let overage = self.pending.len() - self.size;
                        count -= overage.min(count);
                        self.pending.truncate(self.size);
                        log::trace!("write buffer trimmed by {overage} bytes after would-block");
                        return Ok(WriteProgress::WouldBlock(count));
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Ok(WriteProgress::Done(count))
    }

    /// Write out everything pending, removing only what the raw stream
    /// accepted. A would-block surfaces as [`IoError::Blocking`] after the
    /// accepted prefix has been removed.
    pub(crate) fn flush<R: RawIo + ?Sized>(&mut self, raw: &mut R) -> IoResult<()> {
        while !self.pending.is_empty() {
            match raw.write(&self.pending)? {
                WriteProgress::Done(0) => {
                    return Err(IoError::stream("raw write() returned 0 bytes"));
                }
                WriteProgress::Done(n) => {
                    let n = n.min(self.pending.len());
                    self.pending.drain(..n);
                    log::trace!("flushed {n} bytes, {} pending", self.pending.len());
                }
                WriteProgress::WouldBlock(n) => {
                    let n = n.min(self.pending.len());
                    self.pending.drain(..n);
                    return Err(IoError::Blocking { written: n });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Test support
// =============================================================================


#[cfg(test)]
mod tests {
    use super::testing::ChunkedRaw;
    use super::*;

    #[test]
    fn test_zero_buffer_size_rejected() {
        let err = check_buffer_size(0).unwrap_err();
        assert_eq!(err.to_string(), "invalid buffer size (must be positive)");
        assert_eq!(check_buffer_size(4).unwrap(), 4);
    }

    #[test]
    fn test_read_keeps_excess() {
        let mut raw = ChunkedRaw::new(b"abcdefghij", 100);
        let mut buf = ReadBuffer::new(4);
        assert_eq!(buf.read(&mut raw, Some(2)).unwrap(), b"ab");
        assert_eq!(buf.available(), 2);
        assert_eq!(buf.read(&mut raw, Some(5)).unwrap(), b"cdefg");
        assert_eq!(buf.read(&mut raw, None).unwrap(), b"hij");
    }

    #[test]
    fn test_read_across_short_raw_reads() {
        let mut raw = ChunkedRaw::new(b"abcdefghij", 3);
        let mut buf = ReadBuffer::new(4);
        assert_eq!(buf.read(&mut raw, Some(8)).unwrap(), b"abcdefgh");
        assert_eq!(buf.read(&mut raw, Some(8)).unwrap(), b"ij");
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut raw = ChunkedRaw::new(b"abcdef", 100);
        let mut buf = ReadBuffer::new(4);
        assert_eq!(buf.peek(&mut raw, 2).unwrap(), b"ab");
        // Zero means "up to the buffer size": one raw read tops it up.
        assert_eq!(buf.peek(&mut raw, 0).unwrap(), b"abcd");
        assert_eq!(buf.available(), 4);
        assert_eq!(buf.read1(&mut raw, Some(10)).unwrap(), b"abcd");
        assert_eq!(buf.read1(&mut raw, None).unwrap(), b"ef");
        assert_eq!(buf.read1(&mut raw, None).unwrap(), b"");
    }

    #[test]
    fn test_readline_limit_and_refill() {
        let mut raw = ChunkedRaw::new(b"abcdefgh\nxy\nz", 100);
        let mut buf = ReadBuffer::new(3);
        assert_eq!(buf.readline(&mut raw, Some(5)).unwrap(), b"abcde");
        assert_eq!(buf.readline(&mut raw, None).unwrap(), b"fgh\n");
        assert_eq!(buf.readline(&mut raw, None).unwrap(), b"xy\n");
        assert_eq!(buf.readline(&mut raw, None).unwrap(), b"z");
        assert_eq!(buf.readline(&mut raw, None).unwrap(), b"");
    }

    #[test]
    fn test_flush_removes_only_accepted_prefix() {
        let mut raw = ChunkedRaw::new(b"", 100);
        raw.write_budget = Some(3);
        let mut buf = WriteBuffer::new(4);
        assert_eq!(buf.write(&mut raw, b"ab").unwrap(), WriteProgress::Done(2));

        let progress = buf.write(&mut raw, b"cdefgh").unwrap();
        // 3 bytes reached raw; 4 stay buffered; 1 byte was refused.
        assert_eq!(progress, WriteProgress::WouldBlock(5));
        assert_eq!(raw.contents(), b"abc");
        assert_eq!(buf.pending(), 4);

        raw.write_budget = None;
        buf.flush(&mut raw).unwrap();
        assert_eq!(raw.contents(), b"abcdefg");
    }

    #[test]
    fn test_pending_stays_within_capacity_while_blocked() {
        let mut raw = ChunkedRaw::new(b"", 100);
        raw.write_budget = Some(0);
        let mut buf = WriteBuffer::new(4);
        assert_eq!(buf.write(&mut raw, b"abcdef").unwrap(), WriteProgress::WouldBlock(4));
        assert_eq!(buf.pending(), 4);

        // Still blocked: a full buffer accepts nothing more.
        assert_eq!(buf.write(&mut raw, b"xy").unwrap(), WriteProgress::WouldBlock(0));
        assert_eq!(buf.pending(), 4);

        raw.write_budget = None;
        assert_eq!(buf.write(&mut raw, b"xy").unwrap(), WriteProgress::Done(2));
        assert_eq!(raw.contents(), b"abcdxy");
        assert_eq!(buf.pending(), 0);
    }
}
