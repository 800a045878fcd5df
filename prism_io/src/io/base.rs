//! Capability traits every stream layer is written against.
//!
//! A buffered layer is generic over [`RawIo`]; a text layer is generic over
//! [`BufferedIo`]. Anything implementing the trait satisfies the layer
//! statically, whether it is a file, an in-memory buffer or a user type.
//!
//! Methods a stream cannot support keep the default body, which fails with
//! [`IoError::Unsupported`]. Methods called on a closed stream fail with
//! [`IoError::Closed`].

use crate::error::{IoError, IoResult};
use crate::io::DEFAULT_BUFFER_SIZE;

// =============================================================================
// Whence
// =============================================================================

/// Reference point of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    /// Parse the integer form (`0`, `1` or `2`).
    pub fn from_raw(whence: i32) -> IoResult<Self> {
        match whence {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            n => Err(IoError::value(format!(
                "invalid whence ({n}, should be 0, 1 or 2)"
            ))),
        }
    }

    #[inline]
    pub const fn as_raw(self) -> i32 {
        match self {
            Whence::Start => 0,
            Whence::Current => 1,
            Whence::End => 2,
        }
    }
}

// =============================================================================
// WriteProgress
// =============================================================================

/// Outcome of a write that may stop early because the sink would block.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteProgress {
    /// `n` bytes were accepted.
    Done(usize),
    /// The sink would block after accepting `n` bytes.
    WouldBlock(usize),
}

impl WriteProgress {
    /// Bytes accepted either way.
    #[inline]
    pub const fn written(self) -> usize {
        match self {
            WriteProgress::Done(n) | WriteProgress::WouldBlock(n) => n,
        }
    }

    #[inline]
    pub const fn would_block(self) -> bool {
        matches!(self, WriteProgress::WouldBlock(_))
    }

    /// Turn a partial write into [`IoError::Blocking`].
    #[inline]
    pub fn into_result(self) -> IoResult<usize> {
        match self {
            WriteProgress::Done(n) => Ok(n),
            WriteProgress::WouldBlock(written) => Err(IoError::Blocking { written }),
        }
    }
}

// =============================================================================
// IoBase
// =============================================================================

/// Lifecycle and capability queries shared by every layer.
pub trait IoBase {
    fn closed(&self) -> bool;

    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        false
    }

    fn seekable(&self) -> bool {
        false
    }

    fn isatty(&self) -> IoResult<bool> {
        self.check_closed()?;
        Ok(false)
    }

    /// Flush and release the stream. Closing twice is a no-op.
    fn close(&mut self) -> IoResult<()>;

    fn flush(&mut self) -> IoResult<()> {
        self.check_closed()
    }

    /// Move to `offset` relative to `whence`; returns the new position.
    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        let _ = (offset, whence);
        self.check_closed()?;
        Err(IoError::unsupported("seek"))
    }

    fn tell(&mut self) -> IoResult<u64> {
        self.seek(0, Whence::Current)
    }

    /// Resize to `size` bytes (current position when `None`); returns the
    /// new size.
    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        let _ = size;
        self.check_closed()?;
        Err(IoError::unsupported("truncate"))
    }

    #[inline]
    fn check_closed(&self) -> IoResult<()> {
        if self.closed() {
            Err(IoError::Closed)
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// RawIo
// =============================================================================

/// Unbuffered byte stream.
///
/// A read returns whatever one underlying call produced; a short read is
/// normal and `Ok(0)` means end of file.
pub trait RawIo: IoBase {
    /// Read at most `buf.len()` bytes in a single underlying call.
    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let _ = buf;
        self.check_closed()?;
        Err(IoError::unsupported("read"))
    }

    /// Write at most `data.len()` bytes in a single underlying call.
    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        let _ = data;
        self.check_closed()?;
        Err(IoError::unsupported("write"))
    }

    /// Read up to `size` bytes, or everything when `None`.
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        let Some(size) = size else {
            return self.readall();
        };
        let mut buf = vec![0u8; size];
        let n = self.readinto(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read until a zero-length read.
    fn readall(&mut self) -> IoResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = vec![0u8; DEFAULT_BUFFER_SIZE];
        loop {
            let n = self.readinto(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }
}

// =============================================================================
// BufferedIo
// =============================================================================

/// Buffered byte stream.
///
/// Unlike [`RawIo::read`], `read(Some(n))` keeps reading until `n` bytes
/// arrived or the stream ended.
pub trait BufferedIo: IoBase {
    /// Read up to `size` bytes, or everything when `None`.
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        let _ = size;
        self.check_closed()?;
        Err(IoError::unsupported("read"))
    }

    /// Read up to `size` bytes with at most one underlying read.
    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        let _ = size;
        self.check_closed()?;
        Err(IoError::unsupported("read1"))
    }

    /// Buffered bytes from the current position, without consuming them.
    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        let _ = size;
        self.check_closed()?;
        Err(IoError::unsupported("peek"))
    }

    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let data = self.read(Some(buf.len()))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        let _ = data;
        self.check_closed()?;
        Err(IoError::unsupported("write"))
    }

    /// Read through the next `\n`, stopping early at `limit` bytes.
    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        let mut line = Vec::new();
        while limit.is_none_or(|limit| line.len() < limit) {
            let byte = self.read(Some(1))?;
            let Some(&b) = byte.first() else { break };
            line.push(b);
            if b == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    /// Read lines until end of file or until `hint` bytes were collected.
    fn readlines(&mut self, hint: Option<usize>) -> IoResult<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        let mut total = 0;
        loop {
            let line = self.readline(None)?;
            if line.is_empty() {
                return Ok(lines);
            }
            total += line.len();
            lines.push(line);
            if hint.is_some_and(|hint| hint > 0 && total >= hint) {
                return Ok(lines);
            }
        }
    }

    /// Write every line; a partial write surfaces as [`IoError::Blocking`].
    fn writelines(&mut self, lines: &[&[u8]]) -> IoResult<()> {
        for line in lines {
            self.write(line)?.into_result()?;
        }
        Ok(())
    }
}

// =============================================================================
// Forwarding
// =============================================================================

macro_rules! forward_io {
    ($($ty:ty),*) => {
        $(
            impl<T: IoBase + ?Sized> IoBase for $ty {
                fn closed(&self) -> bool { (**self).closed() }
                fn readable(&self) -> bool { (**self).readable() }
                fn writable(&self) -> bool { (**self).writable() }
                fn seekable(&self) -> bool { (**self).seekable() }
                fn isatty(&self) -> IoResult<bool> { (**self).isatty() }
                fn close(&mut self) -> IoResult<()> { (**self).close() }
                fn flush(&mut self) -> IoResult<()> { (**self).flush() }
                fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
                    (**self).seek(offset, whence)
                }
                fn tell(&mut self) -> IoResult<u64> { (**self).tell() }
                fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
                    (**self).truncate(size)
                }
            }

            impl<T: RawIo + ?Sized> RawIo for $ty {
                fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
                    (**self).readinto(buf)
                }
                fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
                    (**self).write(data)
                }
                fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
                    RawIo::read(&mut **self, size)
                }
                fn readall(&mut self) -> IoResult<Vec<u8>> { (**self).readall() }
            }

            impl<T: BufferedIo + ?Sized> BufferedIo for $ty {
                fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
                    BufferedIo::read(&mut **self, size)
                }
                fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
                    (**self).read1(size)
                }
                fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> { (**self).peek(size) }
                fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
                    BufferedIo::readinto(&mut **self, buf)
                }
                fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
                    BufferedIo::write(&mut **self, data)
                }
                fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
                    (**self).readline(limit)
                }
                fn readlines(&mut self, hint: Option<usize>) -> IoResult<Vec<Vec<u8>>> {
                    (**self).readlines(hint)
                }
                fn writelines(&mut self, lines: &[&[u8]]) -> IoResult<()> {
                    (**self).writelines(lines)
                }
            }
        )*
    };
}

forward_io!(Box<T>, &mut T);
