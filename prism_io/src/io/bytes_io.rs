//! In-memory byte stream.
//!
//! `BytesIO` is both a raw and a buffered stream: reads never come up short
//! except at the end, and writes are always accepted in full.

use memchr::memchr;

use super::base::{BufferedIo, IoBase, RawIo, Whence, WriteProgress};
use crate::error::{IoError, IoResult};
use crate::protocol::{BufferProtocol, BufferView};

/// Growable in-memory byte stream with a cursor.
#[derive(Debug, Default, Clone)]
pub struct BytesIO {
    data: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl BytesIO {
    /// An empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream over `data`, positioned at the start.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            closed: false,
        }
    }

    /// The whole content, regardless of position.
    pub fn getvalue(&self) -> &[u8] {
        &self.data
    }

    /// A read-write view of the content.
    ///
    /// The stream cannot be resized while the view is alive.
    pub fn getbuffer(&mut self) -> IoResult<&mut [u8]> {
        self.check_closed()?;
        Ok(&mut self.data)
    }

    /// Release the content, consuming the stream.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Remaining bytes from the cursor.
    #[inline]
    fn remaining(&self) -> &[u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Read up to `size` bytes, or everything left when `None`.
    pub fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.check_closed()?;
        let remaining = self.remaining();
        let n = size.map_or(remaining.len(), |size| size.min(remaining.len()));
        let out = remaining[..n].to_vec();
        self.pos += n;
        Ok(out)
    }

    pub fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.check_closed()?;
        let remaining = self.remaining();
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    /// Write at the cursor, zero-filling any gap past the end.
    pub fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        self.check_closed()?;
        if data.is_empty() {
            return Ok(WriteProgress::Done(0));
        }
        let end = self.pos + data.len();
        if self.pos > self.data.len() {
            self.data.resize(self.pos, 0);
        }
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(WriteProgress::Done(data.len()))
    }

    /// Read through the next `\n`, or at most `limit` bytes.
    pub fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        self.check_closed()?;
        let remaining = self.remaining();
        let mut n = memchr(b'\n', remaining).map_or(remaining.len(), |i| i + 1);
        if let Some(limit) = limit {
            n = n.min(limit);
        }
        let line = remaining[..n].to_vec();
        self.pos += n;
        Ok(line)
    }
}

impl IoBase for BytesIO {
    #[inline]
    fn closed(&self) -> bool {
        self.closed
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        true
    }

    fn seekable(&self) -> bool {
        true
    }

    fn close(&mut self) -> IoResult<()> {
        self.closed = true;
        Ok(())
    }

    /// Absolute seeks reject negative targets; relative seeks clamp at 0.
    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        self.check_closed()?;
        let base = match whence {
            Whence::Start => {
                if offset < 0 {
                    return Err(IoError::value(format!("negative seek value {offset}")));
                }
                0
            }
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        self.pos = base.saturating_add(offset).max(0) as usize;
        Ok(self.pos as u64)
    }

    fn tell(&mut self) -> IoResult<u64> {
        self.check_closed()?;
        Ok(self.pos as u64)
    }

    /// Cut the content to `size` bytes; the cursor does not move.
    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.check_closed()?;
        let size = match size {
            Some(size) if size < 0 => {
                return Err(IoError::value(format!("negative size value {size}")));
            }
            Some(size) => size as usize,
            None => self.pos,
        };
        self.data.truncate(size);
        Ok(size as u64)
    }
}

impl RawIo for BytesIO {
    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        BytesIO::readinto(self, buf)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        BytesIO::write(self, data)
    }

    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        BytesIO::read(self, size)
    }

    fn readall(&mut self) -> IoResult<Vec<u8>> {
        BytesIO::read(self, None)
    }
}

impl BufferedIo for BytesIO {
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        BytesIO::read(self, size)
    }

    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        BytesIO::read(self, size)
    }

    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        self.check_closed()?;
        let remaining = self.remaining();
        let n = if size == 0 { remaining.len() } else { size.min(remaining.len()) };
        Ok(remaining[..n].to_vec())
    }

    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        BytesIO::readinto(self, buf)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        BytesIO::write(self, data)
    }

    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        BytesIO::readline(self, limit)
    }
}

impl BufferProtocol for BytesIO {
    fn buffer_view(&self) -> BufferView<'_> {
        BufferView::bytes(&self.data, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    #[test]
    fn test_read_sizes() {
        let mut s = BytesIO::from_bytes(b"hello world".to_vec());
        assert_eq!(s.read(Some(5)).unwrap(), b"hello");
        assert_eq!(s.read(Some(0)).unwrap(), b"");
        assert_eq!(s.read(None).unwrap(), b" world");
        assert_eq!(s.read(Some(4)).unwrap(), b"");
    }

    #[test]
    fn test_readline_with_limit() {
        let mut s = BytesIO::from_bytes(b"abc\ndef\nxyz".to_vec());
        assert_eq!(s.readline(Some(2)).unwrap(), b"ab");
        assert_eq!(s.readline(None).unwrap(), b"c\n");
        assert_eq!(s.readlines(None).unwrap(), vec![b"def\n".to_vec(), b"xyz".to_vec()]);
    }

    #[test]
    fn test_peek_and_read1() {
        let mut s = BytesIO::from_bytes(b"abc".to_vec());
        assert_eq!(s.peek(2).unwrap(), b"ab");
        assert_eq!(s.read1(Some(10)).unwrap(), b"abc");
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut s = BytesIO::new();
        s.write(b"ab").unwrap().into_result().unwrap();
        s.seek(5, Whence::Start).unwrap();
        s.write(b"z").unwrap().into_result().unwrap();
        assert_eq!(s.getvalue(), b"ab\0\0\0z");
    }

    #[test]
    fn test_overwrite_in_middle() {
        let mut s = BytesIO::from_bytes(b"hello".to_vec());
        s.seek(1, Whence::Start).unwrap();
        s.write(b"EL").unwrap().into_result().unwrap();
        assert_eq!(s.getvalue(), b"hELlo");
        assert_eq!(s.tell().unwrap(), 3);
    }

    #[test]
    fn test_writelines() {
        let mut s = BytesIO::new();
        s.writelines(&[b"a\n", b"b"]).unwrap();
        assert_eq!(s.getvalue(), b"a\nb");
    }

    // ------------------------------------------------------------------------
    // Seeking and truncation
    // ------------------------------------------------------------------------

    #[test]
    fn test_seek_rules() {
        let mut s = BytesIO::from_bytes(b"0123456789".to_vec());
        let err = s.seek(-1, Whence::Start).unwrap_err();
        assert_eq!(err.to_string(), "negative seek value -1");
        assert_eq!(s.seek(-100, Whence::Current).unwrap(), 0);
        assert_eq!(s.seek(-3, Whence::End).unwrap(), 7);
        assert_eq!(s.seek(-30, Whence::End).unwrap(), 0);
        assert_eq!(s.seek(20, Whence::Start).unwrap(), 20);
        assert_eq!(s.read(None).unwrap(), b"");
    }

    #[test]
    fn test_truncate_keeps_position() {
        let mut s = BytesIO::from_bytes(b"0123456789".to_vec());
        s.seek(8, Whence::Start).unwrap();
        assert_eq!(s.truncate(Some(4)).unwrap(), 4);
        assert_eq!(s.tell().unwrap(), 8);
        assert_eq!(s.getvalue(), b"0123");
        assert_eq!(s.truncate(Some(-1)).unwrap_err().kind(), ErrorKind::ValueError);
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[test]
    fn test_closed_stream_rejects_operations() {
        let mut s = BytesIO::new();
        s.close().unwrap();
        s.close().unwrap();
        assert!(matches!(s.read(None), Err(IoError::Closed)));
        assert!(matches!(s.write(b"x"), Err(IoError::Closed)));
        assert!(matches!(s.getbuffer(), Err(IoError::Closed)));
    }

    #[test]
    fn test_getbuffer_and_view() {
        let mut s = BytesIO::from_bytes(b"abc".to_vec());
        s.getbuffer().unwrap()[0] = b'X';
        let view = s.buffer_view();
        assert_eq!(view.as_bytes(), b"Xbc");
        assert_eq!(view.format(), 'B');
        assert!(!view.readonly());
    }
}
