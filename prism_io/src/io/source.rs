//! Bulk byte exchange between typed buffers and streams.
//!
//! `TypedBuffer::tofile` and `fromfile` only need "write all of this" and
//! "give me up to n bytes". Any buffered stream provides both; the raw file
//! layer provides them by looping its single-call reads and writes.

use super::base::{BufferedIo, RawIo, WriteProgress};
use super::file_io::FileIO;
use crate::error::{IoError, IoResult};
use crate::protocol::BufferProtocol;

/// Something bytes can be pulled from.
pub trait ByteSource {
    /// Read up to `n` bytes, returning fewer only at end of stream.
    fn read_bytes(&mut self, n: usize) -> IoResult<Vec<u8>>;
}

/// Something bytes can be pushed into.
pub trait ByteSink {
    /// Write all of `data`. A would-block condition surfaces as
    /// [`IoError::Blocking`] carrying the bytes accepted so far.
    fn write_bytes(&mut self, data: &[u8]) -> IoResult<()>;

    /// Write the bytes lent out by a buffer-protocol object.
    fn write_buffer<B: BufferProtocol + ?Sized>(&mut self, obj: &B) -> IoResult<()>
    where
        Self: Sized,
    {
        self.write_bytes(obj.buffer_view().as_bytes())
    }
}

impl<T: BufferedIo + ?Sized> ByteSource for T {
    fn read_bytes(&mut self, n: usize) -> IoResult<Vec<u8>> {
        self.read(Some(n))
    }
}

impl<T: BufferedIo + ?Sized> ByteSink for T {
    fn write_bytes(&mut self, data: &[u8]) -> IoResult<()> {
        write_all_with(data, |chunk| self.write(chunk))
    }
}

impl ByteSource for FileIO {
    fn read_bytes(&mut self, n: usize) -> IoResult<Vec<u8>> {
        let mut out = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.readinto(&mut out[filled..])?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        out.truncate(filled);
        Ok(out)
    }
}

impl ByteSink for FileIO {
    fn write_bytes(&mut self, data: &[u8]) -> IoResult<()> {
        write_all_with(data, |chunk| RawIo::write(self, chunk))
    }
}

/// Drive `write` until `data` is consumed.
fn write_all_with(
    data: &[u8],
    mut write: impl FnMut(&[u8]) -> IoResult<WriteProgress>,
) -> IoResult<()> {
    let mut written = 0;
    while written < data.len() {
        match write(&data[written..])? {
            WriteProgress::Done(0) => {
                return Err(IoError::stream("write returned 0 bytes"));
            }
            WriteProgress::Done(n) => written += n,
            WriteProgress::WouldBlock(n) => {
                return Err(IoError::Blocking {
                    written: written + n,
                });
            }
        }
    }
    Ok(())
}
