//! Raw unbuffered file I/O.
//!
//! `FileIO` is the bottom of the stream stack: every `readinto` and `write`
//! is exactly one system call, so short reads and short writes pass straight
//! through to the buffered layers above.

use std::fs::File;
use std::io::{self, IsTerminal, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::base::{IoBase, RawIo, Whence, WriteProgress};
use super::mode::FileMode;
use crate::error::{IoError, IoResult, OsError};

/// `EINVAL`, reported for seeks before the start of the file.
const EINVAL: i32 = 22;

/// Raw unbuffered file stream.
pub struct FileIO {
    /// `None` once closed.
    file: Option<File>,
    mode: FileMode,
    /// Path the file was opened from, used in error messages.
    path: Option<Box<str>>,
    /// Whether closing releases the OS handle.
    closefd: bool,
}

impl FileIO {
    /// Open `path` with an already-validated mode.
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode) -> IoResult<Self> {
        let path_ref = path.as_ref();
        let name = path_ref.to_string_lossy();
        let mut file = mode
            .to_open_options()
            .open(path_ref)
            .map_err(|e| IoError::os(&e, Some(&name)))?;
        if mode.append {
            file.seek(SeekFrom::End(0))
                .map_err(|e| IoError::os(&e, Some(&name)))?;
        }
        log::debug!("opened {name:?} as {}", mode.raw_mode());

        Ok(Self {
            file: Some(file),
            mode,
            path: Some(name.into_owned().into_boxed_str()),
            closefd: true,
        })
    }

    /// Wrap an existing handle.
    ///
    /// With `closefd == false`, closing this stream leaves the OS handle open
    /// for whoever else owns it.
    #[inline]
    pub fn from_file(file: File, mode: FileMode, closefd: bool) -> Self {
        Self {
            file: Some(file),
            mode,
            path: None,
            closefd,
        }
    }

    #[inline]
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The raw mode string (`rb`, `wb`, `rb+`, ...).
    #[inline]
    pub fn mode_string(&self) -> String {
        self.mode.raw_mode()
    }

    /// The path the stream was opened from, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[inline]
    pub fn closefd(&self) -> bool {
        self.closefd
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> IoResult<u64> {
        let file = self.handle()?;
        file.metadata()
            .map(|m| m.len())
            .map_err(|e| self.os_error(&e))
    }

    #[inline]
    fn handle(&self) -> IoResult<&File> {
        self.file.as_ref().ok_or(IoError::Closed)
    }

    #[inline]
    fn handle_mut(&mut self) -> IoResult<&mut File> {
        self.file.as_mut().ok_or(IoError::Closed)
    }

    #[inline]
    fn os_error(&self, err: &io::Error) -> IoError {
        IoError::os(err, self.path.as_deref())
    }

    fn check_readable(&self) -> IoResult<()> {
        self.check_closed()?;
        if self.mode.read {
            Ok(())
        } else {
            Err(IoError::unsupported("File not open for reading"))
        }
    }

    fn check_writable(&self) -> IoResult<()> {
        self.check_closed()?;
        if self.mode.write {
            Ok(())
        } else {
            Err(IoError::unsupported("File not open for writing"))
        }
    }
}

impl IoBase for FileIO {
    #[inline]
    fn closed(&self) -> bool {
        self.file.is_none()
    }

    #[inline]
    fn readable(&self) -> bool {
        self.mode.read
    }

    #[inline]
    fn writable(&self) -> bool {
        self.mode.write
    }

    fn seekable(&self) -> bool {
        self.file.as_ref().is_some_and(|f| !f.is_terminal())
    }

    fn isatty(&self) -> IoResult<bool> {
        Ok(self.handle()?.is_terminal())
    }

    fn close(&mut self) -> IoResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        log::debug!("closing {:?}", self.path.as_deref().unwrap_or("<fd>"));
        if !self.closefd {
            // The handle belongs to someone else.
            std::mem::forget(file);
        }
        Ok(())
    }

    fn flush(&mut self) -> IoResult<()> {
        let result = self.handle_mut()?.flush();
        result.map_err(|e| self.os_error(&e))
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        let target = match whence {
            Whence::Start => {
                if offset < 0 {
                    let err = OsError::new(EINVAL, "Invalid argument");
                    return Err(IoError::Os(match self.path.as_deref() {
                        Some(path) => OsError::with_path(err.code, err.message, path),
                        None => err,
                    }));
                }
                SeekFrom::Start(offset as u64)
            }
            Whence::Current => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };
        let result = self.handle_mut()?.seek(target);
        result.map_err(|e| self.os_error(&e))
    }

    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.check_writable()?;
        let size = match size {
            Some(size) if size < 0 => {
                return Err(IoError::Os(OsError::new(EINVAL, "Invalid argument")));
            }
            Some(size) => size as u64,
            None => self.tell()?,
        };
        let result = self.handle()?.set_len(size);
        result.map_err(|e| self.os_error(&e))?;
        Ok(size)
    }
}

impl RawIo for FileIO {
    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.check_readable()?;
        loop {
            let result = self.handle_mut()?.read(buf);
            match result {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(IoError::Blocking { written: 0 });
                }
                Err(e) => return Err(self.os_error(&e)),
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        self.check_writable()?;
        loop {
            let result = self.handle_mut()?.write(data);
            match result {
                Ok(n) => return Ok(WriteProgress::Done(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(WriteProgress::WouldBlock(0));
                }
                Err(e) => return Err(self.os_error(&e)),
            }
        }
    }
}

impl Drop for FileIO {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("error closing file during drop: {err}");
        }
    }
}

impl std::fmt::Debug for FileIO {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIO")
            .field("name", &self.path)
            .field("mode", &self.mode.raw_mode())
            .field("closed", &self.closed())
            .field("closefd", &self.closefd)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
