//! A stream handle that can be shared between threads.
//!
//! Every layer in the stack takes `&mut self`, so one instance already has
//! one caller at a time. `SharedStream` adds the per-instance lock for the
//! case where several threads hold the same stream: each call takes the
//! lock for its whole duration, so calls are serialized in the order they
//! acquire it and never interleave half-way.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::base::{BufferedIo, IoBase, RawIo, Whence, WriteProgress};
use crate::error::IoResult;

/// Cloneable, lock-protected handle to a stream.
#[derive(Debug, Default)]
pub struct SharedStream<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStream<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SharedStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    /// Hold the lock across several calls.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock()
    }

    /// The stream back, if this is the last handle.
    pub fn try_unwrap(self) -> Result<S, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<S: IoBase> IoBase for SharedStream<S> {
    fn closed(&self) -> bool {
        self.lock().closed()
    }

    fn readable(&self) -> bool {
        self.lock().readable()
    }

    fn writable(&self) -> bool {
        self.lock().writable()
    }

    fn seekable(&self) -> bool {
        self.lock().seekable()
    }

    fn isatty(&self) -> IoResult<bool> {
        self.lock().isatty()
    }

    fn close(&mut self) -> IoResult<()> {
        self.lock().close()
    }

    fn flush(&mut self) -> IoResult<()> {
        self.lock().flush()
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> IoResult<u64> {
        self.lock().seek(offset, whence)
    }

    fn tell(&mut self) -> IoResult<u64> {
        self.lock().tell()
    }

    fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.lock().truncate(size)
    }

    fn check_closed(&self) -> IoResult<()> {
        self.lock().check_closed()
    }
}

impl<S: RawIo> RawIo for SharedStream<S> {
    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.lock().readinto(buf)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        self.lock().write(data)
    }

    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        RawIo::read(&mut *self.lock(), size)
    }

    fn readall(&mut self) -> IoResult<Vec<u8>> {
        self.lock().readall()
    }
}

impl<S: BufferedIo> BufferedIo for SharedStream<S> {
    fn read(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        BufferedIo::read(&mut *self.lock(), size)
    }

    fn read1(&mut self, size: Option<usize>) -> IoResult<Vec<u8>> {
        self.lock().read1(size)
    }

    fn peek(&mut self, size: usize) -> IoResult<Vec<u8>> {
        self.lock().peek(size)
    }

    fn readinto(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        BufferedIo::readinto(&mut *self.lock(), buf)
    }

    fn write(&mut self, data: &[u8]) -> IoResult<WriteProgress> {
        BufferedIo::write(&mut *self.lock(), data)
    }

    fn readline(&mut self, limit: Option<usize>) -> IoResult<Vec<u8>> {
        self.lock().readline(limit)
    }

    /// Written under one lock so lines from other threads cannot interleave.
    fn writelines(&mut self, lines: &[&[u8]]) -> IoResult<()> {
        self.lock().writelines(lines)
    }
}
