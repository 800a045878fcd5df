//! Zero-copy buffer exchange.
//!
//! Any container that can lend out its contiguous bytes implements
//! [`BufferProtocol`]. The view borrows the container, so the container
//! cannot be resized while a view exists.

use crate::array::TypedBuffer;

/// Borrowed, single-dimension, contiguous view of a container's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
    format: char,
    itemsize: usize,
    readonly: bool,
}

impl<'a> BufferView<'a> {
    /// A view of `bytes` as items of `itemsize` bytes with format `format`.
    ///
    /// `bytes.len()` must be a multiple of `itemsize`.
    pub fn new(bytes: &'a [u8], format: char, itemsize: usize, readonly: bool) -> Self {
        debug_assert!(itemsize > 0 && bytes.len() % itemsize == 0);
        Self {
            bytes,
            format,
            itemsize,
            readonly,
        }
    }

    /// A plain unsigned-byte view.
    #[inline]
    pub fn bytes(bytes: &'a [u8], readonly: bool) -> Self {
        Self::new(bytes, 'B', 1, readonly)
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// One-character element format.
    #[inline]
    pub fn format(&self) -> char {
        self.format
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len() / self.itemsize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn nbytes(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        1
    }

    #[inline]
    pub fn shape(&self) -> [usize; 1] {
        [self.len()]
    }

    /// Contiguous strides: one item per step.
    #[inline]
    pub fn strides(&self) -> [isize; 1] {
        [self.itemsize as isize]
    }

    #[inline]
    pub fn readonly(&self) -> bool {
        self.readonly
    }
}

/// A container that can lend out its bytes without copying.
pub trait BufferProtocol {
    fn buffer_view(&self) -> BufferView<'_>;
}

impl BufferProtocol for [u8] {
    fn buffer_view(&self) -> BufferView<'_> {
        BufferView::bytes(self, true)
    }
}

impl BufferProtocol for Vec<u8> {
    fn buffer_view(&self) -> BufferView<'_> {
        BufferView::bytes(self, false)
    }
}

impl BufferProtocol for TypedBuffer {
    fn buffer_view(&self) -> BufferView<'_> {
        BufferView::new(self.as_bytes(), self.typecode(), self.itemsize(), false)
    }
}
