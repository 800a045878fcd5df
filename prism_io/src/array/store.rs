//! Growable native-typed storage behind a [`TypedBuffer`](super::TypedBuffer).
//!
//! # Layout
//!
//! ```text
//! ┌───────────────────────────── capacity ─────────────────────────────┐
//! ┌────────────── len ──────────────┐
//! │ e0 │ e1 │ e2 │ ...  │ e(len-1)  │            (uninitialized)        │
//! └─────────────────────────────────┴───────────────────────────────────┘
//! ```
//!
//! Capacity starts at 8 and only grows, by doubling. Every reallocation bumps
//! a generation counter; native access goes through a [`NativeLock`] whose
//! borrow keeps the store from growing while the pointer is live.

use std::cmp::Ordering;
use std::fmt;

use zerocopy::IntoBytes;

use super::element::Element;
use crate::error::{IoError, IoResult};
use crate::value::Value;

/// Initial physical capacity of a fresh store.
pub const INITIAL_CAPACITY: usize = 8;

// =============================================================================
// ElementStore
// =============================================================================

/// Homogeneous, resizable storage of one native element type.
#[derive(Clone)]
pub struct ElementStore<T: Element> {
    items: Vec<T>,
    generation: u64,
}

impl<T: Element> ElementStore<T> {
    /// Create an empty store with the initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty store with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.max(INITIAL_CAPACITY)),
            generation: 0,
        }
    }

    /// Build a store from existing elements.
    pub fn from_vec(mut items: Vec<T>) -> Self {
        if items.capacity() < INITIAL_CAPACITY {
            items.reserve_exact(INITIAL_CAPACITY - items.len());
        }
        Self {
            items,
            generation: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Physical capacity in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Number of reallocations the store has gone through.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// The logical content as raw native-order bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.items.as_bytes()
    }

    /// Current address of the backing storage.
    ///
    /// The value is only meaningful until the next mutating call.
    #[inline]
    pub fn address(&self) -> usize {
        self.items.as_ptr() as usize
    }

    /// Make room for `needed` elements, doubling capacity until it fits.
    fn ensure_capacity(&mut self, needed: usize) {
        let capacity = self.items.capacity();
        if needed <= capacity {
            return;
        }
        let mut target = capacity.max(INITIAL_CAPACITY);
        while target < needed {
            target = target.saturating_mul(2);
        }
        self.items.reserve_exact(target - self.items.len());
        self.generation += 1;
        log::trace!(
            "element store regrown {} -> {} slots (generation {})",
            capacity,
            self.items.capacity(),
            self.generation
        );
    }

    // -------------------------------------------------------------------------
    // Element access
    // -------------------------------------------------------------------------

    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    /// Overwrite the element at `index`; returns `false` when out of range.
    #[inline]
    pub fn set(&mut self, index: usize, item: T) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Coerce and overwrite the element at `index`.
    pub fn set_value(&mut self, index: usize, value: &Value) -> IoResult<bool> {
        let item = T::coerce(value)?;
        Ok(self.set(index, item))
    }

    // -------------------------------------------------------------------------
    // Growth
    // -------------------------------------------------------------------------

    /// Append a native element.
    #[inline]
    pub fn push(&mut self, item: T) {
        self.ensure_capacity(self.items.len() + 1);
        self.items.push(item);
    }

    /// Coerce and append a host value.
    ///
    /// A failed coercion leaves the store untouched.
    pub fn append(&mut self, value: &Value) -> IoResult<()> {
        let item = T::coerce(value)?;
        self.push(item);
        Ok(())
    }

    /// Insert a native element, shifting the tail right. `index` must be `<= len`.
    pub fn insert(&mut self, index: usize, item: T) {
        self.ensure_capacity(self.items.len() + 1);
        self.items.insert(index, item);
    }

    /// Append a run of native elements.
    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.ensure_capacity(self.items.len() + items.len());
        self.items.extend_from_slice(items);
    }

    /// Append elements reinterpreted from native-order bytes.
    ///
    /// `bytes.len()` must be a multiple of the element width.
    pub fn extend_from_bytes(&mut self, bytes: &[u8]) {
        let width = size_of::<T>();
        debug_assert_eq!(bytes.len() % width, 0);
        let count = bytes.len() / width;
        let start = self.items.len();
        self.ensure_capacity(start + count);
        self.items.resize(start + count, T::default());
        self.items[start..].as_mut_bytes().copy_from_slice(bytes);
    }

    // -------------------------------------------------------------------------
    // Shrinking and rearranging
    // -------------------------------------------------------------------------

    /// Remove and return the element at `index`, shifting the tail left.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Remove and return the last element.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub fn swap(&mut self, i: usize, j: usize) {
        self.items.swap(i, j);
    }

    /// Reverse in place by swapping from both ends.
    pub fn reverse(&mut self) {
        let len = self.items.len();
        for i in 0..len / 2 {
            self.swap(i, len - 1 - i);
        }
    }

    /// Reverse the byte order of every element.
    pub fn byteswap(&mut self) {
        for item in &mut self.items {
            *item = item.swap_bytes();
        }
    }

    /// Drop every element at or after `len`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Remove the contiguous range `[start, stop)`.
    pub fn remove_range(&mut self, start: usize, stop: usize) {
        if start < stop {
            self.items.drain(start..stop);
        }
    }

    /// Delete every `step`-th element of `[start, stop)`, starting at `start`.
    ///
    /// Retained elements are packed toward `start` by a fill cursor while a
    /// skip cursor advances by `step`; elements from `stop` on are kept.
    pub fn remove_stepped(&mut self, start: usize, stop: usize, step: usize) {
        let stop = stop.min(self.items.len());
        if start >= stop {
            return;
        }
        if step <= 1 {
            self.remove_range(start, stop);
            return;
        }

        let mut fill = start;
        let mut skip = start;
        for cursor in start..stop {
            if cursor == skip {
                skip = skip.saturating_add(step);
            } else {
                self.items[fill] = self.items[cursor];
                fill += 1;
            }
        }
        self.items.drain(fill..stop);
    }

    /// Replace `[start, stop)` with `items`, rebuilding the store as
    /// head + items + tail.
    pub fn splice(&mut self, start: usize, stop: usize, items: &[T]) {
        let stop = stop.max(start);
        let new_len = self.items.len() - (stop - start) + items.len();
        let mut rebuilt = Vec::with_capacity(new_len.max(INITIAL_CAPACITY));
        rebuilt.extend_from_slice(&self.items[..start]);
        rebuilt.extend_from_slice(items);
        rebuilt.extend_from_slice(&self.items[stop..]);
        if rebuilt.as_ptr() != self.items.as_ptr() {
            self.generation += 1;
        }
        self.items = rebuilt;
    }

    /// Remove every element.
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    // -------------------------------------------------------------------------
    // Replication
    // -------------------------------------------------------------------------

    /// A new store holding the content repeated `count` times.
    ///
    /// Built by doubling copies of the already-replicated prefix. A count of
    /// zero or less yields an empty store. Fails with `OverflowError` when
    /// the result could not be addressed.
    pub fn multiply(&self, count: i64) -> IoResult<Self> {
        if count <= 0 || self.items.is_empty() {
            return Ok(Self::new());
        }
        let total = usize::try_from(count)
            .ok()
            .and_then(|count| self.items.len().checked_mul(count))
            .filter(|&total| {
                total
                    .checked_mul(size_of::<T>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or_else(|| IoError::Overflow("repeated array is too large".to_string()))?;
        let mut items = Vec::with_capacity(total.max(INITIAL_CAPACITY));
        items.extend_from_slice(&self.items);
        while items.len() * 2 <= total {
            items.extend_from_within(..);
        }
        let remaining = total - items.len();
        items.extend_from_within(..remaining);
        Ok(Self {
            items,
            generation: 0,
        })
    }

    /// Copy the elements of `[start, stop)` into a new store.
    pub fn copy_range(&self, start: usize, stop: usize) -> Self {
        let stop = stop.max(start);
        Self::from_vec(self.items[start..stop].to_vec())
    }

    // -------------------------------------------------------------------------
    // Native access
    // -------------------------------------------------------------------------

    /// Lock the storage for native access.
    ///
    /// The returned guard borrows the store mutably, so no append or insert
    /// can reallocate the storage while the pointer is held.
    pub fn lock_native(&mut self) -> NativeLock<'_, T> {
        log::trace!(
            "element store locked at {:#x} (generation {})",
            self.address(),
            self.generation
        );
        NativeLock { store: self }
    }
}

impl<T: Element> Default for ElementStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Debug for ElementStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Element> PartialEq for ElementStore<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Element> PartialOrd for ElementStore<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.items.as_slice().partial_cmp(other.items.as_slice())
    }
}

// =============================================================================
// NativeLock
// =============================================================================

/// Scoped native access to an [`ElementStore`].
///
/// The storage cannot move while the guard is alive; releasing the guard
/// releases the lock.
pub struct NativeLock<'a, T: Element> {
    store: &'a mut ElementStore<T>,
}

impl<T: Element> NativeLock<'_, T> {
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.store.items.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.store.items.as_mut_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.store.items
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.store.items
    }

    /// Generation of the storage this lock pins.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.store.generation
    }
}

impl<T: Element> Drop for NativeLock<'_, T> {
    fn drop(&mut self) {
        log::trace!(
            "element store unlocked (generation {})",
            self.store.generation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn store_of(items: &[i32]) -> ElementStore<i32> {
        ElementStore::from_vec(items.to_vec())
    }

    // ------------------------------------------------------------------------
    // Growth
    // ------------------------------------------------------------------------

    #[test]
    fn test_initial_capacity_and_doubling() {
        let mut store = ElementStore::<u8>::new();
        assert!(store.capacity() >= INITIAL_CAPACITY);
        assert_eq!(store.generation(), 0);
        for i in 0..9u8 {
            store.push(i);
        }
        assert!(store.capacity() >= 16);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_append_overflow_leaves_length() {
        let mut store = ElementStore::<i8>::new();
        store.append(&Value::Int(127)).unwrap();
        let err = store.append(&Value::Int(128)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverflowError);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_extend_from_bytes_native_order() {
        let mut store = ElementStore::<u16>::new();
        store.extend_from_bytes(&0x0102u16.to_ne_bytes());
        store.extend_from_bytes(&[0, 0]);
        assert_eq!(store.as_slice(), &[0x0102, 0]);
        assert_eq!(store.as_bytes().len(), 4);
    }

    // ------------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------------

    #[test]
    fn test_insert_remove_swap() {
        let mut store = store_of(&[1, 2, 3]);
        store.insert(0, 0);
        assert_eq!(store.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(store.remove_at(2), Some(2));
        assert_eq!(store.remove_at(9), None);
        store.swap(0, 2);
        assert_eq!(store.as_slice(), &[3, 1, 0]);
    }

    #[test]
    fn test_reverse() {
        let mut store = store_of(&[1, 2, 3, 4, 5]);
        store.reverse();
        assert_eq!(store.as_slice(), &[5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_remove_stepped() {
        let mut store = store_of(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        store.remove_stepped(1, 8, 3);
        // removes 1, 4, 7
        assert_eq!(store.as_slice(), &[0, 2, 3, 5, 6, 8, 9]);
    }

    #[test]
    fn test_remove_stepped_empty_range_is_noop() {
        let mut store = store_of(&[0, 1, 2]);
        store.remove_stepped(2, 1, 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_splice_rebuilds() {
        let mut store = store_of(&[1, 2, 3, 4]);
        store.splice(1, 3, &[9, 9, 9]);
        assert_eq!(store.as_slice(), &[1, 9, 9, 9, 4]);
        store.splice(2, 1, &[7]);
        assert_eq!(store.as_slice(), &[1, 9, 7, 9, 9, 4]);
    }

    #[test]
    fn test_byteswap() {
        let mut store = ElementStore::<u32>::from_vec(vec![0x0102_0304]);
        store.byteswap();
        assert_eq!(store.as_slice(), &[0x0403_0201]);
    }

    // ------------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------------

    #[test]
    fn test_multiply() {
        let store = store_of(&[1, 2, 3]);
        for count in 0..9 {
            let expected: Vec<i32> = (0..count).flat_map(|_| [1, 2, 3]).collect();
            assert_eq!(store.multiply(count as i64).unwrap().as_slice(), expected.as_slice());
        }
        assert!(store.multiply(-4).unwrap().is_empty());
    }

    #[test]
    fn test_multiply_rejects_unaddressable_result() {
        let store = store_of(&[1, 2, 3]);
        let err = store.multiply(i64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverflowError);
        assert!(ElementStore::<i32>::new().multiply(i64::MAX).unwrap().is_empty());
    }

    // ------------------------------------------------------------------------
    // Native access
    // ------------------------------------------------------------------------

    #[test]
    fn test_native_lock_reflects_current_storage() {
        let mut store = store_of(&[1, 2]);
        let before = store.address();
        {
            let mut lock = store.lock_native();
            assert_eq!(lock.as_ptr() as usize, before);
            lock.as_mut_slice()[0] = 10;
            assert_eq!(lock.generation(), 0);
        }
        for i in 0..64 {
            store.push(i);
        }
        let lock = store.lock_native();
        assert!(lock.generation() > 0);
        assert_eq!(lock.as_slice()[0], 10);
    }

    #[test]
    fn test_ordering_is_elementwise() {
        assert!(store_of(&[1, 2]) < store_of(&[1, 3]));
        assert!(store_of(&[1, 2]) < store_of(&[1, 2, 0]));
        assert_eq!(store_of(&[4]), store_of(&[4]));
    }
}
