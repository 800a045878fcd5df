//! Slice resolution for typed-buffer indexing.
//!
//! A [`Slice`] is `slice(start, stop, step)` with optional components. Resolving
//! it against a length yields [`SliceIndices`], which keep signed bounds: a
//! negative-step slice that runs off the front resolves `stop` to `-1`, and
//! structural edits (extended delete, extended assign) need that value intact.
//!
//! # Python Semantics
//!
//! - `slice(None, 5)` → `[:5]`
//! - `slice(1, None)` → `[1:]`
//! - `slice(None, None, -1)` → `[::-1]`

use std::fmt;

use crate::error::{IoError, IoResult};

// =============================================================================
// SliceIndices - Resolved slice indices for a sequence of known length
// =============================================================================

/// Resolved slice indices for a specific sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndices {
    /// Resolved start index.
    pub start: isize,
    /// Resolved stop index (may be `-1` for negative steps).
    pub stop: isize,
    /// Resolved step (never 0).
    pub step: isize,
    /// Number of elements in the slice.
    pub length: usize,
}

impl SliceIndices {
    /// Iterate over the slice indices in slice order.
    #[inline]
    pub fn iter(self) -> SliceIndexIter {
        SliceIndexIter {
            current: self.start,
            step: self.step,
            remaining: self.length,
        }
    }

    /// Whether the slice selects a contiguous forward run.
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.step == 1
    }

    /// The same selection expressed with a positive step, as
    /// `(lowest index, one past the highest index, step)`.
    ///
    /// Returns `None` for an empty selection.
    pub fn ascending(&self) -> Option<(usize, usize, usize)> {
        if self.length == 0 {
            return None;
        }
        let span = (self.length as isize - 1) * self.step;
        let (low, high) = if self.step > 0 {
            (self.start, self.start + span)
        } else {
            (self.start + span, self.start)
        };
        Some((low as usize, high as usize + 1, self.step.unsigned_abs()))
    }
}

/// Iterator over resolved slice indices.
pub struct SliceIndexIter {
    current: isize,
    step: isize,
    remaining: usize,
}

impl Iterator for SliceIndexIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.current as usize;
        // Past the last index the cursor is never read, so it may wrap.
        self.current = self.current.wrapping_add(self.step);
        self.remaining -= 1;
        Some(index)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SliceIndexIter {}

// =============================================================================
// Slice
// =============================================================================

/// `slice(start, stop, step)` with optional components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
}

impl Slice {
    /// Create a slice, rejecting a zero step.
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> IoResult<Self> {
        if step == Some(0) {
            return Err(IoError::value("slice step cannot be zero"));
        }
        Ok(Self { start, stop, step })
    }

    /// `[start:stop]`.
    #[inline]
    pub fn range(start: i64, stop: i64) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// `[:]`.
    #[inline]
    pub fn all() -> Self {
        Self::default()
    }

    #[inline]
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    #[inline]
    pub fn stop(&self) -> Option<i64> {
        self.stop
    }

    #[inline]
    pub fn step(&self) -> Option<i64> {
        self.step
    }

    /// Compute concrete indices for a sequence of the given length.
    ///
    /// Defaults depend on the step direction, out-of-range bounds clamp, and
    /// the element count is derived from the clamped bounds.
    pub fn indices(&self, length: usize) -> SliceIndices {
        let len = length as i64;
        // -i64::MIN does not exist; no sequence can tell the two steps apart.
        let step = self.step.unwrap_or(1).max(-i64::MAX);

        let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };

        let clamp = |value: Option<i64>, default: i64| -> i64 {
            match value {
                None => default,
                Some(mut v) => {
                    if v < 0 {
                        v += len;
                        if v < 0 {
                            v = if step < 0 { -1 } else { 0 };
                        }
                    } else if v >= len {
                        v = if step < 0 { len - 1 } else { len };
                    }
                    v
                }
            }
        };

        let start = clamp(self.start, default_start);
        let stop = clamp(self.stop, default_stop);

        let slice_length = if step > 0 {
            if stop > start {
                ((stop - start - 1) / step + 1) as usize
            } else {
                0
            }
        } else if start > stop {
            ((start - stop - 1) / (-step) + 1) as usize
        } else {
            0
        };

        SliceIndices {
            start: start as isize,
            stop: stop as isize,
            step: step as isize,
            length: slice_length,
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: Option<i64>| v.map_or_else(|| "None".to_string(), |n| n.to_string());
        write!(
            f,
            "slice({}, {}, {})",
            part(self.start),
            part(self.stop),
            part(self.step)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(slice: Slice, len: usize) -> Vec<usize> {
        slice.indices(len).iter().collect()
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = Slice::new(None, None, Some(0)).unwrap_err();
        assert!(err.to_string().contains("zero"));
    }

    #[test]
    fn test_indices_simple_forward() {
        let idx = Slice::range(2, 5).indices(10);
        assert_eq!((idx.start, idx.stop, idx.step, idx.length), (2, 5, 1, 3));
        assert!(idx.is_contiguous());
    }

    #[test]
    fn test_indices_full_reverse_keeps_negative_stop() {
        let idx = Slice::new(None, None, Some(-1)).unwrap().indices(5);
        assert_eq!(idx.start, 4);
        assert_eq!(idx.stop, -1);
        assert_eq!(idx.length, 5);
        assert_eq!(collect(Slice::new(None, None, Some(-1)).unwrap(), 5), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_indices_negative_bounds() {
        let s = Slice::new(Some(-3), None, None).unwrap();
        assert_eq!(collect(s, 5), vec![2, 3, 4]);
    }

    #[test]
    fn test_indices_stop_before_start_is_empty() {
        let idx = Slice::range(5, 2).indices(10);
        assert_eq!(idx.length, 0);
        assert_eq!(Slice::range(5, 2).indices(10).ascending(), None);
    }

    #[test]
    fn test_indices_step_larger_than_range() {
        let s = Slice::new(Some(1), Some(4), Some(10)).unwrap();
        assert_eq!(collect(s, 10), vec![1]);
    }

    #[test]
    fn test_ascending_normalizes_negative_step() {
        let s = Slice::new(Some(9), Some(0), Some(-3)).unwrap();
        // selects 9, 6, 3
        assert_eq!(s.indices(10).ascending(), Some((3, 10, 3)));
    }

    #[test]
    fn test_extreme_steps() {
        let s = Slice::new(None, None, Some(i64::MIN)).unwrap();
        let idx = s.indices(3);
        assert_eq!((idx.start, idx.stop, idx.length), (2, -1, 1));
        assert_eq!(collect(s, 3), vec![2]);
        assert_eq!(idx.ascending(), Some((2, 3, i64::MAX as usize)));

        let s = Slice::new(Some(1), None, Some(i64::MAX)).unwrap();
        assert_eq!(collect(s, 3), vec![1]);
    }

    #[test]
    fn test_empty_sequence() {
        let idx = Slice::new(None, None, Some(-2)).unwrap().indices(0);
        assert_eq!(idx.length, 0);
    }

    #[test]
    fn test_display() {
        let s = Slice::new(Some(1), None, Some(2)).unwrap();
        assert_eq!(s.to_string(), "slice(1, None, 2)");
    }
}
