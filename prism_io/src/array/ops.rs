//! Slicing, arithmetic, comparison and `repr` for [`TypedBuffer`].

use std::cmp::Ordering;
use std::fmt;

use super::element::Element;
use super::store::ElementStore;
use super::typecode::TypeCode;
use super::typed::TypedBuffer;
use crate::config::IoConfig;
use crate::error::{IoError, IoResult};
use crate::slice::Slice;
use crate::value::str_repr;

impl TypedBuffer {
    // -------------------------------------------------------------------------
    // Slicing
    // -------------------------------------------------------------------------

    /// A new buffer with the same tag holding the selected elements.
    pub fn get_slice(&self, slice: &Slice) -> TypedBuffer {
        let idx = slice.indices(self.len());
        let storage = dispatch!(&self.storage, s => {
            if idx.is_contiguous() {
                let start = idx.start as usize;
                Storage::from(s.copy_range(start, start + idx.length))
            } else {
                let items = s.as_slice();
                Storage::from(ElementStore::from_vec(idx.iter().map(|i| items[i]).collect()))
            }
        });
        TypedBuffer::from_parts(self.code, storage)
    }

    /// Assign `value` to the selected elements.
    ///
    /// `value` must carry the same tag. A contiguous slice is replaced
    /// wholesale and may change the length; an extended slice must select
    /// exactly `value.len()` elements.
    pub fn set_slice(&mut self, slice: &Slice, value: &TypedBuffer) -> IoResult<()> {
        if value.code != self.code {
            return Err(IoError::type_error("bad argument type for built-in operation"));
        }
        let idx = slice.indices(self.len());
        dispatch_pair!(&mut self.storage, &value.storage, (dst, src) => {
            if idx.is_contiguous() {
                let start = idx.start as usize;
                let stop = idx.stop.max(idx.start) as usize;
                dst.splice(start, stop, src.as_slice());
            } else {
                if src.len() != idx.length {
                    return Err(IoError::value(format!(
                        "attempt to assign array of size {} to extended slice of size {}",
                        src.len(),
                        idx.length
                    )));
                }
                for (i, &item) in idx.iter().zip(src.as_slice()) {
                    dst.set(i, item);
                }
            }
            Ok(())
        }, _ => Err(IoError::type_error("bad argument type for built-in operation")))
    }

    /// Delete the selected elements.
    ///
    /// Negative steps are normalized to the equivalent ascending selection
    /// before compaction; an empty selection is a no-op.
    pub fn delete_slice(&mut self, slice: &Slice) {
        let Some((low, high, step)) = slice.indices(self.len()).ascending() else {
            return;
        };
        dispatch!(&mut self.storage, s => s.remove_stepped(low, high, step))
    }

    // -------------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------------

    /// `self + other`.
    pub fn concat(&self, other: &TypedBuffer) -> IoResult<TypedBuffer> {
        if other.code != self.code {
            return Err(IoError::type_error("cannot add different typecodes"));
        }
        let mut out = self.clone();
        out.extend_from(other)?;
        Ok(out)
    }

    /// `self * count`, bounded by the default [`IoConfig::max_array_bytes`].
    pub fn repeat(&self, count: i64) -> IoResult<TypedBuffer> {
        self.repeat_bounded(count, IoConfig::default().max_array_bytes)
    }

    /// `self * count`, failing before allocation when the result would
    /// exceed `max_bytes`.
    pub fn repeat_bounded(&self, count: i64, max_bytes: usize) -> IoResult<TypedBuffer> {
        if count > 0 {
            let total = self.as_bytes().len().checked_mul(count as usize);
            if total.is_none_or(|total| total > max_bytes) {
                return Err(IoError::Overflow("repeated array is too large".to_string()));
            }
        }
        let storage = dispatch!(&self.storage, s => Storage::from(s.multiply(count)?));
        Ok(TypedBuffer::from_parts(self.code, storage))
    }

    /// `self *= count`.
    pub fn repeat_in_place(&mut self, count: i64) -> IoResult<()> {
        *self = self.repeat(count)?;
        Ok(())
    }
}

// =============================================================================
// Comparison
// =============================================================================

impl PartialEq for TypedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && dispatch_pair!(&self.storage, &other.storage, (a, b) => a == b, _ => false)
    }
}

impl PartialOrd for TypedBuffer {
    /// Tag first (mismatched tags are unordered), then length, then elements.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.code != other.code {
            return None;
        }
        match self.len().cmp(&other.len()) {
            Ordering::Equal => {
                dispatch_pair!(&self.storage, &other.storage, (a, b) => a.partial_cmp(b), _ => None)
            }
            unequal => Some(unequal),
        }
    }
}

// =============================================================================
// Repr
// =============================================================================

impl fmt::Display for TypedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "array('{}')", self.code);
        }
        if self.code == TypeCode::WideChar {
            let text = self.tounicode().unwrap_or_default();
            return write!(f, "array('u', {})", str_repr(&text));
        }
        let items: Vec<String> = dispatch!(&self.storage, s => s
            .as_slice()
            .iter()
            .map(|item| item.to_value().repr())
            .collect());
        write!(f, "array('{}', [{}])", self.code, items.join(", "))
    }
}
