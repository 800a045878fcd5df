//! `TypedBuffer` construction, sequence operations and bulk conversion.
//!
//! Slicing, arithmetic, comparison and `repr` live in `ops.rs`.

use super::element::{Element, WideChar};
use super::store::ElementStore;
use super::typecode::TypeCode;
use crate::error::{IoError, IoResult};
use crate::io::{ByteSink, ByteSource};
use crate::value::Value;

// =============================================================================
// Storage
// =============================================================================

/// One concretely-typed store per native element kind.
///
/// `i`/`l` and `I`/`L` share a variant; the tag on the owning buffer keeps
/// them apart.
#[derive(Debug, Clone)]
pub(crate) enum Storage {
    I8(ElementStore<i8>),
    U8(ElementStore<u8>),
    Wide(ElementStore<WideChar>),
    I16(ElementStore<i16>),
    U16(ElementStore<u16>),
    I32(ElementStore<i32>),
    U32(ElementStore<u32>),
    I64(ElementStore<i64>),
    U64(ElementStore<u64>),
    F32(ElementStore<f32>),
    F64(ElementStore<f64>),
}

macro_rules! storage_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<ElementStore<$t>> for Storage {
                #[inline]
                fn from(store: ElementStore<$t>) -> Self {
                    Storage::$variant(store)
                }
            }
        )*
    };
}

storage_from! {
    i8 => I8,
    u8 => U8,
    WideChar => Wide,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl Storage {
    /// An empty store of the width `code` selects.
    pub(crate) fn new(code: TypeCode) -> Self {
        match code {
            TypeCode::SignedByte => Storage::I8(ElementStore::new()),
            TypeCode::UnsignedByte => Storage::U8(ElementStore::new()),
            TypeCode::WideChar => Storage::Wide(ElementStore::new()),
            TypeCode::Short => Storage::I16(ElementStore::new()),
            TypeCode::UnsignedShort => Storage::U16(ElementStore::new()),
            TypeCode::Int | TypeCode::Long => Storage::I32(ElementStore::new()),
            TypeCode::UnsignedInt | TypeCode::UnsignedLong => Storage::U32(ElementStore::new()),
            TypeCode::LongLong => Storage::I64(ElementStore::new()),
            TypeCode::UnsignedLongLong => Storage::U64(ElementStore::new()),
            TypeCode::Float => Storage::F32(ElementStore::new()),
            TypeCode::Double => Storage::F64(ElementStore::new()),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        dispatch!(self, s => s.len())
    }

    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        dispatch!(self, s => s.as_bytes())
    }
}

/// Coerce every value, failing before anything is stored.
pub(crate) fn coerce_all<T: Element>(values: &[Value]) -> IoResult<Vec<T>> {
    values.iter().map(T::coerce).collect()
}

// =============================================================================
// Source
// =============================================================================

/// Initializer or `extend` argument.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Another typed buffer.
    Array(&'a TypedBuffer),
    /// Bytes imported in native element layout.
    Bytes(&'a [u8]),
    /// Text; only `'u'` buffers accept it.
    Text(&'a str),
    /// Arbitrary host values, appended one at a time.
    Items(&'a [Value]),
}

// =============================================================================
// TypedBuffer
// =============================================================================

/// A homogeneous, resizable array whose elements share one native type.
#[derive(Debug, Clone)]
pub struct TypedBuffer {
    pub(crate) code: TypeCode,
    pub(crate) storage: Storage,
}

impl TypedBuffer {
    /// Create an empty buffer for the tag character `typecode`.
    pub fn new(typecode: char) -> IoResult<Self> {
        Ok(Self::with_code(TypeCode::from_char(typecode)?))
    }

    /// Create an empty buffer for an already-parsed tag.
    pub fn with_code(code: TypeCode) -> Self {
        Self {
            code,
            storage: Storage::new(code),
        }
    }

    /// Create a buffer and fill it from `init`.
    ///
    /// A buffer initializer of a different tag is converted element by
    /// element; text initializes only `'u'` buffers.
    pub fn with_initializer(typecode: char, init: Source<'_>) -> IoResult<Self> {
        let mut buffer = Self::new(typecode)?;
        match init {
            Source::Text(_) if buffer.code != TypeCode::WideChar => {
                return Err(IoError::type_error(format!(
                    "cannot use a str to initialize an array with typecode '{}'",
                    buffer.code
                )));
            }
            Source::Array(other) if other.code != buffer.code => {
                if (other.code == TypeCode::WideChar) != (buffer.code == TypeCode::WideChar) {
                    return Err(IoError::type_error(format!(
                        "cannot use a unicode array to initialize an array with typecode '{}'",
                        buffer.code
                    )));
                }
                buffer.extend_values(&other.tolist())?;
            }
            init => buffer.extend(init)?,
        }
        Ok(buffer)
    }

    pub(crate) fn from_parts(code: TypeCode, storage: Storage) -> Self {
        Self { code, storage }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The tag character.
    #[inline]
    pub fn typecode(&self) -> char {
        self.code.as_char()
    }

    #[inline]
    pub fn code(&self) -> TypeCode {
        self.code
    }

    /// Size in bytes of one element.
    #[inline]
    pub fn itemsize(&self) -> usize {
        self.code.itemsize()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(address, element count)` of the current storage.
    ///
    /// The address is invalidated by the next call that grows the buffer.
    pub fn buffer_info(&self) -> (usize, usize) {
        dispatch!(&self.storage, s => (s.address(), s.len()))
    }

    /// Resolve a possibly negative index against the current length.
    pub(crate) fn normalize_index(&self, index: i64) -> Option<usize> {
        let len = self.len() as i64;
        let resolved = if index < 0 { index + len } else { index };
        (0..len).contains(&resolved).then_some(resolved as usize)
    }

    // -------------------------------------------------------------------------
    // Extension
    // -------------------------------------------------------------------------

    /// Extend from another buffer, bytes, text or host values.
    pub fn extend(&mut self, source: Source<'_>) -> IoResult<()> {
        match source {
            Source::Array(other) => self.extend_from(other),
            Source::Bytes(bytes) => self.frombytes(bytes),
            Source::Text(text) => self.fromunicode(text),
            Source::Items(values) => self.extend_values(values),
        }
    }

    /// Bulk-append the elements of a buffer with the same tag (`+=`).
    pub fn extend_from(&mut self, other: &TypedBuffer) -> IoResult<()> {
        if other.code != self.code {
            return Err(IoError::type_error("cannot extend with different typecode"));
        }
        dispatch_pair!(&mut self.storage, &other.storage, (dst, src) => {
            dst.extend_from_slice(src.as_slice());
            Ok(())
        }, _ => Err(IoError::type_error("cannot extend with different typecode")))
    }

    /// Append host values one at a time.
    ///
    /// Values before the first failing one stay appended.
    pub fn extend_values(&mut self, values: &[Value]) -> IoResult<()> {
        dispatch!(&mut self.storage, s => {
            for value in values {
                s.append(value)?;
            }
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Sequence operations
    // -------------------------------------------------------------------------

    /// Coerce and append one value.
    pub fn append(&mut self, value: &Value) -> IoResult<()> {
        dispatch!(&mut self.storage, s => s.append(value))
    }

    /// Insert before `index`, clamping out-of-range indices to the ends.
    pub fn insert(&mut self, index: i64, value: &Value) -> IoResult<()> {
        let len = self.len() as i64;
        let mut index = if index < 0 { index + len } else { index };
        index = index.clamp(0, len);
        dispatch!(&mut self.storage, s => {
            s.insert(index as usize, Element::coerce(value)?);
            Ok(())
        })
    }

    /// Index of the first element equal to `value`.
    pub fn find(&self, value: &Value) -> Option<usize> {
        dispatch!(&self.storage, s => s.as_slice().iter().position(|item| item.matches(value)))
    }

    /// Remove the first element equal to `value`.
    pub fn remove(&mut self, value: &Value) -> IoResult<()> {
        let index = self
            .find(value)
            .ok_or_else(|| IoError::value("array.remove(x): x not in array"))?;
        dispatch!(&mut self.storage, s => {
            s.remove_at(index);
        });
        Ok(())
    }

    /// Remove and return the element at `index` (default `-1`).
    pub fn pop(&mut self, index: i64) -> IoResult<Value> {
        if self.is_empty() {
            return Err(IoError::Index("pop from empty array".to_string()));
        }
        let index = self
            .normalize_index(index)
            .ok_or_else(|| IoError::Index("pop index out of range".to_string()))?;
        dispatch!(&mut self.storage, s => s
            .remove_at(index)
            .map(Element::to_value)
            .ok_or_else(|| IoError::Index("pop index out of range".to_string())))
    }

    /// Index of the first element equal to `value`.
    pub fn index(&self, value: &Value) -> IoResult<usize> {
        self.find(value)
            .ok_or_else(|| IoError::value("array.index(x): x not in array"))
    }

    /// Number of elements equal to `value`.
    pub fn count(&self, value: &Value) -> usize {
        dispatch!(&self.storage, s => s.as_slice().iter().filter(|item| item.matches(value)).count())
    }

    /// Whether any element equals `value`.
    #[inline]
    pub fn contains(&self, value: &Value) -> bool {
        self.find(value).is_some()
    }

    pub fn reverse(&mut self) {
        dispatch!(&mut self.storage, s => s.reverse())
    }

    /// Reverse the byte order of every element.
    pub fn byteswap(&mut self) {
        dispatch!(&mut self.storage, s => s.byteswap())
    }

    // -------------------------------------------------------------------------
    // Indexing
    // -------------------------------------------------------------------------

    /// Element at `index`, widened to a host value.
    pub fn get(&self, index: i64) -> IoResult<Value> {
        self.normalize_index(index)
            .and_then(|i| dispatch!(&self.storage, s => s.get(i).map(Element::to_value)))
            .ok_or_else(|| IoError::Index("array index out of range".to_string()))
    }

    /// Overwrite the element at `index`.
    pub fn set(&mut self, index: i64, value: &Value) -> IoResult<()> {
        let i = self
            .normalize_index(index)
            .ok_or_else(|| IoError::Index("array assignment index out of range".to_string()))?;
        dispatch!(&mut self.storage, s => s.set_value(i, value).map(|_| ()))
    }

    /// Delete the element at `index`.
    pub fn delete(&mut self, index: i64) -> IoResult<()> {
        let i = self
            .normalize_index(index)
            .ok_or_else(|| IoError::Index("array assignment index out of range".to_string()))?;
        dispatch!(&mut self.storage, s => {
            s.remove_at(i);
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bytes, files and lists
    // -------------------------------------------------------------------------

    /// The elements as native-order bytes, without copying.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    /// The elements as native-order bytes.
    pub fn tobytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Append elements from native-order bytes.
    pub fn frombytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        if bytes.len() % self.itemsize() != 0 {
            return Err(IoError::value("bytes length not a multiple of item size"));
        }
        dispatch!(&mut self.storage, s => s.extend_from_bytes(bytes));
        Ok(())
    }

    /// Write every element to `sink` in native layout.
    pub fn tofile<S: ByteSink + ?Sized>(&self, sink: &mut S) -> IoResult<()> {
        sink.write_bytes(self.as_bytes())
    }

    /// Read `n` elements from `source` and append them.
    ///
    /// Fails with `EOFError` and appends nothing when fewer bytes arrive.
    pub fn fromfile<S: ByteSource + ?Sized>(&mut self, source: &mut S, n: usize) -> IoResult<()> {
        let wanted = n
            .checked_mul(self.itemsize())
            .ok_or_else(|| IoError::Overflow("fromfile() count too large".to_string()))?;
        let data = source.read_bytes(wanted)?;
        if data.len() < wanted {
            return Err(IoError::Eof("file not large enough".to_string()));
        }
        self.frombytes(&data)
    }

    /// Every element widened to a host value.
    pub fn tolist(&self) -> Vec<Value> {
        dispatch!(&self.storage, s => s.as_slice().iter().map(|item| item.to_value()).collect())
    }

    /// Append host values, all or nothing.
    pub fn fromlist(&mut self, values: &[Value]) -> IoResult<()> {
        dispatch!(&mut self.storage, s => {
            s.extend_from_slice(&coerce_all(values)?);
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// Append the UTF-16 code units of `text` to a `'u'` buffer.
    pub fn fromunicode(&mut self, text: &str) -> IoResult<()> {
        let Storage::Wide(s) = &mut self.storage else {
            return Err(IoError::value(
                "fromunicode() may only be called on unicode type arrays",
            ));
        };
        let units: Vec<WideChar> = text.encode_utf16().map(WideChar).collect();
        s.extend_from_slice(&units);
        Ok(())
    }

    /// Decode a `'u'` buffer to text; lone surrogates become U+FFFD.
    pub fn tounicode(&self) -> IoResult<String> {
        let Storage::Wide(s) = &self.storage else {
            return Err(IoError::value(
                "tounicode() may only be called on unicode type arrays",
            ));
        };
        Ok(char::decode_utf16(s.as_slice().iter().map(|unit| unit.0))
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect())
    }
}
