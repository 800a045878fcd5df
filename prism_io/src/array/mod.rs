//! Typed buffers: homogeneous, resizable arrays of one native element type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TypedBuffer                          │
//! │  tag ('i')  ─────►  Storage::I32(ElementStore<i32>)         │
//! │                        │                                    │
//! │   Value ──coerce──►  Element ──as_bytes──►  ByteSink        │
//! │   Value ◄──widen───  Element ◄─from bytes─  ByteSource      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every tag-dependent operation is a `match` over `Storage`; the
//! `dispatch!` macros below keep those matches in one place.

/// Run `$body` with `$s` bound to the concrete store inside `$storage`.
macro_rules! dispatch {
    ($storage:expr, $s:ident => $body:expr) => {{
        use $crate::array::typed::Storage;
        match $storage {
            Storage::I8($s) => $body,
            Storage::U8($s) => $body,
            Storage::Wide($s) => $body,
            Storage::I16($s) => $body,
            Storage::U16($s) => $body,
            Storage::I32($s) => $body,
            Storage::U32($s) => $body,
            Storage::I64($s) => $body,
            Storage::U64($s) => $body,
            Storage::F32($s) => $body,
            Storage::F64($s) => $body,
        }
    }};
}

/// Like `dispatch!` over two storages holding the same element type.
macro_rules! dispatch_pair {
    ($a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $mismatch:expr) => {{
        use $crate::array::typed::Storage;
        match ($a, $b) {
            (Storage::I8($x), Storage::I8($y)) => $body,
            (Storage::U8($x), Storage::U8($y)) => $body,
            (Storage::Wide($x), Storage::Wide($y)) => $body,
            (Storage::I16($x), Storage::I16($y)) => $body,
            (Storage::U16($x), Storage::U16($y)) => $body,
            (Storage::I32($x), Storage::I32($y)) => $body,
            (Storage::U32($x), Storage::U32($y)) => $body,
            (Storage::I64($x), Storage::I64($y)) => $body,
            (Storage::U64($x), Storage::U64($y)) => $body,
            (Storage::F32($x), Storage::F32($y)) => $body,
            (Storage::F64($x), Storage::F64($y)) => $body,
            #[allow(unreachable_patterns)]
            _ => $mismatch,
        }
    }};
}

pub mod element;
pub mod store;
pub mod typecode;
pub mod typed;

mod ops;

pub use element::{Element, WideChar};
pub use store::{ElementStore, NativeLock};
pub use typecode::{TYPECODES, TypeCode};
pub use typed::{Source, TypedBuffer};
