//! Typed element buffers and the layered stream stack for the Prism runtime.
//!
//! This crate provides:
//! - `TypedBuffer`: a resizable array of one native element type, with
//!   sequence, slicing, arithmetic and byte/file/text exchange
//! - The buffer protocol through which containers lend out their bytes
//! - Raw, buffered and text streams with `open()` on top
//! - `SharedStream` for streams used from several threads
//!
//! Every failure is an [`IoError`] whose [`ErrorKind`] names the exception
//! class the host runtime raises for it.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod array;
pub mod config;
pub mod error;
pub mod io;
pub mod protocol;
pub mod slice;
pub mod value;

// Re-export commonly used items
pub use array::{TypeCode, TypedBuffer};
pub use config::IoConfig;
pub use error::{ErrorKind, IoError, IoResult, OsError};
pub use io::{open, open_with};
pub use protocol::{BufferProtocol, BufferView};
pub use slice::Slice;
pub use value::Value;
