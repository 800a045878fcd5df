//! Layered byte and text streams.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    TextIOWrapper                        │
//! │   (encoding/decoding, universal newlines, cookies)      │
//! ├─────────────────────────────────────────────────────────┤
//! │   BufferedReader / BufferedWriter / BufferedRandom      │
//! │         (read-ahead, write-behind buffering)            │
//! ├─────────────────────────────────────────────────────────┤
//! │                FileIO  /  BytesIO                       │
//! │        (raw file access, in-memory bytes)               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each layer owns the one below it. Capabilities are expressed as the
//! [`IoBase`], [`RawIo`] and [`BufferedIo`] traits, and [`SharedStream`]
//! adds a lock for callers on several threads.
//!
//! # Module Organization
//!
//! - [`base`]: capability traits, `Whence`, `WriteProgress`
//! - [`file_io`] and [`bytes_io`]: raw layers
//! - [`buffered`]: buffered layers over any raw stream
//! - [`text`]: codecs and `TextIOWrapper`
//! - [`mode`] and [`open`]: mode parsing and stack construction

pub mod base;
pub mod buffered;
pub mod bytes_io;
pub mod file_io;
pub mod mode;
pub mod open;
pub mod shared;
pub mod source;
pub mod text;

/// Default capacity of buffered layers and chunk size of `readall`.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

pub use base::{BufferedIo, IoBase, RawIo, Whence, WriteProgress};
pub use buffered::{BufferedRWPair, BufferedRandom, BufferedReader, BufferedWriter};
pub use bytes_io::BytesIO;
pub use file_io::FileIO;
pub use mode::{FileMode, ParseModeError};
pub use open::{OpenOptions, OpenStream, open, open_with};
pub use shared::SharedStream;
pub use source::{ByteSink, ByteSource};
pub use text::{StringIO, TextIOWrapper};
