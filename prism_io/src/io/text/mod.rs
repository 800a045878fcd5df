//! Text layer: codecs, universal newlines and the text wrapper.
//!
//! - [`codec`]: encodings, error policies and incremental coders
//! - [`newline`]: universal-newline decoding over any incremental decoder
//! - [`cookie`]: packing of opaque text positions
//! - [`wrapper`]: `TextIOWrapper` and the in-memory `StringIO`

pub mod codec;
pub mod cookie;
pub mod newline;
pub mod wrapper;

pub use codec::{Decoder, DecoderState, Encoder, Encoding, Errors, IncrementalDecoder, IncrementalEncoder};
pub use cookie::TextCookie;
pub use newline::{DecoderSnapshot, IncrementalNewlineDecoder};
pub use wrapper::{Lines, Newline, StringIO, TextIOWrapper, TextOptions};
