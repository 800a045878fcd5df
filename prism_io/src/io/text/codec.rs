//! Incremental text codecs.
//!
//! Decoders accept input in arbitrary chunks: a multi-byte sequence cut at a
//! chunk boundary stays pending inside the decoder until the rest arrives.
//! The pending bytes plus a flags word form the decoder state, which the
//! text wrapper saves and restores to make `tell`/`seek` exact.

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use smallvec::SmallVec;

use crate::error::{IoError, IoResult};

// =============================================================================
// Encoding / Errors
// =============================================================================

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Ascii,
    Latin1,
    /// UTF-16 with a byte-order mark; little-endian when none is present.
    Utf16,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Look up an encoding by name, ignoring case and `_`/`-` spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "utf-8" | "utf8" | "u8" | "utf" => Encoding::Utf8,
            "ascii" | "us-ascii" | "646" => Encoding::Ascii,
            "latin-1" | "latin1" | "latin" | "iso-8859-1" | "iso8859-1" | "8859" | "cp819"
            | "l1" => Encoding::Latin1,
            "utf-16" | "utf16" | "u16" => Encoding::Utf16,
            "utf-16-le" | "utf-16le" => Encoding::Utf16Le,
            "utf-16-be" | "utf-16be" => Encoding::Utf16Be,
            _ => return None,
        };
        Some(encoding)
    }

    /// Like [`Encoding::from_name`], failing with [`IoError::Lookup`].
    pub fn lookup(name: &str) -> IoResult<Self> {
        Self::from_name(name).ok_or_else(|| IoError::Lookup(format!("unknown encoding: {name}")))
    }

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin-1",
            Encoding::Utf16 => "utf-16",
            Encoding::Utf16Le => "utf-16-le",
            Encoding::Utf16Be => "utf-16-be",
        }
    }

    pub fn decoder(self, errors: Errors) -> Decoder {
        Decoder::new(self, errors)
    }

    pub fn encoder(self, errors: Errors) -> Encoder {
        Encoder::new(self, errors)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Policy applied to undecodable bytes and unencodable characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Errors {
    #[default]
    Strict,
    /// U+FFFD on decode, `?` on encode.
    Replace,
    Ignore,
    /// `\xNN` escapes for bytes, `\xNN`/`\uNNNN`/`\UNNNNNNNN` for characters.
    BackslashReplace,
}

impl Errors {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "strict" => Some(Errors::Strict),
            "replace" => Some(Errors::Replace),
            "ignore" => Some(Errors::Ignore),
            "backslashreplace" => Some(Errors::BackslashReplace),
            _ => None,
        }
    }

    /// Like [`Errors::from_name`], failing with [`IoError::Lookup`].
    pub fn lookup(name: &str) -> IoResult<Self> {
        Self::from_name(name)
            .ok_or_else(|| IoError::Lookup(format!("unknown error handler name '{name}'")))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Errors::Strict => "strict",
            Errors::Replace => "replace",
            Errors::Ignore => "ignore",
            Errors::BackslashReplace => "backslashreplace",
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Serializable decoder state: bytes of an incomplete sequence plus flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderState {
    pub pending: SmallVec<[u8; 4]>,
    pub flags: u32,
}

pub trait IncrementalDecoder {
    /// Decode `input`; with `fin`, an incomplete trailing sequence is an error.
    fn decode(&mut self, input: &[u8], fin: bool) -> IoResult<String>;

    fn getstate(&self) -> DecoderState;

    fn setstate(&mut self, state: &DecoderState);

    fn reset(&mut self);
}

pub trait IncrementalEncoder {
    fn encode(&mut self, text: &str) -> IoResult<Vec<u8>>;

    /// Back to the start-of-stream state (a BOM is written again).
    fn reset(&mut self);

    /// Mark the stream as past its start, so no BOM is written.
    fn skip_bom(&mut self);
}

/// UTF-16 byte order not yet known.
pub const UTF16_UNDETERMINED: u32 = 0;
pub const UTF16_LITTLE: u32 = 1;
pub const UTF16_BIG: u32 = 2;

const BOM_LE: [u8; 2] = [0xFF, 0xFE];
const BOM_BE: [u8; 2] = [0xFE, 0xFF];

// =============================================================================
// Decoder
// =============================================================================

/// Incremental decoder for every [`Encoding`].
#[derive(Debug, Clone)]
pub struct Decoder {
    encoding: Encoding,
    errors: Errors,
    state: DecoderState,
}

impl Decoder {
    pub fn new(encoding: Encoding, errors: Errors) -> Self {
        Self {
            encoding,
            errors,
            state: DecoderState::default(),
        }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Apply the error policy to `bad`, found at `position`.
    fn bad_input(
        &self,
        out: &mut String,
        bad: &[u8],
        position: usize,
        reason: &'static str,
    ) -> IoResult<()> {
        match self.errors {
            Errors::Strict => Err(IoError::Unicode {
                encoding: self.encoding.name(),
                action: "decode",
                subject: format!("byte 0x{:02x}", bad.first().copied().unwrap_or(0)),
                position,
                reason,
            }),
            Errors::Replace => {
                out.push(char::REPLACEMENT_CHARACTER);
                Ok(())
            }
            Errors::Ignore => Ok(()),
            Errors::BackslashReplace => {
                for b in bad {
                    let _ = write!(out, "\\x{b:02x}");
                }
                Ok(())
            }
        }
    }

    /// Returns how many bytes of `data` were consumed.
    fn decode_utf8(&self, data: &[u8], fin: bool, out: &mut String) -> IoResult<usize> {
        let mut offset = 0;
        loop {
            let rest = &data[offset..];
            let err = match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    return Ok(data.len());
                }
                Err(err) => err,
            };
            let valid = err.valid_up_to();
            out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
            let start = offset + valid;
            match err.error_len() {
                None if !fin => return Ok(start),
                None => {
                    self.bad_input(out, &data[start..], start, "unexpected end of data")?;
                    return Ok(data.len());
                }
                Some(len) => {
                    let reason = if is_utf8_lead(data[start]) {
                        "invalid continuation byte"
                    } else {
                        "invalid start byte"
                    };
                    self.bad_input(out, &data[start..start + len], start, reason)?;
                    offset = start + len;
                }
            }
        }
    }

    fn decode_single_byte(&self, data: &[u8], out: &mut String) -> IoResult<usize> {
        for (i, &b) in data.iter().enumerate() {
            if self.encoding == Encoding::Latin1 || b < 0x80 {
                out.push(char::from(b));
            } else {
                self.bad_input(out, &[b], i, "ordinal not in range(128)")?;
            }
        }
        Ok(data.len())
    }

    fn decode_utf16(&mut self, data: &[u8], fin: bool, out: &mut String) -> IoResult<usize> {
        let mut i = 0;
        if self.encoding == Encoding::Utf16 && self.state.flags == UTF16_UNDETERMINED {
            if data.len() < 2 {
                if fin && !data.is_empty() {
                    self.bad_input(out, data, 0, "truncated data")?;
                    return Ok(data.len());
                }
                return Ok(0);
            }
            self.state.flags = match [data[0], data[1]] {
                BOM_LE => {
                    i = 2;
                    UTF16_LITTLE
                }
                BOM_BE => {
                    i = 2;
                    UTF16_BIG
                }
                _ => UTF16_LITTLE,
            };
        }
        let big = match self.encoding {
            Encoding::Utf16Be => true,
            Encoding::Utf16 => self.state.flags == UTF16_BIG,
            _ => false,
        };
        let unit = |at: usize| {
            let pair = [data[at], data[at + 1]];
            if big { u16::from_be_bytes(pair) } else { u16::from_le_bytes(pair) }
        };

        while i + 2 <= data.len() {
            let hi = unit(i);
            if !(0xD800..0xE000).contains(&hi) {
                out.push(char::from_u32(u32::from(hi)).unwrap_or(char::REPLACEMENT_CHARACTER));
                i += 2;
            } else if hi >= 0xDC00 {
                self.bad_input(out, &data[i..i + 2], i, "illegal encoding")?;
                i += 2;
            } else if i + 4 > data.len() {
                if !fin {
                    return Ok(i);
                }
                self.bad_input(out, &data[i..], i, "unexpected end of data")?;
                return Ok(data.len());
            } else {
                let lo = unit(i + 2);
                if (0xDC00..0xE000).contains(&lo) {
                    let code = 0x10000 + ((u32::from(hi) - 0xD800) << 10) + (u32::from(lo) - 0xDC00);
                    out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    i += 4;
                } else {
                    self.bad_input(out, &data[i..i + 2], i, "illegal UTF-16 surrogate")?;
                    i += 2;
                }
            }
        }
        if fin && i < data.len() {
            self.bad_input(out, &data[i..], i, "truncated data")?;
            return Ok(data.len());
        }
        Ok(i)
    }
}

impl IncrementalDecoder for Decoder {
    fn decode(&mut self, input: &[u8], fin: bool) -> IoResult<String> {
        let pending = std::mem::take(&mut self.state.pending);
        let data: Cow<'_, [u8]> = if pending.is_empty() {
            Cow::Borrowed(input)
        } else {
            let mut joined = pending.to_vec();
            joined.extend_from_slice(input);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(data.len());
        let consumed = match self.encoding {
            Encoding::Utf8 => self.decode_utf8(&data, fin, &mut out),
            Encoding::Ascii | Encoding::Latin1 => self.decode_single_byte(&data, &mut out),
            Encoding::Utf16 | Encoding::Utf16Le | Encoding::Utf16Be => {
                self.decode_utf16(&data, fin, &mut out)
            }
        };
        let consumed = match consumed {
            Ok(n) => n,
            Err(err) => {
                // Leave the decoder as it was before the failed call.
                self.state.pending = pending;
                return Err(err);
            }
        };
        self.state.pending = SmallVec::from_slice(&data[consumed..]);
        Ok(out)
    }

    fn getstate(&self) -> DecoderState {
        self.state.clone()
    }

    fn setstate(&mut self, state: &DecoderState) {
        self.state = state.clone();
    }

    fn reset(&mut self) {
        self.state = DecoderState::default();
    }
}

/// A byte that starts a multi-byte UTF-8 sequence.
#[inline]
fn is_utf8_lead(b: u8) -> bool {
    (0xC2..=0xF4).contains(&b)
}

// =============================================================================
// Encoder
// =============================================================================

/// Incremental encoder for every [`Encoding`].
#[derive(Debug, Clone)]
pub struct Encoder {
    encoding: Encoding,
    errors: Errors,
    bom_pending: bool,
}

impl Encoder {
    pub fn new(encoding: Encoding, errors: Errors) -> Self {
        Self {
            encoding,
            errors,
            bom_pending: encoding == Encoding::Utf16,
        }
    }

    fn encode_limited(&self, text: &str, limit: u32, out: &mut Vec<u8>) -> IoResult<()> {
        let reason = if limit < 0x80 {
            "ordinal not in range(128)"
        } else {
            "ordinal not in range(256)"
        };
        for (position, c) in text.chars().enumerate() {
            let code = u32::from(c);
            if code <= limit {
                out.push(code as u8);
                continue;
            }
            match self.errors {
                Errors::Strict => {
                    return Err(IoError::Unicode {
                        encoding: self.encoding.name(),
                        action: "encode",
                        subject: format!("character '{}'", char_escape(c)),
                        position,
                        reason,
                    });
                }
                Errors::Replace => out.push(b'?'),
                Errors::Ignore => {}
                Errors::BackslashReplace => out.extend_from_slice(char_escape(c).as_bytes()),
            }
        }
        Ok(())
    }
}

impl IncrementalEncoder for Encoder {
    fn encode(&mut self, text: &str) -> IoResult<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len());
        match self.encoding {
            Encoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            Encoding::Ascii => self.encode_limited(text, 0x7F, &mut out)?,
            Encoding::Latin1 => self.encode_limited(text, 0xFF, &mut out)?,
            Encoding::Utf16 | Encoding::Utf16Le => {
                if self.bom_pending && !text.is_empty() {
                    out.extend_from_slice(&BOM_LE);
                    self.bom_pending = false;
                }
                out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            }
            Encoding::Utf16Be => out.extend(text.encode_utf16().flat_map(u16::to_be_bytes)),
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.bom_pending = self.encoding == Encoding::Utf16;
    }

    fn skip_bom(&mut self) {
        self.bom_pending = false;
    }
}

/// `\xNN`, `\uNNNN` or `\UNNNNNNNN` for `c`.
fn char_escape(c: char) -> String {
    match u32::from(c) {
        code @ 0..0x100 => format!("\\x{code:02x}"),
        code @ 0x100..0x10000 => format!("\\u{code:04x}"),
        code => format!("\\U{code:08x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use quickcheck::{QuickCheck, TestResult};

    fn decode_all(encoding: Encoding, errors: Errors, data: &[u8]) -> IoResult<String> {
        encoding.decoder(errors).decode(data, true)
    }

    // ------------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------------

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::from_name("UTF_8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_name("latin-1"), Some(Encoding::Latin1));
        assert_eq!(Encoding::from_name("utf-16le"), Some(Encoding::Utf16Le));
        assert_eq!(Encoding::Utf16Be.to_string(), "utf-16-be");
        let err = Encoding::lookup("klingon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LookupError);
        assert_eq!(Errors::from_name("backslashreplace"), Some(Errors::BackslashReplace));
        assert!(Errors::lookup("loud").is_err());
    }

    // ------------------------------------------------------------------------
    // UTF-8
    // ------------------------------------------------------------------------

    #[test]
    fn test_utf8_split_sequence_stays_pending() {
        let mut d = Encoding::Utf8.decoder(Errors::Strict);
        let euro = "€".as_bytes();
        assert_eq!(d.decode(&euro[..1], false).unwrap(), "");
        assert_eq!(d.getstate().pending.as_slice(), &euro[..1]);
        assert_eq!(d.decode(&euro[1..], false).unwrap(), "€");
        assert!(d.getstate().pending.is_empty());
    }

    #[test]
    fn test_utf8_strict_error_message() {
        let err = decode_all(Encoding::Utf8, Errors::Strict, b"a\xffb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnicodeError);
        assert_eq!(
            err.to_string(),
            "'utf-8' codec can't decode byte 0xff in position 1: invalid start byte"
        );
        let err = decode_all(Encoding::Utf8, Errors::Strict, b"\xe2\x28").unwrap_err();
        assert!(err.to_string().ends_with("invalid continuation byte"));
        let err = decode_all(Encoding::Utf8, Errors::Strict, b"ok\xe2\x82").unwrap_err();
        assert!(err.to_string().ends_with("unexpected end of data"));
    }

    #[test]
    fn test_utf8_error_policies() {
        let data = b"a\xffb";
        assert_eq!(decode_all(Encoding::Utf8, Errors::Replace, data).unwrap(), "a\u{fffd}b");
        assert_eq!(decode_all(Encoding::Utf8, Errors::Ignore, data).unwrap(), "ab");
        assert_eq!(
            decode_all(Encoding::Utf8, Errors::BackslashReplace, data).unwrap(),
            "a\\xffb"
        );
    }

    #[test]
    fn test_failed_decode_keeps_state() {
        let mut d = Encoding::Utf8.decoder(Errors::Strict);
        d.decode(b"\xe2", false).unwrap();
        assert!(d.decode(b"\xff", false).is_err());
        assert_eq!(d.getstate().pending.as_slice(), b"\xe2");
    }

    // ------------------------------------------------------------------------
    // Single-byte encodings
    // ------------------------------------------------------------------------

    #[test]
    fn test_ascii_and_latin1() {
        assert_eq!(decode_all(Encoding::Latin1, Errors::Strict, b"caf\xe9").unwrap(), "café");
        let err = decode_all(Encoding::Ascii, Errors::Strict, b"caf\xe9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'ascii' codec can't decode byte 0xe9 in position 3: ordinal not in range(128)"
        );

        let mut e = Encoding::Ascii.encoder(Errors::Strict);
        let err = e.encode("aé").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'ascii' codec can't encode character '\\xe9' in position 1: ordinal not in range(128)"
        );
        let mut e = Encoding::Latin1.encoder(Errors::BackslashReplace);
        assert_eq!(e.encode("é€").unwrap(), b"\xe9\\u20ac");
        let mut e = Encoding::Ascii.encoder(Errors::Replace);
        assert_eq!(e.encode("é!").unwrap(), b"?!");
    }

    // ------------------------------------------------------------------------
    // UTF-16
    // ------------------------------------------------------------------------

    #[test]
    fn test_utf16_bom_sets_flags() {
        let mut d = Encoding::Utf16.decoder(Errors::Strict);
        assert_eq!(d.getstate().flags, UTF16_UNDETERMINED);
        assert_eq!(d.decode(b"\xfe", false).unwrap(), "");
        assert_eq!(d.decode(b"\xff\x00a", false).unwrap(), "a");
        assert_eq!(d.getstate().flags, UTF16_BIG);

        let mut d = Encoding::Utf16.decoder(Errors::Strict);
        assert_eq!(d.decode(b"a\x00", false).unwrap(), "a");
        assert_eq!(d.getstate().flags, UTF16_LITTLE);
    }

    #[test]
    fn test_utf16_surrogate_pair_across_chunks() {
        let bytes: Vec<u8> = "😀".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut d = Encoding::Utf16Le.decoder(Errors::Strict);
        assert_eq!(d.decode(&bytes[..3], false).unwrap(), "");
        assert_eq!(d.decode(&bytes[3..], false).unwrap(), "😀");
        let lone = [0x00, 0xDC];
        assert!(decode_all(Encoding::Utf16Le, Errors::Strict, &lone).is_err());
        assert_eq!(decode_all(Encoding::Utf16Le, Errors::Replace, &lone).unwrap(), "\u{fffd}");
    }

    #[test]
    fn test_utf16_encoder_bom() {
        let mut e = Encoding::Utf16.encoder(Errors::Strict);
        assert_eq!(e.encode("").unwrap(), b"");
        assert_eq!(e.encode("a").unwrap(), b"\xff\xfea\x00");
        assert_eq!(e.encode("b").unwrap(), b"b\x00");
        e.reset();
        assert_eq!(e.encode("c").unwrap(), b"\xff\xfec\x00");
        e.reset();
        e.skip_bom();
        assert_eq!(e.encode("d").unwrap(), b"d\x00");
        let mut e = Encoding::Utf16Be.encoder(Errors::Strict);
        assert_eq!(e.encode("a").unwrap(), b"\x00a");
    }

    // ------------------------------------------------------------------------
    // Chunked decoding
    // ------------------------------------------------------------------------

    #[test]
    fn prop_chunked_decode_matches_whole() {
        fn prop(text: String, cuts: Vec<u8>) -> TestResult {
            if text.is_empty() {
                return TestResult::discard();
            }
            for encoding in [Encoding::Utf8, Encoding::Utf16] {
                let bytes = encoding.encoder(Errors::Strict).encode(&text).unwrap();
                let mut d = encoding.decoder(Errors::Strict);
                let mut out = String::new();
                let mut rest = &bytes[..];
                for cut in &cuts {
                    let n = usize::from(*cut % 5).min(rest.len());
                    out.push_str(&d.decode(&rest[..n], false).unwrap());
                    rest = &rest[n..];
                }
                out.push_str(&d.decode(rest, true).unwrap());
                if out != text {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(200)
            .quickcheck(prop as fn(String, Vec<u8>) -> TestResult);
    }
}
