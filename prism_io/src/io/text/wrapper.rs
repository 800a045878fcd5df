//! Unicode text over a buffered byte stream.
//!
//! # Position cookies
//!
//! A byte offset cannot name a text position in general: a multi-byte
//! decoder may hold half a character, and universal-newline decoding may
//! hold a `\r`. The wrapper therefore records a snapshot before each decode
//! step:
//!
//! ```text
//!   snapshot.dec_flags   decoder state at the chunk start (no pending bytes)
//!   snapshot.next_input  every byte fed to the decoder since that point
//!   decoded / used       text produced from next_input / already returned
//! ```
//!
//! `tell` replays `next_input` one byte at a time from the snapshot state,
//! advancing its start point to each later clean state (no pending bytes)
//! reached before the returned character count. The result is a
//! [`TextCookie`]: a byte position plus whatever must be re-fed and
//! skipped after seeking there. `seek` does the inverse.

use std::borrow::Cow;

use super::codec::{Decoder, Encoder, Encoding, Errors, IncrementalEncoder};
use super::cookie::TextCookie;
use super::newline::{DecoderSnapshot, IncrementalNewlineDecoder};
use crate::config::{DEFAULT_CHUNK_SIZE, IoConfig};
use crate::error::{IoError, IoResult};
use crate::io::base::{BufferedIo, IoBase, Whence};
use crate::io::buffered::live;
use crate::io::bytes_io::BytesIO;
use crate::io::source::ByteSink;
use crate::value::str_repr;

/// Line terminator written for `\n` when no newline is configured.
const LINESEP: &str = if cfg!(windows) { "\r\n" } else { "\n" };

// =============================================================================
// Newline
// =============================================================================

/// Newline policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// Accept `\n`, `\r` and `\r\n`, return `\n`; write the platform terminator.
    #[default]
    Universal,
    /// Accept all three endings but return them unchanged; write `\n` as is.
    Untranslated,
    Lf,
    Cr,
    CrLf,
}

impl Newline {
    /// Parse the `newline` argument of `open()`.
    pub fn from_arg(arg: Option<&str>) -> IoResult<Self> {
        match arg {
            None => Ok(Newline::Universal),
            Some("") => Ok(Newline::Untranslated),
            Some("\n") => Ok(Newline::Lf),
            Some("\r") => Ok(Newline::Cr),
            Some("\r\n") => Ok(Newline::CrLf),
            Some(other) => Err(IoError::value(format!(
                "illegal newline value: {}",
                str_repr(other)
            ))),
        }
    }

    pub const fn as_arg(self) -> Option<&'static str> {
        match self {
            Newline::Universal => None,
            Newline::Untranslated => Some(""),
            Newline::Lf => Some("\n"),
            Newline::Cr => Some("\r"),
            Newline::CrLf => Some("\r\n"),
        }
    }

    #[inline]
    const fn read_universal(self) -> bool {
        matches!(self, Newline::Universal | Newline::Untranslated)
    }

    #[inline]
    const fn write_translate(self) -> bool {
        !matches!(self, Newline::Untranslated)
    }

    const fn terminator(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Cr => "\r",
            Newline::CrLf => "\r\n",
            Newline::Universal | Newline::Untranslated => LINESEP,
        }
    }
}

// =============================================================================
// TextOptions
// =============================================================================

/// Construction parameters of a [`TextIOWrapper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub encoding: Encoding,
    pub errors: Errors,
    pub newline: Newline,
    /// Flush after any write containing a line terminator.
    pub line_buffering: bool,
    /// Flush after every write.
    pub write_through: bool,
    /// Bytes requested from the buffer per decode step.
    pub chunk_size: usize,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            errors: Errors::Strict,
            newline: Newline::Universal,
            line_buffering: false,
            write_through: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TextOptions {
    /// Defaults taken from a resolved [`IoConfig`].
    pub fn from_config(config: &IoConfig) -> Self {
        Self {
            encoding: config.encoding,
            errors: config.errors,
            write_through: config.write_through,
            chunk_size: config.text_chunk_size,
            ..Self::default()
        }
    }
}

// =============================================================================
// TextIOWrapper
// =============================================================================

#[derive(Debug, Clone)]
struct ReadSnapshot {
    dec_flags: u32,
    next_input: Vec<u8>,
}

/// Character stream over a [`BufferedIo`] byte stream.
#[derive(Debug)]
pub struct TextIOWrapper<B: BufferedIo> {
    buffer: Option<B>,
    options: TextOptions,
    write_translate: bool,
    write_nl: &'static str,
    decoder: Option<IncrementalNewlineDecoder<Decoder>>,
    encoder: Option<Encoder>,
    /// Text from the last decode step.
    decoded: String,
    /// Byte offset into `decoded` of the first unreturned character.
    decoded_used: usize,
    snapshot: Option<ReadSnapshot>,
    seekable: bool,
    telling: bool,
}

impl<B: BufferedIo> TextIOWrapper<B> {
    pub fn new(buffer: B) -> IoResult<Self> {
        Self::with_options(buffer, TextOptions::default())
    }

    pub fn with_options(mut buffer: B, options: TextOptions) -> IoResult<Self> {
        if options.chunk_size == 0 {
            return Err(IoError::value("chunk size must be positive"));
        }
        buffer.check_closed()?;

        let seekable = buffer.seekable();
        let decoder = buffer.readable().then(|| {
            let inner = options.encoding.decoder(options.errors);
            if options.newline.read_universal() {
                IncrementalNewlineDecoder::new(inner, options.newline == Newline::Universal)
            } else {
                IncrementalNewlineDecoder::passthrough(inner)
            }
        });
        let mut encoder = buffer.writable().then(|| options.encoding.encoder(options.errors));
        if let Some(encoder) = encoder.as_mut() {
            if seekable && buffer.tell()? != 0 {
                encoder.skip_bom();
            }
        }

        Ok(Self {
            buffer: Some(buffer),
            write_translate: options.newline.write_translate(),
            write_nl: options.newline.terminator(),
            options,
            decoder,
            encoder,
            decoded: String::new(),
            decoded_used: 0,
            snapshot: None,
            seekable,
            telling: seekable,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.options.encoding
    }

    #[inline]
    pub fn errors(&self) -> Errors {
        self.options.errors
    }

    #[inline]
    pub fn newline(&self) -> Newline {
        self.options.newline
    }

    #[inline]
    pub fn line_buffering(&self) -> bool {
        self.options.line_buffering
    }

    #[inline]
    pub fn write_through(&self) -> bool {
        self.options.write_through
    }

    /// Line endings met while reading in a universal mode.
    pub fn newlines(&self) -> Vec<&'static str> {
        self.decoder.as_ref().map(|d| d.newlines()).unwrap_or_default()
    }

    pub fn closed(&self) -> bool {
        self.buffer.as_ref().is_none_or(|b| b.closed())
    }

    pub fn readable(&self) -> bool {
        self.decoder.is_some() && !self.closed()
    }

    pub fn writable(&self) -> bool {
        self.encoder.is_some() && !self.closed()
    }

    pub fn seekable(&self) -> bool {
        self.seekable
    }

    pub fn isatty(&self) -> IoResult<bool> {
        self.buffer.as_ref().ok_or(IoError::Detached)?.isatty()
    }

    // ------------------------------------------------------------------------
    // Decoded-text buffer
    // ------------------------------------------------------------------------

    fn set_decoded(&mut self, text: String) {
        self.decoded = text;
        self.decoded_used = 0;
    }

    /// Take up to `n` characters (all when `None`) of decoded text.
    fn take_decoded(&mut self, n: Option<usize>) -> String {
        let rest = &self.decoded[self.decoded_used..];
        let end = n.map_or(rest.len(), |n| char_offset(rest, n));
        let out = rest[..end].to_string();
        self.decoded_used += end;
        out
    }

    fn has_decoded(&self) -> bool {
        self.decoded_used < self.decoded.len()
    }

    fn check_readable(&mut self) -> IoResult<()> {
        live(&mut self.buffer)?;
        if self.decoder.is_none() {
            return Err(IoError::unsupported("not readable"));
        }
        Ok(())
    }

    /// Decode one chunk; returns `false` at end of file.
    fn read_chunk(&mut self) -> IoResult<bool> {
        let buffer = live(&mut self.buffer)?;
        let decoder = self.decoder.as_mut().ok_or_else(|| IoError::unsupported("not readable"))?;

        let before = self.telling.then(|| decoder.getstate());
        let input = buffer.read1(Some(self.options.chunk_size))?;
        let eof = input.is_empty();
        let text = decoder.decode(&input, eof)?;
        self.set_decoded(text);

        if let Some(state) = before {
            let mut next_input = state.pending_bytes.to_vec();
            next_input.extend_from_slice(&input);
            self.snapshot = Some(ReadSnapshot {
                dec_flags: state.flags_word(),
                next_input,
            });
        }
        Ok(!eof)
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Read `size` characters, or everything to end of file when `None`.
    pub fn read(&mut self, size: Option<usize>) -> IoResult<String> {
        self.check_readable()?;
        let Some(size) = size else {
            let mut result = self.take_decoded(None);
            let buffer = live(&mut self.buffer)?;
            let input = buffer.read(None)?;
            if let Some(decoder) = self.decoder.as_mut() {
                result.push_str(&decoder.decode(&input, true)?);
            }
            if self.snapshot.take().is_some() {
                self.set_decoded(String::new());
            }
            return Ok(result);
        };

        let mut result = self.take_decoded(Some(size));
        let mut count = result.chars().count();
        let mut eof = false;
        while count < size && !eof {
            eof = !self.read_chunk()?;
            let more = self.take_decoded(Some(size - count));
            count += more.chars().count();
            result.push_str(&more);
        }
        Ok(result)
    }

    /// Read one line including its terminator, or at most `limit` characters.
    pub fn readline(&mut self, limit: Option<usize>) -> IoResult<String> {
        self.check_readable()?;
        let mut line = self.take_decoded(None);
        let mut start = 0;

        let endpos = loop {
            let found = match self.options.newline {
                Newline::Universal => match line[start..].find('\n') {
                    Some(p) => Some(start + p + 1),
                    None => {
                        start = line.len();
                        None
                    }
                },
                Newline::Untranslated => {
                    let nl = line[start..].find('\n').map(|p| start + p);
                    let cr = line[start..].find('\r').map(|p| start + p);
                    match (cr, nl) {
                        (None, None) => {
                            start = line.len();
                            None
                        }
                        (None, Some(nl)) => Some(nl + 1),
                        // A final `\r` may be the first half of `\r\n`.
                        (Some(cr), None) if cr + 1 == line.len() => {
                            start = cr;
                            None
                        }
                        (Some(cr), None) => Some(cr + 1),
                        (Some(cr), Some(nl)) if nl < cr => Some(nl + 1),
                        (Some(cr), Some(nl)) if nl == cr + 1 => Some(cr + 2),
                        (Some(cr), Some(_)) => Some(cr + 1),
                    }
                }
                fixed => {
                    let term = fixed.terminator();
                    line.find(term).map(|p| p + term.len())
                }
            };
            if let Some(end) = found {
                break end;
            }
            if let Some(limit) = limit {
                if line.chars().count() >= limit {
                    break char_offset(&line, limit);
                }
            }

            while self.read_chunk()? {
                if self.has_decoded() {
                    break;
                }
            }
            if self.has_decoded() {
                line.push_str(&self.take_decoded(None));
            } else {
                self.set_decoded(String::new());
                self.snapshot = None;
                return Ok(line);
            }
        };

        let endpos = limit.map_or(endpos, |limit| endpos.min(char_offset(&line, limit)));
        self.decoded_used = self.decoded_used.saturating_sub(line.len() - endpos);
        line.truncate(endpos);
        Ok(line)
    }

    /// Read lines until end of file or until `hint` characters were read.
    pub fn readlines(&mut self, hint: Option<usize>) -> IoResult<Vec<String>> {
        let mut lines = Vec::new();
        let mut total = 0;
        loop {
            let line = self.readline(None)?;
            if line.is_empty() {
                return Ok(lines);
            }
            total += line.chars().count();
            lines.push(line);
            if hint.is_some_and(|hint| hint > 0 && total >= hint) {
                return Ok(lines);
            }
        }
    }

    /// Next line for iteration. Iterating disables [`tell`](Self::tell)
    /// until the end of the stream or the next flush or seek.
    pub fn next_line(&mut self) -> Option<IoResult<String>> {
        self.telling = false;
        self.snapshot = None;
        match self.readline(None) {
            Ok(line) if line.is_empty() => {
                self.telling = self.seekable;
                None
            }
            other => Some(other),
        }
    }

    pub fn lines(&mut self) -> Lines<'_, B> {
        Lines { wrapper: self }
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    /// Write `text`; returns its length in characters.
    pub fn write(&mut self, text: &str) -> IoResult<usize> {
        let (translate, write_nl) = (self.write_translate, self.write_nl);
        let line_buffering = self.options.line_buffering;
        let buffer = live(&mut self.buffer)?;
        let encoder = self.encoder.as_mut().ok_or_else(|| IoError::unsupported("not writable"))?;

        let haslf = (translate || line_buffering) && text.contains('\n');
        let translated: Cow<'_, str> = if haslf && translate && write_nl != "\n" {
            Cow::Owned(text.replace('\n', write_nl))
        } else {
            Cow::Borrowed(text)
        };
        let bytes = encoder.encode(&translated)?;
        buffer.write_bytes(&bytes)?;

        let needflush = line_buffering && (haslf || text.contains('\r'));
        if needflush || self.options.write_through {
            self.flush()?;
        }

        // Decoded read-ahead no longer matches the byte stream.
        if self.snapshot.take().is_some() || self.has_decoded() {
            self.set_decoded(String::new());
        }
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
        Ok(text.chars().count())
    }

    pub fn writelines(&mut self, lines: &[&str]) -> IoResult<()> {
        for line in lines {
            self.write(line)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Positioning
    // ------------------------------------------------------------------------

    fn check_seekable(&mut self) -> IoResult<()> {
        live(&mut self.buffer)?;
        if !self.seekable {
            return Err(IoError::unsupported("underlying stream is not seekable"));
        }
        Ok(())
    }

    /// Opaque cookie for the current position, accepted by [`seek`](Self::seek).
    pub fn tell(&mut self) -> IoResult<u128> {
        self.check_seekable()?;
        if !self.telling {
            return Err(IoError::stream("telling position disabled by next() call"));
        }
        self.flush()?;
        let position = live(&mut self.buffer)?.tell()?;
        let has_decoded = self.has_decoded();

        let (Some(decoder), Some(snapshot)) = (self.decoder.as_mut(), self.snapshot.as_ref()) else {
            if has_decoded {
                return Err(IoError::stream("can't reconstruct logical file position"));
            }
            return Ok(u128::from(position));
        };

        let Some(start) = position.checked_sub(snapshot.next_input.len() as u64) else {
            return Err(IoError::stream("can't reconstruct logical file position"));
        };
        let chars_to_skip = self.decoded[..self.decoded_used].chars().count();
        if chars_to_skip == 0 {
            return TextCookie {
                dec_flags: snapshot.dec_flags,
                ..TextCookie::at(start)
            }
            .pack();
        }

        let saved = decoder.getstate();
        let cookie = replay(decoder, snapshot, start, chars_to_skip);
        decoder.setstate(&saved);
        cookie?.pack()
    }

    /// Move to a cookie from [`tell`](Self::tell) (`Whence::Start`), or to
    /// the current position or the end with an offset of 0.
    pub fn seek(&mut self, cookie: i128, whence: Whence) -> IoResult<u128> {
        self.check_seekable()?;
        match whence {
            Whence::Current => {
                if cookie != 0 {
                    return Err(IoError::unsupported("can't do nonzero cur-relative seeks"));
                }
                let current = self.tell()?;
                self.seek_cookie(current)
            }
            Whence::End => {
                if cookie != 0 {
                    return Err(IoError::unsupported("can't do nonzero end-relative seeks"));
                }
                self.flush()?;
                let position = live(&mut self.buffer)?.seek(0, Whence::End)?;
                self.set_decoded(String::new());
                self.snapshot = None;
                if let Some(decoder) = self.decoder.as_mut() {
                    decoder.reset();
                }
                self.reset_encoder(position != 0);
                log::debug!("text stream seeked to end ({position})");
                Ok(u128::from(position))
            }
            Whence::Start => {
                if cookie < 0 {
                    return Err(IoError::value(format!("negative seek position {cookie}")));
                }
                self.seek_cookie(cookie as u128)
            }
        }
    }

    fn seek_cookie(&mut self, cookie: u128) -> IoResult<u128> {
        self.flush()?;
        let target = TextCookie::unpack(cookie);
        let position = i64::try_from(target.position)
            .map_err(|_| IoError::Overflow("seek position out of range".to_string()))?;
        live(&mut self.buffer)?.seek(position, Whence::Start)?;

        self.set_decoded(String::new());
        self.snapshot = None;
        if let Some(decoder) = self.decoder.as_mut() {
            if cookie == 0 {
                decoder.reset();
            } else {
                decoder.setstate(&DecoderSnapshot::from_flags_word(target.dec_flags));
                self.snapshot = Some(ReadSnapshot {
                    dec_flags: target.dec_flags,
                    next_input: Vec::new(),
                });
            }
        }

        if target.chars_to_skip > 0 {
            let buffer = live(&mut self.buffer)?;
            let decoder = self.decoder.as_mut().ok_or_else(|| IoError::unsupported("not readable"))?;
            let input = buffer.read(Some(target.bytes_to_feed as usize))?;
            let text = decoder.decode(&input, target.need_eof)?;
            let skip = target.chars_to_skip as usize;
            if text.chars().count() < skip {
                return Err(IoError::stream("can't restore logical file position"));
            }
            self.decoded_used = char_offset(&text, skip);
            self.decoded = text;
            self.snapshot = Some(ReadSnapshot {
                dec_flags: target.dec_flags,
                next_input: input,
            });
        }

        self.reset_encoder(cookie != 0);
        log::debug!("text stream seeked to {target:?}");
        Ok(cookie)
    }

    /// A stream not at its start must not get a second byte-order mark.
    fn reset_encoder(&mut self, past_start: bool) {
        if let Some(encoder) = self.encoder.as_mut() {
            if past_start {
                encoder.skip_bom();
            } else {
                encoder.reset();
            }
        }
    }

    /// Truncate the byte stream at `size`, or at the current position, and
    /// keep the logical position.
    pub fn truncate(&mut self, size: Option<i64>) -> IoResult<u64> {
        self.flush()?;
        let current = self.tell()?;
        let size = match size {
            Some(size) => size,
            None => {
                let cookie = TextCookie::unpack(current);
                if !cookie.is_clean() {
                    return Err(IoError::stream("can't reconstruct logical file position"));
                }
                i64::try_from(cookie.position)
                    .map_err(|_| IoError::Overflow("truncate position out of range".to_string()))?
            }
        };
        let new_size = live(&mut self.buffer)?.truncate(Some(size))?;
        self.seek_cookie(current)?;
        Ok(new_size)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn flush(&mut self) -> IoResult<()> {
        live(&mut self.buffer)?.flush()?;
        self.telling = self.seekable;
        Ok(())
    }

    /// Flush and close the buffer. Closing twice is a no-op.
    pub fn close(&mut self) -> IoResult<()> {
        let buffer = self.buffer.as_mut().ok_or(IoError::Detached)?;
        if buffer.closed() {
            return Ok(());
        }
        let flushed = buffer.flush();
        let closed = buffer.close();
        flushed.and(closed)
    }

    /// Flush, then separate the buffer.
    pub fn detach(&mut self) -> IoResult<B> {
        self.flush()?;
        let buffer = self.buffer.take().ok_or(IoError::Detached)?;
        log::debug!("text wrapper detached");
        Ok(buffer)
    }
}

impl<B: BufferedIo> Drop for TextIOWrapper<B> {
    fn drop(&mut self) {
        if self.buffer.as_ref().is_some_and(|b| !b.closed()) {
            if let Err(err) = self.close() {
                log::warn!("error closing text wrapper on drop: {err}");
            }
        }
    }
}

/// Iterator over the lines of a [`TextIOWrapper`].
#[derive(Debug)]
pub struct Lines<'a, B: BufferedIo> {
    wrapper: &'a mut TextIOWrapper<B>,
}

impl<B: BufferedIo> Iterator for Lines<'_, B> {
    type Item = IoResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.wrapper.next_line()
    }
}

/// Find the clean point at or before `chars_to_skip` characters into
/// `snapshot.next_input`, and what must be re-fed from it.
fn replay(
    decoder: &mut IncrementalNewlineDecoder<Decoder>,
    snapshot: &ReadSnapshot,
    start: u64,
    mut chars_to_skip: usize,
) -> IoResult<TextCookie> {
    decoder.setstate(&DecoderSnapshot::from_flags_word(snapshot.dec_flags));
    let mut cookie = TextCookie {
        dec_flags: snapshot.dec_flags,
        ..TextCookie::at(start)
    };
    let mut bytes_fed = 0u32;
    let mut chars_decoded = 0usize;

    for byte in snapshot.next_input.chunks(1) {
        bytes_fed += 1;
        chars_decoded += decoder.decode(byte, false)?.chars().count();
        let state = decoder.getstate();
        if state.pending_bytes.is_empty() && chars_decoded <= chars_to_skip {
            cookie.position += u64::from(bytes_fed);
            cookie.dec_flags = state.flags_word();
            chars_to_skip -= chars_decoded;
            bytes_fed = 0;
            chars_decoded = 0;
        }
        if chars_decoded >= chars_to_skip {
            cookie.bytes_to_feed = bytes_fed;
            cookie.chars_to_skip = u32::try_from(chars_to_skip).unwrap_or(u32::MAX);
            return Ok(cookie);
        }
    }

    chars_decoded += decoder.decode(b"", true)?.chars().count();
    if chars_decoded < chars_to_skip {
        return Err(IoError::stream("can't reconstruct logical file position"));
    }
    cookie.need_eof = true;
    cookie.bytes_to_feed = bytes_fed;
    cookie.chars_to_skip = u32::try_from(chars_to_skip).unwrap_or(u32::MAX);
    Ok(cookie)
}

/// Byte offset of the `n`th character of `s`, or its length.
#[inline]
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

// =============================================================================
// StringIO
// =============================================================================

/// In-memory text stream.
pub type StringIO = TextIOWrapper<BytesIO>;

impl TextIOWrapper<BytesIO> {
    /// A text stream holding `initial`, positioned at the start, with `\n`
    /// as the only line terminator.
    pub fn string_io(initial: &str) -> IoResult<Self> {
        Self::string_io_with(initial, Some("\n"))
    }

    /// Like [`string_io`](Self::string_io) with a chosen newline. With
    /// `None`, reads translate line endings but writes keep them.
    pub fn string_io_with(initial: &str, newline: Option<&str>) -> IoResult<Self> {
        let newline = Newline::from_arg(newline)?;
        let options = TextOptions {
            newline,
            ..TextOptions::default()
        };
        let mut stream = Self::with_options(BytesIO::new(), options)?;
        if newline == Newline::Universal {
            stream.write_translate = false;
        }
        if !initial.is_empty() {
            stream.write(initial)?;
            stream.seek(0, Whence::Start)?;
        }
        Ok(stream)
    }

    /// The whole text, regardless of position.
    pub fn getvalue(&mut self) -> IoResult<String> {
        self.flush()?;
        let buffer = self.buffer.as_ref().ok_or(IoError::Detached)?;
        let decoder = self.decoder.as_mut().ok_or_else(|| IoError::unsupported("not readable"))?;
        let saved = decoder.getstate();
        decoder.reset();
        let value = decoder.decode(buffer.getvalue(), true);
        decoder.setstate(&saved);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::io::{BufferedReader, BufferedWriter};
    use quickcheck::{QuickCheck, TestResult};

    fn over(bytes: &[u8], options: TextOptions) -> TextIOWrapper<BytesIO> {
        TextIOWrapper::with_options(BytesIO::from_bytes(bytes.to_vec()), options).unwrap()
    }

    fn chunked(encoding: Encoding, chunk_size: usize) -> TextOptions {
        TextOptions {
            encoding,
            chunk_size,
            ..TextOptions::default()
        }
    }

    fn untranslated(encoding: Encoding, chunk_size: usize) -> TextOptions {
        TextOptions {
            newline: Newline::Untranslated,
            ..chunked(encoding, chunk_size)
        }
    }

    /// Record a cookie before every character, then seek back to each one
    /// and compare the rest of the stream.
    fn check_seek_tell(text: &str, encoding: Encoding, chunk_size: usize) -> bool {
        let bytes = encoding.encoder(Errors::Strict).encode(text).unwrap();
        let mut f = over(&bytes, untranslated(encoding, chunk_size));
        let mut cookies = Vec::new();
        loop {
            cookies.push(f.tell().unwrap());
            if f.read(Some(1)).unwrap().is_empty() {
                break;
            }
        }
        let chars: Vec<char> = text.chars().collect();
        cookies.iter().enumerate().all(|(i, &cookie)| {
            f.seek(cookie as i128, Whence::Start).unwrap();
            let expected: String = chars[i..].iter().collect();
            f.read(None).unwrap() == expected
        })
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_illegal_newline() {
        let err = Newline::from_arg(Some("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert_eq!(err.to_string(), "illegal newline value: 'x'");
        assert_eq!(Newline::from_arg(Some("\r\n")).unwrap(), Newline::CrLf);
        assert_eq!(Newline::CrLf.as_arg(), Some("\r\n"));
    }

    #[test]
    fn test_capabilities_follow_buffer() {
        let reader = BufferedReader::new(BytesIO::from_bytes(b"abc".to_vec())).unwrap();
        let mut f = TextIOWrapper::new(reader).unwrap();
        assert!(f.readable());
        assert!(!f.writable());
        let err = f.write("x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

        let writer = BufferedWriter::new(BytesIO::new()).unwrap();
        let mut f = TextIOWrapper::new(writer).unwrap();
        assert_eq!(f.read(None).unwrap_err().to_string(), "not readable");
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    #[test]
    fn test_universal_readline() {
        let mut f = over(b"a\r\nb\rc\nd", TextOptions::default());
        let lines: Vec<String> = f.lines().map(Result::unwrap).collect();
        assert_eq!(lines, ["a\n", "b\n", "c\n", "d"]);
        assert_eq!(f.newlines(), vec!["\r", "\n", "\r\n"]);
    }

    #[test]
    fn test_untranslated_readline() {
        let options = TextOptions {
            newline: Newline::Untranslated,
            chunk_size: 2,
            ..TextOptions::default()
        };
        let mut f = over(b"a\r\nb\rc\n", options);
        assert_eq!(f.readlines(None).unwrap(), ["a\r\n", "b\r", "c\n"]);
    }

    #[test]
    fn test_fixed_newline_readline() {
        let options = TextOptions {
            newline: Newline::Cr,
            ..TextOptions::default()
        };
        let mut f = over(b"a\nb\rc", options);
        assert_eq!(f.readline(None).unwrap(), "a\nb\r");
        assert_eq!(f.readline(None).unwrap(), "c");
        assert!(f.newlines().is_empty());
    }

    #[test]
    fn test_readline_limit() {
        let mut f = over("héllo\nworld".as_bytes(), chunked(Encoding::Utf8, 3));
        assert_eq!(f.readline(Some(3)).unwrap(), "hél");
        assert_eq!(f.readline(Some(10)).unwrap(), "lo\n");
        assert_eq!(f.read(Some(2)).unwrap(), "wo");
        assert_eq!(f.read(None).unwrap(), "rld");
        assert_eq!(f.read(None).unwrap(), "");
    }

    #[test]
    fn test_iteration_disables_tell() {
        let mut f = over(b"one\ntwo\n", TextOptions::default());
        assert_eq!(f.next_line().unwrap().unwrap(), "one\n");
        let err = f.tell().unwrap_err();
        assert_eq!(err.to_string(), "telling position disabled by next() call");
        assert_eq!(f.next_line().unwrap().unwrap(), "two\n");
        assert!(f.next_line().is_none());
        assert_eq!(f.tell().unwrap(), 8);
    }

    // ------------------------------------------------------------------------
    // Seek / tell
    // ------------------------------------------------------------------------

    #[test]
    fn test_seek_tell_round_trip_multibyte() {
        let text = "aé€😀\nxyz€\r\nq";
        for encoding in [Encoding::Utf8, Encoding::Utf16, Encoding::Utf16Be] {
            for chunk_size in [1, 3, 4, 128] {
                assert!(check_seek_tell(text, encoding, chunk_size), "{encoding} / {chunk_size}");
            }
        }
        assert!(check_seek_tell("caf\u{e9}", Encoding::Latin1, 2));
    }

    #[test]
    fn test_clean_position_is_byte_offset() {
        let mut f = over("ab€cd".as_bytes(), chunked(Encoding::Utf8, 128));
        f.read(Some(3)).unwrap();
        assert_eq!(f.tell().unwrap(), 5);
    }

    #[test]
    fn test_seek_restrictions() {
        let mut f = over(b"abc", TextOptions::default());
        let err = f.seek(1, Whence::Current).unwrap_err();
        assert_eq!(err.to_string(), "can't do nonzero cur-relative seeks");
        let err = f.seek(-1, Whence::End).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        let err = f.seek(-1, Whence::Start).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueError);
        assert_eq!(f.seek(0, Whence::End).unwrap(), 3);
        f.read(None).unwrap();
        assert_eq!(f.seek(0, Whence::Current).unwrap(), 3);
    }

    #[test]
    fn prop_seek_tell_round_trip() {
        fn prop(text: String, chunk: u8) -> TestResult {
            if text.chars().count() > 40 {
                return TestResult::discard();
            }
            let chunk_size = usize::from(chunk % 7) + 1;
            TestResult::from_bool(
                check_seek_tell(&text, Encoding::Utf8, chunk_size)
                    && check_seek_tell(&text, Encoding::Utf16, chunk_size),
            )
        }
        QuickCheck::new()
            .tests(100)
            .quickcheck(prop as fn(String, u8) -> TestResult);
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    #[test]
    fn test_write_translates_newlines() {
        let options = TextOptions {
            newline: Newline::CrLf,
            ..TextOptions::default()
        };
        let mut f = over(b"", options);
        assert_eq!(f.write("a\nb").unwrap(), 3);
        assert_eq!(f.buffer().unwrap().getvalue(), b"a\r\nb");
    }

    #[test]
    fn test_line_buffering_flushes() {
        let writer = BufferedWriter::with_capacity(BytesIO::new(), 64).unwrap();
        let options = TextOptions {
            line_buffering: true,
            ..TextOptions::default()
        };
        let mut f = TextIOWrapper::with_options(writer, options).unwrap();
        f.write("partial").unwrap();
        assert_eq!(f.buffer().unwrap().raw().unwrap().getvalue(), b"");
        f.write(" line\n").unwrap();
        assert_eq!(f.buffer().unwrap().raw().unwrap().getvalue(), b"partial line\n");
    }

    #[test]
    fn test_utf16_bom_only_at_start() {
        let mut f = over(b"", chunked(Encoding::Utf16, 128));
        f.write("ab").unwrap();
        f.seek(0, Whence::Start).unwrap();
        f.write("c").unwrap();
        assert_eq!(f.buffer().unwrap().getvalue(), b"\xff\xfec\x00b\x00");
        f.seek(0, Whence::End).unwrap();
        f.write("d").unwrap();
        assert_eq!(f.buffer().unwrap().getvalue(), b"\xff\xfec\x00b\x00d\x00");

        let mut existing = BytesIO::from_bytes(b"\xff\xfex\x00".to_vec());
        existing.seek(0, Whence::End).unwrap();
        let mut f = TextIOWrapper::with_options(existing, chunked(Encoding::Utf16, 128)).unwrap();
        f.write("y").unwrap();
        assert_eq!(f.buffer().unwrap().getvalue(), b"\xff\xfex\x00y\x00");
    }

    #[test]
    fn test_truncate_keeps_position() {
        let mut f = over(b"hello world", TextOptions::default());
        assert_eq!(f.read(Some(5)).unwrap(), "hello");
        assert_eq!(f.truncate(None).unwrap(), 5);
        assert_eq!(f.tell().unwrap(), 5);
        assert_eq!(f.read(None).unwrap(), "");
        assert_eq!(f.buffer().unwrap().getvalue(), b"hello");
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[test]
    fn test_detach_and_close() {
        let mut f = over(b"abc", TextOptions::default());
        assert_eq!(f.read(Some(1)).unwrap(), "a");
        let buffer = f.detach().unwrap();
        assert_eq!(buffer.getvalue(), b"abc");
        assert!(matches!(f.read(None), Err(IoError::Detached)));

        let mut f = over(b"abc", TextOptions::default());
        f.close().unwrap();
        f.close().unwrap();
        assert!(f.closed());
        assert!(matches!(f.read(None), Err(IoError::Closed)));
    }

    // ------------------------------------------------------------------------
    // StringIO
    // ------------------------------------------------------------------------

    #[test]
    fn test_string_io() {
        let mut s = StringIO::string_io("line1\nline2").unwrap();
        assert_eq!(s.readline(None).unwrap(), "line1\n");
        s.seek(0, Whence::End).unwrap();
        s.write("\nline3").unwrap();
        assert_eq!(s.getvalue().unwrap(), "line1\nline2\nline3");
    }

    #[test]
    fn test_string_io_universal_keeps_written_endings() {
        let mut s = StringIO::string_io_with("a\r\nb", None).unwrap();
        assert_eq!(s.read(None).unwrap(), "a\nb");
        assert_eq!(s.getvalue().unwrap(), "a\nb");
        assert_eq!(s.buffer().unwrap().getvalue(), b"a\r\nb");
    }
}
