//! Universal-newline decoding.

use smallvec::SmallVec;

use super::codec::{DecoderState, IncrementalDecoder};
use crate::error::IoResult;

const SEEN_LF: u8 = 1;
const SEEN_CR: u8 = 2;
const SEEN_CRLF: u8 = 4;

/// Full state of an [`IncrementalNewlineDecoder`].
///
/// `pending_cr` records a trailing `\r` held back until the next chunk shows
/// whether it starts a `\r\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderSnapshot {
    pub pending_bytes: SmallVec<[u8; 4]>,
    pub decoder_flags: u32,
    pub pending_cr: bool,
}

impl DecoderSnapshot {
    /// Decoder flags and the pending-CR bit as one word, the form stored in
    /// a text position cookie.
    #[inline]
    pub fn flags_word(&self) -> u32 {
        (self.decoder_flags << 1) | u32::from(self.pending_cr)
    }

    /// A snapshot with no pending bytes, rebuilt from [`flags_word`](Self::flags_word).
    #[inline]
    pub fn from_flags_word(word: u32) -> Self {
        Self {
            pending_bytes: SmallVec::new(),
            decoder_flags: word >> 1,
            pending_cr: word & 1 == 1,
        }
    }
}

/// Wraps a byte decoder and recognizes `\n`, `\r` and `\r\n` line endings,
/// optionally translating all of them to `\n`.
///
/// In passthrough mode the wrapped decoder's output is returned unchanged
/// and no line endings are recorded.
#[derive(Debug, Clone)]
pub struct IncrementalNewlineDecoder<D> {
    decoder: D,
    translate: bool,
    universal: bool,
    pending_cr: bool,
    seen: u8,
}

impl<D: IncrementalDecoder> IncrementalNewlineDecoder<D> {
    pub fn new(decoder: D, translate: bool) -> Self {
        Self {
            decoder,
            translate,
            universal: true,
            pending_cr: false,
            seen: 0,
        }
    }

    /// No newline handling at all.
    pub fn passthrough(decoder: D) -> Self {
        Self {
            universal: false,
            ..Self::new(decoder, false)
        }
    }

    pub fn decode(&mut self, input: &[u8], fin: bool) -> IoResult<String> {
        let mut output = self.decoder.decode(input, fin)?;
        if !self.universal {
            return Ok(output);
        }

        if self.pending_cr && (!output.is_empty() || fin) {
            output.insert(0, '\r');
            self.pending_cr = false;
        }
        if !fin && output.ends_with('\r') {
            output.pop();
            self.pending_cr = true;
        }

        let crlf = output.matches("\r\n").count();
        let cr = output.matches('\r').count() - crlf;
        let lf = output.matches('\n').count() - crlf;
        if lf > 0 {
            self.seen |= SEEN_LF;
        }
        if cr > 0 {
            self.seen |= SEEN_CR;
        }
        if crlf > 0 {
            self.seen |= SEEN_CRLF;
        }

        if self.translate {
            if crlf > 0 {
                output = output.replace("\r\n", "\n");
            }
            if cr > 0 {
                output = output.replace('\r', "\n");
            }
        }
        Ok(output)
    }

    pub fn getstate(&self) -> DecoderSnapshot {
        let DecoderState { pending, flags } = self.decoder.getstate();
        DecoderSnapshot {
            pending_bytes: pending,
            decoder_flags: flags,
            pending_cr: self.pending_cr,
        }
    }

    pub fn setstate(&mut self, snapshot: &DecoderSnapshot) {
        self.decoder.setstate(&DecoderState {
            pending: snapshot.pending_bytes.clone(),
            flags: snapshot.decoder_flags,
        });
        self.pending_cr = snapshot.pending_cr;
    }

    pub fn reset(&mut self) {
        self.seen = 0;
        self.pending_cr = false;
        self.decoder.reset();
    }

    /// Line endings seen so far, in the order `\r`, `\n`, `\r\n`.
    pub fn newlines(&self) -> Vec<&'static str> {
        [(SEEN_CR, "\r"), (SEEN_LF, "\n"), (SEEN_CRLF, "\r\n")]
            .into_iter()
            .filter(|&(bit, _)| self.seen & bit != 0)
            .map(|(_, ending)| ending)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::text::codec::Decoder;
    use crate::io::text::{Encoding, Errors};

    fn universal(translate: bool) -> IncrementalNewlineDecoder<Decoder> {
        IncrementalNewlineDecoder::new(Encoding::Utf8.decoder(Errors::Strict), translate)
    }

    #[test]
    fn test_translates_all_endings() {
        let mut d = universal(true);
        assert_eq!(d.decode(b"a\r\nb\rc\nd", true).unwrap(), "a\nb\nc\nd");
        assert_eq!(d.newlines(), vec!["\r", "\n", "\r\n"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut d = universal(true);
        assert_eq!(d.decode(b"a\r", false).unwrap(), "a");
        assert!(d.getstate().pending_cr);
        assert_eq!(d.decode(b"\nb", false).unwrap(), "\nb");
        assert_eq!(d.newlines(), vec!["\r\n"]);
    }

    #[test]
    fn test_trailing_cr_released_at_end() {
        let mut d = universal(false);
        assert_eq!(d.decode(b"x\r", false).unwrap(), "x");
        assert_eq!(d.decode(b"", true).unwrap(), "\r");
        assert_eq!(d.newlines(), vec!["\r"]);
    }

    #[test]
    fn test_untranslated_keeps_endings() {
        let mut d = universal(false);
        assert_eq!(d.decode(b"a\r\nb\n", true).unwrap(), "a\r\nb\n");
    }

    #[test]
    fn test_passthrough() {
        let mut d = IncrementalNewlineDecoder::passthrough(Encoding::Utf8.decoder(Errors::Strict));
        assert_eq!(d.decode(b"a\r", false).unwrap(), "a\r");
        assert!(d.newlines().is_empty());
    }

    #[test]
    fn test_state_round_trip() {
        let mut d = universal(true);
        d.decode(b"\xe2\x82", false).unwrap();
        d.decode(b"", false).unwrap();
        let snapshot = d.getstate();
        assert_eq!(snapshot.pending_bytes.as_slice(), b"\xe2\x82");

        let mut other = universal(true);
        other.setstate(&snapshot);
        assert_eq!(other.decode(b"\xac", false).unwrap(), "€");

        let word = DecoderSnapshot {
            pending_bytes: SmallVec::new(),
            decoder_flags: 2,
            pending_cr: true,
        }
        .flags_word();
        assert_eq!(word, 5);
        let back = DecoderSnapshot::from_flags_word(word);
        assert_eq!(back.decoder_flags, 2);
        assert!(back.pending_cr);
    }
}
