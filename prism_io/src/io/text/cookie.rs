//! Text position cookies.
//!
//! ```text
//!  127   126   125 ....... 104   103 ....... 80   79 ... 64   63 ......... 0
//! ┌─────┬─────┬───────────────┬────────────────┬──────────┬────────────────┐
//! │  0  │ eof │ chars_to_skip │ bytes_to_feed  │ dec_flags│    position    │
//! └─────┴─────┴───────────────┴────────────────┴──────────┴────────────────┘
//! ```
//!
//! A cookie with every field but `position` zero equals the byte position,
//! so positions at decoder-clean points read as plain offsets. The top bit
//! stays clear so every cookie is also a non-negative `i128`.

use crate::error::{IoError, IoResult};

const FLAGS_SHIFT: u32 = 64;
const FEED_SHIFT: u32 = 80;
const SKIP_SHIFT: u32 = 104;
const EOF_SHIFT: u32 = 126;

const FLAGS_MAX: u32 = (1 << 16) - 1;
const FEED_MAX: u32 = (1 << 24) - 1;
const SKIP_MAX: u32 = (1 << 22) - 1;

/// Everything needed to return a text stream to a logical position: where
/// to seek the byte stream, how to prime the decoder, and how much decoded
/// text to discard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextCookie {
    /// Byte position of the last decoder-clean point.
    pub position: u64,
    /// Decoder flags word at that point.
    pub dec_flags: u32,
    /// Bytes to feed the decoder after seeking.
    pub bytes_to_feed: u32,
    /// Decoded characters to discard after feeding.
    pub chars_to_skip: u32,
    /// Whether the feed must be flagged as final.
    pub need_eof: bool,
}

impl TextCookie {
    #[inline]
    pub const fn at(position: u64) -> Self {
        Self {
            position,
            dec_flags: 0,
            bytes_to_feed: 0,
            chars_to_skip: 0,
            need_eof: false,
        }
    }

    pub fn pack(&self) -> IoResult<u128> {
        if self.dec_flags > FLAGS_MAX || self.bytes_to_feed > FEED_MAX || self.chars_to_skip > SKIP_MAX
        {
            return Err(IoError::Overflow(
                "text position cookie field out of range".to_string(),
            ));
        }
        Ok(u128::from(self.position)
            | u128::from(self.dec_flags) << FLAGS_SHIFT
            | u128::from(self.bytes_to_feed) << FEED_SHIFT
            | u128::from(self.chars_to_skip) << SKIP_SHIFT
            | u128::from(self.need_eof) << EOF_SHIFT)
    }

    pub fn unpack(raw: u128) -> Self {
        let field = |shift: u32, max: u32| ((raw >> shift) & u128::from(max)) as u32;
        Self {
            position: raw as u64,
            dec_flags: field(FLAGS_SHIFT, FLAGS_MAX),
            bytes_to_feed: field(FEED_SHIFT, FEED_MAX),
            chars_to_skip: field(SKIP_SHIFT, SKIP_MAX),
            need_eof: (raw >> EOF_SHIFT) & 1 == 1,
        }
    }

    /// Whether seeking needs nothing beyond the byte position and flags.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.bytes_to_feed == 0 && self.chars_to_skip == 0 && !self.need_eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_position_is_identity() {
        assert_eq!(TextCookie::at(1234).pack().unwrap(), 1234);
        assert_eq!(TextCookie::unpack(1234), TextCookie::at(1234));
    }

    #[test]
    fn test_fields_survive_packing() {
        let cookie = TextCookie {
            position: u64::MAX,
            dec_flags: 3,
            bytes_to_feed: FEED_MAX,
            chars_to_skip: 17,
            need_eof: true,
        };
        let raw = cookie.pack().unwrap();
        assert!(i128::try_from(raw).is_ok());
        assert_eq!(TextCookie::unpack(raw), cookie);
        assert!(!cookie.is_clean());
    }

    #[test]
    fn test_oversized_field_rejected() {
        let cookie = TextCookie {
            chars_to_skip: SKIP_MAX + 1,
            ..TextCookie::at(0)
        };
        assert!(matches!(cookie.pack(), Err(IoError::Overflow(_))));
    }
}
