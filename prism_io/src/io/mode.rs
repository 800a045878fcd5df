//! Mode string validation for `open()`.
//!
//! ```text
//! mode ::= one of [rwax], plus any of [bt+], each letter at most once
//! ```
//!
//! Validation happens entirely up front so a bad mode never touches the
//! file system.

use std::fmt;

use thiserror::Error;

use crate::error::IoError;

/// Validated file mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    /// Fail if the file already exists.
    pub exclusive: bool,
    pub truncate: bool,
    /// `+`: both reading and writing.
    pub update: bool,
    /// `b`; text otherwise.
    pub binary: bool,
}

impl Default for FileMode {
    #[inline]
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            exclusive: false,
            truncate: false,
            update: false,
            binary: false,
        }
    }
}

impl FileMode {
    /// Parse and validate a mode string.
    ///
    /// | Mode  | Access                         |
    /// |-------|--------------------------------|
    /// | `r`   | read (default)                 |
    /// | `w`   | write, truncating              |
    /// | `a`   | write at end                   |
    /// | `x`   | write, creating a new file     |
    /// | `+`   | add the missing direction      |
    /// | `b`   | binary; `t` (default) is text  |
    pub fn parse(mode: &str) -> Result<Self, ParseModeError> {
        let mut seen = [false; 7];
        let mut result = FileMode {
            read: false,
            ..FileMode::default()
        };
        let mut text = false;
        let mut primaries = 0;

        for c in mode.chars() {
            let slot = match c {
                'r' => 0,
                'w' => 1,
                'a' => 2,
                'x' => 3,
                'b' => 4,
                't' => 5,
                '+' => 6,
                _ => return Err(ParseModeError::Invalid(mode.to_string())),
            };
            if seen[slot] {
                return Err(ParseModeError::Invalid(mode.to_string()));
            }
            seen[slot] = true;

            match c {
                'r' => {
                    primaries += 1;
                    result.read = true;
                }
                'w' => {
                    primaries += 1;
                    result.write = true;
                    result.truncate = true;
                }
                'a' => {
                    primaries += 1;
                    result.write = true;
                    result.append = true;
                }
                'x' => {
                    primaries += 1;
                    result.write = true;
                    result.exclusive = true;
                }
                'b' => result.binary = true,
                't' => text = true,
                _ => result.update = true,
            }
        }

        if text && result.binary {
            return Err(ParseModeError::TextAndBinary);
        }
        if primaries != 1 {
            return Err(ParseModeError::Primary);
        }
        if result.update {
            result.read = true;
            result.write = true;
        }
        Ok(result)
    }

    /// Translate to `std::fs::OpenOptions`.
    pub fn to_open_options(&self) -> std::fs::OpenOptions {
        let mut opts = std::fs::OpenOptions::new();
        opts.read(self.read)
            .write(self.write && !self.append)
            .append(self.append)
            .truncate(self.truncate)
            .create((self.truncate || self.append) && !self.exclusive)
            .create_new(self.exclusive);
        opts
    }

    /// The mode string a raw file reports (`rb`, `wb+`, `ab`, ...).
    pub fn raw_mode(&self) -> String {
        let mut s = String::with_capacity(3);
        s.push(self.primary());
        s.push('b');
        if self.update {
            s.push('+');
        }
        s
    }

    fn primary(&self) -> char {
        if self.exclusive {
            'x'
        } else if self.append {
            'a'
        } else if self.truncate {
            'w'
        } else {
            'r'
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary())?;
        if self.binary {
            write!(f, "b")?;
        }
        if self.update {
            write!(f, "+")?;
        }
        Ok(())
    }
}

/// Error validating a mode string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseModeError {
    /// Unknown or repeated letter.
    #[error("invalid mode: '{0}'")]
    Invalid(String),
    #[error("can't have text and binary mode at once")]
    TextAndBinary,
    #[error("must have exactly one of create/read/write/append mode")]
    Primary,
}

impl From<ParseModeError> for IoError {
    fn from(err: ParseModeError) -> Self {
        IoError::value(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
