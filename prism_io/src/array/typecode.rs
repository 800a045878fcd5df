//! Element tags for typed buffers.

use std::fmt;

use crate::error::{IoError, IoResult};

/// All valid tag characters, in canonical order.
pub const TYPECODES: &str = "bBuhHiIlLqQfd";

/// One-character tag selecting a typed buffer's native element type.
///
/// | tag | native width | signed? | itemsize |
/// |-----|--------------|---------|----------|
/// | b   | 8-bit        | yes     | 1        |
/// | B   | 8-bit        | no      | 1        |
/// | u   | 16-bit unit  | n/a     | 2        |
/// | h   | 16-bit       | yes     | 2        |
/// | H   | 16-bit       | no      | 2        |
/// | i,l | 32-bit       | yes     | 4        |
/// | I,L | 32-bit       | no      | 4        |
/// | q   | 64-bit       | yes     | 8        |
/// | Q   | 64-bit       | no      | 8        |
/// | f   | 32-bit float | -       | 4        |
/// | d   | 64-bit float | -       | 8        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    SignedByte,
    UnsignedByte,
    WideChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

impl TypeCode {
    /// Parse a tag character.
    pub fn from_char(c: char) -> IoResult<Self> {
        Ok(match c {
            'b' => TypeCode::SignedByte,
            'B' => TypeCode::UnsignedByte,
            'u' => TypeCode::WideChar,
            'h' => TypeCode::Short,
            'H' => TypeCode::UnsignedShort,
            'i' => TypeCode::Int,
            'I' => TypeCode::UnsignedInt,
            'l' => TypeCode::Long,
            'L' => TypeCode::UnsignedLong,
            'q' => TypeCode::LongLong,
            'Q' => TypeCode::UnsignedLongLong,
            'f' => TypeCode::Float,
            'd' => TypeCode::Double,
            _ => {
                return Err(IoError::value(
                    "bad typecode (must be b, B, u, h, H, i, I, l, L, q, Q, f or d)",
                ));
            }
        })
    }

    /// The tag character.
    pub const fn as_char(self) -> char {
        match self {
            TypeCode::SignedByte => 'b',
            TypeCode::UnsignedByte => 'B',
            TypeCode::WideChar => 'u',
            TypeCode::Short => 'h',
            TypeCode::UnsignedShort => 'H',
            TypeCode::Int => 'i',
            TypeCode::UnsignedInt => 'I',
            TypeCode::Long => 'l',
            TypeCode::UnsignedLong => 'L',
            TypeCode::LongLong => 'q',
            TypeCode::UnsignedLongLong => 'Q',
            TypeCode::Float => 'f',
            TypeCode::Double => 'd',
        }
    }

    /// Size in bytes of one element.
    pub const fn itemsize(self) -> usize {
        match self {
            TypeCode::SignedByte | TypeCode::UnsignedByte => 1,
            TypeCode::WideChar | TypeCode::Short | TypeCode::UnsignedShort => 2,
            TypeCode::Int
            | TypeCode::UnsignedInt
            | TypeCode::Long
            | TypeCode::UnsignedLong
            | TypeCode::Float => 4,
            TypeCode::LongLong | TypeCode::UnsignedLongLong | TypeCode::Double => 8,
        }
    }

    /// Every tag, in canonical order.
    pub fn all() -> impl Iterator<Item = TypeCode> {
        TYPECODES.chars().filter_map(|c| TypeCode::from_char(c).ok())
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
