//! Native element types and the single coercion rule every write path uses.
//!
//! An [`Element`] knows how to accept a host [`Value`] (rejecting values with
//! no numeric conversion as `TypeError` and out-of-range magnitudes as
//! `OverflowError`) and how to widen itself back into one.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{IoError, IoResult};
use crate::value::Value;

/// A fixed-width native element storable in an [`ElementStore`](super::ElementStore).
pub trait Element:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + FromBytes
    + IntoBytes
    + Immutable
    + KnownLayout
    + Send
    + Sync
    + 'static
{
    /// Native type name used in range errors.
    const C_NAME: &'static str;

    /// Convert a host value to this element type.
    fn coerce(value: &Value) -> IoResult<Self>;

    /// Widen this element to a host value.
    fn to_value(self) -> Value;

    /// Reverse the byte order of the element.
    fn swap_bytes(self) -> Self;

    /// Equality against a host value; values that cannot be coerced never match.
    #[inline]
    fn matches(self, value: &Value) -> bool {
        Self::coerce(value).is_ok_and(|v| v == self)
    }
}

macro_rules! int_element {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $t {
                const C_NAME: &'static str = $name;

                fn coerce(value: &Value) -> IoResult<Self> {
                    let n = value.as_int().ok_or_else(|| {
                        IoError::type_error(format!(
                            "an integer is required (got type {})",
                            value.type_name()
                        ))
                    })?;
                    <$t>::try_from(n).map_err(|_| {
                        let bound = if n < 0 { "less than minimum" } else { "greater than maximum" };
                        IoError::Overflow(format!("{} is {}", $name, bound))
                    })
                }

                #[inline]
                fn to_value(self) -> Value {
                    Value::Int(self as i128)
                }

                #[inline]
                fn swap_bytes(self) -> Self {
                    <$t>::swap_bytes(self)
                }
            }
        )*
    };
}

int_element! {
    i8 => "signed char",
    u8 => "unsigned byte integer",
    i16 => "signed short integer",
    u16 => "unsigned short integer",
    i32 => "signed integer",
    u32 => "unsigned integer",
    i64 => "signed long long integer",
    u64 => "unsigned long long integer",
}

macro_rules! float_element {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $t {
                const C_NAME: &'static str = $name;

                fn coerce(value: &Value) -> IoResult<Self> {
                    value.as_float().map(|f| f as $t).ok_or_else(|| {
                        IoError::type_error(format!(
                            "must be real number, not {}",
                            value.type_name()
                        ))
                    })
                }

                #[inline]
                fn to_value(self) -> Value {
                    Value::Float(self as f64)
                }

                #[inline]
                fn swap_bytes(self) -> Self {
                    <$t>::from_bits(self.to_bits().swap_bytes())
                }
            }
        )*
    };
}

float_element! {
    f32 => "float",
    f64 => "double",
}

// =============================================================================
// WideChar
// =============================================================================

/// A 16-bit text code unit, the element type of `'u'` buffers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(transparent)]
pub struct WideChar(pub u16);

impl WideChar {
    /// The character this unit encodes; lone surrogates map to U+FFFD.
    #[inline]
    pub fn to_char(self) -> char {
        char::from_u32(self.0 as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl Element for WideChar {
    const C_NAME: &'static str = "unicode character";

    fn coerce(value: &Value) -> IoResult<Self> {
        let Value::Str(s) = value else {
            return Err(IoError::type_error(format!(
                "array item must be unicode character, not {}",
                value.type_name()
            )));
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if (c as u32) <= 0xFFFF => Ok(WideChar(c as u16)),
            _ => Err(IoError::type_error("array item must be unicode character")),
        }
    }

    #[inline]
    fn to_value(self) -> Value {
        Value::Str(self.to_char().to_string())
    }

    #[inline]
    fn swap_bytes(self) -> Self {
        WideChar(self.0.swap_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_int_coercion_range() {
        assert_eq!(i8::coerce(&Value::Int(-128)).unwrap(), -128);
        assert_eq!(
            i8::coerce(&Value::Int(128)).unwrap_err().kind(),
            ErrorKind::OverflowError
        );
        assert_eq!(
            u8::coerce(&Value::Int(-1)).unwrap_err().to_string(),
            "unsigned byte integer is less than minimum"
        );
        assert_eq!(u64::coerce(&Value::Int(u64::MAX as i128)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_int_rejects_float_and_str() {
        assert_eq!(
            i32::coerce(&Value::Float(1.5)).unwrap_err().kind(),
            ErrorKind::TypeError
        );
        assert_eq!(
            i32::coerce(&Value::from("1")).unwrap_err().kind(),
            ErrorKind::TypeError
        );
    }

    #[test]
    fn test_bool_coerces_as_int() {
        assert_eq!(u8::coerce(&Value::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_float_accepts_int() {
        assert_eq!(f64::coerce(&Value::Int(3)).unwrap(), 3.0);
        assert_eq!(
            f32::coerce(&Value::None).unwrap_err().kind(),
            ErrorKind::TypeError
        );
    }

    #[test]
    fn test_unsigned_widening_reads() {
        assert_eq!(u32::MAX.to_value(), Value::Int(4_294_967_295));
        assert_eq!(u64::MAX.to_value(), Value::Int(18_446_744_073_709_551_615));
        assert_eq!((-1i8).to_value(), Value::Int(-1));
    }

    #[test]
    fn test_wide_char_coercion() {
        assert_eq!(WideChar::coerce(&Value::from("é")).unwrap(), WideChar(0xE9));
        assert!(WideChar::coerce(&Value::from("ab")).is_err());
        assert!(WideChar::coerce(&Value::from("\u{1F600}")).is_err());
        assert!(WideChar::coerce(&Value::Int(65)).is_err());
        assert_eq!(WideChar(0xD800).to_char(), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_swap_bytes() {
        assert_eq!(0x1234u16.swap_bytes(), 0x3412);
        assert_eq!(Element::swap_bytes(1.0f32).swap_bytes(), 1.0);
        assert_eq!(Element::swap_bytes(WideChar(0x0041)), WideChar(0x4100));
    }

    #[test]
    fn test_matches() {
        assert!(3i16.matches(&Value::Int(3)));
        assert!(!3i16.matches(&Value::Float(3.0)));
        assert!(2.0f64.matches(&Value::Int(2)));
        assert!(!1u8.matches(&Value::Int(257)));
    }
}
