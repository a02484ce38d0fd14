//! # Field Value Coercion
//!
//! Converts a caller-supplied [`FieldValue`] into the exact type a message
//! template declares for a field.
//!
//! ## Rules
//!
//! - Integer targets are range-checked through an exact `i128` intermediate.
//!   A value that does not fit fails with [`FieldError::ValueOutOfRange`];
//!   nothing is truncated or wrapped.
//! - Floating-point sources converted to an integer target log a precision
//!   warning and proceed when the truncated value is in range.
//! - String-to-boolean accepts exactly `true`, `false`, `0`, `1`
//!   (case-insensitive).
//! - Binary targets receive the native in-memory representation of the
//!   source value.

use crate::error::FieldError;
use crate::field::{from_hex, FieldType, FieldValue};

/// Largest magnitude an `f64` may have and still truncate into `i128`.
const I128_FLOAT_BOUND: f64 = 1.7e38;

impl FieldValue {
    /// Convert this value to `target`, naming `field` in any error.
    ///
    /// Returns a clone when the value already has the target type.
    ///
    /// # Errors
    ///
    /// - [`FieldError::InvalidTypeConversion`] when the value cannot be
    ///   interpreted as the target type at all.
    /// - [`FieldError::ValueOutOfRange`] when it can, but does not fit.
    pub fn coerce_to(&self, target: FieldType, field: &str) -> Result<FieldValue, FieldError> {
        if self.field_type() == target {
            return Ok(self.clone());
        }
        match target {
            FieldType::String => Ok(FieldValue::String(self.to_value_string())),
            FieldType::Binary => Ok(FieldValue::Binary(self.native_bytes())),
            FieldType::Bool => self.to_bool(field),
            FieldType::Char => self.to_char(field),
            FieldType::F32 | FieldType::F64 => self.to_float(target, field),
            _ => {
                let wide = self.to_wide_integer(target, field)?;
                narrow(wide, target, field)
            }
        }
    }

    /// Build a value of type `ty` from its textual rendering (as produced by
    /// [`FieldValue::to_value_string`]). Binary text is hex.
    pub fn from_text(ty: FieldType, text: &str, field: &str) -> Result<FieldValue, FieldError> {
        if ty == FieldType::Binary {
            return from_hex(text.trim())
                .map(FieldValue::Binary)
                .ok_or_else(|| FieldError::InvalidTypeConversion {
                    field: field.to_string(),
                    from: FieldType::String,
                    value: text.to_string(),
                    to: FieldType::Binary,
                    reason: "expected an even number of hex digits".to_string(),
                });
        }
        FieldValue::String(text.to_string()).coerce_to(ty, field)
    }

    fn native_bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::Bool(v) => vec![u8::from(*v)],
            FieldValue::Char(v) => {
                let mut buf = [0u8; 4];
                v.encode_utf8(&mut buf).as_bytes().to_vec()
            }
            FieldValue::I8(v) => v.to_ne_bytes().to_vec(),
            FieldValue::I16(v) => v.to_ne_bytes().to_vec(),
            FieldValue::I32(v) => v.to_ne_bytes().to_vec(),
            FieldValue::I64(v) => v.to_ne_bytes().to_vec(),
            FieldValue::U8(v) => v.to_ne_bytes().to_vec(),
            FieldValue::U16(v) => v.to_ne_bytes().to_vec(),
            FieldValue::U32(v) => v.to_ne_bytes().to_vec(),
            FieldValue::U64(v) => v.to_ne_bytes().to_vec(),
            FieldValue::F32(v) => v.to_ne_bytes().to_vec(),
            FieldValue::F64(v) => v.to_ne_bytes().to_vec(),
            FieldValue::String(v) => v.as_bytes().to_vec(),
            FieldValue::Binary(v) => v.clone(),
        }
    }

    fn to_bool(&self, field: &str) -> Result<FieldValue, FieldError> {
        match self {
            FieldValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(self.invalid(FieldType::Bool, field, "expected true, false, 0 or 1")),
            },
            FieldValue::Char(c) => FieldValue::String(c.to_string()).to_bool(field),
            FieldValue::F32(_) | FieldValue::F64(_) => match self.as_f64() {
                Some(v) if v == 0.0 => Ok(FieldValue::Bool(false)),
                Some(v) if v == 1.0 => Ok(FieldValue::Bool(true)),
                _ => Err(self.out_of_range(FieldType::Bool, field)),
            },
            FieldValue::Binary(_) => {
                Err(self.invalid(FieldType::Bool, field, "binary data has no boolean form"))
            }
            _ => match self.as_i128() {
                Some(0) => Ok(FieldValue::Bool(false)),
                Some(1) => Ok(FieldValue::Bool(true)),
                _ => Err(self.out_of_range(FieldType::Bool, field)),
            },
        }
    }

    fn to_char(&self, field: &str) -> Result<FieldValue, FieldError> {
        match self {
            FieldValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(FieldValue::Char(c)),
                    _ => Err(self.invalid(FieldType::Char, field, "expected exactly one character")),
                }
            }
            other => match other.as_i128() {
                Some(v) => u8::try_from(v)
                    .map(|b| FieldValue::Char(char::from(b)))
                    .map_err(|_| other.out_of_range(FieldType::Char, field)),
                None => Err(other.invalid(FieldType::Char, field, "no character representation")),
            },
        }
    }

    fn to_float(&self, target: FieldType, field: &str) -> Result<FieldValue, FieldError> {
        let wide = match self {
            FieldValue::Bool(v) => f64::from(u8::from(*v)),
            FieldValue::Char(c) => f64::from(u32::from(*c)),
            FieldValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(target, field, "not a number"))?,
            FieldValue::Binary(_) => {
                return Err(self.invalid(target, field, "binary data has no numeric form"))
            }
            other => other
                .as_f64()
                .ok_or_else(|| other.invalid(target, field, "not a number"))?,
        };
        if target == FieldType::F64 {
            return Ok(FieldValue::F64(wide));
        }
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(self.out_of_range(target, field));
        }
        Ok(FieldValue::F32(wide as f32))
    }

    fn to_wide_integer(&self, target: FieldType, field: &str) -> Result<i128, FieldError> {
        match self {
            FieldValue::Bool(v) => Ok(i128::from(u8::from(*v))),
            FieldValue::Char(c) => Ok(i128::from(u32::from(*c))),
            FieldValue::F32(_) | FieldValue::F64(_) => {
                let v = self.as_f64().unwrap_or(f64::NAN);
                self.float_to_integer(v, target, field)
            }
            FieldValue::String(s) => {
                let text = s.trim();
                if let Ok(v) = text.parse::<i128>() {
                    return Ok(v);
                }
                match text.parse::<f64>() {
                    Ok(v) => self.float_to_integer(v, target, field),
                    Err(_) => Err(self.invalid(target, field, "not a number")),
                }
            }
            FieldValue::Binary(_) => {
                Err(self.invalid(target, field, "binary data has no numeric form"))
            }
            other => other
                .as_i128()
                .ok_or_else(|| other.invalid(target, field, "not an integer")),
        }
    }

    fn float_to_integer(&self, v: f64, target: FieldType, field: &str) -> Result<i128, FieldError> {
        if !v.is_finite() || v.trunc().abs() >= I128_FLOAT_BOUND {
            return Err(self.out_of_range(target, field));
        }
        tracing::warn!(
            field,
            value = v,
            target = %target,
            "converting floating-point value to an integer type may lose precision"
        );
        Ok(v.trunc() as i128)
    }

    fn invalid(&self, to: FieldType, field: &str, reason: &str) -> FieldError {
        FieldError::InvalidTypeConversion {
            field: field.to_string(),
            from: self.field_type(),
            value: self.to_value_string(),
            to,
            reason: reason.to_string(),
        }
    }

    fn out_of_range(&self, to: FieldType, field: &str) -> FieldError {
        FieldError::ValueOutOfRange {
            field: field.to_string(),
            value: self.to_value_string(),
            to,
        }
    }
}

/// Range-checked narrowing of an exact integer into the target width.
fn narrow(v: i128, target: FieldType, field: &str) -> Result<FieldValue, FieldError> {
    let out_of_range = || FieldError::ValueOutOfRange {
        field: field.to_string(),
        value: v.to_string(),
        to: target,
    };
    let value = match target {
        FieldType::I8 => FieldValue::I8(i8::try_from(v).map_err(|_| out_of_range())?),
        FieldType::I16 => FieldValue::I16(i16::try_from(v).map_err(|_| out_of_range())?),
        FieldType::I32 => FieldValue::I32(i32::try_from(v).map_err(|_| out_of_range())?),
        FieldType::I64 => FieldValue::I64(i64::try_from(v).map_err(|_| out_of_range())?),
        FieldType::U8 => FieldValue::U8(u8::try_from(v).map_err(|_| out_of_range())?),
        FieldType::U16 => FieldValue::U16(u16::try_from(v).map_err(|_| out_of_range())?),
        FieldType::U32 => FieldValue::U32(u32::try_from(v).map_err(|_| out_of_range())?),
        FieldType::U64 => FieldValue::U64(u64::try_from(v).map_err(|_| out_of_range())?),
        other => {
            return Err(FieldError::InvalidTypeConversion {
                field: field.to_string(),
                from: FieldType::I64,
                value: v.to_string(),
                to: other,
                reason: "not an integer type".to_string(),
            })
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_i16_in_range() {
        let v = FieldValue::from("2").coerce_to(FieldType::I16, "SEVERITY").unwrap();
        assert_eq!(v, FieldValue::I16(2));
    }

    #[test]
    fn string_to_i16_out_of_range() {
        let err = FieldValue::from("40000")
            .coerce_to(FieldType::I16, "SEVERITY")
            .unwrap_err();
        assert!(matches!(err, FieldError::ValueOutOfRange { to: FieldType::I16, .. }));
    }

    #[test]
    fn negative_to_unsigned_never_wraps() {
        let err = FieldValue::I32(-1).coerce_to(FieldType::U32, "COUNT").unwrap_err();
        assert!(matches!(err, FieldError::ValueOutOfRange { .. }));
    }

    #[test]
    fn u64_max_fits_only_u64() {
        let v = FieldValue::U64(u64::MAX);
        assert!(v.coerce_to(FieldType::I64, "X").is_err());
        assert_eq!(v.coerce_to(FieldType::U64, "X").unwrap(), v);
    }

    #[test]
    fn float_to_integer_truncates_when_in_range() {
        let v = FieldValue::F64(3.9).coerce_to(FieldType::I8, "X").unwrap();
        assert_eq!(v, FieldValue::I8(3));
        assert!(FieldValue::F64(300.0).coerce_to(FieldType::I8, "X").is_err());
        assert!(FieldValue::F64(f64::NAN).coerce_to(FieldType::I32, "X").is_err());
        assert!(FieldValue::F64(f64::INFINITY).coerce_to(FieldType::I64, "X").is_err());
    }

    #[test]
    fn string_to_bool_accepts_exact_tokens() {
        for (text, expected) in [("true", true), ("FALSE", false), ("1", true), ("0", false)] {
            assert_eq!(
                FieldValue::from(text).coerce_to(FieldType::Bool, "B").unwrap(),
                FieldValue::Bool(expected)
            );
        }
        let err = FieldValue::from("yes").coerce_to(FieldType::Bool, "B").unwrap_err();
        assert!(matches!(err, FieldError::InvalidTypeConversion { .. }));
    }

    #[test]
    fn integer_to_bool_only_zero_or_one() {
        assert_eq!(
            FieldValue::I32(1).coerce_to(FieldType::Bool, "B").unwrap(),
            FieldValue::Bool(true)
        );
        assert!(FieldValue::I32(2).coerce_to(FieldType::Bool, "B").is_err());
    }

    #[test]
    fn string_to_char() {
        assert_eq!(
            FieldValue::from("x").coerce_to(FieldType::Char, "C").unwrap(),
            FieldValue::Char('x')
        );
        assert!(FieldValue::from("xy").coerce_to(FieldType::Char, "C").is_err());
        assert!(FieldValue::I32(256).coerce_to(FieldType::Char, "C").is_err());
    }

    #[test]
    fn f64_to_f32_range() {
        assert_eq!(
            FieldValue::F64(1.5).coerce_to(FieldType::F32, "F").unwrap(),
            FieldValue::F32(1.5)
        );
        assert!(FieldValue::F64(1e300).coerce_to(FieldType::F32, "F").is_err());
    }

    #[test]
    fn binary_encodes_native_representation() {
        let v = FieldValue::I32(7).coerce_to(FieldType::Binary, "B").unwrap();
        assert_eq!(v, FieldValue::Binary(7i32.to_ne_bytes().to_vec()));
        let s = FieldValue::from("AB").coerce_to(FieldType::Binary, "B").unwrap();
        assert_eq!(s, FieldValue::Binary(b"AB".to_vec()));
    }

    #[test]
    fn binary_to_number_is_invalid() {
        let err = FieldValue::Binary(vec![1]).coerce_to(FieldType::I32, "B").unwrap_err();
        assert!(matches!(err, FieldError::InvalidTypeConversion { .. }));
    }

    #[test]
    fn from_text_parses_hex_for_binary() {
        assert_eq!(
            FieldValue::from_text(FieldType::Binary, "0A0B", "B").unwrap(),
            FieldValue::Binary(vec![10, 11])
        );
        assert_eq!(
            FieldValue::from_text(FieldType::U16, "65535", "U").unwrap(),
            FieldValue::U16(u16::MAX)
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Narrowing to I16 succeeds exactly when the source fits.
        #[test]
        fn i64_to_i16_succeeds_iff_in_range(v in any::<i64>()) {
            let result = FieldValue::I64(v).coerce_to(FieldType::I16, "X");
            let fits = i16::try_from(v).is_ok();
            prop_assert_eq!(result.is_ok(), fits);
            if let Ok(FieldValue::I16(n)) = result {
                prop_assert_eq!(i64::from(n), v);
            }
        }

        /// Decimal strings convert to the exact integer they spell.
        #[test]
        fn decimal_strings_parse_exactly(v in any::<u32>()) {
            let result = FieldValue::from(v.to_string().as_str()).coerce_to(FieldType::U32, "X");
            prop_assert_eq!(result, Ok(FieldValue::U32(v)));
        }
    }
}
