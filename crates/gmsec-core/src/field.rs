//! # Message Fields
//!
//! A GMSEC field is a named, strongly-typed value. The value is modeled as a
//! single tagged union ([`FieldValue`]) over the scalar kinds carried on the
//! bus, so both validation and coercion dispatch through one `match` rather
//! than a family of per-type field classes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// The wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Single character.
    Char,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// UTF-8 string.
    String,
    /// Opaque bytes.
    #[serde(rename = "BIN")]
    Binary,
}

impl FieldType {
    /// All field types in declaration order.
    pub const ALL: [FieldType; 14] = [
        FieldType::Bool,
        FieldType::Char,
        FieldType::I8,
        FieldType::I16,
        FieldType::I32,
        FieldType::I64,
        FieldType::U8,
        FieldType::U16,
        FieldType::U32,
        FieldType::U64,
        FieldType::F32,
        FieldType::F64,
        FieldType::String,
        FieldType::Binary,
    ];

    /// Canonical token used in schema files and encoded messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Bool => "BOOL",
            FieldType::Char => "CHAR",
            FieldType::I8 => "I8",
            FieldType::I16 => "I16",
            FieldType::I32 => "I32",
            FieldType::I64 => "I64",
            FieldType::U8 => "U8",
            FieldType::U16 => "U16",
            FieldType::U32 => "U32",
            FieldType::U64 => "U64",
            FieldType::F32 => "F32",
            FieldType::F64 => "F64",
            FieldType::String => "STRING",
            FieldType::Binary => "BIN",
        }
    }

    /// Parse a type token, case-insensitively. Accepts the aliases used by
    /// older template sets (`BOOLEAN`, `BINARY`, `BLOB`).
    pub fn from_token(token: &str) -> Option<Self> {
        let upper = token.trim().to_ascii_uppercase();
        let ty = match upper.as_str() {
            "BOOL" | "BOOLEAN" => FieldType::Bool,
            "CHAR" => FieldType::Char,
            "I8" => FieldType::I8,
            "I16" => FieldType::I16,
            "I32" => FieldType::I32,
            "I64" => FieldType::I64,
            "U8" => FieldType::U8,
            "U16" => FieldType::U16,
            "U32" => FieldType::U32,
            "U64" => FieldType::U64,
            "F32" => FieldType::F32,
            "F64" => FieldType::F64,
            "STRING" => FieldType::String,
            "BIN" | "BINARY" | "BLOB" => FieldType::Binary,
            _ => return None,
        };
        Some(ty)
    }

    /// True for the eight integer types.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::I64
                | FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
        )
    }

    /// True for `F32` and `F64`.
    pub fn is_float(&self) -> bool {
        matches!(self, FieldType::F32 | FieldType::F64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A strongly-typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean value.
    Bool(bool),
    /// Character value.
    Char(char),
    /// Signed 8-bit value.
    I8(i8),
    /// Signed 16-bit value.
    I16(i16),
    /// Signed 32-bit value.
    I32(i32),
    /// Signed 64-bit value.
    I64(i64),
    /// Unsigned 8-bit value.
    U8(u8),
    /// Unsigned 16-bit value.
    U16(u16),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Unsigned 64-bit value.
    U64(u64),
    /// 32-bit float value.
    F32(f32),
    /// 64-bit float value.
    F64(f64),
    /// String value.
    String(String),
    /// Binary value.
    Binary(Vec<u8>),
}

impl FieldValue {
    /// The wire type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Binary(_) => FieldType::Binary,
        }
    }

    /// Exact integer view of integer-typed values. Every GMSEC integer width
    /// fits in `i128`, so this never loses information.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            FieldValue::I8(v) => Some(i128::from(*v)),
            FieldValue::I16(v) => Some(i128::from(*v)),
            FieldValue::I32(v) => Some(i128::from(*v)),
            FieldValue::I64(v) => Some(i128::from(*v)),
            FieldValue::U8(v) => Some(i128::from(*v)),
            FieldValue::U16(v) => Some(i128::from(*v)),
            FieldValue::U32(v) => Some(i128::from(*v)),
            FieldValue::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Integer value as `i64`, if this is an integer field that fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Float view of numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::F32(v) => Some(f64::from(*v)),
            FieldValue::F64(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// String slice for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it appears in templates and encoded
    /// messages. Binary values render as uppercase hex.
    pub fn to_value_string(&self) -> String {
        match self {
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Char(v) => v.to_string(),
            FieldValue::I8(v) => v.to_string(),
            FieldValue::I16(v) => v.to_string(),
            FieldValue::I32(v) => v.to_string(),
            FieldValue::I64(v) => v.to_string(),
            FieldValue::U8(v) => v.to_string(),
            FieldValue::U16(v) => v.to_string(),
            FieldValue::U32(v) => v.to_string(),
            FieldValue::U64(v) => v.to_string(),
            FieldValue::F32(v) => v.to_string(),
            FieldValue::F64(v) => v.to_string(),
            FieldValue::String(v) => v.clone(),
            FieldValue::Binary(bytes) => to_hex(bytes),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value_string())
    }
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

pub(crate) fn from_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Binary,
);

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Binary(v.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A named field as stored in a [`Message`](crate::Message).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: FieldValue,
    header: bool,
}

impl Field {
    /// Create a non-header field.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::InvalidFieldName`] if the name is empty or
    /// contains whitespace.
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Result<Self, FieldError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(FieldError::InvalidFieldName(name));
        }
        Ok(Self {
            name,
            value: value.into(),
            header: false,
        })
    }

    /// Mark this field as a header field.
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field value.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Field wire type.
    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    /// Whether the field belongs to the message header.
    pub fn is_header(&self) -> bool {
        self.header
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})={}", self.name, self.field_type(), self.value)
    }
}
