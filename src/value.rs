//! Value encoding for serialized results
//!
//! Renders a single cell of a result column as a JSON literal. The encoding
//! is driven by the column's type category:
//!
//! - **Null**: `null`, whatever the column type
//! - **Boolean**: `true` / `false`
//! - **Signed integers** (8/16/32/64-bit): decimal literal widened to `i64`
//! - **Unsigned integers** (8/16/32/64-bit): decimal literal widened to `u64`
//! - **Float / Double**: shortest round-trip decimal; NaN and infinities
//!   become `null` so the payload stays valid for strict decoders
//! - **Text**: quoted, escaped literal
//! - **Everything else** (dates, timestamps, decimals, blobs, lists, structs,
//!   hugeint, enums, ...): the engine's VARCHAR text, quoted (see
//!   [`crate::text`])
//!
//! Encoding never fails.

use std::fmt::Write as _;

use duckdb::arrow::array::{Array, AsArray};
use duckdb::arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};

use crate::text::{self, Extension};

/// The literal written for absent values
pub const NULL_TOKEN: &str = "null";

/// Coarse type category that selects the encoding rule for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Column of the NULL type (every value is null)
    Null,
    /// BOOLEAN
    Boolean,
    /// TINYINT, SMALLINT, INTEGER, BIGINT
    SignedInteger,
    /// UTINYINT, USMALLINT, UINTEGER, UBIGINT
    UnsignedInteger,
    /// FLOAT (single precision)
    Float,
    /// DOUBLE
    Double,
    /// VARCHAR
    Text,
    /// Anything rendered through its string form
    Other,
}

impl TypeCategory {
    /// Classify a column type
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Null => TypeCategory::Null,
            DataType::Boolean => TypeCategory::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                TypeCategory::SignedInteger
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                TypeCategory::UnsignedInteger
            }
            DataType::Float32 => TypeCategory::Float,
            DataType::Float64 => TypeCategory::Double,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => TypeCategory::Text,
            _ => TypeCategory::Other,
        }
    }
}

/// Append `raw` to `out` as a quoted JSON string literal
///
/// Escapes `"`, `\`, backspace, form-feed, newline, carriage return and tab
/// with their short forms and any other byte below 0x20 as `\u00XX`.
/// Everything else, including multi-byte UTF-8 sequences, is copied through.
pub fn write_json_string(out: &mut String, raw: &str) {
    out.reserve(raw.len() + 2);
    out.push('"');

    let bytes = raw.as_bytes();
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        let short = match byte {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            0x08 => "\\b",
            0x0c => "\\f",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            0x00..=0x1f => "",
            _ => continue,
        };

        // Escaped bytes are ASCII, so `i` is always a char boundary
        out.push_str(&raw[start..i]);
        if short.is_empty() {
            let _ = write!(out, "\\u{:04x}", byte);
        } else {
            out.push_str(short);
        }
        start = i + 1;
    }
    out.push_str(&raw[start..]);
    out.push('"');
}

/// Quote and escape `raw` into a new string
pub fn escape_json_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    write_json_string(&mut out, raw);
    out
}

/// Append a double, mapping non-finite values to `null`
pub fn write_f64(out: &mut String, value: f64) {
    if value.is_finite() {
        let _ = write!(out, "{}", value);
    } else {
        out.push_str(NULL_TOKEN);
    }
}

/// Append a single-precision float without widening it first
pub fn write_f32(out: &mut String, value: f32) {
    if value.is_finite() {
        let _ = write!(out, "{}", value);
    } else {
        out.push_str(NULL_TOKEN);
    }
}

/// Encoder bound to one column of one result chunk
///
/// The category is taken from the array's own type, so the typed accessors
/// below always line up with the physical layout.
pub struct ColumnEncoder<'a> {
    array: &'a dyn Array,
    category: TypeCategory,
    extension: Option<Extension>,
}

impl<'a> ColumnEncoder<'a> {
    /// Prepare an encoder for `array`
    pub fn new(array: &'a dyn Array) -> Self {
        Self {
            array,
            category: TypeCategory::of(array.data_type()),
            extension: None,
        }
    }

    /// Prepare an encoder for `array`, honouring any engine extension
    /// declared on its result `field`
    pub fn with_field(array: &'a dyn Array, field: &Field) -> Self {
        match Extension::of(field) {
            Some(extension) => Self {
                array,
                category: TypeCategory::Other,
                extension: Some(extension),
            },
            None => Self::new(array),
        }
    }

    /// Append the literal for `row` to `out`
    pub fn encode(&self, row: usize, out: &mut String) {
        if self.category == TypeCategory::Null || self.array.is_null(row) {
            out.push_str(NULL_TOKEN);
            return;
        }

        let written = match self.category {
            TypeCategory::Boolean => self.write_bool(row, out),
            TypeCategory::SignedInteger => self.signed(row).map(|v| {
                let _ = write!(out, "{}", v);
            }),
            TypeCategory::UnsignedInteger => self.unsigned(row).map(|v| {
                let _ = write!(out, "{}", v);
            }),
            TypeCategory::Float => self
                .array
                .as_primitive_opt::<Float32Type>()
                .map(|a| write_f32(out, a.value(row))),
            TypeCategory::Double => self
                .array
                .as_primitive_opt::<Float64Type>()
                .map(|a| write_f64(out, a.value(row))),
            TypeCategory::Text => self.write_text(row, out),
            TypeCategory::Null | TypeCategory::Other => None,
        };

        if written.is_none() {
            self.write_generic(row, out);
        }
    }

    fn write_bool(&self, row: usize, out: &mut String) -> Option<()> {
        let values = self.array.as_boolean_opt()?;
        out.push_str(if values.value(row) { "true" } else { "false" });
        Some(())
    }

    fn write_text(&self, row: usize, out: &mut String) -> Option<()> {
        let text = match self.array.data_type() {
            DataType::Utf8 => self.array.as_string_opt::<i32>()?.value(row),
            DataType::LargeUtf8 => self.array.as_string_opt::<i64>()?.value(row),
            DataType::Utf8View => self.array.as_string_view_opt()?.value(row),
            _ => return None,
        };
        write_json_string(out, text);
        Some(())
    }

    fn signed(&self, row: usize) -> Option<i64> {
        let array = self.array;
        match array.data_type() {
            DataType::Int8 => array.as_primitive_opt::<Int8Type>().map(|a| i64::from(a.value(row))),
            DataType::Int16 => array.as_primitive_opt::<Int16Type>().map(|a| i64::from(a.value(row))),
            DataType::Int32 => array.as_primitive_opt::<Int32Type>().map(|a| i64::from(a.value(row))),
            DataType::Int64 => array.as_primitive_opt::<Int64Type>().map(|a| a.value(row)),
            _ => None,
        }
    }

    fn unsigned(&self, row: usize) -> Option<u64> {
        let array = self.array;
        match array.data_type() {
            DataType::UInt8 => array.as_primitive_opt::<UInt8Type>().map(|a| u64::from(a.value(row))),
            DataType::UInt16 => array.as_primitive_opt::<UInt16Type>().map(|a| u64::from(a.value(row))),
            DataType::UInt32 => array.as_primitive_opt::<UInt32Type>().map(|a| u64::from(a.value(row))),
            DataType::UInt64 => array.as_primitive_opt::<UInt64Type>().map(|a| a.value(row)),
            _ => None,
        }
    }

    fn write_generic(&self, row: usize, out: &mut String) {
        write_json_string(out, &text::value_text(self.array, self.extension, row));
    }
}

/// Encode a single cell into a fresh string
pub fn encode_cell(array: &dyn Array, row: usize) -> String {
    let mut out = String::new();
    ColumnEncoder::new(array).encode(row, &mut out);
    out
}
