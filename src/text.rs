//! Engine text forms for values without a native JSON literal
//!
//! Mirrors how DuckDB casts a value to VARCHAR, so hosts see the same text
//! the engine itself would print: `2024-01-01 12:00:00.5`, `1 day`,
//! `\xAA\x01`, `{'a': 1, 'b': x}`, `{k=1}`, `[1, 2, NULL]`.
//!
//! Columns the engine marks with an Arrow extension (128-bit integers, UUID,
//! BIT, TIME WITH TIME ZONE) are decoded from their storage bytes. A layout
//! this module does not know falls back to Arrow's display form, and to the
//! type name if even that is unavailable.

use std::fmt::Write as _;

use duckdb::arrow::array::{Array, AsArray, OffsetSizeTrait, UnionArray};
use duckdb::arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Field, Float32Type, Float64Type, Int16Type,
    Int32Type, Int64Type, Int8Type, IntervalDayTimeType, IntervalMonthDayNanoType, IntervalUnit,
    IntervalYearMonthType, Time32MillisecondType, Time32SecondType, Time64MicrosecondType,
    Time64NanosecondType, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use duckdb::arrow::util::display::{ArrayFormatter, FormatOptions};
use serde::Deserialize;

/// Text of a NULL nested inside a list, struct or map
pub const NESTED_NULL: &str = "NULL";

const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

const MICROS_PER_SECOND: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Largest TIME WITH TIME ZONE offset, in seconds
const MAX_TIME_TZ_OFFSET: i64 = 16 * 60 * 60 - 1;

/// Engine types carried in Arrow extension columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// HUGEINT, 16 little-endian bytes
    HugeInt,
    /// UHUGEINT, 16 little-endian bytes
    UHugeInt,
    /// UUID, 16 big-endian bytes
    Uuid,
    /// BIT, a padding byte followed by the bit string
    Bit,
    /// TIME WITH TIME ZONE, micros and encoded offset packed in 64 bits
    TimeTz,
}

#[derive(Deserialize)]
struct OpaqueMetadata {
    type_name: String,
}

impl Extension {
    /// Extension declared on `field`, if it is one the renderer decodes
    pub fn of(field: &Field) -> Option<Self> {
        let metadata = field.metadata();
        let name = metadata.get(EXTENSION_NAME_KEY)?;
        match name.as_str() {
            "arrow.uuid" => Some(Extension::Uuid),
            "arrow.opaque" => {
                let raw = metadata.get(EXTENSION_METADATA_KEY)?;
                let opaque: OpaqueMetadata = serde_json::from_str(raw).ok()?;
                Self::from_type_name(&opaque.type_name)
            }
            other => Self::from_type_name(other.strip_prefix("duckdb.")?),
        }
    }

    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "hugeint" => Some(Extension::HugeInt),
            "uhugeint" => Some(Extension::UHugeInt),
            "uuid" => Some(Extension::Uuid),
            "bit" => Some(Extension::Bit),
            "time_tz" => Some(Extension::TimeTz),
            _ => None,
        }
    }
}

/// Text form of `array[row]` as a new string
pub fn value_text(array: &dyn Array, extension: Option<Extension>, row: usize) -> String {
    let mut out = String::new();
    write_value(&mut out, array, extension, row);
    out
}

/// Append the engine text form of `array[row]` to `out`
///
/// A null cell is written as `NULL`. Top-level nulls never get here: the
/// value encoder turns them into JSON `null` first.
pub fn write_value(out: &mut String, array: &dyn Array, extension: Option<Extension>, row: usize) {
    if array.is_null(row) {
        out.push_str(NESTED_NULL);
        return;
    }
    let written = match extension {
        Some(extension) => write_extension(out, array, extension, row),
        None => write_plain(out, array, row),
    };
    if written.is_none() {
        write_fallback(out, array, row);
    }
}

fn write_extension(out: &mut String, array: &dyn Array, extension: Extension, row: usize) -> Option<()> {
    match extension {
        Extension::HugeInt => {
            let bytes: [u8; 16] = bytes_at(array, row)?.try_into().ok()?;
            let _ = write!(out, "{}", i128::from_le_bytes(bytes));
        }
        Extension::UHugeInt => {
            let bytes: [u8; 16] = bytes_at(array, row)?.try_into().ok()?;
            let _ = write!(out, "{}", u128::from_le_bytes(bytes));
        }
        Extension::Uuid => {
            if let Some(text) = string_at(array, row) {
                out.push_str(text);
                return Some(());
            }
            let bytes: [u8; 16] = bytes_at(array, row)?.try_into().ok()?;
            write_uuid(out, &bytes);
        }
        Extension::Bit => write_bits(out, bytes_at(array, row)?)?,
        Extension::TimeTz => {
            let bits = match array.data_type() {
                DataType::Int64 => array.as_primitive_opt::<Int64Type>()?.value(row) as u64,
                DataType::UInt64 => array.as_primitive_opt::<UInt64Type>()?.value(row),
                _ => u64::from_le_bytes(bytes_at(array, row)?.try_into().ok()?),
            };
            write_time_tz(out, bits);
        }
    }
    Some(())
}

fn write_plain(out: &mut String, array: &dyn Array, row: usize) -> Option<()> {
    macro_rules! display {
        ($ty:ty) => {{
            let _ = write!(out, "{}", array.as_primitive_opt::<$ty>()?.value(row));
        }};
    }

    match array.data_type() {
        DataType::Null => out.push_str(NESTED_NULL),
        DataType::Boolean => {
            out.push_str(if array.as_boolean_opt()?.value(row) { "true" } else { "false" })
        }
        DataType::Int8 => display!(Int8Type),
        DataType::Int16 => display!(Int16Type),
        DataType::Int32 => display!(Int32Type),
        DataType::Int64 => display!(Int64Type),
        DataType::UInt8 => display!(UInt8Type),
        DataType::UInt16 => display!(UInt16Type),
        DataType::UInt32 => display!(UInt32Type),
        DataType::UInt64 => display!(UInt64Type),
        DataType::Float32 => {
            write_float(out, array.as_primitive_opt::<Float32Type>()?.value(row))
        }
        DataType::Float64 => {
            write_float(out, array.as_primitive_opt::<Float64Type>()?.value(row))
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            out.push_str(string_at(array, row)?)
        }
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => write_blob(out, bytes_at(array, row)?),
        DataType::Decimal128(_, scale) => {
            let value = array.as_primitive_opt::<Decimal128Type>()?.value(row);
            write_decimal(out, value, *scale);
        }
        DataType::Date32 => {
            write_date(out, i64::from(array.as_primitive_opt::<Date32Type>()?.value(row)))
        }
        DataType::Date64 => {
            let millis = array.as_primitive_opt::<Date64Type>()?.value(row);
            write_date(out, millis.div_euclid(SECONDS_PER_DAY * 1_000));
        }
        DataType::Time32(unit) => {
            let value = match unit {
                TimeUnit::Second => array.as_primitive_opt::<Time32SecondType>()?.value(row),
                TimeUnit::Millisecond => {
                    array.as_primitive_opt::<Time32MillisecondType>()?.value(row)
                }
                _ => return None,
            };
            let (seconds, nanos) = split_units(i64::from(value), *unit);
            write_clock(out, seconds, nanos, *unit);
        }
        DataType::Time64(unit) => {
            let value = match unit {
                TimeUnit::Microsecond => {
                    array.as_primitive_opt::<Time64MicrosecondType>()?.value(row)
                }
                TimeUnit::Nanosecond => array.as_primitive_opt::<Time64NanosecondType>()?.value(row),
                _ => return None,
            };
            let (seconds, nanos) = split_units(value, *unit);
            write_clock(out, seconds, nanos, *unit);
        }
        DataType::Timestamp(unit, tz) => {
            let value = match unit {
                TimeUnit::Second => array.as_primitive_opt::<TimestampSecondType>()?.value(row),
                TimeUnit::Millisecond => {
                    array.as_primitive_opt::<TimestampMillisecondType>()?.value(row)
                }
                TimeUnit::Microsecond => {
                    array.as_primitive_opt::<TimestampMicrosecondType>()?.value(row)
                }
                TimeUnit::Nanosecond => {
                    array.as_primitive_opt::<TimestampNanosecondType>()?.value(row)
                }
            };
            write_timestamp(out, value, *unit, tz.as_deref());
        }
        DataType::Interval(IntervalUnit::MonthDayNano) => {
            let value = array.as_primitive_opt::<IntervalMonthDayNanoType>()?.value(row);
            write_interval(out, value.months, value.days, value.nanoseconds / 1_000);
        }
        DataType::Interval(IntervalUnit::DayTime) => {
            let value = array.as_primitive_opt::<IntervalDayTimeType>()?.value(row);
            write_interval(out, 0, value.days, i64::from(value.milliseconds) * 1_000);
        }
        DataType::Interval(IntervalUnit::YearMonth) => {
            let months = array.as_primitive_opt::<IntervalYearMonthType>()?.value(row);
            write_interval(out, months, 0, 0);
        }
        DataType::List(field) => {
            let list = array.as_list_opt::<i32>()?;
            write_list_items(out, list.values().as_ref(), field, offsets(list.value_offsets(), row)?);
        }
        DataType::LargeList(field) => {
            let list = array.as_list_opt::<i64>()?;
            write_list_items(out, list.values().as_ref(), field, offsets(list.value_offsets(), row)?);
        }
        DataType::FixedSizeList(field, _) => {
            let list = array.as_fixed_size_list_opt()?;
            let start = usize::try_from(list.value_offset(row)).ok()?;
            let len = usize::try_from(list.value_length()).ok()?;
            write_list_items(out, list.values().as_ref(), field, start..start + len);
        }
        DataType::Struct(fields) => {
            let structs = array.as_struct_opt()?;
            out.push('{');
            for (i, (field, column)) in fields.iter().zip(structs.columns()).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "'{}': ", field.name());
                write_value(out, column.as_ref(), Extension::of(field), row);
            }
            out.push('}');
        }
        DataType::Map(entries, _) => {
            let map = array.as_map_opt()?;
            let (key_ext, value_ext) = match entries.data_type() {
                DataType::Struct(kv) if kv.len() == 2 => (Extension::of(&kv[0]), Extension::of(&kv[1])),
                _ => (None, None),
            };
            let entries = offsets(map.value_offsets(), row)?;
            out.push('{');
            for (i, entry) in entries.enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, map.keys().as_ref(), key_ext, entry);
                out.push('=');
                write_value(out, map.values().as_ref(), value_ext, entry);
            }
            out.push('}');
        }
        DataType::Dictionary(_, _) => {
            let dictionary = array.as_any_dictionary_opt()?;
            let key = dictionary_key(dictionary.keys(), row)?;
            write_value(out, dictionary.values().as_ref(), None, key);
        }
        DataType::Union(fields, _) => {
            let union = array.as_any().downcast_ref::<UnionArray>()?;
            let type_id = union.type_id(row);
            let field = fields.iter().find(|(id, _)| *id == type_id).map(|(_, f)| f);
            write_value(
                out,
                union.child(type_id).as_ref(),
                field.and_then(|f| Extension::of(f)),
                union.value_offset(row),
            );
        }
        _ => return None,
    }
    Some(())
}

fn write_fallback(out: &mut String, array: &dyn Array, row: usize) {
    let options = FormatOptions::default().with_display_error(true);
    match ArrayFormatter::try_new(array, &options) {
        Ok(formatter) => {
            let _ = write!(out, "{}", formatter.value(row));
        }
        Err(_) => {
            let _ = write!(out, "{}", array.data_type());
        }
    }
}

fn string_at(array: &dyn Array, row: usize) -> Option<&str> {
    match array.data_type() {
        DataType::Utf8 => Some(array.as_string_opt::<i32>()?.value(row)),
        DataType::LargeUtf8 => Some(array.as_string_opt::<i64>()?.value(row)),
        DataType::Utf8View => Some(array.as_string_view_opt()?.value(row)),
        _ => None,
    }
}

fn bytes_at(array: &dyn Array, row: usize) -> Option<&[u8]> {
    match array.data_type() {
        DataType::Binary => Some(array.as_binary_opt::<i32>()?.value(row)),
        DataType::LargeBinary => Some(array.as_binary_opt::<i64>()?.value(row)),
        DataType::BinaryView => Some(array.as_binary_view_opt()?.value(row)),
        DataType::FixedSizeBinary(_) => Some(array.as_fixed_size_binary_opt()?.value(row)),
        _ => None,
    }
}

fn offsets<O: OffsetSizeTrait>(offsets: &[O], row: usize) -> Option<std::ops::Range<usize>> {
    let start = offsets.get(row)?.as_usize();
    let end = offsets.get(row + 1)?.as_usize();
    Some(start..end)
}

fn dictionary_key(keys: &dyn Array, row: usize) -> Option<usize> {
    let key = match keys.data_type() {
        DataType::Int8 => i64::from(keys.as_primitive_opt::<Int8Type>()?.value(row)),
        DataType::Int16 => i64::from(keys.as_primitive_opt::<Int16Type>()?.value(row)),
        DataType::Int32 => i64::from(keys.as_primitive_opt::<Int32Type>()?.value(row)),
        DataType::Int64 => keys.as_primitive_opt::<Int64Type>()?.value(row),
        DataType::UInt8 => i64::from(keys.as_primitive_opt::<UInt8Type>()?.value(row)),
        DataType::UInt16 => i64::from(keys.as_primitive_opt::<UInt16Type>()?.value(row)),
        DataType::UInt32 => i64::from(keys.as_primitive_opt::<UInt32Type>()?.value(row)),
        DataType::UInt64 => i64::try_from(keys.as_primitive_opt::<UInt64Type>()?.value(row)).ok()?,
        _ => return None,
    };
    usize::try_from(key).ok()
}

fn write_list_items(
    out: &mut String,
    values: &dyn Array,
    field: &Field,
    range: std::ops::Range<usize>,
) {
    let extension = Extension::of(field);
    out.push('[');
    for (i, item) in range.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, values, extension, item);
    }
    out.push(']');
}

/// Shortest round-trip digits, with `.0` on integral values and a signed
/// two-digit exponent (`1e+20`, `1e-07`)
fn write_float<F: std::fmt::Debug + Into<f64> + Copy>(out: &mut String, value: F) {
    let wide: f64 = value.into();
    if wide.is_nan() {
        out.push_str("nan");
        return;
    }
    if wide.is_infinite() {
        out.push_str(if wide > 0.0 { "inf" } else { "-inf" });
        return;
    }
    let text = format!("{:?}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            let _ = write!(out, "{}e{}{:0>2}", mantissa, sign, digits);
        }
        None => out.push_str(&text),
    }
}

/// Printable ASCII passes through, everything else (and the quote and
/// backslash characters) becomes `\xHH`
fn write_blob(out: &mut String, bytes: &[u8]) {
    for &byte in bytes {
        if (0x20..=0x7e).contains(&byte) && !matches!(byte, b'\\' | b'\'' | b'"') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "\\x{:02X}", byte);
        }
    }
}

fn write_bits(out: &mut String, bytes: &[u8]) -> Option<()> {
    let (&padding, data) = bytes.split_first()?;
    let padding = usize::from(padding);
    for (i, byte) in data.iter().enumerate() {
        for bit in (0..8usize).rev() {
            if i == 0 && 7 - bit < padding {
                continue;
            }
            out.push(if byte >> bit & 1 == 1 { '1' } else { '0' });
        }
    }
    Some(())
}

fn write_uuid(out: &mut String, bytes: &[u8; 16]) {
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{:02x}", byte);
    }
}

fn write_decimal(out: &mut String, value: i128, scale: i8) {
    if scale <= 0 {
        let _ = write!(out, "{}", value);
        for _ in 0..scale.unsigned_abs() {
            out.push('0');
        }
        return;
    }
    let scale = usize::from(scale.unsigned_abs());
    let digits = value.unsigned_abs().to_string();
    if value < 0 {
        out.push('-');
    }
    if digits.len() <= scale {
        out.push_str("0.");
        for _ in digits.len()..scale {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let (whole, fraction) = digits.split_at(digits.len() - scale);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    }
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day)
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn write_date(out: &mut String, days: i64) {
    let infinity = i64::from(i32::MAX);
    if days == infinity {
        out.push_str("infinity");
        return;
    }
    if days == -infinity {
        out.push_str("-infinity");
        return;
    }
    let (year, month, day) = civil_from_days(days);
    if year > 0 {
        let _ = write!(out, "{:04}-{:02}-{:02}", year, month, day);
    } else {
        let _ = write!(out, "{:04}-{:02}-{:02} (BC)", 1 - year, month, day);
    }
}

fn split_units(value: i64, unit: TimeUnit) -> (i64, i64) {
    let per_second = match unit {
        TimeUnit::Second => 1,
        TimeUnit::Millisecond => 1_000,
        TimeUnit::Microsecond => MICROS_PER_SECOND,
        TimeUnit::Nanosecond => NANOS_PER_SECOND,
    };
    let nanos = value.rem_euclid(per_second) * (NANOS_PER_SECOND / per_second);
    (value.div_euclid(per_second), nanos)
}

/// `HH:MM:SS` plus a fraction with trailing zeros trimmed
///
/// Nanosecond columns keep nine fractional digits, everything else six.
fn write_clock(out: &mut String, seconds_of_day: i64, nanos: i64, unit: TimeUnit) {
    let hours = seconds_of_day / 3_600;
    let minutes = seconds_of_day / 60 % 60;
    let seconds = seconds_of_day % 60;
    let _ = write!(out, "{:02}:{:02}:{:02}", hours, minutes, seconds);
    let fraction = match unit {
        TimeUnit::Nanosecond => format!("{:09}", nanos),
        _ => format!("{:06}", nanos / 1_000),
    };
    let fraction = fraction.trim_end_matches('0');
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
}

fn write_timestamp(out: &mut String, value: i64, unit: TimeUnit, tz: Option<&str>) {
    if value == i64::MAX {
        out.push_str("infinity");
        return;
    }
    if value == -i64::MAX {
        out.push_str("-infinity");
        return;
    }
    let (seconds, nanos) = split_units(value, unit);
    let offset = tz.map(|tz| utc_offset(tz).unwrap_or(0));
    let local = seconds + offset.unwrap_or(0);
    write_date(out, local.div_euclid(SECONDS_PER_DAY));
    out.push(' ');
    write_clock(out, local.rem_euclid(SECONDS_PER_DAY), nanos, unit);
    if let Some(offset) = offset {
        write_offset(out, offset);
    }
}

/// Offset in seconds for `UTC` and fixed `+HH[:MM]` zones
///
/// Named zones other than UTC are not resolved and render in UTC.
fn utc_offset(tz: &str) -> Option<i64> {
    if matches!(tz, "UTC" | "Z" | "GMT" | "Etc/UTC" | "Etc/GMT") {
        return Some(0);
    }
    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = digits.split_at(digits.len().min(2));
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = if minutes.is_empty() { 0 } else { minutes.parse().ok()? };
    Some(sign * (hours * 3_600 + minutes * 60))
}

/// `+HH`, extended with `:MM` and `:SS` only when they are non-zero
fn write_offset(out: &mut String, offset: i64) {
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    let _ = write!(out, "{}{:02}", sign, offset / 3_600);
    let minutes = offset / 60 % 60;
    let seconds = offset % 60;
    if minutes != 0 || seconds != 0 {
        let _ = write!(out, ":{:02}", minutes);
    }
    if seconds != 0 {
        let _ = write!(out, ":{:02}", seconds);
    }
}

fn write_time_tz(out: &mut String, bits: u64) {
    let micros = (bits >> 24) as i64;
    let offset = MAX_TIME_TZ_OFFSET - (bits & 0x00ff_ffff) as i64;
    let (seconds, nanos) = split_units(micros, TimeUnit::Microsecond);
    write_clock(out, seconds, nanos, TimeUnit::Microsecond);
    write_offset(out, offset);
}

fn write_unit(out: &mut String, amount: i64, unit: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    let _ = write!(out, "{} {}", amount, unit);
    if amount != 1 {
        out.push('s');
    }
}

fn write_interval(out: &mut String, months: i32, days: i32, micros: i64) {
    let mut body = String::new();
    let years = i64::from(months / 12);
    let months = i64::from(months % 12);
    if years != 0 {
        write_unit(&mut body, years, "year");
    }
    if months != 0 {
        write_unit(&mut body, months, "month");
    }
    if days != 0 {
        write_unit(&mut body, i64::from(days), "day");
    }
    if micros != 0 {
        if !body.is_empty() {
            body.push(' ');
        }
        if micros < 0 {
            body.push('-');
        }
        let (seconds, nanos) = split_units(micros.unsigned_abs() as i64, TimeUnit::Microsecond);
        write_clock(&mut body, seconds, nanos, TimeUnit::Microsecond);
    } else if body.is_empty() {
        body.push_str("00:00:00");
    }
    out.push_str(&body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::arrow::array::{
        ArrayRef, BinaryArray, Date32Array, Decimal128Array, Decimal256Array, FixedSizeBinaryArray, Float64Array,
        Int32Array, Int32Builder, IntervalMonthDayNanoArray, ListArray, MapBuilder, StringArray,
        StringBuilder, StructArray, Time64MicrosecondArray, TimestampMicrosecondArray,
        TimestampNanosecondArray, TimestampSecondArray,
    };
    use duckdb::arrow::datatypes::{i256, IntervalMonthDayNano};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn text(array: &dyn Array) -> String {
        value_text(array, None, 0)
    }

    fn interval(months: i32, days: i32, micros: i64) -> String {
        let array = IntervalMonthDayNanoArray::from(vec![IntervalMonthDayNano::new(
            months,
            days,
            micros * 1_000,
        )]);
        text(&array)
    }

    #[test]
    fn test_timestamps_trim_fraction() {
        // 2024-01-01 12:00:00.5
        let micros = 1_704_110_400_000_000 + 500_000;
        assert_eq!(
            text(&TimestampMicrosecondArray::from(vec![micros])),
            "2024-01-01 12:00:00.5"
        );
        assert_eq!(
            text(&TimestampMicrosecondArray::from(vec![1_704_110_400_000_000])),
            "2024-01-01 12:00:00"
        );
        assert_eq!(
            text(&TimestampSecondArray::from(vec![0])),
            "1970-01-01 00:00:00"
        );
        assert_eq!(
            text(&TimestampNanosecondArray::from(vec![1_000_000_123])),
            "1970-01-01 00:00:01.000000123"
        );
        assert_eq!(
            text(&TimestampMicrosecondArray::from(vec![-1])),
            "1969-12-31 23:59:59.999999"
        );
        assert_eq!(text(&TimestampMicrosecondArray::from(vec![i64::MAX])), "infinity");
    }

    #[test]
    fn test_timestamp_with_zone_carries_offset() {
        let utc = TimestampMicrosecondArray::from(vec![1_704_110_400_000_000]).with_timezone("UTC");
        assert_eq!(text(&utc), "2024-01-01 12:00:00+00");

        let plus_two =
            TimestampMicrosecondArray::from(vec![1_704_110_400_000_000]).with_timezone("+02:00");
        assert_eq!(text(&plus_two), "2024-01-01 14:00:00+02");

        let india =
            TimestampMicrosecondArray::from(vec![1_704_110_400_000_000]).with_timezone("+05:30");
        assert_eq!(text(&india), "2024-01-01 17:30:00+05:30");
    }

    #[test]
    fn test_dates() {
        assert_eq!(text(&Date32Array::from(vec![19_723])), "2024-01-01");
        assert_eq!(text(&Date32Array::from(vec![0])), "1970-01-01");
        assert_eq!(text(&Date32Array::from(vec![-719_162])), "0001-01-01");
        assert_eq!(text(&Date32Array::from(vec![-719_163])), "0001-12-31 (BC)");
        assert_eq!(text(&Date32Array::from(vec![i32::MAX])), "infinity");
        assert_eq!(text(&Date32Array::from(vec![-i32::MAX])), "-infinity");
    }

    #[test]
    fn test_time_of_day() {
        let micros = (3_600 + 2 * 60 + 3) * MICROS_PER_SECOND + 250_000;
        assert_eq!(text(&Time64MicrosecondArray::from(vec![micros])), "01:02:03.25");
        assert_eq!(text(&Time64MicrosecondArray::from(vec![0])), "00:00:00");
    }

    #[test]
    fn test_intervals_match_engine_wording() {
        assert_eq!(interval(0, 1, 0), "1 day");
        assert_eq!(interval(0, 3, 0), "3 days");
        assert_eq!(interval(14, 0, 0), "1 year 2 months");
        assert_eq!(interval(1, 0, 0), "1 month");
        assert_eq!(
            interval(14, 3, (4 * 3_600 + 5 * 60 + 6) * MICROS_PER_SECOND + 500_000),
            "1 year 2 months 3 days 04:05:06.5"
        );
        assert_eq!(interval(0, 0, 90 * 60 * MICROS_PER_SECOND), "01:30:00");
        assert_eq!(interval(0, 0, -MICROS_PER_SECOND), "-00:00:01");
        assert_eq!(interval(0, -1, 0), "-1 days");
        assert_eq!(interval(0, 0, 0), "00:00:00");
    }

    #[test]
    fn test_blobs_escape_non_printable_bytes() {
        let blobs = BinaryArray::from(vec![&[0xaa, 0x01, b'a', b'b', b'c'][..]]);
        assert_eq!(text(&blobs), "\\xAA\\x01abc");
        let quotes = BinaryArray::from(vec![&b"a'b\\"[..]]);
        assert_eq!(text(&quotes), "a\\x27b\\x5C");
    }

    #[test]
    fn test_decimals_keep_scale() {
        let array = Decimal128Array::from(vec![150, -5, 0, 12_345])
            .with_precision_and_scale(10, 2)
            .unwrap();
        assert_eq!(value_text(&array, None, 0), "1.50");
        assert_eq!(value_text(&array, None, 1), "-0.05");
        assert_eq!(value_text(&array, None, 2), "0.00");
        assert_eq!(value_text(&array, None, 3), "123.45");

        let wide = Decimal128Array::from(vec![i128::MAX])
            .with_precision_and_scale(38, 0)
            .unwrap();
        assert_eq!(text(&wide), i128::MAX.to_string());
    }

    #[test]
    fn test_structs_quote_keys() {
        let structs = StructArray::from(vec![
            (
                Arc::new(Field::new("a", DataType::Int32, true)),
                Arc::new(Int32Array::from(vec![Some(1)])) as ArrayRef,
            ),
            (
                Arc::new(Field::new("b", DataType::Utf8, true)),
                Arc::new(StringArray::from(vec![Some("x")])) as ArrayRef,
            ),
            (
                Arc::new(Field::new("c", DataType::Int32, true)),
                Arc::new(Int32Array::from(vec![None])) as ArrayRef,
            ),
        ]);
        assert_eq!(text(&structs), "{'a': 1, 'b': x, 'c': NULL}");
    }

    #[test]
    fn test_maps_use_equals() {
        let mut builder = MapBuilder::new(None, StringBuilder::new(), Int32Builder::new());
        builder.keys().append_value("k");
        builder.values().append_value(1);
        builder.keys().append_value("z");
        builder.values().append_null();
        builder.append(true).unwrap();
        let maps = builder.finish();
        assert_eq!(text(&maps), "{k=1, z=NULL}");
    }

    #[test]
    fn test_lists_render_items() {
        let lists = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2), None]),
            Some(vec![]),
        ]);
        assert_eq!(value_text(&lists, None, 0), "[1, 2, NULL]");
        assert_eq!(value_text(&lists, None, 1), "[]");
    }

    #[test]
    fn test_nested_doubles() {
        let doubles = Float64Array::from(vec![1.0, 2.5, 1e20, 1e-7, f64::NAN]);
        assert_eq!(value_text(&doubles, None, 0), "1.0");
        assert_eq!(value_text(&doubles, None, 1), "2.5");
        assert_eq!(value_text(&doubles, None, 2), "1e+20");
        assert_eq!(value_text(&doubles, None, 3), "1e-07");
        assert_eq!(value_text(&doubles, None, 4), "nan");
    }

    #[test]
    fn test_128_bit_extensions_decode_exactly() {
        let values = FixedSizeBinaryArray::try_from_iter(
            vec![
                i128::MAX.to_le_bytes().to_vec(),
                i128::MIN.to_le_bytes().to_vec(),
                u128::MAX.to_le_bytes().to_vec(),
            ]
            .into_iter(),
        )
        .unwrap();
        assert_eq!(
            value_text(&values, Some(Extension::HugeInt), 0),
            "170141183460469231731687303715884105727"
        );
        assert_eq!(
            value_text(&values, Some(Extension::HugeInt), 1),
            "-170141183460469231731687303715884105728"
        );
        assert_eq!(
            value_text(&values, Some(Extension::UHugeInt), 2),
            "340282366920938463463374607431768211455"
        );
    }

    #[test]
    fn test_uuid_bit_and_time_tz_extensions() {
        let uuid = FixedSizeBinaryArray::try_from_iter(
            vec![vec![
                0x12, 0x3e, 0x45, 0x67, 0xe8, 0x9b, 0x12, 0xd3, 0xa4, 0x56, 0x42, 0x66, 0x14,
                0x17, 0x40, 0x00,
            ]]
            .into_iter(),
        )
        .unwrap();
        assert_eq!(
            value_text(&uuid, Some(Extension::Uuid), 0),
            "123e4567-e89b-12d3-a456-426614174000"
        );

        // Three padding bits, then 10101
        let bits = BinaryArray::from(vec![&[3u8, 0b1111_0101][..]]);
        assert_eq!(value_text(&bits, Some(Extension::Bit), 0), "10101");

        let micros = (3_600 + 2 * 60 + 3) * MICROS_PER_SECOND as u64;
        let offset = (MAX_TIME_TZ_OFFSET - 7_200) as u64;
        let time_tz = duckdb::arrow::array::Int64Array::from(vec![((micros << 24) | offset) as i64]);
        assert_eq!(value_text(&time_tz, Some(Extension::TimeTz), 0), "01:02:03+02");
    }

    #[test]
    fn test_extension_detection_from_field_metadata() {
        let opaque = Field::new("h", DataType::FixedSizeBinary(16), true).with_metadata(HashMap::from([
            (EXTENSION_NAME_KEY.to_string(), "arrow.opaque".to_string()),
            (
                EXTENSION_METADATA_KEY.to_string(),
                r#"{"type_name":"uhugeint","vendor_name":"DuckDB"}"#.to_string(),
            ),
        ]));
        assert_eq!(Extension::of(&opaque), Some(Extension::UHugeInt));

        let named = Field::new("h", DataType::FixedSizeBinary(16), true).with_metadata(HashMap::from([(
            EXTENSION_NAME_KEY.to_string(),
            "duckdb.hugeint".to_string(),
        )]));
        assert_eq!(Extension::of(&named), Some(Extension::HugeInt));

        let uuid = Field::new("u", DataType::FixedSizeBinary(16), true).with_metadata(HashMap::from([(
            EXTENSION_NAME_KEY.to_string(),
            "arrow.uuid".to_string(),
        )]));
        assert_eq!(Extension::of(&uuid), Some(Extension::Uuid));

        assert_eq!(Extension::of(&Field::new("p", DataType::Int32, true)), None);
    }

    #[test]
    fn test_nulls_and_unhandled_layouts() {
        let nulls = duckdb::arrow::array::new_null_array(&DataType::Utf8, 1);
        assert_eq!(text(nulls.as_ref()), NESTED_NULL);

        let wide = Decimal256Array::from(vec![i256::from_i128(150)])
            .with_precision_and_scale(10, 2)
            .unwrap();
        assert_eq!(text(&wide), "1.50");
    }
}
