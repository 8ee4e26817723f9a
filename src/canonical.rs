use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use std::io::{self, Write};

use crate::error::{Error, Result};

/// Serializes `value` into its canonical text: the `sort_keys` JSON text of
/// the mempool tooling.
///
/// Object keys are sorted by code point, items are separated by `", "`,
/// keys from values by `": "`, and every character outside printable ASCII
/// is written as a `\uXXXX` escape. Integers keep every digit and floats use
/// the shortest round-trip digits with the tooling's exponent layout
/// (`1e+16`, `1.5e-07`, `100.0`).
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    // Round-trip through `Value` so struct fields get sorted like map keys.
    let value = sorted(serde_json::to_value(value)?);
    let mut out = Vec::with_capacity(128);
    let mut ser = Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| Error::Serialization(serde::ser::Error::custom(e)))
}

/// Reinserts object keys in sorted order. `Map` keeps insertion order when
/// `serde_json/preserve_order` is enabled anywhere in the build.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn write_f64<W: ?Sized + Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_number_str<W: ?Sized + Write>(&mut self, writer: &mut W, value: &str) -> io::Result<()> {
        let digits = value.strip_prefix('-').unwrap_or(value);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // JSON integers have no leading zeros, so only `-0` needs fixing.
            let text = if digits == "0" { "0" } else { value };
            return writer.write_all(text.as_bytes());
        }
        match value.parse::<f64>() {
            Ok(float) => self.write_f64(writer, float),
            Err(_) => writer.write_all(value.as_bytes()),
        }
    }
}

/// Shortest round-trip digits, positional for exponents in `-4..16`,
/// otherwise `d.ddde+XX` with at least two exponent digits.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value == 0.0 {
        return format!("{}0.0", sign);
    }

    let sci = format!("{:e}", value.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if (-4..16).contains(&exp) {
        if exp < 0 {
            let zeros = "0".repeat((-exp - 1) as usize);
            return format!("{}0.{}{}", sign, zeros, digits);
        }
        let int_len = exp as usize + 1;
        if digits.len() <= int_len {
            let zeros = "0".repeat(int_len - digits.len());
            format!("{}{}{}.0", sign, digits, zeros)
        } else {
            format!("{}{}.{}", sign, &digits[..int_len], &digits[int_len..])
        }
    } else {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{}", rest) };
        format!("{}{}{}e{}{:02}", sign, first, fraction, exp_sign, exp.abs())
    }
}
