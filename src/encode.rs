//! Streaming JSON encoder.
//!
//! Writes values, arrays and objects onto a [`ChunkSink`] one chunk at a time.
//! Each write completes before the next chunk is produced, so the encoder never
//! holds more than one pending chunk. Deferred producers write themselves
//! directly to the sink, which lets an object interleave cheap eager fields
//! with an expensive field that streams.
//!
//! Eager values become a single chunk each; integers go through `itoa` and
//! floats through `ryu`.

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::sink::ChunkSink;
use crate::value::{Serializable, Value};

/// Write one value.
///
/// Returns `false` without writing when the value is `Absent`. A deferred
/// producer is invoked and its own report is returned.
pub fn write_value(sink: &mut dyn ChunkSink, value: Serializable<'_>) -> Result<bool> {
    match value {
        Serializable::Value(Value::Absent) => Ok(false),
        Serializable::Value(v) => {
            sink.write_chunk(&to_json_string(&v))?;
            Ok(true)
        }
        Serializable::Deferred(producer) => producer.produce(sink),
    }
}

/// Write `[`, each element, then `]`.
///
/// Elements that produce no output are skipped; separators are only written
/// between elements that did.
pub fn write_array<'a, I>(sink: &mut dyn ChunkSink, values: I) -> Result<bool>
where
    I: IntoIterator,
    I::Item: Into<Serializable<'a>>,
{
    try_write_array(sink, values.into_iter().map(Ok::<_, Error>))
}

/// Like [`write_array`], over a fallible source such as a dataset cursor.
///
/// The first source error aborts the array; whatever was already written
/// stays written.
pub fn try_write_array<'a, I, T, E>(sink: &mut dyn ChunkSink, values: I) -> Result<bool>
where
    I: IntoIterator<Item = std::result::Result<T, E>>,
    T: Into<Serializable<'a>>,
    E: Into<Error>,
{
    sink.write_chunk("[")?;
    let mut previous = false;
    for value in values {
        let value: Serializable<'a> = match value {
            Ok(v) => v.into(),
            Err(e) => return Err(e.into()),
        };
        let mut element = Separated {
            inner: &mut *sink,
            pending: previous.then_some(","),
        };
        previous = write_value(&mut element, value)? || previous;
    }
    sink.write_chunk("]")?;
    Ok(true)
}

/// Sink adapter that emits a separator just before the first chunk written
/// through it. Elements that produce nothing leave no stray separator.
struct Separated<'s> {
    inner: &'s mut dyn ChunkSink,
    pending: Option<&'static str>,
}

impl ChunkSink for Separated<'_> {
    fn write_chunk(&mut self, chunk: &str) -> std::io::Result<()> {
        if let Some(sep) = self.pending.take() {
            self.inner.write_chunk(sep)?;
        }
        self.inner.write_chunk(chunk)
    }
}

/// Write an object from `(key, value)` entries.
///
/// `None` entries are skipped entirely, which is how optional fields such as
/// `done` or `total` are included conditionally. An entry whose value produces
/// no output is written as `null` so the document stays well formed.
pub fn write_object<'a, I, K>(sink: &mut dyn ChunkSink, entries: I) -> Result<bool>
where
    I: IntoIterator<Item = Option<(K, Serializable<'a>)>>,
    K: AsRef<str>,
{
    sink.write_chunk("{")?;
    let mut first = true;
    for (key, value) in entries.into_iter().flatten() {
        if !first {
            sink.write_chunk(",")?;
        }
        first = false;
        let mut quoted = String::with_capacity(key.as_ref().len() + 2);
        push_json_string(&mut quoted, key.as_ref());
        sink.write_chunk(&quoted)?;
        sink.write_chunk(":")?;
        if !write_value(sink, value)? {
            sink.write_chunk("null")?;
        }
    }
    sink.write_chunk("}")?;
    Ok(true)
}

/// Write text that is already a JSON document, unchanged.
///
/// Returns `false` for `None` (the dataset produced no row).
pub fn write_raw_json(sink: &mut dyn ChunkSink, json: Option<&str>) -> Result<bool> {
    match json {
        Some(text) => {
            sink.write_chunk(text)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Serialize a value to compact JSON text.
///
/// `Absent` at the top level or inside an array renders as `null`; inside an
/// object the entry is omitted.
pub fn to_json_string(value: &Value) -> String {
    let mut buf = String::new();
    push_value(&mut buf, value);
    buf
}

fn push_value(buf: &mut String, value: &Value) {
    match value {
        Value::Absent | Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => {
            let mut ib = itoa::Buffer::new();
            buf.push_str(ib.format(*n));
        }
        Value::Double(f) => push_double(buf, *f),
        Value::String(s) => push_json_string(buf, s),
        Value::Array(arr) => {
            buf.push('[');
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                push_value(buf, v);
            }
            buf.push(']');
        }
        Value::Object(obj) => {
            buf.push('{');
            let mut first = true;
            for (k, v) in obj.iter().filter(|(_, v)| !v.is_absent()) {
                if !first {
                    buf.push(',');
                }
                first = false;
                push_json_string(buf, k);
                buf.push(':');
                push_value(buf, v);
            }
            buf.push('}');
        }
    }
}

/// Append a JSON-escaped string (with surrounding quotes).
pub fn push_json_string(buf: &mut String, s: &str) {
    buf.push('"');
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        let escape = match b {
            b'"' => "\\\"",
            b'\\' => "\\\\",
            b'\n' => "\\n",
            b'\r' => "\\r",
            b'\t' => "\\t",
            b'\x08' => "\\b",
            b'\x0c' => "\\f",
            0..=0x1f => "",
            _ => continue,
        };
        // Flush preceding safe bytes. Escaped bytes are ASCII, so `i` is
        // always a char boundary.
        buf.push_str(&s[start..i]);
        if escape.is_empty() {
            let _ = write!(buf, "\\u{:04x}", b);
        } else {
            buf.push_str(escape);
        }
        start = i + 1;
    }
    buf.push_str(&s[start..]);
    buf.push('"');
}

/// Append a double the way `JSON.stringify` renders numbers: non-finite values
/// become `null`, integer-valued doubles below 1e21 print without a fraction,
/// magnitudes from 1e-6 print in plain notation, and the rest use exponents.
fn push_double(buf: &mut String, f: f64) {
    if !f.is_finite() {
        buf.push_str("null");
        return;
    }
    // Normalize negative zero
    let f = if f == 0.0 { 0.0 } else { f };
    let mut rb = ryu::Buffer::new();
    let s = rb.format_finite(f);
    if f.fract() == 0.0 {
        if let Some(e_pos) = s.find('e') {
            let exp: i32 = s[e_pos + 1..].parse().unwrap_or(0);
            if exp > 0 && exp < 21 {
                let mantissa = &s[..e_pos];
                let (int_part, frac_part) = match mantissa.find('.') {
                    Some(d) => (&mantissa[..d], &mantissa[d + 1..]),
                    None => (mantissa, ""),
                };
                buf.push_str(int_part);
                buf.push_str(frac_part);
                for _ in 0..(exp as usize).saturating_sub(frac_part.len()) {
                    buf.push('0');
                }
                return;
            }
        }
        if let Some(stripped) = s.strip_suffix(".0") {
            buf.push_str(stripped);
            return;
        }
    }
    if let Some(e_pos) = s.find('e') {
        let exp_str = &s[e_pos + 1..];
        let exp: i32 = exp_str.parse().unwrap_or(0);
        if (-6..0).contains(&exp) {
            // Magnitudes down to 1e-6 print in plain notation.
            let mantissa = &s[..e_pos];
            let (sign, digits) = match mantissa.strip_prefix('-') {
                Some(m) => ("-", m),
                None => ("", mantissa),
            };
            buf.push_str(sign);
            buf.push_str("0.");
            for _ in 0..(-exp - 1) {
                buf.push('0');
            }
            buf.extend(digits.chars().filter(|c| *c != '.'));
            return;
        }
        buf.push_str(&s[..e_pos]);
        buf.push('e');
        if !exp_str.starts_with('-') {
            buf.push('+');
        }
        buf.push_str(exp_str);
        return;
    }
    buf.push_str(s);
}
