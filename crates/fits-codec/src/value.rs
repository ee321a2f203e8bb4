//! Header card value parsing and fixed-format serialization.

use std::str;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
}

impl Value {
    /// Numeric view of the value; integers are promoted to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of the value. Floats with no fractional part are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Width of the fixed-format value field, starting at byte 10 of the card.
pub const FIXED_FIELD_WIDTH: usize = 20;

/// Parse the value field of a card: the 70 bytes following `= `.
///
/// Numeric and logical values occupy the fixed 20-byte field at the start of
/// `field`; a value written in free format past that field is still accepted
/// as long as it ends before the ` / ` comment separator. String values start
/// with a single quote, with `''` standing for a literal quote.
///
/// Returns `(value, comment)`; the value is `None` when the field is blank or
/// cannot be parsed.
pub fn parse_value_field(field: &[u8]) -> (Option<Value>, Option<String>) {
    let start = match field.iter().position(|&b| b != b' ') {
        Some(i) => i,
        None => return (None, None),
    };

    if field[start] == b'\'' {
        let (text, rest) = parse_quoted(&field[start..]);
        return (Some(Value::String(text)), find_comment(rest));
    }

    let (token, comment) = match field.iter().position(|&b| b == b'/') {
        Some(slash) => (&field[..slash], comment_text(&field[slash + 1..])),
        None => (field, None),
    };
    let text = match str::from_utf8(token) {
        Ok(t) => t.trim(),
        Err(_) => return (None, comment),
    };
    (parse_scalar(text), comment)
}

/// Split a quoted string at its closing quote, unescaping doubled quotes.
///
/// An unterminated string takes everything up to the end of the field.
fn parse_quoted(field: &[u8]) -> (String, &[u8]) {
    let mut value = String::new();
    let mut i = 1;
    while i < field.len() {
        if field[i] == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                value.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        value.push(field[i] as char);
        i += 1;
    }
    // Trailing spaces inside the quotes are not significant.
    let trimmed = value.trim_end().to_string();
    (trimmed, &field[i.min(field.len())..])
}

fn find_comment(rest: &[u8]) -> Option<String> {
    let slash = rest.iter().position(|&b| b == b'/')?;
    comment_text(&rest[slash + 1..])
}

fn comment_text(bytes: &[u8]) -> Option<String> {
    let text = str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn parse_scalar(text: &str) -> Option<Value> {
    match text {
        "" => return None,
        "T" => return Some(Value::Logical(true)),
        "F" => return Some(Value::Logical(false)),
        _ => {}
    }
    if !text.contains(['.', 'E', 'e', 'D', 'd']) {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::Integer(n));
        }
    }
    parse_float_str(text).map(Value::Float)
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace('D', "E").replace('d', "e");
    normalized.parse::<f64>().ok()
}

/// Serialize a [`Value`] into the 70-byte field that follows `= ` in a card.
///
/// Numeric and logical values are right-justified in the fixed 20-byte field
/// (ending at card column 30). Strings start with a quote at byte 0 and are
/// padded to at least 8 characters.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    match value {
        Value::Logical(b) => {
            buf[FIXED_FIELD_WIDTH - 1] = if *b { b'T' } else { b'F' };
        }
        Value::Integer(n) => {
            right_justify(n.to_string().as_bytes(), &mut buf[..FIXED_FIELD_WIDTH]);
        }
        Value::Float(f) => {
            right_justify(
                format_float(*f).as_bytes(),
                &mut buf[..FIXED_FIELD_WIDTH],
            );
        }
        Value::String(s) => write_string(s, &mut buf),
    }
    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

/// Format a float so that it fits the fixed field.
///
/// Integral values below 2^64 in magnitude are written as plain integers so
/// that bias constants such as 9223372036854775808 survive exactly.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    if f.fract() == 0.0 && f.abs() < 1.8e19 {
        return format!("{}", f as i128);
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= FIXED_FIELD_WIDTH || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.bytes() {
        if pos >= 69 {
            break;
        }
        if ch == b'\'' {
            if pos + 1 >= 69 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            buf[pos] = ch;
            pos += 1;
        }
    }

    // Pad to a minimum of 8 characters between the quotes.
    while pos < 9 {
        buf[pos] = b' ';
        pos += 1;
    }
    if pos < 70 {
        buf[pos] = b'\'';
    }
}
