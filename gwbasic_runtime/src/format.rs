//! Numeric text conversion: STR$, VAL, HEX$ and OCT$ semantics.
//!
//! Host-native float formatting stands in for the historical formatter; the
//! dialect-visible rules (leading space on non-negatives, VAL's tolerance
//! for trailing garbage, 16-bit two's-complement HEX$/OCT$) are preserved.

use crate::error::{BasicError, BasicResult};
use crate::value::Value;

/// STR$ text: numbers render with a leading space unless negative.
pub fn str_value(value: &Value) -> BasicResult<String> {
    let body = match value {
        Value::Int16(v) => v.to_string(),
        Value::Single(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Str(_) => return Err(BasicError::TypeMismatch),
    };
    if body.starts_with('-') {
        Ok(body)
    } else {
        Ok(format!(" {}", body))
    }
}

/// VAL: parse the leading numeric prefix; anything unparseable is 0.
/// Integers without a decimal point or exponent that fit Int16 stay Int16.
pub fn val_bytes(bytes: &[u8]) -> Value {
    let mut pos = 0usize;
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    let mut has_digits = false;
    let mut has_dot = false;
    let mut has_exp = false;
    let mut text = String::new();

    if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
        text.push(bytes[pos] as char);
        pos += 1;
    }
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        text.push(bytes[pos] as char);
        has_digits = true;
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        has_dot = true;
        text.push('.');
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            text.push(bytes[pos] as char);
            has_digits = true;
            pos += 1;
        }
    }
    if has_digits && pos < bytes.len() && matches!(bytes[pos], b'E' | b'e' | b'D' | b'd') {
        // Only commit to the exponent if digits actually follow it.
        let mut look = pos + 1;
        let mut exp_text = String::from("E");
        if look < bytes.len() && (bytes[look] == b'+' || bytes[look] == b'-') {
            exp_text.push(bytes[look] as char);
            look += 1;
        }
        let exp_digits_start = look;
        while look < bytes.len() && bytes[look].is_ascii_digit() {
            exp_text.push(bytes[look] as char);
            look += 1;
        }
        if look > exp_digits_start {
            has_exp = true;
            text.push_str(&exp_text);
        }
    }
    if !has_digits {
        return Value::Int16(0);
    }
    let parsed: f64 = match text.parse() {
        Ok(v) => v,
        Err(_) => return Value::Int16(0),
    };
    if !has_dot && !has_exp && parsed >= i16::MIN as f64 && parsed <= i16::MAX as f64 {
        Value::Int16(parsed as i16)
    } else {
        Value::Double(parsed)
    }
}

/// HEX$: 16-bit two's-complement rendering, uppercase.
pub fn hex_str(value: &Value) -> BasicResult<String> {
    Ok(format!("{:X}", as_u16_word(value)?))
}

/// OCT$: 16-bit two's-complement rendering.
pub fn oct_str(value: &Value) -> BasicResult<String> {
    Ok(format!("{:o}", as_u16_word(value)?))
}

fn as_u16_word(value: &Value) -> BasicResult<u16> {
    let d = value.as_double()?.round();
    if !(-32768.0..=65535.0).contains(&d) {
        return Err(BasicError::IllegalFunctionCall);
    }
    if d < 0.0 {
        Ok((d as i16) as u16)
    } else {
        Ok(d as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_value_leading_space() {
        assert_eq!(str_value(&Value::Int16(42)).unwrap(), " 42");
        assert_eq!(str_value(&Value::Int16(-7)).unwrap(), "-7");
        assert_eq!(str_value(&Value::Double(2.5)).unwrap(), " 2.5");
        assert_eq!(str_value(&Value::Double(3.0)).unwrap(), " 3");
    }

    #[test]
    fn test_val_integer_and_double() {
        assert!(matches!(val_bytes(b"123"), Value::Int16(123)));
        assert!(matches!(val_bytes(b"  -45"), Value::Int16(-45)));
        assert!(matches!(val_bytes(b"2.5"), Value::Double(v) if v == 2.5));
        assert!(matches!(val_bytes(b"1E3"), Value::Double(v) if v == 1000.0));
        assert!(matches!(val_bytes(b"40000"), Value::Double(v) if v == 40000.0));
    }

    #[test]
    fn test_val_trailing_garbage_and_empty() {
        assert!(matches!(val_bytes(b"12AB"), Value::Int16(12)));
        assert!(matches!(val_bytes(b"XYZ"), Value::Int16(0)));
        assert!(matches!(val_bytes(b""), Value::Int16(0)));
        // An 'E' with no exponent digits is trailing garbage, not an exponent.
        assert!(matches!(val_bytes(b"12E"), Value::Int16(12)));
    }

    #[test]
    fn test_hex_oct_two_complement() {
        assert_eq!(hex_str(&Value::Int16(255)).unwrap(), "FF");
        assert_eq!(hex_str(&Value::Int16(-1)).unwrap(), "FFFF");
        assert_eq!(oct_str(&Value::Int16(8)).unwrap(), "10");
        assert_eq!(
            hex_str(&Value::Double(70000.0)).unwrap_err(),
            BasicError::IllegalFunctionCall
        );
    }
}
