//! Crunching and expanding of source lines.
//!
//! `crunch` converts one source line (without its line number) into the byte
//! representation the interpreter executes; `expand` performs the reverse for
//! LIST output. Numeric constants are encoded once here so the evaluator
//! never re-parses digits at run time.

use logos::Logos;

use crate::error::TokenizeError;
use crate::lexer::RawToken;
use crate::tokens::{
    function_code, keyword_byte, keyword_name, function_name, TOK_DOUBLE, TOK_EOL,
    TOK_FUNC_PREFIX, TOK_INT16, TOK_RANGE_START, TOK_SINGLE,
};

/// Longest crunched statement text the dialect accepts, terminator excluded.
pub const MAX_CRUNCHED_LEN: usize = 255;

/// Crunch one statement line into token bytes (terminated with `0x00`).
pub fn crunch(src: &str) -> Result<Vec<u8>, TokenizeError> {
    if !src.is_ascii() {
        return Err(TokenizeError::NonAsciiSource);
    }

    let mut out: Vec<u8> = Vec::with_capacity(src.len() + 1);
    let mut lexer = RawToken::lexer(src);

    while let Some(tok) = lexer.next() {
        let slice = lexer.slice();
        let start = lexer.span().start;
        let tok = tok.map_err(|()| {
            let ch = src[start..].chars().next().unwrap_or('\0');
            TokenizeError::UnexpectedChar(ch, start)
        })?;

        match tok {
            RawToken::Whitespace => out.push(b' '),

            RawToken::StringLit => {
                if slice.len() < 2 || !slice.ends_with('"') {
                    return Err(TokenizeError::UnterminatedString(start));
                }
                out.extend_from_slice(slice.as_bytes());
            }

            RawToken::Integer => encode_integer(slice, &mut out)?,
            RawToken::Float | RawToken::FloatExp => encode_float(slice, &mut out)?,
            RawToken::HexInteger => {
                let digits = &slice[2..];
                let v = u32::from_str_radix(digits, 16)
                    .map_err(|_| TokenizeError::NumberOutOfRange)?;
                encode_u16_constant(v, &mut out)?;
            }
            RawToken::OctInteger => {
                let digits = slice
                    .trim_start_matches('&')
                    .trim_start_matches(['O', 'o']);
                let v = u32::from_str_radix(digits, 8)
                    .map_err(|_| TokenizeError::NumberOutOfRange)?;
                encode_u16_constant(v, &mut out)?;
            }

            RawToken::Ident => {
                let upper = slice.to_ascii_uppercase();
                if let Some(byte) = keyword_byte(&upper) {
                    out.push(byte);
                    if upper == "REM" {
                        // Comment text is stored verbatim.
                        out.extend_from_slice(lexer.remainder().as_bytes());
                        break;
                    }
                } else if let Some(code) = function_code(&upper) {
                    out.push(TOK_FUNC_PREFIX);
                    out.push(code);
                } else {
                    out.extend_from_slice(upper.as_bytes());
                }
            }

            RawToken::Apostrophe => {
                // Tail comment: keep the apostrophe and the rest verbatim.
                out.push(b'\'');
                out.extend_from_slice(lexer.remainder().as_bytes());
                break;
            }

            // PRINT shorthand
            RawToken::Question => out.push(keyword_byte("PRINT").unwrap_or(b'?')),

            RawToken::LessEq => out.push(operator_byte("<=")),
            RawToken::GreaterEq => out.push(operator_byte(">=")),
            RawToken::NotEq => out.push(operator_byte("<>")),
            RawToken::Less => out.push(operator_byte("<")),
            RawToken::Greater => out.push(operator_byte(">")),
            RawToken::Eq => out.push(operator_byte("=")),
            RawToken::Plus => out.push(operator_byte("+")),
            RawToken::Minus => out.push(operator_byte("-")),
            RawToken::Star => out.push(operator_byte("*")),
            RawToken::Slash => out.push(operator_byte("/")),
            RawToken::Backslash => out.push(operator_byte("\\")),
            RawToken::Caret => out.push(operator_byte("^")),

            RawToken::LParen => out.push(b'('),
            RawToken::RParen => out.push(b')'),
            RawToken::LBracket => out.push(b'['),
            RawToken::RBracket => out.push(b']'),
            RawToken::Comma => out.push(b','),
            RawToken::Semicolon => out.push(b';'),
            RawToken::Colon => out.push(b':'),
            RawToken::Hash => out.push(b'#'),
            RawToken::Dot => out.push(b'.'),
        }
    }

    if out.len() > MAX_CRUNCHED_LEN {
        return Err(TokenizeError::LineTooLong);
    }
    out.push(TOK_EOL);
    Ok(out)
}

/// Split `"120 PRINT X"` into the line number and the crunched statement.
pub fn parse_program_line(src: &str) -> Result<(u16, Vec<u8>), TokenizeError> {
    let trimmed = src.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(TokenizeError::MissingLineNumber);
    }
    let number: u32 = digits
        .parse()
        .map_err(|_| TokenizeError::LineNumberOutOfRange(u32::MAX))?;
    if number == 0 || number > 65534 {
        return Err(TokenizeError::LineNumberOutOfRange(number));
    }
    let rest = trimmed[digits.len()..].strip_prefix(' ').unwrap_or(&trimmed[digits.len()..]);
    Ok((number as u16, crunch(rest)?))
}

fn operator_byte(name: &str) -> u8 {
    keyword_byte(name).expect("operator present in token table")
}

fn encode_integer(slice: &str, out: &mut Vec<u8>) -> Result<(), TokenizeError> {
    let (digits, suffix) = split_suffix(slice);
    match suffix {
        Some('%') => {
            let v: i32 = digits.parse().map_err(|_| TokenizeError::NumberOutOfRange)?;
            let v = i16::try_from(v).map_err(|_| TokenizeError::NumberOutOfRange)?;
            push_int16(v, out);
        }
        Some('!') => {
            let v: f64 = digits.parse().map_err(|_| TokenizeError::NumberOutOfRange)?;
            push_single(v as f32, out);
        }
        Some('#') => {
            let v: f64 = digits.parse().map_err(|_| TokenizeError::NumberOutOfRange)?;
            push_double(v, out);
        }
        _ => {
            let v: f64 = digits.parse().map_err(|_| TokenizeError::NumberOutOfRange)?;
            if v <= i16::MAX as f64 {
                push_int16(v as i16, out);
            } else if (v as f32) as f64 == v {
                push_single(v as f32, out);
            } else {
                push_double(v, out);
            }
        }
    }
    Ok(())
}

fn encode_float(slice: &str, out: &mut Vec<u8>) -> Result<(), TokenizeError> {
    let (body, suffix) = split_suffix(slice);
    let has_d_exponent = body.contains(['D', 'd']);
    let normalized: String = body
        .chars()
        .map(|c| if c == 'D' || c == 'd' { 'E' } else { c })
        .collect();
    let v: f64 = normalized
        .parse()
        .map_err(|_| TokenizeError::NumberOutOfRange)?;
    if !v.is_finite() {
        return Err(TokenizeError::NumberOutOfRange);
    }
    if suffix == Some('#') || has_d_exponent {
        push_double(v, out);
    } else {
        push_single(v as f32, out);
    }
    Ok(())
}

fn encode_u16_constant(v: u32, out: &mut Vec<u8>) -> Result<(), TokenizeError> {
    if v > 0xFFFF {
        return Err(TokenizeError::NumberOutOfRange);
    }
    push_int16(v as u16 as i16, out);
    Ok(())
}

fn split_suffix(slice: &str) -> (&str, Option<char>) {
    match slice.chars().last() {
        Some(c @ ('%' | '!' | '#')) => (&slice[..slice.len() - 1], Some(c)),
        _ => (slice, None),
    }
}

fn push_int16(v: i16, out: &mut Vec<u8>) {
    out.push(TOK_INT16);
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_single(v: f32, out: &mut Vec<u8>) {
    out.push(TOK_SINGLE);
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_double(v: f64, out: &mut Vec<u8>) {
    out.push(TOK_DOUBLE);
    out.extend_from_slice(&v.to_le_bytes());
}

/// Rebuild approximate source text from token bytes, for LIST.
pub fn expand(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            TOK_EOL => break,
            TOK_INT16 if pos + 2 < bytes.len() => {
                let v = i16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]);
                out.push_str(&v.to_string());
                pos += 3;
            }
            TOK_SINGLE if pos + 4 < bytes.len() => {
                let mut le = [0u8; 4];
                le.copy_from_slice(&bytes[pos + 1..pos + 5]);
                out.push_str(&f32::from_le_bytes(le).to_string());
                pos += 5;
            }
            TOK_DOUBLE if pos + 8 < bytes.len() => {
                let mut le = [0u8; 8];
                le.copy_from_slice(&bytes[pos + 1..pos + 9]);
                out.push_str(&f64::from_le_bytes(le).to_string());
                pos += 9;
            }
            TOK_FUNC_PREFIX if pos + 1 < bytes.len() => {
                out.push_str(function_name(bytes[pos + 1]).unwrap_or("<FN?>"));
                pos += 2;
            }
            b if b >= TOK_RANGE_START => {
                // Source whitespace survives crunching, so listing normally
                // needs no reinserted spaces; guard only against keywords
                // fusing with adjacent identifier text.
                let name = keyword_name(b).unwrap_or("<TOK?>");
                let alphabetic = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
                if alphabetic && out.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()) {
                    out.push(' ');
                }
                out.push_str(name);
                if alphabetic && bytes.get(pos + 1).is_some_and(u8::is_ascii_alphanumeric) {
                    out.push(' ');
                }
                pos += 1;
            }
            b => {
                out.push(b as char);
                pos += 1;
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crunch_keyword_and_int() {
        let bytes = crunch("PRINT 42").unwrap();
        assert_eq!(bytes[0], keyword_byte("PRINT").unwrap());
        assert_eq!(bytes[1], b' ');
        assert_eq!(bytes[2], TOK_INT16);
        assert_eq!(i16::from_le_bytes([bytes[3], bytes[4]]), 42);
        assert_eq!(*bytes.last().unwrap(), TOK_EOL);
    }

    #[test]
    fn test_crunch_function_token() {
        let bytes = crunch("CHR$(65)").unwrap();
        assert_eq!(bytes[0], TOK_FUNC_PREFIX);
        assert_eq!(bytes[1], function_code("CHR$").unwrap());
        assert_eq!(bytes[2], b'(');
    }

    #[test]
    fn test_crunch_unterminated_string() {
        assert_eq!(
            crunch(r#"PRINT "open"#),
            Err(TokenizeError::UnterminatedString(6))
        );
    }

    #[test]
    fn test_crunch_rem_keeps_tail_verbatim() {
        let bytes = crunch("REM Mixed Case tail").unwrap();
        assert_eq!(bytes[0], keyword_byte("REM").unwrap());
        let tail: Vec<u8> = bytes[1..bytes.len() - 1].to_vec();
        assert_eq!(tail, b" Mixed Case tail".to_vec());
    }

    #[test]
    fn test_crunch_large_integer_becomes_float() {
        let bytes = crunch("40000").unwrap();
        assert_eq!(bytes[0], TOK_SINGLE);
        let mut le = [0u8; 4];
        le.copy_from_slice(&bytes[1..5]);
        assert_eq!(f32::from_le_bytes(le), 40000.0);
    }

    #[test]
    fn test_crunch_hex_literal() {
        let bytes = crunch("&HFFFF").unwrap();
        assert_eq!(bytes[0], TOK_INT16);
        assert_eq!(i16::from_le_bytes([bytes[1], bytes[2]]), -1);
    }

    #[test]
    fn test_parse_program_line() {
        let (line, bytes) = parse_program_line("10 END").unwrap();
        assert_eq!(line, 10);
        assert_eq!(bytes[0], keyword_byte("END").unwrap());
    }

    #[test]
    fn test_parse_program_line_rejects_zero() {
        assert_eq!(
            parse_program_line("0 END"),
            Err(TokenizeError::LineNumberOutOfRange(0))
        );
    }

    #[test]
    fn test_expand_round_trips_spacing() {
        let bytes = crunch("PRINT A + 2").unwrap();
        assert_eq!(expand(&bytes), "PRINT A + 2");
    }

    #[test]
    fn test_expand_word_operator() {
        let bytes = crunch("1 AND 2").unwrap();
        assert_eq!(expand(&bytes), "1 AND 2");
    }
}
