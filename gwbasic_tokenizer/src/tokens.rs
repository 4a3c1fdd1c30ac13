//! Token byte assignments for the crunched program representation.
//!
//! A crunched line mixes plain ASCII (identifiers, punctuation, digits that
//! survive as text) with reserved bytes:
//!
//! - `0x00` terminates the line.
//! - `0x11`/`0x1D`/`0x1F` prefix little-endian Int16 / Single / Double
//!   constants.
//! - `0x81..=0xF7` are single-byte keyword and operator tokens.
//! - `0xFF` prefixes a one-byte built-in function code.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// End of line / end of buffer.
pub const TOK_EOL: u8 = 0x00;
/// 16-bit integer constant; two little-endian bytes follow.
pub const TOK_INT16: u8 = 0x11;
/// Single-precision constant; four little-endian bytes follow.
pub const TOK_SINGLE: u8 = 0x1D;
/// Double-precision constant; eight little-endian bytes follow.
pub const TOK_DOUBLE: u8 = 0x1F;
/// Prefix byte for two-byte built-in function tokens.
pub const TOK_FUNC_PREFIX: u8 = 0xFF;

/// First byte of the single-byte token range.
pub const TOK_RANGE_START: u8 = 0x80;

/// Keyword and operator tokens, in byte order.
pub static KEYWORDS: &[(u8, &str)] = &[
    (0x81, "END"),
    (0x82, "FOR"),
    (0x83, "NEXT"),
    (0x84, "DATA"),
    (0x85, "INPUT"),
    (0x86, "DIM"),
    (0x87, "READ"),
    (0x88, "LET"),
    (0x89, "GOTO"),
    (0x8A, "RUN"),
    (0x8B, "IF"),
    (0x8C, "RESTORE"),
    (0x8D, "GOSUB"),
    (0x8E, "RETURN"),
    (0x8F, "REM"),
    (0x90, "STOP"),
    (0x91, "PRINT"),
    (0x92, "CLEAR"),
    (0x93, "LIST"),
    (0x94, "NEW"),
    (0x95, "ON"),
    (0x96, "WAIT"),
    (0x97, "DEF"),
    (0x98, "POKE"),
    (0x99, "CONT"),
    (0x9C, "OUT"),
    (0x9D, "LPRINT"),
    (0x9E, "LLIST"),
    (0xA0, "WIDTH"),
    (0xA1, "ELSE"),
    (0xA2, "TRON"),
    (0xA3, "TROFF"),
    (0xA4, "SWAP"),
    (0xA5, "ERASE"),
    (0xA6, "EDIT"),
    (0xA7, "ERROR"),
    (0xA8, "RESUME"),
    (0xA9, "DELETE"),
    (0xAA, "AUTO"),
    (0xAB, "RENUM"),
    (0xAC, "DEFSTR"),
    (0xAD, "DEFINT"),
    (0xAE, "DEFSNG"),
    (0xAF, "DEFDBL"),
    (0xB0, "LINE"),
    (0xB1, "WHILE"),
    (0xB2, "WEND"),
    (0xB3, "CALL"),
    (0xB7, "WRITE"),
    (0xB8, "OPTION"),
    (0xB9, "RANDOMIZE"),
    (0xBA, "OPEN"),
    (0xBB, "CLOSE"),
    (0xBC, "LOAD"),
    (0xBD, "MERGE"),
    (0xBE, "SAVE"),
    (0xC0, "CLS"),
    (0xC4, "SOUND"),
    (0xC5, "BEEP"),
    (0xC9, "KEY"),
    (0xCA, "LOCATE"),
    (0xCB, "COM"),
    (0xCC, "PEN"),
    (0xCD, "TO"),
    (0xCE, "THEN"),
    (0xCF, "PLAY"),
    (0xD0, "STEP"),
    (0xD2, "FN"),
    (0xD3, "STRIG"),
    (0xD4, "NOT"),
    (0xD5, "ERL"),
    (0xD6, "ERR"),
    (0xD7, "TIMER"),
    (0xD8, "USING"),
    (0xD9, "OFF"),
    (0xDB, "BASE"),
    (0xE6, ">"),
    (0xE7, "="),
    (0xE8, "<"),
    (0xE9, "+"),
    (0xEA, "-"),
    (0xEB, "*"),
    (0xEC, "/"),
    (0xED, "^"),
    (0xEE, "AND"),
    (0xEF, "OR"),
    (0xF0, "XOR"),
    (0xF1, "EQV"),
    (0xF2, "IMP"),
    (0xF3, "MOD"),
    (0xF4, "\\"),
    (0xF5, "<="),
    (0xF6, ">="),
    (0xF7, "<>"),
];

/// Built-in function codes following the `0xFF` prefix byte.
pub static FUNCTIONS: &[(u8, &str)] = &[
    (0x00, "LEFT$"),
    (0x01, "RIGHT$"),
    (0x02, "MID$"),
    (0x03, "SGN"),
    (0x04, "INT"),
    (0x05, "ABS"),
    (0x06, "SQR"),
    (0x07, "RND"),
    (0x08, "SIN"),
    (0x09, "LOG"),
    (0x0A, "EXP"),
    (0x0B, "COS"),
    (0x0C, "TAN"),
    (0x0D, "ATN"),
    (0x0E, "FRE"),
    (0x0F, "INP"),
    (0x10, "POS"),
    (0x11, "LEN"),
    (0x12, "STR$"),
    (0x13, "VAL"),
    (0x14, "ASC"),
    (0x15, "CHR$"),
    (0x16, "PEEK"),
    (0x17, "SPACE$"),
    (0x18, "STRING$"),
    (0x19, "OCT$"),
    (0x1A, "HEX$"),
    (0x1B, "LPOS"),
    (0x1C, "CINT"),
    (0x1D, "CSNG"),
    (0x1E, "CDBL"),
    (0x1F, "FIX"),
    (0x20, "PEN"),
    (0x21, "STICK"),
    (0x22, "STRIG"),
    (0x23, "EOF"),
    (0x24, "LOC"),
    (0x25, "LOF"),
    (0x26, "INKEY$"),
];

static KEYWORD_BY_NAME: Lazy<HashMap<&'static str, u8>> =
    Lazy::new(|| KEYWORDS.iter().map(|&(b, n)| (n, b)).collect());

static KEYWORD_NAME_BY_BYTE: Lazy<HashMap<u8, &'static str>> =
    Lazy::new(|| KEYWORDS.iter().map(|&(b, n)| (b, n)).collect());

static FUNCTION_BY_NAME: Lazy<HashMap<&'static str, u8>> =
    Lazy::new(|| FUNCTIONS.iter().map(|&(c, n)| (n, c)).collect());

static FUNCTION_NAME_BY_CODE: Lazy<HashMap<u8, &'static str>> =
    Lazy::new(|| FUNCTIONS.iter().map(|&(c, n)| (c, n)).collect());

/// Keyword or operator byte for an already-uppercased name.
pub fn keyword_byte(name: &str) -> Option<u8> {
    KEYWORD_BY_NAME.get(name).copied()
}

/// Name for a single-byte keyword/operator token.
pub fn keyword_name(byte: u8) -> Option<&'static str> {
    KEYWORD_NAME_BY_BYTE.get(&byte).copied()
}

/// Function code (the byte following `0xFF`) for an uppercased name.
pub fn function_code(name: &str) -> Option<u8> {
    FUNCTION_BY_NAME.get(name).copied()
}

/// Name for a function code.
pub fn function_name(code: u8) -> Option<&'static str> {
    FUNCTION_NAME_BY_CODE.get(&code).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for &(byte, name) in KEYWORDS {
            assert_eq!(keyword_byte(name), Some(byte), "byte for {}", name);
            assert_eq!(keyword_name(byte), Some(name), "name for {:#04x}", byte);
        }
    }

    #[test]
    fn test_function_round_trip() {
        for &(code, name) in FUNCTIONS {
            assert_eq!(function_code(name), Some(code));
            assert_eq!(function_name(code), Some(name));
        }
    }

    #[test]
    fn test_no_duplicate_keyword_bytes() {
        let mut seen = std::collections::HashSet::new();
        for &(byte, name) in KEYWORDS {
            assert!(seen.insert(byte), "{} reuses byte {:#04x}", name, byte);
            assert!(byte >= TOK_RANGE_START && byte < TOK_FUNC_PREFIX);
        }
    }

    #[test]
    fn test_no_duplicate_function_codes() {
        let mut seen = std::collections::HashSet::new();
        for &(code, name) in FUNCTIONS {
            assert!(seen.insert(code), "{} reuses code {:#04x}", name, code);
        }
    }
}
