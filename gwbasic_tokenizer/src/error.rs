//! Tokenizer error types

use thiserror::Error;

use crate::crunch::MAX_CRUNCHED_LEN;

/// Errors produced while crunching a source line into token bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// String literal with no closing quote
    #[error("unterminated string literal at byte {0}")]
    UnterminatedString(usize),

    /// Character the lexer cannot start a token with
    #[error("unexpected character {0:?} at byte {1}")]
    UnexpectedChar(char, usize),

    /// Program line numbers are restricted to 1..=65534
    #[error("line number {0} out of range")]
    LineNumberOutOfRange(u32),

    /// Program line without a leading line number
    #[error("missing line number")]
    MissingLineNumber,

    /// Crunched statement text longer than the dialect's line limit
    #[error("crunched line exceeds {MAX_CRUNCHED_LEN} bytes")]
    LineTooLong,

    /// Numeric constant that does not fit its declared type
    #[error("numeric constant out of range")]
    NumberOutOfRange,

    /// Source must be ASCII; the crunched representation is byte-oriented
    #[error("source line is not ASCII")]
    NonAsciiSource,
}
