//! Tokenizer ("cruncher") for a line-numbered GW-style BASIC dialect.
//!
//! Source text is crunched once, at entry time, into a compact byte stream:
//! keywords and operators collapse to single reserved bytes, built-in
//! function names to two-byte tokens, and numeric constants to binary
//! little-endian encodings. The runtime executes only the crunched form and
//! resolves reserved bytes back to names through [`Tokenizer::token_name`].

pub mod crunch;
pub mod error;
pub mod lexer;
pub mod tokens;

pub use crunch::MAX_CRUNCHED_LEN;
pub use error::TokenizeError;
pub use tokens::{
    TOK_DOUBLE, TOK_EOL, TOK_FUNC_PREFIX, TOK_INT16, TOK_RANGE_START, TOK_SINGLE,
};

/// Stateless tokenizer front object. All tables are process-wide statics;
/// the struct exists so consumers can hold "a tokenizer" behind a trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tokenizer;

impl Tokenizer {
    pub fn new() -> Self {
        Tokenizer
    }

    /// Crunch one statement line (no line number) into token bytes.
    pub fn crunch(&self, src: &str) -> Result<Vec<u8>, TokenizeError> {
        crunch::crunch(src)
    }

    /// Split a numbered program line into `(line_number, token_bytes)`.
    pub fn parse_program_line(&self, src: &str) -> Result<(u16, Vec<u8>), TokenizeError> {
        crunch::parse_program_line(src)
    }

    /// Rebuild listable source text from token bytes.
    pub fn expand(&self, bytes: &[u8]) -> String {
        crunch::expand(bytes)
    }

    /// Name of a single-byte keyword/operator token (`0x80..=0xFE`).
    pub fn token_name(&self, byte: u8) -> Option<&'static str> {
        tokens::keyword_name(byte)
    }

    /// Name of a built-in function code (the byte following `0xFF`).
    pub fn function_name(&self, code: u8) -> Option<&'static str> {
        tokens::function_name(code)
    }
}
