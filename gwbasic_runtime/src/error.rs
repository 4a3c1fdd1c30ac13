//! Runtime error types.
//!
//! Every error the core can raise carries the dialect's numeric error code,
//! reachable through [`BasicError::code`]; ON ERROR handlers and the ERR
//! function observe those codes. Display text matches the messages the
//! dialect prints for uncaught errors.

use thiserror::Error;

/// Runtime error raised by the evaluator, the storage managers, or the
/// interpreter loop.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BasicError {
    /// Malformed token stream or argument list (code 2)
    #[error("Syntax error: {message}")]
    Syntax { message: String, position: usize },

    /// Domain violation in a built-in (code 5)
    #[error("Illegal function call")]
    IllegalFunctionCall,

    /// Numeric narrowing out of range under strict overflow mode (code 6)
    #[error("Overflow")]
    Overflow,

    /// Stack or recursion depth exhausted, array too large (code 7)
    #[error("Out of memory")]
    OutOfMemory,

    /// Jump target absent from the program store (code 8)
    #[error("Undefined line number")]
    UndefinedLineNumber,

    /// Array subscript or rank violation (code 9)
    #[error("Subscript out of range")]
    SubscriptOutOfRange,

    /// DIM of an existing array, or OPTION BASE after a DIM (code 10)
    #[error("Duplicate definition")]
    RedimensionedArray,

    /// `/`, `\` or MOD with a zero divisor (code 11)
    #[error("Division by zero")]
    DivisionByZero,

    /// String operand where a number is required, or vice versa (code 13)
    #[error("Type mismatch")]
    TypeMismatch,

    /// String heap exhausted even after garbage collection (code 14)
    #[error("Out of string space")]
    OutOfStringSpace,

    /// Concatenation or builder result beyond 255 bytes (code 15)
    #[error("String too long")]
    StringTooLong,

    /// Temporary descriptor pool exhausted mid-expression (code 16)
    #[error("String formula too complex")]
    StringFormulaTooComplex,

    /// RESUME executed with no error frame active (code 20)
    #[error("RESUME without error")]
    ResumeWithoutError,

    /// Program image file missing (code 53)
    #[error("File not found")]
    FileNotFound,

    /// Wrapped host failure (code 51)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BasicError {
    /// The dialect's numeric error code for this error.
    pub fn code(&self) -> u16 {
        match self {
            BasicError::Syntax { .. } => 2,
            BasicError::IllegalFunctionCall => 5,
            BasicError::Overflow => 6,
            BasicError::OutOfMemory => 7,
            BasicError::UndefinedLineNumber => 8,
            BasicError::SubscriptOutOfRange => 9,
            BasicError::RedimensionedArray => 10,
            BasicError::DivisionByZero => 11,
            BasicError::TypeMismatch => 13,
            BasicError::OutOfStringSpace => 14,
            BasicError::StringTooLong => 15,
            BasicError::StringFormulaTooComplex => 16,
            BasicError::ResumeWithoutError => 20,
            BasicError::Internal(_) => 51,
            BasicError::FileNotFound => 53,
        }
    }

    /// Create a syntax error with a message and the byte position in the
    /// token stream where parsing stopped.
    pub fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        BasicError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Wrap a host-side failure as an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        BasicError::Internal(message.into())
    }
}

/// Result alias used throughout the runtime.
pub type BasicResult<T> = Result<T, BasicError>;

/// A [`BasicError`] paired with the program line that was executing when it
/// surfaced at the interpreter loop. Line 0 means immediate mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeFault {
    pub error: BasicError,
    pub line: u16,
}

impl RuntimeFault {
    pub fn new(error: BasicError, line: u16) -> Self {
        Self { error, line }
    }

    pub fn code(&self) -> u16 {
        self.error.code()
    }
}

impl std::fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} in {}", self.error, self.line)
        }
    }
}

impl std::error::Error for RuntimeFault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BasicError::syntax("bad", 0).code(), 2);
        assert_eq!(BasicError::IllegalFunctionCall.code(), 5);
        assert_eq!(BasicError::SubscriptOutOfRange.code(), 9);
        assert_eq!(BasicError::DivisionByZero.code(), 11);
        assert_eq!(BasicError::TypeMismatch.code(), 13);
        assert_eq!(BasicError::OutOfStringSpace.code(), 14);
    }

    #[test]
    fn test_fault_display_with_line() {
        let fault = RuntimeFault::new(BasicError::TypeMismatch, 130);
        assert_eq!(format!("{}", fault), "Type mismatch in 130");
    }

    #[test]
    fn test_fault_display_immediate_mode() {
        let fault = RuntimeFault::new(BasicError::DivisionByZero, 0);
        assert_eq!(format!("{}", fault), "Division by zero");
    }
}
