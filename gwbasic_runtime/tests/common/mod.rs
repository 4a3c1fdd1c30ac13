//! Shared helpers for integration tests
#![allow(dead_code)]

use gwbasic_runtime::{BasicError, Runtime, Value};
use gwbasic_tokenizer::Tokenizer;

/// Crunch a source expression into token bytes.
pub fn crunch(src: &str) -> Vec<u8> {
    Tokenizer::new()
        .crunch(src)
        .unwrap_or_else(|e| panic!("crunch {:?} failed: {}", src, e))
}

/// Evaluate a crunched source expression against a runtime.
pub fn eval(rt: &mut Runtime, src: &str) -> Value {
    let tokenizer = Tokenizer::new();
    let bytes = crunch(src);
    match rt.evaluate(&bytes, &tokenizer) {
        Ok(value) => value,
        Err(e) => panic!("evaluating {:?} failed: {}", src, e),
    }
}

/// Evaluate a source expression, expecting an error.
pub fn eval_err(rt: &mut Runtime, src: &str) -> BasicError {
    let tokenizer = Tokenizer::new();
    let bytes = crunch(src);
    match rt.evaluate(&bytes, &tokenizer) {
        Ok(value) => panic!("expected error for {:?}, got {:?}", src, value),
        Err(e) => e,
    }
}

/// Evaluate and read back a string result.
pub fn eval_str(rt: &mut Runtime, src: &str) -> String {
    let value = eval(rt, src);
    rt.string_of(&value)
        .unwrap_or_else(|| panic!("{:?} did not produce a string, got {:?}", src, value))
}

/// Double out of a value, for numeric assertions regardless of width.
pub fn as_f64(value: &Value) -> f64 {
    value.as_double().expect("numeric value")
}
