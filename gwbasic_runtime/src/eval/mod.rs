//! Expression evaluation over crunched token bytes.
//!
//! A Pratt parser walks the byte stream directly: binary constants are
//! decoded in place, single-byte tokens in `0x80..=0xFE` are resolved to
//! names through a [`TokenResolver`], and plain ASCII (identifiers, digits,
//! punctuation) is consumed as-is, so the same evaluator serves crunched
//! program text and hand-built test streams.
//!
//! String intermediates allocate in the shared heap and are parked in the
//! temp pool, so a nested sub-expression that triggers collection cannot
//! invalidate an outer operand.

pub mod builtins;

use std::cmp::Ordering;

use crate::error::{BasicError, BasicResult};
use crate::strings::StringManager;
use crate::value::{narrow_to_int16, OverflowMode, Value};

/// Resolves single-byte tokens (`0x80..=0xFE`) to their names.
pub trait TokenResolver {
    fn token_name(&self, byte: u8) -> Option<&'static str>;
}

/// Resolver for streams that carry no tokenized keywords or operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiOnly;

impl TokenResolver for AsciiOnly {
    fn token_name(&self, _byte: u8) -> Option<&'static str> {
        None
    }
}

impl TokenResolver for gwbasic_tokenizer::Tokenizer {
    fn token_name(&self, byte: u8) -> Option<&'static str> {
        gwbasic_tokenizer::Tokenizer::token_name(self, byte)
    }
}

/// Evaluator tunables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalConfig {
    pub overflow: OverflowMode,
}

/// Result of one evaluation: the value and where parsing stopped.
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub value: Value,
    pub next_pos: usize,
}

/// Deterministic RND sequence; the multiplicative congruence the dialect
/// family used, truncated to 24 bits of state.
#[derive(Debug, Clone, Copy)]
pub struct RndState {
    state: u32,
}

impl Default for RndState {
    fn default() -> Self {
        RndState::new(327_680)
    }
}

impl RndState {
    pub fn new(seed: u32) -> Self {
        RndState { state: seed }
    }

    pub fn reseed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// Next value in `[0, 1)`.
    pub fn next(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(214_013).wrapping_add(2_531_011);
        ((self.state >> 8) & 0x00FF_FFFF) as f32 / 16_777_216.0
    }
}

/// Everything the evaluator needs from its surroundings: variable reads,
/// user-function and array resolution, string storage, and randomness.
pub trait EvalEnv {
    /// Value of a scalar variable, `None` when the environment does not know
    /// the name.
    fn get_var(&mut self, name: &str) -> Option<Value>;

    /// Invoke a user-defined function; `Ok(None)` when `name` is not one.
    fn call_function(&mut self, _name: &str, _args: &[Value]) -> BasicResult<Option<Value>> {
        Ok(None)
    }

    fn array_exists(&mut self, _name: &str) -> bool {
        false
    }

    fn array_element(&mut self, name: &str, _subs: &[i32]) -> BasicResult<Value> {
        Err(BasicError::syntax(format!("Undefined array: {}", name), 0))
    }

    fn strings(&self) -> &StringManager;

    /// Next RND value. Environments without a generator return 0.
    fn rnd(&mut self) -> f32 {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Imp,
    Eqv,
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy)]
struct OpInfo {
    op: Op,
    lbp: i32,
    rbp: i32,
    right_assoc: bool,
    advance: usize,
}

fn op_info(op: Op, advance: usize) -> OpInfo {
    let (lbp, rbp, right_assoc) = match op {
        Op::Imp | Op::Eqv => (10, 11, false),
        Op::Or | Op::Xor => (20, 21, false),
        Op::And => (30, 31, false),
        Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => (40, 41, false),
        Op::Add | Op::Sub => (50, 51, false),
        Op::Mul | Op::Div | Op::IntDiv | Op::Mod => (60, 61, false),
        Op::Pow => (80, 79, true),
    };
    OpInfo {
        op,
        lbp,
        rbp,
        right_assoc,
        advance,
    }
}

fn op_from_name(name: &str) -> Option<Op> {
    Some(match name {
        "=" => Op::Eq,
        "<>" => Op::Ne,
        "<" => Op::Lt,
        ">" => Op::Gt,
        "<=" => Op::Le,
        ">=" => Op::Ge,
        "+" => Op::Add,
        "-" => Op::Sub,
        "*" => Op::Mul,
        "/" => Op::Div,
        "\\" => Op::IntDiv,
        "^" => Op::Pow,
        "AND" => Op::And,
        "OR" => Op::Or,
        "XOR" => Op::Xor,
        "EQV" => Op::Eqv,
        "IMP" => Op::Imp,
        "MOD" => Op::Mod,
        _ => return None,
    })
}

// Unary operators bind between * (60) and ^ (80), so -5^2 parses as -(5^2)
// while -7 MOD 3 parses as (-7) MOD 3.
const UNARY_MINUS_BP: i32 = 70;
const UNARY_NOT_BP: i32 = 70;

pub struct Evaluator<'t> {
    tokens: &'t dyn TokenResolver,
    config: EvalConfig,
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .finish()
    }
}

impl<'t> Evaluator<'t> {
    pub fn new(tokens: &'t dyn TokenResolver, config: EvalConfig) -> Self {
        Evaluator { tokens, config }
    }

    pub fn config(&self) -> EvalConfig {
        self.config
    }

    /// Evaluate the expression starting at `start`; returns the value and
    /// the position of the first byte the expression did not consume.
    pub fn evaluate(
        &self,
        bytes: &[u8],
        start: usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Evaluated> {
        let mut pos = start;
        skip_spaces(bytes, &mut pos);
        let value = self.parse_expression(bytes, &mut pos, env, 0)?;
        skip_spaces(bytes, &mut pos);
        Ok(Evaluated {
            value,
            next_pos: pos,
        })
    }

    fn parse_expression(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
        min_bp: i32,
    ) -> BasicResult<Value> {
        let mut lhs = self.parse_primary(b, pos, env)?;
        skip_spaces(b, pos);

        while !at_end(b, *pos) {
            let Some(op) = self.peek_operator(b, *pos) else {
                break;
            };
            if op.lbp < min_bp {
                break;
            }
            *pos += op.advance;
            skip_spaces(b, pos);

            let next_min = if op.right_assoc { op.rbp } else { op.lbp + 1 };
            let rhs = self.parse_expression(b, pos, env, next_min)?;
            lhs = self.apply_binary(op.op, lhs, rhs, env, *pos)?;
            skip_spaces(b, pos);
        }
        Ok(lhs)
    }

    fn parse_primary(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Value> {
        if at_end(b, *pos) {
            return Err(BasicError::syntax("expression expected", *pos));
        }
        let t = b[*pos];

        if let Some(value) = try_decode_number(b, pos) {
            return Ok(value);
        }
        if let Some(value) = self.try_decode_string(b, pos, env)? {
            return Ok(value);
        }

        // ASCII unary sign
        if t == b'+' || t == b'-' {
            *pos += 1;
            skip_spaces(b, pos);
            let rhs = self.parse_expression(b, pos, env, UNARY_MINUS_BP)?;
            return if t == b'+' {
                Ok(rhs)
            } else {
                self.negate(rhs)
            };
        }

        // Tokenized keywords and operators in prefix position
        if t >= 0x80 {
            if t == gwbasic_tokenizer::TOK_FUNC_PREFIX {
                return self.parse_function_token(b, pos, env);
            }
            let name = self
                .tokens
                .token_name(t)
                .ok_or_else(|| BasicError::syntax(format!("unexpected token {:#04x}", t), *pos))?;
            match name {
                "+" => {
                    *pos += 1;
                    skip_spaces(b, pos);
                    return self.parse_expression(b, pos, env, UNARY_MINUS_BP);
                }
                "-" => {
                    *pos += 1;
                    skip_spaces(b, pos);
                    let rhs = self.parse_expression(b, pos, env, UNARY_MINUS_BP)?;
                    return self.negate(rhs);
                }
                "NOT" => {
                    *pos += 1;
                    skip_spaces(b, pos);
                    let rhs = self.parse_expression(b, pos, env, UNARY_NOT_BP)?;
                    return Ok(Value::Int16(!rhs.to_bool_int16()));
                }
                "(" => {
                    *pos += 1;
                    let inner = self.parse_expression(b, pos, env, 0)?;
                    self.expect_close_paren(b, pos)?;
                    return Ok(inner);
                }
                "FN" => {
                    *pos += 1;
                    skip_spaces(b, pos);
                    return self.parse_fn_call(b, pos, env);
                }
                "ERR" | "ERL" => {
                    *pos += 1;
                    return env.get_var(name).ok_or_else(|| {
                        BasicError::syntax(format!("Undefined variable: {}", name), *pos)
                    });
                }
                other => {
                    return Err(BasicError::syntax(
                        format!("unexpected token {}", other),
                        *pos,
                    ));
                }
            }
        }

        // ASCII NOT
        if is_word_at(b, *pos, "NOT") {
            *pos += 3;
            skip_spaces(b, pos);
            let rhs = self.parse_expression(b, pos, env, UNARY_NOT_BP)?;
            return Ok(Value::Int16(!rhs.to_bool_int16()));
        }

        // ASCII FN
        if is_word_at(b, *pos, "FN") {
            *pos += 2;
            skip_spaces(b, pos);
            return self.parse_fn_call(b, pos, env);
        }

        // ASCII numeric literal
        if t.is_ascii_digit() {
            return Ok(parse_ascii_number(b, pos));
        }

        // Grouping
        if t == b'(' {
            *pos += 1;
            let inner = self.parse_expression(b, pos, env, 0)?;
            self.expect_close_paren(b, pos)?;
            return Ok(inner);
        }

        // Identifier: variable, function call, or array access
        if t.is_ascii_alphabetic() {
            let id = read_identifier(b, pos);
            let upper = id.to_ascii_uppercase();
            let mut look = *pos;
            skip_spaces(b, &mut look);
            if !at_end(b, look) && self.is_open_paren(b[look]) {
                *pos = look;
                return self.dispatch_call(&upper, b, pos, env);
            }
            return env
                .get_var(&upper)
                .ok_or_else(|| BasicError::syntax(format!("Undefined variable: {}", upper), *pos));
        }

        Err(BasicError::syntax(
            format!("unexpected byte {:#04x}", t),
            *pos,
        ))
    }

    fn negate(&self, value: Value) -> BasicResult<Value> {
        Ok(Value::Double(-value.as_double()?))
    }

    // ---- calls ----

    /// `IDENT(` resolution order: built-in table, user function, array.
    fn dispatch_call(
        &self,
        name: &str,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Value> {
        let args = self.parse_argument_list(b, pos, env)?;
        if builtins::is_known(name) {
            return builtins::call(name, &args, env, self.config);
        }
        if let Some(value) = env.call_function(name, &args)? {
            return Ok(value);
        }
        if env.array_exists(name) {
            let subs = self.subscripts(&args)?;
            return env.array_element(name, &subs);
        }
        Err(BasicError::syntax(
            format!("Undefined function or array: {}", name),
            *pos,
        ))
    }

    /// `FN name(...)`: user functions only.
    fn parse_fn_call(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Value> {
        if at_end(b, *pos) || !b[*pos].is_ascii_alphabetic() {
            return Err(BasicError::syntax("function name expected after FN", *pos));
        }
        let name = read_identifier(b, pos).to_ascii_uppercase();
        skip_spaces(b, pos);
        let args = self.parse_argument_list(b, pos, env)?;
        match env.call_function(&name, &args)? {
            Some(value) => Ok(value),
            None => Err(BasicError::syntax(
                format!("Undefined user function: {}", name),
                *pos,
            )),
        }
    }

    fn parse_function_token(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Value> {
        let code = *b
            .get(*pos + 1)
            .ok_or_else(|| BasicError::syntax("truncated function token", *pos))?;
        let name = gwbasic_tokenizer::tokens::function_name(code).ok_or_else(|| {
            BasicError::syntax(format!("unknown function code {:#04x}", code), *pos)
        })?;
        *pos += 2;
        skip_spaces(b, pos);
        let args = self.parse_argument_list(b, pos, env)?;
        if builtins::is_known(name) {
            return builtins::call(name, &args, env, self.config);
        }
        // Hardware and I/O functions resolve through the host environment.
        match env.call_function(name, &args)? {
            Some(value) => Ok(value),
            None => Err(BasicError::syntax(
                format!("Unsupported function: {}", name),
                *pos,
            )),
        }
    }

    fn subscripts(&self, args: &[Value]) -> BasicResult<Vec<i32>> {
        if args.is_empty() {
            return Err(BasicError::syntax("array subscripts expected", 0));
        }
        args.iter()
            .map(|v| v.as_int16(self.config.overflow).map(|i| i as i32))
            .collect()
    }

    /// Parse `(a, b, ...)` or `[a, b, ...]`; an absent opener means an empty
    /// argument list.
    fn parse_argument_list(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Vec<Value>> {
        let mut args = Vec::new();
        skip_spaces(b, pos);
        if at_end(b, *pos) || !self.is_open_paren(b[*pos]) {
            return Ok(args);
        }
        let close = if b[*pos] == b'[' || self.paren_name(b[*pos]) == Some("[") {
            b']'
        } else {
            b')'
        };
        *pos += 1;
        skip_spaces(b, pos);

        if !at_end(b, *pos) && self.is_close_paren(close, b[*pos]) {
            *pos += 1;
            return Ok(args);
        }

        loop {
            skip_spaces(b, pos);
            if at_end(b, *pos) {
                return Err(BasicError::syntax(
                    format!("missing closing {}", close as char),
                    *pos,
                ));
            }
            if self.is_close_paren(close, b[*pos]) {
                *pos += 1;
                break;
            }

            args.push(self.parse_expression(b, pos, env, 0)?);

            skip_spaces(b, pos);
            if at_end(b, *pos) {
                return Err(BasicError::syntax(
                    format!("missing closing {}", close as char),
                    *pos,
                ));
            }
            if self.is_close_paren(close, b[*pos]) {
                *pos += 1;
                break;
            }
            if b[*pos] == b',' || self.paren_name(b[*pos]) == Some(",") {
                *pos += 1;
                skip_spaces(b, pos);
            } else {
                return Err(BasicError::syntax(
                    format!("expected ',' or '{}'", close as char),
                    *pos,
                ));
            }
        }
        Ok(args)
    }

    fn is_open_paren(&self, byte: u8) -> bool {
        byte == b'(' || byte == b'[' || matches!(self.paren_name(byte), Some("(") | Some("["))
    }

    fn is_close_paren(&self, expected: u8, byte: u8) -> bool {
        if byte == expected {
            return true;
        }
        match self.paren_name(byte) {
            Some(")") => expected == b')',
            Some("]") => expected == b']',
            _ => false,
        }
    }

    fn paren_name(&self, byte: u8) -> Option<&'static str> {
        if byte >= 0x80 {
            self.tokens.token_name(byte)
        } else {
            None
        }
    }

    fn expect_close_paren(&self, b: &[u8], pos: &mut usize) -> BasicResult<()> {
        if at_end(b, *pos) || !self.is_close_paren(b')', b[*pos]) {
            return Err(BasicError::syntax("missing )", *pos));
        }
        *pos += 1;
        Ok(())
    }

    // ---- operators ----

    fn peek_operator(&self, b: &[u8], pos: usize) -> Option<OpInfo> {
        if at_end(b, pos) {
            return None;
        }
        let c = b[pos];

        if c >= 0x80 {
            let name = self.tokens.token_name(c)?;
            return op_from_name(name).map(|op| op_info(op, 1));
        }

        if pos + 1 < b.len() {
            let two: Option<Op> = match (b[pos], b[pos + 1]) {
                (b'<', b'=') => Some(Op::Le),
                (b'>', b'=') => Some(Op::Ge),
                (b'<', b'>') => Some(Op::Ne),
                _ => None,
            };
            if let Some(op) = two {
                return Some(op_info(op, 2));
            }
        }

        let single: Option<Op> = match c {
            b'^' => Some(Op::Pow),
            b'*' => Some(Op::Mul),
            b'/' => Some(Op::Div),
            b'\\' => Some(Op::IntDiv),
            b'+' => Some(Op::Add),
            b'-' => Some(Op::Sub),
            b'=' => Some(Op::Eq),
            b'<' => Some(Op::Lt),
            b'>' => Some(Op::Gt),
            _ => None,
        };
        if let Some(op) = single {
            return Some(op_info(op, 1));
        }

        // Word operators
        let mut end = pos;
        while end < b.len() && b[end].is_ascii_alphabetic() {
            end += 1;
        }
        if end > pos {
            let word: String = b[pos..end]
                .iter()
                .map(|&c| (c as char).to_ascii_uppercase())
                .collect();
            if let Some(op) = op_from_name(&word) {
                if matches!(op, Op::And | Op::Or | Op::Xor | Op::Eqv | Op::Imp | Op::Mod) {
                    return Some(op_info(op, end - pos));
                }
            }
        }
        None
    }

    fn apply_binary(
        &self,
        op: Op,
        lhs: Value,
        rhs: Value,
        env: &mut dyn EvalEnv,
        pos: usize,
    ) -> BasicResult<Value> {
        match op {
            Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                self.compare(op, &lhs, &rhs, env)
            }

            Op::Add if matches!((&lhs, &rhs), (Value::Str(_), Value::Str(_))) => {
                let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) else {
                    unreachable!()
                };
                let strings = env.strings();
                let result = strings.concat(a, b)?;
                strings.hold_temp(&result)?;
                Ok(Value::Str(result))
            }

            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::IntDiv | Op::Mod | Op::Pow => {
                if !lhs.is_numeric() || !rhs.is_numeric() {
                    return Err(BasicError::TypeMismatch);
                }
                let a = lhs.as_double()?;
                let c = rhs.as_double()?;
                let both_int =
                    matches!(lhs, Value::Int16(_)) && matches!(rhs, Value::Int16(_));
                match op {
                    Op::Add => Ok(make_numeric_result(a + c, both_int)),
                    Op::Sub => Ok(make_numeric_result(a - c, both_int)),
                    Op::Mul => Ok(make_numeric_result(a * c, both_int)),
                    Op::Div => {
                        if c == 0.0 {
                            return Err(BasicError::DivisionByZero);
                        }
                        Ok(Value::Double(a / c))
                    }
                    Op::Pow => Ok(Value::Double(a.powf(c))),
                    Op::IntDiv => {
                        if c == 0.0 {
                            return Err(BasicError::DivisionByZero);
                        }
                        let q = (a / c).floor();
                        Ok(Value::Int16(narrow_to_int16(q, self.config.overflow)?))
                    }
                    Op::Mod => {
                        let divisor = c as i64;
                        if divisor == 0 {
                            return Err(BasicError::DivisionByZero);
                        }
                        let r = (a as i64) % divisor;
                        Ok(Value::Int16(narrow_to_int16(
                            r as f64,
                            self.config.overflow,
                        )?))
                    }
                    _ => Err(BasicError::syntax("operator", pos)),
                }
            }

            Op::And | Op::Or | Op::Xor | Op::Eqv | Op::Imp => {
                let a = lhs.to_bool_int16();
                let c = rhs.to_bool_int16();
                let result = match op {
                    Op::And => a & c,
                    Op::Or => a | c,
                    Op::Xor => a ^ c,
                    Op::Eqv => !(a ^ c),
                    Op::Imp => (!a) | c,
                    _ => unreachable!(),
                };
                Ok(Value::Int16(result))
            }
        }
    }

    fn compare(
        &self,
        op: Op,
        lhs: &Value,
        rhs: &Value,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Value> {
        let ordering = match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => env.strings().compare(a, b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let x = a.as_double()?;
                let y = b.as_double()?;
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            _ => return Err(BasicError::TypeMismatch),
        };
        let result = match op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Gt => ordering == Ordering::Greater,
            Op::Le => ordering != Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
            _ => unreachable!(),
        };
        Ok(Value::Int16(if result { -1 } else { 0 }))
    }

    // ---- literals ----

    fn try_decode_string(
        &self,
        b: &[u8],
        pos: &mut usize,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Option<Value>> {
        if *pos >= b.len() || b[*pos] != b'"' {
            return Ok(None);
        }
        let mut i = *pos + 1;
        while i < b.len() && b[i] != 0x00 && b[i] != b'"' {
            i += 1;
        }
        if i >= b.len() || b[i] != b'"' {
            return Ok(None); // unterminated; let the caller report syntax
        }
        let strings = env.strings();
        let desc = strings.create(&b[*pos + 1..i])?;
        strings.hold_temp(&desc)?;
        *pos = i + 1;
        Ok(Some(Value::Str(desc)))
    }
}

// ---- free helpers ----

fn at_end(b: &[u8], pos: usize) -> bool {
    pos >= b.len() || b[pos] == 0x00
}

fn skip_spaces(b: &[u8], pos: &mut usize) {
    while *pos < b.len() && matches!(b[*pos], b' ' | b'\t' | b'\r' | b'\n') {
        *pos += 1;
    }
}

fn is_word_at(b: &[u8], pos: usize, word: &str) -> bool {
    let bytes = word.as_bytes();
    if pos + bytes.len() > b.len() {
        return false;
    }
    b[pos..pos + bytes.len()]
        .iter()
        .zip(bytes)
        .all(|(&a, &w)| a.to_ascii_uppercase() == w)
}

fn read_identifier(b: &[u8], pos: &mut usize) -> String {
    let mut id = String::new();
    if *pos < b.len() && b[*pos].is_ascii_alphabetic() {
        id.push(b[*pos] as char);
        *pos += 1;
        while *pos < b.len() {
            let c = b[*pos];
            if c.is_ascii_alphanumeric() || matches!(c, b'$' | b'%' | b'!' | b'#') {
                id.push(c as char);
                *pos += 1;
            } else {
                break;
            }
        }
    }
    id
}

/// Decode the binary constant markers: 0x11 Int16, 0x1D Single, 0x1F Double,
/// all little-endian.
fn try_decode_number(b: &[u8], pos: &mut usize) -> Option<Value> {
    match b.get(*pos)? {
        0x11 if *pos + 2 < b.len() => {
            let v = i16::from_le_bytes([b[*pos + 1], b[*pos + 2]]);
            *pos += 3;
            Some(Value::Int16(v))
        }
        0x1D if *pos + 4 < b.len() => {
            let mut le = [0u8; 4];
            le.copy_from_slice(&b[*pos + 1..*pos + 5]);
            *pos += 5;
            Some(Value::Single(f32::from_le_bytes(le)))
        }
        0x1F if *pos + 8 < b.len() => {
            let mut le = [0u8; 8];
            le.copy_from_slice(&b[*pos + 1..*pos + 9]);
            *pos += 9;
            Some(Value::Double(f64::from_le_bytes(le)))
        }
        _ => None,
    }
}

/// ASCII digits with optional fraction; integers that fit stay Int16.
fn parse_ascii_number(b: &[u8], pos: &mut usize) -> Value {
    let mut value = 0.0f64;
    let mut is_float = false;
    while !at_end(b, *pos) && b[*pos].is_ascii_digit() {
        value = value * 10.0 + (b[*pos] - b'0') as f64;
        *pos += 1;
    }
    if !at_end(b, *pos) && b[*pos] == b'.' {
        is_float = true;
        *pos += 1;
        let mut divisor = 10.0f64;
        while !at_end(b, *pos) && b[*pos].is_ascii_digit() {
            value += (b[*pos] - b'0') as f64 / divisor;
            divisor *= 10.0;
            *pos += 1;
        }
    }
    if !is_float && value <= i16::MAX as f64 {
        Value::Int16(value as i16)
    } else {
        Value::Double(value)
    }
}

/// Int16 when both operands were Int16 and the result is exactly
/// representable; Double otherwise.
fn make_numeric_result(result: f64, both_int: bool) -> Value {
    if both_int
        && result.fract() == 0.0
        && result >= i16::MIN as f64
        && result <= i16::MAX as f64
    {
        Value::Int16(result as i16)
    } else {
        Value::Double(result)
    }
}
