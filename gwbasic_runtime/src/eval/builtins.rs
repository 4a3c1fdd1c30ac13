//! Built-in function dispatch.
//!
//! One keyed table: uppercase name to arity range and implementation.
//! Domain violations raise "Illegal function call"; operands of the wrong
//! type raise "Type mismatch". String results are rooted in the temp pool
//! before they are returned.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{BasicError, BasicResult};
use crate::format;
use crate::strings::StrDesc;
use crate::value::{narrow_to_int16, Value};

use super::{EvalConfig, EvalEnv};

type BuiltinFn = fn(&[Value], &mut dyn EvalEnv, EvalConfig) -> BasicResult<Value>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    func: BuiltinFn,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

static TABLE: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    let entries: &[(&'static str, usize, usize, BuiltinFn)] = &[
        ("ABS", 1, 1, fn_abs),
        ("SGN", 1, 1, fn_sgn),
        ("INT", 1, 1, fn_int),
        ("FIX", 1, 1, fn_fix),
        ("SQR", 1, 1, fn_sqr),
        ("SIN", 1, 1, fn_sin),
        ("COS", 1, 1, fn_cos),
        ("TAN", 1, 1, fn_tan),
        ("ATN", 1, 1, fn_atn),
        ("LOG", 1, 1, fn_log),
        ("EXP", 1, 1, fn_exp),
        ("RND", 0, 1, fn_rnd),
        ("LEN", 1, 1, fn_len),
        ("ASC", 1, 1, fn_asc),
        ("CHR$", 1, 1, fn_chr),
        ("STR$", 1, 1, fn_str),
        ("VAL", 1, 1, fn_val),
        ("LEFT$", 2, 2, fn_left),
        ("RIGHT$", 2, 2, fn_right),
        ("MID$", 2, 3, fn_mid),
        ("STRING$", 2, 2, fn_string),
        ("SPACE$", 1, 1, fn_space),
        ("INSTR", 2, 3, fn_instr),
        ("CINT", 1, 1, fn_cint),
        ("CSNG", 1, 1, fn_csng),
        ("CDBL", 1, 1, fn_cdbl),
        ("HEX$", 1, 1, fn_hex),
        ("OCT$", 1, 1, fn_oct),
    ];
    entries
        .iter()
        .map(|&(name, min_args, max_args, func)| {
            (
                name,
                Builtin {
                    name,
                    min_args,
                    max_args,
                    func,
                },
            )
        })
        .collect()
});

/// Is `name` (any case) a built-in? Built-ins always win over arrays when
/// followed by an opening parenthesis.
pub fn is_known(name: &str) -> bool {
    TABLE.contains_key(name.to_ascii_uppercase().as_str())
}

/// Dispatch a built-in by name.
pub fn call(
    name: &str,
    args: &[Value],
    env: &mut dyn EvalEnv,
    config: EvalConfig,
) -> BasicResult<Value> {
    let upper = name.to_ascii_uppercase();
    let builtin = TABLE
        .get(upper.as_str())
        .ok_or_else(|| BasicError::syntax(format!("Unknown function: {}", name), 0))?;
    if args.len() < builtin.min_args || args.len() > builtin.max_args {
        return Err(BasicError::syntax(
            format!("wrong argument count for {}", builtin.name),
            0,
        ));
    }
    (builtin.func)(args, env, config)
}

// ---- helpers ----

fn num(args: &[Value], index: usize) -> BasicResult<f64> {
    args[index].as_double()
}

fn str_arg<'a>(args: &'a [Value], index: usize) -> BasicResult<&'a StrDesc> {
    match &args[index] {
        Value::Str(desc) => Ok(desc),
        _ => Err(BasicError::TypeMismatch),
    }
}

fn make_string(env: &mut dyn EvalEnv, bytes: &[u8]) -> BasicResult<Value> {
    let strings = env.strings();
    let desc = strings.create(bytes)?;
    strings.hold_temp(&desc)?;
    Ok(Value::Str(desc))
}

fn hold(env: &mut dyn EvalEnv, desc: StrDesc) -> BasicResult<Value> {
    env.strings().hold_temp(&desc)?;
    Ok(Value::Str(desc))
}

// ---- math ----

fn fn_abs(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.abs()))
}

fn fn_sgn(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let v = num(args, 0)?;
    Ok(Value::Int16(if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }))
}

fn fn_int(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let floored = num(args, 0)?.floor();
    Ok(int16_or_double(floored))
}

fn fn_fix(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let truncated = num(args, 0)?.trunc();
    Ok(int16_or_double(truncated))
}

fn int16_or_double(v: f64) -> Value {
    if v >= i16::MIN as f64 && v <= i16::MAX as f64 {
        Value::Int16(v as i16)
    } else {
        Value::Double(v)
    }
}

fn fn_sqr(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let v = num(args, 0)?;
    if v < 0.0 {
        return Err(BasicError::IllegalFunctionCall);
    }
    Ok(Value::Double(v.sqrt()))
}

fn fn_sin(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.sin()))
}

fn fn_cos(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.cos()))
}

fn fn_tan(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.tan()))
}

fn fn_atn(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.atan()))
}

fn fn_log(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let v = num(args, 0)?;
    if v <= 0.0 {
        return Err(BasicError::IllegalFunctionCall);
    }
    Ok(Value::Double(v.ln()))
}

fn fn_exp(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?.exp()))
}

fn fn_rnd(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    if let Some(arg) = args.first() {
        // The argument only selects sequence behavior; any numeric is legal.
        arg.as_double()?;
    }
    Ok(Value::Single(env.rnd()))
}

// ---- strings ----

fn fn_len(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Int16(str_arg(args, 0)?.len() as i16))
}

fn fn_asc(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let desc = str_arg(args, 0)?;
    let bytes = env.strings().bytes(desc);
    match bytes.first() {
        Some(&b) => Ok(Value::Int16(b as i16)),
        None => Err(BasicError::IllegalFunctionCall),
    }
}

fn fn_chr(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let code = args[0].as_int16(cfg.overflow)?;
    if !(0..=255).contains(&code) {
        return Err(BasicError::IllegalFunctionCall);
    }
    make_string(env, &[code as u8])
}

fn fn_str(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let text = format::str_value(&args[0])?;
    make_string(env, text.as_bytes())
}

fn fn_val(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let desc = str_arg(args, 0)?;
    let bytes = env.strings().bytes(desc);
    Ok(format::val_bytes(&bytes))
}

fn fn_left(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let count = args[1].as_int16(cfg.overflow)?;
    if count < 0 {
        return Err(BasicError::IllegalFunctionCall);
    }
    let desc = str_arg(args, 0)?.clone();
    let result = env.strings().left(&desc, count as usize)?;
    hold(env, result)
}

fn fn_right(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let count = args[1].as_int16(cfg.overflow)?;
    if count < 0 {
        return Err(BasicError::IllegalFunctionCall);
    }
    let desc = str_arg(args, 0)?.clone();
    let result = env.strings().right(&desc, count as usize)?;
    hold(env, result)
}

fn fn_mid(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let start = args[1].as_int16(cfg.overflow)?;
    if start < 1 {
        return Err(BasicError::IllegalFunctionCall);
    }
    let count = match args.get(2) {
        Some(v) => {
            let c = v.as_int16(cfg.overflow)?;
            if c < 0 {
                return Err(BasicError::IllegalFunctionCall);
            }
            Some(c as usize)
        }
        None => None,
    };
    let desc = str_arg(args, 0)?.clone();
    let result = env.strings().mid(&desc, start as usize, count)?;
    hold(env, result)
}

fn fn_string(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let count = args[0].as_int16(cfg.overflow)?;
    if !(0..=255).contains(&count) {
        return Err(BasicError::IllegalFunctionCall);
    }
    let fill = match &args[1] {
        Value::Str(desc) => {
            let bytes = env.strings().bytes(desc);
            match bytes.first() {
                Some(&b) => b,
                None => return Err(BasicError::IllegalFunctionCall),
            }
        }
        numeric => {
            let code = numeric.as_int16(cfg.overflow)?;
            if !(0..=255).contains(&code) {
                return Err(BasicError::IllegalFunctionCall);
            }
            code as u8
        }
    };
    make_string(env, &vec![fill; count as usize])
}

fn fn_space(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let count = args[0].as_int16(cfg.overflow)?;
    if !(0..=255).contains(&count) {
        return Err(BasicError::IllegalFunctionCall);
    }
    make_string(env, &vec![b' '; count as usize])
}

fn fn_instr(args: &[Value], env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    // INSTR(hay$, needle$) or INSTR(start, hay$, needle$)
    let (start, hay_index) = if args.len() == 3 {
        let start = args[0].as_int16(cfg.overflow)?;
        if start < 1 {
            return Err(BasicError::IllegalFunctionCall);
        }
        (start as usize, 1)
    } else {
        (1, 0)
    };
    let hay = str_arg(args, hay_index)?;
    let needle = str_arg(args, hay_index + 1)?;
    Ok(Value::Int16(env.strings().instr(hay, needle, start) as i16))
}

// ---- conversion ----

fn fn_cint(args: &[Value], _env: &mut dyn EvalEnv, cfg: EvalConfig) -> BasicResult<Value> {
    let rounded = num(args, 0)?.round_ties_even();
    Ok(Value::Int16(narrow_to_int16(rounded, cfg.overflow)?))
}

fn fn_csng(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Single(num(args, 0)? as f32))
}

fn fn_cdbl(args: &[Value], _env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    Ok(Value::Double(num(args, 0)?))
}

fn fn_hex(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let text = format::hex_str(&args[0])?;
    make_string(env, text.as_bytes())
}

fn fn_oct(args: &[Value], env: &mut dyn EvalEnv, _cfg: EvalConfig) -> BasicResult<Value> {
    let text = format::oct_str(&args[0])?;
    make_string(env, text.as_bytes())
}
