//! DEF FN: user-defined expression functions.
//!
//! A function is a parameter list plus stored expression bytes. Calls bind
//! arguments into a per-call locals map layered over the caller's
//! environment, so parameters shadow globals for the duration of one call
//! and recursive calls each get fresh locals. Depth is capped; eager
//! argument evaluation means self-recursion cannot terminate anyway, and
//! the cap turns it into the dialect's out-of-memory error instead of a
//! host stack overflow.

use std::cell::Cell;
use std::collections::HashMap;

use crate::error::{BasicError, BasicResult};
use crate::eval::{EvalEnv, Evaluator};
use crate::value::{ScalarType, Value};
use crate::variables::SymbolKey;

pub const FN_RECURSION_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct UserFunction {
    pub params: Vec<SymbolKey>,
    pub body: Vec<u8>,
    pub return_type: ScalarType,
}

#[derive(Debug, Default)]
pub struct UserFunctionManager {
    functions: HashMap<String, UserFunction>,
    depth: Cell<usize>,
}

impl UserFunctionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// FN names are not limited to two significant characters; every
    /// alphanumeric counts, case-insensitively. Type suffixes are dropped.
    fn normalize_name(raw: &str) -> String {
        raw.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    /// Register (or redefine) a function.
    pub fn define(
        &mut self,
        name: &str,
        params: &[&str],
        body: Vec<u8>,
        return_type: ScalarType,
    ) -> BasicResult<()> {
        if params.len() > 255 {
            return Err(BasicError::IllegalFunctionCall);
        }
        let mut keys = Vec::with_capacity(params.len());
        for param in params {
            let key = SymbolKey::normalize(param);
            if keys.contains(&key) {
                return Err(BasicError::syntax(
                    format!("duplicate parameter {}", key),
                    0,
                ));
            }
            keys.push(key);
        }
        self.functions.insert(
            Self::normalize_name(name),
            UserFunction {
                params: keys,
                body,
                return_type,
            },
        );
        Ok(())
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(&Self::normalize_name(name))
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(&Self::normalize_name(name))
    }

    /// Invoke a function; `Ok(None)` when the name is not defined. The
    /// result converts to the declared return type under the evaluator's
    /// overflow mode; a string/numeric crossing is a type mismatch.
    pub fn call(
        &self,
        name: &str,
        args: &[Value],
        evaluator: &Evaluator<'_>,
        env: &mut dyn EvalEnv,
    ) -> BasicResult<Option<Value>> {
        let Some(func) = self.functions.get(&Self::normalize_name(name)) else {
            return Ok(None);
        };
        if args.len() != func.params.len() {
            return Err(BasicError::IllegalFunctionCall);
        }
        if self.depth.get() >= FN_RECURSION_LIMIT {
            return Err(BasicError::OutOfMemory);
        }

        let locals: HashMap<SymbolKey, Value> = func
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();

        self.depth.set(self.depth.get() + 1);
        let result = {
            let mut local_env = LocalEnv { locals, outer: env };
            evaluator.evaluate(&func.body, 0, &mut local_env)
        };
        self.depth.set(self.depth.get() - 1);

        let value = result?.value;
        Ok(Some(value.coerce_numeric(
            func.return_type,
            evaluator.config().overflow,
        )?))
    }

    pub fn clear(&mut self) {
        self.functions.clear();
        self.depth.set(0);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Parameter bindings layered over the caller's environment: locals are
/// consulted first, everything else delegates outward.
struct LocalEnv<'a> {
    locals: HashMap<SymbolKey, Value>,
    outer: &'a mut dyn EvalEnv,
}

impl EvalEnv for LocalEnv<'_> {
    fn get_var(&mut self, name: &str) -> Option<Value> {
        let key = SymbolKey::normalize(name);
        match self.locals.get(&key) {
            Some(value) => Some(value.clone()),
            None => self.outer.get_var(name),
        }
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> BasicResult<Option<Value>> {
        self.outer.call_function(name, args)
    }

    fn array_exists(&mut self, name: &str) -> bool {
        self.outer.array_exists(name)
    }

    fn array_element(&mut self, name: &str, subs: &[i32]) -> BasicResult<Value> {
        self.outer.array_element(name, subs)
    }

    fn strings(&self) -> &crate::strings::StringManager {
        self.outer.strings()
    }

    fn rnd(&mut self) -> f32 {
        self.outer.rnd()
    }
}
