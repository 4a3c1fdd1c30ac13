//! Top-level runtime: owns the string manager, variable and array storage,
//! DEF FN table, runtime stacks and event traps, and wires them together as
//! GC root providers.
//!
//! There is no hidden global state; tests construct fresh runtimes. The one
//! discipline the facade enforces is allocation order: heap allocation
//! happens before any storage component is mutably borrowed, so a
//! collection triggered inside `alloc` can always enumerate every provider.

use std::cell::RefCell;
use std::rc::Rc;

use crate::arrays::ArrayManager;
use crate::error::{BasicError, BasicResult};
use crate::eval::{EvalConfig, EvalEnv, Evaluated, Evaluator, RndState, TokenResolver};
use crate::stack::RuntimeStack;
use crate::strings::{StringConfig, StringManager, StringRootProvider};
use crate::traps::EventTrapSystem;
use crate::user_functions::UserFunctionManager;
use crate::value::{ScalarType, Value};
use crate::variables::{SymbolKey, VariableTable};

#[derive(Debug)]
pub struct Runtime {
    strings: StringManager,
    vars: Rc<RefCell<VariableTable>>,
    arrays: Rc<RefCell<ArrayManager>>,
    funcs: Rc<RefCell<UserFunctionManager>>,
    stack: Rc<RefCell<RuntimeStack>>,
    traps: Rc<RefCell<EventTrapSystem>>,
    config: EvalConfig,
    rnd: RndState,
}

impl Runtime {
    pub fn new(config: StringConfig) -> Self {
        let runtime = Runtime {
            strings: StringManager::new(config),
            vars: Rc::new(RefCell::new(VariableTable::new())),
            arrays: Rc::new(RefCell::new(ArrayManager::new())),
            funcs: Rc::new(RefCell::new(UserFunctionManager::new())),
            stack: Rc::new(RefCell::new(RuntimeStack::new())),
            traps: Rc::new(RefCell::new(EventTrapSystem::new())),
            config: EvalConfig::default(),
            rnd: RndState::default(),
        };
        runtime.register_providers();
        runtime
    }

    fn register_providers(&self) {
        let vars: Rc<RefCell<dyn StringRootProvider>> = self.vars.clone();
        let arrays: Rc<RefCell<dyn StringRootProvider>> = self.arrays.clone();
        let stack: Rc<RefCell<dyn StringRootProvider>> = self.stack.clone();
        self.strings.register_provider(Rc::downgrade(&vars));
        self.strings.register_provider(Rc::downgrade(&arrays));
        self.strings.register_provider(Rc::downgrade(&stack));
    }

    // ---- component access ----

    pub fn strings(&self) -> &StringManager {
        &self.strings
    }

    pub fn vars(&self) -> Rc<RefCell<VariableTable>> {
        self.vars.clone()
    }

    pub fn arrays(&self) -> Rc<RefCell<ArrayManager>> {
        self.arrays.clone()
    }

    pub fn funcs(&self) -> Rc<RefCell<UserFunctionManager>> {
        self.funcs.clone()
    }

    pub fn stack(&self) -> Rc<RefCell<RuntimeStack>> {
        self.stack.clone()
    }

    pub fn traps(&self) -> Rc<RefCell<EventTrapSystem>> {
        self.traps.clone()
    }

    pub fn eval_config(&self) -> EvalConfig {
        self.config
    }

    pub fn set_eval_config(&mut self, config: EvalConfig) {
        self.config = config;
    }

    pub fn reseed_rnd(&mut self, seed: u32) {
        self.rnd.reseed(seed);
    }

    // ---- evaluation ----

    /// Evaluate an expression from the start of a token stream.
    pub fn evaluate(&mut self, bytes: &[u8], tokens: &dyn TokenResolver) -> BasicResult<Value> {
        Ok(self.evaluate_at(bytes, 0, tokens)?.value)
    }

    /// Evaluate from `start`, returning the value and the stop position.
    pub fn evaluate_at(
        &mut self,
        bytes: &[u8],
        start: usize,
        tokens: &dyn TokenResolver,
    ) -> BasicResult<Evaluated> {
        let config = self.config;
        let evaluator = Evaluator::new(tokens, config);
        let mut env = RuntimeEnv { rt: self, tokens };
        evaluator.evaluate(bytes, start, &mut env)
    }

    /// Environment adapter for statement handlers that drive the evaluator
    /// themselves.
    pub fn env<'a>(&'a mut self, tokens: &'a dyn TokenResolver) -> RuntimeEnv<'a> {
        RuntimeEnv { rt: self, tokens }
    }

    // ---- scalar facade ----

    /// LET semantics: numerics convert to the slot type, strings are copied
    /// into this runtime's heap.
    pub fn assign_scalar(&mut self, name: &str, value: Value) -> BasicResult<()> {
        match value {
            Value::Str(desc) => {
                let bytes = self.strings.bytes(&desc);
                let copy = self.strings.create(&bytes)?;
                self.vars.borrow_mut().assign_string(name, copy)
            }
            numeric => self
                .vars
                .borrow_mut()
                .assign_coerced(name, numeric, self.config.overflow),
        }
    }

    pub fn assign_str(&mut self, name: &str, text: &str) -> BasicResult<()> {
        let desc = self.strings.create_str(text)?;
        self.vars.borrow_mut().assign_string(name, desc)
    }

    /// Current value of a scalar, creating it with its default if absent.
    pub fn get_scalar(&mut self, name: &str) -> BasicResult<Value> {
        Ok(self.vars.borrow_mut().get_or_create(name)?.clone())
    }

    /// A scalar string's text, for hosts and tests.
    pub fn string_of(&self, value: &Value) -> Option<String> {
        match value {
            Value::Str(desc) => Some(self.strings.to_string(desc)),
            _ => None,
        }
    }

    // ---- array facade ----

    /// DIM with the element type resolved from the name.
    pub fn dim(&mut self, name: &str, upper_bounds: &[i16]) -> BasicResult<()> {
        let key = SymbolKey::normalize(name);
        if self.vars.borrow().try_get(name).is_some() {
            return Err(BasicError::RedimensionedArray);
        }
        let ty = key.resolved_type(self.vars.borrow().deftbl());
        self.arrays.borrow_mut().create_array(name, ty, upper_bounds)?;
        self.vars.borrow_mut().mark_array(name, key.to_string())
    }

    pub fn set_array_element(
        &mut self,
        name: &str,
        subs: &[i32],
        value: Value,
    ) -> BasicResult<()> {
        let ty = self
            .arrays
            .borrow()
            .info(name)
            .map(|(ty, _, _)| ty)
            .ok_or_else(|| BasicError::syntax(format!("Undefined array: {}", name), 0))?;
        let stored = match (value, ty) {
            (Value::Str(desc), ScalarType::Str) => {
                let bytes = self.strings.bytes(&desc);
                Value::Str(self.strings.create(&bytes)?)
            }
            (Value::Str(_), _) => return Err(BasicError::TypeMismatch),
            (numeric, ty) => numeric.coerce_numeric(ty, self.config.overflow)?,
        };
        self.arrays.borrow_mut().set_element(name, subs, &stored)
    }

    pub fn get_array_element(&mut self, name: &str, subs: &[i32]) -> BasicResult<Value> {
        self.arrays.borrow().get_element(name, subs)
    }

    // ---- lifecycle ----

    pub fn collect_garbage(&mut self) -> usize {
        self.strings.collect_garbage()
    }

    /// NEW: drop all program state and re-wire the heap providers.
    pub fn clear(&mut self) {
        self.vars.borrow_mut().clear();
        self.arrays.borrow_mut().clear();
        self.funcs.borrow_mut().clear();
        self.stack.borrow_mut().clear();
        self.traps.borrow_mut().clear();
        self.strings.reset();
        self.register_providers();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(StringConfig::default())
    }
}

/// [`EvalEnv`] over a [`Runtime`]: variables auto-create on first read, ERR
/// and ERL read the error stack, user functions resolve through the DEF FN
/// table, arrays through the array manager.
pub struct RuntimeEnv<'a> {
    rt: &'a mut Runtime,
    tokens: &'a dyn TokenResolver,
}

impl std::fmt::Debug for RuntimeEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnv").finish()
    }
}

impl EvalEnv for RuntimeEnv<'_> {
    fn get_var(&mut self, name: &str) -> Option<Value> {
        match name.to_ascii_uppercase().as_str() {
            "ERR" => Some(Value::Int16(self.rt.stack.borrow().err_code() as i16)),
            "ERL" => Some(Value::Double(self.rt.stack.borrow().erl() as f64)),
            _ => self
                .rt
                .vars
                .borrow_mut()
                .get_or_create(name)
                .ok()
                .map(|v| v.clone()),
        }
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> BasicResult<Option<Value>> {
        let funcs = self.rt.funcs.clone();
        let evaluator = Evaluator::new(self.tokens, self.rt.config);
        let funcs_ref = funcs.borrow();
        funcs_ref.call(name, args, &evaluator, self)
    }

    fn array_exists(&mut self, name: &str) -> bool {
        self.rt.arrays.borrow().exists(name)
    }

    fn array_element(&mut self, name: &str, subs: &[i32]) -> BasicResult<Value> {
        self.rt.arrays.borrow().get_element(name, subs)
    }

    fn strings(&self) -> &StringManager {
        &self.rt.strings
    }

    fn rnd(&mut self) -> f32 {
        self.rt.rnd.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::AsciiOnly;

    fn eval(rt: &mut Runtime, src: &str) -> Value {
        let mut bytes = src.as_bytes().to_vec();
        bytes.push(0);
        rt.evaluate(&bytes, &AsciiOnly).unwrap()
    }

    #[test]
    fn test_variables_auto_create_as_zero() {
        let mut rt = Runtime::default();
        assert!(matches!(eval(&mut rt, "X + 1"), Value::Double(v) if v == 1.0));
    }

    #[test]
    fn test_assign_and_read_back() {
        let mut rt = Runtime::default();
        rt.assign_scalar("N%", Value::Double(12.0)).unwrap();
        assert!(matches!(eval(&mut rt, "N% * 2"), Value::Int16(24)));
    }

    #[test]
    fn test_string_assignment_copies_bytes() {
        let mut rt = Runtime::default();
        rt.assign_str("A$", "HELLO").unwrap();
        let value = rt.get_scalar("A$").unwrap();
        assert_eq!(rt.string_of(&value).unwrap(), "HELLO");
    }

    #[test]
    fn test_array_element_in_expression() {
        let mut rt = Runtime::default();
        rt.dim("A", &[10]).unwrap();
        rt.set_array_element("A", &[5], Value::Double(42.0)).unwrap();
        assert!(matches!(eval(&mut rt, "A(5)"), Value::Single(v) if v == 42.0));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut rt = Runtime::default();
        rt.assign_str("A$", "GONE").unwrap();
        rt.dim("B", &[3]).unwrap();
        rt.clear();
        assert_eq!(rt.vars().borrow().len(), 0);
        assert!(!rt.arrays().borrow().exists("B"));
        assert_eq!(rt.strings().used_bytes(), 0);
        // Providers re-registered: allocation and collection still work.
        rt.assign_str("A$", "BACK").unwrap();
        rt.collect_garbage();
        let value = rt.get_scalar("A$").unwrap();
        assert_eq!(rt.string_of(&value).unwrap(), "BACK");
    }
}
