// Library code must not print; the CLI binary owns user-facing output.
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

//! Runtime core of a line-numbered GW-style BASIC interpreter.
//!
//! The crate covers the execution half of the interpreter: tagged scalar
//! values, the bounded string heap with mark-compact collection, variable
//! and array storage, DEF FN, the expression evaluator, the FOR/GOSUB/ERR
//! runtime stacks, event traps, and the statement-driving interpreter loop.
//! Tokenizing source text lives in the companion `gwbasic_tokenizer` crate;
//! statement semantics are supplied by the embedding host as a handler
//! callback.

pub mod arrays;
pub mod error;
pub mod eval;
pub mod format;
pub mod interp;
pub mod program;
pub mod runtime;
pub mod stack;
pub mod strings;
pub mod traps;
pub mod user_functions;
pub mod value;
pub mod variables;

pub use arrays::{ArrayData, ArrayManager, BasicArray, Dim};
pub use error::{BasicError, BasicResult, RuntimeFault};
pub use eval::{EvalConfig, EvalEnv, Evaluated, Evaluator, RndState, TokenResolver};
pub use interp::{
    ExecOutcome, InterpreterLoop, LoopState, SourceTokenizer, StatementHandler, StepResult,
};
pub use program::{Program, ProgramStore};
pub use runtime::{Runtime, RuntimeEnv};
pub use stack::{ErrFrame, ForFrame, GosubFrame, ResumeMode, RuntimeStack};
pub use strings::{
    GcPolicy, StrDesc, StringConfig, StringHeap, StringManager, StringRootProvider, TempScope,
};
pub use traps::{EventTrap, EventTrapSystem, EventType};
pub use user_functions::{UserFunction, UserFunctionManager};
pub use value::{OverflowMode, ScalarType, Value};
pub use variables::{DefaultTypeTable, SymbolKey, VarSlot, VariableTable};
