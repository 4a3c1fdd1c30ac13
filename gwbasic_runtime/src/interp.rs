//! The interpreter loop: line-at-a-time execution with trap polling and
//! error dispatch.
//!
//! The loop owns control flow only. Statement semantics live in an external
//! handler supplied at construction; the loop fetches each line's token
//! bytes, polls event traps, invokes the handler, and interprets its
//! outcome. Errors thrown by the handler unwind here and are either routed
//! to the active ON ERROR handler or surfaced to the host as a
//! [`RuntimeFault`].
//!
//! Between statements is the only point where traps may redirect control;
//! statements always run to completion.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{BasicError, BasicResult, RuntimeFault};
use crate::program::ProgramStore;
use crate::stack::{ResumeMode, RuntimeStack};
use crate::traps::EventTrapSystem;

/// Sentinel line override meaning END/STOP.
pub const TERMINATE_SENTINEL: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// A statement is waiting on host input; `cont` re-runs it.
    Waiting,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Fell through to the next line.
    Continued,
    /// Control transferred (GOTO, trap, or error handler).
    Jumped,
    Waiting,
    Halted,
}

/// What a statement handler asks the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Fall through to the next line.
    Next,
    /// Transfer to a line.
    Goto(u16),
    /// END / STOP.
    Terminate,
    /// Suspend until the host supplies input.
    Waiting,
}

impl ExecOutcome {
    /// Decode the dialect's u16 override protocol: 0 falls through,
    /// `0xFFFF` terminates, anything else jumps.
    pub fn from_override(value: u16) -> ExecOutcome {
        match value {
            0 => ExecOutcome::Next,
            TERMINATE_SENTINEL => ExecOutcome::Terminate,
            line => ExecOutcome::Goto(line),
        }
    }

    /// Encode back to the u16 protocol; `Waiting` has no wire form and
    /// encodes as fall-through.
    pub fn to_override(self) -> u16 {
        match self {
            ExecOutcome::Next | ExecOutcome::Waiting => 0,
            ExecOutcome::Terminate => TERMINATE_SENTINEL,
            ExecOutcome::Goto(line) => line,
        }
    }
}

/// Statement dispatcher: `(token_bytes, current_line)` to an outcome.
pub type StatementHandler = Box<dyn FnMut(&[u8], u16) -> BasicResult<ExecOutcome>>;

/// Invoked with `(line, tokens)` before each statement when tracing.
pub type TraceHook = Box<dyn FnMut(u16, &[u8])>;

/// Turns source text into token bytes for immediate mode.
pub trait SourceTokenizer {
    fn crunch(&self, source: &str) -> BasicResult<Vec<u8>>;
}

impl SourceTokenizer for gwbasic_tokenizer::Tokenizer {
    fn crunch(&self, source: &str) -> BasicResult<Vec<u8>> {
        gwbasic_tokenizer::Tokenizer::crunch(self, source)
            .map_err(|e| BasicError::syntax(e.to_string(), 0))
    }
}

pub struct InterpreterLoop<P: ProgramStore> {
    program: Rc<RefCell<P>>,
    stack: Rc<RefCell<RuntimeStack>>,
    traps: Rc<RefCell<EventTrapSystem>>,
    handler: StatementHandler,
    state: LoopState,
    current_line: u16,
    trace: Option<TraceHook>,
    last_fault: Option<RuntimeFault>,
}

impl<P: ProgramStore> std::fmt::Debug for InterpreterLoop<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterLoop")
            .field("state", &self.state)
            .field("current_line", &self.current_line)
            .field("trace", &self.trace.is_some())
            .field("last_fault", &self.last_fault)
            .finish()
    }
}

impl<P: ProgramStore> InterpreterLoop<P> {
    pub fn new(
        program: Rc<RefCell<P>>,
        stack: Rc<RefCell<RuntimeStack>>,
        traps: Rc<RefCell<EventTrapSystem>>,
        handler: StatementHandler,
    ) -> Self {
        InterpreterLoop {
            program,
            stack,
            traps,
            handler,
            state: LoopState::Idle,
            current_line: 0,
            trace: None,
            last_fault: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn current_line(&self) -> u16 {
        self.current_line
    }

    pub fn set_current_line(&mut self, line: u16) {
        self.current_line = line;
        self.program.borrow_mut().set_current_line(line);
    }

    pub fn set_trace(&mut self, hook: TraceHook) {
        self.trace = Some(hook);
    }

    pub fn clear_trace(&mut self) {
        self.trace = None;
    }

    /// The fault that halted the last run, if any.
    pub fn last_fault(&self) -> Option<&RuntimeFault> {
        self.last_fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<RuntimeFault> {
        self.last_fault.take()
    }

    /// Request a halt; takes effect at the next statement boundary.
    pub fn stop(&mut self) {
        self.state = LoopState::Halted;
    }

    pub fn reset(&mut self) {
        self.state = LoopState::Idle;
        self.current_line = 0;
        self.last_fault = None;
    }

    /// Run from the first program line until halt or wait.
    pub fn run(&mut self) {
        let first = self.program.borrow().first_line();
        self.last_fault = None;
        self.set_current_line(first);
        self.state = LoopState::Running;
        self.drive();
    }

    /// Continue from the current line (or the first, after a reset).
    pub fn cont(&mut self) {
        if self.current_line == 0 {
            let first = self.program.borrow().first_line();
            self.set_current_line(first);
        }
        self.state = LoopState::Running;
        self.drive();
    }

    fn drive(&mut self) {
        loop {
            match self.step() {
                StepResult::Halted | StepResult::Waiting => break,
                StepResult::Continued | StepResult::Jumped => {}
            }
        }
    }

    /// Execute one statement line.
    pub fn step(&mut self) -> StepResult {
        if self.state == LoopState::Halted || self.current_line == 0 {
            self.state = LoopState::Halted;
            return StepResult::Halted;
        }

        // Traps may redirect control only here, between statements.
        let trap_line = self.traps.borrow_mut().check_for_events();
        if trap_line != 0 && self.program.borrow().has_line(trap_line) {
            self.set_current_line(trap_line);
            return StepResult::Jumped;
        }

        let tokens = match self.program.borrow().line_tokens(self.current_line) {
            Some(tokens) => tokens.to_vec(),
            None => {
                self.state = LoopState::Halted;
                return StepResult::Halted;
            }
        };

        if let Some(trace) = self.trace.as_mut() {
            trace(self.current_line, &tokens);
        }

        match (self.handler)(&tokens, self.current_line) {
            Err(error) => self.handle_runtime_error(error),
            Ok(ExecOutcome::Terminate) => {
                self.state = LoopState::Halted;
                StepResult::Halted
            }
            Ok(ExecOutcome::Waiting) => {
                self.state = LoopState::Waiting;
                StepResult::Waiting
            }
            Ok(ExecOutcome::Goto(line)) => {
                if line == TERMINATE_SENTINEL || !self.program.borrow().has_line(line) {
                    if line != TERMINATE_SENTINEL {
                        self.last_fault = Some(RuntimeFault::new(
                            BasicError::UndefinedLineNumber,
                            self.current_line,
                        ));
                    }
                    self.state = LoopState::Halted;
                    return StepResult::Halted;
                }
                self.set_current_line(line);
                StepResult::Jumped
            }
            Ok(ExecOutcome::Next) => {
                let next = self.program.borrow().next_line(self.current_line);
                if next == 0 {
                    self.state = LoopState::Halted;
                    return StepResult::Halted;
                }
                self.set_current_line(next);
                StepResult::Continued
            }
        }
    }

    /// Crunch and execute a single statement at line 0 without trap polling.
    pub fn execute_immediate(
        &mut self,
        source: &str,
        tokenizer: &dyn SourceTokenizer,
    ) -> BasicResult<ExecOutcome> {
        let bytes = tokenizer.crunch(source)?;
        if let Some(trace) = self.trace.as_mut() {
            trace(0, &bytes);
        }
        (self.handler)(&bytes, 0)
    }

    /// Route an error to the active ON ERROR handler, or halt with a fault.
    fn handle_runtime_error(&mut self, error: BasicError) -> StepResult {
        let code = error.code();
        let mut stack = self.stack.borrow_mut();
        if stack.has_error_handler() {
            let handler_line = stack.current_handler_line();
            if self.program.borrow().has_line(handler_line) {
                if stack.record_error(code, self.current_line, 0).is_ok() {
                    drop(stack);
                    self.set_current_line(handler_line);
                    return StepResult::Jumped;
                }
            } else {
                // Handler points at a deleted line: drop it and fall through
                // to the default behavior.
                stack.disable_error_handler();
            }
        }
        drop(stack);
        self.last_fault = Some(RuntimeFault::new(error, self.current_line));
        self.state = LoopState::Halted;
        StepResult::Halted
    }
}

/// Where RESUME should continue, given the popped error frame. Used by
/// statement handlers implementing RESUME / RESUME NEXT / RESUME n.
pub fn resume_target<P: ProgramStore>(
    stack: &mut RuntimeStack,
    program: &P,
    mode: ResumeMode,
) -> BasicResult<u16> {
    let frame = stack.resume()?;
    let target = match mode {
        ResumeMode::Same => frame.resume_line,
        ResumeMode::Next => program.next_line(frame.resume_line),
        ResumeMode::Line(line) => line,
    };
    if target == 0 || !program.has_line(target) {
        return Err(BasicError::UndefinedLineNumber);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_protocol_round_trip() {
        assert_eq!(ExecOutcome::from_override(0), ExecOutcome::Next);
        assert_eq!(ExecOutcome::from_override(0xFFFF), ExecOutcome::Terminate);
        assert_eq!(ExecOutcome::from_override(100), ExecOutcome::Goto(100));
        assert_eq!(ExecOutcome::Goto(100).to_override(), 100);
        assert_eq!(ExecOutcome::Terminate.to_override(), 0xFFFF);
        assert_eq!(ExecOutcome::Next.to_override(), 0);
    }
}
