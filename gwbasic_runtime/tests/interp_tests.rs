//! Interpreter loop behavior: stepping, jumps, error dispatch with ON ERROR
//! and RESUME, waiting, tracing, and immediate mode.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use gwbasic_runtime::{
    BasicError, EventTrapSystem, ExecOutcome, InterpreterLoop, LoopState, Program, ResumeMode,
    Runtime, RuntimeStack, StepResult, Value,
};
use gwbasic_tokenizer::Tokenizer;

type SharedProgram = Rc<RefCell<Program>>;

fn program_with_lines(lines: &[u16]) -> SharedProgram {
    let mut program = Program::new();
    for &n in lines {
        // Line content is irrelevant to these tests; handlers key on the
        // line number.
        program.insert_line(n, vec![n as u8, 0]).unwrap();
    }
    Rc::new(RefCell::new(program))
}

fn new_loop(
    program: SharedProgram,
    handler: Box<dyn FnMut(&[u8], u16) -> Result<ExecOutcome, BasicError>>,
) -> (
    InterpreterLoop<Program>,
    Rc<RefCell<RuntimeStack>>,
    Rc<RefCell<EventTrapSystem>>,
) {
    let stack = Rc::new(RefCell::new(RuntimeStack::new()));
    let traps = Rc::new(RefCell::new(EventTrapSystem::new()));
    let interp = InterpreterLoop::new(program, stack.clone(), traps.clone(), handler);
    (interp, stack, traps)
}

#[test]
fn test_sequential_execution_to_end() {
    let program = program_with_lines(&[10, 20, 30]);
    let executed = Rc::new(RefCell::new(Vec::new()));
    let log = executed.clone();
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(move |_, line| {
            log.borrow_mut().push(line);
            Ok(ExecOutcome::Next)
        }),
    );
    interp.run();
    assert_eq!(*executed.borrow(), vec![10, 20, 30]);
    assert_eq!(interp.state(), LoopState::Halted);
    assert!(interp.last_fault().is_none());
}

#[test]
fn test_goto_jumps_and_terminate_halts() {
    let program = program_with_lines(&[10, 20, 30]);
    let executed = Rc::new(RefCell::new(Vec::new()));
    let log = executed.clone();
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(move |_, line| {
            log.borrow_mut().push(line);
            match line {
                10 => Ok(ExecOutcome::Goto(30)),
                30 => Ok(ExecOutcome::Terminate),
                _ => Ok(ExecOutcome::Next),
            }
        }),
    );
    interp.run();
    // Line 20 is skipped.
    assert_eq!(*executed.borrow(), vec![10, 30]);
}

#[test]
fn test_goto_missing_line_faults() {
    let program = program_with_lines(&[10]);
    let (mut interp, _, _) = new_loop(program, Box::new(|_, _| Ok(ExecOutcome::Goto(999))));
    interp.run();
    let fault = interp.last_fault().expect("fault expected");
    assert_eq!(fault.error, BasicError::UndefinedLineNumber);
    assert_eq!(fault.line, 10);
}

#[test]
fn test_unhandled_error_halts_with_fault() {
    let program = program_with_lines(&[10, 20]);
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(|_, line| {
            if line == 20 {
                Err(BasicError::TypeMismatch)
            } else {
                Ok(ExecOutcome::Next)
            }
        }),
    );
    interp.run();
    let fault = interp.last_fault().expect("fault expected");
    assert_eq!(fault.error, BasicError::TypeMismatch);
    assert_eq!(fault.line, 20);
    assert_eq!(format!("{}", fault), "Type mismatch in 20");
}

#[test]
fn test_on_error_dispatch_and_resume_next() {
    // 10: fail once; 1000: handler records ERR/ERL, resumes at next line;
    // 20: completes normally; 30: END so execution never falls into the
    // handler.
    let program = program_with_lines(&[10, 20, 30, 1000]);
    let observed = Rc::new(RefCell::new((0u16, 0u16)));
    let seen = observed.clone();
    let completed = Rc::new(RefCell::new(Vec::new()));
    let done = completed.clone();

    let stack_outer = Rc::new(RefCell::new(RuntimeStack::new()));
    let stack_for_handler = stack_outer.clone();
    let program_for_handler = program.clone();

    let traps = Rc::new(RefCell::new(EventTrapSystem::new()));
    let mut interp = InterpreterLoop::new(
        program.clone(),
        stack_outer.clone(),
        traps,
        Box::new(move |_, line| match line {
            10 => Err(BasicError::DivisionByZero),
            30 => Ok(ExecOutcome::Terminate),
            1000 => {
                let mut stack = stack_for_handler.borrow_mut();
                *seen.borrow_mut() = (stack.err_code(), stack.erl());
                let target = gwbasic_runtime::interp::resume_target(
                    &mut stack,
                    &*program_for_handler.borrow(),
                    ResumeMode::Next,
                )?;
                Ok(ExecOutcome::Goto(target))
            }
            other => {
                done.borrow_mut().push(other);
                Ok(ExecOutcome::Next)
            }
        }),
    );

    stack_outer.borrow_mut().set_error_handler(1000);
    interp.run();

    assert_eq!(*observed.borrow(), (11, 10)); // code 11 at line 10
    assert_eq!(*completed.borrow(), vec![20]);
    assert!(interp.last_fault().is_none());
    // The dispatch frame was popped by RESUME.
    assert_eq!(stack_outer.borrow().err_code(), 0);
}

#[test]
fn test_error_with_handler_line_missing_falls_through() {
    let program = program_with_lines(&[10]);
    let (mut interp, stack, _) = new_loop(program, Box::new(|_, _| Err(BasicError::Overflow)));
    stack.borrow_mut().set_error_handler(5000); // no such line
    interp.run();
    let fault = interp.last_fault().expect("fault expected");
    assert_eq!(fault.error, BasicError::Overflow);
    assert!(!stack.borrow().has_error_handler());
}

#[test]
fn test_error_inside_handler_is_fatal() {
    let program = program_with_lines(&[10, 1000]);
    let (mut interp, stack, _) = new_loop(
        program,
        Box::new(|_, line| match line {
            10 => Err(BasicError::DivisionByZero),
            // The handler itself fails; no re-dispatch.
            _ => Err(BasicError::TypeMismatch),
        }),
    );
    stack.borrow_mut().set_error_handler(1000);
    interp.run();
    let fault = interp.last_fault().expect("fault expected");
    assert_eq!(fault.error, BasicError::TypeMismatch);
    assert_eq!(fault.line, 1000);
}

#[test]
fn test_waiting_suspends_and_cont_resumes() {
    let program = program_with_lines(&[10, 20]);
    let asked = Rc::new(RefCell::new(false));
    let flag = asked.clone();
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(move |_, line| {
            if line == 10 && !*flag.borrow() {
                *flag.borrow_mut() = true;
                Ok(ExecOutcome::Waiting)
            } else {
                Ok(ExecOutcome::Next)
            }
        }),
    );
    interp.run();
    assert_eq!(interp.state(), LoopState::Waiting);
    assert_eq!(interp.current_line(), 10);
    interp.cont();
    assert_eq!(interp.state(), LoopState::Halted);
}

#[test]
fn test_trace_hook_sees_lines_before_execution() {
    let program = program_with_lines(&[10, 20]);
    let traced = Rc::new(RefCell::new(Vec::new()));
    let sink = traced.clone();
    let (mut interp, _, _) = new_loop(program, Box::new(|_, _| Ok(ExecOutcome::Next)));
    interp.set_trace(Box::new(move |line, tokens| {
        sink.borrow_mut().push((line, tokens.to_vec()));
    }));
    interp.run();
    assert_eq!(traced.borrow().len(), 2);
    assert_eq!(traced.borrow()[0].0, 10);
    assert_eq!(traced.borrow()[1].0, 20);
}

#[test]
fn test_stop_halts_between_statements() {
    let program = program_with_lines(&[10, 20]);
    let (mut interp, _, _) = new_loop(program, Box::new(|_, _| Ok(ExecOutcome::Next)));
    interp.run();
    interp.stop();
    assert_eq!(interp.step(), StepResult::Halted);
}

#[test]
fn test_immediate_mode_runs_one_statement() {
    let tokenizer = Tokenizer::new();
    let runtime = Rc::new(RefCell::new(Runtime::default()));
    let rt = runtime.clone();
    let program = Rc::new(RefCell::new(Program::new()));
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(move |tokens, line| {
            assert_eq!(line, 0);
            let value = rt.borrow_mut().evaluate(tokens, &Tokenizer::new())?;
            rt.borrow_mut().assign_scalar("R", value)?;
            Ok(ExecOutcome::Next)
        }),
    );
    interp
        .execute_immediate("2 + 3 * 4", &tokenizer)
        .unwrap();
    let result = runtime.borrow_mut().get_scalar("R").unwrap();
    assert!(matches!(result, Value::Single(v) if v == 14.0));
}

#[test]
fn test_immediate_mode_does_not_poll_traps() {
    let tokenizer = Tokenizer::new();
    let program = Rc::new(RefCell::new(Program::new()));
    let (mut interp, _, traps) = new_loop(program, Box::new(|_, _| Ok(ExecOutcome::Next)));
    traps.borrow_mut().set_key_trap(1, 1000);
    traps.borrow_mut().inject_key_event(58, true);
    interp.execute_immediate("1", &tokenizer).unwrap();
    // The trigger is still pending for the next program-mode step.
    assert!(traps.borrow().has_triggered());
}

#[test]
fn test_run_resets_previous_fault() {
    let program = program_with_lines(&[10]);
    let failed = Rc::new(RefCell::new(true));
    let toggle = failed.clone();
    let (mut interp, _, _) = new_loop(
        program,
        Box::new(move |_, _| {
            if *toggle.borrow() {
                *toggle.borrow_mut() = false;
                Err(BasicError::Overflow)
            } else {
                Ok(ExecOutcome::Next)
            }
        }),
    );
    interp.run();
    assert!(interp.last_fault().is_some());
    interp.run();
    assert!(interp.last_fault().is_none());
}
