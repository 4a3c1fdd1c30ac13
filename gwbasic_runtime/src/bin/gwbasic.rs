//! Interactive front-end: numbered-line program entry, LIST/RUN/SAVE/LOAD,
//! and immediate-mode statements.
//!
//! The statement handler here is deliberately small (PRINT, assignment,
//! GOTO, IF..THEN, GOSUB/RETURN, END); it exists to drive the runtime core
//! interactively, not to be a complete statement dispatcher.

use std::cell::RefCell;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use gwbasic_runtime::{
    format, BasicError, BasicResult, ExecOutcome, GosubFrame, InterpreterLoop, Program,
    ProgramStore, Runtime, RuntimeFault, Value,
};
use gwbasic_tokenizer::Tokenizer;

fn main() {
    let tokenizer = Tokenizer::new();
    let program = Rc::new(RefCell::new(Program::new()));
    let runtime = Rc::new(RefCell::new(Runtime::default()));

    let handler = make_handler(runtime.clone(), program.clone(), tokenizer);
    let stack = runtime.borrow().stack();
    let traps = runtime.borrow().traps();
    let mut interp = InterpreterLoop::new(program.clone(), stack, traps, handler);

    println!("gwbasic runtime front-end");
    println!("Enter numbered lines, or LIST / RUN / NEW / SAVE / LOAD / SYSTEM.");

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("terminal setup failed: {}", e);
            return;
        }
    };

    loop {
        let line = match editor.readline("Ok\n> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("read error: {}", e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        if trimmed.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            match tokenizer.parse_program_line(trimmed) {
                Ok((number, tokens)) => {
                    if tokens.len() <= 1 {
                        program.borrow_mut().remove_line(number);
                    } else {
                        let _ = program.borrow_mut().insert_line(number, tokens);
                    }
                }
                Err(e) => println!("{}", e),
            }
            continue;
        }

        let (command, rest) = split_command(trimmed);
        match command.as_str() {
            "LIST" => {
                for (number, tokens) in program.borrow().iter() {
                    println!("{} {}", number, tokenizer.expand(tokens));
                }
            }
            "RUN" => {
                runtime.borrow_mut().clear();
                interp.run();
                if let Some(fault) = interp.take_fault() {
                    println!("{}", fault);
                }
            }
            "NEW" => {
                program.borrow_mut().clear();
                runtime.borrow_mut().clear();
                interp.reset();
            }
            "SAVE" => match program.borrow().save(file_argument(rest)) {
                Ok(()) => println!("Saved."),
                Err(e) => println!("{}", e),
            },
            "LOAD" => match Program::load(file_argument(rest)) {
                Ok(loaded) => {
                    *program.borrow_mut() = loaded;
                    runtime.borrow_mut().clear();
                    interp.reset();
                }
                Err(e) => println!("{}", e),
            },
            "SYSTEM" | "QUIT" | "EXIT" => break,
            _ => {
                if let Err(e) = interp.execute_immediate(trimmed, &tokenizer) {
                    println!("{}", RuntimeFault::new(e, 0));
                }
            }
        }
    }
}

fn split_command(line: &str) -> (String, &str) {
    let word: String = line
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    (word.clone(), line[word.len()..].trim_start())
}

fn file_argument(rest: &str) -> String {
    rest.trim().trim_matches('"').to_string()
}

fn make_handler(
    runtime: Rc<RefCell<Runtime>>,
    program: Rc<RefCell<Program>>,
    tokenizer: Tokenizer,
) -> Box<dyn FnMut(&[u8], u16) -> BasicResult<ExecOutcome>> {
    Box::new(move |tokens, current_line| {
        let outcome = execute_statement(&runtime, &program, tokenizer, tokens, current_line);
        runtime.borrow().strings().clear_temp();
        outcome
    })
}

fn execute_statement(
    runtime: &Rc<RefCell<Runtime>>,
    program: &Rc<RefCell<Program>>,
    tokenizer: Tokenizer,
    tokens: &[u8],
    current_line: u16,
) -> BasicResult<ExecOutcome> {
    let mut pos = 0usize;
    skip_spaces(tokens, &mut pos);
    if at_end(tokens, pos) || tokens[pos] == b'\'' {
        return Ok(ExecOutcome::Next);
    }

    let keyword = if tokens[pos] >= 0x80 {
        tokenizer.token_name(tokens[pos])
    } else {
        None
    };

    match keyword {
        Some("REM") => Ok(ExecOutcome::Next),
        Some("END") | Some("STOP") => Ok(ExecOutcome::Terminate),
        Some("PRINT") => {
            pos += 1;
            print_statement(runtime, &tokenizer, tokens, pos)?;
            Ok(ExecOutcome::Next)
        }
        Some("GOTO") => {
            pos += 1;
            let target = line_target(runtime, &tokenizer, tokens, &mut pos)?;
            Ok(ExecOutcome::Goto(target))
        }
        Some("GOSUB") => {
            pos += 1;
            let target = line_target(runtime, &tokenizer, tokens, &mut pos)?;
            runtime
                .borrow()
                .stack()
                .borrow_mut()
                .push_gosub(GosubFrame {
                    return_line: current_line,
                    return_cursor: 0,
                })?;
            Ok(ExecOutcome::Goto(target))
        }
        Some("RETURN") => {
            let frame = runtime
                .borrow()
                .stack()
                .borrow_mut()
                .pop_gosub()
                .ok_or_else(|| BasicError::syntax("RETURN without GOSUB", pos))?;
            let next = program.borrow().next_line(frame.return_line);
            if next == 0 {
                Ok(ExecOutcome::Terminate)
            } else {
                Ok(ExecOutcome::Goto(next))
            }
        }
        Some("IF") => {
            pos += 1;
            let condition = {
                let mut rt = runtime.borrow_mut();
                let evaluated = rt.evaluate_at(tokens, pos, &tokenizer)?;
                pos = evaluated.next_pos;
                evaluated.value
            };
            skip_spaces(tokens, &mut pos);
            match tokenizer.token_name(*tokens.get(pos).unwrap_or(&0)) {
                Some("THEN") => pos += 1,
                _ => return Err(BasicError::syntax("THEN expected", pos)),
            }
            let target = line_target(runtime, &tokenizer, tokens, &mut pos)?;
            if condition.truthy() {
                Ok(ExecOutcome::Goto(target))
            } else {
                Ok(ExecOutcome::Next)
            }
        }
        Some("LET") => {
            pos += 1;
            assignment(runtime, &tokenizer, tokens, pos)?;
            Ok(ExecOutcome::Next)
        }
        _ => {
            // Implicit LET, or a bare expression to print.
            if is_assignment(tokens, pos) {
                assignment(runtime, &tokenizer, tokens, pos)?;
            } else {
                print_statement(runtime, &tokenizer, tokens, pos)?;
            }
            Ok(ExecOutcome::Next)
        }
    }
}

fn print_statement(
    runtime: &Rc<RefCell<Runtime>>,
    tokenizer: &Tokenizer,
    tokens: &[u8],
    mut pos: usize,
) -> BasicResult<()> {
    let mut line = String::new();
    loop {
        skip_spaces(tokens, &mut pos);
        if at_end(tokens, pos) || tokens[pos] == b':' {
            break;
        }
        let evaluated = runtime.borrow_mut().evaluate_at(tokens, pos, tokenizer)?;
        pos = evaluated.next_pos;
        match &evaluated.value {
            Value::Str(_) => {
                let rt = runtime.borrow();
                line.push_str(&rt.string_of(&evaluated.value).unwrap_or_default());
            }
            numeric => {
                line.push_str(&format::str_value(numeric)?);
                line.push(' ');
            }
        }
        skip_spaces(tokens, &mut pos);
        if !at_end(tokens, pos) && (tokens[pos] == b';' || tokens[pos] == b',') {
            pos += 1;
            continue;
        }
        break;
    }
    println!("{}", line);
    Ok(())
}

fn assignment(
    runtime: &Rc<RefCell<Runtime>>,
    tokenizer: &Tokenizer,
    tokens: &[u8],
    mut pos: usize,
) -> BasicResult<()> {
    let name = read_identifier(tokens, &mut pos);
    if name.is_empty() {
        return Err(BasicError::syntax("variable expected", pos));
    }
    skip_spaces(tokens, &mut pos);
    if !is_equals(tokenizer, tokens, pos) {
        return Err(BasicError::syntax("= expected", pos));
    }
    pos += 1;
    let value = {
        let mut rt = runtime.borrow_mut();
        rt.evaluate_at(tokens, pos, tokenizer)?.value
    };
    runtime.borrow_mut().assign_scalar(&name, value)
}

fn line_target(
    runtime: &Rc<RefCell<Runtime>>,
    tokenizer: &Tokenizer,
    tokens: &[u8],
    pos: &mut usize,
) -> BasicResult<u16> {
    let evaluated = runtime.borrow_mut().evaluate_at(tokens, *pos, tokenizer)?;
    *pos = evaluated.next_pos;
    let line = evaluated
        .value
        .as_double()?
        .round();
    if !(1.0..=65534.0).contains(&line) {
        return Err(BasicError::UndefinedLineNumber);
    }
    Ok(line as u16)
}

fn is_assignment(tokens: &[u8], mut pos: usize) -> bool {
    let name = read_identifier(tokens, &mut pos);
    if name.is_empty() {
        return false;
    }
    skip_spaces(tokens, &mut pos);
    // 0xE7 is the tokenized "=".
    matches!(tokens.get(pos), Some(&b'=') | Some(&0xE7))
}

fn is_equals(tokenizer: &Tokenizer, tokens: &[u8], pos: usize) -> bool {
    match tokens.get(pos) {
        Some(&b'=') => true,
        Some(&b) if b >= 0x80 => tokenizer.token_name(b) == Some("="),
        _ => false,
    }
}

fn at_end(tokens: &[u8], pos: usize) -> bool {
    pos >= tokens.len() || tokens[pos] == 0x00
}

fn skip_spaces(tokens: &[u8], pos: &mut usize) {
    while *pos < tokens.len() && matches!(tokens[*pos], b' ' | b'\t') {
        *pos += 1;
    }
}

fn read_identifier(tokens: &[u8], pos: &mut usize) -> String {
    let mut id = String::new();
    if *pos < tokens.len() && tokens[*pos].is_ascii_alphabetic() {
        id.push(tokens[*pos] as char);
        *pos += 1;
        while *pos < tokens.len() {
            let c = tokens[*pos];
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
