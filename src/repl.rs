use crate::error::{ReqError, Result};
use crate::interpreter::{Interpreter, Stack};

use std::io;

use itertools::Itertools;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = ">> ";
const QUIT: &str = "quit";

/// The lines accepted so far. Every new line re-runs the whole program in a
/// fresh interpreter, so a line is kept only if the program still succeeds.
#[derive(Debug, Default)]
pub struct Session {
    lines: Vec<String>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    pub fn eval(&mut self, line: &str) -> Result<Stack> {
        let source = self.lines.iter().map(String::as_str).chain([line]).join("\n");

        let mut interpreter = Interpreter::new(None)?;
        let result = interpreter.execute(&source);
        interpreter.release();

        let mut stack = Stack::new();
        stack.push_all(result?);
        self.lines.push(line.to_string());

        Ok(stack)
    }

    pub fn program(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn repl() -> Result<()> {
    let mut editor = DefaultEditor::new().map_err(readline_error)?;
    let mut session = Session::new();

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(readline_error(err)),
        };

        match line.trim() {
            QUIT => return Ok(()),
            "" => continue,
            line => {
                editor.add_history_entry(line).ok();

                match session.eval(line) {
                    Ok(stack) => println!("{}", stack),
                    Err(ReqError::Exit(code)) => {
                        println!("exited with code {}", code);
                        return Ok(());
                    }
                    Err(err) => println!("{}", err),
                }
            }
        }
    }
}

fn readline_error(err: ReadlineError) -> ReqError {
    ReqError::from(io::Error::new(io::ErrorKind::Other, err))
}
