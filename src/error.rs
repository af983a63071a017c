use std::error::Error;
use std::{fmt, io};

pub type Result<T> = std::result::Result<T, ReqError>;

/// A line/column pair, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Position {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReqError {
    LexerError(Position, String),
    StructureError(Option<Position>, String),
    RuntimeError(Option<Position>, String),
    Exit(i32),
}

impl ReqError {
    pub fn lexer_error<S>(position: Position, msg: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::LexerError(position, msg.into())
    }

    pub fn structure_error<S>(msg: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::StructureError(None, msg.into())
    }

    pub fn runtime_error<S>(msg: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::RuntimeError(None, msg.into())
    }

    pub fn invalid_operation(operation: &str, left: &str, right: &str) -> ReqError {
        ReqError::runtime_error(format!(
            "invalid operation '{}' for types '{}' and '{}'",
            operation, left, right
        ))
    }

    pub fn invalid_single_operation(operation: &str, operand: &str) -> ReqError {
        ReqError::runtime_error(format!(
            "invalid operation '{}' for type '{}'",
            operation, operand
        ))
    }

    pub fn index_out_of_bounds(index: i64, length: usize) -> ReqError {
        ReqError::runtime_error(format!(
            "index {} out of range for length {}",
            index, length
        ))
    }

    pub fn stack_underflow(expected: usize, got: usize) -> ReqError {
        ReqError::runtime_error(format!(
            "stack underflow: expected {} values, but found {}",
            expected, got
        ))
    }

    pub fn type_mismatch<S, T>(expected: S, got: T) -> ReqError
    where
        S: Into<String>,
        T: Into<String>,
    {
        ReqError::runtime_error(format!(
            "expected type '{}', but found {} instead",
            expected.into(),
            got.into()
        ))
    }

    pub fn undefined<S>(name: S) -> ReqError
    where
        S: Into<String>,
    {
        ReqError::runtime_error(format!(
            "variable/constant '{}' does not exist",
            name.into()
        ))
    }

    /// Tags the error with `position` unless it already carries one.
    pub fn at(self, position: Position) -> ReqError {
        match self {
            ReqError::StructureError(None, msg) => ReqError::StructureError(Some(position), msg),
            ReqError::RuntimeError(None, msg) => ReqError::RuntimeError(Some(position), msg),
            error => error,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            ReqError::LexerError(position, _) => Some(*position),
            ReqError::StructureError(position, _) | ReqError::RuntimeError(position, _) => {
                *position
            }
            ReqError::Exit(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ReqError::LexerError(_, msg)
            | ReqError::StructureError(_, msg)
            | ReqError::RuntimeError(_, msg) => msg.clone(),
            ReqError::Exit(code) => format!("{}{}", EXIT_PREFIX, code),
        }
    }

    /// The exit code carried by the exit signal, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ReqError::Exit(code) => Some(*code),
            _ => None,
        }
    }
}

/// Text prefix of the exit signal.
pub const EXIT_PREFIX: &str = "EXIT CODE ";

impl fmt::Display for ReqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, position, msg) = match self {
            ReqError::LexerError(position, msg) => ("lexer", Some(position), msg),
            ReqError::StructureError(position, msg) => ("structure", position.as_ref(), msg),
            ReqError::RuntimeError(position, msg) => ("runtime", position.as_ref(), msg),
            ReqError::Exit(code) => return write!(f, "{}{}", EXIT_PREFIX, code),
        };

        match position {
            Some(position) => write!(f, "{} error on {}: {}", kind, position, msg),
            None => write!(f, "{} error: {}", kind, msg),
        }
    }
}

impl Error for ReqError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl From<io::Error> for ReqError {
    fn from(error: io::Error) -> Self {
        ReqError::RuntimeError(None, error.to_string())
    }
}
