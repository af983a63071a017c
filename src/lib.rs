pub mod builtin;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod repl;

pub use error::{ReqError, Result};
pub use interpreter::{Interpreter, Value};

/// Runtime version reported by `runtime.version` and the command line.
pub const VERSION: f32 = 3.0;

/// Extension marking an import name as a script file.
pub const SCRIPT_EXTENSION: &str = "req";

pub const INIT_MODULE: &str = "__init__";
pub const KEYWORD_MODULE: &str = "__keyword__";

/// Modules whose names start with this are never importable.
pub const INTERNAL_PREFIX: &str = "__";
