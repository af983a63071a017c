mod function;
mod interpreter;
mod scope;
mod stack;
mod value;

pub use function::{call_function, CallHook, CallMode, Function, NativeFn};
pub use interpreter::{import_module, load_module, Interpreter};
pub use scope::{Scope, ScopeRef, RESERVED_NAMES};
pub use stack::Stack;
pub use value::{Table, TypeMask, Value};
