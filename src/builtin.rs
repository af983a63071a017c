//! The native module registry.
//!
//! `__init__` is bound as constants into every interpreter scope, `__keyword__`
//! is only reachable through `@name`, and every other module is brought in
//! with `import`.

use crate::error::{ReqError, Result};
use crate::interpreter::{
    import_module, CallHook, Function, ScopeRef, Stack, Table, TypeMask, Value,
};
use crate::{INIT_MODULE, INTERNAL_PREFIX, KEYWORD_MODULE, VERSION};

use std::cmp::Ordering;
use std::fs;
use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;

/// Longest list `range` builds.
pub const MAX_RANGE: usize = 1 << 24;

pub struct Registry {
    modules: IndexMap<&'static str, Table>,
}

thread_local! {
    static REGISTRY: Rc<Registry> = Rc::new(Registry::standard());
}

/// The registry for this thread, built on first use.
pub fn registry() -> Rc<Registry> {
    REGISTRY.with(Rc::clone)
}

impl Registry {
    pub fn standard() -> Registry {
        let mut modules = IndexMap::new();
        modules.insert(INIT_MODULE, init_module());
        modules.insert(KEYWORD_MODULE, keyword_module());
        modules.insert("runtime", runtime_module());
        modules.insert("io", io_module());
        modules.insert("strings", strings_module());
        modules.insert("ffi", ffi_module());

        Registry { modules }
    }

    pub fn init(&self) -> &Table {
        &self.modules[INIT_MODULE]
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.modules[KEYWORD_MODULE].get(name)
    }

    /// A module `import` may bind; internal modules are never returned.
    pub fn importable(&self, name: &str) -> Option<&Table> {
        if name.starts_with(INTERNAL_PREFIX) {
            None
        } else {
            self.modules.get(name)
        }
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules
            .keys()
            .copied()
            .filter(|name| !name.starts_with(INTERNAL_PREFIX))
    }
}

fn table(entries: Vec<(&str, Function)>) -> Table {
    entries
        .into_iter()
        .map(|(name, function)| (name.to_string(), Value::function(function)))
        .collect()
}

fn binary(stack: &mut Stack, op: fn(Value, Value) -> Result<Value>) -> Result<()> {
    let right = stack.pop()?;
    let left = stack.pop()?;
    stack.push(op(left, right)?);

    Ok(())
}

fn compare(stack: &mut Stack, test: fn(bool, Option<Ordering>) -> bool) -> Result<()> {
    let right = stack.pop()?;
    let left = stack.pop()?;
    let (equal, order) = left.cmp(&right);
    stack.push(Value::boolean(test(equal, order)));

    Ok(())
}

fn whole_number(n: f32, what: &str) -> Result<usize> {
    if n.fract() != 0.0 || n < 0.0 {
        return Err(ReqError::runtime_error(format!(
            "{} must be a whole, non-negative number, found {}",
            what, n
        )));
    }

    Ok(n as usize)
}

fn init_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("exit", Function::native(exit, &[TypeMask::NUMBER], 0)
            .with_doc("Stops the program with the given exit code")),

        // meta
        ("doc", Function::native(doc, &[TypeMask::FUNCTION], 1)
            .with_doc("Returns the docstring of the function it's called on")),
        ("setdoc", Function::native(set_doc, &[TypeMask::FUNCTION, TypeMask::STRING], 1)
            .with_doc("Returns a copy of a function with its docstring replaced")),
        ("sig", Function::native(sig, &[TypeMask::FUNCTION], 1)
            .with_doc("Returns the I/O signature of the function it's called on")),
        ("call", Function::native(call, &[TypeMask::FUNCTION], 0)
            .with_doc("Calls the function on top of the stack")),

        // math
        ("+", Function::native_any(|_, st, _| binary(st, Value::add), 2, 1)
            .with_doc("Adds two values together")),
        ("-", Function::native_any(|_, st, _| binary(st, Value::sub), 2, 1)
            .with_doc("Subtracts one value from another")),
        ("*", Function::native_any(|_, st, _| binary(st, Value::mul), 2, 1)
            .with_doc("Multiplies one value with another")),
        ("/", Function::native_any(|_, st, _| binary(st, Value::div), 2, 1)
            .with_doc("Divides one value by another")),
        ("not", Function::native(not, &[TypeMask::NUMBER], 1)
            .with_doc("Turns 0 into 1 and anything else into 0")),

        // comparison
        ("=", Function::native_any(|_, st, _| compare(st, |equal, _| equal), 2, 1)
            .with_doc("Checks two values for equality")),
        ("<", Function::native_any(|_, st, _| compare(st, |_, order| order == Some(Ordering::Less)), 2, 1)
            .with_doc("Checks if one value is less than another")),
        (">", Function::native_any(|_, st, _| compare(st, |_, order| order == Some(Ordering::Greater)), 2, 1)
            .with_doc("Checks if one value is greater than another")),
        ("len", Function::native_any(len, 1, 1)
            .with_doc("Returns the length of a string, list or table")),

        // stack operations
        ("drop", Function::native_any(|_, st, _| st.pop().map(|_| ()), 1, 0)
            .with_doc("Takes a value off the stack")),
        ("dup", Function::native_any(dup, 1, 2)
            .with_doc("Pops a value off the stack then pushes two of that value back onto the stack")),
        ("swap", Function::native_any(swap, 2, 2)
            .with_doc("Swaps the top two values")),
        ("dip", Function::native(dip, &[TypeMask::ANY, TypeMask::FUNCTION], 1)
            .with_doc("Pops a value off the stack then calls a function")),
        ("range", Function::native(range, &[TypeMask::NUMBER], 1)
            .with_doc("Returns a list counting from 0 up to the given number")),
    ];

    table(entries)
}

fn exit(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let code = stack.pop_number()?;

    Err(ReqError::Exit(code as i32))
}

fn doc(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let function = stack.pop_function()?;
    stack.push(Value::string(function.doc()));

    Ok(())
}

fn set_doc(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let doc = stack.pop_string()?;
    let function = stack.pop_function()?;
    stack.push(Value::function(Function::clone(&function).with_doc(doc)));

    Ok(())
}

fn sig(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let function = stack.pop_function()?;
    stack.push(Value::Number(function.signature()));

    Ok(())
}

fn call(scope: &ScopeRef, stack: &mut Stack, call: &CallHook) -> Result<()> {
    let function = stack.pop_function()?;

    call(&function, scope, stack)
}

fn not(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let value = stack.pop()?;
    stack.push(value.not()?);

    Ok(())
}

fn len(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let value = stack.pop()?;
    stack.push(Value::Number(value.len()? as f32));

    Ok(())
}

fn dup(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let value = stack.pop()?;
    stack.push(value.clone());
    stack.push(value);

    Ok(())
}

fn swap(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let top = stack.pop()?;
    let below = stack.pop()?;
    stack.push(top);
    stack.push(below);

    Ok(())
}

fn dip(scope: &ScopeRef, stack: &mut Stack, call: &CallHook) -> Result<()> {
    let function = stack.pop_function()?;
    let value = stack.pop()?;
    call(&function, scope, stack)?;
    stack.push(value);

    Ok(())
}

fn range(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let n = whole_number(stack.pop_number()?, "range bound")?;
    if n > MAX_RANGE {
        return Err(ReqError::runtime_error(format!(
            "range bound is too large, the maximum is {}",
            MAX_RANGE
        )));
    }
    stack.push(Value::List((0..n).map(|i| Value::Number(i as f32)).collect()));

    Ok(())
}

fn keyword_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("true", Function::native(|_, st, _| { st.push(Value::boolean(true)); Ok(()) }, &[], 1)
            .with_doc("Pushes 1")),
        ("false", Function::native(|_, st, _| { st.push(Value::boolean(false)); Ok(()) }, &[], 1)
            .with_doc("Pushes 0")),
        ("import", Function::native(import, &[TypeMask::STRING], 0)
            .with_doc("Imports a module by name or script path")),
    ];

    table(entries)
}

fn import(scope: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let name = stack.pop_string()?;

    import_module(scope, &name)
}

fn runtime_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("version", Function::native(|_, st, _| { st.push(Value::Number(VERSION)); Ok(()) }, &[], 1)
            .with_doc("Returns the current version of ReqProc")),
        ("stacklen", Function::native(stack_len, &[], 1)
            .with_doc("Returns the length of the stack")),
    ];

    table(entries)
}

fn stack_len(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    stack.push(Value::Number(stack.len() as f32));

    Ok(())
}

fn io_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("put", Function::native_any(|_, st, _| { print!("{}", st.pop()?); Ok(()) }, 1, 0)
            .with_doc("Prints a value")),
        ("putl", Function::native_any(|_, st, _| { println!("{}", st.pop()?); Ok(()) }, 1, 0)
            .with_doc("Prints a value followed by a newline")),
        ("dump", Function::native_any(dump, 0, 0)
            .with_doc("Dumps the entire stack")),
        ("readf", Function::native(read_file, &[TypeMask::STRING], 1)
            .with_doc("Reads a file into a string")),
        ("writef", Function::native(write_file, &[TypeMask::STRING, TypeMask::STRING], 0)
            .with_doc("Writes a string to a file")),
    ];

    table(entries)
}

fn dump(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let values = stack.values();

    println!("stack contents:");
    for (i, value) in values.iter().enumerate().rev() {
        if i + 1 == values.len() {
            println!(" [top] {}: {:?}", i, value);
        } else if i == 0 {
            println!(" [bottom] {}: {:?}", i, value);
        } else {
            println!(" {}: {:?}", i, value);
        }
    }

    Ok(())
}

fn read_file(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let path = stack.pop_string()?;
    let content = fs::read_to_string(&path)?;
    stack.push(Value::String(content));

    Ok(())
}

fn write_file(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let content = stack.pop_string()?;
    let path = stack.pop_string()?;
    fs::write(path, content)?;

    Ok(())
}

fn strings_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("split", Function::native(split, &[TypeMask::STRING, TypeMask::STRING], 1)
            .with_doc("Splits a string on a delimiter")),
        ("join", Function::native(join, &[TypeMask::LIST, TypeMask::STRING], 1)
            .with_doc("Joins the items of a list with a delimiter")),
        ("upper", Function::native(|_, st, _| map_string(st, |s| s.to_uppercase()), &[TypeMask::STRING], 1)
            .with_doc("Uppercases a string")),
        ("lower", Function::native(|_, st, _| map_string(st, |s| s.to_lowercase()), &[TypeMask::STRING], 1)
            .with_doc("Lowercases a string")),
    ];

    table(entries)
}

fn split(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let delimiter = stack.pop_string()?;
    let text = stack.pop_string()?;
    let parts = text.split(delimiter.as_str()).map(Value::string).collect();
    stack.push(Value::List(parts));

    Ok(())
}

fn join(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let delimiter = stack.pop_string()?;
    let items = stack.pop_list()?;
    stack.push(Value::String(items.iter().join(&delimiter)));

    Ok(())
}

fn map_string(stack: &mut Stack, f: fn(&str) -> String) -> Result<()> {
    let s = stack.pop_string()?;
    stack.push(Value::String(f(&s)));

    Ok(())
}

fn ffi_module() -> Table {
    #[rustfmt::skip]
    let entries: Vec<(&str, Function)> = vec![
        ("toNative", Function::native_any(to_native, 1, 1)
            .with_doc("Wraps a value in an opaque native handle")),
        ("fromNative", Function::native(from_native, &[TypeMask::NATIVE], 1)
            .with_doc("Unwraps a value made by toNative")),
    ];

    table(entries)
}

fn to_native(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    let value = stack.pop()?;
    stack.push(Value::native(value));

    Ok(())
}

fn from_native(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
    match stack.pop()? {
        Value::Native(handle) => {
            let value = handle
                .downcast_ref::<Value>()
                .cloned()
                .ok_or_else(|| ReqError::runtime_error("native handle does not wrap a value"))?;
            stack.push(value);

            Ok(())
        }
        other => Err(ReqError::type_mismatch(
            "native",
            format!("'{:?}' of type '{}'", other, other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::interpreter::{call_function, CallMode, Scope};

    use test_case::test_case;

    fn run_native(module: &str, name: &str, inputs: Vec<Value>) -> Result<Vec<Value>> {
        let registry = registry();
        let table = if module == INIT_MODULE {
            registry.init()
        } else {
            registry.importable(module).unwrap()
        };
        let function = match &table[name] {
            Value::Function(function) => Rc::clone(function),
            other => panic!("{} is not a function: {:?}", name, other),
        };

        let mut stack = Stack::new();
        stack.push_all(inputs);
        call_function(&function, &Scope::root(), &mut stack, CallMode::Private)?;

        Ok(stack.into_values())
    }

    #[test]
    fn internal_modules_are_not_importable() {
        let registry = registry();

        assert!(registry.importable(INIT_MODULE).is_none());
        assert!(registry.importable(KEYWORD_MODULE).is_none());
        assert!(registry.importable("io").is_some());
        assert_eq!(
            registry.module_names().collect::<Vec<_>>(),
            vec!["runtime", "io", "strings", "ffi"]
        );
        assert!(registry.keyword("import").is_some());
        assert!(registry.keyword("+").is_none());
    }

    #[test_case("=", 2.0, 2.0, 1.0 ; "equal")]
    #[test_case("=", 2.0, 3.0, 0.0 ; "not equal")]
    #[test_case("<", 2.0, 3.0, 1.0 ; "less")]
    #[test_case("<", 3.0, 3.0, 0.0 ; "not less")]
    #[test_case(">", 4.0, 3.0, 1.0 ; "greater")]
    fn comparisons(name: &str, a: f32, b: f32, expected: f32) {
        let result = run_native(INIT_MODULE, name, vec![Value::Number(a), Value::Number(b)]);

        assert_eq!(result.unwrap(), vec![Value::Number(expected)]);
    }

    #[test]
    fn stack_operations() {
        let (one, two) = (Value::Number(1.0), Value::Number(2.0));

        assert_eq!(
            run_native(INIT_MODULE, "swap", vec![one.clone(), two.clone()]).unwrap(),
            vec![two.clone(), one.clone()]
        );
        assert_eq!(
            run_native(INIT_MODULE, "dup", vec![one.clone()]).unwrap(),
            vec![one.clone(), one.clone()]
        );
        assert_eq!(run_native(INIT_MODULE, "drop", vec![one]).unwrap(), vec![]);
        assert_eq!(
            run_native(INIT_MODULE, "range", vec![Value::Number(3.0)]).unwrap(),
            vec![Value::List(vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)])]
        );
        assert_eq!(
            run_native(INIT_MODULE, "range", vec![Value::Number(1e20)]).unwrap_err(),
            ReqError::runtime_error("range bound is too large, the maximum is 16777216")
        );
        assert_eq!(
            run_native(INIT_MODULE, "range", vec![Value::Number(1.5)]).unwrap_err(),
            ReqError::runtime_error("range bound must be a whole, non-negative number, found 1.5")
        );
    }

    #[test]
    fn exit_signal() {
        assert_eq!(
            run_native(INIT_MODULE, "exit", vec![Value::Number(7.0)]).unwrap_err(),
            ReqError::Exit(7)
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            run_native("strings", "split", vec![Value::string("a,b,c"), Value::string(",")])
                .unwrap(),
            vec![Value::List(vec![
                Value::string("a"),
                Value::string("b"),
                Value::string("c")
            ])]
        );
        assert_eq!(
            run_native(
                "strings",
                "join",
                vec![
                    Value::List(vec![Value::Number(1.0), Value::string("x")]),
                    Value::string("-")
                ]
            )
            .unwrap(),
            vec![Value::string("1-x")]
        );
        assert_eq!(
            run_native("strings", "upper", vec![Value::string("abc")]).unwrap(),
            vec![Value::string("ABC")]
        );
    }

    #[test]
    fn ffi_round_trip() {
        let handle = run_native("ffi", "toNative", vec![Value::Number(20.0)]).unwrap();
        assert_eq!(handle[0].type_name(), "native");

        assert_eq!(
            run_native("ffi", "fromNative", handle).unwrap(),
            vec![Value::Number(20.0)]
        );
        assert_eq!(
            run_native("ffi", "fromNative", vec![Value::native(1u8)]).unwrap_err(),
            ReqError::runtime_error("native handle does not wrap a value")
        );
    }

    #[test]
    fn files() {
        let path = std::env::temp_dir().join("reqproc_builtin_files.txt");
        let path = path.to_string_lossy().to_string();

        run_native(
            "io",
            "writef",
            vec![Value::string(path.as_str()), Value::string("contents")],
        )
        .unwrap();

        assert_eq!(
            run_native("io", "readf", vec![Value::string(path.as_str())]).unwrap(),
            vec![Value::string("contents")]
        );

        let _ = fs::remove_file(&path);
    }
}
