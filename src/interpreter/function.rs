use crate::error::{ReqError, Result};
use crate::interpreter::{Interpreter, ScopeRef, Stack, TypeMask};
use crate::lexer::Token;

use std::fmt;
use std::rc::Rc;

/// Lets a native invoke another function against the stack it was given.
pub type CallHook = dyn Fn(&Function, &ScopeRef, &mut Stack) -> Result<()>;

pub type NativeFn = fn(&ScopeRef, &mut Stack, &CallHook) -> Result<()>;

#[derive(Clone)]
pub enum Body {
    Native(NativeFn),
    /// A token slice closed over the scope it was defined in.
    Tokens { tokens: Rc<[Token]>, env: ScopeRef },
}

#[derive(Clone)]
pub struct Function {
    body: Body,
    input: Vec<TypeMask>,
    output: usize,
    doc: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// The callee gets its own stack, seeded with its inputs; whatever it
    /// leaves behind is pushed back onto the caller's stack.
    Private,
    /// The callee runs directly on the caller's stack.
    SameStack,
}

impl Function {
    pub fn native(native: NativeFn, input: &[TypeMask], output: usize) -> Function {
        Function {
            body: Body::Native(native),
            input: input.to_vec(),
            output,
            doc: String::new(),
        }
    }

    /// A native taking `inputs` values of any type.
    pub fn native_any(native: NativeFn, inputs: usize, output: usize) -> Function {
        Function::native(native, &vec![TypeMask::ANY; inputs], output)
    }

    /// A function literal body; `signature` is the literal text of its `|` token.
    pub fn user(tokens: Vec<Token>, env: ScopeRef, signature: &str) -> Result<Function> {
        let (inputs, output) = parse_signature(signature)?;

        Ok(Function {
            body: Body::Tokens {
                tokens: tokens.into(),
                env,
            },
            input: vec![TypeMask::ANY; inputs],
            output,
            doc: String::new(),
        })
    }

    pub fn with_doc<S>(mut self, doc: S) -> Function
    where
        S: Into<String>,
    {
        self.doc = doc.into();
        self
    }

    /// The scope a function literal closed over.
    pub fn env(&self) -> Option<&ScopeRef> {
        match &self.body {
            Body::Tokens { env, .. } => Some(env),
            Body::Native(_) => None,
        }
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, Body::Native(_))
    }

    /// Input count in the integer part, output count in the first decimal.
    pub fn signature(&self) -> f32 {
        self.input.len() as f32 + self.output as f32 / 10.0
    }
}

/// Splits `2.1` into two inputs and one output.
fn parse_signature(text: &str) -> Result<(usize, usize)> {
    let malformed = || ReqError::structure_error(format!("malformed function signature '{}'", text));

    if text.starts_with('-') {
        return Err(ReqError::structure_error(format!(
            "function signature '{}' cannot be negative",
            text
        )));
    }

    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let inputs = whole.parse::<usize>().map_err(|_| malformed())?;
    let output = match fraction.chars().next() {
        Some(digit) => digit.to_digit(10).ok_or_else(malformed)? as usize,
        None => 0,
    };

    Ok((inputs, output))
}

/// Invokes `function` on behalf of code running in `scope`.
pub fn call_function(
    function: &Function,
    scope: &ScopeRef,
    stack: &mut Stack,
    mode: CallMode,
) -> Result<()> {
    stack.expect(&function.input)?;

    match &function.body {
        Body::Native(native) => native(scope, stack, &same_stack),
        Body::Tokens { tokens, env } => {
            tracing::debug!(signature = function.signature(), ?mode, "calling function");

            let mut interpreter = Interpreter::new(Some(env))?;
            match mode {
                CallMode::Private => {
                    let inputs = stack.pop_n(function.input.len())?;
                    interpreter.stack_mut().push_all(inputs);
                    interpreter.run(tokens)?;
                    stack.push_all(interpreter.into_stack().into_values());

                    Ok(())
                }
                CallMode::SameStack => {
                    std::mem::swap(interpreter.stack_mut(), stack);
                    let result = interpreter.run(tokens);
                    std::mem::swap(interpreter.stack_mut(), stack);

                    result
                }
            }
        }
    }
}

fn same_stack(function: &Function, scope: &ScopeRef, stack: &mut Stack) -> Result<()> {
    call_function(function, scope, stack, CallMode::SameStack)
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_native() { "native function" } else { "function" };

        write!(f, "<{} |{}.{}>", kind, self.input.len(), self.output)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("native", &self.is_native())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("doc", &self.doc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::interpreter::{Scope, Value};

    use test_case::test_case;

    #[test_case("2.1" , Ok((2, 1)) ; "two in one out")]
    #[test_case("0"   , Ok((0, 0)) ; "nothing")]
    #[test_case("1.25", Ok((1, 2)) ; "first decimal only")]
    #[test_case("3."  , Ok((3, 0)) ; "trailing dot")]
    #[test_case("-1.1", Err("function signature '-1.1' cannot be negative") ; "negative")]
    fn signatures(text: &str, expected: std::result::Result<(usize, usize), &str>) {
        assert_eq!(parse_signature(text), expected.map_err(ReqError::structure_error));
    }

    fn double(_: &ScopeRef, stack: &mut Stack, _: &CallHook) -> Result<()> {
        let n = stack.pop_number()?;
        stack.push(Value::Number(n * 2.0));
        Ok(())
    }

    fn apply(scope: &ScopeRef, stack: &mut Stack, call: &CallHook) -> Result<()> {
        let function = stack.pop_function()?;
        call(&function, scope, stack)
    }

    #[test]
    fn native_call_checks_input() {
        let scope = Scope::root();
        let function = Function::native(double, &[TypeMask::NUMBER], 1);
        let mut stack = Stack::new();
        stack.push(Value::string("x"));

        assert_eq!(
            call_function(&function, &scope, &mut stack, CallMode::Private).unwrap_err(),
            ReqError::type_mismatch("number", "'\"x\"' of type 'string'")
        );
        assert_eq!(stack.len(), 1);
        assert_eq!(function.signature(), 1.1);
    }

    #[test]
    fn native_hook_reenters() {
        let scope = Scope::root();
        let apply = Function::native(apply, &[TypeMask::ANY, TypeMask::FUNCTION], 1);
        let mut stack = Stack::new();
        stack.push(Value::Number(4.0));
        stack.push(Value::function(Function::native(double, &[TypeMask::NUMBER], 1)));

        call_function(&apply, &scope, &mut stack, CallMode::Private).unwrap();

        assert_eq!(stack.values(), &[Value::Number(8.0)]);
    }

    #[test]
    fn doc_and_display() {
        let function = Function::native_any(double, 2, 1).with_doc("doubles");

        assert_eq!(function.doc(), "doubles");
        assert_eq!(function.to_string(), "<native function |2.1>");
    }
}
