use crate::builtin::registry;
use crate::error::{ReqError, Result};
use crate::interpreter::{
    call_function, CallMode, Function, Scope, ScopeRef, Stack, Table, TypeMask, Value,
};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::SCRIPT_EXTENSION;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Runs a token stream against its own stack and scope.
pub struct Interpreter {
    scope: ScopeRef,
    stack: Stack,
    error: String,
    try_mode: bool,
}

impl Interpreter {
    /// A top-level interpreter when `parent` is `None`, otherwise one whose
    /// scope is a child of `parent`. Either way the `__init__` natives are
    /// bound as constants in the new scope.
    pub fn new(parent: Option<&ScopeRef>) -> Result<Interpreter> {
        let scope = match parent {
            Some(parent) => Scope::child(parent),
            None => Scope::root(),
        };
        scope.borrow_mut().load_all_const(registry().init().clone())?;

        Ok(Interpreter {
            scope,
            stack: Stack::new(),
            error: String::new(),
            try_mode: false,
        })
    }

    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }

    /// Contents of the error register.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn try_mode(&self) -> bool {
        self.try_mode
    }

    /// Tokenizes and runs `source`, returning the stack it leaves behind.
    pub fn execute(&mut self, source: &str) -> Result<Vec<Value>> {
        let tokens = tokenize(source)?;

        self.execute_tokens(&tokens)
    }

    pub fn execute_tokens(&mut self, tokens: &[Token]) -> Result<Vec<Value>> {
        self.run(tokens)?;

        Ok(self.stack.values().to_vec())
    }

    /// Constants bound by the program, minus the `__init__` natives.
    pub fn exports(&self) -> Table {
        let registry = registry();
        let init = registry.init();

        self.scope
            .borrow()
            .constants()
            .iter()
            .filter(|(name, _)| !init.contains_key(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Tears the interpreter down, emptying every scope reachable from its
    /// scope and stack. Functions bound in the scope they close over keep that
    /// scope alive through a reference cycle; this breaks those cycles.
    /// Values handed out earlier stay valid, but the functions among them can
    /// no longer see their bindings.
    pub fn release(self) {
        let mut values = self.stack.into_values();
        let mut scopes = vec![self.scope];
        let mut seen = HashSet::new();

        loop {
            if let Some(scope) = scopes.pop() {
                if !seen.insert(Rc::as_ptr(&scope)) {
                    continue;
                }
                let mut scope = scope.borrow_mut();
                values.extend(scope.take_bindings());
                scopes.extend(scope.parent().cloned());
            } else if let Some(value) = values.pop() {
                match value {
                    Value::List(items) => values.extend(items),
                    Value::Table(table) => values.extend(table.into_values()),
                    Value::Function(function) => scopes.extend(function.env().cloned()),
                    Value::Native(handle) => values.extend(handle.downcast_ref::<Value>().cloned()),
                    Value::String(_) | Value::Number(_) => {}
                }
            } else {
                break;
            }
        }

        tracing::debug!(scopes = seen.len(), "released interpreter");
    }

    pub(crate) fn run(&mut self, tokens: &[Token]) -> Result<()> {
        let labels = index_labels(tokens)?;

        let mut ip = 0;
        while ip < tokens.len() {
            let token = &tokens[ip];
            tracing::trace!(ip, token = %token, "dispatch");

            ip = self
                .step(tokens, ip, &labels)
                .map_err(|error| error.at(token.position()))?;
        }

        Ok(())
    }

    /// Executes `tokens[ip]` and returns the index of the next token to run.
    fn step(
        &mut self,
        tokens: &[Token],
        ip: usize,
        labels: &HashMap<&str, usize>,
    ) -> Result<usize> {
        let token = &tokens[ip];

        match token.kind {
            TokenKind::Label => {}
            TokenKind::String => self.stack.push(Value::string(token.literal.as_str())),
            TokenKind::Number => self.stack.push(parse_number(token)?),
            TokenKind::Ident => return self.ident(tokens, ip, labels),
            TokenKind::GetValue => {
                let value = match registry().keyword(&token.literal) {
                    Some(keyword) => keyword.clone(),
                    None => self.scope.borrow().read(&token.literal)?,
                };
                self.stack.push(value);
            }
            TokenKind::Assign => {
                self.stack.expect(&[TypeMask::ANY])?;
                let value = self.stack.pop()?;
                self.scope.borrow_mut().update(&token.literal, value)?;
            }
            TokenKind::Const => {
                self.stack.expect(&[TypeMask::ANY])?;
                let value = self.stack.pop()?;
                self.scope.borrow_mut().write_const(&token.literal, value)?;
            }
            TokenKind::GetIndex => {
                self.stack.expect(&[TypeMask::ANY, TypeMask::ANY])?;
                let index = self.stack.pop()?;
                let indexable = self.stack.pop()?;
                self.stack.push(indexable.get_index(&index)?);
            }
            TokenKind::AssignIndex => {
                self.stack.expect(&[TypeMask::ANY, TypeMask::ANY, TypeMask::ANY])?;
                let item = self.stack.pop()?;
                let index = self.stack.pop()?;
                let mut indexable = self.stack.pop()?;
                indexable.set_index(&index, item)?;
                self.stack.push(indexable);
            }
            TokenKind::ParenOpen => {
                let end = find_close(tokens, ip, |_| true)?;
                let function = self.function_literal(&tokens[ip], &tokens[ip + 1..end])?;
                self.stack.push(function);

                return Ok(end + 1);
            }
            TokenKind::BracketOpen => {
                let end = find_close(tokens, ip, is_list_item)?;
                let list = self.list_literal(&tokens[ip + 1..end])?;
                self.stack.push(list);

                return Ok(end + 1);
            }
            TokenKind::Signature | TokenKind::ParenClose | TokenKind::BracketClose => {
                return Err(
                    token.structure_error(format!("unexpected token '{}'", token.literal))
                );
            }
        }

        Ok(ip + 1)
    }

    fn ident(
        &mut self,
        tokens: &[Token],
        ip: usize,
        labels: &HashMap<&str, usize>,
    ) -> Result<usize> {
        let token = &tokens[ip];

        match token.literal.as_str() {
            "def" => {
                let name = next_ident(tokens, ip)?;
                self.scope
                    .borrow_mut()
                    .write(&name.literal, None)
                    .map_err(|error| error.at(name.position()))?;

                return Ok(ip + 2);
            }
            "err" => {
                let name = next_ident(tokens, ip)?;
                let target = labels.get(name.literal.as_str()).ok_or_else(|| {
                    name.structure_error(format!("label '{}' is not defined", name.literal))
                })?;

                if !self.error.is_empty() {
                    tracing::debug!(label = %name.literal, "jumping on error");
                    return Ok(*target);
                }

                return Ok(ip + 2);
            }
            "geterr" => self.stack.push(Value::string(self.error.as_str())),
            "errcl" => self.error.clear(),
            "true" => self.stack.push(Value::boolean(true)),
            "false" => self.stack.push(Value::boolean(false)),
            "try" => self.try_mode = true,
            "notry" => self.try_mode = false,
            "import" => {
                self.stack.expect(&[TypeMask::STRING])?;
                let name = self.stack.pop_string()?;

                match load_module(&name) {
                    Ok((binding, module)) => {
                        self.scope.borrow_mut().write_const(&binding, module)?
                    }
                    Err(error) => self.recover(error.at(token.position()))?,
                }
            }
            name => {
                let function = match self.scope.borrow().read(name)? {
                    Value::Function(function) => function,
                    other => {
                        return Err(ReqError::runtime_error(format!(
                            "'{}' is not callable",
                            other.type_name()
                        )))
                    }
                };

                let result = call_function(&function, &self.scope, &mut self.stack, CallMode::Private);
                if let Err(error) = result {
                    self.recover(error.at(token.position()))?;
                }
            }
        }

        Ok(ip + 1)
    }

    /// Funnels `error` into the error register under try-mode. The exit
    /// signal always propagates.
    fn recover(&mut self, error: ReqError) -> Result<()> {
        if !self.try_mode || error.exit_code().is_some() {
            return Err(error);
        }

        tracing::debug!(%error, "error funneled into register");
        self.error = error.to_string();

        Ok(())
    }

    fn function_literal(&self, open: &Token, body: &[Token]) -> Result<Value> {
        let signature = match body.first() {
            Some(token) if token.is(TokenKind::Signature) => token,
            Some(token) => {
                return Err(token.structure_error(format!(
                    "expected '|', but found '{}' instead",
                    token.literal
                )))
            }
            None => return Err(open.structure_error("expected '|', but found ')' instead")),
        };

        let function = Function::user(body[1..].to_vec(), Rc::clone(&self.scope), &signature.literal)
            .map_err(|error| error.at(signature.position()))?;

        Ok(Value::function(function))
    }

    fn list_literal(&self, tokens: &[Token]) -> Result<Value> {
        let mut values = vec![];

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::BracketOpen => {
                    let end = find_close(tokens, i, is_list_item)?;
                    values.push(self.list_literal(&tokens[i + 1..end])?);
                    i = end;
                }
                TokenKind::GetValue => values.push(
                    self.scope
                        .borrow()
                        .read(&token.literal)
                        .map_err(|error| error.at(token.position()))?,
                ),
                TokenKind::String => values.push(Value::string(token.literal.as_str())),
                TokenKind::Number => values.push(parse_number(token)?),
                _ => return Err(invalid_in_list(token)),
            }
            i += 1;
        }

        Ok(Value::List(values))
    }
}

/// Maps each label name to its token index. Labels inside `( )` groups belong
/// to the function body and are indexed when that body runs.
fn index_labels(tokens: &[Token]) -> Result<HashMap<&str, usize>> {
    let mut labels = HashMap::new();
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::ParenOpen => depth += 1,
            TokenKind::ParenClose => depth = depth.saturating_sub(1),
            TokenKind::Label if depth == 0 => {
                if labels.insert(token.literal.as_str(), i).is_some() {
                    return Err(token.structure_error(format!(
                        "cannot redefine existing label '{}'",
                        token.literal
                    )));
                }
            }
            _ => {}
        }
    }

    if !labels.is_empty() {
        tracing::debug!(count = labels.len(), "indexed labels");
    }

    Ok(labels)
}

fn closing(open: TokenKind) -> TokenKind {
    match open {
        TokenKind::BracketOpen => TokenKind::BracketClose,
        _ => TokenKind::ParenClose,
    }
}

/// Index of the token closing the group opened at `tokens[start]`. Every
/// token in between, other than nested delimiters, must pass `allowed`.
fn find_close(tokens: &[Token], start: usize, allowed: fn(&Token) -> bool) -> Result<usize> {
    let open = &tokens[start];
    let close = closing(open.kind);
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate().skip(start + 1) {
        if token.is(open.kind) {
            depth += 1;
        } else if token.is(close) {
            if depth == 0 {
                return Ok(i);
            }
            depth -= 1;
        } else if !allowed(token) {
            return Err(invalid_in_list(token));
        }
    }

    let last = tokens.last().unwrap_or(open);
    Err(last.structure_error(format!(
        "no '{}' to match '{}'",
        close.public_name(),
        open.kind.public_name()
    )))
}

fn is_list_item(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::GetValue | TokenKind::String | TokenKind::Number
    )
}

fn invalid_in_list(token: &Token) -> ReqError {
    token.structure_error(format!(
        "token '{}' is not valid inside [ ]",
        token.kind.public_name()
    ))
}

fn parse_number(token: &Token) -> Result<Value> {
    token
        .literal
        .parse::<f32>()
        .map(Value::Number)
        .map_err(|_| token.runtime_error(format!("malformed number '{}'", token.literal)))
}

/// The identifier following the keyword at `tokens[ip]`.
fn next_ident(tokens: &[Token], ip: usize) -> Result<&Token> {
    match tokens.get(ip + 1) {
        Some(token) if token.is(TokenKind::Ident) => Ok(token),
        Some(token) => Err(token.structure_error(format!(
            "expected 'identifier', but found '{}' instead",
            token.literal
        ))),
        None => Err(tokens[ip].structure_error("expected 'identifier', but found end of input")),
    }
}

/// Resolves an import name into the name it binds under and the module table.
/// Names ending in the script extension are run as nested top-level programs;
/// anything else must be a registry module.
pub fn load_module(name: &str) -> Result<(String, Value)> {
    let path = Path::new(name);

    if path.extension().map_or(false, |ext| ext == SCRIPT_EXTENSION) {
        tracing::info!(path = %path.display(), "executing module file");

        let source = fs::read_to_string(path).map_err(|error| {
            ReqError::runtime_error(format!("cannot read module '{}': {}", name, error))
        })?;
        let mut interpreter = Interpreter::new(None)?;
        interpreter.execute(&source)?;

        let binding = path
            .file_stem()
            .map_or_else(|| name.to_string(), |stem| stem.to_string_lossy().to_string());

        return Ok((binding, Value::Table(interpreter.exports())));
    }

    tracing::debug!(module = name, "importing builtin module");

    match registry().importable(name) {
        Some(module) => Ok((name.to_string(), Value::Table(module.clone()))),
        None => Err(ReqError::runtime_error(format!(
            "module '{}' does not exist",
            name
        ))),
    }
}

/// Binds module `name` as a constant in `scope`.
pub fn import_module(scope: &ScopeRef, name: &str) -> Result<()> {
    let (binding, module) = load_module(name)?;

    scope.borrow_mut().write_const(&binding, module)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Position;

    use test_case::test_case;

    fn run(source: &str) -> Result<Vec<Value>> {
        Interpreter::new(None)?.execute(source)
    }

    fn numbers(ns: &[f32]) -> Vec<Value> {
        ns.iter().map(|n| Value::Number(*n)).collect()
    }

    fn list(ns: &[f32]) -> Value {
        Value::List(numbers(ns))
    }

    #[test_case("1 2 +"    , 3.0  ; "add")]
    #[test_case("5 3 -"    , 2.0  ; "sub")]
    #[test_case("4 2.5 *"  , 10.0 ; "mul")]
    #[test_case("7 2 /"    , 3.5  ; "div")]
    #[test_case("-1 20 +"  , 19.0 ; "negative literal")]
    #[test_case("0 not"    , 1.0  ; "not zero")]
    #[test_case("3 not"    , 0.0  ; "not nonzero")]
    #[test_case("1 2 <"    , 1.0  ; "less")]
    #[test_case("\"a\" \"a\" =", 1.0 ; "string equality")]
    #[test_case("\"abc\" len", 3.0 ; "string length")]
    fn single_number(source: &str, expected: f32) {
        assert_eq!(run(source), Ok(vec![Value::Number(expected)]));
    }

    #[test_case("\"a\" \"b\" +"  , Ok(vec![Value::string("ab")])      ; "concat")]
    #[test_case("\"ab\" 3 *"     , Ok(vec![Value::string("ababab")])  ; "repeat")]
    #[test_case("[0 1 2 3 4]"    , Ok(vec![list(&[0.0, 1.0, 2.0, 3.0, 4.0])]) ; "list literal")]
    #[test_case("[0 1 2 3 4] 1 +", Ok(vec![list(&[1.0, 2.0, 3.0, 4.0, 5.0])]) ; "list broadcast")]
    #[test_case("[[1 2] [3]]"    , Ok(vec![Value::List(vec![list(&[1.0, 2.0]), list(&[3.0])])]) ; "nested list")]
    #[test_case("[]"             , Ok(vec![Value::List(vec![])])      ; "empty list")]
    #[test_case("true false"     , Ok(numbers(&[1.0, 0.0]))           ; "booleans")]
    #[test_case("1 2 swap"       , Ok(numbers(&[2.0, 1.0]))           ; "swap")]
    #[test_case("4 10 @range dip", Ok(vec![list(&[0.0, 1.0, 2.0, 3.0]), Value::Number(10.0)]) ; "dip range")]
    #[test_case("4 1 2 @+ dip"   , Ok(numbers(&[5.0, 2.0]))           ; "dip add")]
    #[test_case("\"ab\" 1.5 *"   , Err("runtime error on line 1, col 10: cannot use float value as string multiplier") ; "float multiplier")]
    #[test_case("+"              , Err("runtime error on line 1, col 1: stack underflow: expected 2 values, but found 0") ; "underflow")]
    fn programs(source: &str, expected: std::result::Result<Vec<Value>, &str>) {
        assert_eq!(run(source).map_err(|error| error.to_string()), expected.map_err(String::from));
    }

    #[test_case("1 $x 2 $x"   , "'x' already exists as a constant"                     ; "const twice")]
    #[test_case("5 !x"        , "variable/constant 'x' does not exist"                 ; "assign undeclared")]
    #[test_case("def x x"     , "variable 'x' has not had a value assigned to it yet"  ; "read unassigned")]
    #[test_case("def x @x"    , "variable 'x' has not had a value assigned to it yet"  ; "get unassigned")]
    #[test_case("def 5"       , "expected 'identifier', but found '5' instead"         ; "def needs name")]
    #[test_case("5 $x x"      , "'number' is not callable"                             ; "not callable")]
    #[test_case(")"           , "unexpected token ')'"                                 ; "stray paren")]
    #[test_case("]"           , "unexpected token ']'"                                 ; "stray bracket")]
    #[test_case("(|1.0 dup"   , "no ')' to match '('"                                  ; "unmatched paren")]
    #[test_case("[1 2"        , "no ']' to match '['"                                  ; "unmatched bracket")]
    #[test_case("(dup)"       , "expected '|', but found 'dup' instead"                ; "missing signature")]
    #[test_case("()"          , "expected '|', but found ')' instead"                  ; "empty function")]
    #[test_case("[1 dup]"     , "token 'identifier' is not valid inside [ ]"           ; "list with ident")]
    #[test_case(":a :a"       , "cannot redefine existing label 'a'"                   ; "duplicate label")]
    #[test_case("err nowhere" , "label 'nowhere' is not defined"                       ; "unknown label")]
    #[test_case("[1] 5 @#"    , "index 5 out of range for length 1"                    ; "index out of range")]
    #[test_case("\"nope\" import", "module 'nope' does not exist"                      ; "unknown module")]
    #[test_case("\"__init__\" import", "module '__init__' does not exist"              ; "internal module")]
    #[test_case("\"runtime\" import \"runtime\" import", "'runtime' already exists as a constant" ; "double import")]
    fn failures(source: &str, msg: &str) {
        assert_eq!(run(source).unwrap_err().message(), msg);
    }

    #[test]
    fn error_positions() {
        let error = run("1 2\n  (|1.0 dup").unwrap_err();
        assert_eq!(error.to_string(), "structure error on line 2, col 9: no ')' to match '('");

        let error = run("def x\n 5 !y").unwrap_err();
        assert_eq!(
            error.to_string(),
            "runtime error on line 2, col 4: variable/constant 'y' does not exist"
        );
    }

    #[test]
    fn variables() {
        assert_eq!(
            run("def x 5 !x @x x"),
            Err(ReqError::runtime_error("'number' is not callable").at(Position::new(1, 15)))
        );
        assert_eq!(run("def x 5 !x @x"), Ok(numbers(&[5.0])));
        assert_eq!(run("[1 2] $xs [@xs 3]"), Ok(vec![Value::List(vec![list(&[1.0, 2.0]), Value::Number(3.0)])]));
    }

    #[test]
    fn indexing() {
        assert_eq!(run("[10 20 30] 1 @#"), Ok(numbers(&[20.0])));
        assert_eq!(run("[10 20 30] 1 99 !#"), Ok(vec![list(&[10.0, 99.0, 30.0])]));
        assert_eq!(run("\"abc\" 2 @#"), Ok(vec![Value::string("c")]));
        assert_eq!(run("[1 2] $xs @xs 0 9 !# drop @xs"), Ok(vec![list(&[1.0, 2.0])]));
    }

    #[test_case("1 2 (|2.1 +) call"                     , &[3.0]           ; "same stack call")]
    #[test_case("10 (|2.1 +) $add 1 2 add"              , &[10.0, 3.0]     ; "consumes exactly two")]
    #[test_case("1 2 3 (|1.1 1 +) $inc inc"             , &[1.0, 2.0, 4.0] ; "private stack")]
    #[test_case("5 $five (|0.1 @five) $get get"         , &[5.0]           ; "reads enclosing constant")]
    #[test_case("def n 0 !n (|0.0 @n 1 + !n) $bump bump bump @n", &[2.0]   ; "updates enclosing variable")]
    #[test_case("(|1.1 :top 2 *) $double 3 double"      , &[6.0]           ; "label inside body")]
    #[test_case(":top (|0.1 :top 1) $one one"           , &[1.0]           ; "labels are per body")]
    #[test_case("@+ sig"                                , &[2.1]           ; "native signature")]
    #[test_case("1 2 @+ call"                           , &[3.0]           ; "call native reference")]
    fn functions(source: &str, expected: &[f32]) {
        assert_eq!(run(source), Ok(numbers(expected)));
    }

    #[test]
    fn docs() {
        assert_eq!(run("@+ doc"), Ok(vec![Value::string("Adds two values together")]));
        assert_eq!(
            run("(|0.0) \"does nothing\" setdoc doc"),
            Ok(vec![Value::string("does nothing")])
        );
    }

    #[test_case("try \"a\" 1 - err done 100 :done 7"       , &[7.0]        ; "jumps on error")]
    #[test_case("err done 100 :done 7"                     , &[100.0, 7.0] ; "falls through without error")]
    #[test_case("try \"a\" 1 - errcl err done 1 :done 2"   , &[1.0, 2.0]   ; "errcl prevents jump")]
    #[test_case("try \"a\" 1 - notry 5"                    , &[5.0]        ; "notry after recovery")]
    fn error_register(source: &str, expected: &[f32]) {
        assert_eq!(run(source), Ok(numbers(expected)));
    }

    #[test]
    fn geterr_text() {
        assert_eq!(
            run("try \"a\" 1 - geterr"),
            Ok(vec![Value::string(
                "runtime error on line 1, col 11: invalid operation 'subtraction' for types 'string' and 'number'"
            )])
        );

        let mut interpreter = Interpreter::new(None).unwrap();
        interpreter.execute("try \"nope\" import").unwrap();
        assert!(interpreter.try_mode());
        assert_eq!(
            interpreter.error(),
            "runtime error on line 1, col 12: module 'nope' does not exist"
        );
    }

    #[test_case("try \"ab\" 10000000000 10000000000 * * geterr", 36, "string repetition is too large" ; "string repetition")]
    #[test_case("try 10000000000 10000000000 * range geterr", 31, "range bound is too large, the maximum is 16777216" ; "range")]
    fn oversized_results_are_recoverable(source: &str, column: usize, msg: &str) {
        let text = format!("runtime error on line 1, col {}: {}", column, msg);

        assert_eq!(run(source), Ok(vec![Value::String(text)]));
    }

    #[test]
    fn failures_outside_calls_are_not_recovered() {
        assert_eq!(run("try (|1.0").unwrap_err().message(), "no ')' to match '('");
        assert_eq!(
            run("try 5 !x").unwrap_err(),
            ReqError::undefined("x").at(Position::new(1, 7))
        );
        assert_eq!(
            run("try \"runtime\" import \"runtime\" import").unwrap_err().message(),
            "'runtime' already exists as a constant"
        );
    }

    #[test_case("3 exit"                   , 3 ; "plain")]
    #[test_case("try 3 exit"               , 3 ; "through try")]
    #[test_case("(|0.0 4 exit) $quit try quit", 4 ; "from nested function")]
    #[test_case("try 9 @exit call"         , 9 ; "through call")]
    fn exit_propagates(source: &str, code: i32) {
        assert_eq!(run(source).unwrap_err().exit_code(), Some(code));
    }

    #[test]
    fn builtin_imports() {
        assert_eq!(run("\"runtime\" import runtime.version"), Ok(numbers(&[3.0])));
        assert_eq!(run("\"runtime\" import 1 2 runtime.stacklen"), Ok(numbers(&[1.0, 2.0, 2.0])));
        assert_eq!(run("\"runtime\" @import call runtime.version"), Ok(numbers(&[3.0])));
        assert_eq!(
            run("\"strings\" import \"a b\" \" \" strings.split"),
            Ok(vec![Value::List(vec![Value::string("a"), Value::string("b")])])
        );
    }

    #[test]
    fn file_imports() {
        let path = std::env::temp_dir().join("reqproc_import_test.req");
        fs::write(&path, "5 $five (|1.1 2 *) $double def scratch").unwrap();

        let source = format!(
            "`{}` import @reqproc_import_test.five 3 reqproc_import_test.double @reqproc_import_test len",
            path.display()
        );
        assert_eq!(run(&source), Ok(numbers(&[5.0, 6.0, 2.0])));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn release_frees_closure_scopes() {
        let mut interpreter = Interpreter::new(None).unwrap();
        let root = Rc::downgrade(interpreter.scope());

        let values = interpreter
            .execute("def n 0 !n (|0.0 @n 1 + !n) $bump bump (|0.1 (|0.0 7)) $make make $made @made")
            .unwrap();
        let made = match &values[0] {
            Value::Function(function) => Rc::downgrade(function.env().unwrap()),
            other => panic!("expected a function, found {:?}", other),
        };

        interpreter.release();
        drop(values);

        assert!(root.upgrade().is_none());
        assert!(made.upgrade().is_none());
    }

    #[test]
    fn missing_file_import() {
        let error = run("\"/nonexistent/reqproc/missing.req\" import").unwrap_err();

        assert!(error.message().starts_with("cannot read module '/nonexistent/reqproc/missing.req'"));
    }
}
