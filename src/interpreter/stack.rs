use crate::error::{ReqError, Result};
use crate::interpreter::{Function, TypeMask, Value};

use std::fmt;
use std::rc::Rc;

use itertools::Itertools;

/// The operand stack. The top is the end of the underlying vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack { values: vec![] }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn push_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.values.extend(values);
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.values
            .pop()
            .ok_or_else(|| ReqError::stack_underflow(1, 0))
    }

    /// Removes the top `n` values, keeping their order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.values.len() {
            return Err(ReqError::stack_underflow(n, self.values.len()));
        }

        Ok(self.values.split_off(self.values.len() - n))
    }

    pub fn pop_number(&mut self) -> Result<f32> {
        match self.pop()? {
            Value::Number(n) => Ok(n),
            other => Err(mismatch(TypeMask::NUMBER, &other)),
        }
    }

    pub fn pop_string(&mut self) -> Result<String> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(TypeMask::STRING, &other)),
        }
    }

    pub fn pop_list(&mut self) -> Result<Vec<Value>> {
        match self.pop()? {
            Value::List(xs) => Ok(xs),
            other => Err(mismatch(TypeMask::LIST, &other)),
        }
    }

    pub fn pop_function(&mut self) -> Result<Rc<Function>> {
        match self.pop()? {
            Value::Function(function) => Ok(function),
            other => Err(mismatch(TypeMask::FUNCTION, &other)),
        }
    }

    /// Checks that the top `masks.len()` values match `masks` without touching
    /// the stack. Masks are given in push order: the first mask is checked
    /// against the deepest of the inspected values, the last against the top.
    pub fn expect(&self, masks: &[TypeMask]) -> Result<()> {
        if masks.len() > self.values.len() {
            return Err(ReqError::stack_underflow(masks.len(), self.values.len()));
        }

        let window = &self.values[self.values.len() - masks.len()..];
        for (mask, value) in masks.iter().zip(window) {
            if !mask.accepts(value) {
                return Err(mismatch(*mask, value));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

fn mismatch(expected: TypeMask, found: &Value) -> ReqError {
    ReqError::type_mismatch(
        expected.to_string(),
        format!("'{:?}' of type '{}'", found, found.type_name()),
    )
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.values.iter().map(|v| format!("{:?}", v)).join(", "))
    }
}
