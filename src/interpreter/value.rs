use crate::error::{ReqError, Result};
use crate::interpreter::Function;

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;
use itertools::Itertools;

bitflags! {
    /// Type classification used by stack arity checks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeMask: u8 {
        const STRING   = 1;
        const NUMBER   = 1 << 1;
        const LIST     = 1 << 2;
        const TABLE    = 1 << 3;
        const FUNCTION = 1 << 4;
        const NATIVE   = 1 << 5;
        const ANY = Self::STRING.bits()
            | Self::NUMBER.bits()
            | Self::LIST.bits()
            | Self::TABLE.bits()
            | Self::FUNCTION.bits()
            | Self::NATIVE.bits();
    }
}

impl TypeMask {
    pub fn accepts(&self, value: &Value) -> bool {
        self.contains(value.mask())
    }
}

impl fmt::Display for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TypeMask::ANY {
            return write!(f, "any");
        }

        #[rustfmt::skip]
        let names = [
            (TypeMask::STRING  , "string"  ),
            (TypeMask::NUMBER  , "number"  ),
            (TypeMask::LIST    , "list"    ),
            (TypeMask::TABLE   , "table"   ),
            (TypeMask::FUNCTION, "function"),
            (TypeMask::NATIVE  , "native"  ),
        ];

        let joined = names
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| name)
            .join("|");

        write!(f, "{}", joined)
    }
}

pub type Table = IndexMap<String, Value>;

/// Longest string, in bytes, that repetition may build.
pub const MAX_STRING_LEN: usize = u32::MAX as usize;

#[derive(Clone)]
pub enum Value {
    String(String),
    Number(f32),
    List(Vec<Value>),
    Table(Table),
    Function(Rc<Function>),
    /// Opaque host handle.
    Native(Rc<dyn Any>),
}

impl Value {
    pub fn string<S>(s: S) -> Value
    where
        S: Into<String>,
    {
        Value::String(s.into())
    }

    pub fn boolean(b: bool) -> Value {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    pub fn function(function: Function) -> Value {
        Value::Function(Rc::new(function))
    }

    pub fn native<T>(handle: T) -> Value
    where
        T: Any,
    {
        Value::Native(Rc::new(handle))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
        }
    }

    pub fn mask(&self) -> TypeMask {
        match self {
            Value::String(_) => TypeMask::STRING,
            Value::Number(_) => TypeMask::NUMBER,
            Value::List(_) => TypeMask::LIST,
            Value::Table(_) => TypeMask::TABLE,
            Value::Function(_) => TypeMask::FUNCTION,
            Value::Native(_) => TypeMask::NATIVE,
        }
    }

    pub fn add(self, other: Value) -> Result<Value> {
        match (self, other) {
            (Value::Number(n), Value::Number(m)) => Ok(Value::Number(n + m)),
            (Value::String(s), Value::String(t)) => Ok(Value::String(s + &t)),
            (Value::List(mut xs), Value::List(ys)) => {
                xs.extend(ys);
                Ok(Value::List(xs))
            }
            (Value::List(xs), other) => broadcast(xs, &other, Value::add),
            (left, right) => Err(ReqError::invalid_operation(
                "addition",
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    pub fn sub(self, other: Value) -> Result<Value> {
        match (self, other) {
            (Value::Number(n), Value::Number(m)) => Ok(Value::Number(n - m)),
            (Value::List(xs), other) if !matches!(other, Value::List(_)) => {
                broadcast(xs, &other, Value::sub)
            }
            (left, right) => Err(ReqError::invalid_operation(
                "subtraction",
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    pub fn mul(self, other: Value) -> Result<Value> {
        match (self, other) {
            (Value::Number(n), Value::Number(m)) => Ok(Value::Number(n * m)),
            (Value::String(s), Value::Number(n)) => {
                if n.fract() != 0.0 {
                    return Err(ReqError::runtime_error(
                        "cannot use float value as string multiplier",
                    ));
                }
                let count = n.max(0.0) as usize;
                if s.len().checked_mul(count).map_or(true, |size| size > MAX_STRING_LEN) {
                    return Err(ReqError::runtime_error("string repetition is too large"));
                }
                Ok(Value::String(s.repeat(count)))
            }
            (Value::List(xs), other) if !matches!(other, Value::List(_)) => {
                broadcast(xs, &other, Value::mul)
            }
            (left, right) => Err(ReqError::invalid_operation(
                "multiplication",
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    pub fn div(self, other: Value) -> Result<Value> {
        match (self, other) {
            (Value::Number(n), Value::Number(m)) => Ok(Value::Number(n / m)),
            (Value::List(xs), other) if !matches!(other, Value::List(_)) => {
                broadcast(xs, &other, Value::div)
            }
            (left, right) => Err(ReqError::invalid_operation(
                "division",
                left.type_name(),
                right.type_name(),
            )),
        }
    }

    pub fn not(&self) -> Result<Value> {
        match self {
            Value::Number(n) => Ok(Value::boolean(*n == 0.0)),
            other => Err(ReqError::invalid_single_operation("not", other.type_name())),
        }
    }

    /// Equality and three-way order; values of different or unordered types are
    /// unequal and unordered.
    pub fn cmp(&self, other: &Value) -> (bool, Option<Ordering>) {
        match (self, other) {
            (Value::Number(n), Value::Number(m)) => (n == m, n.partial_cmp(m)),
            (Value::String(s), Value::String(t)) => (s == t, Some(s.cmp(t))),
            _ => (false, None),
        }
    }

    pub fn len(&self) -> Result<usize> {
        match self {
            Value::String(s) => Ok(s.chars().count()),
            Value::List(xs) => Ok(xs.len()),
            Value::Table(table) => Ok(table.len()),
            other => Err(ReqError::invalid_single_operation("length", other.type_name())),
        }
    }

    pub fn get_index(&self, index: &Value) -> Result<Value> {
        match (self, index) {
            (Value::List(xs), Value::Number(n)) => {
                let i = checked_index(*n, xs.len())?;
                Ok(xs[i].clone())
            }
            (Value::String(s), Value::Number(n)) => {
                let length = s.chars().count();
                let i = checked_index(*n, length)?;
                Ok(Value::String(s.chars().skip(i).take(1).collect()))
            }
            (indexable, index) => Err(ReqError::invalid_operation(
                "index get",
                indexable.type_name(),
                index.type_name(),
            )),
        }
    }

    pub fn set_index(&mut self, index: &Value, item: Value) -> Result<()> {
        match (self, index) {
            (Value::List(xs), Value::Number(n)) => {
                let i = checked_index(*n, xs.len())?;
                xs[i] = item;
                Ok(())
            }
            (indexable, index) => Err(ReqError::invalid_operation(
                "index set",
                indexable.type_name(),
                index.type_name(),
            )),
        }
    }
}

fn broadcast(xs: Vec<Value>, other: &Value, op: fn(Value, Value) -> Result<Value>) -> Result<Value> {
    xs.into_iter()
        .map(|x| op(x, other.clone()))
        .collect::<Result<Vec<Value>>>()
        .map(Value::List)
}

fn checked_index(n: f32, length: usize) -> Result<usize> {
    if n.fract() != 0.0 {
        return Err(ReqError::runtime_error("cannot use float value as index"));
    }
    if n < 0.0 || n as usize >= length {
        return Err(ReqError::index_out_of_bounds(n as i64, length));
    }

    Ok(n as usize)
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(s), Value::String(t)) => s == t,
            (Value::Number(n), Value::Number(m)) => n == m,
            (Value::List(xs), Value::List(ys)) => xs == ys,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Function(f), Value::Function(g)) => Rc::ptr_eq(f, g),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::List(xs) => write!(f, "[{}]", xs.iter().map(|x| format!("{:?}", x)).join(", ")),
            Value::Table(table) => write!(
                f,
                "{{{}}}",
                table
                    .iter()
                    .map(|(key, value)| format!("{}: {:?}", key, value))
                    .join(", ")
            ),
            Value::Function(function) => write!(f, "{}", function),
            Value::Native(handle) => write!(f, "<native {:p}>", Rc::as_ptr(handle)),
        }
    }
}
