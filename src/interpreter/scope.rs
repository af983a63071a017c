use crate::error::{ReqError, Result};
use crate::interpreter::value::{Table, Value};

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

pub type ScopeRef = Rc<RefCell<Scope>>;

/// Names the interpreter handles itself; they can never be bound.
pub const RESERVED_NAMES: &[&str] = &[
    "def", "err", "geterr", "errcl", "true", "false", "import", "try", "notry",
];

/// One lexical environment: variables and constants live in separate
/// namespaces, but a name may be bound in only one of them per scope.
/// A variable slot holding `None` is declared but not yet assigned.
#[derive(Debug, Default)]
pub struct Scope {
    parent: Option<ScopeRef>,
    variables: IndexMap<String, Option<Value>>,
    constants: Table,
}

impl Scope {
    pub fn empty() -> Scope {
        Scope::default()
    }

    pub fn new(parent: ScopeRef) -> Scope {
        Scope {
            parent: Some(parent),
            ..Scope::default()
        }
    }

    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::empty()))
    }

    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope::new(Rc::clone(parent))))
    }

    pub fn constants(&self) -> &Table {
        &self.constants
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    /// Removes every binding, leaving the scope empty.
    pub fn take_bindings(&mut self) -> Vec<Value> {
        let variables = self.variables.drain(..).filter_map(|(_, value)| value);
        let constants = self.constants.drain(..).map(|(_, value)| value);

        variables.chain(constants).collect()
    }

    /// Resolves `name`, walking outwards through the parents. Dotted paths
    /// (`a.b.c`) index into nested tables.
    pub fn read(&self, name: &str) -> Result<Value> {
        let mut path = name.split('.');
        let head = path.next().unwrap_or_default();
        let value = self.read_plain(head)?;

        path.try_fold(value, |value, key| {
            if key.is_empty() {
                return Err(ReqError::runtime_error("the dot indexed path cannot be empty"));
            }

            match value {
                Value::Table(mut table) => table
                    .swap_remove(key)
                    .ok_or_else(|| ReqError::runtime_error(format!("key '{}' does not exist", key))),
                other => Err(ReqError::runtime_error(format!(
                    "'{}' is not a dot indexable type",
                    other.type_name()
                ))),
            }
        })
    }

    fn read_plain(&self, name: &str) -> Result<Value> {
        if let Some(slot) = self.variables.get(name) {
            return slot.clone().ok_or_else(|| {
                ReqError::runtime_error(format!(
                    "variable '{}' has not had a value assigned to it yet",
                    name
                ))
            });
        }
        if let Some(value) = self.constants.get(name) {
            return Ok(value.clone());
        }

        match &self.parent {
            Some(parent) => parent.borrow().read_plain(name),
            None => Err(ReqError::undefined(name)),
        }
    }

    /// Declares a variable in this scope; `None` leaves it unassigned.
    pub fn write(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        check_name(name)?;
        if self.variables.contains_key(name) {
            return Err(ReqError::runtime_error(format!(
                "variable '{}' already exists",
                name
            )));
        }
        if self.constants.contains_key(name) {
            return Err(ReqError::runtime_error(format!(
                "'{}' already exists as a constant",
                name
            )));
        }

        self.variables.insert(name.to_string(), value);

        Ok(())
    }

    pub fn write_const(&mut self, name: &str, value: Value) -> Result<()> {
        check_name(name)?;
        if self.constants.contains_key(name) {
            return Err(ReqError::runtime_error(format!(
                "'{}' already exists as a constant",
                name
            )));
        }
        if self.variables.contains_key(name) {
            return Err(ReqError::runtime_error(format!(
                "'{}' already exists as a variable",
                name
            )));
        }

        self.constants.insert(name.to_string(), value);

        Ok(())
    }

    /// Reassigns the nearest variable called `name`. Constants met on the way
    /// out cannot be reassigned.
    pub fn update(&mut self, name: &str, value: Value) -> Result<()> {
        if self.constants.contains_key(name) {
            return Err(ReqError::runtime_error(format!(
                "cannot reassign constant '{}'",
                name
            )));
        }

        if let Some(slot) = self.variables.get_mut(name) {
            *slot = Some(value);
            return Ok(());
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().update(name, value),
            None => Err(ReqError::undefined(name)),
        }
    }

    pub fn load_all<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        values
            .into_iter()
            .try_for_each(|(name, value)| self.write(&name, Some(value)))
    }

    pub fn load_all_const<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        values
            .into_iter()
            .try_for_each(|(name, value)| self.write_const(&name, value))
    }
}

fn check_name(name: &str) -> Result<()> {
    if RESERVED_NAMES.contains(&name) {
        Err(ReqError::runtime_error(format!(
            "'{}' is not a valid variable name",
            name
        )))
    } else {
        Ok(())
    }
}
