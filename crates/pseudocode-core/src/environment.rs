//! Binding store for one call frame.
//!
//! Variables belong to the frame. Constants, procedures and functions are
//! shared tables that a call frame receives as a snapshot: the tables are
//! reference counted and copied on the first write, so a frame never sees
//! declarations made later by another frame.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Callable;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    constants: Rc<HashMap<String, Value>>,
    procedures: Rc<HashMap<String, Rc<Callable>>>,
    functions: Rc<HashMap<String, Rc<Callable>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh frame for a procedure or function call: no variables, and
    /// snapshots of this frame's constant and callable tables.
    pub fn call_frame(&self) -> Environment {
        Environment {
            variables: HashMap::new(),
            constants: Rc::clone(&self.constants),
            procedures: Rc::clone(&self.procedures),
            functions: Rc::clone(&self.functions),
        }
    }

    fn ensure_undeclared(&self, name: &str) -> Result<()> {
        if self.constants.contains_key(name) {
            return Err(Error::runtime(format!("{} is already declared as a constant", name)));
        }
        if self.variables.contains_key(name) {
            return Err(Error::runtime(format!("Variable {} already declared", name)));
        }
        Ok(())
    }

    pub fn declare_variable(&mut self, name: &str, value: Value) -> Result<()> {
        self.ensure_undeclared(name)?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn declare_constant(&mut self, name: &str, value: Value) -> Result<()> {
        self.ensure_undeclared(name)?;
        Rc::make_mut(&mut self.constants).insert(name.to_string(), value);
        Ok(())
    }

    /// Bind a parameter or loop variable, replacing any variable of the same
    /// name. Constants cannot be rebound.
    pub fn bind(&mut self, name: &str, value: Value) -> Result<()> {
        if self.constants.contains_key(name) {
            return Err(Error::runtime(format!("Cannot assign to constant {}", name)));
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Read a variable or constant.
    pub fn lookup(&self, name: &str) -> Result<&Value> {
        self.variables
            .get(name)
            .or_else(|| self.constants.get(name))
            .ok_or_else(|| Error::runtime(format!("Undeclared variable {}", name)))
    }

    /// Mutable access to a declared variable.
    pub fn variable_mut(&mut self, name: &str) -> Result<&mut Value> {
        if self.constants.contains_key(name) {
            return Err(Error::runtime(format!("Cannot assign to constant {}", name)));
        }
        self.variables
            .get_mut(name)
            .ok_or_else(|| Error::runtime(format!("Undeclared variable {}", name)))
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        *self.variable_mut(name)? = value;
        Ok(())
    }

    /// Register a procedure, replacing any earlier one of the same name.
    pub fn define_procedure(&mut self, callable: Rc<Callable>) {
        Rc::make_mut(&mut self.procedures).insert(callable.name.name.clone(), callable);
    }

    /// Register a function, replacing any earlier one of the same name.
    pub fn define_function(&mut self, callable: Rc<Callable>) {
        Rc::make_mut(&mut self.functions).insert(callable.name.name.clone(), callable);
    }

    pub fn procedure(&self, name: &str) -> Option<Rc<Callable>> {
        self.procedures.get(name).cloned()
    }

    pub fn function(&self, name: &str) -> Option<Rc<Callable>> {
        self.functions.get(name).cloned()
    }
}
