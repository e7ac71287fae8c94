//! Runtime environments — `spec.md` §3.
//!
//! A linked chain of frames, innermost first. Closures capture the
//! environment alive at the point of their declaration (`spec.md` §4.4,
//! "Function declarations capture ... by reference to the enclosing
//! environment") by cloning this handle, which shares the underlying frames
//! via `Rc`.

use crate::evaluator::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

struct Binding {
    value: Value,
    mutable: bool,
}

struct Frame {
    bindings: HashMap<String, Binding>,
    parent: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

/// Environments are opaque for debugging purposes — printing one walks a
/// live, potentially cyclic (through closures) runtime structure, so this
/// just names it rather than deriving a recursive `Debug`.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Environment(..)")
    }
}

pub enum AssignError {
    Undefined,
    Immutable,
}

impl Environment {
    pub fn new_global() -> Self {
        Self(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    pub fn new_enclosed(parent: &Environment) -> Self {
        Self(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    /// Binds `name` in this frame, shadowing any outer binding of the same
    /// name. Used for both declarations and function parameter binding.
    pub fn define(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .bindings
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.0.borrow();
        if let Some(binding) = frame.bindings.get(name) {
            return Some(binding.value.clone());
        }
        frame.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Overwrites the nearest enclosing binding of `name` in place, the way
    /// `spec.md` §4.4 requires assignment to update the original frame
    /// rather than shadow it in the current one.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        let mut frame = self.0.borrow_mut();
        if let Some(binding) = frame.bindings.get_mut(name) {
            if !binding.mutable {
                return Err(AssignError::Immutable);
            }
            binding.value = value;
            return Ok(());
        }
        match &frame.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(frame);
                parent.assign(name, value)
            }
            None => Err(AssignError::Undefined),
        }
    }
}
