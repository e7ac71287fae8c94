//! Runtime values — `spec.md` §3.

use crate::diagnostic::{ErrorCode, Position};
use crate::evaluator::callstack::CallFrame;
use crate::parser::ast::{FuncDecl, Param, Type};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type Array = Rc<RefCell<Vec<Value>>>;

#[derive(Debug, Clone)]
pub enum FunctionKind {
    User {
        name: Option<String>,
        params: Vec<Param>,
        return_type: Option<Type>,
        body: Rc<FuncDecl>,
        captured_env: crate::evaluator::environment::Environment,
    },
    Builtin(&'static str),
}

#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub message: String,
    pub position: Position,
    pub hint: Option<String>,
    pub stack: Vec<CallFrame>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error[{}]: {}", self.code, self.message)?;
        write!(f, "  --> {}", self.position)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  help: {hint}")?;
        }
        if !self.stack.is_empty() {
            write!(f, "\nstack trace:")?;
            for frame in self.stack.iter().rev() {
                write!(f, "\n  at {} ({})", frame.function, frame.position)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// The closed sum of runtime values, `spec.md` §3. `Return`, `Break` and
/// `Continue` are control-flow sentinels that must never escape
/// `Eval(Program)` — see `evaluator::mod` for where each is unwrapped.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Array),
    Struct {
        type_name: String,
        field_order: Rc<Vec<String>>,
        fields: Rc<RefCell<HashMap<String, Value>>>,
    },
    Function(Rc<FunctionKind>),
    Return(Box<Value>),
    Break,
    Continue,
    Error(Rc<RuntimeError>),
}

impl Value {
    pub fn new_array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn error(code: ErrorCode, message: impl Into<String>, position: Position) -> Value {
        Value::Error(Rc::new(RuntimeError {
            code,
            message: message.into(),
            position,
            hint: None,
            stack: Vec::new(),
        }))
    }

    pub fn error_with_hint(
        code: ErrorCode,
        message: impl Into<String>,
        position: Position,
        hint: impl Into<String>,
    ) -> Value {
        Value::Error(Rc::new(RuntimeError {
            code,
            message: message.into(),
            position,
            hint: Some(hint.into()),
            stack: Vec::new(),
        }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Struct { .. } => "struct",
            Value::Function(_) => "function",
            Value::Return(_) => "return",
            Value::Break => "break",
            Value::Continue => "continue",
            Value::Error(_) => "error",
        }
    }

    /// Truthiness projection, `spec.md` §4.4.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Struct { .. } => true,
            Value::Function(_) => true,
            Value::Return(_) | Value::Break | Value::Continue => false,
            Value::Error(_) => false,
        }
    }

    /// Value display form, `spec.md` §6.5.
    pub fn display_form(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(a) => {
                let parts: Vec<String> = a.borrow().iter().map(Value::display_form).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Struct {
                type_name,
                field_order,
                fields,
            } => {
                let fields = fields.borrow();
                let parts: Vec<String> = field_order
                    .iter()
                    .filter_map(|name| fields.get(name).map(|v| format!("{name}: {}", v.display_form())))
                    .collect();
                format!("{type_name}{{{}}}", parts.join(", "))
            }
            Value::Function(kind) => match kind.as_ref() {
                FunctionKind::User { params, .. } => {
                    let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                    format!("fn({}) {{ ... }}", params.join(", "))
                }
                FunctionKind::Builtin(name) => format!("fn {name}(...) {{ native }}"),
            },
            Value::Return(v) => v.display_form(),
            Value::Break | Value::Continue => String::new(),
            Value::Error(e) => format!("ERROR: {}", e.message),
        }
    }

    /// Structural equality on base kinds; cross-kind comparisons are always
    /// unequal (`spec.md` §4.4 — `3.0 == 3` is `false`).
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{n:.1}")
    } else {
        let mut s = format!("{n}");
        if !s.contains('.') && !s.contains('e') {
            s.push_str(".0");
        }
        s
    }
}
