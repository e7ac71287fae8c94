//! The tree-walking evaluator — `spec.md` §4.4.

pub mod builtins;
pub mod callstack;
pub mod environment;
pub mod value;

use crate::diagnostic::{ErrorCode, Position};
use crate::parser::ast::*;
use callstack::{CallStack, FrameTag};
use environment::{AssignError, Environment};
use log::{trace, warn};
use std::collections::HashMap;
use std::rc::Rc;
use value::{FunctionKind, Value};

pub struct Evaluator {
    env: Environment,
    call_stack: CallStack,
    /// type name → declared field order, registered from both top-level
    /// struct declarations seen so far and a hoisting pre-pass (see
    /// `DESIGN.md`) so forward references from function bodies resolve.
    structs: HashMap<String, Vec<String>>,
}

/// Runs `program` to completion, `spec.md` §6.3. The return value is the
/// last evaluated value (or `Null`), unless evaluation produced an error, in
/// which case the error is the returned value itself.
pub fn evaluate(program: &Program) -> Value {
    trace!("evaluating {} top-level declaration(s)", program.declarations.len());
    let mut evaluator = Evaluator::new();
    evaluator.hoist_structs(program);
    evaluator
        .call_stack
        .push("<program>", Position::default(), FrameTag::Program);
    let result = evaluator.eval_program(program);
    evaluator.call_stack.pop();
    result
}

impl Evaluator {
    fn new() -> Self {
        let env = Environment::new_global();
        for name in builtins::names() {
            env.define(name, Value::Function(Rc::new(FunctionKind::Builtin(name))), false);
        }
        Self {
            env,
            call_stack: CallStack::new(),
            structs: HashMap::new(),
        }
    }

    fn hoist_structs(&mut self, program: &Program) {
        for decl in &program.declarations {
            if let Declaration::Struct(s) = decl {
                self.structs
                    .insert(s.name.clone(), s.fields.iter().map(|f| f.name.clone()).collect());
            }
        }
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, position: Position) -> Value {
        self.call_stack.touch(position);
        Value::Error(Rc::new(value::RuntimeError {
            code,
            message: message.into(),
            position,
            hint: None,
            stack: self.call_stack.snapshot(),
        }))
    }

    /// A plain (non-slice) index out of range, distinguishing a negative
    /// index with its own hint from a positive one past the end
    /// (`SPEC_FULL.md` §15, "Negative non-slice indices").
    fn index_error(&mut self, idx: i64, len: usize, position: Position) -> Value {
        if idx < 0 {
            self.call_stack.touch(position);
            self.attach_stack(Value::error_with_hint(
                ErrorCode::RuntimeError,
                format!("negative index {idx} is not allowed here"),
                position,
                "negative index",
            ))
        } else {
            self.error(
                ErrorCode::RuntimeError,
                format!("index {idx} out of bounds (length {len})"),
                position,
            )
        }
    }

    /// Fills in the call-stack snapshot on a `Value::Error` that was built
    /// without one (e.g. by a builtin, which has no access to the stack).
    /// Also moves the innermost frame's position to the error's own
    /// position, so a builtin's error satisfies the same "top frame
    /// position equals error position" invariant a directly-constructed
    /// one does (`spec.md` §8, testable property 4).
    fn attach_stack(&mut self, value: Value) -> Value {
        match value {
            Value::Error(e) if e.stack.is_empty() => {
                self.call_stack.touch(e.position);
                Value::Error(Rc::new(value::RuntimeError {
                    stack: self.call_stack.snapshot(),
                    ..(*e).clone()
                }))
            }
            other => other,
        }
    }

    fn eval_program(&mut self, program: &Program) -> Value {
        let mut result = Value::Null;
        for decl in &program.declarations {
            result = self.eval_declaration(decl);
            if result.is_error() {
                return result;
            }
        }
        result
    }

    fn eval_declaration(&mut self, decl: &Declaration) -> Value {
        match decl {
            Declaration::Var(v) => self.eval_var_decl(v),
            Declaration::Func(f) => self.eval_func_decl(f),
            Declaration::Struct(s) => {
                self.structs
                    .insert(s.name.clone(), s.fields.iter().map(|f| f.name.clone()).collect());
                Value::Null
            }
            Declaration::Unsafe(u) => {
                let enclosed = Environment::new_enclosed(&self.env);
                self.with_env(enclosed, |this| this.eval_block_statements(&u.body.statements))
            }
            Declaration::Statement(s) => self.eval_statement(s),
        }
    }

    fn with_env<T>(&mut self, new_env: Environment, f: impl FnOnce(&mut Self) -> T) -> T {
        log::debug!("pushing environment frame");
        let saved = std::mem::replace(&mut self.env, new_env);
        let result = f(self);
        self.env = saved;
        log::debug!("popped environment frame");
        result
    }

    fn eval_var_decl(&mut self, v: &VarDecl) -> Value {
        let value = match &v.initializer {
            Some(expr) => {
                let value = self.eval_expression(expr);
                if value.is_error() {
                    return value;
                }
                value
            }
            None => zero_value(v.type_annotation.as_ref().unwrap_or(&Type::Unknown)),
        };
        self.env.define(v.name.clone(), value.clone(), v.mutable);
        value
    }

    fn eval_func_decl(&mut self, f: &FuncDecl) -> Value {
        let function = Value::Function(Rc::new(FunctionKind::User {
            name: Some(f.name.clone()),
            params: f.params.clone(),
            return_type: f.return_type.clone(),
            body: Rc::new(f.clone()),
            captured_env: self.env.clone(),
        }));
        self.env.define(f.name.clone(), function.clone(), false);
        function
    }

    fn eval_block(&mut self, block: &Block) -> Value {
        let enclosed = Environment::new_enclosed(&self.env);
        self.call_stack.push("<block>", block.position, FrameTag::Block);
        let result = self.with_env(enclosed, |this| this.eval_block_statements(&block.statements));
        self.call_stack.pop();
        result
    }

    fn eval_block_statements(&mut self, statements: &[Statement]) -> Value {
        let mut result = Value::Null;
        for stmt in statements {
            result = self.eval_statement(stmt);
            if is_sentinel_or_error(&result) {
                return result;
            }
        }
        result
    }

    fn eval_statement(&mut self, stmt: &Statement) -> Value {
        match stmt {
            Statement::Block(b) => self.eval_block(b),
            Statement::If(s) => self.eval_if(s),
            Statement::For(s) => self.eval_for(s),
            Statement::While(s) => self.eval_while(s),
            Statement::Return(s) => {
                let value = match &s.value {
                    Some(expr) => self.eval_expression(expr),
                    None => Value::Null,
                };
                if value.is_error() {
                    value
                } else {
                    Value::Return(Box::new(value))
                }
            }
            Statement::Print(s) => {
                let value = self.eval_expression(&s.value);
                if value.is_error() {
                    return value;
                }
                println!("{}", value.display_form());
                Value::Null
            }
            Statement::Break(_) => Value::Break,
            Statement::Continue(_) => Value::Continue,
            Statement::Expression(e) => self.eval_expression(e),
            Statement::Assignment(s) => self.eval_assignment(s),
            Statement::IndexAssignment(s) => self.eval_index_assignment(s),
            Statement::MemberAssignment(s) => self.error(
                ErrorCode::RuntimeError,
                format!("struct field assignment ('.{}') is not supported", s.property),
                s.position,
            ),
            Statement::Declaration(d) => self.eval_declaration(d),
        }
    }

    fn eval_assignment(&mut self, s: &AssignmentStmt) -> Value {
        let value = self.eval_expression(&s.value);
        if value.is_error() {
            return value;
        }
        match self.env.assign(&s.name, value.clone()) {
            Ok(()) => value,
            Err(AssignError::Undefined) => self.error(
                ErrorCode::Undefined,
                format!("undefined variable '{}'", s.name),
                s.position,
            ),
            Err(AssignError::Immutable) => self.error(
                ErrorCode::RuntimeImmutable,
                format!("cannot assign to immutable variable '{}'", s.name),
                s.position,
            ),
        }
    }

    fn eval_index_assignment(&mut self, s: &IndexAssignmentStmt) -> Value {
        let object = self.eval_expression(&s.object);
        if object.is_error() {
            return object;
        }
        let index = self.eval_expression(&s.index);
        if index.is_error() {
            return index;
        }
        let value = self.eval_expression(&s.value);
        if value.is_error() {
            return value;
        }
        let Value::Integer(idx) = index else {
            return self.error(ErrorCode::TypeMismatch, "index must be an integer", s.position);
        };
        match object {
            Value::Array(array) => {
                let mut elements = array.borrow_mut();
                if idx < 0 || idx as usize >= elements.len() {
                    return self.index_error(idx, elements.len(), s.position);
                }
                elements[idx as usize] = value.clone();
                value
            }
            Value::Str(_) => self.error(ErrorCode::TypeMismatch, "strings are immutable", s.position),
            other => self.error(
                ErrorCode::TypeMismatch,
                format!("cannot index-assign into a value of type {}", other.kind_name()),
                s.position,
            ),
        }
    }

    fn eval_if(&mut self, s: &IfStmt) -> Value {
        let condition = self.eval_expression(&s.condition);
        if condition.is_error() {
            return condition;
        }
        if condition.is_truthy() {
            self.eval_block(&s.consequence)
        } else if let Some(alt) = &s.alternative {
            self.eval_block(alt)
        } else {
            Value::Null
        }
    }

    fn eval_for(&mut self, s: &ForStmt) -> Value {
        let enclosed = Environment::new_enclosed(&self.env);
        self.call_stack.push("<loop>", s.position, FrameTag::Loop);
        let result = self.with_env(enclosed, |this| {
            if let Some(init) = &s.init {
                let result = this.eval_statement(init);
                if result.is_error() {
                    return result;
                }
            }
            loop {
                if let Some(cond) = &s.condition {
                    let value = this.eval_expression(cond);
                    if value.is_error() {
                        return value;
                    }
                    if !value.is_truthy() {
                        return Value::Null;
                    }
                }
                let body = this.eval_block(&s.body);
                match body {
                    Value::Break => return Value::Null,
                    Value::Return(_) | Value::Error(_) => return body,
                    Value::Continue => {}
                    _ => {}
                }
                if let Some(post) = &s.post {
                    let result = this.eval_statement(post);
                    if result.is_error() {
                        return result;
                    }
                }
            }
        });
        self.call_stack.pop();
        result
    }

    fn eval_while(&mut self, s: &WhileStmt) -> Value {
        self.call_stack.push("<loop>", s.position, FrameTag::Loop);
        let result = loop {
            let value = self.eval_expression(&s.condition);
            if value.is_error() {
                break value;
            }
            if !value.is_truthy() {
                break Value::Null;
            }
            let body = self.eval_block(&s.body);
            match body {
                Value::Break => break Value::Null,
                Value::Return(_) | Value::Error(_) => break body,
                _ => {}
            }
        };
        self.call_stack.pop();
        result
    }

    fn eval_expression(&mut self, expr: &Expression) -> Value {
        match expr {
            Expression::Integer(n, _) => Value::Integer(*n),
            Expression::Float(n, _) => Value::Float(*n),
            Expression::Str(s, _) => Value::Str(s.clone()),
            Expression::Bool(b, _) => Value::Bool(*b),
            Expression::Nil(_) => Value::Null,
            Expression::Identifier(name, position) => match self.env.get(name) {
                Some(v) => v,
                None => self.error(ErrorCode::Undefined, format!("undefined variable '{name}'"), *position),
            },
            Expression::Unary { op, expr, position } => self.eval_unary(*op, expr, *position),
            Expression::Binary {
                op,
                left,
                right,
                position,
            } => self.eval_binary(*op, left, right, *position),
            Expression::Call {
                callee,
                args,
                position,
            } => self.eval_call(callee, args, *position),
            Expression::Index {
                object,
                index,
                position,
            } => self.eval_index(object, index, *position),
            Expression::Slice {
                object,
                start,
                end,
                position,
            } => self.eval_slice(object, start.as_deref(), end.as_deref(), *position),
            Expression::Member {
                object,
                property,
                position,
            } => self.eval_member(object, property, *position),
            Expression::ArrayLiteral { elements, position } => self.eval_array_literal(elements, *position),
            Expression::StructLiteral {
                type_name,
                fields,
                position,
            } => self.eval_struct_literal(type_name, fields, *position),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, expr: &Expression, position: Position) -> Value {
        let value = self.eval_expression(expr);
        if value.is_error() {
            return value;
        }
        match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => match value {
                Value::Integer(n) => Value::Integer(-n),
                Value::Float(n) => Value::Float(-n),
                other => self.error(
                    ErrorCode::TypeMismatch,
                    format!("cannot negate a value of type {}", other.kind_name()),
                    position,
                ),
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expression, right: &Expression, position: Position) -> Value {
        use BinaryOp::*;

        if matches!(op, And | Or) {
            let lv = self.eval_expression(left);
            if lv.is_error() {
                return lv;
            }
            let truthy = lv.is_truthy();
            if op == And && !truthy {
                return Value::Bool(false);
            }
            if op == Or && truthy {
                return Value::Bool(true);
            }
            let rv = self.eval_expression(right);
            if rv.is_error() {
                return rv;
            }
            return Value::Bool(rv.is_truthy());
        }

        let lv = self.eval_expression(left);
        if lv.is_error() {
            return lv;
        }
        let rv = self.eval_expression(right);
        if rv.is_error() {
            return rv;
        }

        match op {
            Add => self.eval_add(lv, rv, position),
            Sub => self.eval_arith(lv, rv, position, "-", |a, b| a - b, |a, b| a - b),
            Mul => self.eval_arith(lv, rv, position, "*", |a, b| a * b, |a, b| a * b),
            Div => self.eval_div(lv, rv, position),
            Mod => self.eval_mod(lv, rv, position),
            Eq => Value::Bool(lv.structural_eq(&rv)),
            NotEq => Value::Bool(!lv.structural_eq(&rv)),
            Lt => self.eval_compare(lv, rv, position, |o| o.is_lt()),
            Gt => self.eval_compare(lv, rv, position, |o| o.is_gt()),
            LtEq => self.eval_compare(lv, rv, position, |o| o.is_le()),
            GtEq => self.eval_compare(lv, rv, position, |o| o.is_ge()),
            And | Or => unreachable!("handled above"),
        }
    }

    fn eval_add(&mut self, l: Value, r: Value, position: Position) -> Value {
        match (&l, &r) {
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
            _ => self.eval_arith(l, r, position, "+", |a, b| a + b, |a, b| a + b),
        }
    }

    fn eval_arith(
        &mut self,
        l: Value,
        r: Value,
        position: Position,
        symbol: &str,
        int_op: fn(i64, i64) -> i64,
        float_op: fn(f64, f64) -> f64,
    ) -> Value {
        match (l, r) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(int_op(a, b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(float_op(a, b)),
            (Value::Integer(a), Value::Float(b)) => Value::Float(float_op(a as f64, b)),
            (Value::Float(a), Value::Integer(b)) => Value::Float(float_op(a, b as f64)),
            (a, b) => self.error(
                ErrorCode::TypeMismatch,
                format!("'{symbol}' requires numeric operands, found {} and {}", a.kind_name(), b.kind_name()),
                position,
            ),
        }
    }

    fn eval_div(&mut self, l: Value, r: Value, position: Position) -> Value {
        match (l, r) {
            (Value::Integer(_), Value::Integer(0)) => {
                self.error(ErrorCode::DivisionByZero, "division by zero", position)
            }
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(a / b),
            (Value::Float(a), Value::Float(b)) => Value::Float(a / b),
            (Value::Integer(a), Value::Float(b)) => Value::Float(a as f64 / b),
            (Value::Float(a), Value::Integer(b)) => Value::Float(a / b as f64),
            (a, b) => self.error(
                ErrorCode::TypeMismatch,
                format!("'/' requires numeric operands, found {} and {}", a.kind_name(), b.kind_name()),
                position,
            ),
        }
    }

    fn eval_mod(&mut self, l: Value, r: Value, position: Position) -> Value {
        let as_int = |v: &Value| -> Option<i64> {
            match v {
                Value::Integer(n) => Some(*n),
                Value::Float(n) => Some(*n as i64),
                _ => None,
            }
        };
        match (as_int(&l), as_int(&r)) {
            (Some(_), Some(0)) => self.error(ErrorCode::DivisionByZero, "modulo by zero", position),
            (Some(a), Some(b)) => Value::Integer(a % b),
            _ => self.error(
                ErrorCode::TypeMismatch,
                format!("'%' requires numeric operands, found {} and {}", l.kind_name(), r.kind_name()),
                position,
            ),
        }
    }

    fn eval_compare(
        &mut self,
        l: Value,
        r: Value,
        position: Position,
        accept: fn(std::cmp::Ordering) -> bool,
    ) -> Value {
        let ordering = match (&l, &r) {
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            _ => None,
        };
        match ordering {
            Some(o) => Value::Bool(accept(o)),
            None => self.error(
                ErrorCode::TypeMismatch,
                format!(
                    "cannot order values of type {} and {}",
                    l.kind_name(),
                    r.kind_name()
                ),
                position,
            ),
        }
    }

    fn eval_call(&mut self, callee: &Expression, args: &[Expression], position: Position) -> Value {
        let callee_value = self.eval_expression(callee);
        if callee_value.is_error() {
            return callee_value;
        }

        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_expression(arg);
            if value.is_error() {
                return value;
            }
            arg_values.push(value);
        }

        let Value::Function(kind) = callee_value else {
            return self.error(
                ErrorCode::NotAFunction,
                format!("value of type {} is not callable", callee_value.kind_name()),
                position,
            );
        };

        match kind.as_ref() {
            FunctionKind::Builtin(name) => self.attach_stack(builtins::call(name, arg_values, position)),
            FunctionKind::User {
                name,
                params,
                body,
                captured_env,
                ..
            } => self.call_user_function(name.as_deref(), params, body, captured_env, arg_values, position),
        }
    }

    fn call_user_function(
        &mut self,
        name: Option<&str>,
        params: &[Param],
        body: &FuncDecl,
        captured_env: &Environment,
        args: Vec<Value>,
        position: Position,
    ) -> Value {
        if params.len() != args.len() {
            // The analyzer already rejects arity mismatches statically; a
            // well-formed program never reaches this branch.
            warn!(
                "runtime arity mismatch calling '{}': expected {}, found {}",
                name.unwrap_or("<anonymous>"),
                params.len(),
                args.len()
            );
            return self.error(
                ErrorCode::WrongArgCount,
                format!(
                    "'{}' expects {} argument(s), found {}",
                    name.unwrap_or("<anonymous>"),
                    params.len(),
                    args.len()
                ),
                position,
            );
        }

        let call_env = Environment::new_enclosed(captured_env);
        for (param, value) in params.iter().zip(args) {
            call_env.define(param.name.clone(), value, false);
        }

        self.call_stack.push(name.unwrap_or("<anonymous>"), position, FrameTag::Call);
        let result = self.with_env(call_env, |this| this.eval_block_statements(&body.body.statements));
        self.call_stack.pop();

        match result {
            Value::Return(v) => *v,
            Value::Error(_) => result,
            _ => Value::Null,
        }
    }

    fn eval_index(&mut self, object: &Expression, index: &Expression, position: Position) -> Value {
        let object = self.eval_expression(object);
        if object.is_error() {
            return object;
        }
        let index = self.eval_expression(index);
        if index.is_error() {
            return index;
        }
        let Value::Integer(idx) = index else {
            return self.error(ErrorCode::TypeMismatch, "index must be an integer", position);
        };
        match object {
            Value::Array(array) => {
                let elements = array.borrow();
                if idx < 0 || idx as usize >= elements.len() {
                    self.index_error(idx, elements.len(), position)
                } else {
                    elements[idx as usize].clone()
                }
            }
            Value::Str(s) => {
                let bytes = s.as_bytes();
                if idx < 0 || idx as usize >= bytes.len() {
                    self.index_error(idx, bytes.len(), position)
                } else {
                    Value::Str(String::from_utf8_lossy(&bytes[idx as usize..idx as usize + 1]).into_owned())
                }
            }
            other => self.error(
                ErrorCode::TypeMismatch,
                format!("cannot index a value of type {}", other.kind_name()),
                position,
            ),
        }
    }

    fn eval_slice(
        &mut self,
        object: &Expression,
        start: Option<&Expression>,
        end: Option<&Expression>,
        position: Position,
    ) -> Value {
        let object = self.eval_expression(object);
        if object.is_error() {
            return object;
        }

        let bound = |this: &mut Self, expr: Option<&Expression>, default: i64| -> Result<i64, Value> {
            match expr {
                None => Ok(default),
                Some(e) => match this.eval_expression(e) {
                    Value::Integer(n) => Ok(n),
                    v if v.is_error() => Err(v),
                    other => Err(this.error(
                        ErrorCode::TypeMismatch,
                        format!("slice bound must be an integer, found {}", other.kind_name()),
                        position,
                    )),
                },
            }
        };

        let resolve = |len: usize, start: i64, end: i64| -> (usize, usize) {
            let clamp = |i: i64| -> usize {
                let resolved = if i < 0 { len as i64 + i } else { i };
                resolved.clamp(0, len as i64) as usize
            };
            let start = clamp(start);
            let end = clamp(end);
            if start > end {
                (end, end)
            } else {
                (start, end)
            }
        };

        match object {
            Value::Array(array) => {
                let len = array.borrow().len();
                let start = match bound(self, start, 0) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                let end = match bound(self, end, len as i64) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                let (start, end) = resolve(len, start, end);
                Value::new_array(array.borrow()[start..end].to_vec())
            }
            Value::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len();
                let start = match bound(self, start, 0) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                let end = match bound(self, end, len as i64) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                let (start, end) = resolve(len, start, end);
                Value::Str(String::from_utf8_lossy(&bytes[start..end]).into_owned())
            }
            other => self.error(
                ErrorCode::TypeMismatch,
                format!("cannot slice a value of type {}", other.kind_name()),
                position,
            ),
        }
    }

    fn eval_member(&mut self, object: &Expression, property: &str, position: Position) -> Value {
        let object = self.eval_expression(object);
        if object.is_error() {
            return object;
        }
        match object {
            Value::Struct { type_name, fields, .. } => match fields.borrow().get(property) {
                Some(v) => v.clone(),
                None => self.error(
                    ErrorCode::UndefinedField,
                    format!("struct '{type_name}' has no field '{property}'"),
                    position,
                ),
            },
            other => self.error(
                ErrorCode::TypeMismatch,
                format!("cannot access member '{property}' on a value of type {}", other.kind_name()),
                position,
            ),
        }
    }

    fn eval_array_literal(&mut self, elements: &[Expression], _position: Position) -> Value {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.eval_expression(element);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }
        Value::new_array(values)
    }

    fn eval_struct_literal(
        &mut self,
        type_name: &str,
        fields: &[(String, Expression)],
        position: Position,
    ) -> Value {
        let field_order = match self.structs.get(type_name) {
            Some(order) => order.clone(),
            None => {
                return self.error(ErrorCode::UndefinedType, format!("undefined struct '{type_name}'"), position);
            }
        };

        let mut values = HashMap::with_capacity(fields.len());
        for (name, expr) in fields {
            let value = self.eval_expression(expr);
            if value.is_error() {
                return value;
            }
            values.insert(name.clone(), value);
        }

        Value::Struct {
            type_name: type_name.to_string(),
            field_order: Rc::new(field_order),
            fields: Rc::new(std::cell::RefCell::new(values)),
        }
    }
}

fn is_sentinel_or_error(value: &Value) -> bool {
    matches!(value, Value::Return(_) | Value::Break | Value::Continue | Value::Error(_))
}

/// The type's zero value, `spec.md` §4.4 ("Variable declaration").
fn zero_value(ty: &Type) -> Value {
    match ty {
        Type::Int => Value::Integer(0),
        Type::Float => Value::Float(0.0),
        Type::String => Value::Str(String::new()),
        Type::Bool => Value::Bool(false),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(src: &str) -> Value {
        let (program, diags) = parse(src);
        assert!(diags.is_empty(), "parse errors: {diags:?}");
        evaluate(&program)
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let v = run("1 + 2.0;");
        assert!(matches!(v, Value::Float(f) if f == 3.0));
    }

    #[test]
    fn integer_division_truncates() {
        let v = run("7 / 2;");
        assert!(matches!(v, Value::Integer(3)));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let v = run("1 / 0;");
        assert!(v.is_error());
    }

    #[test]
    fn short_circuit_or_skips_right_operand() {
        let v = run("true || (1 / 0 == 0);");
        assert!(matches!(v, Value::Bool(true)));
    }

    #[test]
    fn cross_type_equality_is_false() {
        let v = run("3 == 3.0;");
        assert!(matches!(v, Value::Bool(false)));
    }

    #[test]
    fn closures_capture_their_declaration_environment() {
        let v = run(
            "func makeAdder(n: int) { func add(x: int) { return x + n; } return add; } \
             mut adder := makeAdder(10); adder(5);",
        );
        assert!(matches!(v, Value::Integer(15)));
    }

    #[test]
    fn break_exits_the_enclosing_loop() {
        let v = run("mut i := 0; for ; i < 10; i = i + 1 { if i == 3 { break; } } i;");
        assert!(matches!(v, Value::Integer(3)));
    }

    #[test]
    fn struct_literal_and_member_access() {
        let v = run("struct Point { x: int; y: int } mut p := Point{x: 1, y: 2}; p.x;");
        assert!(matches!(v, Value::Integer(1)));
    }

    #[test]
    fn negative_index_slices_from_the_end() {
        let v = run("mut a := [1, 2, 3, 4, 5]; a[-2:];");
        let Value::Array(a) = v else { panic!("expected array") };
        let elements = a.borrow();
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[0], Value::Integer(4)));
    }

    #[test]
    fn indexed_assignment_out_of_bounds_errors() {
        let v = run("mut a := [1, 2]; a[5] = 9;");
        assert!(v.is_error());
    }

    #[test]
    fn push_mutates_the_bound_array() {
        let v = run("mut a := [1]; push(a, 2); a;");
        let Value::Array(a) = v else { panic!("expected array") };
        assert_eq!(a.borrow().len(), 2);
    }
}
