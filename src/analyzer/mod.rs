//! Semantic analyzer — two-pass declaration collection then type and
//! mutability checking. `spec.md` §4.3.

mod scope;

pub use scope::{Symbol, SymbolTable};

use crate::diagnostic::{Diagnostic, ErrorCode, Position};
use crate::parser::ast::*;
use log::trace;
use std::collections::HashMap;

pub struct Analyzer {
    symbols: SymbolTable,
    structs: HashMap<String, Vec<Field>>,
    diagnostics: Vec<Diagnostic>,
    loop_depth: usize,
    /// Stack of enclosing function return types; empty means "not inside a
    /// function body".
    function_stack: Vec<Option<Type>>,
}

/// Runs both passes over `program` and returns the accumulated diagnostics.
/// An empty result means the program is well-formed and may proceed to the
/// evaluator.
pub fn analyze(program: &Program) -> Vec<Diagnostic> {
    trace!("analyzing {} top-level declaration(s)", program.declarations.len());
    let mut analyzer = Analyzer::new();
    analyzer.collect_declarations(program);
    // Pass 2 always runs, even if pass 1 found duplicates, so independent
    // errors from both passes surface together (spec.md §4.3).
    analyzer.check_program(program);
    trace!("analysis produced {} diagnostic(s)", analyzer.diagnostics.len());
    analyzer.diagnostics
}

impl Analyzer {
    fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            structs: HashMap::new(),
            diagnostics: Vec::new(),
            loop_depth: 0,
            function_stack: Vec::new(),
        }
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>, position: Position) {
        self.diagnostics.push(Diagnostic::error(code, message, position));
    }

    // ---- pass 1: declaration collection ---------------------------------

    fn collect_declarations(&mut self, program: &Program) {
        for decl in &program.declarations {
            self.collect_declaration(decl);
        }
    }

    fn collect_declaration(&mut self, decl: &Declaration) {
        match decl {
            Declaration::Var(v) => {
                let ty = v.type_annotation.clone().unwrap_or(Type::Unknown);
                self.define_checked(v.name.clone(), ty, v.mutable, false, v.position);
            }
            Declaration::Func(f) => {
                let ty = Type::Function {
                    params: f.params.iter().map(|p| p.ty.clone()).collect(),
                    return_type: f.return_type.clone().map(Box::new),
                };
                self.define_checked(f.name.clone(), ty, false, true, f.position);
            }
            Declaration::Struct(s) => {
                if self.structs.contains_key(&s.name) {
                    self.error(
                        ErrorCode::DuplicateDecl,
                        format!("struct '{}' is already declared", s.name),
                        s.position,
                    );
                } else {
                    self.structs.insert(s.name.clone(), s.fields.clone());
                }
            }
            Declaration::Unsafe(_) | Declaration::Statement(_) => {
                // Not collected in pass 1; declarations appearing nested
                // inside blocks are defined as pass 2 encounters them.
            }
        }
    }

    fn define_checked(
        &mut self,
        name: String,
        ty: Type,
        mutable: bool,
        is_function: bool,
        position: Position,
    ) {
        if self.symbols.is_defined_in_current_scope(&name) {
            self.error(
                ErrorCode::DuplicateDecl,
                format!("'{name}' is already declared in this scope"),
                position,
            );
            return;
        }
        self.symbols.define(Symbol {
            name,
            ty,
            mutable,
            is_function,
            declared_at: position,
        });
    }

    // ---- pass 2: type & mutability checking ------------------------------

    fn check_program(&mut self, program: &Program) {
        for decl in &program.declarations {
            self.check_declaration(decl, true);
        }
    }

    fn check_declaration(&mut self, decl: &Declaration, top_level: bool) {
        match decl {
            Declaration::Var(v) => self.check_var_decl(v, top_level),
            Declaration::Func(f) => self.check_func_decl(f, top_level),
            Declaration::Struct(s) => {
                if !top_level && !self.structs.contains_key(&s.name) {
                    self.structs.insert(s.name.clone(), s.fields.clone());
                }
                for field in &s.fields {
                    if self.resolve_named_type(&field.ty).is_none() {
                        self.error(
                            ErrorCode::UndefinedType,
                            format!("undefined type in field '{}'", field.name),
                            s.position,
                        );
                    }
                }
            }
            Declaration::Unsafe(u) => {
                self.symbols.push_scope();
                for stmt in &u.body.statements {
                    self.check_statement(stmt);
                }
                self.symbols.pop_scope();
            }
            Declaration::Statement(s) => self.check_statement(s),
        }
    }

    fn resolve_named_type(&self, ty: &Type) -> Option<Type> {
        match ty {
            Type::Struct { name, .. } if !self.structs.contains_key(name) => None,
            other => Some(other.clone()),
        }
    }

    fn check_var_decl(&mut self, v: &VarDecl, top_level: bool) {
        // The initializer is checked — and so resolves any identifier of
        // the same name against the *outer* scope — before the new binding
        // is defined, mirroring the evaluator's order in `eval_var_decl`
        // (which evaluates the initializer before calling `env.define`).
        // Defining first would let a shadowing initializer like
        // `{ mut x: int = x; }` resolve `x` to its own not-yet-initialized
        // symbol instead of the outer one.
        let init_ty = v.initializer.as_ref().map(|e| self.check_expression(e));

        if !top_level {
            self.define_checked(
                v.name.clone(),
                v.type_annotation.clone().unwrap_or(Type::Unknown),
                v.mutable,
                false,
                v.position,
            );
        }

        let declared_ty = match (&v.type_annotation, &init_ty) {
            (Some(ann), Some(init)) => {
                if !types_compatible(ann, init) {
                    self.error(
                        ErrorCode::TypeError,
                        format!("cannot assign value of type {init:?} to variable of type {ann:?}"),
                        v.position,
                    );
                }
                ann.clone()
            }
            (Some(ann), None) => ann.clone(),
            (None, Some(init)) => {
                if matches!(init, Type::Unknown) {
                    self.error(
                        ErrorCode::TypeError,
                        "cannot infer type of variable from an unknown-typed initializer",
                        v.position,
                    );
                }
                init.clone()
            }
            (None, None) => {
                self.error(
                    ErrorCode::SyntaxError,
                    format!("variable '{}' needs a type annotation or an initializer", v.name),
                    v.position,
                );
                Type::Unknown
            }
        };

        self.symbols.update_type(&v.name, declared_ty);
    }

    fn check_func_decl(&mut self, f: &FuncDecl, top_level: bool) {
        if !top_level {
            let ty = Type::Function {
                params: f.params.iter().map(|p| p.ty.clone()).collect(),
                return_type: f.return_type.clone().map(Box::new),
            };
            self.define_checked(f.name.clone(), ty, false, true, f.position);
        }

        self.symbols.push_scope();
        for param in &f.params {
            self.define_checked(param.name.clone(), param.ty.clone(), false, false, f.position);
        }
        self.function_stack.push(f.return_type.clone());
        for stmt in &f.body.statements {
            self.check_statement(stmt);
        }
        self.function_stack.pop();
        self.symbols.pop_scope();
    }

    fn check_block(&mut self, block: &Block) {
        self.symbols.push_scope();
        for stmt in &block.statements {
            self.check_statement(stmt);
        }
        self.symbols.pop_scope();
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(b) => self.check_block(b),
            Statement::If(s) => {
                let cond_ty = self.check_expression(&s.condition);
                self.expect_bool(&cond_ty, s.position);
                self.check_block(&s.consequence);
                if let Some(alt) = &s.alternative {
                    self.check_block(alt);
                }
            }
            Statement::For(s) => {
                self.symbols.push_scope();
                if let Some(init) = &s.init {
                    self.check_statement(init);
                }
                if let Some(cond) = &s.condition {
                    let ty = self.check_expression(cond);
                    self.expect_bool(&ty, s.position);
                }
                self.loop_depth += 1;
                self.check_block(&s.body);
                self.loop_depth -= 1;
                if let Some(post) = &s.post {
                    self.check_statement(post);
                }
                self.symbols.pop_scope();
            }
            Statement::While(s) => {
                let ty = self.check_expression(&s.condition);
                self.expect_bool(&ty, s.position);
                self.loop_depth += 1;
                self.check_block(&s.body);
                self.loop_depth -= 1;
            }
            Statement::Return(s) => {
                if self.function_stack.is_empty() {
                    self.error(ErrorCode::TypeError, "'return' outside of a function", s.position);
                    return;
                }
                let expected = self.function_stack.last().cloned().flatten();
                match (&s.value, &expected) {
                    (None, Some(_)) => {
                        self.error(
                            ErrorCode::TypeError,
                            "function with a return type must return a value",
                            s.position,
                        );
                    }
                    (Some(expr), expected) => {
                        let actual = self.check_expression(expr);
                        if let Some(expected) = expected {
                            if !types_compatible(expected, &actual) {
                                self.error(
                                    ErrorCode::TypeError,
                                    format!(
                                        "cannot return value of type {actual:?} from function returning {expected:?}"
                                    ),
                                    s.position,
                                );
                            }
                        }
                    }
                    (None, None) => {}
                }
            }
            Statement::Print(s) => {
                self.check_expression(&s.value);
            }
            Statement::Break(p) | Statement::Continue(p) => {
                if self.loop_depth == 0 {
                    self.error(ErrorCode::SyntaxError, "'break'/'continue' outside of a loop", *p);
                }
            }
            Statement::Expression(e) => {
                self.check_expression(e);
            }
            Statement::Assignment(s) => {
                let value_ty = self.check_expression(&s.value);
                match self.symbols.resolve(&s.name).cloned() {
                    None => self.error(
                        ErrorCode::UndefinedVar,
                        format!("undefined variable '{}'", s.name),
                        s.position,
                    ),
                    Some(sym) => {
                        if !sym.mutable {
                            self.error(
                                ErrorCode::Immutable,
                                format!("cannot assign to immutable variable '{}'", s.name),
                                s.position,
                            );
                        } else if !types_compatible(&sym.ty, &value_ty) {
                            self.error(
                                ErrorCode::TypeError,
                                format!(
                                    "cannot assign value of type {value_ty:?} to variable '{}' of type {:?}",
                                    s.name, sym.ty
                                ),
                                s.position,
                            );
                        }
                    }
                }
            }
            Statement::IndexAssignment(s) => {
                let object_ty = self.check_expression(&s.object);
                let index_ty = self.check_expression(&s.index);
                if !matches!(index_ty, Type::Int | Type::Unknown) {
                    self.error(ErrorCode::TypeError, "index must be an integer", s.position);
                }
                match object_ty {
                    Type::Array { .. } | Type::Unknown => {
                        self.check_expression(&s.value);
                    }
                    Type::String => {
                        self.error(ErrorCode::TypeError, "strings are immutable", s.position);
                    }
                    other => {
                        self.error(
                            ErrorCode::TypeError,
                            format!("cannot index-assign into a value of type {other:?}"),
                            s.position,
                        );
                    }
                }
            }
            Statement::MemberAssignment(s) => {
                self.check_expression(&s.object);
                self.check_expression(&s.value);
                self.error(
                    ErrorCode::TypeError,
                    format!("struct field assignment ('.{}') is not supported", s.property),
                    s.position,
                );
            }
            Statement::Declaration(d) => self.check_declaration(d, false),
        }
    }

    fn expect_bool(&mut self, ty: &Type, position: Position) {
        if !matches!(ty, Type::Bool | Type::Unknown) {
            self.error(
                ErrorCode::TypeError,
                format!("expected a boolean condition, found {ty:?}"),
                position,
            );
        }
    }

    fn check_expression(&mut self, expr: &Expression) -> Type {
        match expr {
            Expression::Integer(..) => Type::Int,
            Expression::Float(..) => Type::Float,
            Expression::Str(..) => Type::String,
            Expression::Bool(..) => Type::Bool,
            Expression::Nil(..) => Type::Unknown,
            Expression::Identifier(name, position) => match self.symbols.resolve(name) {
                Some(sym) => sym.ty.clone(),
                None => {
                    self.error(
                        ErrorCode::UndefinedVar,
                        format!("undefined variable '{name}'"),
                        *position,
                    );
                    Type::Unknown
                }
            },
            Expression::Unary { op, expr, position } => {
                let ty = self.check_expression(expr);
                match op {
                    UnaryOp::Not => {
                        self.expect_bool(&ty, *position);
                        Type::Bool
                    }
                    UnaryOp::Neg => {
                        if !ty.is_numeric() && !matches!(ty, Type::Unknown) {
                            self.error(ErrorCode::TypeError, format!("cannot negate {ty:?}"), *position);
                        }
                        ty
                    }
                }
            }
            Expression::Binary {
                op,
                left,
                right,
                position,
            } => self.check_binary(*op, left, right, *position),
            Expression::Call {
                callee,
                args,
                position,
            } => self.check_call(callee, args, *position),
            Expression::Index {
                object,
                index,
                position,
            } => {
                let object_ty = self.check_expression(object);
                let index_ty = self.check_expression(index);
                if !matches!(index_ty, Type::Int | Type::Unknown) {
                    self.error(ErrorCode::TypeError, "index must be an integer", *position);
                }
                match object_ty {
                    Type::Array { element, .. } => *element,
                    Type::String => Type::String,
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.error(
                            ErrorCode::TypeError,
                            format!("cannot index a value of type {other:?}"),
                            *position,
                        );
                        Type::Unknown
                    }
                }
            }
            Expression::Slice {
                object,
                start,
                end,
                position,
            } => {
                let object_ty = self.check_expression(object);
                for bound in [start, end].into_iter().flatten() {
                    let t = self.check_expression(bound);
                    if !matches!(t, Type::Int | Type::Unknown) {
                        self.error(ErrorCode::TypeError, "slice bound must be an integer", *position);
                    }
                }
                object_ty
            }
            Expression::Member {
                object,
                property,
                position,
            } => self.check_member(object, property, *position),
            Expression::ArrayLiteral { elements, position } => {
                let mut element_ty = Type::Unknown;
                for element in elements {
                    let t = self.check_expression(element);
                    if matches!(element_ty, Type::Unknown) {
                        element_ty = t;
                    } else if !matches!(t, Type::Unknown) && !types_compatible(&element_ty, &t) {
                        self.error(
                            ErrorCode::TypeError,
                            "array literal elements must share a compatible type",
                            *position,
                        );
                    }
                }
                Type::Array {
                    element: Box::new(element_ty),
                    size: Some(elements.len()),
                }
            }
            Expression::StructLiteral {
                type_name,
                fields,
                position,
            } => self.check_struct_literal(type_name, fields, *position),
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        position: Position,
    ) -> Type {
        use BinaryOp::*;
        if matches!(op, And | Or) {
            let lt = self.check_expression(left);
            let rt = self.check_expression(right);
            self.expect_bool(&lt, position);
            self.expect_bool(&rt, position);
            return Type::Bool;
        }

        let lt = self.check_expression(left);
        let rt = self.check_expression(right);

        match op {
            Add | Sub | Mul | Div | Mod => {
                if matches!(lt, Type::Unknown) || matches!(rt, Type::Unknown) {
                    return if lt.is_numeric() || rt.is_numeric() {
                        Type::Float
                    } else {
                        Type::Unknown
                    };
                }
                if op == Add && matches!(lt, Type::String) && matches!(rt, Type::String) {
                    return Type::String;
                }
                if !lt.is_numeric() || !rt.is_numeric() {
                    self.error(
                        ErrorCode::TypeError,
                        format!("operator requires numeric operands, found {lt:?} and {rt:?}"),
                        position,
                    );
                    return Type::Unknown;
                }
                if matches!(lt, Type::Float) || matches!(rt, Type::Float) {
                    Type::Float
                } else {
                    Type::Int
                }
            }
            Eq | NotEq => {
                if !matches!(lt, Type::Unknown)
                    && !matches!(rt, Type::Unknown)
                    && !types_compatible(&lt, &rt)
                {
                    self.error(
                        ErrorCode::TypeError,
                        format!("cannot compare incompatible types {lt:?} and {rt:?}"),
                        position,
                    );
                }
                Type::Bool
            }
            Lt | Gt | LtEq | GtEq => {
                let ordered = |t: &Type| t.is_numeric() || matches!(t, Type::String | Type::Unknown);
                if !ordered(&lt) || !ordered(&rt) {
                    self.error(
                        ErrorCode::TypeError,
                        format!("operator requires ordered operands, found {lt:?} and {rt:?}"),
                        position,
                    );
                }
                Type::Bool
            }
            And | Or => unreachable!("handled above"),
        }
    }

    fn check_call(&mut self, callee: &Expression, args: &[Expression], position: Position) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expression(a)).collect();

        let Expression::Identifier(name, _) = callee else {
            self.check_expression(callee);
            self.error(ErrorCode::TypeError, "call target must be a function", position);
            return Type::Unknown;
        };

        if crate::evaluator::builtins::is_builtin(name) {
            return Type::Unknown;
        }

        let Some(sym) = self.symbols.resolve(name).cloned() else {
            self.error(ErrorCode::UndefinedVar, format!("undefined function '{name}'"), position);
            return Type::Unknown;
        };

        let Type::Function { params, return_type } = sym.ty else {
            self.error(ErrorCode::TypeError, format!("'{name}' is not a function"), position);
            return Type::Unknown;
        };

        if params.len() != arg_types.len() {
            self.error(
                ErrorCode::TypeError,
                format!(
                    "'{name}' expects {} argument(s), found {}",
                    params.len(),
                    arg_types.len()
                ),
                position,
            );
        } else {
            for (expected, actual) in params.iter().zip(arg_types.iter()) {
                if !types_compatible(expected, actual) {
                    self.error(
                        ErrorCode::TypeError,
                        format!("argument of type {actual:?} is not compatible with parameter of type {expected:?}"),
                        position,
                    );
                }
            }
        }

        return_type.map(|t| *t).unwrap_or(Type::Void)
    }

    fn check_member(&mut self, object: &Expression, property: &str, position: Position) -> Type {
        let object_ty = self.check_expression(object);
        match object_ty {
            Type::Struct { name, .. } => {
                let Some(fields) = self.structs.get(&name) else {
                    self.error(ErrorCode::UndefinedType, format!("undefined struct '{name}'"), position);
                    return Type::Unknown;
                };
                match fields.iter().find(|f| f.name == property) {
                    Some(f) => f.ty.clone(),
                    None => {
                        self.error(
                            ErrorCode::UndefinedField,
                            format!("struct '{name}' has no field '{property}'"),
                            position,
                        );
                        Type::Unknown
                    }
                }
            }
            Type::Unknown => Type::Unknown,
            other => {
                self.error(
                    ErrorCode::TypeError,
                    format!("cannot access member '{property}' on a value of type {other:?}"),
                    position,
                );
                Type::Unknown
            }
        }
    }

    fn check_struct_literal(
        &mut self,
        type_name: &str,
        fields: &[(String, Expression)],
        position: Position,
    ) -> Type {
        let Some(decl_fields) = self.structs.get(type_name).cloned() else {
            self.error(
                ErrorCode::UndefinedType,
                format!("undefined struct '{type_name}'"),
                position,
            );
            for (_, value) in fields {
                self.check_expression(value);
            }
            return Type::Unknown;
        };

        let mut seen = std::collections::HashSet::new();
        for (field_name, value) in fields {
            let value_ty = self.check_expression(value);
            if !seen.insert(field_name.clone()) {
                self.error(
                    ErrorCode::DuplicateDecl,
                    format!("duplicate field '{field_name}' in struct literal"),
                    position,
                );
                continue;
            }
            match decl_fields.iter().find(|f| &f.name == field_name) {
                Some(f) => {
                    if !types_compatible(&f.ty, &value_ty) {
                        self.error(
                            ErrorCode::TypeError,
                            format!(
                                "field '{field_name}' expects type {:?}, found {value_ty:?}",
                                f.ty
                            ),
                            position,
                        );
                    }
                }
                None => {
                    self.error(
                        ErrorCode::UndefinedField,
                        format!("struct '{type_name}' has no field '{field_name}'"),
                        position,
                    );
                }
            }
        }

        Type::Struct {
            name: type_name.to_string(),
            fields: decl_fields,
        }
    }
}

/// Case-insensitive-by-construction (our `Type` enum has no separate
/// spellings for the same base type, so structural equality already gives
/// us `int ≡ integer`, `float ≡ float64`, `bool ≡ boolean`) compatibility
/// check with `Unknown` as a universal wildcard, per `spec.md` §4.3.
pub fn types_compatible(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Array { element: ea, .. }, Type::Array { element: eb, .. }) => {
            types_compatible(ea, eb)
        }
        (Type::Pointer(ea), Type::Pointer(eb)) => types_compatible(ea, eb),
        (Type::Struct { name: na, .. }, Type::Struct { name: nb, .. }) => na == nb,
        (Type::Map { key: ka, value: va }, Type::Map { key: kb, value: vb }) => {
            types_compatible(ka, kb) && types_compatible(va, vb)
        }
        (
            Type::Function {
                params: pa,
                return_type: ra,
            },
            Type::Function {
                params: pb,
                return_type: rb,
            },
        ) => {
            pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(x, y)| types_compatible(x, y))
                && match (ra, rb) {
                    (Some(x), Some(y)) => types_compatible(x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn diagnostics_for(src: &str) -> Vec<Diagnostic> {
        let (program, parse_diags) = parse(src);
        assert!(parse_diags.is_empty(), "parse errors: {parse_diags:?}");
        analyze(&program)
    }

    #[test]
    fn duplicate_declaration_in_one_scope() {
        let diags = diagnostics_for("mut x := 1; mut x := 2;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::DuplicateDecl);
    }

    #[test]
    fn mutual_recursion_type_checks() {
        let diags = diagnostics_for(
            "func a() { b(); } func b() { a(); }",
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn wrong_type_assignment_names_both_types() {
        let diags = diagnostics_for("mut x : int = 5; x = \"hi\";");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::TypeError);
        assert!(diags[0].message.contains("String"));
        assert!(diags[0].message.contains("Int"));
    }

    #[test]
    fn break_outside_loop_is_syntax_error() {
        let diags = diagnostics_for("break;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::SyntaxError);
    }

    #[test]
    fn immutable_assignment_is_rejected() {
        let diags = diagnostics_for("x := 5; x = 6;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::Immutable);
    }

    #[test]
    fn shadowing_initializer_resolves_against_the_outer_binding() {
        // `x` on the right must be the outer `string`, not the not-yet-defined
        // inner `int` — so assigning it into an `int` binding is a type error.
        let diags = diagnostics_for(r#"x: string = "hi"; { mut x: int = x; }"#);
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].code, ErrorCode::TypeError);
    }
}
