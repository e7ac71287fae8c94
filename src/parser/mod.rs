//! Parser — precedence-climbing expressions, recursive-descent everything
//! else, panic-mode error recovery. `spec.md` §4.2.

pub mod ast;

use crate::diagnostic::{Diagnostic, ErrorCode, Position};
use crate::lexer::{Lexer, Token, TokenKind};
use ast::*;
use log::trace;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    /// Suppresses struct-literal parsing while inside an `if`/`for`/`while`
    /// condition, where a following `{` starts the body block instead.
    no_struct_literal: bool,
}

/// Parse a complete program. Never panics; always returns an AST (possibly
/// containing partial/placeholder nodes where recovery occurred) alongside
/// whatever diagnostics were recorded.
pub fn parse(source: &str) -> (Program, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.kind == TokenKind::Eof;
        if tok.kind != TokenKind::Comment {
            tokens.push(tok);
        }
        if is_eof {
            break;
        }
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        diagnostics: Vec::new(),
        no_struct_literal: false,
    };
    trace!("parsing {} token(s)", parser.tokens.len());
    let program = parser.parse_program();
    trace!(
        "parsed {} top-level declaration(s), {} diagnostic(s)",
        program.declarations.len(),
        parser.diagnostics.len()
    );
    (program, parser.diagnostics)
}

const TOP_LEVEL_STARTS: &[TokenKind] = &[
    TokenKind::Func,
    TokenKind::Mut,
    TokenKind::Struct,
    TokenKind::Enum,
    TokenKind::TypeKw,
    TokenKind::If,
    TokenKind::For,
    TokenKind::Return,
    TokenKind::Unsafe,
];

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn position(&self) -> Position {
        let t = self.current();
        Position::new(t.line, t.column)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_semicolon(&mut self) {
        self.eat(TokenKind::Semicolon);
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            let position = self.position();
            let found = self.current().clone();
            self.error(
                format!("expected {kind:?} while parsing {context}, found {:?} ({:?})", found.kind, found.literal),
                position,
            );
            found
        }
    }

    fn error(&mut self, message: impl Into<String>, position: Position) {
        self.diagnostics
            .push(Diagnostic::error(ErrorCode::SyntaxError, message, position));
    }

    fn synchronize(&mut self) {
        loop {
            match self.current_kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::RBracket => return,
                k if TOP_LEVEL_STARTS.contains(&k) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut declarations = Vec::new();
        while !self.check(TokenKind::Eof) {
            let before = self.pos;
            declarations.push(self.parse_declaration());
            if self.pos == before {
                // Safety valve: parse_declaration must always advance.
                self.advance();
            }
        }
        Program { declarations }
    }

    fn parse_declaration(&mut self) -> Declaration {
        match self.current_kind() {
            TokenKind::Mut => self.parse_var_decl(),
            TokenKind::Ident
                if matches!(self.peek_kind(1), TokenKind::Colon | TokenKind::ColonEq) =>
            {
                self.parse_var_decl()
            }
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Struct => self.parse_struct_decl(),
            TokenKind::Unsafe => self.parse_unsafe_block(),
            _ => Declaration::Statement(self.parse_statement()),
        }
    }

    fn parse_var_decl(&mut self) -> Declaration {
        let position = self.position();
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect(TokenKind::Ident, "variable declaration").literal;

        let (type_annotation, initializer) = if self.eat(TokenKind::ColonEq) {
            (None, Some(self.parse_expression(0)))
        } else if self.eat(TokenKind::Colon) {
            let ty = self.parse_type();
            let init = if self.eat(TokenKind::Eq) {
                Some(self.parse_expression(0))
            } else {
                None
            };
            (Some(ty), init)
        } else {
            let found = self.current().clone();
            self.error(
                format!("expected ':' or ':=' after variable name, found {:?}", found.kind),
                self.position(),
            );
            (None, None)
        };
        self.eat_semicolon();

        Declaration::Var(VarDecl {
            mutable,
            name,
            type_annotation,
            initializer,
            position,
        })
    }

    fn parse_func_decl(&mut self) -> Declaration {
        let position = self.position();
        self.advance(); // 'func'
        let name = self.expect(TokenKind::Ident, "function name").literal;
        self.expect(TokenKind::LParen, "function parameters");
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let pname = self.expect(TokenKind::Ident, "parameter name").literal;
                self.expect(TokenKind::Colon, "parameter type");
                let ty = self.parse_type();
                params.push(Param { name: pname, ty });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "function parameters");
        let return_type = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type())
        } else {
            None
        };
        let body = self.parse_block();
        Declaration::Func(FuncDecl {
            name,
            params,
            return_type,
            body,
            position,
        })
    }

    fn parse_struct_decl(&mut self) -> Declaration {
        let position = self.position();
        self.advance(); // 'struct'
        let name = self.expect(TokenKind::Ident, "struct name").literal;
        self.expect(TokenKind::LBrace, "struct body");
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let fname = self.expect(TokenKind::Ident, "struct field").literal;
            self.expect(TokenKind::Colon, "struct field type");
            let ty = self.parse_type();
            fields.push(Field { name: fname, ty });
            self.eat(TokenKind::Semicolon);
        }
        self.expect(TokenKind::RBrace, "struct body");
        Declaration::Struct(StructDecl {
            name,
            fields,
            position,
        })
    }

    fn parse_unsafe_block(&mut self) -> Declaration {
        let position = self.position();
        self.advance(); // 'unsafe'
        let body = self.parse_block();
        Declaration::Unsafe(UnsafeBlock { body, position })
    }

    fn parse_type(&mut self) -> Type {
        match self.current_kind() {
            TokenKind::Int => {
                self.advance();
                Type::Int
            }
            TokenKind::Float => {
                self.advance();
                Type::Float
            }
            TokenKind::StringType => {
                self.advance();
                Type::String
            }
            TokenKind::Bool => {
                self.advance();
                Type::Bool
            }
            TokenKind::LBracket => {
                self.advance();
                let size = if self.check(TokenKind::Number) {
                    let tok = self.advance();
                    tok.literal.parse::<usize>().ok()
                } else {
                    None
                };
                self.expect(TokenKind::RBracket, "array type");
                let element = self.parse_type();
                Type::Array {
                    element: Box::new(element),
                    size,
                }
            }
            TokenKind::Star => {
                self.advance();
                Type::Pointer(Box::new(self.parse_type()))
            }
            TokenKind::Ident => {
                let name = self.advance().literal;
                Type::Struct {
                    name,
                    fields: Vec::new(),
                }
            }
            _ => {
                let position = self.position();
                let found = self.current().clone();
                self.error(format!("expected a type, found {:?}", found.kind), position);
                Type::Unknown
            }
        }
    }

    fn parse_block(&mut self) -> Block {
        let position = self.position();
        self.expect(TokenKind::LBrace, "block");
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let before = self.pos;
            statements.push(self.parse_block_item());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace, "block");
        Block {
            statements,
            position,
        }
    }

    /// A block's items may themselves be declarations (`spec.md` §3:
    /// "Statements are also admissible as top-level declarations").
    fn parse_block_item(&mut self) -> Statement {
        match self.current_kind() {
            TokenKind::Mut | TokenKind::Func | TokenKind::Struct | TokenKind::Unsafe => {
                Statement::Declaration(Box::new(self.parse_declaration()))
            }
            TokenKind::Ident if matches!(self.peek_kind(1), TokenKind::Colon | TokenKind::ColonEq) => {
                Statement::Declaration(Box::new(self.parse_declaration()))
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Statement {
        match self.current_kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Log => self.parse_print(),
            TokenKind::Break => {
                let position = self.position();
                self.advance();
                self.eat_semicolon();
                Statement::Break(position)
            }
            TokenKind::Continue => {
                let position = self.position();
                self.advance();
                self.eat_semicolon();
                Statement::Continue(position)
            }
            TokenKind::LBrace => Statement::Block(self.parse_block()),
            TokenKind::Eof => {
                let position = self.position();
                self.error("unexpected end of input", position);
                Statement::Expression(Expression::Nil(position))
            }
            _ => self.parse_expression_led_statement(),
        }
    }

    fn parse_condition(&mut self) -> Expression {
        self.no_struct_literal = true;
        let expr = self.parse_expression(0);
        self.no_struct_literal = false;
        expr
    }

    fn parse_if(&mut self) -> Statement {
        let position = self.position();
        self.advance(); // 'if'
        let condition = self.parse_condition();
        let consequence = self.parse_block();
        let alternative = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let inner_pos = self.position();
                let inner = self.parse_if();
                Some(Block {
                    statements: vec![inner],
                    position: inner_pos,
                })
            } else {
                Some(self.parse_block())
            }
        } else {
            None
        };
        Statement::If(IfStmt {
            condition,
            consequence,
            alternative,
            position,
        })
    }

    fn parse_for(&mut self) -> Statement {
        let position = self.position();
        self.advance(); // 'for'

        // Bare `for { ... }` (no header at all) is equivalent to `while true`.
        if self.check(TokenKind::LBrace) {
            let body = self.parse_block();
            return Statement::For(ForStmt {
                init: None,
                condition: None,
                post: None,
                body,
                position,
            });
        }

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_block_item()))
        };
        self.eat(TokenKind::Semicolon);

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_condition())
        };
        self.expect(TokenKind::Semicolon, "for-loop header");

        let post = if self.check(TokenKind::LBrace) {
            None
        } else {
            self.no_struct_literal = true;
            let stmt = self.parse_expression_led_statement_inner();
            self.no_struct_literal = false;
            Some(Box::new(stmt))
        };

        let body = self.parse_block();
        Statement::For(ForStmt {
            init,
            condition,
            post,
            body,
            position,
        })
    }

    fn parse_while(&mut self) -> Statement {
        let position = self.position();
        self.advance(); // 'while'
        let condition = self.parse_condition();
        let body = self.parse_block();
        Statement::While(WhileStmt {
            condition,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> Statement {
        let position = self.position();
        self.advance(); // 'return'
        let value = if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) {
            None
        } else {
            Some(self.parse_expression(0))
        };
        self.eat_semicolon();
        Statement::Return(ReturnStmt { value, position })
    }

    fn parse_print(&mut self) -> Statement {
        let position = self.position();
        self.advance(); // 'log'
        let value = self.parse_expression(0);
        self.eat_semicolon();
        Statement::Print(PrintStmt { value, position })
    }

    /// Entry point used both by `parse_statement` (consumes a trailing
    /// `;`) and by `for`'s post-statement (does not require one).
    fn parse_expression_led_statement(&mut self) -> Statement {
        let stmt = self.parse_expression_led_statement_inner();
        self.eat_semicolon();
        stmt
    }

    fn parse_expression_led_statement_inner(&mut self) -> Statement {
        let expr = self.parse_expression(0);
        let position = expr.position();
        if self.eat(TokenKind::Eq) {
            let value = self.parse_expression(0);
            match expr {
                Expression::Identifier(name, position) => {
                    Statement::Assignment(AssignmentStmt {
                        name,
                        value,
                        position,
                    })
                }
                Expression::Index {
                    object,
                    index,
                    position,
                } => Statement::IndexAssignment(IndexAssignmentStmt {
                    object: *object,
                    index: *index,
                    value,
                    position,
                }),
                Expression::Member {
                    object,
                    property,
                    position,
                } => Statement::MemberAssignment(MemberAssignmentStmt {
                    object: *object,
                    property,
                    value,
                    position,
                }),
                other => {
                    self.error("invalid assignment target", position);
                    Statement::Expression(other)
                }
            }
        } else {
            Statement::Expression(expr)
        }
    }

    // --- expressions -----------------------------------------------------

    fn binary_op_for(kind: TokenKind) -> Option<(u8, BinaryOp)> {
        use BinaryOp::*;
        Some(match kind {
            TokenKind::OrOr => (1, Or),
            TokenKind::AndAnd => (2, And),
            TokenKind::EqEq => (3, Eq),
            TokenKind::NotEq => (3, NotEq),
            TokenKind::Lt => (4, Lt),
            TokenKind::Gt => (4, Gt),
            TokenKind::LtEq => (4, LtEq),
            TokenKind::GtEq => (4, GtEq),
            TokenKind::Plus => (5, Add),
            TokenKind::Minus => (5, Sub),
            TokenKind::Star => (6, Mul),
            TokenKind::Slash => (6, Div),
            TokenKind::Percent => (6, Mod),
            _ => return None,
        })
    }

    fn parse_expression(&mut self, min_prec: u8) -> Expression {
        let mut left = self.parse_unary();
        loop {
            let Some((prec, op)) = Self::binary_op_for(self.current_kind()) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let position = self.position();
            self.advance();
            let right = self.parse_expression(prec + 1);
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        left
    }

    fn parse_unary(&mut self) -> Expression {
        let position = self.position();
        match self.current_kind() {
            TokenKind::Bang => {
                self.advance();
                Expression::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(self.parse_unary()),
                    position,
                }
            }
            TokenKind::Minus => {
                self.advance();
                Expression::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(self.parse_unary()),
                    position,
                }
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Expression {
        let mut expr = self.parse_primary();
        loop {
            let position = self.position();
            match self.current_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression(0));
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "call arguments");
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_index_or_slice(expr, position);
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect(TokenKind::Ident, "member access").literal;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property,
                        position,
                    };
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_index_or_slice(&mut self, object: Expression, position: Position) -> Expression {
        if self.eat(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression(0)))
            };
            self.expect(TokenKind::RBracket, "slice expression");
            return Expression::Slice {
                object: Box::new(object),
                start: None,
                end,
                position,
            };
        }

        let first = self.parse_expression(0);
        if self.eat(TokenKind::Colon) {
            let end = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expression(0)))
            };
            self.expect(TokenKind::RBracket, "slice expression");
            Expression::Slice {
                object: Box::new(object),
                start: Some(Box::new(first)),
                end,
                position,
            }
        } else {
            self.expect(TokenKind::RBracket, "index expression");
            Expression::Index {
                object: Box::new(object),
                index: Box::new(first),
                position,
            }
        }
    }

    fn parse_primary(&mut self) -> Expression {
        let position = self.position();
        match self.current_kind() {
            TokenKind::Number => {
                let lexeme = self.advance().literal;
                match lexeme.parse::<i64>() {
                    Ok(v) => Expression::Integer(v, position),
                    Err(_) => match lexeme.parse::<f64>() {
                        Ok(v) => Expression::Float(v, position),
                        Err(_) => {
                            self.error(format!("invalid numeric literal '{lexeme}'"), position);
                            Expression::Integer(0, position)
                        }
                    },
                }
            }
            TokenKind::String => Expression::Str(self.advance().literal, position),
            TokenKind::True => {
                self.advance();
                Expression::Bool(true, position)
            }
            TokenKind::False => {
                self.advance();
                Expression::Bool(false, position)
            }
            TokenKind::Nil => {
                self.advance();
                Expression::Nil(position)
            }
            TokenKind::Ident => {
                let name = self.advance().literal;
                if !self.no_struct_literal && self.check(TokenKind::LBrace) {
                    self.parse_struct_literal(name, position)
                } else {
                    Expression::Identifier(name, position)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression(0);
                self.expect(TokenKind::RParen, "parenthesized expression");
                expr
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expression(0));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket, "array literal");
                Expression::ArrayLiteral { elements, position }
            }
            _ => {
                let found = self.current().clone();
                self.error(
                    format!("unexpected token {:?} ({:?}) in expression", found.kind, found.literal),
                    position,
                );
                self.synchronize();
                Expression::Nil(position)
            }
        }
    }

    fn parse_struct_literal(&mut self, type_name: String, position: Position) -> Expression {
        self.advance(); // '{'
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let fname = self.expect(TokenKind::Ident, "struct literal field").literal;
            self.expect(TokenKind::Colon, "struct literal field");
            let value = self.parse_expression(0);
            fields.push((fname, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "struct literal");
        Expression::StructLiteral {
            type_name,
            fields,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(src: &str) -> Expression {
        let (program, diagnostics) = parse(&format!("{src};"));
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        let Declaration::Statement(Statement::Expression(expr)) = program.declarations.into_iter().next().unwrap() else {
            panic!("expected an expression statement");
        };
        expr
    }

    #[test]
    fn precedence_unary_times() {
        let expr = parse_expr("-a * b");
        let Expression::Binary { op: BinaryOp::Mul, left, .. } = expr else {
            panic!("expected a top-level multiplication");
        };
        assert!(matches!(*left, Expression::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn precedence_add_mul() {
        let expr = parse_expr("a + b * c");
        let Expression::Binary { op: BinaryOp::Add, right, .. } = expr else {
            panic!("expected a top-level addition");
        };
        assert!(matches!(*right, Expression::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn double_negation() {
        let expr = parse_expr("!!5");
        let Expression::Unary { op: UnaryOp::Not, expr: inner, .. } = expr else {
            panic!("expected outer not");
        };
        assert!(matches!(*inner, Expression::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn left_associative_addition() {
        let expr = parse_expr("a + b + c");
        let Expression::Binary { op: BinaryOp::Add, left, .. } = expr else {
            panic!("expected addition");
        };
        assert!(matches!(*left, Expression::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn error_recovery_still_returns_program() {
        let (program, diagnostics) = parse("mut x : = 5; mut y := 10;");
        assert!(!diagnostics.is_empty());
        assert!(!program.declarations.is_empty());
    }

    #[test]
    fn struct_literal_in_expression_position() {
        let expr = parse_expr("Point{x: 1, y: 2}");
        assert!(matches!(expr, Expression::StructLiteral { .. }));
    }

    #[test]
    fn colon_eq_declaration() {
        let (program, diagnostics) = parse("x := 5;");
        assert!(diagnostics.is_empty());
        assert!(matches!(program.declarations[0], Declaration::Var(_)));
    }
}
