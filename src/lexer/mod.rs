//! Lexer — turns source text into a stream of [`Token`]s.
//!
//! Follows `spec.md` §4.1: whitespace and comments are tracked for
//! line/column purposes but comments are still emitted as tokens so the
//! parser decides whether to skip them; the lexer itself never fails, it
//! only ever produces tokens (including `Illegal` and truncated `String`).

mod token;

pub use token::{Token, TokenKind};

use log::warn;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("mut", Mut),
        ("func", Func),
        ("struct", Struct),
        ("unsafe", Unsafe),
        ("if", If),
        ("else", Else),
        ("for", For),
        ("while", While),
        ("return", Return),
        ("log", Log),
        ("true", True),
        ("false", False),
        ("nil", Nil),
        ("break", Break),
        ("continue", Continue),
        ("int", Int),
        ("float", Float),
        ("string", StringType),
        ("bool", Bool),
        ("enum", Enum),
        ("type", TypeKw),
    ])
});

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    /// Lookahead buffer used by `peek_n`; filled lazily, drained by `next_token`.
    buffered: Vec<Token>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            buffered: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token, consuming it.
    pub fn next_token(&mut self) -> Token {
        if !self.buffered.is_empty() {
            return self.buffered.remove(0);
        }
        self.scan_token()
    }

    /// Returns the `k`-th upcoming token (0 = the next token about to be
    /// returned by `next_token`) without consuming any input.
    pub fn peek_n(&mut self, k: usize) -> Token {
        while self.buffered.len() <= k {
            let tok = self.scan_token();
            let is_eof = tok.kind == TokenKind::Eof;
            self.buffered.push(tok);
            if is_eof {
                break;
            }
        }
        self.buffered[k.min(self.buffered.len() - 1)].clone()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_char2(&self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        let (line, column) = self.here();

        let Some(c) = self.peek_char() else {
            return Token::new(TokenKind::Eof, String::new(), line, column);
        };

        if c == '/' && matches!(self.peek_char2(), Some('/')) {
            return self.scan_line_comment(line, column);
        }
        if c == '/' && matches!(self.peek_char2(), Some('*')) {
            return self.scan_block_comment(line, column);
        }
        if is_ident_start(c) {
            return self.scan_identifier(line, column);
        }
        if c.is_ascii_digit() {
            return self.scan_number(line, column);
        }
        if c == '"' {
            return self.scan_string(line, column);
        }
        self.scan_operator(line, column)
    }

    fn scan_line_comment(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            lexeme.push(c);
            self.bump();
        }
        Token::new(TokenKind::Comment, lexeme, line, column)
    }

    fn scan_block_comment(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        lexeme.push(self.bump().unwrap()); // '/'
        lexeme.push(self.bump().unwrap()); // '*'
        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek_char(), self.peek_char2()) {
                (Some('/'), Some('*')) => {
                    lexeme.push(self.bump().unwrap());
                    lexeme.push(self.bump().unwrap());
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    lexeme.push(self.bump().unwrap());
                    lexeme.push(self.bump().unwrap());
                    depth -= 1;
                }
                (Some(_), _) => {
                    lexeme.push(self.bump().unwrap());
                }
                (None, _) => break,
            }
        }
        Token::new(TokenKind::Comment, lexeme, line, column)
    }

    fn scan_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                lexeme.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = KEYWORDS.get(lexeme.as_str()).copied().unwrap_or(TokenKind::Ident);
        Token::new(kind, lexeme, line, column)
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') && self.peek_char2().is_some_and(|c| c.is_ascii_digit()) {
            lexeme.push(self.bump().unwrap()); // '.'
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    lexeme.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }
        Token::new(TokenKind::Number, lexeme, line, column)
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Token {
        self.bump(); // opening quote
        let mut body = String::new();
        loop {
            match self.peek_char() {
                None => break,
                Some('"') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    body.push(c);
                    self.bump();
                }
            }
        }
        Token::new(TokenKind::String, body, line, column)
    }

    fn scan_operator(&mut self, line: usize, column: usize) -> Token {
        let c = self.bump().unwrap();
        let two_char = |this: &mut Self, second: char, kind: TokenKind, single: TokenKind| {
            if this.peek_char() == Some(second) {
                this.bump();
                Token::new(kind, format!("{c}{second}"), line, column)
            } else {
                Token::new(single, c.to_string(), line, column)
            }
        };

        match c {
            '=' => two_char(self, '=', TokenKind::EqEq, TokenKind::Eq),
            '!' => two_char(self, '=', TokenKind::NotEq, TokenKind::Bang),
            '<' => two_char(self, '=', TokenKind::LtEq, TokenKind::Lt),
            '>' => two_char(self, '=', TokenKind::GtEq, TokenKind::Gt),
            '&' => two_char(self, '&', TokenKind::AndAnd, TokenKind::Illegal),
            '|' => two_char(self, '|', TokenKind::OrOr, TokenKind::Illegal),
            ':' => two_char(self, '=', TokenKind::ColonEq, TokenKind::Colon),
            '-' => two_char(self, '>', TokenKind::Arrow, TokenKind::Minus),
            '+' => Token::new(TokenKind::Plus, "+", line, column),
            '*' => Token::new(TokenKind::Star, "*", line, column),
            '/' => Token::new(TokenKind::Slash, "/", line, column),
            '%' => Token::new(TokenKind::Percent, "%", line, column),
            '(' => Token::new(TokenKind::LParen, "(", line, column),
            ')' => Token::new(TokenKind::RParen, ")", line, column),
            '{' => Token::new(TokenKind::LBrace, "{", line, column),
            '}' => Token::new(TokenKind::RBrace, "}", line, column),
            '[' => Token::new(TokenKind::LBracket, "[", line, column),
            ']' => Token::new(TokenKind::RBracket, "]", line, column),
            ',' => Token::new(TokenKind::Comma, ",", line, column),
            '.' => Token::new(TokenKind::Dot, ".", line, column),
            ';' => Token::new(TokenKind::Semicolon, ";", line, column),
            other => {
                warn!("illegal character '{other}' at {line}:{column}");
                Token::new(TokenKind::Illegal, other.to_string(), line, column)
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = vec![];
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn position_tracks_lines_and_columns() {
        let mut lexer = Lexer::new("ab\ncd");
        let a = lexer.next_token();
        assert_eq!((a.line, a.column), (1, 1));
        let cd = lexer.next_token();
        assert_eq!((cd.line, cd.column), (2, 1));
    }

    #[test]
    fn colon_eq_is_one_token() {
        let ks = kinds(":=");
        assert_eq!(ks, vec![TokenKind::ColonEq, TokenKind::Eof]);
    }

    #[test]
    fn nested_block_comment_is_one_token() {
        let mut lexer = Lexer::new("/* a /* b */ c */");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Comment);
        assert_eq!(tok.literal, "/* a /* b */ c */");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn unterminated_string_yields_body_to_eof() {
        let mut lexer = Lexer::new("\"abc");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.literal, "abc");
    }

    #[test]
    fn unrecognized_char_is_illegal() {
        let mut lexer = Lexer::new("@");
        assert_eq!(lexer.next_token().kind, TokenKind::Illegal);
    }

    #[test]
    fn eof_repeats_indefinitely() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn number_literal_with_fraction() {
        let mut lexer = Lexer::new("12.5");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(tok.literal, "12.5");
    }

    #[test]
    fn peek_n_does_not_consume() {
        let mut lexer = Lexer::new("a b c");
        let second = lexer.peek_n(1);
        assert_eq!(second.literal, "b");
        let first = lexer.next_token();
        assert_eq!(first.literal, "a");
    }

    #[test]
    fn keyword_lookup() {
        let ks = kinds("func mut struct");
        assert_eq!(
            ks,
            vec![TokenKind::Func, TokenKind::Mut, TokenKind::Struct, TokenKind::Eof]
        );
    }
}
