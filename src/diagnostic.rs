//! Shared diagnostic vocabulary used by the parser, analyzer and evaluator.
//!
//! All three stages that can fail (lex/parse, analyze, evaluate) report
//! through this one shape so the host-facing rendering in `spec.md` §7 is
//! implemented exactly once.

use colored::Colorize;
use std::fmt;

/// A source position. Lines and columns are 1-based and counted in code
/// points, not bytes (lexer contract, `spec.md` §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// Stable diagnostic codes, one per row of `spec.md` §7's taxonomy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    SyntaxError,
    UndefinedVar,
    UndefinedType,
    UndefinedField,
    DuplicateDecl,
    TypeError,
    Immutable,
    InvalidType,
    TypeMismatch,
    Undefined,
    RuntimeImmutable,
    WrongArgCount,
    NotAFunction,
    DivisionByZero,
    RuntimeError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::SyntaxError => "syntax-error",
            ErrorCode::UndefinedVar => "undefined-var",
            ErrorCode::UndefinedType => "undefined-type",
            ErrorCode::UndefinedField => "undefined-field",
            ErrorCode::DuplicateDecl => "duplicate-decl",
            ErrorCode::TypeError => "type-error",
            ErrorCode::Immutable => "immutable",
            ErrorCode::InvalidType => "invalid-type",
            ErrorCode::TypeMismatch => "type-mismatch",
            ErrorCode::Undefined => "undefined",
            ErrorCode::RuntimeImmutable => "immutable",
            ErrorCode::WrongArgCount => "wrong-arg-count",
            ErrorCode::NotAFunction => "not-a-function",
            ErrorCode::DivisionByZero => "division-by-zero",
            ErrorCode::RuntimeError => "runtime-error",
        };
        f.write_str(s)
    }
}

/// A single diagnostic, as produced by the parser or the analyzer.
///
/// The evaluator uses the same fields internally (see
/// `evaluator::value::RuntimeError`) but additionally carries a call-stack
/// snapshot, so it is not this exact type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub position: Position,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>, position: Position) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            position,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = format!("{}[{}]", self.severity, self.code);
        let tag = match self.severity {
            Severity::Error => tag.red().bold(),
            Severity::Warning => tag.yellow().bold(),
            Severity::Info => tag.blue().bold(),
        };
        writeln!(f, "{tag}: {}", self.message)?;
        write!(f, "  --> {}", self.position)?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Render a full diagnostic list the way a host (CLI, REPL) should present
/// it to a user, one diagnostic per blank-line-separated block.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}
