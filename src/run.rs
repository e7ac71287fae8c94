//! The top-level pipeline entry point — `spec.md` §6.3.
//!
//! `run_source` is the one function external collaborators (the CLI, a
//! REPL, a test harness) are expected to call. It owns the lex → parse →
//! analyze → evaluate sequence and the short-circuiting contract: any stage
//! that produces diagnostics halts the pipeline before the next stage runs.

use crate::diagnostic::Diagnostic;
use crate::evaluator::value::Value;
use crate::{analyzer, evaluator, parser};
use log::trace;

/// The terminal outcome of running a Mars source string: either the
/// program's final value, or a non-empty list of diagnostics from whichever
/// stage rejected it first.
pub enum RunOutcome {
    Value(Value),
    Diagnostics(Vec<Diagnostic>),
}

/// Lexes, parses, analyzes and evaluates `source`. `file_name` is used only
/// in diagnostic messages and is not otherwise interpreted.
pub fn run_source(source: &str, file_name: &str) -> RunOutcome {
    trace!("running {file_name} ({} bytes)", source.len());

    let (program, parse_diagnostics) = parser::parse(source);
    if !parse_diagnostics.is_empty() {
        trace!("{file_name}: {} syntax diagnostic(s)", parse_diagnostics.len());
        return RunOutcome::Diagnostics(parse_diagnostics);
    }

    let analysis_diagnostics = analyzer::analyze(&program);
    if !analysis_diagnostics.is_empty() {
        trace!("{file_name}: {} analysis diagnostic(s)", analysis_diagnostics.len());
        return RunOutcome::Diagnostics(analysis_diagnostics);
    }

    let value = evaluator::evaluate(&program);
    trace!("{file_name}: evaluated to {}", value.kind_name());
    RunOutcome::Value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_yields_the_last_value() {
        match run_source("1 + 2;", "<test>") {
            RunOutcome::Value(Value::Integer(3)) => {}
            other => panic!("expected Integer(3), got a different outcome: {}", matches!(other, RunOutcome::Value(_))),
        }
    }

    #[test]
    fn syntax_errors_prevent_analysis_and_evaluation() {
        match run_source("func () {}", "<test>") {
            RunOutcome::Diagnostics(diags) => assert!(!diags.is_empty()),
            RunOutcome::Value(_) => panic!("expected diagnostics"),
        }
    }

    #[test]
    fn analysis_errors_prevent_evaluation() {
        match run_source("x;", "<test>") {
            RunOutcome::Diagnostics(diags) => assert!(!diags.is_empty()),
            RunOutcome::Value(_) => panic!("expected diagnostics"),
        }
    }
}
