use mars::diagnostic::ErrorCode;
use mars::run::{run_source, RunOutcome};

fn diagnostics(src: &str) -> Vec<mars::diagnostic::Diagnostic> {
    match run_source(src, "<test>") {
        RunOutcome::Diagnostics(diags) => diags,
        RunOutcome::Value(v) => panic!("expected diagnostics, got a value: {}", v.display_form()),
    }
}

#[test]
fn unterminated_function_signature_is_a_syntax_error() {
    let diags = diagnostics("func () {}");
    assert_eq!(diags[0].code, ErrorCode::SyntaxError);
}

#[test]
fn referencing_an_undefined_variable_is_an_analysis_error() {
    let diags = diagnostics("x;");
    assert_eq!(diags[0].code, ErrorCode::UndefinedVar);
}

#[test]
fn assigning_to_an_immutable_binding_is_rejected() {
    let diags = diagnostics("x: int = 1; x = 2;");
    assert_eq!(diags[0].code, ErrorCode::Immutable);
}

#[test]
fn redeclaring_a_name_in_the_same_scope_is_rejected() {
    let diags = diagnostics("mut x := 1; mut x := 2; x;");
    assert_eq!(diags[0].code, ErrorCode::DuplicateDecl);
}

#[test]
fn referencing_an_undefined_struct_type_is_rejected() {
    let diags = diagnostics("mut p := Ghost{x: 1};");
    assert_eq!(diags[0].code, ErrorCode::UndefinedType);
}

#[test]
fn type_mismatch_in_a_declared_binding_is_rejected() {
    let diags = diagnostics(r#"x: int = "not an int";"#);
    assert_eq!(diags[0].code, ErrorCode::TypeError);
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let diags = diagnostics("break;");
    assert_eq!(diags[0].code, ErrorCode::SyntaxError);
}

#[test]
fn returning_outside_a_function_is_rejected() {
    let diags = diagnostics("return 1;");
    assert_eq!(diags[0].code, ErrorCode::TypeError);
}

#[test]
fn render_diagnostics_produces_a_human_readable_block() {
    let diags = diagnostics("x;");
    let rendered = mars::diagnostic::render_diagnostics(&diags);
    assert!(rendered.contains("undefined-var"));
    assert!(rendered.contains("1:1"));
}
