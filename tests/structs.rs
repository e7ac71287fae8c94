use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

#[test]
fn struct_literal_and_field_access() {
    let v = eval("struct Point { x: int; y: int } mut p := Point{x: 3, y: 4}; p.x + p.y;");
    assert!(matches!(v, Value::Integer(7)));
}

#[test]
fn struct_display_form_lists_fields_in_declaration_order() {
    let v = eval("struct Point { x: int; y: int } Point{x: 1, y: 2};");
    assert_eq!(v.display_form(), "Point{x: 1, y: 2}");
}

#[test]
fn a_struct_can_be_used_before_its_declaration_appears_in_source() {
    // the struct pre-pass registers field order before any statement runs,
    // so a function declared earlier in the file can still build one.
    let v = eval(
        "func origin() { return Point{x: 0, y: 0}; } \
         struct Point { x: int; y: int } \
         origin().x;",
    );
    assert!(matches!(v, Value::Integer(0)));
}

#[test]
fn field_assignment_is_rejected_by_static_analysis() {
    match run_source(
        "struct Point { x: int; y: int } mut p := Point{x: 1, y: 2}; p.x = 5;",
        "<test>",
    ) {
        RunOutcome::Diagnostics(diags) => assert!(!diags.is_empty()),
        RunOutcome::Value(v) => panic!("expected field assignment to be rejected, got {}", v.display_form()),
    }
}

#[test]
fn nested_structs_as_fields() {
    let v = eval(
        "struct Point { x: int; y: int } \
         struct Line { from: Point; to: Point } \
         mut l := Line{from: Point{x: 0, y: 0}, to: Point{x: 3, y: 4}}; \
         l.to.x;",
    );
    assert!(matches!(v, Value::Integer(3)));
}
