use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

#[test]
fn integer_arithmetic_stays_integer() {
    assert!(matches!(eval("2 + 3 * 4;"), Value::Integer(14)));
}

#[test]
fn mixing_float_promotes_the_whole_expression() {
    let v = eval("1 + 2.5;");
    assert!(matches!(v, Value::Float(f) if f == 3.5));
}

#[test]
fn integer_division_truncates_toward_zero() {
    assert!(matches!(eval("-7 / 2;"), Value::Integer(-3)));
}

#[test]
fn modulo_truncates_float_operands_to_integer_first() {
    let v = eval("5.5 % 2.0;");
    assert!(matches!(v, Value::Integer(1)));
}

#[test]
fn comparisons_yield_bool() {
    assert_eq!(eval("3 < 4;").display_form(), "true");
    assert_eq!(eval("3 >= 4;").display_form(), "false");
}

#[test]
fn string_concatenation_via_plus() {
    let v = eval(r#""foo" + "bar";"#);
    assert!(matches!(v, Value::Str(s) if s == "foobar"));
}

#[test]
fn cross_type_numeric_equality_is_always_false() {
    assert!(matches!(eval("3 == 3.0;"), Value::Bool(false)));
}

#[test]
fn division_by_zero_is_a_runtime_error_value_not_a_panic() {
    assert!(eval("1 / 0;").is_error());
}
