use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

#[test]
fn len_counts_bytes_for_strings_and_elements_for_arrays() {
    assert!(matches!(eval(r#"len("hello");"#), Value::Integer(5)));
    assert!(matches!(eval("len([1, 2, 3]);"), Value::Integer(3)));
}

#[test]
fn join_stringifies_non_string_elements() {
    let v = eval(r#"join([1, 2, 3], ", ");"#);
    assert!(matches!(v, Value::Str(s) if s == "1, 2, 3"));
}

#[test]
fn to_int_and_to_float_parse_strings() {
    assert!(matches!(eval(r#"toInt("42");"#), Value::Integer(42)));
    let v = eval(r#"toFloat("3.5");"#);
    assert!(matches!(v, Value::Float(f) if f == 3.5));
}

#[test]
fn to_int_rejects_garbage() {
    assert!(eval(r#"toInt("not a number");"#).is_error());
}

#[test]
fn get_type_names_the_runtime_kind() {
    assert!(matches!(eval("getType(1);"), Value::Str(s) if s == "int"));
    assert!(matches!(eval(r#"getType("s");"#), Value::Str(s) if s == "string"));
    assert!(matches!(eval("getType([1]);"), Value::Str(s) if s == "array"));
}

#[test]
fn min_and_max_prefer_integer_results_for_integer_inputs() {
    assert!(matches!(eval("min(3, 7);"), Value::Integer(3)));
    assert!(matches!(eval("max(3, 7);"), Value::Integer(7)));
}

#[test]
fn sqrt_of_a_negative_number_is_a_runtime_error() {
    assert!(eval("sqrt(-1.0);").is_error());
}

#[test]
fn pow_of_integers_stays_integer() {
    assert!(matches!(eval("pow(2, 10);"), Value::Integer(1024)));
}

#[test]
fn type_predicates_agree_with_get_type() {
    assert!(matches!(eval("isInt(1);"), Value::Bool(true)));
    assert!(matches!(eval("isInt(1.0);"), Value::Bool(false)));
    assert!(matches!(eval(r#"isString("x");"#), Value::Bool(true)));
    assert!(matches!(eval("isArray([1]);"), Value::Bool(true)));
    assert!(matches!(eval("isBool(true);"), Value::Bool(true)));
}

#[test]
fn now_returns_an_rfc3339_timestamp() {
    let v = eval("now();");
    let Value::Str(s) = v else { panic!("expected a string") };
    assert_eq!(s.len(), "2024-01-01T00:00:00Z".len());
    assert!(s.ends_with('Z'));
    assert_eq!(s.as_bytes()[4], b'-');
    assert_eq!(s.as_bytes()[7], b'-');
    assert_eq!(s.as_bytes()[10], b'T');
}
