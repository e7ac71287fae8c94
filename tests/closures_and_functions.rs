use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

#[test]
fn closures_capture_the_enclosing_binding() {
    let v = eval(
        "func makeAdder(n: int) { \
            func add(x: int) { return x + n; } \
            return add; \
         } \
         mut addFive := makeAdder(5); \
         addFive(10);",
    );
    assert!(matches!(v, Value::Integer(15)));
}

#[test]
fn two_closures_from_the_same_factory_do_not_share_state() {
    let v = eval(
        "func makeAdder(n: int) { func add(x: int) { return x + n; } return add; } \
         mut addOne := makeAdder(1); \
         mut addTen := makeAdder(10); \
         addOne(1) + addTen(1);",
    );
    assert!(matches!(v, Value::Integer(13))); // 2 + 11
}

#[test]
fn mutually_recursive_top_level_functions_see_each_other() {
    let v = eval(
        "func isEven(n: int) { if n == 0 { return true; } return isOdd(n - 1); } \
         func isOdd(n: int) { if n == 0 { return false; } return isEven(n - 1); } \
         isEven(10);",
    );
    assert!(matches!(v, Value::Bool(true)));
}

#[test]
fn recursive_fibonacci() {
    let v = eval(
        "func fib(n: int) { \
            if n < 2 { return n; } \
            return fib(n - 1) + fib(n - 2); \
         } fib(10);",
    );
    assert!(matches!(v, Value::Integer(55)));
}

#[test]
fn wrong_arity_is_a_static_analysis_error_not_a_runtime_one() {
    match run_source("func add(a: int, b: int) { return a + b; } add(1);", "<test>") {
        RunOutcome::Diagnostics(diags) => assert!(!diags.is_empty()),
        RunOutcome::Value(v) => panic!("expected a diagnostic, got a value: {}", v.display_form()),
    }
}
