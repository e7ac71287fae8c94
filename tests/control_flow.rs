use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

#[test]
fn if_else_picks_the_matching_branch() {
    let v = eval("mut x := 0; if x == 0 { x = 1; } else { x = 2; } x;");
    assert!(matches!(v, Value::Integer(1)));
}

#[test]
fn while_loop_accumulates() {
    let v = eval("mut i := 0; mut sum := 0; while i < 5 { sum = sum + i; i = i + 1; } sum;");
    assert!(matches!(v, Value::Integer(10)));
}

#[test]
fn for_loop_with_continue_skips_even_numbers() {
    let v = eval(
        "mut i := 0; mut sum := 0; \
         for ; i < 6; i = i + 1 { if i % 2 == 0 { continue; } sum = sum + i; } sum;",
    );
    assert!(matches!(v, Value::Integer(9))); // 1 + 3 + 5
}

#[test]
fn break_stops_the_loop_early() {
    let v = eval("mut i := 0; for ; i < 100; i = i + 1 { if i == 4 { break; } } i;");
    assert!(matches!(v, Value::Integer(4)));
}

#[test]
fn nested_loops_break_only_the_inner_one() {
    let v = eval(
        "mut outer := 0; mut total := 0; \
         for ; outer < 3; outer = outer + 1 { \
            mut inner := 0; \
            for ; inner < 10; inner = inner + 1 { if inner == 2 { break; } total = total + 1; } \
         } total;",
    );
    assert!(matches!(v, Value::Integer(6))); // 2 inner iterations * 3 outer
}

#[test]
fn return_short_circuits_the_enclosing_function() {
    let v = eval(
        "func firstPositive(xs: [3]int) { \
            mut i := 0; \
            for ; i < 3; i = i + 1 { if xs[i] > 0 { return xs[i]; } } \
            return -1; \
         } firstPositive([-1, -2, 5]);",
    );
    assert!(matches!(v, Value::Integer(5)));
}
