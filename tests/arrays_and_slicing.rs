use mars::evaluator::value::Value;
use mars::run::{run_source, RunOutcome};

fn eval(src: &str) -> Value {
    match run_source(src, "<test>") {
        RunOutcome::Value(v) => v,
        RunOutcome::Diagnostics(diags) => panic!("unexpected diagnostics: {diags:?}"),
    }
}

fn as_ints(v: &Value) -> Vec<i64> {
    let Value::Array(a) = v else { panic!("expected an array, got {}", v.kind_name()) };
    a.borrow()
        .iter()
        .map(|e| match e {
            Value::Integer(n) => *n,
            other => panic!("expected an int element, got {}", other.kind_name()),
        })
        .collect()
}

#[test]
fn indexing_reads_an_element() {
    assert!(matches!(eval("mut a := [10, 20, 30]; a[1];"), Value::Integer(20)));
}

#[test]
fn out_of_bounds_index_is_a_runtime_error_with_a_distinct_hint_from_negative() {
    let out_of_range = eval("mut a := [1, 2]; a[5];");
    assert!(out_of_range.is_error());
    let Value::Error(e) = out_of_range else { unreachable!() };
    assert!(e.hint.is_none());

    let negative = eval("mut a := [1, 2]; a[-5];");
    assert!(negative.is_error());
    let Value::Error(e) = negative else { unreachable!() };
    assert_eq!(e.hint.as_deref(), Some("negative index"));
}

#[test]
fn slicing_returns_a_fresh_array_not_an_alias() {
    let v = eval("mut a := [1, 2, 3, 4, 5]; mut b := a[1:3]; push(b, 99); a;");
    assert_eq!(as_ints(&v), vec![1, 2, 3, 4, 5]);
}

#[test]
fn negative_slice_bound_counts_from_the_end() {
    assert_eq!(as_ints(&eval("mut a := [1, 2, 3, 4, 5]; a[-2:];")), vec![4, 5]);
}

#[test]
fn push_pop_and_reverse_mutate_the_same_backing_array() {
    let v = eval(
        "mut a := [1, 2, 3]; \
         mut b := a; \
         push(b, 4); \
         pop(a); \
         reverse(a); \
         a;",
    );
    assert_eq!(as_ints(&v), vec![3, 2, 1]);
}

#[test]
fn append_is_a_pure_function_that_does_not_mutate_its_argument() {
    let v = eval("mut a := [1, 2]; mut b := append(a, 3); a;");
    assert_eq!(as_ints(&v), vec![1, 2]);
}

#[test]
fn indexed_assignment_writes_through_a_shared_binding() {
    let v = eval("mut a := [1, 2, 3]; mut b := a; b[0] = 99; a;");
    assert_eq!(as_ints(&v), vec![99, 2, 3]);
}

#[test]
fn string_indexing_is_immutable() {
    match run_source(r#"mut s := "hi"; s[0] = "x";"#, "<test>") {
        RunOutcome::Diagnostics(diags) => assert!(!diags.is_empty()),
        RunOutcome::Value(v) => panic!("expected assignment into a string index to be rejected, got {}", v.display_form()),
    }
}
