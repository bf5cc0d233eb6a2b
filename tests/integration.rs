//! End-to-end scenarios driven entirely through the embedder-facing API.

use oxilisp::{env_init_default, print_to_string, run, Heap, Value};

fn eval_last(src: &str) -> Value {
    let _ = env_logger::try_init();
    let mut heap = Heap::new();
    let env = env_init_default(&mut heap);
    let results = run(src, &env, &mut heap);
    *results.last().expect("program produced no results")
}

fn print_last(src: &str) -> String {
    let _ = env_logger::try_init();
    let mut heap = Heap::new();
    let env = env_init_default(&mut heap);
    let results = run(src, &env, &mut heap);
    let last = *results.last().expect("program produced no results");
    print_to_string(last, &heap)
}

#[test]
fn addition() {
    assert_eq!(eval_last("(+ 1 2)"), Value::Int(3));
}

#[test]
fn define_then_reference_in_a_later_top_level_form() {
    assert_eq!(eval_last("(define x 10) (+ x x)"), Value::Int(20));
}

#[test]
fn lambda_application() {
    assert_eq!(eval_last("((lambda (x) (* x x)) 5)"), Value::Int(25));
}

#[test]
fn if_truthiness() {
    assert_eq!(eval_last("(if 0 1 2)"), Value::Int(2));
    assert_eq!(eval_last("(if 1 1 2)"), Value::Int(1));
}

#[test]
fn closures_capture_their_defining_frame() {
    assert_eq!(
        eval_last("(define f (lambda (x) (lambda (y) (+ x y)))) ((f 3) 4)"),
        Value::Int(7)
    );
}

#[test]
fn quoted_list_of_symbols_prints_upper_case() {
    assert_eq!(print_last("'(a b c)"), "(A B C)");
}

#[test]
fn lambda_parameter_shadows_outer_binding_only_inside_its_body() {
    let mut heap = Heap::new();
    let env = env_init_default(&mut heap);
    let results = run("(define x 10) ((lambda (x) x) 20) x", &env, &mut heap);
    assert_eq!(results[1], Value::Int(20));
    assert_eq!(results[2], Value::Int(10));
}

#[test]
fn malformed_read_reports_and_yields_no_results() {
    let _ = env_logger::try_init();
    let mut heap = Heap::new();
    let env = env_init_default(&mut heap);
    assert_eq!(run("(+ 1 2", &env, &mut heap), Vec::<Value>::new());
}

#[test]
fn eval_error_reports_and_continues_with_remaining_forms() {
    let _ = env_logger::try_init();
    let mut heap = Heap::new();
    let env = env_init_default(&mut heap);
    let results = run("(car 1) (+ 1 1)", &env, &mut heap);
    assert_eq!(results, vec![Value::Nil, Value::Int(2)]);
}
