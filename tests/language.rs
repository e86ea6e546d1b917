use klisp::{
    Error, EvalError, Scope, ScopeError, ScopeRef, Span, Value, evaluate_in_new_scope,
    evaluate_with_output, parse_str,
};
use pretty_assertions::assert_eq;

fn run_in(source: &str, scope: &ScopeRef) -> (Result<Value, Error>, String) {
    let mut out = Vec::new();
    let result = evaluate_with_output(source, scope, &mut out);
    (result, String::from_utf8(out).expect("print output is utf-8"))
}

fn eval(source: &str) -> Result<Value, Error> {
    run_in(source, &Scope::new_global()).0
}

fn assert_value(source: &str, expected: Value) {
    match eval(source) {
        Ok(value) => assert_eq!(value, expected, "evaluating {source}"),
        Err(e) => panic!("evaluating {source} failed: {e}"),
    }
}

fn assert_unbound(source: &str, symbol: &str) {
    match eval(source) {
        Err(Error::Eval(EvalError::Scope(ScopeError::UnboundSymbol(name, _)))) => {
            assert_eq!(name, symbol, "evaluating {source}")
        }
        other => panic!("expected `{symbol}` to be unbound in {source}, got {other:?}"),
    }
}

fn number(n: f32) -> Value {
    Value::Number(n)
}

#[test]
fn nested_arithmetic() {
    assert_value("(/ (* (- 3 1) 10) 5)", number(4.0));
    assert_eq!(eval("(+ 1.5 2)").unwrap().to_string(), "3.5");
    assert_eq!(eval("(* 2 2)").unwrap().to_string(), "4.0");
}

#[test]
fn print_joins_arguments() {
    let (result, output) = run_in(r#"(print "hello" "world")"#, &Scope::new_global());
    assert_eq!(result, Ok(Value::String("hello world".to_string())));
    assert_eq!(output, "hello world\n");
}

#[test]
fn function_with_let_and_if() {
    let program = "(fun foo (a b c) (if a b c))\n(let ((switch false)) (foo switch 50 100))";
    assert_value(program, number(100.0));
    assert_value("(fun foo [a b c] (if a b c)) (foo true 50 100)", number(50.0));
}

#[test]
fn recursion_through_the_defining_scope() {
    let program = "
        (fun count-down (n acc)
          (if (eq n 0) acc (count-down (- n 1) (cons acc n))))
        (count-down 3 [])";
    assert_value(
        program,
        Value::List(vec![number(3.0), number(2.0), number(1.0)]),
    );
}

#[test]
fn closures_capture_their_defining_scope() {
    assert_value(
        "(fun adder (n) (fun add (x) (+ x n))) (let ((plus-two (adder 2))) (plus-two 3))",
        number(5.0),
    );
}

#[test]
fn closure_bodies_fall_back_to_the_call_site() {
    assert_value("(fun get y) (let ((y 1)) (get))", number(1.0));
    assert_value("(fun g k) (fun h [k] (g)) (h 7)", number(7.0));
    // The defining scope wins when both bind the name.
    assert_value(
        "(fun make (let ((y 1)) (fun gety y))) (let ((y 2) (f (make))) (f))",
        number(1.0),
    );
    assert_unbound("(fun get y) (get)", "y");
}

#[test]
fn primitive_names_in_head_position_call_the_primitive() {
    assert!(matches!(
        eval("(fun car [x] x) (car 5)"),
        Err(Error::Eval(EvalError::InvalidArguments(..)))
    ));
    assert_value("(fun car [x] x) (let ((c car)) (c 5))", number(5.0));
}

#[test]
fn let_scope_isolation() {
    assert_unbound("(let ((x 1)) x) x", "x");
    assert_unbound("(let ((a 1) (b a)) b)", "a");
    assert_value("(let ((x 1)) (let ((x 2)) x))", number(2.0));
}

#[test]
fn functions_defined_inside_let_stay_there() {
    assert_unbound("(let ((n 1)) (fun inner n)) (inner)", "inner");
}

#[test]
fn equality() {
    assert_value("(eq 1 1)", Value::Boolean(true));
    assert_value("(neq 1 2)", Value::Boolean(true));
    assert_value("(eq [1 2] [1 2 3])", Value::Boolean(false));
    assert_value(r#"(eq "a" 1)"#, Value::Boolean(false));
    assert_value("(eq (fun same 1) (fun SAME 2))", Value::Boolean(true));
    assert_value("(eq (fun one 1) (fun two 1))", Value::Boolean(false));
    assert_value("(eq (fun ÄPFEL 1) (fun äpfel 2))", Value::Boolean(true));
}

#[test]
fn names_and_keywords_ignore_case() {
    assert_value("(FUN Foo TRUE) (foo)", Value::Boolean(true));
    assert_value("(LET ((X 2)) (* x X))", number(4.0));
    assert_value("(IF False 1 2)", number(2.0));
}

#[test]
fn cons_appends() {
    assert_value(
        "(cons [1 2] 3)",
        Value::List(vec![number(1.0), number(2.0), number(3.0)]),
    );
    assert_value("(car (cdr [1 2 3]))", number(2.0));
}

#[test]
fn closure_arity_is_checked() {
    match eval("(fun pair (a b) [a b]) (pair 1)") {
        Err(Error::Eval(EvalError::Arity {
            name,
            expected,
            found,
            ..
        })) => {
            assert_eq!(name, "pair");
            assert_eq!((expected, found), (2, 1));
        }
        other => panic!("expected an arity error, got {other:?}"),
    }
}

#[test]
fn if_requires_a_boolean() {
    assert!(matches!(
        eval("(if 1 2 3)"),
        Err(Error::Eval(EvalError::TypeMismatch { .. }))
    ));
}

#[test]
fn calling_a_non_function() {
    assert!(matches!(
        eval("(let ((x 1)) (x 2))"),
        Err(Error::Eval(EvalError::NotAFunction { .. }))
    ));
}

#[test]
fn unbound_symbol_points_at_the_reference() {
    match eval("(+ 1 missing)") {
        Err(e) => assert_eq!(e.span(), Some(Span::new(5, 12))),
        Ok(value) => panic!("expected an error, got {value}"),
    }
}

#[test]
fn a_session_shares_one_root_scope() {
    let root = Scope::new_global();
    let (defined, _) = run_in("(fun square (x) (* x x))", &root);
    assert!(defined.is_ok());
    let (result, _) = run_in("(square 7)", &root);
    assert_eq!(result, Ok(number(49.0)));
    let (fresh, _) = run_in("(square 7)", &Scope::new_global());
    assert!(fresh.is_err());
}

#[test]
fn each_program_run_starts_from_an_empty_scope() {
    assert_eq!(evaluate_in_new_scope("(fun square (x) (* x x)) (square 3)"), Ok(number(9.0)));
    assert!(evaluate_in_new_scope("(square 3)").is_err());
}

#[test]
fn displayed_programs_parse_back_to_the_same_tree() {
    let programs = [
        "(/ (* (- 3 1) 10) 5)",
        r#"(print "tab\there" "quote\"d")"#,
        "(fun foo (a b c) (if a b c))",
        "(let ((switch false) (xs [1 [2 3]])) (foo switch 50 100))",
        "[true 1.5 sym]",
    ];
    for program in programs {
        let parsed = parse_str(program).expect("program parses");
        let displayed: Vec<String> = parsed.iter().map(ToString::to_string).collect();
        let reparsed = parse_str(&displayed.join(" ")).expect("display parses");
        assert_eq!(parsed, reparsed, "round trip of {program}");
    }
}

#[test]
fn an_empty_program_is_an_error() {
    assert!(matches!(eval("   "), Err(Error::Parse(_))));
}
