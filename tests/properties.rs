use indoc::indoc;

use pyinterp::runtime::error::ErrorKind;
use pyinterp::{Interpreter, InterpreterConfig, InterpreterError, Value};

fn interpreter(config: InterpreterConfig) -> Interpreter {
    Interpreter::capturing(config)
}

fn eval(source: &str) -> Result<Value, InterpreterError> {
    interpreter(InterpreterConfig::default()).evaluate(source)
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3").expect("eval"), Value::Int(7));
    assert_eq!(eval("(1 + 2) * 3").expect("eval"), Value::Int(9));
    assert_eq!(eval("2 ** 3 ** 2").expect("eval"), Value::Int(512));
    assert_eq!(eval("not 1 == 2").expect("eval"), Value::Bool(true));
    assert_eq!(eval("10 - 4 - 3").expect("eval"), Value::Int(3));
}

#[test]
fn chained_comparison_short_circuits() {
    assert_eq!(eval("1 < 2 < 0 < 5").expect("eval"), Value::Bool(false));

    let source = indoc! {"
        seen = []
        def side(v):
            seen.append(v)
            return v
        1 < 2 < side(0) < side(5)
        seen
    "};
    assert_eq!(eval(source).expect("eval").repr(), "[0]");
}

#[test]
fn boolean_operators_short_circuit() {
    assert_eq!(eval("False and (1/0)").expect("and"), Value::Bool(false));
    assert_eq!(eval("True or (1/0)").expect("or"), Value::Bool(true));
    let error = eval("True and (1/0)").expect_err("evaluated");
    assert_eq!(error.kind(), ErrorKind::ZeroDivisionError);
}

#[test]
fn defaults_and_varargs() {
    let mut interpreter = interpreter(InterpreterConfig::default());
    interpreter
        .evaluate("def f(a, b=2, *rest):\n    return a + b + len(rest)")
        .expect("def");
    assert_eq!(interpreter.evaluate("f(1)").expect("f(1)"), Value::Int(3));
    assert_eq!(
        interpreter.evaluate("f(1, 5, 9, 9)").expect("f(1, 5, 9, 9)"),
        Value::Int(8)
    );
}

#[test]
fn recursion_ceiling_leaves_the_interpreter_usable() {
    let config = InterpreterConfig::default().with_max_recursion_depth(50);
    let mut interpreter = interpreter(config);
    let error = interpreter
        .evaluate("def forever(n):\n    return forever(n + 1)\nforever(0)")
        .expect_err("recursion");
    assert_eq!(error.kind(), ErrorKind::RecursionError);
    assert_eq!(
        error.to_string(),
        "RecursionError: maximum recursion depth of 50 exceeded"
    );

    let source = indoc! {"
        def depth(n):
            if n == 0:
                return 0
            return 1 + depth(n - 1)
        depth(49)
    "};
    assert_eq!(interpreter.evaluate(source).expect("usable"), Value::Int(49));
    let error = interpreter.evaluate("depth(50)").expect_err("one too deep");
    assert_eq!(error.kind(), ErrorKind::RecursionError);
}

#[test]
fn slice_assignment_is_visible_through_aliases() {
    let mut interpreter = interpreter(InterpreterConfig::default());
    interpreter
        .evaluate("lst = [4, 5, 6]\nalias = lst\nlst[1:3] = [7, 8]")
        .expect("slice assignment");
    let expected = Value::list(vec![Value::Int(4), Value::Int(7), Value::Int(8)]);
    assert_eq!(interpreter.global("lst"), Some(expected.clone()));
    assert_eq!(interpreter.global("alias"), Some(expected));
}

#[test]
fn loop_ceiling_allows_exactly_the_configured_iterations() {
    let config = InterpreterConfig::default().with_max_loop_iterations(25);
    let mut interpreter = interpreter(config);
    let error = interpreter
        .evaluate("n = 0\nwhile True:\n    n += 1")
        .expect_err("runaway loop");
    assert_eq!(error.kind(), ErrorKind::ResourceExhausted);
    assert_eq!(interpreter.global("n"), Some(Value::Int(25)));

    interpreter
        .evaluate("m = 0\nfor i in range(25):\n    m += 1")
        .expect("exactly at the ceiling");
    assert_eq!(interpreter.global("m"), Some(Value::Int(25)));
    let error = interpreter
        .evaluate("for i in range(26):\n    pass")
        .expect_err("one past the ceiling");
    assert_eq!(error.kind(), ErrorKind::ResourceExhausted);
}

#[test]
fn undefined_names_are_reported() {
    let error = eval("value + 1").expect_err("undefined");
    assert_eq!(error.kind(), ErrorKind::NameError);
    assert_eq!(error.to_string(), "NameError: name 'value' is not defined");
}

#[test]
fn closures_capture_a_copy_of_enclosing_scopes() {
    let source = indoc! {"
        limit = 1
        def get_limit():
            return limit
        limit = 2
        get_limit()
    "};
    assert_eq!(eval(source).expect("eval"), Value::Int(1));

    let source = indoc! {"
        def counter():
            count = 0
            def bump():
                nonlocal count
                count = count + 1
                return count
            return (bump(), bump(), count)
        counter()
    "};
    assert_eq!(eval(source).expect("eval").repr(), "(1, 1, 0)");
}

#[test]
fn closures_share_mutable_containers() {
    let source = indoc! {"
        log = []
        def record(item):
            log.append(item)
        record(1)
        record(2)
        log
    "};
    assert_eq!(eval(source).expect("eval").repr(), "[1, 2]");
}

#[test]
fn instances_are_independent() {
    let source = indoc! {"
        class Box:
            def __init__(self, item):
                self.item = item
        a = Box(1)
        b = Box(2)
        a.item = 10
        (a.item, b.item)
    "};
    assert_eq!(eval(source).expect("eval").repr(), "(10, 2)");
}

#[test]
fn separate_interpreters_share_nothing() {
    let mut first = interpreter(InterpreterConfig::default());
    let mut second = interpreter(InterpreterConfig::default());
    first
        .evaluate("def shared():\n    return 1\nx = 1")
        .expect("first");
    assert_eq!(
        second.evaluate("shared()").expect_err("isolated").kind(),
        ErrorKind::NameError
    );
    assert_eq!(second.global("x"), None);
}

#[test]
fn one_shot_evaluate() {
    assert_eq!(pyinterp::evaluate("len('four')").expect("eval"), Value::Int(4));
}
