//! Runtime tests — statement dispatch, operators, stack discipline, failures

use vscript_lang::ast::*;
use vscript_lang::runtime::{Interpreter, RuntimeError, State, Value};

fn program(statements: Vec<Statement>) -> VisualScript {
    VisualScript::new(vec![Node::new(statements)])
}

fn run(statements: Vec<Statement>) -> String {
    let program = program(statements);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp.run().unwrap();
    String::from_utf8(interp.into_output()).unwrap()
}

fn run_err(statements: Vec<Statement>) -> (RuntimeError, String) {
    let program = program(statements);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    let err = interp.run().unwrap_err();
    assert_eq!(interp.state(), State::Failed);
    (err, String::from_utf8(interp.into_output()).unwrap())
}

fn eval(expr: Expression) -> Value {
    let program = VisualScript::default();
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp.eval_expr(&expr).unwrap();
    assert_eq!(interp.stack().len(), 1);
    interp.pop().unwrap()
}

fn eval_err(expr: Expression) -> RuntimeError {
    let program = VisualScript::default();
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp.eval_expr(&expr).unwrap_err()
}

fn num(n: f64) -> Expression {
    Expression::number(n)
}

fn text(s: &str) -> Expression {
    Expression::text(s)
}

fn bin(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
    Expression::binary(op, lhs, rhs)
}

// ── End-to-end scenarios ────────────────────────────────────

#[test]
fn assign_then_print() {
    let out = run(vec![
        Statement::set_variable("x", num(5.0)),
        Statement::print(Expression::load("x")),
    ]);
    assert_eq!(out, "5\n");
}

#[test]
fn assign_from_sum() {
    let out = run(vec![
        Statement::set_variable("x", num(3.0)),
        Statement::set_variable("y", bin(BinaryOp::Add, Expression::load("x"), num(4.0))),
        Statement::print(Expression::load("y")),
    ]);
    assert_eq!(out, "7\n");
}

#[test]
fn if_else_takes_else_branch() {
    let out = run(vec![Statement::IfElse {
        condition: bin(BinaryOp::Lt, num(2.0), num(1.0)),
        body: vec![Statement::print(text("yes"))],
        else_body: vec![Statement::print(text("no"))],
    }]);
    assert_eq!(out, "no\n");
}

#[test]
fn division_by_zero_prints_nothing() {
    let (err, out) = run_err(vec![Statement::print(bin(BinaryOp::Div, num(10.0), num(0.0)))]);
    assert!(matches!(err, RuntimeError::DivisionByZero));
    assert_eq!(out, "");
}

#[test]
fn undefined_variable_is_named() {
    let (err, _) = run_err(vec![Statement::print(Expression::load("undefined_name"))]);
    match err {
        RuntimeError::UndefinedVariable { name } => assert_eq!(name, "undefined_name"),
        other => panic!("expected UndefinedVariable, got {:?}", other),
    }
}

// ── Statements ──────────────────────────────────────────────

#[test]
fn if_true_runs_body_in_order() {
    let out = run(vec![Statement::If {
        condition: num(1.0),
        body: vec![Statement::print(text("a")), Statement::print(text("b"))],
    }]);
    assert_eq!(out, "a\nb\n");
}

#[test]
fn if_false_does_nothing() {
    let out = run(vec![Statement::If {
        condition: num(0.0),
        body: vec![Statement::print(text("never"))],
    }]);
    assert_eq!(out, "");
}

#[test]
fn if_else_true_skips_else_body() {
    let out = run(vec![Statement::IfElse {
        condition: text("non-empty"),
        body: vec![Statement::print(text("then"))],
        else_body: vec![Statement::print(text("else"))],
    }]);
    assert_eq!(out, "then\n");
}

#[test]
fn empty_text_condition_is_false() {
    let out = run(vec![Statement::IfElse {
        condition: text(""),
        body: vec![Statement::print(text("then"))],
        else_body: vec![Statement::print(text("else"))],
    }]);
    assert_eq!(out, "else\n");
}

#[test]
fn nested_conditionals() {
    let out = run(vec![
        Statement::set_variable("n", num(7.0)),
        Statement::If {
            condition: bin(BinaryOp::Gt, Expression::load("n"), num(5.0)),
            body: vec![Statement::IfElse {
                condition: bin(BinaryOp::Eq, Expression::load("n"), num(7.0)),
                body: vec![Statement::set_variable("r", text("seven"))],
                else_body: vec![Statement::set_variable("r", text("big"))],
            }],
        },
        Statement::print(Expression::load("r")),
    ]);
    assert_eq!(out, "seven\n");
}

#[test]
fn assignment_overwrites() {
    let program = program(vec![
        Statement::set_variable("x", num(1.0)),
        Statement::set_variable("x", text("two")),
    ]);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp.run().unwrap();
    assert_eq!(interp.get_global("x"), Some(&Value::Text("two".into())));
    assert_eq!(interp.globals().len(), 1);
}

#[test]
fn print_formats() {
    let out = run(vec![
        Statement::print(num(2.5)),
        Statement::print(num(-0.25)),
        Statement::print(bin(BinaryOp::Div, num(1.0), num(4.0))),
        Statement::print(text("plain text")),
    ]);
    assert_eq!(out, "2.5\n-0.25\n0.25\nplain text\n");
}

#[test]
fn nodes_share_globals_and_run_in_order() {
    let program = VisualScript::new(vec![
        Node::new(vec![Statement::set_variable("x", num(1.0))]),
        Node::new(vec![Statement::print(Expression::load("x"))]),
        Node::new(vec![Statement::set_variable(
            "x",
            bin(BinaryOp::Add, Expression::load("x"), num(1.0)),
        )]),
        Node::new(vec![Statement::print(Expression::load("x"))]),
    ]);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp.run().unwrap();
    assert_eq!(String::from_utf8(interp.into_output()).unwrap(), "1\n2\n");
}

// ── Operators ───────────────────────────────────────────────

#[test]
fn arithmetic() {
    assert_eq!(eval(bin(BinaryOp::Add, num(3.0), num(4.0))), Value::Number(7.0));
    assert_eq!(eval(bin(BinaryOp::Mul, num(6.0), num(7.0))), Value::Number(42.0));
    assert_eq!(eval(bin(BinaryOp::Div, num(10.0), num(4.0))), Value::Number(2.5));
}

#[test]
fn subtraction_preserves_operand_order() {
    assert_eq!(eval(bin(BinaryOp::Sub, num(10.0), num(3.0))), Value::Number(7.0));
    assert_eq!(eval(bin(BinaryOp::Sub, num(3.0), num(10.0))), Value::Number(-7.0));
}

#[test]
fn division_preserves_operand_order() {
    assert_eq!(eval(bin(BinaryOp::Div, num(1.0), num(2.0))), Value::Number(0.5));
}

#[test]
fn nested_expression_stack_discipline() {
    // (8 - 2) * (1 + 2) - 3
    let expr = bin(
        BinaryOp::Sub,
        bin(
            BinaryOp::Mul,
            bin(BinaryOp::Sub, num(8.0), num(2.0)),
            bin(BinaryOp::Add, num(1.0), num(2.0)),
        ),
        num(3.0),
    );
    assert_eq!(eval(expr), Value::Number(15.0));
}

#[test]
fn numeric_comparisons() {
    let cases = [
        (BinaryOp::Lt, 1.0, 2.0, 1.0),
        (BinaryOp::Lt, 2.0, 2.0, 0.0),
        (BinaryOp::Le, 2.0, 2.0, 1.0),
        (BinaryOp::Eq, 2.0, 2.0, 1.0),
        (BinaryOp::Eq, 2.0, 3.0, 0.0),
        (BinaryOp::Ge, 1.0, 2.0, 0.0),
        (BinaryOp::Gt, 3.0, 2.0, 1.0),
    ];
    for (op, a, b, expected) in cases {
        assert_eq!(eval(bin(op, num(a), num(b))), Value::Number(expected), "{} {} {}", a, op, b);
    }
}

#[test]
fn text_comparisons_are_lexicographic() {
    assert_eq!(eval(bin(BinaryOp::Lt, text("apple"), text("banana"))), Value::Number(1.0));
    assert_eq!(eval(bin(BinaryOp::Eq, text("a"), text("a"))), Value::Number(1.0));
    assert_eq!(eval(bin(BinaryOp::Ge, text("a"), text("b"))), Value::Number(0.0));
}

#[test]
fn mixed_kind_equality_is_false() {
    assert_eq!(eval(bin(BinaryOp::Eq, num(1.0), text("1"))), Value::Number(0.0));
}

#[test]
fn text_concatenation() {
    assert_eq!(eval(bin(BinaryOp::Add, text("a"), text("b"))), Value::Text("ab".into()));
    assert_eq!(eval(bin(BinaryOp::Add, text("n="), num(5.0))), Value::Text("n=5".into()));
    assert_eq!(eval(bin(BinaryOp::Add, num(1.5), text("x"))), Value::Text("1.5x".into()));
}

#[test]
fn arithmetic_on_text_is_a_type_mismatch() {
    match eval_err(bin(BinaryOp::Mul, text("a"), num(2.0))) {
        RuntimeError::TypeMismatch { op, lhs, rhs } => {
            assert_eq!(op, BinaryOp::Mul);
            assert_eq!((lhs, rhs), ("Text", "Number"));
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    assert!(matches!(
        eval_err(bin(BinaryOp::Sub, text("a"), text("b"))),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn mixed_ordering_is_a_type_mismatch() {
    assert!(matches!(
        eval_err(bin(BinaryOp::Gt, text("a"), num(1.0))),
        RuntimeError::TypeMismatch { op: BinaryOp::Gt, .. }
    ));
}

#[test]
fn zero_divided_by_zero_fails() {
    assert!(matches!(
        eval_err(bin(BinaryOp::Div, num(0.0), num(0.0))),
        RuntimeError::DivisionByZero
    ));
}

// ── Properties ──────────────────────────────────────────────

#[test]
fn constant_evaluation_is_idempotent() {
    let program = VisualScript::default();
    let mut interp = Interpreter::with_output(&program, Vec::new());
    for expr in [num(3.5), text("hi"), num(f64::INFINITY)] {
        interp.eval_expr(&expr).unwrap();
        interp.eval_expr(&expr).unwrap();
        let second = interp.pop().unwrap();
        let first = interp.pop().unwrap();
        assert_eq!(first, second);
    }
    assert!(interp.stack().is_empty());
}

#[test]
fn read_after_write() {
    let program = VisualScript::default();
    let mut interp = Interpreter::with_output(&program, Vec::new());
    interp
        .exec_statement(&Statement::set_variable("v", text("stored")))
        .unwrap();
    interp.eval_expr(&Expression::load("v")).unwrap();
    assert_eq!(interp.pop().unwrap(), Value::Text("stored".into()));
}

#[test]
fn statements_leave_stack_empty() {
    let program = VisualScript::default();
    let mut interp = Interpreter::with_output(&program, Vec::new());
    let stmts = [
        Statement::set_variable("a", bin(BinaryOp::Add, num(1.0), num(2.0))),
        Statement::If {
            condition: bin(BinaryOp::Eq, Expression::load("a"), num(3.0)),
            body: vec![Statement::print(Expression::load("a"))],
        },
        Statement::IfElse {
            condition: num(0.0),
            body: vec![],
            else_body: vec![Statement::print(text("x"))],
        },
    ];
    for stmt in &stmts {
        interp.exec_statement(stmt).unwrap();
        assert!(interp.stack().is_empty());
    }
}

// ── Driver state ────────────────────────────────────────────

#[test]
fn effects_before_failure_remain_visible() {
    let program = program(vec![
        Statement::set_variable("kept", num(1.0)),
        Statement::print(text("before")),
        Statement::print(Expression::load("missing")),
        Statement::print(text("after")),
    ]);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    assert!(interp.run().is_err());
    assert_eq!(interp.get_global("kept"), Some(&Value::Number(1.0)));
    assert_eq!(String::from_utf8(interp.into_output()).unwrap(), "before\n");
}

#[test]
fn interpreter_runs_once() {
    let program = program(vec![Statement::print(text("once"))]);
    let mut interp = Interpreter::with_output(&program, Vec::new());
    assert_eq!(interp.state(), State::Constructed);
    interp.run().unwrap();
    assert_eq!(interp.state(), State::Finished);
    assert!(matches!(interp.run(), Err(RuntimeError::AlreadyRun)));
    assert_eq!(String::from_utf8(interp.into_output()).unwrap(), "once\n");
}

#[test]
fn fresh_interpreter_has_fresh_globals() {
    let program = program(vec![Statement::set_variable("x", num(1.0))]);
    let mut first = Interpreter::with_output(&program, Vec::new());
    first.run().unwrap();
    let second = Interpreter::with_output(&program, Vec::new());
    assert!(second.globals().is_empty());
}

#[test]
fn empty_program_succeeds() {
    assert_eq!(run(vec![]), "");
}

#[test]
fn error_messages() {
    let (err, _) = run_err(vec![Statement::print(Expression::load("q"))]);
    assert_eq!(err.to_string(), "Undefined variable 'q'");
    let (err, _) = run_err(vec![Statement::print(bin(BinaryOp::Div, num(1.0), num(0.0)))]);
    assert_eq!(err.to_string(), "Division by zero");
}
