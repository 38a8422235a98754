//! Tests for normal-form validation

use super::*;
use crate::ast::{BinOp, Expr, Stmt};
use crate::build::*;

fn rule_ids(program: &Program) -> Vec<&'static str> {
    validate_program(program).iter().map(|e| e.rule_id).collect()
}

#[test]
fn test_normalized_program_passes() {
    let program = program(vec![
        fun(
            "sum",
            &["n"],
            vec![
                if_(eq(id("n"), num(0.0)), vec![ret(num(0.0))]),
                let_("m", sub(id("n"), num(1.0))),
                let_("t", call(id("sum"), vec![id("m")])),
                let_("r", add(id("n"), id("t"))),
                ret(id("r")),
            ],
        ),
        let_("i", num(0.0)),
        loop_(
            "l",
            lt(id("i"), num(3.0)),
            vec![
                expr(call(id("print"), vec![id("i")])),
                assign("i", add(id("i"), num(1.0))),
            ],
        ),
        ret(call(id("sum"), vec![num(4.0)])),
    ]);

    let errors = validate_program(&program);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert!(!has_errors(&program));
}

#[test]
fn test_call_as_operand_rejected() {
    // let x = f(1) + 1
    let program = program(vec![let_(
        "x",
        add(call(id("f"), vec![num(1.0)]), num(1.0)),
    )]);

    let ids = rule_ids(&program);
    assert!(ids.contains(&"call-position"));
    // the call is also a non-atomic operand
    assert!(ids.contains(&"atomic-operands"));
}

#[test]
fn test_call_in_test_rejected() {
    let program = program(vec![if_(call(id("f"), vec![]), vec![])]);

    let errors = validate_program(&program);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].rule_id, "call-position");
    assert!(errors[0].message.contains("an if test"));
    assert_eq!(errors[0].location, "program > statement 1");
}

#[test]
fn test_nested_argument_rejected() {
    // f(g(1))
    let program = program(vec![expr(call(
        id("f"),
        vec![call(id("g"), vec![num(1.0)])],
    ))]);

    let ids = rule_ids(&program);
    assert_eq!(ids, vec!["call-position", "atomic-operands"]);
}

#[test]
fn test_method_call_callee_allowed() {
    let program = program(vec![
        let_("xs", array(vec![])),
        expr(method(id("xs"), "push", vec![num(1.0)])),
    ]);
    assert!(validate_program(&program).is_empty());
}

#[test]
fn test_unlabeled_loop_and_continue_rejected() {
    let program = program(vec![Stmt::While {
        test: boolean(true),
        body: Box::new(Stmt::block(vec![Stmt::Continue { label: None }])),
    }]);

    let errors = validate_program(&program);
    let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "loop is not the body of a labeled statement",
            "continue must be rewritten to a labeled break"
        ]
    );
}

#[test]
fn test_reserved_names_and_nodes_rejected() {
    let program = program(vec![
        let_("$frame", num(1.0)),
        Stmt::StackDec,
        fun("f", &["$x"], vec![ret(Expr::IsNormal)]),
    ]);

    let errors = validate_program(&program);
    assert!(errors.iter().all(|e| e.rule_id == "reserved"));
    assert_eq!(errors.len(), 4);
    assert!(errors[0].to_string().starts_with("error in program > statement 1:"));
}

#[test]
fn test_useless_expression_is_only_a_warning() {
    let program = program(vec![let_("x", num(1.0)), expr(id("x"))]);

    let errors = validate_program(&program);
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_error());
    assert!(!has_errors(&program));
}

#[test]
fn test_nested_function_locations() {
    let program = program(vec![fun(
        "outer",
        &[],
        vec![
            let_("a", num(1.0)),
            let_("b", bin(BinOp::Add, add(id("a"), id("a")), id("a"))),
        ],
    )]);

    let errors = validate_program(&program);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].location, "program > outer > statement 2");
}

#[test]
fn test_validator_lists_rules() {
    let ids: Vec<_> = Validator::new().rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec!["reserved", "call-position", "atomic-operands", "canonical-loop"]
    );
}
