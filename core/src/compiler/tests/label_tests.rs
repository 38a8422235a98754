//! Tests for label and segmentation analysis

use crate::ast::{Expr, Stmt};
use crate::build::*;
use crate::compiler::label::{analyze, AppType, Segment, TAIL_RESULT};

#[test]
fn test_labels_follow_source_order() {
    let body = vec![
        let_("a", add(id("n"), num(1.0))),
        let_("b", call(id("g"), vec![id("a")])),
        if_else(
            id("c"),
            vec![expr(call(id("h"), vec![id("b")]))],
            vec![let_("d", num(1.0))],
        ),
        ret(call(id("k"), vec![id("b")])),
    ];

    let analysis = analyze(&body);
    assert_eq!(analysis.label_count, 2);
    assert_eq!(analysis.locals, vec!["a", "b", "d"]);
    assert!(!analysis.uses_arguments);

    assert!(matches!(analysis.body[0], Segment::Plain(_)));
    let Segment::Capture { label, stmt } = &analysis.body[1] else {
        unreachable!("Expected capture point, got {:?}", analysis.body[1]);
    };
    assert_eq!(*label, 0);
    assert_eq!(stmt, &body[1]);

    assert_eq!(analysis.body[2].labels(), vec![1]);
    assert_eq!(analysis.body[2].app_type(), AppType::Mixed);

    // tail calls are not resumption points
    assert_eq!(analysis.body[3].labels(), Vec::<u32>::new());
    assert_eq!(analysis.body[3].app_type(), AppType::Tail);
}

#[test]
fn test_return_classification() {
    let analysis = analyze(&[
        ret(id("x")),
        ret(call(id("g"), vec![])),
        ret(add(id("x"), call(id("g"), vec![]))),
        Stmt::Return { value: None },
    ]);

    let apps: Vec<_> = analysis.body.iter().map(Segment::app_type).collect();
    assert_eq!(
        apps,
        vec![AppType::None, AppType::Tail, AppType::Mixed, AppType::None]
    );
    assert_eq!(analysis.label_count, 0);
}

#[test]
fn test_loop_labels_nest() {
    let body = vec![loop_(
        "outer",
        lt(id("i"), num(3.0)),
        vec![
            let_("x", call(id("f"), vec![id("i")])),
            loop_(
                "inner",
                lt(id("j"), num(3.0)),
                vec![expr(call(id("g"), vec![id("j")]))],
            ),
        ],
    )];

    let analysis = analyze(&body);
    assert_eq!(analysis.body[0].labels(), vec![0, 1]);

    let Segment::Labeled { label, body } = &analysis.body[0] else {
        unreachable!("Expected labeled loop, got {:?}", analysis.body[0]);
    };
    assert_eq!(label, "outer");
    let Segment::While { body, .. } = body.as_ref() else {
        unreachable!("Expected while, got {:?}", body);
    };
    let Segment::Block(stmts) = body.as_ref() else {
        unreachable!("Expected block, got {:?}", body);
    };
    assert_eq!(stmts[1].labels(), vec![1]);
}

#[test]
fn test_locals_include_catch_params_and_declarations() {
    let body = vec![
        fun("helper", &[], vec![ret(Expr::Arguments)]),
        try_catch(vec![let_("r", call(id("helper"), vec![]))], "e", vec![]),
    ];

    let analysis = analyze(&body);
    assert_eq!(analysis.locals, vec!["helper", "r", "e"]);
    // `arguments` inside the nested function belongs to it
    assert!(!analysis.uses_arguments);
    assert_eq!(analysis.body[1].labels(), vec![0]);
}

#[test]
fn test_arguments_detected() {
    let analysis = analyze(&[let_("n", member(Expr::Arguments, "length"))]);
    assert!(analysis.uses_arguments);
}

#[test]
fn test_tail_call_inside_try_is_labeled() {
    let body = vec![try_finally(
        vec![ret(call(id("g"), vec![]))],
        vec![expr(call(id("done"), vec![]))],
    )];

    let analysis = analyze(&body);
    assert_eq!(analysis.locals, vec![TAIL_RESULT]);
    assert_eq!(analysis.body[0].labels(), vec![0, 1]);

    let Segment::Try { body: try_body, .. } = &analysis.body[0] else {
        unreachable!("Expected try, got {:?}", analysis.body[0]);
    };
    let Segment::Block(stmts) = try_body.as_ref() else {
        unreachable!("Expected block, got {:?}", try_body);
    };
    let Segment::Block(split) = &stmts[0] else {
        unreachable!("Expected split return, got {:?}", stmts[0]);
    };
    assert_eq!(
        split[0],
        Segment::Capture {
            label: 0,
            stmt: let_(TAIL_RESULT, call(id("g"), vec![])),
        }
    );
    assert_eq!(
        split[1],
        Segment::Return {
            value: Some(id(TAIL_RESULT)),
            app: AppType::None,
        }
    );

    // outside `try` the same return stays a tail call
    let plain = analyze(&[ret(call(id("g"), vec![]))]);
    assert_eq!(plain.body[0].app_type(), AppType::Tail);
    assert_eq!(plain.label_count, 0);
}
