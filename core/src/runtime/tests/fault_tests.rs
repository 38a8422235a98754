//! Broken invariants surface as runtime errors, never as guest exceptions

use super::helpers::{compile, opts, REAL};
use super::programs::capture_cc;
use crate::ast::Program;
use crate::build::*;
use crate::config::{CaptureStrategy, RuntimeOpts};
use crate::error::RuntimeError;
use crate::runtime::{thunk, Frame, Machine, Stack, Value};

/// `f` saves its continuation in `saved` and finishes normally
fn saving_program() -> Program {
    program(vec![
        let_("saved", null()),
        fun(
            "f",
            &[],
            vec![
                let_("a", num(1.0)),
                let_(
                    "k",
                    capture_cc(lambda(&["c"], vec![assign("saved", id("c")), ret(num(0.0))])),
                ),
                ret(id("a")),
            ],
        ),
        let_("r", call(id("f"), vec![])),
        ret(id("r")),
    ])
}

#[test]
fn test_strategy_mismatch() {
    let compiled = compile(&program(vec![ret(num(1.0))]), &opts(CaptureStrategy::Lazy));
    let mut machine = Machine::new(CaptureStrategy::Eager, RuntimeOpts::default());

    let err = machine.run(&compiled).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::StrategyMismatch {
            compiled: "lazy".to_string(),
            runtime: "eager".to_string(),
        }
    );
    assert!(err.to_string().starts_with("bad runtime"));
}

#[test]
fn test_empty_stack() {
    let mut machine = Machine::new(CaptureStrategy::Lazy, RuntimeOpts::default());
    assert_eq!(
        machine.continue_with(Stack::new()).unwrap_err(),
        RuntimeError::EmptyStack
    );
}

#[test]
fn test_frame_shape_mismatch() {
    for strategy in REAL {
        let compiled = compile(&saving_program(), &opts(strategy));
        let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());
        machine.run(&compiled).unwrap();

        let saved = machine.global("saved").unwrap();
        let mut stack = (**saved.as_continuation().unwrap()).clone();
        let Some(Frame::Call { locals, .. }) = stack.innermost_mut() else {
            unreachable!("Expected a call frame for f");
        };
        let expected = locals.len();
        locals.push(Value::Null);
        stack.push_inner(Frame::top_value(Value::Null));

        let err = machine.continue_with(stack).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::FrameShape {
                function: "f".to_string(),
                expected,
                found: expected + 1,
            },
            "strategy {}",
            strategy
        );
    }
}

#[test]
fn test_top_frame_where_call_frame_expected() {
    let compiled = compile(&saving_program(), &opts(CaptureStrategy::Lazy));
    let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());
    machine.run(&compiled).unwrap();
    let f = machine.global("f").unwrap();

    // a frame that drops itself before re-entering f, leaving only the top frame
    let mut stack = Stack::new();
    stack.push_outer(Frame::top_value(Value::Null));
    stack.push_outer(Frame::Call {
        resume: thunk(move |m| {
            m.stack.pop_outer();
            m.call_value(f.clone(), Value::Undefined, vec![])
        }),
        function: "f".to_string(),
        locals: vec![],
        label: 0,
        formals: None,
        arg_count: None,
    });

    assert_eq!(
        machine.continue_with(stack).unwrap_err(),
        RuntimeError::UnexpectedTop {
            function: "f".to_string()
        }
    );
}
