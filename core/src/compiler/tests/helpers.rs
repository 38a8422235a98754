//! Test helpers for compiler tests

use crate::ast::{Function, Stmt};
use crate::build;
use crate::compiler::Jumper;
use crate::config::{CaptureStrategy, CompilerOpts, NewMethod};

pub fn opts(strategy: CaptureStrategy) -> CompilerOpts {
    CompilerOpts::builder().transform(strategy).build()
}

/// Instrument a single function named `f`
pub fn instrument(opts: &CompilerOpts, params: &[&str], body: Vec<Stmt>) -> Function {
    Jumper::new(opts).function(&build::function(Some("f"), params, body))
}

pub fn instrument_lazy(params: &[&str], body: Vec<Stmt>) -> Function {
    instrument(&opts(CaptureStrategy::Lazy), params, body)
}

pub fn direct() -> CompilerOpts {
    CompilerOpts::builder()
        .transform(CaptureStrategy::Lazy)
        .new_method(NewMethod::Direct)
        .build()
}

/// The statements between the prologue and the trailing `StackInc`
pub fn inner_body(func: &Function) -> &[Stmt] {
    assert_eq!(func.body[0], Stmt::StackDec);
    assert_eq!(func.body[1], Stmt::RestoreFrame);
    assert_eq!(func.body.last(), Some(&Stmt::StackInc));
    &func.body[2..func.body.len() - 1]
}
