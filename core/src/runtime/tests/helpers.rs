//! Test helpers for runtime tests

use serde_json::Value as Json;

use crate::ast::Program;
use crate::compiler;
use crate::config::{CaptureStrategy, CompilerOpts, RuntimeOpts};
use crate::error::RuntimeError;
use crate::runtime::{host, Machine, Value};

/// Strategies that build real continuations
pub const REAL: [CaptureStrategy; 3] = [
    CaptureStrategy::Eager,
    CaptureStrategy::Lazy,
    CaptureStrategy::Retval,
];

pub fn opts(strategy: CaptureStrategy) -> CompilerOpts {
    CompilerOpts::builder().transform(strategy).build()
}

pub fn compile(source: &Program, opts: &CompilerOpts) -> Program {
    compiler::compile(source, opts).unwrap()
}

/// Compile with `opts` and run through the host loop
pub fn run_compiled(
    source: &Program,
    opts: &CompilerOpts,
    runtime: RuntimeOpts,
) -> (Result<Value, RuntimeError>, Machine) {
    let compiled = compile(source, opts);
    let mut machine = Machine::for_program(&compiled, runtime);
    let result = host::run_program(&mut machine, &compiled);
    (result, machine)
}

/// Compiled result as plain data; panics on runtime errors
pub fn run_json(strategy: CaptureStrategy, source: &Program) -> Json {
    let (result, _) = run_compiled(source, &opts(strategy), RuntimeOpts::default());
    result.unwrap().to_json()
}

/// The program as written, without instrumentation
pub fn run_raw(source: &Program) -> (Result<Value, RuntimeError>, Machine) {
    let mut machine = Machine::new(CaptureStrategy::Fudge, RuntimeOpts::default());
    let result = host::run_program(&mut machine, source);
    (result, machine)
}

pub fn raw_json(source: &Program) -> Json {
    run_raw(source).0.unwrap().to_json()
}
