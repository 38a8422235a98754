//! # Jumper - Continuation Instrumentation
//!
//! Turns a normalized guest program into one whose every activation can be
//! saved as a [`Frame`](crate::runtime::Frame) and later re-entered at the
//! statement it was paused at.
//!
//! ## Pipeline
//!
//! 1. **Validate**: the program must be in normal form ([`crate::normal_form`])
//! 2. **Safe points**: with a `yield_interval`, insert `Suspend` applications
//! 3. **Boxing**: move closure-shared mutable locals into cells ([`boxing`])
//! 4. **Label**: number every application per function ([`label`])
//! 5. **Rewrite**: emit the dual-mode program for the chosen strategy ([`jumper`])

pub mod boxing;
pub mod capture;
pub mod fold;
pub mod jumper;
pub mod label;
pub mod safe_points;

#[cfg(test)]
mod tests;

use tracing::{info, warn};

use crate::ast::Program;
use crate::config::CompilerOpts;
use crate::error::CompileError;
use crate::normal_form;

pub use jumper::Jumper;
pub use label::{analyze, AppType, Segment};

/// Validate and instrument `program`
pub fn compile(program: &Program, opts: &CompilerOpts) -> Result<Program, CompileError> {
    let (errors, warnings): (Vec<_>, Vec<_>) = normal_form::validate_program(program)
        .into_iter()
        .partition(|e| e.is_error());

    for warning in &warnings {
        warn!(location = %warning.location, rule = warning.rule_id, "{}", warning.message);
    }
    if !errors.is_empty() {
        return Err(CompileError::NotNormalized(errors));
    }

    let source = match opts.yield_interval {
        Some(_) => safe_points::insert(program),
        None => program.clone(),
    };
    let source = boxing::insert(&source);

    let compiled = Jumper::new(opts).program(&source);
    info!(
        strategy = %opts.transform,
        statements = compiled.body.len(),
        safe_points = opts.yield_interval.is_some(),
        "compiled program"
    );
    Ok(compiled)
}
