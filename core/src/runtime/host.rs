//! Host loop
//!
//! Runs a program to completion, servicing the task queue between guest
//! slices: yielded continuations are resumed in order and deferred host work
//! runs where it was queued.

use tracing::{debug, info};

use super::driver::{Machine, Outcome, Task};
use super::values::Value;
use crate::ast::Program;
use crate::error::RuntimeError;

/// Run `program` and every task it leaves behind, synchronously
pub fn run_program(machine: &mut Machine, program: &Program) -> Result<Value, RuntimeError> {
    let mut result = settle(None, machine.run(program)?);
    while let Some(task) = machine.next_task() {
        result = service(machine, task, result)?;
    }
    finish(machine, result)
}

/// Like [`run_program`], giving the tokio scheduler a turn between tasks
pub async fn run_program_async(
    machine: &mut Machine,
    program: &Program,
) -> Result<Value, RuntimeError> {
    let mut result = settle(None, machine.run(program)?);
    while let Some(task) = machine.next_task() {
        tokio::task::yield_now().await;
        result = service(machine, task, result)?;
    }
    finish(machine, result)
}

fn service(
    machine: &mut Machine,
    task: Task,
    result: Option<Value>,
) -> Result<Option<Value>, RuntimeError> {
    match task {
        Task::Resume(stack) => {
            debug!(frames = stack.len(), "resuming yielded continuation");
            Ok(settle(result, machine.continue_with(stack)?))
        }
        Task::Host(work) => {
            work(machine);
            Ok(result)
        }
    }
}

/// The latest completed slice wins
fn settle(previous: Option<Value>, outcome: Outcome) -> Option<Value> {
    match outcome {
        Outcome::Done(value) => Some(value),
        Outcome::Suspended => previous,
    }
}

fn finish(machine: &Machine, result: Option<Value>) -> Result<Value, RuntimeError> {
    let value = result.ok_or(RuntimeError::Stalled)?;
    let stats = machine.stats();
    info!(
        result = %value,
        captures = stats.captures,
        restores = stats.restores,
        yields = stats.yields,
        "program finished"
    );
    Ok(value)
}
