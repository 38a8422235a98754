//! # Runtime
//!
//! Executes instrumented programs and implements first-class continuations
//! on top of them.
//!
//! ## Layout
//!
//! - [`driver`]: the [`Machine`], its trampoline and the capture strategies
//! - [`interp`]: statement and expression evaluation
//! - [`frame`]: frames, stacks and control signals
//! - [`values`]: guest values and scopes
//! - [`builtins`]: native globals (`captureCC`, `abortCC`, `print`, ..)
//! - [`host`]: the task loop that services yields and deferred work
//!
//! ## Example
//!
//! ```ignore
//! let compiled = compiler::compile(&program, &opts)?;
//! let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());
//! let value = host::run_program(&mut machine, &compiled)?;
//! ```

pub mod builtins;
pub mod driver;
pub mod errors;
pub mod frame;
pub mod host;
mod interp;
pub mod values;

#[cfg(test)]
mod tests;

pub use driver::{Machine, Mode, Outcome, Stats, Task};
pub use errors::ErrorInfo;
pub use frame::{thunk, Frame, Handler, Signal, Stack, Thunk, Unwind};
pub use host::{run_program, run_program_async};
pub use values::Value;
