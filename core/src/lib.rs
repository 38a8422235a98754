pub mod ast;
pub mod build;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod normal_form;
pub mod runtime;

// Re-export the entry points most embedders need
pub use compiler::compile;
pub use config::{CaptureStrategy, CompilerOpts, Config, RuntimeOpts};
pub use error::{CompileError, ConfigError, RuntimeError};
pub use runtime::{run_program, run_program_async, Machine, Value};
