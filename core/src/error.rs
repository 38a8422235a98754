//! Error types for compiling and running instrumented programs

use thiserror::Error;

use crate::normal_form::ValidationError;

/// Configuration errors are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad runtime: {0}")]
    UnknownStrategy(String),

    #[error("unknown construction method: {0} (expected direct or wrapper)")]
    UnknownNewMethod(String),

    #[error("unknown argument fidelity: {0} (expected simple, faithful or full)")]
    UnknownArgsFidelity(String),

    #[error("stack_size must be at least 2, got {0}")]
    StackTooSmall(u32),

    #[error("restore_frames ({restore_frames}) must be between 1 and stack_size ({stack_size})")]
    RestoreFrames { restore_frames: u32, stack_size: u32 },

    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("program is not in normal form:\n{}", render(.0))]
    NotNormalized(Vec<ValidationError>),
}

fn render(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures that escape the driver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A guest exception nobody caught
    #[error("uncaught exception: {0}")]
    Uncaught(String),

    /// A saved frame does not fit the function resuming it
    #[error("frame shape mismatch in {function}: expected {expected} locals, found {found}")]
    FrameShape {
        function: String,
        expected: usize,
        found: usize,
    },

    /// A top frame showed up where a call frame was expected
    #[error("frame shape mismatch in {function}: expected a call frame, found the top frame")]
    UnexpectedTop { function: String },

    #[error("restore requested with an empty stack")]
    EmptyStack,

    #[error("bad runtime: program was instrumented for {compiled}, runtime uses {runtime}")]
    StrategyMismatch { compiled: String, runtime: String },

    #[error("{0} escaped its enclosing function")]
    StrayJump(String),

    #[error("program suspended with nothing left to resume it")]
    Stalled,
}
