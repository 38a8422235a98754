//! Guest-level errors
//!
//! Faults a guest program can observe and catch are plain values: an error
//! code and a message. They never escape as [`RuntimeError`](crate::error::RuntimeError)
//! unless nobody catches them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::frame::Unwind;
use super::values::Value;

pub const ERROR: &str = "Error";
pub const TYPE_ERROR: &str = "TypeError";
pub const REFERENCE_ERROR: &str = "ReferenceError";
pub const RANGE_ERROR: &str = "RangeError";
/// Raised when a fudged continuation is invoked
pub const FUDGED_CONTINUATION: &str = "FudgedContinuationError";

/// Error value with code and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A catchable guest exception
pub fn throw(code: &str, message: impl Into<String>) -> Unwind {
    Unwind::Throw(Value::Error(ErrorInfo::new(code, message)))
}
