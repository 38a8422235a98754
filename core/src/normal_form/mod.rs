//! Normal-form validation
//!
//! The instrumentation pass assumes its input went through the normalizer:
//! every loop is a labeled `while`, and every operand is atomic by the time it
//! reaches a call, operator, property access or assignment target. This
//! module checks that contract with an extensible rule-based validator so a
//! malformed input fails with a readable report instead of a broken resume.
//!
//! # Usage
//!
//! ```ignore
//! use jumper_core::normal_form::validate_program;
//!
//! let errors = validate_program(&program);
//! for error in &errors {
//!     eprintln!("{}", error);
//! }
//! ```
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - The output of validation
//! 4. **walk** - Shared traversal so rules only describe what they look at
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `normal_form/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;
pub mod walk;

use crate::ast::Program;

// ============================================================================
// Validation Error Types
// ============================================================================

/// A normal-form violation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Where the violation is, e.g. `f > statement 3`
    pub location: String,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Which rule produced this error
    pub rule_id: &'static str,
}

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The pass cannot instrument this program
    Error,
    /// Instrumentable, but probably not what the author meant
    Warning,
}

impl ValidationError {
    pub fn error(location: impl Into<String>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    pub fn warning(location: impl Into<String>, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
            severity: Severity::Warning,
            rule_id,
        }
    }

    /// Check if this is an error (not a warning)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} in {}: {} [{}]",
            severity, self.location, self.message, self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all normal-form rules implement.
///
/// Rules are independent of each other and see the whole program.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "call-position")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the rule. Empty vector means no issues found.
    fn validate(&self, program: &Program) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Create a new validator with all built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::ReservedRule),
                Box::new(rules::CallPositionRule),
                Box::new(rules::AtomicOperandsRule),
                Box::new(rules::CanonicalLoopRule),
            ],
        }
    }

    pub fn validate(&self, program: &Program) -> Vec<ValidationError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(program))
            .collect()
    }

    /// Registered rules as `(id, description)` pairs
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a program against every registered rule.
pub fn validate_program(program: &Program) -> Vec<ValidationError> {
    Validator::new().validate(program)
}

/// Check if a program has any validation errors (not just warnings).
pub fn has_errors(program: &Program) -> bool {
    validate_program(program).iter().any(|e| e.is_error())
}

#[cfg(test)]
mod tests;
