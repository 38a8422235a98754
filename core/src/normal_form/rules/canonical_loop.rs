//! Rule: Canonical Loop
//!
//! The normalizer reduces every loop to one shape: a `while` that is the
//! direct body of a labeled statement, with `continue` rewritten into a
//! `break` out of a labeled block.
//!
//! # Valid
//!
//! ```text
//! outer: while (go) { ... break outer; }
//! ```
//!
//! # Invalid
//!
//! ```text
//! while (go) { ... }        // unlabeled loop
//! continue                  // not canonical
//! ```

use std::collections::HashSet;

use crate::ast::{Program, Stmt};
use crate::normal_form::walk::{walk_program, Visitor};

use super::super::{ValidationError, ValidationRule};

pub struct CanonicalLoopRule;

impl ValidationRule for CanonicalLoopRule {
    fn id(&self) -> &'static str {
        "canonical-loop"
    }

    fn description(&self) -> &'static str {
        "loops must be labeled while statements without continue"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut visitor = LoopVisitor {
            errors: Vec::new(),
            labeled_loops: HashSet::new(),
            rule_id: self.id(),
        };
        walk_program(program, &mut visitor);
        visitor.errors
    }
}

struct LoopVisitor {
    errors: Vec<ValidationError>,
    /// Loops seen as the direct body of a labeled statement
    labeled_loops: HashSet<*const Stmt>,
    rule_id: &'static str,
}

impl Visitor for LoopVisitor {
    fn stmt(&mut self, stmt: &Stmt, location: &str) {
        match stmt {
            Stmt::Labeled { body, .. } => {
                if let Stmt::While { .. } = body.as_ref() {
                    self.labeled_loops.insert(body.as_ref() as *const Stmt);
                }
            }
            Stmt::While { .. } => {
                if !self.labeled_loops.contains(&(stmt as *const Stmt)) {
                    self.errors.push(ValidationError::error(
                        location,
                        "loop is not the body of a labeled statement",
                        self.rule_id,
                    ));
                }
            }
            Stmt::Continue { .. } => {
                self.errors.push(ValidationError::error(
                    location,
                    "continue must be rewritten to a labeled break",
                    self.rule_id,
                ));
            }
            _ => {}
        }
    }
}
