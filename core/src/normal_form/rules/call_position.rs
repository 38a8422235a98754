//! Rule: Call Position
//!
//! Every application (call, `new`) must be the whole value of a `let`,
//! an assignment, an expression statement or a `return`. Those are the
//! statements the pass can label and resume.
//!
//! # Valid
//!
//! ```text
//! let x = f(a)
//! x = new Point(a, b)
//! f(a)
//! return f(a)
//! ```
//!
//! # Invalid
//!
//! ```text
//! let x = f(a) + 1          // call is an operand
//! if (f(a)) { }             // call in a test
//! throw f(a)                // call in a throw
//! ```

use crate::ast::{Expr, LValue, Program, Stmt};
use crate::normal_form::walk::{contains_application, walk_program, Visitor};

use super::super::{ValidationError, ValidationRule};

pub struct CallPositionRule;

impl ValidationRule for CallPositionRule {
    fn id(&self) -> &'static str {
        "call-position"
    }

    fn description(&self) -> &'static str {
        "calls must be the whole value of a let, assignment, expression or return"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut visitor = CallPositionVisitor {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        walk_program(program, &mut visitor);
        visitor.errors
    }
}

struct CallPositionVisitor {
    errors: Vec<ValidationError>,
    rule_id: &'static str,
}

impl CallPositionVisitor {
    fn check_nested(&mut self, expr: &Expr, location: &str, what: &str) {
        if contains_application(expr) {
            self.errors.push(ValidationError::error(
                location,
                format!("call inside {} must be lifted into its own statement", what),
                self.rule_id,
            ));
        }
    }

    /// The value may itself be an application, but nothing below it may
    fn check_top(&mut self, expr: &Expr, location: &str) {
        match expr {
            Expr::Call { callee, args }
            | Expr::New { callee, args }
            | Expr::HandleNew { callee, args } => {
                self.check_nested(callee, location, "a callee");
                for arg in args {
                    self.check_nested(arg, location, "an argument");
                }
            }
            other => self.check_nested(other, location, "an expression"),
        }
    }
}

impl Visitor for CallPositionVisitor {
    fn stmt(&mut self, stmt: &Stmt, location: &str) {
        match stmt {
            Stmt::Let { init: Some(e), .. } | Stmt::Expr { expr: e } => self.check_top(e, location),
            Stmt::Return { value: Some(e) } => self.check_top(e, location),
            Stmt::Assign { target, value } => {
                match target {
                    LValue::Ident { .. } => {}
                    LValue::Member { object, .. } => {
                        self.check_nested(object, location, "an assignment target")
                    }
                    LValue::Index { object, index } => {
                        self.check_nested(object, location, "an assignment target");
                        self.check_nested(index, location, "an assignment target");
                    }
                }
                self.check_top(value, location);
            }
            Stmt::If { test, .. } => self.check_nested(test, location, "an if test"),
            Stmt::While { test, .. } => self.check_nested(test, location, "a loop test"),
            Stmt::Throw { value } => self.check_nested(value, location, "a throw"),
            _ => {}
        }
    }
}
