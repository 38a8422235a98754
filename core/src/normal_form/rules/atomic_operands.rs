//! Rule: Atomic Operands
//!
//! Operands of operators, property accesses, calls, constructors, array and
//! object literals, and assignment targets must be atomic: a name, a literal,
//! `this`, `arguments` or a function literal. A method call's callee may be a
//! property of an atomic object.
//!
//! Also warns about expression statements that cannot have an effect.

use crate::ast::{Expr, LValue, Program, Stmt};
use crate::normal_form::walk::{walk_program, Visitor};

use super::super::{ValidationError, ValidationRule};

pub struct AtomicOperandsRule;

impl ValidationRule for AtomicOperandsRule {
    fn id(&self) -> &'static str {
        "atomic-operands"
    }

    fn description(&self) -> &'static str {
        "operands must be names or literals"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut visitor = AtomicVisitor {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        walk_program(program, &mut visitor);
        visitor.errors
    }
}

struct AtomicVisitor {
    errors: Vec<ValidationError>,
    rule_id: &'static str,
}

impl AtomicVisitor {
    fn require(&mut self, operand: &Expr, location: &str, role: &str) {
        if !operand.is_atomic() {
            self.errors.push(ValidationError::error(
                location,
                format!("{} is not atomic: {}", role, describe(operand)),
                self.rule_id,
            ));
        }
    }
}

impl Visitor for AtomicVisitor {
    fn stmt(&mut self, stmt: &Stmt, location: &str) {
        match stmt {
            Stmt::Assign { target, .. } => match target {
                LValue::Ident { .. } => {}
                LValue::Member { object, .. } => self.require(object, location, "assignment target object"),
                LValue::Index { object, index } => {
                    self.require(object, location, "assignment target object");
                    self.require(index, location, "assignment target index");
                }
            },
            Stmt::Expr { expr } if expr.is_atomic() => {
                self.errors.push(ValidationError::warning(
                    location,
                    format!("expression statement has no effect: {}", describe(expr)),
                    self.rule_id,
                ));
            }
            _ => {}
        }
    }

    fn expr(&mut self, expr: &Expr, location: &str) {
        match expr {
            Expr::Binary { left, right, .. } => {
                self.require(left, location, "left operand");
                self.require(right, location, "right operand");
            }
            Expr::Unary { arg, .. } => self.require(arg, location, "operand"),
            Expr::Cond {
                test,
                then_e,
                else_e,
            } => {
                self.require(test, location, "condition");
                self.require(then_e, location, "branch");
                self.require(else_e, location, "branch");
            }
            Expr::Member { object, .. } => self.require(object, location, "object"),
            Expr::Index { object, index } => {
                self.require(object, location, "object");
                self.require(index, location, "index");
            }
            Expr::Call { callee, args } => {
                match callee.as_ref() {
                    // method call
                    Expr::Member { .. } => {}
                    other => self.require(other, location, "callee"),
                }
                for arg in args {
                    self.require(arg, location, "argument");
                }
            }
            Expr::New { callee, args } | Expr::HandleNew { callee, args } => {
                self.require(callee, location, "constructor");
                for arg in args {
                    self.require(arg, location, "argument");
                }
            }
            Expr::Array { elements } => {
                for element in elements {
                    self.require(element, location, "array element");
                }
            }
            Expr::Object { props } => {
                for (key, value) in props {
                    self.require(value, location, &format!("property '{}'", key));
                }
            }
            _ => {}
        }
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Binary { .. } => "binary expression",
        Expr::Unary { .. } => "unary expression",
        Expr::Cond { .. } => "conditional",
        Expr::Member { .. } | Expr::Index { .. } => "property access",
        Expr::Call { .. } => "call",
        Expr::New { .. } | Expr::HandleNew { .. } => "construction",
        Expr::Array { .. } => "array literal",
        Expr::Object { .. } => "object literal",
        Expr::Ident { .. } => "name",
        Expr::Function { .. } => "function literal",
        _ => "literal",
    }
}
