//! Rule: Reserved
//!
//! Names starting with `$` belong to the instrumentation pass, and so do the
//! instrumentation nodes. Neither may appear in input.

use crate::ast::{CatchClause, Expr, Function, LValue, Program, Stmt};
use crate::normal_form::walk::{walk_program, Visitor};

use super::super::{ValidationError, ValidationRule};

pub struct ReservedRule;

impl ValidationRule for ReservedRule {
    fn id(&self) -> &'static str {
        "reserved"
    }

    fn description(&self) -> &'static str {
        "reserved names and instrumentation nodes are not allowed in input"
    }

    fn validate(&self, program: &Program) -> Vec<ValidationError> {
        let mut visitor = ReservedVisitor {
            errors: Vec::new(),
            rule_id: self.id(),
        };
        if program.instrumented.is_some() {
            visitor.errors.push(ValidationError::error(
                "program",
                "program is already instrumented",
                self.id(),
            ));
        }
        walk_program(program, &mut visitor);
        visitor.errors
    }
}

struct ReservedVisitor {
    errors: Vec<ValidationError>,
    rule_id: &'static str,
}

impl ReservedVisitor {
    fn name(&mut self, name: &str, location: &str) {
        if name.starts_with('$') {
            self.errors.push(ValidationError::error(
                location,
                format!("'{}' uses the reserved '$' prefix", name),
                self.rule_id,
            ));
        }
    }

    fn node(&mut self, location: &str) {
        self.errors.push(ValidationError::error(
            location,
            "instrumentation node in input",
            self.rule_id,
        ));
    }
}

impl Visitor for ReservedVisitor {
    fn stmt(&mut self, stmt: &Stmt, location: &str) {
        if stmt.is_instrumentation() {
            self.node(location);
        }
        match stmt {
            Stmt::Let { name, .. } | Stmt::Assign { target: LValue::Ident { name }, .. } => {
                self.name(name, location)
            }
            Stmt::Labeled { label, .. } => self.name(label, location),
            Stmt::Try {
                catch: Some(CatchClause { param, .. }),
                ..
            } => self.name(param, location),
            _ => {}
        }
    }

    fn expr(&mut self, expr: &Expr, location: &str) {
        if expr.is_instrumentation() {
            self.node(location);
        }
        if let Expr::Ident { name } = expr {
            self.name(name, location);
        }
    }

    fn function(&mut self, func: &Function, location: &str) {
        if func.frame.is_some() {
            self.node(location);
        }
        if let Some(name) = &func.name {
            self.name(name, location);
        }
        for param in &func.params {
            self.name(param, location);
        }
    }
}
