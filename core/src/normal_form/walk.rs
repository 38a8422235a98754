//! Shared AST traversal for the rules
//!
//! Visits every statement and expression of the program, entering nested
//! functions, and tells the visitor where it is.

use crate::ast::{Expr, Function, LValue, Program, Stmt};

/// Callbacks a rule overrides; all default to doing nothing
pub trait Visitor {
    fn stmt(&mut self, _stmt: &Stmt, _location: &str) {}
    fn expr(&mut self, _expr: &Expr, _location: &str) {}
    fn function(&mut self, _func: &Function, _location: &str) {}
}

pub fn walk_program(program: &Program, visitor: &mut dyn Visitor) {
    let mut walker = Walker {
        visitor,
        scope: vec!["program".to_string()],
        counter: vec![0],
    };
    for stmt in &program.body {
        walker.stmt(stmt);
    }
}

struct Walker<'v> {
    visitor: &'v mut dyn Visitor,
    scope: Vec<String>,
    counter: Vec<usize>,
}

impl Walker<'_> {
    fn location(&self) -> String {
        let n = self.counter.last().copied().unwrap_or(0);
        format!("{} > statement {}", self.scope.join(" > "), n)
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if let Some(n) = self.counter.last_mut() {
            *n += 1;
        }
        let location = self.location();
        self.visitor.stmt(stmt, &location);

        match stmt {
            Stmt::Block { body } => body.iter().for_each(|s| self.stmt(s)),
            Stmt::Let { init, .. } => {
                if let Some(init) = init {
                    self.expr(init, &location);
                }
            }
            Stmt::Assign { target, value } => {
                match target {
                    LValue::Ident { .. } => {}
                    LValue::Member { object, .. } => self.expr(object, &location),
                    LValue::Index { object, index } => {
                        self.expr(object, &location);
                        self.expr(index, &location);
                    }
                }
                self.expr(value, &location);
            }
            Stmt::Expr { expr } | Stmt::Throw { value: expr } => self.expr(expr, &location),
            Stmt::Return { value } => {
                if let Some(value) = value {
                    self.expr(value, &location);
                }
            }
            Stmt::If {
                test,
                then_s,
                else_s,
            } => {
                self.expr(test, &location);
                self.stmt(then_s);
                if let Some(else_s) = else_s {
                    self.stmt(else_s);
                }
            }
            Stmt::While { test, body } => {
                self.expr(test, &location);
                self.stmt(body);
            }
            Stmt::Labeled { body, .. }
            | Stmt::RecordOnCapture { body, .. }
            | Stmt::ShadowFrame { body, .. } => self.stmt(body),
            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                self.stmt(body);
                if let Some(catch) = catch {
                    self.stmt(&catch.body);
                }
                if let Some(finally) = finally {
                    self.stmt(finally);
                }
            }
            Stmt::FunctionDecl { func } => self.function(func),
            Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::RestoreFrame
            | Stmt::StackDec
            | Stmt::StackInc
            | Stmt::ReturnIfCapturing { .. }
            | Stmt::RethrowSignal { .. } => {}
        }
    }

    fn expr(&mut self, expr: &Expr, location: &str) {
        self.visitor.expr(expr, location);

        match expr {
            Expr::Binary { left, right, .. } => {
                self.expr(left, location);
                self.expr(right, location);
            }
            Expr::Unary { arg, .. } => self.expr(arg, location),
            Expr::Cond {
                test,
                then_e,
                else_e,
            } => {
                self.expr(test, location);
                self.expr(then_e, location);
                self.expr(else_e, location);
            }
            Expr::Member { object, .. } => self.expr(object, location),
            Expr::Index { object, index } => {
                self.expr(object, location);
                self.expr(index, location);
            }
            Expr::Call { callee, args }
            | Expr::New { callee, args }
            | Expr::HandleNew { callee, args } => {
                self.expr(callee, location);
                args.iter().for_each(|a| self.expr(a, location));
            }
            Expr::Array { elements } => elements.iter().for_each(|e| self.expr(e, location)),
            Expr::Object { props } => props.iter().for_each(|(_, e)| self.expr(e, location)),
            Expr::Function { func } => self.function(func),
            _ => {}
        }
    }

    fn function(&mut self, func: &Function) {
        let location = self.location();
        self.visitor.function(func, &location);

        self.scope.push(func.display_name().to_string());
        self.counter.push(0);
        for stmt in &func.body {
            self.stmt(stmt);
        }
        self.counter.pop();
        self.scope.pop();
    }
}

/// Does `expr` contain an application, not looking inside function literals?
pub fn contains_application(expr: &Expr) -> bool {
    if expr.is_application() {
        return true;
    }
    match expr {
        Expr::Binary { left, right, .. } => contains_application(left) || contains_application(right),
        Expr::Unary { arg, .. } => contains_application(arg),
        Expr::Cond {
            test,
            then_e,
            else_e,
        } => contains_application(test) || contains_application(then_e) || contains_application(else_e),
        Expr::Member { object, .. } => contains_application(object),
        Expr::Index { object, index } => contains_application(object) || contains_application(index),
        Expr::Array { elements } => elements.iter().any(contains_application),
        Expr::Object { props } => props.iter().any(|(_, e)| contains_application(e)),
        _ => false,
    }
}
