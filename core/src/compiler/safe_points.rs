//! Safe-point insertion
//!
//! Adds a `Suspend` application at the start of the program, of every
//! function body and of every loop iteration. The jumper labels them like
//! any other call, so a yield there is an ordinary capture.

use std::rc::Rc;

use super::fold::{self, Fold};
use crate::ast::{Expr, Function, Program, Stmt};

pub fn insert(program: &Program) -> Program {
    let mut pass = SafePoints;
    Program {
        body: with_safe_point(pass.fold_body(&program.body)),
        instrumented: program.instrumented.clone(),
    }
}

fn safe_point() -> Stmt {
    Stmt::Expr {
        expr: Expr::Suspend,
    }
}

fn with_safe_point(body: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(safe_point());
    out.extend(body);
    out
}

struct SafePoints;

impl Fold for SafePoints {
    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        Rc::new(Function {
            name: func.name.clone(),
            params: func.params.clone(),
            body: with_safe_point(self.fold_body(&func.body)),
            frame: func.frame.clone(),
        })
    }

    fn fold_stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::While { test, body } => {
                let body = match self.fold_stmt(body) {
                    Stmt::Block { body } => with_safe_point(body),
                    other => vec![safe_point(), other],
                };
                Stmt::While {
                    test: self.fold_expr(test),
                    body: Box::new(Stmt::block(body)),
                }
            }
            other => fold::fold_stmt(self, other),
        }
    }
}
