//! Structure-preserving AST rebuilds
//!
//! Passes override the node kinds they care about and fall back to the free
//! `fold_*` functions for the rest. Function bodies are opaque by default.

use std::rc::Rc;

use crate::ast::{CatchClause, Expr, Function, LValue, Stmt};

pub trait Fold {
    fn fold_stmt(&mut self, stmt: &Stmt) -> Stmt {
        fold_stmt(self, stmt)
    }

    fn fold_expr(&mut self, expr: &Expr) -> Expr {
        fold_expr(self, expr)
    }

    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        func.clone()
    }

    fn fold_body(&mut self, body: &[Stmt]) -> Vec<Stmt> {
        body.iter().map(|s| self.fold_stmt(s)).collect()
    }
}

fn boxed<F: Fold + ?Sized>(f: &mut F, stmt: &Stmt) -> Box<Stmt> {
    Box::new(f.fold_stmt(stmt))
}

pub fn fold_stmt<F: Fold + ?Sized>(f: &mut F, stmt: &Stmt) -> Stmt {
    match stmt {
        Stmt::Block { body } => Stmt::Block {
            body: f.fold_body(body),
        },
        Stmt::Let { name, init } => Stmt::Let {
            name: name.clone(),
            init: init.as_ref().map(|e| f.fold_expr(e)),
        },
        Stmt::Assign { target, value } => Stmt::Assign {
            target: match target {
                LValue::Ident { name } => LValue::Ident { name: name.clone() },
                LValue::Member { object, property } => LValue::Member {
                    object: f.fold_expr(object),
                    property: property.clone(),
                },
                LValue::Index { object, index } => LValue::Index {
                    object: f.fold_expr(object),
                    index: f.fold_expr(index),
                },
            },
            value: f.fold_expr(value),
        },
        Stmt::Expr { expr } => Stmt::Expr {
            expr: f.fold_expr(expr),
        },
        Stmt::If {
            test,
            then_s,
            else_s,
        } => Stmt::If {
            test: f.fold_expr(test),
            then_s: boxed(f, then_s),
            else_s: else_s.as_ref().map(|s| boxed(f, s)),
        },
        Stmt::While { test, body } => Stmt::While {
            test: f.fold_expr(test),
            body: boxed(f, body),
        },
        Stmt::Labeled { label, body } => Stmt::Labeled {
            label: label.clone(),
            body: boxed(f, body),
        },
        Stmt::Return { value } => Stmt::Return {
            value: value.as_ref().map(|e| f.fold_expr(e)),
        },
        Stmt::Throw { value } => Stmt::Throw {
            value: f.fold_expr(value),
        },
        Stmt::Try {
            body,
            catch,
            finally,
        } => Stmt::Try {
            body: boxed(f, body),
            catch: catch.as_ref().map(|c| CatchClause {
                param: c.param.clone(),
                body: boxed(f, &c.body),
            }),
            finally: finally.as_ref().map(|s| boxed(f, s)),
        },
        Stmt::FunctionDecl { func } => Stmt::FunctionDecl {
            func: f.fold_function(func),
        },
        Stmt::RecordOnCapture { label, body } => Stmt::RecordOnCapture {
            label: *label,
            body: boxed(f, body),
        },
        Stmt::ShadowFrame { label, body } => Stmt::ShadowFrame {
            label: *label,
            body: boxed(f, body),
        },
        Stmt::Break { .. }
        | Stmt::Continue { .. }
        | Stmt::RestoreFrame
        | Stmt::StackDec
        | Stmt::StackInc
        | Stmt::ReturnIfCapturing { .. }
        | Stmt::RethrowSignal { .. } => stmt.clone(),
    }
}

fn sub<F: Fold + ?Sized>(f: &mut F, expr: &Expr) -> Box<Expr> {
    Box::new(f.fold_expr(expr))
}

pub fn fold_expr<F: Fold + ?Sized>(f: &mut F, expr: &Expr) -> Expr {
    match expr {
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: sub(f, left),
            right: sub(f, right),
        },
        Expr::Unary { op, arg } => Expr::Unary {
            op: *op,
            arg: sub(f, arg),
        },
        Expr::Cond {
            test,
            then_e,
            else_e,
        } => Expr::Cond {
            test: sub(f, test),
            then_e: sub(f, then_e),
            else_e: sub(f, else_e),
        },
        Expr::Member { object, property } => Expr::Member {
            object: sub(f, object),
            property: property.clone(),
        },
        Expr::Index { object, index } => Expr::Index {
            object: sub(f, object),
            index: sub(f, index),
        },
        Expr::Call { callee, args } => Expr::Call {
            callee: sub(f, callee),
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        Expr::New { callee, args } => Expr::New {
            callee: sub(f, callee),
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        Expr::HandleNew { callee, args } => Expr::HandleNew {
            callee: sub(f, callee),
            args: args.iter().map(|a| f.fold_expr(a)).collect(),
        },
        Expr::Function { func } => Expr::Function {
            func: f.fold_function(func),
        },
        Expr::Array { elements } => Expr::Array {
            elements: elements.iter().map(|e| f.fold_expr(e)).collect(),
        },
        Expr::Object { props } => Expr::Object {
            props: props
                .iter()
                .map(|(k, v)| (k.clone(), f.fold_expr(v)))
                .collect(),
        },
        _ => expr.clone(),
    }
}
