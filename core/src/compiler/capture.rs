//! Capture logic per strategy
//!
//! Every labeled application `S` is compiled into a statement that runs `S`
//! in normal mode and, in restoring mode with the matching target, runs `S'`:
//! the same statement with its application replaced by a re-entry into the
//! next frame. The strategies differ only in how the current frame ends up on
//! a stack:
//!
//! | strategy | emitted shape                                         |
//! |----------|-------------------------------------------------------|
//! | eager    | `ShadowFrame(L) { dual }`                             |
//! | lazy     | `RecordOnCapture(L) { dual }`                         |
//! | retval   | `dual; ReturnIfCapturing(L)`                          |
//! | fudge    | `if (normal) S`                                       |
//!
//! where `dual` is `if (normal) S else if (target == L) S'`.

use crate::ast::{Expr, Stmt};
use crate::config::CaptureStrategy;

pub fn capture_point(strategy: CaptureStrategy, label: u32, stmt: Stmt) -> Vec<Stmt> {
    match strategy {
        CaptureStrategy::Eager => vec![Stmt::ShadowFrame {
            label,
            body: Box::new(dual(label, stmt)),
        }],
        CaptureStrategy::Lazy => vec![Stmt::RecordOnCapture {
            label,
            body: Box::new(dual(label, stmt)),
        }],
        CaptureStrategy::Retval => vec![dual(label, stmt), Stmt::ReturnIfCapturing { label }],
        CaptureStrategy::Fudge => vec![Stmt::guarded(Expr::IsNormal, stmt)],
    }
}

fn dual(label: u32, stmt: Stmt) -> Stmt {
    Stmt::If {
        test: Expr::IsNormal,
        else_s: Some(Box::new(Stmt::guarded(
            Expr::TargetIn {
                labels: vec![label],
            },
            restoring_variant(&stmt),
        ))),
        then_s: Box::new(stmt),
    }
}

/// `S'`: the statement with its application swapped for `ReenterNext`
pub fn restoring_variant(stmt: &Stmt) -> Stmt {
    match stmt {
        Stmt::Let { name, .. } => Stmt::Let {
            name: name.clone(),
            init: Some(Expr::ReenterNext),
        },
        Stmt::Assign { target, .. } => Stmt::Assign {
            target: target.clone(),
            value: Expr::ReenterNext,
        },
        Stmt::Expr { .. } => Stmt::Expr {
            expr: Expr::ReenterNext,
        },
        other => other.clone(),
    }
}
