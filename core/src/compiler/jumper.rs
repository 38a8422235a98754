//! The instrumentation pass
//!
//! Rewrites every function so it can rebuild a paused activation and jump to
//! the statement it was paused at. Each function gets:
//!
//! - `StackDec` / `StackInc` around its body and before every ordinary return
//! - a restore prologue (`RestoreFrame`) that, in restoring mode, pops the
//!   outermost frame, sets the target label and writes the saved locals back
//! - a [`FrameLayout`] describing its capture and re-entry closures
//!
//! and its control constructs are rewritten so one program serves both modes:
//!
//! ```text
//! if (t) A else B   =>  if ((normal && t) || (restoring && target in A)) A
//!                       else if (normal || (restoring && target in B)) B
//! while (t) B       =>  while ((restoring && target in B) || (normal && t)) B
//! l: S              =>  if (normal || (restoring && target in S)) l: S
//! ```
//!
//! Straight-line statements without a call run only in normal mode, and
//! neighbouring ones share a single guard.

use std::rc::Rc;

use tracing::debug;

use super::capture;
use super::fold::{self, Fold};
use super::label::{self, AppType, Segment};
use crate::ast::{
    BinOp, CatchClause, Expr, FrameLayout, Function, Instrumentation, Program, Reentry, Stmt,
};
use crate::config::{ArgsFidelity, CompilerOpts, NewMethod};

/// Local holding `new.target` under direct construction
pub const NEW_TARGET: &str = "$newTarget";
const RETVAL: &str = "$retval";

pub struct Jumper<'a> {
    opts: &'a CompilerOpts,
    /// Rewrite plain returns for `new.target` (function bodies under direct construction)
    constructor_returns: bool,
}

impl<'a> Jumper<'a> {
    pub fn new(opts: &'a CompilerOpts) -> Self {
        Self {
            opts,
            constructor_returns: false,
        }
    }

    pub fn program(&self, program: &Program) -> Program {
        let body = Nested { jumper: self }.fold_body(&program.body);
        let analysis = label::analyze(&body);
        debug!(labels = analysis.label_count, "instrumented top level");

        let top = Jumper::new(self.opts);
        let mut out = vec![Stmt::StackDec, Stmt::RestoreFrame];
        out.extend(top.block(analysis.body));
        out.push(Stmt::StackInc);

        Program {
            body: out,
            instrumented: Some(Instrumentation {
                strategy: self.opts.transform,
                new_method: self.opts.new_method,
                js_args: self.opts.js_args,
                yield_interval: self.opts.yield_interval,
                // top-level bindings are globals and survive a restore as they are
                frame: FrameLayout::default(),
            }),
        }
    }

    pub fn function(&self, func: &Function) -> Function {
        let body = Nested { jumper: self }.fold_body(&func.body);
        let analysis = label::analyze(&body);
        let direct = self.opts.new_method == NewMethod::Direct;

        let mut locals = analysis.locals;
        if direct {
            locals.push(NEW_TARGET.to_string());
        }
        let reentry = if analysis.uses_arguments {
            Reentry::Arguments {
                sync_formals: self.opts.js_args != ArgsFidelity::Simple,
            }
        } else {
            Reentry::Params
        };
        let layout = FrameLayout {
            locals,
            reentry,
            save_formals: analysis.uses_arguments && self.opts.js_args == ArgsFidelity::Full,
        };
        debug!(
            function = func.display_name(),
            labels = analysis.label_count,
            locals = layout.locals.len(),
            "instrumented function"
        );

        let mut out = Vec::new();
        if direct {
            out.push(Stmt::Let {
                name: NEW_TARGET.to_string(),
                init: Some(Expr::NewTarget),
            });
        }
        let rewriter = Jumper {
            opts: self.opts,
            constructor_returns: direct,
        };
        out.push(Stmt::StackDec);
        out.push(Stmt::RestoreFrame);
        out.extend(rewriter.block(analysis.body));
        out.push(Stmt::StackInc);
        if direct {
            out.push(Stmt::guarded(
                Expr::ident(NEW_TARGET),
                Stmt::Return {
                    value: Some(Expr::This),
                },
            ));
        }

        Function {
            name: func.name.clone(),
            params: func.params.clone(),
            body: out,
            frame: Some(layout),
        }
    }

    /* ===================== Statements ===================== */

    fn block(&self, segments: Vec<Segment>) -> Vec<Stmt> {
        let stmts = segments
            .into_iter()
            .flat_map(|s| self.segment(s))
            .collect();
        coalesce(stmts)
    }

    fn single(&self, segment: Segment) -> Box<Stmt> {
        let mut stmts = self.segment(segment);
        if stmts.len() == 1 {
            Box::new(stmts.remove(0))
        } else {
            Box::new(Stmt::block(stmts))
        }
    }

    fn segment(&self, segment: Segment) -> Vec<Stmt> {
        match segment {
            Segment::Plain(stmt) => match stmt {
                Stmt::Let { .. }
                | Stmt::Assign { .. }
                | Stmt::Expr { .. }
                | Stmt::FunctionDecl { .. }
                | Stmt::Throw { .. }
                | Stmt::Break { .. }
                | Stmt::Continue { .. } => vec![Stmt::guarded(Expr::IsNormal, stmt)],
                other => vec![other],
            },

            Segment::Capture { label, stmt } => {
                capture::capture_point(self.opts.transform, label, stmt)
            }

            Segment::Return { value, app } => self.ret(value, app),

            Segment::Block(body) => vec![Stmt::block(self.block(body))],

            Segment::If {
                test,
                then_s,
                else_s,
            } => {
                let test = or_restoring(Expr::and(Expr::IsNormal, test), &then_s.labels());
                let else_s = else_s.map(|alt| {
                    let cond = or_restoring(Expr::IsNormal, &alt.labels());
                    Box::new(Stmt::If {
                        test: cond,
                        then_s: self.single(*alt),
                        else_s: None,
                    })
                });
                vec![Stmt::If {
                    test,
                    then_s: self.single(*then_s),
                    else_s,
                }]
            }

            Segment::While { test, body } => {
                let labels = body.labels();
                let normal = Expr::and(Expr::IsNormal, test);
                let test = match restoring_into(&labels) {
                    Some(restoring) => Expr::or(restoring, normal),
                    None => normal,
                };
                vec![Stmt::While {
                    test,
                    body: self.single(*body),
                }]
            }

            Segment::Labeled { label, body } => {
                let cond = or_restoring(Expr::IsNormal, &body.labels());
                vec![Stmt::guarded(
                    cond,
                    Stmt::Labeled {
                        label,
                        body: self.single(*body),
                    },
                )]
            }

            Segment::Try {
                body,
                catch,
                finally,
            } => {
                let mut try_body = Vec::new();
                if let Some((param, handler)) = &catch {
                    // resuming inside the handler re-raises the saved exception
                    if let Some(into_handler) = restoring_into(&handler.labels()) {
                        try_body.push(Stmt::guarded(
                            into_handler,
                            Stmt::Throw {
                                value: Expr::ident(param.clone()),
                            },
                        ));
                    }
                }
                try_body.extend(self.segment(*body));

                let catch = catch.map(|(param, handler)| {
                    let mut handler_body = vec![Stmt::RethrowSignal {
                        name: param.clone(),
                    }];
                    handler_body.extend(self.segment(*handler));
                    CatchClause {
                        param,
                        body: Box::new(Stmt::block(handler_body)),
                    }
                });

                let finally = finally
                    .map(|f| Box::new(Stmt::guarded(Expr::not(Expr::Capturing), *self.single(*f))));

                vec![Stmt::Try {
                    body: Box::new(Stmt::block(try_body)),
                    catch,
                    finally,
                }]
            }
        }
    }

    fn ret(&self, value: Option<Expr>, app: AppType) -> Vec<Stmt> {
        match app {
            AppType::None if self.constructor_returns => {
                // a constructor's non-object result yields `this`
                let not_object = Expr::not(Expr::binary(
                    BinOp::InstanceOf,
                    Expr::ident(RETVAL),
                    Expr::ident("Object"),
                ));
                vec![
                    Stmt::Let {
                        name: RETVAL.to_string(),
                        init: Some(value.unwrap_or(Expr::Undefined)),
                    },
                    Stmt::StackInc,
                    Stmt::Return {
                        value: Some(Expr::Cond {
                            test: Box::new(Expr::and(Expr::ident(NEW_TARGET), not_object)),
                            then_e: Box::new(Expr::This),
                            else_e: Box::new(Expr::ident(RETVAL)),
                        }),
                    },
                ]
            }
            AppType::None => vec![Stmt::StackInc, Stmt::Return { value }],
            AppType::Mixed => vec![Stmt::Return { value }],
            // a tail call is unlabeled: no frame of this function is ever resumed there
            AppType::Tail => vec![
                Stmt::StackInc,
                Stmt::guarded(Expr::IsNormal, Stmt::Return { value }),
            ],
        }
    }
}

/* ===================== Nested Functions ===================== */

/// Instruments nested functions and routes `new` through the driver
struct Nested<'j, 'a> {
    jumper: &'j Jumper<'a>,
}

impl Fold for Nested<'_, '_> {
    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        Rc::new(self.jumper.function(func))
    }

    fn fold_expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::New { callee, args } if self.jumper.opts.new_method == NewMethod::Wrapper => {
                Expr::HandleNew {
                    callee: Box::new(self.fold_expr(callee)),
                    args: args.iter().map(|a| self.fold_expr(a)).collect(),
                }
            }
            other => fold::fold_expr(self, other),
        }
    }
}

/* ===================== Helpers ===================== */

/// `restoring && target in labels`, or nothing when no label is reachable
fn restoring_into(labels: &[u32]) -> Option<Expr> {
    if labels.is_empty() {
        None
    } else {
        Some(Expr::and(
            Expr::IsRestoring,
            Expr::TargetIn {
                labels: labels.to_vec(),
            },
        ))
    }
}

fn or_restoring(normal: Expr, labels: &[u32]) -> Expr {
    match restoring_into(labels) {
        Some(restoring) => Expr::or(normal, restoring),
        None => normal,
    }
}

fn is_normal_guarded(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::If {
            test: Expr::IsNormal,
            else_s: None,
            ..
        }
    )
}

/// Merge runs of `if (normal) S` into one guard
fn coalesce(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out: Vec<Stmt> = Vec::with_capacity(stmts.len());
    let mut run: Vec<Stmt> = Vec::new();

    let flush = |run: &mut Vec<Stmt>, out: &mut Vec<Stmt>| match run.len() {
        0 => {}
        1 => out.append(run),
        _ => {
            let body = run
                .drain(..)
                .filter_map(|s| match s {
                    Stmt::If { then_s, .. } => Some(*then_s),
                    _ => None,
                })
                .collect();
            out.push(Stmt::guarded(Expr::IsNormal, Stmt::block(body)));
        }
    };

    for stmt in stmts {
        if is_normal_guarded(&stmt) {
            run.push(stmt);
        } else {
            flush(&mut run, &mut out);
            out.push(stmt);
        }
    }
    flush(&mut run, &mut out);
    out
}
