//! Label and segmentation analysis
//!
//! Assigns every suspend-capable application in a function body a
//! monotonically increasing label, and rebuilds the body as a [`Segment`]
//! tree where each control construct can report the labels reachable inside
//! it. Also collects what the frame layout needs: the function's locals in
//! positional order and whether it reads `arguments`.
//!
//! Nested function literals are opaque here; they are analyzed on their own.

use crate::ast::{CatchClause, Expr, LValue, Stmt};

/// Local receiving the result of a tail call made inside `try`
pub const TAIL_RESULT: &str = "$tail";

/// How a statement relates to a trailing application
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AppType {
    /// No suspend-capable call
    None,
    /// The call is in tail position; resuming it resumes the caller
    Tail,
    /// A call whose value is still needed locally
    Mixed,
}

/// A statement annotated for the jumper
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Plain(Stmt),
    /// `let x = f(..)`, `x = f(..)` or `f(..)` at resumption address `label`
    Capture { label: u32, stmt: Stmt },
    Return { value: Option<Expr>, app: AppType },
    Block(Vec<Segment>),
    If {
        test: Expr,
        then_s: Box<Segment>,
        else_s: Option<Box<Segment>>,
    },
    While { test: Expr, body: Box<Segment> },
    Labeled { label: String, body: Box<Segment> },
    Try {
        body: Box<Segment>,
        catch: Option<(String, Box<Segment>)>,
        finally: Option<Box<Segment>>,
    },
}

impl Segment {
    /// Every label reachable inside this segment, in ascending order
    pub fn labels(&self) -> Vec<u32> {
        let mut out = Vec::new();
        self.collect_labels(&mut out);
        out
    }

    fn collect_labels(&self, out: &mut Vec<u32>) {
        match self {
            Segment::Plain(_) | Segment::Return { .. } => {}
            Segment::Capture { label, .. } => out.push(*label),
            Segment::Block(body) => body.iter().for_each(|s| s.collect_labels(out)),
            Segment::If { then_s, else_s, .. } => {
                then_s.collect_labels(out);
                if let Some(else_s) = else_s {
                    else_s.collect_labels(out);
                }
            }
            Segment::While { body, .. } | Segment::Labeled { body, .. } => body.collect_labels(out),
            Segment::Try {
                body,
                catch,
                finally,
            } => {
                body.collect_labels(out);
                if let Some((_, handler)) = catch {
                    handler.collect_labels(out);
                }
                if let Some(finally) = finally {
                    finally.collect_labels(out);
                }
            }
        }
    }

    pub fn app_type(&self) -> AppType {
        match self {
            Segment::Plain(_) => AppType::None,
            Segment::Capture { .. } => AppType::Mixed,
            Segment::Return { app, .. } => *app,
            Segment::Block(body) => body.iter().map(Segment::app_type).max().unwrap_or(AppType::None),
            Segment::If { then_s, else_s, .. } => {
                let alt = else_s.as_ref().map_or(AppType::None, |s| s.app_type());
                then_s.app_type().max(alt)
            }
            Segment::While { body, .. } | Segment::Labeled { body, .. } => body.app_type(),
            Segment::Try {
                body,
                catch,
                finally,
            } => {
                let handler = catch.as_ref().map_or(AppType::None, |(_, h)| h.app_type());
                let finally = finally.as_ref().map_or(AppType::None, |f| f.app_type());
                body.app_type().max(handler).max(finally)
            }
        }
    }
}

/// Result of analyzing one function body
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub body: Vec<Segment>,
    /// `let`s, catch parameters and nested function declarations, first-seen order
    pub locals: Vec<String>,
    pub uses_arguments: bool,
    pub label_count: u32,
}

pub fn analyze(body: &[Stmt]) -> Analysis {
    let mut analyzer = Analyzer::default();
    let segments = body.iter().map(|s| analyzer.stmt(s)).collect();
    Analysis {
        body: segments,
        locals: analyzer.locals,
        uses_arguments: analyzer.uses_arguments,
        label_count: analyzer.next_label,
    }
}

#[derive(Default)]
struct Analyzer {
    next_label: u32,
    locals: Vec<String>,
    uses_arguments: bool,
    /// Enclosing `try` statements
    try_depth: usize,
}

impl Analyzer {
    fn local(&mut self, name: &str) {
        if !self.locals.iter().any(|l| l == name) {
            self.locals.push(name.to_string());
        }
    }

    fn stmt(&mut self, stmt: &Stmt) -> Segment {
        self.scan_arguments(stmt);

        match stmt {
            Stmt::Let { name, .. } => {
                self.local(name);
                self.leaf(stmt)
            }
            Stmt::Assign { .. } | Stmt::Expr { .. } => self.leaf(stmt),
            Stmt::FunctionDecl { func } => {
                if let Some(name) = &func.name {
                    self.local(name);
                }
                Segment::Plain(stmt.clone())
            }
            // a handler or `finally` still has to run when the callee resumes
            Stmt::Return { value: Some(v) } if v.is_application() && self.try_depth > 0 => {
                self.local(TAIL_RESULT);
                let call = self.leaf(&Stmt::Let {
                    name: TAIL_RESULT.to_string(),
                    init: Some(v.clone()),
                });
                Segment::Block(vec![
                    call,
                    Segment::Return {
                        value: Some(Expr::ident(TAIL_RESULT)),
                        app: AppType::None,
                    },
                ])
            }
            Stmt::Return { value } => {
                let app = match value {
                    Some(v) if v.is_application() => AppType::Tail,
                    Some(v) if crate::normal_form::walk::contains_application(v) => AppType::Mixed,
                    _ => AppType::None,
                };
                Segment::Return {
                    value: value.clone(),
                    app,
                }
            }
            Stmt::Block { body } => Segment::Block(body.iter().map(|s| self.stmt(s)).collect()),
            Stmt::If {
                test,
                then_s,
                else_s,
            } => Segment::If {
                test: test.clone(),
                then_s: Box::new(self.stmt(then_s)),
                else_s: else_s.as_ref().map(|s| Box::new(self.stmt(s))),
            },
            Stmt::While { test, body } => Segment::While {
                test: test.clone(),
                body: Box::new(self.stmt(body)),
            },
            Stmt::Labeled { label, body } => Segment::Labeled {
                label: label.clone(),
                body: Box::new(self.stmt(body)),
            },
            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                self.try_depth += 1;
                let body = Box::new(self.stmt(body));
                let catch = catch.as_ref().map(|CatchClause { param, body }| {
                    self.local(param);
                    (param.clone(), Box::new(self.stmt(body)))
                });
                let finally = finally.as_ref().map(|f| Box::new(self.stmt(f)));
                self.try_depth -= 1;
                Segment::Try {
                    body,
                    catch,
                    finally,
                }
            }
            _ => Segment::Plain(stmt.clone()),
        }
    }

    /// Straight-line statement: a capture point when it carries an application
    fn leaf(&mut self, stmt: &Stmt) -> Segment {
        if stmt.application().is_some() {
            let label = self.next_label;
            self.next_label += 1;
            Segment::Capture {
                label,
                stmt: stmt.clone(),
            }
        } else {
            Segment::Plain(stmt.clone())
        }
    }

    fn scan_arguments(&mut self, stmt: &Stmt) {
        if self.uses_arguments {
            return;
        }
        let found = match stmt {
            Stmt::Let { init: Some(e), .. }
            | Stmt::Expr { expr: e }
            | Stmt::Throw { value: e }
            | Stmt::Return { value: Some(e) } => reads_arguments(e),
            Stmt::Assign { target, value } => {
                reads_arguments(value)
                    || match target {
                        LValue::Ident { .. } => false,
                        LValue::Member { object, .. } => reads_arguments(object),
                        LValue::Index { object, index } => {
                            reads_arguments(object) || reads_arguments(index)
                        }
                    }
            }
            Stmt::If { test, .. } | Stmt::While { test, .. } => reads_arguments(test),
            _ => false,
        };
        self.uses_arguments = found;
    }
}

fn reads_arguments(expr: &Expr) -> bool {
    match expr {
        Expr::Arguments => true,
        Expr::Binary { left, right, .. } => reads_arguments(left) || reads_arguments(right),
        Expr::Unary { arg, .. } => reads_arguments(arg),
        Expr::Cond {
            test,
            then_e,
            else_e,
        } => reads_arguments(test) || reads_arguments(then_e) || reads_arguments(else_e),
        Expr::Member { object, .. } => reads_arguments(object),
        Expr::Index { object, index } => reads_arguments(object) || reads_arguments(index),
        Expr::Call { callee, args }
        | Expr::New { callee, args }
        | Expr::HandleNew { callee, args } => {
            reads_arguments(callee) || args.iter().any(reads_arguments)
        }
        Expr::Array { elements } => elements.iter().any(reads_arguments),
        Expr::Object { props } => props.iter().any(|(_, e)| reads_arguments(e)),
        _ => false,
    }
}
