//! Tree-walking evaluation of (instrumented) guest programs
//!
//! All locals of an activation live in one function-level [`Scope`], so a
//! frame is just the values of the layout's locals in order. Blocks do not
//! open scopes.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use super::driver::{Machine, Mode};
use super::errors::{self, FUDGED_CONTINUATION, RANGE_ERROR, REFERENCE_ERROR, TYPE_ERROR};
use super::frame::{thunk, Completion, Frame, Signal, Thunk, Unwind};
use super::builtins;
use super::values::{Closure, Env, Object, Scope, Value};
use crate::ast::{BinOp, Expr, Function, LValue, Reentry, Stmt, UnOp};
use crate::config::CaptureStrategy;
use crate::error::RuntimeError;

type Exec = Result<Completion, Unwind>;
type Eval = Result<Value, Unwind>;

/* ===================== Activations ===================== */

/// One running call of a guest function (or the program itself)
pub(crate) struct Activation {
    pub scope: Env,
    pub this: Value,
    pub func: Rc<Function>,
    /// `None` for the program's top level
    pub callee: Option<Rc<Closure>>,
    /// Arguments as passed
    pub args: Vec<Value>,
    pub arg_count: usize,
    /// Resumption label set by the restore prologue
    pub target: Option<u32>,
    pub new_target: Value,
    /// Signal that entered a catch clause, held for its guard
    pub caught_signal: Option<Signal>,
}

impl Activation {
    fn top(globals: Env, func: Rc<Function>) -> Self {
        Self {
            scope: globals,
            this: Value::Undefined,
            func,
            callee: None,
            args: Vec::new(),
            arg_count: 0,
            target: None,
            new_target: Value::Undefined,
            caught_signal: None,
        }
    }

    fn param_values(&self) -> Vec<Value> {
        self.func
            .params
            .iter()
            .map(|p| Scope::local(&self.scope, p).unwrap_or(Value::Undefined))
            .collect()
    }

    fn layout_locals(&self) -> &[String] {
        self.func.frame.as_ref().map_or(&[], |l| l.locals.as_slice())
    }

    /// Snapshot this activation as a frame resuming at `label`
    pub fn capture_frame(&self, label: u32) -> Frame {
        let locals = self
            .layout_locals()
            .iter()
            .map(|name| Scope::local(&self.scope, name).unwrap_or(Value::Undefined))
            .collect();
        let save_formals = self.func.frame.as_ref().map_or(false, |l| l.save_formals);

        Frame::Call {
            resume: self.reenter(),
            function: self.func.display_name().to_string(),
            locals,
            label,
            formals: save_formals.then(|| self.param_values()),
            arg_count: save_formals.then_some(self.arg_count),
        }
    }

    /// Re-invoke this function the way its layout asks for
    pub fn reenter(&self) -> Thunk {
        let reentry = self.func.frame.as_ref().map_or(Reentry::Params, |l| l.reentry);
        let args = match reentry {
            Reentry::Params => self.param_values(),
            Reentry::Arguments { sync_formals: false } => self.args.clone(),
            Reentry::Arguments { sync_formals: true } => {
                let mut args = self.args.clone();
                for (i, value) in self.param_values().into_iter().enumerate() {
                    match args.get_mut(i) {
                        Some(slot) => *slot = value,
                        None => args.push(value),
                    }
                }
                args
            }
        };
        self.invoke(args, Value::Undefined)
    }

    /// Re-invoke a call cut off at entry: same arguments, same `new.target`
    pub fn depth_reenter(&self) -> Thunk {
        self.invoke(self.args.clone(), self.new_target.clone())
    }

    fn invoke(&self, args: Vec<Value>, new_target: Value) -> Thunk {
        let this = self.this.clone();
        match &self.callee {
            Some(closure) => {
                let closure = closure.clone();
                thunk(move |m| {
                    m.call_closure(&closure, this.clone(), args.clone(), new_target.clone())
                })
            }
            None => {
                let func = self.func.clone();
                thunk(move |m| m.run_top(&func))
            }
        }
    }
}

/* ===================== Calls ===================== */

impl Machine {
    pub(crate) fn run_top(&mut self, top: &Rc<Function>) -> Eval {
        let mut act = Activation::top(self.globals.clone(), top.clone());
        hoist(&act.scope, &top.body);
        let completion = self.exec_block(&mut act, &top.body)?;
        finish(completion)
    }

    /// Call any callable value
    pub fn call_value(&mut self, func: Value, this: Value, args: Vec<Value>) -> Eval {
        match func {
            Value::Closure(closure) => self.call_closure(&closure, this, args, Value::Undefined),
            Value::Native(native) => (native.func)(self, this, args),
            Value::Continuation(stack) => {
                let mut stack = (*stack).clone();
                let value = args.into_iter().next().unwrap_or(Value::Undefined);
                stack.push_inner(Frame::top_value(value));
                Err(Signal::Restore { stack }.into())
            }
            Value::Fudged => {
                let value = args.into_iter().next().unwrap_or(Value::Undefined);
                Err(errors::throw(
                    FUDGED_CONTINUATION,
                    format!("FudgedContinuationError({})", value),
                ))
            }
            other => Err(errors::throw(TYPE_ERROR, format!("{} is not a function", other))),
        }
    }

    pub(crate) fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        this: Value,
        args: Vec<Value>,
        new_target: Value,
    ) -> Eval {
        let func = closure.func.clone();
        let scope = Scope::child(&closure.env);
        for (i, param) in func.params.iter().enumerate() {
            Scope::declare(&scope, param, args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        if let Some(layout) = &func.frame {
            for local in &layout.locals {
                if !Scope::has_local(&scope, local) {
                    Scope::declare(&scope, local, Value::Undefined);
                }
            }
        }
        hoist(&scope, &func.body);

        let mut act = Activation {
            scope,
            this,
            func: func.clone(),
            callee: Some(closure.clone()),
            arg_count: args.len(),
            args,
            target: None,
            new_target,
            caught_signal: None,
        };
        let completion = self.exec_block(&mut act, &func.body)?;
        finish(completion)
    }

    /// Plain construction: no frame of its own
    pub(crate) fn construct(&mut self, callee: Value, args: Vec<Value>) -> Eval {
        match &callee {
            Value::Closure(ctor) => {
                let obj = Value::Object(Object::with_proto(ctor.prototype.clone()));
                let result = self.call_closure(ctor, obj.clone(), args, callee.clone())?;
                Ok(if result.is_object() { result } else { obj })
            }
            Value::Native(native) if native.constructor => {
                (native.func)(self, Value::Undefined, args)
            }
            other => Err(errors::throw(TYPE_ERROR, format!("{} is not a constructor", other))),
        }
    }

    /// Construction routed through the driver
    ///
    /// The object under construction is kept in a frame of its own, so a
    /// capture inside the constructor resumes into the same object.
    pub(crate) fn handle_new(&mut self, callee: Value, args: Vec<Value>) -> Eval {
        let ctor = match &callee {
            Value::Closure(ctor) if self.strategy() != CaptureStrategy::Fudge => ctor.clone(),
            _ => return self.construct(callee, args),
        };
        let function = format!("new {}", ctor.name());
        let restoring = self.mode == Mode::Restoring;

        let obj = if restoring {
            match self.stack.pop_outer() {
                None => return Err(RuntimeError::EmptyStack.into()),
                Some(Frame::Top { .. }) => {
                    return Err(RuntimeError::UnexpectedTop { function }.into())
                }
                Some(Frame::Call { mut locals, .. }) if locals.len() == 1 => locals.remove(0),
                Some(Frame::Call { locals, .. }) => {
                    return Err(RuntimeError::FrameShape {
                        function,
                        expected: 1,
                        found: locals.len(),
                    }
                    .into())
                }
            }
        } else {
            Value::Object(Object::with_proto(ctor.prototype.clone()))
        };

        let frame = {
            let callee = callee.clone();
            let args = args.clone();
            Frame::Call {
                resume: thunk(move |m| m.handle_new(callee.clone(), args.clone())),
                function,
                locals: vec![obj.clone()],
                label: 0,
                formals: None,
                arg_count: None,
            }
        };

        let eager = self.strategy() == CaptureStrategy::Eager;
        if eager {
            self.eager_stack.push_inner(frame.clone());
        }
        let result = if restoring {
            self.reenter_next()
        } else {
            self.call_closure(&ctor, obj.clone(), args, callee.clone())
        };
        if eager {
            self.eager_stack.pop_inner();
        }

        match result {
            Err(Unwind::Signal(Signal::Capture { handler, mut stack }))
                if self.strategy() == CaptureStrategy::Lazy =>
            {
                stack.push_outer(frame);
                Err(Signal::Capture { handler, stack }.into())
            }
            Ok(_) if self.capturing && self.strategy() == CaptureStrategy::Retval => {
                self.stack.push_outer(frame);
                Ok(Value::Undefined)
            }
            Ok(value) if value.is_object() => Ok(value),
            Ok(_) => Ok(obj),
            Err(err) => Err(err),
        }
    }
}

/// A function body's completion as a call result
fn finish(completion: Completion) -> Eval {
    match completion {
        Completion::Return(value) => Ok(value),
        Completion::Normal => Ok(Value::Undefined),
        Completion::Break(label) => Err(RuntimeError::StrayJump(jump("break", label)).into()),
        Completion::Continue(label) => {
            Err(RuntimeError::StrayJump(jump("continue", label)).into())
        }
    }
}

fn jump(kind: &str, label: Option<String>) -> String {
    match label {
        Some(label) => format!("{} {}", kind, label),
        None => kind.to_string(),
    }
}

/// Bind function declarations anywhere in `body` (nested functions excluded)
fn hoist(scope: &Env, body: &[Stmt]) {
    for stmt in body {
        hoist_stmt(scope, stmt);
    }
}

fn hoist_stmt(scope: &Env, stmt: &Stmt) {
    match stmt {
        Stmt::FunctionDecl { func } => declare_function(scope, func),
        Stmt::Block { body } => hoist(scope, body),
        Stmt::If { then_s, else_s, .. } => {
            hoist_stmt(scope, then_s);
            if let Some(else_s) = else_s {
                hoist_stmt(scope, else_s);
            }
        }
        Stmt::While { body, .. }
        | Stmt::Labeled { body, .. }
        | Stmt::RecordOnCapture { body, .. }
        | Stmt::ShadowFrame { body, .. } => hoist_stmt(scope, body),
        Stmt::Try {
            body,
            catch,
            finally,
        } => {
            hoist_stmt(scope, body);
            if let Some(catch) = catch {
                hoist_stmt(scope, &catch.body);
            }
            if let Some(finally) = finally {
                hoist_stmt(scope, finally);
            }
        }
        _ => {}
    }
}

/// Bind `func` unless this scope already holds a closure over it
fn declare_function(scope: &Env, func: &Rc<Function>) {
    let Some(name) = &func.name else {
        return;
    };
    if let Some(Value::Closure(existing)) = Scope::local(scope, name) {
        if Rc::ptr_eq(&existing.func, func) {
            return;
        }
    }
    let closure = Closure::new(func.clone(), scope.clone());
    Scope::declare(scope, name, Value::Closure(Rc::new(closure)));
}

/* ===================== Statements ===================== */

impl Machine {
    fn exec_block(&mut self, act: &mut Activation, body: &[Stmt]) -> Exec {
        for stmt in body {
            match self.exec(act, stmt)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec(&mut self, act: &mut Activation, stmt: &Stmt) -> Exec {
        match stmt {
            Stmt::Block { body } => self.exec_block(act, body),

            Stmt::Let { name, init } => {
                let value = match init {
                    Some(init) => self.eval(act, init)?,
                    None => Value::Undefined,
                };
                Scope::declare(&act.scope, name, value);
                Ok(Completion::Normal)
            }

            Stmt::Assign { target, value } => {
                self.assign(act, target, value)?;
                Ok(Completion::Normal)
            }

            Stmt::Expr { expr } => {
                self.eval(act, expr)?;
                Ok(Completion::Normal)
            }

            Stmt::If {
                test,
                then_s,
                else_s,
            } => {
                if self.eval(act, test)?.is_truthy() {
                    self.exec(act, then_s)
                } else if let Some(else_s) = else_s {
                    self.exec(act, else_s)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::While { test, body } => self.exec_loop(act, None, test, body),

            Stmt::Labeled { label, body } => match body.as_ref() {
                Stmt::While { test, body } => self.exec_loop(act, Some(label), test, body),
                body => match self.exec(act, body)? {
                    Completion::Break(Some(l)) if l == *label => Ok(Completion::Normal),
                    completion => Ok(completion),
                },
            },

            Stmt::Break { label } => Ok(Completion::Break(label.clone())),
            Stmt::Continue { label } => Ok(Completion::Continue(label.clone())),

            Stmt::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(act, value)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }

            Stmt::Throw { value } => Err(Unwind::Throw(self.eval(act, value)?)),

            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                let result = match (self.exec(act, body), catch) {
                    (Err(Unwind::Throw(value)), Some(clause)) => {
                        Scope::declare(&act.scope, &clause.param, value);
                        self.exec(act, &clause.body)
                    }
                    // the parameter stays unbound; the clause's guard rethrows the signal
                    (Err(Unwind::Signal(signal)), Some(clause)) => {
                        trace!(signal = signal.name(), "signal entered a catch clause");
                        let outer = act.caught_signal.replace(signal);
                        let result = self.exec(act, &clause.body);
                        act.caught_signal = outer;
                        result
                    }
                    (result, _) => result,
                };
                match finally {
                    None => result,
                    Some(finally) => match self.exec(act, finally)? {
                        Completion::Normal => result,
                        abrupt => Ok(abrupt),
                    },
                }
            }

            Stmt::FunctionDecl { func } => {
                declare_function(&act.scope, func);
                Ok(Completion::Normal)
            }

            // ----- Instrumentation -----
            Stmt::RestoreFrame => {
                if self.mode == Mode::Restoring {
                    self.restore_frame(act)?;
                }
                Ok(Completion::Normal)
            }

            Stmt::StackDec => match self.stack_dec(|| act.depth_reenter()) {
                None => Ok(Completion::Normal),
                // retval: return right away so callers can record their frames
                Some(Ok(_)) => Ok(Completion::Return(Value::Undefined)),
                Some(Err(err)) => Err(err),
            },

            Stmt::StackInc => {
                self.stack_inc();
                Ok(Completion::Normal)
            }

            Stmt::RecordOnCapture { label, body } => match self.exec(act, body) {
                Err(Unwind::Signal(Signal::Capture { handler, mut stack })) => {
                    stack.push_outer(act.capture_frame(*label));
                    Err(Signal::Capture { handler, stack }.into())
                }
                result => result,
            },

            Stmt::ShadowFrame { label, body } => {
                self.eager_stack.push_inner(act.capture_frame(*label));
                let result = self.exec(act, body);
                self.eager_stack.pop_inner();
                result
            }

            Stmt::ReturnIfCapturing { label } => {
                if self.capturing {
                    self.stack.push_outer(act.capture_frame(*label));
                    Ok(Completion::Return(Value::Undefined))
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::RethrowSignal { .. } => match act.caught_signal.take() {
                Some(signal) => Err(Unwind::Signal(signal)),
                None => Ok(Completion::Normal),
            },
        }
    }

    fn exec_loop(
        &mut self,
        act: &mut Activation,
        label: Option<&String>,
        test: &Expr,
        body: &Stmt,
    ) -> Exec {
        let ours = |l: &Option<String>| l.is_none() || l.as_ref() == label;

        while self.eval(act, test)?.is_truthy() {
            match self.exec(act, body)? {
                Completion::Normal => {}
                Completion::Continue(l) if ours(&l) => {}
                Completion::Break(l) if ours(&l) => break,
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    /// Pop the outermost frame into `act`
    fn restore_frame(&mut self, act: &mut Activation) -> Result<(), Unwind> {
        let function = act.func.display_name().to_string();
        let (locals, label, formals, arg_count) = match self.stack.pop_outer() {
            None => return Err(RuntimeError::EmptyStack.into()),
            Some(Frame::Top { .. }) => {
                return Err(RuntimeError::UnexpectedTop { function }.into())
            }
            Some(Frame::Call {
                locals,
                label,
                formals,
                arg_count,
                ..
            }) => (locals, label, formals, arg_count),
        };

        let names = act.layout_locals();
        if names.len() != locals.len() {
            return Err(RuntimeError::FrameShape {
                function,
                expected: names.len(),
                found: locals.len(),
            }
            .into());
        }
        trace!(function = %function, label, "frame restored");

        for (name, value) in names.iter().zip(locals) {
            Scope::declare(&act.scope, name, value);
        }
        if let Some(formals) = formals {
            for (param, value) in act.func.params.iter().zip(formals) {
                Scope::declare(&act.scope, param, value);
            }
        }
        if let Some(count) = arg_count {
            act.arg_count = count;
        }
        act.target = Some(label);
        Ok(())
    }

    fn assign(
        &mut self,
        act: &mut Activation,
        target: &LValue,
        value: &Expr,
    ) -> Result<(), Unwind> {
        match target {
            LValue::Ident { name } => {
                let value = self.eval(act, value)?;
                if let Err(value) = Scope::assign(&act.scope, name, value) {
                    Scope::declare(&self.globals, name, value);
                }
                Ok(())
            }
            LValue::Member { object, property } => {
                let object = self.eval(act, object)?;
                let value = self.eval(act, value)?;
                set_property(&object, property, value)
            }
            LValue::Index { object, index } => {
                let object = self.eval(act, object)?;
                let index = self.eval(act, index)?;
                let value = self.eval(act, value)?;
                set_index(&object, &index, value)
            }
        }
    }
}

/* ===================== Expressions ===================== */

impl Machine {
    fn eval(&mut self, act: &mut Activation, expr: &Expr) -> Eval {
        match expr {
            Expr::Num { v } => Ok(Value::Num(*v)),
            Expr::Str { v } => Ok(Value::Str(v.clone())),
            Expr::Bool { v } => Ok(Value::Bool(*v)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),

            Expr::Ident { name } => Scope::lookup(&act.scope, name)
                .ok_or_else(|| errors::throw(REFERENCE_ERROR, format!("{} is not defined", name))),

            Expr::Binary { op, left, right } => match op {
                BinOp::And => {
                    let left = self.eval(act, left)?;
                    if left.is_truthy() {
                        self.eval(act, right)
                    } else {
                        Ok(left)
                    }
                }
                BinOp::Or => {
                    let left = self.eval(act, left)?;
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        self.eval(act, right)
                    }
                }
                op => {
                    let left = self.eval(act, left)?;
                    let right = self.eval(act, right)?;
                    binary(*op, &left, &right)
                }
            },

            Expr::Unary { op, arg } => match (op, arg.as_ref()) {
                (UnOp::TypeOf, Expr::Ident { name }) => Ok(Value::str(
                    Scope::lookup(&act.scope, name).map_or("undefined", |v| v.type_of()),
                )),
                (UnOp::TypeOf, arg) => Ok(Value::str(self.eval(act, arg)?.type_of())),
                (UnOp::Not, arg) => Ok(Value::Bool(!self.eval(act, arg)?.is_truthy())),
                (UnOp::Neg, arg) => Ok(Value::Num(-self.eval(act, arg)?.to_number())),
            },

            Expr::Cond {
                test,
                then_e,
                else_e,
            } => {
                if self.eval(act, test)?.is_truthy() {
                    self.eval(act, then_e)
                } else {
                    self.eval(act, else_e)
                }
            }

            Expr::Member { object, property } => {
                let object = self.eval(act, object)?;
                get_property(&object, property)
            }

            Expr::Index { object, index } => {
                let object = self.eval(act, object)?;
                let index = self.eval(act, index)?;
                get_index(&object, &index)
            }

            Expr::Call { callee, args } => {
                let (func, this) = match callee.as_ref() {
                    Expr::Member { object, property } => {
                        let object = self.eval(act, object)?;
                        (get_property(&object, property)?, object)
                    }
                    callee => (self.eval(act, callee)?, Value::Undefined),
                };
                let args = self.eval_all(act, args)?;
                self.call_value(func, this, args)
            }

            Expr::New { callee, args } => {
                let callee = self.eval(act, callee)?;
                let args = self.eval_all(act, args)?;
                self.construct(callee, args)
            }

            Expr::Function { func } => Ok(Value::Closure(Rc::new(Closure::new(
                func.clone(),
                act.scope.clone(),
            )))),

            Expr::Array { elements } => Ok(Value::array(self.eval_all(act, elements)?)),

            Expr::Object { props } => {
                let mut object = Object::default();
                for (key, value) in props {
                    let value = self.eval(act, value)?;
                    object.props.insert(key.clone(), value);
                }
                Ok(Value::Object(Rc::new(RefCell::new(object))))
            }

            Expr::This => Ok(act.this.clone()),

            Expr::Arguments => {
                let params = act.param_values();
                let values = (0..act.arg_count)
                    .map(|i| match params.get(i) {
                        Some(value) => value.clone(),
                        None => act.args.get(i).cloned().unwrap_or(Value::Undefined),
                    })
                    .collect();
                Ok(Value::array(values))
            }

            // ----- Instrumentation -----
            Expr::IsNormal => Ok(Value::Bool(self.mode == Mode::Normal)),
            Expr::IsRestoring => Ok(Value::Bool(self.mode == Mode::Restoring)),
            Expr::TargetIn { labels } => Ok(Value::Bool(
                act.target.map_or(false, |t| labels.contains(&t)),
            )),
            Expr::Capturing => Ok(Value::Bool(self.capturing)),
            Expr::ReenterNext => self.reenter_next(),
            Expr::NewTarget => Ok(act.new_target.clone()),
            Expr::Suspend => self.safe_point(),
            Expr::HandleNew { callee, args } => {
                let callee = self.eval(act, callee)?;
                let args = self.eval_all(act, args)?;
                self.handle_new(callee, args)
            }
        }
    }

    fn eval_all(&mut self, act: &mut Activation, exprs: &[Expr]) -> Result<Vec<Value>, Unwind> {
        exprs.iter().map(|e| self.eval(act, e)).collect()
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> Eval {
    let value = match op {
        BinOp::Add => match (left, right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{}{}", left, right)),
            _ => Value::Num(left.to_number() + right.to_number()),
        },
        BinOp::Sub => Value::Num(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Num(left.to_number() * right.to_number()),
        BinOp::Div => Value::Num(left.to_number() / right.to_number()),
        BinOp::Mod => Value::Num(left.to_number() % right.to_number()),
        BinOp::Eq => Value::Bool(left == right),
        BinOp::NotEq => Value::Bool(left != right),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(match ordering {
                None => false,
                Some(ordering) => match op {
                    BinOp::Lt => ordering.is_lt(),
                    BinOp::Le => ordering.is_le(),
                    BinOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            })
        }
        BinOp::InstanceOf => Value::Bool(instance_of(left, right)?),
        // short-circuiting operators are evaluated by the caller
        BinOp::And | BinOp::Or => Value::Undefined,
    };
    Ok(value)
}

fn instance_of(value: &Value, ctor: &Value) -> Result<bool, Unwind> {
    match ctor {
        Value::Native(native) => Ok(match native.name {
            "Object" => value.is_object(),
            "Array" => matches!(value, Value::Array(_)),
            "Error" => matches!(value, Value::Error(_)),
            _ => false,
        }),
        Value::Closure(closure) => {
            let Value::Object(obj) = value else {
                return Ok(false);
            };
            let mut proto = obj.borrow().proto.clone();
            while let Some(current) = proto {
                if Rc::ptr_eq(&current, &closure.prototype) {
                    return Ok(true);
                }
                proto = current.borrow().proto.clone();
            }
            Ok(false)
        }
        other => Err(errors::throw(
            TYPE_ERROR,
            format!("right-hand side of instanceof is not callable: {}", other),
        )),
    }
}

/* ===================== Properties ===================== */

fn get_property(object: &Value, name: &str) -> Eval {
    let value = match object {
        Value::Object(obj) => Object::get(obj, name).unwrap_or(Value::Undefined),
        Value::Array(items) => match name {
            "length" => Value::Num(items.borrow().len() as f64),
            "push" => Value::native("push", builtins::array_push),
            "pop" => Value::native("pop", builtins::array_pop),
            _ => Value::Undefined,
        },
        Value::Str(s) if name == "length" => Value::Num(s.chars().count() as f64),
        Value::Closure(closure) => match name {
            "prototype" => Value::Object(closure.prototype.clone()),
            "name" => Value::str(closure.name()),
            _ => Value::Undefined,
        },
        Value::Error(info) => match name {
            "message" => Value::str(info.message.clone()),
            "code" | "name" => Value::str(info.code.clone()),
            _ => Value::Undefined,
        },
        Value::Undefined | Value::Null => {
            return Err(errors::throw(
                TYPE_ERROR,
                format!("cannot read properties of {} (reading '{}')", object, name),
            ))
        }
        _ => Value::Undefined,
    };
    Ok(value)
}

fn get_index(object: &Value, index: &Value) -> Eval {
    match (object, as_index(index)) {
        (Value::Array(items), Some(i)) => {
            Ok(items.borrow().get(i).cloned().unwrap_or(Value::Undefined))
        }
        (Value::Str(s), Some(i)) => Ok(s
            .chars()
            .nth(i)
            .map_or(Value::Undefined, |c| Value::Str(c.to_string()))),
        _ => get_property(object, &index.to_string()),
    }
}

fn set_property(object: &Value, name: &str, value: Value) -> Result<(), Unwind> {
    match object {
        Value::Object(obj) => {
            obj.borrow_mut().props.insert(name.to_string(), value);
            Ok(())
        }
        other => Err(errors::throw(
            TYPE_ERROR,
            format!("cannot set property '{}' on {}", name, other),
        )),
    }
}

fn set_index(object: &Value, index: &Value, value: Value) -> Result<(), Unwind> {
    match (object, as_index(index)) {
        (Value::Array(items), Some(i)) => {
            let mut items = items.borrow_mut();
            if i >= items.len() {
                if i - items.len() > MAX_ARRAY_GAP {
                    return Err(errors::throw(
                        RANGE_ERROR,
                        format!(
                            "index {} is too far past the end of an array of length {}",
                            index,
                            items.len()
                        ),
                    ));
                }
                items.resize(i + 1, Value::Undefined);
            }
            items[i] = value;
            Ok(())
        }
        _ => set_property(object, &index.to_string(), value),
    }
}

/// Holes a single store may open past the end of an array
const MAX_ARRAY_GAP: usize = 1 << 16;

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Num(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        _ => None,
    }
}
