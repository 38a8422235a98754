//! The driver
//!
//! [`Machine`] owns everything the instrumented program consults at run time:
//! the current [`Mode`], the restore [`Stack`], the shadow stack kept under
//! eager capture, the depth budget and the yield countdown. Execution is a
//! trampoline: every capture, restore or discard unwinds back to [`Machine::drive`],
//! which decides what to run next. Guest call depth therefore never nests
//! driver invocations.
//!
//! ## Signals
//!
//! | signal    | driver action                                               |
//! |-----------|-------------------------------------------------------------|
//! | `Capture` | mint a continuation, push a top frame calling the handler, restore |
//! | `Restore` | replace the stack wholesale and restore it                  |
//! | `Discard` | drop everything and run the replacement                     |
//!
//! Guest exceptions pass through untouched; only an exception escaping the
//! outermost segment becomes a [`RuntimeError::Uncaught`].

use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, trace};

use super::builtins;
use super::frame::{thunk, Frame, Handler, Signal, Stack, Thunk, Unwind};
use super::values::{Env, Scope, Value};
use crate::ast::{Function, Program};
use crate::config::{CaptureStrategy, RuntimeOpts};
use crate::error::RuntimeError;

/* ===================== Types ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Restoring,
}

/// How a slice of execution ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done(Value),
    /// Yielded to the host; a resumption task is queued
    Suspended,
}

/// Deferred work for the host loop
pub enum Task {
    /// Re-enter the driver with a stack
    Resume(Stack),
    /// Arbitrary host work between guest slices
    Host(Box<dyn FnOnce(&mut Machine)>),
}

/// Counters for one machine's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub captures: u64,
    pub restores: u64,
    pub yields: u64,
    pub discards: u64,
}

enum Next {
    Run(Thunk),
    Restore(Stack),
}

/* ===================== Machine ===================== */

pub struct Machine {
    pub(crate) mode: Mode,
    /// Frames being restored (or collected on the return path under retval)
    pub(crate) stack: Stack,
    /// Live mirror of in-progress calls (eager capture, construction)
    pub(crate) eager_stack: Stack,
    /// Outer frames not yet re-entered when a restore is segmented
    pending: Stack,
    pub(crate) remaining_stack: Option<i64>,
    /// A capture is unwinding; `finally` blocks stay quiet
    pub(crate) capturing: bool,
    /// Handler of a capture collecting frames on the return path
    pending_handler: Option<Handler>,
    yield_interval: Option<u32>,
    countdown: u32,
    strategy: CaptureStrategy,
    opts: RuntimeOpts,
    pub(crate) globals: Env,
    tasks: VecDeque<Task>,
    output: Vec<String>,
    stats: Stats,
}

impl Machine {
    pub fn new(strategy: CaptureStrategy, opts: RuntimeOpts) -> Self {
        let globals = Scope::root();
        builtins::install(&globals);

        Self {
            mode: Mode::Normal,
            stack: Stack::new(),
            eager_stack: Stack::new(),
            pending: Stack::new(),
            remaining_stack: None,
            capturing: false,
            pending_handler: None,
            yield_interval: None,
            countdown: 0,
            strategy,
            opts,
            globals,
            tasks: VecDeque::new(),
            output: Vec::new(),
            stats: Stats::default(),
        }
    }

    /// A machine for the strategy `program` was instrumented with
    pub fn for_program(program: &Program, opts: RuntimeOpts) -> Self {
        let strategy = program
            .instrumented
            .as_ref()
            .map_or(CaptureStrategy::default(), |h| h.strategy);
        Self::new(strategy, opts)
    }

    pub fn strategy(&self) -> CaptureStrategy {
        self.strategy
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Lines written by `print`
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn print(&mut self, line: String) {
        trace!(line = %line, "print");
        self.output.push(line);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        Scope::local(&self.globals, name)
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        Scope::declare(&self.globals, name, value);
    }

    /* ===================== Entry Points ===================== */

    /// Run a program until it completes or yields
    pub fn run(&mut self, program: &Program) -> Result<Outcome, RuntimeError> {
        if let Some(header) = &program.instrumented {
            if header.strategy != self.strategy {
                return Err(RuntimeError::StrategyMismatch {
                    compiled: header.strategy.to_string(),
                    runtime: self.strategy.to_string(),
                });
            }
            self.yield_interval = header.yield_interval.filter(|n| *n > 0);
        }
        self.countdown = self.yield_interval.unwrap_or(0);

        let top = Rc::new(Function {
            name: Some("<top>".to_string()),
            params: Vec::new(),
            body: program.body.clone(),
            frame: program.instrumented.as_ref().map(|h| h.frame.clone()),
        });
        self.drive(Next::Run(thunk(move |m| m.run_top(&top))))
    }

    /// Re-enter the driver with a previously captured stack
    pub fn continue_with(&mut self, stack: Stack) -> Result<Outcome, RuntimeError> {
        self.drive(Next::Restore(stack))
    }

    /// Schedule `continuation` to receive `value` from the host loop
    pub fn resume(&mut self, continuation: &Rc<Stack>, value: Value) {
        let mut stack = (**continuation).clone();
        stack.push_inner(Frame::top_value(value));
        self.tasks.push_back(Task::Resume(stack));
    }

    /// Queue host work to run between guest slices
    pub fn defer(&mut self, work: impl FnOnce(&mut Machine) + 'static) {
        self.tasks.push_back(Task::Host(Box::new(work)));
    }

    pub fn next_task(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /* ===================== Trampoline ===================== */

    fn drive(&mut self, mut next: Next) -> Result<Outcome, RuntimeError> {
        loop {
            self.remaining_stack = self.opts.stack_size.map(i64::from);

            let result = match next {
                Next::Run(thunk) => {
                    trace!("running");
                    self.mode = Mode::Normal;
                    self.stack.clear();
                    self.eager_stack.clear();
                    thunk(self)
                }
                Next::Restore(stack) => self.restore(stack),
            };

            // a return-path capture finishes by returning from the outermost frame
            let result = match result {
                Ok(_) if self.capturing && self.strategy == CaptureStrategy::Retval => {
                    let handler = self.pending_handler.take().unwrap_or(Handler::Yield);
                    Err(Unwind::Signal(Signal::Capture {
                        handler,
                        stack: mem::take(&mut self.stack),
                    }))
                }
                other => other,
            };

            next = match result {
                Ok(value) if self.pending.is_empty() => return Ok(Outcome::Done(value)),
                Ok(value) => {
                    trace!(pending = self.pending.len(), "segment returned");
                    Next::Restore(self.next_segment(Frame::top_value(value)))
                }
                Err(Unwind::Throw(value)) if self.pending.is_empty() => {
                    return Err(RuntimeError::Uncaught(value.to_string()))
                }
                Err(Unwind::Throw(value)) => {
                    trace!(pending = self.pending.len(), "segment threw");
                    Next::Restore(self.next_segment(Frame::top_throw(value)))
                }
                Err(Unwind::Fault(err)) => return Err(err),
                Err(Unwind::Signal(Signal::Capture { handler, mut stack })) => {
                    self.capturing = false;
                    self.stats.captures += 1;
                    stack.append_outer(mem::take(&mut self.pending));
                    debug!(frames = stack.len(), handler = ?handler, "captured");

                    match handler {
                        Handler::Guest(handler) => {
                            let k = Value::Continuation(Rc::new(stack.clone()));
                            stack.push_inner(Frame::top(thunk(move |m| {
                                m.call_value(handler.clone(), Value::Undefined, vec![k.clone()])
                            })));
                            Next::Restore(stack)
                        }
                        Handler::Reenter(reenter) => {
                            stack.push_inner(Frame::top(reenter));
                            Next::Restore(stack)
                        }
                        Handler::Yield => {
                            self.stats.yields += 1;
                            stack.push_inner(Frame::top_value(Value::Undefined));
                            self.tasks.push_back(Task::Resume(stack));
                            debug!(queued = self.tasks.len(), "yielded to host");
                            return Ok(Outcome::Suspended);
                        }
                    }
                }
                Err(Unwind::Signal(Signal::Restore { stack })) => {
                    debug!(frames = stack.len(), "restore requested");
                    self.pending.clear();
                    Next::Restore(stack)
                }
                Err(Unwind::Signal(Signal::Discard { replacement })) => {
                    debug!(replacement = %replacement, "discarding continuation");
                    self.stats.discards += 1;
                    self.pending.clear();
                    Next::Run(thunk(move |m| {
                        if replacement.is_callable() {
                            m.call_value(replacement.clone(), Value::Undefined, Vec::new())
                        } else {
                            Ok(replacement.clone())
                        }
                    }))
                }
            };
        }
    }

    /// The held outer frames, entered through `top`
    fn next_segment(&mut self, top: Frame) -> Stack {
        let mut stack = Stack::new();
        stack.push_inner(top);
        stack.append_outer(mem::take(&mut self.pending));
        stack
    }

    /// Install `stack` and re-enter its outermost frame
    fn restore(&mut self, mut stack: Stack) -> Result<Value, Unwind> {
        if stack.is_empty() {
            return Err(RuntimeError::EmptyStack.into());
        }
        if let Some(size) = self.opts.stack_size {
            // the top frame plus at most `restore_frames` calls per segment
            let keep = self.opts.restore_frames as usize + 1;
            if stack.len() > keep {
                let mut outer = stack.split_outer(keep);
                outer.append_outer(mem::take(&mut self.pending));
                self.pending = outer;
            }
            // re-entered frames do not count against the budget
            self.remaining_stack = Some(i64::from(size) + stack.len() as i64);
        }

        self.stats.restores += 1;
        trace!(frames = stack.len(), pending = self.pending.len(), "restoring");
        self.stack = stack;
        self.eager_stack.clear();
        self.mode = Mode::Restoring;
        self.reenter_next()
    }

    /// Invoke the outermost frame's resume action
    pub(crate) fn reenter_next(&mut self) -> Result<Value, Unwind> {
        match self.stack.outermost() {
            None => Err(RuntimeError::EmptyStack.into()),
            Some(Frame::Top { continuation }) => {
                let continuation = continuation.clone();
                self.stack.clear();
                self.mode = Mode::Normal;
                continuation(self)
            }
            Some(Frame::Call { resume, .. }) => {
                let resume = resume.clone();
                resume(self)
            }
        }
    }

    /* ===================== Capture ===================== */

    /// Start a capture the way the current strategy does it
    pub(crate) fn raise_capture(&mut self, handler: Handler) -> Result<Value, Unwind> {
        match self.strategy {
            CaptureStrategy::Eager => {
                self.capturing = true;
                Err(Unwind::Signal(Signal::Capture {
                    handler,
                    stack: self.eager_stack.clone(),
                }))
            }
            CaptureStrategy::Lazy => {
                self.capturing = true;
                Err(Unwind::Signal(Signal::Capture {
                    handler,
                    stack: Stack::new(),
                }))
            }
            CaptureStrategy::Retval => {
                self.capturing = true;
                self.pending_handler = Some(handler);
                self.stack.clear();
                Ok(Value::Undefined)
            }
            CaptureStrategy::Fudge => match handler {
                Handler::Guest(handler) => {
                    self.call_value(handler, Value::Undefined, vec![Value::Fudged])
                }
                Handler::Reenter(_) | Handler::Yield => Ok(Value::Undefined),
            },
        }
    }

    /// A safe point: yield to the host once the countdown runs out
    pub(crate) fn safe_point(&mut self) -> Result<Value, Unwind> {
        let Some(interval) = self.yield_interval else {
            return Ok(Value::Undefined);
        };
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return Ok(Value::Undefined);
        }
        self.countdown = interval;
        self.raise_capture(Handler::Yield)
    }

    /// Entry side of the depth budget; `Some` when the call must be cut off
    pub(crate) fn stack_dec(
        &mut self,
        reenter: impl FnOnce() -> Thunk,
    ) -> Option<Result<Value, Unwind>> {
        let remaining = self.remaining_stack.as_mut()?;
        *remaining -= 1;
        if *remaining > 0 || self.mode != Mode::Normal || self.strategy == CaptureStrategy::Fudge {
            return None;
        }
        debug!(strategy = %self.strategy, "stack budget exhausted");
        Some(self.raise_capture(Handler::Reenter(reenter())))
    }

    pub(crate) fn stack_inc(&mut self) {
        if let Some(remaining) = self.remaining_stack.as_mut() {
            *remaining += 1;
        }
    }
}
