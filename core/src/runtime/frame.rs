//! Frames, stacks and the signals that move them
//!
//! A [`Stack`] is the driver's logical call stack: a sequence of [`Frame`]s
//! ordered from the innermost paused call to the outermost one. Restoration
//! always consumes frames from the outer end, which is why both ends are
//! exposed.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::driver::Machine;
use super::values::Value;
use crate::error::RuntimeError;

/// A deferred action run against the machine
pub type Thunk = Rc<dyn Fn(&mut Machine) -> Result<Value, Unwind>>;

pub fn thunk<F>(f: F) -> Thunk
where
    F: Fn(&mut Machine) -> Result<Value, Unwind> + 'static,
{
    Rc::new(f)
}

/* ===================== Frames ===================== */

#[derive(Clone)]
pub enum Frame {
    /// The final action once every call frame has been re-entered
    Top { continuation: Thunk },
    /// One paused call site
    Call {
        /// Re-invokes the paused function (or construction)
        resume: Thunk,
        function: String,
        /// The function's locals in layout order
        locals: Vec<Value>,
        /// Where to jump back in
        label: u32,
        /// Present only when formals and arg count are saved
        formals: Option<Vec<Value>>,
        arg_count: Option<usize>,
    },
}

impl Frame {
    pub fn top(continuation: Thunk) -> Self {
        Frame::Top { continuation }
    }

    /// A top frame delivering `value` to the innermost call
    pub fn top_value(value: Value) -> Self {
        Frame::top(thunk(move |_| Ok(value.clone())))
    }

    /// A top frame raising `value` in the innermost call
    pub fn top_throw(value: Value) -> Self {
        Frame::top(thunk(move |_| Err(Unwind::Throw(value.clone()))))
    }

    pub fn label(&self) -> Option<u32> {
        match self {
            Frame::Top { .. } => None,
            Frame::Call { label, .. } => Some(*label),
        }
    }

    pub fn function(&self) -> Option<&str> {
        match self {
            Frame::Top { .. } => None,
            Frame::Call { function, .. } => Some(function),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Top { .. } => f.write_str("Top"),
            Frame::Call {
                function,
                locals,
                label,
                formals,
                arg_count,
                ..
            } => f
                .debug_struct("Call")
                .field("function", function)
                .field("label", label)
                .field("locals", locals)
                .field("formals", formals)
                .field("arg_count", arg_count)
                .finish(),
        }
    }
}

/* ===================== Stack ===================== */

/// Frames from innermost (front) to outermost (back)
#[derive(Clone, Default)]
pub struct Stack {
    frames: VecDeque<Frame>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_inner(&mut self, frame: Frame) {
        self.frames.push_front(frame);
    }

    pub fn pop_inner(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn push_outer(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    pub fn pop_outer(&mut self) -> Option<Frame> {
        self.frames.pop_back()
    }

    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn innermost_mut(&mut self) -> Option<&mut Frame> {
        self.frames.front_mut()
    }

    pub fn outermost(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Keep the innermost `keep` frames, returning the rest
    pub fn split_outer(&mut self, keep: usize) -> Stack {
        let keep = keep.min(self.frames.len());
        Stack {
            frames: self.frames.split_off(keep),
        }
    }

    /// Place `outer` beyond this stack's outermost frame
    pub fn append_outer(&mut self, mut outer: Stack) {
        self.frames.append(&mut outer.frames);
    }

    /// Innermost first
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.frames.iter()).finish()
    }
}

/* ===================== Signals ===================== */

/// What a capture hands the finished continuation to
#[derive(Clone)]
pub enum Handler {
    /// A guest function called with the continuation
    Guest(Value),
    /// Re-enter a call cut off by the depth budget
    Reenter(Thunk),
    /// Cooperative yield: resume later from the host loop
    Yield,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Guest(v) => write!(f, "Guest({})", v),
            Handler::Reenter(_) => f.write_str("Reenter"),
            Handler::Yield => f.write_str("Yield"),
        }
    }
}

/// Control-transfer signals; not errors, and never guest exceptions
#[derive(Debug, Clone)]
pub enum Signal {
    /// Pause here and hand the continuation to `handler`
    Capture { handler: Handler, stack: Stack },
    /// Abandon current execution and replay `stack`
    Restore { stack: Stack },
    /// Abandon the current continuation and run `replacement` instead
    Discard { replacement: Value },
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Capture { .. } => "capture",
            Signal::Restore { .. } => "restore",
            Signal::Discard { .. } => "discard",
        }
    }
}

/* ===================== Control Flow ===================== */

/// Abrupt exits travelling up the native call stack
#[derive(Debug, Clone)]
pub enum Unwind {
    /// A guest exception
    Throw(Value),
    Signal(Signal),
    /// Broken invariant; never catchable by guest code
    Fault(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Fault(err)
    }
}

impl From<Signal> for Unwind {
    fn from(signal: Signal) -> Self {
        Unwind::Signal(signal)
    }
}

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Break(Option<String>),
    Continue(Option<String>),
    Return(Value),
}
