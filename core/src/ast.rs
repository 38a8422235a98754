//! Guest program AST
//!
//! Programs arrive as JSON already in normal form: loops are labeled `while`
//! statements and every operand is atomic. The instrumentation pass rewrites
//! the same tree, adding the nodes under the "Instrumentation" headings below;
//! those nodes are rejected in input by the normal-form validator.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::config::{ArgsFidelity, CaptureStrategy, NewMethod};

/* ===================== Program ===================== */

/// A whole guest program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,

    /// Present once the program went through the instrumentation pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrumented: Option<Instrumentation>,
}

/// What a compiled program was compiled for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrumentation {
    pub strategy: CaptureStrategy,
    pub new_method: NewMethod,
    pub js_args: ArgsFidelity,
    /// Safe points between yields to the host, when safe points were inserted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_interval: Option<u32>,
    /// Layout of the top-level frame (its bindings are globals, so it saves none)
    pub frame: FrameLayout,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self {
            body,
            instrumented: None,
        }
    }
}

/* ===================== Functions ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Vec<String>,
    pub body: Vec<Stmt>,

    /// Present once the function is self-resumable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameLayout>,
}

impl Function {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Everything the runtime needs to save and rebuild one activation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameLayout {
    /// Locals in the positional order frames store them
    pub locals: Vec<String>,
    pub reentry: Reentry,
    /// Save formals and the argument count alongside locals
    #[serde(default)]
    pub save_formals: bool,
}

/// How a paused activation is called back into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Reentry {
    /// Re-invoke with the current parameter values
    #[default]
    Params,
    /// Re-invoke with the materialized argument list
    Arguments { sync_formals: bool },
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Block {
        body: Vec<Stmt>,
    },
    Let {
        name: String,
        #[serde(default)]
        init: Option<Expr>,
    },
    Assign {
        target: LValue,
        value: Expr,
    },
    Expr {
        expr: Expr,
    },
    If {
        test: Expr,
        then_s: Box<Stmt>,
        #[serde(default)]
        else_s: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Break {
        #[serde(default)]
        label: Option<String>,
    },
    Continue {
        #[serde(default)]
        label: Option<String>,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    Throw {
        value: Expr,
    },
    Try {
        body: Box<Stmt>,
        #[serde(default)]
        catch: Option<CatchClause>,
        #[serde(default)]
        finally: Option<Box<Stmt>>,
    },
    FunctionDecl {
        func: Rc<Function>,
    },

    // ----- Instrumentation -----
    /// Restore prologue: when restoring, pop the outermost frame into this activation
    RestoreFrame,
    /// Entry side of the remaining-depth counter
    StackDec,
    /// Exit side of the remaining-depth counter
    StackInc,
    /// Lazy: append this activation's frame to a Capture passing through `body`
    RecordOnCapture {
        label: u32,
        body: Box<Stmt>,
    },
    /// Eager: keep this activation's frame on the shadow stack while `body` runs
    ShadowFrame {
        label: u32,
        body: Box<Stmt>,
    },
    /// Retval: while a capture is collecting frames, save this one and return
    ReturnIfCapturing {
        label: u32,
    },
    /// Catch guard: protocol signals bound to `name` are rethrown untouched
    RethrowSignal {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: String,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum LValue {
    Ident { name: String },
    Member { object: Expr, property: String },
    Index { object: Expr, index: Expr },
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Not,
    Neg,
    TypeOf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Num {
        v: f64,
    },
    Str {
        v: String,
    },
    Bool {
        v: bool,
    },
    Null,
    Undefined,
    Ident {
        name: String,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        arg: Box<Expr>,
    },
    Cond {
        test: Box<Expr>,
        then_e: Box<Expr>,
        else_e: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Function {
        func: Rc<Function>,
    },
    Array {
        #[serde(default)]
        elements: Vec<Expr>,
    },
    Object {
        #[serde(default)]
        props: Vec<(String, Expr)>,
    },
    This,
    Arguments,

    // ----- Instrumentation -----
    IsNormal,
    IsRestoring,
    TargetIn {
        labels: Vec<u32>,
    },
    Capturing,
    /// Invoke the outermost frame's resume action
    ReenterNext,
    NewTarget,
    /// Safe point application
    Suspend,
    /// Construction routed through the driver
    HandleNew {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident { name: name.into() }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::binary(BinOp::And, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::binary(BinOp::Or, left, right)
    }

    pub fn not(arg: Expr) -> Self {
        Expr::Unary {
            op: UnOp::Not,
            arg: Box::new(arg),
        }
    }

    /// Expressions the interpreter can suspend inside of
    pub fn is_application(&self) -> bool {
        matches!(
            self,
            Expr::Call { .. } | Expr::New { .. } | Expr::HandleNew { .. } | Expr::Suspend
        )
    }

    /// Names, literals and values without effects
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Num { .. }
                | Expr::Str { .. }
                | Expr::Bool { .. }
                | Expr::Null
                | Expr::Undefined
                | Expr::Ident { .. }
                | Expr::This
                | Expr::Arguments
                | Expr::Function { .. }
        )
    }

    pub fn is_instrumentation(&self) -> bool {
        matches!(
            self,
            Expr::IsNormal
                | Expr::IsRestoring
                | Expr::TargetIn { .. }
                | Expr::Capturing
                | Expr::ReenterNext
                | Expr::NewTarget
                | Expr::Suspend
                | Expr::HandleNew { .. }
        )
    }
}

impl Stmt {
    pub fn block(body: Vec<Stmt>) -> Self {
        Stmt::Block { body }
    }

    pub fn guarded(test: Expr, then_s: Stmt) -> Self {
        Stmt::If {
            test,
            then_s: Box::new(then_s),
            else_s: None,
        }
    }

    /// The application a capture-point statement carries, if any
    pub fn application(&self) -> Option<&Expr> {
        match self {
            Stmt::Let { init: Some(e), .. } | Stmt::Assign { value: e, .. } | Stmt::Expr { expr: e }
                if e.is_application() =>
            {
                Some(e)
            }
            _ => None,
        }
    }

    pub fn is_instrumentation(&self) -> bool {
        matches!(
            self,
            Stmt::RestoreFrame
                | Stmt::StackDec
                | Stmt::StackInc
                | Stmt::RecordOnCapture { .. }
                | Stmt::ShadowFrame { .. }
                | Stmt::ReturnIfCapturing { .. }
                | Stmt::RethrowSignal { .. }
        )
    }
}
