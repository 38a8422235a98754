//! Terse constructors for guest ASTs
//!
//! Programs normally arrive as JSON; these helpers are for building them in
//! Rust (tests, embedders, the safe-point pass).

use std::rc::Rc;

use crate::ast::{BinOp, CatchClause, Expr, Function, LValue, Program, Stmt, UnOp};

pub fn program(body: Vec<Stmt>) -> Program {
    Program::new(body)
}

// ----- expressions -----

pub fn num(v: f64) -> Expr {
    Expr::Num { v }
}

pub fn string(v: &str) -> Expr {
    Expr::Str { v: v.to_string() }
}

pub fn boolean(v: bool) -> Expr {
    Expr::Bool { v }
}

pub fn null() -> Expr {
    Expr::Null
}

pub fn id(name: &str) -> Expr {
    Expr::ident(name)
}

pub fn bin(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::binary(op, left, right)
}

pub fn add(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Add, left, right)
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Sub, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Mul, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Lt, left, right)
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Eq, left, right)
}

pub fn typeof_(arg: Expr) -> Expr {
    Expr::Unary {
        op: UnOp::TypeOf,
        arg: Box::new(arg),
    }
}

pub fn member(object: Expr, property: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn index(object: Expr, index: Expr) -> Expr {
    Expr::Index {
        object: Box::new(object),
        index: Box::new(index),
    }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

/// `object.method(args)`
pub fn method(object: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call(member(object, name), args)
}

pub fn new(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::New {
        callee: Box::new(callee),
        args,
    }
}

pub fn lambda(params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Function {
        func: Rc::new(function(None, params, body)),
    }
}

pub fn array(elements: Vec<Expr>) -> Expr {
    Expr::Array { elements }
}

pub fn object(props: Vec<(&str, Expr)>) -> Expr {
    Expr::Object {
        props: props.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
}

pub fn this() -> Expr {
    Expr::This
}

// ----- statements -----

pub fn let_(name: &str, init: Expr) -> Stmt {
    Stmt::Let {
        name: name.to_string(),
        init: Some(init),
    }
}

pub fn assign(name: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: LValue::Ident {
            name: name.to_string(),
        },
        value,
    }
}

/// `object.property = value`
pub fn set(object: Expr, property: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: LValue::Member {
            object,
            property: property.to_string(),
        },
        value,
    }
}

/// `object[index] = value`
pub fn set_at(object: Expr, index: Expr, value: Expr) -> Stmt {
    Stmt::Assign {
        target: LValue::Index { object, index },
        value,
    }
}

pub fn expr(expr: Expr) -> Stmt {
    Stmt::Expr { expr }
}

pub fn if_(test: Expr, then_s: Vec<Stmt>) -> Stmt {
    Stmt::guarded(test, Stmt::block(then_s))
}

pub fn if_else(test: Expr, then_s: Vec<Stmt>, else_s: Vec<Stmt>) -> Stmt {
    Stmt::If {
        test,
        then_s: Box::new(Stmt::block(then_s)),
        else_s: Some(Box::new(Stmt::block(else_s))),
    }
}

/// The canonical loop shape: `label: while (test) { body }`
pub fn loop_(label: &str, test: Expr, body: Vec<Stmt>) -> Stmt {
    labeled(
        label,
        Stmt::While {
            test,
            body: Box::new(Stmt::block(body)),
        },
    )
}

pub fn labeled(label: &str, body: Stmt) -> Stmt {
    Stmt::Labeled {
        label: label.to_string(),
        body: Box::new(body),
    }
}

pub fn break_(label: &str) -> Stmt {
    Stmt::Break {
        label: Some(label.to_string()),
    }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return { value: Some(value) }
}

pub fn throw(value: Expr) -> Stmt {
    Stmt::Throw { value }
}

pub fn try_catch(body: Vec<Stmt>, param: &str, handler: Vec<Stmt>) -> Stmt {
    Stmt::Try {
        body: Box::new(Stmt::block(body)),
        catch: Some(CatchClause {
            param: param.to_string(),
            body: Box::new(Stmt::block(handler)),
        }),
        finally: None,
    }
}

pub fn try_finally(body: Vec<Stmt>, finally: Vec<Stmt>) -> Stmt {
    Stmt::Try {
        body: Box::new(Stmt::block(body)),
        catch: None,
        finally: Some(Box::new(Stmt::block(finally))),
    }
}

pub fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>) -> Function {
    Function {
        name: name.map(str::to_string),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        frame: None,
    }
}

/// `function name(params) { body }`
pub fn fun(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::FunctionDecl {
        func: Rc::new(function(Some(name), params, body)),
    }
}
