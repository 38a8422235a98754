//! Guest programs shared by the runtime tests

use crate::ast::{BinOp, Expr, Program, Stmt};
use crate::build::*;

pub fn push(list: &str, value: Expr) -> Stmt {
    expr(method(id(list), "push", vec![value]))
}

pub fn print(value: Expr) -> Stmt {
    expr(call(id("print"), vec![value]))
}

pub fn capture_cc(handler: Expr) -> Expr {
    call(id("captureCC"), vec![handler])
}

fn incr(name: &str) -> Stmt {
    assign(name, add(id(name), num(1.0)))
}

/// `log`, `saved` and `count` globals most scenarios share
fn globals() -> Vec<Stmt> {
    vec![
        let_("log", array(vec![])),
        let_("saved", null()),
        let_("count", num(0.0)),
    ]
}

/// `f` returns 2 the first time; each replay of its continuation with
/// `10 * count` returns that plus one
pub fn replayed_call(shots: f64) -> Program {
    let mut body = globals();
    body.extend([
        fun(
            "f",
            &[],
            vec![
                let_("x", num(1.0)),
                let_("k", capture_cc(lambda(&["c"], vec![ret(id("c"))]))),
                let_("t", typeof_(id("k"))),
                let_("isK", eq(id("t"), string("function"))),
                if_(
                    id("isK"),
                    vec![assign("saved", id("k")), incr("x"), ret(id("x"))],
                ),
                assign("x", add(id("k"), num(1.0))),
                ret(id("x")),
            ],
        ),
        let_("r", call(id("f"), vec![])),
        push("log", id("r")),
        let_("more", lt(id("count"), num(shots))),
        if_(
            id("more"),
            vec![
                incr("count"),
                let_("v", mul(id("count"), num(10.0))),
                expr(call(id("saved"), vec![id("v")])),
            ],
        ),
        ret(id("log")),
    ]);
    program(body)
}

/// A capture two loops deep, followed by `break outer`
pub fn nested_loops() -> Program {
    let mut body = globals();
    body.extend([
        fun(
            "h",
            &["k"],
            vec![assign("saved", id("k")), ret(string("cap"))],
        ),
        fun(
            "f",
            &[],
            vec![
                let_("i", num(0.0)),
                loop_(
                    "outer",
                    lt(id("i"), num(3.0)),
                    vec![
                        let_("j", num(0.0)),
                        loop_(
                            "inner",
                            lt(id("j"), num(3.0)),
                            vec![
                                let_("p", mul(id("i"), num(10.0))),
                                let_("q", add(id("p"), id("j"))),
                                let_("hit", eq(id("q"), num(11.0))),
                                if_(
                                    id("hit"),
                                    vec![
                                        let_("v", capture_cc(id("h"))),
                                        push("log", id("v")),
                                        push("log", string("after")),
                                        break_("outer"),
                                    ],
                                ),
                                push("log", id("q")),
                                incr("j"),
                            ],
                        ),
                        incr("i"),
                    ],
                ),
                ret(id("i")),
            ],
        ),
        let_("r", call(id("f"), vec![])),
        push("log", id("r")),
        let_("first", eq(id("count"), num(0.0))),
        if_(
            id("first"),
            vec![
                assign("count", num(1.0)),
                expr(call(id("saved"), vec![string("again")])),
            ],
        ),
        ret(id("log")),
    ]);
    program(body)
}

/// A constructor that captures after initializing `x`
pub fn point() -> Program {
    let mut body = globals();
    body.extend([
        let_("seen", null()),
        fun(
            "Point",
            &["x"],
            vec![
                set(this(), "x", id("x")),
                assign("seen", this()),
                let_(
                    "k",
                    capture_cc(lambda(
                        &["c"],
                        vec![assign("saved", id("c")), ret(string("first"))],
                    )),
                ),
                set(this(), "tag", id("k")),
            ],
        ),
        let_("p", new(id("Point"), vec![num(1.0)])),
        let_("tag", member(id("p"), "tag")),
        push("log", id("tag")),
        let_("same", eq(id("p"), id("seen"))),
        push("log", id("same")),
        let_("isPoint", bin(BinOp::InstanceOf, id("p"), id("Point"))),
        push("log", id("isPoint")),
        let_("px", member(id("p"), "x")),
        push("log", id("px")),
        let_("first", eq(id("count"), num(0.0))),
        if_(
            id("first"),
            vec![
                assign("count", num(1.0)),
                expr(call(id("saved"), vec![string("second")])),
            ],
        ),
        ret(id("log")),
    ]);
    program(body)
}

/// Constructors returning an object and a primitive
pub fn constructor_results() -> Program {
    program(vec![
        fun("Boxed", &[], vec![ret(object(vec![("v", num(7.0))]))]),
        fun(
            "Plain",
            &[],
            vec![set(this(), "n", num(1.0)), ret(num(5.0))],
        ),
        let_("b", new(id("Boxed"), vec![])),
        let_("v", member(id("b"), "v")),
        let_("p", new(id("Plain"), vec![])),
        let_("n", member(id("p"), "n")),
        ret(array(vec![id("v"), id("n")])),
    ])
}

/// Non-tail recursion `n` calls deep
pub fn sum(n: f64) -> Program {
    program(vec![
        fun(
            "sum",
            &["n"],
            vec![
                let_("zero", eq(id("n"), num(0.0))),
                if_(id("zero"), vec![ret(num(0.0))]),
                let_("m", sub(id("n"), num(1.0))),
                let_("rest", call(id("sum"), vec![id("m")])),
                let_("total", add(id("n"), id("rest"))),
                ret(id("total")),
            ],
        ),
        let_("result", call(id("sum"), vec![num(n)])),
        ret(id("result")),
    ])
}

/// Prints `0..limit`, then returns `limit`
pub fn counter(limit: f64) -> Program {
    program(vec![
        let_("i", num(0.0)),
        loop_(
            "l",
            lt(id("i"), num(limit)),
            vec![print(id("i")), incr("i")],
        ),
        ret(id("i")),
    ])
}

/// `f(1)` reassigns a formal, captures, then reports `[arguments[0], arguments.length, a]`
pub fn arguments_snapshot() -> Program {
    program(vec![
        fun("h", &["c"], vec![ret(num(0.0))]),
        fun(
            "f",
            &["a", "b"],
            vec![
                assign("a", num(5.0)),
                let_("k", capture_cc(id("h"))),
                let_("n", member(Expr::Arguments, "length")),
                let_(
                    "first",
                    Expr::Index {
                        object: Box::new(Expr::Arguments),
                        index: Box::new(num(0.0)),
                    },
                ),
                ret(array(vec![id("first"), id("n"), id("a")])),
            ],
        ),
        let_("r", call(id("f"), vec![num(1.0)])),
        ret(id("r")),
    ])
}

/// No captures at all: recursion, loops, objects, closures, exceptions
pub fn plain_mix() -> Program {
    program(vec![
        fun(
            "fib",
            &["n"],
            vec![
                let_("small", lt(id("n"), num(2.0))),
                if_(id("small"), vec![ret(id("n"))]),
                let_("a", sub(id("n"), num(1.0))),
                let_("b", sub(id("n"), num(2.0))),
                let_("x", call(id("fib"), vec![id("a")])),
                let_("y", call(id("fib"), vec![id("b")])),
                let_("s", add(id("x"), id("y"))),
                ret(id("s")),
            ],
        ),
        fun(
            "make",
            &["n"],
            vec![
                let_("o", object(vec![("count", id("n"))])),
                ret(id("o")),
            ],
        ),
        let_("acc", array(vec![])),
        let_("i", num(0.0)),
        loop_(
            "l",
            lt(id("i"), num(8.0)),
            vec![
                let_("f", call(id("fib"), vec![id("i")])),
                push("acc", id("f")),
                incr("i"),
            ],
        ),
        let_("o", call(id("make"), vec![num(3.0)])),
        let_(
            "adder",
            lambda(
                &["x"],
                vec![let_("r", add(id("x"), num(1.0))), ret(id("r"))],
            ),
        ),
        let_("c", member(id("o"), "count")),
        let_("d", call(id("adder"), vec![id("c")])),
        print(id("d")),
        try_catch(vec![throw(string("e1"))], "e", vec![print(id("e"))]),
        let_("tail", call(id("adder"), vec![id("d")])),
        push("acc", id("tail")),
        ret(id("acc")),
    ])
}
