//! Boxing of closure-shared locals
//!
//! A restored activation gets a fresh scope, while closures made before the
//! capture still hold the old one. A local that a nested function reads or
//! writes, and that changes after it is bound, is therefore moved into a
//! one-property object `{box: v}`; frames save the object, so both scopes
//! see the same cell.
//!
//! Top-level bindings are globals and are left alone.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::fold::{self, Fold};
use crate::ast::{Expr, Function, LValue, Program, Stmt};

/// Property holding a boxed value
pub const BOX: &str = "box";

pub fn insert(program: &Program) -> Program {
    Program {
        body: BoxFunctions.fold_body(&program.body),
        instrumented: program.instrumented.clone(),
    }
}

/// Locals of `func` that have to live in a box
pub fn boxed_locals(func: &Function) -> BTreeSet<String> {
    let uses = Uses::of(func);
    let mutated: BTreeSet<&String> = uses.writes.iter().chain(&uses.nested.writes).collect();

    uses.candidates()
        .filter(|name| uses.nested.reads.contains(*name) || uses.nested.writes.contains(*name))
        .filter(|name| mutated.contains(name))
        .cloned()
        .collect()
}

/* ===================== Analysis ===================== */

/// Names a function refers to without binding them
#[derive(Debug, Default)]
struct Free {
    reads: BTreeSet<String>,
    writes: BTreeSet<String>,
}

/// One function's own bindings and uses; nested functions only contribute
/// their free names
#[derive(Debug, Default)]
struct Uses {
    params: Vec<String>,
    lets: BTreeSet<String>,
    /// Catch parameters and declared function names
    other_bindings: BTreeSet<String>,
    reads: BTreeSet<String>,
    writes: BTreeSet<String>,
    nested: Free,
    loop_depth: usize,
}

impl Uses {
    fn of(func: &Function) -> Self {
        let mut uses = Uses {
            params: func.params.clone(),
            ..Uses::default()
        };
        uses.fold_body(&func.body);
        uses
    }

    fn binds(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
            || self.lets.contains(name)
            || self.other_bindings.contains(name)
    }

    fn candidates(&self) -> impl Iterator<Item = &String> {
        self.params
            .iter()
            .chain(&self.lets)
            .filter(|name| !self.other_bindings.contains(*name))
    }

    fn free(self) -> Free {
        let reads = self.reads.iter().chain(&self.nested.reads);
        let writes = self.writes.iter().chain(&self.nested.writes);
        Free {
            reads: reads.filter(|n| !self.binds(n)).cloned().collect(),
            writes: writes.filter(|n| !self.binds(n)).cloned().collect(),
        }
    }
}

impl Fold for Uses {
    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        let free = Uses::of(func).free();
        self.nested.reads.extend(free.reads);
        self.nested.writes.extend(free.writes);
        func.clone()
    }

    fn fold_expr(&mut self, expr: &Expr) -> Expr {
        if let Expr::Ident { name } = expr {
            self.reads.insert(name.clone());
        }
        fold::fold_expr(self, expr)
    }

    fn fold_stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Let { name, .. } => {
                self.lets.insert(name.clone());
                // a loop rebinds it on every pass
                if self.loop_depth > 0 {
                    self.writes.insert(name.clone());
                }
            }
            Stmt::Assign {
                target: LValue::Ident { name },
                ..
            } => {
                self.writes.insert(name.clone());
            }
            Stmt::Try {
                catch: Some(clause), ..
            } => {
                self.other_bindings.insert(clause.param.clone());
            }
            Stmt::FunctionDecl { func } => {
                if let Some(name) = &func.name {
                    self.other_bindings.insert(name.clone());
                }
            }
            Stmt::While { .. } => {
                self.loop_depth += 1;
                let out = fold::fold_stmt(self, stmt);
                self.loop_depth -= 1;
                return out;
            }
            _ => {}
        }
        fold::fold_stmt(self, stmt)
    }
}

/* ===================== Rewrite ===================== */

/// Boxes every function's own shared locals, innermost first
struct BoxFunctions;

impl Fold for BoxFunctions {
    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        let inner = Function {
            body: self.fold_body(&func.body),
            ..func.as_ref().clone()
        };

        let boxed = boxed_locals(&inner);
        if boxed.is_empty() {
            return Rc::new(inner);
        }

        // a boxed parameter keeps its raw value; the box lives in its own local
        let cells: BTreeMap<String, String> = boxed
            .iter()
            .map(|name| {
                let cell = if inner.params.contains(name) {
                    format!("$box_{}", name)
                } else {
                    name.clone()
                };
                (name.clone(), cell)
            })
            .collect();

        let mut body: Vec<Stmt> = inner
            .params
            .iter()
            .filter_map(|p| {
                cells.get(p).map(|cell| Stmt::Let {
                    name: cell.clone(),
                    init: Some(new_box(Expr::ident(p.clone()))),
                })
            })
            .collect();
        body.extend(Boxer { cells }.fold_body(&inner.body));

        Rc::new(Function { body, ..inner })
    }
}

fn new_box(value: Expr) -> Expr {
    Expr::Object {
        props: vec![(BOX.to_string(), value)],
    }
}

fn unbox(cell: &str) -> Expr {
    Expr::Index {
        object: Box::new(Expr::ident(cell)),
        index: Box::new(Expr::Str { v: BOX.to_string() }),
    }
}

/// Routes every use of a boxed local through its cell
struct Boxer {
    /// Boxed name to the local holding its box
    cells: BTreeMap<String, String>,
}

impl Fold for Boxer {
    fn fold_function(&mut self, func: &Rc<Function>) -> Rc<Function> {
        let uses = Uses::of(func);
        let cells: BTreeMap<String, String> = self
            .cells
            .iter()
            .filter(|(name, _)| !uses.binds(name))
            .map(|(name, cell)| (name.clone(), cell.clone()))
            .collect();
        if cells.is_empty() {
            return func.clone();
        }

        let body = Boxer { cells }.fold_body(&func.body);
        Rc::new(Function {
            body,
            ..func.as_ref().clone()
        })
    }

    fn fold_expr(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Ident { name } => match self.cells.get(name) {
                Some(cell) => unbox(cell),
                None => expr.clone(),
            },
            other => fold::fold_expr(self, other),
        }
    }

    fn fold_stmt(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::Let { name, init } if self.cells.contains_key(name) => {
                let init = init.as_ref().map(|e| self.fold_expr(e));
                match init {
                    // the call stays the whole right-hand side so it keeps its label
                    Some(call) if call.is_application() => Stmt::block(vec![
                        Stmt::Let {
                            name: name.clone(),
                            init: Some(call),
                        },
                        Stmt::Assign {
                            target: LValue::Ident { name: name.clone() },
                            value: new_box(Expr::ident(name.clone())),
                        },
                    ]),
                    init => Stmt::Let {
                        name: name.clone(),
                        init: Some(new_box(init.unwrap_or(Expr::Undefined))),
                    },
                }
            }
            Stmt::Assign {
                target: LValue::Ident { name },
                value,
            } => match self.cells.get(name) {
                Some(cell) => Stmt::Assign {
                    target: LValue::Index {
                        object: Expr::ident(cell.clone()),
                        index: Expr::Str { v: BOX.to_string() },
                    },
                    value: self.fold_expr(value),
                },
                None => fold::fold_stmt(self, stmt),
            },
            other => fold::fold_stmt(self, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::*;

    fn counter() -> Function {
        function(
            Some("f"),
            &["step"],
            vec![
                let_("n", num(0.0)),
                let_("fixed", num(1.0)),
                let_(
                    "inc",
                    lambda(
                        &[],
                        vec![assign("n", add(id("n"), id("step"))), ret(id("fixed"))],
                    ),
                ),
                let_("k", call(id("g"), vec![])),
                ret(id("n")),
            ],
        )
    }

    fn only_function(program: &Program) -> &Function {
        let Stmt::FunctionDecl { func } = &program.body[0] else {
            unreachable!("Expected function, got {:?}", program.body[0]);
        };
        func
    }

    #[test]
    fn test_only_shared_mutated_locals_are_boxed() {
        let boxed = boxed_locals(&counter());
        assert_eq!(boxed.into_iter().collect::<Vec<_>>(), vec!["n".to_string()]);

        // `step` is read by the closure but never reassigned
        let mut with_write = counter();
        with_write.body.insert(0, assign("step", num(2.0)));
        let boxed = boxed_locals(&with_write);
        assert!(boxed.contains("step"));
        assert!(!boxed.contains("fixed"));
    }

    #[test]
    fn test_uses_go_through_the_cell() {
        let source = program(vec![Stmt::FunctionDecl {
            func: Rc::new(counter()),
        }]);
        let out = insert(&source);
        let func = only_function(&out);

        assert_eq!(func.body[0], let_("n", object(vec![(BOX, num(0.0))])));
        assert_eq!(func.body[1], let_("fixed", num(1.0)));
        assert_eq!(func.body[4], ret(index(id("n"), string(BOX))));

        let Stmt::Let {
            init: Some(Expr::Function { func: inc }),
            ..
        } = &func.body[2]
        else {
            unreachable!("Expected closure, got {:?}", func.body[2]);
        };
        assert_eq!(
            inc.body[0],
            set_at(id("n"), string(BOX), add(index(id("n"), string(BOX)), id("step")))
        );
    }

    #[test]
    fn test_call_initializer_keeps_its_statement() {
        let source = program(vec![fun(
            "f",
            &[],
            vec![
                let_("n", call(id("g"), vec![])),
                let_("bump", lambda(&[], vec![assign("n", num(5.0))])),
                ret(id("n")),
            ],
        )]);
        let out = insert(&source);
        let func = only_function(&out);

        let Stmt::Block { body } = &func.body[0] else {
            unreachable!("Expected block, got {:?}", func.body[0]);
        };
        assert_eq!(body[0], let_("n", call(id("g"), vec![])));
        assert_eq!(body[1], assign("n", object(vec![(BOX, id("n"))])));
    }

    #[test]
    fn test_boxed_parameter_gets_its_own_cell() {
        let source = program(vec![fun(
            "f",
            &["p"],
            vec![
                let_("set", lambda(&[], vec![assign("p", num(3.0))])),
                ret(id("p")),
            ],
        )]);
        let out = insert(&source);
        let func = only_function(&out);

        assert_eq!(func.params, vec!["p".to_string()]);
        assert_eq!(func.body[0], let_("$box_p", object(vec![(BOX, id("p"))])));
        assert_eq!(func.body[2], ret(index(id("$box_p"), string(BOX))));
    }

    #[test]
    fn test_shadowing_closure_is_untouched() {
        let source = program(vec![fun(
            "f",
            &[],
            vec![
                let_("n", num(0.0)),
                let_("a", lambda(&[], vec![assign("n", num(1.0))])),
                let_("b", lambda(&["n"], vec![ret(id("n"))])),
                ret(id("n")),
            ],
        )]);
        let out = insert(&source);
        let func = only_function(&out);

        assert_eq!(func.body[2], let_("b", lambda(&["n"], vec![ret(id("n"))])));
    }

    #[test]
    fn test_top_level_is_left_alone() {
        let source = program(vec![
            let_("n", num(0.0)),
            let_("inc", lambda(&[], vec![assign("n", add(id("n"), num(1.0)))])),
            ret(id("n")),
        ]);
        assert_eq!(insert(&source), source);
    }
}
