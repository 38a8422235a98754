//! Runtime value types

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::driver::Machine;
use super::errors::ErrorInfo;
use super::frame::{Stack, Unwind};
use crate::ast::Function;

pub type ObjRef = Rc<RefCell<Object>>;
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type Env = Rc<RefCell<Scope>>;
pub type NativeFn = fn(&mut Machine, Value, Vec<Value>) -> Result<Value, Unwind>;

/* ===================== Values ===================== */

/// Runtime value type
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(ArrayRef),
    Object(ObjRef),
    Closure(Rc<Closure>),
    Native(Rc<Native>),
    /// A minted continuation; calling it replays a private copy of the stack
    Continuation(Rc<Stack>),
    /// What handlers receive instead of a continuation under fudge
    Fudged,
    /// Error value with code and message
    Error(ErrorInfo),
}

#[derive(Debug, Default)]
pub struct Object {
    pub props: BTreeMap<String, Value>,
    pub proto: Option<ObjRef>,
}

impl Object {
    pub fn with_proto(proto: ObjRef) -> ObjRef {
        Rc::new(RefCell::new(Object {
            props: BTreeMap::new(),
            proto: Some(proto),
        }))
    }

    /// Own property, then the prototype chain
    pub fn get(obj: &ObjRef, name: &str) -> Option<Value> {
        let mut current = obj.clone();
        loop {
            if let Some(v) = current.borrow().props.get(name) {
                return Some(v.clone());
            }
            let proto = current.borrow().proto.clone();
            current = proto?;
        }
    }
}

/// A guest function value
pub struct Closure {
    pub func: Rc<Function>,
    pub env: Env,
    /// Prototype given to objects this closure constructs
    pub prototype: ObjRef,
}

impl Closure {
    pub fn new(func: Rc<Function>, env: Env) -> Self {
        Self {
            func,
            env,
            prototype: Rc::new(RefCell::new(Object::default())),
        }
    }

    pub fn name(&self) -> &str {
        self.func.display_name()
    }
}

/// A built-in implemented in Rust; never instrumented
pub struct Native {
    pub name: &'static str,
    pub func: NativeFn,
    /// Usable with `new` (runs natively, no frame is recorded)
    pub constructor: bool,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn object(props: BTreeMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object { props, proto: None })))
    }

    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Value::Native(Rc::new(Native {
            name,
            func,
            constructor: false,
        }))
    }

    pub fn constructor(name: &'static str, func: NativeFn) -> Self {
        Value::Native(Rc::new(Native {
            name,
            func,
            constructor: true,
        }))
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Native(_) | Value::Continuation(_) | Value::Fudged
        )
    }

    /// Reference values a constructor may return in place of `this`
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Array(_) | Value::Object(_) | Value::Closure(_) | Value::Native(_) | Value::Error(_)
        )
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Closure(_) | Value::Native(_) | Value::Continuation(_) | Value::Fudged => {
                "function"
            }
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Error(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::Str(s) if s.trim().is_empty() => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    pub fn as_continuation(&self) -> Option<&Rc<Stack>> {
        match self {
            Value::Continuation(stack) => Some(stack),
            _ => None,
        }
    }

    /// Plain-data view of the value, for printing results and comparing in tests
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Value::Num(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.borrow().iter().map(Value::to_json).collect()),
            Value::Object(obj) => Json::Object(
                obj.borrow()
                    .props
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Error(info) => serde_json::json!({ "code": info.code, "message": info.message }),
            other => Json::String(other.to_string()),
        }
    }
}

/// Strict equality: primitives by value, everything else by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Fudged, Value::Fudged) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Continuation(a), Value::Continuation(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => format_number(*n, f),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{:?}", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("]")
            }
            Value::Object(obj) => {
                f.write_str("{")?;
                for (i, (k, v)) in obj.borrow().props.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Closure(c) => write!(f, "[function {}]", c.name()),
            Value::Native(n) => write!(f, "[native {}]", n.name),
            Value::Continuation(_) => f.write_str("[continuation]"),
            Value::Fudged => f.write_str("[fudged continuation]"),
            Value::Error(info) => write!(f, "{}", info),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/* ===================== Scopes ===================== */

/// One function activation's bindings (or the globals)
#[derive(Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn declare(env: &Env, name: &str, value: Value) {
        env.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Binding in this scope only
    pub fn local(env: &Env, name: &str) -> Option<Value> {
        env.borrow().vars.get(name).cloned()
    }

    pub fn has_local(env: &Env, name: &str) -> bool {
        env.borrow().vars.contains_key(name)
    }

    pub fn lookup(env: &Env, name: &str) -> Option<Value> {
        let mut current = env.clone();
        loop {
            if let Some(v) = current.borrow().vars.get(name) {
                return Some(v.clone());
            }
            let parent = current.borrow().parent.clone();
            current = parent?;
        }
    }

    /// Update the nearest binding; hands the value back when there is none
    pub fn assign(env: &Env, name: &str, value: Value) -> Result<(), Value> {
        let mut current = env.clone();
        loop {
            if let Some(slot) = current.borrow_mut().vars.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return Err(value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Num(2.0).to_string(), "2");
        assert_eq!(Value::Num(0.5).to_string(), "0.5");
        assert_eq!(Value::Num(f64::NAN).to_string(), "NaN");
        assert_eq!(
            Value::array(vec![Value::Num(2.0), Value::Num(11.0), Value::str("a")]).to_string(),
            "[2, 11, \"a\"]"
        );
        assert_eq!(
            Value::Error(ErrorInfo::new("TypeError", "x is not a function")).to_string(),
            "TypeError: x is not a function"
        );
    }

    #[test]
    fn test_strict_equality() {
        let xs = Value::array(vec![]);
        assert_eq!(xs, xs.clone());
        assert_ne!(xs, Value::array(vec![]));
        assert_eq!(Value::str("a"), Value::str("a"));
        assert_ne!(Value::Num(1.0), Value::str("1"));
        assert_ne!(Value::Num(f64::NAN), Value::Num(f64::NAN));
    }

    #[test]
    fn test_truthiness_and_typeof() {
        assert!(!Value::Num(0.0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert_eq!(Value::Fudged.type_of(), "function");
        assert_eq!(Value::Null.type_of(), "object");
    }

    #[test]
    fn test_scope_chain() {
        let globals = Scope::root();
        Scope::declare(&globals, "g", Value::Num(1.0));
        let inner = Scope::child(&globals);
        Scope::declare(&inner, "x", Value::Num(2.0));

        assert_eq!(Scope::lookup(&inner, "g"), Some(Value::Num(1.0)));
        assert_eq!(Scope::local(&inner, "g"), None);
        assert!(Scope::assign(&inner, "g", Value::Num(3.0)).is_ok());
        assert_eq!(Scope::local(&globals, "g"), Some(Value::Num(3.0)));
        assert_eq!(
            Scope::assign(&inner, "missing", Value::Null),
            Err(Value::Null)
        );
    }

    #[test]
    fn test_prototype_lookup() {
        let proto = Rc::new(RefCell::new(Object::default()));
        proto
            .borrow_mut()
            .props
            .insert("m".into(), Value::Num(7.0));
        let obj = Object::with_proto(proto);
        assert_eq!(Object::get(&obj, "m"), Some(Value::Num(7.0)));
        assert_eq!(Object::get(&obj, "n"), None);
    }
}
