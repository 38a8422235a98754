//! Native globals
//!
//! | name                  | behavior                                                  |
//! |-----------------------|-----------------------------------------------------------|
//! | `print(..)`           | append the arguments, space separated, to the output      |
//! | `captureCC(f)`        | capture the current continuation and call `f` with it     |
//! | `callCC(f)`           | alias of `captureCC`                                      |
//! | `abortCC(v)`          | discard the current continuation; run `v` (or return it)  |
//! | `Object`, `Array`, `Error` | constructors, also usable on the right of `instanceof` |

use std::collections::BTreeMap;

use super::driver::Machine;
use super::errors::{self, ErrorInfo, TYPE_ERROR};
use super::frame::{Handler, Signal, Unwind};
use super::values::{Env, Scope, Value};

type NativeResult = Result<Value, Unwind>;

pub fn install(globals: &Env) {
    let natives = [
        ("print", Value::native("print", print)),
        ("captureCC", Value::native("captureCC", capture_cc)),
        ("callCC", Value::native("callCC", capture_cc)),
        ("abortCC", Value::native("abortCC", abort_cc)),
        ("Object", Value::constructor("Object", object)),
        ("Array", Value::constructor("Array", array)),
        ("Error", Value::constructor("Error", error)),
    ];
    for (name, value) in natives {
        Scope::declare(globals, name, value);
    }
}

fn print(m: &mut Machine, _this: Value, args: Vec<Value>) -> NativeResult {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    m.print(line);
    Ok(Value::Undefined)
}

fn capture_cc(m: &mut Machine, _this: Value, args: Vec<Value>) -> NativeResult {
    let handler = args.into_iter().next().unwrap_or(Value::Undefined);
    if !handler.is_callable() {
        return Err(errors::throw(
            TYPE_ERROR,
            format!("captureCC expects a function, got {}", handler),
        ));
    }
    m.raise_capture(Handler::Guest(handler))
}

fn abort_cc(_m: &mut Machine, _this: Value, args: Vec<Value>) -> NativeResult {
    let replacement = args.into_iter().next().unwrap_or(Value::Undefined);
    Err(Signal::Discard { replacement }.into())
}

fn object(_m: &mut Machine, _this: Value, _args: Vec<Value>) -> NativeResult {
    Ok(Value::object(BTreeMap::new()))
}

fn array(_m: &mut Machine, _this: Value, args: Vec<Value>) -> NativeResult {
    Ok(Value::array(args))
}

fn error(_m: &mut Machine, _this: Value, args: Vec<Value>) -> NativeResult {
    let message = args.first().map(Value::to_string).unwrap_or_default();
    Ok(Value::Error(ErrorInfo::new(errors::ERROR, message)))
}

/* ===================== Array Methods ===================== */

pub(crate) fn array_push(_m: &mut Machine, this: Value, args: Vec<Value>) -> NativeResult {
    let Value::Array(items) = this else {
        return Err(errors::throw(TYPE_ERROR, "push called on a non-array"));
    };
    let mut items = items.borrow_mut();
    items.extend(args);
    Ok(Value::Num(items.len() as f64))
}

pub(crate) fn array_pop(_m: &mut Machine, this: Value, _args: Vec<Value>) -> NativeResult {
    let Value::Array(items) = this else {
        return Err(errors::throw(TYPE_ERROR, "pop called on a non-array"));
    };
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or(Value::Undefined))
}
