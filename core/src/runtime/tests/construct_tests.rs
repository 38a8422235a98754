//! Object construction across captures

use serde_json::json;

use super::helpers::{raw_json, run_compiled, REAL};
use super::programs::{constructor_results, point};
use crate::config::{CompilerOpts, NewMethod, RuntimeOpts};

fn construction(method: NewMethod) -> impl Iterator<Item = CompilerOpts> {
    REAL.into_iter()
        .map(move |strategy| CompilerOpts::builder().transform(strategy).new_method(method).build())
}

#[test]
fn test_constructor_resumes_same_object() {
    let expected = json!(["first", true, true, 1, "second", true, true, 1]);

    for method in [NewMethod::Wrapper, NewMethod::Direct] {
        for opts in construction(method) {
            let (result, _) = run_compiled(&point(), &opts, RuntimeOpts::default());
            assert_eq!(result.unwrap().to_json(), expected, "{:?}", opts);
        }
    }
}

#[test]
fn test_constructor_return_values() {
    let expected = raw_json(&constructor_results());
    assert_eq!(expected, json!([7, 1]));

    for method in [NewMethod::Wrapper, NewMethod::Direct] {
        for opts in construction(method) {
            let (result, _) = run_compiled(&constructor_results(), &opts, RuntimeOpts::default());
            assert_eq!(result.unwrap().to_json(), expected, "{:?}", opts);
        }
    }
}

#[test]
fn test_constructor_cut_off_by_depth_budget() {
    // the budget runs out right at the constructor's entry
    let runtime = RuntimeOpts::default().with_stack_size(2);
    for method in [NewMethod::Wrapper, NewMethod::Direct] {
        for opts in construction(method) {
            let (result, machine) = run_compiled(&constructor_results(), &opts, runtime.clone());
            assert_eq!(result.unwrap().to_json(), json!([7, 1]), "{:?}", opts);
            assert!(machine.stats().captures >= 1, "{:?}", opts);
        }
    }
}
