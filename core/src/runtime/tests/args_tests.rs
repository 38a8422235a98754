//! How faithfully `arguments` survives a resume

use maplit::hashmap;
use serde_json::json;

use super::helpers::{raw_json, run_compiled, run_json, REAL};
use super::programs::arguments_snapshot;
use crate::config::{ArgsFidelity, CaptureStrategy, CompilerOpts, RuntimeOpts};

#[test]
fn test_argument_fidelity_levels() {
    let expected = hashmap! {
        "simple" => json!([1, 1, 1]),
        "faithful" => json!([5, 2, 5]),
        "full" => json!([5, 1, 5]),
    };

    for (fidelity, expected) in expected {
        let fidelity: ArgsFidelity = fidelity.parse().unwrap();
        for strategy in REAL {
            let opts = CompilerOpts::builder()
                .transform(strategy)
                .js_args(fidelity)
                .build();
            let (result, _) = run_compiled(&arguments_snapshot(), &opts, RuntimeOpts::default());
            assert_eq!(
                result.unwrap().to_json(),
                expected,
                "{:?} under {}",
                fidelity,
                strategy
            );
        }
    }
}

#[test]
fn test_full_fidelity_matches_uninstrumented_run() {
    let raw = raw_json(&arguments_snapshot());
    assert_eq!(raw, json!([5, 1, 5]));
    assert_eq!(run_json(CaptureStrategy::Fudge, &arguments_snapshot()), raw);
}
