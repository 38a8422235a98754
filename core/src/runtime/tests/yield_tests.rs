//! Cooperative yields to the host loop

use super::helpers::{compile, run_raw, REAL};
use super::programs::counter;
use crate::config::{CaptureStrategy, CompilerOpts, RuntimeOpts};
use crate::runtime::{host, Machine, Outcome, Value};

fn yielding(strategy: CaptureStrategy, interval: u32) -> CompilerOpts {
    CompilerOpts::builder()
        .transform(strategy)
        .yield_interval(interval)
        .build()
}

/// Host work that prints and re-queues itself `left - 1` more times
fn tick(machine: &mut Machine, left: u32) {
    machine.print("tick".to_string());
    if left > 1 {
        machine.defer(move |m| tick(m, left - 1));
    }
}

#[test]
fn test_yields_every_interval() {
    for strategy in REAL {
        let compiled = compile(&counter(20.0), &yielding(strategy, 5));
        let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());

        // a safe point at the top and one per iteration: 21 in all
        let result = host::run_program(&mut machine, &compiled).unwrap();
        assert_eq!(result, Value::Num(20.0));
        assert_eq!(machine.stats().yields, 4, "strategy {}", strategy);

        let stats = serde_json::to_value(machine.stats()).unwrap();
        assert_eq!(stats["yields"], 4);
    }
}

#[test]
fn test_first_slice_suspends() {
    let compiled = compile(&counter(20.0), &yielding(CaptureStrategy::Lazy, 5));
    let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());

    assert_eq!(machine.run(&compiled).unwrap(), Outcome::Suspended);
    assert_eq!(machine.output(), ["0", "1", "2"]);
    assert_eq!(machine.pending_tasks(), 1);
}

#[test]
fn test_host_work_interleaves() {
    let (raw, raw_machine) = run_raw(&counter(20.0));
    assert_eq!(raw.unwrap(), Value::Num(20.0));

    for strategy in REAL {
        let compiled = compile(&counter(20.0), &yielding(strategy, 5));
        let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());
        machine.defer(|m| tick(m, 3));

        host::run_program(&mut machine, &compiled).unwrap();

        let output = machine.output();
        assert_eq!(output.iter().position(|l| l == "tick"), Some(3));
        assert_eq!(output.iter().filter(|l| *l == "tick").count(), 3);

        let guest: Vec<_> = output.iter().filter(|l| *l != "tick").collect();
        let expected: Vec<_> = raw_machine.output().iter().collect();
        assert_eq!(guest, expected, "strategy {}", strategy);
    }
}

#[test]
fn test_async_host_loop() {
    let compiled = compile(&counter(12.0), &yielding(CaptureStrategy::Eager, 3));
    let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());

    let result = tokio_test::block_on(host::run_program_async(&mut machine, &compiled)).unwrap();
    assert_eq!(result, Value::Num(12.0));
    assert_eq!(machine.output().len(), 12);
    assert!(machine.stats().yields > 0);
}

#[test]
fn test_fudge_never_yields() {
    let compiled = compile(&counter(20.0), &yielding(CaptureStrategy::Fudge, 5));
    let mut machine = Machine::for_program(&compiled, RuntimeOpts::default());

    assert_eq!(
        machine.run(&compiled).unwrap(),
        Outcome::Done(Value::Num(20.0))
    );
    assert_eq!(machine.stats().yields, 0);
}
