//! Tests for the runtime driver
//!
//! Most tests compile a guest program under every strategy and compare it
//! against an uninstrumented run.

mod helpers;
mod programs;

mod args_tests;
mod construct_tests;
mod fault_tests;
mod yield_tests;
