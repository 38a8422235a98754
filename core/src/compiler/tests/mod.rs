//! Tests for the instrumentation pipeline
//!
//! Organized by pass

mod helpers;
mod label_tests;
