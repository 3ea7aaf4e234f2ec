//! Benchmark harness for the classification invocation client.
//!
//! A run drives one [`invoke_client::InvokeClient`] for N iterations either
//! sequentially or concurrently; a suite runs the four mode x input-form
//! combinations and reports one elapsed time per run.

pub mod error;
pub mod harness;
pub mod metrics;
pub mod report;
pub mod suite;
pub mod trace;

pub use error::{BenchError, Result};
pub use harness::{
    BenchmarkRun, CallOutcome, DispatchMode, FailurePolicy, RunCancel, RunOptions, Scenario, run,
};
pub use suite::{ScenarioReport, SuiteConfig, SuiteResult, run_suite};
