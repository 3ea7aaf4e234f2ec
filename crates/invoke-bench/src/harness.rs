//! Drives an [`InvokeClient`] for a fixed number of iterations under one
//! dispatch mode and reports how long the whole run took to settle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use invoke_client::{InputForm, InvocationInput, InvokeClient, InvokeError};
use invoke_config::FailurePolicyOption;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};

use crate::metrics::{CallRecord, RunSummary, aggregate};
use crate::{BenchError, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Iteration k+1 is dispatched only after iteration k settled.
    Sequential,
    /// Every iteration is dispatched up front, then all are joined.
    Concurrent,
}

impl DispatchMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "parallel",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Isolate,
    Abort,
}

impl From<FailurePolicyOption> for FailurePolicy {
    fn from(value: FailurePolicyOption) -> Self {
        match value {
            FailurePolicyOption::Isolate => Self::Isolate,
            FailurePolicyOption::Abort => Self::Abort,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    pub mode: DispatchMode,
    pub form: InputForm,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::new(DispatchMode::Sequential, InputForm::RemoteReference),
        Scenario::new(DispatchMode::Concurrent, InputForm::RemoteReference),
        Scenario::new(DispatchMode::Sequential, InputForm::InlinePayload),
        Scenario::new(DispatchMode::Concurrent, InputForm::InlinePayload),
    ];

    pub const fn new(mode: DispatchMode, form: InputForm) -> Self {
        Self { mode, form }
    }

    /// e.g. `10 parallel data uris`.
    pub fn description(&self, iterations: usize) -> String {
        format!("{iterations} {} {}", self.mode.label(), self.form.label())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode.label(), self.form.label())
    }
}

#[derive(Debug)]
struct CancelInner {
    tx: watch::Sender<bool>,
    parent: Option<RunCancel>,
}

/// Run-wide cancellation signal. Once raised, no new calls are dispatched
/// and calls still in flight settle as [`InvokeError::Cancelled`].
///
/// A child is cancelled when either it or its parent is.
#[derive(Clone, Debug)]
pub struct RunCancel {
    inner: Arc<CancelInner>,
}

impl Default for RunCancel {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCancel {
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<RunCancel>) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(CancelInner { tx, parent }),
        }
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    pub fn cancel(&self) {
        self.inner.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.tx.borrow()
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(RunCancel::is_cancelled)
    }

    /// Resolves once this signal or any ancestor is raised.
    pub async fn cancelled(&self) {
        let mut receivers = Vec::new();
        let mut node = Some(self);
        while let Some(signal) = node {
            receivers.push(signal.inner.tx.subscribe());
            node = signal.inner.parent.as_ref();
        }

        let waits = receivers.iter_mut().map(|rx| {
            Box::pin(async move {
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            })
        });
        futures::future::select_all(waits).await;
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub failure_policy: FailurePolicy,
    /// Caps calls in flight in concurrent mode. `None` means unbounded.
    pub max_in_flight: Option<usize>,
    /// External signal, e.g. ctrl-c. Each run derives its own child from it.
    pub cancel: Option<RunCancel>,
}

#[derive(Debug)]
pub struct CallOutcome {
    pub iteration: usize,
    pub latency: Duration,
    pub result: std::result::Result<String, InvokeError>,
}

impl CallOutcome {
    fn not_dispatched(iteration: usize) -> Self {
        Self {
            iteration,
            latency: Duration::ZERO,
            result: Err(InvokeError::Cancelled),
        }
    }

    fn record(&self) -> CallRecord {
        let (label_id, error, error_kind, status) = match &self.result {
            Ok(label) => (Some(label.clone()), None, None, None),
            Err(err) => (
                None,
                Some(err.format_chain()),
                Some(err.kind()),
                err.status(),
            ),
        };
        CallRecord {
            iteration: self.iteration,
            success: self.result.is_ok(),
            label_id,
            error,
            error_kind,
            status,
            latency_ms: self.latency.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub scenario: Scenario,
    pub description: String,
    pub iterations: usize,
    pub elapsed: Duration,
    /// Sequential: submission order. Concurrent: completion order.
    pub labels: Vec<String>,
    /// One record per iteration, sorted by iteration.
    pub calls: Vec<CallRecord>,
    pub summary: RunSummary,
}

impl BenchmarkRun {
    fn settle(
        scenario: Scenario,
        iterations: usize,
        elapsed: Duration,
        outcomes: &[CallOutcome],
    ) -> Self {
        let labels = outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().cloned())
            .collect::<Vec<_>>();
        let mut calls = outcomes.iter().map(CallOutcome::record).collect::<Vec<_>>();
        calls.sort_by_key(|call| call.iteration);
        let summary = aggregate(&calls, elapsed);

        Self {
            scenario,
            description: scenario.description(iterations),
            iterations,
            elapsed,
            labels,
            calls,
            summary,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

async fn invoke_once(
    client: &InvokeClient,
    input: &InvocationInput,
    iteration: usize,
    cancel: &RunCancel,
) -> CallOutcome {
    let start = Instant::now();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InvokeError::Cancelled),
        result = client.invoke(input) => result,
    };

    if let Err(err) = &result {
        tracing::warn!(iteration, kind = ?err.kind(), error = %err.format_chain(), "call failed");
    }

    CallOutcome {
        iteration,
        latency: start.elapsed(),
        result,
    }
}

async fn run_sequential(
    client: &InvokeClient,
    input: &InvocationInput,
    iterations: usize,
    policy: FailurePolicy,
    cancel: &RunCancel,
) -> Result<Vec<CallOutcome>> {
    let mut outcomes = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        if cancel.is_cancelled() {
            outcomes.push(CallOutcome::not_dispatched(iteration));
            continue;
        }

        match invoke_once(client, input, iteration, cancel).await {
            CallOutcome {
                result: Err(err), ..
            } if policy == FailurePolicy::Abort => {
                return Err(BenchError::call_failed(iteration, err));
            }
            outcome => outcomes.push(outcome),
        }
    }
    Ok(outcomes)
}

struct Settled {
    order: usize,
    outcome: CallOutcome,
}

async fn run_concurrent(
    client: &InvokeClient,
    input: &InvocationInput,
    iterations: usize,
    options: &RunOptions,
    cancel: &RunCancel,
) -> Result<Vec<CallOutcome>> {
    let settled: Arc<DashMap<usize, Settled>> = Arc::new(DashMap::with_capacity(iterations));
    let completion_order = Arc::new(AtomicUsize::new(0));
    let semaphore = options
        .max_in_flight
        .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
    let abort_on_failure = options.failure_policy == FailurePolicy::Abort;

    let mut handles = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        if cancel.is_cancelled() {
            let order = completion_order.fetch_add(1, Ordering::SeqCst);
            settled.insert(
                iteration,
                Settled {
                    order,
                    outcome: CallOutcome::not_dispatched(iteration),
                },
            );
            continue;
        }

        let client = client.clone();
        let input = input.clone();
        let cancel = cancel.clone();
        let semaphore = semaphore.clone();
        let settled = settled.clone();
        let completion_order = completion_order.clone();
        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let outcome = invoke_once(&client, &input, iteration, &cancel).await;
            if abort_on_failure && outcome.result.is_err() {
                cancel.cancel();
            }

            let order = completion_order.fetch_add(1, Ordering::SeqCst);
            settled.insert(iteration, Settled { order, outcome });
        }));
    }

    for joined in futures::future::join_all(handles).await {
        joined?;
    }

    let mut outcomes = Vec::with_capacity(iterations);
    for iteration in 0..iterations {
        let (_, entry) = settled
            .remove(&iteration)
            .ok_or(BenchError::MissingOutcome(iteration))?;
        outcomes.push(entry);
    }
    outcomes.sort_by_key(|entry| entry.order);
    let mut outcomes = outcomes
        .into_iter()
        .map(|entry| entry.outcome)
        .collect::<Vec<_>>();

    if abort_on_failure {
        // Calls cut short by the abort itself are not the cause.
        let first_failure = outcomes
            .iter()
            .position(|o| matches!(&o.result, Err(err) if !matches!(err, InvokeError::Cancelled)))
            .or_else(|| outcomes.iter().position(|o| o.result.is_err()));
        if let Some(index) = first_failure {
            let outcome = outcomes.swap_remove(index);
            let err = outcome.result.err().unwrap_or(InvokeError::Cancelled);
            return Err(BenchError::call_failed(outcome.iteration, err));
        }
    }

    Ok(outcomes)
}

/// Executes one run and reports it once every dispatched call has settled.
///
/// Under [`FailurePolicy::Abort`] the first failed call turns the whole run
/// into [`BenchError::CallFailed`]; under [`FailurePolicy::Isolate`] failures
/// are recorded per call and the run always reports.
pub async fn run(
    client: &InvokeClient,
    input: &InvocationInput,
    mode: DispatchMode,
    iterations: usize,
    options: &RunOptions,
) -> Result<BenchmarkRun> {
    if iterations == 0 {
        return Err(BenchError::invalid_argument("iterations must be >= 1"));
    }
    if options.max_in_flight == Some(0) {
        return Err(BenchError::invalid_argument("max_in_flight must be >= 1"));
    }

    let scenario = Scenario::new(mode, input.form());
    let cancel = options
        .cancel
        .as_ref()
        .map_or_else(RunCancel::new, RunCancel::child);

    tracing::info!(
        scenario = %scenario,
        iterations,
        policy = ?options.failure_policy,
        max_in_flight = ?options.max_in_flight,
        "run dispatching"
    );

    let start = Instant::now();
    let outcomes = match mode {
        DispatchMode::Sequential => {
            run_sequential(client, input, iterations, options.failure_policy, &cancel).await?
        }
        DispatchMode::Concurrent => {
            run_concurrent(client, input, iterations, options, &cancel).await?
        }
    };
    let elapsed = start.elapsed();

    let run = BenchmarkRun::settle(scenario, iterations, elapsed, &outcomes);
    tracing::info!(
        scenario = %scenario,
        completed = run.summary.completed,
        failed = run.summary.failed,
        elapsed_ms = run.elapsed_ms() as u64,
        "run settled"
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use invoke_client::InputForm;

    use super::{DispatchMode, RunCancel, Scenario};

    #[test]
    fn descriptions_name_mode_form_and_count() {
        let descriptions = Scenario::ALL
            .iter()
            .map(|scenario| scenario.description(10))
            .collect::<Vec<_>>();
        assert_eq!(
            descriptions,
            [
                "10 sequential image urls",
                "10 parallel image urls",
                "10 sequential data uris",
                "10 parallel data uris",
            ]
        );
        assert_eq!(
            Scenario::new(DispatchMode::Concurrent, InputForm::InlinePayload).to_string(),
            "parallel data uris"
        );
    }

    #[tokio::test]
    async fn child_observes_parent_cancellation() {
        let parent = RunCancel::new();
        let child = parent.child();
        assert!(!child.is_cancelled());

        let waiter = tokio::spawn({
            let child = child.clone();
            async move { child.cancelled().await }
        });
        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child wakes up")
            .expect("join");
        assert!(child.is_cancelled());
    }

    #[test]
    fn child_cancellation_does_not_reach_parent() {
        let parent = RunCancel::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
