use std::time::Duration;

use invoke_client::ErrorKind;
use serde::{Deserialize, Serialize};

/// One settled call, as it appears in reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallRecord {
    pub iteration: usize,
    pub success: bool,
    pub label_id: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub status: Option<u16>,
    pub latency_ms: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PercentileSummary {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBuckets {
    pub status: usize,
    pub deserialization: usize,
    pub transport: usize,
    pub timeout: usize,
    pub cancelled: usize,
    pub other: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub duration_ms: f64,
    pub request_throughput: f64,
    pub mean_latency_ms: f64,
    pub latency_ms: PercentileSummary,
    pub error_rate: f64,
    pub error_buckets: ErrorBuckets,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentile(sorted_values: &[f64], pct: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let n = sorted_values.len();
    let rank = (pct / 100.0) * (n.saturating_sub(1) as f64);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted_values[lower];
    }

    let weight = rank - lower as f64;
    sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
}

pub fn summarize_percentiles(values: &[f64]) -> PercentileSummary {
    if values.is_empty() {
        return PercentileSummary::default();
    }

    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));

    PercentileSummary {
        p50: percentile(&v, 50.0),
        p90: percentile(&v, 90.0),
        p95: percentile(&v, 95.0),
        p99: percentile(&v, 99.0),
    }
}

/// Folds settled calls into a run summary. Latency statistics cover
/// successful calls only; cancelled calls never reached the service.
pub fn aggregate(records: &[CallRecord], elapsed: Duration) -> RunSummary {
    let completed = records.iter().filter(|r| r.success).count();
    let failed = records.len().saturating_sub(completed);
    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    let safe_duration_s = elapsed.as_secs_f64().max(1e-9);

    let latency_values_ms = records
        .iter()
        .filter(|r| r.success)
        .map(|r| r.latency_ms)
        .filter(|v| *v >= 0.0)
        .collect::<Vec<_>>();

    let mut error_buckets = ErrorBuckets::default();
    for kind in records.iter().filter(|r| !r.success).map(|r| r.error_kind) {
        match kind {
            Some(ErrorKind::Status) => error_buckets.status += 1,
            Some(ErrorKind::Deserialization) => error_buckets.deserialization += 1,
            Some(ErrorKind::Transport) => error_buckets.transport += 1,
            Some(ErrorKind::Timeout) => error_buckets.timeout += 1,
            Some(ErrorKind::Cancelled) => error_buckets.cancelled += 1,
            _ => error_buckets.other += 1,
        }
    }

    RunSummary {
        completed,
        failed,
        duration_ms,
        request_throughput: completed as f64 / safe_duration_s,
        mean_latency_ms: mean(&latency_values_ms),
        latency_ms: summarize_percentiles(&latency_values_ms),
        error_rate: if records.is_empty() {
            0.0
        } else {
            failed as f64 / records.len() as f64
        },
        error_buckets,
    }
}
