use std::io::Write;
use std::path::Path;

use chrono::Utc;
use invoke_client::{DataUriEncoder, InputForm, InvocationInput, InvokeClient};
use serde::{Deserialize, Serialize};

use crate::harness::{self, BenchmarkRun, FailurePolicy, RunOptions, Scenario};
use crate::{BenchError, Result};

#[derive(Clone, Debug)]
pub struct SuiteConfig {
    pub iterations: usize,
    pub media_type: String,
    pub run: RunOptions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioReport {
    Completed(BenchmarkRun),
    Skipped {
        scenario: Scenario,
        description: String,
        reason: String,
    },
}

impl ScenarioReport {
    pub fn scenario(&self) -> Scenario {
        match self {
            Self::Completed(run) => run.scenario,
            Self::Skipped { scenario, .. } => *scenario,
        }
    }

    pub fn run(&self) -> Option<&BenchmarkRun> {
        match self {
            Self::Completed(run) => Some(run),
            Self::Skipped { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub endpoint: String,
    pub iterations: usize,
    pub media_type: String,
    pub inline_payload_bytes: Option<usize>,
    pub scenarios: Vec<ScenarioReport>,
}

/// One stdout line per run: `{description}: {elapsed}ms`.
pub fn format_run_line(run: &BenchmarkRun) -> String {
    let mut line = format!("{}: {}ms", run.description, run.elapsed_ms());
    if !run.all_succeeded() {
        line.push_str(&format!(
            " ({} of {} succeeded)",
            run.summary.completed, run.iterations
        ));
    }
    line
}

/// Runs {sequential, parallel} x {image url, data uri} in order, writing one
/// line per run to `out`.
///
/// Under the isolate policy a failed inline-payload fetch skips the two
/// data-uri runs instead of ending the suite. Under the abort policy a failed
/// fetch or a failed call ends it.
pub async fn run_suite<W: Write>(
    client: &InvokeClient,
    encoder: &DataUriEncoder,
    image_url: &InvocationInput,
    cfg: &SuiteConfig,
    out: &mut W,
) -> Result<SuiteResult> {
    if image_url.form() != InputForm::RemoteReference {
        return Err(BenchError::invalid_argument(
            "suite input must be a remote reference",
        ));
    }

    let started_at_utc = Utc::now().to_rfc3339();
    writeln!(out, "Running examples...")?;

    let inline = match encoder.encode(image_url.as_str(), &cfg.media_type).await {
        Ok(inline) => Ok(inline),
        Err(err) if cfg.run.failure_policy == FailurePolicy::Abort => return Err(err.into()),
        Err(err) => {
            tracing::error!(
                error = %err.format_chain(),
                "inline payload unavailable, skipping data uri runs"
            );
            Err(err.format_chain())
        }
    };

    let mut scenarios = Vec::with_capacity(Scenario::ALL.len());
    for scenario in Scenario::ALL {
        let description = scenario.description(cfg.iterations);
        let input = match (scenario.form, &inline) {
            (InputForm::RemoteReference, _) => image_url,
            (InputForm::InlinePayload, Ok(inline)) => inline,
            (InputForm::InlinePayload, Err(reason)) => {
                writeln!(out, "{description}: skipped ({reason})")?;
                scenarios.push(ScenarioReport::Skipped {
                    scenario,
                    description,
                    reason: reason.clone(),
                });
                continue;
            }
        };

        let run = harness::run(client, input, scenario.mode, cfg.iterations, &cfg.run).await?;
        writeln!(out, "{}", format_run_line(&run))?;
        out.flush()?;
        scenarios.push(ScenarioReport::Completed(run));
    }

    Ok(SuiteResult {
        started_at_utc,
        finished_at_utc: Utc::now().to_rfc3339(),
        endpoint: client.endpoint().to_string(),
        iterations: cfg.iterations,
        media_type: cfg.media_type.clone(),
        inline_payload_bytes: inline.as_ref().ok().map(InvocationInput::len),
        scenarios,
    })
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
