use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use invoke_bench::trace::TraceLevel;
use invoke_config::{FailurePolicyOption, FinalInvokeConfig};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FailurePolicyArg {
    Isolate,
    Abort,
}

impl From<FailurePolicyArg> for FailurePolicyOption {
    fn from(value: FailurePolicyArg) -> Self {
        match value {
            FailurePolicyArg::Isolate => FailurePolicyOption::Isolate,
            FailurePolicyArg::Abort => FailurePolicyOption::Abort,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for TraceLevel {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => TraceLevel::Error,
            LogLevelArg::Warn => TraceLevel::Warn,
            LogLevelArg::Info => TraceLevel::Info,
            LogLevelArg::Debug => TraceLevel::Debug,
            LogLevelArg::Trace => TraceLevel::Trace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "invoke-bench",
    about = "Sequential vs parallel invocation benchmark for a classification function"
)]
pub struct Cli {
    /// JSON or TOML file with accessToken, functionId and imageUrl.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,
    #[arg(long)]
    pub iterations: Option<usize>,
    #[arg(long, value_enum)]
    pub failure_policy: Option<FailurePolicyArg>,
    #[arg(long)]
    pub max_in_flight: Option<usize>,
    /// Media type declared in the generated data uri.
    #[arg(long)]
    pub media_type: Option<String>,
    #[arg(long, value_enum, default_value_t = LogLevelArg::Info)]
    pub log_level: LogLevelArg,
    #[arg(long)]
    pub output_json: Option<PathBuf>,
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags win over config file values.
    pub fn apply_overrides(&self, cfg: &mut FinalInvokeConfig) {
        if let Some(iterations) = self.iterations {
            cfg.iterations = iterations;
        }
        if let Some(policy) = self.failure_policy {
            cfg.failure_policy = policy.into();
        }
        if let Some(limit) = self.max_in_flight {
            cfg.max_in_flight = Some(limit);
        }
        if let Some(media_type) = &self.media_type {
            cfg.media_type = media_type.clone();
        }
    }
}

pub fn build_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}
