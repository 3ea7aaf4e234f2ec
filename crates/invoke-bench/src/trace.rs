use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceMode {
    Off,
    Console,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl TraceLevel {
    fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for TraceLevel {
    type Err = TraceInitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(TraceInitError::UnknownLevel(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TraceConfig {
    pub mode: TraceMode,
    pub level: TraceLevel,
    /// Colour escapes on stderr. Defaults to on only when stderr is a terminal.
    pub with_ansi: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            mode: TraceMode::Console,
            level: TraceLevel::Info,
            with_ansi: std::io::stderr().is_terminal(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceInitError {
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// reserved for run lines. `RUST_LOG`, when set, overrides `cfg.level`.
pub fn init_tracing(service: &'static str, cfg: TraceConfig) -> Result<TraceMode, TraceInitError> {
    if cfg.mode == TraceMode::Off {
        return Ok(cfg.mode);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.as_directive()));
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(cfg.with_ansi)
        .with_writer(std::io::stderr);

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
    {
        let msg = err.to_string();
        if msg.contains("global default trace dispatcher has already been set") {
            tracing::warn!(
                service,
                mode = ?cfg.mode,
                "tracing subscriber already initialized, reusing existing subscriber"
            );
            return Ok(cfg.mode);
        }
        return Err(TraceInitError::SubscriberInit(msg));
    }

    tracing::info!(service, mode = ?cfg.mode, level = ?cfg.level, "tracing initialized");
    Ok(cfg.mode)
}
