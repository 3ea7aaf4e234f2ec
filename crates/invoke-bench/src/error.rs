use plotters::drawing::DrawingAreaErrorKind;

use invoke_client::InvokeError;
use invoke_config::ConfigError;

use crate::trace::TraceInitError;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("iteration {iteration} failed: {source}")]
    CallFailed {
        iteration: usize,
        #[source]
        source: InvokeError,
    },
    #[error("iteration {0} settled without recording an outcome")]
    MissingOutcome(usize),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Trace(#[from] TraceInitError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error("plot render error: {0}")]
    Plot(String),
}

impl BenchError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn call_failed(iteration: usize, source: InvokeError) -> Self {
        Self::CallFailed { iteration, source }
    }

    pub fn format_chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let message = err.to_string();
            if chain.last() != Some(&message) {
                chain.push(message);
            }
            source = std::error::Error::source(err);
        }
        chain.join(" | caused by: ")
    }
}

impl<E> From<DrawingAreaErrorKind<E>> for BenchError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(value: DrawingAreaErrorKind<E>) -> Self {
        Self::Plot(value.to_string())
    }
}
