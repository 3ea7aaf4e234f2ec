use serde::Serialize;

use crate::raw::RawInvokeConfig;
use crate::{ConfigError, FailurePolicyOption};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalInvokeConfig {
    #[serde(skip_serializing)]
    pub access_token: String,
    pub function_id: String,
    pub image_url: String,

    // Endpoint
    pub host: String,
    pub scheme: String,
    pub timeout_secs: u64,

    // Benchmark
    pub iterations: usize,
    pub media_type: String,
    pub max_in_flight: Option<usize>,
    pub failure_policy: FailurePolicyOption,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(field)),
    }
}

impl FinalInvokeConfig {
    /// Validates a raw config. Defaults must already have been filled.
    pub fn from_raw(raw: RawInvokeConfig) -> Result<Self, ConfigError> {
        let cfg = Self {
            access_token: required(raw.access_token, "accessToken")?,
            function_id: required(raw.function_id, "functionId")?,
            image_url: required(raw.image_url, "imageUrl")?,
            host: required(raw.host, "host")?,
            scheme: required(raw.scheme, "scheme")?,
            timeout_secs: raw.timeout_secs.ok_or(ConfigError::Missing("timeoutSecs"))?,
            iterations: raw.iterations.ok_or(ConfigError::Missing("iterations"))?,
            media_type: required(raw.media_type, "mediaType")?,
            max_in_flight: raw.max_in_flight,
            failure_policy: raw.failure_policy.unwrap_or_default(),
        };
        cfg.check()?;
        Ok(cfg)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.function_id.contains('/') {
            return Err(ConfigError::invalid("functionId", "must not contain '/'"));
        }
        if !(self.image_url.starts_with("http://") || self.image_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "imageUrl",
                "must be an http(s) url",
            ));
        }
        if self.scheme != "https" && self.scheme != "http" {
            return Err(ConfigError::invalid("scheme", "must be http or https"));
        }
        if self.host.contains('/') {
            return Err(ConfigError::invalid("host", "must be a bare host[:port]"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeoutSecs", "must be >= 1"));
        }
        if self.iterations == 0 {
            return Err(ConfigError::invalid("iterations", "must be >= 1"));
        }
        if !self.media_type.contains('/') {
            return Err(ConfigError::invalid(
                "mediaType",
                "must look like type/subtype",
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::invalid("maxInFlight", "must be >= 1"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FinalInvokeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalInvokeConfig")
            .field("access_token", &"<redacted>")
            .field("function_id", &self.function_id)
            .field("image_url", &self.image_url)
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("timeout_secs", &self.timeout_secs)
            .field("iterations", &self.iterations)
            .field("media_type", &self.media_type)
            .field("max_in_flight", &self.max_in_flight)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}
