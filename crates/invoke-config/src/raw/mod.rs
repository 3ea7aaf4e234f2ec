use serde::{Deserialize, Serialize};

use crate::FailurePolicyOption;

#[macro_export]
macro_rules! fill_default {
    ($s:expr, $( $field:ident : $value:expr ),+ $(,)?) => {
        $(
            if $s.$field.is_none() {
                $s.$field = Some($value);
            }
        )+
    };
}

pub const DEFAULT_HOST: &str = "www.nyckel.com";
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_ITERATIONS: usize = 10;
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Config file as written on disk. Every field is optional here so that a
/// missing required key surfaces as [`crate::ConfigError::Missing`] rather
/// than an opaque parser message.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawInvokeConfig {
    // Required
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub function_id: Option<String>,
    pub image_url: Option<String>,

    // Endpoint
    pub host: Option<String>,
    pub scheme: Option<String>,
    pub timeout_secs: Option<u64>,

    // Benchmark
    pub iterations: Option<usize>,
    pub media_type: Option<String>,
    pub max_in_flight: Option<usize>,
    pub failure_policy: Option<FailurePolicyOption>,
}

impl RawInvokeConfig {
    pub fn fill_default(&mut self) {
        fill_default!(
            self,
            host: DEFAULT_HOST.to_string(),
            scheme: DEFAULT_SCHEME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            iterations: DEFAULT_ITERATIONS,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            failure_policy: FailurePolicyOption::default(),
        );
    }
}

impl std::fmt::Debug for RawInvokeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawInvokeConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
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
