use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{InvokeError, Result};
use crate::input::{Credential, FunctionReference, InvocationInput};
use crate::transport::{ReqwestTransport, Transport, TransportOptions, TransportRequest};

pub const DEFAULT_HOST: &str = "www.nyckel.com";

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub scheme: String,
    pub host: String,
    /// Upper bound on one request/response exchange.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: DEFAULT_HOST.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    pub fn validate(&self) -> Result<()> {
        if self.scheme != "https" && self.scheme != "http" {
            return Err(InvokeError::invalid_input(format!(
                "unsupported scheme: {}",
                self.scheme
            )));
        }
        if self.host.trim().is_empty() || self.host.contains('/') {
            return Err(InvokeError::invalid_input(format!(
                "host must be a bare host[:port]: {}",
                self.host
            )));
        }
        if self.timeout.is_zero() {
            return Err(InvokeError::invalid_input(
                "timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    data: &'a str,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(rename = "labelId")]
    label_id: String,
}

struct Inner {
    transport: Arc<dyn Transport>,
    function: FunctionReference,
    endpoint: String,
    authorization: HeaderValue,
    timeout: Duration,
}

/// Authenticated client for a single classification function.
///
/// Clones share one transport. The transport is released when the last
/// clone is dropped, whether or not calls failed or were abandoned.
#[derive(Clone)]
pub struct InvokeClient {
    inner: Arc<Inner>,
}

impl InvokeClient {
    /// Builds a client over a fresh pooled HTTP transport.
    pub fn new(
        credential: Credential,
        function: FunctionReference,
        options: ClientOptions,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(TransportOptions::default())?;
        Self::with_transport(credential, function, options, Arc::new(transport))
    }

    pub fn with_transport(
        credential: Credential,
        function: FunctionReference,
        options: ClientOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        options.validate()?;
        let endpoint = format!(
            "{}://{}/v1/functions/{}/invoke",
            options.scheme, options.host, function
        );

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                function,
                endpoint,
                authorization: credential.bearer_header()?,
                timeout: options.timeout,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    /// Sends one classification request and returns the predicted label id.
    pub async fn invoke(&self, input: &InvocationInput) -> Result<String> {
        let body = serde_json::to_vec(&InvokeRequest {
            data: input.as_str(),
        })
        .map_err(InvokeError::Serialize)?;

        let mut request = TransportRequest::post(self.inner.endpoint.clone(), body);
        request
            .headers
            .insert(AUTHORIZATION, self.inner.authorization.clone());
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let start = Instant::now();
        let response = tokio::time::timeout(self.inner.timeout, self.inner.transport.send(request))
            .await
            .map_err(|_| InvokeError::timeout(self.inner.timeout))??;

        tracing::debug!(
            function = %self.inner.function,
            form = ?input.form(),
            status = response.status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "invoke settled"
        );

        if !response.status.is_success() {
            return Err(InvokeError::Status {
                status: response.status.as_u16(),
                reason: response
                    .status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_string(),
            });
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Err(InvokeError::deserialization("empty response body"));
        }

        let parsed: InvokeResponse = serde_json::from_slice(&response.body)
            .map_err(|err| InvokeError::deserialization(err.to_string()))?;
        Ok(parsed.label_id)
    }
}

impl fmt::Debug for InvokeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeClient")
            .field("endpoint", &self.inner.endpoint)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}
