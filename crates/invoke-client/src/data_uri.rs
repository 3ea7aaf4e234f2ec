use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::client::InvokeClient;
use crate::error::{InvokeError, Result};
use crate::input::InvocationInput;
use crate::transport::{Transport, TransportRequest};

/// Turns a fetchable url into a self-contained `data:` payload.
///
/// Every call re-fetches; nothing is cached.
#[derive(Clone)]
pub struct DataUriEncoder {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl DataUriEncoder {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Shares the client's transport and timeout.
    pub fn from_client(client: &InvokeClient) -> Self {
        Self::new(client.transport(), client.timeout())
    }

    pub async fn encode(&self, reference: &str, media_type: &str) -> Result<InvocationInput> {
        if media_type.trim().is_empty() {
            return Err(InvokeError::invalid_input("media type cannot be empty"));
        }

        let bytes = self.fetch(reference).await?;
        let encoded = STANDARD.encode(&bytes);
        tracing::debug!(
            reference,
            media_type,
            fetched_bytes = bytes.len(),
            encoded_bytes = encoded.len(),
            "encoded inline payload"
        );
        Ok(InvocationInput::inline(media_type, &encoded))
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let retrieval = |status: Option<u16>, reason: String, source| InvokeError::Retrieval {
            url: reference.to_string(),
            status,
            reason,
            source,
        };

        let response = match tokio::time::timeout(
            self.timeout,
            self.transport.send(TransportRequest::get(reference)),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(retrieval(None, "transport failure".to_string(), Some(err))),
            Err(_) => {
                return Err(retrieval(
                    None,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                    None,
                ));
            }
        };

        if !response.status.is_success() {
            return Err(retrieval(
                Some(response.status.as_u16()),
                format!(
                    "status code {} {}",
                    response.status.as_u16(),
                    response.status.canonical_reason().unwrap_or("Unknown")
                ),
                None,
            ));
        }

        Ok(response.body)
    }
}
