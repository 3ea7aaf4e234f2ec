#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use invoke_client::{
    ClientOptions, Credential, DataUriEncoder, FunctionReference, InvocationInput, InvokeClient,
    Transport, TransportError, TransportRequest, TransportResponse,
};
use reqwest::{Method, StatusCode};

pub const IMAGE_URL: &str = "https://images.example.com/cat.jpg";
pub const IMAGE_BYTES: &[u8] = b"\xff\xd8\xff\xe0 not really a jpeg";

/// Answers the n-th invoke with `{"labelId":"label-n"}` after a fixed
/// latency, failing the calls listed in `fail_calls`. GETs serve
/// [`IMAGE_BYTES`] unless `fetch_status` says otherwise.
pub struct ScriptedTransport {
    pub latency: Duration,
    pub fail_calls: HashSet<usize>,
    pub fail_status: StatusCode,
    pub fetch_status: StatusCode,
    calls: AtomicUsize,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_calls: HashSet::new(),
            fail_status: StatusCode::INTERNAL_SERVER_ERROR,
            fetch_status: StatusCode::OK,
            calls: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_calls(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_calls = calls.into_iter().collect();
        self
    }

    pub fn with_fetch_status(mut self, status: u16) -> Self {
        self.fetch_status = StatusCode::from_u16(status).expect("valid status");
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        if request.method == Method::GET {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            return Ok(TransportResponse::new(self.fetch_status, IMAGE_BYTES));
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_calls.contains(&call) {
            return Ok(TransportResponse::new(self.fail_status, "failure"));
        }
        Ok(TransportResponse::new(
            StatusCode::OK,
            format!(r#"{{"labelId":"label-{call}"}}"#),
        ))
    }
}

pub fn client_over(transport: Arc<ScriptedTransport>) -> InvokeClient {
    InvokeClient::with_transport(
        Credential::new("bench-token").expect("credential"),
        FunctionReference::new("fn-bench").expect("function"),
        ClientOptions::default(),
        transport,
    )
    .expect("client")
}

pub fn encoder_for(client: &InvokeClient) -> DataUriEncoder {
    DataUriEncoder::from_client(client)
}

pub fn image_input() -> InvocationInput {
    InvocationInput::new(IMAGE_URL).expect("input")
}
