#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use invoke_client::{Transport, TransportError, TransportRequest, TransportResponse};
use reqwest::StatusCode;

/// Deterministic transport: fixed status, body and latency for every call.
pub struct StubTransport {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub latency: Duration,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<TransportRequest>>,
}

impl StubTransport {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.into(),
            latency: Duration::ZERO,
            fail_with: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing(message: &str) -> Self {
        let mut stub = Self::new(200, Vec::new());
        stub.fail_with = Some(message.to_string());
        stub
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> TransportRequest {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("at least one request")
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(TransportError::other(message.clone()));
        }
        Ok(TransportResponse::new(self.status, self.body.clone()))
    }
}
