//! Authenticated client for a remote classification function.
//!
//! This crate provides:
//! - [`InvokeClient`]: one `POST /v1/functions/{id}/invoke` per call, typed failures;
//! - [`DataUriEncoder`]: url -> `data:<media-type>;base64,...` inline payloads;
//! - the [`Transport`] seam both of them send through.

pub mod client;
pub mod data_uri;
pub mod error;
pub mod input;
pub mod transport;

pub use client::{ClientOptions, DEFAULT_HOST, InvokeClient};
pub use data_uri::DataUriEncoder;
pub use error::{ErrorKind, InvokeError, Result, TransportError};
pub use input::{Credential, FunctionReference, InputForm, InvocationInput};
pub use transport::{
    ReqwestTransport, Transport, TransportOptions, TransportRequest, TransportResponse,
};
