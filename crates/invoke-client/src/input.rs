use std::fmt;
use std::sync::Arc;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{InvokeError, Result};

/// Pre-issued bearer token. Never printed.
#[derive(Clone)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl AsRef<str>) -> Result<Self> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(InvokeError::invalid_input("access token cannot be empty"));
        }
        Ok(Self(Arc::from(token)))
    }

    pub(crate) fn bearer_header(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0)).map_err(|_| {
            InvokeError::invalid_input("access token contains characters not allowed in a header")
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FunctionReference(Arc<str>);

impl FunctionReference {
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(InvokeError::invalid_input("function id cannot be empty"));
        }
        if id.contains('/') || id.contains('?') || id.contains('#') {
            return Err(InvokeError::invalid_input(format!(
                "function id is not a single path segment: {id}"
            )));
        }
        Ok(Self(Arc::from(id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputForm {
    RemoteReference,
    InlinePayload,
}

impl InputForm {
    /// Plural noun used in run descriptions.
    pub fn label(self) -> &'static str {
        match self {
            Self::RemoteReference => "image urls",
            Self::InlinePayload => "data uris",
        }
    }
}

/// Value sent as the `data` field of an invocation: either a url the service
/// fetches itself, or a `data:<media-type>;base64,<payload>` string.
///
/// Cloning is cheap; large inline payloads are shared, not copied.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InvocationInput(Arc<str>);

impl InvocationInput {
    pub const INLINE_PREFIX: &'static str = "data:";

    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvokeError::invalid_input("invocation input cannot be empty"));
        }
        Ok(Self(Arc::from(value)))
    }

    pub(crate) fn inline(media_type: &str, encoded: &str) -> Self {
        Self(Arc::from(format!(
            "{}{media_type};base64,{encoded}",
            Self::INLINE_PREFIX
        )))
    }

    pub fn form(&self) -> InputForm {
        if self.0.starts_with(Self::INLINE_PREFIX) {
            InputForm::InlinePayload
        } else {
            InputForm::RemoteReference
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for InvocationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 48;
        match self.form() {
            InputForm::RemoteReference => write!(f, "InvocationInput({:?})", self.0),
            InputForm::InlinePayload => {
                let end = self
                    .0
                    .char_indices()
                    .nth(PREVIEW)
                    .map_or(self.0.len(), |(idx, _)| idx);
                write!(
                    f,
                    "InvocationInput({:?}.. {} bytes)",
                    &self.0[..end],
                    self.0.len()
                )
            }
        }
    }
}

impl fmt::Display for InvocationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
