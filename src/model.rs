//! Wire-level data models for the inbound API and the upstream service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/summarize`.
///
/// `content` is kept as raw JSON so that a missing, `null` or non-string
/// value is reported as missing content rather than as a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub content: Option<Value>,
}

impl SummarizeRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(Value::String(content.into())),
        }
    }

    /// Trimmed content, or `None` when there is no text to summarize.
    pub fn trimmed_content(&self) -> Option<&str> {
        match &self.content {
            Some(Value::String(text)) => Some(text.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

/// Request body sent to the upstream `/ai/generate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Upstream model type, e.g. `completion`
    pub model_type: String,

    /// Prompt parameters
    pub params: GenerateParams,

    /// Always `true` for the relay
    pub stream: bool,
}

/// Prompt parameters of a [`GenerateRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateParams {
    pub content: String,
    pub instruction: String,
}

impl GenerateRequest {
    /// Build a streaming request for `content`.
    pub fn streaming(
        model_type: impl Into<String>,
        content: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            model_type: model_type.into(),
            params: GenerateParams {
                content: content.into(),
                instruction: instruction.into(),
            },
            stream: true,
        }
    }
}

/// JSON error body returned before streaming starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
