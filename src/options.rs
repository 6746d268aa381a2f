//! Options structures for upstream transport and summary behaviour.

use std::collections::HashMap;
use std::time::Duration;

/// Instruction sent upstream alongside every piece of content.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the content keeping the original meaning and tone. Do not add any additional information or context that is not present in the original content.";

/// Model type requested from the upstream service.
pub const DEFAULT_MODEL_TYPE: &str = "completion";

/// A secret string type for sensitive data like bearer tokens.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Generic transport options containing truly generic transport fields
/// and provider-specific transport configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific transport options type
///
/// # Example
/// ```rust
/// use smart_summary::options::{TransportOptions, HttpTransport};
/// use std::time::Duration;
///
/// let options = TransportOptions::new(HttpTransport::new("http://localhost:8000"))
///     .with_timeout(Duration::from_secs(120));
/// assert_eq!(options.provider.base_url, "http://localhost:8000");
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions<T> {
    /// Whole-request timeout, including the streamed body
    pub timeout: Option<Duration>,

    /// Timeout for establishing the upstream connection
    pub connect_timeout: Option<Duration>,

    /// Provider-specific transport options
    pub provider: T,
}

impl<T> TransportOptions<T> {
    /// Create new transport options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            provider,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// HTTP-specific transport options.
/// Used as the provider field in `TransportOptions<HttpTransport>`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// Base URL of the upstream summary service, without trailing `/ai/generate`
    pub base_url: String,

    /// Bearer token used when the caller does not present one
    pub token: Option<SecretString>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    /// Create new HTTP transport options pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Set the default bearer token.
    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Full URL of the generate endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/ai/generate", self.base_url.trim_end_matches('/'))
    }
}

/// Behaviour of the summarize pipeline itself.
#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Instruction forwarded with every request
    pub instruction: String,

    /// Upstream model type (`completion` or `chat`)
    pub model_type: String,

    /// Capacity of the outbound channel between relay and HTTP body.
    /// Kept small so a slow reader throttles upstream reads.
    pub outbound_buffer: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            instruction: SUMMARY_INSTRUCTION.to_string(),
            model_type: DEFAULT_MODEL_TYPE.to_string(),
            outbound_buffer: 1,
        }
    }
}

impl SummaryOptions {
    /// Override the instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Set the outbound channel capacity (at least one).
    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity.max(1);
        self
    }
}
