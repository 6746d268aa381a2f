//! Provider client trait and error types.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use thiserror::Error;

use crate::model::GenerateRequest;

/// Errors that can occur while talking to the upstream service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Raw upstream response body, read chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Performs the upstream call for one summary request.
///
/// Implementations send the request, check the status before any body bytes
/// are consumed, and hand back the live body. Dropping the returned stream
/// must release the underlying connection.
///
/// # Example
/// ```rust,ignore
/// struct Canned(&'static str);
///
/// #[async_trait]
/// impl ProviderClient for Canned {
///     async fn open_stream(
///         &self,
///         _request: &GenerateRequest,
///         _authorization: Option<&str>,
///     ) -> Result<ByteStream, ClientError> {
///         Ok(Box::pin(futures::stream::iter([Ok(Bytes::from_static(self.0.as_bytes()))])))
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Open a streaming generation.
    ///
    /// `authorization` is the caller's `Authorization` header value, passed
    /// through untouched when present.
    async fn open_stream(
        &self,
        request: &GenerateRequest,
        authorization: Option<&str>,
    ) -> Result<ByteStream, ClientError>;
}
