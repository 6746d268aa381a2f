//! Client for the summary backend's `/ai/generate` endpoint.
//!
//! The backend selects the actual LLM provider; this client only posts the
//! generation request and exposes the SSE body as a byte stream.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::client::{ByteStream, ClientError, ProviderClient};
use crate::http::{add_extra_headers, build_http_client};
use crate::model::GenerateRequest;
use crate::options::{HttpTransport, TransportOptions};

/// Streaming client for the summary backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    transport_options: TransportOptions<HttpTransport>,
}

impl BackendClient {
    /// Create a client, building the HTTP client once up front.
    pub fn new(transport_options: TransportOptions<HttpTransport>) -> Result<Self, ClientError> {
        if transport_options.provider.base_url.trim().is_empty() {
            return Err(ClientError::Config("upstream base URL is required".to_string()));
        }
        let http = build_http_client(&transport_options)?;
        Ok(Self {
            http,
            transport_options,
        })
    }

    pub fn transport_options(&self) -> &TransportOptions<HttpTransport> {
        &self.transport_options
    }
}

#[async_trait]
impl ProviderClient for BackendClient {
    async fn open_stream(
        &self,
        request: &GenerateRequest,
        authorization: Option<&str>,
    ) -> Result<ByteStream, ClientError> {
        let provider = &self.transport_options.provider;
        let url = provider.generate_url();

        let mut req = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream");

        req = add_extra_headers(req, &provider.extra_headers);

        // The caller's credentials win; the configured token is a fallback.
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        } else if let Some(token) = &provider.token {
            req = req.bearer_auth(token.expose_secret());
        }

        debug!(%url, model_type = %request.model_type, "opening upstream stream");

        let response = req.json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!(%status, error = %err, "could not read upstream error body");
                    String::new()
                }
            };
            warn!(%status, "upstream rejected generate request");
            return Err(ClientError::UpstreamStatus { status, body });
        }

        Ok(response.bytes_stream().map_err(ClientError::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        let err = BackendClient::new(TransportOptions::new(HttpTransport::new("  "))).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn keeps_transport_options() {
        let client =
            BackendClient::new(TransportOptions::new(HttpTransport::new("http://backend:8000")))
                .unwrap();
        assert_eq!(
            client.transport_options().provider.generate_url(),
            "http://backend:8000/ai/generate"
        );
    }
}
