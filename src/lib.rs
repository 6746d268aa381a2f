//! # smart-summary - streaming summary relay
//!
//! Accepts text from a client, asks an upstream summary service to summarize
//! it, and streams the summary back as plain text while it is being generated.
//!
//! ## Architecture
//!
//! - [`server`]: axum routes, request validation, pre-stream error responses
//! - [`client::ProviderClient`]: opens the upstream SSE stream
//!   ([`providers::BackendClient`] is the HTTP implementation)
//! - [`relay`]: the pull loop that decodes upstream SSE records and forwards
//!   chunk text, with back-pressure and cancellation
//! - [`sse`]: line assembly and frame decoding
//!
//! ## Example
//! ```no_run
//! use smart_summary::options::{HttpTransport, SummaryOptions, TransportOptions};
//! use smart_summary::providers::BackendClient;
//! use smart_summary::server::{build_router, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = TransportOptions::new(HttpTransport::new("http://localhost:8000/api"));
//!     let client = BackendClient::new(transport)?;
//!     let app = build_router(AppState::new(client, SummaryOptions::default()));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod http;
pub mod logging;
pub mod model;
pub mod options;
pub mod providers;
pub mod relay;
pub mod server;
pub mod sse;

// Re-exports for convenience
pub use client::{ByteStream, ClientError, ProviderClient};
pub use model::{GenerateRequest, SummarizeRequest};
pub use relay::{relay, RelayOutcome, RelaySession, Termination};
pub use sse::UpstreamFrame;
