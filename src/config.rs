//! Command-line and environment configuration for the relay binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::options::{HttpTransport, SummaryOptions, TransportOptions};

/// Streaming summary relay.
#[derive(Parser, Debug, Clone)]
#[command(name = "smart-summary", version, about)]
pub struct Config {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:3000", env = "LISTEN_ADDR")]
    pub addr: SocketAddr,

    /// Base URL of the summary backend (the part before `/ai/generate`)
    #[arg(long, default_value = "http://localhost:8000/api", env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: String,

    /// Bearer token sent upstream when the caller provides none
    #[arg(long, env = "UPSTREAM_TOKEN", hide_env_values = true)]
    pub upstream_token: Option<String>,

    /// Overall upstream request timeout in seconds, streamed body included
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Upstream connect timeout in seconds
    #[arg(long, default_value_t = 10, env = "UPSTREAM_CONNECT_TIMEOUT_SECS")]
    pub upstream_connect_timeout_secs: u64,

    /// HTTP proxy for upstream requests
    #[arg(long, env = "UPSTREAM_PROXY")]
    pub upstream_proxy: Option<String>,

    /// Chunks buffered between the relay and a slow client
    #[arg(long, default_value_t = 1, env = "OUTBOUND_BUFFER")]
    pub outbound_buffer: usize,

    /// Emit JSON log lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn transport_options(&self) -> TransportOptions<HttpTransport> {
        let mut transport = HttpTransport::new(self.upstream_base_url.clone());
        if let Some(token) = &self.upstream_token {
            transport = transport.with_token(token.clone());
        }
        if let Some(proxy) = &self.upstream_proxy {
            transport = transport.with_proxy(proxy.clone());
        }

        let mut options = TransportOptions::new(transport)
            .with_connect_timeout(Duration::from_secs(self.upstream_connect_timeout_secs));
        if let Some(secs) = self.upstream_timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions::default().with_outbound_buffer(self.outbound_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SUMMARY_INSTRUCTION;

    #[test]
    fn parses_flags_into_options() {
        let config = Config::try_parse_from([
            "smart-summary",
            "--addr",
            "127.0.0.1:9000",
            "--upstream-base-url",
            "http://backend:8000/api",
            "--upstream-token",
            "secret",
            "--upstream-timeout-secs",
            "90",
            "--outbound-buffer",
            "4",
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let transport = config.transport_options();
        assert_eq!(transport.timeout, Some(Duration::from_secs(90)));
        assert_eq!(transport.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(transport.provider.generate_url(), "http://backend:8000/api/ai/generate");
        assert_eq!(transport.provider.token.unwrap().expose_secret(), "secret");

        let summary = config.summary_options();
        assert_eq!(summary.outbound_buffer, 4);
        assert_eq!(summary.instruction, SUMMARY_INSTRUCTION);
    }

    #[test]
    fn rejects_bad_listen_address() {
        assert!(Config::try_parse_from(["smart-summary", "--addr", "not-an-addr"]).is_err());
    }
}
