use clap::Parser;
use tracing::info;

use smart_summary::config::Config;
use smart_summary::logging::{init_tracing, DEFAULT_FILTER};
use smart_summary::providers::BackendClient;
use smart_summary::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(DEFAULT_FILTER, config.log_json);

    info!(
        addr = %config.addr,
        upstream = %config.upstream_base_url,
        "starting smart-summary relay"
    );

    let client = BackendClient::new(config.transport_options())?;
    let state = AppState::new(client, config.summary_options());
    let shutdown = state.shutdown.clone();

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutting down, cancelling in-flight relays");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
