//! zone-gateway server entry point.
//!
//! Loads configuration, probes the upstream API once, and starts the Axum
//! server with REST and WebSocket endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use zone_gateway::app_state::AppState;
use zone_gateway::build_app;
use zone_gateway::config::GatewayConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env().context("loading configuration")?;
    tracing::info!(
        addr = %config.listen_addr,
        upstream = ?config.upstream,
        "starting zone-gateway"
    );
    let listen_addr = config.listen_addr;

    let app_state = AppState::new(config).context("building application state")?;

    match app_state.ha.probe().await {
        Ok(probe) => tracing::info!(
            status = probe.status,
            content_type = %probe.content_type,
            "upstream API reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "upstream API probe failed; continuing"),
    }

    let app = build_app(app_state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app).await.context("serving")?;

    Ok(())
}
