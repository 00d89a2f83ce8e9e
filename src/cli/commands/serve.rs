use std::net::SocketAddr;

use clap::Args;

use crate::config::AppConfig;
use crate::context::AppContext;

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, help = "Bind host (overrides HOST)")]
    pub host: Option<String>,

    #[arg(long, short, help = "Bind port (overrides PORT)")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    serve(config).await
}

/// Bind, serve until Ctrl-C, then tear the context down.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting DevCamper API in {:?} mode", config.environment);
    let bind_addr = config.addr();

    let ctx = AppContext::build(config).await?;
    let app = crate::routes::app(ctx.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("DevCamper API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ctx.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
