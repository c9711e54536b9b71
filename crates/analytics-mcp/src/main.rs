//! Analytics MCP server binary.
//!
//! Reads configuration from the environment, constructs the GA4 client,
//! registers the reporting tools, and serves MCP over stdin/stdout. Any
//! startup failure is fatal; the process exits non-zero before serving.

use analytics_mcp::client::auth::{Credentials, ServiceAccountKey};
use analytics_mcp::client::data::AnalyticsDataClient;
use analytics_mcp::config::GaConfig;
use analytics_mcp::server::{McpServer, ToolContext};
use analytics_mcp::tools::report_tools;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the protocol stream.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("Server initialization error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GaConfig::from_env()?;
    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    let client = Arc::new(AnalyticsDataClient::new(
        &config,
        Credentials::ServiceAccount(key),
    )?);

    let server = McpServer::analytics(ToolContext::new(client));
    server.register_tools(report_tools()).await;
    info!(
        "Serving {} tools for property {}",
        server.list_tools().await.len(),
        config.property_id
    );

    server.serve_stdio().await?;
    Ok(())
}
