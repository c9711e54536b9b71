//! # Analytics MCP
//!
//! This crate provides an MCP (Model Context Protocol) server exposing
//! Google Analytics 4 reporting operations as tools over a stdio JSON-RPC
//! transport.
//!
//! ## Overview
//!
//! The crate handles:
//! - **Tools**: a fixed menu of GA4 reporting operations
//! - **Client**: an authenticated GA4 Data API client bound to one property
//! - **JSON-RPC**: MCP protocol implementation over stdin/stdout
//! - **Config**: environment-driven startup configuration
//!
//! ## Available Tools
//!
//! - `query_analytics`: arbitrary metrics/dimensions query with filters
//! - `get_realtime_data`: realtime report (defaults: country / activeUsers)
//! - `get_traffic_sources`: canned acquisition report
//! - `get_user_demographics`: canned audience report
//! - `get_page_performance`: canned behavior report
//! - `get_conversion_data`: canned conversion report
//! - `get_custom_report`: generic report with ordering and row limit
//!
//! Every tool returns a `{rows, totals, rowCount}` JSON text payload, or a
//! `{"error": message}` payload when the remote call fails. Per-invocation
//! failures never terminate the server; only startup failures do.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use analytics_mcp::server::{McpServer, ToolContext};
//! use analytics_mcp::tools::report_tools;
//!
//! async fn setup() {
//!     let server = McpServer::analytics(ToolContext::empty());
//!     server.register_tools(report_tools()).await;
//!
//!     let tools = server.list_tools().await;
//!     println!("Registered {} tools", tools.len());
//! }
//! ```

pub mod client;
pub mod config;
pub mod server;
pub mod tools;
pub mod types;

// Re-export main types
pub use client::{AnalyticsDataClient, Credentials, ServiceAccountKey};
pub use config::{ConfigError, GaConfig};
pub use server::{McpServer, McpServerError, McpServerResult, Tool, ToolContext};
pub use tools::report_tools;
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, RequestId, ServerCapabilities, ServerInfo,
    ToolCall, ToolDefinition, ToolResult,
};
