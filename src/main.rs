//! API Docs MCP Server
//!
//! Exposes an OpenAPI document to agents over MCP (stdio).
//!
//! ## Tools
//!
//! - `api_docs_info` - Title, endpoint count and tag set
//! - `search_api_docs` - Operations matching a path fragment, with summarized
//!   parameters, request bodies and responses

use anyhow::Result;
use api_docs_mcp::McpServer;
use api_docs_mcp::types::{DEFAULT_LIMIT, DEFAULT_MAX_DEPTH, ServerConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "api-docs-mcp", version, about)]
struct Cli {
    /// URL or file path of the OpenAPI document
    #[arg(long, env = "API_DOCS_SOURCE")]
    source: String,

    /// Nested object/array levels expanded beyond the root schema
    #[arg(long, env = "API_DOCS_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Page size when a search omits `limit`
    #[arg(long, env = "API_DOCS_DEFAULT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    default_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "api_docs_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::new(cli.source)
        .with_max_depth(cli.max_depth)
        .with_default_limit(cli.default_limit);

    tracing::info!(
        source = %config.source,
        max_depth = config.max_depth,
        "starting {}",
        env!("CARGO_PKG_NAME")
    );

    McpServer::new(config).serve_stdio().await?;
    Ok(())
}
