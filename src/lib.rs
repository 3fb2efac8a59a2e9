//! API Docs MCP Library
//!
//! Re-exports modules for testing and external use.

pub mod server;
pub mod services;
pub mod tools;
pub mod types;

pub use server::McpServer;
pub use services::{
    DocumentLoader, OperationMatcher, SchemaSummarizer, compute_metadata, match_operations,
    merge_summaries, resolve_ref,
};
pub use tools::{InfoInput, InfoOutput, get_info};
pub use tools::{SearchInput, SearchOutput, search_operations};
