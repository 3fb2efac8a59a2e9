//! Service implementations for the API docs MCP server

mod loader;
mod matcher;
mod merger;
mod metadata;
mod resolver;
mod summarizer;

pub use loader::*;
pub use matcher::*;
pub use merger::*;
pub use metadata::*;
pub use resolver::*;
pub use summarizer::*;
