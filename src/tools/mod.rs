//! MCP Tool implementations

mod info;
mod search;

pub use info::*;
pub use search::*;
