//! Type definitions for the API docs MCP server

mod config;
mod error;
mod openapi;

pub use config::*;
pub use error::*;
pub use openapi::*;
