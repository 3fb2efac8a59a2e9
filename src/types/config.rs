//! Server configuration

/// Default recursion bound for schema summaries (levels beyond the root)
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Default page size for `search_api_docs`
pub const DEFAULT_LIMIT: usize = 50;

/// Runtime configuration resolved from CLI flags and environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// URL or file path of the OpenAPI document
    pub source: String,
    /// Maximum nested object/array expansion beyond the root schema
    pub max_depth: usize,
    /// Page size used when a search call omits `limit`
    pub default_limit: usize,
}

impl ServerConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        // A zero page size would make every search look empty
        self.default_limit = limit.max(1);
        self
    }
}
