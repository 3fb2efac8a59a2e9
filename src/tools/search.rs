//! search_api_docs tool implementation

use crate::services::{DocumentLoader, OperationMatcher, compute_metadata};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SearchInput {
    /// Case-insensitive substring of the path template (empty matches all)
    #[serde(default)]
    pub path: String,
    /// Only keep operations with this HTTP method
    pub method: Option<String>,
    /// Only keep operations carrying this tag
    pub tag: Option<String>,
    /// Limit number of results (for pagination)
    pub limit: Option<usize>,
    /// Offset for pagination
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    pub matches: Vec<OperationMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutput {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            metadata: None,
            matches: Vec::new(),
            pagination: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// Search operations of the configured document by path
pub async fn search_operations(
    loader: &DocumentLoader,
    config: &ServerConfig,
    input: SearchInput,
) -> SearchOutput {
    let method = match input.method.as_deref() {
        Some(raw) => match HttpMethod::parse(raw) {
            Some(method) => Some(method),
            None => return SearchOutput::failure(format!("Unknown HTTP method: {raw}")),
        },
        None => None,
    };

    let document = match loader.document().await {
        Ok(doc) => doc,
        Err(e) => return SearchOutput::failure(e.to_string()),
    };

    let matcher = OperationMatcher::new(&document.value).with_max_depth(config.max_depth);
    let filtered: Vec<OperationMatch> = matcher
        .match_operations(&input.path)
        .into_iter()
        .filter(|m| method.is_none_or(|wanted| m.method == wanted))
        .filter(|m| match input.tag.as_deref() {
            Some(tag) => m
                .tags
                .iter()
                .flatten()
                .any(|t| t.eq_ignore_ascii_case(tag)),
            None => true,
        })
        .collect();

    let limit = input.limit.unwrap_or(config.default_limit);
    let offset = input.offset;
    let total = filtered.len();

    tracing::debug!(
        filter = %input.path,
        total,
        offset,
        limit,
        "search_api_docs"
    );

    SearchOutput {
        success: true,
        metadata: Some(compute_metadata(&document.value)),
        matches: filtered.into_iter().skip(offset).take(limit).collect(),
        pagination: Some(PaginationInfo {
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
        }),
        error: None,
    }
}
