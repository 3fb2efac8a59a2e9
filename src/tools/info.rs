//! api_docs_info tool implementation

use crate::services::{DocumentLoader, compute_metadata};
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct InfoInput {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoOutput {
    pub success: bool,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report title, endpoint count and tags of the configured document
pub async fn get_info(loader: &DocumentLoader, _input: InfoInput) -> InfoOutput {
    let source = loader.source().as_str().to_string();

    match loader.document().await {
        Ok(document) => InfoOutput {
            success: true,
            source,
            metadata: Some(compute_metadata(&document.value)),
            document_hash: Some(document.hash.clone()),
            loaded_at: Some(document.loaded_at.to_rfc3339()),
            error: None,
        },
        Err(e) => InfoOutput {
            success: false,
            source,
            metadata: None,
            document_hash: None,
            loaded_at: None,
            error: Some(e.to_string()),
        },
    }
}
