//! Document loading service
//!
//! Fetches the OpenAPI document once (remote URL or local file), parses it
//! as JSON or YAML and keeps it in memory for the life of the process.

use crate::types::*;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Shared client for remote documents
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("HTTP client configuration is static")
});

/// Where the document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Remote(String),
    Local(String),
}

impl DocumentSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DocumentSource::Remote(source.to_string())
        } else {
            DocumentSource::Local(source.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentSource::Remote(url) => url,
            DocumentSource::Local(path) => path,
        }
    }
}

/// Parsed document plus load bookkeeping
#[derive(Debug)]
pub struct LoadedDocument {
    pub value: serde_json::Value,
    pub version: OpenApiVersion,
    /// First 8 bytes of the SHA-256 of the normalized document, hex encoded
    pub hash: String,
    pub loaded_at: DateTime<Utc>,
}

/// Loads and caches one configured document
pub struct DocumentLoader {
    source: DocumentSource,
    cached: RwLock<Option<Arc<LoadedDocument>>>,
}

impl DocumentLoader {
    pub fn new(source: &str) -> Self {
        Self {
            source: DocumentSource::parse(source),
            cached: RwLock::new(None),
        }
    }

    /// Loader pre-populated with an already parsed document
    pub fn from_value(source: &str, value: serde_json::Value) -> OasResult<Self> {
        let document = Self::build_document(value)?;
        Ok(Self {
            source: DocumentSource::parse(source),
            cached: RwLock::new(Some(Arc::new(document))),
        })
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub async fn is_loaded(&self) -> bool {
        self.cached.read().await.is_some()
    }

    /// The cached document, fetching it on first use.
    ///
    /// Concurrent first calls may each fetch; the first one stored is kept.
    pub async fn document(&self) -> OasResult<Arc<LoadedDocument>> {
        if let Some(doc) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(doc));
        }

        let content = self.fetch_content().await?;
        let document = Arc::new(Self::parse_content(&content)?);
        tracing::info!(
            source = self.source.as_str(),
            hash = %document.hash,
            version = ?document.version,
            "document loaded"
        );

        let mut cached = self.cached.write().await;
        Ok(Arc::clone(cached.get_or_insert(document)))
    }

    /// Fetch raw content from URL or file
    async fn fetch_content(&self) -> OasResult<String> {
        match &self.source {
            DocumentSource::Remote(url) => Self::fetch_remote(url).await,
            DocumentSource::Local(path) => Self::read_local(path),
        }
    }

    async fn fetch_remote(url: &str) -> OasResult<String> {
        let response = HTTP_CLIENT
            .get(url)
            .send()
            .await
            .map_err(|e| OasError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OasError::HttpError {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("request failed").to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| OasError::ConnectionFailed(e.to_string()))
    }

    fn read_local(path: &str) -> OasResult<String> {
        if path.contains("..") {
            return Err(OasError::PathTraversal(path.to_string()));
        }

        let io_error = |e: std::io::Error| match e.kind() {
            std::io::ErrorKind::NotFound => OasError::FileNotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => OasError::PermissionDenied(path.to_string()),
            _ => OasError::ReadError(format!("{path}: {e}")),
        };

        let canonical = Path::new(path).canonicalize().map_err(io_error)?;
        std::fs::read_to_string(canonical).map_err(io_error)
    }

    /// Parse content as JSON or YAML
    pub fn parse_content(content: &str) -> OasResult<LoadedDocument> {
        // Try JSON first (faster), then YAML
        let value: serde_json::Value = if content.trim_start().starts_with('{') {
            serde_json::from_str(content).map_err(|e| OasError::InvalidJson(e.to_string()))?
        } else {
            serde_yaml::from_str(content).map_err(|e| OasError::InvalidYaml(e.to_string()))?
        };

        Self::build_document(value)
    }

    fn build_document(value: serde_json::Value) -> OasResult<LoadedDocument> {
        if !value.is_object() {
            return Err(OasError::InvalidOpenApi(
                "Document root must be an object".to_string(),
            ));
        }

        let version = Self::detect_version(&value)?;
        let hash = Self::compute_hash(&value)?;

        Ok(LoadedDocument {
            value,
            version,
            hash,
            loaded_at: Utc::now(),
        })
    }

    /// Version family from the `swagger` / `openapi` marker
    fn detect_version(value: &serde_json::Value) -> OasResult<OpenApiVersion> {
        let marker = |key: &str| value.get(key).and_then(|v| v.as_str());

        match (marker("swagger"), marker("openapi")) {
            (Some(v), _) if v.starts_with("2.") => Ok(OpenApiVersion::Swagger2),
            (_, Some(v)) if v.starts_with("3.0") => Ok(OpenApiVersion::OpenApi30),
            (_, Some(v)) if v.starts_with("3.1") => Ok(OpenApiVersion::OpenApi31),
            (_, Some(v)) | (Some(v), None) => Err(OasError::UnsupportedVersion(v.to_string())),
            (None, None) => Err(OasError::InvalidOpenApi(
                "Missing 'openapi' or 'swagger' field".to_string(),
            )),
        }
    }

    /// First 8 bytes of SHA-256 over the compact JSON form, hex encoded
    fn compute_hash(value: &serde_json::Value) -> OasResult<String> {
        let bytes = serde_json::to_vec(value).map_err(|e| OasError::InvalidJson(e.to_string()))?;
        let digest = Sha256::digest(&bytes);
        Ok(hex::encode(&digest[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_YAML: &str = "openapi: 3.0.1\ninfo:\n  title: Mini\n  version: '1'\npaths: {}\n";

    #[test]
    fn test_parse_json_and_yaml() {
        let json_doc =
            DocumentLoader::parse_content(r#"{"openapi": "3.1.0", "info": {}}"#).unwrap();
        assert_eq!(json_doc.version, OpenApiVersion::OpenApi31);

        let yaml_doc = DocumentLoader::parse_content(MINIMAL_YAML).unwrap();
        assert_eq!(yaml_doc.version, OpenApiVersion::OpenApi30);
        assert_eq!(yaml_doc.value["info"]["title"], "Mini");
        assert_eq!(yaml_doc.hash.len(), 16);
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            DocumentLoader::parse_content("{not json"),
            Err(OasError::InvalidJson(_))
        ));
        assert!(matches!(
            DocumentLoader::parse_content("- just\n- a list\n"),
            Err(OasError::InvalidOpenApi(_))
        ));
        assert!(matches!(
            DocumentLoader::parse_content(r#"{"info": {}}"#),
            Err(OasError::InvalidOpenApi(_))
        ));
        assert!(matches!(
            DocumentLoader::parse_content(r#"{"openapi": "4.0.0"}"#),
            Err(OasError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_version_markers() {
        let swagger = DocumentLoader::parse_content(r#"{"swagger": "2.0", "paths": {}}"#).unwrap();
        assert_eq!(swagger.version, OpenApiVersion::Swagger2);
        assert!(matches!(
            DocumentLoader::parse_content(r#"{"swagger": "1.2"}"#),
            Err(OasError::UnsupportedVersion(v)) if v == "1.2"
        ));
    }

    #[test]
    fn test_hash_follows_content() {
        let a = DocumentLoader::parse_content(r#"{"openapi": "3.0.0", "info": {"title": "A"}}"#)
            .unwrap();
        let again = DocumentLoader::parse_content("openapi: 3.0.0\ninfo:\n  title: A\n").unwrap();
        let b = DocumentLoader::parse_content(r#"{"openapi": "3.0.0", "info": {"title": "B"}}"#)
            .unwrap();
        assert_eq!(a.hash, again.hash);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_source_kind() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/openapi.json"),
            DocumentSource::Remote(_)
        ));
        assert!(matches!(
            DocumentSource::parse("./openapi.yaml"),
            DocumentSource::Local(_)
        ));
    }

    #[tokio::test]
    async fn test_local_document_is_cached() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL_YAML.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let loader = DocumentLoader::new(&path);
        assert!(!loader.is_loaded().await);

        let first = loader.document().await.unwrap();
        assert!(loader.is_loaded().await);

        // Later edits are not observed until restart
        std::fs::write(file.path(), "{\"openapi\": \"3.1.0\"}").unwrap();
        let second = loader.document().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.version, OpenApiVersion::OpenApi30);
    }

    #[tokio::test]
    async fn test_missing_file_and_traversal() {
        let missing = DocumentLoader::new("/definitely/not/here/openapi.json");
        assert!(matches!(
            missing.document().await,
            Err(OasError::FileNotFound(_))
        ));

        let traversal = DocumentLoader::new("../secrets/openapi.json");
        assert!(matches!(
            traversal.document().await,
            Err(OasError::PathTraversal(_))
        ));
    }
}
