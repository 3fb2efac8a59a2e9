//! Summary types produced from an OpenAPI document

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// OpenAPI version family declared by a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpenApiVersion {
    #[serde(rename = "2.0")]
    Swagger2,
    #[serde(rename = "3.0")]
    OpenApi30,
    #[serde(rename = "3.1")]
    OpenApi31,
}

/// HTTP methods that may carry an operation object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    /// Fixed iteration order used when scanning path items
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Trace,
    ];

    /// Key of this method inside a path item object
    pub fn as_key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
        }
    }

    /// Parse an HTTP method string (case-insensitive)
    pub fn parse(method: &str) -> Option<HttpMethod> {
        let lower = method.to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.as_key() == lower)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key().to_uppercase())
    }
}

/// Bounded, merged reduction of a schema node.
///
/// An instance with no populated field never escapes the summarizer; absence
/// is always modelled as `None` by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_enum: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_schema: Option<Box<SchemaSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<SchemaProperty>>,
    /// `Some(Value::Null)` is a declared `null`, not an absent default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SchemaSummary {
    pub fn is_empty(&self) -> bool {
        self.schema_type.is_none()
            && self.format.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.enum_values.is_none()
            && self.items_type.is_none()
            && self.items_enum.is_none()
            && self.items_schema.is_none()
            && self.properties.is_none()
            && self.default.is_none()
            && self.example.is_none()
            && self.reference.is_none()
    }

    /// `None` when nothing was populated
    pub fn into_option(self) -> Option<SchemaSummary> {
        if self.is_empty() { None } else { Some(self) }
    }

    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties
            .as_ref()
            .and_then(|props| props.iter().find(|p| p.name == name))
    }
}

/// One named property of an object schema
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSummary>,
}

/// Where a parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(location: &str) -> Option<ParameterLocation> {
        match location {
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSummary {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSummary>,
}

/// One media type entry of a request body or response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodySummary {
    pub required: bool,
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<ContentSummary>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    pub status: String,
    pub content_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<ContentSummary>>,
}

/// One path + method operation that matched a filter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMatch {
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_responses: Option<Vec<ResponseSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_responses: Option<Vec<ResponseSummary>>,
}

impl OperationMatch {
    /// Endpoint key, e.g. `GET /pets/{id}`
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Document-wide counts reported alongside match results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub project_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi_version: Option<String>,
    pub total_endpoints: usize,
    pub total_tags: usize,
    pub tags: Vec<String>,
}
