//! Operation matching
//!
//! Scans `paths` for templates containing a filter string and builds an
//! [`OperationMatch`] per operation, with summarized parameters, request
//! body and responses. Matching never mutates the document, so it can run
//! repeatedly against one cached copy.
//!
//! Swagger 2.0 payloads are mapped onto the same shape: `body` and
//! `formData` parameters become the request body, a response `schema`
//! becomes one content entry per `produces` media type.

use crate::services::resolver::overlay_ref;
use crate::services::summarizer::SchemaSummarizer;
use crate::types::*;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde_json::{Map, Value, json};

/// Status keys that are partitioned into success / error buckets
static STATUS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-5][0-9]{2}$").expect("valid status regex"));

/// Operation matcher bound to one document
pub struct OperationMatcher<'a> {
    document: &'a Value,
    summarizer: SchemaSummarizer<'a>,
    swagger2: bool,
}

impl<'a> OperationMatcher<'a> {
    pub fn new(document: &'a Value) -> Self {
        let swagger2 = document
            .get("swagger")
            .and_then(|v| v.as_str())
            .is_some_and(|v| v.starts_with("2."));
        Self {
            document,
            summarizer: SchemaSummarizer::new(document),
            swagger2,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.summarizer = self.summarizer.with_max_depth(max_depth);
        self
    }

    /// All operations whose path contains `path_filter` (case-insensitive),
    /// in document order with methods in [`HttpMethod::ALL`] order
    pub fn match_operations(&self, path_filter: &str) -> Vec<OperationMatch> {
        let filter = path_filter.to_lowercase();
        let Some(paths) = self.document.get("paths").and_then(|v| v.as_object()) else {
            return Vec::new();
        };

        let operations: Vec<(&String, &Map<String, Value>, HttpMethod, &Value)> = paths
            .iter()
            .filter(|(path, _)| path.to_lowercase().contains(&filter))
            .filter_map(|(path, item)| item.as_object().map(|obj| (path, obj)))
            .flat_map(|(path, item)| {
                HttpMethod::ALL.into_iter().filter_map(move |method| {
                    item.get(method.as_key())
                        .filter(|op| op.is_object())
                        .map(|op| (path, item, method, op))
                })
            })
            .collect();

        // Summaries are independent per operation; collect keeps input order
        operations
            .par_iter()
            .map(|(path, item, method, operation)| {
                self.build_match(path, item, *method, operation)
            })
            .collect()
    }

    fn build_match(
        &self,
        path: &str,
        path_item: &Map<String, Value>,
        method: HttpMethod,
        operation: &Value,
    ) -> OperationMatch {
        let text = |key: &str| {
            operation
                .get(key)
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        let tags: Vec<String> = operation
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let declared = self.declared_parameters(path_item.get("parameters"), operation);
        let parameters: Vec<ParameterSummary> = declared
            .iter()
            .filter_map(|param| self.summarize_parameter(param))
            .collect();
        let request_body = match operation.get("requestBody") {
            Some(body) => self.summarize_request_body(body),
            None if self.swagger2 => self.swagger2_request_body(&declared, operation),
            None => None,
        };
        let (success, errors) = self.summarize_responses(operation);

        OperationMatch {
            path: path.to_string(),
            method,
            summary: text("summary"),
            description: text("description"),
            operation_id: text("operationId"),
            tags: non_empty(tags),
            parameters: non_empty(parameters),
            request_body,
            success_responses: non_empty(success),
            error_responses: non_empty(errors),
        }
    }

    /// Resolved parameters, path-level first, overridden by operation
    /// parameters sharing the same name and location
    fn declared_parameters(&self, path_level: Option<&Value>, operation: &Value) -> Vec<Value> {
        let mut params: Vec<Value> = Vec::new();
        let declared = [path_level, operation.get("parameters")];

        for list in declared.into_iter().flatten().filter_map(|v| v.as_array()) {
            for raw in list {
                let param = overlay_ref(self.document, raw);
                let key = parameter_key(&param);
                match params
                    .iter_mut()
                    .find(|p| key.is_some() && parameter_key(p) == key)
                {
                    Some(existing) => *existing = param,
                    None => params.push(param),
                }
            }
        }

        params
    }

    fn summarize_parameter(&self, param: &Value) -> Option<ParameterSummary> {
        let name = param.get("name").and_then(|v| v.as_str());
        let location = param.get("in").and_then(|v| v.as_str());
        let (Some(name), Some(location)) = (name, location) else {
            tracing::debug!(parameter = %param, "dropping parameter without name or location");
            return None;
        };
        let Some(location) = ParameterLocation::parse(location) else {
            // 2.0 payload parameters are summarized as the request body
            if !(self.swagger2 && matches!(location, "body" | "formData")) {
                tracing::debug!(name, location, "dropping parameter with unsupported location");
            }
            return None;
        };

        let schema = match param.get("schema") {
            Some(schema) => self.summarizer.summarize(schema),
            None if self.swagger2 => self.summarizer.summarize(&inline_schema(param)),
            None => None,
        };

        Some(ParameterSummary {
            name: name.to_string(),
            location,
            required: param.get("required").and_then(|v| v.as_bool()),
            description: param
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            schema,
        })
    }

    fn summarize_request_body(&self, raw: &Value) -> Option<RequestBodySummary> {
        let body = overlay_ref(self.document, raw);
        let body = body.as_object()?;
        let (content_types, contents) = self.summarize_content(body.get("content"));

        Some(RequestBodySummary {
            required: body
                .get("required")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            content_types,
            description: body
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            contents: non_empty(contents),
        })
    }

    /// 2.0 request body from the `body` parameter, or from `formData`
    /// parameters folded into one object schema
    fn swagger2_request_body(
        &self,
        params: &[Value],
        operation: &Value,
    ) -> Option<RequestBodySummary> {
        let location = |p: &Value| p.get("in").and_then(|v| v.as_str()).map(String::from);

        if let Some(body) = params.iter().find(|p| location(p).as_deref() == Some("body")) {
            let content_types = self.media_types(operation, "consumes", "application/json");
            let contents = self.shared_contents(body.get("schema"), &content_types, None);
            return Some(RequestBodySummary {
                required: body
                    .get("required")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                content_types,
                description: body
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                contents: non_empty(contents),
            });
        }

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in params
            .iter()
            .filter(|p| location(p).as_deref() == Some("formData"))
        {
            let Some(name) = field.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            let mut schema = inline_schema(field);
            if let (Some(description), Some(obj)) =
                (field.get("description"), schema.as_object_mut())
            {
                obj.insert("description".to_string(), description.clone());
            }
            properties.insert(name.to_string(), schema);
            if field.get("required").and_then(|v| v.as_bool()) == Some(true) {
                required.push(Value::String(name.to_string()));
            }
        }
        if properties.is_empty() {
            return None;
        }

        let body_required = !required.is_empty();
        let form = json!({"type": "object", "properties": properties, "required": required});
        let content_types =
            self.media_types(operation, "consumes", "application/x-www-form-urlencoded");
        let contents = self.shared_contents(Some(&form), &content_types, None);

        Some(RequestBodySummary {
            required: body_required,
            content_types,
            description: None,
            contents: non_empty(contents),
        })
    }

    /// Split responses into (2xx/3xx, 4xx/5xx); other keys are ignored
    fn summarize_responses(
        &self,
        operation: &Value,
    ) -> (Vec<ResponseSummary>, Vec<ResponseSummary>) {
        let mut success = Vec::new();
        let mut errors = Vec::new();

        let Some(responses) = operation.get("responses").and_then(|v| v.as_object()) else {
            return (success, errors);
        };

        for (status, raw) in responses {
            if !STATUS_CODE.is_match(status) {
                continue;
            }
            let bucket = match status.as_bytes()[0] {
                b'2' | b'3' => &mut success,
                b'4' | b'5' => &mut errors,
                _ => continue,
            };

            let response = overlay_ref(self.document, raw);
            let Some(response) = response.as_object() else {
                continue;
            };
            let (content_types, contents) = match response.get("schema") {
                Some(schema) if self.swagger2 => {
                    let types = self.media_types(operation, "produces", "application/json");
                    let examples = response.get("examples").and_then(|v| v.as_object());
                    let contents = self.shared_contents(Some(schema), &types, examples);
                    (types, contents)
                }
                _ => self.summarize_content(response.get("content")),
            };

            bucket.push(ResponseSummary {
                status: status.clone(),
                content_types,
                description: response
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                contents: non_empty(contents),
            });
        }

        (success, errors)
    }

    /// Content types in declaration order plus per-type summaries
    fn summarize_content(&self, content: Option<&Value>) -> (Vec<String>, Vec<ContentSummary>) {
        let Some(content) = content.and_then(|v| v.as_object()) else {
            return (Vec::new(), Vec::new());
        };

        let content_types = content.keys().cloned().collect();
        let contents = content
            .iter()
            .map(|(content_type, media)| ContentSummary {
                content_type: content_type.clone(),
                schema: media
                    .get("schema")
                    .and_then(|schema| self.summarizer.summarize(schema)),
                example: media.get("example").cloned(),
                examples: media
                    .get("examples")
                    .and_then(|v| v.as_object())
                    .map(|examples| self.example_values(examples))
                    .filter(|examples| !examples.is_empty()),
            })
            .collect();

        (content_types, contents)
    }

    /// 2.0 `consumes` / `produces`, operation first, then document level
    fn media_types(&self, operation: &Value, key: &str, fallback: &str) -> Vec<String> {
        let declared: Vec<String> = operation
            .get(key)
            .or_else(|| self.document.get(key))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        if declared.is_empty() {
            vec![fallback.to_string()]
        } else {
            declared
        }
    }

    /// One schema shared by every media type; 2.0 examples are keyed by media type
    fn shared_contents(
        &self,
        schema: Option<&Value>,
        content_types: &[String],
        examples: Option<&Map<String, Value>>,
    ) -> Vec<ContentSummary> {
        let schema = schema.and_then(|schema| self.summarizer.summarize(schema));
        content_types
            .iter()
            .map(|content_type| ContentSummary {
                content_type: content_type.clone(),
                schema: schema.clone(),
                example: examples.and_then(|e| e.get(content_type)).cloned(),
                examples: None,
            })
            .collect()
    }

    fn example_values(&self, examples: &Map<String, Value>) -> Map<String, Value> {
        examples
            .iter()
            .map(|(name, example)| {
                let example = overlay_ref(self.document, example);
                let value = match example.get("value") {
                    Some(value) => value.clone(),
                    None => example,
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// Convenience entry point for a one-off match
pub fn match_operations(document: &Value, path_filter: &str) -> Vec<OperationMatch> {
    OperationMatcher::new(document).match_operations(path_filter)
}

fn parameter_key(param: &Value) -> Option<(&str, &str)> {
    Some((
        param.get("name")?.as_str()?,
        param.get("in")?.as_str()?,
    ))
}

/// 2.0 non-body parameters declare their schema keywords inline
fn inline_schema(param: &Value) -> Value {
    let mut schema = param.as_object().cloned().unwrap_or_default();
    for key in ["name", "in", "required", "description", "allowEmptyValue", "collectionFormat"] {
        schema.remove(key);
    }
    Value::Object(schema)
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "paths": {
                "/Pets": {
                    "parameters": [
                        {"name": "X-Trace", "in": "header", "description": "Trace id"}
                    ],
                    "get": {
                        "operationId": "listPets",
                        "tags": ["pets"],
                        "parameters": [
                            {"$ref": "#/components/parameters/Limit"},
                            {"$ref": "#/components/parameters/Limit", "description": "Page size"},
                            {"name": "X-Trace", "in": "header", "required": true},
                            {"in": "query"},
                            {"name": "body", "in": "body"}
                        ],
                        "responses": {
                            "200": {
                                "description": "A list of pets",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Pet"}
                                        }
                                    }
                                }
                            },
                            "404": {"$ref": "#/components/responses/NotFound"},
                            "default": {"description": "Unexpected error"}
                        }
                    },
                    "post": {
                        "operationId": "createPet",
                        "requestBody": {"$ref": "#/components/requestBodies/NewPet"},
                        "responses": {"201": {"description": "Created"}}
                    },
                    "x-extension": {"note": "ignored"}
                },
                "/Orders": {
                    "get": {"operationId": "listOrders", "responses": {}}
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": {"type": "string"},
                            "tag": {"type": "string"}
                        }
                    }
                },
                "parameters": {
                    "Limit": {
                        "name": "limit",
                        "in": "query",
                        "description": "How many items to return",
                        "schema": {"type": "integer", "format": "int32"}
                    }
                },
                "responses": {
                    "NotFound": {
                        "description": "Not found",
                        "content": {"application/json": {"example": null}}
                    }
                },
                "requestBodies": {
                    "NewPet": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Pet"},
                                "examples": {
                                    "raw": {"name": "Tom"},
                                    "dog": {"value": {"name": "Rex"}}
                                }
                            },
                            "application/xml": {}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let doc = petstore();
        let matches = match_operations(&doc, "pet");
        assert!(matches.iter().all(|m| m.path == "/Pets"));
        assert_eq!(matches.len(), 2);

        let methods: Vec<_> = matches.iter().map(|m| m.method).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post]);

        assert_eq!(match_operations(&doc, "").len(), 3);
        assert!(match_operations(&doc, "/users").is_empty());
    }

    #[test]
    fn test_status_partition() {
        let doc = petstore();
        let matches = match_operations(&doc, "/pets");
        let list = &matches[0];

        let success = list.success_responses.as_ref().unwrap();
        let errors = list.error_responses.as_ref().unwrap();
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].status, "200");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, "404");
        assert_eq!(errors[0].description.as_deref(), Some("Not found"));

        let not_found = &errors[0].contents.as_ref().unwrap()[0];
        assert_eq!(not_found.example, Some(Value::Null));
    }

    #[test]
    fn test_parameters_resolve_and_override() {
        let doc = petstore();
        let matches = match_operations(&doc, "/pets");
        let params = matches[0].parameters.as_ref().unwrap();

        // Header from the path item, then limit; nameless and body params dropped
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["X-Trace", "limit"]);

        assert_eq!(params[0].required, Some(true));
        assert!(params[0].description.is_none());

        let limit = &params[1];
        assert_eq!(limit.location, ParameterLocation::Query);
        assert_eq!(limit.description.as_deref(), Some("Page size"));
        let schema = limit.schema.as_ref().unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("integer"));
        assert_eq!(schema.format.as_deref(), Some("int32"));
    }

    #[test]
    fn test_response_items_schema() {
        let doc = petstore();
        let matches = match_operations(&doc, "/pets");
        let ok = &matches[0].success_responses.as_ref().unwrap()[0];
        assert_eq!(ok.content_types, vec!["application/json"]);

        let schema = ok.contents.as_ref().unwrap()[0].schema.as_ref().unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("array"));
        assert_eq!(schema.items_type.as_deref(), Some("object"));
        let items = schema.items_schema.as_ref().unwrap();
        assert_eq!(items.reference.as_deref(), Some("#/components/schemas/Pet"));
        assert!(items.property("name").unwrap().required);
    }

    #[test]
    fn test_request_body_ref() {
        let doc = petstore();
        let matches = match_operations(&doc, "/pets");
        let create = &matches[1];
        assert_eq!(create.operation_id.as_deref(), Some("createPet"));

        let body = create.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content_types, vec!["application/json", "application/xml"]);

        let contents = body.contents.as_ref().unwrap();
        assert_eq!(contents.len(), 2);
        let examples = contents[0].examples.as_ref().unwrap();
        assert_eq!(examples["dog"], json!({"name": "Rex"}));
        assert_eq!(examples["raw"], json!({"name": "Tom"}));
        // Declaration order is kept
        let names: Vec<_> = examples.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["raw", "dog"]);
        assert!(contents[1].schema.is_none());
    }

    #[test]
    fn test_empty_sections_are_absent() {
        let doc = petstore();
        let matches = match_operations(&doc, "orders");
        assert_eq!(matches.len(), 1);
        let orders = &matches[0];
        assert!(orders.parameters.is_none());
        assert!(orders.request_body.is_none());
        assert!(orders.success_responses.is_none());
        assert!(orders.error_responses.is_none());
        assert!(orders.tags.is_none());
    }

    #[test]
    fn test_document_without_paths() {
        assert!(match_operations(&json!({"openapi": "3.0.0"}), "").is_empty());
        assert!(match_operations(&json!({"paths": []}), "").is_empty());
    }

    fn swagger2_petstore() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "produces": ["application/json"],
            "paths": {
                "/pets": {
                    "get": {
                        "parameters": [
                            {"name": "limit", "in": "query", "type": "integer", "format": "int32"}
                        ],
                        "responses": {
                            "200": {
                                "description": "Pets",
                                "schema": {
                                    "type": "array",
                                    "items": {"$ref": "#/definitions/Pet"}
                                },
                                "examples": {"application/json": [{"name": "Rex"}]}
                            }
                        }
                    },
                    "post": {
                        "consumes": ["application/json", "application/xml"],
                        "parameters": [
                            {
                                "name": "pet",
                                "in": "body",
                                "required": true,
                                "description": "Pet to add",
                                "schema": {"$ref": "#/definitions/Pet"}
                            }
                        ],
                        "responses": {
                            "200": {"description": "Created", "schema": {"$ref": "#/definitions/Pet"}}
                        }
                    }
                },
                "/pets/{id}/photo": {
                    "post": {
                        "consumes": ["multipart/form-data"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "type": "string"},
                            {"name": "file", "in": "formData", "required": true, "type": "file"},
                            {"name": "caption", "in": "formData", "type": "string", "description": "Shown below"}
                        ],
                        "responses": {"204": {"description": "Uploaded"}}
                    }
                }
            },
            "definitions": {
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {"name": {"type": "string"}}
                }
            }
        })
    }

    #[test]
    fn test_swagger2_body_and_response_schema() {
        let doc = swagger2_petstore();
        let matches = match_operations(&doc, "/pets");

        let list = &matches[0];
        let limit = &list.parameters.as_ref().unwrap()[0];
        let limit_schema = limit.schema.as_ref().unwrap();
        assert_eq!(limit_schema.schema_type.as_deref(), Some("integer"));
        assert_eq!(limit_schema.format.as_deref(), Some("int32"));

        let ok = &list.success_responses.as_ref().unwrap()[0];
        assert_eq!(ok.content_types, vec!["application/json"]);
        let content = &ok.contents.as_ref().unwrap()[0];
        assert_eq!(content.example, Some(json!([{"name": "Rex"}])));
        let schema = content.schema.as_ref().unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("array"));
        assert_eq!(schema.items_type.as_deref(), Some("object"));

        let create = &matches[1];
        assert!(create.parameters.is_none());
        let body = create.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.description.as_deref(), Some("Pet to add"));
        assert_eq!(body.content_types, vec!["application/json", "application/xml"]);
        let contents = body.contents.as_ref().unwrap();
        assert_eq!(contents.len(), 2);
        let pet = contents[1].schema.as_ref().unwrap();
        assert_eq!(pet.reference.as_deref(), Some("#/definitions/Pet"));
        assert!(pet.property("name").unwrap().required);

        let created = &create.success_responses.as_ref().unwrap()[0];
        assert_eq!(created.content_types, vec!["application/json"]);
    }

    #[test]
    fn test_swagger2_form_data_becomes_object_body() {
        let doc = swagger2_petstore();
        let matches = match_operations(&doc, "/photo");
        let upload = &matches[0];

        let params = upload.parameters.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].location, ParameterLocation::Path);

        let body = upload.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content_types, vec!["multipart/form-data"]);
        let form = body.contents.as_ref().unwrap()[0].schema.as_ref().unwrap();
        assert_eq!(form.schema_type.as_deref(), Some("object"));
        assert!(form.property("file").unwrap().required);
        let caption = form.property("caption").unwrap();
        assert!(!caption.required);
        assert_eq!(caption.description.as_deref(), Some("Shown below"));
    }

    #[test]
    fn test_body_parameter_ignored_outside_swagger2() {
        let doc = petstore();
        let matches = match_operations(&doc, "/pets");
        assert!(matches[0].request_body.is_none());
    }
}
