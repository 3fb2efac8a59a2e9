//! MCP server over stdio
//!
//! Newline-delimited JSON-RPC 2.0: one request per stdin line, one response
//! per stdout line. Logs go to stderr.

use crate::services::DocumentLoader;
use crate::tools::{InfoInput, SearchInput, get_info, search_operations};
use crate::types::ServerConfig;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "api-docs-mcp";

const SEARCH_TOOL: &str = "search_api_docs";
const INFO_TOOL: &str = "api_docs_info";

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }
}

pub struct McpServer {
    config: ServerConfig,
    loader: DocumentLoader,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        let loader = DocumentLoader::new(&config.source);
        Self { config, loader }
    }

    /// Server over an already constructed loader
    pub fn with_loader(config: ServerConfig, loader: DocumentLoader) -> Self {
        Self { config, loader }
    }

    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        let mut lines = BufReader::new(io::stdin()).lines();
        let mut stdout = io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(&line).await {
                let mut payload = response.to_string();
                payload.push('\n');
                stdout.write_all(payload.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw message; `None` for notifications
    pub async fn handle_message(&self, raw: &str) -> Option<Value> {
        let incoming: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "unparsable message");
                return Some(error_response(Value::Null, RpcError::parse_error(e.to_string())));
            }
        };

        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        let id = obj.get("id").cloned();
        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            return id.map(|id| {
                error_response(id, RpcError::invalid_request("Missing 'method'"))
            });
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        let Some(id) = id else {
            tracing::debug!(method, "notification");
            return None;
        };

        Some(match self.handle_request(method, params).await {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err(err) => error_response(id, err),
        })
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false}
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": format!(
                "Call {INFO_TOOL} for an overview of {}, then {SEARCH_TOOL} with a path fragment \
                 to inspect parameters, request bodies and responses.",
                self.config.source
            )
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::debug!(tool = name, "tools/call");
        match name {
            SEARCH_TOOL => {
                let input: SearchInput = parse_arguments(args)?;
                let output = search_operations(&self.loader, &self.config, input).await;
                tool_result(output.success, &output)
            }
            INFO_TOOL => {
                let input: InfoInput = parse_arguments(args)?;
                let output = get_info(&self.loader, input).await;
                tool_result(output.success, &output)
            }
            other => Err(RpcError::invalid_params(format!("Unknown tool: {other}"))),
        }
    }
}

fn parse_arguments<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, RpcError> {
    serde_json::from_value(args).map_err(|e| RpcError::invalid_params(e.to_string()))
}

fn tool_result<T: Serialize>(success: bool, output: &T) -> Result<Value, RpcError> {
    let text = serde_json::to_string_pretty(output).map_err(|e| RpcError::internal(e.to_string()))?;
    Ok(json!({
        "content": [{"type": "text", "text": text}],
        "isError": !success
    }))
}

fn tools_list_payload() -> Value {
    json!({
        "tools": [
            {
                "name": SEARCH_TOOL,
                "description": "Find API operations whose path contains a fragment (case-insensitive) \
                                and summarize their parameters, request body and responses.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Path fragment, e.g. /pets"},
                        "method": {"type": "string", "description": "Optional HTTP method filter"},
                        "tag": {"type": "string", "description": "Optional tag filter"},
                        "limit": {"type": "integer", "minimum": 1},
                        "offset": {"type": "integer", "minimum": 0}
                    },
                    "required": ["path"]
                }
            },
            {
                "name": INFO_TOOL,
                "description": "Title, endpoint count and tags of the API documentation.",
                "inputSchema": {"type": "object", "properties": {}}
            }
        ]
    })
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": err.code, "message": err.message}
    })
}
