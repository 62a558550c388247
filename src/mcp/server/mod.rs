//! The tool server: five domain tools behind a newline-delimited JSON-RPC
//! loop. It runs over any async byte stream, so the same server backs the
//! in-process link and `kratts serve` on stdio.

pub mod episodes;
pub mod maps;
pub mod products;
pub mod upstream;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use rust_mcp_schema::{Tool, ToolInputSchema, LATEST_PROTOCOL_VERSION};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::mcp::{
    DIRECTIONS_TOOL, EPISODES_TOOL, JSONRPC_INTERNAL_ERROR, JSONRPC_INVALID_PARAMS,
    JSONRPC_INVALID_REQUEST, JSONRPC_METHOD_NOT_FOUND, JSONRPC_PARSE_ERROR, PRODUCTS_TOOL,
    SEARCH_MAPS_TOOL, SERVER_NAME, VIEW_LOCATION_TOOL,
};
use episodes::{get_episodes, EpisodeQuery, EPISODES_TOOL_DESCRIPTION};
use maps::{MapQuery, MapQueryHandler};
use products::{get_products, ProductQuery, PRODUCTS_TOOL_DESCRIPTION};
use upstream::UpstreamClient;

/// JSON-RPC error raised while handling one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub code: i64,
    pub message: String,
}

impl ToolError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub struct ToolServer {
    upstream: UpstreamClient,
    map_handler: MapQueryHandler,
    tools: Vec<Tool>,
    validators: HashMap<String, jsonschema::Validator>,
}

impl ToolServer {
    pub fn new(upstream: UpstreamClient, map_handler: MapQueryHandler) -> Result<Self, String> {
        let mut tools = Vec::new();
        let mut validators = HashMap::new();

        for (name, description, schema) in tool_definitions() {
            let validator = jsonschema::validator_for(&schema)
                .map_err(|err| format!("Invalid input schema for {name}: {err}"))?;
            let input_schema = serde_json::from_value::<ToolInputSchema>(schema)
                .map_err(|err| format!("Invalid input schema for {name}: {err}"))?;
            validators.insert(name.to_string(), validator);
            tools.push(Tool {
                annotations: None,
                description: Some(description.to_string()),
                execution: None,
                icons: Vec::new(),
                input_schema,
                meta: None,
                name: name.to_string(),
                output_schema: None,
                title: None,
            });
        }

        Ok(Self {
            upstream,
            map_handler,
            tools,
            validators,
        })
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Reads requests line by line until EOF, answering each in order.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.map_err(|err| err.to_string())? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let payload = serde_json::to_string(&response).map_err(|err| err.to_string())?;
            writer
                .write_all(payload.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            writer.write_all(b"\n").await.map_err(|err| err.to_string())?;
            writer.flush().await.map_err(|err| err.to_string())?;
        }
        debug!("Tool server input closed");
        Ok(())
    }

    /// Handles one JSON-RPC line. Notifications and stray responses yield no
    /// reply.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let message = match serde_json::from_str::<Value>(line) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "Unparseable JSON-RPC line");
                return Some(error_response(
                    Value::Null,
                    ToolError::new(JSONRPC_PARSE_ERROR, "Parse error"),
                ));
            }
        };
        let Some(object) = message.as_object() else {
            return Some(error_response(
                Value::Null,
                ToolError::new(JSONRPC_INVALID_REQUEST, "Invalid Request"),
            ));
        };

        let id = object.get("id").cloned();
        let Some(method) = object.get("method").and_then(Value::as_str) else {
            // A response to something we never sent, or garbage without an id.
            return id.map(|id| {
                error_response(id, ToolError::new(JSONRPC_INVALID_REQUEST, "Invalid Request"))
            });
        };
        let Some(id) = id else {
            debug!(method, "Received notification");
            return None;
        };

        let params = object.get("params").cloned().unwrap_or(Value::Null);
        debug!(method, request_id = %id, "Handling request");
        Some(match self.dispatch(method, params).await {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(error) => error_response(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(LATEST_PROTOCOL_VERSION),
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools })),
            "tools/call" => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ToolError::new(JSONRPC_INVALID_PARAMS, "Missing tool name"))?;
                let arguments = match params.get("arguments") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(arguments)) => arguments.clone(),
                    Some(_) => {
                        return Err(ToolError::new(
                            JSONRPC_INVALID_PARAMS,
                            "Tool arguments must be an object",
                        ))
                    }
                };
                let text = self.call_tool(name, arguments).await?;
                Ok(json!({ "content": [{ "type": "text", "text": text }] }))
            }
            other => Err(ToolError::new(
                JSONRPC_METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    /// Validates the arguments, then runs the tool. Returns the tool's text.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<String, ToolError> {
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| ToolError::new(JSONRPC_INVALID_PARAMS, format!("Unknown tool: {name}")))?;

        let instance = Value::Object(arguments);
        let problems: Vec<String> = validator
            .iter_errors(&instance)
            .map(|err| err.to_string())
            .collect();
        if !problems.is_empty() {
            debug!(tool = name, ?problems, "Rejected tool arguments");
            return Err(ToolError::new(
                JSONRPC_INVALID_PARAMS,
                format!("Invalid arguments for tool {name}: {}", problems.join("; ")),
            ));
        }
        let Value::Object(arguments) = instance else {
            return Err(ToolError::new(JSONRPC_INVALID_PARAMS, "Tool arguments must be an object"));
        };

        debug!(tool = name, "Calling tool");
        match name {
            PRODUCTS_TOOL => {
                let payload =
                    get_products(&self.upstream, &ProductQuery::from_arguments(&arguments)).await;
                serde_json::to_string(&payload)
                    .map_err(|err| ToolError::new(JSONRPC_INTERNAL_ERROR, err.to_string()))
            }
            EPISODES_TOOL => {
                let payload =
                    get_episodes(&self.upstream, &EpisodeQuery::from_arguments(&arguments)).await;
                Ok(payload.to_string())
            }
            _ => {
                let query = MapQuery::from_call(name, &arguments).ok_or_else(|| {
                    ToolError::new(JSONRPC_INVALID_PARAMS, format!("Unknown tool: {name}"))
                })?;
                let confirmation = query.confirmation();
                (self.map_handler)(query);
                Ok(confirmation)
            }
        }
    }
}

fn error_response(id: Value, error: ToolError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message },
    })
}

fn tool_definitions() -> Vec<(&'static str, &'static str, Value)> {
    let string = || json!({ "type": "string" });
    let string_list = || json!({ "type": "array", "items": { "type": "string" } });

    vec![
        (
            VIEW_LOCATION_TOOL,
            "View a specific query or geographical location. Returns textual confirmation.",
            json!({
                "type": "object",
                "properties": { "query": string() },
                "required": ["query"],
            }),
        ),
        (
            SEARCH_MAPS_TOOL,
            "Search for places near a location. Returns textual confirmation.",
            json!({
                "type": "object",
                "properties": { "search": string() },
                "required": ["search"],
            }),
        ),
        (
            DIRECTIONS_TOOL,
            "Get directions from an origin to a destination. Returns textual confirmation.",
            json!({
                "type": "object",
                "properties": { "origin": string(), "destination": string() },
                "required": ["origin", "destination"],
            }),
        ),
        (
            PRODUCTS_TOOL,
            PRODUCTS_TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "searchTerm": string(),
                    "category": string(),
                    "page": { "type": "integer", "minimum": 1, "default": 1 },
                },
                "required": [],
            }),
        ),
        (
            EPISODES_TOOL,
            EPISODES_TOOL_DESCRIPTION,
            json!({
                "type": "object",
                "properties": {
                    "seasonNumber": { "type": "number" },
                    "episodeTitle": string(),
                    "animalsFeatured": string_list(),
                    "fields": string_list(),
                },
                "required": [],
            }),
        ),
    ]
}
