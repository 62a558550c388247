//! HTTP front for the tool server: `POST /mcp` takes one JSON-RPC message
//! per request body, plus `GET /health` and `GET /tools` for deployments
//! that probe the service without speaking MCP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::server::ToolServer;
use super::SERVER_NAME;

pub fn router(server: Arc<ToolServer>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/mcp", post(handle_rpc))
        .with_state(server)
}

/// Binds `addr` and serves until the listener fails.
pub async fn serve_http(
    server: Arc<ToolServer>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Tool server listening over HTTP");
    axum::serve(listener, router(server)).await?;
    Ok(())
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": { "health": "/health", "mcp": "/mcp", "tools": "/tools" },
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Tool names with their argument names, for humans and health probes.
async fn list_tools(State(server): State<Arc<ToolServer>>) -> Json<Value> {
    let tools: Vec<Value> = server
        .tools()
        .iter()
        .map(|tool| {
            let schema = serde_json::to_value(&tool.input_schema).unwrap_or_default();
            let mut parameters: Vec<String> = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|properties| properties.keys().cloned().collect())
                .unwrap_or_default();
            parameters.sort();
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters,
            })
        })
        .collect();
    Json(json!({ "tools": tools }))
}

async fn handle_rpc(State(server): State<Arc<ToolServer>>, body: String) -> Response {
    match server.handle_line(&body).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => {
            debug!("Accepted JSON-RPC notification over HTTP");
            StatusCode::ACCEPTED.into_response()
        }
    }
}
