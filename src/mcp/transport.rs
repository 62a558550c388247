//! Client-side transport contract.
//!
//! The chat client only needs to list tools and call them. Anything that can
//! carry a JSON-RPC request to the tool server and bring back its reply can
//! implement this; the in-process link is the one the app uses.

use async_trait::async_trait;
use rust_mcp_schema::schema_utils::{RequestFromClient, ServerMessage};
use rust_mcp_schema::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams, Tool,
};
use serde_json::{Map, Value};

use super::protocol::{parse_call_tool, parse_list_tools};

/// Upper bound on `tools/list` pages followed before giving up.
const MAX_TOOL_PAGES: usize = 16;

#[async_trait]
pub trait McpTransport: Send + Sync {
    async fn send_request(&self, request: RequestFromClient) -> Result<ServerMessage, String>;

    async fn list_tools_page(&self, cursor: Option<String>) -> Result<ListToolsResult, String> {
        let params = cursor.map(|cursor| PaginatedRequestParams {
            cursor: Some(cursor),
            meta: None,
        });
        let response = self
            .send_request(RequestFromClient::ListToolsRequest(params))
            .await?;
        parse_list_tools(response)
    }

    /// Follows `nextCursor` until the server stops returning one.
    async fn list_tools(&self) -> Result<Vec<Tool>, String> {
        let mut tools = Vec::new();
        let mut cursor = None;
        for _ in 0..MAX_TOOL_PAGES {
            let page = self.list_tools_page(cursor.take()).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
        Ok(tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, String> {
        let mut params = CallToolRequestParams::new(name);
        if let Some(arguments) = arguments {
            params = params.with_arguments(arguments);
        }
        let response = self
            .send_request(RequestFromClient::CallToolRequest(params))
            .await?;
        parse_call_tool(response)
    }
}
