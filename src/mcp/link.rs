//! In-process transport link.
//!
//! The tool server and the chat client talk JSON-RPC over a pair of
//! in-memory pipes, exactly as they would over a child process's stdio, so
//! the client never calls tool code directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_schema::schema_utils::{
    ClientMessage, FromMessage, MessageFromClient, NotificationFromClient, RequestFromClient,
    ServerMessage,
};
use rust_mcp_schema::{
    ClientCapabilities, Implementation, InitializeRequestParams, InitializeResult, RequestId,
    LATEST_PROTOCOL_VERSION,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, warn};

use super::protocol::parse_initialize_result;
use super::server::ToolServer;
use super::transport::McpTransport;

const LINK_BUFFER_BYTES: usize = 64 * 1024;

type PendingRequests = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ServerMessage>>>>;
type LinkWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct LinkedClient {
    writer: Mutex<LinkWriter>,
    pending: PendingRequests,
    next_request_id: AtomicI64,
    server_details: RwLock<Option<InitializeResult>>,
}

/// Spawns `server` on one end of an in-memory pipe and returns an
/// initialized client on the other.
pub async fn start_linked(server: Arc<ToolServer>) -> Result<Arc<LinkedClient>, String> {
    let (client_side, server_side) = tokio::io::duplex(LINK_BUFFER_BYTES);

    let (server_reader, server_writer) = tokio::io::split(server_side);
    tokio::spawn(async move {
        if let Err(err) = server.serve(server_reader, server_writer).await {
            warn!(error = %err, "Linked tool server stopped");
        }
    });

    let (client_reader, client_writer) = tokio::io::split(client_side);
    let client = LinkedClient::connect(client_reader, client_writer);
    client.initialize(client_details()).await?;
    Ok(client)
}

fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "kratts".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("Kratts Assistant".to_string()),
            description: Some("Wild Kratts chat assistant".to_string()),
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
    }
}

impl LinkedClient {
    pub fn connect<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let client = Arc::new(Self {
            writer: Mutex::new(Box::new(writer)),
            pending: pending.clone(),
            next_request_id: AtomicI64::new(0),
            server_details: RwLock::new(None),
        });
        Self::spawn_reader(pending, reader);
        client
    }

    fn spawn_reader<R>(pending: PendingRequests, reader: R)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<ServerMessage>(&line) {
                    Ok(message) => Self::dispatch_message(&pending, message).await,
                    Err(err) => debug!(error = %err, "Ignoring unparseable link message"),
                }
            }
            // Dropping the senders fails every request still waiting.
            pending.lock().await.clear();
        });
    }

    async fn dispatch_message(pending: &PendingRequests, message: ServerMessage) {
        let id = match &message {
            ServerMessage::Response(response) => Some(response.id.clone()),
            ServerMessage::Error(error) => {
                debug!(error_id = ?error.id, error_code = error.error.code, "Received link error");
                error.id.clone()
            }
            ServerMessage::Request(_) | ServerMessage::Notification(_) => {
                debug!("Ignoring server-initiated link message");
                None
            }
        };
        if let Some(id) = id {
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(message);
            }
        }
    }

    fn next_request_id(&self) -> RequestId {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        RequestId::Integer(id)
    }

    async fn write_message(&self, message: &ClientMessage) -> Result<(), String> {
        let payload = serde_json::to_string(message).map_err(|err| err.to_string())?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(payload.as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        writer.write_all(b"\n").await.map_err(|err| err.to_string())?;
        writer.flush().await.map_err(|err| err.to_string())
    }

    async fn send_notification(&self, notification: NotificationFromClient) -> Result<(), String> {
        let message = ClientMessage::from_message(
            MessageFromClient::NotificationFromClient(notification),
            None,
        )
        .map_err(|err| err.to_string())?;
        self.write_message(&message).await
    }

    pub async fn initialize(
        &self,
        details: InitializeRequestParams,
    ) -> Result<InitializeResult, String> {
        let response = self
            .send_request(RequestFromClient::InitializeRequest(details))
            .await?;
        let result = parse_initialize_result(response)?;
        debug!(
            server = %result.server_info.name,
            protocol_version = %result.protocol_version,
            "Link initialized"
        );
        *self.server_details.write().await = Some(result.clone());
        self.send_notification(NotificationFromClient::InitializedNotification(None))
            .await?;
        Ok(result)
    }

    pub async fn server_details(&self) -> Option<InitializeResult> {
        self.server_details.read().await.clone()
    }
}

#[async_trait]
impl McpTransport for LinkedClient {
    async fn send_request(&self, request: RequestFromClient) -> Result<ServerMessage, String> {
        let request_id = self.next_request_id();
        debug!(request_id = ?request_id, "Sending link request");
        let message = ClientMessage::from_message(
            MessageFromClient::RequestFromClient(request),
            Some(request_id.clone()),
        )
        .map_err(|err| err.to_string())?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        if let Err(err) = self.write_message(&message).await {
            self.pending.lock().await.remove(&request_id);
            return Err(err);
        }

        rx.await
            .map_err(|_| "Tool server link closed.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::first_text_content;
    use crate::mcp::server::maps::logging_map_handler;
    use crate::mcp::server::upstream::UpstreamClient;
    use crate::mcp::{SERVER_NAME, VIEW_LOCATION_TOOL};

    fn tool_server() -> Arc<ToolServer> {
        let upstream = UpstreamClient::new(
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
        )
        .expect("client should build");
        Arc::new(ToolServer::new(upstream, logging_map_handler()).expect("server should build"))
    }

    #[tokio::test]
    async fn linked_client_initializes_and_lists_tools() {
        let client = start_linked(tool_server()).await.expect("link should start");

        let details = client.server_details().await.expect("initialized");
        assert_eq!(details.server_info.name, SERVER_NAME);

        let tools = client.list_tools().await.expect("tools/list");
        assert_eq!(tools.len(), 5);
        assert!(tools.iter().all(|tool| tool.description.is_some()));
    }

    #[tokio::test]
    async fn linked_client_calls_tools_and_surfaces_rpc_errors() {
        let client = start_linked(tool_server()).await.expect("link should start");

        let mut arguments = serde_json::Map::new();
        arguments.insert("query".to_string(), serde_json::json!("Amazon rainforest"));
        let result = client
            .call_tool(VIEW_LOCATION_TOOL, Some(arguments))
            .await
            .expect("tool call");
        assert_eq!(
            first_text_content(&result).as_deref(),
            Some("Information for location: Amazon rainforest would be processed.")
        );

        let err = client
            .call_tool(VIEW_LOCATION_TOOL, None)
            .await
            .expect_err("missing query should fail validation");
        assert!(err.starts_with("MCP error -32602"), "{err}");
    }

    #[tokio::test]
    async fn closed_link_fails_pending_requests() {
        let (client_side, server_side) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(client_side);
        let client = LinkedClient::connect(reader, writer);
        drop(server_side);

        let err = client
            .send_request(RequestFromClient::PingRequest(None))
            .await
            .expect_err("closed link");
        assert!(!err.is_empty());
    }
}
