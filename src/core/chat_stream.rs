//! Streaming chat session with tool dispatch.
//!
//! A turn is one or more streamed chat completions. When a completion ends
//! with tool calls, each call goes to the tool server over the MCP transport
//! and its result is fed back for the next completion. Everything the turn
//! produces comes out as one ordered stream of [`ChatEvent`]s.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{
    ChatMessage, ChatRequest, ChatResponse, ChatToolCall, ChatToolCallFunction,
    ChatToolDefinition,
};
use crate::core::message::{ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER};
use crate::mcp::protocol::first_text_content;
use crate::mcp::transport::McpTransport;
use crate::utils::url::construct_api_url;

/// One step of a streamed turn, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    TextDelta(String),
    ToolCall(ToolInvocation),
    ToolResult(ToolResultEvent),
    Error(String),
}

/// A tool call the model asked for. Informational only.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolResultEvent {
    pub name: String,
    /// Text of the first text content block, if the result had one.
    pub text: Option<String>,
    pub is_error: bool,
}

/// Anything that can turn a user message into a stream of chat events.
pub trait ConversationBackend: Send + Sync {
    fn stream_reply(&self, message: &str) -> BoxStream<'static, ChatEvent>;
}

#[derive(Clone)]
pub struct ChatSettings {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tool_rounds: usize,
    pub system_instructions: String,
}

/// A long-lived conversation bound to one system instruction and one tool
/// server. History persists across turns.
pub struct ChatSession {
    settings: Arc<ChatSettings>,
    transport: Arc<dyn McpTransport>,
    tools: Arc<Vec<ChatToolDefinition>>,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatSession {
    /// Lists the server's tools once and seeds the history with the system
    /// instruction.
    pub async fn connect(
        settings: ChatSettings,
        transport: Arc<dyn McpTransport>,
    ) -> Result<Self, String> {
        let tools: Vec<ChatToolDefinition> = transport
            .list_tools()
            .await?
            .iter()
            .map(ChatToolDefinition::from_mcp_tool)
            .collect();
        debug!(tools = tools.len(), model = %settings.model, "Chat session ready");

        let history = vec![ChatMessage::new(ROLE_SYSTEM, settings.system_instructions.clone())];
        Ok(Self {
            settings: Arc::new(settings),
            transport,
            tools: Arc::new(tools),
            history: Arc::new(Mutex::new(history)),
        })
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|tool| tool.function.name.clone())
            .collect()
    }

    /// Starts a turn. The returned stream ends when the turn is over;
    /// dropping it cancels the turn.
    pub fn send_message(&self, text: &str) -> ChatEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let turn = TurnContext {
            settings: Arc::clone(&self.settings),
            transport: Arc::clone(&self.transport),
            tools: Arc::clone(&self.tools),
            history: Arc::clone(&self.history),
            tx,
        };
        let user_text = text.to_string();
        let token = cancel_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = turn.run(user_text) => {}
                _ = token.cancelled() => debug!("Chat turn cancelled"),
            }
        });

        ChatEventStream { rx, cancel_token }
    }
}

impl ConversationBackend for ChatSession {
    fn stream_reply(&self, message: &str) -> BoxStream<'static, ChatEvent> {
        self.send_message(message).boxed()
    }
}

/// Receiving end of a turn.
pub struct ChatEventStream {
    rx: mpsc::UnboundedReceiver<ChatEvent>,
    cancel_token: CancellationToken,
}

impl Stream for ChatEventStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChatEvent>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ChatEventStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct TurnContext {
    settings: Arc<ChatSettings>,
    transport: Arc<dyn McpTransport>,
    tools: Arc<Vec<ChatToolDefinition>>,
    history: Arc<Mutex<Vec<ChatMessage>>>,
    tx: mpsc::UnboundedSender<ChatEvent>,
}

#[derive(Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// What one streamed completion produced.
#[derive(Default)]
struct Completion {
    text: String,
    tool_calls: BTreeMap<u32, PendingToolCall>,
}

enum LineOutcome {
    Continue,
    Done,
    Failed(String),
}

impl TurnContext {
    async fn run(self, user_text: String) {
        self.history
            .lock()
            .await
            .push(ChatMessage::new(ROLE_USER, user_text));

        let mut rounds = 0;
        loop {
            let messages = self.history.lock().await.clone();
            let completion = match self.stream_completion(messages).await {
                Ok(completion) => completion,
                Err(error) => {
                    let _ = self.tx.send(ChatEvent::Error(error));
                    return;
                }
            };

            if completion.tool_calls.is_empty() {
                if !completion.text.is_empty() {
                    self.history
                        .lock()
                        .await
                        .push(ChatMessage::new(ROLE_ASSISTANT, completion.text));
                }
                return;
            }

            if rounds >= self.settings.max_tool_rounds {
                warn!(rounds, "Tool round limit reached");
                let _ = self.tx.send(ChatEvent::Error(format!(
                    "Stopped after {rounds} rounds of tool calls."
                )));
                return;
            }
            rounds += 1;
            debug!(round = rounds, calls = completion.tool_calls.len(), "Dispatching tool calls");
            self.dispatch_tool_calls(completion).await;
        }
    }

    async fn dispatch_tool_calls(&self, completion: Completion) {
        let calls: Vec<ChatToolCall> = completion
            .tool_calls
            .into_iter()
            .map(|(index, call)| ChatToolCall {
                id: call.id.unwrap_or_else(|| format!("tool-call-{index}")),
                kind: "function".to_string(),
                function: ChatToolCallFunction {
                    name: call.name.unwrap_or_else(|| "unknown".to_string()),
                    arguments: call.arguments.trim().to_string(),
                },
            })
            .collect();

        self.history.lock().await.push(ChatMessage {
            tool_calls: Some(calls.clone()),
            ..ChatMessage::new(ROLE_ASSISTANT, completion.text)
        });

        for call in calls {
            let name = call.function.name.clone();
            let arguments = parse_tool_arguments(&call.function.arguments);
            let _ = self.tx.send(ChatEvent::ToolCall(ToolInvocation {
                name: name.clone(),
                arguments: arguments
                    .clone()
                    .map(Value::Object)
                    .unwrap_or_else(|_| Value::String(call.function.arguments.clone())),
            }));

            let result = match arguments {
                Ok(arguments) => {
                    let arguments = (!arguments.is_empty()).then_some(arguments);
                    match self.transport.call_tool(&name, arguments).await {
                        Ok(result) => ToolResultEvent {
                            name: name.clone(),
                            text: first_text_content(&result),
                            is_error: result.is_error.unwrap_or(false),
                        },
                        Err(err) => error_result(&name, err),
                    }
                }
                Err(err) => error_result(&name, err),
            };
            debug!(tool = %name, is_error = result.is_error, "Tool call finished");

            self.history.lock().await.push(ChatMessage::tool_result(
                &call.id,
                result.text.clone().unwrap_or_default(),
            ));
            let _ = self.tx.send(ChatEvent::ToolResult(result));
        }
    }

    async fn stream_completion(&self, messages: Vec<ChatMessage>) -> Result<Completion, String> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages,
            stream: true,
            tools: (!self.tools.is_empty()).then(|| self.tools.as_ref().clone()),
        };

        let chat_url = construct_api_url(&self.settings.base_url, "chat/completions");
        let response = self
            .settings
            .client
            .post(chat_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| format_api_error(&err.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(format_api_error(&error_text));
        }

        let mut completion = Completion::default();
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk_bytes = chunk.map_err(|err| format_api_error(&err.to_string()))?;
            buffer.extend_from_slice(&chunk_bytes);

            while let Some(newline_pos) = memchr(b'\n', &buffer) {
                let outcome = match std::str::from_utf8(&buffer[..newline_pos]) {
                    Ok(line) => process_sse_line(line.trim(), &mut completion, &self.tx),
                    Err(err) => {
                        warn!(error = %err, "Invalid UTF-8 in stream");
                        LineOutcome::Continue
                    }
                };
                buffer.drain(..=newline_pos);
                match outcome {
                    LineOutcome::Continue => {}
                    LineOutcome::Done => return Ok(completion),
                    LineOutcome::Failed(error) => return Err(error),
                }
            }
        }

        Ok(completion)
    }
}

fn error_result(name: &str, message: String) -> ToolResultEvent {
    ToolResultEvent {
        name: name.to_string(),
        text: Some(json!({ "error": message }).to_string()),
        is_error: true,
    }
}

fn parse_tool_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err("Tool arguments must be a JSON object.".to_string()),
        Err(err) => Err(format!("Invalid tool arguments: {err}")),
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(
    payload: &str,
    completion: &mut Completion,
    tx: &mpsc::UnboundedSender<ChatEvent>,
) -> LineOutcome {
    if payload == "[DONE]" {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            let Some(choice) = response.choices.into_iter().next() else {
                return LineOutcome::Continue;
            };
            if let Some(content) = choice.delta.content.filter(|content| !content.is_empty()) {
                completion.text.push_str(&content);
                let _ = tx.send(ChatEvent::TextDelta(content));
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let entry = completion
                    .tool_calls
                    .entry(delta.index.unwrap_or(0))
                    .or_default();
                if delta.id.is_some() {
                    entry.id = delta.id;
                }
                if let Some(function) = delta.function {
                    if function.name.is_some() {
                        entry.name = function.name;
                    }
                    if let Some(arguments) = function.arguments {
                        entry.arguments.push_str(&arguments);
                    }
                }
            }
            LineOutcome::Continue
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return LineOutcome::Continue;
            }
            LineOutcome::Failed(format_api_error(payload))
        }
    }
}

fn process_sse_line(
    line: &str,
    completion: &mut Completion,
    tx: &mpsc::UnboundedSender<ChatEvent>,
) -> LineOutcome {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, completion, tx))
        .unwrap_or(LineOutcome::Continue)
}

fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

pub(crate) fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("API Error:\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}
