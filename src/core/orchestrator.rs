//! Turn orchestration between the chat stream and the display surface.
//!
//! One turn consumes the event stream strictly in order. Text deltas build up
//! the assistant reply, tool results for the catalog tools replace the cards
//! on screen, and when the stream ends exactly one final message is chosen for
//! the reply entry.

use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::chat_stream::{ChatEvent, ConversationBackend, ToolInvocation, ToolResultEvent};
use crate::core::constants::PENDING_TEXT;
use crate::core::message::TranscriptRole;
use crate::core::tool_payload::{parse_episode_payload, parse_product_payload, ToolPayload};
use crate::mcp::{EPISODES_TOOL, PRODUCTS_TOOL};
use crate::ui::display::{ChatState, ContentKind, DisplaySurface, MessageHandle};
use crate::ui::markdown::render_text;

pub const PRODUCTS_DISPLAYED_NOTICE: &str = "Displayed products based on the tool's response.";
pub const EPISODES_DISPLAYED_NOTICE: &str = "Displayed episodes based on the tool's response.";
pub const NO_PRODUCTS_NOTICE: &str = "I searched for products based on your query but didn't \
find any matching items to display for the current page/filters.";
pub const NO_EPISODES_NOTICE: &str =
    "I searched for episodes based on your query but didn't find any matching items to display.";
pub const DONE_NOTICE: &str = "Done.";

/// Which of the four end-of-turn outcomes was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalMessage {
    /// The accumulated reply text.
    Reply,
    /// Cards of this kind are on screen.
    Displayed(ContentKind),
    /// The tool for this kind ran and found nothing.
    NothingFound(ContentKind),
    Done,
}

impl FinalMessage {
    /// Fixed notice text, or `None` when the reply text itself is shown.
    pub fn notice(self) -> Option<&'static str> {
        match self {
            FinalMessage::Reply => None,
            FinalMessage::Displayed(ContentKind::Products) => Some(PRODUCTS_DISPLAYED_NOTICE),
            FinalMessage::Displayed(ContentKind::Episodes) => Some(EPISODES_DISPLAYED_NOTICE),
            FinalMessage::NothingFound(ContentKind::Products) => Some(NO_PRODUCTS_NOTICE),
            FinalMessage::NothingFound(ContentKind::Episodes) => Some(NO_EPISODES_NOTICE),
            FinalMessage::Done => Some(DONE_NOTICE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    /// Transcript entry that holds the assistant reply.
    pub reply: MessageHandle,
    pub final_message: FinalMessage,
    /// Set when the stream reported an error and the turn was cut short.
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A turn was already running.
    Rejected,
    /// The input was blank.
    Ignored,
    Completed(TurnSummary),
}

/// Entry point for a user message. Only one turn may run at a time; blank
/// input is dropped without touching the transcript.
pub async fn send_message(
    surface: &mut DisplaySurface,
    backend: &dyn ConversationBackend,
    input: &str,
    markdown: bool,
) -> TurnOutcome {
    if surface.status() != ChatState::Idle {
        debug!("Rejecting message while a turn is in flight");
        return TurnOutcome::Rejected;
    }
    let message = input.trim();
    if message.is_empty() {
        return TurnOutcome::Ignored;
    }

    surface.set_input_text("");
    let user = surface.add_message(TranscriptRole::User, message);
    surface.set_message_text(user, message, render_text(message, markdown));

    let events = backend.stream_reply(message);
    TurnOutcome::Completed(run_turn(surface, events, markdown).await)
}

/// Drives one turn from an event stream and leaves the surface idle.
pub async fn run_turn<S>(surface: &mut DisplaySurface, mut events: S, markdown: bool) -> TurnSummary
where
    S: Stream<Item = ChatEvent> + Unpin,
{
    surface.set_status(ChatState::Generating);
    let reply = surface.add_message(TranscriptRole::Assistant, PENDING_TEXT);
    let mut turn = TurnState::default();

    while let Some(event) = events.next().await {
        match event {
            ChatEvent::TextDelta(delta) => {
                surface.set_status(ChatState::Generating);
                turn.text.push_str(&delta);
                surface.set_message_text(reply, &turn.text, render_text(&turn.text, markdown));
            }
            ChatEvent::ToolCall(invocation) => {
                surface.set_status(ChatState::Executing);
                let explanation = describe_tool_call(&invocation);
                let handle = surface.add_message(TranscriptRole::ToolCall, &explanation);
                surface.set_message_text(handle, &explanation, render_text(&explanation, markdown));
            }
            ChatEvent::ToolResult(result) => {
                surface.set_status(ChatState::Generating);
                turn.apply_tool_result(surface, &result);
            }
            ChatEvent::Error(raw) => {
                let message = format_turn_error(&raw);
                warn!(error = %raw, "Chat stream failed");
                let handle = surface.add_message(TranscriptRole::AppError, &message);
                surface.set_message_text(handle, &message, render_text(&message, markdown));
                turn.failed = true;
                break;
            }
        }
    }

    let final_message = turn.final_message(surface);
    let text = match final_message.notice() {
        Some(notice) => notice.to_string(),
        None => turn.text.clone(),
    };
    let already_shown = surface
        .entry(reply)
        .is_some_and(|entry| entry.source == text);
    if !already_shown {
        surface.set_message_text(reply, &text, render_text(&text, markdown));
    }
    surface.set_status(ChatState::Idle);

    TurnSummary {
        reply,
        final_message,
        failed: turn.failed,
    }
}

#[derive(Debug, Default)]
struct TurnState {
    text: String,
    products_empty: bool,
    episodes_empty: bool,
    failed: bool,
}

impl TurnState {
    fn apply_tool_result(&mut self, surface: &mut DisplaySurface, result: &ToolResultEvent) {
        let text = result.text.as_deref();
        if result.name == PRODUCTS_TOOL {
            self.products_empty = false;
            match parse_product_payload(text) {
                ToolPayload::Ok(page) => {
                    self.products_empty = page.products.is_empty();
                    debug!(count = page.products.len(), "Displaying products");
                    surface.display_products(page.products);
                }
                ToolPayload::Error(error) => {
                    warn!(%error, "Product tool reported an error");
                    surface.display_products(Vec::new());
                    self.text
                        .push_str(&format!("\n\nSorry, I couldn't fetch product data: {error}"));
                    self.products_empty = true;
                }
                ToolPayload::Malformed => {
                    warn!("Unexpected product tool payload");
                    surface.display_products(Vec::new());
                    self.products_empty = true;
                }
            }
        } else if result.name == EPISODES_TOOL {
            self.episodes_empty = false;
            match parse_episode_payload(text) {
                ToolPayload::Ok(episodes) => {
                    self.episodes_empty = episodes.is_empty();
                    debug!(count = episodes.len(), "Displaying episodes");
                    surface.display_episodes(episodes);
                }
                ToolPayload::Error(error) => {
                    warn!(%error, "Episode tool reported an error");
                    surface.display_episodes(Vec::new());
                    self.text.push_str(&format!(
                        "\n\nSorry, I encountered an error trying to fetch episode data: {error}"
                    ));
                    self.episodes_empty = true;
                }
                ToolPayload::Malformed => {
                    warn!("Unexpected episode tool payload");
                    surface.display_episodes(Vec::new());
                    self.episodes_empty = true;
                }
            }
        }
    }

    fn final_message(&self, surface: &DisplaySurface) -> FinalMessage {
        let content = surface.content();
        if !self.text.trim().is_empty() {
            FinalMessage::Reply
        } else if !content.active_is_empty() {
            FinalMessage::Displayed(content.active)
        } else if self.products_empty {
            FinalMessage::NothingFound(ContentKind::Products)
        } else if self.episodes_empty {
            FinalMessage::NothingFound(ContentKind::Episodes)
        } else {
            FinalMessage::Done
        }
    }
}

fn describe_tool_call(invocation: &ToolInvocation) -> String {
    let call = json!({
        "name": invocation.name,
        "arguments": invocation.arguments,
    });
    let pretty = serde_json::to_string_pretty(&call).unwrap_or_else(|_| call.to_string());
    format!("Calling function:\n```json\n{pretty}\n```")
}

/// Formats a stream failure for the transcript. When the raw text embeds a
/// JSON error body, its `error.message` replaces the raw text. Anything after
/// the embedded body, such as a closing code fence, is ignored.
pub fn format_turn_error(raw: &str) -> String {
    let nested = raw.find('{').and_then(|start| {
        let body = serde_json::Deserializer::from_str(&raw[start..])
            .into_iter::<Value>()
            .next()?
            .ok()?;
        body.get("error")?
            .get("message")?
            .as_str()
            .map(str::to_string)
    });
    format!("Error: {}", nested.as_deref().unwrap_or(raw))
}
