//! Application state for chat commands.
//!
//! [`App`] owns the chat session, the display surface, and the transcript
//! logger. Construction wires the full stack: upstream client, tool server,
//! in-process link, and chat session.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::chat_stream::{ChatSession, ChatSettings};
use crate::core::config::defaults::{EffectiveConfig, API_KEY_ENV};
use crate::core::constants::SYSTEM_INSTRUCTIONS;
use crate::core::orchestrator::{self, TurnOutcome};
use crate::mcp::link::{start_linked, LinkedClient};
use crate::mcp::server::maps::logging_map_handler;
use crate::mcp::server::upstream::UpstreamClient;
use crate::mcp::server::ToolServer;
use crate::mcp::transport::McpTransport;
use crate::ui::display::{DisplaySurface, TranscriptEntry};
use crate::utils::logging::LoggingState;

pub struct App {
    pub session: ChatSession,
    pub surface: DisplaySurface,
    pub logging: LoggingState,
    pub markdown: bool,
    /// Transcript entries already handed to the logger and the terminal.
    flushed: usize,
}

/// Builds the tool server from config and starts it behind an in-process
/// link.
pub async fn start_tool_link(
    config: &EffectiveConfig,
) -> Result<Arc<LinkedClient>, Box<dyn std::error::Error>> {
    let server = Arc::new(build_tool_server(config)?);
    Ok(start_linked(server).await?)
}

pub fn build_tool_server(config: &EffectiveConfig) -> Result<ToolServer, Box<dyn std::error::Error>> {
    let upstream = UpstreamClient::new(
        config.product_api_url.clone(),
        config.episode_api_url.clone(),
    )?;
    Ok(ToolServer::new(upstream, logging_map_handler())?)
}

impl App {
    pub async fn new(
        config: &EffectiveConfig,
        log_file: Option<PathBuf>,
    ) -> Result<App, Box<dyn std::error::Error>> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            format!(
                "{API_KEY_ENV} environment variable not set\n\n\
Please set your OpenAI API key:\n\
export {API_KEY_ENV}=\"your-api-key-here\""
            )
        })?;
        let logging = LoggingState::new(log_file)?;

        let transport: Arc<dyn McpTransport> = start_tool_link(config).await?;
        let settings = ChatSettings {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tool_rounds: config.max_tool_rounds,
            system_instructions: SYSTEM_INSTRUCTIONS.to_string(),
        };
        let session = ChatSession::connect(settings, transport).await?;
        debug!(tools = ?session.tool_names(), "App ready");

        Ok(App {
            session,
            surface: DisplaySurface::new(),
            logging,
            markdown: config.markdown,
            flushed: 0,
        })
    }

    /// Runs one turn for `input` through the orchestrator.
    pub async fn submit(&mut self, input: &str) -> TurnOutcome {
        orchestrator::send_message(&mut self.surface, &self.session, input, self.markdown).await
    }

    /// Returns entries added since the last call and appends them to the
    /// transcript log. Logging failures are reported but never end the
    /// session.
    pub fn take_new_entries(&mut self) -> Vec<TranscriptEntry> {
        let entries: Vec<TranscriptEntry> = self
            .surface
            .transcript()
            .iter()
            .skip(self.flushed)
            .cloned()
            .collect();
        self.flushed += entries.len();
        if self.logging.is_active() {
            for entry in &entries {
                if let Err(err) = self.logging.log_entry(entry) {
                    warn!(error = %err, "Failed to write transcript log");
                }
            }
        }
        entries
    }
}
