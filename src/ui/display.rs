//! Display surface state.
//!
//! The surface is plain state: the transcript, the chat status, the input
//! line, and the cards currently on screen. Renderers read snapshots of it;
//! only the orchestrator and the chat loop write to it.

use std::collections::BTreeSet;

use crate::core::message::TranscriptRole;
use crate::core::model::{Episode, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    Generating,
    Executing,
}

impl ChatState {
    pub fn label(self) -> &'static str {
        match self {
            ChatState::Idle => "Idle",
            ChatState::Generating => "Generating...",
            ChatState::Executing => "Executing...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    #[default]
    Products,
    Episodes,
}

/// Cards on screen. Exactly one kind is active; replacing a list resets
/// that kind's expanded set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentState {
    pub active: ContentKind,
    pub products: Vec<Product>,
    pub episodes: Vec<Episode>,
    pub expanded_products: BTreeSet<i64>,
    pub expanded_episodes: BTreeSet<String>,
    /// Bumped on every change, so a renderer can skip unchanged snapshots.
    pub revision: u64,
}

impl ContentState {
    pub fn active_is_empty(&self) -> bool {
        match self.active {
            ContentKind::Products => self.products.is_empty(),
            ContentKind::Episodes => self.episodes.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    /// Unrendered text, kept for the terminal and the transcript log.
    pub source: String,
    pub html: String,
}

/// Index of a transcript entry returned by [`DisplaySurface::add_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle(usize);

#[derive(Debug, Default)]
pub struct DisplaySurface {
    transcript: Vec<TranscriptEntry>,
    status: ChatState,
    input_text: String,
    content: ContentState,
}

impl DisplaySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_products(&mut self, products: Vec<Product>) {
        let content = &mut self.content;
        content.active = ContentKind::Products;
        content.products = products;
        content.expanded_products.clear();
        content.revision += 1;
    }

    pub fn display_episodes(&mut self, episodes: Vec<Episode>) {
        let content = &mut self.content;
        content.active = ContentKind::Episodes;
        content.episodes = episodes;
        content.expanded_episodes.clear();
        content.revision += 1;
    }

    /// Appends an entry whose source and HTML are both `text` until updated.
    pub fn add_message(&mut self, role: TranscriptRole, text: &str) -> MessageHandle {
        self.transcript.push(TranscriptEntry {
            role,
            source: text.to_string(),
            html: text.to_string(),
        });
        MessageHandle(self.transcript.len() - 1)
    }

    /// Replaces an entry's text with a freshly rendered version.
    pub fn set_message_text(&mut self, handle: MessageHandle, source: &str, html: String) {
        if let Some(entry) = self.transcript.get_mut(handle.0) {
            entry.source = source.to_string();
            entry.html = html;
        }
    }

    pub fn set_status(&mut self, status: ChatState) {
        self.status = status;
    }

    pub fn set_input_text(&mut self, text: &str) {
        self.input_text = text.to_string();
    }

    /// Flips one product card between truncated and full. Returns the new
    /// expanded state.
    pub fn toggle_product_expanded(&mut self, id: i64) -> bool {
        let content = &mut self.content;
        content.revision += 1;
        if content.expanded_products.remove(&id) {
            false
        } else {
            content.expanded_products.insert(id)
        }
    }

    pub fn toggle_episode_expanded(&mut self, key: &str) -> bool {
        let content = &mut self.content;
        content.revision += 1;
        if content.expanded_episodes.remove(key) {
            false
        } else {
            content.expanded_episodes.insert(key.to_string())
        }
    }

    pub fn status(&self) -> ChatState {
        self.status
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn content(&self) -> &ContentState {
        &self.content
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn entry(&self, handle: MessageHandle) -> Option<&TranscriptEntry> {
        self.transcript.get(handle.0)
    }

    pub fn last_entry(&self) -> Option<&TranscriptEntry> {
        self.transcript.last()
    }
}
