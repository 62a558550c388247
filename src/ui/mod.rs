//! Presentation layer.
//!
//! - [`display`]: the display surface state the orchestrator writes to.
//! - [`cards`]: pure plain-text rendering of the current cards.
//! - [`markdown`]: markdown to HTML for transcript entries.
//! - [`chat_loop`]: the interactive terminal loop.

pub mod cards;
pub mod chat_loop;
pub mod display;
pub mod markdown;
