//! kratts is a terminal chat assistant for the Wild Kratts universe.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`mcp`] hosts the tool server (map, product, and episode tools backed by
//!   the upstream catalog APIs) and the in-process link that connects a
//!   client to it over JSON-RPC.
//! - [`core`] owns the chat session that streams completions and dispatches
//!   tool calls, the response orchestrator that turns a stream of events into
//!   display updates, the catalog data model, and configuration.
//! - [`ui`] holds the display surface state, card and markdown rendering,
//!   and the interactive loop.
//! - [`api`] defines the chat-completions payloads.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod mcp;
pub mod ui;
pub mod utils;
