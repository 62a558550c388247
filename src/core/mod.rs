pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod message;
pub mod model;
pub mod orchestrator;
pub mod tool_payload;
