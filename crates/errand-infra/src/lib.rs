//! Infrastructure implementations for Errand.
//!
//! Implements the ports defined in `errand-core`: SQLite task persistence,
//! the OpenAI completion and image backends, generic HTTP/MCP dispatch, and
//! the Twitter/Telegram channel clients.

pub mod channel;
pub mod factory;
pub mod http;
pub mod image;
pub mod llm;
pub mod sqlite;
