//! CompletionClient trait definition.
//!
//! The narrow chat-completion contract the classifier needs: a system/user
//! prompt pair and a sampling temperature in, one textual completion out.
//! Implementations live in errand-infra (e.g., `OpenAiCompletionClient`).
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use errand_types::error::CompletionError;

/// Trait for chat-completion backends used by the LLM classifier.
pub trait CompletionClient: Send + Sync {
    /// Request a single completion for the given prompt pair.
    fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> impl std::future::Future<Output = Result<String, CompletionError>> + Send;
}
