//! Message classification: deciding whether an inbound message is idle chat
//! or an actionable task, and which external service it needs.
//!
//! Three stages compose into [`chain::ClassifierChain`]:
//! 1. a fast-path table of canonical chat utterances (no external call),
//! 2. an LLM classifier with a strict JSON contract,
//! 3. a deterministic keyword classifier as the always-available fallback.
//!
//! The independent [`worthiness`] filter provides a second, rule-based
//! signal that the caller ORs with the chain's verdict.

pub mod chain;
pub mod chat_patterns;
pub mod keyword;
pub mod llm;
pub mod taxonomy;
pub mod worthiness;

pub use chain::ClassifierChain;
pub use keyword::KeywordClassifier;
pub use llm::LlmClassifier;
pub use worthiness::should_save_as_task;
