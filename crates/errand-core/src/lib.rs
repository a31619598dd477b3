//! Task pipeline logic and repository trait definitions for Errand.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the three pipeline stages: message
//! intake (classification), the task processor, and the task monitor. It
//! depends only on `errand-types` -- never on `errand-infra` or any
//! database/IO crate.

pub mod classify;
pub mod event;
pub mod external;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;
