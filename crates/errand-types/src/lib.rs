//! Shared domain types for Errand.
//!
//! This crate contains the core domain types used across the Errand task
//! pipeline: Task, Channel, AgentProfile, Classification, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod task;
