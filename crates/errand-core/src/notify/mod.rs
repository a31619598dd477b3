//! Outcome notification: channel client ports, per-agent client registry,
//! and message composition.

pub mod channel;
pub mod compose;
pub mod registry;

pub use channel::{NotifierFactory, TelegramClient, TwitterClient};
pub use registry::NotifierRegistry;
