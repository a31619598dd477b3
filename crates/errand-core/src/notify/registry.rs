//! Per-agent channel client registry.
//!
//! Channel clients are constructed lazily from agent credentials and cached
//! by agent id, shared between the processor and monitor loops. Eviction
//! exists for credential rotation.

use std::sync::Arc;

use dashmap::DashMap;
use errand_types::agent::AgentProfile;
use uuid::Uuid;

use super::channel::NotifierFactory;

/// Lazily constructed, agent-keyed cache of Twitter/Telegram clients.
pub struct NotifierRegistry<F: NotifierFactory> {
    factory: F,
    twitter: DashMap<Uuid, Option<Arc<F::Twitter>>>,
    telegram: DashMap<Uuid, Option<Arc<F::Telegram>>>,
}

impl<F: NotifierFactory> NotifierRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            twitter: DashMap::new(),
            telegram: DashMap::new(),
        }
    }

    /// The underlying factory (for operations not tied to one agent,
    /// e.g. image downloads).
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The agent's Twitter client, building it on first use. `None` when
    /// the agent has no Twitter credentials; the miss is cached too.
    pub fn twitter_for(&self, agent: &AgentProfile) -> Option<Arc<F::Twitter>> {
        self.twitter
            .entry(agent.id)
            .or_insert_with(|| self.factory.twitter(agent).map(Arc::new))
            .clone()
    }

    /// The agent's Telegram client, building it on first use.
    pub fn telegram_for(&self, agent: &AgentProfile) -> Option<Arc<F::Telegram>> {
        self.telegram
            .entry(agent.id)
            .or_insert_with(|| self.factory.telegram(agent).map(Arc::new))
            .clone()
    }

    /// Drop cached clients for an agent (credential rotation).
    pub fn evict(&self, agent_id: Uuid) {
        self.twitter.remove(&agent_id);
        self.telegram.remove(&agent_id);
    }
}
