//! Registry of the agents tracked by a layer.

use fog_core::{AgentId, TrackedAgent};
use thiserror::Error;

/// Signals that a removal named an agent the registry does not track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no tracked agent registered for {agent:?}")]
pub struct NotFoundWarning {
    /// Identifier supplied in the removal request.
    pub agent: AgentId,
}

/// Insertion-ordered set of tracked agents keyed by identity.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    entries: Vec<TrackedAgent>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `agent` unless an agent with the same identity is present.
    ///
    /// Returns `true` when the registry changed.
    pub fn add(&mut self, agent: TrackedAgent) -> bool {
        if self.contains(agent.id()) {
            return false;
        }
        self.entries.push(agent);
        true
    }

    /// Stops tracking the agent with the provided identity.
    pub fn remove(&mut self, agent: AgentId) -> Result<TrackedAgent, NotFoundWarning> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id() == agent)
            .ok_or(NotFoundWarning { agent })?;
        Ok(self.entries.remove(index))
    }

    /// Reports whether an agent with the provided identity is tracked.
    #[must_use]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.entries.iter().any(|entry| entry.id() == agent)
    }

    /// Iterates over the tracked agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedAgent> {
        self.entries.iter()
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no agents are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
