use {async_trait::async_trait, dashmap::DashMap, tracing::debug};

/// State every identity is in until something sets it.
pub const DEFAULT_STATE: &str = "default";

/// Per-identity conversation state, keyed by a node identity
/// (`name@domain`).
#[async_trait]
pub trait StateManager: Send + Sync {
    /// Current state, or [`DEFAULT_STATE`] when none was set.
    async fn get_state(&self, identity: &str) -> String;

    async fn set_state(&self, identity: &str, state: &str);

    /// Return the identity to [`DEFAULT_STATE`].
    async fn reset_state(&self, identity: &str);
}

/// Process-local [`StateManager`].
#[derive(Debug, Default)]
pub struct InMemoryStateManager {
    states: DashMap<String, String>,
}

impl InMemoryStateManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateManager for InMemoryStateManager {
    async fn get_state(&self, identity: &str) -> String {
        self.states
            .get(identity)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| DEFAULT_STATE.to_string())
    }

    async fn set_state(&self, identity: &str, state: &str) {
        if state == DEFAULT_STATE {
            self.states.remove(identity);
        } else {
            self.states.insert(identity.to_string(), state.to_string());
        }
        debug!(identity, state, "state changed");
    }

    async fn reset_state(&self, identity: &str) {
        self.states.remove(identity);
        debug!(identity, "state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_identity_is_default() {
        let manager = InMemoryStateManager::new();
        assert_eq!(manager.get_state("alice@msging.net").await, DEFAULT_STATE);
    }

    #[tokio::test]
    async fn set_then_reset() {
        let manager = InMemoryStateManager::new();
        manager.set_state("alice@msging.net", "ordering").await;
        assert_eq!(manager.get_state("alice@msging.net").await, "ordering");
        assert_eq!(manager.get_state("bob@msging.net").await, DEFAULT_STATE);

        manager.reset_state("alice@msging.net").await;
        assert_eq!(manager.get_state("alice@msging.net").await, DEFAULT_STATE);
    }
}
