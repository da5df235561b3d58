//! Receivers and predicates driven by the sender's conversation state.

use std::sync::Arc;

use {
    anyhow::Result, async_trait::async_trait, msghub_common::StateManager,
    tokio_util::sync::CancellationToken, tracing::debug,
};

use crate::{envelope::InboundEnvelope, predicate::EnvelopePredicate, receiver::EnvelopeReceiver};

/// Matches envelopes whose sender is currently in `state`.
///
/// Envelopes without a sender never match.
pub struct StateIs {
    manager: Arc<dyn StateManager>,
    state: String,
}

pub fn state_is(manager: Arc<dyn StateManager>, state: impl Into<String>) -> StateIs {
    StateIs {
        manager,
        state: state.into(),
    }
}

#[async_trait]
impl<E: InboundEnvelope> EnvelopePredicate<E> for StateIs {
    async fn matches(&self, envelope: &E) -> Result<bool> {
        let Some(sender) = envelope.sender_node() else {
            return Ok(false);
        };
        Ok(self.manager.get_state(&sender.identity()).await == self.state)
    }
}

/// Runs the inner receiver, then moves the sender to `out_state` if it
/// succeeded.
pub struct OutStateReceiver<E: InboundEnvelope> {
    inner: Arc<dyn EnvelopeReceiver<E>>,
    manager: Arc<dyn StateManager>,
    out_state: String,
}

impl<E: InboundEnvelope> OutStateReceiver<E> {
    pub fn new(
        inner: Arc<dyn EnvelopeReceiver<E>>,
        manager: Arc<dyn StateManager>,
        out_state: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            manager,
            out_state: out_state.into(),
        }
    }
}

#[async_trait]
impl<E: InboundEnvelope> EnvelopeReceiver<E> for OutStateReceiver<E> {
    async fn receive(&self, envelope: E, cancel: CancellationToken) -> Result<()> {
        let identity = envelope.sender_node().map(|node| node.identity());
        self.inner.receive(envelope, cancel).await?;

        if let Some(identity) = identity {
            self.manager.set_state(&identity, &self.out_state).await;
            debug!(%identity, state = %self.out_state, "sender moved to out state");
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        anyhow::anyhow,
        msghub_common::{DEFAULT_STATE, InMemoryStateManager},
        msghub_protocol::{Message, Node},
    };

    use {super::*, crate::receiver};

    fn from_alice() -> Message {
        Message::text("hi").with_from(Node::new("alice", "msging.net").with_instance("phone"))
    }

    #[tokio::test]
    async fn matches_on_the_sender_identity() {
        let manager: Arc<dyn StateManager> = Arc::new(InMemoryStateManager::new());
        let ordering = state_is(Arc::clone(&manager), "ordering");

        assert!(!ordering.matches(&from_alice()).await.unwrap());
        manager.set_state("alice@msging.net", "ordering").await;
        assert!(ordering.matches(&from_alice()).await.unwrap());
    }

    #[tokio::test]
    async fn anonymous_envelopes_never_match() {
        let manager: Arc<dyn StateManager> = Arc::new(InMemoryStateManager::new());
        let default = state_is(manager, DEFAULT_STATE);
        assert!(!default.matches(&Message::text("hi")).await.unwrap());
    }

    #[tokio::test]
    async fn success_moves_the_sender() {
        let manager: Arc<dyn StateManager> = Arc::new(InMemoryStateManager::new());
        let inner: Arc<dyn EnvelopeReceiver<Message>> =
            Arc::new(receiver::from_fn(|_: Message, _: CancellationToken| async {
                Ok::<(), anyhow::Error>(())
            }));
        let receiver = OutStateReceiver::new(inner, Arc::clone(&manager), "paying");

        receiver
            .receive(from_alice(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(manager.get_state("alice@msging.net").await, "paying");
    }

    #[tokio::test]
    async fn failure_keeps_the_state() {
        let manager: Arc<dyn StateManager> = Arc::new(InMemoryStateManager::new());
        let inner: Arc<dyn EnvelopeReceiver<Message>> =
            Arc::new(receiver::from_fn(|_: Message, _: CancellationToken| async {
                Err::<(), _>(anyhow!("declined"))
            }));
        let receiver = OutStateReceiver::new(inner, Arc::clone(&manager), "paying");

        assert!(
            receiver
                .receive(from_alice(), CancellationToken::new())
                .await
                .is_err()
        );
        assert_eq!(manager.get_state("alice@msging.net").await, DEFAULT_STATE);
    }
}
