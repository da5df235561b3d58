//! Ambient context describing the envelope being processed.
//!
//! The context lives in a tokio task-local, so it follows one processing
//! flow and is never visible to envelopes processed concurrently. Receivers
//! read it with [`current`] or [`with_current`] instead of threading the
//! envelope through their own call stack.
//!
//! Scopes nest: entering a scope while one is active shadows the outer
//! context until the inner scope ends, after which the outer one is visible
//! again.

use std::future::Future;

use msghub_protocol::{EnvelopeKind, Metadata, Node};

use crate::envelope::InboundEnvelope;

/// Snapshot of the envelope a receiver is currently handling.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchContext {
    pub kind: EnvelopeKind,
    pub id: Option<String>,
    pub from: Option<Node>,
    pub to: Option<Node>,
    pub pp: Option<Node>,
    pub content: Option<serde_json::Value>,
    pub metadata: Metadata,
}

impl DispatchContext {
    pub fn of<E: InboundEnvelope>(envelope: &E) -> Self {
        Self {
            kind: E::KIND,
            id: envelope.id().map(str::to_string),
            from: envelope.from_node().cloned(),
            to: envelope.to_node().cloned(),
            pp: envelope.pp_node().cloned(),
            content: envelope.content(),
            metadata: envelope.metadata().clone(),
        }
    }
}

tokio::task_local! {
    static CURRENT: DispatchContext;
}

/// Run `future` with `context` as the current dispatch context.
///
/// The context is gone once `future` completes, fails or is dropped.
pub async fn scope<F: Future>(context: DispatchContext, future: F) -> F::Output {
    CURRENT.scope(context, future).await
}

/// The context of the envelope being processed, if any.
pub fn current() -> Option<DispatchContext> {
    CURRENT.try_with(DispatchContext::clone).ok()
}

/// Borrow the current context without cloning it.
pub fn with_current<R>(f: impl FnOnce(&DispatchContext) -> R) -> Option<R> {
    CURRENT.try_with(f).ok()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        msghub_protocol::{Command, CommandMethod, Message},
        std::time::Duration,
    };

    fn message(id: &str) -> Message {
        Message::text("hi")
            .with_id(id)
            .with_from(Node::new("alice", "msging.net"))
    }

    #[tokio::test]
    async fn absent_outside_a_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn visible_inside_and_cleared_after() {
        let ctx = DispatchContext::of(&message("m1"));
        let seen = scope(ctx, async { current() }).await.unwrap();
        assert_eq!(seen.kind, EnvelopeKind::Message);
        assert_eq!(seen.id.as_deref(), Some("m1"));
        assert_eq!(seen.content, Some(serde_json::json!("hi")));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn cleared_even_when_the_flow_fails() {
        let ctx = DispatchContext::of(&message("m1"));
        let result: anyhow::Result<()> = scope(ctx, async { anyhow::bail!("boom") }).await;
        assert!(result.is_err());
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn inner_scope_shadows_then_restores() {
        let outer = DispatchContext::of(&message("outer"));
        let command = Command::request(CommandMethod::Get, "/x").with_id("inner");
        let inner = DispatchContext::of(&command);

        let (during, after) = scope(outer, async {
            let during = scope(inner, async { with_current(|c| c.id.clone()) }).await;
            (during, with_current(|c| c.id.clone()))
        })
        .await;

        assert_eq!(during.flatten().as_deref(), Some("inner"));
        assert_eq!(after.flatten().as_deref(), Some("outer"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_flows_are_isolated() {
        let flow = |id: &'static str| {
            scope(DispatchContext::of(&message(id)), async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                with_current(|c| c.id.clone()).flatten()
            })
        };

        let (a, b) = tokio::join!(
            tokio::spawn(flow("a")),
            tokio::spawn(flow("b"))
        );
        assert_eq!(a.unwrap().as_deref(), Some("a"));
        assert_eq!(b.unwrap().as_deref(), Some("b"));
    }
}
