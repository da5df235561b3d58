//! Receiver capability and the built-in fallback receivers.

use std::{future::Future, marker::PhantomData};

use {
    anyhow::Result,
    async_trait::async_trait,
    msghub_protocol::{Command, Message, ReasonError, reason_codes},
    tokio_util::sync::CancellationToken,
};

/// Handles envelopes of kind `E`.
///
/// `cancel` fires when the listener stops; long-running receivers should
/// observe it. Returning an error marks the envelope as failed; wrap a
/// [`ReasonError`] to choose the reason reported to the peer.
#[async_trait]
pub trait EnvelopeReceiver<E: Send + 'static>: Send + Sync {
    async fn receive(&self, envelope: E, cancel: CancellationToken) -> Result<()>;
}

/// Receiver backed by an async closure.
pub struct FnReceiver<F> {
    f: F,
}

/// Build a receiver from `|envelope, cancel| async move { ... }`.
pub fn from_fn<F>(f: F) -> FnReceiver<F> {
    FnReceiver { f }
}

#[async_trait]
impl<E, F, Fut> EnvelopeReceiver<E> for FnReceiver<F>
where
    E: Send + 'static,
    F: Fn(E, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn receive(&self, envelope: E, cancel: CancellationToken) -> Result<()> {
        (self.f)(envelope, cancel).await
    }
}

// ── Fallbacks ───────────────────────────────────────────────────────────────

/// Rejects every message so the sender learns nobody handled it.
#[derive(Debug, Default)]
pub struct UnsupportedMessageReceiver;

#[async_trait]
impl EnvelopeReceiver<Message> for UnsupportedMessageReceiver {
    async fn receive(&self, _message: Message, _cancel: CancellationToken) -> Result<()> {
        Err(ReasonError::new(
            reason_codes::MESSAGE_UNSUPPORTED_CONTENT_TYPE,
            "There's no processor available to handle the received message",
        )
        .into())
    }
}

/// Rejects every pending command with a failure response.
#[derive(Debug, Default)]
pub struct UnsupportedCommandReceiver;

#[async_trait]
impl EnvelopeReceiver<Command> for UnsupportedCommandReceiver {
    async fn receive(&self, _command: Command, _cancel: CancellationToken) -> Result<()> {
        Err(ReasonError::new(
            reason_codes::COMMAND_RESOURCE_NOT_SUPPORTED,
            "There's no processor available to handle the received command",
        )
        .into())
    }
}

/// Accepts and drops anything.
pub struct BlackholeReceiver<E> {
    _kind: PhantomData<fn(E)>,
}

impl<E> Default for BlackholeReceiver<E> {
    fn default() -> Self {
        Self { _kind: PhantomData }
    }
}

#[async_trait]
impl<E: Send + 'static> EnvelopeReceiver<E> for BlackholeReceiver<E> {
    async fn receive(&self, _envelope: E, _cancel: CancellationToken) -> Result<()> {
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        msghub_protocol::{CommandMethod, Notification},
    };

    #[tokio::test]
    async fn unsupported_message_carries_structured_reason() {
        let err = UnsupportedMessageReceiver
            .receive(Message::text("hi"), CancellationToken::new())
            .await
            .unwrap_err();
        let reason = &err.downcast_ref::<ReasonError>().unwrap().reason;
        assert_eq!(reason.code, reason_codes::MESSAGE_UNSUPPORTED_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn unsupported_command_carries_structured_reason() {
        let err = UnsupportedCommandReceiver
            .receive(
                Command::request(CommandMethod::Get, "/unknown"),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        let reason = &err.downcast_ref::<ReasonError>().unwrap().reason;
        assert_eq!(reason.code, reason_codes::COMMAND_RESOURCE_NOT_SUPPORTED);
    }

    #[tokio::test]
    async fn blackhole_accepts_everything() {
        let receiver = BlackholeReceiver::<Notification>::default();
        let notification = Notification::new(msghub_protocol::Event::Consumed);
        assert!(
            receiver
                .receive(notification, CancellationToken::new())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn closure_receiver_sees_envelope() {
        let receiver = from_fn(|message: Message, _cancel: CancellationToken| async move {
            anyhow::ensure!(message.content_text() == Some("ping"), "unexpected content");
            Ok(())
        });
        receiver
            .receive(Message::text("ping"), CancellationToken::new())
            .await
            .unwrap();
        assert!(
            receiver
                .receive(Message::text("pong"), CancellationToken::new())
                .await
                .is_err()
        );
    }
}
