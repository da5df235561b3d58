//! Outbound side of a session: the capability the listener uses to send
//! acknowledgments and failure responses back to peers.

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    msghub_protocol::{Command, Envelope, Message, Notification},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
};

/// Sends envelopes over an established session.
///
/// Every send takes a cancellation token; implementations should abandon the
/// send and return an error once it fires.
#[async_trait]
pub trait EnvelopeSender: Send + Sync {
    /// Send a command and wait for its response.
    async fn send_command(&self, command: Command, cancel: &CancellationToken) -> Result<Command>;

    async fn send_message(&self, message: Message, cancel: &CancellationToken) -> Result<()>;

    async fn send_notification(
        &self,
        notification: Notification,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

// ── Outbox ──────────────────────────────────────────────────────────────────

/// Sender that records every outbound envelope instead of writing it to a
/// transport. Paired with an [`Outbox`] that reads them back in send order.
///
/// `send_command` answers each command with the command itself.
#[derive(Clone)]
pub struct OutboxSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

/// Reading end of an [`OutboxSender`].
pub struct Outbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl OutboxSender {
    pub fn new() -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Outbox { rx })
    }

    fn record(&self, envelope: Envelope, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            bail!("send of {} envelope cancelled", envelope.kind());
        }
        if self.tx.send(envelope).is_err() {
            bail!("outbox closed");
        }
        Ok(())
    }
}

#[async_trait]
impl EnvelopeSender for OutboxSender {
    async fn send_command(&self, command: Command, cancel: &CancellationToken) -> Result<Command> {
        self.record(command.clone().into(), cancel)?;
        Ok(command)
    }

    async fn send_message(&self, message: Message, cancel: &CancellationToken) -> Result<()> {
        self.record(message.into(), cancel)
    }

    async fn send_notification(
        &self,
        notification: Notification,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(notification.into(), cancel)
    }
}

impl Outbox {
    /// Next recorded envelope; `None` once every sender is dropped and the
    /// backlog is empty.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Everything recorded so far, without waiting.
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            envelopes.push(envelope);
        }
        envelopes
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, msghub_protocol::Event};

    #[tokio::test]
    async fn records_in_send_order() {
        let (sender, mut outbox) = OutboxSender::new();
        let cancel = CancellationToken::new();
        sender
            .send_message(Message::text("one"), &cancel)
            .await
            .unwrap();
        sender
            .send_notification(Notification::new(Event::Received), &cancel)
            .await
            .unwrap();

        let sent = outbox.drain();
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0], Envelope::Message(_)));
        assert!(matches!(sent[1], Envelope::Notification(_)));
        assert!(outbox.drain().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_refuses_the_send() {
        let (sender, mut outbox) = OutboxSender::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(
            sender
                .send_message(Message::text("late"), &cancel)
                .await
                .is_err()
        );
        assert!(outbox.drain().is_empty());
    }

    #[tokio::test]
    async fn recv_ends_when_senders_are_gone() {
        let (sender, mut outbox) = OutboxSender::new();
        sender
            .send_message(Message::text("last"), &CancellationToken::new())
            .await
            .unwrap();
        drop(sender);

        assert!(outbox.recv().await.is_some());
        assert!(outbox.recv().await.is_none());
    }
}
