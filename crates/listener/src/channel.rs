//! Inbound side of a session: per-kind envelope streams.

use std::sync::Arc;

use {
    futures::stream::{self, BoxStream},
    msghub_protocol::{Command, Envelope, EnvelopeKind, Message, Notification},
    tokio::sync::{Mutex, mpsc},
};

use crate::error::{Error, Result};

/// Source of inbound envelopes, one stream per kind.
///
/// The listener asks for fresh streams on every start. A stream that ends
/// means the session has nothing more of that kind to deliver.
pub trait ReceiverChannel: Send + Sync {
    fn message_stream(&self) -> BoxStream<'static, Message>;
    fn notification_stream(&self) -> BoxStream<'static, Notification>;
    fn command_stream(&self) -> BoxStream<'static, Command>;
}

// ── Loopback ────────────────────────────────────────────────────────────────

type Shared<E> = Arc<Mutex<mpsc::UnboundedReceiver<E>>>;

/// In-memory channel fed by a [`LoopbackInjector`].
///
/// Streams share the underlying queues, so a listener stopped and started
/// again picks up whatever was injected in between.
#[derive(Clone)]
pub struct LoopbackChannel {
    messages: Shared<Message>,
    notifications: Shared<Notification>,
    commands: Shared<Command>,
}

/// Writing end of a [`LoopbackChannel`].
#[derive(Clone)]
pub struct LoopbackInjector {
    messages: mpsc::UnboundedSender<Message>,
    notifications: mpsc::UnboundedSender<Notification>,
    commands: mpsc::UnboundedSender<Command>,
}

pub fn loopback() -> (LoopbackChannel, LoopbackInjector) {
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    (
        LoopbackChannel {
            messages: Arc::new(Mutex::new(messages_rx)),
            notifications: Arc::new(Mutex::new(notifications_rx)),
            commands: Arc::new(Mutex::new(commands_rx)),
        },
        LoopbackInjector {
            messages: messages_tx,
            notifications: notifications_tx,
            commands: commands_tx,
        },
    )
}

fn shared_stream<E: Send + 'static>(rx: &Shared<E>) -> BoxStream<'static, E> {
    Box::pin(stream::unfold(Arc::clone(rx), |rx| async move {
        let next = rx.lock().await.recv().await;
        next.map(|envelope| (envelope, rx))
    }))
}

impl ReceiverChannel for LoopbackChannel {
    fn message_stream(&self) -> BoxStream<'static, Message> {
        shared_stream(&self.messages)
    }

    fn notification_stream(&self) -> BoxStream<'static, Notification> {
        shared_stream(&self.notifications)
    }

    fn command_stream(&self) -> BoxStream<'static, Command> {
        shared_stream(&self.commands)
    }
}

impl LoopbackInjector {
    pub fn send_message(&self, message: Message) -> Result<()> {
        self.messages.send(message).map_err(|_| Error::ChannelClosed {
            kind: EnvelopeKind::Message,
        })
    }

    pub fn send_notification(&self, notification: Notification) -> Result<()> {
        self.notifications
            .send(notification)
            .map_err(|_| Error::ChannelClosed {
                kind: EnvelopeKind::Notification,
            })
    }

    pub fn send_command(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::ChannelClosed {
            kind: EnvelopeKind::Command,
        })
    }

    /// Route an envelope of any kind to its stream.
    pub fn send_envelope(&self, envelope: Envelope) -> Result<()> {
        match envelope {
            Envelope::Message(message) => self.send_message(message),
            Envelope::Notification(notification) => self.send_notification(notification),
            Envelope::Command(command) => self.send_command(command),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::StreamExt,
        msghub_protocol::{CommandMethod, Event},
    };

    #[tokio::test]
    async fn envelopes_land_on_their_own_stream() {
        let (channel, injector) = loopback();
        injector
            .send_envelope(Envelope::from(Message::text("hi")))
            .unwrap();
        injector
            .send_envelope(Notification::new(Event::Received).into())
            .unwrap();
        injector
            .send_envelope(Command::request(CommandMethod::Get, "/ping").into())
            .unwrap();

        let message = channel.message_stream().next().await.unwrap();
        assert_eq!(message.content_text(), Some("hi"));
        let notification = channel.notification_stream().next().await.unwrap();
        assert_eq!(notification.event, Event::Received);
        let command = channel.command_stream().next().await.unwrap();
        assert_eq!(command.uri.as_deref(), Some("/ping"));
    }

    #[tokio::test]
    async fn a_new_stream_resumes_the_queue() {
        let (channel, injector) = loopback();
        injector.send_message(Message::text("one")).unwrap();
        injector.send_message(Message::text("two")).unwrap();

        let mut first = channel.message_stream();
        assert_eq!(first.next().await.unwrap().content_text(), Some("one"));
        drop(first);

        let mut second = channel.message_stream();
        assert_eq!(second.next().await.unwrap().content_text(), Some("two"));
    }

    #[tokio::test]
    async fn stream_ends_when_the_injector_is_dropped() {
        let (channel, injector) = loopback();
        drop(injector);
        assert!(channel.command_stream().next().await.is_none());
    }

    #[tokio::test]
    async fn injecting_into_a_dropped_channel_fails() {
        let (channel, injector) = loopback();
        drop(channel);
        assert!(matches!(
            injector.send_message(Message::text("lost")),
            Err(Error::ChannelClosed {
                kind: EnvelopeKind::Message
            })
        ));
    }
}
