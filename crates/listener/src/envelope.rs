use msghub_protocol::{Command, EnvelopeKind, Message, Metadata, Node, Notification};

use crate::registry::{Registries, Registry};

/// Envelope kinds the listener can route.
///
/// Implemented for [`Message`], [`Notification`] and [`Command`]; each kind
/// owns its own registry inside [`Registries`].
pub trait InboundEnvelope: Clone + Send + Sync + 'static {
    const KIND: EnvelopeKind;

    fn id(&self) -> Option<&str>;
    fn from_node(&self) -> Option<&Node>;
    fn to_node(&self) -> Option<&Node>;
    fn pp_node(&self) -> Option<&Node>;
    fn metadata(&self) -> &Metadata;

    /// Kind-specific payload: message content, command resource, or the
    /// notification event.
    fn content(&self) -> Option<serde_json::Value>;

    fn registry(registries: &Registries) -> &Registry<Self>;

    /// The node replies are owed to: `pp` when present, else `from`.
    fn sender_node(&self) -> Option<&Node> {
        self.pp_node().or(self.from_node())
    }
}

impl InboundEnvelope for Message {
    const KIND: EnvelopeKind = EnvelopeKind::Message;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn from_node(&self) -> Option<&Node> {
        self.from.as_ref()
    }

    fn to_node(&self) -> Option<&Node> {
        self.to.as_ref()
    }

    fn pp_node(&self) -> Option<&Node> {
        self.pp.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn content(&self) -> Option<serde_json::Value> {
        Some(self.content.clone())
    }

    fn registry(registries: &Registries) -> &Registry<Self> {
        &registries.messages
    }
}

impl InboundEnvelope for Notification {
    const KIND: EnvelopeKind = EnvelopeKind::Notification;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn from_node(&self) -> Option<&Node> {
        self.from.as_ref()
    }

    fn to_node(&self) -> Option<&Node> {
        self.to.as_ref()
    }

    fn pp_node(&self) -> Option<&Node> {
        self.pp.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn content(&self) -> Option<serde_json::Value> {
        Some(serde_json::Value::String(self.event.as_str().to_string()))
    }

    fn registry(registries: &Registries) -> &Registry<Self> {
        &registries.notifications
    }
}

impl InboundEnvelope for Command {
    const KIND: EnvelopeKind = EnvelopeKind::Command;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn from_node(&self) -> Option<&Node> {
        self.from.as_ref()
    }

    fn to_node(&self) -> Option<&Node> {
        self.to.as_ref()
    }

    fn pp_node(&self) -> Option<&Node> {
        self.pp.as_ref()
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn content(&self) -> Option<serde_json::Value> {
        self.resource.clone()
    }

    fn registry(registries: &Registries) -> &Registry<Self> {
        &registries.commands
    }
}
