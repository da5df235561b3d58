use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Node, Reason, Result};

/// Free-form envelope metadata.
pub type Metadata = BTreeMap<String, String>;

pub const TEXT_PLAIN: &str = "text/plain";

fn default_media_type() -> String {
    TEXT_PLAIN.to_string()
}

// ── Kinds ────────────────────────────────────────────────────────────────────

/// The three envelope kinds that travel over a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Message,
    Notification,
    Command,
}

impl EnvelopeKind {
    pub const ALL: &'static [EnvelopeKind] = &[Self::Message, Self::Notification, Self::Command];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Notification => "notification",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Message ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Node>,
    /// Node the message was sent on behalf of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pp: Option<Node>,
    #[serde(rename = "type", default = "default_media_type")]
    pub content_type: String,
    pub content: serde_json::Value,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Message {
    /// Plain-text message with no addressing.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            from: None,
            to: None,
            pp: None,
            content_type: default_media_type(),
            content: serde_json::Value::String(text.into()),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: Node) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn with_to(mut self, to: Node) -> Self {
        self.to = Some(to);
        self
    }

    /// Who acknowledgments go back to: `pp` when present, else `from`.
    pub fn sender(&self) -> Option<&Node> {
        self.pp.as_ref().or(self.from.as_ref())
    }

    /// Content as text, when the content is a JSON string.
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_str()
    }

    pub fn to_received_notification(&self) -> Notification {
        self.to_notification(Event::Received, None)
    }

    pub fn to_consumed_notification(&self) -> Notification {
        self.to_notification(Event::Consumed, None)
    }

    pub fn to_failed_notification(&self, reason: Reason) -> Notification {
        self.to_notification(Event::Failed, Some(reason))
    }

    fn to_notification(&self, event: Event, reason: Option<Reason>) -> Notification {
        Notification {
            id: self.id.clone(),
            from: None,
            to: self.sender().cloned(),
            pp: None,
            event,
            reason,
            metadata: Metadata::new(),
        }
    }
}

// ── Notification ─────────────────────────────────────────────────────────────

/// Delivery lifecycle events reported for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Accepted,
    Dispatched,
    Received,
    Consumed,
    Failed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Dispatched => "dispatched",
            Self::Received => "received",
            Self::Consumed => "consumed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pp: Option<Node>,
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Notification {
    pub fn new(event: Event) -> Self {
        Self {
            id: None,
            from: None,
            to: None,
            pp: None,
            event,
            reason: None,
            metadata: Metadata::new(),
        }
    }
}

// ── Command ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMethod {
    Get,
    Set,
    Merge,
    Delete,
    Subscribe,
    Unsubscribe,
    Observe,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// A request that still awaits a response.
    #[default]
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pp: Option<Node>,
    pub method: CommandMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    #[serde(default)]
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Command {
    /// A pending request for `uri`.
    pub fn request(method: CommandMethod, uri: impl Into<String>) -> Self {
        Self {
            id: None,
            from: None,
            to: None,
            pp: None,
            method,
            uri: Some(uri.into()),
            content_type: None,
            resource: None,
            status: CommandStatus::Pending,
            reason: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: Node) -> Self {
        self.from = Some(from);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == CommandStatus::Pending
    }

    /// Response reporting that this request failed.
    ///
    /// Keeps the request id and method and is addressed to the request's
    /// `from` node.
    pub fn to_failure_response(&self, reason: Reason) -> Command {
        Command {
            status: CommandStatus::Failure,
            reason: Some(reason),
            ..self.response_skeleton()
        }
    }

    /// Response reporting success, optionally carrying a resource.
    pub fn to_success_response(
        &self,
        content_type: Option<String>,
        resource: Option<serde_json::Value>,
    ) -> Command {
        Command {
            status: CommandStatus::Success,
            content_type,
            resource,
            ..self.response_skeleton()
        }
    }

    fn response_skeleton(&self) -> Command {
        Command {
            id: self.id.clone(),
            from: None,
            to: self.from.clone(),
            pp: None,
            method: self.method,
            uri: None,
            content_type: None,
            resource: None,
            status: CommandStatus::Pending,
            reason: None,
            metadata: Metadata::new(),
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// Any envelope, as read from a JSON stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Message(Message),
    Notification(Notification),
    Command(Command),
}

impl Envelope {
    /// Decode one JSON object, picking the kind from its distinguishing key:
    /// `content` for messages, `event` for notifications, `method` for
    /// commands.
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::UnknownEnvelope);
        };
        if object.contains_key("content") {
            Ok(Self::Message(serde_json::from_value(value)?))
        } else if object.contains_key("event") {
            Ok(Self::Notification(serde_json::from_value(value)?))
        } else if object.contains_key("method") {
            Ok(Self::Command(serde_json::from_value(value)?))
        } else {
            Err(Error::UnknownEnvelope)
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Message(_) => EnvelopeKind::Message,
            Self::Notification(_) => EnvelopeKind::Notification,
            Self::Command(_) => EnvelopeKind::Command,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Message(m) => m.id.as_deref(),
            Self::Notification(n) => n.id.as_deref(),
            Self::Command(c) => c.id.as_deref(),
        }
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Notification> for Envelope {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<Command> for Envelope {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}
