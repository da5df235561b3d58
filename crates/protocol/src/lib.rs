//! Envelope definitions for an established msghub session.
//!
//! Three envelope kinds travel over a session:
//! - `Message`: application content between two nodes
//! - `Notification`: delivery lifecycle events about a message
//! - `Command`: request/response exchanges on a resource URI
//!
//! All envelopes are JSON objects; the kind is recognised by its
//! distinguishing key (see [`Envelope::from_json`]).

pub mod envelope;
pub mod error;
pub mod node;
pub mod reason;

pub use {
    envelope::{
        Command, CommandMethod, CommandStatus, Envelope, EnvelopeKind, Event, Message, Metadata,
        Notification, TEXT_PLAIN,
    },
    error::{Error, Result},
    node::Node,
    reason::{Reason, ReasonError, reason_codes},
};
