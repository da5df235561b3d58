//! Client-side envelope listener.
//!
//! A [`Listener`] consumes the message, notification and command streams of
//! an established session and routes each envelope to the receivers
//! registered for its kind:
//!
//! - predicates are evaluated in registration order
//! - among matching registrations, the lowest priority value wins and every
//!   receiver sharing it runs concurrently
//! - built-in fallbacks at [`FALLBACK_PRIORITY`] guarantee that something
//!   always handles the envelope
//!
//! Messages are acknowledged with `received`, then `consumed` or `failed`
//! notifications; failed pending commands are answered with a failure
//! response; notification failures are only logged.

pub mod channel;
pub mod context;
mod dispatch;
pub mod envelope;
pub mod error;
pub mod feedback;
mod listener;
mod pipeline;
pub mod predicate;
pub mod receiver;
pub mod registry;
pub mod sender;
pub mod state;

pub use {
    channel::{LoopbackChannel, LoopbackInjector, ReceiverChannel, loopback},
    context::DispatchContext,
    envelope::InboundEnvelope,
    error::{Error, Result},
    feedback::reason_for,
    listener::Listener,
    predicate::EnvelopePredicate,
    receiver::EnvelopeReceiver,
    registry::{DEFAULT_PRIORITY, FALLBACK_PRIORITY, ReceiverRegistration},
    sender::{EnvelopeSender, Outbox, OutboxSender},
    state::{OutStateReceiver, StateIs, state_is},
};
