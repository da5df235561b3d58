use msghub_protocol::EnvelopeKind;

/// Crate-wide result type for listener operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the listener is already started")]
    AlreadyStarted,

    #[error("the listener is not started")]
    NotStarted,

    /// No priority group matched. The fallback receivers make this
    /// unreachable unless the registry was built without them.
    #[error("no receiver group matched the {kind} envelope")]
    NoReceiverGroup { kind: EnvelopeKind },

    /// A receiver task panicked or was aborted.
    #[error("receiver task failed: {0}")]
    ReceiverTask(#[from] tokio::task::JoinError),

    /// A predicate panicked while candidates were being collected.
    #[error("predicate panicked while matching the {kind} envelope: {detail}")]
    PredicatePanicked { kind: EnvelopeKind, detail: String },

    /// The in-memory channel was dropped while envelopes were being injected.
    #[error("channel closed: cannot deliver {kind} envelope")]
    ChannelClosed { kind: EnvelopeKind },
}
