use std::sync::{Arc, RwLock};

use {
    msghub_protocol::{Command, Message, Notification},
    tracing::debug,
};

use crate::{
    envelope::InboundEnvelope,
    predicate::{self, Always, EnvelopePredicate},
    receiver::{
        BlackholeReceiver, EnvelopeReceiver, UnsupportedCommandReceiver,
        UnsupportedMessageReceiver,
    },
};

/// Priority of registrations that don't ask for one.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Priority of the built-in fallbacks; nothing can rank below them.
pub const FALLBACK_PRIORITY: i32 = i32::MAX;

/// Produces the receiver for one invocation.
pub type ReceiverFactory<E> = Arc<dyn Fn() -> Arc<dyn EnvelopeReceiver<E>> + Send + Sync>;

// ── Registration ────────────────────────────────────────────────────────────

/// A receiver factory with the predicate and priority that decide when it
/// runs. Lower priority values win.
pub struct ReceiverRegistration<E: InboundEnvelope> {
    factory: ReceiverFactory<E>,
    predicate: Arc<dyn EnvelopePredicate<E>>,
    priority: i32,
}

impl<E: InboundEnvelope> ReceiverRegistration<E> {
    /// Registration calling `factory` for every matching envelope.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn EnvelopeReceiver<E>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            predicate: Arc::new(Always),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Registration reusing one receiver instance for every envelope.
    pub fn shared(receiver: Arc<dyn EnvelopeReceiver<E>>) -> Self {
        Self::new(move || Arc::clone(&receiver))
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: impl EnvelopePredicate<E> + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Shorthand for [`with_predicate`](Self::with_predicate) with a
    /// synchronous closure.
    #[must_use]
    pub fn with_filter<F>(self, filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.with_predicate(predicate::from_fn(filter))
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub async fn matches(&self, envelope: &E) -> anyhow::Result<bool> {
        self.predicate.matches(envelope).await
    }

    pub fn create_receiver(&self) -> Arc<dyn EnvelopeReceiver<E>> {
        (self.factory)()
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Append-only list of registrations for one envelope kind.
///
/// Readers take a snapshot of the `Arc`ed entries, so appending while a
/// dispatch is iterating never disturbs it.
pub struct Registry<E: InboundEnvelope> {
    entries: RwLock<Vec<Arc<ReceiverRegistration<E>>>>,
}

impl<E: InboundEnvelope> Registry<E> {
    /// A registry without fallback. Dispatching through it can find no
    /// group; [`Registries`] always installs one.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn with_fallback(receiver: Arc<dyn EnvelopeReceiver<E>>) -> Self {
        let registry = Self::empty();
        registry.add(ReceiverRegistration::shared(receiver).with_priority(FALLBACK_PRIORITY));
        registry
    }

    pub fn add(&self, registration: ReceiverRegistration<E>) {
        let priority = registration.priority;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(Arc::new(registration));
        debug!(
            kind = %E::KIND,
            priority,
            count = entries.len(),
            "receiver registered"
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in registration order, as of now.
    pub fn snapshot(&self) -> Vec<Arc<ReceiverRegistration<E>>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Registrations whose predicate accepts `envelope`.
    ///
    /// Predicates run one after another in registration order, so
    /// side-effecting predicates observe a deterministic sequence. The first
    /// predicate error aborts the evaluation.
    pub async fn candidates(
        &self,
        envelope: &E,
    ) -> anyhow::Result<Vec<Arc<ReceiverRegistration<E>>>> {
        let mut matched = Vec::new();
        for registration in self.snapshot() {
            if registration.matches(envelope).await? {
                matched.push(registration);
            }
        }
        Ok(matched)
    }
}

/// The registrations chosen to handle one envelope.
pub struct PriorityGroup<E: InboundEnvelope> {
    pub priority: i32,
    pub registrations: Vec<Arc<ReceiverRegistration<E>>>,
}

/// Keep only the candidates sharing the lowest priority value.
///
/// Registration order is preserved within the group. `None` only when there
/// were no candidates at all.
pub fn select_group<E: InboundEnvelope>(
    candidates: Vec<Arc<ReceiverRegistration<E>>>,
) -> Option<PriorityGroup<E>> {
    let priority = candidates.iter().map(|r| r.priority).min()?;
    let registrations = candidates
        .into_iter()
        .filter(|r| r.priority == priority)
        .collect();
    Some(PriorityGroup {
        priority,
        registrations,
    })
}

// ── Registries ──────────────────────────────────────────────────────────────

/// One registry per envelope kind, each seeded with its fallback: unsupported
/// for messages and commands, a silent blackhole for notifications.
pub struct Registries {
    pub messages: Registry<Message>,
    pub notifications: Registry<Notification>,
    pub commands: Registry<Command>,
}

impl Registries {
    pub fn new() -> Self {
        Self {
            messages: Registry::with_fallback(Arc::new(UnsupportedMessageReceiver)),
            notifications: Registry::with_fallback(Arc::new(BlackholeReceiver::default())),
            commands: Registry::with_fallback(Arc::new(UnsupportedCommandReceiver)),
        }
    }

    pub fn add<E: InboundEnvelope>(&self, registration: ReceiverRegistration<E>) {
        E::registry(self).add(registration);
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}
