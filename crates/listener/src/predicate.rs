//! Predicates deciding whether a registration applies to an envelope.

use {anyhow::Result, async_trait::async_trait};

/// Async filter evaluated once per envelope and registration.
///
/// An error aborts the dispatch of that envelope and is reported like a
/// receiver failure.
#[async_trait]
pub trait EnvelopePredicate<E: Sync>: Send + Sync {
    async fn matches(&self, envelope: &E) -> Result<bool>;
}

/// Matches every envelope. Used when a registration has no predicate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Always;

#[async_trait]
impl<E: Sync> EnvelopePredicate<E> for Always {
    async fn matches(&self, _envelope: &E) -> Result<bool> {
        Ok(true)
    }
}

/// Predicate backed by a synchronous closure.
pub struct FnPredicate<F> {
    f: F,
}

pub fn from_fn<F>(f: F) -> FnPredicate<F> {
    FnPredicate { f }
}

#[async_trait]
impl<E, F> EnvelopePredicate<E> for FnPredicate<F>
where
    E: Sync,
    F: Fn(&E) -> bool + Send + Sync,
{
    async fn matches(&self, envelope: &E) -> Result<bool> {
        Ok((self.f)(envelope))
    }
}
