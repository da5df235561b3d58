//! Shared error plumbing and the per-identity state store used across msghub
//! crates.

pub mod error;
pub mod state;

pub use {
    error::{BoxedSource, Error, FromContext, Result},
    state::{DEFAULT_STATE, InMemoryStateManager, StateManager},
};
