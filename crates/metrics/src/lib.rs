//! Metric names for msghub, recorded through the `metrics` crate facade.
//!
//! Nothing is exported until the embedding application installs a recorder;
//! without one every macro call is a no-op.
//!
//! ```rust,ignore
//! use msghub_metrics::{counter, labels, listener};
//!
//! counter!(listener::ENVELOPES_RECEIVED_TOTAL, labels::KIND => "message").increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
