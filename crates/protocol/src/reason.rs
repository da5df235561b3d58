use std::fmt;

use serde::{Deserialize, Serialize};

// ── Reason codes ─────────────────────────────────────────────────────────────

pub mod reason_codes {
    pub const GENERAL_ERROR: i32 = 1;
    pub const VALIDATION_ERROR: i32 = 21;
    pub const AUTHORIZATION_ERROR: i32 = 31;
    pub const ROUTING_ERROR: i32 = 41;
    pub const DISPATCH_ERROR: i32 = 51;
    pub const COMMAND_PROCESSING_ERROR: i32 = 61;
    pub const COMMAND_RESOURCE_NOT_SUPPORTED: i32 = 62;
    pub const COMMAND_METHOD_NOT_SUPPORTED: i32 = 63;
    pub const NOTIFICATION_PROCESSING_ERROR: i32 = 71;
    pub const MESSAGE_PROCESSING_ERROR: i32 = 81;
    pub const MESSAGE_UNSUPPORTED_CONTENT_TYPE: i32 = 82;
    pub const APPLICATION_ERROR: i32 = 101;
}

// ── Reason ───────────────────────────────────────────────────────────────────

/// Machine-readable failure cause carried by failed notifications and
/// failure command responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Reason {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: Some(description.into()),
        }
    }

    pub fn application_error(description: impl Into<String>) -> Self {
        Self::new(reason_codes::APPLICATION_ERROR, description)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{description} (code {})", self.code),
            None => write!(f, "code {}", self.code),
        }
    }
}

/// A failure that already knows which [`Reason`] to report to the peer.
///
/// Receivers return this (usually wrapped in `anyhow::Error`) when the
/// failure should be forwarded verbatim instead of being reported as a
/// generic application error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct ReasonError {
    pub reason: Reason,
}

impl ReasonError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            reason: Reason::new(code, description),
        }
    }
}

impl From<Reason> for ReasonError {
    fn from(reason: Reason) -> Self {
        Self { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let reason = Reason::new(21, "bad state");
        assert_eq!(reason.to_string(), "bad state (code 21)");
        let bare = Reason {
            code: 1,
            description: None,
        };
        assert_eq!(bare.to_string(), "code 1");
    }

    #[test]
    fn application_error_uses_generic_code() {
        let reason = Reason::application_error("boom");
        assert_eq!(reason.code, reason_codes::APPLICATION_ERROR);
        assert_eq!(reason.description.as_deref(), Some("boom"));
    }
}
