//! Error taxonomy for pairing requests and workflow transitions.
//!
//! [`PairingError`] is returned by every [`crate::PairingStore`] method and by
//! the mutating [`crate::PairingWorkflow`] operations. The workflow never lets
//! one escape as a panic; every failure also lands in the workflow state as a
//! displayable reason (see [`PairingError::reason`]).

use std::time::Duration;

use thiserror::Error;

/// Reason shown when the store rejects a request without a `detail` message.
pub const FALLBACK_REASON: &str = "error";

/// Reason shown when a request did not complete within the configured bound.
pub const TIMEOUT_REASON: &str = "timeout";

/// Reason recorded when the caller drops an outstanding request.
pub const CANCELLED_REASON: &str = "cancelled";

/// Errors produced while talking to the pairing store or driving a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairingError {
    /// The request never produced a response (connection refused, DNS, TLS).
    #[error("Network error: {message}")]
    Network {
        /// Transport-level description of the failure.
        message: String,
    },

    /// The store answered with a non-2xx status.
    ///
    /// `detail` is taken from a JSON body of the form `{"detail": "..."}`
    /// when the store sends one.
    #[error("Request rejected with status {status}: {}", rejection_reason(.detail.as_deref()))]
    RemoteRejection {
        /// HTTP status code of the response.
        status: u16,
        /// Human-readable explanation supplied by the store, if any.
        detail: Option<String>,
    },

    /// No response arrived within the configured timeout.
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The operation is not permitted in the workflow's current state.
    ///
    /// No request is issued.
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        /// The attempted operation (e.g. `"trigger sync"`).
        operation: &'static str,
        /// Label of the state the workflow was in.
        state: String,
    },

    /// The workflow was dismissed while a request was outstanding; the
    /// response was discarded.
    #[error("Workflow dismissed before the response arrived")]
    Dismissed,

    /// The store client could not be constructed from its configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl PairingError {
    /// Message to render inline next to the action that failed.
    ///
    /// Rejections surface the store's `detail` verbatim, falling back to
    /// [`FALLBACK_REASON`] when it is missing or empty. Timeouts surface
    /// [`TIMEOUT_REASON`].
    pub fn reason(&self) -> String {
        match self {
            Self::RemoteRejection { detail, .. } => rejection_reason(detail.as_deref()).to_string(),
            Self::Timeout { .. } => TIMEOUT_REASON.to_string(),
            Self::Network { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn rejection_reason(detail: Option<&str>) -> &str {
    detail
        .filter(|detail| !detail.is_empty())
        .unwrap_or(FALLBACK_REASON)
}
