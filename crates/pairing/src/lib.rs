//! Core pairing domain for the Kitsu/Ayon integration.
//!
//! This crate turns a Kitsu project into an Ayon pairing: it derives a valid
//! Ayon name and code from the Kitsu name, drives the per-project pairing
//! workflow, and triggers synchronisation once a project is paired.
//! Infrastructure crates implement [`PairingStore`]; they never add domain
//! rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network
//! dependencies. It defines *what* is needed; infrastructure crates define
//! *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`KitsuProjectId`, `AyonProjectName`, `WorkflowId`) |
//! | [`types`] | Wire records and value types (`Pairing`, `PairingRequest`, `DerivedIdentifier`) |
//! | [`errors`] | [`PairingError`] and the displayable failure reasons |
//! | [`derive`] | Identifier Deriver |
//! | [`workflow`] | Pairing workflow state machine |
//! | [`board`] | Cached pairing list and per-entry actions |
//! | [`store`] | [`PairingStore`] port |

pub mod board;
pub mod derive;
pub mod errors;
pub mod identifiers;
pub mod store;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use board::{BoardEntry, PairingAction, PairingBoard};
pub use derive::{derive, derive_target_code, derive_target_name, MAX_CODE_LEN};
pub use errors::{PairingError, CANCELLED_REASON, FALLBACK_REASON, TIMEOUT_REASON};
pub use identifiers::{AyonProjectName, KitsuProjectId, WorkflowId};
pub use store::PairingStore;
pub use types::{DerivedIdentifier, Pairing, PairingCandidate, PairingRequest, Timestamp};
pub use workflow::{
    DismissHandle, PairingWorkflow, Transition, WorkflowState, DEFAULT_REQUEST_TIMEOUT,
};
