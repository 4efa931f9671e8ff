//! Shared value types for the pairing domain.
//!
//! [`Pairing`] and [`PairingRequest`] are wire records exchanged with the
//! pairing store and serialise with the store's camelCase field names.
//! [`PairingCandidate`] and [`DerivedIdentifier`] are the inputs and outputs
//! of [`crate::derive`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AyonProjectName, KitsuProjectId};

// ---------------------------------------------------------------------------
// Deriver input / output
// ---------------------------------------------------------------------------

/// A foreign project offered for pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCandidate {
    pub foreign_project_id: KitsuProjectId,
    pub foreign_project_name: String,
    pub foreign_project_code: Option<String>,
}

// ---------------------------------------------------------------------------

/// Target name and code proposed for a foreign project.
///
/// Both fields are plain strings: the operator may edit them to anything,
/// and the store is the final validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivedIdentifier {
    /// Candidate Ayon project name, `[A-Za-z0-9_]*` when derived.
    pub target_name: String,
    /// Candidate Ayon project code, `[a-z0-9]{0,6}` when derived.
    pub target_code: String,
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One entry of the store's pairing list.
///
/// `ayon_project_name` absent means the Kitsu project is not paired yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub kitsu_project_id: KitsuProjectId,
    pub kitsu_project_name: String,
    #[serde(default)]
    pub kitsu_project_code: Option<String>,
    #[serde(default)]
    pub ayon_project_name: Option<AyonProjectName>,
}

impl Pairing {
    /// Returns `true` when the Kitsu project already has an Ayon counterpart.
    pub fn is_paired(&self) -> bool {
        self.ayon_project_name.is_some()
    }

    /// The foreign side of this record, as input for the deriver.
    pub fn candidate(&self) -> PairingCandidate {
        PairingCandidate {
            foreign_project_id: self.kitsu_project_id.clone(),
            foreign_project_name: self.kitsu_project_name.clone(),
            foreign_project_code: self.kitsu_project_code.clone(),
        }
    }
}

// ---------------------------------------------------------------------------

/// Body of a create-pairing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    pub kitsu_project_id: KitsuProjectId,
    pub ayon_project_name: String,
    pub ayon_project_code: String,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
