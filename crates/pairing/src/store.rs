//! Port to the external pairing store.
//!
//! The store owns the authoritative pairing list. This crate only reads it
//! and issues the two mutating requests; infrastructure crates supply the
//! transport (see the `pairing-store` crate for the HTTP implementation).

use async_trait::async_trait;

use crate::{AyonProjectName, Pairing, PairingError, PairingRequest};

/// Access to the pairing store.
///
/// Implementations attach authentication themselves; callers never see
/// tokens or headers.
#[async_trait]
pub trait PairingStore: Send + Sync {
    /// Fetches every known Kitsu project with its Ayon counterpart, if any.
    ///
    /// Order is the store's and carries no meaning.
    async fn list_pairings(&self) -> Result<Vec<Pairing>, PairingError>;

    /// Asks the store to create an Ayon project and pair it with a Kitsu project.
    async fn create_pairing(&self, request: &PairingRequest) -> Result<(), PairingError>;

    /// Asks the store to start synchronising an already-paired project.
    ///
    /// Success means the trigger was accepted, not that the sync finished.
    async fn trigger_sync(&self, project: &AyonProjectName) -> Result<(), PairingError>;
}

#[async_trait]
impl<S: PairingStore + ?Sized> PairingStore for std::sync::Arc<S> {
    async fn list_pairings(&self) -> Result<Vec<Pairing>, PairingError> {
        (**self).list_pairings().await
    }

    async fn create_pairing(&self, request: &PairingRequest) -> Result<(), PairingError> {
        (**self).create_pairing(request).await
    }

    async fn trigger_sync(&self, project: &AyonProjectName) -> Result<(), PairingError> {
        (**self).trigger_sync(project).await
    }
}
