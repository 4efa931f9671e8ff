//! The pairing list as seen by an operator.
//!
//! [`PairingBoard`] keeps a read-only copy of the store's pairing list,
//! tells the caller which action each entry offers, opens workflows for
//! entries, and re-fetches the list after a workflow changes the store.

use std::time::Duration;

use tracing::{debug, info};

use crate::workflow::DEFAULT_REQUEST_TIMEOUT;
use crate::{
    AyonProjectName, KitsuProjectId, Pairing, PairingError, PairingStore, PairingWorkflow,
    WorkflowState,
};

/// The action an entry of the list offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingAction {
    /// Not paired yet; offer "Pair project".
    Pair,
    /// Already paired; offer "Sync now".
    Sync { project: AyonProjectName },
}

/// A pairing record together with the action it offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEntry<'a> {
    pub pairing: &'a Pairing,
    pub action: PairingAction,
}

/// Cached pairing list backed by a [`PairingStore`].
pub struct PairingBoard<S> {
    store: S,
    pairings: Vec<Pairing>,
    timeout: Duration,
}

impl<S: PairingStore + Clone> PairingBoard<S> {
    /// Creates an empty board; call [`reload`](Self::reload) to populate it.
    pub fn new(store: S) -> Self {
        Self {
            store,
            pairings: Vec::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Timeout applied to the list request and handed to opened workflows.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the cached list with the store's current list.
    ///
    /// On failure the previous list is kept.
    pub async fn reload(&mut self) -> Result<&[Pairing], PairingError> {
        let pairings = match tokio::time::timeout(self.timeout, self.store.list_pairings()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PairingError::Timeout {
                    after: self.timeout,
                })
            }
        };
        debug!(count = pairings.len(), "Loaded pairing list");
        self.pairings = pairings;
        Ok(self.pairings.as_slice())
    }

    /// The cached list, in store order.
    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    /// Every cached record with the action it offers.
    pub fn entries(&self) -> Vec<BoardEntry<'_>> {
        self.pairings
            .iter()
            .map(|pairing| BoardEntry {
                pairing,
                action: match &pairing.ayon_project_name {
                    Some(project) => PairingAction::Sync {
                        project: project.clone(),
                    },
                    None => PairingAction::Pair,
                },
            })
            .collect()
    }

    /// Looks up the record of one Kitsu project.
    pub fn find(&self, kitsu_project_id: &KitsuProjectId) -> Option<&Pairing> {
        self.pairings
            .iter()
            .find(|p| &p.kitsu_project_id == kitsu_project_id)
    }

    /// Opens a workflow for one Kitsu project of the cached list.
    ///
    /// Paired records open directly in [`WorkflowState::Paired`].
    pub fn open(&self, kitsu_project_id: &KitsuProjectId) -> Option<PairingWorkflow<S>> {
        let pairing = self.find(kitsu_project_id)?;
        Some(PairingWorkflow::for_pairing(self.store.clone(), pairing).with_timeout(self.timeout))
    }

    /// Reloads the list if `workflow` changed the store's pairings.
    ///
    /// Returns `true` when a reload happened.
    pub async fn complete(&mut self, workflow: &PairingWorkflow<S>) -> Result<bool, PairingError> {
        if !matches!(workflow.state(), WorkflowState::Paired { .. }) {
            return Ok(false);
        }
        info!(workflow_id = %workflow.id(), "Reloading pairing list after pairing");
        self.reload().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{pairing, FakeStore};

    fn board() -> PairingBoard<Arc<FakeStore>> {
        PairingBoard::new(Arc::new(FakeStore::with_pairings(vec![
            pairing("1", "Alpha", Some("Alpha")),
            pairing("2", "Big Movie (2024)", None),
        ])))
    }

    fn id(value: &str) -> KitsuProjectId {
        KitsuProjectId::new(value).unwrap()
    }

    #[tokio::test]
    async fn entries_offer_pair_or_sync() {
        let mut board = board();
        board.reload().await.unwrap();

        let actions: Vec<_> = board.entries().into_iter().map(|e| e.action).collect();

        assert_eq!(
            actions,
            vec![
                PairingAction::Sync {
                    project: AyonProjectName::new("Alpha").unwrap()
                },
                PairingAction::Pair,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_project_opens_nothing() {
        let mut board = board();
        board.reload().await.unwrap();

        assert!(board.open(&id("99")).is_none());
    }

    #[tokio::test]
    async fn paired_entry_opens_ready_to_sync() {
        let mut board = board();
        board.reload().await.unwrap();

        let mut workflow = board.open(&id("1")).unwrap();
        workflow.trigger_sync().await.unwrap();

        assert_eq!(workflow.store().synced()[0].as_str(), "Alpha");
    }

    #[tokio::test]
    async fn successful_pairing_reloads_the_list() {
        let mut board = board();
        board.reload().await.unwrap();

        let mut workflow = board.open(&id("2")).unwrap();
        workflow.propose().unwrap();
        workflow.submit().await.unwrap();
        let reloaded = board.complete(&workflow).await.unwrap();

        assert!(reloaded);
        assert_eq!(workflow.store().list_calls(), 2);
        let entry = board.find(&id("2")).unwrap();
        assert_eq!(
            entry.ayon_project_name.as_ref().map(AyonProjectName::as_str),
            Some("Big_Movie_2024")
        );
    }

    #[tokio::test]
    async fn failed_pairing_does_not_reload() {
        let mut board = board();
        board.reload().await.unwrap();
        let store = board.open(&id("2")).unwrap().store().clone();
        store.push_create_result(Err(PairingError::RemoteRejection {
            status: 400,
            detail: None,
        }));

        let mut workflow = board.open(&id("2")).unwrap();
        workflow.propose().unwrap();
        workflow.submit().await.unwrap_err();

        assert!(!board.complete(&workflow).await.unwrap());
        assert_eq!(store.list_calls(), 1);
        assert!(!board.find(&id("2")).unwrap().is_paired());
    }
}
