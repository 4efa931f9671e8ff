//! In-memory [`PairingStore`] used by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{AyonProjectName, KitsuProjectId, Pairing, PairingError, PairingRequest, PairingStore};

#[derive(Default)]
pub(crate) struct FakeStore {
    pairings: Mutex<Vec<Pairing>>,
    create_results: Mutex<VecDeque<Result<(), PairingError>>>,
    sync_results: Mutex<VecDeque<Result<(), PairingError>>>,
    created: Mutex<Vec<PairingRequest>>,
    synced: Mutex<Vec<AyonProjectName>>,
    list_calls: AtomicUsize,
    hang: AtomicBool,
    gate: Option<Arc<Notify>>,
}

impl FakeStore {
    pub(crate) fn with_pairings(pairings: Vec<Pairing>) -> Self {
        Self {
            pairings: Mutex::new(pairings),
            ..Self::default()
        }
    }

    /// Requests wait for `gate` to be notified before answering.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Requests never answer.
    pub(crate) fn hanging(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn push_create_result(&self, result: Result<(), PairingError>) {
        self.create_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_sync_result(&self, result: Result<(), PairingError>) {
        self.sync_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn created(&self) -> Vec<PairingRequest> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn synced(&self) -> Vec<AyonProjectName> {
        self.synced.lock().unwrap().clone()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl PairingStore for FakeStore {
    async fn list_pairings(&self) -> Result<Vec<Pairing>, PairingError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pairings.lock().unwrap().clone())
    }

    async fn create_pairing(&self, request: &PairingRequest) -> Result<(), PairingError> {
        self.created.lock().unwrap().push(request.clone());
        self.wait().await;

        let result = self
            .create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            let mut pairings = self.pairings.lock().unwrap();
            if let Some(entry) = pairings
                .iter_mut()
                .find(|p| p.kitsu_project_id == request.kitsu_project_id)
            {
                entry.ayon_project_name = AyonProjectName::new(request.ayon_project_name.clone());
            }
        }
        result
    }

    async fn trigger_sync(&self, project: &AyonProjectName) -> Result<(), PairingError> {
        self.synced.lock().unwrap().push(project.clone());
        self.wait().await;

        self.sync_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

pub(crate) fn pairing(id: &str, name: &str, ayon: Option<&str>) -> Pairing {
    Pairing {
        kitsu_project_id: KitsuProjectId::new(id).unwrap(),
        kitsu_project_name: name.to_string(),
        kitsu_project_code: None,
        ayon_project_name: ayon.and_then(AyonProjectName::new),
    }
}
