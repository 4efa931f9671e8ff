//! Pairing Workflow Controller.
//!
//! One [`PairingWorkflow`] exists per opened pairing action. It seeds the
//! operator's form from [`crate::derive`], accepts edits, submits the
//! create-pairing request, and once paired offers the sync trigger.
//!
//! ## States
//!
//! ```text
//! Idle -> AwaitingInput -> Submitting -> Paired | Failed(reason)
//! Failed(reason) -> Submitting                      (retry)
//! Paired | SyncOk | SyncFailed -> SyncTriggered -> SyncOk | SyncFailed(reason)
//! any -> Dismissed
//! ```
//!
//! Operations attempted outside their states fail fast with
//! [`PairingError::InvalidTransition`] and issue no request. Mutating
//! operations take `&mut self`, so one workflow can never have two requests
//! in flight. Two workflows for the same Kitsu project are not coordinated;
//! callers that open several must guard against duplicate submissions.
//!
//! Every request is bounded by the workflow timeout. A response that arrives
//! after [`DismissHandle::dismiss`] is dropped. Dropping a `submit` or
//! `trigger_sync` future before it resolves leaves the workflow failed with
//! [`CANCELLED_REASON`], so the action stays retryable.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::derive::derive;
use crate::{
    AyonProjectName, DerivedIdentifier, Pairing, PairingCandidate, PairingError, PairingRequest,
    PairingStore, Timestamp, WorkflowId, CANCELLED_REASON,
};

/// Bound applied to each request unless overridden with
/// [`PairingWorkflow::with_timeout`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where a pairing workflow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    /// Created, no proposal yet.
    Idle,
    /// Defaults proposed; the operator may edit and submit.
    AwaitingInput,
    /// Create-pairing request outstanding.
    Submitting,
    /// The store accepted the pairing.
    Paired {
        /// Ayon project name the Kitsu project is paired with.
        project: String,
    },
    /// The create-pairing request failed. Submitting again is allowed.
    Failed {
        /// Displayable failure message.
        reason: String,
    },
    /// Sync-trigger request outstanding.
    SyncTriggered { project: String },
    /// The store accepted the sync trigger.
    SyncOk { project: String },
    /// The sync-trigger request failed. Triggering again is allowed.
    SyncFailed { project: String, reason: String },
    /// The operator closed the action; nothing further is reported.
    Dismissed,
}

impl WorkflowState {
    /// Short label used in logs and transition errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingInput => "awaiting input",
            Self::Submitting => "submitting",
            Self::Paired { .. } => "paired",
            Self::Failed { .. } => "failed",
            Self::SyncTriggered { .. } => "sync triggered",
            Self::SyncOk { .. } => "synced",
            Self::SyncFailed { .. } => "sync failed",
            Self::Dismissed => "dismissed",
        }
    }

    /// `true` while a request is outstanding; trigger controls should be
    /// disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::SyncTriggered { .. })
    }

    /// The failure message to render inline, if the last request failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } | Self::SyncFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// The Ayon project this workflow is paired with, once it is.
    pub fn paired_project(&self) -> Option<&str> {
        match self {
            Self::Paired { project }
            | Self::SyncTriggered { project }
            | Self::SyncOk { project }
            | Self::SyncFailed { project, .. } => Some(project),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of a workflow's transition log.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: WorkflowState,
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// Dismissal
// ---------------------------------------------------------------------------

/// Cloneable handle that dismisses a workflow from outside the task driving it.
#[derive(Debug, Clone, Default)]
pub struct DismissHandle(Arc<AtomicBool>);

impl DismissHandle {
    /// Marks the workflow dismissed. Idempotent.
    pub fn dismiss(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`dismiss`](Self::dismiss) has been called.
    pub fn is_dismissed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// State machine for pairing one Kitsu project and triggering its sync.
pub struct PairingWorkflow<S> {
    id: WorkflowId,
    store: S,
    candidate: PairingCandidate,
    state: WorkflowState,
    draft: DerivedIdentifier,
    dismissal: DismissHandle,
    timeout: Duration,
    history: Vec<Transition>,
}

impl<S: PairingStore> PairingWorkflow<S> {
    /// Opens a workflow for an unpaired Kitsu project.
    pub fn new(store: S, candidate: PairingCandidate) -> Self {
        Self::with_state(store, candidate, WorkflowState::Idle)
    }

    /// Opens a workflow for a store record.
    ///
    /// Records that already carry an Ayon project start in
    /// [`WorkflowState::Paired`], which makes the sync trigger reachable.
    pub fn for_pairing(store: S, pairing: &Pairing) -> Self {
        let state = match &pairing.ayon_project_name {
            Some(project) => WorkflowState::Paired {
                project: project.as_str().to_string(),
            },
            None => WorkflowState::Idle,
        };
        Self::with_state(store, pairing.candidate(), state)
    }

    fn with_state(store: S, candidate: PairingCandidate, state: WorkflowState) -> Self {
        let id = WorkflowId::new_random();
        debug!(
            workflow_id = %id,
            kitsu_project_id = %candidate.foreign_project_id,
            state = %state,
            "Opened pairing workflow"
        );
        Self {
            id,
            store,
            candidate,
            history: vec![Transition {
                state: state.clone(),
                at: Timestamp::now(),
            }],
            state,
            draft: DerivedIdentifier::default(),
            dismissal: DismissHandle::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replaces the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn candidate(&self) -> &PairingCandidate {
        &self.candidate
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// The name and code that [`submit`](Self::submit) will send.
    pub fn draft(&self) -> &DerivedIdentifier {
        &self.draft
    }

    /// Every state this workflow has entered, oldest first.
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle for dismissing this workflow while a request is outstanding.
    pub fn dismiss_handle(&self) -> DismissHandle {
        self.dismissal.clone()
    }

    /// Dismisses the workflow immediately.
    pub fn dismiss(&mut self) {
        self.dismissal.dismiss();
        self.transition(WorkflowState::Dismissed);
    }

    /// Derives default name and code for the candidate and waits for input.
    ///
    /// Re-proposing from [`WorkflowState::Failed`] resets the draft to the
    /// derived defaults.
    pub fn propose(&mut self) -> Result<DerivedIdentifier, PairingError> {
        self.ensure_open("propose")?;
        match self.state {
            WorkflowState::Idle | WorkflowState::AwaitingInput | WorkflowState::Failed { .. } => {}
            _ => return Err(self.invalid("propose")),
        }

        self.draft = derive(
            &self.candidate.foreign_project_name,
            self.candidate.foreign_project_code.as_deref(),
        );
        self.transition(WorkflowState::AwaitingInput);
        Ok(self.draft.clone())
    }

    /// Overrides the draft name and/or code.
    ///
    /// Values are taken verbatim; the store validates them on submit.
    pub fn edit(&mut self, name: Option<String>, code: Option<String>) -> Result<(), PairingError> {
        self.ensure_open("edit")?;
        match self.state {
            WorkflowState::AwaitingInput | WorkflowState::Failed { .. } => {}
            _ => return Err(self.invalid("edit")),
        }

        if let Some(name) = name {
            self.draft.target_name = name;
        }
        if let Some(code) = code {
            self.draft.target_code = code;
        }
        Ok(())
    }

    /// The create-pairing request built from the candidate and the draft.
    pub fn request(&self) -> PairingRequest {
        PairingRequest {
            kitsu_project_id: self.candidate.foreign_project_id.clone(),
            ayon_project_name: self.draft.target_name.clone(),
            ayon_project_code: self.draft.target_code.clone(),
        }
    }

    /// Submits the draft to the store.
    ///
    /// On success the workflow is [`WorkflowState::Paired`] and the caller
    /// should reload the pairing list. On failure it is
    /// [`WorkflowState::Failed`] with the displayable reason, and the error
    /// is returned.
    #[instrument(
        skip_all,
        fields(workflow_id = %self.id, kitsu_project_id = %self.candidate.foreign_project_id)
    )]
    pub async fn submit(&mut self) -> Result<(), PairingError> {
        self.ensure_open("submit")?;
        match self.state {
            WorkflowState::AwaitingInput | WorkflowState::Failed { .. } => {}
            _ => return Err(self.invalid("submit")),
        }

        let request = self.request();
        debug!(
            ayon_project_name = %request.ayon_project_name,
            ayon_project_code = %request.ayon_project_code,
            "Submitting pairing"
        );
        self.transition(WorkflowState::Submitting);

        let in_flight = InFlight {
            id: self.id,
            state: &mut self.state,
            history: &mut self.history,
            on_cancel: Some(WorkflowState::Failed {
                reason: CANCELLED_REASON.to_string(),
            }),
        };
        let result = bounded(self.timeout, self.store.create_pairing(&request)).await;
        in_flight.finish();
        self.ensure_open("report pairing")?;

        match result {
            Ok(()) => {
                info!(ayon_project_name = %request.ayon_project_name, "Pairing created");
                self.transition(WorkflowState::Paired {
                    project: request.ayon_project_name,
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Pairing failed");
                self.transition(WorkflowState::Failed {
                    reason: err.reason(),
                });
                Err(err)
            }
        }
    }

    /// Asks the store to synchronise the paired project.
    ///
    /// Only reachable once paired. Reports whether the trigger was accepted;
    /// does not wait for the sync itself.
    #[instrument(
        skip_all,
        fields(workflow_id = %self.id, kitsu_project_id = %self.candidate.foreign_project_id)
    )]
    pub async fn trigger_sync(&mut self) -> Result<(), PairingError> {
        self.ensure_open("trigger sync")?;
        let project = match self.state.paired_project() {
            Some(project) if !self.state.is_busy() => project.to_string(),
            _ => return Err(self.invalid("trigger sync")),
        };
        let Some(name) = AyonProjectName::new(project.clone()) else {
            return Err(PairingError::InvalidTransition {
                operation: "trigger sync",
                state: "paired with an empty project name".to_string(),
            });
        };

        self.transition(WorkflowState::SyncTriggered {
            project: project.clone(),
        });

        let in_flight = InFlight {
            id: self.id,
            state: &mut self.state,
            history: &mut self.history,
            on_cancel: Some(WorkflowState::SyncFailed {
                project: project.clone(),
                reason: CANCELLED_REASON.to_string(),
            }),
        };
        let result = bounded(self.timeout, self.store.trigger_sync(&name)).await;
        in_flight.finish();
        self.ensure_open("report sync")?;

        match result {
            Ok(()) => {
                info!(ayon_project_name = %name, "Sync triggered");
                self.transition(WorkflowState::SyncOk { project });
                Ok(())
            }
            Err(err) => {
                warn!(ayon_project_name = %name, error = %err, "Sync trigger failed");
                self.transition(WorkflowState::SyncFailed {
                    project,
                    reason: err.reason(),
                });
                Err(err)
            }
        }
    }

    /// Fails with [`PairingError::Dismissed`] once the workflow is dismissed,
    /// moving it to [`WorkflowState::Dismissed`] if it is not there yet.
    fn ensure_open(&mut self, operation: &'static str) -> Result<(), PairingError> {
        if !self.dismissal.is_dismissed() {
            return Ok(());
        }
        if self.state != WorkflowState::Dismissed {
            debug!(workflow_id = %self.id, operation, "Discarding result of dismissed workflow");
            self.transition(WorkflowState::Dismissed);
        }
        Err(PairingError::Dismissed)
    }

    fn invalid(&self, operation: &'static str) -> PairingError {
        PairingError::InvalidTransition {
            operation,
            state: self.state.label().to_string(),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        record(self.id, &mut self.state, &mut self.history, next);
    }
}

fn record(
    id: WorkflowId,
    state: &mut WorkflowState,
    history: &mut Vec<Transition>,
    next: WorkflowState,
) {
    debug!(workflow_id = %id, from = %state, to = %next, "Workflow transition");
    history.push(Transition {
        state: next.clone(),
        at: Timestamp::now(),
    });
    *state = next;
}

/// Borrow of a workflow's state held across an outstanding request.
///
/// Dropped without [`finish`](Self::finish), it moves the workflow to
/// `on_cancel`.
struct InFlight<'a> {
    id: WorkflowId,
    state: &'a mut WorkflowState,
    history: &'a mut Vec<Transition>,
    on_cancel: Option<WorkflowState>,
}

impl InFlight<'_> {
    fn finish(mut self) {
        self.on_cancel = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(next) = self.on_cancel.take() {
            warn!(workflow_id = %self.id, state = %self.state, "Request dropped before completing");
            record(self.id, &mut *self.state, &mut *self.history, next);
        }
    }
}

async fn bounded<T>(
    timeout: Duration,
    request: impl Future<Output = Result<T, PairingError>>,
) -> Result<T, PairingError> {
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(PairingError::Timeout { after: timeout }),
    }
}
