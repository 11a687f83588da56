use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use super::domain::{
    CompletedProcess, DeliveryAddressPatch, LicenseInformationPatch, ProcessDraft, ProcessId,
    ProcessStatus, ProcessType, TestResult, TestType, UserProfile, UserProfilePatch,
    VerificationStep,
};
use super::events::{StoreEvent, StoreEvents};
use super::storage::{
    KeyValueStore, StorageError, COMPLETED_PROCESSES_KEY, PROCESS_DATA_KEY, USER_PROFILE_KEY,
};

/// Source of the current time for payment timestamps and process ids.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Error surfaced by the only mutator whose caller must handle failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("payment amount must be a finite number, got {0}")]
    NonFiniteAmount(f64),
    #[error("failed to persist {record}: {source}")]
    Persistence {
        record: &'static str,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Profile,
    Draft,
    CompletedProcesses,
}

impl Record {
    const fn key(self) -> &'static str {
        match self {
            Self::Profile => USER_PROFILE_KEY,
            Self::Draft => PROCESS_DATA_KEY,
            Self::CompletedProcesses => COMPLETED_PROCESSES_KEY,
        }
    }
}

#[derive(Debug, Default)]
struct WorkflowState {
    profile: UserProfile,
    draft: ProcessDraft,
    completed: Vec<CompletedProcess>,
}

/// Single source of truth for the user profile, the active draft, and submitted processes.
///
/// Every mutator updates memory first and then writes the affected record through the
/// [`KeyValueStore`]. Storage failures are logged and swallowed, except in
/// [`WorkflowStore::add_completed_process`]. Writes are serialized and always carry the
/// record's latest in-memory value, so concurrent mutators cannot roll the durable copy back
/// to an older state. Records are written independently; there is no cross-record transaction.
pub struct WorkflowStore<S, C = SystemClock> {
    storage: Arc<S>,
    clock: C,
    state: RwLock<WorkflowState>,
    write_gate: Mutex<()>,
    events: StoreEvents,
}

impl<S> WorkflowStore<S, SystemClock>
where
    S: KeyValueStore,
{
    pub async fn open(storage: Arc<S>) -> Self {
        Self::open_with_clock(storage, SystemClock).await
    }
}

impl<S, C> WorkflowStore<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    /// Restores the three records from storage. Missing or unreadable records fall back to
    /// their empty defaults.
    pub async fn open_with_clock(storage: Arc<S>, clock: C) -> Self {
        let profile = load_record::<_, UserProfile>(storage.as_ref(), USER_PROFILE_KEY)
            .await
            .unwrap_or_default();
        let draft = load_record::<_, ProcessDraft>(storage.as_ref(), PROCESS_DATA_KEY)
            .await
            .unwrap_or_default();
        let completed = load_completed_processes(storage.as_ref()).await;

        info!(
            completed_processes = completed.len(),
            "workflow store restored"
        );

        Self {
            storage,
            clock,
            state: RwLock::new(WorkflowState {
                profile,
                draft,
                completed,
            }),
            write_gate: Mutex::new(()),
            events: StoreEvents::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn user_profile(&self) -> UserProfile {
        self.read().profile.clone()
    }

    pub fn process_data(&self) -> ProcessDraft {
        self.read().draft.clone()
    }

    pub fn completed_processes(&self) -> Vec<CompletedProcess> {
        self.read().completed.clone()
    }

    pub fn completed_process(&self, id: &ProcessId) -> Option<CompletedProcess> {
        self.read()
            .completed
            .iter()
            .find(|process| &process.id == id)
            .cloned()
    }

    /// True once any process has been submitted, whatever its status.
    pub fn has_active_processes(&self) -> bool {
        !self.read().completed.is_empty()
    }

    pub async fn update_user_profile(&self, patch: UserProfilePatch) {
        self.write().profile.apply(patch);
        self.persist_logged(Record::Profile).await;
        self.events.publish(StoreEvent::ProfileUpdated);
    }

    pub async fn update_license_information(&self, patch: LicenseInformationPatch) {
        self.write().draft.license_information.apply(patch);
        self.persist_logged(Record::Draft).await;
        self.events.publish(StoreEvent::DraftUpdated);
    }

    pub async fn update_delivery_address(&self, patch: DeliveryAddressPatch) {
        self.write().draft.delivery_address.apply(patch);
        self.persist_logged(Record::Draft).await;
        self.events.publish(StoreEvent::DraftUpdated);
    }

    pub async fn update_process_types(&self, types: BTreeSet<ProcessType>) {
        self.write().draft.process_types = types;
        self.persist_logged(Record::Draft).await;
        self.events.publish(StoreEvent::DraftUpdated);
    }

    /// Finalizes payment: snapshots the draft into a new pending process, persists the
    /// process list, and then resets the draft.
    ///
    /// On a storage failure the process stays in memory, the draft is left intact, and the
    /// error is returned. NaN and infinite amounts are rejected before anything changes,
    /// since JSON cannot represent them.
    pub async fn add_completed_process(&self, amount: f64) -> Result<ProcessId, StoreError> {
        if !amount.is_finite() {
            return Err(StoreError::NonFiniteAmount(amount));
        }

        let paid_at = self.clock.now();
        let id = {
            let mut state = self.write();
            let id = next_process_id(&state.completed, paid_at);
            let process =
                CompletedProcess::from_draft(id.clone(), state.draft.clone(), amount, paid_at);
            state.completed.push(process);
            id
        };

        let persisted = self.persist(Record::CompletedProcesses).await;
        self.events
            .publish(StoreEvent::ProcessSubmitted { id: id.clone() });

        if let Err(source) = persisted {
            error!(process_id = %id, error = %source, "failed to persist submitted process");
            return Err(StoreError::Persistence {
                record: Record::CompletedProcesses.key(),
                source,
            });
        }

        info!(process_id = %id, amount, "process submitted");
        self.reset_process_data().await;
        Ok(id)
    }

    /// Sets any status regardless of the current one. Unknown ids are ignored.
    pub async fn update_completed_process_status(&self, id: &ProcessId, status: ProcessStatus) {
        let found = self.modify_process(id, |process| process.status = status);
        if found.is_some() {
            self.persist_logged(Record::CompletedProcesses).await;
            self.events
                .publish(StoreEvent::ProcessUpdated { id: id.clone() });
        }
    }

    /// Applies a verification-step request and returns the updated process, or `None` if
    /// the id is unknown. The visual test only becomes complete when all vision sub-tests
    /// are recorded; any step may always be cleared.
    pub async fn update_process_verification_step(
        &self,
        id: &ProcessId,
        step: VerificationStep,
        completed: bool,
    ) -> Option<CompletedProcess> {
        let updated = self.modify_process(id, |process| process.set_step(step, completed))?;
        self.persist_logged(Record::CompletedProcesses).await;
        self.events
            .publish(StoreEvent::ProcessUpdated { id: id.clone() });
        Some(updated)
    }

    /// Records one vision sub-test and recomputes the visual-test flag.
    /// Unknown ids are ignored.
    pub async fn save_test_results(&self, id: &ProcessId, test_type: TestType, result: TestResult) {
        let found = self.modify_process(id, |process| process.record_test(test_type, result));
        if found.is_some() {
            self.persist_logged(Record::CompletedProcesses).await;
            self.events
                .publish(StoreEvent::ProcessUpdated { id: id.clone() });
        }
    }

    /// Returns the draft to its empty defaults and drops the stored record.
    pub async fn reset_process_data(&self) {
        self.write().draft = ProcessDraft::default();
        self.persist_logged(Record::Draft).await;
        self.events.publish(StoreEvent::DraftUpdated);
    }

    /// Clears all state and removes every stored record.
    pub async fn logout(&self) {
        {
            let mut state = self.write();
            *state = WorkflowState::default();
        }
        for record in [Record::Profile, Record::Draft, Record::CompletedProcesses] {
            self.persist_logged(record).await;
        }
        info!("user logged out; workflow state cleared");
        self.events.publish(StoreEvent::LoggedOut);
    }

    fn modify_process<F>(&self, id: &ProcessId, apply: F) -> Option<CompletedProcess>
    where
        F: FnOnce(&mut CompletedProcess),
    {
        let mut state = self.write();
        match state.completed.iter_mut().find(|process| &process.id == id) {
            Some(process) => {
                apply(process);
                Some(process.clone())
            }
            None => {
                debug!(process_id = %id, "process not found; ignoring update");
                None
            }
        }
    }

    async fn persist_logged(&self, record: Record) {
        if let Err(err) = self.persist(record).await {
            error!(key = record.key(), error = %err, "failed to persist workflow record");
        }
    }

    /// Writes the record's current value, or removes it when the value is the empty default.
    async fn persist(&self, record: Record) -> Result<(), StorageError> {
        let _gate = self.write_gate.lock().await;
        match self.encode(record)? {
            Some(json) => self.storage.set(record.key(), json).await,
            None => self.storage.remove(record.key()).await,
        }
    }

    fn encode(&self, record: Record) -> Result<Option<String>, StorageError> {
        let state = self.read();
        let json = match record {
            Record::Profile if state.profile == UserProfile::default() => None,
            Record::Profile => Some(serde_json::to_string(&state.profile)?),
            Record::Draft if state.draft == ProcessDraft::default() => None,
            Record::Draft => Some(serde_json::to_string(&state.draft)?),
            Record::CompletedProcesses if state.completed.is_empty() => None,
            Record::CompletedProcesses => Some(serde_json::to_string(&state.completed)?),
        };
        Ok(json)
    }

    fn read(&self) -> RwLockReadGuard<'_, WorkflowState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WorkflowState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn load_record<S, T>(storage: &S, key: &str) -> Option<T>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let raw = match storage.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "failed to read workflow record; using defaults");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "discarding unreadable workflow record");
            None
        }
    }
}

/// Restores submitted processes one entry at a time so a single unreadable entry does not
/// take the rest of the list with it.
async fn load_completed_processes<S>(storage: &S) -> Vec<CompletedProcess>
where
    S: KeyValueStore,
{
    let Some(entries) =
        load_record::<_, Vec<serde_json::Value>>(storage, COMPLETED_PROCESSES_KEY).await
    else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, entry)| match serde_json::from_value::<CompletedProcess>(entry) {
                Ok(process) => Some(process),
                Err(err) => {
                    warn!(
                        key = COMPLETED_PROCESSES_KEY,
                        index,
                        error = %err,
                        "discarding unreadable submitted process"
                    );
                    None
                }
            },
        )
        .collect()
}

/// Millisecond timestamp of the payment, suffixed when it collides with an existing id.
fn next_process_id(existing: &[CompletedProcess], paid_at: DateTime<Utc>) -> ProcessId {
    let base = paid_at.timestamp_millis().to_string();
    let taken = |candidate: &str| existing.iter().any(|process| process.id.as_str() == candidate);

    if !taken(&base) {
        return ProcessId(base);
    }

    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken(&candidate) {
            return ProcessId(candidate);
        }
        suffix += 1;
    }
}
