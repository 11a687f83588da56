use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::workflows::renewal::domain::{
    DeliveryAddressPatch, LicenseInformationPatch, LicenseType, ProcessId, RenewalYears,
    TestResult,
};
use crate::workflows::renewal::storage::{InMemoryKeyValueStore, KeyValueStore, StorageError};
use crate::workflows::renewal::store::{Clock, WorkflowStore};

pub(super) fn payment_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 15, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that only moves when a test advances it.
#[derive(Debug, Clone)]
pub(super) struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// In-memory storage whose writes can be switched to fail.
#[derive(Debug, Default, Clone)]
pub(super) struct FlakyStore {
    inner: InMemoryKeyValueStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(super) fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub(super) fn inner(&self) -> &InMemoryKeyValueStore {
        &self.inner
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.remove(key).await
    }
}

pub(super) type TestStore = WorkflowStore<InMemoryKeyValueStore, ManualClock>;

pub(super) async fn open_store() -> (TestStore, InMemoryKeyValueStore, ManualClock) {
    let storage = InMemoryKeyValueStore::new();
    let clock = ManualClock::starting_at(payment_time());
    let store = WorkflowStore::open_with_clock(Arc::new(storage.clone()), clock.clone()).await;
    (store, storage, clock)
}

pub(super) async fn reopen(storage: &InMemoryKeyValueStore) -> TestStore {
    WorkflowStore::open_with_clock(
        Arc::new(storage.clone()),
        ManualClock::starting_at(payment_time()),
    )
    .await
}

pub(super) fn license_patch() -> LicenseInformationPatch {
    LicenseInformationPatch {
        dpi: Some("2456 78901 0101".to_string()),
        names: Some("Ana Lucía".to_string()),
        last_names: Some("García López".to_string()),
        license_type: Some(LicenseType::B),
        renewal_years: Some(RenewalYears::Five),
        born_date: Some(NaiveDate::from_ymd_opt(1990, 6, 15)),
    }
}

pub(super) fn address_patch() -> DeliveryAddressPatch {
    DeliveryAddressPatch {
        street_address: Some("6a Avenida 12-34".to_string()),
        apartment: Some("Apto 3B".to_string()),
        city: Some("Guatemala".to_string()),
        state: Some("Guatemala".to_string()),
        zip_code: Some("01010".to_string()),
    }
}

pub(super) fn result(score: u32, total_questions: u32, passed: bool) -> TestResult {
    TestResult {
        score,
        total_questions,
        passed,
    }
}

pub(super) async fn submitted(store: &TestStore) -> ProcessId {
    store
        .add_completed_process(100.0)
        .await
        .expect("process submitted")
}
