//! Driver's-license renewal cases: the in-progress draft, submitted processes, their
//! verification steps and vision test results, and the store that persists them.

pub mod domain;
pub mod events;
pub mod simulation;
pub mod storage;
mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    CompletedProcess, DeliveryAddress, DeliveryAddressPatch, LicenseInformation,
    LicenseInformationPatch, LicenseType, ProcessDraft, ProcessId, ProcessStatus, ProcessType,
    RenewalYears, TestResult, TestResults, TestType, UserProfile, UserProfilePatch,
    VerificationStep, DELIVERY_WINDOW_DAYS,
};
pub use events::{StoreEvent, StoreEvents};
pub use simulation::{PaymentSimulator, SimulationError, VerificationSimulator};
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StorageError};
pub use store::{Clock, StoreError, SystemClock, WorkflowStore};
