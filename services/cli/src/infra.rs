use chrono::NaiveDate;
use license_renewal::config::AppConfig;
use license_renewal::workflows::renewal::{FileKeyValueStore, WorkflowStore};
use std::sync::Arc;
use tracing::info;

pub(crate) type CliStore = WorkflowStore<FileKeyValueStore>;

pub(crate) async fn open_store(config: &AppConfig) -> CliStore {
    let storage = FileKeyValueStore::new(config.storage.data_dir.clone());
    info!(data_dir = %storage.dir().display(), "opening workflow store");
    WorkflowStore::open(Arc::new(storage)).await
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
