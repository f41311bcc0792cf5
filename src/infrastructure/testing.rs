//! Test doubles shared by the unit tests.

use crate::domain::models::{DayKey, DayStatus};
use crate::infrastructure::document_mapper::{FirestoreDocument, days_document};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::firestore_client::DocumentStoreClient;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

pub struct TempWorkspace {
    path: PathBuf,
}

impl TempWorkspace {
    pub fn new(label: &str) -> Self {
        let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "staytracker-{label}-tests-{}-{}",
            std::process::id(),
            sequence
        ));
        fs::create_dir_all(&path).expect("create temp workspace");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get,
    Merge(DayKey, DayStatus),
    Delete(DayKey),
}

/// In-memory stand-in for the remote day document. `days` holds raw string
/// values so tests can seed statuses the app does not recognise.
#[derive(Debug, Default)]
pub struct FakeDocumentStore {
    days: Mutex<Option<BTreeMap<String, String>>>,
    failing_keys: Mutex<HashSet<DayKey>>,
    read_failures: Mutex<VecDeque<InfraError>>,
    calls: Mutex<Vec<StoreCall>>,
    write_delay: Mutex<Option<Duration>>,
}

impl FakeDocumentStore {
    pub fn with_days<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::default();
        *store.days.lock().expect("days lock") = Some(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        store
    }

    pub fn fail_writes_for(&self, key: DayKey) {
        self.failing_keys.lock().expect("failing keys lock").insert(key);
    }

    /// Holds every later merge or delete for `delay` before it lands.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().expect("write delay lock") = Some(delay);
    }

    pub fn fail_next_read(&self, error: InfraError) {
        self.read_failures.lock().expect("read failures lock").push_back(error);
    }

    pub fn set_raw(&self, key: &str, value: &str) {
        self.days
            .lock()
            .expect("days lock")
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw_days(&self) -> Option<BTreeMap<String, String>> {
        self.days.lock().expect("days lock").clone()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| *call != StoreCall::Get)
            .collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    async fn wait_for_write(&self) {
        let delay = *self.write_delay.lock().expect("write delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_write(&self, key: DayKey) -> Result<(), InfraError> {
        if self.failing_keys.lock().expect("failing keys lock").contains(&key) {
            return Err(InfraError::Remote(format!(
                "http 403: write to {key} rejected"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStoreClient for FakeDocumentStore {
    async fn get_document(&self) -> Result<Option<FirestoreDocument>, InfraError> {
        self.record(StoreCall::Get);
        if let Some(error) = self.read_failures.lock().expect("read failures lock").pop_front() {
            return Err(error);
        }
        Ok(self.raw_days().map(|days| days_document(days)))
    }

    async fn merge_day(&self, key: DayKey, status: DayStatus) -> Result<(), InfraError> {
        self.record(StoreCall::Merge(key, status));
        self.wait_for_write().await;
        self.check_write(key)?;
        self.set_raw(&key.to_string(), status.as_str());
        Ok(())
    }

    async fn delete_day(&self, key: DayKey) -> Result<(), InfraError> {
        self.record(StoreCall::Delete(key));
        self.wait_for_write().await;
        self.check_write(key)?;
        let mut days = self.days.lock().expect("days lock");
        let Some(days) = days.as_mut() else {
            return Err(InfraError::DocumentMissing);
        };
        days.remove(&key.to_string());
        Ok(())
    }
}
