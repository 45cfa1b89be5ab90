//! Test doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::{TempDir, tempdir};

use crate::database::{Device, DeviceRepository, NewDevice, StatusUpdate, StoreError};
use crate::monitoring::{ProbeOutcome, Prober};
use crate::pool::{LibsqlPool, open_pool};

/// Fresh migrated database in a temp dir. Keep the `TempDir` alive for the test.
pub async fn create_test_pool() -> Result<(LibsqlPool, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let pool = open_pool(&db_path.to_string_lossy(), 4).await?;
    crate::database::initialize_pool(&pool).await?;

    Ok((pool, temp_dir))
}

/// Write a row directly, bypassing registration defaults
pub async fn insert_raw_device(
    pool: &LibsqlPool,
    id: &str,
    name: &str,
    ip: Option<&str>,
) -> Result<()> {
    let conn = pool.get().await?;
    conn.execute(
        "INSERT INTO devices (id, name, ip, created_at) VALUES (?, ?, ?, ?)",
        libsql::params![id, name, ip.map(str::to_string), chrono::Utc::now().timestamp_millis()],
    )
    .await?;
    Ok(())
}

/// Answers from a fixed table; unknown addresses are unreachable
#[derive(Default)]
pub struct StubProber {
    outcomes: HashMap<String, ProbeOutcome>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, outcome: ProbeOutcome) -> Self {
        self.outcomes.insert(address.to_string(), outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for StubProber {
    async fn check(&self, address: &str) -> ProbeOutcome {
        self.calls.lock().expect("calls lock").push(address.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.outcomes.get(address).cloned().unwrap_or(ProbeOutcome::Unreachable)
    }
}

/// Wraps a repository and counts calls, optionally failing reads or writes
pub struct RecordingRepository<R> {
    inner: R,
    fail_list: bool,
    fail_update: bool,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl<R> RecordingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            fail_list: false,
            fail_update: false,
            list_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: DeviceRepository> DeviceRepository for RecordingRepository<R> {
    async fn list_all(&self) -> Result<Vec<Device>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            return Err(StoreError::Libsql(libsql::Error::ConnectionFailed("store offline".into())));
        }
        self.inner.list_all().await
    }

    async fn get(&self, id: &str) -> Result<Option<Device>, StoreError> {
        self.inner.get(id).await
    }

    async fn batch_update_status(&self, updates: &[StatusUpdate]) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update {
            return Err(StoreError::DeviceNotFound("simulated".into()));
        }
        self.inner.batch_update_status(updates).await
    }

    async fn insert(&self, device: &NewDevice) -> Result<String, StoreError> {
        self.inner.insert(device).await
    }
}
