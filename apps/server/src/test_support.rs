//! Fixtures for route tests.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::web;
use anyhow::Result;
use async_trait::async_trait;
use devwatch_service::database::{Device, DeviceRepository, NewDevice, StatusUpdate, StoreError};
use devwatch_service::monitoring::{ProbeOutcome, Prober};
use devwatch_service::pool::open_pool;
use devwatch_service::{LibsqlDeviceRepository, StatusRefresher};
use tempfile::{TempDir, tempdir};

use crate::state::AppState;

/// Fixed answers per address; anything else is unreachable
#[derive(Default)]
pub struct StubProber {
    outcomes: HashMap<String, ProbeOutcome>,
}

impl StubProber {
    pub fn with(mut self, address: &str, outcome: ProbeOutcome) -> Self {
        self.outcomes.insert(address.to_string(), outcome);
        self
    }
}

#[async_trait]
impl Prober for StubProber {
    async fn check(&self, address: &str) -> ProbeOutcome {
        self.outcomes.get(address).cloned().unwrap_or(ProbeOutcome::Unreachable)
    }
}

/// Store that fails every call
pub struct UnavailableRepository;

fn offline() -> StoreError {
    StoreError::Libsql(libsql::Error::ConnectionFailed("store offline".into()))
}

#[async_trait]
impl DeviceRepository for UnavailableRepository {
    async fn list_all(&self) -> Result<Vec<Device>, StoreError> {
        Err(offline())
    }

    async fn get(&self, _id: &str) -> Result<Option<Device>, StoreError> {
        Err(offline())
    }

    async fn batch_update_status(&self, _updates: &[StatusUpdate]) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn insert(&self, _device: &NewDevice) -> Result<String, StoreError> {
        Err(offline())
    }
}

/// App state over a fresh database in a temp dir
pub async fn test_state(prober: StubProber) -> Result<(web::Data<AppState>, TempDir)> {
    let dir = tempdir()?;
    let path = dir.path().join("server.db");
    let pool = open_pool(&path.to_string_lossy(), 2).await?;
    devwatch_service::database::initialize_pool(&pool).await?;

    let repository = Arc::new(LibsqlDeviceRepository::new_from_pool(pool));
    let refresher = Arc::new(StatusRefresher::new(repository, Arc::new(prober), 4));
    Ok((web::Data::new(AppState::new(refresher)), dir))
}

/// App state whose store is down
pub fn unavailable_state() -> web::Data<AppState> {
    let refresher = Arc::new(StatusRefresher::new(
        Arc::new(UnavailableRepository),
        Arc::new(StubProber::default()),
        4,
    ));
    web::Data::new(AppState::new(refresher))
}
