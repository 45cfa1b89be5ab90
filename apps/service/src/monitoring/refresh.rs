use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::prober::{ProbeOutcome, Prober};
use crate::database::{Device, DeviceRepository, DeviceStatus, StatusUpdate, StoreError};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("failed to list devices: {0}")]
    List(#[source] StoreError),
    #[error("failed to write device statuses: {0}")]
    Update(#[source] StoreError),
}

/// Outcome of one probed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCheck {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub status: DeviceStatus,
}

/// Summary of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Records in the store, probed or not
    pub devices_found: usize,
    /// One entry per probed device, in store order
    pub results: Vec<DeviceCheck>,
}

impl RefreshReport {
    pub fn checked(&self) -> usize {
        self.results.len()
    }

    pub fn online(&self) -> usize {
        self.results.iter().filter(|r| r.status == DeviceStatus::Online).count()
    }
}

/// Runs refresh cycles: list devices, probe every addressable one, store the statuses.
///
/// Cycles are serialized. A trigger that arrives while another cycle is
/// running waits for it and then runs its own.
pub struct StatusRefresher {
    repository: Arc<dyn DeviceRepository>,
    prober: Arc<dyn Prober>,
    max_concurrent_probes: usize,
    cycle: Mutex<()>,
}

impl StatusRefresher {
    pub fn new(
        repository: Arc<dyn DeviceRepository>,
        prober: Arc<dyn Prober>,
        max_concurrent_probes: usize,
    ) -> Self {
        Self { repository, prober, max_concurrent_probes: max_concurrent_probes.max(1), cycle: Mutex::new(()) }
    }

    pub fn repository(&self) -> &Arc<dyn DeviceRepository> {
        &self.repository
    }

    /// Run one full cycle
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        let _cycle = self.cycle.lock().await;

        let devices = self.repository.list_all().await.map_err(RefreshError::List)?;
        if devices.is_empty() {
            info!("No devices found");
            return Ok(RefreshReport::default());
        }

        let targets: Vec<(&Device, &str)> = devices
            .iter()
            .filter_map(|device| match device.probe_address() {
                Some(address) => Some((device, address)),
                None => {
                    debug!(device_id = %device.id, "Skipping device without ip");
                    None
                }
            })
            .collect();

        let addresses: Vec<String> = targets.iter().map(|(_, address)| address.to_string()).collect();
        let prober = Arc::clone(&self.prober);
        let outcomes: Vec<ProbeOutcome> = stream::iter(addresses)
            .map(move |address| {
                let prober = Arc::clone(&prober);
                async move { prober.check(&address).await }
            })
            .buffered(self.max_concurrent_probes)
            .collect()
            .await;

        let checked_at = Utc::now();
        let mut updates = Vec::with_capacity(targets.len());
        let mut results = Vec::with_capacity(targets.len());

        for ((device, address), outcome) in targets.into_iter().zip(outcomes) {
            if let ProbeOutcome::Failed(reason) = &outcome {
                warn!(device_id = %device.id, ip = %address, "Probe failed: {reason}");
            }
            let status = DeviceStatus::from_reachable(outcome.is_reachable());
            info!("{} ({}): {}", device.name, address, status);

            updates.push(StatusUpdate { id: device.id.clone(), status, checked_at });
            results.push(DeviceCheck {
                id: device.id.clone(),
                name: device.name.clone(),
                ip: address.to_string(),
                status,
            });
        }

        if !updates.is_empty() {
            self.repository.batch_update_status(&updates).await.map_err(RefreshError::Update)?;
        }
        info!("Updated status for {} devices", updates.len());

        Ok(RefreshReport { devices_found: devices.len(), results })
    }
}
