use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use super::refresh::StatusRefresher;

/// Periodic trigger for refresh cycles.
///
/// A failed cycle is logged and left alone; the next tick is the only retry.
pub struct RefreshScheduler {
    refresher: Arc<StatusRefresher>,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(refresher: Arc<StatusRefresher>, period: Duration) -> Self {
        Self { refresher, period }
    }

    /// Run one scheduled cycle and log how it went
    pub async fn tick(&self) {
        info!("Starting device status check...");

        match self.refresher.refresh().await {
            Ok(report) if report.devices_found == 0 => {}
            Ok(report) => {
                info!(
                    checked = report.checked(),
                    online = report.online(),
                    skipped = report.devices_found - report.checked(),
                    "Device status check completed"
                );
            }
            Err(e) => {
                error!("Error checking device status: {e}");
            }
        }
    }

    /// Spawn the timer loop. The first cycle runs immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                self.tick().await;
            }
        })
    }
}
