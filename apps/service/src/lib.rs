//! devwatch service - device liveness monitoring
//!
//! Reads registered devices from a libsql store, probes each one for
//! reachability and writes back an `Online`/`Offline` status together with
//! the time of the check.
//!
//! - [`config`] - TOML configuration with environment overrides
//! - [`database`] - device store, schema migrations and the repository trait
//! - [`monitoring`] - probers, refresh cycles and the periodic scheduler
//! - [`validation`] - device registration input
//! - [`pool`] - libsql connection pool

pub mod config;
pub mod database;
pub mod monitoring;
pub mod pool;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use database::{Device, DeviceRepository, DeviceStatus, LibsqlDeviceRepository, NewDevice, StoreError};
pub use monitoring::{RefreshError, RefreshReport, RefreshScheduler, StatusRefresher};
pub use validation::{RegisterDevice, ValidationError};
