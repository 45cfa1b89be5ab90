/// Monitoring engine module - probes devices and records their liveness
///
/// This module is responsible for:
/// - Probing device addresses (ICMP through `ping`, or TCP connect)
/// - Running refresh cycles against the device store
/// - Triggering refresh cycles on a fixed schedule
pub mod prober;
pub mod refresh;
pub mod scheduler;


pub use prober::{IcmpProber, ProbeMethod, ProbeOutcome, Prober, TcpProber, build_prober};
pub use refresh::{DeviceCheck, RefreshError, RefreshReport, StatusRefresher};
pub use scheduler::RefreshScheduler;
