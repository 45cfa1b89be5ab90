//! Shared tracing setup for the devwatch binaries.

mod tracing;

pub use self::tracing::{LogFormat, LogOptions, OffsetTime, init_tracing};
