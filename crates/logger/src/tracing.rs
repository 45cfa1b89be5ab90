use std::env::var;
use std::fmt;

use chrono::{FixedOffset, Utc};
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output encoding of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Parse a format name, anything unrecognised falls back to compact output
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub format: LogFormat,
    /// Fixed offset used to render timestamps. `None` disables timestamps.
    pub utc_offset: Option<FixedOffset>,
    pub level: Option<LevelFilter>,
}

/// Renders event timestamps in a fixed timezone regardless of the host clock zone.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTime {
    offset: FixedOffset,
}

impl OffsetTime {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn render(&self, now: chrono::DateTime<Utc>) -> String {
        now.with_timezone(&self.offset).format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    }
}

impl FormatTime for OffsetTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", self.render(Utc::now()))
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` drives filtering and `RUST_LOG_FORMAT` overrides `options.format`.
pub fn init_tracing(options: &LogOptions) {
    let level = options.level.unwrap_or(LevelFilter::INFO);
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let format = match var("RUST_LOG_FORMAT") {
        Ok(name) => LogFormat::from_name(&name),
        Err(_) => options.format,
    };

    let log_layer = match (format, options.utc_offset) {
        (LogFormat::Json, Some(offset)) => tracing_subscriber::fmt::layer()
            .json()
            .with_timer(OffsetTime::new(offset))
            .with_filter(env_filter)
            .boxed(),
        (LogFormat::Json, None) => {
            tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed()
        }
        (LogFormat::Compact, Some(offset)) => tracing_subscriber::fmt::layer()
            .compact()
            .with_timer(OffsetTime::new(offset))
            .with_filter(env_filter)
            .boxed(),
        (LogFormat::Compact, None) => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing subscriber already installed: {error}");
    }
}
