use std::{env, fmt, fs, path, time::Duration};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::ProbeMethod;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub database: Database,
    pub probe: Probe,
    pub schedule: Schedule,
    pub log: Log,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Database {
    pub path: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Probe {
    pub method: ProbeMethod,
    /// Echo requests sent per probe
    pub count: u32,
    pub timeout_seconds: u64,
    /// Upper bound on probes in flight during one refresh cycle
    pub max_concurrent: usize,
    /// Port used by the tcp method
    pub tcp_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Schedule {
    pub enabled: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Log {
    /// `compact` or `json`
    pub format: String,
    /// Fixed timezone for log timestamps, in minutes east of UTC
    pub utc_offset_minutes: Option<i32>,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self { path: "devwatch.db".into(), pool_size: 8 }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Icmp,
            count: 3,
            timeout_seconds: 5,
            max_concurrent: 32,
            tcp_port: 80,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self { enabled: true, interval_seconds: 120 }
    }
}

impl Default for Log {
    fn default() -> Self {
        // Asia/Kuala_Lumpur
        Self { format: "compact".into(), utc_offset_minutes: Some(8 * 60) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: Server::default(),
            database: Database::default(),
            probe: Probe::default(),
            schedule: Schedule::default(),
            log: Log::default(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/devwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("devwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        let offset = match self.log.utc_offset_minutes {
            Some(minutes) => format!("{minutes} min"),
            None => "disabled".to_string(),
        };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Pool Size", &self.database.pool_size)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Method", &self.probe.method)?;
        write_1(f, "Count", &self.probe.count)?;
        write_1(f, "Timeout (s)", &self.probe.timeout_seconds)?;
        write_1(f, "Max Concurrent", &self.probe.max_concurrent)?;
        write_1(f, "TCP Port", &self.probe.tcp_port)?;
        write_title_1(f, "Schedule")?;
        write_1(f, "Enabled", &self.schedule.enabled)?;
        write_1(f, "Interval (s)", &self.schedule.interval_seconds)?;
        write_title_1(f, "Log")?;
        write_1(f, "Format", &self.log.format)?;
        write_1(f, "UTC Offset", &offset)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/devwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Self::from_toml(&raw_string)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Parse and validate a config from a TOML document
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Apply `BIND`, `PORT` and `DEVWATCH_DATABASE` from the environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(bind) = lookup("BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(path) = lookup("DEVWATCH_DATABASE") {
            self.database.path = path;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid("database.pool_size must be at least 1".into()));
        }
        if self.probe.count == 0 {
            return Err(ConfigError::Invalid("probe.count must be at least 1".into()));
        }
        if self.probe.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("probe.timeout_seconds must be at least 1".into()));
        }
        if self.probe.max_concurrent == 0 {
            return Err(ConfigError::Invalid("probe.max_concurrent must be at least 1".into()));
        }
        if self.schedule.interval_seconds == 0 {
            return Err(ConfigError::Invalid("schedule.interval_seconds must be at least 1".into()));
        }
        if let Some(minutes) = self.log.utc_offset_minutes {
            if self.log_offset().is_none() {
                return Err(ConfigError::Invalid(format!(
                    "log.utc_offset_minutes out of range: {minutes}"
                )));
            }
        }
        Ok(())
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_seconds)
    }

    /// Fixed offset for log timestamps
    pub fn log_offset(&self) -> Option<FixedOffset> {
        self.log.utc_offset_minutes.and_then(|minutes| FixedOffset::east_opt(minutes * 60))
    }
}
