//! Supervisor configuration with validation and versioning.

mod backend_settings;
mod logging_settings;
mod network_settings;
mod readiness_settings;
mod shutdown_settings;

pub use backend_settings::BackendSettings;
pub use logging_settings::LoggingSettings;
pub use network_settings::NetworkSettings;
pub use readiness_settings::{ReadinessMode, ReadinessSettings};
pub use shutdown_settings::ShutdownSettings;

use crate::{SupervisorError, SupervisorResult};

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

pub const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_PORT_ATTEMPTS: u16 = 100;
const DEFAULT_PROGRAM: &str = "python";
const DEFAULT_ARGS: [&str; 4] = ["manage.py", "runserver", "{host}:{port}", "--noreload"];
const DEFAULT_WORKING_DIR: &str = "backend";
const DEFAULT_API_PREFIX: &str = "api";
const DEFAULT_READY_MARKERS: [&str; 6] = [
    "Starting development server",
    "Uvicorn running on",
    "Application startup complete",
    "Running on http://",
    "Serving on http://",
    "Listening on",
];
const DEFAULT_ERROR_MARKERS: [&str; 4] =
    ["Traceback", "Error:", "Exception", "Address already in use"];
const DEFAULT_GRACE_PERIOD_MS: u64 = 3000;
const DEFAULT_DEADLINE_SECS: u64 = 10;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 500;
const DEFAULT_PROBE_BUDGET: u32 = 20;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_DIAGNOSTIC_LINES: usize = 50;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_DIR: &str = "logs";

const MIN_PORT: u16 = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Config file format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// How to launch the backend
    #[serde(default)]
    pub backend: BackendSettings,

    /// Where the backend listens
    #[serde(default)]
    pub network: NetworkSettings,

    /// How readiness is detected
    #[serde(default)]
    pub readiness: ReadinessSettings,

    /// How the backend is torn down
    #[serde(default)]
    pub shutdown: ShutdownSettings,

    /// Shell logging
    #[serde(default)]
    pub logging: LoggingSettings,
}

// === Default Value Functions ===

pub(crate) fn default_version() -> u32 {
    CONFIG_VERSION
}
pub(crate) fn default_host() -> String {
    DEFAULT_HOST.into()
}
pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}
pub(crate) fn default_max_port_attempts() -> u16 {
    DEFAULT_MAX_PORT_ATTEMPTS
}
pub(crate) fn default_program() -> String {
    DEFAULT_PROGRAM.into()
}
pub(crate) fn default_args() -> Vec<String> {
    DEFAULT_ARGS.iter().map(|a| a.to_string()).collect()
}
pub(crate) fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.into()
}
pub(crate) fn default_env() -> BTreeMap<String, String> {
    BTreeMap::new()
}
pub(crate) fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.into()
}
pub(crate) fn default_ready_markers() -> Vec<String> {
    DEFAULT_READY_MARKERS.iter().map(|m| m.to_string()).collect()
}
pub(crate) fn default_error_markers() -> Vec<String> {
    DEFAULT_ERROR_MARKERS.iter().map(|m| m.to_string()).collect()
}
pub(crate) fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}
pub(crate) fn default_deadline() -> u64 {
    DEFAULT_DEADLINE_SECS
}
pub(crate) fn default_probe_interval() -> u64 {
    DEFAULT_PROBE_INTERVAL_MS
}
pub(crate) fn default_probe_budget() -> u32 {
    DEFAULT_PROBE_BUDGET
}
pub(crate) fn default_probe_timeout() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}
pub(crate) fn default_diagnostic_lines() -> usize {
    DEFAULT_DIAGNOSTIC_LINES
}
pub(crate) fn default_shutdown_grace() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}
pub(crate) fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.into()
}
pub(crate) fn default_log_dir() -> String {
    DEFAULT_LOG_DIR.into()
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: BackendSettings::default(),
            network: NetworkSettings::default(),
            readiness: ReadinessSettings::default(),
            shutdown: ShutdownSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

// === Configuration Operations ===

impl SupervisorConfig {
    /// Load config from `dir/config.toml`, creating the default file if missing.
    pub fn load_or_create(dir: &Path) -> SupervisorResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);

        if config_path.exists() {
            let mut config = Self::load(&config_path)?;

            if config.version < CONFIG_VERSION {
                config = Self::migrate(config)?;
                config.save(dir)?;
            }

            Ok(config)
        } else {
            let config = Self::default();
            config.save(dir)?;
            info!("Wrote default config to {}", config_path.display());
            Ok(config)
        }
    }

    /// Load and validate a config file at an explicit path.
    pub fn load(path: &Path) -> SupervisorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SupervisorError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to `dir/config.toml` atomically.
    ///
    /// Uses write-to-temp-then-rename so an interrupted write never
    /// leaves a truncated file behind.
    pub fn save(&self, dir: &Path) -> SupervisorResult<()> {
        let config_path = dir.join(CONFIG_FILENAME);
        let content =
            toml::to_string_pretty(self).map_err(|e| SupervisorError::config(e.to_string()))?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> SupervisorResult<Self> {
        // Version 0 -> 1: readiness section introduced
        if config.version == 0 {
            config.readiness = ReadinessSettings::default();
            config.version = 1;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.network.preferred_port < MIN_PORT {
            return Err(SupervisorError::config(format!(
                "Preferred port must be >= {MIN_PORT} (unprivileged)"
            )));
        }

        if self.network.max_port_attempts == 0 {
            return Err(SupervisorError::config("max_port_attempts must be > 0"));
        }

        if self.network.host != DEFAULT_HOST && self.network.host != "localhost" {
            return Err(SupervisorError::config(format!(
                "Host must be {DEFAULT_HOST} or localhost for security"
            )));
        }

        if self.backend.program.trim().is_empty() {
            return Err(SupervisorError::config("Backend program must not be empty"));
        }

        if self.readiness.deadline_secs == 0 {
            return Err(SupervisorError::config("Readiness deadline must be > 0"));
        }

        if self.readiness.mode != ReadinessMode::Probe && self.readiness.ready_markers.is_empty()
        {
            return Err(SupervisorError::config(
                "At least one ready marker is required unless mode = \"probe\"",
            ));
        }

        if self.readiness.mode != ReadinessMode::Markers && self.readiness.probe_budget == 0 {
            return Err(SupervisorError::config("probe_budget must be > 0"));
        }

        Ok(())
    }

    /// Base URL the UI talks to once the backend is ready.
    pub fn base_url(&self, port: u16) -> String {
        let prefix = self.backend.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("http://{}:{port}/", self.network.host)
        } else {
            format!("http://{}:{port}/{prefix}", self.network.host)
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_secs)
    }
}
