use crate::config::{
    default_deadline, default_diagnostic_lines, default_error_markers, default_grace_period,
    default_probe_budget, default_probe_interval, default_probe_timeout, default_ready_markers,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which readiness signals are consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    /// Startup banners on stdout/stderr, optimistic on deadline
    #[default]
    Markers,
    /// Active HTTP probing only, fails when the budget runs out
    Probe,
    /// Banners and probing race, optimistic on deadline
    Combined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSettings {
    #[serde(default)]
    pub mode: ReadinessMode,

    /// Substrings that mean "server is up"
    #[serde(default = "default_ready_markers")]
    pub ready_markers: Vec<String>,

    /// Substrings recorded as diagnostics
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,

    /// Debounce after the first positive marker (milliseconds)
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,

    /// Maximum wait before the optimistic fallback (seconds)
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,

    /// Delay between HTTP probes (milliseconds)
    #[serde(default = "default_probe_interval")]
    pub probe_interval_ms: u64,

    /// Number of HTTP probes before giving up
    #[serde(default = "default_probe_budget")]
    pub probe_budget: u32,

    /// Per-request probe timeout (milliseconds)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Diagnostic lines kept for error reports
    #[serde(default = "default_diagnostic_lines")]
    pub diagnostic_lines: usize,
}

impl ReadinessSettings {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            mode: ReadinessMode::default(),
            ready_markers: default_ready_markers(),
            error_markers: default_error_markers(),
            grace_period_ms: default_grace_period(),
            deadline_secs: default_deadline(),
            probe_interval_ms: default_probe_interval(),
            probe_budget: default_probe_budget(),
            probe_timeout_ms: default_probe_timeout(),
            diagnostic_lines: default_diagnostic_lines(),
        }
    }
}
