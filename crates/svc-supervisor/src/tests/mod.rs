mod config;
mod status;

use crate::ReadinessSettings;

/// Readiness settings with short, test-friendly timings.
pub(crate) fn fast_readiness() -> ReadinessSettings {
    ReadinessSettings {
        grace_period_ms: 300,
        deadline_secs: 2,
        probe_interval_ms: 100,
        probe_budget: 5,
        probe_timeout_ms: 200,
        ..Default::default()
    }
}
