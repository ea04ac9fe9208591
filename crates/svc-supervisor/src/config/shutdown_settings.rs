use crate::config::default_shutdown_grace;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSettings {
    /// Wait after the cooperative signal before force-killing (seconds)
    #[serde(default = "default_shutdown_grace")]
    pub grace_secs: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_secs: default_shutdown_grace(),
        }
    }
}
