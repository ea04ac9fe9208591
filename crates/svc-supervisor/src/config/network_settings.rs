use crate::config::{default_host, default_max_port_attempts, default_port};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Host the backend binds to (always loopback for security)
    #[serde(default = "default_host")]
    pub host: String,

    /// First port tried when scanning
    #[serde(default = "default_port")]
    pub preferred_port: u16,

    /// Upper bound on sequential ports probed
    #[serde(default = "default_max_port_attempts")]
    pub max_port_attempts: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            preferred_port: default_port(),
            max_port_attempts: default_max_port_attempts(),
        }
    }
}
