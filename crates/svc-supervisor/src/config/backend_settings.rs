use crate::config::{
    default_api_prefix, default_args, default_env, default_program, default_working_dir,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Executable path, or a bare name looked up on PATH
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments; `{host}` and `{port}` are substituted at spawn time
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Backend root, relative paths resolve against the config directory
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Extra environment for the child
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,

    /// Path segment appended to the published base URL
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: default_working_dir(),
            env: default_env(),
            api_prefix: default_api_prefix(),
        }
    }
}
