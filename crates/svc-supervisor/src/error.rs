//! Supervisor error taxonomy.
//!
//! Fatal kinds reject the pending start and reach the UI as a terminal
//! status event. The optimistic timeout (deadline passed, child still alive,
//! no banner seen) has no variant: it resolves as
//! [`crate::ReadyVia::OptimisticTimeout`].

use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("No free port after {attempts} attempts starting at {start} {location}")]
    PortUnavailable {
        start: u16,
        attempts: u16,
        location: ErrorLocation,
    },

    #[error("Port {port} is not a usable TCP port {location}")]
    InvalidPort { port: u16, location: ErrorLocation },

    #[error("Failed to spawn backend process: {message} {location}")]
    ProcessSpawn {
        message: String,
        #[source]
        source: Option<std::io::Error>,
        location: ErrorLocation,
    },

    #[error("Backend exited with code {code:?} before becoming ready: {diagnostics} {location}")]
    ProcessExitedPrematurely {
        code: Option<i32>,
        diagnostics: String,
        location: ErrorLocation,
    },

    #[error("Backend did not answer health probes after {attempts} attempts {location}")]
    HealthCheckTimeout {
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Supervisor was stopped before the backend became ready {location}")]
    Stopped { location: ErrorLocation },

    #[error("A backend process is already being supervised {location}")]
    AlreadyStarted { location: ErrorLocation },

    #[error("Another shell instance is already running (lock file: {path}) {location}")]
    AlreadyRunning {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to acquire lock at {path}: {source} {location}")]
    LockAcquisition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Configuration invalid: {message} {location}")]
    ConfigInvalid {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    #[track_caller]
    pub fn spawn<S: Into<String>>(message: S, source: Option<std::io::Error>) -> Self {
        Self::ProcessSpawn {
            message: message.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn stopped() -> Self {
        Self::Stopped {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether this kind rejects a pending start.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PortUnavailable { .. }
                | Self::InvalidPort { .. }
                | Self::ProcessSpawn { .. }
                | Self::ProcessExitedPrematurely { .. }
                | Self::HealthCheckTimeout { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::PortUnavailable { .. } => {
                "No free local port was found for the backend. \
                   Close other applications or restart your computer."
            }
            Self::ProcessSpawn { .. } => {
                "The backend could not be launched. \
                   The installation may be incomplete; please reinstall."
            }
            Self::ProcessExitedPrematurely { .. } => {
                "The backend stopped while starting. \
                   Check the logs for the reported error."
            }
            Self::HealthCheckTimeout { .. } => {
                "The backend started but never answered. \
                   Try restarting the application or check the logs."
            }
            Self::AlreadyRunning { .. } => {
                "The application is already running. \
                   Check your task manager."
            }
            Self::ConfigInvalid { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            Self::LockAcquisition { .. } => {
                "Unable to create lock file. \
                   Check file permissions in the application directory."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
