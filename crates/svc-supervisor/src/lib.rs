//! Local backend supervision for a desktop shell.
//!
//! Reserves a loopback port, launches the backend on it, decides when it is
//! ready to serve, reports progress to the UI, and tears it down when the
//! application quits.

mod config;
mod error;
mod lifecycle;
mod lock;
mod port;
mod process;
mod readiness;
mod status;

pub use config::{
    BackendSettings, CONFIG_FILENAME, CONFIG_VERSION, LoggingSettings, NetworkSettings,
    ReadinessMode, ReadinessSettings, ShutdownSettings, SupervisorConfig,
};
pub use error::{Result as SupervisorResult, SupervisorError};
pub use lifecycle::{
    LifecycleCoordinator, LifecycleEvent, LifecycleOutcome, LifecycleReport, QuitPolicy,
};
pub use lock::{LOCK_FILENAME, LockFile, LockInfo};
pub use port::PortAllocator;
pub use process::{
    BackendCommand, PendingStart, ProcessSupervisor, ReadyService, ServiceProcess, ServiceState,
};
pub use readiness::{
    Diagnostics, HttpProbe, MarkerClassifier, OutputLine, ProbeOutcome, ProbePolicy,
    ReadinessDetector, ReadinessProbe, ReadinessSignal, ReadyVia, SignalKind, StreamSource,
};
pub use status::{StatusChannel, StatusEvent, StatusReceiver};

#[cfg(test)]
mod tests;
