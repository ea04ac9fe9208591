use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of one supervised backend instance.
///
/// Moves forward only. `Failed` and `Stopped` are terminal; a restart
/// creates a new [`ServiceProcess`] rather than rewinding this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceState {
    NotStarted,
    PortReserved { port: u16 },
    Spawning { port: u16 },
    AwaitingReadiness { port: u16, pid: Option<u32> },
    Ready { port: u16, pid: Option<u32> },
    Failed { error: String },
    Stopped,
}

impl ServiceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Stopped)
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Self::PortReserved { port }
            | Self::Spawning { port }
            | Self::AwaitingReadiness { port, .. }
            | Self::Ready { port, .. } => Some(*port),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::PortReserved { .. } => 1,
            Self::Spawning { .. } => 2,
            Self::AwaitingReadiness { .. } => 3,
            Self::Ready { .. } => 4,
            Self::Failed { .. } | Self::Stopped => 5,
        }
    }
}

/// The backend instance owned by one supervisor run.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceProcess {
    state: ServiceState,
    pid: Option<u32>,
    bound_port: Option<u16>,
    started_at: DateTime<Utc>,
}

impl ServiceProcess {
    pub fn new() -> Self {
        Self {
            state: ServiceState::NotStarted,
            pid: None,
            bound_port: None,
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn bound_port(&self) -> Option<u16> {
        self.bound_port
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Apply a transition. Returns false and leaves the instance untouched
    /// when the move would go backwards or leave a terminal state.
    pub fn advance(&mut self, next: ServiceState) -> bool {
        if self.state.is_terminal() || next.rank() < self.state.rank() {
            return false;
        }

        if let Some(port) = next.port() {
            // assigned once, immutable afterwards
            match self.bound_port {
                Some(bound) if bound != port => return false,
                _ => self.bound_port = Some(port),
            }
        }

        if let ServiceState::AwaitingReadiness { pid, .. } | ServiceState::Ready { pid, .. } = &next
            && pid.is_some()
        {
            self.pid = *pid;
        }

        if next.is_terminal() {
            self.pid = None;
        }

        self.state = next;
        true
    }
}

impl Default for ServiceProcess {
    fn default() -> Self {
        Self::new()
    }
}
