mod command;
mod output;
mod service;
mod supervisor;
mod terminate;

pub use command::BackendCommand;
pub use service::{ServiceProcess, ServiceState};
pub use supervisor::{PendingStart, ProcessSupervisor, ReadyService};
