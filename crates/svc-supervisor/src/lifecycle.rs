//! Binds supervisor start/stop to host application events.

use crate::process::{PendingStart, ProcessSupervisor, ReadyService, ServiceState};
use crate::{SupervisorError, SupervisorResult};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Events the host application forwards to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application finished launching
    AppReady,
    /// The last top-level window went away
    AllWindowsClosed,
    /// Explicit quit (menu, signal, OS session end)
    QuitRequested,
    /// The user asked for a fresh backend
    RestartRequested,
}

/// Whether closing the last window quits the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitPolicy {
    QuitOnLastWindow,
    /// macOS convention: the app outlives its windows
    StayResident,
}

impl QuitPolicy {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::StayResident
        } else {
            Self::QuitOnLastWindow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Continue,
    Quit,
}

/// What happened over one application run.
#[derive(Debug, Default)]
pub struct LifecycleReport {
    /// The last backend that became ready
    pub published: Option<ReadyService>,
    /// The last start that did not succeed
    pub start_error: Option<SupervisorError>,
}

impl LifecycleReport {
    /// A start failed for a reason other than being stopped.
    pub fn start_failed(&self) -> bool {
        self.start_error.as_ref().is_some_and(SupervisorError::is_fatal)
    }
}

/// Sole owner of the [`ProcessSupervisor`].
///
/// Exactly one start per ready event, and stop on every quit trigger. Stop
/// is idempotent so window-close followed by quit is harmless. A failed
/// start is reported and left alone; retrying is the user's call.
pub struct LifecycleCoordinator {
    supervisor: ProcessSupervisor,
    policy: QuitPolicy,
    started: bool,
    pending: Option<PendingStart>,
    report: LifecycleReport,
}

impl LifecycleCoordinator {
    pub fn new(supervisor: ProcessSupervisor, policy: QuitPolicy) -> Self {
        Self {
            supervisor,
            policy,
            started: false,
            pending: None,
            report: LifecycleReport::default(),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.supervisor.state()
    }

    /// The backend the UI should talk to, once known.
    pub fn published(&self) -> Option<&ReadyService> {
        self.report.published.as_ref()
    }

    pub fn is_start_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// React to one host event.
    pub async fn handle(&mut self, event: LifecycleEvent) -> LifecycleOutcome {
        debug!("Lifecycle event {event:?}");

        match event {
            LifecycleEvent::AppReady => {
                if self.started {
                    debug!("Application ready fired again, backend already started");
                } else {
                    self.started = true;
                    self.begin_start();
                }
                LifecycleOutcome::Continue
            }
            LifecycleEvent::AllWindowsClosed => match self.policy {
                QuitPolicy::QuitOnLastWindow => {
                    info!("All windows closed, quitting");
                    self.shutdown().await;
                    LifecycleOutcome::Quit
                }
                QuitPolicy::StayResident => {
                    info!("All windows closed, staying resident");
                    LifecycleOutcome::Continue
                }
            },
            LifecycleEvent::QuitRequested => {
                info!("Quit requested");
                self.shutdown().await;
                LifecycleOutcome::Quit
            }
            LifecycleEvent::RestartRequested => {
                if !self.started {
                    debug!("Restart requested before the application was ready, ignoring");
                    return LifecycleOutcome::Continue;
                }
                info!("Restarting backend");
                self.stop_backend().await;
                self.report.published = None;
                self.report.start_error = None;
                self.begin_start();
                LifecycleOutcome::Continue
            }
        }
    }

    /// Wait for the in-flight start, if any, and record its outcome.
    pub async fn settle_pending(&mut self) -> Option<&ReadyService> {
        if let Some(pending) = self.pending.take() {
            let result = pending.await;
            self.record(result);
        }
        self.report.published.as_ref()
    }

    /// Drive the coordinator from an event channel until quit.
    ///
    /// In-flight starts are raced against incoming events, so a quit during
    /// startup cancels the start. A closed channel counts as quit.
    pub async fn run(mut self, mut events: mpsc::Receiver<LifecycleEvent>) -> LifecycleReport {
        loop {
            tokio::select! {
                result = async {
                    match self.pending.as_mut() {
                        Some(pending) => pending.await,
                        None => std::future::pending().await,
                    }
                }, if self.pending.is_some() => {
                    self.pending = None;
                    self.record(result);
                }
                event = events.recv() => {
                    let event = event.unwrap_or(LifecycleEvent::QuitRequested);
                    if self.handle(event).await == LifecycleOutcome::Quit {
                        break;
                    }
                }
            }
        }

        self.report
    }

    fn begin_start(&mut self) {
        match self.supervisor.start_default() {
            Ok(pending) => self.pending = Some(pending),
            Err(e) => {
                error!("Could not start backend: {e}");
                self.report.start_error = Some(e);
            }
        }
    }

    async fn stop_backend(&mut self) {
        self.supervisor.stop().await;
        // a start cut short by the stop has already settled as Stopped
        if let Some(pending) = self.pending.take() {
            let result = pending.await;
            self.record(result);
        }
    }

    async fn shutdown(&mut self) {
        self.stop_backend().await;
        info!("Backend shut down, state {:?}", self.supervisor.state());
    }

    fn record(&mut self, result: SupervisorResult<ReadyService>) {
        match result {
            Ok(ready) => {
                info!("Publishing backend at {}", ready.base_url);
                self.report.published = Some(ready);
                self.report.start_error = None;
            }
            Err(e) => {
                if e.is_fatal() {
                    error!("Backend start failed: {e}");
                } else {
                    info!("Backend start ended: {e}");
                }
                self.report.start_error = Some(e);
            }
        }
    }
}
