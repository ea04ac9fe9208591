//! Backend process lifecycle: reserve, spawn, wait for readiness, tear down.

use crate::config::{ReadinessMode, SupervisorConfig};
use crate::port::PortAllocator;
use crate::process::output::pump;
use crate::process::terminate::terminate;
use crate::process::{BackendCommand, ServiceProcess, ServiceState};
use crate::readiness::{HttpProbe, ProbePolicy, ReadinessDetector, ReadyVia, StreamSource};
use crate::status::{StatusChannel, StatusEvent};
use crate::{SupervisorError, SupervisorResult};

use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use error_location::ErrorLocation;
use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Output meaning the listener could not bind.
const BIND_FAILURE_MARKERS: [&str; 3] = [
    "Address already in use",
    "EADDRINUSE",
    "Only one usage of each socket address",
];

/// What a successful start publishes to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyService {
    pub port: u16,
    pub base_url: String,
    pub pid: Option<u32>,
    pub via: ReadyVia,
}

/// Resolves once the backend is ready, failed, or was stopped first.
#[must_use = "a pending start does nothing unless awaited or dropped deliberately"]
pub struct PendingStart {
    rx: oneshot::Receiver<SupervisorResult<ReadyService>>,
}

impl Future for PendingStart {
    type Output = SupervisorResult<ReadyService>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            // run task vanished without answering
            Err(_) => Poll::Ready(Err(SupervisorError::stopped())),
        }
    }
}

struct RunningService {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<ServiceProcess>,
}

/// Owns at most one backend process at a time.
///
/// Each [`start`](Self::start) launches a run task that exclusively owns
/// the child handle; nothing else signals or reads from it. The task is
/// told to stop through a one-shot channel, so no lock guards the child.
pub struct ProcessSupervisor {
    config: Arc<SupervisorConfig>,
    command: BackendCommand,
    status: StatusChannel,
    state_tx: Arc<watch::Sender<ServiceState>>,
    state_rx: watch::Receiver<ServiceState>,
    running: Option<RunningService>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, command: BackendCommand, status: StatusChannel) -> Self {
        let (state_tx, state_rx) = watch::channel(ServiceState::NotStarted);

        Self {
            config: Arc::new(config),
            command,
            status,
            state_tx: Arc::new(state_tx),
            state_rx,
            running: None,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Launch the backend, scanning for a port from `preferred_port` up.
    ///
    /// Returns immediately; the returned future settles on readiness or
    /// failure. Fails with `AlreadyStarted` while a previous run is live.
    pub fn start(&mut self, preferred_port: u16) -> SupervisorResult<PendingStart> {
        if let Some(running) = &self.running
            && !running.task.is_finished()
        {
            return Err(SupervisorError::AlreadyStarted {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.running = None;

        let (result_tx, result_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let run = ServiceRun {
            config: self.config.clone(),
            command: self.command.clone(),
            status: self.status.clone(),
            state_tx: self.state_tx.clone(),
            preferred_port,
            process: ServiceProcess::new(),
        };
        self.state_tx.send_replace(ServiceState::NotStarted);

        let task = tokio::spawn(run.execute(result_tx, stop_rx));
        self.running = Some(RunningService { stop_tx, task });

        Ok(PendingStart { rx: result_rx })
    }

    /// Start on the configured preferred port.
    pub fn start_default(&mut self) -> SupervisorResult<PendingStart> {
        self.start(self.config.network.preferred_port)
    }

    /// Stop the backend and wait until it is gone.
    ///
    /// A no-op when nothing was started or it was already stopped. An
    /// in-flight start settles with `Stopped`.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Stop requested with no backend running");
            return;
        };

        // Err means the run already finished on its own
        let _ = running.stop_tx.send(());

        match running.task.await {
            Ok(process) => info!("Backend run finished in state {:?}", process.state()),
            Err(e) => warn!("Backend run task ended abnormally: {e}"),
        }
    }

    /// Whether a run task is still alive.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state_rx.clone()
    }

    /// Get current state.
    pub fn state(&self) -> ServiceState {
        self.state_rx.borrow().clone()
    }
}

/// One attempt at bringing the backend up, owned by its own task.
struct ServiceRun {
    config: Arc<SupervisorConfig>,
    command: BackendCommand,
    status: StatusChannel,
    state_tx: Arc<watch::Sender<ServiceState>>,
    preferred_port: u16,
    process: ServiceProcess,
}

impl ServiceRun {
    async fn execute(
        mut self,
        result_tx: oneshot::Sender<SupervisorResult<ReadyService>>,
        mut stop_rx: oneshot::Receiver<()>,
    ) -> ServiceProcess {
        let grace = self.config.shutdown_grace();

        self.status.emit(StatusEvent::progress("Reserving port", 10));
        let allocator = PortAllocator::new(
            self.config.network.host.clone(),
            self.config.network.max_port_attempts,
        );
        let preferred = self.preferred_port;
        let reserve = tokio::task::spawn_blocking(move || allocator.reserve(preferred));

        let port = tokio::select! {
            biased;
            _ = &mut stop_rx => return self.cancelled(result_tx),
            joined = reserve => {
                let reserved = joined
                    .map_err(|e| SupervisorError::from(std::io::Error::other(e)))
                    .and_then(|r| r);
                match reserved {
                    Ok(port) => port,
                    Err(e) => return self.fail(result_tx, e),
                }
            }
        };

        info!("Using port {port}");
        self.advance(ServiceState::PortReserved { port });
        self.status
            .emit(StatusEvent::progress(format!("Using port {port}"), 25));

        let detector = match self.detector(port) {
            Ok(detector) => detector,
            Err(e) => return self.fail(result_tx, e),
        };

        self.advance(ServiceState::Spawning { port });
        self.status.emit(StatusEvent::progress("Starting backend", 40));

        let mut child = match self.spawn(port) {
            Ok(child) => child,
            Err(e) => return self.fail(result_tx, e),
        };
        let pid = child.id();
        info!("Spawned backend with PID {pid:?}");

        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            pump(stdout, StreamSource::Stdout, output_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump(stderr, StreamSource::Stderr, output_tx.clone());
        }
        drop(output_tx);

        self.advance(ServiceState::AwaitingReadiness { port, pid });
        self.status.emit(StatusEvent::progress(
            format!("Waiting for backend on port {port}"),
            60,
        ));

        let resolution = tokio::select! {
            biased;
            _ = &mut stop_rx => None,
            resolved = detector.resolve(&mut output_rx, exit_code(&mut child)) => Some(resolved),
        };
        // pumps keep draining the pipes, they just stop forwarding
        drop(output_rx);

        let via = match resolution {
            None => {
                terminate(&mut child, grace).await;
                return self.cancelled(result_tx);
            }
            Some(Err(e)) => {
                terminate(&mut child, grace).await;
                return self.fail(result_tx, lost_port_race(e, port));
            }
            Some(Ok(via)) => via,
        };

        if via == ReadyVia::OptimisticTimeout {
            warn!("Proceeding without a confirmed ready signal");
        }

        self.advance(ServiceState::Ready { port, pid });
        let base_url = self.config.base_url(port);
        info!("Backend ready at {base_url} ({via:?})");
        self.status.emit(StatusEvent::ready(
            format!("Backend ready at {base_url}"),
            base_url.clone(),
        ));
        let _ = result_tx.send(Ok(ReadyService {
            port,
            base_url,
            pid,
            via,
        }));

        tokio::select! {
            _ = &mut stop_rx => {
                terminate(&mut child, grace).await;
                info!("Backend stopped");
                self.advance(ServiceState::Stopped);
                self.status.emit(StatusEvent::stopped());
            }
            exited = child.wait() => {
                let message = match exited {
                    Ok(status) => format!("Backend exited unexpectedly: {status}"),
                    Err(e) => format!("Lost track of backend process: {e}"),
                };
                error!("{message}");
                self.advance(ServiceState::Failed { error: message.clone() });
                self.status.emit(StatusEvent::failed(message));
            }
        }

        self.process
    }

    fn detector(&self, port: u16) -> SupervisorResult<ReadinessDetector> {
        let settings = &self.config.readiness;
        let detector = ReadinessDetector::from_settings(settings);

        if settings.mode == ReadinessMode::Markers {
            return Ok(detector);
        }

        let probe = HttpProbe::new(&self.config.network.host, port, settings.probe_timeout())?;
        debug!("Probing {} for readiness", probe.url());

        Ok(detector.with_probe(ProbePolicy::new(
            Arc::new(probe),
            settings.probe_interval(),
            settings.probe_budget,
        )))
    }

    fn spawn(&self, port: u16) -> SupervisorResult<Child> {
        let program = self.command.validate()?;
        let host = &self.config.network.host;

        info!(
            "Spawning {} {:?} in {}",
            program.display(),
            self.command.rendered_args(host, port),
            self.command.working_dir().display()
        );

        self.command
            .to_command(&program, host, port)
            .spawn()
            .map_err(|e| {
                SupervisorError::spawn(format!("failed to start {}", program.display()), Some(e))
            })
    }

    fn advance(&mut self, next: ServiceState) {
        if self.process.advance(next) {
            self.state_tx.send_replace(self.process.state().clone());
        }
    }

    fn cancelled(
        mut self,
        result_tx: oneshot::Sender<SupervisorResult<ReadyService>>,
    ) -> ServiceProcess {
        info!("Startup cancelled by stop request");
        self.advance(ServiceState::Stopped);
        self.status.emit(StatusEvent::stopped());
        let _ = result_tx.send(Err(SupervisorError::stopped()));
        self.process
    }

    fn fail(
        mut self,
        result_tx: oneshot::Sender<SupervisorResult<ReadyService>>,
        error: SupervisorError,
    ) -> ServiceProcess {
        error!("Backend failed to start: {error}");
        self.advance(ServiceState::Failed {
            error: error.to_string(),
        });
        self.status.emit(StatusEvent::failed(format!(
            "Backend failed to start: {error}. {}",
            error.recovery_hint()
        )));
        let _ = result_tx.send(Err(error));
        self.process
    }
}

/// Report a backend that exited because another process took its port
/// between the scan and the bind as a spawn failure.
fn lost_port_race(error: SupervisorError, port: u16) -> SupervisorError {
    match error {
        SupervisorError::ProcessExitedPrematurely {
            ref diagnostics, ..
        } if BIND_FAILURE_MARKERS.iter().any(|m| diagnostics.contains(m)) => {
            SupervisorError::spawn(
                format!("backend could not bind port {port}: {diagnostics}"),
                None,
            )
        }
        other => other,
    }
}

async fn exit_code(child: &mut Child) -> Option<i32> {
    match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Failed to wait on backend: {e}");
            None
        }
    }
}
