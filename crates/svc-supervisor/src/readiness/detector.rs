//! Turns a stream of child output into a single readiness resolution.

use crate::config::{ReadinessMode, ReadinessSettings};
use crate::readiness::{
    Diagnostics, MarkerClassifier, OutputLine, ProbeOutcome, ProbePolicy, SignalKind,
};
use crate::{SupervisorError, SupervisorResult};

use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::time::Duration;

use error_location::ErrorLocation;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// How long to keep reading buffered output after the child has exited.
const EXIT_DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// How readiness was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyVia {
    /// A startup banner was seen and the grace period elapsed
    Marker,
    /// The HTTP probe reached the listener
    Probe,
    /// The deadline passed with the child alive and no banner seen.
    /// Treated as ready: some backends never print a recognisable banner.
    OptimisticTimeout,
}

type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeOutcome> + Send + 'a>>;

/// Decides when a freshly spawned backend can be used.
///
/// Resolution rules, first match wins:
/// - child exits before readiness: `ProcessExitedPrematurely` with captured diagnostics
/// - first ready marker, then the grace period: `Ready(Marker)`
/// - probe reaches the listener: `Ready(Probe)`
/// - probe budget exhausted in probe-only mode: `HealthCheckTimeout`
/// - deadline with no marker: `Ready(OptimisticTimeout)`
pub struct ReadinessDetector {
    classifier: MarkerClassifier,
    mode: ReadinessMode,
    grace: Duration,
    deadline: Duration,
    diagnostic_lines: usize,
    probe: Option<ProbePolicy>,
}

impl ReadinessDetector {
    pub fn from_settings(settings: &ReadinessSettings) -> Self {
        Self {
            classifier: MarkerClassifier::new(
                settings.ready_markers.clone(),
                settings.error_markers.clone(),
            ),
            mode: settings.mode,
            grace: settings.grace_period(),
            deadline: settings.deadline(),
            diagnostic_lines: settings.diagnostic_lines,
            probe: None,
        }
    }

    /// Attach an active probe. Ignored in markers-only mode.
    pub fn with_probe(mut self, probe: ProbePolicy) -> Self {
        self.probe = Some(probe);
        self
    }

    fn watches_markers(&self) -> bool {
        self.mode != ReadinessMode::Probe
    }

    fn active_probe(&self) -> Option<&ProbePolicy> {
        match self.mode {
            ReadinessMode::Markers => None,
            ReadinessMode::Probe | ReadinessMode::Combined => self.probe.as_ref(),
        }
    }

    /// The optimistic deadline applies unless a probe alone bounds the wait.
    fn deadline_applies(&self) -> bool {
        self.mode != ReadinessMode::Probe || self.probe.is_none()
    }

    /// Wait for exactly one resolution.
    ///
    /// `output` carries lines from both child pipes; `exited` completes with
    /// the exit code once the child is gone.
    pub async fn resolve<E>(
        &self,
        output: &mut mpsc::UnboundedReceiver<OutputLine>,
        exited: E,
    ) -> SupervisorResult<ReadyVia>
    where
        E: Future<Output = Option<i32>> + Send,
    {
        let mut diagnostics = Diagnostics::new(self.diagnostic_lines);
        let mut output_open = true;

        let deadline = sleep(self.deadline);
        let grace = sleep(self.grace);
        let mut grace_armed = false;
        tokio::pin!(deadline, grace, exited);

        let mut probe_pending = self.active_probe().is_some();
        let mut probe: ProbeFuture<'_> = match self.active_probe() {
            Some(policy) => Box::pin(policy.poll_until_reachable()),
            None => Box::pin(std::future::pending()),
        };

        loop {
            tokio::select! {
                biased;

                code = &mut exited => {
                    drain_after_exit(output, &self.classifier, &mut diagnostics).await;
                    if diagnostics.is_empty() {
                        warn!("Backend exited with code {code:?} before becoming ready, no output captured");
                    } else {
                        warn!("Backend exited with code {code:?} before becoming ready");
                    }
                    return Err(SupervisorError::ProcessExitedPrematurely {
                        code,
                        diagnostics: diagnostics.render(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                line = output.recv(), if output_open => {
                    let Some(line) = line else {
                        output_open = false;
                        continue;
                    };

                    let signal = self.classifier.classify(line);
                    diagnostics.observe(&signal);

                    match signal.kind {
                        SignalKind::Positive if self.watches_markers() && !grace_armed => {
                            info!(
                                "Ready marker on {}: {}",
                                signal.line.source, signal.line.text
                            );
                            grace_armed = true;
                            // measured from when the banner was read
                            grace.as_mut().reset(signal.line.at + self.grace);
                        }
                        SignalKind::Positive => {
                            debug!("Ignoring repeated ready marker");
                        }
                        SignalKind::Error => {
                            warn!("Backend reported: {}", signal.line.text);
                        }
                        SignalKind::Neutral => {}
                    }
                }

                _ = &mut grace, if grace_armed => {
                    info!("Grace period of {:?} elapsed, backend is ready", self.grace);
                    return Ok(ReadyVia::Marker);
                }

                outcome = &mut probe, if probe_pending => match outcome {
                    ProbeOutcome::Reachable { attempt } => {
                        info!("Backend reachable after {attempt} probe(s)");
                        return Ok(ReadyVia::Probe);
                    }
                    ProbeOutcome::Exhausted { attempts } if self.mode == ReadinessMode::Probe => {
                        return Err(SupervisorError::HealthCheckTimeout {
                            attempts,
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                    ProbeOutcome::Exhausted { attempts } => {
                        warn!("Probe gave up after {attempts} attempts, still watching output");
                        probe_pending = false;
                    }
                },

                _ = &mut deadline, if self.deadline_applies() && !grace_armed => {
                    warn!(
                        "No ready marker within {:?}, assuming the backend is up",
                        self.deadline
                    );
                    return Ok(ReadyVia::OptimisticTimeout);
                }
            }
        }
    }
}

/// Collect whatever the child wrote right before exiting.
async fn drain_after_exit(
    output: &mut mpsc::UnboundedReceiver<OutputLine>,
    classifier: &MarkerClassifier,
    diagnostics: &mut Diagnostics,
) {
    let window = sleep(EXIT_DRAIN_WINDOW);
    tokio::pin!(window);

    loop {
        tokio::select! {
            line = output.recv() => match line {
                Some(line) => diagnostics.observe(&classifier.classify(line)),
                None => break,
            },
            _ = &mut window => break,
        }
    }
}
