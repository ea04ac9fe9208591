//! Readiness detection for the supervised backend.

mod classifier;
mod detector;
mod diagnostics;
mod probe;
mod signal;

pub use classifier::MarkerClassifier;
pub use detector::{ReadinessDetector, ReadyVia};
pub use diagnostics::Diagnostics;
pub use probe::{HttpProbe, ProbeOutcome, ProbePolicy, ReadinessProbe};
pub use signal::{OutputLine, ReadinessSignal, SignalKind, StreamSource};
