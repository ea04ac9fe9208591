use std::fmt;

use tokio::time::Instant;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of child output, stamped when it was read.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub source: StreamSource,
    pub text: String,
    pub at: Instant,
}

impl OutputLine {
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Matched a "server is up" marker
    Positive,
    /// Matched an error marker
    Error,
    Neutral,
}

/// A classified output line. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ReadinessSignal {
    pub line: OutputLine,
    pub kind: SignalKind,
}
