use crate::readiness::{ReadinessSignal, SignalKind, StreamSource};

use std::collections::VecDeque;

const NO_OUTPUT: &str = "(no diagnostic output captured)";

/// Bounded tail of diagnostic output kept for failure reports.
///
/// Holds every stderr line plus stdout lines that matched an error marker.
#[derive(Debug)]
pub struct Diagnostics {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    pub fn observe(&mut self, signal: &ReadinessSignal) {
        if signal.line.source == StreamSource::Stderr || signal.kind == SignalKind::Error {
            self.lines.push_back(signal.line.text.clone());
            while self.lines.len() > self.capacity {
                self.lines.pop_front();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return NO_OUTPUT.into();
        }
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}
