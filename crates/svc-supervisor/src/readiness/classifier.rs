use crate::readiness::{OutputLine, ReadinessSignal, SignalKind};

/// Classifies output lines by plain substring markers.
///
/// Ready markers win over error markers when a line carries both.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    ready_markers: Vec<String>,
    error_markers: Vec<String>,
}

impl MarkerClassifier {
    pub fn new(ready_markers: Vec<String>, error_markers: Vec<String>) -> Self {
        Self {
            ready_markers: ready_markers.into_iter().filter(|m| !m.is_empty()).collect(),
            error_markers: error_markers.into_iter().filter(|m| !m.is_empty()).collect(),
        }
    }

    pub fn kind_of(&self, text: &str) -> SignalKind {
        if self.ready_markers.iter().any(|m| text.contains(m.as_str())) {
            SignalKind::Positive
        } else if self.error_markers.iter().any(|m| text.contains(m.as_str())) {
            SignalKind::Error
        } else {
            SignalKind::Neutral
        }
    }

    pub fn classify(&self, line: OutputLine) -> ReadinessSignal {
        let kind = self.kind_of(&line.text);
        ReadinessSignal { line, kind }
    }
}
