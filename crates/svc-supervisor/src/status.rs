//! One-way progress notifications for the UI collaborator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub message: String,
    /// 0-100
    pub progress_hint: u8,
    pub terminal: bool,
    /// Present only on the event announcing readiness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl StatusEvent {
    pub fn progress(message: impl Into<String>, progress_hint: u8) -> Self {
        Self {
            message: message.into(),
            progress_hint: progress_hint.min(100),
            terminal: false,
            base_url: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn ready(message: impl Into<String>, base_url: String) -> Self {
        Self {
            message: message.into(),
            progress_hint: 100,
            terminal: true,
            base_url: Some(base_url),
            emitted_at: Utc::now(),
        }
    }

    pub fn stopped() -> Self {
        Self {
            message: "Backend stopped".into(),
            progress_hint: 100,
            terminal: true,
            base_url: None,
            emitted_at: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            progress_hint: 100,
            terminal: true,
            base_url: None,
            emitted_at: Utc::now(),
        }
    }
}

/// Sending half handed to the supervisor.
///
/// Unbounded so emission never waits on the UI; events arrive in the order
/// they were emitted. A dropped receiver silently discards events.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

impl StatusChannel {
    pub fn new() -> (Self, StatusReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }
}
