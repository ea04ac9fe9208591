//! Relays supervisor output to the UI collaborator.

use svc_supervisor::{LockFile, ServiceState, StatusEvent, StatusReceiver};

use std::io::Write;

use tokio::sync::watch;
use tracing::{error, info, warn};

/// Render one status event for the UI.
///
/// JSON mode writes one object per line; otherwise a short human line.
pub(crate) fn render_status(event: &StatusEvent, json: bool) -> String {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => format!(r#"{{"message":"unserializable status event: {e}"}}"#),
        }
    } else {
        match &event.base_url {
            Some(url) => format!("[{:>3}%] {} ({url})", event.progress_hint, event.message),
            None => format!("[{:>3}%] {}", event.progress_hint, event.message),
        }
    }
}

/// Print status events on stdout until the supervisor goes away.
pub(crate) async fn relay_status(mut status: StatusReceiver, json: bool) {
    while let Some(event) = status.recv().await {
        if event.terminal {
            info!("Status: {}", event.message);
        }

        let line = render_status(&event, json);
        let mut stdout = std::io::stdout().lock();
        if writeln!(stdout, "{line}").and_then(|()| stdout.flush()).is_err() {
            warn!("Status output closed, no longer relaying");
            break;
        }
    }
}

/// Follow state changes and keep the lock file's backend record current.
///
/// Owns the lock so it is released once the supervisor is gone.
pub(crate) async fn track_state(mut states: watch::Receiver<ServiceState>, mut lock: LockFile) {
    info!("State subscription task started");

    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        info!("New state: {state:?}");

        if let ServiceState::Ready { port, pid } = state
            && let Err(e) = lock.record_backend(pid, port)
        {
            error!("Failed to update lock file: {e}");
        }
    }

    lock.release();
}
