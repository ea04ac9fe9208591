//! Turns OS signals and UI control lines into lifecycle events.

use svc_supervisor::LifecycleEvent;

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Map one control line from the UI to an event.
pub(crate) fn parse_control_line(line: &str) -> Option<LifecycleEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "all-windows-closed" => Some(LifecycleEvent::AllWindowsClosed),
        "quit" => Some(LifecycleEvent::QuitRequested),
        "restart" => Some(LifecycleEvent::RestartRequested),
        _ => None,
    }
}

/// Forward control lines until EOF, which counts as quit.
///
/// Blocking; runs on its own thread so a pending read never holds up
/// runtime shutdown.
pub(crate) fn read_control_lines<R>(input: R, events: &mpsc::Sender<LifecycleEvent>)
where
    R: BufRead,
{
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read control input: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_control_line(&line) {
            Some(event) => {
                if events.blocking_send(event).is_err() {
                    return;
                }
            }
            None => warn!("Unknown control line {line:?}"),
        }
    }

    debug!("Control input closed");
    events.blocking_send(LifecycleEvent::QuitRequested).ok();
}

/// Read control lines from stdin on a dedicated thread.
pub(crate) fn forward_stdin(events: mpsc::Sender<LifecycleEvent>) {
    std::thread::spawn(move || {
        read_control_lines(std::io::stdin().lock(), &events);
    });
}

/// SIGINT/SIGTERM become a quit request.
#[cfg(unix)]
pub(crate) fn forward_signals(events: mpsc::Sender<LifecycleEvent>) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    std::thread::spawn(move || {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to register signal handlers: {e}");
                return;
            }
        };

        for sig in signals.forever() {
            info!("Received signal {sig}, shutting down...");
            if events.blocking_send(LifecycleEvent::QuitRequested).is_err() {
                break;
            }
        }
    });
}

/// Ctrl-C becomes a quit request.
#[cfg(not(unix))]
pub(crate) fn forward_signals(events: mpsc::Sender<LifecycleEvent>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down...");
            if events.send(LifecycleEvent::QuitRequested).await.is_err() {
                break;
            }
        }
    });
}
