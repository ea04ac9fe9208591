//! Cooperative-then-forceful child termination.

use std::time::Duration;

use tokio::process::Child;
use tracing::{info, warn};

/// Ask the child to exit, wait up to `grace`, then kill it.
///
/// Returns once the child has been reaped.
pub(crate) async fn terminate(child: &mut Child, grace: Duration) {
    let Some(pid) = child.id() else {
        // already reaped
        return;
    };

    if let Ok(Some(status)) = child.try_wait() {
        info!("Backend (PID {pid}) had already exited: {status}");
        return;
    }

    request_exit(pid);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            info!("Backend (PID {pid}) exited: {status}");
        }
        Ok(Err(e)) => {
            warn!("Failed to wait for backend (PID {pid}): {e}");
        }
        Err(_) => {
            warn!("Backend (PID {pid}) ignored termination for {grace:?}, killing");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill backend (PID {pid}): {e}");
            }
        }
    }
}

#[cfg(unix)]
fn request_exit(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    info!("Sending SIGTERM to pid {pid}");
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!("SIGTERM to pid {pid} failed: {e}");
    }
}

#[cfg(windows)]
fn request_exit(pid: u32) {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    info!("Sending CTRL_BREAK to pid {pid}");
    unsafe {
        GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid);
    }
}
