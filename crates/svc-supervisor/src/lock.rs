//! Lock file for single-instance enforcement.

use crate::{SupervisorError, SupervisorResult};

use std::fs::OpenOptions;
use std::io::Write;
use std::panic::Location;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

pub const LOCK_FILENAME: &str = "supervisor.lock";
#[cfg(unix)]
const LOCK_FILE_MODE: u32 = 0o600; // Owner read/write only

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// The shell process holding the lock
    pub pid: u32,
    pub backend_pid: Option<u32>,
    pub port: Option<u16>,
    pub started_at: DateTime<Utc>,
}

/// Keeps a second shell from launching a second backend on the same data
/// directory.
///
/// A lock left behind by a dead shell is treated as stale and replaced.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    info: LockInfo,
    held: bool,
}

impl LockFile {
    /// Try to acquire the lock in `data_dir`.
    pub fn acquire(data_dir: &Path) -> SupervisorResult<Self> {
        let path = data_dir.join(LOCK_FILENAME);

        if let Some(existing) = Self::read(&path) {
            if existing.pid != std::process::id() && is_process_running(existing.pid) {
                return Err(SupervisorError::AlreadyRunning {
                    path,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            info!("Removing stale lock file (PID {} not running)", existing.pid);
            std::fs::remove_file(&path).ok();
        }

        let mut lock = Self {
            path,
            info: LockInfo {
                pid: std::process::id(),
                backend_pid: None,
                port: None,
                started_at: Utc::now(),
            },
            held: true,
        };
        lock.write()?;

        Ok(lock)
    }

    /// Record the backend once it is ready.
    pub fn record_backend(&mut self, backend_pid: Option<u32>, port: u16) -> SupervisorResult<()> {
        self.info.backend_pid = backend_pid;
        self.info.port = Some(port);
        self.write()
    }

    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read lock info from an existing file, if it parses.
    pub fn read(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write(&mut self) -> SupervisorResult<()> {
        let content = serde_json::to_string_pretty(&self.info)
            .map_err(|e| SupervisorError::from(std::io::Error::other(e)))?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(LOCK_FILE_MODE);

        let mut file = options
            .open(&self.path)
            .map_err(|e| SupervisorError::LockAcquisition {
                path: self.path.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;

        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Release the lock file.
    ///
    /// Called automatically on drop, but can be called
    /// explicitly for graceful shutdown.
    pub fn release(&mut self) {
        if self.held {
            self.held = false;
            std::fs::remove_file(&self.path).ok();
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check if a process with given PID is running.
#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // 0 and negative values address process groups
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }

    // kill(pid, 0) probes without signalling; EPERM still means it exists
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Check if a process with given PID is running (Windows).
#[cfg(windows)]
fn is_process_running(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, STILL_ACTIVE};
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle.is_null() {
            return false;
        }

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle);

        result != 0 && exit_code == STILL_ACTIVE as u32
    }
}
