//! Port allocation and availability checking.

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::debug;

/// Scans for a free local TCP port.
///
/// The allocator only probes; the backend binds the port itself. Probing and
/// that bind are not atomic, so a backend that loses the race shows up later
/// as a spawn or premature-exit failure rather than here.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: String,
    max_attempts: u16,
}

impl PortAllocator {
    pub fn new(host: impl Into<String>, max_attempts: u16) -> Self {
        Self {
            host: host.into(),
            max_attempts,
        }
    }

    /// Find the first free port at or above `preferred`.
    ///
    /// Ports are tried in increasing order, at most `max_attempts` of them,
    /// never wrapping past 65535.
    pub fn reserve(&self, preferred: u16) -> SupervisorResult<u16> {
        if preferred == 0 {
            return Err(SupervisorError::InvalidPort {
                port: preferred,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut attempts = 0u16;
        let mut candidate = Some(preferred);

        while let Some(port) = candidate
            && attempts < self.max_attempts
        {
            attempts += 1;
            if self.is_available(port) {
                return Ok(port);
            }
            debug!("Port {port} is taken");
            candidate = port.checked_add(1);
        }

        Err(SupervisorError::PortUnavailable {
            start: preferred,
            attempts,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Check if a port is available for binding.
    ///
    /// Attempts to bind to host:port. The socket is released as soon as the
    /// listener is dropped.
    pub fn is_available(&self, port: u16) -> bool {
        std::net::TcpListener::bind((self.host.as_str(), port)).is_ok()
    }
}
