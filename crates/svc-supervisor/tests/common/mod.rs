#![allow(dead_code)]

use svc_supervisor::{
    BackendCommand, ProcessSupervisor, ReadinessMode, StatusChannel, StatusEvent, StatusReceiver,
    SupervisorConfig,
};

use std::net::TcpListener;
use std::path::Path;

pub const STUB_BANNER: &str = "Listening on stub backend";

/// Launch command for the stub backend binary built alongside these tests.
pub fn stub_command(extra: &[&str]) -> BackendCommand {
    BackendCommand::new(
        env!("CARGO_BIN_EXE_stub-backend"),
        env!("CARGO_MANIFEST_DIR"),
    )
    .args(["--host", "{host}", "--port", "{port}"])
    .args(extra.iter().copied())
}

/// Ask the OS for a port that is free right now.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// Hold a port whose successor is free right now.
pub fn occupied_port_with_free_successor() -> (TcpListener, u16) {
    for _ in 0..50 {
        let held = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = held.local_addr().unwrap().port();
        if let Some(next) = port.checked_add(1)
            && TcpListener::bind(("127.0.0.1", next)).is_ok()
        {
            return (held, port);
        }
    }
    panic!("no occupied port with a free successor found");
}

/// Config with short timings and a fresh preferred port.
pub fn test_config(mode: ReadinessMode) -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.network.preferred_port = free_port();
    config.network.max_port_attempts = 20;
    config.backend.working_dir = env!("CARGO_MANIFEST_DIR").into();
    config.readiness.mode = mode;
    config.readiness.ready_markers = vec![STUB_BANNER.into()];
    config.readiness.grace_period_ms = 200;
    config.readiness.deadline_secs = 2;
    config.readiness.probe_interval_ms = 100;
    config.readiness.probe_budget = 30;
    config.readiness.probe_timeout_ms = 500;
    config.shutdown.grace_secs = 2;
    config
}

pub fn supervisor(config: SupervisorConfig, extra: &[&str]) -> (ProcessSupervisor, StatusReceiver) {
    let (status, rx) = StatusChannel::new();
    (ProcessSupervisor::new(config, stub_command(extra), status), rx)
}

pub fn supervisor_for(
    config: SupervisorConfig,
    command: BackendCommand,
) -> (ProcessSupervisor, StatusReceiver) {
    let (status, rx) = StatusChannel::new();
    (ProcessSupervisor::new(config, command, status), rx)
}

/// Everything emitted so far, without waiting.
pub fn drain(rx: &mut StatusReceiver) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn missing_program(dir: &Path) -> BackendCommand {
    BackendCommand::new(dir.join("no-such-backend"), dir)
}
