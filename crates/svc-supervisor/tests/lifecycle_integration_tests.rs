//! Integration tests for the lifecycle coordinator, driving the stub backend

mod common;

use common::{STUB_BANNER, missing_program, supervisor, supervisor_for, test_config};
use svc_supervisor::{
    LifecycleCoordinator, LifecycleEvent, LifecycleOutcome, QuitPolicy, ReadinessMode,
    ServiceState, SupervisorError,
};

use std::time::Duration;

use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(15);

fn coordinator(policy: QuitPolicy) -> LifecycleCoordinator {
    let config = test_config(ReadinessMode::Markers);
    let (supervisor, _status) = supervisor(config, &["--banner", STUB_BANNER]);
    LifecycleCoordinator::new(supervisor, policy)
}

#[tokio::test]
async fn given_app_ready_twice_when_handled_then_single_backend_started() {
    // Given
    let mut coordinator = coordinator(QuitPolicy::QuitOnLastWindow);

    // When
    coordinator.handle(LifecycleEvent::AppReady).await;
    coordinator.handle(LifecycleEvent::AppReady).await;
    let published = coordinator.settle_pending().await.cloned();

    // Then
    assert!(published.is_some());
    assert!(matches!(coordinator.state(), ServiceState::Ready { .. }));

    coordinator.handle(LifecycleEvent::QuitRequested).await;
    assert_eq!(coordinator.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn given_ready_backend_when_quit_requested_then_stopped_and_quit() {
    let mut coordinator = coordinator(QuitPolicy::QuitOnLastWindow);
    coordinator.handle(LifecycleEvent::AppReady).await;
    coordinator.settle_pending().await;

    let outcome = coordinator.handle(LifecycleEvent::QuitRequested).await;

    assert_eq!(outcome, LifecycleOutcome::Quit);
    assert_eq!(coordinator.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn given_quit_on_last_window_when_windows_closed_then_backend_stopped() {
    let mut coordinator = coordinator(QuitPolicy::QuitOnLastWindow);
    coordinator.handle(LifecycleEvent::AppReady).await;
    coordinator.settle_pending().await;

    let outcome = coordinator.handle(LifecycleEvent::AllWindowsClosed).await;

    assert_eq!(outcome, LifecycleOutcome::Quit);
    assert_eq!(coordinator.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn given_stay_resident_when_windows_closed_then_backend_keeps_running() {
    // Given
    let mut coordinator = coordinator(QuitPolicy::StayResident);
    coordinator.handle(LifecycleEvent::AppReady).await;
    coordinator.settle_pending().await;

    // When
    let outcome = coordinator.handle(LifecycleEvent::AllWindowsClosed).await;

    // Then
    assert_eq!(outcome, LifecycleOutcome::Continue);
    assert!(matches!(coordinator.state(), ServiceState::Ready { .. }));

    // window close followed by quit stops exactly once
    coordinator.handle(LifecycleEvent::QuitRequested).await;
    coordinator.handle(LifecycleEvent::QuitRequested).await;
    assert_eq!(coordinator.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn given_running_backend_when_restart_requested_then_new_instance_published() {
    // Given
    let mut coordinator = coordinator(QuitPolicy::QuitOnLastWindow);
    coordinator.handle(LifecycleEvent::AppReady).await;
    let first = coordinator.settle_pending().await.cloned().unwrap();

    // When
    coordinator.handle(LifecycleEvent::RestartRequested).await;
    let second = coordinator.settle_pending().await.cloned().unwrap();

    // Then
    assert_ne!(first.pid, second.pid);
    assert!(matches!(coordinator.state(), ServiceState::Ready { .. }));

    coordinator.handle(LifecycleEvent::QuitRequested).await;
}

#[tokio::test]
async fn given_not_ready_app_when_restart_requested_then_ignored() {
    let mut coordinator = coordinator(QuitPolicy::QuitOnLastWindow);

    let outcome = coordinator.handle(LifecycleEvent::RestartRequested).await;

    assert_eq!(outcome, LifecycleOutcome::Continue);
    assert!(!coordinator.is_start_pending());
    assert_eq!(coordinator.state(), ServiceState::NotStarted);
}

// =========================================================================
// Event loop
// =========================================================================

#[tokio::test]
async fn given_event_loop_when_ready_then_quit_then_report_publishes_backend() {
    // Given
    let mut config = test_config(ReadinessMode::Markers);
    config.readiness.grace_period_ms = 100;
    let (supervisor, mut status) = supervisor(config, &["--banner", STUB_BANNER]);
    let coordinator = LifecycleCoordinator::new(supervisor, QuitPolicy::QuitOnLastWindow);
    let (tx, rx) = mpsc::channel(8);
    let run = tokio::spawn(coordinator.run(rx));

    // When
    tx.send(LifecycleEvent::AppReady).await.unwrap();
    let ready_event = tokio::time::timeout(WAIT, async {
        loop {
            match status.recv().await {
                Some(event) if event.base_url.is_some() => break event,
                Some(_) => continue,
                None => panic!("status channel closed before ready"),
            }
        }
    })
    .await
    .unwrap();
    tx.send(LifecycleEvent::QuitRequested).await.unwrap();
    let report = tokio::time::timeout(WAIT, run).await.unwrap().unwrap();

    // Then
    assert!(!report.start_failed());
    let published = report.published.unwrap();
    assert_eq!(ready_event.base_url, Some(published.base_url));
}

#[tokio::test]
async fn given_quit_during_startup_when_event_loop_runs_then_start_cancelled() {
    // Given
    let mut config = test_config(ReadinessMode::Markers);
    config.readiness.deadline_secs = 30;
    let (supervisor, _status) = supervisor(config, &[]);
    let coordinator = LifecycleCoordinator::new(supervisor, QuitPolicy::QuitOnLastWindow);
    let (tx, rx) = mpsc::channel(8);

    // When
    tx.send(LifecycleEvent::AppReady).await.unwrap();
    tx.send(LifecycleEvent::QuitRequested).await.unwrap();
    let report = tokio::time::timeout(WAIT, coordinator.run(rx)).await.unwrap();

    // Then
    assert!(report.published.is_none());
    assert!(matches!(report.start_error, Some(SupervisorError::Stopped { .. })));
    assert!(!report.start_failed());
}

#[tokio::test]
async fn given_missing_backend_when_event_loop_runs_then_report_marks_start_failed() {
    // Given
    let temp = tempfile::TempDir::new().unwrap();
    let config = test_config(ReadinessMode::Markers);
    let (supervisor, _status) = supervisor_for(config, missing_program(temp.path()));
    let coordinator = LifecycleCoordinator::new(supervisor, QuitPolicy::QuitOnLastWindow);
    let (tx, rx) = mpsc::channel(8);

    // When
    tx.send(LifecycleEvent::AppReady).await.unwrap();
    let run = tokio::spawn(coordinator.run(rx));
    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(tx);
    let report = tokio::time::timeout(WAIT, run).await.unwrap().unwrap();

    // Then
    assert!(report.start_failed());
    assert!(matches!(
        report.start_error,
        Some(SupervisorError::ProcessSpawn { .. })
    ));
}
