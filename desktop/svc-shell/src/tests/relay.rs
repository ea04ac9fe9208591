use crate::relay::{render_status, track_state};

use svc_supervisor::{LOCK_FILENAME, LockFile, ServiceState, StatusEvent};

use tokio::sync::watch;

#[test]
fn test_render_progress_plain() {
    let event = StatusEvent::progress("Reserving port", 10);

    assert_eq!(render_status(&event, false), "[ 10%] Reserving port");
}

#[test]
fn test_render_ready_plain_includes_url() {
    let event = StatusEvent::ready("Backend ready", "http://127.0.0.1:8000/api".into());

    assert_eq!(
        render_status(&event, false),
        "[100%] Backend ready (http://127.0.0.1:8000/api)"
    );
}

#[test]
fn test_render_json_is_single_line_object() {
    let event = StatusEvent::ready("Backend ready", "http://127.0.0.1:8000/api".into());

    let line = render_status(&event, true);
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert!(!line.contains('\n'));
    assert_eq!(value["message"], "Backend ready");
    assert_eq!(value["terminal"], true);
    assert_eq!(value["base_url"], "http://127.0.0.1:8000/api");
}

#[tokio::test]
async fn test_track_state_records_ready_backend_then_releases_lock() {
    let temp = tempfile::TempDir::new().unwrap();
    let lock = LockFile::acquire(temp.path()).unwrap();
    let lock_path = temp.path().join(LOCK_FILENAME);
    let (tx, rx) = watch::channel(ServiceState::NotStarted);
    let tracker = tokio::spawn(track_state(rx, lock));

    tx.send_replace(ServiceState::Ready {
        port: 8123,
        pid: Some(4242),
    });
    // let the tracker observe the change before the sender goes away
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let info = LockFile::read(&lock_path).unwrap();
    drop(tx);
    tracker.await.unwrap();

    assert_eq!(info.port, Some(8123));
    assert_eq!(info.backend_pid, Some(4242));
    assert!(!lock_path.exists());
}
