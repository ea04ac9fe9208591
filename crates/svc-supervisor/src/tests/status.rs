use crate::{StatusChannel, StatusEvent};

use googletest::assert_that;
use googletest::prelude::{eq, none, some};

#[test]
fn given_progress_hint_over_100_when_created_then_capped() {
    let event = StatusEvent::progress("Starting", 250);

    assert_that!(event.progress_hint, eq(100));
    assert!(!event.terminal);
}

#[test]
fn given_ready_event_when_serialized_then_base_url_present() {
    let event = StatusEvent::ready("Backend ready", "http://127.0.0.1:8000/api".into());

    let json = serde_json::to_value(&event).unwrap();

    assert!(event.terminal);
    assert_that!(json["base_url"].as_str(), some(eq("http://127.0.0.1:8000/api")));
}

#[test]
fn given_progress_event_when_serialized_then_base_url_omitted() {
    let event = StatusEvent::progress("Reserving port", 10);

    let json = serde_json::to_value(&event).unwrap();

    assert_that!(json.get("base_url"), none());
    assert_that!(json["progress_hint"].as_u64(), some(eq(10)));
}

#[tokio::test]
async fn given_emitted_events_when_received_then_order_preserved() {
    // Given
    let (channel, mut rx) = StatusChannel::new();

    // When
    channel.emit(StatusEvent::progress("one", 10));
    channel.emit(StatusEvent::progress("two", 20));
    channel.emit(StatusEvent::stopped());
    drop(channel);

    // Then
    let mut messages = Vec::new();
    while let Some(event) = rx.recv().await {
        messages.push(event.message);
    }
    assert_eq!(messages, vec!["one", "two", "Backend stopped"]);
}

#[test]
fn given_dropped_receiver_when_emitting_then_event_discarded_silently() {
    let (channel, rx) = StatusChannel::new();
    drop(rx);

    channel.emit(StatusEvent::failed("nobody listening"));
}
