//! Event-stream client against a mock backend

use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use victus_core::{EventStreamClient, HttpRequestClient, SseMessage, StreamRequest, VictusError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn sse_body(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn delivers_events_in_order_then_ends_quietly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/s1/stream"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_body(
            "event: token\ndata: {\"delta\":\"He\"}\n\nevent: token\ndata: {\"delta\":\"llo\"}\n\nevent: done\ndata: {}\n\n",
        ))
        .mount(&server)
        .await;

    let http = HttpRequestClient::new(&server.uri()).unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let mut client = EventStreamClient::new(http, StreamRequest::get("/sessions/s1/stream"), tx);
    client.connect();

    let mut received = Vec::new();
    for _ in 0..3 {
        match timeout(WAIT, rx.recv()).await.unwrap() {
            Some(SseMessage::Event(event)) => received.push(event),
            other => panic!("unexpected message: {other:?}"),
        }
    }
    assert_eq!(received[0].event_type, "token");
    assert_eq!(received[0].data, json!({"delta": "He"}));
    assert_eq!(received[1].data, json!({"delta": "llo"}));
    assert_eq!(received[2].event_type, "done");

    // A clean end of stream produces no error message.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
    assert!(!client.is_open());
}

#[tokio::test]
async fn non_success_status_reports_stream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let http = HttpRequestClient::new(&server.uri()).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut client = EventStreamClient::new(http, StreamRequest::get("/events"), tx);
    client.connect();

    match timeout(WAIT, rx.recv()).await.unwrap() {
        Some(SseMessage::Error(VictusError::Stream(msg))) => assert_eq!(msg, "SSE error: 500"),
        other => panic!("expected stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn post_stream_attaches_csrf_header_without_refreshing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/csrf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions/s1/stream"))
        .and(header("x-csrf-token", "tok"))
        .respond_with(sse_body("event: done\ndata: {\"ok\":true}\n\n"))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpRequestClient::new(&server.uri()).unwrap();
    http.cookies().set("csrf_token=tok; Path=/");

    let (tx, mut rx) = mpsc::channel(4);
    let request = StreamRequest::post("/sessions/s1/stream", json!({"content": "hi"}));
    let mut client = EventStreamClient::new(http, request, tx);
    client.connect();

    match timeout(WAIT, rx.recv()).await.unwrap() {
        Some(SseMessage::Event(event)) => {
            assert_eq!(event.event_type, "done");
            assert_eq!(event.data, json!({"ok": true}));
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn close_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(sse_body("event: a\ndata: {}\n\n").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let http = HttpRequestClient::new(&server.uri()).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut client = EventStreamClient::new(http, StreamRequest::get("/slow"), tx);

    client.close();
    client.connect();
    assert!(client.is_open());
    client.close();
    client.close();
    assert!(!client.is_open());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reconnect_replaces_the_active_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(sse_body("event: first\ndata: {}\n\n").set_delay(Duration::from_millis(500)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(sse_body("event: second\ndata: {\"n\":2}\n\n"))
        .mount(&server)
        .await;

    let http = HttpRequestClient::new(&server.uri()).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut client = EventStreamClient::new(http, StreamRequest::get("/feed"), tx);

    client.connect();
    timeout(WAIT, async {
        while server.received_requests().await.unwrap_or_default().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    client.connect();
    match timeout(WAIT, rx.recv()).await.unwrap() {
        Some(SseMessage::Event(event)) => {
            assert_eq!(event.event_type, "second");
            assert_eq!(event.data, json!({"n": 2}));
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // The first response would have landed by now had its reader survived
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
