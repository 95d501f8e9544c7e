//! Event-stream client
//!
//! Consumes a long-lived streamed HTTP response framed as
//!
//! ```text
//! event: <type>
//! data: <json>
//!
//! ```
//!
//! and delivers each complete event on an mpsc channel, in arrival order.

use crate::http::HttpRequestClient;
use crate::{Result, VictusError};
use futures_util::StreamExt;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delimiter between events
const EVENT_DELIMITER: &str = "\n\n";

/// A typed event with a server-defined tag and JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent<T = Value> {
    /// Event tag from the `event:` line
    #[serde(rename = "type")]
    pub event_type: String,
    /// Decoded `data:` payload
    pub data: T,
}

impl StreamEvent<Value> {
    /// Decode the payload into a concrete type
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Result<StreamEvent<T>> {
        Ok(StreamEvent {
            event_type: self.event_type,
            data: serde_json::from_value(self.data)?,
        })
    }
}

/// Incremental parser: bytes in, complete events out.
///
/// Holds undecoded UTF-8 tails and the trailing partial segment between feeds.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    buffer: String,
}

impl SseParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(EVENT_DELIMITER) {
            let segment: String = self.buffer.drain(..end + EVENT_DELIMITER.len()).collect();
            if let Some(event) = parse_segment(&segment[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Text received but not yet terminated by a delimiter
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // incomplete multi-byte sequence: wait for the next read
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }
}

/// Parse one delimiter-free segment.
///
/// Returns `None` when the `event:` or `data:` line is missing, or when the
/// payload is not valid JSON.
pub fn parse_segment(segment: &str) -> Option<StreamEvent> {
    let mut event_type = None;
    let mut raw_data = None;

    for line in segment.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if event_type.is_none() {
            if let Some(rest) = line.strip_prefix("event: ").filter(|r| !r.is_empty()) {
                event_type = Some(rest);
                continue;
            }
        }
        if raw_data.is_none() {
            if let Some(rest) = line.strip_prefix("data: ").filter(|r| !r.is_empty()) {
                raw_data = Some(rest);
            }
        }
    }

    let (event_type, raw_data) = (event_type?, raw_data?);
    match serde_json::from_str(raw_data) {
        Ok(data) => Some(StreamEvent {
            event_type: event_type.to_string(),
            data,
        }),
        Err(e) => {
            warn!(event = event_type, error = %e, "Dropping event with malformed JSON payload");
            None
        }
    }
}

/// What the stream client delivers to its owner
#[derive(Debug)]
pub enum SseMessage {
    /// A parsed event
    Event(StreamEvent),
    /// Transport failure; the stream is finished
    Error(VictusError),
}

/// Target of a streamed request
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Path relative to the API base, or an absolute URL
    pub path: String,
    /// HTTP method (GET by default)
    pub method: Method,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl StreamRequest {
    /// A GET stream
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            body: None,
        }
    }

    /// A POST stream with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            body: Some(body),
        }
    }
}

/// Client owning at most one in-flight streamed response
pub struct EventStreamClient {
    http: HttpRequestClient,
    request: StreamRequest,
    events: mpsc::Sender<SseMessage>,
    task: Option<JoinHandle<()>>,
}

impl EventStreamClient {
    /// Create a client; nothing is sent until [`connect`](Self::connect)
    pub fn new(http: HttpRequestClient, request: StreamRequest, events: mpsc::Sender<SseMessage>) -> Self {
        Self {
            http,
            request,
            events,
            task: None,
        }
    }

    /// Open the stream, tearing down any previous one first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&mut self) {
        self.close();

        let http = self.http.clone();
        let request = self.request.clone();
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            match read_stream(&http, &request, &events).await {
                Ok(()) => debug!(path = %request.path, "Event stream ended"),
                Err(e) => {
                    warn!(path = %request.path, error = %e, "Event stream failed");
                    let _ = events.send(SseMessage::Error(e)).await;
                }
            }
        }));
    }

    /// Cancel the in-flight stream. No-op when already closed.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                info!(path = %self.request.path, "Closing event stream");
            }
            task.abort();
        }
    }

    /// Whether a stream is currently being read
    pub fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for EventStreamClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn read_stream(
    http: &HttpRequestClient,
    request: &StreamRequest,
    events: &mpsc::Sender<SseMessage>,
) -> Result<()> {
    let response = http
        .open_event_stream(&request.path, request.method.clone(), request.body.as_ref())
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(VictusError::stream(format!("SSE error: {}", status.as_u16())));
    }
    info!(path = %request.path, "Event stream connected");

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| VictusError::stream(e.to_string()))?;
        for event in parser.feed(&chunk) {
            debug!(event = %event.event_type, "Event received");
            if events.send(SseMessage::Event(event)).await.is_err() {
                debug!("Event receiver dropped; stopping stream");
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_two_events_in_one_read() {
        let mut parser = SseParser::new();
        let events = parser
            .feed(b"event: token\ndata: {\"delta\":\"hi\"}\n\nevent: done\ndata: {}\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "token");
        assert_eq!(events[0].data, json!({"delta": "hi"}));
        assert_eq!(events[1].event_type, "done");
        assert_eq!(events[1].data, json!({}));
        assert_eq!(parser.buffered(), "");
    }

    #[test]
    fn test_event_split_across_reads() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: tok").is_empty());
        assert!(parser.feed(b"en\ndata: {\"delta\":").is_empty());
        assert!(parser.feed(b"\"a\"}\n").is_empty());

        let events = parser.feed(b"\nevent: done\ndata: {}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "token");
        assert_eq!(events[0].data, json!({"delta": "a"}));
        assert_eq!(parser.buffered(), "event: done\ndata: {}");

        let events = parser.feed(b"\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "done");
    }

    #[test]
    fn test_multibyte_char_split_across_reads() {
        let mut parser = SseParser::new();
        let payload = "event: token\ndata: {\"delta\":\"é\"}\n\n".as_bytes();
        let split = payload.iter().position(|&b| b == 0xC3).unwrap() + 1;

        assert!(parser.feed(&payload[..split]).is_empty());
        let events = parser.feed(&payload[split..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, json!({"delta": "é"}));
    }

    #[test]
    fn test_malformed_segments_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed(
            b"data: {\"orphan\":true}\n\n\
              event: lonely\n\n\
              event: broken\ndata: {not json\n\n\
              event: ok\ndata: [1,2]\n\n",
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "ok");
        assert_eq!(events[0].data, json!([1, 2]));
    }

    #[test]
    fn test_decode_payload() {
        #[derive(Deserialize)]
        struct Delta {
            delta: String,
        }
        let event = parse_segment("event: token\ndata: {\"delta\":\"hi\"}").unwrap();
        let typed: StreamEvent<Delta> = event.decode().unwrap();
        assert_eq!(typed.data.delta, "hi");
    }
}
