//! Shared fixtures: a loopback voice server and a scripted microphone
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use victus_provider_voice::{AudioInput, SampleSink, VoiceError, VoiceEvent, VoiceResult};

pub const WAIT: Duration = Duration::from_secs(5);

pub type ServerSocket = WebSocketStream<TcpStream>;

/// Accepts every connection and hands the server side to the test
pub async fn spawn_voice_server() -> (String, mpsc::UnboundedReceiver<ServerSocket>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(tcp).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    (format!("ws://{}/ws/voice", addr), rx)
}

/// URL of a port nothing listens on
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws/voice", addr)
}

pub async fn next_connection(conns: &mut mpsc::UnboundedReceiver<ServerSocket>) -> ServerSocket {
    timeout(WAIT, conns.recv())
        .await
        .expect("no connection within timeout")
        .expect("server stopped")
}

/// Next text frame from the client, decoded as JSON
pub async fn next_json(ws: &mut ServerSocket) -> Value {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("no frame within timeout")
            .expect("client went away")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

pub async fn send_json(ws: &mut ServerSocket, value: Value) {
    send_text(ws, &value.to_string()).await;
}

pub async fn send_text(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<VoiceEvent>) -> VoiceEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("no event within timeout")
        .expect("event channel closed")
}

/// In-memory microphone driven by the test
#[derive(Clone, Default)]
pub struct ScriptedInput {
    sink: Arc<Mutex<Option<SampleSink>>>,
    fail_with: Option<String>,
    opens: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Deliver one native block. Returns false when the device is closed.
    pub fn feed(&self, samples: &[f32]) -> bool {
        match self.sink.lock().unwrap().as_mut() {
            Some(sink) => {
                sink(samples);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl AudioInput for ScriptedInput {
    fn open(&mut self, sink: SampleSink) -> VoiceResult<()> {
        if let Some(message) = &self.fail_with {
            return Err(VoiceError::Device(message.clone()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn close(&mut self) {
        self.sink.lock().unwrap().take();
    }
}
