//! Realtime voice socket
//!
//! A persistent JSON-over-WebSocket connection to the voice endpoint. One
//! driver task owns the socket: it reports state transitions and decoded
//! server messages on the event channel, writes queued commands, and
//! reconnects with exponential backoff after unexpected closes.
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use victus_provider_voice::{VoiceSocketClient, VoiceSocketConfig};
//!
//! # async fn run() {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let mut socket = VoiceSocketClient::new(VoiceSocketConfig::default(), tx);
//! socket.connect().await;
//! while let Some(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

use crate::engines::reconnect::ReconnectPolicy;
use crate::types::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Message reported for any transport-level failure
pub const CONNECTION_ERROR: &str = "Connection error";

/// Message reported once the reconnect budget is spent
pub const MAX_RECONNECT_ERROR: &str = "Max reconnection attempts reached";

/// Message reported when the endpoint cannot be used at all
pub const INVALID_ENDPOINT_ERROR: &str = "Failed to create WebSocket connection";

/// State shared between the client and its driver task
struct Shared {
    config: VoiceSocketConfig,
    events: mpsc::UnboundedSender<VoiceEvent>,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<mpsc::UnboundedReceiver<ClientCommand>>,
    should_reconnect: AtomicBool,
}

impl Shared {
    fn transition(&self, state: ConnectionState) {
        debug!(state = %state, "Voice socket state");
        self.state.send_replace(state);
        self.emit(VoiceEvent::StateChanged(state));
    }

    fn emit(&self, event: VoiceEvent) {
        if self.events.send(event).is_err() {
            debug!("Voice event receiver dropped");
        }
    }

    fn fail(&self, message: &str) {
        self.emit(VoiceEvent::Error {
            message: message.to_string(),
        });
    }

    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(ServerEvent::TranscriptFinal { text, confidence }) => {
                debug!(text = %text, "Final transcript");
                self.emit(VoiceEvent::TranscriptFinal { text, confidence });
            }
            Ok(ServerEvent::AssistantResponse { text }) => {
                self.emit(VoiceEvent::AssistantResponse { text });
            }
            Ok(ServerEvent::Error { message }) => {
                warn!(error = %message, "Voice server error");
                self.emit(VoiceEvent::Error { message });
            }
            Ok(ServerEvent::Other) => {}
            Err(e) => {
                warn!(error = %e, "Failed to parse voice message");
            }
        }
    }
}

/// Cheap, cloneable sender for outbound commands.
///
/// Commands are fire-and-forget: each method returns whether the command was
/// queued, and silently drops it when the socket is not connected.
#[derive(Clone)]
pub struct VoiceCommands {
    outbound: mpsc::UnboundedSender<ClientCommand>,
    state: watch::Receiver<ConnectionState>,
    wake_word: String,
}

impl VoiceCommands {
    /// Start listening for `session_id`
    pub fn wake(&self, session_id: &str) -> bool {
        self.send(ClientCommand::Wake {
            session_id: session_id.to_string(),
            wake_word: self.wake_word.clone(),
        })
    }

    /// Send one base64 PCM16 chunk
    pub fn send_audio_chunk(&self, chunk_base64: String) -> bool {
        self.send(ClientCommand::Audio {
            data: chunk_base64,
        })
    }

    /// Mark the end of the current utterance
    pub fn end_of_utterance(&self) -> bool {
        self.send(ClientCommand::Eou)
    }

    /// Abort the current utterance or response
    pub fn cancel(&self) -> bool {
        self.send(ClientCommand::Cancel)
    }

    /// Push a configuration update
    pub fn update_config(&self, config: Value) -> bool {
        self.send(ClientCommand::Config { config })
    }

    fn send(&self, command: ClientCommand) -> bool {
        if *self.state.borrow() != ConnectionState::Connected {
            debug!(?command, "Voice socket not connected; dropping command");
            return false;
        }
        self.outbound.send(command).is_ok()
    }
}

struct Driver {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Persistent voice socket with automatic reconnection
pub struct VoiceSocketClient {
    shared: Arc<Shared>,
    commands: VoiceCommands,
    driver: Option<Driver>,
}

impl VoiceSocketClient {
    /// Create a disconnected client reporting on `events`
    pub fn new(config: VoiceSocketConfig, events: mpsc::UnboundedSender<VoiceEvent>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let commands = VoiceCommands {
            outbound: outbound_tx,
            state: state_rx,
            wake_word: config.wake_word.clone(),
        };
        let shared = Arc::new(Shared {
            config,
            events,
            state: state_tx,
            outbound: Mutex::new(outbound_rx),
            should_reconnect: AtomicBool::new(true),
        });

        Self {
            shared,
            commands,
            driver: None,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Command sender usable from other tasks
    pub fn commands(&self) -> VoiceCommands {
        self.commands.clone()
    }

    /// Open the socket, replacing any existing connection or pending reconnect.
    ///
    /// Failures are reported on the event channel, never returned.
    pub async fn connect(&mut self) {
        self.teardown().await;
        self.shared.should_reconnect.store(true, Ordering::SeqCst);
        self.shared.transition(ConnectionState::Connecting);

        if let Err(reason) = validate_endpoint(&self.shared.config.url) {
            error!(url = %self.shared.config.url, %reason, "Invalid voice endpoint");
            self.shared.fail(INVALID_ENDPOINT_ERROR);
            self.shared.transition(ConnectionState::Error);
            return;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(drive(self.shared.clone(), shutdown_rx));
        self.driver = Some(Driver {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Close the socket and stop reconnecting. No-op when already disconnected.
    pub async fn disconnect(&mut self) {
        self.shared.should_reconnect.store(false, Ordering::SeqCst);
        if self.teardown().await {
            info!(url = %self.shared.config.url, "Voice socket disconnected");
            self.shared.transition(ConnectionState::Disconnected);
        }
    }

    /// Start listening for `session_id`
    pub fn wake(&self, session_id: &str) -> bool {
        self.commands.wake(session_id)
    }

    /// Send one base64 PCM16 chunk
    pub fn send_audio_chunk(&self, chunk_base64: String) -> bool {
        self.commands.send_audio_chunk(chunk_base64)
    }

    /// Mark the end of the current utterance
    pub fn end_of_utterance(&self) -> bool {
        self.commands.end_of_utterance()
    }

    /// Abort the current utterance or response
    pub fn cancel(&self) -> bool {
        self.commands.cancel()
    }

    /// Push a configuration update
    pub fn update_config(&self, config: Value) -> bool {
        self.commands.update_config(config)
    }

    /// Stop the driver without reporting anything. Returns whether one was running.
    async fn teardown(&mut self) -> bool {
        let Some(driver) = self.driver.take() else {
            return false;
        };
        let _ = driver.shutdown.send(());
        if let Err(e) = driver.task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Voice socket driver panicked");
            }
        }
        true
    }
}

impl Drop for VoiceSocketClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.task.abort();
        }
    }
}

fn validate_endpoint(raw: &str) -> std::result::Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

enum SessionEnd {
    Shutdown,
    Closed,
    Failed(String),
}

async fn drive(shared: Arc<Shared>, mut shutdown: oneshot::Receiver<()>) {
    let mut outbound = shared.outbound.lock().await;
    let mut policy = ReconnectPolicy::new(
        shared.config.max_attempts,
        shared.config.base_delay,
        shared.config.max_delay,
    );
    let url = shared.config.url.clone();

    loop {
        let attempt = tokio::select! {
            _ = &mut shutdown => return,
            result = connect_async(url.as_str()) => result,
        };

        match attempt {
            Ok((stream, _)) => {
                info!(url = %url, "Voice socket connected");
                policy.reset();
                shared.transition(ConnectionState::Connected);

                match run_session(&shared, stream, &mut outbound, &mut shutdown).await {
                    SessionEnd::Shutdown => return,
                    SessionEnd::Closed => info!(url = %url, "Voice socket closed"),
                    SessionEnd::Failed(e) => {
                        warn!(url = %url, error = %e, "Voice socket failed");
                        shared.fail(CONNECTION_ERROR);
                    }
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Voice socket connection failed");
                shared.fail(CONNECTION_ERROR);
            }
        }

        shared.transition(ConnectionState::Disconnected);
        while outbound.try_recv().is_ok() {}

        if !shared.should_reconnect.load(Ordering::SeqCst) {
            return;
        }

        let Some(delay) = policy.next_delay() else {
            error!(url = %url, attempts = policy.attempt(), "Giving up on voice socket");
            shared.fail(MAX_RECONNECT_ERROR);
            shared.transition(ConnectionState::Error);
            return;
        };

        debug!(
            attempt = policy.attempt(),
            delay_ms = policy.current_delay().as_millis() as u64,
            "Scheduling voice reconnect"
        );
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(delay) => {}
        }
        shared.transition(ConnectionState::Connecting);
    }
}

async fn run_session(
    shared: &Shared,
    stream: WsStream,
    outbound: &mut mpsc::UnboundedReceiver<ClientCommand>,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed,
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Failed(e.to_string()),
            },
            command = outbound.recv() => {
                let Some(command) = command else {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                };
                let json = match serde_json::to_string(&command) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode voice command");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json)).await {
                    return SessionEnd::Failed(e.to_string());
                }
            }
        }
    }
}
