//! Voice session: microphone capture wired to the voice socket

use crate::audio::{AudioCaptureEngine, AudioInput, CaptureEvent, CpalInput};
use crate::engines::{VoiceCommands, VoiceSocketClient};
use crate::types::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use victus_core::api::VoiceSettings;

/// Owns one socket and one capture engine.
///
/// Socket events are forwarded unchanged to the caller; chunks go to the
/// socket in capture order and levels go to a separate channel.
pub struct VoiceSession<I: AudioInput = CpalInput> {
    socket: VoiceSocketClient,
    capture: AudioCaptureEngine<I>,
    auto_eou: Arc<AtomicBool>,
    relay: JoinHandle<()>,
    forward: JoinHandle<()>,
}

impl VoiceSession<CpalInput> {
    /// Session over the default microphone. Must be called within a tokio runtime.
    pub fn new(
        socket_config: VoiceSocketConfig,
        capture_config: CaptureConfig,
        events: mpsc::UnboundedSender<VoiceEvent>,
        levels: mpsc::UnboundedSender<f32>,
    ) -> Self {
        Self::with_input(CpalInput::new(), socket_config, capture_config, events, levels)
    }
}

impl<I: AudioInput> VoiceSession<I> {
    /// Session over a custom input. Must be called within a tokio runtime.
    pub fn with_input(
        input: I,
        socket_config: VoiceSocketConfig,
        capture_config: CaptureConfig,
        events: mpsc::UnboundedSender<VoiceEvent>,
        levels: mpsc::UnboundedSender<f32>,
    ) -> Self {
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let socket = VoiceSocketClient::new(socket_config, socket_tx);

        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let capture = AudioCaptureEngine::with_input(input, capture_config, capture_tx);

        let auto_eou = Arc::new(AtomicBool::new(VoiceSettings::default().auto_end_of_utterance));
        let relay = tokio::spawn(relay_socket_events(
            socket_rx,
            events,
            socket.commands(),
            auto_eou.clone(),
        ));
        let forward = tokio::spawn(forward_capture(capture_rx, levels, socket.commands()));

        Self {
            socket,
            capture,
            auto_eou,
            relay,
            forward,
        }
    }

    /// Begin listening for `session_id`.
    ///
    /// Connects the socket first when needed and waits for it to open. A
    /// device error is returned and leaves the microphone off.
    pub async fn start(&mut self, session_id: &str) -> VoiceResult<()> {
        if matches!(
            self.socket.state(),
            ConnectionState::Disconnected | ConnectionState::Error
        ) {
            self.socket.connect().await;
        }

        let mut state = self.socket.watch_state();
        let reached = state
            .wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Error))
            .await
            .map(|s| *s)
            .map_err(|_| VoiceError::NotConnected)?;
        if reached != ConnectionState::Connected {
            return Err(VoiceError::NotConnected);
        }

        self.capture.start()?;
        self.socket.wake(session_id);
        info!(session_id, "Voice session listening");
        Ok(())
    }

    /// Stop the microphone; the socket stays open. No-op when not listening.
    pub fn stop(&mut self) {
        self.capture.stop();
    }

    /// Push voice settings to the server and the capture engine
    pub fn apply_settings(&self, settings: &VoiceSettings) {
        match serde_json::to_value(settings) {
            Ok(config) => {
                self.socket.update_config(config);
            }
            Err(e) => warn!(error = %e, "Failed to encode voice settings"),
        }
        self.capture.set_chunk_size(settings.chunk_ms);
        self.auto_eou
            .store(settings.auto_end_of_utterance, Ordering::Relaxed);
    }

    /// Stop the microphone and close the socket
    pub async fn shutdown(&mut self) {
        self.capture.stop();
        self.socket.disconnect().await;
    }

    /// Socket state
    pub fn state(&self) -> ConnectionState {
        self.socket.state()
    }

    /// Whether the microphone is open
    pub fn is_listening(&self) -> bool {
        self.capture.is_recording()
    }

    /// Command sender for manual `eou`/`cancel`
    pub fn commands(&self) -> VoiceCommands {
        self.socket.commands()
    }
}

impl<I: AudioInput> Drop for VoiceSession<I> {
    fn drop(&mut self) {
        self.relay.abort();
        self.forward.abort();
    }
}

async fn relay_socket_events(
    mut socket_rx: mpsc::UnboundedReceiver<VoiceEvent>,
    events: mpsc::UnboundedSender<VoiceEvent>,
    commands: VoiceCommands,
    auto_eou: Arc<AtomicBool>,
) {
    while let Some(event) = socket_rx.recv().await {
        if matches!(event, VoiceEvent::TranscriptFinal { .. }) && auto_eou.load(Ordering::Relaxed) {
            commands.end_of_utterance();
        }
        if events.send(event).is_err() {
            debug!("Voice session event receiver dropped");
        }
    }
}

async fn forward_capture(
    mut capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    levels: mpsc::UnboundedSender<f32>,
    commands: VoiceCommands,
) {
    while let Some(event) = capture_rx.recv().await {
        match event {
            CaptureEvent::Chunk(chunk) => {
                commands.send_audio_chunk(chunk.encoded);
            }
            CaptureEvent::Level(level) => {
                let _ = levels.send(level);
            }
        }
    }
}
