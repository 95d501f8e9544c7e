//! Voice session wiring: capture to socket, auto end-of-utterance

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use victus_core::api::VoiceSettings;
use victus_provider_voice::audio::{encode_pcm16, float_to_pcm16};
use victus_provider_voice::{
    CaptureConfig, ConnectionState, VoiceError, VoiceEvent, VoiceSession, VoiceSocketConfig,
};

fn capture_config() -> CaptureConfig {
    CaptureConfig {
        chunk_ms: 50,
        report_levels: true,
    }
}

async fn wait_for_transcript(rx: &mut mpsc::UnboundedReceiver<VoiceEvent>) {
    loop {
        if let VoiceEvent::TranscriptFinal { .. } = next_event(rx).await {
            return;
        }
    }
}

#[tokio::test]
async fn start_wakes_streams_audio_and_ends_utterances() {
    let (url, mut conns) = spawn_voice_server().await;
    let input = ScriptedInput::new();
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (level_tx, mut levels) = mpsc::unbounded_channel();

    let socket_config = VoiceSocketConfig {
        url,
        ..Default::default()
    };
    let mut session = VoiceSession::with_input(
        input.clone(),
        socket_config,
        capture_config(),
        event_tx,
        level_tx,
    );

    session.start("s1").await.unwrap();
    assert!(session.is_listening());
    assert_eq!(session.state(), ConnectionState::Connected);

    let mut server = next_connection(&mut conns).await;
    assert_eq!(
        next_json(&mut server).await,
        json!({"type": "wake", "session_id": "s1", "wake_word": "hey_victus"})
    );

    input.feed(&[0.25; 800]);
    let expected: Vec<i16> = vec![float_to_pcm16(0.25); 800];
    assert_eq!(
        next_json(&mut server).await,
        json!({"type": "audio", "data": encode_pcm16(&expected)})
    );
    let level = timeout(WAIT, levels.recv()).await.unwrap().unwrap();
    assert!(level > 0.0);

    send_json(&mut server, json!({"type": "transcript_final", "text": "open the pod bay doors"})).await;
    wait_for_transcript(&mut events).await;
    assert_eq!(next_json(&mut server).await, json!({"type": "eou"}));

    session.shutdown().await;
    assert!(!session.is_listening());
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn apply_settings_forwards_config_and_can_disable_auto_eou() {
    let (url, mut conns) = spawn_voice_server().await;
    let input = ScriptedInput::new();
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (level_tx, _levels) = mpsc::unbounded_channel();

    let mut session = VoiceSession::with_input(
        input.clone(),
        VoiceSocketConfig {
            url,
            ..Default::default()
        },
        capture_config(),
        event_tx,
        level_tx,
    );
    session.start("s1").await.unwrap();
    let mut server = next_connection(&mut conns).await;
    next_json(&mut server).await;

    let settings = VoiceSettings {
        auto_end_of_utterance: false,
        chunk_ms: 100,
        ..Default::default()
    };
    session.apply_settings(&settings);

    let config = next_json(&mut server).await;
    assert_eq!(config["type"], "config");
    assert_eq!(config["config"]["chunk_ms"], 100);
    assert_eq!(config["config"]["auto_end_of_utterance"], false);

    // 100 ms at 16 kHz
    input.feed(&[0.1; 1600]);
    let audio = next_json(&mut server).await;
    assert_eq!(audio["type"], "audio");

    send_json(&mut server, json!({"type": "transcript_final", "text": "hello"})).await;
    wait_for_transcript(&mut events).await;

    session.commands().cancel();
    assert_eq!(next_json(&mut server).await, json!({"type": "cancel"}));

    session.shutdown().await;
}

#[tokio::test]
async fn device_error_leaves_microphone_off_and_socket_open() {
    let (url, mut conns) = spawn_voice_server().await;
    let (event_tx, _events) = mpsc::unbounded_channel();
    let (level_tx, _levels) = mpsc::unbounded_channel();

    let mut session = VoiceSession::with_input(
        ScriptedInput::failing("Permission denied"),
        VoiceSocketConfig {
            url,
            ..Default::default()
        },
        capture_config(),
        event_tx,
        level_tx,
    );

    let err = session.start("s1").await.unwrap_err();
    assert!(matches!(err, VoiceError::Device(_)));
    assert!(!session.is_listening());

    let _server = next_connection(&mut conns).await;
    assert_eq!(session.state(), ConnectionState::Connected);

    session.stop();
    session.shutdown().await;
}

#[tokio::test]
async fn start_fails_when_socket_cannot_connect() {
    let (event_tx, _events) = mpsc::unbounded_channel();
    let (level_tx, _levels) = mpsc::unbounded_channel();

    let mut session = VoiceSession::with_input(
        ScriptedInput::new(),
        VoiceSocketConfig {
            url: unreachable_url(),
            max_attempts: 0,
            base_delay: Duration::from_millis(10),
            ..Default::default()
        },
        capture_config(),
        event_tx,
        level_tx,
    );

    let err = timeout(WAIT, session.start("s1")).await.unwrap().unwrap_err();
    assert!(matches!(err, VoiceError::NotConnected));
    assert!(!session.is_listening());
    assert_eq!(session.state(), ConnectionState::Error);
}
