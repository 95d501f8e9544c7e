//! Microphone capture engine
//!
//! Turns the raw input stream into fixed-duration PCM16 chunks. Chunks and
//! coarse levels are delivered on an unbounded channel so the capture thread
//! never blocks on a slow consumer.

use crate::audio::chunker::{AudioChunk, PcmChunker};
use crate::audio::input::{AudioInput, CpalInput, SampleSink};
use crate::audio::pcm::{coarse_level, samples_per_chunk};
use crate::types::{CaptureConfig, VoiceResult, MAX_CHUNK_MS, MIN_CHUNK_MS};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Output of the capture engine
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// A full chunk
    Chunk(AudioChunk),
    /// Input level in [0, 1], one per processed block
    Level(f32),
}

/// Capture engine over an [`AudioInput`]
pub struct AudioCaptureEngine<I: AudioInput = CpalInput> {
    input: I,
    chunk_ms: Arc<AtomicU32>,
    report_levels: bool,
    events: mpsc::UnboundedSender<CaptureEvent>,
    recording: Option<Arc<AtomicBool>>,
}

impl AudioCaptureEngine<CpalInput> {
    /// Capture from the default microphone
    pub fn new(config: CaptureConfig, events: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        Self::with_input(CpalInput::new(), config, events)
    }
}

impl<I: AudioInput> AudioCaptureEngine<I> {
    /// Capture from a custom input
    pub fn with_input(input: I, config: CaptureConfig, events: mpsc::UnboundedSender<CaptureEvent>) -> Self {
        let chunk_ms = if (MIN_CHUNK_MS..=MAX_CHUNK_MS).contains(&config.chunk_ms) {
            config.chunk_ms
        } else {
            CaptureConfig::default().chunk_ms
        };
        Self {
            input,
            chunk_ms: Arc::new(AtomicU32::new(chunk_ms)),
            report_levels: config.report_levels,
            events,
            recording: None,
        }
    }

    /// Open the device and begin emitting chunks.
    ///
    /// An active capture is torn down first. Device failures are returned
    /// and leave the engine stopped.
    pub fn start(&mut self) -> VoiceResult<()> {
        self.stop();

        let recording = Arc::new(AtomicBool::new(true));
        let sink = self.sink(recording.clone());

        match self.input.open(sink) {
            Ok(()) => {
                info!(chunk_ms = self.chunk_ms(), "Microphone capture started");
                self.recording = Some(recording);
                Ok(())
            }
            Err(e) => {
                recording.store(false, Ordering::Release);
                error!(error = %e, "Microphone capture failed to start");
                Err(e)
            }
        }
    }

    /// Halt capture and discard samples short of a full chunk. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(recording) = self.recording.take() {
            recording.store(false, Ordering::Release);
            self.input.close();
            info!("Microphone capture stopped");
        }
    }

    /// Change the chunk duration. Values outside 50..=2000 ms are ignored.
    ///
    /// Returns whether the value was accepted. Takes effect on the next
    /// draining pass; already buffered samples are kept.
    pub fn set_chunk_size(&self, chunk_ms: u32) -> bool {
        if !(MIN_CHUNK_MS..=MAX_CHUNK_MS).contains(&chunk_ms) {
            debug!(chunk_ms, "Ignoring out-of-range chunk size");
            return false;
        }
        self.chunk_ms.store(chunk_ms, Ordering::Relaxed);
        true
    }

    /// Current chunk duration in milliseconds
    pub fn chunk_ms(&self) -> u32 {
        self.chunk_ms.load(Ordering::Relaxed)
    }

    /// Whether the device is open
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn sink(&self, recording: Arc<AtomicBool>) -> SampleSink {
        let chunk_ms = self.chunk_ms.clone();
        let events = self.events.clone();
        let report_levels = self.report_levels;
        let mut chunker = PcmChunker::new();

        Box::new(move |block: &[f32]| {
            if !recording.load(Ordering::Acquire) {
                return;
            }
            if report_levels {
                let _ = events.send(CaptureEvent::Level(coarse_level(block)));
            }

            let size = samples_per_chunk(chunk_ms.load(Ordering::Relaxed));
            for chunk in chunker.push(block, size) {
                if events.send(CaptureEvent::Chunk(chunk)).is_err() {
                    return;
                }
            }
        })
    }
}

impl<I: AudioInput> Drop for AudioCaptureEngine<I> {
    fn drop(&mut self) {
        self.stop();
    }
}
