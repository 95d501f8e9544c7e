//! Microphone input devices

use crate::audio::resampler::BlockResampler;
use crate::types::{VoiceError, VoiceResult, SAMPLE_RATE};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

/// Receiver of 16 kHz mono float blocks, called from the capture thread
pub type SampleSink = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Source of 16 kHz mono audio
pub trait AudioInput: Send {
    /// Acquire the device and start calling `sink`.
    ///
    /// Permission and availability failures are returned here, not later.
    fn open(&mut self, sink: SampleSink) -> VoiceResult<()>;

    /// Release the device. The sink is dropped and never called again.
    fn close(&mut self);
}

struct CaptureWorker {
    stop: mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// Default system microphone via cpal.
///
/// cpal streams are not `Send`, so each open spawns a capture thread that
/// builds, plays and finally drops the stream.
#[derive(Default)]
pub struct CpalInput {
    worker: Option<CaptureWorker>,
}

impl CpalInput {
    /// Create a closed input
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioInput for CpalInput {
    fn open(&mut self, sink: SampleSink) -> VoiceResult<()> {
        self.close();

        let (ready_tx, ready_rx) = mpsc::sync_channel::<VoiceResult<()>>(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("victus-capture".to_string())
            .spawn(move || match open_default_stream(sink) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // Returns on stop or when the owner is dropped.
                    let _ = stop_rx.recv();
                    drop(stream);
                    debug!("Capture stream released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| VoiceError::Device(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker {
                    stop: stop_tx,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(VoiceError::Device(
                    "Capture thread exited before the device opened".to_string(),
                ))
            }
        }
    }

    fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.thread.join().is_err() {
                warn!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}

/// Downmix interleaved frames to mono, then resample to the capture rate
struct MonoPipeline {
    channels: usize,
    mono: Vec<f32>,
    resampler: BlockResampler,
    sink: SampleSink,
}

impl MonoPipeline {
    fn new(channels: usize, in_hz: u32, sink: SampleSink) -> VoiceResult<Self> {
        if channels == 0 {
            return Err(VoiceError::Device("Input device reports no channels".to_string()));
        }
        Ok(Self {
            channels,
            mono: Vec::new(),
            resampler: BlockResampler::new(in_hz, SAMPLE_RATE)?,
            sink,
        })
    }

    fn push(&mut self, interleaved: impl Iterator<Item = f32>) {
        self.mono.clear();
        let mut acc = 0.0;
        let mut filled = 0;
        for sample in interleaved {
            acc += sample;
            filled += 1;
            if filled == self.channels {
                self.mono.push(acc / self.channels as f32);
                acc = 0.0;
                filled = 0;
            }
        }

        let sink = &mut self.sink;
        self.resampler.push(&self.mono, |block| sink(block));
    }
}

fn open_default_stream(sink: SampleSink) -> VoiceResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| VoiceError::Device("No input device available".to_string()))?;
    let supported = device
        .default_input_config()
        .map_err(|e| VoiceError::Device(format!("Failed to query input config: {}", e)))?;

    let channels = supported.channels() as usize;
    let in_hz = supported.sample_rate().0;
    let stream_config: cpal::StreamConfig = supported.config();
    let mut pipeline = MonoPipeline::new(channels, in_hz, sink)?;

    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        sample_rate = in_hz,
        channels,
        format = ?supported.sample_format(),
        "Opening microphone"
    );

    let err_fn = |err: cpal::StreamError| warn!(error = %err, "Audio input stream error");

    macro_rules! build_stream {
        ($sample:ty, $convert:expr) => {{
            let convert = $convert;
            device.build_input_stream(
                &stream_config,
                move |data: &[$sample], _: &cpal::InputCallbackInfo| {
                    pipeline.push(data.iter().copied().map(convert))
                },
                err_fn,
                None,
            )
        }};
    }

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream!(f32, |s: f32| s),
        cpal::SampleFormat::I16 => build_stream!(i16, |s: i16| s as f32 / 32768.0),
        cpal::SampleFormat::U16 => build_stream!(u16, |s: u16| (s as f32 - 32768.0) / 32768.0),
        other => {
            return Err(VoiceError::Device(format!(
                "Unsupported sample format '{:?}'",
                other
            )))
        }
    }
    .map_err(|e| VoiceError::Device(format!("Failed to build input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| VoiceError::Device(format!("Failed to start input stream: {}", e)))?;

    Ok(stream)
}
