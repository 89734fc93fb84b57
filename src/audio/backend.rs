use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::frame::AudioFrame;
use super::wav::AudioFile;

/// Configuration for audio capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate the live session expects (Hz)
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for the speech endpoint
            channels: 1,        // Mono
            frame_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Push: frames arrive from outside (the UI captures the microphone and
///   posts frames through the control API)
/// - File: frames replayed from a WAV file (tests, offline runs)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture backend fed by externally pushed frames
///
/// The microphone lives on the UI side of the control API; this backend is
/// the receiving end. `sender()` hands out the producer side after `start()`.
pub struct PushBackend {
    config: CaptureConfig,
    tx: Option<mpsc::Sender<AudioFrame>>,
    capturing: bool,
}

impl PushBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            tx: None,
            capturing: false,
        }
    }

    /// Producer handle for pushing frames, available while capturing
    pub fn sender(&self) -> Option<mpsc::Sender<AudioFrame>> {
        self.tx.clone()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl AudioBackend for PushBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(64);
        self.tx = Some(tx);
        self.capturing = true;

        info!(
            "Push capture started: {}Hz, {} channels",
            self.config.sample_rate, self.config.channels
        );

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // Dropping the sender closes the channel and drains the consumer
        self.tx = None;
        self.capturing = false;
        info!("Push capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "push"
    }
}

/// Capture backend that replays a WAV file as a frame stream
pub struct FileBackend {
    config: CaptureConfig,
    path: PathBuf,
    task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            config,
            path: path.into(),
            task: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let audio = AudioFile::open(&self.path)
            .with_context(|| format!("Failed to open capture file: {:?}", self.path))?;

        let frame_duration_ms = self.config.frame_duration_ms.max(1);
        let samples_per_frame = ((audio.sample_rate as u64 * frame_duration_ms / 1000)
            * audio.channels as u64) as usize;

        let (tx, rx) = mpsc::channel(64);

        // Frames are delivered as fast as the consumer reads; file replay
        // does not pace itself against the wall clock.
        let task = tokio::spawn(async move {
            let mut timestamp_ms = 0u64;

            for chunk in audio.samples.chunks(samples_per_frame.max(1)) {
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms,
                };
                timestamp_ms += frame_duration_ms;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        self.capturing = true;

        info!("File capture started: {:?}", self.path);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.capturing = false;
        info!("File capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
