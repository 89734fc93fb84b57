// Utterance recorder for the learner's current recording
//
// While a recording is active, every captured frame lands here in addition
// to being shipped to the live session. On stop, the accumulated samples
// become one WAV payload attached to the learner's turn and submitted for
// pronunciation scoring.

use anyhow::Result;
use tracing::{info, warn};

use super::backend::CaptureConfig;
use super::frame::AudioFrame;
use super::wav::encode_wav;

/// Accumulates captured frames into a single utterance payload
pub struct UtteranceRecorder {
    config: CaptureConfig,
    samples: Vec<i16>,
    frames: usize,
}

/// One finished recording: the encoded payload plus its raw dimensions
#[derive(Debug, Clone)]
pub struct RecordedUtterance {
    /// WAV-encoded payload for storage and pronunciation scoring
    pub wav: Vec<u8>,
    /// Total sample count across all captured frames
    pub sample_count: usize,
    /// Number of frames captured
    pub frame_count: usize,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl UtteranceRecorder {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            frames: 0,
        }
    }

    /// Append one captured frame to the accumulation buffer
    ///
    /// Frames whose format disagrees with the capture config are dropped,
    /// matching what the live session would reject on its side.
    pub fn push_frame(&mut self, frame: &AudioFrame) {
        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return;
        }

        if frame.channels != self.config.channels {
            warn!(
                "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.config.channels, frame.channels
            );
            return;
        }

        self.samples.extend_from_slice(&frame.samples);
        self.frames += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Concatenate the buffer into one encoded payload and discard it
    pub fn finish(self) -> Result<RecordedUtterance> {
        let sample_count = self.samples.len();
        let duration_secs = sample_count as f64
            / (self.config.sample_rate as f64 * self.config.channels as f64);

        let wav = encode_wav(&self.samples, self.config.sample_rate, self.config.channels)?;

        info!(
            "Utterance finished: {} frames, {} samples, {:.2}s",
            self.frames, sample_count, duration_secs
        );

        Ok(RecordedUtterance {
            wav,
            sample_count,
            frame_count: self.frames,
            duration_secs,
        })
    }
}
