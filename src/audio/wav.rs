use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use tracing::info;

/// Encode raw i16 PCM samples as an in-memory WAV file
///
/// This is the minimal fixed-header container the pronunciation-scoring
/// call expects for submitted utterances.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)
        .context("Failed to create WAV writer")?;

    for &sample in samples {
        writer.write_sample(sample)
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize()
        .context("Failed to finalize WAV")?;

    Ok(cursor.into_inner())
}

/// A WAV payload decoded back to raw samples
#[derive(Debug, Clone)]
pub struct DecodedWav {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedWav {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Decode an in-memory WAV payload to raw i16 PCM samples
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedWav> {
    let reader = WavReader::new(Cursor::new(bytes))
        .context("Failed to parse WAV payload")?;

    let spec = reader.spec();
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read WAV samples")?;

    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// A WAV file loaded from disk (file-based capture backend, fixtures)
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_wav() {
        let samples = vec![0i16, 100, -100, 32000, -32000];
        let wav = encode_wav(&samples, 16000, 1).unwrap();

        let decoded = decode_wav(&wav).unwrap();
        assert_eq!(decoded.samples, samples);
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.channels, 1);
    }

    #[test]
    fn test_encode_empty_payload() {
        let wav = encode_wav(&[], 16000, 1).unwrap();
        let decoded = decode_wav(&wav).unwrap();
        assert!(decoded.samples.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(&[0u8, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_decoded_duration() {
        let wav = encode_wav(&vec![0i16; 8000], 16000, 1).unwrap();
        let decoded = decode_wav(&wav).unwrap();
        assert!((decoded.duration_seconds() - 0.5).abs() < 0.001);
    }
}
