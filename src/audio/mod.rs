pub mod backend;
pub mod capture;
pub mod frame;
pub mod playback;
pub mod wav;

pub use backend::{AudioBackend, CaptureConfig, FileBackend, PushBackend};
pub use capture::{RecordedUtterance, UtteranceRecorder};
pub use frame::{le_bytes_to_samples, samples_to_le_bytes, AudioFrame};
pub use playback::{PlaybackConfig, PlaybackScheduler, ScheduledFragment};
pub use wav::{decode_wav, encode_wav, AudioFile, DecodedWav};
