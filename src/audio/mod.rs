//! Audio devices and signal processing for the spoken adapters
//!
//! Only built with the `audio-io` feature. cpal streams are not `Send`, so
//! every device handle here is opened, used and dropped on one thread.

pub mod capture;
pub mod playback;
pub mod resampler;
pub mod vad;

pub use capture::AudioInput;
pub use playback::AudioOutput;
pub use resampler::{resample, StreamResampler};
pub use vad::{Endpoint, Endpointer, SpeechDetector};

/// Sample rate expected by Whisper and the voice activity detector
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;
