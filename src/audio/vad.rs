//! Voice activity detection and end-of-answer detection
//!
//! [`SpeechDetector`] classifies 16 kHz audio in 32 ms frames with the Silero
//! model; [`Endpointer`] turns that frame stream into "still talking",
//! "done talking" or "never started".

use crate::{CoachError, Result};
use voice_activity_detector::VoiceActivityDetector as VadDetector;

/// Samples per VAD frame at 16 kHz
const FRAME_SAMPLES: usize = 512;

/// Length of one VAD frame
pub const FRAME_MS: u64 = 32;

pub struct SpeechDetector {
    detector: VadDetector,
    threshold: f32,
    pending: Vec<f32>,
}

impl SpeechDetector {
    pub fn new(threshold: f32) -> Result<Self> {
        let detector = VadDetector::builder()
            .sample_rate(16000i32)
            .chunk_size(FRAME_SAMPLES)
            .build()
            .map_err(|e| CoachError::ConfigError(format!("failed to create VAD: {:?}", e)))?;

        Ok(Self {
            detector,
            threshold: threshold.clamp(0.0, 1.0),
            pending: Vec::with_capacity(FRAME_SAMPLES),
        })
    }

    /// Classify 16 kHz samples; one verdict per completed frame
    pub fn push(&mut self, samples: &[f32]) -> Vec<bool> {
        self.pending.extend_from_slice(samples);
        let mut verdicts = Vec::new();
        while self.pending.len() >= FRAME_SAMPLES {
            let frame: Vec<f32> = self.pending.drain(..FRAME_SAMPLES).collect();
            let probability = self.detector.predict(frame.iter().copied());
            verdicts.push(probability >= self.threshold);
        }
        verdicts
    }

    pub fn reset(&mut self) {
        self.detector.reset();
        self.pending.clear();
    }
}

/// Decision after one VAD frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Listening,
    /// Speech was heard and has been followed by enough silence
    SpeechEnded,
    /// Nothing was said before the timeout
    NoSpeech,
}

#[derive(Debug, Clone)]
pub struct Endpointer {
    end_silence_ms: u64,
    no_speech_ms: u64,
    heard_speech: bool,
    silence_ms: u64,
    waited_ms: u64,
}

impl Endpointer {
    pub fn new(end_silence_ms: u64, no_speech_ms: u64) -> Self {
        Self {
            end_silence_ms,
            no_speech_ms,
            heard_speech: false,
            silence_ms: 0,
            waited_ms: 0,
        }
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }

    pub fn push(&mut self, is_speech: bool) -> Endpoint {
        if is_speech {
            self.heard_speech = true;
            self.silence_ms = 0;
            return Endpoint::Listening;
        }

        if self.heard_speech {
            self.silence_ms += FRAME_MS;
            if self.silence_ms >= self.end_silence_ms {
                return Endpoint::SpeechEnded;
            }
        } else {
            self.waited_ms += FRAME_MS;
            // A zero timeout waits for the user to stop the capture
            if self.no_speech_ms > 0 && self.waited_ms >= self.no_speech_ms {
                return Endpoint::NoSpeech;
            }
        }
        Endpoint::Listening
    }
}
