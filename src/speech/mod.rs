//! Speech adapters for question playback and answer capture
//!
//! This module provides:
//! - Text-to-speech (TTS) output behind the [`SpeechOutput`] trait
//! - Speech-to-text (STT) input behind the [`SpeechInput`] trait
//!
//! Engines report completion asynchronously by posting session events
//! through the [`EventSink`](crate::session::EventSink) they are handed.
//! The spoken engines need the `audio-io` feature; without it questions are
//! printed and answers typed.

pub mod stt;
pub mod tts;
#[cfg(feature = "audio-io")]
pub mod vits;
#[cfg(feature = "audio-io")]
pub mod whisper;

// Re-export commonly used types
pub use stt::{AnswerKeyboard, RecognitionConfig, SpeechInput, TypedAnswerInput, UnavailableInput};
pub use tts::{reading_time, SpeechOutput, TextSpeaker, Utterance};
#[cfg(feature = "audio-io")]
pub use vits::VitsSpeaker;
#[cfg(feature = "audio-io")]
pub use whisper::WhisperInput;
