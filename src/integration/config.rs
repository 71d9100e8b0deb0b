//! Configuration for the interview coach
//!
//! Provides centralized configuration for all components, loadable from a
//! TOML file. Every field has a default so a file only needs the values it
//! changes.

use crate::{CoachError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Speech engine settings shared by the output and input adapters
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 language tag for synthesis and recognition
    pub language: String,

    /// Playback rate for questions (1.0 = normal)
    pub rate: f32,

    /// Deliver partial transcripts. Interview answers are judged on the
    /// final transcript only, so `validate` rejects `true`.
    pub interim_results: bool,

    /// Keep recognizing after the first final result. One activation yields
    /// one answer, so `validate` rejects `true`.
    pub continuous: bool,

    /// Simulated reading time per character for text-only output
    pub reading_pace_ms_per_char: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "ja-JP".to_string(),
            rate: 1.0,
            interim_results: false,
            continuous: false,
            reading_pace_ms_per_char: 40,
        }
    }
}

/// Local audio engines (used by `audio-io` builds)
///
/// Spoken questions need the VITS model and tokens; spoken answers need the
/// Whisper model. Anything left unset falls back to console text.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// VITS model (.onnx) for question playback
    pub vits_model: Option<PathBuf>,
    pub vits_tokens: Option<PathBuf>,
    pub vits_lexicon: Option<PathBuf>,
    /// espeak-ng data directory, for models that need it
    pub vits_data_dir: Option<PathBuf>,
    pub vits_speaker_id: i32,

    /// Whisper ggml model for answer transcription
    pub whisper_model: Option<PathBuf>,
    pub whisper_threads: i32,

    /// Speech probability above which a 32 ms frame counts as voice
    pub vad_threshold: f32,
    /// Silence after speech that ends the answer
    pub end_silence_ms: u64,
    /// Give up with `no-speech` when nothing is said for this long
    pub no_speech_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            vits_model: None,
            vits_tokens: None,
            vits_lexicon: None,
            vits_data_dir: None,
            vits_speaker_id: 0,
            whisper_model: None,
            whisper_threads: 4,
            vad_threshold: 0.5,
            end_silence_ms: 1500,
            no_speech_timeout_ms: 8000,
        }
    }
}

impl AudioConfig {
    /// Whether spoken question playback is configured
    pub fn has_synthesis(&self) -> bool {
        self.vits_model.is_some() && self.vits_tokens.is_some()
    }

    /// Whether spoken answer capture is configured
    pub fn has_recognition(&self) -> bool {
        self.whisper_model.is_some()
    }
}

/// Feedback service settings
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedbackConfig {
    /// URL receiving `POST {question, answer}`
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/get-feedback".to_string(),
            timeout_secs: 30,
        }
    }
}

impl FeedbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session flow settings
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Answer time limit in seconds; 0 disables the limit
    pub answer_time_limit_secs: u32,

    /// Countdown tick interval in milliseconds
    pub countdown_tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            answer_time_limit_secs: 30,
            countdown_tick_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Time limit in seconds, `None` when disabled
    pub fn time_limit(&self) -> Option<u32> {
        (self.answer_time_limit_secs > 0).then_some(self.answer_time_limit_secs)
    }

    /// Countdown ticks covering the time limit, rounded up
    pub fn time_limit_ticks(&self) -> Option<u32> {
        let secs = self.time_limit()?;
        let ticks = (u64::from(secs) * 1000).div_ceil(self.countdown_tick_ms.max(1));
        Some(u32::try_from(ticks).unwrap_or(u32::MAX))
    }

    /// Whole seconds left once `ticks` more ticks have elapsed, rounded up
    pub fn seconds_for_ticks(&self, ticks: u32) -> u32 {
        let ms = u64::from(ticks) * self.countdown_tick_ms;
        u32::try_from(ms.div_ceil(1000)).unwrap_or(u32::MAX)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

/// Configuration for the complete application
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterviewConfig {
    /// JSON question bank
    pub questions_path: PathBuf,

    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub feedback: FeedbackConfig,
    pub session: SessionConfig,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            questions_path: PathBuf::from("questions.json"),
            speech: SpeechConfig::default(),
            audio: AudioConfig::default(),
            feedback: FeedbackConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl InterviewConfig {
    /// Load a configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CoachError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: InterviewConfig = toml::from_str(&content).map_err(|e| {
            CoachError::ConfigError(format!("failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Set the question bank path
    pub fn with_questions(mut self, path: impl Into<PathBuf>) -> Self {
        self.questions_path = path.into();
        self
    }

    /// Set the feedback endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.feedback.endpoint = endpoint.into();
        self
    }

    /// Set the answer time limit in seconds (0 disables it)
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.session.answer_time_limit_secs = secs;
        self
    }

    /// Disable the answer time limit
    pub fn without_time_limit(self) -> Self {
        self.with_time_limit(0)
    }

    /// Set the speech language tag
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.speech.language = language.into();
        self
    }

    /// Set the question playback rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.speech.rate = rate;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.feedback.endpoint).map_err(|e| {
            CoachError::ConfigError(format!(
                "invalid feedback endpoint '{}': {}",
                self.feedback.endpoint, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoachError::ConfigError(format!(
                "feedback endpoint must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.feedback.timeout_secs == 0 {
            return Err(CoachError::ConfigError(
                "feedback timeout must be at least one second".to_string(),
            ));
        }

        // Range accepted by browser speech synthesis
        if !(0.1..=10.0).contains(&self.speech.rate) {
            return Err(CoachError::ConfigError(format!(
                "speech rate {} is outside 0.1..=10.0",
                self.speech.rate
            )));
        }

        if self.speech.interim_results {
            return Err(CoachError::ConfigError(
                "speech.interim_results is not supported: answers use final transcripts only"
                    .to_string(),
            ));
        }
        if self.speech.continuous {
            return Err(CoachError::ConfigError(
                "speech.continuous is not supported: each capture yields one answer".to_string(),
            ));
        }

        if self.speech.language.trim().is_empty() {
            return Err(CoachError::ConfigError(
                "speech language must not be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.audio.vad_threshold) {
            return Err(CoachError::ConfigError(format!(
                "audio.vad_threshold {} is outside 0.0..=1.0",
                self.audio.vad_threshold
            )));
        }
        if self.audio.end_silence_ms == 0 || self.audio.whisper_threads < 1 {
            return Err(CoachError::ConfigError(
                "audio.end_silence_ms and audio.whisper_threads must be positive".to_string(),
            ));
        }

        if self.session.countdown_tick_ms == 0 {
            return Err(CoachError::ConfigError(
                "countdown tick must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = InterviewConfig::default();
        assert_eq!(config.speech.language, "ja-JP");
        assert!(!config.speech.interim_results);
        assert!(!config.speech.continuous);
        assert_eq!(config.session.time_limit(), Some(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = InterviewConfig::default()
            .with_endpoint("https://example.test/api/get-feedback")
            .with_questions("bank.json")
            .without_time_limit()
            .with_rate(1.5);

        assert_eq!(config.feedback.endpoint, "https://example.test/api/get-feedback");
        assert_eq!(config.questions_path, PathBuf::from("bank.json"));
        assert_eq!(config.session.time_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = InterviewConfig::default().with_endpoint("not a url");
        assert!(matches!(config.validate(), Err(CoachError::ConfigError(_))));

        let config = InterviewConfig::default().with_endpoint("ftp://example.test/feedback");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_rate() {
        let config = InterviewConfig::default().with_rate(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
questions_path = "data/questions.json"

[feedback]
endpoint = "https://coach.example.test/api/get-feedback"

[session]
answer_time_limit_secs = 45
"#
        )
        .unwrap();

        let config = InterviewConfig::load(file.path()).unwrap();
        assert_eq!(config.questions_path, PathBuf::from("data/questions.json"));
        assert_eq!(
            config.feedback.endpoint,
            "https://coach.example.test/api/get-feedback"
        );
        assert_eq!(config.feedback.timeout_secs, 30);
        assert_eq!(config.session.time_limit(), Some(45));
        assert_eq!(config.speech, SpeechConfig::default());
    }

    #[test]
    fn test_validate_rejects_streaming_recognition() {
        let mut config = InterviewConfig::default();
        config.speech.interim_results = true;
        assert!(matches!(config.validate(), Err(CoachError::ConfigError(_))));

        let mut config = InterviewConfig::default();
        config.speech.continuous = true;
        assert!(matches!(config.validate(), Err(CoachError::ConfigError(_))));
    }

    #[test]
    fn test_load_rejects_continuous_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[speech]\ncontinuous = true").unwrap();
        match InterviewConfig::load(file.path()) {
            Err(CoachError::ConfigError(message)) => assert!(message.contains("continuous")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_time_limit_is_seconds_regardless_of_tick() {
        let config = SessionConfig {
            answer_time_limit_secs: 2,
            countdown_tick_ms: 500,
        };
        assert_eq!(config.time_limit_ticks(), Some(4));
        assert_eq!(config.seconds_for_ticks(4), 2);
        assert_eq!(config.seconds_for_ticks(3), 2);
        assert_eq!(config.seconds_for_ticks(2), 1);

        let config = SessionConfig {
            answer_time_limit_secs: 1,
            countdown_tick_ms: 300,
        };
        // 1000 ms needs four 300 ms ticks
        assert_eq!(config.time_limit_ticks(), Some(4));
        assert_eq!(SessionConfig::default().time_limit_ticks(), Some(30));
        assert_eq!(config.seconds_for_ticks(0), 0);
    }

    #[test]
    fn test_load_audio_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[audio]
vits_model = "models/vits-ja/model.onnx"
vits_tokens = "models/vits-ja/tokens.txt"
vad_threshold = 0.6
"#
        )
        .unwrap();

        let config = InterviewConfig::load(file.path()).unwrap();
        assert!(config.audio.has_synthesis());
        assert!(!config.audio.has_recognition());
        assert_eq!(config.audio.vad_threshold, 0.6);
        assert_eq!(config.audio.end_silence_ms, 1500);

        let mut config = InterviewConfig::default();
        config.audio.vad_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "questions_path = [").unwrap();
        assert!(matches!(
            InterviewConfig::load(file.path()),
            Err(CoachError::ConfigError(_))
        ));
    }
}
