//! Spoken answers: microphone capture, voice activity endpointing and
//! Whisper transcription
//!
//! Each activation runs on its own thread. The capture ends when the user
//! stops talking, when `stop_capture` is requested, or with `no-speech` when
//! nothing is said; the audio heard so far is then transcribed in one pass.

use crate::audio::{AudioInput, Endpoint, Endpointer, SpeechDetector, StreamResampler, SPEECH_SAMPLE_RATE};
use crate::integration::config::{AudioConfig, SpeechConfig};
use crate::session::{EventSink, SessionEvent, Ticket};
use crate::speech::stt::SpeechInput;
use crate::{CoachError, Result};
use crossbeam_channel::{bounded, RecvTimeoutError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper rejects clips shorter than one second
const MIN_TRANSCRIBE_SAMPLES: usize = SPEECH_SAMPLE_RATE as usize + SPEECH_SAMPLE_RATE as usize / 10;

#[derive(Clone, Debug)]
struct CaptureSettings {
    /// Whisper language code, `None` for auto-detect
    language: Option<String>,
    threads: i32,
    vad_threshold: f32,
    end_silence_ms: u64,
    no_speech_ms: u64,
}

/// Whisper language code for a BCP-47 tag ("ja-JP" -> "ja")
fn whisper_language(tag: &str) -> Option<String> {
    let primary = tag.split(['-', '_']).next()?.trim().to_lowercase();
    (!primary.is_empty()).then_some(primary)
}

type ActiveCapture = Arc<Mutex<Option<(Ticket, Arc<AtomicBool>)>>>;

/// [`SpeechInput`] recognizing answers from the default microphone
pub struct WhisperInput {
    context: Arc<WhisperContext>,
    settings: CaptureSettings,
    active: ActiveCapture,
}

impl WhisperInput {
    /// Load the Whisper model named in `audio`
    pub fn new(audio: &AudioConfig, speech: &SpeechConfig) -> Result<Self> {
        let model = audio.whisper_model.as_ref().ok_or_else(|| {
            CoachError::ConfigError("audio.whisper_model is required for spoken answers".into())
        })?;
        if !model.exists() {
            return Err(CoachError::ConfigError(format!(
                "whisper model not found: {}",
                model.display()
            )));
        }

        info!("Loading Whisper model from {}", model.display());
        let context = WhisperContext::new_with_params(
            &model.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| CoachError::ConfigError(format!("failed to load whisper model: {:?}", e)))?;

        Ok(Self {
            context: Arc::new(context),
            settings: CaptureSettings {
                language: whisper_language(&speech.language),
                threads: audio.whisper_threads,
                vad_threshold: audio.vad_threshold,
                end_silence_ms: audio.end_silence_ms,
                no_speech_ms: audio.no_speech_timeout_ms,
            },
            active: Arc::new(Mutex::new(None)),
        })
    }
}

impl SpeechInput for WhisperInput {
    fn availability(&self) -> Result<()> {
        if AudioInput::is_available() {
            Ok(())
        } else {
            Err(CoachError::CapabilityUnavailable("no microphone found".into()))
        }
    }

    fn start_capture(&mut self, activation: Ticket, sink: &EventSink) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.lock();
            if let Some((current, _)) = active.as_ref() {
                return Err(CoachError::RecognitionError(format!(
                    "recognizer already active (activation {})",
                    current
                )));
            }
            *active = Some((activation, Arc::clone(&stop)));
        }

        let job = CaptureJob {
            activation,
            sink: sink.clone(),
            stop,
            context: Arc::clone(&self.context),
            settings: self.settings.clone(),
            active: Arc::clone(&self.active),
        };
        let spawned = thread::Builder::new()
            .name(format!("capture-{}", activation))
            .spawn(move || job.run());

        if let Err(e) = spawned {
            self.active.lock().take();
            return Err(CoachError::RecognitionError(format!(
                "failed to spawn capture thread: {}",
                e
            )));
        }
        Ok(())
    }

    fn stop_capture(&mut self, activation: Ticket) -> Result<()> {
        if let Some((current, stop)) = self.active.lock().as_ref() {
            if *current == activation {
                debug!("Stop requested for capture {}", activation);
                stop.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// How a capture loop ended
enum Finish {
    Stopped,
    SpeechEnded,
    NoSpeech,
    DeviceLost,
}

struct CaptureJob {
    activation: Ticket,
    sink: EventSink,
    stop: Arc<AtomicBool>,
    context: Arc<WhisperContext>,
    settings: CaptureSettings,
    active: ActiveCapture,
}

impl CaptureJob {
    fn run(self) {
        let event = self.capture();

        // Free the recognizer before the session hears about the end
        {
            let mut active = self.active.lock();
            if active.as_ref().is_some_and(|(current, _)| *current == self.activation) {
                *active = None;
            }
        }
        self.sink.emit(event);
    }

    fn capture(&self) -> SessionEvent {
        let activation = self.activation;
        let failed = |code: &str| SessionEvent::CaptureError {
            activation,
            code: code.to_string(),
        };

        let (audio_tx, audio_rx) = bounded::<Vec<f32>>(256);
        let mut input = match AudioInput::new() {
            Ok(input) => input,
            Err(e) => {
                warn!("Capture {}: {}", activation, e);
                return failed("audio-capture");
            }
        };
        if let Err(e) = input.start_recording(audio_tx) {
            warn!("Capture {}: {}", activation, e);
            return failed("audio-capture");
        }

        let setup = StreamResampler::new(input.sample_rate(), SPEECH_SAMPLE_RATE).and_then(|r| {
            Ok((r, SpeechDetector::new(self.settings.vad_threshold)?))
        });
        let (mut resampler, mut detector) = match setup {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Capture {}: {}", activation, e);
                return failed("audio-capture");
            }
        };
        let mut endpointer = Endpointer::new(self.settings.end_silence_ms, self.settings.no_speech_ms);

        self.sink.emit(SessionEvent::CaptureStarted { activation });
        let mut speech = Vec::new();

        let finish = 'capture: loop {
            if self.stop.load(Ordering::SeqCst) {
                break Finish::Stopped;
            }
            let chunk = match audio_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break Finish::DeviceLost,
            };
            let samples = match resampler.push(&chunk) {
                Ok(samples) => samples,
                Err(e) => {
                    warn!("Capture {}: {}", activation, e);
                    break Finish::DeviceLost;
                }
            };
            speech.extend_from_slice(&samples);

            for voiced in detector.push(&samples) {
                match endpointer.push(voiced) {
                    Endpoint::Listening => {}
                    Endpoint::SpeechEnded => break 'capture Finish::SpeechEnded,
                    Endpoint::NoSpeech => break 'capture Finish::NoSpeech,
                }
            }
        };
        input.stop_recording();

        match finish {
            Finish::NoSpeech => return failed("no-speech"),
            Finish::DeviceLost => return failed("audio-capture"),
            Finish::Stopped | Finish::SpeechEnded => {}
        }
        if !endpointer.heard_speech() {
            debug!("Capture {} ended without speech", activation);
            return SessionEvent::CaptureEnded { activation };
        }

        if let Ok(rest) = resampler.finish() {
            speech.extend(rest);
        }
        match transcribe(&self.context, &mut speech, &self.settings) {
            Ok(transcript) => {
                info!("Capture {} transcribed: {} chars", activation, transcript.len());
                SessionEvent::CaptureResult {
                    activation,
                    transcript,
                }
            }
            Err(e) => {
                warn!("Capture {}: {}", activation, e);
                failed("transcription-failed")
            }
        }
    }
}

fn transcribe(
    context: &WhisperContext,
    samples: &mut Vec<f32>,
    settings: &CaptureSettings,
) -> Result<String> {
    if samples.len() < MIN_TRANSCRIBE_SAMPLES {
        samples.resize(MIN_TRANSCRIBE_SAMPLES, 0.0);
    }

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(settings.threads);
    params.set_translate(false);
    params.set_print_timestamps(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    if let Some(language) = settings.language.as_deref() {
        params.set_language(Some(language));
    }

    let mut state = context
        .create_state()
        .map_err(|e| CoachError::RecognitionError(format!("failed to create state: {:?}", e)))?;
    state
        .full(params, samples)
        .map_err(|e| CoachError::RecognitionError(format!("transcription failed: {:?}", e)))?;

    let segments = state
        .full_n_segments()
        .map_err(|e| CoachError::RecognitionError(format!("failed to get segments: {:?}", e)))?;
    let mut text = String::new();
    for i in 0..segments {
        let segment = state.full_get_segment_text(i).map_err(|e| {
            CoachError::RecognitionError(format!("failed to get segment text: {:?}", e))
        })?;
        text.push_str(&segment);
    }
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_language_from_tag() {
        assert_eq!(whisper_language("ja-JP").as_deref(), Some("ja"));
        assert_eq!(whisper_language("en_US").as_deref(), Some("en"));
        assert_eq!(whisper_language("DE").as_deref(), Some("de"));
        assert_eq!(whisper_language(""), None);
    }

    #[test]
    fn test_missing_model_is_config_error() {
        let speech = SpeechConfig::default();
        assert!(matches!(
            WhisperInput::new(&AudioConfig::default(), &speech),
            Err(CoachError::ConfigError(_))
        ));

        let audio = AudioConfig {
            whisper_model: Some("/nonexistent/ggml-base.bin".into()),
            ..AudioConfig::default()
        };
        assert!(matches!(
            WhisperInput::new(&audio, &speech),
            Err(CoachError::ConfigError(_))
        ));
    }
}
