//! Spoken questions through a local VITS voice (sherpa-rs) and the default
//! output device
//!
//! The voice and the cpal stream live on one worker thread; `speak` only
//! queues the request. Completion is reported after the audio has played.

use crate::audio::{resample, AudioOutput};
use crate::integration::config::AudioConfig;
use crate::session::{EventSink, SessionEvent, Ticket};
use crate::speech::tts::{SpeechOutput, Utterance};
use crate::{CoachError, Result};
use crossbeam_channel::{bounded, unbounded, Sender};
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, error, info, warn};

/// Files making up one VITS voice
#[derive(Clone, Debug)]
struct VoiceFiles {
    model: PathBuf,
    tokens: PathBuf,
    lexicon: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    speaker_id: i32,
}

impl VoiceFiles {
    fn from_config(config: &AudioConfig) -> Result<Self> {
        let (Some(model), Some(tokens)) = (&config.vits_model, &config.vits_tokens) else {
            return Err(CoachError::ConfigError(
                "audio.vits_model and audio.vits_tokens are required for spoken questions".into(),
            ));
        };
        for path in [model, tokens] {
            if !path.exists() {
                return Err(CoachError::ConfigError(format!(
                    "voice file not found: {}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            model: model.clone(),
            tokens: tokens.clone(),
            lexicon: config.vits_lexicon.clone(),
            data_dir: config.vits_data_dir.clone(),
            speaker_id: config.vits_speaker_id,
        })
    }
}

fn path_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

struct SpeakRequest {
    utterance: Ticket,
    request: Utterance,
    sink: EventSink,
}

/// [`SpeechOutput`] playing synthesized questions on the speakers
pub struct VitsSpeaker {
    request_tx: Sender<SpeakRequest>,
}

impl VitsSpeaker {
    /// Load the voice and open the output device on the worker thread.
    /// Fails if either is unusable, so the caller can fall back to text.
    pub fn start(config: &AudioConfig) -> Result<Self> {
        let voice = VoiceFiles::from_config(config)?;
        let (request_tx, request_rx) = unbounded::<SpeakRequest>();
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        thread::Builder::new()
            .name("tts-worker".to_string())
            .spawn(move || {
                info!("Loading VITS voice from {}", voice.model.display());
                let mut tts = VitsTts::new(VitsTtsConfig {
                    model: path_string(Some(&voice.model)),
                    tokens: path_string(Some(&voice.tokens)),
                    lexicon: path_string(voice.lexicon.as_deref()),
                    data_dir: path_string(voice.data_dir.as_deref()),
                    length_scale: 1.0,
                    noise_scale: 0.667,
                    noise_scale_w: 0.8,
                    ..Default::default()
                });

                let output = match AudioOutput::new() {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                info!("Spoken questions ready");

                while let Ok(SpeakRequest {
                    utterance,
                    request,
                    sink,
                }) = request_rx.recv()
                {
                    let event = match say(&mut tts, &output, voice.speaker_id, &request) {
                        Ok(()) => SessionEvent::UtteranceFinished { utterance },
                        Err(error) => {
                            warn!("Utterance {} failed: {}", utterance, error);
                            SessionEvent::UtteranceFailed { utterance, error }
                        }
                    };
                    sink.emit(event);
                }
                debug!("TTS worker stopped");
            })
            .map_err(|e| CoachError::SynthesisError(format!("failed to spawn TTS worker: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { request_tx }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                error!("TTS worker exited during startup");
                Err(CoachError::SynthesisError("TTS worker exited".into()))
            }
        }
    }
}

fn say(tts: &mut VitsTts, output: &AudioOutput, speaker_id: i32, request: &Utterance) -> Result<()> {
    if request.text.trim().is_empty() {
        return Ok(());
    }

    let audio = tts
        .create(&request.text, speaker_id, request.rate)
        .map_err(|e| CoachError::SynthesisError(format!("synthesis failed: {}", e)))?;
    let samples = resample(&audio.samples, audio.sample_rate as u32, output.sample_rate())
        .map_err(|e| CoachError::SynthesisError(e.to_string()))?;

    debug!(
        "Synthesized {} samples for {} chars",
        samples.len(),
        request.text.chars().count()
    );
    output.play_blocking(samples)
}

impl SpeechOutput for VitsSpeaker {
    fn speak(&mut self, utterance: Ticket, request: Utterance, sink: &EventSink) -> Result<()> {
        self.request_tx
            .send(SpeakRequest {
                utterance,
                request,
                sink: sink.clone(),
            })
            .map_err(|_| CoachError::SynthesisError("TTS worker stopped".into()))
    }
}
