//! Answer capture
//!
//! One activation of a recognizer ends in exactly one of: a final
//! transcript, an error code, or an end without result. The controller
//! ignores anything an activation reports after its first terminal event.

use crate::integration::config::SpeechConfig;
use crate::session::{EventSink, SessionEvent, Ticket};
use crate::{CoachError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Recognizer settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub language: String,
    /// Interim partial transcripts (disabled for interview answers)
    pub interim_results: bool,
    /// Keep recognizing after the first final result
    pub continuous: bool,
}

impl From<&SpeechConfig> for RecognitionConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            language: config.language.clone(),
            interim_results: config.interim_results,
            continuous: config.continuous,
        }
    }
}

/// A speech-to-text capability.
///
/// After a successful `start_capture` the engine posts
/// [`SessionEvent::CaptureStarted`] and then one terminal event
/// ([`SessionEvent::CaptureResult`], [`SessionEvent::CaptureError`] or
/// [`SessionEvent::CaptureEnded`]) for the same activation. `stop_capture`
/// only requests termination; the terminal event still arrives afterwards.
pub trait SpeechInput: Send {
    /// Whether the engine exists at all. An error here disables capture for
    /// the whole session.
    fn availability(&self) -> Result<()> {
        Ok(())
    }

    /// Begin listening. Fails immediately if the engine is missing,
    /// permission is denied or it is already listening.
    fn start_capture(&mut self, activation: Ticket, sink: &EventSink) -> Result<()>;

    /// Request termination of a running activation
    fn stop_capture(&mut self, activation: Ticket) -> Result<()>;
}

impl<T: SpeechInput + ?Sized> SpeechInput for Box<T> {
    fn availability(&self) -> Result<()> {
        (**self).availability()
    }

    fn start_capture(&mut self, activation: Ticket, sink: &EventSink) -> Result<()> {
        (**self).start_capture(activation, sink)
    }

    fn stop_capture(&mut self, activation: Ticket) -> Result<()> {
        (**self).stop_capture(activation)
    }
}

/// Stand-in used when no recognizer is installed
pub struct UnavailableInput {
    reason: String,
}

impl UnavailableInput {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechInput for UnavailableInput {
    fn availability(&self) -> Result<()> {
        Err(CoachError::CapabilityUnavailable(self.reason.clone()))
    }

    fn start_capture(&mut self, _activation: Ticket, _sink: &EventSink) -> Result<()> {
        Err(CoachError::CapabilityUnavailable(self.reason.clone()))
    }

    fn stop_capture(&mut self, _activation: Ticket) -> Result<()> {
        Ok(())
    }
}

type ActiveCapture = Arc<Mutex<Option<(Ticket, EventSink)>>>;

/// Recognizer whose "speech" is a line typed by the user.
///
/// The front end feeds lines through the paired [`AnswerKeyboard`].
pub struct TypedAnswerInput {
    config: RecognitionConfig,
    active: ActiveCapture,
}

/// Front-end side of a [`TypedAnswerInput`]
#[derive(Clone)]
pub struct AnswerKeyboard {
    active: ActiveCapture,
}

impl TypedAnswerInput {
    pub fn new(config: RecognitionConfig) -> (Self, AnswerKeyboard) {
        let active: ActiveCapture = Arc::new(Mutex::new(None));
        let keyboard = AnswerKeyboard {
            active: Arc::clone(&active),
        };
        (Self { config, active }, keyboard)
    }
}

impl SpeechInput for TypedAnswerInput {
    fn start_capture(&mut self, activation: Ticket, sink: &EventSink) -> Result<()> {
        let mut active = self.active.lock();
        if let Some((current, _)) = active.as_ref() {
            return Err(CoachError::RecognitionError(format!(
                "recognizer already active (activation {})",
                current
            )));
        }

        info!(
            "Capture {} started (lang {}, interim {}, continuous {})",
            activation, self.config.language, self.config.interim_results, self.config.continuous
        );
        *active = Some((activation, sink.clone()));
        sink.emit(SessionEvent::CaptureStarted { activation });
        Ok(())
    }

    fn stop_capture(&mut self, activation: Ticket) -> Result<()> {
        let mut active = self.active.lock();
        match active.take() {
            Some((current, sink)) if current == activation => {
                debug!("Capture {} stopped", activation);
                sink.emit(SessionEvent::CaptureEnded { activation });
            }
            other => {
                // Not ours to stop; leave it running
                *active = other;
            }
        }
        Ok(())
    }
}

impl AnswerKeyboard {
    /// Whether a capture is waiting for a typed answer
    pub fn is_listening(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Deliver a typed answer. An empty line ends the capture without a
    /// result. Returns `false` when nothing was listening.
    pub fn submit(&self, line: &str) -> bool {
        let Some((activation, sink)) = self.active.lock().take() else {
            return false;
        };

        let transcript = line.trim();
        if transcript.is_empty() {
            sink.emit(SessionEvent::CaptureEnded { activation });
        } else {
            sink.emit(SessionEvent::CaptureResult {
                activation,
                transcript: transcript.to_string(),
            });
        }
        true
    }
}
