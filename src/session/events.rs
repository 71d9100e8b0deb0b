use crate::questions::QuestionBank;
use crate::CoachError;
use crossbeam_channel::Sender;
use tracing::warn;

/// Identifies one asynchronous request (utterance, capture activation or
/// feedback request). Completions carrying a ticket the controller is no
/// longer waiting for are dropped.
pub type Ticket = u64;

/// Requests coming from the UI surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Start an interview on the given category
    Start { category: String },

    /// Start capturing an answer, or stop the capture in progress
    ToggleMic,

    /// Advance to the next question
    Next,

    /// Abandon the session and return to the start screen
    Reset,
}

/// Everything the controller reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The question bank finished loading
    BankLoaded(QuestionBank),

    /// The question bank could not be loaded
    BankFailed(CoachError),

    /// A user pressed a control
    User(UserAction),

    /// Playback of an utterance completed
    UtteranceFinished { utterance: Ticket },

    /// Playback of an utterance failed
    UtteranceFailed { utterance: Ticket, error: CoachError },

    /// The recognizer began listening
    CaptureStarted { activation: Ticket },

    /// The recognizer produced a final transcript
    CaptureResult { activation: Ticket, transcript: String },

    /// The recognizer reported an error code
    CaptureError { activation: Ticket, code: String },

    /// The recognizer stopped without a result
    CaptureEnded { activation: Ticket },

    /// No speech input engine can be used for this session
    SpeechInputUnavailable { reason: String },

    /// One countdown interval elapsed for an activation
    CountdownTick { activation: Ticket },

    /// The feedback service answered
    FeedbackReady { request: Ticket, feedback: String },

    /// The feedback request failed
    FeedbackFailed { request: Ticket, error: CoachError },
}

/// Side effects requested by the controller, executed by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Speak { utterance: Ticket, text: String },
    StartCapture { activation: Ticket },
    StopCapture { activation: Ticket },
    StartCountdown { activation: Ticket },
    CancelCountdown { activation: Ticket },
    RequestFeedback {
        request: Ticket,
        question: String,
        answer: String,
    },
}

/// Handle adapters use to report back into the session
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<SessionEvent>,
}

impl EventSink {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Post an event; a closed session is logged and otherwise ignored
    pub fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Session event dropped, receiver gone: {:?}", e.into_inner());
        }
    }
}
