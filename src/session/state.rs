//! Session data and controller phases

use crate::session::events::Ticket;

/// Why the controller asked the recognizer to stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The user pressed the mic control while listening
    User,
    /// The answer countdown reached zero
    TimeLimit,
}

/// Controller phase, carrying the ticket of the request it waits on
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No question bank loaded yet
    #[default]
    Idle,
    /// Bank loaded, no session running
    AwaitingStart,
    /// Question being read aloud
    Playing { utterance: Ticket },
    /// Waiting for the user to answer (or move on)
    ReadyToListen,
    /// Microphone capture requested or running
    Listening {
        activation: Ticket,
        /// The recognizer confirmed it is listening
        started: bool,
        /// Seconds left on the answer countdown
        remaining: Option<u32>,
        stop: Option<StopReason>,
    },
    /// Transcript sent, waiting on the feedback service
    AwaitingFeedback { request: Ticket },
    /// Every question has been asked
    Finished,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::AwaitingStart => PhaseKind::AwaitingStart,
            Phase::Playing { .. } => PhaseKind::Playing,
            Phase::ReadyToListen => PhaseKind::ReadyToListen,
            Phase::Listening { .. } => PhaseKind::Listening,
            Phase::AwaitingFeedback { .. } => PhaseKind::AwaitingFeedback,
            Phase::Finished => PhaseKind::Finished,
        }
    }
}

/// Ticket-free view of [`Phase`] for callers and assertions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhaseKind {
    #[default]
    Idle,
    AwaitingStart,
    Playing,
    ReadyToListen,
    Listening,
    AwaitingFeedback,
    Finished,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Idle => write!(f, "Idle"),
            PhaseKind::AwaitingStart => write!(f, "AwaitingStart"),
            PhaseKind::Playing => write!(f, "Playing"),
            PhaseKind::ReadyToListen => write!(f, "ReadyToListen"),
            PhaseKind::Listening => write!(f, "Listening"),
            PhaseKind::AwaitingFeedback => write!(f, "AwaitingFeedback"),
            PhaseKind::Finished => write!(f, "Finished"),
        }
    }
}

/// The ordered questions of one interview run and the progress through them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    category: String,
    questions: Vec<String>,
    index: usize,
}

impl Session {
    pub fn new(category: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            category: category.into(),
            questions,
            index: 0,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// 0-based index of the current question; equals `len()` once finished
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Current question, `None` once the sequence is exhausted
    pub fn current(&self) -> Option<&str> {
        self.questions.get(self.index).map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.questions.len()
    }

    /// Move to the next question. The index never passes `len()`.
    pub fn advance(&mut self) -> Option<&str> {
        if self.index < self.questions.len() {
            self.index += 1;
        }
        self.current()
    }
}

/// Ephemeral question/answer/feedback triple for the current question
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub transcript: String,
    pub feedback: String,
    /// At least one feedback attempt has resolved for this question
    pub answered: bool,
}

impl Turn {
    pub fn for_question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Clear answer and feedback before a new capture attempt
    pub fn clear_answer(&mut self) {
        self.transcript.clear();
        self.feedback.clear();
    }
}
