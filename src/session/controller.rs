//! Interview session controller
//!
//! A pure transition function: every input is a [`SessionEvent`], every
//! output is a list of [`Effect`]s for the orchestrator to execute. The
//! controller never touches an engine, a thread or the network itself, so
//! it can be driven step by step in tests.
//!
//! Flow per question: speak → listen → submit for feedback → display →
//! advance. Each asynchronous request gets a fresh ticket and the
//! controller only accepts the completion it is currently waiting for.

use crate::integration::config::SessionConfig;
use crate::questions::{QuestionBank, SelectError};
use crate::session::events::{Effect, SessionEvent, Ticket, UserAction};
use crate::session::state::{Phase, Session, StopReason, Turn};
use crate::session::text;
use crate::ui::view::{Controls, InterviewView};
use crate::CoachError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Recognizer error codes meaning the microphone will not become usable
const PERMISSION_DENIED_CODES: &[&str] = &["not-allowed", "service-not-allowed"];

pub struct InterviewController {
    /// Time limit and tick interval of the answer countdown
    timing: SessionConfig,

    bank: Option<QuestionBank>,
    phase: Phase,
    session: Option<Session>,
    turn: Turn,
    status: String,
    error: Option<String>,

    /// Cleared permanently once the speech input engine is known unusable
    input_available: bool,

    /// Utterance the output engine is still playing, whatever the phase
    speaking: Option<Ticket>,
    /// Utterance waiting for the engine to become free
    queued_speech: Option<(Ticket, String)>,
    /// Capture activation the input engine has not finished yet
    capturing: Option<Ticket>,
    /// Activation whose countdown is running
    countdown: Option<Ticket>,

    next_ticket: Ticket,
    rng: StdRng,
}

impl InterviewController {
    /// Create a controller with an OS-seeded shuffle
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a controller with a deterministic shuffle
    pub fn with_seed(config: &SessionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SessionConfig, rng: StdRng) -> Self {
        Self {
            timing: config.clone(),
            bank: None,
            phase: Phase::Idle,
            session: None,
            turn: Turn::default(),
            status: text::LOADING_QUESTIONS.to_string(),
            error: None,
            input_available: true,
            speaking: None,
            queued_speech: None,
            capturing: None,
            countdown: None,
            next_ticket: 1,
            rng,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the microphone is currently capturing for this session
    pub fn is_mic_active(&self) -> bool {
        matches!(self.phase, Phase::Listening { .. })
    }

    /// Feed one event through the state machine
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::BankLoaded(bank) => self.on_bank_loaded(bank),
            SessionEvent::BankFailed(error) => self.on_bank_failed(error),
            SessionEvent::User(action) => self.on_user(action, &mut effects),
            SessionEvent::UtteranceFinished { utterance } => {
                self.on_utterance_done(utterance, None, &mut effects)
            }
            SessionEvent::UtteranceFailed { utterance, error } => {
                self.on_utterance_done(utterance, Some(error), &mut effects)
            }
            SessionEvent::CaptureStarted { activation } => {
                self.on_capture_started(activation, &mut effects)
            }
            SessionEvent::CaptureResult {
                activation,
                transcript,
            } => self.on_capture_result(activation, transcript, &mut effects),
            SessionEvent::CaptureError { activation, code } => {
                self.on_capture_error(activation, code, &mut effects)
            }
            SessionEvent::CaptureEnded { activation } => {
                self.on_capture_ended(activation, &mut effects)
            }
            SessionEvent::SpeechInputUnavailable { reason } => {
                self.on_input_unavailable(reason, &mut effects)
            }
            SessionEvent::CountdownTick { activation } => {
                self.on_countdown_tick(activation, &mut effects)
            }
            SessionEvent::FeedbackReady { request, feedback } => {
                self.on_feedback(request, Ok(feedback))
            }
            SessionEvent::FeedbackFailed { request, error } => {
                self.on_feedback(request, Err(error))
            }
        }

        effects
    }

    /// Control enablement for the current state
    pub fn controls(&self) -> Controls {
        let session_visible = self.session.is_some();

        let mic = match &self.phase {
            Phase::ReadyToListen => self.input_available && self.capturing.is_none(),
            Phase::Listening { stop, .. } => stop.is_none(),
            _ => false,
        };

        let next = match &self.phase {
            Phase::ReadyToListen => self.turn.answered || !self.input_available,
            Phase::AwaitingFeedback { .. } => self.turn.answered,
            _ => false,
        };

        Controls {
            start: self.phase == Phase::AwaitingStart,
            category_select: self.phase == Phase::AwaitingStart,
            mic,
            mic_active: self.is_mic_active(),
            next,
            reset: session_visible || self.error.is_some(),
            session_visible,
        }
    }

    /// Build the render model
    pub fn view(&self) -> InterviewView {
        let question = match (&self.phase, &self.session) {
            (Phase::Idle, None) => String::new(),
            (_, None) => text::START_PROMPT.to_string(),
            _ => self.turn.question.clone(),
        };

        let progress = self.session.as_ref().and_then(|s| {
            if s.is_finished() {
                None
            } else {
                Some((s.index() + 1, s.len()))
            }
        });

        InterviewView {
            phase: self.phase.kind(),
            category: self.session.as_ref().map(|s| s.category().to_string()),
            categories: self
                .bank
                .as_ref()
                .map(|b| b.categories().map(str::to_string).collect())
                .unwrap_or_default(),
            question,
            transcript: self.turn.transcript.clone(),
            feedback: self.turn.feedback.clone(),
            status: self.status.clone(),
            error: self.error.clone(),
            controls: self.controls(),
            progress,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    // === Question bank ===

    fn on_bank_loaded(&mut self, bank: QuestionBank) {
        info!("Question bank ready: {} categories", bank.categories().count());
        self.bank = Some(bank);
        self.error = None;
        if self.phase == Phase::Idle {
            self.phase = Phase::AwaitingStart;
            self.status.clear();
        }
    }

    fn on_bank_failed(&mut self, error: CoachError) {
        warn!("Question bank unavailable: {}", error);
        self.error = Some(error.user_message());
        if self.bank.is_none() {
            self.status.clear();
        }
    }

    // === User actions ===

    fn on_user(&mut self, action: UserAction, effects: &mut Vec<Effect>) {
        let controls = self.controls();
        match action {
            UserAction::Start { category } if controls.start => {
                self.start(&category, effects)
            }
            UserAction::ToggleMic if controls.mic => self.toggle_mic(effects),
            UserAction::Next if controls.next => self.next(effects),
            UserAction::Reset if controls.reset => self.reset(effects),
            other => debug!("Ignoring {:?} in phase {}", other, self.phase.kind()),
        }
    }

    fn start(&mut self, category: &str, effects: &mut Vec<Effect>) {
        let Some(bank) = &self.bank else {
            return;
        };

        match bank.select_sequence(category, &mut self.rng) {
            Ok(questions) => {
                info!(
                    "Starting interview: category '{}', {} questions",
                    category,
                    questions.len()
                );
                self.session = Some(Session::new(category, questions));
                self.error = None;
                self.present_question(effects);
            }
            Err(e) => {
                warn!("Cannot start interview: {}", e);
                self.error = Some(match e {
                    SelectError::EmptyCategory(_) => {
                        "The selected category has no questions.".to_string()
                    }
                    SelectError::UnknownCategory(name) => {
                        format!("Unknown category: {}", name)
                    }
                });
            }
        }
    }

    fn toggle_mic(&mut self, effects: &mut Vec<Effect>) {
        match self.phase {
            Phase::ReadyToListen => {
                let activation = self.issue_ticket();
                debug!("Starting capture activation {}", activation);
                self.turn.clear_answer();
                self.capturing = Some(activation);
                self.phase = Phase::Listening {
                    activation,
                    started: false,
                    remaining: None,
                    stop: None,
                };
                self.status = text::WAITING_FOR_MIC.to_string();
                effects.push(Effect::StartCapture { activation });
            }
            Phase::Listening {
                activation,
                ref mut stop,
                ..
            } => {
                debug!("User stopped capture activation {}", activation);
                *stop = Some(StopReason::User);
                self.status = text::STOPPING_CAPTURE.to_string();
                self.cancel_countdown(effects);
                effects.push(Effect::StopCapture { activation });
            }
            _ => {}
        }
    }

    fn next(&mut self, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if session.advance().is_some() {
            self.present_question(effects);
        } else {
            info!("Interview finished after {} questions", session.len());
            self.phase = Phase::Finished;
            self.turn = Turn {
                question: text::FINISHED_QUESTION.to_string(),
                transcript: String::new(),
                feedback: text::FINISHED_FEEDBACK.to_string(),
                answered: false,
            };
            self.status = text::FINISHED_STATUS.to_string();
        }
    }

    fn reset(&mut self, effects: &mut Vec<Effect>) {
        info!("Resetting interview from phase {}", self.phase.kind());

        self.cancel_countdown(effects);
        if let Phase::Listening { activation, .. } = self.phase {
            if self.capturing == Some(activation) {
                effects.push(Effect::StopCapture { activation });
            }
        }

        self.queued_speech = None;
        self.session = None;
        self.turn = Turn::default();
        self.status.clear();
        self.error = None;
        self.phase = if self.bank.is_some() {
            Phase::AwaitingStart
        } else {
            Phase::Idle
        };
    }

    fn present_question(&mut self, effects: &mut Vec<Effect>) {
        let Some(question) = self.session.as_ref().and_then(|s| s.current()) else {
            return;
        };
        let question = question.to_string();

        let utterance = self.issue_ticket();
        self.turn = Turn::for_question(question.clone());
        self.status = text::READING_QUESTION.to_string();
        self.phase = Phase::Playing { utterance };
        self.speak(utterance, question, effects);
    }

    fn speak(&mut self, utterance: Ticket, text: String, effects: &mut Vec<Effect>) {
        // An abandoned question may still be playing, or an abandoned
        // capture may still hold the microphone
        debug!(
            "Queueing utterance {} (speaking {:?}, capturing {:?})",
            utterance, self.speaking, self.capturing
        );
        self.queued_speech = Some((utterance, text));
        self.flush_speech(effects);
    }

    /// Hand the queued utterance to the output engine once both engines are idle
    fn flush_speech(&mut self, effects: &mut Vec<Effect>) {
        if self.speaking.is_some() || self.capturing.is_some() {
            return;
        }
        if let Some((utterance, text)) = self.queued_speech.take() {
            self.speaking = Some(utterance);
            effects.push(Effect::Speak { utterance, text });
        }
    }

    // === Speech output ===

    fn on_utterance_done(
        &mut self,
        utterance: Ticket,
        error: Option<CoachError>,
        effects: &mut Vec<Effect>,
    ) {
        if self.speaking == Some(utterance) {
            self.speaking = None;
            self.flush_speech(effects);
        }

        if self.phase != (Phase::Playing { utterance }) {
            debug!("Ignoring stale utterance completion {}", utterance);
            return;
        }

        self.phase = Phase::ReadyToListen;
        match error {
            None => {
                self.status = if self.input_available {
                    text::READY_TO_ANSWER.to_string()
                } else {
                    text::INPUT_UNAVAILABLE.to_string()
                };
            }
            Some(e) => {
                warn!("Utterance {} failed: {}", utterance, e);
                self.status = text::SYNTHESIS_FAILED.to_string();
                self.error = Some(e.user_message());
            }
        }
    }

    // === Speech input ===

    /// Resolve a terminal capture event. Returns the stop reason when the
    /// event belongs to the capture the session is waiting on.
    fn finish_capture(
        &mut self,
        activation: Ticket,
        effects: &mut Vec<Effect>,
    ) -> Option<Option<StopReason>> {
        if self.capturing == Some(activation) {
            self.capturing = None;
            self.flush_speech(effects);
        }

        match self.phase {
            Phase::Listening {
                activation: current,
                stop,
                ..
            } if current == activation => {
                self.cancel_countdown(effects);
                self.phase = Phase::ReadyToListen;
                Some(stop)
            }
            _ => {
                debug!("Ignoring terminal event for stale activation {}", activation);
                None
            }
        }
    }

    fn on_capture_started(&mut self, activation: Ticket, effects: &mut Vec<Effect>) {
        let time_limit = self.timing.time_limit_ticks();
        let seconds = time_limit.map(|ticks| self.timing.seconds_for_ticks(ticks));
        let Phase::Listening {
            activation: current,
            ref mut started,
            ref mut remaining,
            stop: None,
        } = self.phase
        else {
            debug!("Ignoring capture start for activation {}", activation);
            return;
        };
        if current != activation || *started {
            return;
        }

        *started = true;
        *remaining = time_limit;
        match seconds {
            Some(secs) => {
                self.status = text::listening_with_remaining(secs);
                self.countdown = Some(activation);
                effects.push(Effect::StartCountdown { activation });
            }
            None => self.status = text::SPEAK_NOW.to_string(),
        }
    }

    fn on_capture_result(
        &mut self,
        activation: Ticket,
        transcript: String,
        effects: &mut Vec<Effect>,
    ) {
        let Some(stop) = self.finish_capture(activation, effects) else {
            return;
        };

        let transcript = transcript.trim().to_string();
        if transcript.is_empty() {
            self.status = end_status(stop);
            return;
        }

        let request = self.issue_ticket();
        debug!("Transcript for activation {}: {} chars", activation, transcript.len());
        self.turn.transcript = transcript.clone();
        self.status = text::GENERATING_FEEDBACK.to_string();
        self.phase = Phase::AwaitingFeedback { request };
        effects.push(Effect::RequestFeedback {
            request,
            question: self.turn.question.clone(),
            answer: transcript,
        });
    }

    fn on_capture_error(&mut self, activation: Ticket, code: String, effects: &mut Vec<Effect>) {
        if self.finish_capture(activation, effects).is_none() {
            return;
        }

        warn!("Recognition error on activation {}: {}", activation, code);
        if PERMISSION_DENIED_CODES.contains(&code.as_str()) {
            self.input_available = false;
            self.error = Some(
                CoachError::CapabilityUnavailable(format!("microphone access denied ({})", code))
                    .user_message(),
            );
        } else {
            self.error = Some(CoachError::RecognitionError(code.clone()).user_message());
        }
        self.status = text::recognition_failed(&code);
    }

    fn on_capture_ended(&mut self, activation: Ticket, effects: &mut Vec<Effect>) {
        if let Some(stop) = self.finish_capture(activation, effects) {
            self.status = end_status(stop);
        }
    }

    fn on_input_unavailable(&mut self, reason: String, effects: &mut Vec<Effect>) {
        warn!("Speech input unavailable: {}", reason);
        self.input_available = false;
        self.error = Some(CoachError::CapabilityUnavailable(reason).user_message());

        let listening = matches!(self.phase, Phase::Listening { .. });
        if let Some(activation) = self.capturing {
            // The engine is gone, no terminal event will follow
            self.finish_capture(activation, effects);
        }
        if listening {
            self.status = text::INPUT_UNAVAILABLE.to_string();
        }
    }

    // === Answer countdown ===

    fn on_countdown_tick(&mut self, activation: Ticket, effects: &mut Vec<Effect>) {
        if self.countdown != Some(activation) {
            debug!("Ignoring stale countdown tick for activation {}", activation);
            return;
        }

        let Phase::Listening {
            activation: current,
            started: true,
            remaining: Some(ref mut remaining),
            ref mut stop,
        } = self.phase
        else {
            return;
        };
        if current != activation || stop.is_some() {
            return;
        }

        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            info!("Answer time limit reached for activation {}", activation);
            *stop = Some(StopReason::TimeLimit);
            self.status = text::TIME_UP.to_string();
            self.cancel_countdown(effects);
            effects.push(Effect::StopCapture { activation });
        } else {
            let secs = self.timing.seconds_for_ticks(*remaining);
            self.status = text::listening_with_remaining(secs);
        }
    }

    fn cancel_countdown(&mut self, effects: &mut Vec<Effect>) {
        if let Some(activation) = self.countdown.take() {
            effects.push(Effect::CancelCountdown { activation });
        }
    }

    // === Feedback ===

    fn on_feedback(&mut self, request: Ticket, outcome: Result<String, CoachError>) {
        if self.phase != (Phase::AwaitingFeedback { request }) {
            debug!("Ignoring stale feedback for request {}", request);
            return;
        }

        self.phase = Phase::ReadyToListen;
        self.turn.answered = true;
        match outcome {
            Ok(feedback) => {
                self.turn.feedback = feedback;
                self.status = text::FEEDBACK_READY.to_string();
            }
            Err(e) => {
                warn!("Feedback request {} failed: {}", request, e);
                self.turn.feedback = text::FEEDBACK_FALLBACK.to_string();
                self.status = text::FEEDBACK_FAILED.to_string();
                self.error = Some(e.user_message());
            }
        }
    }
}

fn end_status(stop: Option<StopReason>) -> String {
    match stop {
        Some(StopReason::User) => text::CAPTURE_STOPPED,
        Some(StopReason::TimeLimit) => text::TIME_UP,
        None => text::CAPTURE_ENDED,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::Category;
    use crate::session::state::PhaseKind;

    fn bank(questions: &[&str]) -> QuestionBank {
        QuestionBank::from_categories([Category {
            name: "General".to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
        }])
    }

    fn controller(time_limit: Option<u32>) -> InterviewController {
        let config = SessionConfig {
            answer_time_limit_secs: time_limit.unwrap_or(0),
            ..SessionConfig::default()
        };
        let mut controller = InterviewController::with_seed(&config, 11);
        controller.handle(SessionEvent::BankLoaded(bank(&["Q1", "Q2"])));
        controller
    }

    fn start(controller: &mut InterviewController) -> Ticket {
        let effects = controller.handle(SessionEvent::User(UserAction::Start {
            category: "General".to_string(),
        }));
        match effects.as_slice() {
            [Effect::Speak { utterance, .. }] => *utterance,
            other => panic!("expected one Speak effect, got {:?}", other),
        }
    }

    fn press_mic(controller: &mut InterviewController) -> Ticket {
        let effects = controller.handle(SessionEvent::User(UserAction::ToggleMic));
        match effects.as_slice() {
            [Effect::StartCapture { activation }] => *activation,
            other => panic!("expected StartCapture, got {:?}", other),
        }
    }

    #[test]
    fn test_idle_until_bank_loaded() {
        let mut controller = InterviewController::with_seed(&SessionConfig::default(), 1);
        assert_eq!(controller.phase().kind(), PhaseKind::Idle);
        assert!(!controller.controls().start);

        let effects = controller.handle(SessionEvent::User(UserAction::Start {
            category: "General".into(),
        }));
        assert!(effects.is_empty());

        controller.handle(SessionEvent::BankLoaded(bank(&["Q1"])));
        assert_eq!(controller.phase().kind(), PhaseKind::AwaitingStart);
        assert!(controller.controls().start);
        assert_eq!(controller.view().categories, vec!["General".to_string()]);
    }

    #[test]
    fn test_bank_failure_keeps_start_disabled() {
        let mut controller = InterviewController::with_seed(&SessionConfig::default(), 1);
        controller.handle(SessionEvent::BankFailed(CoachError::LoadError(
            "questions.json missing".into(),
        )));

        assert_eq!(controller.phase().kind(), PhaseKind::Idle);
        assert!(!controller.controls().start);
        assert!(controller.error().unwrap().contains("questions.json missing"));
    }

    #[test]
    fn test_start_speaks_first_question() {
        let mut controller = controller(None);
        start(&mut controller);

        assert_eq!(controller.phase().kind(), PhaseKind::Playing);
        assert_eq!(controller.session().unwrap().index(), 0);
        let controls = controller.controls();
        assert!(!controls.mic, "mic must stay disabled during playback");
        assert!(!controls.next);
        assert!(!controls.start);
        assert!(controls.session_visible);
    }

    #[test]
    fn test_start_unknown_category_reports_error() {
        let mut controller = controller(None);
        let effects = controller.handle(SessionEvent::User(UserAction::Start {
            category: "Nope".into(),
        }));

        assert!(effects.is_empty());
        assert_eq!(controller.phase().kind(), PhaseKind::AwaitingStart);
        assert!(controller.error().unwrap().contains("Nope"));
    }

    #[test]
    fn test_mic_ignored_while_playing() {
        let mut controller = controller(None);
        start(&mut controller);

        let effects = controller.handle(SessionEvent::User(UserAction::ToggleMic));
        assert!(effects.is_empty());
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);
    }

    #[test]
    fn test_synthesis_failure_still_unlocks_mic() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);

        controller.handle(SessionEvent::UtteranceFailed {
            utterance,
            error: CoachError::SynthesisError("audio-busy".into()),
        });

        assert_eq!(controller.phase().kind(), PhaseKind::ReadyToListen);
        assert!(controller.controls().mic);
        assert_eq!(controller.status(), text::SYNTHESIS_FAILED);
        assert!(controller.error().unwrap().contains("audio-busy"));
    }

    #[test]
    fn test_next_disabled_while_listening() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        press_mic(&mut controller);

        assert!(!controller.controls().next);
        let effects = controller.handle(SessionEvent::User(UserAction::Next));
        assert!(effects.is_empty());
        assert_eq!(controller.session().unwrap().index(), 0);
    }

    #[test]
    fn test_mic_ignored_while_awaiting_feedback() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureResult {
            activation,
            transcript: "answer".into(),
        });

        assert_eq!(controller.phase().kind(), PhaseKind::AwaitingFeedback);
        assert!(!controller.controls().mic);
        let effects = controller.handle(SessionEvent::User(UserAction::ToggleMic));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_user_stop_then_end() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureStarted { activation });

        let effects = controller.handle(SessionEvent::User(UserAction::ToggleMic));
        assert_eq!(effects, vec![Effect::StopCapture { activation }]);

        // A second press while stopping is ignored
        assert!(controller
            .handle(SessionEvent::User(UserAction::ToggleMic))
            .is_empty());

        controller.handle(SessionEvent::CaptureEnded { activation });
        assert_eq!(controller.phase().kind(), PhaseKind::ReadyToListen);
        assert_eq!(controller.status(), text::CAPTURE_STOPPED);
        assert!(controller.controls().mic);
    }

    #[test]
    fn test_unexplained_end_reenables_mic() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureStarted { activation });
        controller.handle(SessionEvent::CaptureEnded { activation });

        assert_eq!(controller.status(), text::CAPTURE_ENDED);
        assert!(controller.controls().mic);
        assert!(!controller.controls().next);
    }

    #[test]
    fn test_countdown_forces_stop() {
        let mut controller = controller(Some(2));
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);

        let effects = controller.handle(SessionEvent::CaptureStarted { activation });
        assert_eq!(effects, vec![Effect::StartCountdown { activation }]);
        assert_eq!(controller.status(), "Listening... 2s left");

        assert!(controller
            .handle(SessionEvent::CountdownTick { activation })
            .is_empty());
        assert_eq!(controller.status(), "Listening... 1s left");

        let effects = controller.handle(SessionEvent::CountdownTick { activation });
        assert_eq!(
            effects,
            vec![
                Effect::CancelCountdown { activation },
                Effect::StopCapture { activation }
            ]
        );

        controller.handle(SessionEvent::CaptureEnded { activation });
        assert_eq!(controller.status(), text::TIME_UP);
        assert!(controller.controls().mic);
    }

    #[test]
    fn test_stale_countdown_never_stops_later_capture() {
        let mut controller = controller(Some(3));
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });

        let first = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureStarted { activation: first });
        let effects = controller.handle(SessionEvent::CaptureEnded { activation: first });
        assert_eq!(effects, vec![Effect::CancelCountdown { activation: first }]);

        let second = press_mic(&mut controller);
        assert_ne!(first, second);
        controller.handle(SessionEvent::CaptureStarted { activation: second });

        // Ticks leaked from the first countdown, enough to exhaust any limit
        for _ in 0..10 {
            let effects = controller.handle(SessionEvent::CountdownTick { activation: first });
            assert!(effects.is_empty());
        }

        match controller.phase() {
            Phase::Listening {
                activation,
                remaining,
                stop,
                ..
            } => {
                assert_eq!(*activation, second);
                assert_eq!(*remaining, Some(3));
                assert_eq!(*stop, None);
            }
            other => panic!("expected Listening, got {:?}", other),
        }
    }

    #[test]
    fn test_permission_denied_disables_mic_but_allows_next() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureError {
            activation,
            code: "not-allowed".into(),
        });

        let controls = controller.controls();
        assert!(!controls.mic);
        assert!(controls.next, "session must not get stuck without a mic");
    }

    #[test]
    fn test_input_unavailable_at_startup() {
        let mut controller = controller(None);
        controller.handle(SessionEvent::SpeechInputUnavailable {
            reason: "no recognizer".into(),
        });
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });

        assert_eq!(controller.status(), text::INPUT_UNAVAILABLE);
        assert!(!controller.controls().mic);
        assert!(controller.controls().next);
    }

    #[test]
    fn test_stale_feedback_after_next_is_ignored() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });

        let activation = press_mic(&mut controller);
        let effects = controller.handle(SessionEvent::CaptureResult {
            activation,
            transcript: "first".into(),
        });
        let Effect::RequestFeedback { request, .. } = effects[0].clone() else {
            panic!("expected RequestFeedback");
        };
        controller.handle(SessionEvent::FeedbackReady {
            request,
            feedback: "ok".into(),
        });

        // Answer again, then move on before the second feedback arrives
        let activation = press_mic(&mut controller);
        let effects = controller.handle(SessionEvent::CaptureResult {
            activation,
            transcript: "second".into(),
        });
        let Effect::RequestFeedback { request: second, .. } = effects[0].clone() else {
            panic!("expected RequestFeedback");
        };
        assert!(controller.controls().next);
        controller.handle(SessionEvent::User(UserAction::Next));
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);

        controller.handle(SessionEvent::FeedbackReady {
            request: second,
            feedback: "late".into(),
        });
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);
        assert!(controller.turn().feedback.is_empty());
    }

    #[test]
    fn test_utterances_are_serialized_across_reset() {
        let mut controller = controller(None);
        let first = start(&mut controller);
        controller.handle(SessionEvent::User(UserAction::Reset));

        // Restart while the old question is still being read
        let effects = controller.handle(SessionEvent::User(UserAction::Start {
            category: "General".into(),
        }));
        assert!(effects.is_empty(), "second utterance must wait");

        let effects = controller.handle(SessionEvent::UtteranceFinished { utterance: first });
        let second = match effects.as_slice() {
            [Effect::Speak { utterance, .. }] => *utterance,
            other => panic!("expected queued Speak, got {:?}", other),
        };
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);

        controller.handle(SessionEvent::UtteranceFinished { utterance: second });
        assert_eq!(controller.phase().kind(), PhaseKind::ReadyToListen);
    }

    #[test]
    fn test_question_waits_for_abandoned_capture() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);
        controller.handle(SessionEvent::CaptureStarted { activation });

        let effects = controller.handle(SessionEvent::User(UserAction::Reset));
        assert_eq!(effects, vec![Effect::StopCapture { activation }]);

        // The recognizer still holds the microphone
        let effects = controller.handle(SessionEvent::User(UserAction::Start {
            category: "General".into(),
        }));
        assert!(effects.is_empty(), "question must wait for the capture to end");
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);
        assert!(!controller.controls().mic);

        let effects = controller.handle(SessionEvent::CaptureEnded { activation });
        let next = match effects.as_slice() {
            [Effect::Speak { utterance, text }] => {
                assert_eq!(text, &controller.turn().question);
                *utterance
            }
            other => panic!("expected deferred Speak, got {:?}", other),
        };
        assert_eq!(controller.phase().kind(), PhaseKind::Playing);

        controller.handle(SessionEvent::UtteranceFinished { utterance: next });
        assert_eq!(controller.phase().kind(), PhaseKind::ReadyToListen);
        assert!(controller.controls().mic);
    }

    #[test]
    fn test_input_loss_releases_deferred_question() {
        let mut controller = controller(None);
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        press_mic(&mut controller);
        controller.handle(SessionEvent::User(UserAction::Reset));
        controller.handle(SessionEvent::User(UserAction::Start {
            category: "General".into(),
        }));

        let effects = controller.handle(SessionEvent::SpeechInputUnavailable {
            reason: "device unplugged".into(),
        });
        assert!(matches!(effects.as_slice(), [Effect::Speak { .. }]));
    }

    #[test]
    fn test_reset_enabled_by_error_alone() {
        let mut controller = InterviewController::with_seed(&SessionConfig::default(), 1);
        assert!(!controller.controls().reset);

        controller.handle(SessionEvent::BankFailed(CoachError::LoadError("missing".into())));
        assert!(controller.controls().reset);
        controller.handle(SessionEvent::User(UserAction::Reset));
        assert!(controller.error().is_none());
        assert!(!controller.controls().reset);
    }

    #[test]
    fn test_reset_ignored_when_disabled() {
        let mut controller = controller(None);
        assert!(!controller.controls().reset);

        let effects = controller.handle(SessionEvent::User(UserAction::Reset));
        assert!(effects.is_empty());
        assert_eq!(controller.phase().kind(), PhaseKind::AwaitingStart);

        // A start error enables it
        controller.handle(SessionEvent::User(UserAction::Start {
            category: "Nope".into(),
        }));
        assert!(controller.controls().reset);
        controller.handle(SessionEvent::User(UserAction::Reset));
        assert!(controller.error().is_none());
    }

    #[test]
    fn test_countdown_reports_seconds_not_ticks() {
        let config = SessionConfig {
            answer_time_limit_secs: 2,
            countdown_tick_ms: 500,
        };
        let mut controller = InterviewController::with_seed(&config, 3);
        controller.handle(SessionEvent::BankLoaded(bank(&["Q1"])));
        let utterance = start(&mut controller);
        controller.handle(SessionEvent::UtteranceFinished { utterance });
        let activation = press_mic(&mut controller);

        controller.handle(SessionEvent::CaptureStarted { activation });
        assert_eq!(controller.status(), "Listening... 2s left");

        controller.handle(SessionEvent::CountdownTick { activation });
        assert_eq!(controller.status(), "Listening... 2s left");
        controller.handle(SessionEvent::CountdownTick { activation });
        assert_eq!(controller.status(), "Listening... 1s left");
        controller.handle(SessionEvent::CountdownTick { activation });
        assert_eq!(controller.status(), "Listening... 1s left");

        // Fourth 500 ms tick is the two-second mark
        let effects = controller.handle(SessionEvent::CountdownTick { activation });
        assert!(effects.contains(&Effect::StopCapture { activation }));
        assert_eq!(controller.status(), text::TIME_UP);
    }

    #[test]
    fn test_reset_from_finished() {
        let mut controller = controller(None);
        controller.handle(SessionEvent::SpeechInputUnavailable {
            reason: "none".into(),
        });
        for _ in 0..2 {
            let effects = if controller.session().is_none() {
                controller.handle(SessionEvent::User(UserAction::Start {
                    category: "General".into(),
                }))
            } else {
                controller.handle(SessionEvent::User(UserAction::Next))
            };
            let Some(Effect::Speak { utterance, .. }) = effects.first().cloned() else {
                panic!("expected Speak");
            };
            controller.handle(SessionEvent::UtteranceFinished { utterance });
        }
        controller.handle(SessionEvent::User(UserAction::Next));
        assert_eq!(controller.phase().kind(), PhaseKind::Finished);
        assert_eq!(controller.session().unwrap().index(), 2);
        assert!(controller.view().progress.is_none());

        controller.handle(SessionEvent::User(UserAction::Reset));
        assert_eq!(controller.phase().kind(), PhaseKind::AwaitingStart);
        assert!(controller.session().is_none());
        assert_eq!(controller.view().question, text::START_PROMPT);
    }
}
