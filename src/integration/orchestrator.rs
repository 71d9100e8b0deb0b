//! Orchestrator for the interview session
//!
//! Connects all components: question bank -> controller -> speech output,
//! speech input, answer countdown, feedback pipeline. Adapters report back by
//! posting session events into one channel; the orchestrator thread feeds
//! them through the controller one at a time and executes the effects it
//! returns.

use crate::feedback::{FeedbackBackend, FeedbackPipeline};
use crate::integration::config::InterviewConfig;
use crate::integration::countdown::Countdown;
use crate::questions::QuestionBank;
use crate::session::{
    Effect, EventSink, InterviewController, SessionEvent, Ticket, UserAction,
};
use crate::speech::{SpeechInput, SpeechOutput, TextSpeaker, UnavailableInput, Utterance};
use crate::ui::view::InterviewView;
use crate::{CoachError, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Commands that can be sent to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorCommand {
    /// Forward a control press to the session
    Action(UserAction),

    /// Load the question bank again (recovery after a load error)
    ReloadQuestions,

    /// Shutdown the orchestrator
    Shutdown,
}

/// Notifications emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// A new view snapshot is available
    ViewChanged,

    /// Orchestrator has shut down
    Shutdown,
}

/// Thread-safe latest view of the session
#[derive(Clone, Default)]
pub struct SharedView {
    inner: Arc<RwLock<InterviewView>>,
}

impl SharedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current view (no lock held after return)
    pub fn snapshot(&self) -> InterviewView {
        self.inner.read().clone()
    }

    /// Replace the view, returning whether it changed
    fn publish(&self, view: InterviewView) -> bool {
        let mut current = self.inner.write();
        if *current == view {
            return false;
        }
        *current = view;
        true
    }
}

/// Handle for controlling the orchestrator from a front end
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: Sender<OrchestratorCommand>,
    event_rx: Receiver<OrchestratorEvent>,
    view: SharedView,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub fn send_command(&self, cmd: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| CoachError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Forward a control press
    pub fn send_action(&self, action: UserAction) -> Result<()> {
        self.send_command(OrchestratorCommand::Action(action))
    }

    /// Try to receive an event from the orchestrator
    pub fn try_recv_event(&self) -> Option<OrchestratorEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Get the event receiver
    pub fn event_receiver(&self) -> Receiver<OrchestratorEvent> {
        self.event_rx.clone()
    }

    /// Current view snapshot
    pub fn view(&self) -> InterviewView {
        self.view.snapshot()
    }

    /// Wait until the view satisfies `predicate`, up to `timeout`
    pub fn wait_for_view(
        &self,
        timeout: Duration,
        predicate: impl Fn(&InterviewView) -> bool,
    ) -> Option<InterviewView> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let view = self.view.snapshot();
            if predicate(&view) {
                return Some(view);
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            // Any notification (or the timeout) triggers a re-check
            let _ = self
                .event_rx
                .recv_timeout(remaining.min(Duration::from_millis(20)));
        }
    }
}

/// Main orchestrator that drives one interview session
pub struct Orchestrator {
    config: InterviewConfig,
    controller: InterviewController,

    output: Box<dyn SpeechOutput>,
    input: Box<dyn SpeechInput>,
    feedback: Option<Box<dyn FeedbackBackend>>,

    command_rx: Receiver<OrchestratorCommand>,
    event_tx: Sender<OrchestratorEvent>,

    /// Session events posted by adapters and workers
    session_tx: Sender<SessionEvent>,
    session_rx: Receiver<SessionEvent>,

    countdown: Option<Countdown>,
    view: SharedView,
}

impl Orchestrator {
    /// Sink adapters can use to post events into this session
    pub fn event_sink(&self) -> EventSink {
        EventSink::new(self.session_tx.clone())
    }

    /// Start the orchestrator thread.
    ///
    /// Loads the question bank, then processes commands and adapter events
    /// until shutdown. Returns join handles for the orchestrator thread and
    /// the feedback worker when one was started.
    pub fn start(mut self) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();

        let mut feedback: Box<dyn FeedbackBackend> = match self.feedback.take() {
            Some(backend) => backend,
            None => {
                let pipeline = FeedbackPipeline::new(self.config.feedback.clone());
                let submitter = pipeline.submitter();
                handles.push(pipeline.start_worker(self.event_sink())?);
                info!("Feedback pipeline started");
                Box::new(submitter)
            }
        };

        let orchestrator_handle = thread::Builder::new()
            .name("orchestrator".to_string())
            .spawn(move || {
                info!("Orchestrator started");

                if let Err(e) = self.input.availability() {
                    self.dispatch(
                        SessionEvent::SpeechInputUnavailable {
                            reason: unavailable_reason(e),
                        },
                        &mut *feedback,
                    );
                }
                self.load_questions(&mut *feedback);

                let command_rx = self.command_rx.clone();
                let session_rx = self.session_rx.clone();
                loop {
                    select! {
                        recv(command_rx) -> cmd => match cmd {
                            Ok(OrchestratorCommand::Action(action)) => {
                                self.dispatch(SessionEvent::User(action), &mut *feedback);
                            }
                            Ok(OrchestratorCommand::ReloadQuestions) => {
                                self.load_questions(&mut *feedback);
                            }
                            Ok(OrchestratorCommand::Shutdown) => {
                                info!("Orchestrator shutdown requested");
                                break;
                            }
                            Err(_) => {
                                warn!("Command channel disconnected");
                                break;
                            }
                        },
                        recv(session_rx) -> event => {
                            if let Ok(event) = event {
                                self.dispatch(event, &mut *feedback);
                            }
                        }
                    }
                }

                self.countdown = None;
                feedback.shutdown();
                let _ = self.event_tx.try_send(OrchestratorEvent::Shutdown);
                info!("Orchestrator stopped");
            })
            .map_err(|e| CoachError::ChannelError(format!("failed to spawn orchestrator: {}", e)))?;

        handles.push(orchestrator_handle);
        Ok(handles)
    }

    fn load_questions(&mut self, feedback: &mut dyn FeedbackBackend) {
        let event = match QuestionBank::load(&self.config.questions_path) {
            Ok(bank) => SessionEvent::BankLoaded(bank),
            Err(e) => SessionEvent::BankFailed(e),
        };
        self.dispatch(event, feedback);
    }

    /// Run one event through the controller and execute its effects
    fn dispatch(&mut self, event: SessionEvent, feedback: &mut dyn FeedbackBackend) {
        debug!("Dispatching {:?}", event);
        let effects = self.controller.handle(event);
        for effect in effects {
            self.apply(effect, feedback);
        }

        if self.view.publish(self.controller.view()) {
            let _ = self.event_tx.try_send(OrchestratorEvent::ViewChanged);
        }
    }

    fn apply(&mut self, effect: Effect, feedback: &mut dyn FeedbackBackend) {
        let sink = self.event_sink();
        match effect {
            Effect::Speak { utterance, text } => {
                let request = Utterance::new(text, &self.config.speech);
                if let Err(error) = self.output.speak(utterance, request, &sink) {
                    sink.emit(SessionEvent::UtteranceFailed { utterance, error });
                }
            }
            Effect::StartCapture { activation } => {
                if let Err(e) = self.input.start_capture(activation, &sink) {
                    sink.emit(capture_failure(activation, e));
                }
            }
            Effect::StopCapture { activation } => {
                if let Err(e) = self.input.stop_capture(activation) {
                    warn!("Failed to stop capture {}: {}", activation, e);
                    sink.emit(SessionEvent::CaptureEnded { activation });
                }
            }
            Effect::StartCountdown { activation } => {
                self.countdown = Some(Countdown::start(
                    activation,
                    self.config.session.tick_interval(),
                    sink,
                ));
            }
            Effect::CancelCountdown { activation } => {
                if self
                    .countdown
                    .as_ref()
                    .is_some_and(|c| c.activation() == activation)
                {
                    if let Some(countdown) = self.countdown.take() {
                        countdown.cancel();
                    }
                }
            }
            Effect::RequestFeedback {
                request,
                question,
                answer,
            } => {
                if let Err(error) = feedback.submit(request, question, answer, &sink) {
                    sink.emit(SessionEvent::FeedbackFailed { request, error });
                }
            }
        }
    }
}

fn unavailable_reason(error: CoachError) -> String {
    match error {
        CoachError::CapabilityUnavailable(reason) => reason,
        other => other.to_string(),
    }
}

fn capture_failure(activation: Ticket, error: CoachError) -> SessionEvent {
    match error {
        CoachError::CapabilityUnavailable(reason) => {
            SessionEvent::SpeechInputUnavailable { reason }
        }
        CoachError::RecognitionError(code) => SessionEvent::CaptureError { activation, code },
        other => SessionEvent::CaptureError {
            activation,
            code: other.to_string(),
        },
    }
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    config: InterviewConfig,
    output: Option<Box<dyn SpeechOutput>>,
    input: Option<Box<dyn SpeechInput>>,
    feedback: Option<Box<dyn FeedbackBackend>>,
    seed: Option<u64>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: InterviewConfig::default(),
            output: None,
            input: None,
            feedback: None,
            seed: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: InterviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the question bank path
    pub fn with_questions(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.questions_path = path.into();
        self
    }

    /// Set the feedback endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.feedback.endpoint = endpoint.into();
        self
    }

    /// Use a specific speech output engine
    pub fn with_speech_output(mut self, output: impl SpeechOutput + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Use a specific speech input engine
    pub fn with_speech_input(mut self, input: impl SpeechInput + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Send feedback requests somewhere other than the HTTP pipeline
    pub fn with_feedback_backend(mut self, backend: impl FeedbackBackend + 'static) -> Self {
        self.feedback = Some(Box::new(backend));
        self
    }

    /// Make the question shuffle deterministic
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<(Orchestrator, OrchestratorHandle)> {
        self.config.validate()?;

        let (command_tx, command_rx) = bounded(100);
        let (event_tx, event_rx) = bounded(100);
        let (session_tx, session_rx) = unbounded();
        let view = SharedView::new();

        let controller = match self.seed {
            Some(seed) => InterviewController::with_seed(&self.config.session, seed),
            None => InterviewController::new(&self.config.session),
        };
        view.publish(controller.view());

        let output: Box<dyn SpeechOutput> = self.output.unwrap_or_else(|| {
            Box::new(TextSpeaker::new(
                std::io::stdout(),
                self.config.speech.reading_pace_ms_per_char,
            ))
        });
        let input: Box<dyn SpeechInput> = self
            .input
            .unwrap_or_else(|| Box::new(UnavailableInput::new("no speech recognizer configured")));

        let handle = OrchestratorHandle {
            command_tx,
            event_rx,
            view: view.clone(),
        };

        let orchestrator = Orchestrator {
            config: self.config,
            controller,
            output,
            input,
            feedback: self.feedback,
            command_rx,
            event_tx,
            session_tx,
            session_rx,
            countdown: None,
            view,
        };

        Ok((orchestrator, handle))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
