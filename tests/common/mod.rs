//! Shared fixtures for orchestrator-level tests
#![allow(dead_code)]

use interview_coach::feedback::FeedbackBackend;
use interview_coach::integration::{
    InterviewConfig, OrchestratorBuilder, OrchestratorCommand, OrchestratorHandle,
};
use interview_coach::session::{EventSink, SessionEvent, Ticket};
use interview_coach::speech::{SpeechInput, SpeechOutput, Utterance};
use interview_coach::ui::InterviewView;
use interview_coach::{CoachError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const WAIT: Duration = Duration::from_secs(5);

/// Speech output that finishes every utterance immediately
#[derive(Clone, Default)]
pub struct InstantSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl InstantSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl SpeechOutput for InstantSpeaker {
    fn speak(&mut self, utterance: Ticket, request: Utterance, sink: &EventSink) -> Result<()> {
        self.spoken.lock().push(request.text);
        sink.emit(SessionEvent::UtteranceFinished { utterance });
        Ok(())
    }
}

#[derive(Default)]
struct MicState {
    active: Option<Ticket>,
    sink: Option<EventSink>,
    starts: Vec<Ticket>,
    stops: Vec<Ticket>,
}

/// Recognizer driven by the test: it confirms starts, records stops, and
/// reports whatever the test scripts through [`Microphone`]
#[derive(Clone, Default)]
pub struct Microphone {
    state: Arc<Mutex<MicState>>,
}

impl Microphone {
    pub fn active(&self) -> Option<Ticket> {
        self.state.lock().active
    }

    pub fn starts(&self) -> Vec<Ticket> {
        self.state.lock().starts.clone()
    }

    pub fn stops(&self) -> Vec<Ticket> {
        self.state.lock().stops.clone()
    }

    /// Deliver a final transcript for the running capture
    pub fn say(&self, transcript: &str) {
        self.finish(|activation| SessionEvent::CaptureResult {
            activation,
            transcript: transcript.to_string(),
        });
    }

    /// Fail the running capture with a recognition error code
    pub fn fail(&self, code: &str) {
        self.finish(|activation| SessionEvent::CaptureError {
            activation,
            code: code.to_string(),
        });
    }

    /// End the running capture without a result
    pub fn end(&self) {
        self.finish(|activation| SessionEvent::CaptureEnded { activation });
    }

    /// Post an event for any activation, live or not
    pub fn inject(&self, event: SessionEvent) {
        let sink = self.state.lock().sink.clone();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    fn finish(&self, event: impl FnOnce(Ticket) -> SessionEvent) {
        let mut state = self.state.lock();
        let activation = state.active.take().expect("no capture running");
        if let Some(sink) = &state.sink {
            sink.emit(event(activation));
        }
    }
}

impl SpeechInput for Microphone {
    fn start_capture(&mut self, activation: Ticket, sink: &EventSink) -> Result<()> {
        let mut state = self.state.lock();
        state.active = Some(activation);
        state.sink = Some(sink.clone());
        state.starts.push(activation);
        sink.emit(SessionEvent::CaptureStarted { activation });
        Ok(())
    }

    fn stop_capture(&mut self, activation: Ticket) -> Result<()> {
        self.state.lock().stops.push(activation);
        Ok(())
    }
}

/// Feedback backend answering from a script (default: "ok")
#[derive(Clone, Default)]
pub struct ScriptedFeedback {
    replies: Arc<Mutex<VecDeque<std::result::Result<String, CoachError>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedFeedback {
    pub fn reply(self, outcome: std::result::Result<String, CoachError>) -> Self {
        self.replies.lock().push_back(outcome);
        self
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }
}

impl FeedbackBackend for ScriptedFeedback {
    fn submit(
        &mut self,
        request: Ticket,
        question: String,
        answer: String,
        sink: &EventSink,
    ) -> Result<()> {
        self.requests.lock().push((question, answer));
        let outcome = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()));
        sink.emit(match outcome {
            Ok(feedback) => SessionEvent::FeedbackReady { request, feedback },
            Err(error) => SessionEvent::FeedbackFailed { request, error },
        });
        Ok(())
    }
}

pub fn write_bank(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write bank");
    file
}

/// Test configuration: fast countdown ticks, no time limit unless set
pub fn config(bank: &NamedTempFile) -> InterviewConfig {
    let mut config = InterviewConfig::default()
        .with_questions(bank.path())
        .without_time_limit();
    config.session.countdown_tick_ms = 20;
    config
}

/// A running orchestrator with scripted adapters
pub struct Harness {
    pub handle: OrchestratorHandle,
    pub speaker: InstantSpeaker,
    pub mic: Microphone,
    workers: Vec<JoinHandle<()>>,
}

impl Harness {
    pub fn start(config: InterviewConfig, feedback: Option<ScriptedFeedback>) -> Self {
        let speaker = InstantSpeaker::default();
        let mic = Microphone::default();

        let mut builder = OrchestratorBuilder::new()
            .with_config(config)
            .with_speech_output(speaker.clone())
            .with_speech_input(mic.clone())
            .with_seed(7);
        if let Some(feedback) = feedback {
            builder = builder.with_feedback_backend(feedback);
        }

        let (orchestrator, handle) = builder.build().expect("build orchestrator");
        let workers = orchestrator.start().expect("start orchestrator");

        Self {
            handle,
            speaker,
            mic,
            workers,
        }
    }

    /// Wait for a view matching `predicate`, panicking with the last view
    pub fn wait(&self, what: &str, predicate: impl Fn(&InterviewView) -> bool) -> InterviewView {
        match self.handle.wait_for_view(WAIT, predicate) {
            Some(view) => view,
            None => panic!("timed out waiting for {}: {:#?}", what, self.handle.view()),
        }
    }

    pub fn shutdown(self) {
        self.handle
            .send_command(OrchestratorCommand::Shutdown)
            .expect("send shutdown");
        for worker in self.workers {
            worker.join().expect("worker panicked");
        }
    }
}
