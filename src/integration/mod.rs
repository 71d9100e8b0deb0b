//! Integration layer
//!
//! Wires the controller to the speech adapters, the feedback pipeline and
//! the answer countdown, and publishes the view for front ends.

pub mod config;
pub mod countdown;
pub mod orchestrator;

pub use config::{AudioConfig, FeedbackConfig, InterviewConfig, SessionConfig, SpeechConfig};
pub use countdown::Countdown;
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, OrchestratorCommand, OrchestratorEvent, OrchestratorHandle,
    SharedView,
};
