//! Render model for the UI surface
//!
//! Everything here is derived from controller state; front ends only read it.

use crate::session::PhaseKind;

/// Enablement of every control on the page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub start: bool,
    pub category_select: bool,
    /// Mic control can be pressed (starts, or stops while listening)
    pub mic: bool,
    /// The microphone is capturing
    pub mic_active: bool,
    pub next: bool,
    pub reset: bool,
    /// The session area (question/answer/feedback) is shown
    pub session_visible: bool,
}

/// Snapshot of the whole UI surface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterviewView {
    pub phase: PhaseKind,
    /// Category of the running session
    pub category: Option<String>,
    pub categories: Vec<String>,
    pub question: String,
    pub transcript: String,
    pub feedback: String,
    pub status: String,
    pub error: Option<String>,
    pub controls: Controls,
    /// (1-based question number, total) while a session runs
    pub progress: Option<(usize, usize)>,
}

impl InterviewView {
    /// Label for the mic control
    pub fn mic_label(&self) -> &'static str {
        if self.controls.mic_active {
            "Answering... (press to stop)"
        } else {
            "Answer"
        }
    }
}
