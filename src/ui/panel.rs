//! The interview page as one egui component
//!
//! [`InterviewPanel`] only draws a view snapshot and reports what the user
//! pressed; the caller decides where intents go. This keeps the page
//! testable without a running orchestrator.

use crate::session::UserAction;
use crate::ui::components::{AnswerInput, ControlBar, SessionRegions};
use crate::ui::theme::Theme;
use crate::ui::view::InterviewView;

/// Something the user asked for during a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiIntent {
    /// A control press for the session
    Action(UserAction),
    /// Load the question bank again
    Reload,
    /// A typed answer for the keyboard recognizer
    SubmitAnswer(String),
}

/// Widget state that lives across frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    /// Selected category in the picker
    pub category: String,
    /// Typed answer being edited
    pub answer: String,
}

impl PanelState {
    /// Keep the selection on a category that exists
    pub fn sync_categories(&mut self, categories: &[String]) {
        if !categories.contains(&self.category) {
            self.category = categories.first().cloned().unwrap_or_default();
        }
    }
}

pub struct InterviewPanel<'a> {
    view: &'a InterviewView,
    state: &'a mut PanelState,
    theme: &'a Theme,
    typing: bool,
}

impl<'a> InterviewPanel<'a> {
    pub fn new(view: &'a InterviewView, state: &'a mut PanelState, theme: &'a Theme) -> Self {
        Self {
            view,
            state,
            theme,
            typing: false,
        }
    }

    /// Show the typed answer box
    pub fn typing(mut self, typing: bool) -> Self {
        self.typing = typing;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Vec<UiIntent> {
        let mut intents = Vec::new();
        self.state.sync_categories(&self.view.categories);

        ControlBar::new(self.view, &mut *self.state, self.theme).show(ui, &mut intents);
        ui.add_space(self.theme.spacing_sm);

        if self.typing {
            AnswerInput::new(&mut *self.state, self.theme).show(ui, &mut intents);
            ui.add_space(self.theme.spacing_sm);
        }

        egui::ScrollArea::vertical()
            .id_salt("session_regions")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                SessionRegions::new(self.view, self.theme).show(ui);
            });

        intents
    }
}
