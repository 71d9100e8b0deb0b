//! User interface
//!
//! [`view`] holds the render model derived from the controller. Two front
//! ends draw it: the desktop window in [`app`] (egui) and the console in
//! [`terminal`].

pub mod app;
pub mod components;
pub mod panel;
pub mod terminal;
pub mod theme;
pub mod view;

pub use app::InterviewApp;
pub use panel::{InterviewPanel, PanelState, UiIntent};
pub use terminal::{parse_command, render_view, TerminalApp, TerminalCommand};
pub use theme::Theme;
pub use view::{Controls, InterviewView};
