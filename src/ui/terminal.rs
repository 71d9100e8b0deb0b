//! Console front end
//!
//! Renders the four text regions whenever the orchestrator publishes a new
//! view, and turns typed lines into control presses. While the microphone is
//! active a typed line is the spoken answer; prefix a command with `/` to
//! send it anyway (for example `/mic` to stop or `/reset`).

use crate::integration::{OrchestratorCommand, OrchestratorEvent, OrchestratorHandle};
use crate::session::{PhaseKind, UserAction};
use crate::speech::AnswerKeyboard;
use crate::ui::view::InterviewView;
use crate::{CoachError, Result};
use parking_lot::Mutex;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

const HELP: &str = "Commands: categories | start [category] | mic | next | reset | reload | help | quit";

/// One typed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Help,
    Categories,
    /// Start a session; `None` picks the first category
    Start(Option<String>),
    Mic,
    Next,
    Reset,
    Reload,
    Quit,
}

/// Parse one command line. Leading `/` is accepted and ignored.
pub fn parse_command(line: &str) -> std::result::Result<TerminalCommand, String> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "help" | "?" => TerminalCommand::Help,
        "categories" | "list" => TerminalCommand::Categories,
        "start" => TerminalCommand::Start((!rest.is_empty()).then(|| rest.to_string())),
        "mic" | "answer" => TerminalCommand::Mic,
        "next" => TerminalCommand::Next,
        "reset" => TerminalCommand::Reset,
        "reload" => TerminalCommand::Reload,
        "quit" | "exit" => TerminalCommand::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

/// Render a view snapshot as console text
pub fn render_view(view: &InterviewView) -> String {
    let mut out = String::new();
    let rule = "─".repeat(48);
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!("[{}]", view.phase));
    if let Some(category) = &view.category {
        out.push_str(&format!(" {}", category));
    }
    if let Some((number, total)) = view.progress {
        out.push_str(&format!(" Question {}/{}", number, total));
    }
    out.push('\n');

    if view.controls.category_select && !view.categories.is_empty() {
        out.push_str(&format!("Categories: {}\n", view.categories.join(", ")));
    }
    if !view.question.is_empty() {
        out.push_str(&format!("Question:   {}\n", view.question));
    }
    if !view.transcript.is_empty() {
        out.push_str(&format!("Answer:     {}\n", view.transcript));
    }
    if !view.feedback.is_empty() {
        out.push_str(&format!("Feedback:   {}\n", view.feedback));
    }
    if !view.status.is_empty() {
        out.push_str(&format!("Status:     {}\n", view.status));
    }
    if let Some(error) = &view.error {
        out.push_str(&format!("Error:      {}\n", error));
    }

    let controls = available_controls(view);
    if !controls.is_empty() {
        out.push_str(&format!("> {}\n", controls.join(" | ")));
    }
    out
}

/// Commands currently accepted, in the order they are shown
fn available_controls(view: &InterviewView) -> Vec<&'static str> {
    let mut controls = Vec::new();
    if view.controls.start {
        controls.push("start <category>");
    }
    if view.controls.mic {
        controls.push(if view.controls.mic_active {
            "/mic (stop)"
        } else {
            "mic"
        });
    }
    if view.controls.mic_active {
        controls.push("type your answer");
    }
    if view.controls.next {
        controls.push("next");
    }
    if view.controls.reset {
        controls.push("reset");
    }
    if view.phase == PhaseKind::Idle && view.error.is_some() {
        controls.push("reload");
    }
    controls
}

/// Console front end driving an [`OrchestratorHandle`]
pub struct TerminalApp<W: Write + Send + 'static> {
    handle: OrchestratorHandle,
    keyboard: Option<AnswerKeyboard>,
    out: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> TerminalApp<W> {
    /// `out` may be shared with a speech output writing to the same console
    pub fn new(handle: OrchestratorHandle, out: Arc<Mutex<W>>) -> Self {
        Self {
            handle,
            keyboard: None,
            out,
        }
    }

    /// Route typed lines to this keyboard while it is listening
    pub fn with_keyboard(mut self, keyboard: AnswerKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Run until `quit`, end of input, or orchestrator shutdown
    pub fn run(self, input: impl BufRead) -> Result<()> {
        let renderer = self.spawn_renderer()?;
        self.write_line(HELP);

        for line in input.lines() {
            let line = line.map_err(|e| CoachError::ChannelError(format!("stdin: {}", e)))?;
            if !self.handle_line(&line)? {
                break;
            }
        }

        info!("Terminal input closed, shutting down");
        if let Err(e) = self.handle.send_command(OrchestratorCommand::Shutdown) {
            debug!("Orchestrator already gone: {}", e);
        }
        if renderer.join().is_err() {
            warn!("Render thread panicked");
        }
        Ok(())
    }

    /// Process one typed line. Returns `false` to stop reading input.
    fn handle_line(&self, line: &str) -> Result<bool> {
        let is_command = line.trim_start().starts_with('/');

        if !is_command {
            if let Some(keyboard) = &self.keyboard {
                if keyboard.is_listening() {
                    keyboard.submit(line);
                    return Ok(true);
                }
            }
            if line.trim().is_empty() {
                return Ok(true);
            }
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                self.write_line(&format!("{}. {}", e, HELP));
                return Ok(true);
            }
        };
        debug!("Terminal command: {:?}", command);

        match command {
            TerminalCommand::Help => self.write_line(HELP),
            TerminalCommand::Categories => {
                let view = self.handle.view();
                if view.categories.is_empty() {
                    self.write_line("No categories loaded");
                } else {
                    self.write_line(&view.categories.join("\n"));
                }
            }
            TerminalCommand::Start(category) => {
                let category = category.or_else(|| self.handle.view().categories.first().cloned());
                match category {
                    Some(category) => self.handle.send_action(UserAction::Start { category })?,
                    None => self.write_line("No categories loaded"),
                }
            }
            TerminalCommand::Mic => self.handle.send_action(UserAction::ToggleMic)?,
            TerminalCommand::Next => self.handle.send_action(UserAction::Next)?,
            TerminalCommand::Reset => self.handle.send_action(UserAction::Reset)?,
            TerminalCommand::Reload => self
                .handle
                .send_command(OrchestratorCommand::ReloadQuestions)?,
            TerminalCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn spawn_renderer(&self) -> Result<thread::JoinHandle<()>> {
        let events = self.handle.event_receiver();
        let handle = self.handle.clone();
        let out = Arc::clone(&self.out);

        thread::Builder::new()
            .name("terminal-render".to_string())
            .spawn(move || {
                let mut last: Option<InterviewView> = None;
                while let Ok(event) = events.recv() {
                    match event {
                        OrchestratorEvent::ViewChanged => {
                            let view = handle.view();
                            if last.as_ref() == Some(&view) {
                                continue;
                            }
                            let mut out = out.lock();
                            let _ = write!(out, "{}", render_view(&view)).and_then(|_| out.flush());
                            last = Some(view);
                        }
                        OrchestratorEvent::Shutdown => break,
                    }
                }
                debug!("Render thread exiting");
            })
            .map_err(|e| CoachError::ChannelError(format!("Failed to spawn render thread: {}", e)))
    }

    fn write_line(&self, text: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", text).and_then(|_| out.flush());
    }
}
