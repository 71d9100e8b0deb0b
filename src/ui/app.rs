//! Desktop front end
//!
//! [`InterviewApp`] implements `eframe::App`. Each frame it picks up the
//! latest view published by the orchestrator, draws the interview page and
//! forwards whatever the user pressed through the [`OrchestratorHandle`].

use crate::integration::{OrchestratorCommand, OrchestratorEvent, OrchestratorHandle};
use crate::speech::AnswerKeyboard;
use crate::ui::panel::{InterviewPanel, PanelState, UiIntent};
use crate::ui::theme::Theme;
use crate::ui::view::InterviewView;
use egui::{self, CentralPanel, RichText, TopBottomPanel};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the window polls for orchestrator updates while idle
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct InterviewApp {
    handle: OrchestratorHandle,
    keyboard: Option<AnswerKeyboard>,
    view: InterviewView,
    panel: PanelState,
    theme: Theme,
    shut_down: bool,
}

impl InterviewApp {
    /// Create the app inside eframe
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        handle: OrchestratorHandle,
        keyboard: Option<AnswerKeyboard>,
    ) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);
        Self::with_theme(handle, keyboard, theme)
    }

    /// Create the app without an eframe context
    pub fn with_theme(
        handle: OrchestratorHandle,
        keyboard: Option<AnswerKeyboard>,
        theme: Theme,
    ) -> Self {
        let view = handle.view();
        Self {
            handle,
            keyboard,
            view,
            panel: PanelState::default(),
            theme,
            shut_down: false,
        }
    }

    /// Latest view this window has drawn
    pub fn view(&self) -> &InterviewView {
        &self.view
    }

    /// Draw one frame and forward the user's input
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.poll_events(ctx);
        self.show_header(ctx);

        let typing = self.keyboard.as_ref().is_some_and(AnswerKeyboard::is_listening);
        let intents = CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                InterviewPanel::new(&self.view, &mut self.panel, &self.theme)
                    .typing(typing)
                    .show(ui)
            })
            .inner;

        for intent in intents {
            self.apply(intent);
        }
    }

    fn poll_events(&mut self, ctx: &egui::Context) {
        while let Some(event) = self.handle.try_recv_event() {
            match event {
                OrchestratorEvent::ViewChanged => {}
                OrchestratorEvent::Shutdown => {
                    info!("Orchestrator stopped, closing window");
                    self.shut_down = true;
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
        // Notifications are dropped when the queue is full, so always re-read
        self.view = self.handle.view();
    }

    fn show_header(&self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Interview Coach")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if let Some((number, total)) = self.view.progress {
                            ui.label(
                                RichText::new(format!("Question {}/{}", number, total))
                                    .color(self.theme.text_secondary),
                            );
                        }
                        if let Some(category) = &self.view.category {
                            ui.label(RichText::new(category).color(self.theme.primary));
                        }
                    });
                });
            });
    }

    fn apply(&mut self, intent: UiIntent) {
        debug!("UI intent: {:?}", intent);
        let sent = match intent {
            UiIntent::Action(action) => self.handle.send_action(action),
            UiIntent::Reload => self.handle.send_command(OrchestratorCommand::ReloadQuestions),
            UiIntent::SubmitAnswer(text) => {
                match &self.keyboard {
                    Some(keyboard) if keyboard.submit(&text) => {}
                    _ => debug!("Typed answer arrived after the capture ended"),
                }
                Ok(())
            }
        };
        if let Err(e) = sent {
            warn!("Failed to reach the orchestrator: {}", e);
        }
    }
}

impl eframe::App for InterviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
        ctx.request_repaint_after(POLL_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.shut_down {
            return;
        }
        if let Err(e) = self.handle.send_command(OrchestratorCommand::Shutdown) {
            debug!("Orchestrator already gone: {}", e);
        }
    }
}
