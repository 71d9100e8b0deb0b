//! The four text regions: question, answer transcript, feedback, status

use crate::ui::theme::Theme;
use crate::ui::view::InterviewView;
use egui::{self, Color32, RichText};

pub struct SessionRegions<'a> {
    view: &'a InterviewView,
    theme: &'a Theme,
}

impl<'a> SessionRegions<'a> {
    pub fn new(view: &'a InterviewView, theme: &'a Theme) -> Self {
        Self { view, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let view = self.view;
        let theme = self.theme;

        region(ui, theme, "Question", &view.question, theme.text_primary, 18.0);

        if view.controls.session_visible {
            region(
                ui,
                theme,
                "Answer transcript",
                &view.transcript,
                theme.text_secondary,
                15.0,
            );
            region(ui, theme, "Feedback", &view.feedback, theme.success, 15.0);
        }

        let status_color = if view.controls.mic_active {
            theme.recording
        } else {
            theme.text_muted
        };
        region(ui, theme, "Status", &view.status, status_color, 13.0);

        if let Some(error) = &view.error {
            let text = format!("Error: {}", error);
            let response = ui.label(RichText::new(&text).color(theme.error));
            response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &text));
        }
    }
}

fn region(ui: &mut egui::Ui, theme: &Theme, title: &str, body: &str, color: Color32, size: f32) {
    egui::Frame::none()
        .fill(theme.bg_secondary)
        .rounding(theme.card_rounding)
        .inner_margin(theme.spacing_sm)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(title).size(11.0).color(theme.text_muted));
            let response = ui.label(RichText::new(body).size(size).color(color));
            let label = format!("{}: {}", title, body);
            response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label));
        });
    ui.add_space(theme.spacing_sm);
}
