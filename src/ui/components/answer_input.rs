//! Typed answer box, shown while a keyboard recognizer is listening

use crate::ui::panel::{PanelState, UiIntent};
use crate::ui::theme::Theme;
use egui::{self, Key};

pub struct AnswerInput<'a> {
    state: &'a mut PanelState,
    theme: &'a Theme,
}

impl<'a> AnswerInput<'a> {
    pub fn new(state: &'a mut PanelState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui, intents: &mut Vec<UiIntent>) {
        let Self { state, theme } = self;

        ui.horizontal(|ui| {
            let text_edit = egui::TextEdit::singleline(&mut state.answer)
                .hint_text("Type your answer and press Enter")
                .desired_width(ui.available_width() - 96.0)
                .id(egui::Id::new("typed_answer"));
            let response = ui.add(text_edit);
            response.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Typed answer")
            });
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));

            let submit = ui.add(egui::Button::new("Submit").rounding(theme.button_rounding));
            submit.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Submit answer")
            });

            // An empty submission ends the capture without a result
            if entered || submit.clicked() {
                intents.push(UiIntent::SubmitAnswer(std::mem::take(&mut state.answer)));
            }
        });
    }
}
