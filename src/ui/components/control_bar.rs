//! Category picker and the start / mic / next / reset buttons
//!
//! Every button's enablement comes straight from [`Controls`]; a click on a
//! disabled control never produces an intent.

use crate::session::{PhaseKind, UserAction};
use crate::ui::panel::{PanelState, UiIntent};
use crate::ui::theme::Theme;
use crate::ui::view::{Controls, InterviewView};
use egui::{self, RichText, Vec2};

pub struct ControlBar<'a> {
    view: &'a InterviewView,
    state: &'a mut PanelState,
    theme: &'a Theme,
}

impl<'a> ControlBar<'a> {
    pub fn new(view: &'a InterviewView, state: &'a mut PanelState, theme: &'a Theme) -> Self {
        Self { view, state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui, intents: &mut Vec<UiIntent>) {
        let Self { view, state, theme } = self;
        let controls: Controls = view.controls;

        egui::Frame::none()
            .fill(theme.bg_secondary)
            .rounding(theme.card_rounding)
            .inner_margin(theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    let picker = ui.add_enabled_ui(controls.category_select, |ui| {
                        egui::ComboBox::from_id_salt("category_select")
                            .selected_text(state.category.as_str())
                            .show_ui(ui, |ui| {
                                for category in &view.categories {
                                    ui.selectable_value(
                                        &mut state.category,
                                        category.clone(),
                                        category.as_str(),
                                    );
                                }
                            })
                    });
                    picker.inner.response.widget_info(|| {
                        egui::WidgetInfo::labeled(
                            egui::WidgetType::ComboBox,
                            controls.category_select,
                            "Category",
                        )
                    });

                    let can_start = controls.start && !state.category.is_empty();
                    if button(ui, theme, can_start, RichText::new("Start"), "Start interview") {
                        intents.push(UiIntent::Action(UserAction::Start {
                            category: state.category.clone(),
                        }));
                    }

                    ui.add_space(theme.spacing_sm);

                    let mic_text = if controls.mic_active {
                        RichText::new(view.mic_label()).color(theme.recording).strong()
                    } else {
                        RichText::new(view.mic_label())
                    };
                    if button(ui, theme, controls.mic, mic_text, view.mic_label()) {
                        intents.push(UiIntent::Action(UserAction::ToggleMic));
                    }

                    if button(ui, theme, controls.next, RichText::new("Next"), "Next question") {
                        intents.push(UiIntent::Action(UserAction::Next));
                    }

                    if button(ui, theme, controls.reset, RichText::new("Reset"), "Reset interview")
                    {
                        intents.push(UiIntent::Action(UserAction::Reset));
                    }

                    // Only offered while nothing is loaded
                    let reload = view.phase == PhaseKind::Idle && view.error.is_some();
                    if reload && button(ui, theme, true, RichText::new("Reload"), "Reload questions")
                    {
                        intents.push(UiIntent::Reload);
                    }
                });
            });
    }
}

/// Draw one labeled button; true only for a click on an enabled button
fn button(
    ui: &mut egui::Ui,
    theme: &Theme,
    enabled: bool,
    text: RichText,
    label: &str,
) -> bool {
    let widget = egui::Button::new(text)
        .min_size(Vec2::new(72.0, 28.0))
        .rounding(theme.button_rounding);
    let response = ui.add_enabled(enabled, widget);
    response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, label));
    enabled && response.clicked()
}
