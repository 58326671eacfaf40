use crate::app::DotBotsConsoleApp;
use crate::icon_str;
use crate::icons;
use crate::settings::MAX_POLL_INTERVAL_MS;
use crate::settings::MIN_POLL_INTERVAL_MS;

impl DotBotsConsoleApp {
    pub(crate) fn show_settings_window(&mut self, ctx: &egui::Context) {
        let Some(draft) = self.settings_draft.as_mut() else {
            return;
        };

        let mut open = true;
        let mut apply = false;
        let mut cancel = false;
        egui::Window::new("Settings").open(&mut open).collapsible(false).resizable(false).show(ctx, |ui| {
            ui.label("Backend");
            ui.group(|ui| {
                egui::Grid::new("backend_settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("URL");
                    ui.add(egui::TextEdit::singleline(&mut draft.backend_url).hint_text("http://127.0.0.1:8080"));
                    ui.end_row();

                    ui.label("Poll interval (ms)");
                    ui.add(egui::Slider::new(&mut draft.poll_interval_ms, MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS));
                    ui.end_row();

                    ui.label("Request timeout (ms)");
                    ui.add(egui::DragValue::new(&mut draft.request_timeout_ms).range(100..=60_000));
                    ui.end_row();
                });
            });

            ui.label("Display");
            ui.group(|ui| {
                egui::Grid::new("display_settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Viewport margin (px)");
                    ui.add(egui::DragValue::new(&mut draft.viewport_margin).range(0.0..=200.0));
                    ui.end_row();

                    ui.label("Speed range");
                    ui.horizontal(|ui| {
                        ui.add(egui::DragValue::new(&mut draft.speed_min).range(0.1..=100.0).speed(0.1));
                        ui.label("to");
                        ui.add(egui::DragValue::new(&mut draft.speed_max).range(0.1..=100.0).speed(0.1));
                    });
                    ui.end_row();
                });
                ui.checkbox(&mut draft.animate_transitions, "Animate robot movement");
            });

            ui.add_space(4.0);
            ui.label("Applying reconnects and reloads the floorplan.");
            ui.horizontal(|ui| {
                if ui.button(icon_str!(icons::ARROWS_CLOCKWISE, "Apply & Reconnect")).clicked() {
                    apply = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

        let applied = apply.then(|| draft.clone());
        if let Some(settings) = applied {
            self.settings_draft = None;
            self.apply_settings(settings);
        } else if cancel || !open {
            self.settings_draft = None;
        }
    }
}
