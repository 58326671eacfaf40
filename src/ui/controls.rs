use egui::Align2;
use egui::Color32;
use egui::CornerRadius;
use egui::FontId;
use egui::Id;
use egui::LayerId;
use egui::Order;
use egui::Pos2;
use egui::Rect;
use egui::Sense;
use egui::Vec2;

use crate::app::DotBotsConsoleApp;
use crate::icons;
use crate::model::PlaybackMode;
use crate::playback::PlaybackCommand;

const HANDLE_SIZE: f32 = 28.0;
const TRACK_HEIGHT: f32 = 6.0;
const TRACK_HOVER_OPACITY: f32 = 0.30;
const TRACK_IDLE_OPACITY: f32 = 0.10;
const ICON_FONT_SIZE: f32 = 18.0;

pub const PAUSE_TOOLTIP: &str = "Pause the simulation.";
pub const STEP_TOOLTIP: &str = "Advance the simulation by one event.";
pub const PLAY_TOOLTIP: &str = "Drag to set the play speed.";
pub const FAST_FORWARD_TOOLTIP: &str = "Simulate as fast as possible.";

/// Maps between slider track coordinates and screen x for the track allocated this frame.
#[derive(Debug, Clone, Copy)]
struct TrackGeometry {
    /// Screen x of the track's `min_x`.
    left: f32,
    min_x: f32,
}

impl TrackGeometry {
    fn to_track(self, screen_x: f32) -> f32 {
        screen_x - self.left + self.min_x
    }

    fn to_screen(self, track_x: f32) -> f32 {
        track_x - self.min_x + self.left
    }
}

fn track_opacity(hovered: bool) -> f32 {
    if hovered { TRACK_HOVER_OPACITY } else { TRACK_IDLE_OPACITY }
}

impl DotBotsConsoleApp {
    pub(crate) fn build_control_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 10.0;

            if self.mode_button(ui, PlaybackMode::Paused, icons::PAUSE, PAUSE_TOOLTIP) {
                self.dispatch(PlaybackCommand::Pause);
            }
            if self.mode_button(ui, PlaybackMode::SteppingOneFrame, icons::SKIP_FORWARD, STEP_TOOLTIP) {
                self.dispatch(PlaybackCommand::StepOnce);
            }

            if let Some(command) = self.speed_slider(ui) {
                self.dispatch(command);
            }

            if self.mode_button(ui, PlaybackMode::FastForwarding, icons::FAST_FORWARD, FAST_FORWARD_TOOLTIP) {
                self.dispatch(PlaybackCommand::FastForward);
            }

            ui.separator();
            ui.monospace(self.session.simulated_time().unwrap_or("--"));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(format!("v{}", env!("CARGO_PKG_VERSION")));
            });
        });
    }

    /// One-shot command button, dimmed unless the backend reports `mode`.
    fn mode_button(&self, ui: &mut egui::Ui, mode: PlaybackMode, icon: &str, tooltip: &str) -> bool {
        let opacity = self.session.mode_opacity(mode);
        ui.scope(|ui| {
            ui.set_opacity(opacity);
            ui.add(egui::Button::new(egui::RichText::new(icon).size(ICON_FONT_SIZE))).on_hover_text(tooltip).clicked()
        })
        .inner
    }

    /// The play button doubles as the handle of a speed slider. Returns the command committed on release.
    fn speed_slider(&mut self, ui: &mut egui::Ui) -> Option<PlaybackCommand> {
        let opacity = self.session.mode_opacity(PlaybackMode::Playing);
        let slider = self.session.slider_mut();
        let span = slider.max_x() - slider.min_x();

        let (rect, _) = ui.allocate_exact_size(Vec2::new(span + HANDLE_SIZE, HANDLE_SIZE), Sense::hover());
        let geometry = TrackGeometry { left: rect.left() + HANDLE_SIZE / 2.0, min_x: slider.min_x() };

        let handle_rect = |track_x: f32| {
            Rect::from_center_size(Pos2::new(geometry.to_screen(track_x), rect.center().y), Vec2::splat(HANDLE_SIZE))
        };
        let handle_id = ui.id().with("speed_handle");
        let response =
            ui.interact(handle_rect(slider.handle_x()), handle_id, Sense::drag()).on_hover_text(PLAY_TOOLTIP);

        let mut committed = None;
        let mut tooltip = None;
        if response.drag_started() {
            slider.press();
        }
        if slider.is_dragging() {
            // egui keeps routing the drag to this id even once the pointer leaves the handle.
            if response.dragged() {
                if let Some(pointer) = ui.ctx().pointer_interact_pos() {
                    tooltip = slider.drag_to(geometry.to_track(pointer.x));
                }
            } else {
                committed = slider.release();
            }
        }

        let hovered = ui.rect_contains_pointer(rect) || response.hovered() || slider.is_dragging();
        let track = Rect::from_center_size(rect.center(), Vec2::new(span, TRACK_HEIGHT));
        let handle = handle_rect(slider.handle_x());
        let painter = ui.painter();
        painter.rect_filled(track, CornerRadius::same(3), Color32::WHITE.gamma_multiply(track_opacity(hovered)));

        let visuals = ui.style().interact(&response);
        let fill = visuals.bg_fill.gamma_multiply(opacity);
        painter.circle_filled(handle.center(), HANDLE_SIZE / 2.0, fill);
        painter.text(
            handle.center(),
            Align2::CENTER_CENTER,
            icons::PLAY,
            FontId::proportional(ICON_FONT_SIZE),
            visuals.fg_stroke.color.gamma_multiply(opacity),
        );

        if let Some(feedback) = tooltip {
            let layer = LayerId::new(Order::Tooltip, Id::new("speed_tooltip"));
            ui.ctx().layer_painter(layer).text(
                Pos2::new(geometry.to_screen(feedback.handle_x), handle.top() - 4.0),
                Align2::CENTER_BOTTOM,
                feedback.tooltip(),
                FontId::proportional(13.0),
                Color32::WHITE,
            );
        }

        committed
    }
}
