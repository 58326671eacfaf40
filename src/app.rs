use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::CommandSink;
use crate::backend::HttpBackend;
use crate::backend::HttpCommandSink;
use crate::icons;
use crate::playback::PlaybackCommand;
use crate::playback::SpeedSlider;
use crate::playback::TRACK_MAX_X;
use crate::playback::TRACK_MIN_X;
use crate::scene::ApplyTiming;
use crate::session::ConnectionState;
use crate::session::ConsoleSession;
use crate::settings::ConsoleSettings;
use crate::sync::SyncConfig;
use crate::sync::SyncHandle;
use crate::sync::launch_sync_loop;
use crate::ui::scene_view;

const NOTICE_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TimedMessage {
    pub message: String,
    pub expiration: Instant,
}

impl TimedMessage {
    pub fn new(message: String) -> Self {
        TimedMessage { message, expiration: Instant::now() + NOTICE_LIFETIME }
    }

    pub fn is_expired(&self) -> bool {
        self.expiration < Instant::now()
    }
}

pub type SharedTimedMessage = Arc<RwLock<Option<TimedMessage>>>;

#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct DotBotsConsoleApp {
    pub(crate) settings: ConsoleSettings,

    #[serde(skip)]
    pub(crate) session: ConsoleSession,

    #[serde(skip)]
    sync: Option<SyncHandle>,

    #[serde(skip)]
    commands: Option<Box<dyn CommandSink>>,

    #[serde(skip)]
    pub(crate) timed_message: SharedTimedMessage,

    /// Edited copy of the settings while the settings window is open.
    #[serde(skip)]
    pub(crate) settings_draft: Option<ConsoleSettings>,

    #[serde(skip)]
    egui_ctx: Option<egui::Context>,
}

impl Default for DotBotsConsoleApp {
    fn default() -> Self {
        let settings = ConsoleSettings::default();
        let session = ConsoleSession::new(settings.viewport_margin, slider_for(&settings));
        Self {
            settings,
            session,
            sync: None,
            commands: None,
            timed_message: Arc::new(RwLock::new(None)),
            settings_draft: None,
            egui_ctx: None,
        }
    }
}

fn slider_for(settings: &ConsoleSettings) -> SpeedSlider {
    SpeedSlider::new(TRACK_MIN_X, TRACK_MAX_X, settings.speed_min, settings.speed_max)
}

impl DotBotsConsoleApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Include phosphor icons
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Load previous app state (if any). A state that no longer deserializes falls back to defaults.
        let mut state: Self = match cc.storage {
            Some(storage) => eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default(),
            None => Default::default(),
        };
        state.settings.sanitize();
        state.session = ConsoleSession::new(state.settings.viewport_margin, slider_for(&state.settings));
        state.egui_ctx = Some(cc.egui_ctx.clone());

        state.connect();
        state
    }

    /// (Re)start the sync loop and command worker against the configured backend.
    ///
    /// Whatever was drawn belongs to the previous world and is dropped; the projection is
    /// re-derived once the new floorplan arrives.
    pub(crate) fn connect(&mut self) {
        if let Some(sync) = self.sync.take() {
            sync.stop();
        }
        self.commands = None;
        self.session.reset(self.settings.viewport_margin);
        let (min_speed, max_speed) = (self.settings.speed_min, self.settings.speed_max);
        self.session.slider_mut().set_speed_bounds(min_speed, max_speed);

        let backend = match HttpBackend::new(&self.settings.backend_url, self.settings.request_timeout()) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "could not build HTTP client");
                *self.timed_message.write() = Some(TimedMessage::new(format!("{} {}", icons::X_CIRCLE, e)));
                return;
            }
        };
        info!(backend_url = backend.base_url(), interval_ms = self.settings.poll_interval().as_millis() as u64, "connecting");

        let config = SyncConfig { poll_interval: self.settings.poll_interval() };
        self.sync = Some(launch_sync_loop(backend.clone(), config, self.egui_ctx.clone()));

        let timed_message = Arc::clone(&self.timed_message);
        let repaint = self.egui_ctx.clone();
        self.commands = Some(Box::new(HttpCommandSink::spawn(backend, move |command, error| {
            *timed_message.write() =
                Some(TimedMessage::new(format!("{} {} failed: {}", icons::WARNING, command.describe(), error)));
            if let Some(ctx) = &repaint {
                ctx.request_repaint();
            }
        })));
    }

    pub(crate) fn apply_settings(&mut self, mut settings: ConsoleSettings) {
        settings.sanitize();
        debug!(?settings, "applying settings");
        self.settings = settings;
        self.connect();
    }

    /// Hand a command to the backend. The mode indicators only change once a snapshot reports it.
    pub(crate) fn dispatch(&self, command: PlaybackCommand) {
        match &self.commands {
            Some(commands) => {
                debug!(?command, "dispatching command");
                commands.dispatch(command);
            }
            None => warn!(?command, "no backend connection, dropping command"),
        }
    }

    pub(crate) fn refresh_now(&self) {
        if let Some(sync) = &self.sync {
            sync.refresh_now();
        }
    }

    /// Apply everything the sync loop produced since the last frame, in arrival order.
    fn drain_sync_events(&mut self, ctx: &egui::Context) {
        let Some(sync) = &self.sync else {
            return;
        };
        let events = sync.drain_events();
        if events.is_empty() {
            return;
        }
        let viewport_width = ctx.available_rect().width();
        let timing = ApplyTiming { now: ctx.input(|i| i.time), transition_secs: self.settings.transition_secs() };
        for event in events {
            self.session.handle_event(event, viewport_width, timing);
        }
    }

    fn handle_shortcuts(&self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (pause, step, fast_forward, refresh) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::Period),
                i.key_pressed(egui::Key::F),
                i.key_pressed(egui::Key::R),
            )
        });
        if pause {
            self.dispatch(PlaybackCommand::Pause);
        }
        if step {
            self.dispatch(PlaybackCommand::StepOnce);
        }
        if fast_forward {
            self.dispatch(PlaybackCommand::FastForward);
        }
        if refresh {
            self.refresh_now();
        }
    }

    fn build_bottom_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.session.connection() {
                ConnectionState::Connecting => {
                    ui.label(format!("{} Connecting to {}", icons::PLUGS, self.settings.backend_url));
                }
                ConnectionState::Live => {
                    ui.label(format!("{} Live, {} snapshots", icons::CHECK_CIRCLE, self.session.snapshots_applied()));
                }
                ConnectionState::Unreachable { failures, last_error } => {
                    ui.colored_label(
                        egui::Color32::LIGHT_RED,
                        format!("{} Backend unreachable ({} failures)", icons::WARNING, failures),
                    )
                    .on_hover_text(last_error.as_str());
                }
            }

            let issues = self.session.last_issues();
            if !issues.is_empty() {
                let details = issues.iter().map(|issue| format!("{}: {}", issue.field, issue.reason)).collect::<Vec<_>>().join("\n");
                ui.weak(format!("{} {} fields degraded", icons::WARNING_CIRCLE, issues.len())).on_hover_text(details);
            }

            ui.separator();

            let reset_message = if let Some(timed_message) = &*self.timed_message.read() {
                if !timed_message.is_expired() {
                    ui.label(timed_message.message.as_str());
                    false
                } else {
                    true
                }
            } else {
                false
            };

            if reset_message {
                *self.timed_message.write() = None;
            }
        });
    }
}

impl eframe::App for DotBotsConsoleApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_sync_events(ctx);
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.heading(crate::APP_NAME);
                ui.separator();
                if ui.button(crate::icon_str!(icons::ARROWS_CLOCKWISE, "Refresh")).on_hover_text("Fetch a snapshot now (R)").clicked() {
                    self.refresh_now();
                }
                if ui.button(crate::icon_str!(icons::GEAR_FINE, "Settings")).clicked() && self.settings_draft.is_none() {
                    self.settings_draft = Some(self.settings.clone());
                }
            });
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            self.build_bottom_panel(ui);
        });

        egui::TopBottomPanel::bottom("control_bar").show(ctx, |ui| {
            self.build_control_bar(ui);
        });

        egui::CentralPanel::default().frame(egui::Frame::NONE.fill(ctx.style().visuals.panel_fill)).show(ctx, |ui| {
            scene_view::show_scene(ui, &self.session);
        });

        self.show_settings_window(ctx);

        // Ensure we update at least every second
        ctx.request_repaint_after_secs(1.0);
    }
}
