use serde_json::Value;
use serde_json::json;


/// Default track bounds of the speed slider, in control-bar pixels.
pub const TRACK_MIN_X: f32 = 175.0;
pub const TRACK_MAX_X: f32 = 285.0;

pub const DEFAULT_MIN_SPEED: f64 = 1.0;
pub const DEFAULT_MAX_SPEED: f64 = 10.0;

/// Outbound operator intents. How they reach the backend is up to the [`crate::backend::CommandSink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Pause,
    StepOnce,
    FastForward,
    SetSpeed(f64),
}

impl PlaybackCommand {
    pub fn endpoint(&self) -> &'static str {
        match self {
            PlaybackCommand::Pause => "/pause",
            PlaybackCommand::StepOnce => "/frameforward",
            PlaybackCommand::FastForward => "/fastforward",
            PlaybackCommand::SetSpeed(_) => "/play",
        }
    }

    /// JSON body to post, if the endpoint takes one.
    pub fn body(&self) -> Option<Value> {
        match self {
            PlaybackCommand::SetSpeed(speed) => Some(json!({ "speed": speed })),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PlaybackCommand::Pause => "Pause".to_string(),
            PlaybackCommand::StepOnce => "Step".to_string(),
            PlaybackCommand::FastForward => "Fast forward".to_string(),
            PlaybackCommand::SetSpeed(speed) => format!("Play at {speed:.1}x"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Idle,
    Dragging,
}

/// Live feedback for one pointer move while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFeedback {
    /// Clamped handle position, in track coordinates.
    pub handle_x: f32,
    /// Rounded speed for the tooltip.
    pub display_speed: i64,
}

impl DragFeedback {
    pub fn tooltip(&self) -> String {
        format!("{} x", self.display_speed)
    }
}

/// Drag gesture on the play button, turned into a bounded play speed.
///
/// The slider is `Idle` until pressed, then `Dragging` until released. Moves only reposition
/// the handle; the single [`PlaybackCommand::SetSpeed`] is produced on release, computed from
/// where the handle came to rest.
#[derive(Debug, Clone)]
pub struct SpeedSlider {
    min_x: f32,
    max_x: f32,
    min_speed: f64,
    max_speed: f64,
    handle_x: f32,
    state: DragState,
}

impl Default for SpeedSlider {
    fn default() -> Self {
        Self::new(TRACK_MIN_X, TRACK_MAX_X, DEFAULT_MIN_SPEED, DEFAULT_MAX_SPEED)
    }
}

impl SpeedSlider {
    pub fn new(min_x: f32, max_x: f32, min_speed: f64, max_speed: f64) -> Self {
        let (min_x, max_x) = if min_x <= max_x { (min_x, max_x) } else { (max_x, min_x) };
        let (min_speed, max_speed) = if min_speed <= max_speed { (min_speed, max_speed) } else { (max_speed, min_speed) };
        Self { min_x, max_x, min_speed, max_speed, handle_x: min_x, state: DragState::Idle }
    }

    pub fn min_x(&self) -> f32 {
        self.min_x
    }

    pub fn max_x(&self) -> f32 {
        self.max_x
    }

    pub fn handle_x(&self) -> f32 {
        self.handle_x
    }

    pub fn speed_bounds(&self) -> (f64, f64) {
        (self.min_speed, self.max_speed)
    }

    /// Replace the speed bounds. The handle keeps its position.
    pub fn set_speed_bounds(&mut self, min_speed: f64, max_speed: f64) {
        let fresh = Self::new(self.min_x, self.max_x, min_speed, max_speed);
        self.min_speed = fresh.min_speed;
        self.max_speed = fresh.max_speed;
    }

    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    /// Pointer went down on the handle. Returns false if a drag is already active.
    pub fn press(&mut self) -> bool {
        match self.state {
            DragState::Idle => {
                self.state = DragState::Dragging;
                true
            }
            DragState::Dragging => false,
        }
    }

    /// Pointer moved to `x` (track coordinates). Ignored unless dragging.
    pub fn drag_to(&mut self, x: f32) -> Option<DragFeedback> {
        if !self.is_dragging() {
            return None;
        }
        self.handle_x = self.clamp(x);
        Some(DragFeedback { handle_x: self.handle_x, display_speed: self.speed_at(self.handle_x).round() as i64 })
    }

    /// Pointer went up, wherever it is. A release without a press is a no-op.
    pub fn release(&mut self) -> Option<PlaybackCommand> {
        if !self.is_dragging() {
            return None;
        }
        self.state = DragState::Idle;
        Some(PlaybackCommand::SetSpeed(self.speed_at(self.handle_x)))
    }

    /// Position of the handle within the track, in `[0, 1]`.
    pub fn portion(&self, x: f32) -> f64 {
        let span = self.max_x - self.min_x;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.clamp(x) - self.min_x) / span) as f64
    }

    /// Unrounded speed for a handle at `x`.
    pub fn speed_at(&self, x: f32) -> f64 {
        self.min_speed + self.portion(x) * (self.max_speed - self.min_speed)
    }

    fn clamp(&self, x: f32) -> f32 {
        if x.is_nan() { self.min_x } else { x.clamp(self.min_x, self.max_x) }
    }
}
