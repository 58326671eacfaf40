//! Session-scoped controller state.
//!
//! Initialization order is enforced here: the projection only exists once a floorplan has been
//! loaded, and snapshots that arrive before that are dropped rather than drawn with a guessed scale.

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::model::DecodeIssue;
use crate::model::PlaybackMode;
use crate::model::World;
use crate::playback::SpeedSlider;
use crate::projection::Projection;
use crate::scene::ApplyTiming;
use crate::scene::Scene;
use crate::scene::SceneReport;
use crate::sync::SyncEvent;

pub const ACTIVE_OPACITY: f32 = 1.0;
pub const INACTIVE_OPACITY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Connecting,
    Live,
    Unreachable { failures: u32, last_error: String },
}

pub struct ConsoleSession {
    world: Option<World>,
    projection: Option<Projection>,
    scene: Scene,
    slider: SpeedSlider,
    mode: Option<PlaybackMode>,
    simulated_time: Option<String>,
    connection: ConnectionState,
    last_issues: Vec<DecodeIssue>,
    snapshots_applied: u64,
    margin: f32,
}

impl ConsoleSession {
    pub fn new(margin: f32, slider: SpeedSlider) -> Self {
        Self {
            world: None,
            projection: None,
            scene: Scene::default(),
            slider,
            mode: None,
            simulated_time: None,
            connection: ConnectionState::Connecting,
            last_issues: Vec::new(),
            snapshots_applied: 0,
            margin,
        }
    }

    /// Forget the world and everything drawn on it, ready for a new sync loop.
    pub fn reset(&mut self, margin: f32) {
        self.world = None;
        self.projection = None;
        self.scene.clear();
        self.mode = None;
        self.simulated_time = None;
        self.connection = ConnectionState::Connecting;
        self.last_issues.clear();
        self.snapshots_applied = 0;
        self.margin = margin;
    }

    /// Apply one event from the sync loop. `viewport_width` is only consulted for a new world.
    ///
    /// Returns what the scene reconciler did, if the event reached the scene.
    pub fn handle_event(&mut self, event: SyncEvent, viewport_width: f32, timing: ApplyTiming) -> Option<SceneReport> {
        match event {
            SyncEvent::WorldLoaded(world) => {
                self.load_world(world, viewport_width);
                None
            }
            SyncEvent::Snapshot(decoded) => {
                let Some(projection) = self.projection else {
                    debug!("snapshot arrived before the floorplan, dropping it");
                    return None;
                };
                self.note_issues(decoded.issues);
                let snapshot = decoded.value;
                let report = self.scene.apply(&snapshot, projection, timing);
                self.mode = snapshot.mode;
                self.simulated_time = snapshot.simulated_time;
                self.connection = ConnectionState::Live;
                self.snapshots_applied += 1;
                Some(report)
            }
            SyncEvent::FetchFailed { endpoint, error, streak } => {
                debug!(endpoint, streak, "keeping last good scene");
                self.connection = ConnectionState::Unreachable { failures: streak, last_error: error.to_string() };
                None
            }
        }
    }

    fn load_world(&mut self, world: World, viewport_width: f32) {
        match Projection::for_world(world.width, viewport_width, self.margin) {
            Some(projection) => {
                info!(factor = projection.factor(), viewport_width, "projection derived");
                self.projection = Some(projection);
            }
            None => {
                warn!(viewport_width, margin = self.margin, world_width = world.width, "viewport too narrow to project the floorplan");
                self.projection = None;
            }
        }
        // A new world invalidates every screen position computed so far.
        self.scene.clear();
        self.world = Some(world);
    }

    /// Re-log decode problems only when they differ from the previous snapshot's.
    fn note_issues(&mut self, issues: Vec<DecodeIssue>) {
        if issues != self.last_issues {
            for issue in &issues {
                warn!(field = %issue.field, reason = %issue.reason, "snapshot field degraded");
            }
        } else if !issues.is_empty() {
            debug!(count = issues.len(), "snapshot still degraded");
        }
        self.last_issues = issues;
    }

    /// Opacity of the indicator for `mode`: full only for the backend's reported mode.
    pub fn mode_opacity(&self, mode: PlaybackMode) -> f32 {
        if self.mode == Some(mode) { ACTIVE_OPACITY } else { INACTIVE_OPACITY }
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn slider_mut(&mut self) -> &mut SpeedSlider {
        &mut self.slider
    }

    pub fn mode(&self) -> Option<PlaybackMode> {
        self.mode
    }

    pub fn simulated_time(&self) -> Option<&str> {
        self.simulated_time.as_deref()
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn last_issues(&self) -> &[DecodeIssue] {
        &self.last_issues
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }
}

#[cfg(test)]
mod tests {
    use egui::Pos2;

    use super::*;
    use crate::error::ConsoleError;
    use crate::model::Decoded;
    use crate::model::Robot;
    use crate::model::Snapshot;
    use crate::model::WorldPoint;

    const TIMING: ApplyTiming = ApplyTiming { now: 0.0, transition_secs: 0.0 };

    fn session() -> ConsoleSession {
        ConsoleSession::new(5.0, SpeedSlider::default())
    }

    fn world() -> SyncEvent {
        SyncEvent::WorldLoaded(World { width: 100.0, height: 50.0, obstacles: Vec::new() })
    }

    fn snapshot_event(snapshot: Snapshot) -> SyncEvent {
        SyncEvent::Snapshot(Decoded { value: snapshot, issues: Vec::new() })
    }

    fn one_robot(mode: Option<PlaybackMode>) -> Snapshot {
        Snapshot {
            mode,
            robots: vec![Robot {
                id: 0,
                position: WorldPoint::new(5.0, 5.0),
                estimate: WorldPoint::new(6.0, 6.0),
                next_collision: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_before_world_is_dropped() {
        let mut session = session();
        assert!(session.handle_event(snapshot_event(one_robot(None)), 1005.0, TIMING).is_none());
        assert!(session.scene().robots().is_empty());
        assert_eq!(session.snapshots_applied(), 0);
    }

    #[test]
    fn world_then_snapshot_places_robot() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        assert_eq!(session.projection().map(|p| p.factor()), Some(10.0));

        let report = session.handle_event(snapshot_event(one_robot(Some(PlaybackMode::Playing))), 1005.0, TIMING).expect("applied");
        assert_eq!(report.robots.created, vec![0]);
        let robot = session.scene().robots().get(&0).expect("robot drawn");
        assert_eq!(robot.marker.target(), Pos2::new(50.0, 50.0));
        assert_eq!(session.connection(), &ConnectionState::Live);
    }

    #[test]
    fn projection_ignores_later_viewport_widths() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(None)), 505.0, TIMING);
        assert_eq!(session.projection().map(|p| p.factor()), Some(10.0));
    }

    #[test]
    fn exactly_one_mode_is_active() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(Some(PlaybackMode::FastForwarding))), 1005.0, TIMING);
        let active: Vec<_> = PlaybackMode::ALL.iter().filter(|m| session.mode_opacity(**m) == ACTIVE_OPACITY).collect();
        assert_eq!(active, vec![&PlaybackMode::FastForwarding]);
    }

    #[test]
    fn missing_mode_dims_everything() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(Some(PlaybackMode::Paused))), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(None)), 1005.0, TIMING);
        assert!(PlaybackMode::ALL.iter().all(|m| session.mode_opacity(*m) == INACTIVE_OPACITY));
    }

    #[test]
    fn fetch_failure_keeps_last_scene() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(Some(PlaybackMode::Paused))), 1005.0, TIMING);

        let failure = SyncEvent::FetchFailed {
            endpoint: "/dotbots.json",
            error: ConsoleError::BackendStatus { endpoint: "/dotbots.json", status: 502 },
            streak: 3,
        };
        assert!(session.handle_event(failure, 1005.0, TIMING).is_none());
        assert_eq!(session.scene().robots().len(), 1);
        assert_eq!(session.mode(), Some(PlaybackMode::Paused));
        assert!(matches!(session.connection(), ConnectionState::Unreachable { failures: 3, .. }));
    }

    #[test]
    fn reset_forgets_world_and_scene() {
        let mut session = session();
        session.handle_event(world(), 1005.0, TIMING);
        session.handle_event(snapshot_event(one_robot(None)), 1005.0, TIMING);
        session.reset(15.0);
        assert!(session.world().is_none());
        assert!(session.projection().is_none());
        assert!(session.scene().robots().is_empty());
        assert_eq!(session.connection(), &ConnectionState::Connecting);

        session.handle_event(world(), 1015.0, TIMING);
        assert_eq!(session.projection().map(|p| p.factor()), Some(10.0));
    }

    #[test]
    fn too_narrow_viewport_leaves_no_projection() {
        let mut session = session();
        session.handle_event(world(), 3.0, TIMING);
        assert!(session.world().is_some());
        assert!(session.projection().is_none());
        assert!(session.handle_event(snapshot_event(one_robot(None)), 1005.0, TIMING).is_none());
    }
}
