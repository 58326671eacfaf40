//! The rendered scene, kept in step with the latest snapshot by keyed reconciliation.
//!
//! Each category (robots, mapping dots, mapping lines) is a [`Layer`] and is reconciled on its
//! own. Elements whose identity survives a snapshot are updated in place, so their color and any
//! running position transition carry over.

pub mod elements;
pub mod layer;

use egui::Color32;
use tracing::trace;

pub use elements::DISK_RADIUS;
pub use elements::DOT_RADIUS;
pub use elements::DotElement;
pub use elements::DotKey;
pub use elements::ESTIMATE_COLOR;
pub use elements::ESTIMATE_RADIUS;
pub use elements::HALO_COLOR;
pub use elements::LineElement;
pub use elements::LineKey;
pub use elements::MIN_HALO_RADIUS;
pub use elements::PALETTE;
pub use elements::RobotElement;
pub use elements::Tween;
pub use layer::ApplyContext;
pub use layer::Layer;
pub use layer::ReconcileReport;
pub use layer::SceneElement;

use crate::model::Snapshot;
use crate::projection::Projection;

pub const MAPPING_COMPLETE_COLOR: Color32 = Color32::from_rgb(0x00, 0x80, 0x00);
pub const MAPPING_INCOMPLETE_COLOR: Color32 = Color32::from_rgb(0xff, 0x00, 0x00);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneReport {
    pub robots: ReconcileReport<usize>,
    pub dots: ReconcileReport<DotKey>,
    pub lines: ReconcileReport<LineKey>,
}

impl SceneReport {
    pub fn is_structurally_stable(&self) -> bool {
        self.robots.is_structurally_stable() && self.dots.is_structurally_stable() && self.lines.is_structurally_stable()
    }
}

/// Wall clock data for one application.
#[derive(Debug, Clone, Copy)]
pub struct ApplyTiming {
    pub now: f64,
    pub transition_secs: f64,
}

#[derive(Default)]
pub struct Scene {
    robots: Layer<RobotElement>,
    dots: Layer<DotElement>,
    lines: Layer<LineElement>,
    mapping_complete: bool,
}

impl Scene {
    pub fn apply(&mut self, snapshot: &Snapshot, projection: Projection, timing: ApplyTiming) -> SceneReport {
        let ctx = ApplyContext {
            projection,
            robot_radius: snapshot.robot_radius.unwrap_or(0.0),
            now: timing.now,
            transition_secs: timing.transition_secs,
        };

        let report = SceneReport {
            robots: self.robots.reconcile(&snapshot.robots, &ctx),
            dots: self.dots.reconcile(&snapshot.mapping.dots, &ctx),
            lines: self.lines.reconcile(&snapshot.mapping.lines, &ctx),
        };
        self.mapping_complete = snapshot.mapping.complete;

        trace!(
            robots_created = report.robots.created.len(),
            robots_removed = report.robots.removed.len(),
            dots_created = report.dots.created.len(),
            dots_removed = report.dots.removed.len(),
            lines_created = report.lines.created.len(),
            lines_removed = report.lines.removed.len(),
            "applied snapshot"
        );

        report
    }

    pub fn robots(&self) -> &Layer<RobotElement> {
        &self.robots
    }

    pub fn dots(&self) -> &Layer<DotElement> {
        &self.dots
    }

    pub fn lines(&self) -> &Layer<LineElement> {
        &self.lines
    }

    pub fn mapping_complete(&self) -> bool {
        self.mapping_complete
    }

    /// Stroke color shared by every mapping line this tick.
    pub fn mapping_line_color(&self) -> Color32 {
        if self.mapping_complete { MAPPING_COMPLETE_COLOR } else { MAPPING_INCOMPLETE_COLOR }
    }

    /// Whether any marker is still gliding, i.e. the caller should keep repainting.
    pub fn is_animating(&self, now: f64) -> bool {
        self.robots.iter().any(|(_, robot)| robot.marker.is_moving(now) || robot.estimate.is_moving(now))
    }

    pub fn clear(&mut self) {
        self.robots.clear();
        self.dots.clear();
        self.lines.clear();
        self.mapping_complete = false;
    }
}

#[cfg(test)]
mod tests {
    use egui::Pos2;

    use super::*;
    use crate::model::MappingProgress;
    use crate::model::Robot;
    use crate::model::Segment;
    use crate::model::WorldPoint;

    fn robot(id: usize, x: f64, y: f64) -> Robot {
        Robot { id, position: WorldPoint::new(x, y), estimate: WorldPoint::new(x, y), next_collision: None }
    }

    fn snapshot(robots: Vec<Robot>, dots: Vec<WorldPoint>) -> Snapshot {
        Snapshot {
            robot_radius: Some(0.5),
            robots,
            mapping: MappingProgress { complete: false, dots, lines: Vec::new() },
            ..Default::default()
        }
    }

    fn at(now: f64) -> ApplyTiming {
        ApplyTiming { now, transition_secs: 0.25 }
    }

    const TEN: Projection = Projection::from_factor(10.0);

    #[test]
    fn reapplying_a_snapshot_creates_and_removes_nothing() {
        let mut scene = Scene::default();
        let snap = snapshot(vec![robot(0, 1.0, 1.0), robot(1, 2.0, 2.0)], vec![WorldPoint::new(3.0, 3.0)]);
        scene.apply(&snap, TEN, at(0.0));
        let report = scene.apply(&snap, TEN, at(1.0));
        assert!(report.is_structurally_stable());
        assert!(report.robots.updated.is_empty());
        assert!(report.dots.updated.is_empty());
    }

    #[test]
    fn moving_robot_keeps_identity_and_color() {
        let mut scene = Scene::default();
        scene.apply(&snapshot(vec![robot(0, 0.0, 0.0), robot(1, 5.0, 5.0)], vec![]), TEN, at(0.0));
        let color_before = scene.robots().get(&1).map(|r| r.color);

        for tick in 1..5 {
            let report = scene.apply(&snapshot(vec![robot(0, 0.0, 0.0), robot(1, 5.0 + tick as f64, 5.0)], vec![]), TEN, at(tick as f64));
            assert_eq!(report.robots.updated, vec![1]);
            assert!(report.robots.created.is_empty());
        }

        let element = scene.robots().get(&1).expect("robot 1 alive");
        assert_eq!(Some(element.color), color_before);
        assert_eq!(element.created_at, 0.0);
        assert_eq!(element.marker.target(), Pos2::new(90.0, 50.0));
    }

    #[test]
    fn shrinking_dots_removes_exactly_the_missing_ones() {
        let mut scene = Scene::default();
        let all = vec![WorldPoint::new(1.0, 1.0), WorldPoint::new(2.0, 1.0), WorldPoint::new(3.0, 1.0)];
        scene.apply(&snapshot(vec![], all), TEN, at(0.0));

        let kept = vec![WorldPoint::new(1.0, 1.0), WorldPoint::new(3.0, 1.0)];
        let report = scene.apply(&snapshot(vec![], kept), TEN, at(1.0));
        assert_eq!(report.dots.removed, vec![DotKey::from(WorldPoint::new(2.0, 1.0))]);
        assert!(report.dots.created.is_empty());
        assert_eq!(scene.dots().len(), 2);
    }

    #[test]
    fn replaced_line_is_removed_and_new_one_created() {
        let wall = |x1, y1, x2, y2| Segment { from: WorldPoint::new(x1, y1), to: WorldPoint::new(x2, y2) };
        let mut scene = Scene::default();
        let mut snap = snapshot(vec![], vec![]);
        snap.mapping.lines = vec![wall(0.0, 0.0, 0.0, 4.0), wall(0.0, 4.0, 6.0, 4.0)];
        scene.apply(&snap, TEN, at(0.0));

        snap.mapping.lines = vec![wall(0.0, 0.0, 0.0, 4.0), wall(6.0, 4.0, 6.0, 0.0)];
        let report = scene.apply(&snap, TEN, at(1.0));
        assert_eq!(report.lines.removed, vec![LineKey::from(wall(0.0, 4.0, 6.0, 4.0))]);
        assert_eq!(report.lines.created, vec![LineKey::from(wall(6.0, 4.0, 6.0, 0.0))]);
        assert!(report.lines.updated.is_empty());
        assert_eq!(report.lines.unchanged, 1);

        let created = scene.lines().get(&LineKey::from(wall(6.0, 4.0, 6.0, 0.0))).expect("new wall drawn");
        assert_eq!(created.endpoints, [Pos2::new(60.0, 40.0), Pos2::new(60.0, 0.0)]);
        assert_eq!(scene.lines().len(), 2);
    }

    #[test]
    fn line_color_follows_completion_each_tick() {
        let mut scene = Scene::default();
        let mut snap = snapshot(vec![], vec![]);
        snap.mapping.lines = vec![Segment { from: WorldPoint::new(0.0, 0.0), to: WorldPoint::new(0.0, 4.0) }];
        scene.apply(&snap, TEN, at(0.0));
        assert_eq!(scene.mapping_line_color(), MAPPING_INCOMPLETE_COLOR);

        snap.mapping.complete = true;
        let report = scene.apply(&snap, TEN, at(1.0));
        assert_eq!(scene.mapping_line_color(), MAPPING_COMPLETE_COLOR);
        assert!(report.lines.is_structurally_stable());
    }

    #[test]
    fn robots_vanishing_takes_every_layer_with_them() {
        let mut scene = Scene::default();
        scene.apply(&snapshot(vec![robot(0, 0.0, 0.0), robot(1, 1.0, 1.0)], vec![]), TEN, at(0.0));
        let report = scene.apply(&snapshot(vec![robot(0, 0.0, 0.0)], vec![]), TEN, at(1.0));
        assert_eq!(report.robots.removed, vec![1]);
        assert_eq!(scene.robots().len(), 1);
    }

    #[test]
    fn moved_marker_is_animating_until_transition_ends() {
        let mut scene = Scene::default();
        scene.apply(&snapshot(vec![robot(0, 0.0, 0.0)], vec![]), TEN, at(0.0));
        scene.apply(&snapshot(vec![robot(0, 1.0, 0.0)], vec![]), TEN, at(1.0));
        assert!(scene.is_animating(1.1));
        assert!(!scene.is_animating(1.3));
    }
}
