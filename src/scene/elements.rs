use egui::Color32;
use egui::Pos2;

use crate::model::Robot;
use crate::model::Segment;
use crate::model::WorldPoint;
use crate::scene::layer::ApplyContext;
use crate::scene::layer::SceneElement;

/// Categorical palette robots are colored from, by slot index.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

pub const HALO_COLOR: Color32 = Color32::from_rgb(0x00, 0xff, 0xff);
pub const ESTIMATE_COLOR: Color32 = Color32::from_rgb(0xe0, 0x30, 0x30);

/// Screen-space radii of fixed-size markers, in pixels.
pub const DISK_RADIUS: f32 = 10.0;
pub const ESTIMATE_RADIUS: f32 = 6.0;
pub const DOT_RADIUS: f32 = 2.0;
/// The halo always shows as a ring around the slot disk, however small `robotRadius` projects.
pub const MIN_HALO_RADIUS: f32 = DISK_RADIUS + 2.0;

pub fn slot_color(slot: usize) -> Color32 {
    PALETTE[slot % PALETTE.len()]
}

fn halo_radius(ctx: &ApplyContext) -> f32 {
    ctx.projection.scale_distance(ctx.robot_radius).max(MIN_HALO_RADIUS)
}

/// A screen position that glides towards its latest target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    from: Pos2,
    to: Pos2,
    started_at: f64,
    duration: f64,
}

impl Tween {
    pub fn settled(at: Pos2, now: f64) -> Self {
        Self { from: at, to: at, started_at: now, duration: 0.0 }
    }

    /// Start a new transition from wherever the tween currently is. Returns false if the target
    /// did not move.
    pub fn retarget(&mut self, to: Pos2, now: f64, duration: f64) -> bool {
        if to == self.to {
            return false;
        }
        self.from = self.at(now);
        self.to = to;
        self.started_at = now;
        self.duration = duration;
        true
    }

    pub fn target(&self) -> Pos2 {
        self.to
    }

    pub fn at(&self, now: f64) -> Pos2 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = ((now - self.started_at) / self.duration).clamp(0.0, 1.0);
        self.from.lerp(self.to, ease_cubic_in_out(t) as f32)
    }

    pub fn is_moving(&self, now: f64) -> bool {
        self.duration > 0.0 && now - self.started_at < self.duration && self.from != self.to
    }
}

fn ease_cubic_in_out(t: f64) -> f64 {
    if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
}

/// All visuals derived from one robot, sharing the robot's slot as identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotElement {
    pub slot: usize,
    pub color: Color32,
    /// Ground-truth marker: halo plus slot-colored disk.
    pub marker: Tween,
    pub halo_radius: f32,
    pub estimate: Tween,
    /// Ground truth to estimate.
    pub error_line: [Pos2; 2],
    /// Ground truth to next predicted bump; both ends equal when none is predicted.
    pub collision_line: [Pos2; 2],
    pub created_at: f64,
}

impl SceneElement for RobotElement {
    type Key = usize;
    type Datum = Robot;

    fn key(datum: &Robot) -> usize {
        datum.id
    }

    fn create(key: &usize, datum: &Robot, ctx: &ApplyContext) -> Self {
        let position = ctx.projection.to_screen(datum.position);
        let estimate = ctx.projection.to_screen(datum.estimate);
        Self {
            slot: *key,
            color: slot_color(*key),
            marker: Tween::settled(position, ctx.now),
            halo_radius: halo_radius(ctx),
            estimate: Tween::settled(estimate, ctx.now),
            error_line: [position, estimate],
            collision_line: [position, ctx.projection.to_screen(datum.collision_target())],
            created_at: ctx.now,
        }
    }

    fn update(&mut self, datum: &Robot, ctx: &ApplyContext) -> bool {
        let position = ctx.projection.to_screen(datum.position);
        let estimate = ctx.projection.to_screen(datum.estimate);
        let error_line = [position, estimate];
        let collision_line = [position, ctx.projection.to_screen(datum.collision_target())];
        let halo_radius = halo_radius(ctx);

        let mut changed = self.marker.retarget(position, ctx.now, ctx.transition_secs);
        changed |= self.estimate.retarget(estimate, ctx.now, ctx.transition_secs);
        if self.error_line != error_line {
            self.error_line = error_line;
            changed = true;
        }
        if self.collision_line != collision_line {
            self.collision_line = collision_line;
            changed = true;
        }
        if self.halo_radius != halo_radius {
            self.halo_radius = halo_radius;
            changed = true;
        }
        changed
    }
}

/// Bit pattern of a coordinate, with both zeroes folded together.
fn coordinate_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() }
}

/// Identity of a mapping dot: its exact coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DotKey([u64; 2]);

impl From<WorldPoint> for DotKey {
    fn from(p: WorldPoint) -> Self {
        DotKey([coordinate_bits(p.x), coordinate_bits(p.y)])
    }
}

/// Identity of a mapping line: its exact endpoints, in reported order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey([u64; 4]);

impl From<Segment> for LineKey {
    fn from(s: Segment) -> Self {
        LineKey([coordinate_bits(s.from.x), coordinate_bits(s.from.y), coordinate_bits(s.to.x), coordinate_bits(s.to.y)])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotElement {
    pub center: Pos2,
    pub created_at: f64,
}

impl SceneElement for DotElement {
    type Key = DotKey;
    type Datum = WorldPoint;

    fn key(datum: &WorldPoint) -> DotKey {
        DotKey::from(*datum)
    }

    fn create(_key: &DotKey, datum: &WorldPoint, ctx: &ApplyContext) -> Self {
        Self { center: ctx.projection.to_screen(*datum), created_at: ctx.now }
    }

    fn update(&mut self, datum: &WorldPoint, ctx: &ApplyContext) -> bool {
        let center = ctx.projection.to_screen(*datum);
        let changed = center != self.center;
        self.center = center;
        changed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineElement {
    pub endpoints: [Pos2; 2],
    pub created_at: f64,
}

impl SceneElement for LineElement {
    type Key = LineKey;
    type Datum = Segment;

    fn key(datum: &Segment) -> LineKey {
        LineKey::from(*datum)
    }

    fn create(_key: &LineKey, datum: &Segment, ctx: &ApplyContext) -> Self {
        Self { endpoints: [ctx.projection.to_screen(datum.from), ctx.projection.to_screen(datum.to)], created_at: ctx.now }
    }

    fn update(&mut self, datum: &Segment, ctx: &ApplyContext) -> bool {
        let endpoints = [ctx.projection.to_screen(datum.from), ctx.projection.to_screen(datum.to)];
        let changed = endpoints != self.endpoints;
        self.endpoints = endpoints;
        changed
    }
}
