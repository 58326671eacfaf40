//! Typed view of what the simulation backend reports.
//!
//! `World` comes from `/floorplan.json` and is decoded strictly: without a usable width there is
//! nothing to project onto. `Snapshot` comes from `/dotbots.json` on every tick and is decoded
//! leniently, field by field, so that one bad robot or a missing map never costs a whole frame.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ConsoleError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned wall block, in world units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct World {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl World {
    pub fn from_value(value: Value) -> Result<Self, ConsoleError> {
        let world: World = serde_json::from_value(value)?;
        world.validate()?;
        Ok(world)
    }

    fn validate(&self) -> Result<(), ConsoleError> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(ConsoleError::InvalidWorld(format!("width must be positive, got {}", self.width)));
        }
        if !self.height.is_finite() || self.height < 0.0 {
            return Err(ConsoleError::InvalidWorld(format!("height must be non-negative, got {}", self.height)));
        }
        Ok(())
    }
}

/// Execution mode the backend reports. Speed is not echoed back, so `Playing` carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackMode {
    Paused,
    SteppingOneFrame,
    Playing,
    FastForwarding,
}

impl PlaybackMode {
    pub const ALL: [PlaybackMode; 4] =
        [PlaybackMode::Paused, PlaybackMode::SteppingOneFrame, PlaybackMode::Playing, PlaybackMode::FastForwarding];

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "pause" => Some(PlaybackMode::Paused),
            "frameforward" => Some(PlaybackMode::SteppingOneFrame),
            "play" => Some(PlaybackMode::Playing),
            "fastforward" => Some(PlaybackMode::FastForwarding),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            PlaybackMode::Paused => "pause",
            PlaybackMode::SteppingOneFrame => "frameforward",
            PlaybackMode::Playing => "play",
            PlaybackMode::FastForwarding => "fastforward",
        }
    }
}

/// One robot as reported in a snapshot.
///
/// `position` is ground truth, `estimate` is where the orchestrator believes the robot is.
/// Both are rendered and connected; nothing else is read into the gap between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    /// Index in the backend's robot array.
    pub id: usize,
    pub position: WorldPoint,
    pub estimate: WorldPoint,
    pub next_collision: Option<WorldPoint>,
}

impl Robot {
    /// End of the collision indicator; collapses onto the robot when no bump is predicted.
    pub fn collision_target(&self) -> WorldPoint {
        self.next_collision.unwrap_or(self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: WorldPoint,
    pub to: WorldPoint,
}

/// The "disco map": bump dots and the wall segments consolidated from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingProgress {
    pub complete: bool,
    pub dots: Vec<WorldPoint>,
    pub lines: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub mode: Option<PlaybackMode>,
    pub simulated_time: Option<String>,
    pub robot_radius: Option<f64>,
    pub robots: Vec<Robot>,
    pub mapping: MappingProgress,
}

/// A field that could not be used and was skipped or defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    pub field: String,
    pub reason: String,
}

impl DecodeIssue {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub issues: Vec<DecodeIssue>,
}

impl Snapshot {
    /// Decode a `/dotbots.json` payload.
    ///
    /// Only a payload that is not a JSON object at all is an error. Everything below the top level
    /// degrades: unusable robots are skipped (the survivors keep their array index as id), absent
    /// mapping arrays become empty sets and an absent or unknown mode leaves `mode` unset.
    pub fn decode(value: &Value) -> Result<Decoded<Snapshot>, ConsoleError> {
        if !value.is_object() {
            return Err(ConsoleError::InvalidPayload(format!("expected a JSON object, got {}", kind_of(value))));
        }
        let raw = RawSnapshot::deserialize(value)?;

        let mut issues = Vec::new();
        let snapshot = Snapshot {
            mode: decode_mode(raw.mode, &mut issues),
            simulated_time: raw
                .simulated_time
                .and_then(|time| time.or_report("simulatedTime", "a string or number", &mut issues))
                .map(TimeLabel::into_label),
            robot_radius: decode_robot_radius(raw.robot_radius, &mut issues),
            robots: decode_robots(raw.dotbots, &mut issues),
            mapping: decode_mapping(raw.discomap, &mut issues),
        };

        Ok(Decoded { value: snapshot, issues })
    }
}

/// `/dotbots.json` as it arrives on the wire. Every field may be absent and every value may be
/// of the wrong shape; `Snapshot::decode` turns the gaps into `DecodeIssue`s.
#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    mode: Option<Lenient<String>>,
    #[serde(default, rename = "simulatedTime")]
    simulated_time: Option<Lenient<TimeLabel>>,
    #[serde(default, rename = "robotRadius")]
    robot_radius: Option<Lenient<f64>>,
    #[serde(default)]
    dotbots: Option<Lenient<Vec<Lenient<RawRobot>>>>,
    #[serde(default)]
    discomap: Option<Lenient<RawMapping>>,
}

/// Either a value of the expected shape or whatever the backend sent instead.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Malformed(Value),
}

impl<T> Lenient<T> {
    fn valid(self) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Malformed(_) => None,
        }
    }

    /// The valid value, or `None` after recording what arrived in its place.
    fn or_report(self, field: impl Into<String>, expected: &str, issues: &mut Vec<DecodeIssue>) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Malformed(other) => {
                issues.push(DecodeIssue::new(field, format!("expected {expected}, got {}", kind_of(&other))));
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeLabel {
    Text(String),
    Seconds(f64),
}

impl TimeLabel {
    fn into_label(self) -> String {
        match self {
            TimeLabel::Text(label) => label,
            TimeLabel::Seconds(seconds) => format!("{seconds}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRobot {
    x: f64,
    y: f64,
    #[serde(default)]
    orchestratorview_x: Option<Lenient<f64>>,
    #[serde(default)]
    orchestratorview_y: Option<Lenient<f64>>,
    #[serde(default)]
    next_bump_x: Option<Lenient<f64>>,
    #[serde(default)]
    next_bump_y: Option<Lenient<f64>>,
}

impl RawRobot {
    fn into_robot(self, id: usize, issues: &mut Vec<DecodeIssue>) -> Robot {
        let field = |name: &str| format!("dotbots[{id}].{name}");
        let position = WorldPoint::new(self.x, self.y);

        let estimate = match (self.orchestratorview_x.and_then(Lenient::valid), self.orchestratorview_y.and_then(Lenient::valid)) {
            (Some(ex), Some(ey)) => WorldPoint::new(ex, ey),
            _ => {
                issues.push(DecodeIssue::new(field("orchestratorview_x/y"), "estimate not numeric, using ground truth"));
                position
            }
        };

        let next_collision = match (self.next_bump_x, self.next_bump_y) {
            (None, None) => None,
            (Some(Lenient::Valid(bx)), Some(Lenient::Valid(by))) => Some(WorldPoint::new(bx, by)),
            _ => {
                issues.push(DecodeIssue::new(field("next_bump_x/y"), "incomplete collision prediction"));
                None
            }
        };

        Robot { id, position, estimate, next_collision }
    }
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    #[serde(default)]
    complete: Option<Lenient<bool>>,
    #[serde(default)]
    dots: Option<Lenient<Vec<Lenient<[f64; 2]>>>>,
    #[serde(default)]
    lines: Option<Lenient<Vec<Lenient<[f64; 4]>>>>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_mode(raw: Option<Lenient<String>>, issues: &mut Vec<DecodeIssue>) -> Option<PlaybackMode> {
    let Some(raw) = raw else {
        issues.push(DecodeIssue::new("mode", "missing"));
        return None;
    };
    let name = raw.or_report("mode", "a string", issues)?;
    let mode = PlaybackMode::from_wire(&name);
    if mode.is_none() {
        issues.push(DecodeIssue::new("mode", format!("unknown mode {name:?}")));
    }
    mode
}

fn decode_robot_radius(raw: Option<Lenient<f64>>, issues: &mut Vec<DecodeIssue>) -> Option<f64> {
    let radius = raw?.or_report("robotRadius", "a number", issues)?;
    if radius < 0.0 {
        issues.push(DecodeIssue::new("robotRadius", format!("must be non-negative, got {radius}")));
        return None;
    }
    Some(radius)
}

fn decode_robots(raw: Option<Lenient<Vec<Lenient<RawRobot>>>>, issues: &mut Vec<DecodeIssue>) -> Vec<Robot> {
    let Some(raw) = raw else {
        issues.push(DecodeIssue::new("dotbots", "missing"));
        return Vec::new();
    };
    let Some(entries) = raw.or_report("dotbots", "an array", issues) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(id, entry)| match entry {
            Lenient::Valid(robot) => Some(robot.into_robot(id, issues)),
            Lenient::Malformed(Value::Object(_)) => {
                issues.push(DecodeIssue::new(format!("dotbots[{id}].x/y"), "ground-truth position is not numeric"));
                None
            }
            Lenient::Malformed(other) => {
                issues.push(DecodeIssue::new(format!("dotbots[{id}]"), format!("expected an object, got {}", kind_of(&other))));
                None
            }
        })
        .collect()
}

fn decode_mapping(raw: Option<Lenient<RawMapping>>, issues: &mut Vec<DecodeIssue>) -> MappingProgress {
    let Some(raw) = raw else {
        issues.push(DecodeIssue::new("discomap", "missing"));
        return MappingProgress::default();
    };
    let Some(map) = raw.or_report("discomap", "an object", issues) else {
        return MappingProgress::default();
    };

    let complete = map.complete.and_then(|complete| complete.or_report("discomap.complete", "a boolean", issues)).unwrap_or(false);
    let dots = decode_entries(map.dots, "dots", issues).into_iter().map(|[x, y]| WorldPoint::new(x, y)).collect();
    let lines = decode_entries(map.lines, "lines", issues)
        .into_iter()
        .map(|[x1, y1, x2, y2]| Segment { from: WorldPoint::new(x1, y1), to: WorldPoint::new(x2, y2) })
        .collect();

    MappingProgress { complete, dots, lines }
}

/// Keep the well-formed entries of `discomap.<name>`, noting each one that is skipped.
fn decode_entries<const N: usize>(
    raw: Option<Lenient<Vec<Lenient<[f64; N]>>>>,
    name: &str,
    issues: &mut Vec<DecodeIssue>,
) -> Vec<[f64; N]> {
    let Some(entries) = raw.and_then(|raw| raw.or_report(format!("discomap.{name}"), "an array", issues)) else {
        return Vec::new();
    };
    let expected = format!("{N} numbers");
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| entry.or_report(format!("discomap.{name}[{idx}]"), &expected, issues))
        .collect()
}
