use std::time::Duration;

use dotbots_console::ConsoleError;
use dotbots_console::backend::SimulationBackend;
use dotbots_console::model::Decoded;
use dotbots_console::model::PlaybackMode;
use dotbots_console::model::Snapshot;
use dotbots_console::model::World;
use dotbots_console::playback::SpeedSlider;
use dotbots_console::scene::ApplyTiming;
use dotbots_console::session::ConsoleSession;
use dotbots_console::sync::SyncConfig;
use dotbots_console::sync::SyncEvent;
use dotbots_console::sync::launch_sync_loop;
use egui::Pos2;
use serde_json::Value;
use serde_json::json;

const VIEWPORT_WIDTH: f32 = 1005.0;
const TIMING: ApplyTiming = ApplyTiming { now: 0.0, transition_secs: 0.0 };

fn floorplan() -> Value {
    json!({ "width": 100, "height": 50, "obstacles": [] })
}

fn dotbots(robots: Value, dots: Value) -> Value {
    json!({
        "mode": "play",
        "simulatedTime": "00:00:03",
        "robotRadius": 0.5,
        "dotbots": robots,
        "discomap": { "complete": false, "dots": dots, "lines": [] }
    })
}

fn session_with_world() -> ConsoleSession {
    let mut session = ConsoleSession::new(5.0, SpeedSlider::default());
    let world = World::from_value(floorplan()).expect("valid floorplan");
    session.handle_event(SyncEvent::WorldLoaded(world), VIEWPORT_WIDTH, TIMING);
    session
}

fn snapshot_event(payload: &Value) -> SyncEvent {
    SyncEvent::Snapshot(Snapshot::decode(payload).expect("object payload"))
}

#[test]
fn single_robot_lands_where_expected() {
    let mut session = session_with_world();
    assert_eq!(session.projection().map(|p| p.factor()), Some(10.0));

    let payload = dotbots(
        json!([{ "x": 5, "y": 5, "orchestratorview_x": 6, "orchestratorview_y": 6, "next_bump_x": null, "next_bump_y": null }]),
        json!([]),
    );
    session.handle_event(snapshot_event(&payload), VIEWPORT_WIDTH, TIMING).expect("snapshot applied");

    let robot = session.scene().robots().get(&0).expect("robot 0 drawn");
    assert_eq!(robot.marker.target(), Pos2::new(50.0, 50.0));
    assert_eq!(robot.estimate.target(), Pos2::new(60.0, 60.0));
    assert_eq!(robot.error_line, [Pos2::new(50.0, 50.0), Pos2::new(60.0, 60.0)]);
    assert_eq!(robot.collision_line, [Pos2::new(50.0, 50.0), Pos2::new(50.0, 50.0)]);
    assert_eq!(session.mode(), Some(PlaybackMode::Playing));
    assert_eq!(session.simulated_time(), Some("00:00:03"));
}

#[test]
fn robot_moving_over_ticks_is_updated_not_recreated() {
    let mut session = session_with_world();
    let robot_at = |x: f64| json!({ "x": x, "y": 2.0, "orchestratorview_x": x, "orchestratorview_y": 2.0, "next_bump_x": null, "next_bump_y": null });
    let still = json!({ "x": 20.0, "y": 20.0, "orchestratorview_x": 20.0, "orchestratorview_y": 20.0, "next_bump_x": null, "next_bump_y": null });

    let first = session
        .handle_event(snapshot_event(&dotbots(json!([still.clone(), robot_at(1.0)]), json!([]))), VIEWPORT_WIDTH, TIMING)
        .expect("applied");
    assert_eq!(first.robots.created, vec![0, 1]);
    let color = session.scene().robots().get(&1).map(|r| r.color);

    for step in 2..8 {
        let payload = dotbots(json!([still.clone(), robot_at(step as f64)]), json!([]));
        let report = session.handle_event(snapshot_event(&payload), VIEWPORT_WIDTH, TIMING).expect("applied");
        assert!(report.robots.created.is_empty(), "step {step} recreated a robot");
        assert!(report.robots.removed.is_empty());
        assert_eq!(report.robots.updated, vec![1]);
        assert_eq!(session.scene().robots().get(&1).map(|r| r.color), color);
    }
}

#[test]
fn same_payload_twice_changes_nothing_structurally() {
    let mut session = session_with_world();
    let payload = dotbots(
        json!([{ "x": 1, "y": 1, "orchestratorview_x": 1, "orchestratorview_y": 1, "next_bump_x": 3, "next_bump_y": 1 }]),
        json!([[1, 1], [2, 2]]),
    );
    session.handle_event(snapshot_event(&payload), VIEWPORT_WIDTH, TIMING);
    let second = session.handle_event(snapshot_event(&payload), VIEWPORT_WIDTH, TIMING).expect("applied");
    assert!(second.is_structurally_stable());
}

#[test]
fn backend_reset_shrinks_the_map() {
    let mut session = session_with_world();
    session.handle_event(snapshot_event(&dotbots(json!([]), json!([[1, 1], [2, 2], [3, 3]]))), VIEWPORT_WIDTH, TIMING);
    let report =
        session.handle_event(snapshot_event(&dotbots(json!([]), json!([[1, 1], [3, 3]]))), VIEWPORT_WIDTH, TIMING).expect("applied");
    assert_eq!(report.dots.removed.len(), 1);
    assert!(report.dots.created.is_empty());
    assert_eq!(session.scene().dots().len(), 2);
}

#[test]
fn malformed_fields_degrade_without_aborting_the_tick() {
    let mut session = session_with_world();
    let payload = json!({
        "simulatedTime": 42,
        "dotbots": [
            { "x": "oops", "y": 1 },
            { "x": 4, "y": 4, "next_bump_x": null }
        ]
    });
    let report = session.handle_event(snapshot_event(&payload), VIEWPORT_WIDTH, TIMING).expect("applied");
    assert_eq!(report.robots.created, vec![1]);
    assert!(session.scene().dots().is_empty());
    assert_eq!(session.mode(), None);
    assert!(!session.last_issues().is_empty());
}

/// Serves canned JSON the way the HTTP backend would after decoding.
struct CannedBackend {
    floorplan: Value,
    dotbots: Value,
}

impl SimulationBackend for CannedBackend {
    fn fetch_world(&self) -> Result<World, ConsoleError> {
        World::from_value(self.floorplan.clone())
    }

    fn fetch_snapshot(&self) -> Result<Decoded<Snapshot>, ConsoleError> {
        Snapshot::decode(&self.dotbots)
    }
}

#[test]
fn sync_loop_feeds_the_session() {
    let backend = CannedBackend {
        floorplan: floorplan(),
        dotbots: dotbots(
            json!([{ "x": 5, "y": 5, "orchestratorview_x": 6, "orchestratorview_y": 6, "next_bump_x": null, "next_bump_y": null }]),
            json!([[9, 9]]),
        ),
    };
    let handle = launch_sync_loop(backend, SyncConfig { poll_interval: Duration::from_millis(10) }, None);
    let mut session = ConsoleSession::new(5.0, SpeedSlider::default());

    while session.snapshots_applied() < 3 {
        let event = handle.next_event(Duration::from_secs(5)).expect("loop alive").expect("event before timeout");
        session.handle_event(event, VIEWPORT_WIDTH, TIMING);
    }
    handle.stop();

    assert_eq!(session.scene().robots().len(), 1);
    assert_eq!(session.scene().dots().len(), 1);
    assert_eq!(session.mode_opacity(PlaybackMode::Playing), 1.0);
    assert_eq!(session.mode_opacity(PlaybackMode::Paused), 0.5);
}

#[test]
fn drag_commits_one_speed_command() {
    let mut session = session_with_world();
    let slider = session.slider_mut();
    assert!(slider.release().is_none());
    assert!(slider.press());
    for x in [180.0, 200.0, 230.0] {
        slider.drag_to(x);
    }
    let command = slider.release().expect("drag committed");
    assert_eq!(command.endpoint(), "/play");
    assert_eq!(command.body(), Some(json!({ "speed": 5.5 })));
}
