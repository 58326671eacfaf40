use egui::Color32;
use egui::CornerRadius;
use egui::Pos2;
use egui::Rect;
use egui::Sense;
use egui::Shape;
use egui::Stroke;
use egui::Vec2;

use crate::model::World;
use crate::model::WorldPoint;
use crate::projection::Projection;
use crate::scene::DOT_RADIUS;
use crate::scene::DISK_RADIUS;
use crate::scene::ESTIMATE_COLOR;
use crate::scene::ESTIMATE_RADIUS;
use crate::scene::HALO_COLOR;
use crate::scene::Scene;
use crate::session::ConsoleSession;

const CANVAS_BACKGROUND: Color32 = Color32::from_rgb(0x14, 0x14, 0x18);
const OBSTACLE_COLOR: Color32 = Color32::from_rgb(0x6e, 0x6e, 0x78);
const ERROR_LINE_COLOR: Color32 = Color32::from_rgb(0xb0, 0xb0, 0xb0);
const MAPPING_DOT_COLOR: Color32 = Color32::from_rgb(0xf0, 0xf0, 0xf0);

const THIN_STROKE: f32 = 1.0;
const MAPPING_LINE_STROKE: f32 = 2.0;

/// Build the shapes for one frame. `origin` is the top-left of the canvas in screen space.
///
/// Paint order: floorplan, then per robot the error line, estimate, collision line, halo and
/// disk, then the mapping dots and lines on top.
pub fn scene_shapes(world: &World, projection: Projection, scene: &Scene, origin: Pos2, now: f64) -> Vec<Shape> {
    let offset = origin.to_vec2();
    let mut shapes = Vec::with_capacity(world.obstacles.len() + scene.robots().len() * 5 + scene.dots().len() + scene.lines().len());

    for obstacle in &world.obstacles {
        let min = projection.to_screen(WorldPoint::new(obstacle.x, obstacle.y)) + offset;
        let size = Vec2::new(projection.scale_distance(obstacle.width), projection.scale_distance(obstacle.height));
        shapes.push(Shape::rect_filled(Rect::from_min_size(min, size), CornerRadius::ZERO, OBSTACLE_COLOR));
    }

    for (_, robot) in scene.robots().iter() {
        let marker = robot.marker.at(now) + offset;
        let estimate = robot.estimate.at(now) + offset;

        shapes.push(Shape::LineSegment {
            points: [robot.error_line[0] + offset, robot.error_line[1] + offset],
            stroke: Stroke::new(THIN_STROKE, ERROR_LINE_COLOR),
        });
        shapes.push(Shape::circle_filled(estimate, ESTIMATE_RADIUS, ESTIMATE_COLOR));
        shapes.push(Shape::LineSegment {
            points: [robot.collision_line[0] + offset, robot.collision_line[1] + offset],
            stroke: Stroke::new(THIN_STROKE, robot.color),
        });
        shapes.push(Shape::circle_filled(marker, robot.halo_radius, HALO_COLOR));
        shapes.push(Shape::circle_filled(marker, DISK_RADIUS, robot.color));
    }

    for (_, dot) in scene.dots().iter() {
        shapes.push(Shape::circle_filled(dot.center + offset, DOT_RADIUS, MAPPING_DOT_COLOR));
    }

    let line_stroke = Stroke::new(MAPPING_LINE_STROKE, scene.mapping_line_color());
    for (_, line) in scene.lines().iter() {
        shapes.push(Shape::LineSegment { points: [line.endpoints[0] + offset, line.endpoints[1] + offset], stroke: line_stroke });
    }

    shapes
}

/// Allocate the canvas and paint the current scene. Shows a placeholder until the floorplan is in.
pub fn show_scene(ui: &mut egui::Ui, session: &ConsoleSession) {
    let (Some(world), Some(projection)) = (session.world(), session.projection()) else {
        ui.centered_and_justified(|ui| {
            ui.weak("Waiting for the floorplan...");
        });
        return;
    };

    let now = ui.input(|i| i.time);
    let canvas = projection.canvas_size(world.width, world.height);

    egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
        let (response, painter) = ui.allocate_painter(canvas, Sense::hover());
        painter.rect_filled(response.rect, CornerRadius::ZERO, CANVAS_BACKGROUND);
        painter.extend(scene_shapes(world, projection, session.scene(), response.rect.min, now));
    });

    if session.scene().is_animating(now) {
        ui.ctx().request_repaint();
    }
}
