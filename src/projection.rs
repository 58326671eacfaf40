use egui::Pos2;

use crate::model::WorldPoint;

/// World-to-screen mapping for one session.
///
/// The factor is derived from the world *width* only, so both axes scale identically and
/// non-square worlds keep their aspect ratio instead of filling the viewport vertically.
/// Screen positions are canvas-local; the painter adds the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    factor: f32,
}

impl Projection {
    /// `(viewport_width - margin) / world_width`.
    ///
    /// Returns `None` when the world width is not a positive finite number or when the margin
    /// eats the whole viewport.
    pub fn scale(world_width: f64, viewport_width: f32, margin: f32) -> Option<f32> {
        if !world_width.is_finite() || world_width <= 0.0 {
            return None;
        }
        let usable = viewport_width - margin;
        if !usable.is_finite() || usable <= 0.0 {
            return None;
        }
        Some((usable as f64 / world_width) as f32)
    }

    pub fn for_world(world_width: f64, viewport_width: f32, margin: f32) -> Option<Self> {
        Self::scale(world_width, viewport_width, margin).map(Self::from_factor)
    }

    pub const fn from_factor(factor: f32) -> Self {
        Self { factor }
    }

    #[inline]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Convert a world position to canvas pixels.
    #[inline]
    pub fn to_screen(&self, point: WorldPoint) -> Pos2 {
        Pos2::new(self.scale_distance(point.x), self.scale_distance(point.y))
    }

    /// Scale a world-unit length (radius, rectangle side) to pixels.
    #[inline]
    pub fn scale_distance(&self, d: f64) -> f32 {
        (d * self.factor as f64) as f32
    }

    /// Pixel size of the whole canvas for a world of the given size.
    pub fn canvas_size(&self, world_width: f64, world_height: f64) -> egui::Vec2 {
        egui::vec2(self.scale_distance(world_width), self.scale_distance(world_height))
    }
}
