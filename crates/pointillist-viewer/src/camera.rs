use std::time::Instant;

use pointillist_engine::coords::{Rect, Vec2};
use pointillist_engine::view::{Interaction, ScreenToData, Transform};

const MIN_ZOOM: f32 = 0.25;
const MAX_ZOOM: f32 = 1.0e6;

/// Pan/zoom camera over the data square `[-1, 1]²`.
///
/// At zoom 1 the square is fitted to the shorter window side and centered.
/// Screen coordinates are physical pixels, origin top-left, +Y down.
#[derive(Debug, Clone)]
pub struct PanZoomCamera {
    transform: Transform,
    width: f32,
    height: f32,
    cursor: Vec2,
    drag_from: Option<Vec2>,
    start: Instant,
}

impl PanZoomCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            transform: Transform::IDENTITY,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            cursor: Vec2::zero(),
            drag_from: None,
            start: Instant::now(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
    }

    /// Pixels per data unit at zoom 1.
    fn fit_scale(&self) -> f32 {
        self.width.min(self.height) * 0.5
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        let now = Vec2::new(x, y);
        if let Some(from) = self.drag_from {
            let delta = now - from;
            self.transform.x += delta.x;
            self.transform.y += delta.y;
            self.drag_from = Some(now);
        }
        self.cursor = now;
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.drag_from = dragging.then_some(self.cursor);
    }

    /// Zooms by `factor` keeping the point under the cursor fixed.
    pub fn zoom_at_cursor(&mut self, factor: f32) {
        let Transform { k, x, y } = self.transform;
        let new_k = (k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = new_k / k;
        self.transform = Transform {
            k: new_k,
            x: self.cursor.x - (self.cursor.x - x) * ratio,
            y: self.cursor.y - (self.cursor.y - y) * ratio,
        };
    }

    pub fn reset(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    /// Data coordinates under a screen pixel.
    pub fn screen_to_data_point(&self, screen: Vec2) -> Vec2 {
        let Transform { k, x, y } = self.transform;
        let s = self.fit_scale();
        let unzoomed = Vec2::new((screen.x - x) / k, (screen.y - y) / k);
        Vec2::new(
            (unzoomed.x - self.width * 0.5) / s,
            -(unzoomed.y - self.height * 0.5) / s,
        )
    }
}

impl Interaction for PanZoomCamera {
    fn current_transform(&self) -> Transform {
        self.transform
    }

    fn visible_corners(&self) -> Rect {
        Rect::from_corners(
            self.screen_to_data_point(Vec2::zero()),
            self.screen_to_data_point(Vec2::new(self.width, self.height)),
        )
    }

    fn screen_to_data(&self) -> ScreenToData {
        let s = self.fit_scale();
        ScreenToData {
            scale: [2.0 / self.width, -2.0 / self.height],
            untransform: [
                [s, 0.0, 0.0],
                [0.0, -s, 0.0],
                [self.width * 0.5, self.height * 0.5, 1.0],
            ],
        }
    }

    fn session_start(&self) -> Instant {
        self.start
    }
}
