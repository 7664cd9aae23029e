//! View state and the interaction-layer seam.
//!
//! The interaction layer (camera, pan/zoom handling) is owned by the host.
//! The engine only reads the current transform and visible region from it
//! once per frame and derives a [`ViewState`] that every draw of that frame
//! shares.

use std::time::Instant;

use crate::config::RenderConfig;
use crate::coords::Rect;
use crate::time::FrameTime;

/// Current pan/zoom transform: screen = k * base + (x, y).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub k: f32,
    pub x: f32,
    pub y: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { k: 1.0, x: 0.0, y: 0.0 };

    /// 3×3 affine matrix, column-major: `[[k, 0, 0], [0, k, 0], [x, y, 1]]`.
    #[inline]
    pub fn matrix(self) -> [[f32; 3]; 3] {
        [[self.k, 0.0, 0.0], [0.0, self.k, 0.0], [self.x, self.y, 1.0]]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Mapping between data space and the window, as reported by the interaction layer.
///
/// `untransform` maps data coordinates to unzoomed screen pixels (column-major
/// affine). `scale` maps screen pixels to clip space (`[2 / w, -2 / h]` for a
/// top-left origin).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenToData {
    pub scale: [f32; 2],
    pub untransform: [[f32; 3]; 3],
}

impl Default for ScreenToData {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0],
            untransform: Transform::IDENTITY.matrix(),
        }
    }
}

/// Interaction collaborator consumed by the frame orchestrator.
pub trait Interaction {
    /// The live pan/zoom transform.
    fn current_transform(&self) -> Transform;

    /// The data-space region currently on screen.
    fn visible_corners(&self) -> Rect;

    /// Data-to-screen scale vector and untransform matrix.
    fn screen_to_data(&self) -> ScreenToData;

    /// Monotonic start of the viewing session; shader time is measured from here.
    fn session_start(&self) -> Instant;
}

/// Per-frame render parameters shared by every draw call of a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    pub transform: Transform,
    pub point_budget: f64,
    pub elapsed: f32,
    pub point_size: f32,
    /// `point_budget * label_threshold` while labels are active, else zero.
    pub label_threshold: f64,
    pub screen: ScreenToData,
}

impl ViewState {
    /// Snapshots the interaction layer and configuration for one frame.
    pub fn capture<I>(config: &RenderConfig, view: &I, time: &FrameTime) -> Self
    where
        I: Interaction + ?Sized,
    {
        let transform = view.current_transform();
        let point_budget = config.point_budget(transform.k);
        let label_threshold = if config.label_key().is_some() {
            point_budget * config.label_threshold
        } else {
            0.0
        };

        Self {
            transform,
            point_budget,
            elapsed: time.seconds_since(view.session_start()),
            point_size: config.point_size,
            label_threshold,
            screen: view.screen_to_data(),
        }
    }
}

/// Per-pass render parameters: which label character slot is being drawn.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PassState {
    pub string_index: u32,
}
