use crate::coords::ColorRgba;
use crate::pipeline::PointUniforms;
use crate::tile::TileKey;

/// One draw call: a tile buffer drawn once for one label pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDraw<B> {
    pub tile: TileKey,
    pub pass: u32,
    pub buffer: B,
    pub count: u32,
    pub uniforms: PointUniforms,
}

/// Recorded work for one frame, in submission order.
///
/// Draws are stored coarse to fine; all passes of a tile are contiguous.
/// Cleared at the start of every frame; capacity is reused.
#[derive(Debug)]
pub struct FrameCommands<B> {
    clear: Option<ColorRgba>,
    draws: Vec<PointDraw<B>>,
}

impl<B> Default for FrameCommands<B> {
    fn default() -> Self {
        Self {
            clear: None,
            draws: Vec::new(),
        }
    }
}

impl<B> FrameCommands<B> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops recorded work, keeping allocated capacity.
    #[inline]
    pub fn reset(&mut self) {
        self.clear = None;
        self.draws.clear();
    }

    #[inline]
    pub fn set_clear(&mut self, color: ColorRgba) {
        self.clear = Some(color);
    }

    #[inline]
    pub fn clear_color(&self) -> Option<ColorRgba> {
        self.clear
    }

    #[inline]
    pub fn push(&mut self, draw: PointDraw<B>) {
        self.draws.push(draw);
    }

    #[inline]
    pub fn draws(&self) -> &[PointDraw<B>] {
        &self.draws
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

/// What one `render_frame` call did.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub budget: f64,
    /// Tiles inside the budget and visible region.
    pub candidates: usize,
    /// Candidates with a ready buffer.
    pub drawn_tiles: usize,
    pub draw_calls: usize,
    pub points: u64,
    /// Tile buffers built from fetches that completed since the last frame.
    pub buffers_built: usize,
    pub labels_encoded: usize,
}
