use crate::config::RenderConfig;
use crate::frame::{FrameOrchestrator, FrameStats};
use crate::render::{LookupTextures, PointRenderer, RenderCtx, RenderTarget};
use crate::texture::{GlyphAtlas, GlyphRaster};
use crate::tile::{TileKey, TileStore};
use crate::view::Interaction;

/// The point-cloud renderer: lookup textures, per-tile buffers, the composed
/// pipeline and the wgpu state drawing them.
///
/// Construct once per surface, call [`Self::render_frame`] every tick and
/// [`Self::destroy`] on teardown.
pub struct PointCloudRenderer {
    orchestrator: FrameOrchestrator<wgpu::Buffer>,
    points: PointRenderer,
    textures: LookupTextures,
    atlas: GlyphAtlas,
}

impl PointCloudRenderer {
    /// Builds the glyph atlas (from `font` if given) and the colormaps and
    /// uploads them.
    pub fn new(ctx: &RenderCtx<'_>, config: RenderConfig, font: Option<&fontdue::Font>) -> Self {
        let raster = font.map(|f| f as &dyn GlyphRaster);
        if raster.is_none() {
            log::warn!("no font given; labels will render as fallback glyphs");
        }
        let atlas = GlyphAtlas::build(config.glyph_cell_size, raster);
        let textures = LookupTextures::new(ctx, &atlas);

        Self {
            orchestrator: FrameOrchestrator::new(config),
            points: PointRenderer::new(),
            textures,
            atlas,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        self.orchestrator.config()
    }

    /// Applies a new configuration from the next frame on.
    ///
    /// The glyph atlas keeps the cell size it was built with.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.orchestrator.set_config(config);
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn orchestrator(&self) -> &FrameOrchestrator<wgpu::Buffer> {
        &self.orchestrator
    }

    /// Records and encodes one frame into `target`.
    pub fn render_frame<S, I>(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        store: &S,
        view: &I,
    ) -> FrameStats
    where
        S: TileStore + ?Sized,
        I: Interaction + ?Sized,
    {
        let stats = self.orchestrator.render_frame(store, view, ctx);
        let descriptor = self
            .orchestrator
            .descriptor()
            .map(|d| (d, self.orchestrator.generation()));

        self.points.render(
            ctx,
            target,
            descriptor,
            self.orchestrator.commands(),
            &self.textures,
        );
        stats
    }

    /// Releases a tile's buffer after the store evicted the tile.
    pub fn evict(&mut self, key: TileKey) {
        if let Some(buffer) = self.orchestrator.cache_mut().evict(key) {
            buffer.destroy();
        }
    }

    /// Destroys every GPU resource the renderer owns.
    pub fn destroy(mut self) {
        let mut released = 0;
        for buffer in self.orchestrator.cache_mut().drain() {
            buffer.destroy();
            released += 1;
        }
        self.textures.destroy();
        log::info!("renderer destroyed ({released} tile buffers released)");
    }
}
