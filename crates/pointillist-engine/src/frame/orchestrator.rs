use crate::config::RenderConfig;
use crate::device::BufferDevice;
use crate::label::EncodeOutcome;
use crate::pipeline::{compose, PipelineDescriptor};
use crate::tile::{visible_tiles, Schema, TileBufferCache, TileStore};
use crate::time::FrameClock;
use crate::view::{Interaction, PassState, ViewState};

use super::{FrameCommands, FrameStats, PointDraw};

/// Drives one frame: budget, visible set, buffer acquisition, label
/// encoding and draw recording.
///
/// Owns the state that persists across frames: the tile buffer cache and the
/// composed pipeline descriptor.
pub struct FrameOrchestrator<B> {
    config: RenderConfig,
    cache: TileBufferCache<B>,
    descriptor: Option<PipelineDescriptor>,
    /// Bumped whenever `descriptor` is replaced.
    generation: u64,
    /// Schema the last composition failure was reported for.
    rejected: Option<Schema>,
    clock: FrameClock,
    commands: FrameCommands<B>,
}

impl<B: Clone> FrameOrchestrator<B> {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            cache: TileBufferCache::new(),
            descriptor: None,
            generation: 0,
            rejected: None,
            clock: FrameClock::new(),
            commands: FrameCommands::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replaces the configuration. The pipeline is recomposed next frame.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
        self.descriptor = None;
        self.rejected = None;
    }

    pub fn descriptor(&self) -> Option<&PipelineDescriptor> {
        self.descriptor.as_ref()
    }

    /// Changes whenever a new descriptor is composed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cache(&self) -> &TileBufferCache<B> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TileBufferCache<B> {
        &mut self.cache
    }

    /// Work recorded by the last `render_frame`.
    pub fn commands(&self) -> &FrameCommands<B> {
        &self.commands
    }

    /// Records this tick's draws. Never blocks: tiles whose buffers are not
    /// ready are skipped and retried next frame.
    pub fn render_frame<S, I, D>(&mut self, store: &S, view: &I, device: &D) -> FrameStats
    where
        S: TileStore + ?Sized,
        I: Interaction + ?Sized,
        D: BufferDevice<Buffer = B> + ?Sized,
    {
        let time = self.clock.tick();
        self.commands.reset();
        let buffers_built = self.cache.poll_completions(device);

        let transform = view.current_transform();
        let budget = self.config.point_budget(transform.k);
        let corners = view.visible_corners();
        store.prioritize_download_to(budget, corners);

        self.commands.set_clear(self.config.clear_color);

        let mut stats = FrameStats {
            frame: time.frame_index,
            budget,
            buffers_built,
            ..FrameStats::default()
        };

        if !self.ensure_pipeline(store.schema()) {
            return stats;
        }
        let Some(descriptor) = &self.descriptor else {
            return stats;
        };

        let state = ViewState::capture(&self.config, view, &time);
        let label_key = self.config.label_key();
        let passes = self.config.pass_count();

        let tiles = visible_tiles(store, budget, Some(corners).filter(|r| r.is_finite()));
        stats.candidates = tiles.len();

        for tile in &tiles {
            let Some(buffer) = self.cache.acquire(tile, store) else {
                continue;
            };

            if let Some(key) = &label_key {
                if tile.ordering.min * self.config.label_threshold > budget
                    && matches!(
                        self.cache.encode_labels(tile.key, key, device),
                        EncodeOutcome::Encoded { .. }
                    )
                {
                    stats.labels_encoded += 1;
                }
            }

            for pass in 0..passes {
                self.commands.push(PointDraw {
                    tile: tile.key,
                    pass,
                    buffer: buffer.handle.clone(),
                    count: buffer.count,
                    uniforms: descriptor.evaluate(&state, PassState { string_index: pass }),
                });
            }

            stats.drawn_tiles += 1;
            stats.points += u64::from(buffer.count);
        }

        stats.draw_calls = self.commands.draws().len();
        log::trace!(
            "frame {}: budget {budget:.0}, {}/{} tiles, {} draws, {} points",
            stats.frame,
            stats.drawn_tiles,
            stats.candidates,
            stats.draw_calls,
            stats.points
        );
        stats
    }

    /// Makes sure a descriptor for `schema` exists. False while nothing can be drawn.
    fn ensure_pipeline(&mut self, schema: Option<Schema>) -> bool {
        let Some(schema) = schema else {
            return self.descriptor.is_some();
        };
        if self.descriptor.as_ref().is_some_and(|d| d.schema() == &schema) {
            return true;
        }
        if self.rejected.as_ref() == Some(&schema) {
            return false;
        }

        match compose(Some(&schema), &self.config) {
            Ok(descriptor) => {
                log::info!(
                    "draw pipeline composed: {} attributes over {} schema fields",
                    descriptor.attributes().len(),
                    schema.len()
                );
                self.descriptor = Some(descriptor);
                self.generation += 1;
                true
            }
            Err(err) if err.is_not_ready() => false,
            Err(err) => {
                log::warn!("cannot compose draw pipeline: {err}");
                self.descriptor = None;
                self.rejected = Some(schema);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use futures::future::{self, FutureExt};

    use super::*;
    use crate::coords::Rect;
    use crate::device::testing::RecordingDevice;
    use crate::label::{pack_label, MISSING_GLYPH};
    use crate::pipeline::PointUniforms;
    use crate::tile::{
        ElementType, FetchFuture, OrderRange, PointBatch, TileInfo, TileKey, LABEL_BUFFER_FIELD,
        ORDER_INDEX_FIELD, POSITION_FIELD,
    };
    use crate::view::tests::StaticView;

    fn schema() -> Schema {
        Schema::interleaved([
            ("x", ElementType::Float32),
            ("y", ElementType::Float32),
            (ORDER_INDEX_FIELD, ElementType::Float32),
            (LABEL_BUFFER_FIELD, ElementType::Float32x4),
        ])
        .with_composite(POSITION_FIELD, "x", ElementType::Float32x2)
    }

    /// Root plus up to four children, all data resolved immediately.
    struct MemoryStore {
        schema: Option<Schema>,
        tiles: HashMap<TileKey, TileInfo>,
        fetches: Cell<u32>,
        hints: RefCell<Vec<f64>>,
    }

    impl MemoryStore {
        fn new(child_mins: &[f64]) -> Self {
            let mut tiles = HashMap::new();
            tiles.insert(TileKey::ROOT, TileInfo::new(TileKey::ROOT, OrderRange::new(0.0, 100.0)));
            for (child, &min) in TileKey::ROOT.children().into_iter().zip(child_mins) {
                tiles.insert(child, TileInfo::new(child, OrderRange::new(min, min + 100.0)));
            }
            Self {
                schema: Some(schema()),
                tiles,
                fetches: Cell::new(0),
                hints: RefCell::new(Vec::new()),
            }
        }
    }

    impl TileStore for MemoryStore {
        fn root(&self) -> Option<TileInfo> {
            self.tiles.get(&TileKey::ROOT).cloned()
        }

        fn children(&self, key: TileKey) -> Vec<TileInfo> {
            key.children()
                .iter()
                .filter_map(|k| self.tiles.get(k).cloned())
                .collect()
        }

        fn schema(&self) -> Option<Schema> {
            self.schema.clone()
        }

        /// Two points per tile at `ix = min` and `ix = min + 90`, label words unpacked.
        fn fetch_points(&self, key: TileKey) -> FetchFuture<PointBatch> {
            self.fetches.set(self.fetches.get() + 1);
            let min = self.tiles.get(&key).map_or(0.0, |t| t.ordering.min) as f32;
            let mut floats = Vec::with_capacity(2 * 7);
            for ix in [min, min + 90.0] {
                floats.extend_from_slice(&[0.0, 0.0, ix, 0.0, 0.0, 0.0, 0.0]);
            }
            let batch = PointBatch::new(floats)
                .with_text_column("name", vec!["first".into(), "second".into()]);
            future::ready(Ok(batch)).boxed_local()
        }

        fn fetch_schema(&self, _key: TileKey) -> FetchFuture<Schema> {
            future::ready(Ok(schema())).boxed_local()
        }

        fn prioritize_download_to(&self, budget: f64, _corners: Rect) {
            self.hints.borrow_mut().push(budget);
        }
    }

    fn orchestrator(config: RenderConfig) -> FrameOrchestrator<u32> {
        FrameOrchestrator::new(config)
    }

    fn drawn_tiles(orch: &FrameOrchestrator<u32>) -> Vec<TileKey> {
        let mut keys: Vec<_> = orch.commands().draws().iter().map(|d| d.tile).collect();
        keys.dedup();
        keys
    }

    // ── readiness ────────────────────────────────────────────────────────

    #[test]
    fn absent_schema_clears_and_draws_nothing() {
        let mut store = MemoryStore::new(&[]);
        store.schema = None;
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig::default());

        for _ in 0..3 {
            let stats = orch.render_frame(&store, &StaticView::zoomed(1.0), &device);
            assert_eq!(stats.draw_calls, 0);
        }
        assert!(orch.commands().clear_color().is_some());
        assert!(orch.commands().is_empty());
        assert!(orch.descriptor().is_none());
        assert_eq!(store.fetches.get(), 0);
    }

    #[test]
    fn buffers_become_drawable_on_a_later_frame() {
        let store = MemoryStore::new(&[10.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig::default());
        let view = StaticView::zoomed(1.0);

        let first = orch.render_frame(&store, &view, &device);
        assert_eq!(first.candidates, 2);
        assert_eq!(first.draw_calls, 0);

        let second = orch.render_frame(&store, &view, &device);
        assert_eq!(second.buffers_built, 2);
        assert_eq!(second.draw_calls, 2);
        assert_eq!(second.points, 4);
    }

    #[test]
    fn repeated_frames_fetch_each_tile_once() {
        let store = MemoryStore::new(&[10.0, 20.0, 30.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig::default());
        let view = StaticView::zoomed(1.0);

        for _ in 0..5 {
            orch.render_frame(&store, &view, &device);
        }
        assert_eq!(store.fetches.get(), 4);
        assert_eq!(orch.cache().fetches_issued(), 4);
        assert_eq!(device.created.borrow().len(), 4);
    }

    // ── budget ───────────────────────────────────────────────────────────

    #[test]
    fn budget_scales_with_zoom_and_bounds_tiles() {
        let store = MemoryStore::new(&[1500.0, 2500.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig {
            max_points: 1000.0,
            ..RenderConfig::default()
        });
        let view = StaticView::zoomed(2.0);

        orch.render_frame(&store, &view, &device);
        let stats = orch.render_frame(&store, &view, &device);

        assert_eq!(stats.budget, 2000.0);
        assert_eq!(store.hints.borrow().as_slice(), &[2000.0, 2000.0]);
        assert_eq!(drawn_tiles(&orch), vec![TileKey::ROOT, TileKey::new(1, 0, 0)]);
    }

    // ── passes ───────────────────────────────────────────────────────────

    #[test]
    fn one_pass_per_tile_without_labels() {
        let store = MemoryStore::new(&[10.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig::default());
        let view = StaticView::zoomed(1.0);

        orch.render_frame(&store, &view, &device);
        let stats = orch.render_frame(&store, &view, &device);
        assert_eq!(stats.drawn_tiles, 2);
        assert_eq!(stats.draw_calls, 2);
    }

    #[test]
    fn eight_ordered_passes_per_tile_with_labels() {
        let store = MemoryStore::new(&[10.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig {
            label_field: Some("name".into()),
            ..RenderConfig::default()
        });
        let view = StaticView::zoomed(1.0);

        orch.render_frame(&store, &view, &device);
        let stats = orch.render_frame(&store, &view, &device);
        assert_eq!(stats.draw_calls, 16);

        let draws = orch.commands().draws();
        for (tile_draws, key) in draws.chunks(8).zip([TileKey::ROOT, TileKey::new(1, 0, 0)]) {
            assert!(tile_draws.iter().all(|d| d.tile == key));
            let slots: Vec<u32> = tile_draws.iter().map(|d| d.uniforms.string_index).collect();
            assert_eq!(slots, (0..8).collect::<Vec<_>>());
        }
    }

    #[test]
    fn labels_encode_only_for_fine_tiles_and_only_once() {
        // Budget 1000, threshold 2: tiles with min above 500 get labels.
        let store = MemoryStore::new(&[600.0, 400.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig {
            max_points: 1000.0,
            label_field: Some("name".into()),
            label_threshold: 2.0,
            ..RenderConfig::default()
        });
        let view = StaticView::zoomed(1.0);

        orch.render_frame(&store, &view, &device);
        let stats = orch.render_frame(&store, &view, &device);
        assert_eq!(stats.labels_encoded, 1);

        orch.render_frame(&store, &view, &device);
        assert_eq!(device.writes.borrow().len(), 1);
        assert!(orch.cache().charset(TileKey::new(1, 0, 0)).unwrap().contains(&'f'));
    }

    /// What the vertex shader makes of one point in one pass.
    #[derive(Debug, PartialEq)]
    enum Sprite {
        Hidden,
        Dot,
        Glyph(u32),
    }

    /// Mirrors the point selection in `vs_main`.
    fn sprite(u: &PointUniforms, ix: f32, label: [f32; 4]) -> Sprite {
        if ix > u.max_ix {
            return Sprite::Hidden;
        }
        let encoded = label.iter().any(|w| *w != 0.0);
        let labelled = encoded
            && u.render_label_threshold > 0.0
            && ix * (u.render_label_threshold / u.max_ix) > u.max_ix;

        if labelled {
            let word = label[(u.string_index / 2) as usize] as u32;
            let code = if u.string_index % 2 == 0 { word & 0xff } else { (word >> 8) & 0xff };
            if code == 0 || code == MISSING_GLYPH {
                Sprite::Hidden
            } else {
                Sprite::Glyph(code)
            }
        } else if u.string_index != 0 {
            Sprite::Hidden
        } else {
            Sprite::Dot
        }
    }

    #[test]
    fn unpacked_tile_straddling_label_threshold_draws_dots() {
        // Budget 1000, threshold 2: points above ix 500 take the label path,
        // but only tiles with min above 500 are packed. The 450 tile holds
        // ix 450 and 540.
        let store = MemoryStore::new(&[450.0, 600.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig {
            max_points: 1000.0,
            label_field: Some("name".into()),
            label_threshold: 2.0,
            ..RenderConfig::default()
        });
        let view = StaticView::zoomed(1.0);

        orch.render_frame(&store, &view, &device);
        orch.render_frame(&store, &view, &device);

        // Only the 600 tile was packed.
        let writes = device.writes.borrow();
        assert_eq!(writes.len(), 1);
        let packed: &[f32] = bytemuck::cast_slice(&writes[0].2);
        let second_label: [f32; 4] = packed[7..11].try_into().unwrap();
        assert_eq!(second_label, pack_label("second"));

        let draws = orch.commands().draws();
        let straddling: Vec<_> = draws.iter().filter(|d| d.tile == TileKey::new(1, 0, 0)).collect();
        assert_eq!(straddling.len(), 8);

        let u = &straddling[0].uniforms;
        assert!(540.0 * (u.render_label_threshold / u.max_ix) > u.max_ix);
        let sprites: Vec<_> = straddling.iter().map(|d| sprite(&d.uniforms, 540.0, [0.0; 4])).collect();
        assert_eq!(sprites[0], Sprite::Dot);
        assert!(sprites[1..].iter().all(|s| *s == Sprite::Hidden));

        let fine = draws
            .iter()
            .find(|d| d.tile == TileKey::new(1, 1, 0) && d.pass == 0)
            .unwrap();
        assert_eq!(sprite(&fine.uniforms, 690.0, second_label), Sprite::Glyph('s' as u32));
    }

    // ── composition ──────────────────────────────────────────────────────

    #[test]
    fn missing_color_field_draws_nothing() {
        let store = MemoryStore::new(&[10.0]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig {
            color_field: "temperature".into(),
            ..RenderConfig::default()
        });
        let view = StaticView::zoomed(1.0);

        for _ in 0..3 {
            orch.render_frame(&store, &view, &device);
            assert!(orch.commands().is_empty());
        }
        assert!(orch.descriptor().is_none());
        assert_eq!(orch.generation(), 0);
    }

    #[test]
    fn descriptor_is_reused_until_config_changes() {
        let store = MemoryStore::new(&[]);
        let device = RecordingDevice::default();
        let mut orch = orchestrator(RenderConfig::default());
        let view = StaticView::zoomed(1.0);

        for _ in 0..3 {
            orch.render_frame(&store, &view, &device);
        }
        assert_eq!(orch.generation(), 1);

        orch.set_config(RenderConfig {
            color_domain: [0.0, 10.0],
            ..RenderConfig::default()
        });
        orch.render_frame(&store, &view, &device);
        assert_eq!(orch.generation(), 2);
        assert_eq!(orch.descriptor().unwrap().uniforms().color_domain, [0.0, 10.0]);
    }
}
