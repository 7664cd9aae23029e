use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pointillist_engine::coords::Rect;
use pointillist_engine::tile::{
    ElementType, FetchFuture, OrderRange, PointBatch, Schema, TileInfo, TileKey, TileStore,
    LABEL_BUFFER_FIELD, ORDER_INDEX_FIELD, POSITION_FIELD,
};

const WORDS: &[&str] = &[
    "amber", "basalt", "cobalt", "dune", "ember", "fjord", "garnet", "harbor", "iris", "jade",
    "kelp", "lumen", "mesa", "nimbus", "onyx", "prism", "quartz", "russet", "sable", "tundra",
    "umber", "vesper", "willow", "xenon", "yarrow", "zephyr", "café", "naïve", "Ωmega",
];

/// Text column carried with every tile.
pub const NAME_FIELD: &str = "name";

/// Scalar field used for coloring, uniform in `[0, 1]`.
pub const VALUE_FIELD: &str = "value";

/// Options for [`SyntheticStore`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub depth: u8,
    pub points_per_tile: usize,
    pub latency: Duration,
    /// Probability that a point fetch fails.
    pub fail_rate: f64,
    /// How long the dataset schema takes to become available.
    pub schema_delay: Duration,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            depth: 5,
            points_per_tile: 2_000,
            latency: Duration::from_millis(40),
            fail_rate: 0.0,
            schema_delay: Duration::from_millis(200),
            seed: 7,
        }
    }
}

/// In-memory quadtree over `[-1, 1]²` standing in for a remote tile server.
///
/// Tiles are numbered level by level; tile `i` owns ordering indices
/// `[i * n, (i + 1) * n)`, so every child is finer than its parent. Points are
/// generated on fetch from a per-tile seed and arrive after `latency`.
pub struct SyntheticStore {
    config: SyntheticConfig,
    created: Instant,
    rng: RefCell<StdRng>,
    last_hint: Cell<f64>,
}

impl SyntheticStore {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(config.seed)),
            config,
            created: Instant::now(),
            last_hint: Cell::new(0.0),
        }
    }

    pub fn layout() -> Schema {
        Schema::interleaved([
            ("x", ElementType::Float32),
            ("y", ElementType::Float32),
            (ORDER_INDEX_FIELD, ElementType::Float32),
            (VALUE_FIELD, ElementType::Float32),
            (LABEL_BUFFER_FIELD, ElementType::Float32x4),
        ])
        .with_composite(POSITION_FIELD, "x", ElementType::Float32x2)
    }

    /// Level-order index of `key`.
    fn index(key: TileKey) -> u64 {
        let level_offset = (4u64.pow(u32::from(key.depth)) - 1) / 3;
        let side = 1u64 << key.depth;
        level_offset + u64::from(key.y) * side + u64::from(key.x)
    }

    fn extent(key: TileKey) -> Rect {
        let side = 2.0 / (1u32 << key.depth) as f32;
        Rect::new(-1.0 + key.x as f32 * side, -1.0 + key.y as f32 * side, side, side)
    }

    fn info(&self, key: TileKey) -> TileInfo {
        let n = self.config.points_per_tile as f64;
        let min = Self::index(key) as f64 * n;
        TileInfo::new(key, OrderRange::new(min, min + n)).with_extent(Self::extent(key))
    }

    fn generate(&self, key: TileKey) -> PointBatch {
        let n = self.config.points_per_tile;
        let extent = Self::extent(key);
        let first_ix = self.info(key).ordering.min as f32;
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ Self::index(key));

        let mut floats = Vec::with_capacity(n * 8);
        let mut names = Vec::with_capacity(n);
        for i in 0..n {
            let x = extent.origin.x + rng.r#gen::<f32>() * extent.size.x;
            let y = extent.origin.y + rng.r#gen::<f32>() * extent.size.y;
            floats.extend_from_slice(&[x, y, first_ix + i as f32, rng.r#gen::<f32>()]);
            // Label region is filled in by the renderer.
            floats.extend_from_slice(&[0.0; 4]);
            names.push(WORDS[rng.gen_range(0..WORDS.len())].to_string());
        }

        PointBatch::new(floats).with_text_column(NAME_FIELD, names)
    }
}

impl TileStore for SyntheticStore {
    fn root(&self) -> Option<TileInfo> {
        Some(self.info(TileKey::ROOT))
    }

    fn children(&self, key: TileKey) -> Vec<TileInfo> {
        if key.depth >= self.config.depth {
            return Vec::new();
        }
        key.children().into_iter().map(|k| self.info(k)).collect()
    }

    fn schema(&self) -> Option<Schema> {
        (self.created.elapsed() >= self.config.schema_delay).then(Self::layout)
    }

    fn fetch_points(&self, key: TileKey) -> FetchFuture<PointBatch> {
        let fail = self.rng.borrow_mut().gen_bool(self.config.fail_rate.clamp(0.0, 1.0));
        let batch = (!fail).then(|| self.generate(key));

        Delay::new(self.config.latency)
            .map(move |()| batch.ok_or_else(|| anyhow::anyhow!("simulated fetch failure for tile {key}")))
            .boxed_local()
    }

    fn fetch_schema(&self, _key: TileKey) -> FetchFuture<Schema> {
        Delay::new(self.config.latency)
            .map(|()| Ok(Self::layout()))
            .boxed_local()
    }

    fn prioritize_download_to(&self, budget: f64, corners: Rect) {
        if budget != self.last_hint.get() {
            log::trace!(
                "prefetch hint: budget {budget:.0} within ({:.3}, {:.3})..({:.3}, {:.3})",
                corners.min().x,
                corners.min().y,
                corners.max().x,
                corners.max().y
            );
        }
        self.last_hint.set(budget);
    }
}

/// Resolves once `deadline` has passed.
///
/// There is no timer thread; the future re-arms its waker on every poll and
/// relies on the frame loop polling it again.
struct Delay {
    deadline: Instant,
}

impl Delay {
    fn new(after: Duration) -> Self {
        Self {
            deadline: Instant::now() + after,
        }
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if Instant::now() >= self.deadline {
            Poll::Ready(())
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SyntheticStore {
        SyntheticStore::new(SyntheticConfig {
            depth: 2,
            points_per_tile: 10,
            latency: Duration::ZERO,
            schema_delay: Duration::ZERO,
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn children_are_finer_than_parents() {
        let store = store();
        let root = store.root().unwrap();
        for child in store.children(root.key) {
            assert!(child.ordering.min >= root.ordering.max);
            for grandchild in store.children(child.key) {
                assert!(grandchild.ordering.min > child.ordering.min);
                assert!(store.children(grandchild.key).is_empty());
            }
        }
    }

    #[test]
    fn fetched_batch_matches_layout() {
        let store = store();
        let key = TileKey::new(1, 1, 0);
        let batch = futures::executor::block_on(store.fetch_points(key)).unwrap();

        let layout = SyntheticStore::layout();
        assert_eq!(layout.point_count(batch.len()), 10);
        assert_eq!(batch.text_column(NAME_FIELD).map(<[String]>::len), Some(10));

        // Points fall inside the tile and carry the tile's ordering indices.
        let extent = SyntheticStore::extent(key);
        let min = store.info(key).ordering.min as f32;
        for (i, record) in batch.floats().chunks(8).enumerate() {
            assert!(record[0] >= extent.min().x && record[0] <= extent.max().x);
            assert_eq!(record[2], min + i as f32);
        }
    }

    #[test]
    fn always_failing_store_reports_errors() {
        let store = SyntheticStore::new(SyntheticConfig {
            fail_rate: 1.0,
            latency: Duration::ZERO,
            ..SyntheticConfig::default()
        });
        let result = futures::executor::block_on(store.fetch_points(TileKey::ROOT));
        assert!(result.is_err());
    }
}
