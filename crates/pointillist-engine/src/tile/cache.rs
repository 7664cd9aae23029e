use std::collections::{BTreeSet, HashMap, HashSet};
use std::task::{Context, Poll};

use futures::future::{self, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use super::{PointBatch, Schema, TileInfo, TileKey, TileStore};
use crate::device::BufferDevice;
use crate::label::{self, EncodeOutcome, LabelKey, LabelState};

/// A tile buffer ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableBuffer<B> {
    pub count: u32,
    pub handle: B,
}

/// Tags of pending per-tile operations. A tag is held at most once per tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InFlight {
    BufferBuild,
}

/// Fetched records kept next to the GPU buffer so label regions can be
/// repacked without another fetch.
#[derive(Debug)]
pub(crate) struct TilePayload {
    pub batch: PointBatch,
    pub schema: Schema,
}

/// Engine-side state for one tile.
#[derive(Debug)]
pub(crate) struct TileSlot<B> {
    pub buffer: Option<DrawableBuffer<B>>,
    pub in_flight: HashSet<InFlight>,
    pub payload: Option<TilePayload>,
    pub label: LabelState,
    pub charset: BTreeSet<char>,
    pub parent: Option<TileKey>,
    pub failures: u32,
}

impl<B> TileSlot<B> {
    fn new(parent: Option<TileKey>) -> Self {
        Self {
            buffer: None,
            in_flight: HashSet::new(),
            payload: None,
            label: LabelState::default(),
            charset: BTreeSet::new(),
            parent,
            failures: 0,
        }
    }
}

type Completion = (TileKey, anyhow::Result<(PointBatch, Schema)>);

/// Lazily populated per-tile GPU buffers.
///
/// `acquire` never blocks: the first call for a tile starts one fetch and
/// returns `None`; the buffer is built when [`Self::poll_completions`] sees the
/// fetch finish. A built buffer is never replaced.
pub struct TileBufferCache<B> {
    slots: HashMap<TileKey, TileSlot<B>>,
    pending: FuturesUnordered<LocalBoxFuture<'static, Completion>>,
    fetches_issued: u64,
}

impl<B> Default for TileBufferCache<B> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            pending: FuturesUnordered::new(),
            fetches_issued: 0,
        }
    }
}

impl<B: Clone> TileBufferCache<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tile's buffer if built; otherwise starts a fetch unless one
    /// is already in flight, and returns `None`.
    pub fn acquire<S>(&mut self, tile: &TileInfo, store: &S) -> Option<DrawableBuffer<B>>
    where
        S: TileStore + ?Sized,
    {
        let slot = self
            .slots
            .entry(tile.key)
            .or_insert_with(|| TileSlot::new(tile.parent));

        if let Some(buffer) = &slot.buffer {
            return Some(buffer.clone());
        }

        if slot.in_flight.insert(InFlight::BufferBuild) {
            let key = tile.key;
            let fetch = future::try_join(store.fetch_points(key), store.fetch_schema(key));
            self.pending
                .push(async move { (key, fetch.await) }.boxed_local());
            self.fetches_issued += 1;
            log::trace!("tile {key}: fetch started");
        }

        None
    }

    /// Drains finished fetches and builds their buffers. Returns the number of
    /// buffers built.
    pub fn poll_completions<D>(&mut self, device: &D) -> usize
    where
        D: BufferDevice<Buffer = B> + ?Sized,
    {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut built = 0;

        while let Poll::Ready(Some((key, result))) = self.pending.poll_next_unpin(&mut cx) {
            // Evicted while the fetch was running.
            let Some(slot) = self.slots.get_mut(&key) else {
                continue;
            };
            slot.in_flight.remove(&InFlight::BufferBuild);

            match result {
                Ok((batch, schema)) => {
                    if slot.buffer.is_some() {
                        continue;
                    }

                    let count = schema.point_count(batch.len());
                    let handle = device.create_point_buffer(&format!("tile {key}"), batch.as_bytes());
                    log::debug!("tile {key}: buffer built ({count} points)");

                    slot.buffer = Some(DrawableBuffer { count, handle });
                    slot.payload = Some(TilePayload { batch, schema });
                    built += 1;
                }
                Err(err) => {
                    slot.failures += 1;
                    if slot.failures == 1 {
                        log::warn!("tile {key}: fetch failed: {err:#}");
                    } else {
                        log::debug!("tile {key}: fetch failed again ({}): {err:#}", slot.failures);
                    }
                }
            }
        }

        built
    }

    /// Repacks the tile's label region for `key` if it reflects another configuration.
    pub fn encode_labels<D>(&mut self, tile: TileKey, key: &LabelKey, device: &D) -> EncodeOutcome
    where
        D: BufferDevice<Buffer = B> + ?Sized,
    {
        let parent_charset = self
            .slots
            .get(&tile)
            .and_then(|slot| slot.parent)
            .and_then(|parent| self.slots.get(&parent))
            .map(|parent| parent.charset.clone());

        match self.slots.get_mut(&tile) {
            Some(slot) => label::encode(tile, slot, parent_charset.as_ref(), key, device),
            None => EncodeOutcome::NotReady,
        }
    }

    /// Characters seen in the tile's labels, inherited ones included.
    pub fn charset(&self, key: TileKey) -> Option<&BTreeSet<char>> {
        self.slots.get(&key).map(|slot| &slot.charset)
    }

    pub fn is_in_flight(&self, key: TileKey) -> bool {
        self.slots
            .get(&key)
            .is_some_and(|slot| slot.in_flight.contains(&InFlight::BufferBuild))
    }

    /// Total fetches started over the cache's lifetime.
    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    /// Fetches not yet completed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of tiles with a built buffer.
    pub fn resident(&self) -> usize {
        self.slots.values().filter(|s| s.buffer.is_some()).count()
    }

    /// Drops a tile's state; called when storage evicts the tile.
    ///
    /// Returns the buffer so the caller can release it on the device. A fetch
    /// still running for the tile is discarded when it lands.
    pub fn evict(&mut self, key: TileKey) -> Option<B> {
        self.slots
            .remove(&key)
            .and_then(|slot| slot.buffer)
            .map(|buffer| buffer.handle)
    }

    /// Removes every tile, yielding their buffers.
    pub fn drain(&mut self) -> impl Iterator<Item = B> + '_ {
        self.pending = FuturesUnordered::new();
        self.slots
            .drain()
            .filter_map(|(_, slot)| slot.buffer.map(|b| b.handle))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use futures::channel::oneshot;
    use futures::future::{self, FutureExt};

    use super::*;
    use crate::coords::Rect;
    use crate::device::testing::RecordingDevice;
    use crate::label::{pack_label, LabelEncoding};
    use crate::tile::{
        ElementType, FetchFuture, FieldLayout, OrderRange, LABEL_BUFFER_FIELD, ORDER_INDEX_FIELD,
        POSITION_FIELD,
    };

    fn schema() -> Schema {
        Schema::interleaved([
            ("x", ElementType::Float32),
            ("y", ElementType::Float32),
            (ORDER_INDEX_FIELD, ElementType::Float32),
            (LABEL_BUFFER_FIELD, ElementType::Float32x4),
        ])
        .with_composite(POSITION_FIELD, "x", ElementType::Float32x2)
    }

    fn batch(points: usize, names: &[&str]) -> PointBatch {
        PointBatch::new(vec![0.5; points * 7]).with_text_column(
            "name",
            names.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Store whose fetches either resolve immediately or wait on a channel.
    #[derive(Default)]
    struct ScriptedStore {
        ready: HashMap<TileKey, PointBatch>,
        gated: RefCell<HashMap<TileKey, oneshot::Receiver<anyhow::Result<PointBatch>>>>,
        point_fetches: Cell<u32>,
        /// Schema reported by `fetch_schema` instead of the default one.
        layout: Option<Schema>,
    }

    impl TileStore for ScriptedStore {
        fn root(&self) -> Option<TileInfo> {
            None
        }

        fn children(&self, _key: TileKey) -> Vec<TileInfo> {
            Vec::new()
        }

        fn schema(&self) -> Option<Schema> {
            Some(schema())
        }

        fn fetch_points(&self, key: TileKey) -> FetchFuture<PointBatch> {
            self.point_fetches.set(self.point_fetches.get() + 1);
            if let Some(rx) = self.gated.borrow_mut().remove(&key) {
                return async move { rx.await? }.boxed_local();
            }
            match self.ready.get(&key) {
                Some(batch) => future::ready(Ok(batch.clone())).boxed_local(),
                None => future::ready(Err(anyhow::anyhow!("no data for {key}"))).boxed_local(),
            }
        }

        fn fetch_schema(&self, _key: TileKey) -> FetchFuture<Schema> {
            let layout = self.layout.clone().unwrap_or_else(schema);
            future::ready(Ok(layout)).boxed_local()
        }

        fn prioritize_download_to(&self, _budget: f64, _corners: Rect) {}
    }

    fn tile(key: TileKey) -> TileInfo {
        TileInfo::new(key, OrderRange::new(0.0, 100.0))
    }

    // ── acquire ──────────────────────────────────────────────────────────

    #[test]
    fn acquire_twice_while_pending_fetches_once() {
        let key = TileKey::ROOT;
        let (tx, rx) = oneshot::channel();
        let store = ScriptedStore::default();
        store.gated.borrow_mut().insert(key, rx);

        let device = RecordingDevice::default();
        let mut cache = TileBufferCache::new();

        assert!(cache.acquire(&tile(key), &store).is_none());
        assert!(cache.acquire(&tile(key), &store).is_none());
        cache.poll_completions(&device);
        assert!(cache.acquire(&tile(key), &store).is_none());

        assert_eq!(store.point_fetches.get(), 1);
        assert_eq!(cache.fetches_issued(), 1);
        assert!(cache.is_in_flight(key));

        tx.send(Ok(batch(3, &[]))).unwrap();
        assert_eq!(cache.poll_completions(&device), 1);
        assert!(!cache.is_in_flight(key));

        let buffer = cache.acquire(&tile(key), &store).unwrap();
        assert_eq!(buffer.count, 3);
        assert_eq!(store.point_fetches.get(), 1);
    }

    #[test]
    fn built_buffer_is_never_replaced() {
        let key = TileKey::ROOT;
        let mut store = ScriptedStore::default();
        store.ready.insert(key, batch(2, &[]));
        let device = RecordingDevice::default();
        let mut cache = TileBufferCache::new();

        cache.acquire(&tile(key), &store);
        cache.poll_completions(&device);
        let first = cache.acquire(&tile(key), &store).unwrap();

        for _ in 0..3 {
            cache.poll_completions(&device);
            assert_eq!(cache.acquire(&tile(key), &store), Some(first.clone()));
        }
        assert_eq!(device.created.borrow().len(), 1);
        assert_eq!(store.point_fetches.get(), 1);
    }

    #[test]
    fn failed_fetch_clears_marker_and_retries() {
        let key = TileKey::new(1, 0, 1);
        let store = ScriptedStore::default();
        let device = RecordingDevice::default();
        let mut cache = TileBufferCache::<u32>::new();

        assert!(cache.acquire(&tile(key), &store).is_none());
        assert_eq!(cache.poll_completions(&device), 0);
        assert!(!cache.is_in_flight(key));

        assert!(cache.acquire(&tile(key), &store).is_none());
        assert_eq!(store.point_fetches.get(), 2);
    }

    #[test]
    fn evicted_tile_ignores_late_completion() {
        let key = TileKey::ROOT;
        let (tx, rx) = oneshot::channel();
        let store = ScriptedStore::default();
        store.gated.borrow_mut().insert(key, rx);
        let device = RecordingDevice::default();
        let mut cache = TileBufferCache::new();

        cache.acquire(&tile(key), &store);
        assert_eq!(cache.evict(key), None);
        tx.send(Ok(batch(1, &[]))).unwrap();

        assert_eq!(cache.poll_completions(&device), 0);
        assert_eq!(cache.resident(), 0);
    }

    // ── labels ───────────────────────────────────────────────────────────

    fn label_key() -> LabelKey {
        LabelKey::new("name", LabelEncoding::Ascii)
    }

    fn resident_cache(store: &ScriptedStore, key: TileKey, device: &RecordingDevice) -> TileBufferCache<u32> {
        let mut cache = TileBufferCache::new();
        cache.acquire(&tile(key), store);
        cache.poll_completions(device);
        cache
    }

    #[test]
    fn encode_twice_writes_once() {
        let key = TileKey::ROOT;
        let mut store = ScriptedStore::default();
        store.ready.insert(key, batch(2, &["alpha", "beta"]));
        let device = RecordingDevice::default();
        let mut cache = resident_cache(&store, key, &device);

        assert_eq!(
            cache.encode_labels(key, &label_key(), &device),
            EncodeOutcome::Encoded { points: 2 }
        );
        assert_eq!(
            cache.encode_labels(key, &label_key(), &device),
            EncodeOutcome::UpToDate
        );
        assert_eq!(device.writes.borrow().len(), 1);
    }

    #[test]
    fn encode_writes_label_region_only() {
        let key = TileKey::ROOT;
        let mut store = ScriptedStore::default();
        store.ready.insert(key, batch(2, &["alpha", "beta"]));
        let device = RecordingDevice::default();
        let mut cache = resident_cache(&store, key, &device);

        cache.encode_labels(key, &label_key(), &device);

        let writes = device.writes.borrow();
        let (_, offset, bytes) = &writes[0];
        assert_eq!(*offset, 12);
        // One full stride for the first point plus the second point's label words.
        assert_eq!(bytes.len(), 28 + 16);

        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(&floats[..4], &pack_label("alpha"));
        assert_eq!(&floats[4..7], &[0.5, 0.5, 0.5]);
        assert_eq!(&floats[7..11], &pack_label("beta"));
    }

    #[test]
    fn missing_text_column_encodes_blank_labels() {
        let key = TileKey::ROOT;
        let mut store = ScriptedStore::default();
        store.ready.insert(key, PointBatch::new(vec![0.0; 7]));
        let device = RecordingDevice::default();
        let mut cache = resident_cache(&store, key, &device);

        assert_eq!(
            cache.encode_labels(key, &label_key(), &device),
            EncodeOutcome::Encoded { points: 1 }
        );
        let writes = device.writes.borrow();
        let floats: &[f32] = bytemuck::cast_slice(&writes[0].2);
        assert_eq!(floats, &pack_label(""));
    }

    #[test]
    fn charset_is_seeded_from_parent() {
        let parent = TileKey::ROOT;
        let child = TileKey::new(1, 0, 0);
        let mut store = ScriptedStore::default();
        store.ready.insert(parent, batch(1, &["ab"]));
        store.ready.insert(child, batch(1, &["cd"]));
        let device = RecordingDevice::default();

        let mut cache = TileBufferCache::new();
        cache.acquire(&tile(parent), &store);
        cache.acquire(&tile(child), &store);
        cache.poll_completions(&device);

        cache.encode_labels(parent, &label_key(), &device);
        cache.encode_labels(child, &label_key(), &device);

        let charset: String = cache.charset(child).unwrap().iter().collect();
        assert_eq!(charset, "abcd");
    }

    #[test]
    fn unaligned_label_region_is_skipped() {
        let key = TileKey::ROOT;
        let mut layout = schema();
        layout.insert(
            LABEL_BUFFER_FIELD,
            FieldLayout {
                offset: 14,
                stride: 28,
                element: ElementType::Float32x4,
                composite: false,
            },
        );
        let mut store = ScriptedStore {
            layout: Some(layout),
            ..ScriptedStore::default()
        };
        store.ready.insert(key, batch(2, &["alpha", "beta"]));
        let device = RecordingDevice::default();
        let mut cache = resident_cache(&store, key, &device);

        assert_eq!(
            cache.encode_labels(key, &label_key(), &device),
            EncodeOutcome::MissingLayout
        );
        assert!(device.writes.borrow().is_empty());
        assert!(cache.charset(key).is_some_and(BTreeSet::is_empty));
    }

    #[test]
    fn encode_before_buffer_is_not_ready() {
        let device = RecordingDevice::default();
        let mut cache = TileBufferCache::<u32>::new();
        assert_eq!(
            cache.encode_labels(TileKey::ROOT, &label_key(), &device),
            EncodeOutcome::NotReady
        );
    }
}
