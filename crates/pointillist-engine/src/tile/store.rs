use std::collections::HashMap;

use futures::future::LocalBoxFuture;

use super::{Schema, TileInfo, TileKey};
use crate::coords::Rect;

/// Future returned by the tile storage collaborator.
///
/// Frames are driven on one thread, so fetches need not be `Send`.
pub type FetchFuture<T> = LocalBoxFuture<'static, anyhow::Result<T>>;

/// Raw point records of one tile, as fetched.
///
/// `floats` is the interleaved record buffer described by the tile's
/// [`Schema`]. Text columns (used for labels) travel alongside it, one
/// entry per point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBatch {
    floats: Vec<f32>,
    text: HashMap<String, Vec<String>>,
}

impl PointBatch {
    pub fn new(floats: Vec<f32>) -> Self {
        Self {
            floats,
            text: HashMap::new(),
        }
    }

    pub fn with_text_column(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.text.insert(name.into(), values);
        self
    }

    /// Length of the raw buffer in floats.
    #[inline]
    pub fn len(&self) -> usize {
        self.floats.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
    }

    #[inline]
    pub fn floats(&self) -> &[f32] {
        &self.floats
    }

    /// Mutable record buffer alongside a read-only text column.
    pub(crate) fn split_text_mut(&mut self, name: &str) -> (&mut [f32], Option<&[String]>) {
        (&mut self.floats, self.text.get(name).map(Vec::as_slice))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.floats)
    }

    pub fn text_column(&self, name: &str) -> Option<&[String]> {
        self.text.get(name).map(Vec::as_slice)
    }
}

/// Tile storage collaborator.
///
/// Owns the tile hierarchy, fetching and eviction. The engine walks the tree
/// through `root`/`children`, requests data through the two fetch futures and
/// forwards its prefetch hint once per frame.
pub trait TileStore {
    /// Root of the hierarchy, once known.
    fn root(&self) -> Option<TileInfo>;

    /// Direct children of `key`. Children never have a lower `ordering.min`
    /// than their parent.
    fn children(&self, key: TileKey) -> Vec<TileInfo>;

    /// Dataset-wide schema, `None` while it is still loading.
    fn schema(&self) -> Option<Schema>;

    fn fetch_points(&self, key: TileKey) -> FetchFuture<PointBatch>;

    fn fetch_schema(&self, key: TileKey) -> FetchFuture<Schema>;

    /// Prefetch hint: the view needs points up to `budget` within `corners`.
    /// Not awaited.
    fn prioritize_download_to(&self, budget: f64, corners: Rect);
}
