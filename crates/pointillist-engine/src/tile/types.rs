use std::fmt;

use crate::coords::Rect;

/// Identity of a tile in the quadtree: depth plus column/row at that depth.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub depth: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub const ROOT: TileKey = TileKey { depth: 0, x: 0, y: 0 };

    #[inline]
    pub const fn new(depth: u8, x: u32, y: u32) -> Self {
        Self { depth, x, y }
    }

    /// The parent key, or `None` for the root.
    #[inline]
    pub fn parent(self) -> Option<TileKey> {
        if self.depth == 0 {
            None
        } else {
            Some(TileKey::new(self.depth - 1, self.x / 2, self.y / 2))
        }
    }

    /// The four child keys in (x, y) order, matching [`Rect::quadrants`].
    pub fn children(self) -> [TileKey; 4] {
        let (d, x, y) = (self.depth + 1, self.x * 2, self.y * 2);
        [
            TileKey::new(d, x, y),
            TileKey::new(d, x + 1, y),
            TileKey::new(d, x, y + 1),
            TileKey::new(d, x + 1, y + 1),
        ]
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.depth, self.x, self.y)
    }
}

/// Range of ordering indices held by a tile.
///
/// Lower indices are coarser and always shown first; a tile becomes relevant
/// once the point budget reaches its `min`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct OrderRange {
    pub min: f64,
    pub max: f64,
}

impl OrderRange {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// A tile as reported by the storage collaborator.
///
/// The engine never owns tiles; it keys its own per-tile state by `key`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileInfo {
    pub key: TileKey,
    pub ordering: OrderRange,
    /// Non-owning link to the parent tile, used to inherit label charsets.
    pub parent: Option<TileKey>,
    /// Data-space bounds, when the store knows them.
    pub extent: Option<Rect>,
}

impl TileInfo {
    pub fn new(key: TileKey, ordering: OrderRange) -> Self {
        Self {
            key,
            ordering,
            parent: key.parent(),
            extent: None,
        }
    }

    pub fn with_extent(mut self, extent: Rect) -> Self {
        self.extent = Some(extent);
        self
    }
}
