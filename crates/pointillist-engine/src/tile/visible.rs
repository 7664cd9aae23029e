use super::{TileInfo, TileStore};
use crate::coords::Rect;

/// Tiles worth drawing for `budget`, coarse to fine.
///
/// A tile qualifies when its `ordering.min` is within the budget and, if both
/// an extent and a visible region are known, the extent overlaps the region.
/// Children are never coarser than their parent, so a rejected tile's subtree
/// is skipped entirely.
pub fn visible_tiles<S>(store: &S, budget: f64, visible: Option<Rect>) -> Vec<TileInfo>
where
    S: TileStore + ?Sized,
{
    let mut out = Vec::new();
    let mut stack: Vec<TileInfo> = store.root().into_iter().collect();

    while let Some(tile) = stack.pop() {
        if tile.ordering.min > budget {
            continue;
        }
        if let (Some(extent), Some(region)) = (tile.extent, visible) {
            if !extent.intersects(region) {
                continue;
            }
        }

        stack.extend(store.children(tile.key).into_iter().rev());
        out.push(tile);
    }

    out.sort_by(|a, b| a.ordering.min.total_cmp(&b.ordering.min));
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::future::{self, FutureExt};

    use super::*;
    use crate::tile::{FetchFuture, OrderRange, PointBatch, Schema, TileKey};

    /// Hierarchy only; fetches are never made.
    struct Tree {
        tiles: HashMap<TileKey, TileInfo>,
    }

    impl Tree {
        fn new(tiles: Vec<TileInfo>) -> Self {
            Self {
                tiles: tiles.into_iter().map(|t| (t.key, t)).collect(),
            }
        }
    }

    impl TileStore for Tree {
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
            None
        }

        fn fetch_points(&self, _key: TileKey) -> FetchFuture<PointBatch> {
            future::ready(Ok(PointBatch::default())).boxed_local()
        }

        fn fetch_schema(&self, _key: TileKey) -> FetchFuture<Schema> {
            future::ready(Ok(Schema::new())).boxed_local()
        }

        fn prioritize_download_to(&self, _budget: f64, _corners: Rect) {}
    }

    fn info(depth: u8, x: u32, y: u32, min: f64) -> TileInfo {
        TileInfo::new(TileKey::new(depth, x, y), OrderRange::new(min, min + 1000.0))
    }

    #[test]
    fn budget_bounds_ordering_min() {
        let tree = Tree::new(vec![
            info(0, 0, 0, 0.0),
            info(1, 0, 0, 1500.0),
            info(1, 1, 0, 2500.0),
        ]);

        let keys: Vec<_> = visible_tiles(&tree, 2000.0, None)
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec![TileKey::ROOT, TileKey::new(1, 0, 0)]);
    }

    #[test]
    fn sorted_coarse_to_fine() {
        let tree = Tree::new(vec![
            info(0, 0, 0, 0.0),
            info(1, 0, 0, 900.0),
            info(1, 1, 0, 100.0),
            info(2, 2, 0, 500.0),
        ]);

        let mins: Vec<_> = visible_tiles(&tree, 1000.0, None)
            .iter()
            .map(|t| t.ordering.min)
            .collect();
        assert_eq!(mins, vec![0.0, 100.0, 500.0, 900.0]);
    }

    #[test]
    fn rejected_tile_prunes_subtree() {
        let tree = Tree::new(vec![
            info(0, 0, 0, 0.0),
            info(1, 0, 0, 5000.0),
            info(2, 0, 0, 10.0),
        ]);
        assert_eq!(visible_tiles(&tree, 1000.0, None).len(), 1);
    }

    #[test]
    fn extent_outside_view_is_culled() {
        let tree = Tree::new(vec![
            info(0, 0, 0, 0.0).with_extent(Rect::new(-1.0, -1.0, 2.0, 2.0)),
            info(1, 0, 0, 0.0).with_extent(Rect::new(-1.0, -1.0, 1.0, 1.0)),
            info(1, 1, 0, 0.0).with_extent(Rect::new(0.0, -1.0, 1.0, 1.0)),
        ]);

        let view = Rect::new(-0.9, -0.9, 0.5, 0.5);
        let keys: Vec<_> = visible_tiles(&tree, 1000.0, Some(view))
            .into_iter()
            .map(|t| t.key)
            .collect();
        assert_eq!(keys, vec![TileKey::ROOT, TileKey::new(1, 0, 0)]);

        // Without a region, extents are not consulted.
        assert_eq!(visible_tiles(&tree, 1000.0, None).len(), 3);
    }

    #[test]
    fn empty_store_has_no_tiles() {
        let tree = Tree::new(Vec::new());
        assert!(visible_tiles(&tree, 1e9, None).is_empty());
    }
}
