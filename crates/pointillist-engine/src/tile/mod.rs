//! Tile hierarchy seam and per-tile GPU state.
//!
//! Responsibilities:
//! - describe tiles as reported by the storage collaborator (`TileInfo`, `Schema`)
//! - own each tile's GPU buffer and in-flight markers (`TileBufferCache`)
//! - pick the tiles worth drawing for a budget (`visible_tiles`)

mod cache;
mod schema;
mod store;
mod types;
mod visible;

pub use cache::{DrawableBuffer, InFlight, TileBufferCache};
pub use schema::{
    ElementType, FieldLayout, Schema, LABEL_BUFFER_FIELD, ORDER_INDEX_FIELD, POSITION_FIELD,
};
pub use store::{FetchFuture, PointBatch, TileStore};
pub use types::{OrderRange, TileInfo, TileKey};
pub use visible::visible_tiles;

pub(crate) use cache::TileSlot;
