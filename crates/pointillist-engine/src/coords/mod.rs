//! Coordinate and geometry types.
//!
//! Data space:
//! - dataset coordinates as reported by the tile store
//! - +X right, +Y up
//!
//! Screen placement is the shader's job; the CPU side only needs rectangles
//! for visible-region culling and a linear color for clears.

mod color;
mod rect;
mod vec2;

pub use color::ColorRgba;
pub use rect::Rect;
pub use vec2::Vec2;
