//! CPU-side texture builders.
//!
//! Both lookup textures are built once when the renderer is constructed and
//! never change afterwards:
//! - the glyph atlas indexed by packed label character codes
//! - the colormap ramps sampled by point color values
//!
//! Uploading is the render module's job.

mod colormap;
mod font;
mod glyph_atlas;

pub use colormap::{build_ramp, ColorScale, RampKind, RAMP_WIDTH};
pub use font::FontSystem;
pub use glyph_atlas::{GlyphAtlas, GlyphBitmap, GlyphRaster, ATLAS_COLUMNS, ATLAS_GLYPHS};
