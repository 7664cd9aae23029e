//! GPU rendering subsystem.
//!
//! Turns recorded [`crate::frame::FrameCommands`] into one wgpu render pass.
//! Tile buffers are drawn as instanced quads: every schema attribute gets its
//! own vertex buffer slot over the same tile buffer, offset to the field.

mod ctx;
mod points;
mod renderer;
mod textures;

pub use ctx::{RenderCtx, RenderTarget};
pub use points::PointRenderer;
pub use renderer::PointCloudRenderer;
pub use textures::LookupTextures;
