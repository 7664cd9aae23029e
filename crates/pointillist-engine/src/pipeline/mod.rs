//! Draw pipeline composition.
//!
//! [`compose`] turns a dataset schema plus configuration into a
//! [`PipelineDescriptor`]: per-tile vertex attribute layouts and the constant
//! part of the uniforms. The descriptor is immutable; per-draw uniform values
//! come from [`PipelineDescriptor::evaluate`], a pure function of the frame's
//! view state and the pass being drawn.

mod descriptor;
mod uniforms;

pub use descriptor::{
    compose, Attribute, AttributeBinding, PipelineDescriptor, TextureBinding, UniformBindings,
    QUAD_LOCATION,
};
pub use uniforms::PointUniforms;
