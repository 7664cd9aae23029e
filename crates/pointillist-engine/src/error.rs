//! Error taxonomy.
//!
//! Not-ready states (schema pending, tile buffer pending) are not errors for
//! the frame loop: buffers surface them as `None`, composition as
//! [`ComposeError::NotReady`]. Out-of-range glyphs never surface at all; the
//! label packer substitutes fallback codes.

use thiserror::Error;

/// Reasons the draw pipeline descriptor could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// The dataset schema has not been reported yet, or is empty.
    #[error("dataset schema is not available yet")]
    NotReady,

    /// A field the pipeline binds is absent from the schema.
    #[error("schema is missing required field `{0}`")]
    MissingField(String),

    /// A bound field has a component count the attribute cannot accept.
    #[error("field `{field}` has {found} components, attribute `{attribute}` expects {expected}")]
    UnsupportedLayout {
        attribute: &'static str,
        field: String,
        expected: usize,
        found: usize,
    },
}

impl ComposeError {
    /// True for the transient "try again next frame" case.
    #[inline]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ComposeError::NotReady)
    }
}

/// Error returned by [`crate::texture::FontSystem::load_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);
