//! Renderer configuration surface.

use crate::coords::ColorRgba;
use crate::label::{LabelEncoding, LabelKey, LABEL_WINDOW};
use crate::texture::RampKind;

/// Configuration consumed by the frame orchestrator and pipeline composer.
///
/// Changing the color field or domains requires recomposing the draw
/// pipeline; use [`crate::frame::FrameOrchestrator::set_config`], which
/// takes care of that.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Point sprite size in pixels.
    pub point_size: f32,

    /// Point budget at zoom `k == 1`. The effective budget is `max_points * k`.
    pub max_points: f64,

    /// Text field rendered as a label next to each point, if any.
    pub label_field: Option<String>,

    /// Label visibility multiplier.
    ///
    /// A tile's labels are (re)encoded when `ordering.min * label_threshold`
    /// exceeds the current budget; the shader receives `budget * label_threshold`.
    pub label_threshold: f64,

    /// Master switch for label rendering. With labels off, one draw pass per tile.
    pub labels_enabled: bool,

    /// Schema field driving point color.
    pub color_field: String,

    /// Value range mapped onto the colormap.
    pub color_domain: [f32; 2],

    /// Value range of the label field, forwarded to the shader.
    pub label_domain: [f32; 2],

    /// Which prebuilt colormap ramp is bound.
    pub colormap: RampKind,

    /// Glyph atlas cell size in pixels. The atlas is `16 * glyph_cell_size` square.
    pub glyph_cell_size: u32,

    /// Frame clear color.
    pub clear_color: ColorRgba,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            point_size: 7.0,
            max_points: 100_000.0,
            label_field: None,
            label_threshold: 2.0,
            labels_enabled: true,
            color_field: "ix".to_string(),
            color_domain: [0.0, 1.0],
            label_domain: [0.0, 1.0],
            colormap: RampKind::Diverging,
            glyph_cell_size: 64,
            clear_color: ColorRgba::new(0.1, 0.1, 0.13, 1.0),
        }
    }
}

impl RenderConfig {
    /// Effective point budget at zoom scale `k`.
    #[inline]
    pub fn point_budget(&self, k: f32) -> f64 {
        self.max_points * k as f64
    }

    /// The label configuration currently in effect, if labels are drawn at all.
    pub fn label_key(&self) -> Option<LabelKey> {
        if !self.labels_enabled {
            return None;
        }
        self.label_field
            .as_ref()
            .map(|field| LabelKey::new(field.clone(), LabelEncoding::Ascii))
    }

    /// Draw passes per tile: one per label character slot, or one without labels.
    #[inline]
    pub fn pass_count(&self) -> u32 {
        if self.label_key().is_some() {
            LABEL_WINDOW as u32
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_scales_with_zoom() {
        let config = RenderConfig {
            max_points: 1000.0,
            ..RenderConfig::default()
        };
        assert_eq!(config.point_budget(2.0), 2000.0);
    }

    #[test]
    fn one_pass_without_label_field() {
        assert_eq!(RenderConfig::default().pass_count(), 1);
    }

    #[test]
    fn label_window_passes_with_label_field() {
        let config = RenderConfig {
            label_field: Some("name".into()),
            ..RenderConfig::default()
        };
        assert_eq!(config.pass_count(), 8);
    }

    #[test]
    fn disabled_labels_fall_back_to_one_pass() {
        let config = RenderConfig {
            label_field: Some("name".into()),
            labels_enabled: false,
            ..RenderConfig::default()
        };
        assert_eq!(config.pass_count(), 1);
        assert!(config.label_key().is_none());
    }
}
