use crate::config::RenderConfig;
use crate::error::ComposeError;
use crate::label::LABEL_WORDS;
use crate::texture::RampKind;
use crate::tile::{ElementType, Schema, LABEL_BUFFER_FIELD, ORDER_INDEX_FIELD, POSITION_FIELD};
use crate::view::{PassState, ViewState};

use super::PointUniforms;

// `labelBuffer` is read as one vec4 per point.
const _: () = assert!(LABEL_WORDS == 4);

/// Shader location of the per-vertex unit quad.
pub const QUAD_LOCATION: u32 = 0;

/// Per-point attributes the point shader reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    PointOrderIndex,
    ColorField,
    LabelBuffer,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Position,
        Attribute::PointOrderIndex,
        Attribute::ColorField,
        Attribute::LabelBuffer,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Attribute::Position => "position",
            Attribute::PointOrderIndex => "pointOrderIndex",
            Attribute::ColorField => "colorField",
            Attribute::LabelBuffer => "labelBuffer",
        }
    }

    pub const fn location(self) -> u32 {
        match self {
            Attribute::Position => 1,
            Attribute::PointOrderIndex => 2,
            Attribute::ColorField => 3,
            Attribute::LabelBuffer => 4,
        }
    }

    pub const fn element(self) -> ElementType {
        match self {
            Attribute::Position => ElementType::Float32x2,
            Attribute::PointOrderIndex | Attribute::ColorField => ElementType::Float32,
            Attribute::LabelBuffer => ElementType::Float32x4,
        }
    }

    /// Schema field feeding this attribute.
    fn field(self, config: &RenderConfig) -> &str {
        match self {
            Attribute::Position => POSITION_FIELD,
            Attribute::PointOrderIndex => ORDER_INDEX_FIELD,
            Attribute::ColorField => &config.color_field,
            Attribute::LabelBuffer => LABEL_BUFFER_FIELD,
        }
    }
}

/// Where one attribute reads from in a tile buffer. The buffer itself is
/// bound per draw.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBinding {
    pub attribute: Attribute,
    pub field: String,
    pub offset: u64,
    pub stride: u64,
    pub format: wgpu::VertexFormat,
}

/// Lookup textures the pipeline samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureBinding {
    GlyphAtlas,
    Colormap(RampKind),
}

/// Uniforms fixed at composition time.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBindings {
    pub color_domain: [f32; 2],
    pub label_domain: [f32; 2],
    pub charmap: TextureBinding,
    pub colormap: TextureBinding,
}

/// Reusable draw-call description for every tile and frame until the schema
/// changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDescriptor {
    attributes: Vec<AttributeBinding>,
    uniforms: UniformBindings,
    schema: Schema,
}

/// Builds the descriptor for `schema`.
///
/// Returns [`ComposeError::NotReady`] while the schema is unknown or empty;
/// callers must not draw until this succeeds.
pub fn compose(
    schema: Option<&Schema>,
    config: &RenderConfig,
) -> Result<PipelineDescriptor, ComposeError> {
    let schema = schema
        .filter(|s| !s.is_empty())
        .ok_or(ComposeError::NotReady)?;

    let attributes = Attribute::ALL
        .into_iter()
        .map(|attribute| {
            let field = attribute.field(config);
            let layout = schema
                .get(field)
                .ok_or_else(|| ComposeError::MissingField(field.to_string()))?;

            let expected = attribute.element();
            if layout.element != expected {
                return Err(ComposeError::UnsupportedLayout {
                    attribute: attribute.name(),
                    field: field.to_string(),
                    expected: expected.components(),
                    found: layout.element.components(),
                });
            }

            Ok(AttributeBinding {
                attribute,
                field: field.to_string(),
                offset: layout.offset,
                stride: layout.stride,
                format: layout.element.vertex_format(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PipelineDescriptor {
        attributes,
        uniforms: UniformBindings {
            color_domain: config.color_domain,
            label_domain: config.label_domain,
            charmap: TextureBinding::GlyphAtlas,
            colormap: TextureBinding::Colormap(config.colormap),
        },
        schema: schema.clone(),
    })
}

impl PipelineDescriptor {
    pub fn attributes(&self) -> &[AttributeBinding] {
        &self.attributes
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<&AttributeBinding> {
        self.attributes.iter().find(|b| b.attribute == attribute)
    }

    pub fn uniforms(&self) -> &UniformBindings {
        &self.uniforms
    }

    /// The schema this descriptor was composed for.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Uniform values for one draw.
    pub fn evaluate(&self, view: &ViewState, pass: PassState) -> PointUniforms {
        let screen = view.screen;
        PointUniforms {
            zoom: pad_columns(view.transform.matrix()),
            untransform: pad_columns(screen.untransform),
            window_scale: screen.scale,
            color_domain: self.uniforms.color_domain,
            label_domain: self.uniforms.label_domain,
            time: view.elapsed,
            size: view.point_size,
            max_ix: view.point_budget as f32,
            k: view.transform.k,
            render_label_threshold: view.label_threshold as f32,
            string_index: pass.string_index,
        }
    }
}

/// WGSL stores `mat3x3<f32>` columns with vec4 alignment.
fn pad_columns(m: [[f32; 3]; 3]) -> [[f32; 4]; 3] {
    m.map(|[a, b, c]| [a, b, c, 0.0])
}
