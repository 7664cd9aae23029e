use std::collections::BTreeMap;

/// Field holding the composite 2-component position attribute.
///
/// It aliases the `x`/`y` scalars already present in the record and does not
/// occupy space of its own.
pub const POSITION_FIELD: &str = "position";

/// Field holding each point's ordering index.
pub const ORDER_INDEX_FIELD: &str = "ix";

/// Reserved per-point region the label encoder writes packed characters into.
pub const LABEL_BUFFER_FIELD: &str = "labelBuffer";

/// Element type of one schema field. All point data is 32-bit float.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl ElementType {
    #[inline]
    pub const fn components(self) -> usize {
        match self {
            ElementType::Float32 => 1,
            ElementType::Float32x2 => 2,
            ElementType::Float32x3 => 3,
            ElementType::Float32x4 => 4,
        }
    }

    #[inline]
    pub const fn size_bytes(self) -> u64 {
        (self.components() * std::mem::size_of::<f32>()) as u64
    }

    pub const fn vertex_format(self) -> wgpu::VertexFormat {
        match self {
            ElementType::Float32 => wgpu::VertexFormat::Float32,
            ElementType::Float32x2 => wgpu::VertexFormat::Float32x2,
            ElementType::Float32x3 => wgpu::VertexFormat::Float32x3,
            ElementType::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

/// Byte layout of one field inside the interleaved per-tile point buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Offset of the first element in bytes.
    pub offset: u64,
    /// Distance between consecutive points in bytes.
    pub stride: u64,
    pub element: ElementType,
    /// True for fields that alias other fields (e.g. `position` over `x`/`y`).
    pub composite: bool,
}

/// Mapping from field name to its layout in the tile's raw buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, FieldLayout>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema for interleaved records: fields are laid out back to
    /// back in the given order, and every field shares the record stride.
    pub fn interleaved<'a>(fields: impl IntoIterator<Item = (&'a str, ElementType)>) -> Self {
        let fields: Vec<_> = fields.into_iter().collect();
        let stride: u64 = fields.iter().map(|(_, e)| e.size_bytes()).sum();

        let mut schema = Schema::new();
        let mut offset = 0;
        for (name, element) in fields {
            schema.insert(
                name,
                FieldLayout {
                    offset,
                    stride,
                    element,
                    composite: false,
                },
            );
            offset += element.size_bytes();
        }
        schema
    }

    /// Adds a composite field aliasing `source` (and the fields after it).
    ///
    /// No-op when `source` is absent.
    pub fn with_composite(mut self, name: &str, source: &str, element: ElementType) -> Self {
        if let Some(base) = self.fields.get(source).copied() {
            self.insert(
                name,
                FieldLayout {
                    offset: base.offset,
                    stride: base.stride,
                    element,
                    composite: true,
                },
            );
        }
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, layout: FieldLayout) {
        self.fields.insert(name.into(), layout);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of declared fields, composites included.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldLayout)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Floats occupied by one point record; composite fields are not counted.
    pub fn floats_per_point(&self) -> usize {
        self.fields
            .values()
            .filter(|f| !f.composite)
            .map(|f| f.element.components())
            .sum()
    }

    /// Number of points held by a raw buffer of `float_len` floats.
    pub fn point_count(&self, float_len: usize) -> u32 {
        match self.floats_per_point() {
            0 => 0,
            per_point => (float_len / per_point) as u32,
        }
    }
}
