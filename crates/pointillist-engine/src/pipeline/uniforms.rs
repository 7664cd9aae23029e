use bytemuck::{Pod, Zeroable};

/// Per-draw uniform block, laid out to match `PointUniforms` in `points.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointUniforms {
    pub zoom: [[f32; 4]; 3],
    pub untransform: [[f32; 4]; 3],
    pub window_scale: [f32; 2],
    pub color_domain: [f32; 2],
    pub label_domain: [f32; 2],
    pub time: f32,
    pub size: f32,
    pub max_ix: f32,
    pub k: f32,
    pub render_label_threshold: f32,
    pub string_index: u32,
}

impl PointUniforms {
    pub const SIZE: u64 = std::mem::size_of::<PointUniforms>() as u64;
}
