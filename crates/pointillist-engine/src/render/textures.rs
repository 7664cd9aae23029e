use crate::render::RenderCtx;
use crate::texture::{build_ramp, GlyphAtlas, RampKind, RAMP_WIDTH};

/// GPU copies of the glyph atlas and every colormap ramp.
///
/// Uploaded once at construction and immutable afterwards.
pub struct LookupTextures {
    charmap: wgpu::Texture,
    charmap_view: wgpu::TextureView,
    colormaps: Vec<(RampKind, wgpu::Texture, wgpu::TextureView)>,
    sampler: wgpu::Sampler,
}

impl LookupTextures {
    pub fn new(ctx: &RenderCtx<'_>, atlas: &GlyphAtlas) -> Self {
        let size = atlas.size();
        let charmap = upload(
            ctx,
            "pointillist glyph atlas",
            wgpu::TextureFormat::R8Unorm,
            (size, size),
            size,
            atlas.pixels(),
        );

        let colormaps = RampKind::ALL
            .into_iter()
            .map(|kind| {
                let texture = upload(
                    ctx,
                    "pointillist colormap",
                    wgpu::TextureFormat::Rgba8UnormSrgb,
                    (RAMP_WIDTH as u32, 1),
                    RAMP_WIDTH as u32 * 4,
                    &build_ramp(kind),
                );
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                (kind, texture, view)
            })
            .collect();

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pointillist lookup sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            charmap_view: charmap.create_view(&wgpu::TextureViewDescriptor::default()),
            charmap,
            colormaps,
            sampler,
        }
    }

    pub fn charmap_view(&self) -> &wgpu::TextureView {
        &self.charmap_view
    }

    /// View of the ramp for `kind`; every kind is built at construction.
    pub fn colormap_view(&self, kind: RampKind) -> Option<&wgpu::TextureView> {
        self.colormaps
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, _, view)| view)
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn destroy(self) {
        self.charmap.destroy();
        for (_, texture, _) in self.colormaps {
            texture.destroy();
        }
    }
}

fn upload(
    ctx: &RenderCtx<'_>,
    label: &str,
    format: wgpu::TextureFormat,
    (width, height): (u32, u32),
    bytes_per_row: u32,
    data: &[u8],
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        size,
    );

    texture
}
