use crate::label::{FALLBACK_GLYPH, MISSING_GLYPH};

/// Cells per atlas row and column.
pub const ATLAS_COLUMNS: u32 = 16;

/// Cells in the atlas. Only the first 128 codes are rasterized.
pub const ATLAS_GLYPHS: u32 = ATLAS_COLUMNS * ATLAS_COLUMNS;

const RASTERIZED: std::ops::RangeInclusive<u32> = 32..=126;

/// A rasterized glyph: 8-bit coverage, row-major, plus placement metrics.
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Left bearing from the pen position.
    pub xmin: i32,
    /// Bottom of the bitmap relative to the baseline (positive is up).
    pub ymin: i32,
    pub advance: f32,
    pub coverage: Vec<u8>,
}

/// Offscreen glyph rasterizer the atlas is drawn with.
pub trait GlyphRaster {
    /// True when the font has a real glyph for `ch`.
    fn has_glyph(&self, ch: char) -> bool;

    fn raster_glyph(&self, ch: char, px: f32) -> GlyphBitmap;
}

impl GlyphRaster for fontdue::Font {
    fn has_glyph(&self, ch: char) -> bool {
        self.lookup_glyph_index(ch) != 0
    }

    fn raster_glyph(&self, ch: char, px: f32) -> GlyphBitmap {
        let (metrics, coverage) = self.rasterize(ch, px);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width,
            coverage,
        }
    }
}

/// Single-channel glyph atlas: a 16×16 grid of `cell_size` cells, character
/// `i` at column `i % 16`, row `i / 16`.
///
/// Printable ASCII is rasterized from the font. The [`FALLBACK_GLYPH`] cell
/// holds a filled circle and the [`MISSING_GLYPH`] cell stays blank, so the
/// shader can draw any packed code without branching on coverage.
///
/// The outermost pixel ring of every cell is kept empty. Linear filtering at
/// a cell edge then blends only blank texels instead of the neighbour's glyph.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    cell_size: u32,
    pixels: Vec<u8>,
    covered: Vec<bool>,
}

impl GlyphAtlas {
    /// Builds the atlas. With no rasterizer only the fallback circle is drawn.
    pub fn build(cell_size: u32, raster: Option<&dyn GlyphRaster>) -> Self {
        let side = (cell_size * ATLAS_COLUMNS) as usize;
        let mut atlas = Self {
            cell_size,
            pixels: vec![0; side * side],
            covered: vec![false; ATLAS_GLYPHS as usize],
        };

        if let Some(raster) = raster {
            let px = (cell_size - cell_size / 3) as f32;
            for code in RASTERIZED {
                let Some(ch) = char::from_u32(code) else {
                    continue;
                };
                if ch != ' ' && !raster.has_glyph(ch) {
                    continue;
                }
                let glyph = raster.raster_glyph(ch, px);
                atlas.blit(code, &glyph);
                atlas.covered[code as usize] = true;
            }
        }

        atlas.draw_fallback_circle();
        atlas.covered[FALLBACK_GLYPH as usize] = true;
        atlas.covered[MISSING_GLYPH as usize] = true;

        log::info!(
            "glyph atlas built: {0}x{0}, {1} glyphs",
            atlas.size(),
            atlas.covered.iter().filter(|c| **c).count()
        );
        atlas
    }

    /// Atlas side length in pixels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.cell_size * ATLAS_COLUMNS
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// R8 coverage, row-major, `size() * size()` bytes.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True when `ch` has a cell the shader will draw meaningfully.
    pub fn covers(&self, ch: char) -> bool {
        self.covered.get(ch as usize).copied().unwrap_or(false)
    }

    /// Top-left pixel of the cell for `code`.
    fn cell_origin(&self, code: u32) -> (usize, usize) {
        let col = code % ATLAS_COLUMNS;
        let row = code / ATLAS_COLUMNS;
        ((col * self.cell_size) as usize, (row * self.cell_size) as usize)
    }

    fn blit(&mut self, code: u32, glyph: &GlyphBitmap) {
        let cell = self.cell_size as i32;
        let side = self.size() as usize;
        let (ox, oy) = self.cell_origin(code);

        let baseline = cell * 3 / 4;
        let pen = ((cell as f32 - glyph.advance) * 0.5).round() as i32;
        let left = pen + glyph.xmin;
        let top = baseline - glyph.ymin - glyph.height as i32;
        let inner = 1..cell - 1;

        for gy in 0..glyph.height {
            let y = top + gy as i32;
            if !inner.contains(&y) {
                continue;
            }
            for gx in 0..glyph.width {
                let x = left + gx as i32;
                if !inner.contains(&x) {
                    continue;
                }
                let dst = (oy + y as usize) * side + ox + x as usize;
                self.pixels[dst] = glyph.coverage[gy * glyph.width + gx];
            }
        }
    }

    fn draw_fallback_circle(&mut self) {
        let side = self.size() as usize;
        let cell = self.cell_size as f32;
        let (ox, oy) = self.cell_origin(FALLBACK_GLYPH);
        let center = cell * 0.5;
        let radius = cell * 0.3;

        for y in 0..self.cell_size as usize {
            for x in 0..self.cell_size as usize {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                // One pixel of antialiasing at the rim.
                let d = (dx * dx + dy * dy).sqrt();
                let coverage = (radius - d + 0.5).clamp(0.0, 1.0);
                self.pixels[(oy + y) * side + ox + x] = (coverage * 255.0).round() as u8;
            }
        }
    }
}
