/// Texels per ramp.
pub const RAMP_WIDTH: usize = 256;

/// Continuous color scale defined by evenly spaced sRGB stops.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorScale {
    stops: &'static [[u8; 3]],
}

impl ColorScale {
    /// Purple-orange diverging scale.
    pub const PU_OR: ColorScale = ColorScale {
        stops: &[
            [0x7f, 0x3b, 0x08],
            [0xb3, 0x58, 0x06],
            [0xe0, 0x82, 0x14],
            [0xfd, 0xb8, 0x63],
            [0xfe, 0xe0, 0xb6],
            [0xf7, 0xf7, 0xf7],
            [0xd8, 0xda, 0xeb],
            [0xb2, 0xab, 0xd2],
            [0x80, 0x73, 0xac],
            [0x54, 0x27, 0x88],
            [0x2d, 0x00, 0x4b],
        ],
    };

    pub const WARM: ColorScale = ColorScale {
        stops: &[
            [0x6e, 0x40, 0xaa],
            [0xbf, 0x3c, 0xaf],
            [0xfe, 0x4b, 0x83],
            [0xff, 0x78, 0x47],
            [0xe2, 0xb7, 0x2f],
            [0xaf, 0xf0, 0x5b],
        ],
    };

    pub const COOL: ColorScale = ColorScale {
        stops: &[
            [0x6e, 0x40, 0xaa],
            [0x4c, 0x6e, 0xdb],
            [0x23, 0xab, 0xd8],
            [0x1d, 0xdf, 0xa3],
            [0x52, 0xf6, 0x67],
            [0xaf, 0xf0, 0x5b],
        ],
    };

    pub const VIRIDIS: ColorScale = ColorScale {
        stops: &[
            [0x44, 0x01, 0x54],
            [0x48, 0x28, 0x78],
            [0x3e, 0x49, 0x89],
            [0x31, 0x68, 0x8e],
            [0x26, 0x82, 0x8e],
            [0x1f, 0x9e, 0x89],
            [0x35, 0xb7, 0x79],
            [0x6e, 0xce, 0x58],
            [0xb5, 0xde, 0x2b],
            [0xfd, 0xe7, 0x25],
        ],
    };

    /// Opaque color at `t` in `[0, 1]`; values outside are clamped.
    pub fn sample(self, t: f32) -> [u8; 4] {
        let last = self.stops.len() - 1;
        let pos = t.clamp(0.0, 1.0) * last as f32;
        let i = (pos.floor() as usize).min(last.saturating_sub(1));
        let f = pos - i as f32;

        let a = self.stops[i];
        let b = self.stops[(i + 1).min(last)];
        let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * f).round() as u8;
        [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255]
    }
}

/// Prebuilt colormap ramps.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum RampKind {
    /// Purple-orange diverging.
    #[default]
    Diverging,
    /// Warm scale for the lower half, cool scale for the upper half.
    Rainbow,
    Viridis,
}

impl RampKind {
    pub const ALL: [RampKind; 3] = [RampKind::Diverging, RampKind::Rainbow, RampKind::Viridis];
}

/// Samples a ramp at `RAMP_WIDTH` evenly spaced points; RGBA bytes.
pub fn build_ramp(kind: RampKind) -> Vec<u8> {
    let half = RAMP_WIDTH / 2;
    let mut out = Vec::with_capacity(RAMP_WIDTH * 4);

    for i in 0..RAMP_WIDTH {
        let rgba = match kind {
            RampKind::Diverging => ColorScale::PU_OR.sample(unit(i, RAMP_WIDTH)),
            RampKind::Viridis => ColorScale::VIRIDIS.sample(unit(i, RAMP_WIDTH)),
            RampKind::Rainbow if i < half => ColorScale::WARM.sample(unit(i, half)),
            RampKind::Rainbow => ColorScale::COOL.sample(unit(i - half, half)),
        };
        out.extend_from_slice(&rgba);
    }

    out
}

#[inline]
fn unit(i: usize, n: usize) -> f32 {
    i as f32 / (n - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texel(ramp: &[u8], i: usize) -> [u8; 4] {
        ramp[i * 4..i * 4 + 4].try_into().unwrap()
    }

    #[test]
    fn ramps_are_256_opaque_texels() {
        for kind in RampKind::ALL {
            let ramp = build_ramp(kind);
            assert_eq!(ramp.len(), 256 * 4);
            assert!(ramp.chunks(4).all(|px| px[3] == 255));
        }
    }

    #[test]
    fn diverging_spans_end_stops() {
        let ramp = build_ramp(RampKind::Diverging);
        assert_eq!(texel(&ramp, 0), [0x7f, 0x3b, 0x08, 255]);
        assert_eq!(texel(&ramp, 255), [0x2d, 0x00, 0x4b, 255]);
    }

    #[test]
    fn rainbow_halves_renormalize() {
        let ramp = build_ramp(RampKind::Rainbow);
        // Each half starts at t = 0 and ends at t = 1 of its own scale.
        assert_eq!(texel(&ramp, 0), ColorScale::WARM.sample(0.0));
        assert_eq!(texel(&ramp, 127), ColorScale::WARM.sample(1.0));
        assert_eq!(texel(&ramp, 128), ColorScale::COOL.sample(0.0));
        assert_eq!(texel(&ramp, 255), ColorScale::COOL.sample(1.0));
    }

    #[test]
    fn sample_clamps_and_interpolates() {
        assert_eq!(ColorScale::VIRIDIS.sample(-1.0), ColorScale::VIRIDIS.sample(0.0));
        assert_eq!(ColorScale::VIRIDIS.sample(2.0), [0xfd, 0xe7, 0x25, 255]);

        let mid = ColorScale::PU_OR.sample(0.5);
        assert_eq!(mid, [0xf7, 0xf7, 0xf7, 255]);
    }
}
