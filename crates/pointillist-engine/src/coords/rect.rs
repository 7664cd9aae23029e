use super::Vec2;

/// Axis-aligned rectangle in data space.
///
/// Tile extents and the visible region are both expressed with this type.
/// Degenerate (zero-area) rectangles are allowed; they intersect nothing.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Builds the rectangle spanned by two opposite corners, in any order.
    ///
    /// The interaction layer reports visible corners after un-projecting the
    /// screen corners, so either corner may be the minimum.
    #[inline]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            origin: min,
            size: max - min,
        }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin.is_finite() && self.size.is_finite()
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.origin.x && p.y >= self.origin.y && p.x < max.x && p.y < max.y
    }

    /// True when the two rectangles overlap with non-zero area.
    #[inline]
    pub fn intersects(self, other: Rect) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        let w = a_max.x.min(b_max.x) - self.origin.x.max(other.origin.x);
        let h = a_max.y.min(b_max.y) - self.origin.y.max(other.origin.y);
        w > 0.0 && h > 0.0
    }

    /// Splits the rectangle into four equal quadrants in (x, y) order:
    /// `[min-min, max-min, min-max, max-max]`.
    pub fn quadrants(self) -> [Rect; 4] {
        let half = self.size * 0.5;
        let Vec2 { x, y } = self.origin;
        [
            Rect::new(x, y, half.x, half.y),
            Rect::new(x + half.x, y, half.x, half.y),
            Rect::new(x, y + half.y, half.x, half.y),
            Rect::new(x + half.x, y + half.y, half.x, half.y),
        ]
    }
}
