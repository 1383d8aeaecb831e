//! Integer rectangle used for viewport, tile and clip geometry.

/// Axis-aligned rectangle in device pixels.
///
/// `right` and `bottom` are exclusive. A rectangle with `right <= left` or
/// `bottom <= top` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Create a rectangle from its edges
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Returns the overlapping region, or `None` if the rectangles do not
    /// share any pixel. Touching edges do not count as overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let overlap = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if overlap.is_empty() {
            None
        } else {
            Some(overlap)
        }
    }

    /// Returns this rectangle moved by `(dx, dy)`
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Returns this rectangle with every edge multiplied by `scale`, rounding
    /// outwards so the scaled rectangle never loses a partially covered pixel.
    pub fn scaled(&self, scale: f32) -> Rect {
        Rect::new(
            (self.left as f32 * scale).floor() as i32,
            (self.top as f32 * scale).floor() as i32,
            (self.right as f32 * scale).ceil() as i32,
            (self.bottom as f32 * scale).ceil() as i32,
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}
