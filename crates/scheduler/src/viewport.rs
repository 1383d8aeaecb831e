//! Viewport over the captured content plane
//!
//! The viewport is a mutable window (position, size, scale) over the scaled
//! content of a frame. Translation is the position of the window's top-left
//! corner in scaled content pixels.
//!
//! The viewport never clamps itself against content bounds. Keeping the
//! window inside the content is the frame mediator's job, since only it knows
//! the content size at the current scale.

use crate::geometry::Rect;

/// Mutable window over a frame's content
///
/// # Example
///
/// ```
/// use paint_preview_scheduler::Viewport;
///
/// let mut viewport = Viewport::new();
/// viewport.set_size(100, 200);
/// viewport.set_scale(1.0);
/// viewport.offset(30.0, 40.0);
///
/// let rect = viewport.as_rect();
/// assert_eq!((rect.left, rect.top, rect.right, rect.bottom), (30, 40, 130, 240));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Visible window width in device pixels
    width: i32,

    /// Visible window height in device pixels
    height: i32,

    /// Left edge of the window in scaled content pixels
    trans_x: f32,

    /// Top edge of the window in scaled content pixels
    trans_y: f32,

    /// Content scale; `0.0` means not yet computed
    scale: f32,

    /// Lower bound applied by [`Viewport::scale_about`]
    min_scale: f32,

    /// Upper bound applied by [`Viewport::scale_about`]
    max_scale: f32,
}

impl Viewport {
    /// Create an empty viewport with an uninitialized scale
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            trans_x: 0.0,
            trans_y: 0.0,
            scale: 0.0,
            min_scale: 0.0,
            max_scale: f32::MAX,
        }
    }

    /// Set the window size. The window does not move.
    pub fn set_size(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Move the window by `(dx, dy)` without any bounds check
    pub fn offset(&mut self, dx: f32, dy: f32) {
        self.trans_x += dx;
        self.trans_y += dy;
    }

    pub fn set_trans(&mut self, x: f32, y: f32) {
        self.trans_x = x;
        self.trans_y = y;
    }

    pub fn trans_x(&self) -> f32 {
        self.trans_x
    }

    pub fn trans_y(&self) -> f32 {
        self.trans_y
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Current scale, `0.0` if it has not been computed yet
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn has_scale(&self) -> bool {
        self.scale > 0.0
    }

    /// Set the range that [`Viewport::scale_about`] keeps the scale within.
    ///
    /// Bounds are swapped if given in the wrong order.
    pub fn set_scale_bounds(&mut self, min_scale: f32, max_scale: f32) {
        self.min_scale = min_scale.min(max_scale);
        self.max_scale = max_scale.max(min_scale);
    }

    pub fn scale_bounds(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Multiply the scale by `factor` about a viewport-relative pivot.
    ///
    /// The content point under `(pivot_x, pivot_y)` stays under the pivot.
    /// `factor` is clamped so the resulting scale stays within the scale
    /// bounds. Returns the factor actually applied, `1.0` when the scale is
    /// uninitialized or `factor` is not a positive finite number.
    pub fn scale_about(&mut self, factor: f32, pivot_x: f32, pivot_y: f32) -> f32 {
        if !self.has_scale() || !factor.is_finite() || factor <= 0.0 {
            return 1.0;
        }

        let target = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        let applied = target / self.scale;

        // The pivot's content position scales with the content, so shift the
        // window by the pivot's displacement.
        self.trans_x = (self.trans_x + pivot_x) * applied - pivot_x;
        self.trans_y = (self.trans_y + pivot_y) * applied - pivot_y;
        self.scale = target;

        applied
    }

    /// Integer-rounded window rectangle in scaled content pixels
    pub fn as_rect(&self) -> Rect {
        let left = self.trans_x.round() as i32;
        let top = self.trans_y.round() as i32;
        Rect::new(left, top, left + self.width, top + self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
