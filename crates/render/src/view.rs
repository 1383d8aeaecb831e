//! Frame view contract
//!
//! The mediator owns the tile matrix and viewport; whatever displays a frame
//! receives snapshots of them through [`FrameView`].

use paint_preview_cache::BitmapMatrix;
use paint_preview_scheduler::Rect;

/// Handle of a child frame registered with a mediator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubFrameId(pub u64);

/// Receiver of layout and viewport updates for one frame
pub trait FrameView {
    fn update_bitmap_matrix(&mut self, matrix: BitmapMatrix);

    fn update_tile_dimensions(&mut self, tile_width: i32, tile_height: i32);

    /// Viewport in scaled content pixels
    fn update_viewport(&mut self, viewport: Rect);

    /// Push a complete layout in one pass.
    ///
    /// Implementations that invalidate on every setter should override this
    /// to invalidate once.
    fn update_layout(&mut self, matrix: BitmapMatrix, tile_width: i32, tile_height: i32, viewport: Rect) {
        self.update_bitmap_matrix(matrix);
        self.update_tile_dimensions(tile_width, tile_height);
        self.update_viewport(viewport);
    }

    /// Visible sub-frames with their rectangles relative to the viewport
    fn update_sub_frames(&mut self, _visible: &[(SubFrameId, Rect)]) {}
}
