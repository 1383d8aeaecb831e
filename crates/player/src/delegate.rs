//! External collaborators
//!
//! The player never rasterizes and never integrates fling physics. It asks a
//! [`CompositorDelegate`] for tile bitmaps and forwards clicks to it, and it
//! steps a [`BallisticScroller`] on each animation tick.

use crate::mediator::Completion;
use crossbeam_channel::Sender;
use paint_preview_cache::Bitmap;
use paint_preview_scheduler::{Rect, TileCoord};

/// Identifies the captured frame a mediator displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Rasterizes content rectangles and handles clicks for a frame
pub trait CompositorDelegate: Send + Sync {
    /// Rasterize `clip` (unscaled content pixels) at `scale` and answer
    /// through `reply`, from any thread.
    ///
    /// Dropping `reply` without answering leaves the tile unpopulated.
    fn request_bitmap(&self, frame_id: FrameId, clip: Rect, scale: f32, reply: BitmapReply);

    /// A click at `(x, y)` in unscaled content pixels
    fn on_click(&self, frame_id: FrameId, x: i32, y: i32);
}

/// Completion handle for one tile request
///
/// Answers are delivered to the owning mediator's inbox and applied on its
/// next [`crate::FrameMediator::pump`]. Answers for a mediator that no
/// longer exists are discarded.
#[derive(Debug)]
pub struct BitmapReply {
    sender: Sender<Completion>,
    generation: u64,
    coord: TileCoord,
}

impl BitmapReply {
    pub(crate) fn new(sender: Sender<Completion>, generation: u64, coord: TileCoord) -> Self {
        Self {
            sender,
            generation,
            coord,
        }
    }

    /// Tile this reply answers
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Deliver the rasterized tile
    pub fn success(self, bitmap: Bitmap) {
        self.send(Some(bitmap));
    }

    /// Report that the tile could not be rasterized
    pub fn error(self) {
        self.send(None);
    }

    fn send(self, bitmap: Option<Bitmap>) {
        let completion = Completion::Fetched {
            generation: self.generation,
            coord: self.coord,
            bitmap,
        };
        if self.sender.send(completion).is_err() {
            tracing::trace!(row = self.coord.row, col = self.coord.col, "reply after mediator dropped");
        }
    }
}

/// Fling physics stepper, in scaled content pixels
pub trait BallisticScroller: Send {
    /// Start a fling from `(start_x, start_y)` bounded to
    /// `[0, max_x] x [0, max_y]`
    fn fling(&mut self, start_x: i32, start_y: i32, velocity_x: i32, velocity_y: i32, max_x: i32, max_y: i32);

    /// Advance to the next animation step. Returns `false` once the fling is
    /// over.
    fn compute_scroll_offset(&mut self) -> bool;

    fn current_x(&self) -> i32;

    fn current_y(&self) -> i32;

    fn is_finished(&self) -> bool;

    /// Stop the fling where it is
    fn abort(&mut self);
}
