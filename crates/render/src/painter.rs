//! Tile painter
//!
//! Draws the part of every cached tile that overlaps the viewport. The
//! painter never waits: tiles that are locked elsewhere, missing, or only
//! held compressed are skipped for this pass, and compressed ones are
//! inflated in the background so a later pass can show them.

use crate::canvas::Canvas;
use crate::view::FrameView;
use paint_preview_cache::BitmapMatrix;
use paint_preview_scheduler::{tiles_covering, Rect, TileCoord};
use std::sync::Arc;

/// Redraw request, invoked on every state change and after background
/// inflation completes. May be called from the task queue thread.
pub type Invalidator = Arc<dyn Fn() + Send + Sync>;

/// One-shot notification for the first pass that draws a tile
pub type FirstPaintCallback = Box<dyn FnOnce() + Send>;

/// Outcome of one draw pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintStats {
    /// Tiles copied to the canvas
    pub drawn: usize,
    /// Tiles whose lock was already held
    pub skipped_locked: usize,
    /// Covered coordinates with no usable entry
    pub skipped_empty: usize,
    /// Tiles that were compressed and had inflation started
    pub inflations_requested: usize,
}

/// Composites a frame's tile matrix onto a canvas
pub struct Painter {
    matrix: BitmapMatrix,
    tile_width: i32,
    tile_height: i32,
    viewport: Rect,
    invalidator: Invalidator,
    first_paint: Option<FirstPaintCallback>,
}

impl Painter {
    pub fn new(invalidator: Invalidator) -> Self {
        Self {
            matrix: BitmapMatrix::default(),
            tile_width: 0,
            tile_height: 0,
            viewport: Rect::default(),
            invalidator,
            first_paint: None,
        }
    }

    /// Set the callback fired after the first pass that draws a tile
    pub fn with_first_paint<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.first_paint = Some(Box::new(callback));
        self
    }

    pub fn bitmap_matrix(&self) -> &BitmapMatrix {
        &self.matrix
    }

    pub fn tile_dimensions(&self) -> (i32, i32) {
        (self.tile_width, self.tile_height)
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// `true` until the first-paint callback has fired
    pub fn awaiting_first_paint(&self) -> bool {
        self.first_paint.is_some()
    }

    fn invalidate(&self) {
        (self.invalidator)();
    }

    /// Draw every visible tile onto `canvas`.
    ///
    /// Does nothing if the viewport, the matrix or the tile dimensions are
    /// empty.
    pub fn on_draw(&mut self, canvas: &mut dyn Canvas) -> PaintStats {
        let mut stats = PaintStats::default();
        if self.viewport.is_empty()
            || self.matrix.is_empty()
            || self.tile_width <= 0
            || self.tile_height <= 0
        {
            return stats;
        }

        for coord in tiles_covering(self.viewport, self.tile_width, self.tile_height) {
            self.draw_tile(coord, canvas, &mut stats);
        }

        tracing::trace!(
            drawn = stats.drawn,
            skipped_locked = stats.skipped_locked,
            skipped_empty = stats.skipped_empty,
            inflations = stats.inflations_requested,
            "draw pass"
        );

        if stats.drawn > 0 {
            if let Some(callback) = self.first_paint.take() {
                tracing::debug!("first paint");
                callback();
            }
        }
        stats
    }

    fn draw_tile(&self, coord: TileCoord, canvas: &mut dyn Canvas, stats: &mut PaintStats) {
        let Some(entry) = self.matrix.get(coord) else {
            stats.skipped_empty += 1;
            return;
        };
        if entry.is_destroyed() {
            stats.skipped_empty += 1;
            return;
        }
        if !entry.lock() {
            tracing::trace!(row = coord.row, col = coord.col, "tile locked, skipping");
            stats.skipped_locked += 1;
            return;
        }

        match entry.bitmap() {
            Some(bitmap) => {
                let tile = coord.rect(self.tile_width, self.tile_height);
                let visible = tile
                    .intersect(&self.viewport)
                    .map(|overlap| overlap.offset(-tile.left, -tile.top))
                    .and_then(|local| local.intersect(&bitmap.bounds()));
                match visible {
                    Some(src) => {
                        let dst = src.offset(
                            tile.left - self.viewport.left,
                            tile.top - self.viewport.top,
                        );
                        canvas.draw_bitmap(&bitmap, src, dst);
                        stats.drawn += 1;
                    }
                    None => stats.skipped_empty += 1,
                }
            }
            None if entry.decode_failed() => {
                tracing::trace!(row = coord.row, col = coord.col, "tile unreadable, skipping");
                stats.skipped_empty += 1;
            }
            None => {
                let invalidator = Arc::clone(&self.invalidator);
                entry.inflate_in_background(move |inflated| {
                    if inflated.bitmap().is_some() {
                        invalidator();
                    }
                });
                stats.inflations_requested += 1;
            }
        }

        entry.unlock();
    }
}

impl FrameView for Painter {
    fn update_bitmap_matrix(&mut self, matrix: BitmapMatrix) {
        self.matrix = matrix;
        self.invalidate();
    }

    fn update_tile_dimensions(&mut self, tile_width: i32, tile_height: i32) {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self.invalidate();
    }

    fn update_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.invalidate();
    }

    fn update_layout(&mut self, matrix: BitmapMatrix, tile_width: i32, tile_height: i32, viewport: Rect) {
        self.matrix = matrix;
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self.viewport = viewport;
        self.invalidate();
    }
}

impl std::fmt::Debug for Painter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Painter")
            .field("matrix", &self.matrix)
            .field("tile_width", &self.tile_width)
            .field("tile_height", &self.tile_height)
            .field("viewport", &self.viewport)
            .field("awaiting_first_paint", &self.first_paint.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelCanvas;
    use paint_preview_cache::{Bitmap, BitmapCodec, CodecError, CompressibleBitmap, PngCodec};
    use paint_preview_scheduler::ManualTaskQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingCanvas {
        calls: Vec<(Rect, Rect)>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_bitmap(&mut self, _bitmap: &Bitmap, src: Rect, dst: Rect) {
            self.calls.push((src, dst));
        }
    }

    /// Encodes as PNG, never decodes
    struct UnreadableCodec;

    impl BitmapCodec for UnreadableCodec {
        fn encode(&self, bitmap: &Bitmap) -> Result<Vec<u8>, CodecError> {
            PngCodec::default().encode(bitmap)
        }

        fn decode(&self, _bytes: &[u8]) -> Result<Bitmap, CodecError> {
            Err(CodecError::Decode("corrupt".to_string()))
        }
    }

    fn counting_painter() -> (Painter, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let painter = Painter::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (painter, count)
    }

    fn tile(queue: &Arc<ManualTaskQueue>, size: u32, rgba: [u8; 4], retain: bool) -> CompressibleBitmap {
        CompressibleBitmap::new(
            Bitmap::filled(size, size, rgba),
            queue.clone(),
            Arc::new(PngCodec::default()),
            retain,
        )
    }

    /// 2x2 matrix of 10px tiles, every cell populated
    fn full_matrix(queue: &Arc<ManualTaskQueue>, retain: bool) -> BitmapMatrix {
        let mut matrix = BitmapMatrix::new(2, 2);
        for row in 0..2 {
            for col in 0..2 {
                let shade = (row * 2 + col) as u8 * 50;
                matrix
                    .set(TileCoord::new(row, col), tile(queue, 10, [shade, 0, 0, 255], retain))
                    .unwrap();
            }
        }
        matrix
    }

    #[test]
    fn test_each_setter_invalidates_once() {
        let (mut painter, count) = counting_painter();

        painter.update_bitmap_matrix(BitmapMatrix::new(1, 1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        painter.update_tile_dimensions(10, 10);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        painter.update_viewport(Rect::new(0, 0, 5, 5));
        assert_eq!(count.load(Ordering::SeqCst), 3);

        painter.update_layout(BitmapMatrix::new(2, 2), 20, 20, Rect::new(0, 0, 10, 10));
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(painter.tile_dimensions(), (20, 20));
        assert_eq!(painter.bitmap_matrix().rows(), 2);
    }

    #[test]
    fn test_draw_is_noop_without_layout() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        let mut canvas = RecordingCanvas::default();

        // Empty viewport
        painter.update_layout(full_matrix(&queue, true), 10, 10, Rect::default());
        assert_eq!(painter.on_draw(&mut canvas), PaintStats::default());

        // Empty matrix
        painter.update_layout(BitmapMatrix::new(0, 0), 10, 10, Rect::new(0, 0, 10, 10));
        assert_eq!(painter.on_draw(&mut canvas), PaintStats::default());

        // Degenerate tiles
        painter.update_layout(full_matrix(&queue, true), 0, 10, Rect::new(0, 0, 10, 10));
        assert_eq!(painter.on_draw(&mut canvas), PaintStats::default());

        assert!(canvas.calls.is_empty());
    }

    #[test]
    fn test_draw_computes_src_and_dst() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        painter.update_layout(full_matrix(&queue, true), 10, 10, Rect::new(5, 5, 15, 15));

        let mut canvas = RecordingCanvas::default();
        let stats = painter.on_draw(&mut canvas);

        assert_eq!(stats.drawn, 4);
        assert_eq!(
            canvas.calls,
            vec![
                (Rect::new(5, 5, 10, 10), Rect::new(0, 0, 5, 5)),
                (Rect::new(0, 5, 5, 10), Rect::new(5, 0, 10, 5)),
                (Rect::new(5, 0, 10, 5), Rect::new(0, 5, 5, 10)),
                (Rect::new(0, 0, 5, 5), Rect::new(5, 5, 10, 10)),
            ]
        );
    }

    #[test]
    fn test_draw_onto_pixels() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        painter.update_layout(full_matrix(&queue, true), 10, 10, Rect::new(5, 5, 15, 15));

        let mut canvas = PixelCanvas::new(10, 10);
        painter.on_draw(&mut canvas);

        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 0), Some([50, 0, 0, 255]));
        assert_eq!(canvas.pixel(0, 9), Some([100, 0, 0, 255]));
        assert_eq!(canvas.pixel(9, 9), Some([150, 0, 0, 255]));
    }

    #[test]
    fn test_locked_and_missing_tiles_are_skipped() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        let mut matrix = full_matrix(&queue, true);
        matrix.take(TileCoord::new(1, 1));
        let busy = matrix.get(TileCoord::new(0, 1)).unwrap().clone();
        assert!(busy.lock());
        painter.update_layout(matrix, 10, 10, Rect::new(5, 5, 15, 15));

        let mut canvas = RecordingCanvas::default();
        let stats = painter.on_draw(&mut canvas);

        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.skipped_locked, 1);
        assert_eq!(stats.skipped_empty, 1);
        // The painter must not release a lock it did not take
        assert!(busy.is_locked());
    }

    #[test]
    fn test_draw_releases_locks() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        let matrix = full_matrix(&queue, true);
        painter.update_layout(matrix.clone(), 10, 10, Rect::new(0, 0, 20, 20));

        painter.on_draw(&mut RecordingCanvas::default());
        for (_, entry) in matrix.populated() {
            assert!(!entry.is_locked());
        }
    }

    #[test]
    fn test_compressed_tiles_inflate_then_draw() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, count) = counting_painter();
        let matrix = full_matrix(&queue, false);
        // Compress and drop the decoded pixels
        queue.run_until_idle();
        painter.update_layout(matrix, 10, 10, Rect::new(0, 0, 10, 10));
        let after_layout = count.load(Ordering::SeqCst);

        let mut canvas = RecordingCanvas::default();
        let stats = painter.on_draw(&mut canvas);
        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.inflations_requested, 1);
        assert!(canvas.calls.is_empty());

        // Inflation completes on the queue and asks for a redraw
        queue.run_until_idle();
        assert_eq!(count.load(Ordering::SeqCst), after_layout + 1);

        let stats = painter.on_draw(&mut canvas);
        assert_eq!(stats.drawn, 1);
        assert_eq!(canvas.calls.len(), 1);
    }

    #[test]
    fn test_first_paint_fires_once() {
        let queue = Arc::new(ManualTaskQueue::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fired);
        let mut painter = Painter::new(Arc::new(|| {})).with_first_paint(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert!(painter.awaiting_first_paint());

        // A pass that draws nothing does not count
        painter.update_layout(BitmapMatrix::new(2, 2), 10, 10, Rect::new(0, 0, 10, 10));
        painter.on_draw(&mut RecordingCanvas::default());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        painter.update_bitmap_matrix(full_matrix(&queue, true));
        painter.on_draw(&mut RecordingCanvas::default());
        painter.on_draw(&mut RecordingCanvas::default());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!painter.awaiting_first_paint());
    }

    #[test]
    fn test_destroyed_tiles_are_not_inflated() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, _) = counting_painter();
        let matrix = full_matrix(&queue, true);
        queue.run_until_idle();
        matrix.get(TileCoord::new(0, 0)).unwrap().destroy();
        painter.update_layout(matrix, 10, 10, Rect::new(0, 0, 10, 10));

        let stats = painter.on_draw(&mut RecordingCanvas::default());
        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(stats.inflations_requested, 0);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_unreadable_tile_does_not_redraw_forever() {
        let queue = Arc::new(ManualTaskQueue::new());
        let (mut painter, count) = counting_painter();
        let mut matrix = BitmapMatrix::new(1, 1);
        let entry = CompressibleBitmap::new(
            Bitmap::filled(10, 10, [0, 0, 255, 255]),
            queue.clone(),
            Arc::new(UnreadableCodec),
            false,
        );
        matrix.set(TileCoord::new(0, 0), entry).unwrap();
        queue.run_until_idle();
        painter.update_layout(matrix, 10, 10, Rect::new(0, 0, 10, 10));
        let after_layout = count.load(Ordering::SeqCst);

        let stats = painter.on_draw(&mut RecordingCanvas::default());
        assert_eq!(stats.inflations_requested, 1);

        // Failed decode asks for no redraw
        queue.run_until_idle();
        assert_eq!(count.load(Ordering::SeqCst), after_layout);

        // and later passes stop retrying
        let stats = painter.on_draw(&mut RecordingCanvas::default());
        assert_eq!(stats.inflations_requested, 0);
        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(queue.pending(), 0);
    }
}
