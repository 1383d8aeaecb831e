//! Frame mediator
//!
//! Owns the viewport and the tile cache of one frame. Every viewport change
//! recomputes the required tile set (visible tiles plus a prefetch ring),
//! asks the compositor for the tiles that are neither cached nor already
//! requested, and pushes the new state to the frame's view.
//!
//! The mediator is single-threaded. Fetch replies and eviction timers may
//! fire on any thread; they land in a channel inbox and take effect when the
//! owner calls [`FrameMediator::pump`].

use crate::config::PlayerConfig;
use crate::delegate::{BallisticScroller, BitmapReply, CompositorDelegate, FrameId};
use crate::error::PlayerError;
use crate::subframe::SubFrameRegistry;
use crossbeam_channel::{unbounded, Receiver, Sender};
use paint_preview_cache::{Bitmap, BitmapCodec, BitmapMatrix, CompressibleBitmap, RequiredMatrix};
use paint_preview_render::{FrameView, SubFrameId};
use paint_preview_scheduler::{
    fetch_order, grid_dimensions, ring_with_width, tiles_covering, FlingSlot, FlingToken, Rect,
    TaskQueue, TileCoord, Viewport,
};
use std::sync::Arc;

/// Asynchronous event delivered to the owning thread
#[derive(Debug)]
pub(crate) enum Completion {
    Fetched {
        generation: u64,
        coord: TileCoord,
        bitmap: Option<Bitmap>,
    },
    Sweep {
        generation: u64,
        seq: u64,
    },
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediatorStats {
    /// Tile requests sent to the compositor
    pub requests_issued: u64,
    /// Replies that delivered a bitmap
    pub requests_completed: u64,
    /// Replies that reported an error
    pub requests_failed: u64,
    /// Replies for a layout that has since been replaced
    pub stale_replies: u64,
    /// Eviction sweeps that ran
    pub sweeps: u64,
    /// Decoded bitmaps released by sweeps
    pub discarded: u64,
}

/// Tile grid at one scale
struct Layout {
    generation: u64,
    tile_width: i32,
    tile_height: i32,
    bitmaps: BitmapMatrix,
    required: RequiredMatrix,
}

/// Viewport and tile-cache coordinator for one frame
pub struct FrameMediator<V: FrameView> {
    frame_id: FrameId,
    content_width: i32,
    content_height: i32,
    config: PlayerConfig,
    viewport: Viewport,
    layout: Option<Layout>,
    generation: u64,
    delegate: Arc<dyn CompositorDelegate>,
    scroller: Box<dyn BallisticScroller>,
    fling: FlingSlot,
    fling_position: (i32, i32),
    queue: Arc<dyn TaskQueue>,
    codec: Arc<dyn BitmapCodec>,
    inbox_tx: Sender<Completion>,
    inbox_rx: Receiver<Completion>,
    sweep_seq: u64,
    sub_frames: SubFrameRegistry,
    view: V,
    stats: MediatorStats,
}

impl<V: FrameView> FrameMediator<V> {
    /// Create a mediator for content of `content_size` unscaled pixels.
    ///
    /// Nothing is requested until [`FrameMediator::update_viewport_size`]
    /// establishes the layout.
    ///
    /// # Errors
    /// Returns [`PlayerError::Config`] if `config` does not validate.
    pub fn new(
        frame_id: FrameId,
        content_size: (i32, i32),
        config: PlayerConfig,
        delegate: Arc<dyn CompositorDelegate>,
        scroller: Box<dyn BallisticScroller>,
        queue: Arc<dyn TaskQueue>,
        view: V,
    ) -> Result<Self, PlayerError> {
        config.validate()?;
        let codec: Arc<dyn BitmapCodec> = Arc::new(config.codec());
        let (inbox_tx, inbox_rx) = unbounded();
        Ok(Self {
            frame_id,
            content_width: content_size.0,
            content_height: content_size.1,
            config,
            viewport: Viewport::new(),
            layout: None,
            generation: 0,
            delegate,
            scroller,
            fling: FlingSlot::new(),
            fling_position: (0, 0),
            queue,
            codec,
            inbox_tx,
            inbox_rx,
            sweep_seq: 0,
            sub_frames: SubFrameRegistry::new(),
            view,
            stats: MediatorStats::default(),
        })
    }

    /// Replace the codec used to compress fetched tiles
    pub fn with_codec(mut self, codec: Arc<dyn BitmapCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Unscaled content size
    pub fn content_size(&self) -> (i32, i32) {
        (self.content_width, self.content_height)
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn stats(&self) -> MediatorStats {
        self.stats
    }

    /// Tile cache of the current layout
    pub fn bitmap_matrix(&self) -> Option<&BitmapMatrix> {
        self.layout.as_ref().map(|layout| &layout.bitmaps)
    }

    pub fn required_matrix(&self) -> Option<&RequiredMatrix> {
        self.layout.as_ref().map(|layout| &layout.required)
    }

    pub fn tile_dimensions(&self) -> Option<(i32, i32)> {
        self.layout
            .as_ref()
            .map(|layout| (layout.tile_width, layout.tile_height))
    }

    /// Incremented every time the tile grid is rebuilt
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn is_flinging(&self) -> bool {
        self.fling.is_active()
    }

    /// Establish or refresh the layout for a `width x height` window.
    ///
    /// Tiles are the size of the window. With an `initial_scale` of `0.0`
    /// the scale is recomputed so the content width fills the window;
    /// otherwise `initial_scale` is used. The configured zoom limits are
    /// relative to this scale.
    ///
    /// # Errors
    /// Returns [`PlayerError::InvalidViewportSize`] for a non-positive size.
    pub fn update_viewport_size(&mut self, width: i32, height: i32, initial_scale: f32) -> Result<(), PlayerError> {
        if width <= 0 || height <= 0 {
            return Err(PlayerError::InvalidViewportSize { width, height });
        }

        let scale = if initial_scale > 0.0 && initial_scale.is_finite() {
            initial_scale
        } else if self.content_width > 0 {
            width as f32 / self.content_width as f32
        } else {
            1.0
        };

        self.viewport.set_size(width, height);
        self.viewport.set_scale(scale);
        self.viewport
            .set_scale_bounds(scale * self.config.min_scale, scale * self.config.max_scale);
        self.clamp_translation();
        self.relayout();
        Ok(())
    }

    /// Move the viewport by `(dx, dy)` scaled pixels, clamping each axis to
    /// the content independently.
    ///
    /// Returns `true` if the viewport moved. Does not affect a fling in
    /// progress; user gestures go through [`FrameMediator::on_scroll`].
    pub fn scroll_by(&mut self, dx: f32, dy: f32) -> bool {
        if self.layout.is_none() {
            return false;
        }

        let (max_x, max_y) = self.max_translation();
        let old_x = self.viewport.trans_x();
        let old_y = self.viewport.trans_y();
        let new_x = (old_x + dx).clamp(0.0, max_x);
        let new_y = (old_y + dy).clamp(0.0, max_y);
        if new_x == old_x && new_y == old_y {
            return false;
        }

        self.viewport.set_trans(new_x, new_y);
        if self.scale_pending() {
            // Moving mid-gesture ends it; tiles must match the new scale
            self.relayout();
        } else {
            self.on_viewport_moved();
        }
        true
    }

    /// User scroll gesture. Interrupts any fling.
    pub fn on_scroll(&mut self, dx: f32, dy: f32) -> bool {
        self.cancel_fling();
        self.scroll_by(dx, dy)
    }

    /// Start a fling with the given velocity in scaled pixels per second.
    ///
    /// Any fling in progress is cancelled. The host drives the fling by
    /// calling [`FrameMediator::on_fling_tick`] once per animation frame.
    pub fn on_fling(&mut self, velocity_x: f32, velocity_y: f32) -> FlingToken {
        self.cancel_fling();

        let (max_x, max_y) = self.max_translation();
        let start = (
            self.viewport.trans_x().round() as i32,
            self.viewport.trans_y().round() as i32,
        );
        self.scroller.fling(
            start.0,
            start.1,
            velocity_x.round() as i32,
            velocity_y.round() as i32,
            max_x.round() as i32,
            max_y.round() as i32,
        );
        self.fling_position = start;

        let token = self.fling.begin();
        tracing::debug!(fling = token.id(), velocity_x, velocity_y, "fling started");
        token
    }

    /// Step the fling in progress by one animation frame.
    ///
    /// Scrolls by the scroller's movement since the previous tick. Returns
    /// `true` while further ticks are wanted.
    pub fn on_fling_tick(&mut self) -> bool {
        if self.fling.current().is_none() {
            // Cancelled through a cloned token
            if self.fling.cancel() {
                self.scroller.abort();
            }
            return false;
        }

        let running = self.scroller.compute_scroll_offset();
        let position = (self.scroller.current_x(), self.scroller.current_y());
        let dx = (position.0 - self.fling_position.0) as f32;
        let dy = (position.1 - self.fling_position.1) as f32;
        self.fling_position = position;
        self.scroll_by(dx, dy);

        if !running || self.scroller.is_finished() {
            tracing::debug!("fling finished");
            self.fling.finish();
            return false;
        }
        true
    }

    /// Forward a click at viewport-relative `(x, y)` to the compositor in
    /// unscaled content coordinates.
    ///
    /// Ignored before the first layout.
    pub fn on_click(&self, x: f32, y: f32) {
        if !self.viewport.has_scale() {
            return;
        }
        let scale = self.viewport.scale();
        let content_x = ((x + self.viewport.trans_x()) / scale).round() as i32;
        let content_y = ((y + self.viewport.trans_y()) / scale).round() as i32;
        tracing::debug!(x = content_x, y = content_y, "click");
        self.delegate.on_click(self.frame_id, content_x, content_y);
    }

    /// Zoom by `factor` about the viewport-relative pivot, within the
    /// configured limits.
    ///
    /// Tiles are not re-requested until [`FrameMediator::scale_end`] or the
    /// next scroll. The view keeps the previous layout and viewport
    /// meanwhile, so the host scales its canvas about the pivot for the
    /// duration of the gesture. Returns `true` if the scale changed.
    pub fn scale_by(&mut self, factor: f32, pivot_x: f32, pivot_y: f32) -> bool {
        if self.layout.is_none() {
            return false;
        }
        self.cancel_fling();

        let applied = self.viewport.scale_about(factor, pivot_x, pivot_y);
        if applied == 1.0 {
            return false;
        }
        self.clamp_translation();
        tracing::trace!(scale = self.viewport.scale(), applied, "scale gesture");
        true
    }

    /// Finish a scale gesture, rebuilding the tile grid at the new scale.
    ///
    /// # Errors
    /// Returns [`PlayerError::NotLaidOut`] before the first layout.
    pub fn scale_end(&mut self) -> Result<(), PlayerError> {
        if self.layout.is_none() {
            return Err(PlayerError::NotLaidOut);
        }
        if self.scale_pending() {
            self.relayout();
        }
        Ok(())
    }

    /// `true` while the viewport scale differs from the tile grid's
    fn scale_pending(&self) -> bool {
        self.layout
            .as_ref()
            .is_some_and(|layout| layout.required.scale() != self.viewport.scale())
    }

    /// Register a child frame occupying `rect` in unscaled content pixels
    pub fn add_sub_frame(&mut self, id: SubFrameId, rect: Rect) {
        self.sub_frames.add(id, rect);
        self.push_sub_frames();
    }

    pub fn remove_sub_frame(&mut self, id: SubFrameId) -> bool {
        let removed = self.sub_frames.remove(id);
        if removed {
            self.push_sub_frames();
        }
        removed
    }

    /// Sub-frames overlapping the viewport, relative to the viewport
    pub fn visible_sub_frames(&self) -> Vec<(SubFrameId, Rect)> {
        self.sub_frames
            .visible(self.viewport.as_rect(), self.viewport.scale())
    }

    /// Apply every pending fetch reply and eviction timer.
    ///
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        let mut matrix_changed = false;
        while let Ok(completion) = self.inbox_rx.try_recv() {
            handled += 1;
            match completion {
                Completion::Fetched {
                    generation,
                    coord,
                    bitmap,
                } => matrix_changed |= self.on_fetched(generation, coord, bitmap),
                Completion::Sweep { generation, seq } => self.on_sweep(generation, seq),
            }
        }

        if matrix_changed {
            if let Some(layout) = &self.layout {
                self.view.update_bitmap_matrix(layout.bitmaps.clone());
            }
        }
        handled
    }

    fn max_translation(&self) -> (f32, f32) {
        let scale = self.viewport.scale();
        let max_x = self.content_width as f32 * scale - self.viewport.width() as f32;
        let max_y = self.content_height as f32 * scale - self.viewport.height() as f32;
        (max_x.max(0.0), max_y.max(0.0))
    }

    fn clamp_translation(&mut self) {
        let (max_x, max_y) = self.max_translation();
        let x = self.viewport.trans_x().clamp(0.0, max_x);
        let y = self.viewport.trans_y().clamp(0.0, max_y);
        self.viewport.set_trans(x, y);
    }

    fn cancel_fling(&mut self) {
        if self.fling.cancel() {
            self.scroller.abort();
            tracing::debug!("fling cancelled");
        }
    }

    /// Build a fresh tile grid at the current scale. The previous grid's
    /// bitmaps are destroyed once the new grid's requests are out.
    fn relayout(&mut self) {
        let tile_width = self.viewport.width();
        let tile_height = self.viewport.height();
        let scale = self.viewport.scale();
        let (rows, cols) = grid_dimensions(
            self.content_width,
            self.content_height,
            scale,
            tile_width,
            tile_height,
        );

        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            rows,
            cols,
            tile_width,
            tile_height,
            scale,
            "layout"
        );

        let previous = self.layout.replace(Layout {
            generation: self.generation,
            tile_width,
            tile_height,
            bitmaps: BitmapMatrix::new(rows, cols),
            required: RequiredMatrix::new(rows, cols, scale),
        });

        if let Some(layout) = &self.layout {
            self.view.update_layout(
                layout.bitmaps.clone(),
                tile_width,
                tile_height,
                self.viewport.as_rect(),
            );
        }
        self.push_sub_frames();
        self.refresh_required();

        if let Some(mut previous) = previous {
            previous.bitmaps.destroy_all();
        }
    }

    fn on_viewport_moved(&mut self) {
        self.view.update_viewport(self.viewport.as_rect());
        self.push_sub_frames();
        self.refresh_required();
    }

    fn push_sub_frames(&mut self) {
        if self.sub_frames.is_empty() {
            return;
        }
        let visible = self.visible_sub_frames();
        self.view.update_sub_frames(&visible);
    }

    /// Recompute the required set and request what is missing, visible
    /// tiles first.
    fn refresh_required(&mut self) {
        let Some(layout) = self.layout.as_mut() else {
            return;
        };

        let covering = tiles_covering(self.viewport.as_rect(), layout.tile_width, layout.tile_height);
        let required = ring_with_width(
            &covering,
            layout.required.rows(),
            layout.required.cols(),
            self.config.prefetch_ring,
        );
        layout.required.set_required(&required);

        let mut requests = Vec::new();
        for planned in fetch_order(&covering, &required) {
            let coord = planned.coord;
            if layout.bitmaps.contains(coord) || !layout.required.mark_in_flight(coord) {
                continue;
            }
            requests.push(planned);
        }

        let generation = layout.generation;
        let scale = layout.required.scale();
        let (tile_width, tile_height) = (layout.tile_width, layout.tile_height);
        for planned in requests {
            let coord = planned.coord;
            let clip = coord.rect(tile_width, tile_height).scaled(1.0 / scale);
            tracing::debug!(
                row = coord.row,
                col = coord.col,
                priority = ?planned.priority,
                scale,
                generation,
                "requesting tile"
            );
            self.stats.requests_issued += 1;
            let reply = BitmapReply::new(self.inbox_tx.clone(), generation, coord);
            self.delegate.request_bitmap(self.frame_id, clip, scale, reply);
        }

        self.schedule_sweep(generation);
    }

    fn schedule_sweep(&mut self, generation: u64) {
        self.sweep_seq += 1;
        let seq = self.sweep_seq;
        let sender = self.inbox_tx.clone();
        self.queue.post_delayed_task(
            Box::new(move || {
                // Mediator may be gone
                let _ = sender.send(Completion::Sweep { generation, seq });
            }),
            self.config.eviction_delay(),
        );
    }

    /// Returns `true` if the bitmap matrix changed
    fn on_fetched(&mut self, generation: u64, coord: TileCoord, bitmap: Option<Bitmap>) -> bool {
        let Some(layout) = self.layout.as_mut().filter(|layout| layout.generation == generation) else {
            tracing::trace!(row = coord.row, col = coord.col, generation, "stale tile reply");
            self.stats.stale_replies += 1;
            return false;
        };

        layout.required.clear_in_flight(coord);
        let Some(bitmap) = bitmap else {
            tracing::warn!(row = coord.row, col = coord.col, generation, "tile request failed");
            self.stats.requests_failed += 1;
            return false;
        };

        tracing::debug!(row = coord.row, col = coord.col, generation, "tile received");
        self.stats.requests_completed += 1;
        let entry = CompressibleBitmap::new(
            bitmap,
            Arc::clone(&self.queue),
            Arc::clone(&self.codec),
            self.config.retain_after_compress,
        );
        match layout.bitmaps.set(coord, entry) {
            Ok(Some(replaced)) => {
                replaced.destroy();
                true
            }
            Ok(None) => true,
            Err(rejected) => {
                rejected.destroy();
                false
            }
        }
    }

    fn on_sweep(&mut self, generation: u64, seq: u64) {
        let Some(layout) = &self.layout else {
            return;
        };
        if layout.generation != generation || seq != self.sweep_seq {
            return;
        }

        let mut discarded = 0;
        for (coord, entry) in layout.bitmaps.populated() {
            if layout.required.is_required(coord) || entry.bitmap().is_none() {
                continue;
            }
            entry.discard_bitmap();
            if entry.bitmap().is_none() {
                discarded += 1;
            }
        }

        self.stats.sweeps += 1;
        self.stats.discarded += discarded;
        tracing::debug!(generation, discarded, "eviction sweep");
    }
}

impl<V: FrameView + std::fmt::Debug> std::fmt::Debug for FrameMediator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameMediator")
            .field("frame_id", &self.frame_id)
            .field("content_width", &self.content_width)
            .field("content_height", &self.content_height)
            .field("viewport", &self.viewport)
            .field("generation", &self.generation)
            .field("view", &self.view)
            .field("stats", &self.stats)
            .finish()
    }
}
