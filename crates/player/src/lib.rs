//! Paint Preview Player Library
//!
//! Displays a captured page (a paint-preview frame) through a scrollable,
//! zoomable viewport backed by a grid of independently cached tiles.
//!
//! A [`FrameMediator`] owns the viewport and tile cache for one frame. It
//! requests tiles from a [`CompositorDelegate`], keeps them compressed while
//! they are off screen, and pushes layout snapshots to a
//! [`paint_preview_render::FrameView`] such as the
//! [`paint_preview_render::Painter`].
//!
//! # Example
//!
//! ```
//! use paint_preview_cache::Bitmap;
//! use paint_preview_player::{
//!     BallisticScroller, BitmapReply, CompositorDelegate, FrameId, FrameMediator, PlayerConfig,
//! };
//! use paint_preview_render::{Painter, PixelCanvas};
//! use paint_preview_scheduler::{ManualTaskQueue, Rect};
//! use std::sync::Arc;
//!
//! struct SolidCompositor;
//!
//! impl CompositorDelegate for SolidCompositor {
//!     fn request_bitmap(&self, _frame: FrameId, clip: Rect, scale: f32, reply: BitmapReply) {
//!         let scaled = clip.scaled(scale);
//!         reply.success(Bitmap::filled(scaled.width() as u32, scaled.height() as u32, [255; 4]));
//!     }
//!
//!     fn on_click(&self, _frame: FrameId, _x: i32, _y: i32) {}
//! }
//!
//! struct NoFling;
//!
//! impl BallisticScroller for NoFling {
//!     fn fling(&mut self, _: i32, _: i32, _: i32, _: i32, _: i32, _: i32) {}
//!     fn compute_scroll_offset(&mut self) -> bool { false }
//!     fn current_x(&self) -> i32 { 0 }
//!     fn current_y(&self) -> i32 { 0 }
//!     fn is_finished(&self) -> bool { true }
//!     fn abort(&mut self) {}
//! }
//!
//! # fn main() -> Result<(), paint_preview_player::PlayerError> {
//! let queue = Arc::new(ManualTaskQueue::new());
//! let mut mediator = FrameMediator::new(
//!     FrameId(1),
//!     (560, 1150),
//!     PlayerConfig::default().with_retain_after_compress(true),
//!     Arc::new(SolidCompositor),
//!     Box::new(NoFling),
//!     queue.clone(),
//!     Painter::new(Arc::new(|| {})),
//! )?;
//!
//! mediator.update_viewport_size(100, 200, 1.0)?;
//! mediator.pump();
//!
//! let mut canvas = PixelCanvas::new(100, 200);
//! let stats = mediator.view_mut().on_draw(&mut canvas);
//! assert_eq!(stats.drawn, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delegate;
pub mod error;
pub mod mediator;
pub mod subframe;

pub use config::{PlayerConfig, MAX_PREFETCH_RING};
pub use delegate::{BallisticScroller, BitmapReply, CompositorDelegate, FrameId};
pub use error::{ConfigError, PlayerError};
pub use mediator::{FrameMediator, MediatorStats};
pub use subframe::SubFrameRegistry;
