//! Paint Preview Render Library
//!
//! Draw-time compositing of cached tiles. The [`Painter`] receives layout
//! snapshots through [`FrameView`] and copies the visible part of each tile
//! onto a [`Canvas`].
//!
//! # Example
//!
//! ```
//! use paint_preview_cache::{Bitmap, BitmapMatrix, CompressibleBitmap, PngCodec};
//! use paint_preview_render::{FrameView, Painter, PixelCanvas};
//! use paint_preview_scheduler::{ManualTaskQueue, Rect, TileCoord};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(ManualTaskQueue::new());
//! let mut matrix = BitmapMatrix::new(1, 1);
//! let tile = Bitmap::filled(32, 32, [255, 0, 0, 255]);
//! matrix
//!     .set(TileCoord::new(0, 0), CompressibleBitmap::new(tile, queue, Arc::new(PngCodec::default()), true))
//!     .unwrap();
//!
//! let mut painter = Painter::new(Arc::new(|| {}));
//! painter.update_layout(matrix, 32, 32, Rect::new(0, 0, 16, 16));
//!
//! let mut canvas = PixelCanvas::new(16, 16);
//! let stats = painter.on_draw(&mut canvas);
//! assert_eq!(stats.drawn, 1);
//! assert_eq!(canvas.pixel(15, 15), Some([255, 0, 0, 255]));
//! ```

pub mod canvas;
pub mod painter;
pub mod view;

pub use canvas::{Canvas, PixelCanvas};
pub use painter::{FirstPaintCallback, Invalidator, PaintStats, Painter};
pub use view::{FrameView, SubFrameId};
