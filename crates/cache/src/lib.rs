//! Paint Preview Cache Library
//!
//! Tile bitmap cache that keeps decoded pixels resident only while needed.
//!
//! Every fetched tile is wrapped in a [`CompressibleBitmap`], which compresses
//! itself on a background queue and can drop or re-inflate its decoded form.
//! A [`BitmapMatrix`] holds the entries for one frame at one scale.
//!
//! # Example
//!
//! ```
//! use paint_preview_cache::{Bitmap, BitmapMatrix, CompressibleBitmap, PngCodec};
//! use paint_preview_scheduler::{ManualTaskQueue, TileCoord};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(ManualTaskQueue::new());
//! let mut matrix = BitmapMatrix::new(2, 2);
//!
//! let tile = Bitmap::filled(64, 64, [255, 255, 255, 255]);
//! let entry = CompressibleBitmap::new(tile, queue.clone(), Arc::new(PngCodec::default()), false);
//! matrix.set(TileCoord::new(0, 0), entry).unwrap();
//!
//! // Compression runs on the queue and drops the decoded pixels
//! queue.run_until_idle();
//! assert!(matrix.get(TileCoord::new(0, 0)).unwrap().bitmap().is_none());
//! ```

pub mod bitmap;
pub mod codec;
pub mod compressible;
pub mod matrix;

pub use bitmap::{Bitmap, BYTES_PER_PIXEL};
pub use codec::{BitmapCodec, CodecError, PngCodec, PngCompression};
pub use compressible::{BitmapResidency, CompressibleBitmap};
pub use matrix::{BitmapMatrix, RequiredMatrix};
