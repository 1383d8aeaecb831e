//! Paint Preview Scheduler Library
//!
//! Viewport state, tile addressing and background task queues for the
//! paint-preview player.
//!
//! A frame's content is divided into a grid of tiles. On every viewport
//! change the player computes which tiles cover the viewport, grows that set
//! by a one-tile ring for prefetch, and requests the missing tiles with the
//! visible ones first.
//!
//! # Example
//!
//! ```
//! use paint_preview_scheduler::{fetch_order, ring, tiles_covering, FetchPriority, Viewport};
//!
//! let mut viewport = Viewport::new();
//! viewport.set_size(100, 200);
//! viewport.set_scale(1.0);
//!
//! let covering = tiles_covering(viewport.as_rect(), 100, 200);
//! let required = ring(&covering, 6, 6);
//! let plan = fetch_order(&covering, &required);
//!
//! assert_eq!(plan.len(), 3);
//! assert_eq!(plan[0].priority, FetchPriority::Visible);
//! ```

mod cancel;
mod geometry;
mod priority;
mod task_queue;
mod tiles;
mod viewport;

// Re-export public API
pub use cancel::{FlingSlot, FlingToken};
pub use geometry::Rect;
pub use priority::{fetch_order, FetchPriority, PlannedFetch};
pub use task_queue::{ManualTaskQueue, SequencedTaskQueue, Task, TaskQueue};
pub use tiles::{grid_dimensions, ring, ring_with_width, tiles_covering, TileCoord};
pub use viewport::Viewport;
