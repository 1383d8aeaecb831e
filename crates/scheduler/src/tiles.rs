//! Tile addressing
//!
//! Pure functions that map a viewport rectangle to the tile coordinates it
//! touches. Content is divided into a grid of `tile_width x tile_height`
//! cells, addressed by `(row, col)` with `(0, 0)` at the top-left.

use crate::geometry::Rect;
use std::collections::BTreeSet;

/// Position of a tile in the grid.
///
/// Ordering is row-major, so a `BTreeSet<TileCoord>` iterates rows top to
/// bottom and columns left to right within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub row: usize,
    pub col: usize,
}

impl TileCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Tile cell in scaled content pixels
    pub fn rect(&self, tile_width: i32, tile_height: i32) -> Rect {
        Rect::from_xywh(
            self.col as i32 * tile_width,
            self.row as i32 * tile_height,
            tile_width,
            tile_height,
        )
    }
}

/// Number of `(rows, cols)` needed to cover content of the given unscaled
/// size at `scale`.
///
/// Returns `(0, 0)` for non-positive tile dimensions, scale or content size.
pub fn grid_dimensions(
    content_width: i32,
    content_height: i32,
    scale: f32,
    tile_width: i32,
    tile_height: i32,
) -> (usize, usize) {
    if tile_width <= 0
        || tile_height <= 0
        || content_width <= 0
        || content_height <= 0
        || !(scale > 0.0)
    {
        return (0, 0);
    }

    let rows = (content_height as f32 * scale / tile_height as f32).ceil() as usize;
    let cols = (content_width as f32 * scale / tile_width as f32).ceil() as usize;
    (rows, cols)
}

/// All tiles whose cell shares at least one pixel with `rect`.
///
/// Cells left of or above the origin are never returned. Non-positive tile
/// dimensions or an empty rectangle yield an empty set.
pub fn tiles_covering(rect: Rect, tile_width: i32, tile_height: i32) -> BTreeSet<TileCoord> {
    let mut tiles = BTreeSet::new();
    if tile_width <= 0 || tile_height <= 0 || rect.is_empty() {
        return tiles;
    }
    if rect.right <= 0 || rect.bottom <= 0 {
        return tiles;
    }

    let col_start = rect.left.max(0) / tile_width;
    let row_start = rect.top.max(0) / tile_height;
    // Exclusive end: a tile starting exactly at `right` is not covered.
    let col_end = div_ceil(rect.right, tile_width);
    let row_end = div_ceil(rect.bottom, tile_height);

    for row in row_start..row_end {
        for col in col_start..col_end {
            tiles.insert(TileCoord::new(row as usize, col as usize));
        }
    }
    tiles
}

/// The covering set plus every tile one step horizontally or vertically away
/// from a member, clipped to `[0, rows) x [0, cols)`.
pub fn ring(covering: &BTreeSet<TileCoord>, rows: usize, cols: usize) -> BTreeSet<TileCoord> {
    ring_with_width(covering, rows, cols, 1)
}

/// Like [`ring`], growing the set `width` times. A width of zero returns the
/// in-bounds part of the covering set.
pub fn ring_with_width(
    covering: &BTreeSet<TileCoord>,
    rows: usize,
    cols: usize,
    width: usize,
) -> BTreeSet<TileCoord> {
    let mut required: BTreeSet<TileCoord> = covering
        .iter()
        .copied()
        .filter(|tile| tile.row < rows && tile.col < cols)
        .collect();

    for _ in 0..width {
        let mut grown = required.clone();
        for tile in &required {
            if tile.row > 0 {
                grown.insert(TileCoord::new(tile.row - 1, tile.col));
            }
            if tile.row + 1 < rows {
                grown.insert(TileCoord::new(tile.row + 1, tile.col));
            }
            if tile.col > 0 {
                grown.insert(TileCoord::new(tile.row, tile.col - 1));
            }
            if tile.col + 1 < cols {
                grown.insert(TileCoord::new(tile.row, tile.col + 1));
            }
        }
        required = grown;
    }
    required
}

fn div_ceil(value: i32, divisor: i32) -> i32 {
    (value + divisor - 1) / divisor
}
