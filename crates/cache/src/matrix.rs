//! Tile matrices
//!
//! [`BitmapMatrix`] holds one optional [`CompressibleBitmap`] per tile of a
//! frame at one scale. [`RequiredMatrix`] is its bookkeeping twin: which
//! tiles the current viewport needs and which have a fetch outstanding.
//!
//! Both are recreated whenever the tile layout or scale changes. Cells are
//! only written from the thread that owns the frame.

use crate::compressible::CompressibleBitmap;
use paint_preview_scheduler::TileCoord;
use std::collections::BTreeSet;

/// `rows x cols` grid of cached tile bitmaps
///
/// Cloning copies the handles, not the pixels, so a clone handed to the
/// painter observes discard and destroy on the shared entries.
#[derive(Debug, Clone, Default)]
pub struct BitmapMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<CompressibleBitmap>>,
}

impl BitmapMatrix {
    /// Create a matrix with every cell empty
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `true` if the matrix has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.row * self.cols + coord.col)
    }

    /// Bitmap at `coord`, `None` if the cell is empty or out of bounds
    pub fn get(&self, coord: TileCoord) -> Option<&CompressibleBitmap> {
        self.index(coord).and_then(|i| self.cells[i].as_ref())
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Store `bitmap` at `coord`, returning the entry it replaced.
    ///
    /// Out-of-bounds coordinates are ignored and `bitmap` is handed back.
    pub fn set(
        &mut self,
        coord: TileCoord,
        bitmap: CompressibleBitmap,
    ) -> Result<Option<CompressibleBitmap>, CompressibleBitmap> {
        match self.index(coord) {
            Some(i) => Ok(self.cells[i].replace(bitmap)),
            None => Err(bitmap),
        }
    }

    /// Empty the cell at `coord`
    pub fn take(&mut self, coord: TileCoord) -> Option<CompressibleBitmap> {
        self.index(coord).and_then(|i| self.cells[i].take())
    }

    /// Populated cells in row-major order
    pub fn populated(&self) -> impl Iterator<Item = (TileCoord, &CompressibleBitmap)> + '_ {
        let cols = self.cols;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref()
                .map(|bitmap| (TileCoord::new(i / cols, i % cols), bitmap))
        })
    }

    pub fn populated_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Destroy every entry and empty all cells.
    ///
    /// Entries locked by a painter are destroyed on unlock.
    pub fn destroy_all(&mut self) {
        for cell in &mut self.cells {
            if let Some(bitmap) = cell.take() {
                bitmap.destroy();
            }
        }
    }
}

/// Required and in-flight flags for every tile at one scale
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequiredMatrix {
    rows: usize,
    cols: usize,
    scale: f32,
    required: Vec<bool>,
    in_flight: Vec<bool>,
}

impl RequiredMatrix {
    pub fn new(rows: usize, cols: usize, scale: f32) -> Self {
        Self {
            rows,
            cols,
            scale,
            required: vec![false; rows * cols],
            in_flight: vec![false; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Scale the flags were computed for
    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        (coord.row < self.rows && coord.col < self.cols)
            .then(|| coord.row * self.cols + coord.col)
    }

    /// Replace the required set. Out-of-bounds members are ignored.
    pub fn set_required(&mut self, required: &BTreeSet<TileCoord>) {
        self.required.iter_mut().for_each(|flag| *flag = false);
        for &coord in required {
            if let Some(i) = self.index(coord) {
                self.required[i] = true;
            }
        }
    }

    pub fn is_required(&self, coord: TileCoord) -> bool {
        self.index(coord).is_some_and(|i| self.required[i])
    }

    /// Required tiles in row-major order
    pub fn required(&self) -> BTreeSet<TileCoord> {
        self.required
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag)
            .map(|(i, _)| TileCoord::new(i / self.cols, i % self.cols))
            .collect()
    }

    /// Mark a fetch as outstanding. Returns `false` if one already was, or
    /// the coordinate is out of bounds.
    pub fn mark_in_flight(&mut self, coord: TileCoord) -> bool {
        match self.index(coord) {
            Some(i) if !self.in_flight[i] => {
                self.in_flight[i] = true;
                true
            }
            _ => false,
        }
    }

    /// Clear the outstanding-fetch flag. Returns `true` if it was set.
    pub fn clear_in_flight(&mut self, coord: TileCoord) -> bool {
        match self.index(coord) {
            Some(i) => std::mem::replace(&mut self.in_flight[i], false),
            None => false,
        }
    }

    pub fn is_in_flight(&self, coord: TileCoord) -> bool {
        self.index(coord).is_some_and(|i| self.in_flight[i])
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.iter().filter(|&&flag| flag).count()
    }
}
