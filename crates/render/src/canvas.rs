//! Draw surfaces
//!
//! The painter only ever copies rectangles out of tile bitmaps, so the
//! surface contract is a single primitive. [`PixelCanvas`] is an in-memory
//! RGBA implementation used for software output and tests.

use paint_preview_cache::{Bitmap, BYTES_PER_PIXEL};
use paint_preview_scheduler::Rect;

/// Output surface the painter draws tiles onto
pub trait Canvas {
    /// Copy the `src` region of `bitmap` into the `dst` region of the surface.
    ///
    /// `src` is in bitmap-local pixels, `dst` in surface pixels.
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect);
}

/// Opaque RGBA framebuffer
#[derive(Clone, PartialEq, Eq)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelCanvas {
    /// Create a canvas cleared to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)`, `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// Fill the whole canvas with `rgba`
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

impl Canvas for PixelCanvas {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, src: Rect, dst: Rect) {
        if src.is_empty() || dst.is_empty() {
            return;
        }
        let Some(visible) = dst.intersect(&self.bounds()) else {
            return;
        };

        // Nearest-neighbour sampling; a 1:1 copy when the sizes match.
        let src_w = src.width() as i64;
        let src_h = src.height() as i64;
        let dst_w = dst.width() as i64;
        let dst_h = dst.height() as i64;
        let stride = self.width as usize;

        for y in visible.top..visible.bottom {
            let sy = src.top as i64 + (y - dst.top) as i64 * src_h / dst_h;
            for x in visible.left..visible.right {
                let sx = src.left as i64 + (x - dst.left) as i64 * src_w / dst_w;
                if sx < 0 || sy < 0 {
                    continue;
                }
                let Some(rgba) = bitmap.pixel(sx as u32, sy as u32) else {
                    continue;
                };
                let offset = (y as usize * stride + x as usize) * BYTES_PER_PIXEL;
                self.pixels[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
            }
        }
    }
}

impl std::fmt::Debug for PixelCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelCanvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
