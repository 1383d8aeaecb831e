//! Sub-frame positioning
//!
//! Child frames are rendered elsewhere; the player only tracks where they
//! sit in the parent's content and which of them the viewport shows.

use paint_preview_render::SubFrameId;
use paint_preview_scheduler::Rect;

/// Child frames registered with a mediator, in registration order
#[derive(Debug, Clone, Default)]
pub struct SubFrameRegistry {
    frames: Vec<(SubFrameId, Rect)>,
}

impl SubFrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` at `rect` (unscaled content pixels), replacing any
    /// previous rectangle for the same id
    pub fn add(&mut self, id: SubFrameId, rect: Rect) {
        match self.frames.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = rect,
            None => self.frames.push((id, rect)),
        }
    }

    /// Returns `true` if `id` was registered
    pub fn remove(&mut self, id: SubFrameId) -> bool {
        let before = self.frames.len();
        self.frames.retain(|(existing, _)| *existing != id);
        self.frames.len() != before
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sub-frames overlapping `viewport` (scaled content pixels), with the
    /// overlap relative to the viewport's top-left corner.
    ///
    /// Frames entirely outside the viewport are left out.
    pub fn visible(&self, viewport: Rect, scale: f32) -> Vec<(SubFrameId, Rect)> {
        if scale <= 0.0 || viewport.is_empty() {
            return Vec::new();
        }
        self.frames
            .iter()
            .filter_map(|&(id, rect)| {
                rect.scaled(scale)
                    .intersect(&viewport)
                    .map(|overlap| (id, overlap.offset(-viewport.left, -viewport.top)))
            })
            .collect()
    }
}
