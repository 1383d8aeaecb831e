//! Compressible tile bitmap
//!
//! A [`CompressibleBitmap`] is one tile's cache entry. It starts out holding
//! decoded pixels, compresses itself on a background queue, and can drop the
//! decoded form to save memory and re-inflate it later.
//!
//! Residency moves through:
//!
//! ```text
//! Decoded --compress--> Both (retain) --discard--> Compressed --inflate--> Both
//!    |                    \                          |
//!    |                     `-------- destroy --------+--> Destroyed
//!    `-- compress fails: stays Decoded, discard is a no-op
//! ```
//!
//! A consumer brackets every use of the decoded pixels with
//! [`CompressibleBitmap::lock`] / [`CompressibleBitmap::unlock`]. Discard and
//! destroy requested while locked are deferred to the matching unlock.

use crate::bitmap::Bitmap;
use crate::codec::BitmapCodec;
use paint_preview_scheduler::TaskQueue;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Which forms of the pixels are currently held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapResidency {
    /// Only decoded pixels; compression pending or failed
    Decoded,

    /// Only the compressed buffer
    Compressed,

    /// Decoded pixels and the compressed buffer
    Both,

    /// Everything released
    Destroyed,
}

enum Residency {
    Decoded(Arc<Bitmap>),
    Compressed(Arc<[u8]>),
    Both {
        bitmap: Arc<Bitmap>,
        compressed: Arc<[u8]>,
    },
    Destroyed,
}

impl Residency {
    fn kind(&self) -> BitmapResidency {
        match self {
            Residency::Decoded(_) => BitmapResidency::Decoded,
            Residency::Compressed(_) => BitmapResidency::Compressed,
            Residency::Both { .. } => BitmapResidency::Both,
            Residency::Destroyed => BitmapResidency::Destroyed,
        }
    }

    fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        match self {
            Residency::Decoded(bitmap) | Residency::Both { bitmap, .. } => Some(bitmap),
            _ => None,
        }
    }

    fn compressed(&self) -> Option<&Arc<[u8]>> {
        match self {
            Residency::Compressed(compressed) | Residency::Both { compressed, .. } => {
                Some(compressed)
            }
            _ => None,
        }
    }
}

/// Operation requested while locked, applied on unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    None,
    Discard,
    Destroy,
}

struct State {
    residency: Residency,
    locked: bool,
    deferred: Deferred,
    retain_after_compress: bool,
    compress_failed: bool,
    decode_failed: bool,
}

impl State {
    /// Drop the decoded pixels if a compressed copy exists
    fn discard_now(&mut self) -> bool {
        match std::mem::replace(&mut self.residency, Residency::Destroyed) {
            Residency::Both { compressed, .. } => {
                self.residency = Residency::Compressed(compressed);
                true
            }
            other => {
                // Never drop the only copy of the pixels
                self.residency = other;
                false
            }
        }
    }

    fn destroy_now(&mut self) {
        self.residency = Residency::Destroyed;
        self.deferred = Deferred::None;
    }

    fn defer(&mut self, op: Deferred) {
        // Destroy supersedes discard
        if self.deferred != Deferred::Destroy {
            self.deferred = op;
        }
    }
}

struct Shared {
    state: Mutex<State>,
    queue: Arc<dyn TaskQueue>,
    codec: Arc<dyn BitmapCodec>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One tile's pixel cache entry
///
/// Cloning is cheap and yields another handle to the same entry. Background
/// work holds only a weak reference, so work finishing after every handle is
/// gone is skipped.
#[derive(Clone)]
pub struct CompressibleBitmap {
    shared: Arc<Shared>,
}

impl CompressibleBitmap {
    /// Wrap a decoded bitmap and post its compression to `queue`.
    ///
    /// Once compressed, the decoded pixels are dropped unless
    /// `retain_after_compress` is set, in which case they stay until
    /// [`CompressibleBitmap::discard_bitmap`].
    pub fn new(
        bitmap: Bitmap,
        queue: Arc<dyn TaskQueue>,
        codec: Arc<dyn BitmapCodec>,
        retain_after_compress: bool,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                residency: Residency::Decoded(Arc::new(bitmap)),
                locked: false,
                deferred: Deferred::None,
                retain_after_compress,
                compress_failed: false,
                decode_failed: false,
            }),
            queue,
            codec,
        });

        let weak = Arc::downgrade(&shared);
        shared
            .queue
            .post_task(Box::new(move || Self::compress(weak)));

        Self { shared }
    }

    fn compress(weak: Weak<Shared>) {
        let Some(shared) = weak.upgrade() else {
            return;
        };

        let source = {
            let state = shared.state();
            match &state.residency {
                Residency::Decoded(bitmap) => Arc::clone(bitmap),
                // Destroyed before compression got a chance to run
                _ => return,
            }
        };

        let encoded = shared.codec.encode(&source);

        let mut state = shared.state();
        match encoded {
            Ok(bytes) => {
                let compressed: Arc<[u8]> = bytes.into();
                let residency = std::mem::replace(&mut state.residency, Residency::Destroyed);
                state.residency = match residency {
                    Residency::Decoded(bitmap) => Residency::Both { bitmap, compressed },
                    other => other,
                };
                if !state.retain_after_compress {
                    if state.locked {
                        state.defer(Deferred::Discard);
                    } else {
                        state.discard_now();
                    }
                }
                tracing::trace!(
                    decoded = source.byte_size(),
                    compressed = state.residency.compressed().map_or(0, |c| c.len()),
                    "bitmap compressed"
                );
            }
            Err(error) => {
                // Keep the decoded pixels; they are the only copy.
                state.compress_failed = true;
                tracing::warn!(%error, "bitmap compression failed, keeping decoded pixels");
            }
        }
    }

    fn inflate(weak: Weak<Shared>, callback: Box<dyn FnOnce(CompressibleBitmap) + Send>) {
        let Some(shared) = weak.upgrade() else {
            return;
        };

        let compressed = {
            let state = shared.state();
            match &state.residency {
                Residency::Compressed(compressed) => Some(Arc::clone(compressed)),
                // Already decoded by an earlier inflate, or destroyed meanwhile
                _ => None,
            }
        };

        if let Some(compressed) = compressed {
            match shared.codec.decode(&compressed) {
                Ok(bitmap) => {
                    let mut state = shared.state();
                    let residency = std::mem::replace(&mut state.residency, Residency::Destroyed);
                    state.residency = match residency {
                        Residency::Compressed(compressed) => Residency::Both {
                            bitmap: Arc::new(bitmap),
                            compressed,
                        },
                        other => other,
                    };
                }
                Err(error) => {
                    shared.state().decode_failed = true;
                    tracing::warn!(%error, "bitmap decompression failed");
                }
            }
        }

        callback(CompressibleBitmap { shared });
    }

    /// Decoded pixels, `None` if only the compressed form is held or the
    /// entry was destroyed
    pub fn bitmap(&self) -> Option<Arc<Bitmap>> {
        self.shared.state().residency.bitmap().cloned()
    }

    pub fn residency(&self) -> BitmapResidency {
        self.shared.state().residency.kind()
    }

    pub fn has_compressed(&self) -> bool {
        self.shared.state().residency.compressed().is_some()
    }

    pub fn compressed_size(&self) -> Option<usize> {
        self.shared.state().residency.compressed().map(|c| c.len())
    }

    /// `true` once compression was attempted and failed
    pub fn compress_failed(&self) -> bool {
        self.shared.state().compress_failed
    }

    /// `true` once an inflation failed to decode the compressed copy
    pub fn decode_failed(&self) -> bool {
        self.shared.state().decode_failed
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.shared.state().residency, Residency::Destroyed)
    }

    pub fn is_locked(&self) -> bool {
        self.shared.state().locked
    }

    /// Reserve the entry. Fails if it is already locked.
    ///
    /// Locking does not inflate.
    pub fn lock(&self) -> bool {
        let mut state = self.shared.state();
        if state.locked {
            return false;
        }
        state.locked = true;
        true
    }

    /// Release the reservation and apply any deferred discard or destroy.
    ///
    /// Fails if the entry is not locked.
    pub fn unlock(&self) -> bool {
        let mut state = self.shared.state();
        if !state.locked {
            return false;
        }
        state.locked = false;
        match std::mem::replace(&mut state.deferred, Deferred::None) {
            Deferred::None => {}
            Deferred::Discard => {
                state.discard_now();
            }
            Deferred::Destroy => state.destroy_now(),
        }
        true
    }

    /// Drop the decoded pixels, keeping the compressed copy.
    ///
    /// Deferred while locked. A no-op if no compressed copy exists.
    pub fn discard_bitmap(&self) {
        let mut state = self.shared.state();
        if state.locked {
            state.defer(Deferred::Discard);
            return;
        }
        state.discard_now();
    }

    /// Decode the compressed copy on the task queue, then call `callback`
    /// with this entry.
    ///
    /// If the entry is destroyed (or its destruction is pending), or the
    /// pixels are already decoded, `callback` runs immediately on the
    /// caller's thread.
    pub fn inflate_in_background<F>(&self, callback: F)
    where
        F: FnOnce(CompressibleBitmap) + Send + 'static,
    {
        let immediate = {
            let state = self.shared.state();
            matches!(state.residency, Residency::Destroyed)
                || state.deferred == Deferred::Destroy
                || state.residency.bitmap().is_some()
        };
        if immediate {
            callback(self.clone());
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let callback: Box<dyn FnOnce(CompressibleBitmap) + Send> = Box::new(callback);
        self.shared
            .queue
            .post_task(Box::new(move || Self::inflate(weak, callback)));
    }

    /// Release everything.
    ///
    /// Deferred while locked; the decoded pixels stay readable until the
    /// matching unlock. Idempotent.
    pub fn destroy(&self) {
        let mut state = self.shared.state();
        if state.locked {
            state.defer(Deferred::Destroy);
            return;
        }
        state.destroy_now();
    }

    /// `true` if both handles refer to the same entry
    pub fn ptr_eq(&self, other: &CompressibleBitmap) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for CompressibleBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("CompressibleBitmap")
            .field("residency", &state.residency.kind())
            .field("locked", &state.locked)
            .field("deferred", &state.deferred)
            .finish()
    }
}
