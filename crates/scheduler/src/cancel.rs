//! Fling cancellation
//!
//! Each fling gesture gets a [`FlingToken`]. Starting a new gesture cancels
//! the token of the previous one, so an animation driver holding an old token
//! knows to stop ticking.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Handle to one fling animation
///
/// Clones share the same cancellation state.
#[derive(Debug, Clone)]
pub struct FlingToken {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl FlingToken {
    fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sequence number of the fling this token belongs to
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Holds the token of the fling currently in progress, if any
#[derive(Debug, Default)]
pub struct FlingSlot {
    next_id: u64,
    current: Option<FlingToken>,
}

impl FlingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fling, cancelling the previous one
    pub fn begin(&mut self) -> FlingToken {
        self.cancel();
        let token = FlingToken::new(self.next_id);
        self.next_id += 1;
        self.current = Some(token.clone());
        token
    }

    /// Cancel the fling in progress. Returns `true` if there was one.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget the current fling after it ran to completion.
    ///
    /// The token is not cancelled, so holders can tell completion from
    /// interruption.
    pub fn finish(&mut self) {
        self.current = None;
    }

    /// The fling in progress, `None` if idle or if it was cancelled through
    /// a cloned token
    pub fn current(&self) -> Option<&FlingToken> {
        self.current.as_ref().filter(|token| !token.is_cancelled())
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }
}
