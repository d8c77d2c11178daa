//! Non-blocking re-entrancy guard for render passes.
//!
//! Acquire-or-skip: a caller that finds the guard taken does not wait, it
//! drops its request. The next legitimately triggered pass picks up the
//! current state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DrawGuard {
    busy: Arc<AtomicBool>,
}

impl DrawGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` if a pass is already running
    pub fn try_enter(&self) -> Option<DrawToken> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| DrawToken {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of a pass; releases the guard on drop.
#[derive(Debug)]
pub struct DrawToken {
    busy: Arc<AtomicBool>,
}

impl Drop for DrawToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
