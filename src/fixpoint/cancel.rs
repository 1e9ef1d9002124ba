//! Cooperative cancellation (`spec.md` §5): the iterator polls this token
//! "at safe points (start of each node evaluation, start of each loop
//! iteration)" and returns its most recent partial, sound invariants
//! instead of suspending or aborting mid-update.
//!
//! The only place this crate reaches for shared ownership: every other
//! value here is a plain value type (`spec.md` §5, "abstract states are
//! value types"), but a cancellation flag must be observable from outside
//! the single thread the iterator runs on while it runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A handle a caller can clone and flip from another thread (or a signal
/// handler, or a timer callback) to ask a running [`super::FixpointIterator`]
/// to stop at the next safe point (`spec.md` §5: "Timeouts: not a core
/// concern; implemented by the caller by driving cancellation from a
/// timer").
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_is_shared_through_clones() {
        let tok = CancellationToken::new();
        let other = tok.clone();
        assert!(!tok.is_cancelled());
        other.cancel();
        assert!(tok.is_cancelled());
    }
}
