//! Cooperative cancellation token shared between the engine and a run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable flag that a run polls between units of work.
///
/// Setting it never aborts in-flight account calls; clients that can stop
/// early should check [`CancelFlag::is_cancelled`] themselves.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` if this call set the flag.
    pub fn cancel(&self) -> bool {
        !self.inner.swap(true, Ordering::AcqRel)
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        assert!(flag.cancel());
        assert!(observer.is_cancelled());
        assert!(!flag.cancel(), "second cancel should report already set");
    }
}
