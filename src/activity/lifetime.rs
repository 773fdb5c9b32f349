//! Lifetime token of an activity view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling asynchronous completions whether their view still exists.
///
/// Clones observe the same flag. It starts active and can only be cleared.
#[derive(Debug, Clone)]
pub struct ViewLifetime {
    active: Arc<AtomicBool>,
}

impl ViewLifetime {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clear the flag. Returns true for the call that actually cleared it.
    pub fn invalidate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_once() {
        let lifetime = ViewLifetime::new();
        let handle = lifetime.clone();
        assert!(handle.is_active());

        assert!(handle.invalidate());
        assert!(!lifetime.is_active());
        assert!(!lifetime.invalidate());
    }
}
