//! Completed-frame counter and cooperative cancellation flag.
//!
//! A [`Progress`] is shared by reference between the worker tasks of a run
//! and whatever presentation layer polls it. Workers check
//! [`is_cancelled`](Progress::is_cancelled) at the top of their inner loops
//! and return partial results once it is set.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Progress {
    completed: AtomicUsize,
    cancelled: AtomicBool,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames completed so far. Monotonic until [`reset`](Self::reset).
    #[inline]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn frame_done(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Request every running stage to stop at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Zero the counter and clear the cancel flag before reuse.
    pub fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_cancel() {
        let progress = Progress::new();
        assert_eq!(progress.completed(), 0);
        assert!(!progress.is_cancelled());

        progress.frame_done();
        progress.frame_done();
        assert_eq!(progress.completed(), 2);

        progress.cancel();
        assert!(progress.is_cancelled());

        progress.reset();
        assert_eq!(progress.completed(), 0);
        assert!(!progress.is_cancelled());
    }

    #[test]
    fn test_counter_from_many_threads() {
        use rayon::prelude::*;

        let progress = Progress::new();
        (0..1000).into_par_iter().for_each(|_| progress.frame_done());
        assert_eq!(progress.completed(), 1000);
    }
}
