//! Exclusive access to scene state between frame batches
//!
//! The render loop holds the gate while it runs a batch of frames. At every
//! batch boundary it releases the gate and waits until each producer that was
//! already queued has had its turn before taking it back. A producer that
//! needs several objects to change together takes the gate with
//! [`FrameGate::enter`] so no frame observes the edit half done.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use crate::lock;

#[derive(Debug, Default)]
pub struct FrameGate {
    lock: Mutex<()>,
    waiting: AtomicUsize,
}

/// Held by a producer; frames are not drawn while it is alive
#[must_use = "the frame gate is released when the guard is dropped"]
pub struct FrameGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the render loop reaches a batch boundary, then hold off
    /// further frames until the guard is dropped
    pub fn enter(&self) -> FrameGuard<'_> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = lock(&self.lock);
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        FrameGuard { _guard: guard }
    }

    /// Number of producers queued on the gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Taken by the render loop before its first batch
    pub(crate) fn hold(&self) -> MutexGuard<'_, ()> {
        lock(&self.lock)
    }

    /// Batch boundary: let queued producers through, then take the gate back
    pub(crate) fn handoff<'a>(&'a self, held: MutexGuard<'a, ()>) -> MutexGuard<'a, ()> {
        drop(held);
        while self.waiting.load(Ordering::SeqCst) > 0 {
            thread::yield_now();
        }
        lock(&self.lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_producer_runs_at_handoff() {
        let gate = Arc::new(FrameGate::new());
        let entered = Arc::new(AtomicBool::new(false));

        let held = gate.hold();
        let producer = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _guard = gate.enter();
                entered.store(true, Ordering::SeqCst);
            })
        };

        while gate.waiting() == 0 {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(10));
        assert!(!entered.load(Ordering::SeqCst));

        let held = gate.handoff(held);
        assert!(entered.load(Ordering::SeqCst));
        drop(held);
        producer.join().unwrap();
    }
}
