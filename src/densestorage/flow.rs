//! # Writer Flow Control
//!
//! A counting semaphore built on `parking_lot::{Mutex, Condvar}` that bounds
//! how far the dense storage writer may run ahead of its slowest reader.
//!
//! The writer acquires one permit per published block; the first reader to
//! observe a block's `next` transition releases one permit. With multiple
//! readers over the same column only the first observer releases, so the
//! producer is paced by the slowest reader.
//!
//! The semaphore can be closed. A closed semaphore fails all current and
//! future `acquire` calls, which is how a fatally-failed consumer converts a
//! blocked producer into an orderly error instead of a deadlock.

use eyre::{bail, Result};
use parking_lot::{Condvar, Mutex};

struct FlowState {
    permits: usize,
    closed: bool,
}

/// Counting semaphore with close support.
pub struct FlowSemaphore {
    state: Mutex<FlowState>,
    available: Condvar,
}

impl FlowSemaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(FlowState {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take one permit, blocking until one is available.
    ///
    /// Fails if the semaphore has been closed, or is closed while waiting.
    pub fn acquire(&self) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                bail!("flow-control semaphore closed: a reader terminated abnormally");
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            self.available.wait(&mut state);
        }
    }

    /// Return one permit. Never blocks.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        // One permit frees at most one waiter.
        drop(state);
        self.available.notify_one();
    }

    /// Fail all current and future acquirers.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }
}
