//! Concurrency primitives for a counting run.
//!
//! - [`CompletionGroup`] is a wait-group: the producer takes one
//!   [`CompletionToken`] per dispatched URL and waits for all of them.
//!   Waiting yields a [`Drained`] proof.
//! - [`WorkerPool`] bounds the number of in-flight fetches. Each worker holds
//!   a [`Slot`] that is released when dropped, on every exit path.
//! - [`Accumulator`] is the mutex-guarded running total. Reading it requires
//!   a `&Drained`, so the total cannot be read while an add is pending.

use crate::error::UrlCountError;
use crate::types::Tally;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

/// Proof that a completion group reached zero after its last token was issued.
///
/// Only [`CompletionGroup::wait`] creates it.
#[derive(Debug)]
pub struct Drained {
    _private: (),
}

/// Tracks URLs dispatched but not yet fully processed.
pub struct CompletionGroup {
    outstanding: Arc<watch::Sender<usize>>,
}

impl CompletionGroup {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0usize);
        Self {
            outstanding: Arc::new(outstanding),
        }
    }

    /// Register one more in-flight item and return its token.
    pub fn add(&self) -> CompletionToken {
        self.outstanding.send_modify(|n| *n += 1);
        CompletionToken {
            outstanding: Arc::clone(&self.outstanding),
            signalled: false,
        }
    }

    /// Number of tokens issued and not yet signalled.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until every issued token has been signalled.
    ///
    /// Consumes the group: no token can be issued once waiting started.
    pub async fn wait(self) -> Drained {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self` for the whole wait, so this cannot fail.
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
        Drained { _private: () }
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle used by a worker to signal that its item is fully processed.
///
/// Dropping an unsignalled token signals it, so a panicking worker cannot
/// stall the group.
#[derive(Debug)]
pub struct CompletionToken {
    outstanding: Arc<watch::Sender<usize>>,
    signalled: bool,
}

impl CompletionToken {
    /// Signal completion. Must be called after the accumulator update.
    pub fn done(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if !self.signalled {
            self.signalled = true;
            self.outstanding.send_modify(|n| *n -= 1);
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.signal();
    }
}

/// Fixed-capacity pool of worker slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool with `capacity` slots. Callers validate `capacity >= 1`.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<Slot, UrlCountError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| UrlCountError::internal("worker pool closed"))?;
        Ok(Slot { _permit: permit })
    }

    /// Number of slots currently held by workers.
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One acquired slot of a [`WorkerPool`]; released on drop.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    /// Give the slot back to the pool.
    pub fn release(self) {
        drop(self);
    }
}

/// Running total shared by the workers of one run.
#[derive(Debug, Default)]
pub struct Accumulator {
    tally: Mutex<Tally>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the count of one successfully processed URL.
    pub fn add(&self, count: u64) {
        let mut tally = self.lock();
        tally.total += count;
        tally.succeeded += 1;
    }

    /// Record a URL dropped because its fetch failed.
    pub fn record_failure(&self) {
        self.lock().failed += 1;
    }

    /// The final total. Only callable once the run is drained.
    pub fn read(&self, _drained: &Drained) -> u64 {
        self.lock().total
    }

    /// The final tally, including success and failure counts.
    pub fn tally(&self, _drained: &Drained) -> Tally {
        *self.lock()
    }

    // Every update is a single field write, so a poisoned lock still holds a
    // consistent tally.
    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
