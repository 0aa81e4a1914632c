//! Tally types: the shared participant count and its consistent snapshots.

use serde::{Deserialize, Serialize};

/// Outcome of applying a decrement to a [`Tally`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// The count was positive and went down by one.
    Applied,
    /// The count was already zero; only the underflow tally moved.
    Underflow,
}

/// Point-in-time view of a tally.
///
/// Snapshots are taken inside the serialization point, so `count` and
/// `underflows` always come from the same fully-applied state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    /// Number of currently active participants
    pub count: u64,
    /// Decrements that arrived while the count was already zero
    pub underflows: u64,
}

/// The shared mutable state: a non-negative participant count.
///
/// `Tally` is plain single-threaded state. Mutual exclusion belongs to its
/// owner - the actor mailbox applies one mutation at a time - so these
/// methods carry no locking of their own.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    count: u64,
    underflows: u64,
}

impl Tally {
    /// Create a tally starting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one increment. Always succeeds.
    pub fn increment(&mut self) -> TallySnapshot {
        self.count += 1;
        self.snapshot()
    }

    /// Apply one decrement, saturating at zero.
    ///
    /// A decrement at zero is not an error: independent callers racing each
    /// other are expected to occasionally overshoot. The attempt is recorded
    /// in `underflows` and the count stays at zero.
    pub fn decrement(&mut self) -> (DecrementOutcome, TallySnapshot) {
        if self.count == 0 {
            self.underflows += 1;
            return (DecrementOutcome::Underflow, self.snapshot());
        }
        self.count -= 1;
        (DecrementOutcome::Applied, self.snapshot())
    }

    /// Current state as a consistent snapshot.
    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            count: self.count,
            underflows: self.underflows,
        }
    }
}
