//! Message types for tally actor communication.
//!
//! Mutation messages carry a completion slot: a oneshot sender the handler
//! fires with the post-mutation snapshot once the request has been applied.
//! Awaiting the paired receiver is the caller's "applied" acknowledgment.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::tally::TallySnapshot;

/// Single-use acknowledgment slot, wrapped so messages stay `Clone`.
///
/// The sender fires at most once; `complete` takes it out of the slot. A
/// receiver that has gone away is tolerated - the mutation still applied,
/// only the acknowledgment is dropped.
#[derive(Clone, Default)]
pub struct CompletionSlot {
    tx: Arc<Mutex<Option<oneshot::Sender<TallySnapshot>>>>,
}

impl CompletionSlot {
    /// Create a slot and the receiver the caller awaits.
    pub fn new() -> (Self, oneshot::Receiver<TallySnapshot>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// A slot nobody is waiting on, for fire-and-forget requests.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Fire the acknowledgment with the post-mutation snapshot.
    pub fn complete(&self, snapshot: TallySnapshot) {
        if let Ok(mut guard) = self.tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(snapshot);
            }
        }
    }
}

impl std::fmt::Debug for CompletionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSlot")
            .field("tx", &"<mutex>")
            .finish()
    }
}

/// Request to raise the count by one - sent to the tally actor.
#[derive(Debug, Clone)]
pub struct Increment {
    /// Fired with the post-mutation snapshot once applied
    pub done: CompletionSlot,
}

/// Request to lower the count by one, saturating at zero.
#[derive(Debug, Clone)]
pub struct Decrement {
    /// Fired with the post-mutation snapshot once applied or clamped
    pub done: CompletionSlot,
}

/// Read request: snapshot the tally through the same mailbox as mutations,
/// so a read never observes a half-applied mutation.
#[derive(Debug, Clone)]
pub struct QueryTally {
    /// Fired with the current snapshot
    pub reply: CompletionSlot,
}

/// Diagnostic broadcast: a decrement arrived while the count was already zero.
///
/// Broadcast on the runtime broker so observers can subscribe without holding
/// a handle to the tally actor. The mutation itself was a no-op.
#[derive(Debug, Clone)]
pub struct UnderflowReported {
    /// Count at the time of the attempt (always zero)
    pub count: u64,
    /// Total underflows recorded so far, including this one
    pub underflows: u64,
}
