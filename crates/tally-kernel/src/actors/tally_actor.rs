//! TallyActor: exclusive owner of the shared participant count.
//!
//! All mutations funnel through the actor mailbox - one message at a time -
//! so two requests issued from unrelated tasks are never both mid-mutation.
//! Callers hold a [`TallyHandle`] and suspend on the completion slot until
//! their request has been applied.

use acton_reactive::prelude::*;
use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::messages::{CompletionSlot, Decrement, Increment, QueryTally, UnderflowReported};
use crate::tally::{DecrementOutcome, Tally, TallySnapshot};

/// Actor state owning the tally.
///
/// Mutual exclusion is the mailbox's: `mutate_on` handlers run one at a
/// time, so the [`Tally`] inside needs no lock of its own.
#[derive(Debug, Default, Clone)]
pub struct TallyActorState {
    /// The owned count state
    tally: Tally,
}

/// Spawner for the tally actor.
///
/// Handles:
/// - `Increment` - raise the count
/// - `Decrement` - lower the count, saturating at zero with a diagnostic
/// - `QueryTally` - snapshot reads through the same mailbox
pub struct TallyActor;

impl TallyActor {
    /// Spawn a tally actor in the given runtime, starting from zero.
    ///
    /// Returns the typed handle callers use to issue requests.
    pub async fn spawn(runtime: &mut ActorRuntime, name: &str) -> TallyHandle {
        let mut actor =
            runtime.new_actor_with_name::<TallyActorState>(format!("Tally:{}", name));

        configure_tally_actor(&mut actor);

        TallyHandle {
            handle: actor.start().await,
        }
    }
}

/// Configure message handlers for the tally actor.
fn configure_tally_actor(actor: &mut ManagedActor<Idle, TallyActorState>) {
    // Increment - mutate_on because we modify the tally
    actor.mutate_on::<Increment>(|actor, context| {
        let msg = context.message().clone();
        let snapshot = actor.model.tally.increment();

        debug!(count = snapshot.count, "increment applied");
        msg.done.complete(snapshot);
        Reply::ready()
    });

    // Decrement - clamps at zero and reports the underflow instead of failing
    actor.mutate_on::<Decrement>(|actor, context| {
        let msg = context.message().clone();
        let (outcome, snapshot) = actor.model.tally.decrement();

        if outcome == DecrementOutcome::Underflow {
            warn!(
                underflows = snapshot.underflows,
                "decrement requested with no active participants"
            );
            let broker = actor.broker().clone();
            let report = UnderflowReported {
                count: snapshot.count,
                underflows: snapshot.underflows,
            };
            msg.done.complete(snapshot);
            return Reply::pending(async move {
                broker.broadcast(report).await;
            });
        }

        debug!(count = snapshot.count, "decrement applied");
        msg.done.complete(snapshot);
        Reply::ready()
    });

    // QueryTally - read-only, but still admitted through the mailbox so a
    // snapshot never interleaves with a mutation
    actor.act_on::<QueryTally>(|actor, context| {
        let msg = context.message();
        msg.reply.complete(actor.model.tally.snapshot());
        Reply::ready()
    });
}

/// Cloneable, typed handle to a spawned tally actor.
///
/// Each operation suspends the calling task - it never blocks the thread -
/// until that specific request has been admitted and applied, then resolves
/// with the post-mutation snapshot. A caller that awaits each call before
/// issuing the next observes its requests applied in issue order; across
/// unrelated callers only mutual exclusion is promised.
#[derive(Clone)]
pub struct TallyHandle {
    handle: ActorHandle,
}

impl std::fmt::Debug for TallyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TallyHandle")
            .field("actor", &"<handle>")
            .finish()
    }
}

impl TallyHandle {
    /// Raise the count by one. Resolves once the mutation has been applied.
    pub async fn increment(&self) -> Result<TallySnapshot> {
        let (done, rx) = CompletionSlot::new();
        self.handle.send(Increment { done }).await;
        rx.await
            .context("tally actor gone before increment was acknowledged")
    }

    /// Lower the count by one, saturating at zero. Resolves once applied
    /// (or once the underflow has been recorded).
    pub async fn decrement(&self) -> Result<TallySnapshot> {
        let (done, rx) = CompletionSlot::new();
        self.handle.send(Decrement { done }).await;
        rx.await
            .context("tally actor gone before decrement was acknowledged")
    }

    /// Enqueue an increment without waiting for it to be applied.
    ///
    /// The request is still serialized and guaranteed to apply before any
    /// later request from this handle.
    pub async fn enqueue_increment(&self) {
        self.handle
            .send(Increment {
                done: CompletionSlot::detached(),
            })
            .await;
    }

    /// Enqueue a decrement without waiting for it to be applied.
    pub async fn enqueue_decrement(&self) {
        self.handle
            .send(Decrement {
                done: CompletionSlot::detached(),
            })
            .await;
    }

    /// Snapshot the tally through the same serialization point as mutations.
    pub async fn snapshot(&self) -> Result<TallySnapshot> {
        let (reply, rx) = CompletionSlot::new();
        self.handle.send(QueryTally { reply }).await;
        rx.await
            .context("tally actor gone before snapshot was produced")
    }
}
