//! Acton-reactive actors for the tally kernel.
//!
//! A single actor owns the count; its mailbox is the serialization point:
//!
//! ```text
//! Increment / Decrement / QueryTally → TallyActor (one at a time)
//!   ├─ mutation applied to the owned Tally
//!   ├─ CompletionSlot fired with the post-mutation snapshot
//!   └─ UnderflowReported (broadcast) when a decrement clamps at zero
//! ```
//!
//! The mailbox provides natural conflict resolution - two requests issued
//! concurrently from unrelated tasks are never both mid-mutation, and a
//! request already admitted always runs to completion.

mod tally_actor;

pub use tally_actor::{TallyActor, TallyActorState, TallyHandle};
