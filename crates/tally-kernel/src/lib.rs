//! Tally kernel: actor-isolated counting of active participants.
//!
//! A single actor owns a non-negative count; every mutation funnels through
//! its mailbox, one message at a time, so concurrent callers never need locks
//! of their own. Callers hold a [`TallyHandle`] whose async operations
//! suspend - without blocking the calling thread - until their request has
//! been applied.
//!
//! Decrementing at zero is deliberate saturating policy, not an error: the
//! count stays at zero and the attempt is recorded, surfacing both in the
//! snapshot's underflow tally and as an [`UnderflowReported`] broadcast.

pub mod actors;
pub mod messages;
pub mod tally;

pub use actors::{TallyActor, TallyActorState, TallyHandle};
pub use tally::{DecrementOutcome, Tally, TallySnapshot};
pub use messages::{CompletionSlot, Decrement, Increment, QueryTally, UnderflowReported};
