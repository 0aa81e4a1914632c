//! Contention experiment: concurrent-caller workloads for the tally kernel.
//!
//! Drives a single tally actor from many independent tokio tasks and checks
//! the conservation identity at the end of every run:
//!
//! ```text
//! final count = increments issued - (decrements issued - clamped underflows)
//! ```
//!
//! Mailbox serialization makes the identity hold under any interleaving; a
//! lost update would show up here as a conservation failure.

pub mod driver;
pub mod results;

pub use driver::{ContentionConfig, ContentionRunner, Workload};
pub use results::{CallerStats, ContentionResult};
