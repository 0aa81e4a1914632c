//! Run records for contention experiments.
//!
//! Captures what was issued, what the tally observed, and whether the
//! conservation identity held, in a JSON-serializable form.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_kernel::TallySnapshot;

/// Per-caller operation counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerStats {
    /// Caller index within the run
    pub caller: usize,
    /// Increments this caller issued and saw acknowledged
    pub increments: u64,
    /// Decrements this caller issued and saw acknowledged
    pub decrements: u64,
}

/// Record of a single contention run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentionResult {
    /// Workload name ("matched", "storm", "sequential")
    pub workload: String,
    /// Number of concurrent callers
    pub callers: usize,
    /// Seed used for schedule generation
    pub seed: u64,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Total increments issued across callers
    pub issued_increments: u64,
    /// Total decrements issued across callers
    pub issued_decrements: u64,
    /// Underflow broadcasts seen by the observer during the run.
    /// The snapshot's own counter is authoritative; this records what the
    /// broker delivered.
    pub observed_underflows: u64,
    /// Final state of the tally
    pub final_snapshot: TallySnapshot,
    /// increments - (decrements - clamped underflows)
    pub expected_count: u64,
    /// Whether the final count matched `expected_count`
    pub conserved: bool,
    /// Per-caller breakdown
    pub caller_stats: Vec<CallerStats>,
}

impl ContentionResult {
    /// Write the record as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("writing run record to {}", path.display()))?;
        Ok(())
    }
}
