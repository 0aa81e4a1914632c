//! Contention driver: many concurrent callers against one tally actor.
//!
//! The runner spawns the tally actor, an observer that forwards underflow
//! broadcasts out of the actor system, and one tokio task per caller. Caller
//! schedules are built up front from the workload (seeded, so storm runs are
//! reproducible), then everything is joined and the conservation identity is
//! checked against the final snapshot.

use acton_reactive::prelude::*;
use anyhow::{ensure, Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info};

use tally_kernel::{TallyActor, TallyHandle, UnderflowReported};

use crate::results::{CallerStats, ContentionResult};

/// One operation in a caller's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Increment,
    Decrement,
}

/// Workload shapes the harness can drive.
#[derive(Debug, Clone)]
pub enum Workload {
    /// Every caller alternates increment, decrement - `pairs` of each.
    /// Each decrement follows that caller's own increment, so the run ends
    /// at exactly zero with no underflows.
    Matched { pairs: usize },
    /// Every caller issues `ops` operations, each independently a decrement
    /// with probability `decrement_bias`. Underflows are expected here.
    Storm { ops: usize, decrement_bias: f64 },
    /// A single caller issues increment, increment, decrement and verifies
    /// the deterministic snapshot sequence 1, 2, 1.
    Sequential,
}

impl Workload {
    /// Short name for logs and run records.
    pub fn name(&self) -> &'static str {
        match self {
            Workload::Matched { .. } => "matched",
            Workload::Storm { .. } => "storm",
            Workload::Sequential => "sequential",
        }
    }
}

/// Configuration for a contention run.
#[derive(Debug, Clone)]
pub struct ContentionConfig {
    /// The workload to drive
    pub workload: Workload,
    /// Number of concurrent callers (sequential runs always use one)
    pub callers: usize,
    /// RNG seed for reproducible storm schedules
    pub seed: u64,
}

impl Default for ContentionConfig {
    fn default() -> Self {
        Self {
            workload: Workload::Matched { pairs: 3 },
            callers: 3,
            seed: 42,
        }
    }
}

/// Runs workloads against a freshly spawned tally actor.
pub struct ContentionRunner {
    config: ContentionConfig,
}

impl ContentionRunner {
    /// Create a runner for the given configuration.
    pub fn new(config: ContentionConfig) -> Self {
        Self { config }
    }

    /// Run the configured workload to completion and return the audit record.
    pub async fn run(&self) -> Result<ContentionResult> {
        let started_at = Utc::now();

        let mut runtime = ActonApp::launch_async().await;
        let tally = TallyActor::spawn(&mut runtime, "contention").await;

        // Forward UnderflowReported broadcasts to a channel the harness can
        // drain after the callers finish.
        let (underflow_tx, mut underflow_rx) = mpsc::channel::<UnderflowReported>(1024);
        spawn_underflow_observer(&mut runtime, underflow_tx).await;

        let caller_stats = match &self.config.workload {
            Workload::Sequential => vec![run_sequential_caller(&tally).await?],
            _ => {
                let schedules = self.build_schedules();
                run_concurrent_callers(&tally, schedules).await?
            }
        };

        let final_snapshot = tally.snapshot().await?;

        // Underflow broadcasts ride on the broker; give in-flight ones a
        // moment to land before draining.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut observed_underflows = 0u64;
        while underflow_rx.try_recv().is_ok() {
            observed_underflows += 1;
        }

        let _ = runtime.shutdown_all().await;

        let issued_increments: u64 = caller_stats.iter().map(|s| s.increments).sum();
        let issued_decrements: u64 = caller_stats.iter().map(|s| s.decrements).sum();

        // Every decrement either applied or was clamped, so this never wraps.
        let expected_count = issued_increments + final_snapshot.underflows - issued_decrements;
        let conserved = final_snapshot.count == expected_count;

        info!(
            workload = self.config.workload.name(),
            callers = caller_stats.len(),
            issued_increments,
            issued_decrements,
            underflows = final_snapshot.underflows,
            final_count = final_snapshot.count,
            conserved,
            "contention run complete"
        );

        Ok(ContentionResult {
            workload: self.config.workload.name().to_string(),
            callers: caller_stats.len(),
            seed: self.config.seed,
            started_at,
            ended_at: Utc::now(),
            issued_increments,
            issued_decrements,
            observed_underflows,
            final_snapshot,
            expected_count,
            conserved,
            caller_stats,
        })
    }

    /// Build one operation schedule per caller.
    fn build_schedules(&self) -> Vec<Vec<Op>> {
        match self.config.workload {
            Workload::Matched { pairs } => {
                let schedule: Vec<Op> = std::iter::repeat([Op::Increment, Op::Decrement])
                    .take(pairs)
                    .flatten()
                    .collect();
                vec![schedule; self.config.callers.max(1)]
            }
            Workload::Storm {
                ops,
                decrement_bias,
            } => {
                let bias = decrement_bias.clamp(0.0, 1.0);
                (0..self.config.callers.max(1))
                    .map(|caller| {
                        let mut rng =
                            StdRng::seed_from_u64(self.config.seed.wrapping_add(caller as u64));
                        (0..ops)
                            .map(|_| {
                                if rng.gen_bool(bias) {
                                    Op::Decrement
                                } else {
                                    Op::Increment
                                }
                            })
                            .collect()
                    })
                    .collect()
            }
            Workload::Sequential => vec![vec![Op::Increment, Op::Increment, Op::Decrement]],
        }
    }
}

/// Spawn one tokio task per caller and join them all.
async fn run_concurrent_callers(
    tally: &TallyHandle,
    schedules: Vec<Vec<Op>>,
) -> Result<Vec<CallerStats>> {
    let mut handles = Vec::with_capacity(schedules.len());
    for (caller, schedule) in schedules.into_iter().enumerate() {
        let tally = tally.clone();
        handles.push(tokio::spawn(async move {
            let mut stats = CallerStats {
                caller,
                increments: 0,
                decrements: 0,
            };
            for op in schedule {
                match op {
                    Op::Increment => {
                        tally.increment().await?;
                        stats.increments += 1;
                    }
                    Op::Decrement => {
                        tally.decrement().await?;
                        stats.decrements += 1;
                    }
                }
            }
            debug!(
                caller,
                increments = stats.increments,
                decrements = stats.decrements,
                "caller finished"
            );
            Ok::<CallerStats, anyhow::Error>(stats)
        }));
    }

    let mut caller_stats = Vec::with_capacity(handles.len());
    for handle in handles {
        caller_stats.push(handle.await.context("caller task panicked")??);
    }
    Ok(caller_stats)
}

/// Single caller awaiting each request before issuing the next: the applied
/// order must match issue order, so the snapshots are deterministic.
async fn run_sequential_caller(tally: &TallyHandle) -> Result<CallerStats> {
    let s1 = tally.increment().await?;
    let s2 = tally.increment().await?;
    let s3 = tally.decrement().await?;

    let counts = [s1.count, s2.count, s3.count];
    ensure!(
        counts == [1, 2, 1],
        "sequential snapshots out of order: {:?}",
        counts
    );

    Ok(CallerStats {
        caller: 0,
        increments: 2,
        decrements: 1,
    })
}

/// State for the underflow observer actor.
#[derive(Default, Clone)]
struct UnderflowObserverState {
    /// Channel sender for forwarding underflow reports
    tx: Option<mpsc::Sender<UnderflowReported>>,
}

impl std::fmt::Debug for UnderflowObserverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnderflowObserverState")
            .field("has_tx", &self.tx.is_some())
            .finish()
    }
}

/// Spawn an actor that forwards `UnderflowReported` broadcasts to a channel.
async fn spawn_underflow_observer(
    runtime: &mut ActorRuntime,
    tx: mpsc::Sender<UnderflowReported>,
) {
    let mut actor =
        runtime.new_actor_with_name::<UnderflowObserverState>("UnderflowObserver".to_string());

    actor.model.tx = Some(tx);

    // Subscribe to broadcasts BEFORE starting
    actor.handle().subscribe::<UnderflowReported>().await;

    actor.act_on::<UnderflowReported>(|actor, context| {
        let report = context.message().clone();
        let tx = actor.model.tx.clone();

        Reply::pending(async move {
            if let Some(tx) = tx {
                // Ignore send errors - the harness may already be draining
                let _ = tx.send(report).await;
            }
        })
    });

    actor.start().await;
}
