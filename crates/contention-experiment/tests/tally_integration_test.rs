//! Integration tests for the tally kernel under real concurrency.
//!
//! Covers the observable contract end to end:
//! - No lost updates under concurrent increments (mutual exclusion)
//! - The reference interleave (3 increments, 3 decrements, all concurrent)
//! - Underflow diagnostics delivered exactly once per clamped decrement
//! - Snapshot reads that never observe half-applied state

use std::sync::Arc;

use acton_reactive::prelude::*;
use tokio::sync::RwLock;
use tokio::time::Duration;

use tally_kernel::{TallyActor, UnderflowReported};

/// State for a probe actor recording underflow broadcasts.
#[derive(Default, Clone)]
struct UnderflowProbeState {
    seen: Arc<RwLock<Vec<UnderflowReported>>>,
}

impl std::fmt::Debug for UnderflowProbeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnderflowProbeState").finish()
    }
}

/// Spawn a probe that records every `UnderflowReported` broadcast.
async fn spawn_underflow_probe(
    runtime: &mut ActorRuntime,
    seen: Arc<RwLock<Vec<UnderflowReported>>>,
) {
    let mut actor =
        runtime.new_actor_with_name::<UnderflowProbeState>("UnderflowProbe".to_string());
    actor.model.seen = seen;

    // Subscribe to broadcasts BEFORE starting
    actor.handle().subscribe::<UnderflowReported>().await;

    actor.act_on::<UnderflowReported>(|actor, context| {
        let report = context.message().clone();
        let seen = actor.model.seen.clone();

        Reply::pending(async move {
            seen.write().await.push(report);
        })
    });

    actor.start().await;
}

#[tokio::test]
async fn test_concurrent_increments_lose_no_updates() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "no-lost-updates").await;

    let mut callers = Vec::new();
    for _ in 0..8 {
        let tally = tally.clone();
        callers.push(tokio::spawn(async move {
            for _ in 0..25 {
                tally.increment().await.unwrap();
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    let snapshot = tally.snapshot().await.unwrap();
    assert_eq!(snapshot.count, 200, "a lost update would leave fewer");
    assert_eq!(snapshot.underflows, 0);

    let _ = runtime.shutdown_all().await;
}

#[tokio::test]
async fn test_reference_interleave_conserves() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "reference").await;

    // 3 increments and 3 decrements issued concurrently from independent
    // tasks, matching the reference demo. Admission order is up to the
    // mailbox; the conservation identity must hold for every outcome.
    let mut tasks = Vec::new();
    for i in 0..6 {
        let tally = tally.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                tally.increment().await.unwrap();
            } else {
                tally.decrement().await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = tally.snapshot().await.unwrap();
    // Each clamped decrement leaves one unmatched increment behind:
    // count = 3 - (3 - underflows)
    assert_eq!(snapshot.count, snapshot.underflows);

    let _ = runtime.shutdown_all().await;
}

#[tokio::test]
async fn test_underflow_diagnostic_recorded_exactly_once() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "underflow").await;

    let seen = Arc::new(RwLock::new(Vec::new()));
    spawn_underflow_probe(&mut runtime, seen.clone()).await;

    let snapshot = tally.decrement().await.unwrap();
    assert_eq!(snapshot.count, 0);
    assert_eq!(snapshot.underflows, 1);

    // Give the broker time to deliver the broadcast
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reports = seen.read().await;
    assert_eq!(reports.len(), 1, "expected exactly one underflow report");
    assert_eq!(reports[0].count, 0);
    assert_eq!(reports[0].underflows, 1);

    let _ = runtime.shutdown_all().await;
}

#[tokio::test]
async fn test_successful_decrements_report_nothing() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "quiet").await;

    let seen = Arc::new(RwLock::new(Vec::new()));
    spawn_underflow_probe(&mut runtime, seen.clone()).await;

    tally.increment().await.unwrap();
    tally.increment().await.unwrap();
    tally.decrement().await.unwrap();
    tally.decrement().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(seen.read().await.is_empty());
    assert_eq!(tally.snapshot().await.unwrap().count, 0);

    let _ = runtime.shutdown_all().await;
}

#[tokio::test]
async fn test_snapshots_never_regress_under_increment_only_load() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "monotonic").await;

    let mut callers = Vec::new();
    for _ in 0..4 {
        let tally = tally.clone();
        callers.push(tokio::spawn(async move {
            for _ in 0..25 {
                tally.increment().await.unwrap();
            }
        }));
    }

    // With only increments in flight, successive snapshots from one reader
    // must be non-decreasing and within bounds - a torn read would break
    // either property.
    let mut last = 0u64;
    for _ in 0..50 {
        let snapshot = tally.snapshot().await.unwrap();
        assert!(snapshot.count >= last, "snapshot regressed");
        assert!(snapshot.count <= 100);
        last = snapshot.count;
    }

    for caller in callers {
        caller.await.unwrap();
    }
    assert_eq!(tally.snapshot().await.unwrap().count, 100);

    let _ = runtime.shutdown_all().await;
}

#[tokio::test]
async fn test_mixed_contention_conserves_and_stays_non_negative() {
    let mut runtime = ActonApp::launch_async().await;
    let tally = TallyActor::spawn(&mut runtime, "mixed").await;

    // Each caller alternates increment then decrement, so its decrement can
    // only land after its own increment: the run must end at exactly zero.
    let mut callers = Vec::new();
    for _ in 0..6 {
        let tally = tally.clone();
        callers.push(tokio::spawn(async move {
            for _ in 0..20 {
                tally.increment().await.unwrap();
                let snapshot = tally.decrement().await.unwrap();
                assert_eq!(snapshot.underflows, 0);
            }
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    let snapshot = tally.snapshot().await.unwrap();
    assert_eq!(snapshot.count, 0);
    assert_eq!(snapshot.underflows, 0);

    let _ = runtime.shutdown_all().await;
}
