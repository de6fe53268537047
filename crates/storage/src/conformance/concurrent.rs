use std::future::Future;
use std::sync::Arc;

use super::{make_record, CaseOutcome};
use crate::{AgentStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_updates_exactly_one_wins",
        concurrent_updates_exactly_one_wins(factory).await,
    ));
    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_adds_exactly_one_wins",
        concurrent_adds_exactly_one_wins(factory).await,
    ));
    results.push(CaseOutcome::new(
        "concurrent",
        "concurrent_updates_different_records_all_succeed",
        concurrent_updates_different_records_all_succeed(factory).await,
    ));

    results
}

// ── Concurrent update: exactly one wins ─────────────────────────────────────

/// N tasks race to update the same record from version 0. Exactly one
/// succeeds; the rest must get ConcurrentConflict.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .add_record(make_record("exchange", "ex-1", &[("state", "offer_sent")]))
        .await
        .map_err(|e| format!("add: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            let state = format!("writer-{i}");
            s.update_record(make_record("exchange", "ex-1", &[("state", &state)]), 0)
                .await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.map_err(|e| format!("join: {e}"))? {
            Ok(1) => wins += 1,
            Ok(v) => return Err(format!("winner reported version {v}, expected 1")),
            Err(StorageError::ConcurrentConflict { .. }) => conflicts += 1,
            Err(e) => return Err(format!("unexpected error: {e}")),
        }
    }
    if wins != 1 || conflicts != N - 1 {
        return Err(format!(
            "expected 1 win and {} conflicts, got {wins} wins and {conflicts} conflicts",
            N - 1
        ));
    }

    let stored = storage
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 1 {
        return Err(format!("final version {}, expected 1", stored.version));
    }
    Ok(())
}

// ── Concurrent add: exactly one wins ────────────────────────────────────────

async fn concurrent_adds_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.add_record(make_record("registry", "rr-1", &[])).await
        }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.map_err(|e| format!("join: {e}"))? {
            Ok(()) => wins += 1,
            Err(StorageError::Duplicate { .. }) => {}
            Err(e) => return Err(format!("unexpected error: {e}")),
        }
    }
    if wins != 1 {
        return Err(format!("expected exactly 1 add to win, got {wins}"));
    }
    Ok(())
}

// ── Different records never conflict ────────────────────────────────────────

async fn concurrent_updates_different_records_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    for i in 0..N {
        storage
            .add_record(make_record("exchange", &format!("ex-{i}"), &[]))
            .await
            .map_err(|e| format!("add ex-{i}: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.update_record(make_record("exchange", &format!("ex-{i}"), &[]), 0)
                .await
        }));
    }
    for h in handles {
        h.await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("update: {e}"))?;
    }
    Ok(())
}
