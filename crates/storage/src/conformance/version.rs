use std::future::Future;

use super::{make_record, CaseOutcome};
use crate::{AgentStorage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Correct version succeeds
    results.push(CaseOutcome::new(
        "version",
        "update_returns_incremented_version",
        update_returns_incremented_version(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "version_increments_sequentially",
        version_increments_sequentially(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "update_replaces_value_and_tags",
        update_replaces_value_and_tags(factory).await,
    ));

    // Wrong version fails
    results.push(CaseOutcome::new(
        "version",
        "stale_version_returns_conflict",
        stale_version_returns_conflict(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "future_version_returns_conflict",
        future_version_returns_conflict(factory).await,
    ));
    results.push(CaseOutcome::new(
        "version",
        "conflict_leaves_record_unchanged",
        conflict_leaves_record_unchanged(factory).await,
    ));

    results
}

async fn update_returns_incremented_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    let v = s
        .update_record(make_record("exchange", "ex-1", &[]), 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    if v != 1 {
        return Err(format!("expected new version 1, got {v}"));
    }
    let stored = s
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 1 {
        return Err(format!("stored version is {}, expected 1", stored.version));
    }
    Ok(())
}

async fn version_increments_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    for expected in 0..5 {
        let v = s
            .update_record(make_record("exchange", "ex-1", &[]), expected)
            .await
            .map_err(|e| format!("update at {expected}: {e}"))?;
        if v != expected + 1 {
            return Err(format!("expected {}, got {v}", expected + 1));
        }
    }
    Ok(())
}

async fn update_replaces_value_and_tags<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[("state", "offer_sent")]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    let mut next = make_record("exchange", "ex-1", &[("state", "request_received")]);
    next.value = r#"{"state":"request_received"}"#.to_string();
    s.update_record(next.clone(), 0)
        .await
        .map_err(|e| format!("update: {e}"))?;
    let stored = s
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.value != next.value {
        return Err(format!("value not replaced: {}", stored.value));
    }
    if stored.tags.get("state").map(String::as_str) != Some("request_received") {
        return Err(format!("tags not replaced: {:?}", stored.tags));
    }
    Ok(())
}

async fn stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    s.update_record(make_record("exchange", "ex-1", &[]), 0)
        .await
        .map_err(|e| format!("first update: {e}"))?;
    match s.update_record(make_record("exchange", "ex-1", &[]), 0).await {
        Err(StorageError::ConcurrentConflict {
            record_type,
            id,
            expected_version,
        }) => {
            if record_type != "exchange" || id != "ex-1" || expected_version != 0 {
                return Err(format!(
                    "wrong fields on conflict: {record_type}/{id} v{expected_version}"
                ));
            }
            Ok(())
        }
        other => Err(format!("expected ConcurrentConflict, got {other:?}")),
    }
}

async fn future_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    match s.update_record(make_record("exchange", "ex-1", &[]), 7).await {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        other => Err(format!("expected ConcurrentConflict, got {other:?}")),
    }
}

async fn conflict_leaves_record_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[("state", "offer_sent")]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    let _ = s
        .update_record(make_record("exchange", "ex-1", &[("state", "abandoned")]), 3)
        .await;
    let stored = s
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 0 {
        return Err(format!("version moved to {}", stored.version));
    }
    if stored.tags.get("state").map(String::as_str) != Some("offer_sent") {
        return Err(format!("tags changed on conflict: {:?}", stored.tags));
    }
    Ok(())
}
