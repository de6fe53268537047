use std::future::Future;

use super::{filter, make_record, CaseOutcome};
use crate::{AgentStorage, StorageError};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseOutcome::new(
            "query",
            "find_records_exact_match",
            find_records_exact_match(factory).await,
        ),
        CaseOutcome::new(
            "query",
            "find_records_scoped_to_type",
            find_records_scoped_to_type(factory).await,
        ),
        CaseOutcome::new(
            "query",
            "find_one_zero_one_many",
            find_one_zero_one_many(factory).await,
        ),
        CaseOutcome::new(
            "query",
            "find_records_sees_updated_tags",
            find_records_sees_updated_tags(factory).await,
        ),
    ]
}

async fn find_records_exact_match<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (id, conn, state) in [
        ("a", "c1", "active"),
        ("b", "c1", "full"),
        ("c", "c2", "active"),
    ] {
        s.add_record(make_record(
            "registry",
            id,
            &[("connection_id", conn), ("state", state)],
        ))
        .await
        .map_err(|e| format!("add {id}: {e}"))?;
    }

    let found = s
        .find_records("registry", &filter(&[("state", "active")]))
        .await
        .map_err(|e| format!("find: {e}"))?;
    let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
    if ids != ["a", "c"] {
        return Err(format!("expected [a, c], got {ids:?}"));
    }

    let found = s
        .find_records(
            "registry",
            &filter(&[("state", "active"), ("connection_id", "c1")]),
        )
        .await
        .map_err(|e| format!("find: {e}"))?;
    if found.len() != 1 || found[0].id != "a" {
        return Err(format!("expected only a, got {found:?}"));
    }
    Ok(())
}

async fn find_records_scoped_to_type<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "x", &[("state", "active")]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    let found = s
        .find_records("registry", &filter(&[]))
        .await
        .map_err(|e| format!("find: {e}"))?;
    if !found.is_empty() {
        return Err(format!("expected no registry records, got {found:?}"));
    }
    Ok(())
}

async fn find_one_zero_one_many<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let by_thread = filter(&[("thread_id", "t1")]);

    match s.find_one("exchange", &by_thread).await {
        Err(StorageError::NoMatch { .. }) => {}
        other => return Err(format!("expected NoMatch on empty store, got {other:?}")),
    }

    s.add_record(make_record("exchange", "x1", &[("thread_id", "t1")]))
        .await
        .map_err(|e| format!("add x1: {e}"))?;
    let one = s
        .find_one("exchange", &by_thread)
        .await
        .map_err(|e| format!("find_one: {e}"))?;
    if one.id != "x1" {
        return Err(format!("expected x1, got {}", one.id));
    }

    s.add_record(make_record("exchange", "x2", &[("thread_id", "t1")]))
        .await
        .map_err(|e| format!("add x2: {e}"))?;
    match s.find_one("exchange", &by_thread).await {
        Err(StorageError::DuplicateMatch { count: 2, .. }) => Ok(()),
        other => Err(format!("expected DuplicateMatch(2), got {other:?}")),
    }
}

async fn find_records_sees_updated_tags<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("registry", "r1", &[("state", "active")]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    s.update_record(make_record("registry", "r1", &[("state", "full")]), 0)
        .await
        .map_err(|e| format!("update: {e}"))?;

    let active = s
        .find_records("registry", &filter(&[("state", "active")]))
        .await
        .map_err(|e| format!("find active: {e}"))?;
    if !active.is_empty() {
        return Err("stale tag still matched after update".to_string());
    }
    let full = s
        .find_records("registry", &filter(&[("state", "full")]))
        .await
        .map_err(|e| format!("find full: {e}"))?;
    if full.len() != 1 {
        return Err(format!("expected 1 full record, got {}", full.len()));
    }
    Ok(())
}
