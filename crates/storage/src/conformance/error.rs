use std::future::Future;

use super::{make_record, CaseOutcome};
use crate::{AgentStorage, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseOutcome::new(
            "error",
            "get_nonexistent_not_found",
            get_nonexistent_not_found(factory).await,
        ),
        CaseOutcome::new(
            "error",
            "update_nonexistent_not_found",
            update_nonexistent_not_found(factory).await,
        ),
        CaseOutcome::new(
            "error",
            "delete_nonexistent_not_found",
            delete_nonexistent_not_found(factory).await,
        ),
        CaseOutcome::new(
            "error",
            "delete_then_get_not_found",
            delete_then_get_not_found(factory).await,
        ),
    ]
}

// ── get on empty store returns NotFound with the right fields ───────────────

async fn get_nonexistent_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_record("exchange", "missing").await {
        Err(StorageError::NotFound { record_type, id }) => {
            if record_type == "exchange" && id == "missing" {
                Ok(())
            } else {
                Err(format!("wrong fields on NotFound: {record_type}/{id}"))
            }
        }
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}

async fn update_nonexistent_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s
        .update_record(make_record("exchange", "missing", &[]), 0)
        .await
    {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}

async fn delete_nonexistent_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.delete_record("exchange", "missing").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {other:?}")),
    }
}

async fn delete_then_get_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("add: {e}"))?;
    s.delete_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("delete: {e}"))?;
    match s.get_record("exchange", "ex-1").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound after delete, got {other:?}")),
    }
}
