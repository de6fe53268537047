use std::future::Future;

use super::{make_record, CaseOutcome};
use crate::{AgentStorage, StorageError};

pub(super) async fn run_add_tests<S, F, Fut>(factory: &F) -> Vec<CaseOutcome>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        CaseOutcome::new(
            "add",
            "add_creates_record_at_version_0",
            add_creates_record_at_version_0(factory).await,
        ),
        CaseOutcome::new(
            "add",
            "add_ignores_caller_supplied_version",
            add_ignores_caller_supplied_version(factory).await,
        ),
        CaseOutcome::new(
            "add",
            "add_duplicate_rejected",
            add_duplicate_rejected(factory).await,
        ),
        CaseOutcome::new(
            "add",
            "same_id_different_type_allowed",
            same_id_different_type_allowed(factory).await,
        ),
    ]
}

async fn add_creates_record_at_version_0<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = make_record("exchange", "ex-1", &[("state", "offer_sent")]);
    s.add_record(record.clone())
        .await
        .map_err(|e| format!("add: {e}"))?;
    let stored = s
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 0 {
        return Err(format!("expected version 0, got {}", stored.version));
    }
    if stored.value != record.value || stored.tags != record.tags {
        return Err(format!("stored record differs: {stored:?}"));
    }
    Ok(())
}

async fn add_ignores_caller_supplied_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut record = make_record("exchange", "ex-1", &[]);
    record.version = 42;
    s.add_record(record).await.map_err(|e| format!("add: {e}"))?;
    let stored = s
        .get_record("exchange", "ex-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.version != 0 {
        return Err(format!("expected version 0, got {}", stored.version));
    }
    Ok(())
}

async fn add_duplicate_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "ex-1", &[]))
        .await
        .map_err(|e| format!("first add: {e}"))?;
    match s.add_record(make_record("exchange", "ex-1", &[])).await {
        Err(StorageError::Duplicate { record_type, id }) => {
            if record_type != "exchange" || id != "ex-1" {
                return Err(format!("wrong fields on Duplicate: {record_type}/{id}"));
            }
            Ok(())
        }
        other => Err(format!("expected Duplicate, got {other:?}")),
    }
}

async fn same_id_different_type_allowed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.add_record(make_record("exchange", "shared", &[]))
        .await
        .map_err(|e| format!("add exchange: {e}"))?;
    s.add_record(make_record("registry", "shared", &[]))
        .await
        .map_err(|e| format!("add registry: {e}"))?;
    Ok(())
}
