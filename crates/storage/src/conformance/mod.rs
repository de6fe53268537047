//! Conformance test suite for `AgentStorage` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `AgentStorage` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Add**: record creation at version 0, duplicate detection
//! - **Query**: exact-match tag filtering, single-record lookups
//! - **Version validation / OCC**: compare-and-swap conflict detection
//! - **Concurrency**: racing updates where exactly one writer wins
//! - **Error handling**: correct error variants for missing records
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use aries_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_sqlite_storage().await
//!     }).await;
//!     assert_eq!(report.failed(), 0, "{report}");
//! }
//! ```

mod add;
mod concurrent;
mod error;
mod query;
mod version;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use crate::record::StorageRecord;
use crate::AgentStorage;

/// Outcome of one conformance case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Group the case belongs to: "add", "query", "version", "concurrent"
    /// or "error".
    pub category: &'static str,
    pub name: &'static str,
    /// Why the case failed; `None` when it passed.
    pub error: Option<String>,
}

impl CaseOutcome {
    fn new(category: &'static str, name: &'static str, result: Result<(), String>) -> Self {
        CaseOutcome {
            category,
            name,
            error: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl ConformanceReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "storage conformance: {} of {} cases passed",
            self.passed(),
            self.outcomes.len()
        )?;
        for outcome in self.failures() {
            let reason = outcome.error.as_deref().unwrap_or_default();
            writeln!(f, "  {}::{} failed: {}", outcome.category, outcome.name, reason)?;
        }
        Ok(())
    }
}

/// Run every case against storage built by `factory`. Each case gets its
/// own fresh instance.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: AgentStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut report = ConformanceReport::default();
    report.outcomes.extend(add::run_add_tests(&factory).await);
    report.outcomes.extend(error::run_error_tests(&factory).await);
    report.outcomes.extend(query::run_query_tests(&factory).await);
    report.outcomes.extend(version::run_version_tests(&factory).await);
    report.outcomes.extend(concurrent::run_concurrent_tests(&factory).await);
    report
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_record(record_type: &str, id: &str, tags: &[(&str, &str)]) -> StorageRecord {
    let tags: BTreeMap<String, String> = tags
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    StorageRecord::new(
        record_type,
        id,
        serde_json::json!({ "id": id }).to_string(),
        tags,
    )
}

fn filter(pairs: &[(&str, &str)]) -> crate::TagFilter {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
