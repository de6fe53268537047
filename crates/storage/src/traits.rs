use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{describe_filter, StorageRecord, TagFilter};

/// The storage trait for agent record backends.
///
/// An `AgentStorage` implementation provides durable storage for opaque,
/// tagged records keyed by `(record_type, id)`. The agent never relies on
/// uniqueness constraints beyond the primary key; everything else is
/// enforced by querying tags.
///
/// ## OCC Conflict Detection
///
/// `update_record` performs an optimistic concurrency check:
/// the write is applied only if the stored version equals
/// `expected_version`. Otherwise it returns
/// `Err(StorageError::ConcurrentConflict { ... })` and leaves the stored
/// record untouched.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// behind an `Arc` across async tasks.
#[async_trait]
pub trait AgentStorage: Send + Sync + 'static {
    /// Insert a new record at version 0.
    ///
    /// Returns `Err(StorageError::Duplicate)` if `(record_type, id)` exists.
    async fn add_record(&self, record: StorageRecord) -> Result<(), StorageError>;

    /// Read a record by primary key.
    ///
    /// Returns `Err(StorageError::NotFound)` if it does not exist.
    async fn get_record(&self, record_type: &str, id: &str) -> Result<StorageRecord, StorageError>;

    /// Replace a record's value and tags if its stored version is
    /// `expected_version`.
    ///
    /// Returns the new version number on success.
    async fn update_record(
        &self,
        record: StorageRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    /// Delete a record by primary key.
    ///
    /// Returns `Err(StorageError::NotFound)` if it does not exist.
    async fn delete_record(&self, record_type: &str, id: &str) -> Result<(), StorageError>;

    /// All records of `record_type` whose tags match `filter` exactly,
    /// ordered by id.
    async fn find_records(
        &self,
        record_type: &str,
        filter: &TagFilter,
    ) -> Result<Vec<StorageRecord>, StorageError>;

    /// The single record of `record_type` matching `filter`.
    ///
    /// Returns `Err(StorageError::NoMatch)` on zero matches and
    /// `Err(StorageError::DuplicateMatch)` on more than one.
    async fn find_one(
        &self,
        record_type: &str,
        filter: &TagFilter,
    ) -> Result<StorageRecord, StorageError> {
        let mut found = self.find_records(record_type, filter).await?;
        match found.len() {
            0 => Err(StorageError::NoMatch {
                record_type: record_type.to_string(),
                filter: describe_filter(filter),
            }),
            1 => Ok(found.remove(0)),
            count => Err(StorageError::DuplicateMatch {
                record_type: record_type.to_string(),
                filter: describe_filter(filter),
                count,
            }),
        }
    }
}
