/// All errors that can be returned by an AgentStorage implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict: another task updated the
    /// record after it was read. The expected version was not found.
    #[error("concurrent conflict on record {record_type}/{id}: expected version {expected_version}")]
    ConcurrentConflict {
        record_type: String,
        id: String,
        expected_version: i64,
    },

    /// No record with the given (record_type, id).
    #[error("record not found: {record_type}/{id}")]
    NotFound { record_type: String, id: String },

    /// No record of the given type matched a tag filter.
    #[error("no {record_type} record matches tag filter {filter}")]
    NoMatch { record_type: String, filter: String },

    /// A record with this (record_type, id) already exists.
    #[error("duplicate record: {record_type}/{id}")]
    Duplicate { record_type: String, id: String },

    /// A single-record lookup matched more than one record.
    #[error("{count} {record_type} records match tag filter {filter}, expected one")]
    DuplicateMatch {
        record_type: String,
        filter: String,
        count: usize,
    },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for the "nothing there" variants callers usually map to a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. } | StorageError::NoMatch { .. }
        )
    }
}
