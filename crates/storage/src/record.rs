use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Exact-match tag filter: every (name, value) pair must be present on a
/// record for it to match. An empty filter matches every record of the type.
pub type TagFilter = BTreeMap<String, String>;

/// An opaque record as stored in the backend.
///
/// `value` is a JSON document owned by the caller; the backend never looks
/// inside it. Only `tags` are queryable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub record_type: String,
    pub id: String,
    pub value: String,
    pub tags: BTreeMap<String, String>,
    /// Monotonic version, 0 on insert and bumped by every successful update.
    pub version: i64,
}

impl StorageRecord {
    pub fn new(
        record_type: impl Into<String>,
        id: impl Into<String>,
        value: impl Into<String>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        StorageRecord {
            record_type: record_type.into(),
            id: id.into(),
            value: value.into(),
            tags,
            version: 0,
        }
    }

    /// True if every pair in `filter` is present on this record.
    pub fn matches(&self, filter: &TagFilter) -> bool {
        filter
            .iter()
            .all(|(name, value)| self.tags.get(name) == Some(value))
    }
}

/// Render a tag filter for error messages.
pub(crate) fn describe_filter(filter: &TagFilter) -> String {
    let pairs: Vec<String> = filter.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}
