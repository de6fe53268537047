//! In-memory `AgentStorage` backend.
//!
//! Used by tests and single-process deployments. All records live in a
//! `BTreeMap` behind a tokio `RwLock`, so the version check in
//! `update_record` is atomic with the write.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{StorageRecord, TagFilter};
use crate::traits::AgentStorage;

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: RwLock<BTreeMap<(String, String), StorageRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all types.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn key(record_type: &str, id: &str) -> (String, String) {
    (record_type.to_string(), id.to_string())
}

#[async_trait]
impl AgentStorage for InMemoryStorage {
    async fn add_record(&self, mut record: StorageRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let k = key(&record.record_type, &record.id);
        if records.contains_key(&k) {
            return Err(StorageError::Duplicate {
                record_type: record.record_type,
                id: record.id,
            });
        }
        record.version = 0;
        tracing::trace!(record_type = %record.record_type, id = %record.id, "record added");
        records.insert(k, record);
        Ok(())
    }

    async fn get_record(&self, record_type: &str, id: &str) -> Result<StorageRecord, StorageError> {
        self.records
            .read()
            .await
            .get(&key(record_type, id))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                record_type: record_type.to_string(),
                id: id.to_string(),
            })
    }

    async fn update_record(
        &self,
        mut record: StorageRecord,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&key(&record.record_type, &record.id))
            .ok_or_else(|| StorageError::NotFound {
                record_type: record.record_type.clone(),
                id: record.id.clone(),
            })?;
        if stored.version != expected_version {
            return Err(StorageError::ConcurrentConflict {
                record_type: record.record_type,
                id: record.id,
                expected_version,
            });
        }
        record.version = expected_version + 1;
        let new_version = record.version;
        *stored = record;
        Ok(new_version)
    }

    async fn delete_record(&self, record_type: &str, id: &str) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .remove(&key(record_type, id))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                record_type: record_type.to_string(),
                id: id.to_string(),
            })
    }

    async fn find_records(
        &self,
        record_type: &str,
        filter: &TagFilter,
    ) -> Result<Vec<StorageRecord>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.record_type == record_type && r.matches(filter))
            .cloned()
            .collect())
    }
}
