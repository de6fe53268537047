//! Persisted records and the repository that stores them.
//!
//! Every record type implements [`RecordModel`]; [`RecordRepository`]
//! turns a model into a tagged [`StorageRecord`] and back. Creation and
//! update are separate calls. Updates are compare-and-swap on the version
//! the record was loaded at, so two tasks racing on one record cannot
//! both apply a transition.

pub mod connection;
pub mod cred_def_sent;
pub mod credential_exchange;
pub mod issuer_rev_reg;
pub mod presentation_exchange;

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use aries_storage::{AgentStorage, StorageError, StorageRecord, TagFilter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExchangeError;
use crate::util::timestamp_now;

pub use connection::{ConnectionRecord, ConnectionState};
pub use cred_def_sent::CredDefSentRecord;
pub use credential_exchange::{CredentialExchangeRecord, CredentialExchangeState};
pub use issuer_rev_reg::{IssuanceType, IssuerRevRegRecord, RevRegState};
pub use presentation_exchange::{PresentationExchangeRecord, PresentationExchangeState};

/// Who started an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    #[serde(rename = "self")]
    Local,
    External,
}

impl Initiator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Initiator::Local => "self",
            Initiator::External => "external",
        }
    }
}

/// Bookkeeping shared by every record.
///
/// `version` is the storage version the record was loaded at; `None`
/// until the record has been created. It is not persisted and takes no
/// part in equality: two copies of a record loaded at different versions
/// compare equal when their stored content matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(skip)]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PartialEq for RecordMeta {
    fn eq(&self, other: &Self) -> bool {
        self.created_at == other.created_at && self.updated_at == other.updated_at
    }
}

impl Eq for RecordMeta {}

pub trait RecordModel: Serialize + DeserializeOwned + Send + Sync {
    const RECORD_TYPE: &'static str;

    fn id(&self) -> &str;

    /// Queryable tags. Absent values are left out rather than stored empty.
    fn tags(&self) -> BTreeMap<String, String>;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    fn is_new(&self) -> bool {
        self.meta().version.is_none()
    }
}

/// Insert `value` under `name` when present.
pub(crate) fn put_tag(tags: &mut BTreeMap<String, String>, name: &str, value: Option<&str>) {
    if let Some(v) = value {
        tags.insert(name.to_string(), v.to_string());
    }
}

pub(crate) fn tag_filter<const N: usize>(pairs: [(&str, &str); N]) -> TagFilter {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ──────────────────────────────────────────────
// Repository
// ──────────────────────────────────────────────

pub struct RecordRepository<T> {
    storage: Arc<dyn AgentStorage>,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordRepository<T> {
    fn clone(&self) -> Self {
        RecordRepository {
            storage: self.storage.clone(),
            _model: PhantomData,
        }
    }
}

impl<T: RecordModel> RecordRepository<T> {
    pub fn new(storage: Arc<dyn AgentStorage>) -> Self {
        RecordRepository {
            storage,
            _model: PhantomData,
        }
    }

    fn to_storage(record: &T) -> Result<StorageRecord, ExchangeError> {
        Ok(StorageRecord::new(
            T::RECORD_TYPE,
            record.id(),
            serde_json::to_string(record)?,
            record.tags(),
        ))
    }

    fn from_storage(stored: StorageRecord) -> Result<T, ExchangeError> {
        let mut record: T = serde_json::from_str(&stored.value)?;
        record.meta_mut().version = Some(stored.version);
        Ok(record)
    }

    /// Persist a record that has never been stored.
    pub async fn create(&self, record: &mut T) -> Result<(), ExchangeError> {
        if !record.is_new() {
            return Err(ExchangeError::manager(format!(
                "{} {} already exists",
                T::RECORD_TYPE,
                record.id()
            )));
        }
        let now = timestamp_now();
        record.meta_mut().created_at = Some(now.clone());
        record.meta_mut().updated_at = Some(now);
        self.storage.add_record(Self::to_storage(record)?).await?;
        record.meta_mut().version = Some(0);
        debug!(record_type = T::RECORD_TYPE, id = record.id(), "record created");
        Ok(())
    }

    /// Write back a loaded record. Fails with a storage conflict if the
    /// record changed since it was loaded.
    pub async fn update(&self, record: &mut T) -> Result<(), ExchangeError> {
        let expected = record.meta().version.ok_or_else(|| {
            ExchangeError::manager(format!(
                "{} {} has not been created",
                T::RECORD_TYPE,
                record.id()
            ))
        })?;
        let previous = record.meta().updated_at.clone();
        record.meta_mut().updated_at = Some(timestamp_now());
        let stored = match Self::to_storage(record) {
            Ok(stored) => stored,
            Err(e) => {
                record.meta_mut().updated_at = previous;
                return Err(e);
            }
        };
        match self.storage.update_record(stored, expected).await {
            Ok(version) => {
                record.meta_mut().version = Some(version);
                Ok(())
            }
            Err(e) => {
                record.meta_mut().updated_at = previous;
                Err(e.into())
            }
        }
    }

    /// `create` for new records, `update` otherwise.
    pub async fn save(&self, record: &mut T) -> Result<(), ExchangeError> {
        if record.is_new() {
            self.create(record).await
        } else {
            self.update(record).await
        }
    }

    pub async fn retrieve_by_id(&self, id: &str) -> Result<T, ExchangeError> {
        let stored = self.storage.get_record(T::RECORD_TYPE, id).await?;
        Self::from_storage(stored)
    }

    /// The single record matching `filter`. More than one match means the
    /// uniqueness invariant for the filter was broken.
    pub async fn retrieve_by_tag_filter(&self, filter: &TagFilter) -> Result<T, ExchangeError> {
        match self.storage.find_one(T::RECORD_TYPE, filter).await {
            Ok(stored) => Self::from_storage(stored),
            Err(e @ StorageError::DuplicateMatch { .. }) => Err(ExchangeError::Manager(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// The record of one exchange on one connection.
    pub async fn retrieve_by_connection_and_thread(
        &self,
        connection_id: &str,
        thread_id: &str,
    ) -> Result<T, ExchangeError> {
        self.retrieve_by_tag_filter(&tag_filter([
            ("connection_id", connection_id),
            ("thread_id", thread_id),
        ]))
        .await
    }

    pub async fn query(&self, filter: &TagFilter) -> Result<Vec<T>, ExchangeError> {
        self.storage
            .find_records(T::RECORD_TYPE, filter)
            .await?
            .into_iter()
            .map(Self::from_storage)
            .collect()
    }

    pub async fn delete(&self, record: &T) -> Result<(), ExchangeError> {
        self.storage
            .delete_record(T::RECORD_TYPE, record.id())
            .await?;
        debug!(record_type = T::RECORD_TYPE, id = record.id(), "record deleted");
        Ok(())
    }
}
