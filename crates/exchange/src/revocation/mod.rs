//! Issuer revocation registries: creation, lookup, publication and the
//! pending-revocation ledger.

mod registry;

pub use registry::{RegistryCache, RevocationRegistry};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aries_storage::{AgentStorage, StorageError, TagFilter};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collaborators::{Issuer, Ledger, LedgerError, RegistrySpec, TailsFetcher};
use crate::error::ExchangeError;
use crate::models::issuer_rev_reg::check_url;
use crate::models::{
    tag_filter, IssuanceType, IssuerRevRegRecord, RecordModel, RecordRepository, RevRegState,
};
use crate::util::parse_timestamp;

const MAX_UPDATE_ATTEMPTS: usize = 3;

pub struct RevocationCoordinator {
    issuer: Arc<dyn Issuer>,
    ledger: Arc<dyn Ledger>,
    tails: Arc<dyn TailsFetcher>,
    registries: RecordRepository<IssuerRevRegRecord>,
    cache: RegistryCache,
    tails_dir: PathBuf,
}

impl RevocationCoordinator {
    pub fn new(
        issuer: Arc<dyn Issuer>,
        ledger: Arc<dyn Ledger>,
        tails: Arc<dyn TailsFetcher>,
        storage: Arc<dyn AgentStorage>,
        tails_dir: PathBuf,
    ) -> Self {
        RevocationCoordinator {
            issuer,
            ledger,
            tails,
            registries: RecordRepository::new(storage),
            cache: RegistryCache::new(),
            tails_dir,
        }
    }

    pub fn tails_dir(&self) -> &Path {
        &self.tails_dir
    }

    pub fn tails_fetcher(&self) -> &dyn TailsFetcher {
        self.tails.as_ref()
    }

    pub fn registry_cache(&self) -> &RegistryCache {
        &self.cache
    }

    // ── Lookup ─────────────────────────────────────

    /// Create a registry record in `init` for a revocable credential
    /// definition.
    pub async fn init_issuer_registry(
        &self,
        cred_def_id: &str,
        issuer_did: &str,
        issuance_by_default: bool,
        max_cred_num: Option<u32>,
        revoc_def_type: Option<&str>,
        tag: Option<&str>,
    ) -> Result<IssuerRevRegRecord, ExchangeError> {
        let session = self.ledger.open_session().await?;
        let cred_def = match session.get_credential_definition(cred_def_id).await {
            Ok(def) => def,
            Err(LedgerError::NotFound(_)) => {
                return Err(ExchangeError::RevocationNotSupported(format!(
                    "credential definition {} not found",
                    cred_def_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if !supports_revocation(&cred_def) {
            return Err(ExchangeError::RevocationNotSupported(format!(
                "credential definition {} does not support revocation",
                cred_def_id
            )));
        }

        let issuance_type = if issuance_by_default {
            IssuanceType::ByDefault
        } else {
            IssuanceType::OnDemand
        };
        let mut record = IssuerRevRegRecord::new(
            cred_def_id,
            issuer_did,
            issuance_type,
            max_cred_num,
            revoc_def_type,
            tag,
        );
        self.registries.create(&mut record).await?;
        info!(record_id = %record.record_id, cred_def_id, "revocation registry initialised");
        Ok(record)
    }

    /// The registry currently taking new credentials for `cred_def_id`.
    pub async fn get_active_issuer_rev_reg_record(
        &self,
        cred_def_id: &str,
    ) -> Result<IssuerRevRegRecord, ExchangeError> {
        let filter = tag_filter([
            ("cred_def_id", cred_def_id),
            ("state", RevRegState::Active.as_str()),
        ]);
        let mut active = self.registries.query(&filter).await?;
        if active.len() > 1 {
            warn!(cred_def_id, count = active.len(), "more than one active revocation registry");
            active.sort_by_cached_key(|r| r.meta.created_at.as_deref().and_then(parse_timestamp));
        }
        active.into_iter().next().ok_or_else(|| {
            ExchangeError::NotFound(format!(
                "no active revocation registry for credential definition {}",
                cred_def_id
            ))
        })
    }

    pub async fn get_issuer_rev_reg_record(
        &self,
        revoc_reg_id: &str,
    ) -> Result<IssuerRevRegRecord, ExchangeError> {
        self.registries
            .retrieve_by_tag_filter(&tag_filter([("revoc_reg_id", revoc_reg_id)]))
            .await
    }

    pub async fn list_issuer_registries(&self) -> Result<Vec<IssuerRevRegRecord>, ExchangeError> {
        self.registries.query(&TagFilter::new()).await
    }

    /// Registries holding revocations not yet on the ledger.
    pub async fn pending_registries(&self) -> Result<Vec<IssuerRevRegRecord>, ExchangeError> {
        Ok(self
            .list_issuer_registries()
            .await?
            .into_iter()
            .filter(IssuerRevRegRecord::has_pending)
            .collect())
    }

    /// A registry as published on the ledger. Cached for the life of the
    /// coordinator.
    pub async fn get_ledger_registry(
        &self,
        revoc_reg_id: &str,
    ) -> Result<RevocationRegistry, ExchangeError> {
        if let Some(hit) = self.cache.get(revoc_reg_id) {
            return Ok(hit);
        }
        let session = self.ledger.open_session().await?;
        let def = session.get_revoc_reg_def(revoc_reg_id).await?;
        let registry = RevocationRegistry::from_definition(&def, true)?;
        self.cache.insert(registry.clone());
        Ok(registry)
    }

    /// The registry a local record describes.
    pub fn get_registry(
        &self,
        record: &IssuerRevRegRecord,
    ) -> Result<RevocationRegistry, ExchangeError> {
        let def = record.revoc_reg_def.as_ref().ok_or_else(|| {
            ExchangeError::Revocation(format!(
                "registry {} has no definition",
                record.record_id
            ))
        })?;
        let mut registry = RevocationRegistry::from_definition(def, false)?;
        registry.tails_local_path = record.tails_local_path.clone();
        registry.tails_public_uri = record.tails_public_uri.clone();
        Ok(registry)
    }

    // ── Life-cycle ─────────────────────────────────

    /// Create the registry and its tails file through the issuer.
    pub async fn generate_registry(
        &self,
        record: &mut IssuerRevRegRecord,
    ) -> Result<(), ExchangeError> {
        record.ensure_state(&[RevRegState::Init], "generate registry")?;
        let tag = record.tag.clone().unwrap_or_else(|| record.record_id.clone());
        let tails_dir = self.tails_dir.join(&record.record_id);
        tokio::fs::create_dir_all(&tails_dir).await?;
        let tails_dir = tails_dir.to_string_lossy().into_owned();

        debug!(record_id = %record.record_id, "creating revocation registry");
        let created = self
            .issuer
            .create_and_store_revocation_registry(RegistrySpec {
                issuer_did: &record.issuer_did,
                cred_def_id: &record.cred_def_id,
                revoc_def_type: &record.revoc_def_type,
                tag: &tag,
                max_cred_num: record.max_cred_num,
                tails_dir: &tails_dir,
                issuance_type: record.issuance_type.as_str(),
            })
            .await?;

        let value = created.revoc_reg_def.get("value");
        let value_str = |name: &str| {
            value
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        record.tag = Some(tag);
        record.tails_hash = value_str("tailsHash");
        record.tails_local_path = value_str("tailsLocation");
        record.revoc_reg_id = Some(created.revoc_reg_id);
        record.revoc_reg_def = Some(created.revoc_reg_def);
        record.revoc_reg_entry = Some(created.revoc_reg_entry);
        record.state = RevRegState::Generated;
        self.registries.update(record).await?;
        info!(
            record_id = %record.record_id,
            revoc_reg_id = record.revoc_reg_id.as_deref().unwrap_or_default(),
            "revocation registry generated"
        );
        Ok(())
    }

    pub async fn set_tails_file_public_uri(
        &self,
        record: &mut IssuerRevRegRecord,
        uri: &str,
    ) -> Result<(), ExchangeError> {
        record.set_tails_file_public_uri(uri)?;
        self.registries.update(record).await
    }

    pub async fn publish_registry_definition(
        &self,
        record: &mut IssuerRevRegRecord,
    ) -> Result<(), ExchangeError> {
        record.ensure_state(&[RevRegState::Generated], "publish registry definition")?;
        let def = record.revoc_reg_def.as_ref().ok_or_else(|| {
            ExchangeError::Revocation("revocation registry undefined".to_string())
        })?;
        check_url(record.tails_public_uri.as_deref().unwrap_or_default())?;

        let session = self.ledger.open_session().await?;
        session.send_revoc_reg_def(def, &record.issuer_did).await?;
        record.state = RevRegState::Published;
        self.registries.update(record).await?;
        info!(record_id = %record.record_id, "revocation registry definition published");
        Ok(())
    }

    /// Write the current registry entry to the ledger. The first entry
    /// makes a published registry active.
    ///
    /// Activation does not look at other registries of the same cred def.
    /// When several are active, `get_active_issuer_rev_reg_record` picks
    /// the oldest, so issuance still targets one registry at a time.
    pub async fn publish_registry_entry(
        &self,
        record: &mut IssuerRevRegRecord,
    ) -> Result<(), ExchangeError> {
        record.ensure_state(
            &[RevRegState::Published, RevRegState::Active, RevRegState::Full],
            "publish registry entry",
        )?;
        let revoc_reg_id = record.registry_id()?.to_string();
        let entry = record.revoc_reg_entry.as_ref().ok_or_else(|| {
            ExchangeError::Revocation("revocation registry undefined".to_string())
        })?;
        check_url(record.tails_public_uri.as_deref().unwrap_or_default())?;

        let session = self.ledger.open_session().await?;
        session
            .send_revoc_reg_entry(&revoc_reg_id, &record.revoc_def_type, entry, &record.issuer_did)
            .await?;
        if record.state == RevRegState::Published {
            record.state = RevRegState::Active;
            self.registries.update(record).await?;
            info!(record_id = %record.record_id, %revoc_reg_id, "revocation registry active");
            let active = self
                .registries
                .query(&tag_filter([
                    ("cred_def_id", record.cred_def_id.as_str()),
                    ("state", RevRegState::Active.as_str()),
                ]))
                .await?;
            if active.len() > 1 {
                warn!(
                    cred_def_id = %record.cred_def_id,
                    count = active.len(),
                    "another revocation registry is already active; the oldest takes new credentials"
                );
            }
        }
        Ok(())
    }

    /// Record `cred_rev_id` as revoked locally, pending publication.
    pub async fn mark_pending(
        &self,
        record: &mut IssuerRevRegRecord,
        cred_rev_id: &str,
    ) -> Result<(), ExchangeError> {
        self.update_with_retry(record, |r| {
            r.add_pending(cred_rev_id);
            true
        })
        .await?;
        debug!(record_id = %record.record_id, cred_rev_id, "revocation pending");
        Ok(())
    }

    /// Drop `published` from the pending set, or everything when `None`.
    /// Indices added concurrently are kept.
    pub async fn clear_pending(
        &self,
        record: &mut IssuerRevRegRecord,
        published: Option<&[String]>,
    ) -> Result<(), ExchangeError> {
        let all = record.pending_pub.clone();
        let published = published.unwrap_or(all.as_slice());
        self.update_with_retry(record, |r| r.remove_pending(published))
            .await
    }

    /// Stop issuing into `record`. The copy may be stale; the stored
    /// registry is reloaded on a version conflict.
    pub async fn mark_full(&self, record: &mut IssuerRevRegRecord) -> Result<(), ExchangeError> {
        self.update_with_retry(record, |r| {
            if r.state == RevRegState::Full {
                return false;
            }
            r.state = RevRegState::Full;
            true
        })
        .await?;
        warn!(
            record_id = %record.record_id,
            revoc_reg_id = record.revoc_reg_id.as_deref().unwrap_or_default(),
            "revocation registry full"
        );
        Ok(())
    }

    /// Apply `mutate` and save, reloading and reapplying on a version
    /// conflict. `mutate` returns false when there is nothing to save.
    async fn update_with_retry<F>(
        &self,
        record: &mut IssuerRevRegRecord,
        mutate: F,
    ) -> Result<(), ExchangeError>
    where
        F: Fn(&mut IssuerRevRegRecord) -> bool,
    {
        let mut attempt = 0;
        loop {
            if !mutate(record) {
                return Ok(());
            }
            match self.registries.update(record).await {
                Ok(()) => return Ok(()),
                Err(ExchangeError::Storage(StorageError::ConcurrentConflict { .. }))
                    if attempt + 1 < MAX_UPDATE_ATTEMPTS =>
                {
                    attempt += 1;
                    debug!(record_id = %record.record_id, attempt, "registry changed underneath, retrying");
                    *record = self.registries.retrieve_by_id(record.id()).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ── Revocation ─────────────────────────────────

    /// Revoke `cred_rev_ids` in the registry `record` describes and save
    /// the resulting entry on the record. Nothing is written to the ledger.
    pub async fn revoke_in_registry(
        &self,
        record: &mut IssuerRevRegRecord,
        cred_rev_ids: &[String],
    ) -> Result<(), ExchangeError> {
        let revoc_reg_id = record.registry_id()?.to_string();
        let delta = self
            .issuer
            .revoke_credentials(&revoc_reg_id, record.tails_local_path.as_deref(), cred_rev_ids)
            .await?;
        let entry = match &record.revoc_reg_entry {
            Some(previous) => {
                self.issuer
                    .merge_revocation_registry_deltas(previous, &delta)
                    .await?
            }
            None => delta,
        };
        record.revoc_reg_entry = Some(entry);
        self.registries.update(record).await
    }
}

fn supports_revocation(cred_def: &Value) -> bool {
    cred_def
        .get("value")
        .and_then(|v| v.get("revocation"))
        .is_some_and(|r| !r.is_null())
}
