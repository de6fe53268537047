//! Revocation registry value object and tails-file handling.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::collaborators::TailsFetcher;
use crate::error::ExchangeError;

/// A revocation registry as described by its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationRegistry {
    pub registry_id: String,
    pub cred_def_id: String,
    pub issuer_did: String,
    pub max_creds: u32,
    pub reg_def_type: String,
    pub tag: Option<String>,
    pub tails_hash: Option<String>,
    pub tails_public_uri: Option<String>,
    pub tails_local_path: Option<String>,
    /// True when built from the ledger copy of the definition.
    pub is_public: bool,
}

impl RevocationRegistry {
    /// Build from an Indy registry definition. For a public definition
    /// `value.tailsLocation` is the download URI, otherwise a local path.
    pub fn from_definition(def: &Value, public: bool) -> Result<Self, ExchangeError> {
        let field = |name: &str| -> Result<String, ExchangeError> {
            def.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ExchangeError::Revocation(format!(
                        "revocation registry definition has no {}",
                        name
                    ))
                })
        };
        let registry_id = field("id")?;
        let value = def.get("value");
        let value_str = |name: &str| value.and_then(|v| v.get(name)).and_then(Value::as_str);
        let tails_location = value_str("tailsLocation").map(str::to_string);
        let issuer_did = registry_id
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string();

        Ok(RevocationRegistry {
            cred_def_id: field("credDefId")?,
            issuer_did,
            max_creds: value
                .and_then(|v| v.get("maxCredNum"))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_default(),
            reg_def_type: field("revocDefType")?,
            tag: def.get("tag").and_then(Value::as_str).map(str::to_string),
            tails_hash: value_str("tailsHash").map(str::to_string),
            tails_public_uri: if public { tails_location.clone() } else { None },
            tails_local_path: if public { None } else { tails_location },
            is_public: public,
            registry_id,
        })
    }

    /// Where a downloaded tails file for this registry lives.
    pub fn receiving_tails_path(&self, tails_dir: &Path) -> Result<PathBuf, ExchangeError> {
        let hash = self.tails_hash.as_deref().ok_or_else(|| {
            ExchangeError::Revocation(format!(
                "registry {} has no tails hash",
                self.registry_id
            ))
        })?;
        Ok(tails_dir.join(&self.registry_id).join(hash))
    }

    pub async fn has_local_tails_file(&self, tails_dir: &Path) -> bool {
        let path = match &self.tails_local_path {
            Some(p) => PathBuf::from(p),
            None => match self.receiving_tails_path(tails_dir) {
                Ok(p) => p,
                Err(_) => return false,
            },
        };
        tokio::fs::try_exists(&path).await.unwrap_or(false)
    }

    /// Download the tails file, check its hash and write it under
    /// `tails_dir`. Returns the local path.
    pub async fn retrieve_tails(
        &mut self,
        fetcher: &dyn TailsFetcher,
        tails_dir: &Path,
    ) -> Result<PathBuf, ExchangeError> {
        let uri = self.tails_public_uri.clone().ok_or_else(|| {
            ExchangeError::Revocation(format!(
                "registry {} has no public tails URI",
                self.registry_id
            ))
        })?;
        let target = self.receiving_tails_path(tails_dir)?;
        debug!(registry_id = %self.registry_id, %uri, "downloading tails file");

        let bytes = fetcher.fetch(&uri).await?;
        let digest = bs58::encode(Sha256::digest(&bytes)).into_string();
        if Some(digest.as_str()) != self.tails_hash.as_deref() {
            return Err(ExchangeError::Revocation(format!(
                "tails file for registry {} does not match hash: got {}",
                self.registry_id, digest
            )));
        }

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let partial = target.with_extension("partial");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &target).await?;

        info!(registry_id = %self.registry_id, path = %target.display(), "tails file stored");
        self.tails_local_path = Some(target.to_string_lossy().into_owned());
        Ok(target)
    }

    /// Local tails path, downloading the file first when it is missing.
    pub async fn ensure_tails(
        &mut self,
        fetcher: &dyn TailsFetcher,
        tails_dir: &Path,
    ) -> Result<PathBuf, ExchangeError> {
        if self.has_local_tails_file(tails_dir).await {
            return match &self.tails_local_path {
                Some(p) => Ok(PathBuf::from(p)),
                None => {
                    let path = self.receiving_tails_path(tails_dir)?;
                    self.tails_local_path = Some(path.to_string_lossy().into_owned());
                    Ok(path)
                }
            };
        }
        self.retrieve_tails(fetcher, tails_dir).await
    }
}

/// Ledger registries by id. Published definitions never change, so
/// entries are never evicted.
#[derive(Debug, Default)]
pub struct RegistryCache {
    entries: DashMap<String, RevocationRegistry>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, registry_id: &str) -> Option<RevocationRegistry> {
        self.entries.get(registry_id).map(|r| r.clone())
    }

    pub fn insert(&self, registry: RevocationRegistry) {
        self.entries.insert(registry.registry_id.clone(), registry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
