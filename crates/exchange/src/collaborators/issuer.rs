use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    /// The revocation registry has no free indices left.
    #[error("revocation registry {registry_id} is full")]
    RegistryFull { registry_id: String },
    #[error("issuer error: {0}")]
    Failed(String),
}

/// Parameters for creating a revocation registry and its tails file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySpec<'a> {
    pub issuer_did: &'a str,
    pub cred_def_id: &'a str,
    pub revoc_def_type: &'a str,
    pub tag: &'a str,
    pub max_cred_num: u32,
    pub tails_dir: &'a str,
    pub issuance_type: &'a str,
}

/// A registry freshly created by the issuer: id, definition and initial entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRegistry {
    pub revoc_reg_id: String,
    pub revoc_reg_def: Value,
    pub revoc_reg_entry: Value,
}

/// A newly issued credential and, for revocable ones, its registry index.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCredential {
    pub credential: Value,
    pub revocation_id: Option<String>,
}

#[async_trait]
pub trait Issuer: Send + Sync {
    async fn create_credential_offer(&self, cred_def_id: &str) -> Result<Value, IssuerError>;

    /// Fails with [`IssuerError::RegistryFull`] when `registry_id` has no
    /// free index.
    async fn create_credential(
        &self,
        schema: &Value,
        offer: &Value,
        request: &Value,
        values: &BTreeMap<String, String>,
        registry_id: Option<&str>,
        tails_path: Option<&str>,
    ) -> Result<IssuedCredential, IssuerError>;

    /// Revoke `cred_rev_ids` in one registry; returns the registry delta.
    async fn revoke_credentials(
        &self,
        registry_id: &str,
        tails_path: Option<&str>,
        cred_rev_ids: &[String],
    ) -> Result<Value, IssuerError>;

    async fn merge_revocation_registry_deltas(
        &self,
        earlier: &Value,
        later: &Value,
    ) -> Result<Value, IssuerError>;

    async fn create_and_store_revocation_registry(
        &self,
        spec: RegistrySpec<'_>,
    ) -> Result<CreatedRegistry, IssuerError>;
}
