use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HolderError {
    #[error("credential not found in wallet: {0}")]
    CredentialNotFound(String),
    #[error("holder error {code}: {message}")]
    Failed { code: String, message: String },
}

/// Request payload and the private metadata needed to store the credential.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRequestResult {
    pub request: Value,
    pub metadata: Value,
}

/// Arguments to [`Holder::store_credential`].
#[derive(Debug, Clone, Copy)]
pub struct StoreCredential<'a> {
    pub cred_def: &'a Value,
    pub credential: &'a Value,
    pub metadata: &'a Value,
    pub mime_types: Option<&'a BTreeMap<String, String>>,
    pub credential_id: Option<&'a str>,
    pub rev_reg_def: Option<&'a Value>,
}

/// Inputs gathered for proof construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationInputs {
    pub schemas: BTreeMap<String, Value>,
    pub cred_defs: BTreeMap<String, Value>,
    /// registry id -> ledger timestamp -> revocation state
    pub rev_states: BTreeMap<String, BTreeMap<u64, Value>>,
}

#[async_trait]
pub trait Holder: Send + Sync {
    async fn create_credential_request(
        &self,
        offer: &Value,
        cred_def: &Value,
        holder_did: &str,
    ) -> Result<CredentialRequestResult, HolderError>;

    /// Store a credential in the wallet and return its wallet id.
    async fn store_credential(&self, args: StoreCredential<'_>) -> Result<String, HolderError>;

    async fn get_credential(&self, credential_id: &str) -> Result<Value, HolderError>;

    async fn create_revocation_state(
        &self,
        cred_rev_id: &str,
        rev_reg_def: &Value,
        rev_reg_delta: &Value,
        timestamp: u64,
        tails_path: &str,
    ) -> Result<Value, HolderError>;

    async fn create_presentation(
        &self,
        proof_request: &Value,
        requested_credentials: &Value,
        inputs: &PresentationInputs,
    ) -> Result<Value, HolderError>;
}
